//! Dgraph backup/restore tool
//!
//! Triggers server-side exports, ships them to S3 as zip archives and
//! restores a chosen archive through the bulk loader.

// dgraph-backup/src/main.rs
mod backup;
mod config;
mod errors;
mod restore;
mod storage;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{AppConfig, ConfigArgs};
use errors::Severity;
use std::process::ExitCode;
use storage::S3Store;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dgraph-backup", version, about = "Backup and restore for Dgraph")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export, package and upload once
    BackupNow(ConfigArgs),
    /// Back up immediately and then every --cron-every-minute minutes
    BackupCron(ConfigArgs),
    /// Pick a backup from the bucket and load it into the cluster
    Restore(ConfigArgs),
}

/// Main entry point for the backup/restore tool
#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match run_app(cli.command).await {
        Ok(true) => {
            println!("✅ Operation completed successfully.");
            ExitCode::SUCCESS
        }
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

/// Runs one command. `Ok(false)` means the failure was already reported.
async fn run_app(command: Command) -> Result<bool> {
    match command {
        Command::BackupNow(args) => {
            println!("🚀 Starting Backup Process...");
            let config = load_config(args)?;
            let store = S3Store::connect(&config.storage).await;
            let mut pipeline = backup::build_pipeline(&config, store)?;
            match pipeline.run().await {
                Ok(report) => {
                    backup::print_report(&report);
                    Ok(report.succeeded())
                }
                Err(e) => {
                    if e.severity() == Severity::Tolerated {
                        warn!(stage = %e.stage(), "Backup run ended early");
                    }
                    backup::print_failure(&e);
                    Ok(false)
                }
            }
        }
        Command::BackupCron(args) => {
            let config = load_config(args)?;
            println!(
                "⏰ Scheduling backups every {} minute(s)...",
                config.schedule.every.as_secs() / 60
            );
            let store = S3Store::connect(&config.storage).await;
            let mut pipeline = backup::build_pipeline(&config, store)?;
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!(error = %e, "Failed to listen for Ctrl-C");
                    std::future::pending::<()>().await;
                }
                println!("🛑 Shutdown requested, stopping schedule");
            };
            match backup::run_on_interval(&mut pipeline, config.schedule.every, shutdown, backup::print_report).await {
                Ok(runs) => {
                    println!("Scheduler ran {} backup(s)", runs);
                    Ok(true)
                }
                Err(e) => {
                    backup::print_failure(&e);
                    Ok(false)
                }
            }
        }
        Command::Restore(args) => {
            println!("🔄 Starting Restore Process...");
            let config = load_config(args)?;
            let store = S3Store::connect(&config.storage).await;
            match restore::run_restore(&store, &restore::TerminalChooser, &config.restore).await {
                Ok(report) => {
                    restore::print_report(&report);
                    Ok(report.succeeded())
                }
                Err(e) => {
                    restore::print_failure(&e);
                    Ok(false)
                }
            }
        }
    }
}

fn load_config(args: ConfigArgs) -> Result<AppConfig> {
    AppConfig::load(args).context("Failed to load configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_subcommand_names() {
        let cli = Cli::try_parse_from(["dgraph-backup", "backup-now", "--aws-bucket", "b"]).unwrap();
        match cli.command {
            Command::BackupNow(args) => assert_eq!(args.aws_bucket.as_deref(), Some("b")),
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(Cli::try_parse_from(["dgraph-backup", "backup-cron"]).is_ok());
        assert!(Cli::try_parse_from(["dgraph-backup", "restore"]).is_ok());
        assert!(Cli::try_parse_from(["dgraph-backup", "sync"]).is_err());
    }
}
