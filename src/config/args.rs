// dgraph-backup/src/config/args.rs
use clap::Args;
use std::path::PathBuf;

use super::ExportFormat;

/// Options shared by every command. Each flag can also be supplied through
/// its environment variable or the JSON config file.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// JSON config file; flags and environment variables take precedence over it
    #[arg(long, env = "BACKUP_CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Export format requested from the server
    #[arg(long, env = "EXPORT_FORMAT", value_enum)]
    pub format: Option<ExportFormat>,

    #[arg(long, env = "AWS_BUCKET")]
    pub aws_bucket: Option<String>,

    #[arg(long, env = "AWS_REGION")]
    pub aws_region: Option<String>,

    /// S3-compatible endpoint, e.g. https://nyc3.digitaloceanspaces.com
    #[arg(long, env = "AWS_ENDPOINT_URL")]
    pub aws_endpoint: Option<String>,

    #[arg(long, env = "AWS_ACCESS_KEY")]
    pub aws_key: Option<String>,

    #[arg(long, env = "AWS_ACCESS_SECRET", hide_env_values = true)]
    pub aws_secret: Option<String>,

    /// Exp: http://localhost:8080
    #[arg(long, env = "DGRAPH_HOST")]
    pub dgraph_host: Option<String>,

    /// Backup file prefix <prefix>-<hostname>-<timestamp>.zip
    #[arg(long, env = "FILE_PREFIX")]
    pub file_prefix: Option<String>,

    /// Directory the server writes its export into
    #[arg(long, env = "EXPORT_PATH")]
    pub export_path: Option<PathBuf>,

    /// Directory local archives are written to
    #[arg(long, env = "ARCHIVE_DIR")]
    pub archive_dir: Option<PathBuf>,

    #[arg(long, env = "CRON_EVERY_MINUTE")]
    pub cron_every_minute: Option<u64>,

    /// Host identifier embedded in archive names
    #[arg(long, env = "HOSTNAME")]
    pub hostname: Option<String>,

    #[arg(long, env = "DGRAPH_ALPHA_PUBLIC_GRPC_PORT_9080_TCP_ADDR")]
    pub dgraph_alpha_host: Option<String>,

    #[arg(long, env = "DGRAPH_ALPHA_PUBLIC_GRPC_SERVICE_PORT")]
    pub dgraph_alpha_port: Option<u16>,

    #[arg(long, env = "DGRAPH_ZERO_PUBLIC_GRPC_PORT_5080_TCP_ADDR")]
    pub dgraph_zero_host: Option<String>,

    #[arg(long, env = "DGRAPH_ZERO_PUBLIC_GRPC_PORT_5080_TCP_PORT")]
    pub dgraph_zero_port: Option<u16>,

    #[arg(long, env = "POLL_INITIAL_DELAY_MS")]
    pub poll_initial_delay_ms: Option<u64>,

    #[arg(long, env = "POLL_MAX_DELAY_SECS")]
    pub poll_max_delay_secs: Option<u64>,

    /// Retries allowed while waiting for the export directory
    #[arg(long, env = "POLL_MAX_ATTEMPTS")]
    pub poll_max_attempts: Option<u32>,

    #[arg(long, env = "HTTP_TIMEOUT_SECS")]
    pub http_timeout_secs: Option<u64>,

    /// Directory backups are unpacked into before loading
    #[arg(long, env = "RESTORE_DIR")]
    pub restore_dir: Option<PathBuf>,

    /// Executable providing the `live` loader subcommand
    #[arg(long, env = "LOADER_BIN")]
    pub loader_bin: Option<String>,

    /// Line written to the loader's stdin to confirm the load
    #[arg(long, env = "LOADER_ANSWER")]
    pub loader_answer: Option<String>,

    /// Output text that must appear before the answer is written
    #[arg(long, env = "LOADER_PROMPT")]
    pub loader_prompt: Option<String>,

    /// Kill the loader after this many minutes (0 disables the limit)
    #[arg(long, env = "RESTORE_TIMEOUT_MINS")]
    pub restore_timeout_mins: Option<u64>,
}
