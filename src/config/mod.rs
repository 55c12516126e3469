// dgraph-backup/src/config/mod.rs
mod args;

pub use args::ConfigArgs;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::utils::backoff::BackoffPolicy;

const DEFAULT_BUCKET: &str = "dgraph-backup";
const DEFAULT_REGION: &str = "ap-northeast-2";
const DEFAULT_DGRAPH_HOST: &str = "http://localhost:8080";
const DEFAULT_FILE_PREFIX: &str = "dgraph-backup";
const DEFAULT_EXPORT_PATH: &str = "./export";
const DEFAULT_ARCHIVE_DIR: &str = ".";
const DEFAULT_HOSTNAME: &str = "localhost";
const DEFAULT_RESTORE_DIR: &str = "./data";
const DEFAULT_LOADER_BIN: &str = "dgraph";
const DEFAULT_LOADER_ANSWER: &str = "4";
const DEFAULT_RESTORE_TIMEOUT_MINS: u64 = 6 * 60;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Rdf,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Rdf => "rdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Structs for deserializing the optional JSON config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawJsonConfig {
    pub format: Option<ExportFormat>,
    pub aws_bucket: Option<String>,
    pub aws_region: Option<String>,
    pub aws_endpoint: Option<String>,
    pub aws_key: Option<String>,
    pub aws_secret: Option<String>,
    pub dgraph_host: Option<String>,
    pub file_prefix: Option<String>,
    pub export_path: Option<PathBuf>,
    pub archive_dir: Option<PathBuf>,
    pub cron_every_minute: Option<u64>,
    pub hostname: Option<String>,
    pub dgraph_alpha_host: Option<String>,
    pub dgraph_alpha_port: Option<u16>,
    pub dgraph_zero_host: Option<String>,
    pub dgraph_zero_port: Option<u16>,
    pub poll_initial_delay_ms: Option<u64>,
    pub poll_max_delay_secs: Option<u64>,
    pub poll_max_attempts: Option<u32>,
    pub http_timeout_secs: Option<u64>,
    pub restore_dir: Option<PathBuf>,
    pub loader_bin: Option<String>,
    pub loader_answer: Option<String>,
    pub loader_prompt: Option<String>,
    pub restore_timeout_mins: Option<u64>,
}

impl RawJsonConfig {
    pub fn load_from_json(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;
        serde_json::from_str(&config_content).with_context(|| {
            format!(
                "Failed to parse JSON from config file at {}",
                config_path.display()
            )
        })
    }
}

// Application's internal configuration structs
#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub dgraph_host: Url,
    pub format: ExportFormat,
    pub export_path: PathBuf,
    pub archive_dir: PathBuf,
    pub file_prefix: String,
    pub hostname: String,
    pub http_timeout: Duration,
}

#[derive(Clone)]
pub struct StorageSettings {
    pub bucket_name: String,
    pub region: String,
    pub endpoint_url: Option<String>,
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for StorageSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageSettings")
            .field("bucket_name", &self.bucket_name)
            .field("region", &self.region)
            .field("endpoint_url", &self.endpoint_url)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ScheduleSettings {
    pub every: Duration,
}

#[derive(Debug, Clone)]
pub struct RestoreSettings {
    pub download_dir: PathBuf,
    pub restore_dir: PathBuf,
    pub alpha_addr: String,
    pub zero_addr: String,
    pub loader_bin: String,
    pub loader_answer: String,
    pub loader_prompt: Option<String>,
    /// `None` lets the loader run without a time limit.
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub export: ExportSettings,
    pub storage: StorageSettings,
    pub poll: BackoffPolicy,
    pub schedule: ScheduleSettings,
    pub restore: RestoreSettings,
}

impl AppConfig {
    /// Builds the configuration from parsed flags, reading the JSON config
    /// file first when one was given.
    pub fn load(args: ConfigArgs) -> Result<Self> {
        let raw = match &args.config {
            Some(path) => RawJsonConfig::load_from_json(path)?,
            None => RawJsonConfig::default(),
        };
        Self::from_sources(args, raw)
    }

    /// Merges flag/environment values over file values over defaults, then
    /// validates the result.
    pub fn from_sources(args: ConfigArgs, raw: RawJsonConfig) -> Result<Self> {
        let access_key_id = non_empty(args.aws_key.or(raw.aws_key))
            .context("aws-key must be set (--aws-key or AWS_ACCESS_KEY)")?;
        let secret_access_key = non_empty(args.aws_secret.or(raw.aws_secret))
            .context("aws-secret must be set (--aws-secret or AWS_ACCESS_SECRET)")?;

        let host_str = args
            .dgraph_host
            .or(raw.dgraph_host)
            .unwrap_or_else(|| DEFAULT_DGRAPH_HOST.to_string());
        let dgraph_host = parse_http_url(&host_str)?;

        let file_prefix = args
            .file_prefix
            .or(raw.file_prefix)
            .unwrap_or_else(|| DEFAULT_FILE_PREFIX.to_string());
        if file_prefix.trim().is_empty() {
            anyhow::bail!("file-prefix cannot be empty");
        }

        let bucket_name = args
            .aws_bucket
            .or(raw.aws_bucket)
            .unwrap_or_else(|| DEFAULT_BUCKET.to_string());
        if bucket_name.trim().is_empty() {
            anyhow::bail!("aws-bucket cannot be empty");
        }

        let http_timeout_secs = args
            .http_timeout_secs
            .or(raw.http_timeout_secs)
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);
        if http_timeout_secs == 0 {
            anyhow::bail!("http-timeout-secs must be greater than 0");
        }

        let archive_dir = args
            .archive_dir
            .or(raw.archive_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ARCHIVE_DIR));

        let export = ExportSettings {
            dgraph_host,
            format: args.format.or(raw.format).unwrap_or_default(),
            export_path: args
                .export_path
                .or(raw.export_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_PATH)),
            archive_dir: archive_dir.clone(),
            file_prefix,
            hostname: non_empty(args.hostname.or(raw.hostname))
                .unwrap_or_else(|| DEFAULT_HOSTNAME.to_string()),
            http_timeout: Duration::from_secs(http_timeout_secs),
        };

        let storage = StorageSettings {
            bucket_name,
            region: args
                .aws_region
                .or(raw.aws_region)
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            endpoint_url: non_empty(args.aws_endpoint.or(raw.aws_endpoint)),
            access_key_id,
            secret_access_key,
        };

        let defaults = BackoffPolicy::default();
        let poll = BackoffPolicy {
            initial_delay: args
                .poll_initial_delay_ms
                .or(raw.poll_initial_delay_ms)
                .map(Duration::from_millis)
                .unwrap_or(defaults.initial_delay),
            max_delay: args
                .poll_max_delay_secs
                .or(raw.poll_max_delay_secs)
                .map(Duration::from_secs)
                .unwrap_or(defaults.max_delay),
            factor: defaults.factor,
            max_attempts: args
                .poll_max_attempts
                .or(raw.poll_max_attempts)
                .unwrap_or(defaults.max_attempts),
        };
        validate_poll_policy(&poll)?;

        let every_minutes = args.cron_every_minute.or(raw.cron_every_minute).unwrap_or(1);
        if every_minutes == 0 {
            anyhow::bail!("cron-every-minute must be at least 1");
        }
        let schedule = ScheduleSettings {
            every: minutes(every_minutes).context("cron-every-minute is too large")?,
        };

        let alpha_host = args
            .dgraph_alpha_host
            .or(raw.dgraph_alpha_host)
            .unwrap_or_else(|| "localhost".to_string());
        let alpha_port = args.dgraph_alpha_port.or(raw.dgraph_alpha_port).unwrap_or(9080);
        let zero_host = args
            .dgraph_zero_host
            .or(raw.dgraph_zero_host)
            .unwrap_or_else(|| "localhost".to_string());
        let zero_port = args.dgraph_zero_port.or(raw.dgraph_zero_port).unwrap_or(5080);

        let timeout_mins = args
            .restore_timeout_mins
            .or(raw.restore_timeout_mins)
            .unwrap_or(DEFAULT_RESTORE_TIMEOUT_MINS);
        let timeout = match timeout_mins {
            0 => None,
            mins => Some(minutes(mins).context("restore-timeout-mins is too large")?),
        };

        let restore = RestoreSettings {
            download_dir: archive_dir,
            restore_dir: args
                .restore_dir
                .or(raw.restore_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_RESTORE_DIR)),
            alpha_addr: format!("{}:{}", alpha_host, alpha_port),
            zero_addr: format!("{}:{}", zero_host, zero_port),
            loader_bin: args
                .loader_bin
                .or(raw.loader_bin)
                .unwrap_or_else(|| DEFAULT_LOADER_BIN.to_string()),
            loader_answer: args
                .loader_answer
                .or(raw.loader_answer)
                .unwrap_or_else(|| DEFAULT_LOADER_ANSWER.to_string()),
            loader_prompt: non_empty(args.loader_prompt.or(raw.loader_prompt)),
            timeout,
        };

        Ok(AppConfig {
            export,
            storage,
            poll,
            schedule,
            restore,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn parse_http_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("Invalid dgraph-host URL: {}", raw))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(anyhow::anyhow!(
            "dgraph-host must use http or https, got '{}' in {}",
            other,
            raw
        )),
    }
}

fn validate_poll_policy(policy: &BackoffPolicy) -> Result<()> {
    if policy.initial_delay.is_zero() {
        anyhow::bail!("poll-initial-delay-ms must be greater than 0");
    }
    if policy.max_delay < policy.initial_delay {
        anyhow::bail!(
            "poll-max-delay-secs ({:?}) must not be shorter than the initial delay ({:?})",
            policy.max_delay,
            policy.initial_delay
        );
    }
    if policy.max_attempts == 0 {
        anyhow::bail!("poll-max-attempts must be at least 1");
    }
    Ok(())
}

fn minutes(count: u64) -> Option<Duration> {
    count.checked_mul(60).map(Duration::from_secs)
}
