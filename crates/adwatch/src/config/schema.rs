use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    /// Job store location; `~/.adwatch/data/adwatch.db` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            database_path: None,
            fetcher: FetcherConfig::default(),
            jobs: JobsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    pub fn resolved_database_path(&self) -> Option<PathBuf> {
        self.database_path
            .clone()
            .or_else(crate::db::default_database_path)
    }
}

/// How the external fetch process is located and run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetcherConfig {
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,
    /// Program followed by its arguments.
    #[serde(default = "default_command")]
    pub command: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Files that must exist in `working_dir` before a run.
    #[serde(default = "default_required_files")]
    pub required_files: Vec<String>,
}

fn default_working_dir() -> PathBuf {
    PathBuf::from("fetcher")
}

fn default_command() -> Vec<String> {
    vec!["npm".to_string(), "run".to_string(), "start".to_string()]
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_required_files() -> Vec<String> {
    vec!["package.json".to_string()]
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            working_dir: default_working_dir(),
            command: default_command(),
            timeout_secs: default_timeout_secs(),
            required_files: default_required_files(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobsConfig {
    #[serde(default = "default_cleanup_days")]
    pub cleanup_days: u32,
    #[serde(default = "default_user_jobs_limit")]
    pub user_jobs_limit: u32,
}

fn default_cleanup_days() -> u32 {
    7
}

fn default_user_jobs_limit() -> u32 {
    10
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            cleanup_days: default_cleanup_days(),
            user_jobs_limit: default_user_jobs_limit(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
