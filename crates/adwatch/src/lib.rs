pub mod config;
pub mod db;
pub mod error;
pub mod fetcher;
pub mod logging;
pub mod service;
pub mod status;

pub use config::{load_config, load_config_or_default, Config, FetcherConfig};
pub use db::{Database, DatabaseError};
pub use error::{AdwatchError, ConfigError, FetchError, Result, ServiceError};
pub use fetcher::{parse_ads_count, FetchInvoker, FetchOutcome, FetcherDiagnostics};
pub use service::{FetchReport, FetchService};
pub use status::{
    format_job_for_display, DisplayJob, JobLookup, JobRecord, JobStatistics, JobStatus,
    JobUpdate, StatusManager,
};
