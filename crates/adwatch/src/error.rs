use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdwatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Could not read job {job_id}: {reason}")]
    JobLookup { job_id: String, reason: String },

    #[error("Failed to serialize output: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Fetcher directory not found: {0}")]
    MissingDirectory(PathBuf),

    #[error("Required file not found: {0}")]
    MissingFile(PathBuf),

    #[error("Fetch command is empty")]
    EmptyCommand,

    #[error("Program '{0}' is not installed or not on PATH")]
    ToolUnavailable(String),

    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Ads fetching timed out after {secs} seconds")]
    Timeout { secs: u64 },

    #[error("Error running ads fetcher: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("A fetch job is already running for user {user_id}")]
    AlreadyRunning { user_id: String },

    #[error("Failed to register job {job_id}")]
    Registration { job_id: String },
}

pub type Result<T> = std::result::Result<T, AdwatchError>;
