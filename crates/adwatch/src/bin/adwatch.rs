use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;

use adwatch::config::default_config_path;
use adwatch::logging::init_logging;
use adwatch::{
    load_config_or_default, AdwatchError, Config, ConfigError, Database, FetchInvoker,
    FetchService, JobLookup, StatusManager,
};

#[derive(Parser, Debug)]
#[command(
    name = "adwatch",
    version,
    about = "Run competitor ads fetches and track their job status"
)]
struct Cli {
    /// Path to configuration file (defaults to ~/.adwatch/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the fetcher for a user and record the job
    Fetch {
        user_id: String,
        #[arg(long, default_value = "all")]
        platform: String,
    },
    /// Show one job
    Status { job_id: String },
    /// List a user's most recent jobs
    Jobs {
        user_id: String,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Aggregate job statistics
    Stats {
        #[arg(long)]
        user: Option<String>,
    },
    /// Check whether a matching job is running
    Running {
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        job: Option<String>,
    },
    /// Delete jobs older than the given number of days
    Cleanup {
        #[arg(long)]
        days: Option<u32>,
    },
    /// Report on the fetcher environment
    CheckEnv,
}

#[derive(Serialize)]
struct RunningReport {
    running: bool,
}

#[derive(Serialize)]
struct CleanupReport {
    deleted: u64,
    days: u32,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<Config, ConfigError> {
    match path.or_else(default_config_path) {
        Some(path) => load_config_or_default(path),
        None => Ok(Config::default()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AdwatchError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Returns whether the command itself succeeded.
async fn run(cli: Cli) -> Result<bool, AdwatchError> {
    let config = load_config(cli.config)?;
    init_logging(&config.logging)?;

    let invoker = FetchInvoker::new(config.fetcher.clone());
    if let Command::CheckEnv = cli.command {
        let diagnostics = invoker.diagnostics().await;
        print_json(&diagnostics)?;
        return Ok(diagnostics.environment_ok);
    }

    let db = match config.resolved_database_path() {
        Some(path) => Database::open(&path)?,
        None => {
            tracing::warn!("No home directory; using an in-memory job store");
            Database::open_in_memory()?
        }
    };
    let status = Arc::new(StatusManager::new(db));

    match cli.command {
        Command::Fetch { user_id, platform } => {
            let service = FetchService::new(Arc::clone(&status), invoker);
            let report = service.start_fetch(&user_id, &platform).await?;
            print_json(&report)?;
            Ok(report.success)
        }
        Command::Status { job_id } => match status.lookup_job(&job_id) {
            JobLookup::Found(job) => {
                print_json(&status.format_job_for_display(&job))?;
                Ok(true)
            }
            JobLookup::NotFound => Err(AdwatchError::JobNotFound(job_id)),
            JobLookup::StoreError(reason) => Err(AdwatchError::JobLookup { job_id, reason }),
        },
        Command::Jobs { user_id, limit } => {
            let limit = limit.unwrap_or(config.jobs.user_jobs_limit);
            let jobs: Vec<_> = status
                .get_user_jobs(&user_id, limit)
                .iter()
                .map(|job| status.format_job_for_display(job))
                .collect();
            print_json(&jobs)?;
            Ok(true)
        }
        Command::Stats { user } => {
            print_json(&status.get_job_statistics(user.as_deref()))?;
            Ok(true)
        }
        Command::Running { user, job } => {
            let running = status.is_job_running(user.as_deref(), job.as_deref());
            print_json(&RunningReport { running })?;
            Ok(true)
        }
        Command::Cleanup { days } => {
            let days = days.unwrap_or(config.jobs.cleanup_days);
            let deleted = status.cleanup_old_jobs(days);
            print_json(&CleanupReport { deleted, days })?;
            Ok(true)
        }
        Command::CheckEnv => Ok(true),
    }
}
