//! Runs the external ads fetcher as a child process.
//!
//! The fetcher receives its scope through environment variables (`USER_ID`,
//! `PLATFORM`) and reports progress as free text. Only a typed count leaves
//! this module.

pub mod parse;

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::process::Command;

use crate::config::FetcherConfig;
use crate::error::FetchError;

pub use parse::parse_ads_count;

const VERSION_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of one fetcher run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchOutcome {
    pub success: bool,
    pub logs: String,
    pub ads_fetched: i64,
}

impl FetchOutcome {
    fn failed(message: String) -> Self {
        Self {
            success: false,
            logs: message,
            ads_fetched: 0,
        }
    }
}

/// Environment report for operators.
#[derive(Debug, Clone, Serialize)]
pub struct FetcherDiagnostics {
    pub environment_ok: bool,
    pub environment_message: String,
    pub program: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_version: Option<String>,
    pub command: String,
    pub working_dir: PathBuf,
    pub working_dir_exists: bool,
    pub missing_files: Vec<String>,
    pub timeout_secs: u64,
    pub timestamp: DateTime<Utc>,
}

/// Invokes the configured fetch command once per job.
#[derive(Debug, Clone)]
pub struct FetchInvoker {
    config: FetcherConfig,
}

impl FetchInvoker {
    pub fn new(config: FetcherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    fn program(&self) -> Result<&str, FetchError> {
        match self.config.command.first() {
            Some(program) if !program.trim().is_empty() => Ok(program),
            _ => Err(FetchError::EmptyCommand),
        }
    }

    /// Checks the working directory, required files and that the program resolves.
    pub fn verify_environment(&self) -> Result<(), FetchError> {
        let dir = &self.config.working_dir;
        if !dir.is_dir() {
            return Err(FetchError::MissingDirectory(dir.clone()));
        }

        for file in &self.config.required_files {
            let path = dir.join(file);
            if !path.exists() {
                return Err(FetchError::MissingFile(path));
            }
        }

        let program = self.program()?;
        if !program_available(program, dir) {
            return Err(FetchError::ToolUnavailable(program.to_string()));
        }

        Ok(())
    }

    /// Runs the fetcher for one user and platform scope.
    ///
    /// Never fails outright: environment problems, spawn errors and timeouts
    /// all come back as an unsuccessful outcome with the reason as its log.
    pub async fn run_for_user(&self, user_id: &str, platform: &str) -> FetchOutcome {
        tracing::info!(user_id, platform, "Starting ads fetch");

        if let Err(e) = self.verify_environment() {
            tracing::warn!(user_id, error = %e, "Fetcher environment check failed");
            return FetchOutcome::failed(format!("Environment check failed: {}", e));
        }

        let started_at = Utc::now();
        let clock = Instant::now();

        let output = match self.execute(user_id, platform).await {
            Ok(output) => output,
            Err(e) => {
                tracing::error!(user_id, error = %e, "Ads fetch did not complete");
                return FetchOutcome::failed(e.to_string());
            }
        };

        let elapsed = clock.elapsed().as_secs_f64();
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let exit_code = output
            .status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "terminated by signal".to_string());

        let mut logs = String::from("=== Ads Fetching Results ===\n");
        logs.push_str(&format!("User ID: {}\n", user_id));
        logs.push_str(&format!("Platform: {}\n", platform));
        logs.push_str(&format!("Start Time: {}\n", started_at.to_rfc3339()));
        logs.push_str(&format!("Elapsed Time: {:.2} seconds\n", elapsed));
        logs.push_str(&format!("Return Code: {}\n", exit_code));
        logs.push_str(&format!("\n=== STDOUT ===\n{}\n", stdout));
        if !stderr.is_empty() {
            logs.push_str(&format!("\n=== STDERR ===\n{}\n", stderr));
        }

        let success = output.status.success();
        let ads_fetched = if success {
            parse_ads_count(&format!("{}{}", stdout, stderr))
        } else {
            0
        };

        tracing::info!(
            user_id,
            success,
            ads_fetched,
            elapsed_secs = elapsed,
            "Ads fetch finished"
        );

        FetchOutcome {
            success,
            logs,
            ads_fetched,
        }
    }

    async fn execute(&self, user_id: &str, platform: &str) -> Result<std::process::Output, FetchError> {
        let program = self.program()?;
        let args = &self.config.command[1..];

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(&self.config.working_dir)
            .env("USER_ID", user_id)
            .env("PLATFORM", platform)
            .env("ADWATCH_CALL", "true")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(command = %self.config.command.join(" "), "Spawning fetcher");

        let child = cmd.spawn().map_err(|e| FetchError::Spawn {
            program: program.to_string(),
            source: e,
        })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let secs = self.config.timeout_secs;
        match tokio::time::timeout(Duration::from_secs(secs), child.wait_with_output()).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(FetchError::Timeout { secs }),
        }
    }

    /// Collects an environment report, probing `<program> --version`.
    pub async fn diagnostics(&self) -> FetcherDiagnostics {
        let (environment_ok, environment_message) = match self.verify_environment() {
            Ok(()) => (true, "Environment verification passed".to_string()),
            Err(e) => (false, e.to_string()),
        };

        let program = self.config.command.first().cloned().unwrap_or_default();
        let program_version = if program.is_empty() {
            None
        } else {
            probe_version(&program).await
        };

        let missing_files = self
            .config
            .required_files
            .iter()
            .filter(|f| !self.config.working_dir.join(f).exists())
            .cloned()
            .collect();

        FetcherDiagnostics {
            environment_ok,
            environment_message,
            program,
            program_version,
            command: self.config.command.join(" "),
            working_dir: self.config.working_dir.clone(),
            working_dir_exists: self.config.working_dir.is_dir(),
            missing_files,
            timeout_secs: self.config.timeout_secs,
            timestamp: Utc::now(),
        }
    }
}

/// Paths are checked directly (relative ones against `working_dir`);
/// bare names are searched for on `PATH`.
fn program_available(program: &str, working_dir: &Path) -> bool {
    let as_path = Path::new(program);
    if as_path.components().count() > 1 {
        return working_dir.join(as_path).is_file();
    }

    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}

async fn probe_version(program: &str) -> Option<String> {
    let mut cmd = Command::new(program);
    cmd.arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    let output = tokio::time::timeout(VERSION_PROBE_TIMEOUT, cmd.output())
        .await
        .ok()?
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!version.is_empty()).then_some(version)
}
