//! Presentation copies of job records.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::record::{JobRecord, JobStatus};

const TIMESTAMP_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const SECONDS_PER_COMPETITOR: i64 = 30;
const MAX_ESTIMATED_SECONDS: i64 = 300;
const MAX_RUNNING_PROGRESS: f64 = 90.0;

/// A job record augmented with display fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayJob {
    #[serde(flatten)]
    pub job: JobRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i64>,
    pub status_icon: &'static str,
    pub duration_formatted: String,
    pub progress: f64,
    pub start_time_formatted: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time_formatted: Option<String>,
    pub created_at_formatted: String,
    pub updated_at_formatted: String,
}

/// Formats a job for display as of the current time.
pub fn format_job_for_display(job: &JobRecord) -> DisplayJob {
    format_job_for_display_at(job, Utc::now())
}

/// Formats a job for display as of `now`.
pub fn format_job_for_display_at(job: &JobRecord, now: DateTime<Utc>) -> DisplayJob {
    let duration_seconds = job.duration_seconds();

    DisplayJob {
        job: job.clone(),
        duration_seconds,
        status_icon: status_icon(job.status),
        duration_formatted: duration_seconds
            .map(format_duration)
            .unwrap_or_else(|| "N/A".to_string()),
        progress: progress(job, now),
        start_time_formatted: format_time(job.start_time),
        end_time_formatted: job.end_time.map(format_time),
        created_at_formatted: format_time(job.created_at),
        updated_at_formatted: format_time(job.updated_at),
    }
}

pub fn status_icon(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Completed => "✅",
        JobStatus::Running => "🔄",
        JobStatus::Failed => "❌",
        JobStatus::Pending => "⏳",
        JobStatus::Unknown => "❓",
    }
}

/// `"Ns"` under a minute, `"Mm Ss"` under an hour, `"Hh Mm"` beyond.
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}

/// Percent complete. Running jobs get a time-based estimate capped at 90.
pub fn progress(job: &JobRecord, now: DateTime<Utc>) -> f64 {
    match job.status {
        JobStatus::Completed => 100.0,
        JobStatus::Failed | JobStatus::Pending | JobStatus::Unknown => 0.0,
        JobStatus::Running => {
            let estimated_total =
                job.total_competitors
                    .saturating_mul(SECONDS_PER_COMPETITOR)
                    .min(MAX_ESTIMATED_SECONDS);
            if estimated_total <= 0 {
                return 50.0;
            }
            let elapsed = ((now - job.start_time).num_milliseconds() as f64 / 1000.0).max(0.0);
            let estimate = (elapsed / estimated_total as f64 * 100.0).min(MAX_RUNNING_PROGRESS);
            (estimate * 10.0).round() / 10.0
        }
    }
}

fn format_time(dt: DateTime<Utc>) -> String {
    dt.format(TIMESTAMP_DISPLAY_FORMAT).to_string()
}
