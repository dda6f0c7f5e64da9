//! Aggregate job statistics.

use serde::Serialize;

use super::record::{JobRecord, JobStatus};

/// Summary over a set of jobs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JobStatistics {
    pub total_jobs: u64,
    pub pending: u64,
    pub running: u64,
    pub completed: u64,
    pub failed: u64,
    pub total_ads_fetched: i64,
    pub total_duration_seconds: i64,
    /// Mean over jobs with a known duration; 0 when there are none.
    pub avg_duration_seconds: f64,
}

impl JobStatistics {
    pub fn from_jobs(jobs: &[JobRecord]) -> Self {
        let mut stats = Self {
            total_jobs: jobs.len() as u64,
            ..Default::default()
        };
        let mut timed_jobs = 0u64;

        for job in jobs {
            match job.status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Running => stats.running += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
                JobStatus::Unknown => {}
            }

            stats.total_ads_fetched += job.ads_fetched;

            if let Some(duration) = job.duration_seconds() {
                stats.total_duration_seconds += duration;
                timed_jobs += 1;
            }
        }

        if timed_jobs > 0 {
            stats.avg_duration_seconds = stats.total_duration_seconds as f64 / timed_jobs as f64;
        }

        stats
    }
}
