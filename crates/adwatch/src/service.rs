//! One fetch job end to end: register, run the fetcher, record the outcome.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::fetcher::FetchInvoker;
use crate::status::{JobStatus, JobUpdate, StatusManager};

/// What a caller gets back from [`FetchService::start_fetch`].
#[derive(Debug, Clone, Serialize)]
pub struct FetchReport {
    pub job_id: String,
    pub success: bool,
    pub ads_fetched: i64,
    pub logs: String,
}

pub struct FetchService {
    status: Arc<StatusManager>,
    invoker: FetchInvoker,
}

impl FetchService {
    pub fn new(status: Arc<StatusManager>, invoker: FetchInvoker) -> Self {
        Self { status, invoker }
    }

    pub fn status(&self) -> &Arc<StatusManager> {
        &self.status
    }

    /// Runs a fetch for `user_id`, refusing if that user already has one running.
    pub async fn start_fetch(
        &self,
        user_id: &str,
        platform: &str,
    ) -> Result<FetchReport, ServiceError> {
        if self.status.is_job_running(Some(user_id), None) {
            return Err(ServiceError::AlreadyRunning {
                user_id: user_id.to_string(),
            });
        }

        let job_id = Uuid::new_v4().to_string();
        if !self.status.register(&job_id, user_id, platform) {
            return Err(ServiceError::Registration { job_id });
        }

        Ok(self.run_job(&job_id, user_id, platform).await)
    }

    async fn run_job(&self, job_id: &str, user_id: &str, platform: &str) -> FetchReport {
        if !self
            .status
            .update_job_status(job_id, JobStatus::Running, JobUpdate::default())
        {
            tracing::warn!(job_id, "Job could not be marked running");
        }

        let outcome = self.invoker.run_for_user(user_id, platform).await;

        let (status, ads_fetched) = if outcome.success {
            (JobStatus::Completed, outcome.ads_fetched)
        } else {
            (JobStatus::Failed, 0)
        };

        if !self
            .status
            .update_job_status(job_id, status, JobUpdate::ads_fetched(ads_fetched))
        {
            tracing::warn!(job_id, %status, "Final job status was not recorded");
        }

        tracing::info!(job_id, user_id, %status, ads_fetched, "Fetch job finished");

        FetchReport {
            job_id: job_id.to_string(),
            success: outcome.success,
            ads_fetched,
            logs: outcome.logs,
        }
    }
}
