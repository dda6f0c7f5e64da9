//! Typed job records and the deltas that mutate them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::job_repo::{JobRow, JobRowPatch};
use crate::db::{format_timestamp, parse_timestamp, DatabaseError};

/// Lifecycle status of a fetch job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    /// A status string this build does not recognize.
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Unknown => "unknown",
        }
    }

    /// Parses a stored status, mapping unrecognized values to `Unknown`.
    pub fn parse(s: &str, job_id: &str) -> Self {
        match s {
            "pending" => JobStatus::Pending,
            "running" => JobStatus::Running,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            other => {
                log::warn!("Unknown job status '{}' for job {}", other, job_id);
                JobStatus::Unknown
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Statuses a job may currently hold for a move to `self` to be legal.
    ///
    /// Status only moves forward and never leaves a terminal state. Re-asserting
    /// the current status is allowed so fields can be updated in place.
    pub fn allowed_predecessors(&self) -> &'static [JobStatus] {
        match self {
            JobStatus::Pending => &[JobStatus::Pending],
            JobStatus::Running => &[JobStatus::Pending, JobStatus::Running],
            JobStatus::Completed => &[JobStatus::Pending, JobStatus::Running, JobStatus::Completed],
            JobStatus::Failed => &[JobStatus::Pending, JobStatus::Running, JobStatus::Failed],
            JobStatus::Unknown => &[],
        }
    }

    pub fn can_transition_from(&self, current: JobStatus) -> bool {
        self.allowed_predecessors().contains(&current)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status '{}'", other)),
        }
    }
}

/// One fetch job's lifecycle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub user_id: String,
    pub status: JobStatus,
    pub platform: String,
    pub total_competitors: i64,
    pub ads_fetched: i64,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// A freshly registered job: pending, nothing fetched, all timestamps `now`.
    pub fn new_pending(
        job_id: &str,
        user_id: &str,
        platform: &str,
        total_competitors: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            job_id: job_id.to_string(),
            user_id: user_id.to_string(),
            status: JobStatus::Pending,
            platform: platform.to_string(),
            total_competitors,
            ads_fetched: 0,
            start_time: now,
            end_time: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builds a record from a stored row, parsing every timestamp once.
    pub fn from_row(row: &JobRow) -> Result<Self, DatabaseError> {
        Ok(Self {
            job_id: row.job_id.clone(),
            user_id: row.user_id.clone(),
            status: JobStatus::parse(&row.status, &row.job_id),
            platform: row.platform.clone(),
            total_competitors: row.total_competitors,
            ads_fetched: row.ads_fetched,
            start_time: parse_timestamp("start_time", &row.start_time)?,
            end_time: row
                .end_time
                .as_deref()
                .map(|s| parse_timestamp("end_time", s))
                .transpose()?,
            created_at: parse_timestamp("created_at", &row.created_at)?,
            updated_at: parse_timestamp("updated_at", &row.updated_at)?,
        })
    }

    pub fn to_row(&self) -> JobRow {
        JobRow {
            job_id: self.job_id.clone(),
            user_id: self.user_id.clone(),
            status: self.status.as_str().to_string(),
            platform: self.platform.clone(),
            total_competitors: self.total_competitors,
            ads_fetched: self.ads_fetched,
            start_time: format_timestamp(self.start_time),
            end_time: self.end_time.map(format_timestamp),
            created_at: format_timestamp(self.created_at),
            updated_at: format_timestamp(self.updated_at),
        }
    }

    /// Whole seconds between start and end, when the job has ended.
    pub fn duration_seconds(&self) -> Option<i64> {
        self.end_time
            .map(|end| (end - self.start_time).num_seconds())
    }

    /// Merges a resolved delta into this record.
    pub fn apply(&mut self, delta: &JobDelta) {
        self.status = delta.status;
        self.updated_at = delta.updated_at;
        if let Some(ref platform) = delta.fields.platform {
            self.platform = platform.clone();
        }
        if let Some(total) = delta.fields.total_competitors {
            self.total_competitors = total;
        }
        if let Some(ads) = delta.fields.ads_fetched {
            self.ads_fetched = ads;
        }
        if let Some(start) = delta.fields.start_time {
            self.start_time = start;
        }
        if let Some(end) = delta.fields.end_time {
            self.end_time = Some(end);
        }
    }
}

/// Caller-supplied fields for a status update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub platform: Option<String>,
    pub total_competitors: Option<i64>,
    pub ads_fetched: Option<i64>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl JobUpdate {
    pub fn ads_fetched(count: i64) -> Self {
        Self {
            ads_fetched: Some(count),
            ..Default::default()
        }
    }
}

/// The full change written to the store and then mirrored into the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct JobDelta {
    pub status: JobStatus,
    pub updated_at: DateTime<Utc>,
    pub fields: JobUpdate,
}

impl JobDelta {
    /// Resolves a status update at `now`: stamps `updated_at` and fills in
    /// `end_time` for terminal statuses that did not supply one.
    pub fn resolve(status: JobStatus, mut fields: JobUpdate, now: DateTime<Utc>) -> Self {
        if status.is_terminal() && fields.end_time.is_none() {
            fields.end_time = Some(now);
        }
        Self {
            status,
            updated_at: now,
            fields,
        }
    }

    pub fn to_patch(&self) -> JobRowPatch {
        JobRowPatch {
            status: self.status.as_str().to_string(),
            updated_at: format_timestamp(self.updated_at),
            platform: self.fields.platform.clone(),
            total_competitors: self.fields.total_competitors,
            ads_fetched: self.fields.ads_fetched,
            start_time: self.fields.start_time.map(format_timestamp),
            end_time: self.fields.end_time.map(format_timestamp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_transitions_only_move_forward() {
        use JobStatus::*;
        assert!(Running.can_transition_from(Pending));
        assert!(Completed.can_transition_from(Running));
        assert!(Failed.can_transition_from(Running));
        assert!(Completed.can_transition_from(Pending));
        assert!(Running.can_transition_from(Running));

        assert!(!Pending.can_transition_from(Running));
        assert!(!Running.can_transition_from(Completed));
        assert!(!Failed.can_transition_from(Completed));
        assert!(!Completed.can_transition_from(Failed));
        assert!(!Unknown.can_transition_from(Pending));
    }

    #[test]
    fn test_parse_unknown_status() {
        assert_eq!(JobStatus::parse("running", "j"), JobStatus::Running);
        assert_eq!(JobStatus::parse("exploded", "j"), JobStatus::Unknown);
        assert!("exploded".parse::<JobStatus>().is_err());
        assert_eq!("failed".parse::<JobStatus>().unwrap(), JobStatus::Failed);
    }

    #[test]
    fn test_row_conversion_preserves_fields() {
        let mut job = JobRecord::new_pending("j1", "u1", "meta", 4, t0());
        job.end_time = Some(t0() + Duration::seconds(95));
        let back = JobRecord::from_row(&job.to_row()).unwrap();
        assert_eq!(back, job);
    }

    #[test]
    fn test_from_row_rejects_malformed_timestamp() {
        let mut row = JobRecord::new_pending("j1", "u1", "all", 0, t0()).to_row();
        row.created_at = "not a date".to_string();
        assert!(matches!(
            JobRecord::from_row(&row),
            Err(DatabaseError::MalformedTimestamp { field: "created_at", .. })
        ));
    }

    #[test]
    fn test_duration_requires_end_time() {
        let mut job = JobRecord::new_pending("j1", "u1", "all", 0, t0());
        assert_eq!(job.duration_seconds(), None);
        job.end_time = Some(t0() + Duration::seconds(125));
        assert_eq!(job.duration_seconds(), Some(125));
    }

    #[test]
    fn test_resolve_sets_end_time_for_terminal() {
        let now = t0() + Duration::minutes(2);
        let delta = JobDelta::resolve(JobStatus::Completed, JobUpdate::ads_fetched(42), now);
        assert_eq!(delta.fields.end_time, Some(now));
        assert_eq!(delta.updated_at, now);

        let explicit = t0() + Duration::minutes(1);
        let delta = JobDelta::resolve(
            JobStatus::Failed,
            JobUpdate {
                end_time: Some(explicit),
                ..Default::default()
            },
            now,
        );
        assert_eq!(delta.fields.end_time, Some(explicit));

        let delta = JobDelta::resolve(JobStatus::Running, JobUpdate::default(), now);
        assert_eq!(delta.fields.end_time, None);
    }

    #[test]
    fn test_apply_merges_only_supplied_fields() {
        let mut job = JobRecord::new_pending("j1", "u1", "all", 3, t0());
        let now = t0() + Duration::seconds(30);
        job.apply(&JobDelta::resolve(JobStatus::Running, JobUpdate::ads_fetched(5), now));

        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.ads_fetched, 5);
        assert_eq!(job.total_competitors, 3);
        assert_eq!(job.platform, "all");
        assert_eq!(job.updated_at, now);
        assert_eq!(job.end_time, None);
    }

    #[test]
    fn test_serialized_record_omits_missing_end_time() {
        let job = JobRecord::new_pending("j1", "u1", "all", 0, t0());
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["status"], "pending");
        assert!(value.get("end_time").is_none());
    }
}
