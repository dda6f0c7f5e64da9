//! Status manager: the job store plus a write-through, read-through cache.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{Duration, Utc};
use rusqlite::Connection;

use super::display::{self, DisplayJob};
use super::record::{JobDelta, JobRecord, JobStatus, JobUpdate};
use super::stats::JobStatistics;
use crate::db::{self, competitor_repo, format_timestamp, job_repo, Database, DatabaseError};

/// Outcome of a single-job lookup that keeps "missing" and "broken" apart.
#[derive(Debug, Clone, PartialEq)]
pub enum JobLookup {
    Found(JobRecord),
    NotFound,
    StoreError(String),
}

impl JobLookup {
    pub fn into_option(self) -> Option<JobRecord> {
        match self {
            JobLookup::Found(job) => Some(job),
            JobLookup::NotFound | JobLookup::StoreError(_) => None,
        }
    }
}

/// Registers, updates, queries and expires fetch jobs.
///
/// Every store failure is logged and turned into a benign return value
/// (`false`, `None`, empty, zero). Writes that touch the cache do so while
/// still holding the connection lock; the cache lock itself is never held
/// while waiting on the connection.
pub struct StatusManager {
    db: Database,
    cache: Mutex<HashMap<String, JobRecord>>,
}

impl StatusManager {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// The underlying job store handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<String, JobRecord>> {
        match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Status cache lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Number of jobs currently mirrored in memory.
    pub fn cached_jobs(&self) -> usize {
        self.cache().len()
    }

    /// Registers a new pending job and caches it.
    pub fn register(&self, job_id: &str, user_id: &str, platform: &str) -> bool {
        match self.try_register(job_id, user_id, platform) {
            Ok(()) => {
                log::info!(
                    "Registered job {} for user {} on platform {}",
                    job_id,
                    user_id,
                    platform
                );
                true
            }
            Err(e) => {
                log::error!("Error registering job {}: {}", job_id, e);
                false
            }
        }
    }

    fn try_register(&self, job_id: &str, user_id: &str, platform: &str) -> Result<(), DatabaseError> {
        let total_competitors = competitor_repo::count_by_user(&self.db, user_id)?;
        let job = JobRecord::new_pending(job_id, user_id, platform, total_competitors, db::now());

        self.db.with_conn(|conn| {
            job_repo::insert_on(conn, &job.to_row())?;
            self.cache().insert(job_id.to_string(), job);
            Ok(())
        })
    }

    /// Moves a job to `status` and merges `fields` into it.
    ///
    /// Returns false if the store write fails, the job does not exist, or the
    /// transition is not allowed from the job's current status.
    pub fn update_job_status(&self, job_id: &str, status: JobStatus, fields: JobUpdate) -> bool {
        match self.try_update(job_id, status, fields) {
            Ok(updated) => updated,
            Err(e) => {
                log::error!("Error updating job {} to {}: {}", job_id, status, e);
                false
            }
        }
    }

    fn try_update(
        &self,
        job_id: &str,
        status: JobStatus,
        fields: JobUpdate,
    ) -> Result<bool, DatabaseError> {
        if status == JobStatus::Unknown {
            log::warn!("Refusing to set job {} to an unknown status", job_id);
            return Ok(false);
        }

        let allowed_from: Vec<&str> = status
            .allowed_predecessors()
            .iter()
            .map(|s| s.as_str())
            .collect();

        // Both steps run under the connection lock, so concurrent updates
        // reach the cache in the order they reached the store.
        let changed = self.db.with_conn(|conn| {
            let delta = JobDelta::resolve(status, fields, db::now());

            // Step 1: the store is the source of truth.
            if job_repo::apply_patch_on(conn, job_id, &delta.to_patch(), &allowed_from)? == 0 {
                return Ok(false);
            }

            // Step 2: mirror the identical delta, or read the row through.
            if !self.mirror(job_id, &delta) {
                if let Err(e) = self.reload_on(conn, job_id) {
                    log::warn!("Job {} updated but could not be cached: {}", job_id, e);
                }
            }
            Ok(true)
        })?;

        if changed {
            log::debug!("Job {} moved to {}", job_id, status);
        } else {
            log::warn!(
                "Job {} not moved to {}: job missing or transition not allowed",
                job_id,
                status
            );
        }
        Ok(changed)
    }

    /// Merges `delta` into the cached copy. Returns false when there is no
    /// cached copy or the copy could not have preceded this write; in the
    /// latter case the entry is evicted.
    fn mirror(&self, job_id: &str, delta: &JobDelta) -> bool {
        let mut cache = self.cache();
        let Some(job) = cache.get_mut(job_id) else {
            return false;
        };

        if delta.status.can_transition_from(job.status) && delta.updated_at >= job.updated_at {
            job.apply(delta);
            return true;
        }

        log::warn!(
            "Cached job {} ({}) is out of step with the store, evicting",
            job_id,
            job.status
        );
        cache.remove(job_id);
        false
    }

    /// Reads a job from the store and caches it.
    fn load_into_cache(&self, job_id: &str) -> Result<Option<JobRecord>, DatabaseError> {
        self.db.with_conn(|conn| self.reload_on(conn, job_id))
    }

    /// Replaces the cached copy with the stored row. The caller holds the
    /// connection lock, so no update can land between the read and the insert.
    fn reload_on(&self, conn: &Connection, job_id: &str) -> Result<Option<JobRecord>, DatabaseError> {
        let job = match job_repo::find_by_id_on(conn, job_id)? {
            Some(row) => JobRecord::from_row(&row)?,
            None => {
                self.cache().remove(job_id);
                return Ok(None);
            }
        };
        self.cache().insert(job_id.to_string(), job.clone());
        Ok(Some(job))
    }

    /// Looks a job up, cache first, distinguishing not-found from store errors.
    pub fn lookup_job(&self, job_id: &str) -> JobLookup {
        if let Some(job) = self.cache().get(job_id) {
            return JobLookup::Found(job.clone());
        }

        match self.load_into_cache(job_id) {
            Ok(Some(job)) => JobLookup::Found(job),
            Ok(None) => JobLookup::NotFound,
            Err(e) => {
                log::error!("Error getting status of job {}: {}", job_id, e);
                JobLookup::StoreError(e.to_string())
            }
        }
    }

    /// Returns a copy of the job's current record, or `None`.
    pub fn get_job_status(&self, job_id: &str) -> Option<JobRecord> {
        self.lookup_job(job_id).into_option()
    }

    /// Returns a user's most recent jobs straight from the store.
    pub fn get_user_jobs(&self, user_id: &str, limit: u32) -> Vec<JobRecord> {
        let result = job_repo::list_by_user(&self.db, user_id, limit).and_then(|rows| {
            rows.iter()
                .map(JobRecord::from_row)
                .collect::<Result<Vec<_>, _>>()
        });

        match result {
            Ok(jobs) => jobs,
            Err(e) => {
                log::error!("Error getting jobs for user {}: {}", user_id, e);
                Vec::new()
            }
        }
    }

    /// Deletes jobs created more than `days_old` days ago from store and cache.
    ///
    /// Returns the number of rows the store deleted.
    pub fn cleanup_old_jobs(&self, days_old: u32) -> u64 {
        let cutoff = match Duration::try_days(i64::from(days_old))
            .and_then(|age| Utc::now().checked_sub_signed(age))
        {
            Some(cutoff) => cutoff,
            None => {
                log::debug!("No job can be older than {} days, nothing to clean up", days_old);
                return 0;
            }
        };

        let result = self.db.with_conn(|conn| {
            let deleted = job_repo::delete_created_before_on(conn, &format_timestamp(cutoff))?;
            let mut cache = self.cache();
            let before = cache.len();
            cache.retain(|_, job| job.created_at > cutoff);
            Ok((deleted as u64, before - cache.len()))
        });

        match result {
            Ok((deleted, evicted)) => {
                log::info!(
                    "Cleaned up {} jobs older than {} days ({} evicted from cache)",
                    deleted,
                    days_old,
                    evicted
                );
                deleted
            }
            Err(e) => {
                log::error!("Error cleaning up old jobs: {}", e);
                0
            }
        }
    }

    /// Aggregates all jobs, optionally for a single user.
    pub fn get_job_statistics(&self, user_id: Option<&str>) -> JobStatistics {
        let result = job_repo::list_all(&self.db, user_id).and_then(|rows| {
            rows.iter()
                .map(JobRecord::from_row)
                .collect::<Result<Vec<_>, _>>()
        });

        match result {
            Ok(jobs) => JobStatistics::from_jobs(&jobs),
            Err(e) => {
                log::error!("Error getting job statistics: {}", e);
                JobStatistics::default()
            }
        }
    }

    /// True if a running job matches the filters; no filters checks system-wide.
    pub fn is_job_running(&self, user_id: Option<&str>, job_id: Option<&str>) -> bool {
        match job_repo::exists_with_status(&self.db, JobStatus::Running.as_str(), user_id, job_id) {
            Ok(running) => running,
            Err(e) => {
                log::error!("Error checking for running jobs: {}", e);
                false
            }
        }
    }

    /// Presentation copy of a job. Pure; see [`display::format_job_for_display`].
    pub fn format_job_for_display(&self, job: &JobRecord) -> DisplayJob {
        display::format_job_for_display(job)
    }
}
