//! Row-level access to the `ads_fetch_jobs` table.

use rusqlite::{params, Connection, Row};

use super::{Database, DatabaseError};

/// A raw job row from the database.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRow {
    pub job_id: String,
    pub user_id: String,
    pub status: String,
    pub platform: String,
    pub total_competitors: i64,
    pub ads_fetched: i64,
    pub start_time: String,
    pub end_time: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            job_id: row.get("job_id")?,
            user_id: row.get("user_id")?,
            status: row.get("status")?,
            platform: row.get("platform")?,
            total_competitors: row.get("total_competitors")?,
            ads_fetched: row.get("ads_fetched")?,
            start_time: row.get("start_time")?,
            end_time: row.get("end_time")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Partial update of a job row.
///
/// `status` and `updated_at` are always written; `None` fields are left as stored.
#[derive(Debug, Clone, Default)]
pub struct JobRowPatch {
    pub status: String,
    pub updated_at: String,
    pub platform: Option<String>,
    pub total_competitors: Option<i64>,
    pub ads_fetched: Option<i64>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

/// Inserts a new job row. Fails on a duplicate `job_id`.
pub fn insert(db: &Database, job: &JobRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| insert_on(conn, job))
}

/// [`insert`] on an already locked connection.
pub fn insert_on(conn: &Connection, job: &JobRow) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO ads_fetch_jobs (job_id, user_id, status, platform, total_competitors,
         ads_fetched, start_time, end_time, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            job.job_id,
            job.user_id,
            job.status,
            job.platform,
            job.total_competitors,
            job.ads_fetched,
            job.start_time,
            job.end_time,
            job.created_at,
            job.updated_at,
        ],
    )?;
    Ok(())
}

/// Merges `patch` into the row for `job_id`, but only while the stored status
/// is one of `allowed_from`.
///
/// Returns the number of rows changed (0 when the job is missing or its
/// current status is not in `allowed_from`).
pub fn apply_patch(
    db: &Database,
    job_id: &str,
    patch: &JobRowPatch,
    allowed_from: &[&str],
) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| apply_patch_on(conn, job_id, patch, allowed_from))
}

/// [`apply_patch`] on an already locked connection.
pub fn apply_patch_on(
    conn: &Connection,
    job_id: &str,
    patch: &JobRowPatch,
    allowed_from: &[&str],
) -> Result<usize, DatabaseError> {
    if allowed_from.is_empty() {
        return Ok(0);
    }

    let mut assignments = Vec::new();
    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    param_values.push(Box::new(job_id.to_string()));

    assignments.push(format!("status = ?{}", param_values.len() + 1));
    param_values.push(Box::new(patch.status.clone()));
    assignments.push(format!("updated_at = ?{}", param_values.len() + 1));
    param_values.push(Box::new(patch.updated_at.clone()));

    if let Some(ref platform) = patch.platform {
        assignments.push(format!("platform = ?{}", param_values.len() + 1));
        param_values.push(Box::new(platform.clone()));
    }
    if let Some(total) = patch.total_competitors {
        assignments.push(format!("total_competitors = ?{}", param_values.len() + 1));
        param_values.push(Box::new(total));
    }
    if let Some(ads) = patch.ads_fetched {
        assignments.push(format!("ads_fetched = ?{}", param_values.len() + 1));
        param_values.push(Box::new(ads));
    }
    if let Some(ref start) = patch.start_time {
        assignments.push(format!("start_time = ?{}", param_values.len() + 1));
        param_values.push(Box::new(start.clone()));
    }
    if let Some(ref end) = patch.end_time {
        assignments.push(format!("end_time = ?{}", param_values.len() + 1));
        param_values.push(Box::new(end.clone()));
    }

    let mut placeholders = Vec::new();
    for status in allowed_from {
        placeholders.push(format!("?{}", param_values.len() + 1));
        param_values.push(Box::new(status.to_string()));
    }

    let sql = format!(
        "UPDATE ads_fetch_jobs SET {} WHERE job_id = ?1 AND status IN ({})",
        assignments.join(", "),
        placeholders.join(", ")
    );

    let params_ref: Vec<&dyn rusqlite::types::ToSql> =
        param_values.iter().map(|p| p.as_ref()).collect();
    let changed = conn.execute(&sql, params_ref.as_slice())?;
    Ok(changed)
}

/// Finds a job by its ID.
pub fn find_by_id(db: &Database, job_id: &str) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| find_by_id_on(conn, job_id))
}

/// [`find_by_id`] on an already locked connection.
pub fn find_by_id_on(conn: &Connection, job_id: &str) -> Result<Option<JobRow>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM ads_fetch_jobs WHERE job_id = ?1")?;
    let mut rows = stmt.query_map(params![job_id], JobRow::from_row)?;
    match rows.next() {
        Some(Ok(row)) => Ok(Some(row)),
        Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
        None => Ok(None),
    }
}

/// Lists a user's jobs, newest first, bounded by `limit`.
pub fn list_by_user(
    db: &Database,
    user_id: &str,
    limit: u32,
) -> Result<Vec<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM ads_fetch_jobs WHERE user_id = ?1
             ORDER BY created_at DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![user_id, limit], JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Lists every job, optionally restricted to one user.
pub fn list_all(db: &Database, user_id: Option<&str>) -> Result<Vec<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let rows = match user_id {
            Some(user_id) => {
                let mut stmt = conn.prepare("SELECT * FROM ads_fetch_jobs WHERE user_id = ?1")?;
                let rows = stmt
                    .query_map(params![user_id], JobRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare("SELECT * FROM ads_fetch_jobs")?;
                let rows = stmt
                    .query_map([], JobRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(rows)
    })
}

/// Deletes every job created at or before `cutoff`. Returns the deleted count.
pub fn delete_created_before(db: &Database, cutoff: &str) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| delete_created_before_on(conn, cutoff))
}

/// [`delete_created_before`] on an already locked connection.
pub fn delete_created_before_on(conn: &Connection, cutoff: &str) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM ads_fetch_jobs WHERE created_at <= ?1",
        params![cutoff],
    )?;
    Ok(deleted)
}

/// Returns true if any job with `status` matches the optional filters.
pub fn exists_with_status(
    db: &Database,
    status: &str,
    user_id: Option<&str>,
    job_id: Option<&str>,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let mut conditions = vec!["status = ?1".to_string()];
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> =
            vec![Box::new(status.to_string())];

        if let Some(user_id) = user_id {
            conditions.push(format!("user_id = ?{}", param_values.len() + 1));
            param_values.push(Box::new(user_id.to_string()));
        }
        if let Some(job_id) = job_id {
            conditions.push(format!("job_id = ?{}", param_values.len() + 1));
            param_values.push(Box::new(job_id.to_string()));
        }

        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM ads_fetch_jobs WHERE {})",
            conditions.join(" AND ")
        );
        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let exists: bool = conn.query_row(&sql, params_ref.as_slice(), |r| r.get(0))?;
        Ok(exists)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn sample_job(job_id: &str) -> JobRow {
        JobRow {
            job_id: job_id.to_string(),
            user_id: "u1".to_string(),
            status: "pending".to_string(),
            platform: "all".to_string(),
            total_competitors: 3,
            ads_fetched: 0,
            start_time: "2026-01-01T00:00:00.000000Z".to_string(),
            end_time: None,
            created_at: "2026-01-01T00:00:00.000000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000000Z".to_string(),
        }
    }

    fn patch(status: &str) -> JobRowPatch {
        JobRowPatch {
            status: status.to_string(),
            updated_at: "2026-01-01T00:05:00.000000Z".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_insert_and_find() {
        let db = test_db();
        insert(&db, &sample_job("job-1")).unwrap();

        let found = find_by_id(&db, "job-1").unwrap().unwrap();
        assert_eq!(found, sample_job("job-1"));
    }

    #[test]
    fn test_insert_duplicate_fails() {
        let db = test_db();
        insert(&db, &sample_job("dup")).unwrap();
        assert!(insert(&db, &sample_job("dup")).is_err());
    }

    #[test]
    fn test_find_nonexistent() {
        let db = test_db();
        assert!(find_by_id(&db, "nonexistent").unwrap().is_none());
    }

    #[test]
    fn test_apply_patch_merges_fields() {
        let db = test_db();
        insert(&db, &sample_job("m1")).unwrap();

        let mut p = patch("running");
        p.ads_fetched = Some(7);
        let changed = apply_patch(&db, "m1", &p, &["pending", "running"]).unwrap();
        assert_eq!(changed, 1);

        let found = find_by_id(&db, "m1").unwrap().unwrap();
        assert_eq!(found.status, "running");
        assert_eq!(found.ads_fetched, 7);
        assert_eq!(found.updated_at, "2026-01-01T00:05:00.000000Z");
        // Untouched fields keep their stored values.
        assert_eq!(found.platform, "all");
        assert_eq!(found.total_competitors, 3);
        assert!(found.end_time.is_none());
    }

    #[test]
    fn test_apply_patch_respects_allowed_from() {
        let db = test_db();
        let mut job = sample_job("t1");
        job.status = "completed".to_string();
        insert(&db, &job).unwrap();

        let changed = apply_patch(&db, "t1", &patch("running"), &["pending", "running"]).unwrap();
        assert_eq!(changed, 0);
        assert_eq!(find_by_id(&db, "t1").unwrap().unwrap().status, "completed");
    }

    #[test]
    fn test_apply_patch_missing_job() {
        let db = test_db();
        let changed = apply_patch(&db, "ghost", &patch("running"), &["pending"]).unwrap();
        assert_eq!(changed, 0);
        assert_eq!(apply_patch(&db, "ghost", &patch("running"), &[]).unwrap(), 0);
    }

    #[test]
    fn test_list_by_user_orders_and_limits() {
        let db = test_db();
        for i in 0..5 {
            let mut job = sample_job(&format!("l{}", i));
            job.created_at = format!("2026-01-0{}T00:00:00.000000Z", i + 1);
            insert(&db, &job).unwrap();
        }
        let mut other = sample_job("other");
        other.user_id = "u2".to_string();
        insert(&db, &other).unwrap();

        let rows = list_by_user(&db, "u1", 3).unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.job_id.as_str()).collect();
        assert_eq!(ids, vec!["l4", "l3", "l2"]);
    }

    #[test]
    fn test_list_all_with_and_without_user() {
        let db = test_db();
        insert(&db, &sample_job("a1")).unwrap();
        let mut other = sample_job("a2");
        other.user_id = "u2".to_string();
        insert(&db, &other).unwrap();

        assert_eq!(list_all(&db, None).unwrap().len(), 2);
        assert_eq!(list_all(&db, Some("u2")).unwrap().len(), 1);
        assert!(list_all(&db, Some("u3")).unwrap().is_empty());
    }

    #[test]
    fn test_delete_created_before() {
        let db = test_db();
        let mut old = sample_job("old");
        old.created_at = "2025-12-01T00:00:00.000000Z".to_string();
        insert(&db, &old).unwrap();
        let mut recent = sample_job("recent");
        recent.created_at = "2026-02-01T00:00:00.000000Z".to_string();
        insert(&db, &recent).unwrap();

        let deleted = delete_created_before(&db, "2026-01-01T00:00:00.000000Z").unwrap();
        assert_eq!(deleted, 1);
        assert!(find_by_id(&db, "old").unwrap().is_none());
        assert!(find_by_id(&db, "recent").unwrap().is_some());
    }

    #[test]
    fn test_exists_with_status_filters() {
        let db = test_db();
        let mut running = sample_job("r1");
        running.status = "running".to_string();
        insert(&db, &running).unwrap();
        insert(&db, &sample_job("p1")).unwrap();

        assert!(exists_with_status(&db, "running", None, None).unwrap());
        assert!(exists_with_status(&db, "running", Some("u1"), None).unwrap());
        assert!(!exists_with_status(&db, "running", Some("u2"), None).unwrap());
        assert!(exists_with_status(&db, "running", Some("u1"), Some("r1")).unwrap());
        assert!(!exists_with_status(&db, "running", None, Some("p1")).unwrap());
    }
}
