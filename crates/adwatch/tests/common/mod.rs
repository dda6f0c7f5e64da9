//! Shared test utilities for adwatch integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;

use adwatch::db::competitor_repo::{self, CompetitorRow};
use adwatch::db::format_timestamp;
use adwatch::{Database, StatusManager};

/// Isolated on-disk job store plus a scratch directory for fetcher scripts.
pub struct TestHarness {
    temp_dir: TempDir,
    pub db_path: PathBuf,
    pub fetcher_dir: PathBuf,
    pub status: Arc<StatusManager>,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("data").join("adwatch.db");
        let fetcher_dir = temp_dir.path().join("fetcher");
        std::fs::create_dir_all(&fetcher_dir).expect("Failed to create fetcher dir");

        let db = Database::open(&db_path).expect("Failed to open database");
        Self {
            temp_dir,
            db_path,
            fetcher_dir,
            status: Arc::new(StatusManager::new(db)),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// A second manager over the same file, with an empty cache.
    pub fn reopen(&self) -> StatusManager {
        StatusManager::new(Database::open(&self.db_path).expect("Failed to reopen database"))
    }

    pub fn add_competitors(&self, user_id: &str, count: usize) {
        for i in 0..count {
            competitor_repo::insert(
                self.status.database(),
                &CompetitorRow {
                    id: format!("{}-c{}", user_id, i),
                    user_id: user_id.to_string(),
                    name: format!("Competitor {}", i),
                    created_at: format_timestamp(Utc::now()),
                },
            )
            .expect("Failed to insert competitor");
        }
    }

    /// Removes the jobs table so that any further store access fails.
    pub fn break_job_store(&self) {
        self.status
            .database()
            .with_conn(|conn| {
                conn.execute_batch("DROP TABLE ads_fetch_jobs;")?;
                Ok(())
            })
            .expect("Failed to drop jobs table");
    }
}
