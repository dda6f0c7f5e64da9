//! Fetch job status tracking.
//!
//! [`StatusManager`] keeps the durable job table and an in-memory mirror in
//! step; [`display`] and [`stats`] derive presentation and aggregate views.

pub mod display;
pub mod manager;
pub mod record;
pub mod stats;

pub use display::{format_job_for_display, format_job_for_display_at, DisplayJob};
pub use manager::{JobLookup, StatusManager};
pub use record::{JobDelta, JobRecord, JobStatus, JobUpdate};
pub use stats::JobStatistics;
