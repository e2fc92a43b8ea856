//! Build job records
//!
//! Every API build gets a short id and its own `job_<id>` directory under the
//! work dir. The newest records live in memory; the directories stay on disk
//! and remain downloadable after their record is evicted.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Length of a job id (prefix of a v4 uuid in simple form)
pub const JOB_ID_LEN: usize = 8;

/// Records kept in memory before the oldest is evicted
pub const DEFAULT_MAX_JOBS: usize = 256;

/// Generate a new job id
pub fn new_job_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(JOB_ID_LEN);
    id
}

/// Directory name of a job
pub fn job_dir_name(id: &str) -> String {
    format!("job_{}", id)
}

/// True for a plain file or directory name: no separators, no parent
/// references, not hidden, not empty
pub fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
}

/// A finished build
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub id: String,
    pub campaign: String,
    /// `job_<id>` directory holding the artifacts
    pub output_dir: PathBuf,
    pub html_file: String,
    pub assets_zip: String,
    pub text_bands: usize,
    pub image_bands: usize,
    pub created_at: DateTime<Utc>,
}

/// Bounded concurrent map of job id to record
#[derive(Debug, Clone)]
pub struct JobStore {
    jobs: Arc<DashMap<String, (u64, JobRecord)>>,
    next_seq: Arc<AtomicU64>,
    max_jobs: usize,
}

impl Default for JobStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_JOBS)
    }
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store keeping at most `max_jobs` records (minimum 1)
    pub fn with_capacity(max_jobs: usize) -> Self {
        Self {
            jobs: Arc::new(DashMap::new()),
            next_seq: Arc::new(AtomicU64::new(0)),
            max_jobs: max_jobs.max(1),
        }
    }

    /// Maximum number of records held in memory
    pub fn capacity(&self) -> usize {
        self.max_jobs
    }

    /// Store a record, replacing any previous one with the same id.
    ///
    /// Evicts the oldest records once the store is over capacity.
    pub fn insert(&self, record: JobRecord) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.jobs.insert(record.id.clone(), (seq, record));

        while self.jobs.len() > self.max_jobs {
            let oldest = self
                .jobs
                .iter()
                .min_by_key(|entry| entry.value().0)
                .map(|entry| entry.key().clone());
            match oldest {
                Some(id) => {
                    self.jobs.remove(&id);
                    debug!(job_id = %id, "evicted job record");
                }
                None => break,
            }
        }
    }

    /// Get a copy of a record
    pub fn get(&self, id: &str) -> Option<JobRecord> {
        self.jobs.get(id).map(|r| r.value().1.clone())
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Job directory for `id` under `work_dir`, from the store or from disk
    pub fn resolve_dir(&self, work_dir: &Path, id: &str) -> Option<PathBuf> {
        if let Some(record) = self.get(id) {
            return Some(record.output_dir);
        }
        if !id.chars().all(|c| c.is_ascii_alphanumeric()) || id.is_empty() {
            return None;
        }
        let dir = work_dir.join(job_dir_name(id));
        dir.is_dir().then_some(dir)
    }
}
