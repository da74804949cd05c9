//! # Job Archive
//!
//! Mirrors every committed job snapshot into an embedded Sled database so
//! results can be audited and reloaded after a restart. The archive is an
//! audit mirror: the in-memory [`JobStore`](crate::JobStore) stays the
//! source of truth while the process runs.
//!
//! ## Storage Structure
//!
//! | Tree | Key | Value |
//! |------|-----|-------|
//! | `jobs` | job id | JSON-serialized [`Job`] |
//!
//! ## References
//!
//! - Sled documentation: <https://sled.rs/>

use std::path::Path;

use crate::models::{Job, Result};

/// Tree name for job snapshots.
const JOB_TREE: &str = "jobs";

/// Backend the job store writes snapshots to before committing them.
pub trait JobArchive: Send + Sync {
    /// Writes (or overwrites) a job snapshot.
    fn put(&self, job: &Job) -> Result<()>;

    /// Reads one snapshot.
    fn load(&self, id: &str) -> Result<Option<Job>>;

    /// Reads every snapshot.
    fn load_all(&self) -> Result<Vec<Job>>;
}

/// Sled-backed [`JobArchive`].
///
/// # Example
///
/// ```rust,no_run
/// use tribunal_registry::storage::SledArchive;
///
/// let archive = SledArchive::open("./data/jobs").unwrap();
/// println!("{} archived jobs", archive.len());
/// ```
#[derive(Clone)]
pub struct SledArchive {
    db: sled::Db,
    jobs: sled::Tree,
}

impl SledArchive {
    /// Opens or creates an archive at the given path.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Database` if the path is unusable or the
    /// database is corrupted.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        let jobs = db.open_tree(JOB_TREE)?;
        Ok(Self { db, jobs })
    }

    /// Creates an in-memory archive, discarded on drop.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        let jobs = db.open_tree(JOB_TREE)?;
        Ok(Self { db, jobs })
    }

    /// Number of archived jobs.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Returns true if nothing is archived.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Flushes pending writes to disk, returning the bytes written.
    pub fn flush(&self) -> Result<usize> {
        Ok(self.db.flush()?)
    }
}

impl JobArchive for SledArchive {
    fn put(&self, job: &Job) -> Result<()> {
        let bytes = serde_json::to_vec(job)?;
        self.jobs.insert(job.id.as_bytes(), bytes)?;
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Option<Job>> {
        match self.jobs.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn load_all(&self) -> Result<Vec<Job>> {
        let mut jobs = Vec::with_capacity(self.jobs.len());
        for entry in self.jobs.iter() {
            let (_, bytes) = entry?;
            jobs.push(serde_json::from_slice(&bytes)?);
        }
        Ok(jobs)
    }
}

impl std::fmt::Debug for SledArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledArchive")
            .field("jobs_count", &self.len())
            .finish()
    }
}
