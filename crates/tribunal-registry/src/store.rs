//! In-memory job store with per-job locking.
//!
//! The index lock is held only to look up or insert a job handle; every
//! transition then serializes on that job's own lock, so jobs never block
//! each other. Readers always receive a cloned, committed snapshot.
//!
//! With an archive attached, a transition is written to the archive first
//! and committed in memory only once the write succeeds.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tracing::{debug, warn};
use tribunal_council::DisputeQuery;
use uuid::Uuid;

use crate::models::{Job, JobFailure, JobUpdate, RegistryError, Result};
use crate::storage::JobArchive;

type JobHandle = Arc<Mutex<Job>>;

/// Owner of every [`Job`] record.
#[derive(Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<String, JobHandle>>,
    archive: Option<Arc<dyn JobArchive>>,
}

impl JobStore {
    /// Creates an empty store without an archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store that mirrors into `archive`.
    pub fn with_archive(archive: Arc<dyn JobArchive>) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            archive: Some(archive),
        }
    }

    /// Creates a store preloaded with every job in `archive`.
    pub fn restore(archive: Arc<dyn JobArchive>) -> Result<Self> {
        let jobs = archive.load_all()?;
        debug!("Restored {} jobs from archive", jobs.len());
        let index: HashMap<String, JobHandle> = jobs
            .into_iter()
            .map(|job| (job.id.clone(), Arc::new(Mutex::new(job))))
            .collect();
        Ok(Self {
            jobs: RwLock::new(index),
            archive: Some(archive),
        })
    }

    /// Registers a new pending job and returns its identifier.
    ///
    /// # Errors
    ///
    /// Returns the archive error if the initial snapshot cannot be written;
    /// no job is created in that case.
    pub fn create(&self, query: DisputeQuery) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let job = Job::new(id.clone(), query);

        if let Some(archive) = &self.archive {
            archive.put(&job)?;
        }

        self.write_index().insert(id.clone(), Arc::new(Mutex::new(job)));
        debug!("Created job {}", id);
        Ok(id)
    }

    /// Returns a snapshot of a job.
    pub fn get(&self, id: &str) -> Result<Job> {
        let handle = self.handle(id)?;
        let job = lock(&handle).clone();
        Ok(job)
    }

    /// Applies an update to a job and returns the committed snapshot.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::NotFound`] for an unknown id
    /// - [`RegistryError::InvalidTransition`] for a backwards or repeated move
    /// - the archive error if the snapshot cannot be written
    ///
    /// The job is unchanged whenever an error is returned.
    pub fn transition(&self, id: &str, update: JobUpdate) -> Result<Job> {
        self.commit(id, update, true)
    }

    /// Marks a job failed, committing in memory even if the archive write
    /// fails.
    ///
    /// Used when the failure being recorded is itself an archive failure:
    /// callers must still observe a terminal status.
    ///
    /// # Errors
    ///
    /// Only [`RegistryError::NotFound`] and
    /// [`RegistryError::InvalidTransition`].
    pub fn record_failure(&self, id: &str, failure: JobFailure) -> Result<Job> {
        self.commit(id, JobUpdate::Failed(failure), false)
    }

    fn commit(&self, id: &str, update: JobUpdate, archive_required: bool) -> Result<Job> {
        let handle = self.handle(id)?;
        let mut job = lock(&handle);

        let mut next = job.clone();
        next.apply(update)?;

        if let Some(archive) = &self.archive {
            if let Err(e) = archive.put(&next) {
                warn!("Archive write failed for job {}: {}", id, e);
                if archive_required {
                    return Err(e);
                }
            }
        }

        debug!("Job {}: {} -> {}", id, job.status, next.status);
        *job = next;
        Ok(job.clone())
    }

    /// Number of jobs.
    pub fn len(&self) -> usize {
        self.read_index().len()
    }

    /// Returns true if no jobs exist.
    pub fn is_empty(&self) -> bool {
        self.read_index().is_empty()
    }

    /// Job identifiers, oldest first.
    pub fn list_ids(&self) -> Vec<String> {
        let handles: Vec<JobHandle> = self.read_index().values().cloned().collect();
        let mut entries: Vec<_> = handles
            .iter()
            .map(|handle| {
                let job = lock(handle);
                (job.created_at, job.id.clone())
            })
            .collect();
        entries.sort();
        entries.into_iter().map(|(_, id)| id).collect()
    }

    /// Returns true if an archive is attached.
    pub fn has_archive(&self) -> bool {
        self.archive.is_some()
    }

    fn handle(&self, id: &str) -> Result<JobHandle> {
        self.read_index()
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    fn read_index(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, JobHandle>> {
        self.jobs.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_index(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, JobHandle>> {
        self.jobs.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Jobs are replaced wholesale on commit, so a poisoned lock still holds a
/// consistent snapshot.
fn lock(handle: &JobHandle) -> MutexGuard<'_, Job> {
    handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl std::fmt::Debug for JobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobStore")
            .field("jobs_count", &self.len())
            .field("archived", &self.has_archive())
            .finish()
    }
}
