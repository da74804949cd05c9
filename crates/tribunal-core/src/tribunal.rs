//! The unified Tribunal facade.
//!
//! [`Tribunal`] owns the judge panel, the job store and the signing key, and
//! runs every submitted dispute through the same pipeline.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use tribunal_council::{ConsensusEngine, Dispatcher, DisputeQuery, JudgeClient, QueryLimits};
use tribunal_registry::{
    sign_result, Ed25519Signer, FailureCode, Job, JobFailure, JobStore, JobUpdate, RegistryError,
    ResultSigner, SledArchive,
};

use crate::{config::TribunalConfig, error::TribunalError, panel, Result};

/// Slack allowed on top of the job deadline for aggregation, signing and
/// storage.
pub const RESOLVE_OVERHEAD: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Everything a job needs from the configuration, frozen at submission.
struct Settings {
    config: TribunalConfig,
    judges: Vec<Arc<dyn JudgeClient>>,
    engine: ConsensusEngine,
    dispatcher: Dispatcher,
    limits: QueryLimits,
}

impl Settings {
    fn build(config: TribunalConfig, judges: Vec<Arc<dyn JudgeClient>>) -> Result<Self> {
        config.validate()?;
        let engine = ConsensusEngine::new(config.weight_config())?;
        let dispatcher = Dispatcher::new(config.dispatch_policy());
        let limits = config.query_limits();
        Ok(Self {
            config,
            judges,
            engine,
            dispatcher,
            limits,
        })
    }
}

/// The dispute resolution facade.
///
/// # Pipeline
///
/// 1. `submit` validates the text, creates a pending job and returns its id
/// 2. the job moves to `processing` and every judge is invoked concurrently
/// 3. the responses are aggregated into a weighted decision
/// 4. the result is signed and the job moves to `completed`
///
/// A signing or storage error moves the job to `failed` with a reason code;
/// an unsigned result is never stored as completed. A panel that cannot
/// reach quorum still completes, with a `Draw`.
///
/// Cloning is cheap and every clone drives the same store.
///
/// # Example
///
/// ```rust,ignore
/// let tribunal = Tribunal::new(TribunalConfig::from_file("tribunal.json")?)?;
///
/// let job = tribunal.resolve(dispute_text).await?;
/// let result = job.result.expect("completed");
/// tribunal_core::verify_result(&result, &tribunal.public_key())?;
/// ```
#[derive(Clone)]
pub struct Tribunal {
    settings: Arc<RwLock<Arc<Settings>>>,
    store: Arc<JobStore>,
    signer: Arc<dyn ResultSigner>,
}

impl Tribunal {
    /// Create a new Tribunal with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration is invalid
    /// - An HTTP judge has no API key
    /// - The signing seed is malformed
    /// - The archive cannot be opened
    pub fn new(config: TribunalConfig) -> Result<Self> {
        let judges = panel::build_panel(&config.judges)?;
        Self::with_judges(config, judges)
    }

    /// Create a Tribunal with an explicit judge panel.
    ///
    /// The `judges` section of `config` still supplies weights; its client
    /// settings are ignored.
    pub fn with_judges(config: TribunalConfig, judges: Vec<Arc<dyn JudgeClient>>) -> Result<Self> {
        let settings = Settings::build(config, judges)?;
        let signer = load_signer(&settings.config)?;
        let store = open_store(&settings.config)?;

        if settings.judges.is_empty() {
            warn!("No judges configured; every dispute will end in a Draw");
        }
        info!(
            "Tribunal initialized with {} judges, quorum {}, signing key {}",
            settings.judges.len(),
            settings.config.scoring.quorum,
            signer.public_key_hex()
        );

        Ok(Self {
            settings: Arc::new(RwLock::new(Arc::new(settings))),
            store: Arc::new(store),
            signer,
        })
    }

    /// Replaces the signer.
    pub fn with_signer(mut self, signer: Arc<dyn ResultSigner>) -> Self {
        self.signer = signer;
        self
    }

    /// Replaces the job store.
    pub fn with_store(mut self, store: JobStore) -> Self {
        self.store = Arc::new(store);
        self
    }

    /// Submits a dispute and returns its job id without waiting.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`TribunalError::Council`] if the text is rejected
    /// - [`TribunalError::Registry`] if the job cannot be stored
    /// - [`TribunalError::Internal`] outside a Tokio runtime
    pub fn submit(&self, text: impl Into<String>) -> Result<String> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| TribunalError::Internal(format!("no Tokio runtime: {}", e)))?;

        let settings = self.snapshot();
        let query = DisputeQuery::with_limits(text, &settings.limits)?;
        let job_id = self.store.create(query.clone())?;
        info!("Job {} submitted to {} judges", job_id, settings.judges.len());

        let tribunal = self.clone();
        let id = job_id.clone();
        let pipeline = runtime.spawn(async move { tribunal.run_job(id, query, settings).await });

        let tribunal = self.clone();
        let id = job_id.clone();
        runtime.spawn(async move {
            if let Err(e) = pipeline.await {
                warn!("Job {} pipeline aborted: {}", id, e);
                tribunal.fail(&id, FailureCode::InternalFailure, format!("pipeline aborted: {}", e));
            }
        });
        Ok(job_id)
    }

    /// Returns a snapshot of a job.
    pub fn poll(&self, job_id: &str) -> Result<Job> {
        self.store.get(job_id).map_err(|e| match e {
            RegistryError::NotFound(id) => TribunalError::NotFound(id),
            other => TribunalError::Registry(other),
        })
    }

    /// Polls until the job is completed or failed.
    ///
    /// # Errors
    ///
    /// Returns [`TribunalError::Timeout`] if the job is still running after
    /// `timeout`.
    pub async fn wait(&self, job_id: &str, timeout: Duration) -> Result<Job> {
        let started = Instant::now();
        loop {
            let job = self.poll(job_id)?;
            if job.status.is_terminal() {
                return Ok(job);
            }
            if started.elapsed() >= timeout {
                return Err(TribunalError::Timeout {
                    job_id: job_id.to_string(),
                    waited_ms: duration_ms(timeout),
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Submits a dispute and waits for its terminal state.
    ///
    /// Waits at most the job deadline plus [`RESOLVE_OVERHEAD`].
    pub async fn resolve(&self, text: impl Into<String>) -> Result<Job> {
        let deadline = self.snapshot().dispatcher.policy().job_deadline;
        let job_id = self.submit(text)?;
        self.wait(&job_id, deadline + RESOLVE_OVERHEAD).await
    }

    /// Swaps in a new configuration for jobs submitted from now on.
    ///
    /// Jobs already running keep the configuration they started with. The
    /// signing and archive sections only take effect at construction.
    ///
    /// # Errors
    ///
    /// Returns the validation error and keeps the previous configuration.
    pub fn reload_config(&self, config: TribunalConfig) -> Result<()> {
        let judges = panel::build_panel(&config.judges)?;
        self.reload_with_judges(config, judges)
    }

    /// Like [`reload_config`](Self::reload_config) with an explicit panel.
    pub fn reload_with_judges(
        &self,
        config: TribunalConfig,
        judges: Vec<Arc<dyn JudgeClient>>,
    ) -> Result<()> {
        let next = match Settings::build(config, judges) {
            Ok(next) => next,
            Err(e) => {
                warn!("Configuration reload rejected: {}", e);
                return Err(e);
            }
        };

        let current = self.snapshot();
        if current.config.signing != next.config.signing
            || current.config.archive != next.config.archive
        {
            warn!("Signing and archive changes are ignored until restart");
        }

        info!("Configuration reloaded: {} judges", next.judges.len());
        let mut slot = self.settings.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Arc::new(next);
        Ok(())
    }

    /// The configuration in force for new jobs.
    pub fn config(&self) -> TribunalConfig {
        self.snapshot().config.clone()
    }

    /// Hex-encoded public key that verifies every result.
    pub fn public_key(&self) -> String {
        self.signer.public_key_hex()
    }

    /// Every job id, oldest first.
    pub fn job_ids(&self) -> Vec<String> {
        self.store.list_ids()
    }

    fn snapshot(&self) -> Arc<Settings> {
        let slot = self.settings.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&*slot)
    }

    async fn run_job(&self, job_id: String, query: DisputeQuery, settings: Arc<Settings>) {
        if let Err(e) = self.store.transition(&job_id, JobUpdate::Processing) {
            warn!("Job {} could not start: {}", job_id, e);
            self.fail(&job_id, FailureCode::StorageFailure, e.to_string());
            return;
        }

        let responses = settings.dispatcher.dispatch(&query, &settings.judges).await;
        let mut result = settings.engine.aggregate(&job_id, &query, responses);
        debug!(
            "Job {} aggregated: {} ({}) at {:.3}",
            job_id, result.final_decision, result.reason, result.final_confidence
        );

        if let Err(e) = sign_result(self.signer.as_ref(), &mut result) {
            warn!("Job {} signing failed: {}", job_id, e);
            self.fail(&job_id, FailureCode::SigningFailure, e.to_string());
            return;
        }

        let decision = result.final_decision;
        let confidence = result.final_confidence;
        match self.store.transition(&job_id, JobUpdate::Completed(result)) {
            Ok(_) => info!(
                "Job {} completed: {} with {:.1}% confidence",
                job_id,
                decision,
                confidence * 100.0
            ),
            Err(e) => {
                warn!("Job {} result could not be stored: {}", job_id, e);
                self.fail(&job_id, FailureCode::StorageFailure, e.to_string());
            }
        }
    }

    fn fail(&self, job_id: &str, code: FailureCode, message: String) {
        match self.store.record_failure(job_id, JobFailure::new(code, message)) {
            Ok(_) => info!("Job {} failed: {}", job_id, code),
            Err(e) => warn!("Job {} failure could not be recorded: {}", job_id, e),
        }
    }
}

impl std::fmt::Debug for Tribunal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tribunal")
            .field("judges", &self.snapshot().judges.len())
            .field("store", &self.store)
            .field("public_key", &self.public_key())
            .finish()
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn load_signer(config: &TribunalConfig) -> Result<Arc<dyn ResultSigner>> {
    match config.signing.resolve_seed() {
        Some(seed) => {
            let signer = Ed25519Signer::from_hex(&seed)
                .map_err(|e| TribunalError::Config(format!("signing seed: {}", e)))?;
            Ok(Arc::new(signer))
        }
        None => {
            info!("No signing seed configured; generated an ephemeral key");
            Ok(Arc::new(Ed25519Signer::generate()))
        }
    }
}

/// Opens the archive (if any) and fails jobs a previous run left unfinished.
fn open_store(config: &TribunalConfig) -> Result<JobStore> {
    let path = match &config.archive.path {
        Some(path) => path,
        None => return Ok(JobStore::new()),
    };

    let archive = SledArchive::open(path)?;
    let store = JobStore::restore(Arc::new(archive))?;
    for id in store.list_ids() {
        if !store.get(&id)?.status.is_terminal() {
            warn!("Job {} was interrupted by a restart", id);
            store.record_failure(
                &id,
                JobFailure::new(FailureCode::InternalFailure, "interrupted by restart"),
            )?;
        }
    }
    info!("Archive {} holds {} jobs", path.display(), store.len());
    Ok(store)
}
