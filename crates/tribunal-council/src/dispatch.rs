//! Concurrent fan-out of one dispute to every judge.
//!
//! Each judge runs in its own task on a [`JoinSet`], bounded by the
//! per-call timeout. The set is joined against the job deadline; whatever
//! has not landed by then is aborted and reported as a timeout. Responses
//! come back in invocation order regardless of arrival order.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::CouncilError;
use crate::judge::{JudgeClient, JudgeResponse, ResponseStatus};
use crate::query::DisputeQuery;
use crate::Result;

/// Timeouts and retry behaviour for one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchPolicy {
    /// Upper bound on a single judge call.
    pub per_call_timeout: Duration,
    /// Upper bound on the whole fan-out.
    pub job_deadline: Duration,
    /// Retry a timed-out judge once if a full call still fits before the deadline.
    pub retry_on_timeout: bool,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            per_call_timeout: Duration::from_secs(30),
            job_deadline: Duration::from_secs(45),
            retry_on_timeout: false,
        }
    }
}

impl DispatchPolicy {
    /// Checks that both bounds are non-zero.
    pub fn validate(&self) -> Result<()> {
        if self.per_call_timeout.is_zero() {
            return Err(CouncilError::InvalidPolicy(
                "per_call_timeout must be greater than zero".to_string(),
            ));
        }
        if self.job_deadline.is_zero() {
            return Err(CouncilError::InvalidPolicy(
                "job_deadline must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Runs all judges for one query.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    policy: DispatchPolicy,
}

impl Dispatcher {
    /// Creates a dispatcher with the given policy.
    pub fn new(policy: DispatchPolicy) -> Self {
        Self { policy }
    }

    /// The active policy.
    pub fn policy(&self) -> &DispatchPolicy {
        &self.policy
    }

    /// Invokes every judge concurrently and returns one response per judge.
    ///
    /// Never fails and never outlives `job_deadline` by more than the time
    /// needed to abort the remaining tasks.
    pub async fn dispatch(
        &self,
        query: &DisputeQuery,
        judges: &[Arc<dyn JudgeClient>],
    ) -> Vec<JudgeResponse> {
        let started = Instant::now();
        let deadline = started + self.policy.job_deadline;
        let query = Arc::new(query.clone());

        let mut set = JoinSet::new();
        for (index, judge) in judges.iter().enumerate() {
            let judge = Arc::clone(judge);
            let query = Arc::clone(&query);
            let policy = self.policy;
            set.spawn(async move { (index, call_judge(judge, query, policy, deadline).await) });
        }

        let mut slots: Vec<Option<JudgeResponse>> = vec![None; judges.len()];
        let mut deadline_hit = false;
        loop {
            match tokio::time::timeout_at(deadline, set.join_next()).await {
                Ok(Some(Ok((index, response)))) => slots[index] = Some(response),
                Ok(Some(Err(e))) => warn!("Judge task ended abnormally: {}", e),
                Ok(None) => break,
                Err(_) => {
                    deadline_hit = true;
                    set.abort_all();
                    break;
                }
            }
        }

        let elapsed = started.elapsed();
        let responses: Vec<JudgeResponse> = slots
            .into_iter()
            .zip(judges)
            .map(|(slot, judge)| match slot {
                Some(response) => response,
                None if deadline_hit => JudgeResponse::abstain(
                    judge.provider(),
                    judge.model(),
                    ResponseStatus::Timeout,
                    format!(
                        "job deadline of {} ms elapsed",
                        self.policy.job_deadline.as_millis()
                    ),
                )
                .with_latency(elapsed),
                None => JudgeResponse::abstain(
                    judge.provider(),
                    judge.model(),
                    ResponseStatus::Error,
                    "judge task did not complete",
                )
                .with_latency(elapsed),
            })
            .collect();

        for response in &responses {
            if response.status == ResponseStatus::Ok {
                debug!(
                    "Judge {} voted {} ({}) in {} ms",
                    response.provider, response.verdict, response.confidence, response.latency_ms
                );
            } else {
                warn!(
                    "Judge {} abstained ({}): {}",
                    response.provider,
                    response.status,
                    response.error.as_deref().unwrap_or("")
                );
            }
        }

        let ok = responses
            .iter()
            .filter(|r| r.status == ResponseStatus::Ok)
            .count();
        info!(
            "Dispatched to {} judges: {} ok in {} ms{}",
            responses.len(),
            ok,
            elapsed.as_millis(),
            if deadline_hit { " (deadline reached)" } else { "" }
        );

        responses
    }
}

async fn call_judge(
    judge: Arc<dyn JudgeClient>,
    query: Arc<DisputeQuery>,
    policy: DispatchPolicy,
    deadline: Instant,
) -> JudgeResponse {
    let response = guarded_invoke(judge.as_ref(), &query, policy.per_call_timeout).await;
    if policy.retry_on_timeout
        && response.status == ResponseStatus::Timeout
        && Instant::now() + policy.per_call_timeout <= deadline
    {
        debug!("Retrying judge {} after timeout", judge.provider());
        return guarded_invoke(judge.as_ref(), &query, policy.per_call_timeout).await;
    }
    response
}

/// One bounded call with panics turned into error responses.
async fn guarded_invoke(
    judge: &dyn JudgeClient,
    query: &DisputeQuery,
    per_call: Duration,
) -> JudgeResponse {
    let started = Instant::now();
    let call = AssertUnwindSafe(judge.invoke(query, per_call)).catch_unwind();
    match tokio::time::timeout(per_call, call).await {
        Ok(Ok(response)) => response,
        Ok(Err(panic)) => JudgeResponse::abstain(
            judge.provider(),
            judge.model(),
            ResponseStatus::Error,
            format!("judge panicked: {}", panic_message(panic.as_ref())),
        )
        .with_latency(started.elapsed()),
        Err(_) => JudgeResponse::timed_out(judge.provider(), judge.model(), per_call)
            .with_latency(started.elapsed()),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
