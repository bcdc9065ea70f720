//! Retry stage: decides, waits and resubmits when a send fails.
//!
//! `on_error` handles exactly one failure of a request. It either forwards the
//! error (give up) or resubmits the same request once and hands back that
//! resubmission's outcome. `execute` drives the loop: a failed resubmission goes
//! back through `on_error` with the request's ledger already incremented, so the
//! number of resubmissions is bounded by `max_retries`.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use crate::backoff::BackoffSchedule;
use crate::error::{GiveUpReason, RequestError};
use crate::evaluator::RetryEvaluator;
use crate::ledger;
use crate::policy::RetryPolicy;
use crate::request::{Request, Response};
use crate::transport::Transport;

/// Receives one formatted line per scheduled retry. Best-effort: a panicking
/// sink is ignored.
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Result of one `on_error` invocation. Exactly one of the two happens.
#[derive(Debug)]
pub enum StageOutcome {
    /// Gave up; pass this error to the next handler unchanged.
    Forward(RequestError),
    /// Resubmitted once; this is what the resubmission produced.
    Resolved(Result<Response, RequestError>),
}

pub struct RetryStage {
    policy: Arc<RetryPolicy>,
    transport: Arc<dyn Transport>,
    log_sink: Option<LogSink>,
}

impl RetryStage {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self {
            policy: Arc::new(policy),
            transport,
            log_sink: None,
        }
    }

    pub fn builder(transport: Arc<dyn Transport>) -> RetryStageBuilder {
        RetryStageBuilder {
            transport,
            policy: RetryPolicy::default(),
            log_sink: None,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Send `request`, retrying transient failures. Returns the first success
    /// or the error that made the stage give up.
    pub async fn execute(&self, request: &mut Request) -> Result<Response, RequestError> {
        let mut outcome = self.send_once(request, Duration::ZERO).await;
        loop {
            let error = match outcome {
                Ok(resp) => return Ok(resp),
                Err(e) => e,
            };
            match self.on_error(request, error).await {
                StageOutcome::Forward(e) => return Err(e),
                StageOutcome::Resolved(next) => outcome = next,
            }
        }
    }

    /// Handle one failed send of `request`.
    pub async fn on_error(&self, request: &mut Request, error: RequestError) -> StageOutcome {
        if ledger::is_retry_disabled(request) {
            return self.give_up(request, GiveUpReason::RetryDisabled, error);
        }
        if error.is_cancelled() || is_cancelled(request) {
            return self.give_up(request, GiveUpReason::Cancelled, error);
        }

        let attempt = ledger::attempt(request).saturating_add(1);
        if !self.policy.within_budget(attempt) {
            return self.give_up(request, GiveUpReason::BudgetExhausted, error);
        }
        // The attempt is spent once the evaluator is consulted, whatever it answers.
        ledger::set_attempt(request, attempt);

        match self.policy.evaluator.evaluate(&error, attempt).await {
            Ok(true) => {}
            Ok(false) => return self.give_up(request, GiveUpReason::EvaluatorRejected, error),
            Err(e) => {
                return self.give_up(
                    request,
                    GiveUpReason::EvaluatorFailed,
                    RequestError::Evaluator(e),
                )
            }
        }

        let delay = self.policy.delay_for(attempt);
        self.log_retry(request, attempt, delay, &error);

        StageOutcome::Resolved(self.send_once(request, delay).await)
    }

    /// Wait `delay` (if any), then send. Both steps abort on cancellation.
    async fn send_once(&self, request: &Request, delay: Duration) -> Result<Response, RequestError> {
        let attempt = async {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            self.transport.send(request).await
        };
        match request.cancel_token() {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(RequestError::Cancelled),
                    outcome = attempt => outcome,
                }
            }
            None => attempt.await,
        }
    }

    fn give_up(&self, request: &Request, reason: GiveUpReason, error: RequestError) -> StageOutcome {
        tracing::debug!(
            request = %request.target(),
            id = %request.id(),
            attempts = ledger::attempt(request),
            %reason,
            error = %error,
            "giving up"
        );
        StageOutcome::Forward(error)
    }

    fn log_retry(&self, request: &Request, attempt: u32, delay: Duration, error: &RequestError) {
        let delay_ms = delay.as_millis() as u64;
        let target = request.target();
        tracing::info!(
            request = %target,
            id = %request.id(),
            attempt,
            max_retries = self.policy.max_retries,
            delay_ms,
            error = %error,
            "retrying request"
        );
        if let Some(sink) = &self.log_sink {
            let line = format!(
                "retrying {} (attempt {}/{}) in {}ms: {}",
                target, attempt, self.policy.max_retries, delay_ms, error
            );
            if panic::catch_unwind(AssertUnwindSafe(|| sink(&line))).is_err() {
                tracing::warn!("retry log sink panicked; ignoring");
            }
        }
    }
}

fn is_cancelled(request: &Request) -> bool {
    request
        .cancel_token()
        .map(|t| t.is_cancelled())
        .unwrap_or(false)
}

/// Construction-time options for `RetryStage`.
pub struct RetryStageBuilder {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    log_sink: Option<LogSink>,
}

impl RetryStageBuilder {
    pub fn policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.policy.max_retries = n;
        self
    }

    pub fn delay_schedule(mut self, schedule: BackoffSchedule) -> Self {
        self.policy.schedule = schedule;
        self
    }

    pub fn evaluator(mut self, evaluator: impl RetryEvaluator + 'static) -> Self {
        self.policy.evaluator = Arc::new(evaluator);
        self
    }

    pub fn log_sink(mut self, sink: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.log_sink = Some(Arc::new(sink));
        self
    }

    pub fn build(self) -> RetryStage {
        RetryStage {
            policy: Arc::new(self.policy),
            transport: self.transport,
            log_sink: self.log_sink,
        }
    }
}
