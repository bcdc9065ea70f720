//! Retry evaluators: decide whether a failed attempt should be retried.
//!
//! Evaluators are async so they can do work before answering (for example,
//! refresh a token and then say "yes, retry"). One evaluator instance is shared
//! by every request the stage handles and is called fresh on every failure; any
//! shared state it mutates must be synchronised by the evaluator itself, since
//! concurrent requests may call it at the same time.

use async_trait::async_trait;

use crate::classify::{StatusClassifier, StatusSet};
use crate::error::{BoxError, RequestError};

#[async_trait]
pub trait RetryEvaluator: Send + Sync {
    /// `attempt` is the 1-based number of the retry being considered.
    async fn evaluate(&self, error: &RequestError, attempt: u32) -> Result<bool, BoxError>;
}

/// Built-in policy: never retry cancellations, retry error responses whose
/// status the classifier accepts, and retry everything else (transport
/// failures and status-less responses are assumed transient).
#[derive(Debug, Clone, Default)]
pub struct DefaultEvaluator<C = StatusSet> {
    classifier: C,
}

impl DefaultEvaluator<StatusSet> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: StatusClassifier> DefaultEvaluator<C> {
    pub fn with_classifier(classifier: C) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// The decision itself, without the async wrapper.
    pub fn decide(&self, error: &RequestError) -> bool {
        match error {
            RequestError::Cancelled => false,
            RequestError::Response {
                status: Some(code), ..
            } => self.classifier.is_retryable(*code),
            RequestError::Response { status: None, .. } => true,
            RequestError::Transport { .. } => true,
            RequestError::Evaluator(_) => false,
        }
    }
}

#[async_trait]
impl<C: StatusClassifier> RetryEvaluator for DefaultEvaluator<C> {
    async fn evaluate(&self, error: &RequestError, _attempt: u32) -> Result<bool, BoxError> {
        Ok(self.decide(error))
    }
}

/// Adapter for synchronous predicates.
pub struct FnEvaluator<F>(F);

/// Wrap a closure as an evaluator.
pub fn from_fn<F>(f: F) -> FnEvaluator<F>
where
    F: Fn(&RequestError, u32) -> Result<bool, BoxError> + Send + Sync,
{
    FnEvaluator(f)
}

#[async_trait]
impl<F> RetryEvaluator for FnEvaluator<F>
where
    F: Fn(&RequestError, u32) -> Result<bool, BoxError> + Send + Sync,
{
    async fn evaluate(&self, error: &RequestError, attempt: u32) -> Result<bool, BoxError> {
        (self.0)(error, attempt)
    }
}
