//! Request failure type and give-up reasons used by the retry stage.

use std::fmt;

use thiserror::Error;

/// Error returned by user-supplied evaluators and other pluggable hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Coarse class of a transport-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Connect or overall timeout.
    Timeout,
    /// Could not connect, resolve, or the connection broke mid-transfer.
    Connect,
    /// Anything else reported by the transport.
    Other,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportKind::Timeout => "timeout",
            TransportKind::Connect => "connect",
            TransportKind::Other => "other",
        };
        f.write_str(s)
    }
}

/// Failure of one request send, as produced by a transport.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The caller cancelled the logical operation. Never retried.
    #[error("request cancelled")]
    Cancelled,

    /// A response arrived but was an error. `status` is `None` when the
    /// response carried no status line.
    #[error("{}", response_line(.status))]
    Response { status: Option<u16>, body: Vec<u8> },

    /// The request never produced a response (connect, DNS, TLS, timeout...).
    #[error("transport error ({kind}): {message}")]
    Transport { kind: TransportKind, message: String },

    /// A retry evaluator failed while deciding; forwarded in place of the
    /// error it was evaluating.
    #[error("retry evaluator failed: {0}")]
    Evaluator(#[source] BoxError),
}

fn response_line(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("HTTP {}", code),
        None => "response without status code".to_string(),
    }
}

impl RequestError {
    pub fn status(code: u16) -> Self {
        RequestError::Response {
            status: Some(code),
            body: Vec::new(),
        }
    }

    pub fn transport(kind: TransportKind, message: impl Into<String>) -> Self {
        RequestError::Transport {
            kind,
            message: message.into(),
        }
    }

    /// Status code of an error response, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            RequestError::Response { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RequestError::Cancelled)
    }
}

/// Why the retry stage stopped and forwarded the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiveUpReason {
    /// The request opted out of retries.
    RetryDisabled,
    /// `attempt > max_retries`; the evaluator was not consulted.
    BudgetExhausted,
    /// The evaluator returned `false`.
    EvaluatorRejected,
    /// The evaluator itself failed.
    EvaluatorFailed,
    /// Cancelled during backoff or resubmission.
    Cancelled,
}

impl fmt::Display for GiveUpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GiveUpReason::RetryDisabled => "retries disabled for request",
            GiveUpReason::BudgetExhausted => "retry budget exhausted",
            GiveUpReason::EvaluatorRejected => "evaluator rejected retry",
            GiveUpReason::EvaluatorFailed => "evaluator failed",
            GiveUpReason::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}
