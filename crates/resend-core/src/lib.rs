pub mod config;
pub mod logging;

// Retry stage and its collaborators
pub mod backoff;
pub mod cancel;
pub mod classify;
pub mod error;
pub mod evaluator;
pub mod ledger;
pub mod policy;
pub mod request;
pub mod stage;
pub mod transport;

pub use error::{BoxError, GiveUpReason, RequestError, TransportKind};
pub use request::{Request, Response};
pub use stage::{RetryStage, StageOutcome};
