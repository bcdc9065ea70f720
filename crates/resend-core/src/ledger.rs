//! Per-request retry state (attempt count, retry-disabled flag).
//!
//! Stored in the request's metadata bag under reserved keys, so the state lives
//! and dies with the request and never leaks into another one.

use serde_json::Value;

use crate::request::Request;

/// Metadata key holding the number of retries already scheduled.
pub const ATTEMPT_KEY: &str = "resend.retry.attempt";
/// Metadata key holding the per-request opt-out flag.
pub const DISABLED_KEY: &str = "resend.retry.disabled";

/// Snapshot of a request's ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedgerEntry {
    pub attempt_count: u32,
    pub retry_disabled: bool,
}

pub fn entry(request: &Request) -> LedgerEntry {
    LedgerEntry {
        attempt_count: attempt(request),
        retry_disabled: is_retry_disabled(request),
    }
}

/// Retries scheduled so far; 0 when no failure has been handled yet.
pub fn attempt(request: &Request) -> u32 {
    request
        .metadata()
        .get(ATTEMPT_KEY)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
}

pub fn set_attempt(request: &mut Request, n: u32) {
    request.metadata_mut().insert(ATTEMPT_KEY, n);
}

pub fn is_retry_disabled(request: &Request) -> bool {
    request
        .metadata()
        .get(DISABLED_KEY)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

pub fn set_retry_disabled(request: &mut Request, disabled: bool) {
    request.metadata_mut().insert(DISABLED_KEY, disabled);
}
