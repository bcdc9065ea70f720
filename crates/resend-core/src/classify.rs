//! Classify HTTP status codes and curl errors for retry decisions.

use std::collections::BTreeSet;

use crate::error::TransportKind;

/// Status codes retried by default: request timeout, throttling and the
/// transient 5xx family.
pub const DEFAULT_RETRYABLE_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Pure lookup deciding whether an HTTP status is worth retrying.
pub trait StatusClassifier: Send + Sync {
    fn is_retryable(&self, status: u16) -> bool;
}

impl<F> StatusClassifier for F
where
    F: Fn(u16) -> bool + Send + Sync,
{
    fn is_retryable(&self, status: u16) -> bool {
        self(status)
    }
}

/// Explicit set of retryable status codes (e.g. from `config.toml`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSet {
    codes: BTreeSet<u16>,
}

impl StatusSet {
    pub fn new(codes: impl IntoIterator<Item = u16>) -> Self {
        Self {
            codes: codes.into_iter().collect(),
        }
    }

    pub fn codes(&self) -> impl Iterator<Item = u16> + '_ {
        self.codes.iter().copied()
    }
}

impl Default for StatusSet {
    fn default() -> Self {
        Self::new(DEFAULT_RETRYABLE_STATUSES)
    }
}

impl StatusClassifier for StatusSet {
    fn is_retryable(&self, status: u16) -> bool {
        self.codes.contains(&status)
    }
}

/// Classify a curl error into a transport failure kind.
pub fn classify_curl_error(e: &curl::Error) -> TransportKind {
    if e.is_operation_timedout() {
        return TransportKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_ssl_connect_error()
    {
        return TransportKind::Connect;
    }
    TransportKind::Other
}
