//! Outgoing request and received response.
//!
//! A `Request` is one logical HTTP call. Its identity (`RequestId`) is fixed at
//! construction and survives every resubmission; the retry stage keeps its
//! per-request state in the request's metadata bag rather than in new fields.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use url::Url;

use crate::cancel::CancelToken;
use crate::ledger;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque key-value bag attached to a request.
///
/// Pipeline stages store their own state here under namespaced keys
/// (e.g. `resend.retry.attempt`) so they never collide with each other.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    entries: HashMap<String, Value>,
}

impl Metadata {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One logical HTTP call. Not `Clone`: a resubmission sends this same value
/// again rather than a copy with a new identity.
#[derive(Debug)]
pub struct Request {
    id: RequestId,
    method: String,
    url: Url,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    metadata: Metadata,
    cancel: Option<CancelToken>,
}

impl Request {
    /// Build a request for `method` and an absolute `url`.
    pub fn new(method: &str, url: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(url)?;
        Ok(Self {
            id: RequestId::next(),
            method: method.trim().to_ascii_uppercase(),
            url,
            headers: Vec::new(),
            body: None,
            metadata: Metadata::default(),
            cancel: None,
        })
    }

    pub fn get(url: &str) -> Result<Self, url::ParseError> {
        Self::new("GET", url)
    }

    /// Append a header (e.g. from `-H 'Name: value'`).
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .push((name.trim().to_string(), value.trim().to_string()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Attach a cancellation token; cancelling it aborts pending retries.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Opt this request out of retries entirely.
    pub fn disable_retries(mut self) -> Self {
        ledger::set_retry_disabled(&mut self, true);
        self
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body_bytes(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    pub fn cancel_token(&self) -> Option<&CancelToken> {
        self.cancel.as_ref()
    }

    /// `METHOD url`, used in log lines.
    pub fn target(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

/// Response returned by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    /// Header lines in arrival order (name, value).
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    /// First header value matching `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
