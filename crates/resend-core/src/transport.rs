//! Transport: sends one request and reports the outcome.
//!
//! `CurlTransport` drives libcurl on the blocking pool. Error statuses
//! (>= 400) and status-less responses are reported as `RequestError::Response`
//! so the retry stage can classify them.

use std::str;
use std::time::Duration;

use async_trait::async_trait;

use crate::classify::classify_curl_error;
use crate::error::{RequestError, TransportKind};
use crate::request::{Request, Response};

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &Request) -> Result<Response, RequestError>;
}

/// libcurl knobs applied to every transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportOptions {
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub follow_redirects: bool,
    pub max_redirections: u32,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            timeout: Duration::from_secs(60),
            follow_redirects: true,
            max_redirections: 10,
        }
    }
}

/// HTTP transport backed by the `curl` crate.
#[derive(Debug, Clone, Default)]
pub struct CurlTransport {
    opts: TransportOptions,
}

impl CurlTransport {
    pub fn new(opts: TransportOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &TransportOptions {
        &self.opts
    }
}

impl From<curl::Error> for RequestError {
    fn from(e: curl::Error) -> Self {
        RequestError::Transport {
            kind: classify_curl_error(&e),
            message: e.to_string(),
        }
    }
}

/// Owned copy of what curl needs, so the transfer can run off the async thread.
struct Prepared {
    method: String,
    url: String,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
}

#[async_trait]
impl Transport for CurlTransport {
    async fn send(&self, request: &Request) -> Result<Response, RequestError> {
        let prepared = Prepared {
            method: request.method().to_string(),
            url: request.url().to_string(),
            headers: request.headers().to_vec(),
            body: request.body_bytes().map(<[u8]>::to_vec),
        };
        let opts = self.opts;
        tracing::trace!("curl {} {}", prepared.method, prepared.url);

        tokio::task::spawn_blocking(move || perform(&prepared, opts))
            .await
            .map_err(|e| {
                RequestError::transport(TransportKind::Other, format!("transport task: {}", e))
            })?
    }
}

/// Runs one transfer in the current thread.
fn perform(req: &Prepared, opts: TransportOptions) -> Result<Response, RequestError> {
    let mut header_lines: Vec<String> = Vec::new();
    let mut body: Vec<u8> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(&req.url)?;
    easy.follow_location(opts.follow_redirects)?;
    easy.max_redirections(opts.max_redirections)?;
    easy.connect_timeout(opts.connect_timeout)?;
    easy.timeout(opts.timeout)?;

    match req.method.as_str() {
        "GET" => easy.get(true)?,
        "HEAD" => easy.nobody(true)?,
        "POST" => easy.post(true)?,
        other => easy.custom_request(other)?,
    }
    if let Some(data) = &req.body {
        easy.post_fields_copy(data)?;
    }

    let mut list = curl::easy::List::new();
    for (k, v) in &req.headers {
        list.append(&format!("{}: {}", k, v))?;
    }
    if !req.headers.is_empty() {
        easy.http_headers(list)?;
    }

    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                let line = s.trim_end();
                // A new status line starts a new response (redirects); keep only the last.
                if line.starts_with("HTTP/") {
                    header_lines.clear();
                }
                header_lines.push(line.to_string());
            }
            true
        })?;
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }

    let code = easy.response_code()?;
    if code == 0 {
        return Err(RequestError::Response { status: None, body });
    }
    let status = u16::try_from(code).map_err(|_| {
        RequestError::transport(TransportKind::Other, format!("invalid status code {}", code))
    })?;
    if status >= 400 {
        return Err(RequestError::Response {
            status: Some(status),
            body,
        });
    }

    Ok(Response {
        status,
        headers: parse_header_lines(&header_lines),
        body,
    })
}

/// Turn raw header lines into (name, value) pairs, skipping the status line.
fn parse_header_lines(lines: &[String]) -> Vec<(String, String)> {
    lines
        .iter()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with("HTTP/") {
                return None;
            }
            line.split_once(':')
                .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}
