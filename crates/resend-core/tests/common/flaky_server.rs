//! Minimal HTTP/1.1 server that fails the first N requests, then succeeds.
//!
//! Failures are either an error status or a dropped connection (no response at
//! all). Every request is counted so tests can assert how many sends happened.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

#[derive(Debug, Clone, Copy)]
pub enum Failure {
    /// Respond with this HTTP status.
    Status(u16),
    /// Close the connection without writing anything.
    Drop,
}

#[derive(Debug, Clone, Copy)]
pub struct FlakyOptions {
    /// Number of leading requests that fail.
    pub fail_first: usize,
    pub failure: Failure,
}

impl Default for FlakyOptions {
    fn default() -> Self {
        Self {
            fail_first: 0,
            failure: Failure::Status(503),
        }
    }
}

/// Running server: base URL plus a counter of requests received.
pub struct FlakyServer {
    pub url: String,
    hits: Arc<AtomicUsize>,
}

impl FlakyServer {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Starts a server in a background thread that serves `body` once the first
/// `opts.fail_first` requests have failed. Runs until the process exits.
pub fn start(body: &'static [u8], opts: FlakyOptions) -> FlakyServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_srv = Arc::clone(&hits);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let n = hits_srv.fetch_add(1, Ordering::SeqCst);
            let fail = if n < opts.fail_first {
                Some(opts.failure)
            } else {
                None
            };
            thread::spawn(move || handle(stream, body, fail));
        }
    });
    FlakyServer {
        url: format!("http://127.0.0.1:{}/", port),
        hits,
    }
}

fn handle(mut stream: std::net::TcpStream, body: &[u8], fail: Option<Failure>) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(_) => {}
    }
    match fail {
        Some(Failure::Drop) => {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
        Some(Failure::Status(code)) => {
            let msg = b"try again";
            let response = format!(
                "HTTP/1.1 {} Failure\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                code,
                msg.len()
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.write_all(msg);
        }
        None => {
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nContent-Type: text/plain\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.write_all(body);
        }
    }
}
