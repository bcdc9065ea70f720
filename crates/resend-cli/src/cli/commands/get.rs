//! `resend get <url>` – GET with transparent retries.

use anyhow::{bail, Context, Result};
use resend_core::cancel::CancelToken;
use resend_core::config::ResendConfig;
use resend_core::transport::CurlTransport;
use resend_core::{Request, RetryStage};
use std::io::Write;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct GetArgs {
    pub url: String,
    pub headers: Vec<String>,
    pub max_retries: Option<u32>,
    pub delay_ms: Option<Vec<u64>>,
    pub no_retry: bool,
    pub include: bool,
}

pub async fn run_get(cfg: &ResendConfig, args: GetArgs) -> Result<()> {
    let stage = build_stage(cfg, &args);

    let token = CancelToken::new();
    let mut req = build_request(&args)?.with_cancel(token.clone());

    // Ctrl-C cancels any pending backoff or resubmission.
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    let outcome = stage.execute(&mut req).await;
    watcher.abort();
    let resp = outcome.with_context(|| format!("GET {} failed", args.url))?;

    let mut out = std::io::stdout().lock();
    if args.include {
        writeln!(out, "HTTP {}", resp.status)?;
        for (name, value) in &resp.headers {
            writeln!(out, "{}: {}", name, value)?;
        }
        writeln!(out)?;
    }
    out.write_all(&resp.body)?;
    out.flush()?;
    Ok(())
}

/// Retry stage from config plus command-line overrides.
fn build_stage(cfg: &ResendConfig, args: &GetArgs) -> RetryStage {
    let mut retry = cfg.retry.clone();
    if let Some(n) = args.max_retries {
        retry.max_retries = n;
    }
    if let Some(ms) = &args.delay_ms {
        retry.delay_schedule_ms = ms.clone();
    }
    let transport = Arc::new(CurlTransport::new(cfg.transport.to_options()));
    RetryStage::builder(transport)
        .policy(retry.to_policy())
        .log_sink(|line| eprintln!("resend: {}", line))
        .build()
}

fn build_request(args: &GetArgs) -> Result<Request> {
    let mut req = Request::get(&args.url).with_context(|| format!("invalid URL {}", args.url))?;
    for raw in &args.headers {
        let (name, value) = parse_header(raw)?;
        req = req.header(name, value);
    }
    if args.no_retry {
        req = req.disable_retries();
    }
    Ok(req)
}

/// Split `Name: value`.
fn parse_header(raw: &str) -> Result<(&str, &str)> {
    let Some((name, value)) = raw.split_once(':') else {
        bail!("header must look like 'Name: value', got {:?}", raw);
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("header name is empty in {:?}", raw);
    }
    Ok((name, value.trim()))
}
