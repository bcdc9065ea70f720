//! Integration test: real libcurl transport against a local server that fails
//! a configurable number of times before succeeding.

mod common;

use std::sync::Arc;

use common::flaky_server::{self, Failure, FlakyOptions};
use resend_core::backoff::BackoffSchedule;
use resend_core::config::RetryConfig;
use resend_core::ledger;
use resend_core::transport::CurlTransport;
use resend_core::{Request, RequestError, RetryStage};

fn stage(max_retries: u32) -> RetryStage {
    RetryStage::builder(Arc::new(CurlTransport::default()))
        .max_retries(max_retries)
        .delay_schedule(BackoffSchedule::from_millis(&[10, 20]))
        .build()
}

#[tokio::test]
async fn transient_503s_are_retried_until_success() {
    let server = flaky_server::start(
        b"hello",
        FlakyOptions {
            fail_first: 2,
            failure: Failure::Status(503),
        },
    );
    let mut req = Request::get(&server.url).unwrap();

    let resp = stage(3).execute(&mut req).await.expect("should succeed after retries");
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, b"hello");
    assert_eq!(resp.header("content-type"), Some("text/plain"));
    assert_eq!(server.hits(), 3);
    assert_eq!(ledger::attempt(&req), 2);
}

#[tokio::test]
async fn non_retryable_status_fails_on_first_response() {
    let server = flaky_server::start(
        b"never",
        FlakyOptions {
            fail_first: 1,
            failure: Failure::Status(404),
        },
    );
    let mut req = Request::get(&server.url).unwrap();

    let err = stage(3).execute(&mut req).await.unwrap_err();
    assert_eq!(err.status_code(), Some(404));
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn budget_exhaustion_forwards_last_error() {
    let server = flaky_server::start(
        b"never",
        FlakyOptions {
            fail_first: 10,
            failure: Failure::Status(500),
        },
    );
    let mut req = Request::get(&server.url).unwrap();

    let err = stage(2).execute(&mut req).await.unwrap_err();
    match err {
        RequestError::Response { status, body } => {
            assert_eq!(status, Some(500));
            assert_eq!(body, b"try again");
        }
        other => panic!("expected HTTP 500, got {other:?}"),
    }
    assert_eq!(server.hits(), 3);
    assert_eq!(ledger::attempt(&req), 2);
}

#[tokio::test]
async fn dropped_connection_is_retried() {
    let server = flaky_server::start(
        b"recovered",
        FlakyOptions {
            fail_first: 1,
            failure: Failure::Drop,
        },
    );
    let mut req = Request::get(&server.url).unwrap();

    let resp = stage(3).execute(&mut req).await.unwrap();
    assert_eq!(resp.text(), "recovered");
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn disabled_request_is_sent_once() {
    let server = flaky_server::start(
        b"x",
        FlakyOptions {
            fail_first: 1,
            failure: Failure::Status(503),
        },
    );
    let mut req = Request::get(&server.url).unwrap().disable_retries();

    let err = stage(3).execute(&mut req).await.unwrap_err();
    assert_eq!(err.status_code(), Some(503));
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn config_status_table_drives_default_evaluator() {
    let server = flaky_server::start(
        b"teapot ok",
        FlakyOptions {
            fail_first: 1,
            failure: Failure::Status(418),
        },
    );
    let cfg = RetryConfig {
        max_retries: 1,
        delay_schedule_ms: vec![],
        retryable_statuses: vec![418],
    };
    let stage = RetryStage::new(Arc::new(CurlTransport::default()), cfg.to_policy());
    let mut req = Request::get(&server.url).unwrap();

    let resp = stage.execute(&mut req).await.unwrap();
    assert_eq!(resp.text(), "teapot ok");
    assert_eq!(server.hits(), 2);
}
