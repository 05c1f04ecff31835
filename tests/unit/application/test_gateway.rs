use crate::common::{MockTransport, start_time, trading_config};
use capital_guard::prelude::*;
use capital_guard::utils::clock::elapsed_secs;
use serde_json::json;
use std::time::Duration;

struct Setup {
    gateway: Arc<Gateway>,
    broker: Arc<MockTransport>,
    clock: Arc<ManualClock>,
}

fn setup() -> Setup {
    let config = trading_config();
    let broker = Arc::new(MockTransport::new());
    let clock = Arc::new(ManualClock::new(start_time()));
    let limiter = Arc::new(RateLimiter::new(&config.rate_limiter, clock.clone()));
    let session = Arc::new(SessionManager::new(
        &config,
        broker.clone(),
        limiter.clone(),
        clock.clone(),
    ));
    let gateway = Arc::new(Gateway::new(
        session,
        limiter,
        broker.clone(),
        clock.clone(),
        config.retry.clone(),
    ));
    Setup {
        gateway,
        broker,
        clock,
    }
}

fn polling(max_wait_ms: u64) -> ConfirmPolling {
    ConfirmPolling {
        initial_delay: Duration::from_millis(200),
        interval: Duration::from_millis(500),
        max_wait: Duration::from_millis(max_wait_ms),
    }
}

#[tokio::test]
async fn test_get_retries_transient_failures() {
    let s = setup();
    s.broker
        .fail_next("GET", "/accounts", AppError::upstream(503, "unavailable"));
    s.broker
        .fail_next("GET", "/accounts", AppError::upstream(502, "bad gateway"));
    let start = s.clock.now();

    let body = s.gateway.get("/accounts", &[]).await.unwrap();
    assert_eq!(body, json!({"path": "/accounts"}));
    assert_eq!(s.broker.count("GET", "/accounts"), 3);
    // 100ms then 200ms of backoff, plus jitter
    assert!(elapsed_secs(start, s.clock.now()) >= 0.3);
}

#[tokio::test]
async fn test_get_gives_up_after_configured_attempts() {
    let s = setup();
    for _ in 0..3 {
        s.broker
            .fail_next("GET", "/accounts", AppError::upstream(500, "error.server"));
    }
    let err = s.gateway.get("/accounts", &[]).await.unwrap_err();
    assert!(matches!(err, AppError::Upstream { status: Some(500), .. }));
    assert_eq!(s.broker.count("GET", "/accounts"), 3);
}

#[tokio::test]
async fn test_get_does_not_retry_client_errors() {
    let s = setup();
    s.broker.fail_next(
        "GET",
        "/markets/NOPE",
        AppError::upstream(400, "error.invalid.epic"),
    );
    let err = s.gateway.get("/markets/NOPE", &[]).await.unwrap_err();
    assert_eq!(err.kind(), "UPSTREAM_ERROR");
    assert_eq!(s.broker.count("GET", "/markets/NOPE"), 1);
}

#[tokio::test]
async fn test_rejected_session_logs_in_once_and_retries() {
    let s = setup();
    s.broker.reject_token("CST-TOKEN-1");

    s.gateway.get("/accounts", &[]).await.unwrap();
    let calls = s.broker.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].security_token, "CST-TOKEN-1");
    assert_eq!(calls[1].security_token, "CST-TOKEN-2");
    assert_eq!(s.broker.auth_calls(), 2);
}

#[tokio::test]
async fn test_second_rejection_is_returned() {
    let s = setup();
    s.broker.reject_token("CST-TOKEN-1");
    s.broker.reject_token("CST-TOKEN-2");

    let err = s.gateway.get("/accounts", &[]).await.unwrap_err();
    assert!(matches!(err, AppError::SessionExpired));
    assert_eq!(s.broker.auth_calls(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rejections_share_one_relogin() {
    let s = setup();
    s.broker.reject_token("CST-TOKEN-1");
    let mut handles = Vec::new();
    for _ in 0..4 {
        let gateway = s.gateway.clone();
        handles.push(tokio::spawn(async move {
            gateway.get("/positions", &[]).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(s.broker.auth_calls(), 2);
}

#[tokio::test]
async fn test_write_is_sent_once() {
    let s = setup();
    s.broker
        .fail_next("POST", "/positions", AppError::upstream(503, "unavailable"));
    let body = json!({"epic": "GOLD", "direction": "BUY", "size": 1.0});

    let err = s
        .gateway
        .write(Method::POST, "/positions", Some(&body))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(s.broker.writes(), 1);
}

#[tokio::test]
async fn test_wait_for_confirmation_until_accepted() {
    let s = setup();
    s.broker
        .push_confirmation(json!({"dealReference": "o_REF1", "dealStatus": "PENDING"}));
    s.broker.push_confirmation(crate::common::accepted("o_REF1"));

    let outcome = s
        .gateway
        .wait_for_confirmation("o_REF1", polling(15_000))
        .await;
    assert!(!outcome.timed_out);
    assert_eq!(outcome.confirmation.deal_status, DealStatus::Accepted);
    assert_eq!(outcome.confirmation.deal_id.as_deref(), Some("D-1"));
    assert_eq!(s.broker.count("GET", "/confirms/o_REF1"), 2);
}

#[tokio::test]
async fn test_wait_for_confirmation_times_out_pending() {
    let s = setup();
    s.broker
        .push_confirmation(json!({"dealReference": "o_REF1", "dealStatus": "PENDING"}));
    let start = s.clock.now();

    let outcome = s
        .gateway
        .wait_for_confirmation("o_REF1", polling(2_000))
        .await;
    assert!(outcome.timed_out);
    assert_eq!(outcome.confirmation.deal_status, DealStatus::Pending);
    assert_eq!(outcome.confirmation.deal_reference, "o_REF1");

    let elapsed = elapsed_secs(start, s.clock.now());
    assert!(elapsed >= 2.0, "polled for {elapsed}s");
    assert!(elapsed < 2.5, "polled for {elapsed}s");
}

#[tokio::test]
async fn test_confirmation_lookup_errors_are_ignored() {
    let s = setup();
    s.broker.fail_next(
        "GET",
        "/confirms/o_REF1",
        AppError::upstream(404, "error.confirms.deal-not-found"),
    );

    let outcome = s
        .gateway
        .wait_for_confirmation("o_REF1", polling(5_000))
        .await;
    assert!(!outcome.timed_out);
    assert_eq!(outcome.confirmation.deal_status, DealStatus::Accepted);
}

#[tokio::test]
async fn test_zero_wait_polls_once() {
    let s = setup();
    s.broker
        .push_confirmation(json!({"dealReference": "o_REF1", "dealStatus": "PENDING"}));

    let outcome = s.gateway.wait_for_confirmation("o_REF1", polling(0)).await;
    assert!(outcome.timed_out);
    assert_eq!(s.broker.count("GET", "/confirms/o_REF1"), 1);
}
