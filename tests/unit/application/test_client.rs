use crate::common::{API_KEY, EPIC, PASSWORD, harness, trading_config};
use assert_json_diff::{assert_json_eq, assert_json_include};
use capital_guard::prelude::*;
use serde_json::json;

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

fn last_call(h: &crate::common::Harness) -> crate::common::RecordedCall {
    h.broker.calls().pop().unwrap()
}

#[test]
fn test_invalid_configuration_is_rejected() {
    let mut config = trading_config();
    config.risk.allowed_epics.clear();
    let err = Client::new(config).unwrap_err();
    assert_eq!(err.kind(), "CONFIG_INVALID");

    let err = Client::new(Config::default()).unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
}

#[test]
fn test_construction_makes_no_call() {
    let h = harness(trading_config());
    assert_eq!(h.broker.auth_calls(), 0);
    assert!(h.broker.calls().is_empty());
    assert!(Client::new(trading_config()).is_ok());
}

#[tokio::test]
async fn test_respond_masks_secret_values_and_keys() {
    let h = harness(trading_config());
    h.client.ensure_session().await.unwrap();

    let data = json!({
        "echo": "token CST-TOKEN-1 here",
        "password": PASSWORD,
        "nested": [{"note": format!("key {API_KEY}"), "account": "XST-TOKEN-1"}],
        "dealId": "D1"
    });
    let result = h.client.respond(Ok(data)).await;
    assert!(result.ok);
    assert_json_eq!(
        result.data.unwrap(),
        json!({
            "echo": "token ***REDACTED*** here",
            "password": "***REDACTED***",
            "nested": [{"note": "key ***REDACTED***", "account": "***REDACTED***"}],
            "dealId": "D1"
        })
    );
}

#[tokio::test]
async fn test_respond_masks_error_messages() {
    let h = harness(trading_config());
    h.client.ensure_session().await.unwrap();

    let result = h
        .client
        .respond::<()>(Err(AppError::upstream(500, "bad header XST-TOKEN-1")))
        .await;
    assert!(!result.ok);
    let error = result.error.unwrap();
    assert_eq!(error.kind, "UPSTREAM_ERROR");
    assert_eq!(error.message, "upstream error: HTTP 500: bad header ***REDACTED***");

    // credentials are masked even without a session
    h.client.logout().await.unwrap();
    let result = h
        .client
        .respond::<()>(Err(AppError::Auth(format!("refused {PASSWORD}"))))
        .await;
    assert!(!result.error.unwrap().message.contains(PASSWORD));
}

#[tokio::test]
async fn test_no_operation_result_leaks_credentials() {
    let h = harness(trading_config());
    let status = h.client.ensure_session().await;
    let result = h.client.respond(status).await;
    let text = serde_json::to_string(&result).unwrap();

    for secret in [API_KEY, PASSWORD, "CST-TOKEN-1", "XST-TOKEN-1"] {
        assert!(!text.contains(secret), "{secret} leaked in {text}");
    }
    assert_json_include!(
        actual: serde_json::to_value(&result).unwrap(),
        expected: json!({"ok": true, "data": {"logged_in": true, "environment": "demo"}})
    );
}

#[tokio::test]
async fn test_failure_envelope() {
    let h = harness(trading_config());
    let result = h.client.respond(h.client.ping().await).await;
    let value = serde_json::to_value(&result).unwrap();

    assert_eq!(value["ok"], false);
    assert_eq!(value["error"]["kind"], "SESSION_NOT_INITIALIZED");
    assert!(value.get("data").is_none());
    assert!(value["meta"]["ts"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_session_round_trip() {
    let h = harness(trading_config());
    assert!(!h.client.session_status().await.logged_in);

    let status = h.client.login(None).await.unwrap();
    assert!(status.logged_in);
    assert_eq!(status.account_id.as_deref(), Some("ACC-1"));
    assert_eq!(status.base_url, "http://broker.test/api/v1");

    let status = h.client.switch_account("ACC-7").await.unwrap();
    assert_eq!(status.account_id.as_deref(), Some("ACC-7"));

    h.client.shutdown().await.unwrap();
    assert!(!h.client.session_status().await.logged_in);
}

#[tokio::test]
async fn test_snapshots() {
    let mut config = trading_config();
    config.risk.allowed_epics = vec!["GOLD".to_string(), "EURUSD".to_string()];
    let h = harness(config);

    let allowlist = h.client.allowlist_snapshot();
    assert!(!allowlist.allow_all);
    assert_eq!(allowlist.epics, vec!["GOLD", "EURUSD"]);

    let policy = h.client.risk_policy_snapshot();
    assert!(policy.allow_trading);
    assert!(policy.require_explicit_confirm);
    assert_eq!(policy.orders_remaining_today, 20);

    h.client.ensure_session().await.unwrap();
    let rates = h.client.rate_limit_snapshot();
    assert_eq!(rates.tiers.len(), 3);
    let session = rates
        .tiers
        .iter()
        .find(|t| t.tier == RateTier::Session)
        .unwrap();
    assert_eq!(session.available, 0.0);
    assert_eq!(session.capacity, 1.0);
}

#[tokio::test]
async fn test_market_reads() {
    let h = harness(trading_config());

    h.client.search_markets(Some(" gold "), &[]).await.unwrap();
    let call = last_call(&h);
    assert_eq!(call.path, "/markets");
    assert_eq!(call.query, pairs(&[("searchTerm", "gold")]));

    let epics = vec!["GOLD".to_string(), "SILVER".to_string()];
    h.client.search_markets(None, &epics).await.unwrap();
    assert_eq!(last_call(&h).query, pairs(&[("epics", "GOLD,SILVER")]));

    let details = h.client.get_market_details(EPIC).await.unwrap();
    assert_eq!(details["instrument"]["epic"], EPIC);

    let query = PriceQuery::new().with_resolution("hour").with_max(10);
    h.client.get_prices(EPIC, &query).await.unwrap();
    let call = last_call(&h);
    assert_eq!(call.path, "/prices/GOLD");
    assert_eq!(call.query, pairs(&[("resolution", "HOUR"), ("max", "10")]));

    h.client.get_market_navigation().await.unwrap();
    assert_eq!(last_call(&h).path, "/marketnavigation");
    h.client
        .get_market_navigation_node("hierarchy_v1.commodities", Some(5))
        .await
        .unwrap();
    let call = last_call(&h);
    assert_eq!(call.path, "/marketnavigation/hierarchy_v1.commodities");
    assert_eq!(call.query, pairs(&[("limit", "5")]));

    h.client
        .get_client_sentiment(&["GOLD".to_string()])
        .await
        .unwrap();
    assert_eq!(last_call(&h).path, "/clientsentiment/GOLD");
    h.client.get_client_sentiment(&epics).await.unwrap();
    let call = last_call(&h);
    assert_eq!(call.path, "/clientsentiment");
    assert_eq!(call.query, pairs(&[("marketIds", "GOLD,SILVER")]));
}

#[tokio::test]
async fn test_market_read_validation() {
    let h = harness(trading_config());

    assert!(matches!(
        h.client.search_markets(Some("  "), &[]).await,
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        h.client
            .get_prices(EPIC, &PriceQuery::new().with_resolution("FORTNIGHT"))
            .await,
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        h.client.get_prices(EPIC, &PriceQuery::new().with_max(0)).await,
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        h.client.get_client_sentiment(&[]).await,
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        h.client.get_market_details("GOLD?x=1").await,
        Err(AppError::Validation(_))
    ));
    assert!(h.broker.calls().is_empty());
}

#[tokio::test]
async fn test_account_reads() {
    let h = harness(trading_config());

    h.client.get_accounts().await.unwrap();
    assert_eq!(last_call(&h).path, "/accounts");
    h.client.get_account_preferences().await.unwrap();
    assert_eq!(last_call(&h).path, "/accounts/preferences");

    h.client
        .get_activity(&HistoryQuery::new().with_last_period(600))
        .await
        .unwrap();
    let call = last_call(&h);
    assert_eq!(call.path, "/history/activity");
    assert_eq!(call.query, pairs(&[("lastPeriod", "600")]));

    let query = HistoryQuery::new()
        .between("2026-03-01T00:00:00", "2026-03-02T00:00:00")
        .with_transaction_type("TRADE");
    h.client.get_transactions(&query).await.unwrap();
    let call = last_call(&h);
    assert_eq!(call.path, "/history/transactions");
    assert_eq!(
        call.query,
        pairs(&[
            ("from", "2026-03-01T00:00:00"),
            ("to", "2026-03-02T00:00:00"),
            ("type", "TRADE")
        ])
    );

    let positions = h.client.get_positions().await.unwrap();
    assert_eq!(positions, json!({"positions": []}));
    h.client.get_position("D1").await.unwrap();
    assert_eq!(last_call(&h).path, "/positions/D1");
    h.client.get_working_orders().await.unwrap();
    assert_eq!(last_call(&h).path, "/workingorders");

    let confirmation = h.client.get_deal_confirmation("o_ABC").await.unwrap();
    assert_eq!(confirmation.deal_reference, "o_ABC");
    assert_eq!(confirmation.deal_status, DealStatus::Accepted);
}
