use crate::common::{EPIC, gold_buy, harness, market_details, trading_config};
use capital_guard::model::preview::check;
use capital_guard::prelude::*;
use serde_json::json;
use std::time::Duration;
use tokio_test::block_on;

fn check_named<'a>(record: &'a PreviewRecord, name: &str) -> &'a RiskCheck {
    record
        .checks
        .iter()
        .find(|c| c.name == name)
        .unwrap_or_else(|| panic!("no check named {name}"))
}

#[tokio::test]
async fn test_preview_normalizes_and_passes() {
    let h = harness(trading_config());
    let record = h.client.preview_position(gold_buy(0.37)).await.unwrap();

    assert!(record.all_passed, "{:?}", record.failed_checks());
    assert!(!record.consumed);
    assert_eq!(record.request.size, 0.4);
    assert_eq!(record.requested_size, 0.37);
    assert_eq!(record.size_warnings.len(), 1);
    assert_eq!(record.estimated_entry, Some(2001.0));
    assert_eq!(
        record.expires_at - record.created_at,
        chrono::Duration::seconds(120)
    );
    let names: Vec<&str> = record.checks.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            check::EPIC_ALLOWED,
            check::TRADING_ENABLED,
            check::MAX_POSITION_SIZE,
            check::DAILY_ORDER_LIMIT,
            check::MAX_OPEN_POSITIONS,
            check::DEALING_RULES,
        ]
    );
    assert_eq!(h.broker.writes(), 0);
}

#[tokio::test]
async fn test_previews_are_independent_and_side_effect_free() {
    let h = harness(trading_config());
    let first = h.client.preview_position(gold_buy(1.0)).await.unwrap();
    let second = h.client.preview_position(gold_buy(1.0)).await.unwrap();

    assert_ne!(first.preview_id, second.preview_id);
    assert!(first.preview_id.starts_with("PV_"));
    let snapshot = h.client.risk_policy_snapshot();
    assert_eq!(snapshot.pending_previews, 2);
    assert_eq!(snapshot.orders_today, 0);
    assert_eq!(h.broker.writes(), 0);
}

#[tokio::test]
async fn test_sell_estimate_uses_bid() {
    let h = harness(trading_config());
    let request = TradeRequest::position(EPIC, Direction::Sell, 1.0);
    let record = h.client.preview_position(request).await.unwrap();
    assert_eq!(record.estimated_entry, Some(2000.5));
}

#[tokio::test]
async fn test_epic_outside_allowlist_fails_its_check() {
    let mut config = trading_config();
    config.risk.allowed_epics = vec!["EURUSD".to_string()];
    let h = harness(config);

    let record = h.client.preview_position(gold_buy(1.0)).await.unwrap();
    assert!(!record.all_passed);
    assert!(!check_named(&record, check::EPIC_ALLOWED).passed);
    assert_eq!(record.failed_checks(), vec![check::EPIC_ALLOWED]);
}

#[tokio::test]
async fn test_allowlist_is_case_insensitive() {
    let mut config = trading_config();
    config.risk.allowed_epics = vec!["gold".to_string()];
    let h = harness(config);

    let record = h.client.preview_position(gold_buy(1.0)).await.unwrap();
    assert!(check_named(&record, check::EPIC_ALLOWED).passed);
}

#[tokio::test]
async fn test_trading_disabled_fails_its_check() {
    let mut config = trading_config();
    config.risk.allow_trading = false;
    let h = harness(config);

    let record = h.client.preview_position(gold_buy(1.0)).await.unwrap();
    assert!(!record.all_passed);
    assert_eq!(record.failed_checks(), vec![check::TRADING_ENABLED]);
}

#[tokio::test]
async fn test_size_ceiling_applies_to_normalized_size() {
    let h = harness(trading_config());
    let record = h.client.preview_position(gold_buy(5.04)).await.unwrap();
    assert_eq!(record.request.size, 5.0);
    assert!(check_named(&record, check::MAX_POSITION_SIZE).passed);

    let record = h.client.preview_position(gold_buy(7.0)).await.unwrap();
    assert!(!check_named(&record, check::MAX_POSITION_SIZE).passed);
    assert!(!record.all_passed);
}

#[tokio::test]
async fn test_working_order_uses_its_own_ceiling() {
    let mut config = trading_config();
    config.risk.max_working_order_size = 0.5;
    let h = harness(config);
    let request =
        TradeRequest::working_order(EPIC, Direction::Buy, 1.0, WorkingOrderType::Limit, 1990.0);

    let record = h.client.preview_working_order(request).await.unwrap();
    assert!(!check_named(&record, check::MAX_WORKING_ORDER_SIZE).passed);
    assert!(record.checks.iter().all(|c| c.name != check::MAX_POSITION_SIZE));
    assert!(record.checks.iter().all(|c| c.name != check::MAX_OPEN_POSITIONS));
    assert_eq!(h.broker.count("GET", "/positions"), 0);
}

#[tokio::test]
async fn test_open_position_limit() {
    let h = harness(trading_config());
    h.broker.set_positions(json!({
        "positions": [{"dealId": "D1"}, {"dealId": "D2"}, {"dealId": "D3"}]
    }));
    let record = h.client.preview_position(gold_buy(1.0)).await.unwrap();
    let open = check_named(&record, check::MAX_OPEN_POSITIONS);
    assert!(!open.passed);
    assert_eq!(open.detail, "3/3 open positions");

    h.broker.set_positions(json!({"positions": [{"dealId": "D1"}]}));
    let record = h.client.preview_position(gold_buy(1.0)).await.unwrap();
    assert!(check_named(&record, check::MAX_OPEN_POSITIONS).passed);
}

#[tokio::test]
async fn test_open_positions_unknown_fails_closed() {
    let h = harness(trading_config());
    h.broker
        .fail_next("GET", "/positions", AppError::upstream(400, "error.invalid"));
    let record = h.client.preview_position(gold_buy(1.0)).await.unwrap();
    let open = check_named(&record, check::MAX_OPEN_POSITIONS);
    assert!(!open.passed);
    assert!(open.detail.contains("unavailable"));

    h.broker.set_positions(json!({"unexpected": true}));
    let record = h.client.preview_position(gold_buy(1.0)).await.unwrap();
    assert!(!check_named(&record, check::MAX_OPEN_POSITIONS).passed);
}

#[tokio::test]
async fn test_missing_dealing_rules_fail_their_check() {
    let h = harness(trading_config());
    h.broker.remove_market(EPIC);

    let record = h.client.preview_position(gold_buy(0.37)).await.unwrap();
    assert!(!check_named(&record, check::DEALING_RULES).passed);
    assert_eq!(record.request.size, 0.37);
    assert_eq!(record.dealing_rules, None);
    assert_eq!(record.estimated_entry, None);
    assert!(!record.all_passed);
}

#[tokio::test]
async fn test_market_without_rules_block_fails_closed() {
    let h = harness(trading_config());
    h.broker
        .set_market(EPIC, json!({"snapshot": {"bid": 1.0, "offer": 1.1}}));

    let record = h.client.preview_position(gold_buy(1.0)).await.unwrap();
    assert!(!check_named(&record, check::DEALING_RULES).passed);
    assert_eq!(record.estimated_entry, Some(1.1));
}

#[tokio::test]
async fn test_size_clamped_to_broker_bounds() {
    let h = harness(trading_config());
    h.broker.set_market(EPIC, market_details(1.0, 2.0, 0.5));

    let record = h.client.preview_position(gold_buy(0.2)).await.unwrap();
    assert_eq!(record.request.size, 1.0);
    assert!(record.size_warnings[0].contains("minimum"));

    let record = h.client.preview_position(gold_buy(3.0)).await.unwrap();
    assert_eq!(record.request.size, 2.0);
    assert!(record.size_warnings[0].contains("maximum"));
}

#[tokio::test]
async fn test_short_stop_distance_is_warned() {
    let h = harness(trading_config());
    let request = gold_buy(1.0).with_stop_distance(2.0).with_profit_distance(10.0);

    let record = h.client.preview_position(request).await.unwrap();
    assert!(record.all_passed);
    assert_eq!(record.size_warnings.len(), 1);
    assert!(record.size_warnings[0].starts_with("stop_distance"));
}

#[tokio::test]
async fn test_malformed_request_is_rejected_before_network() {
    let h = harness(trading_config());

    let err = h.client.preview_position(gold_buy(0.0)).await.unwrap_err();
    assert_eq!(err.kind(), "INVALID_REQUEST");
    let err = h
        .client
        .preview_position(gold_buy(1.0).with_guaranteed_stop().with_trailing_stop())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert!(h.broker.calls().is_empty());
    assert_eq!(h.broker.auth_calls(), 0);
}

#[tokio::test]
async fn test_epic_that_would_change_the_market_path_is_rejected() {
    let h = harness(trading_config());
    for epic in ["GOLD#X", "../accounts", "SILVER/../GOLD", ".."] {
        let request = TradeRequest::position(epic, Direction::Buy, 1.0);
        let err = h.client.preview_position(request).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "{epic}: {err}");

        let working =
            TradeRequest::working_order(epic, Direction::Buy, 1.0, WorkingOrderType::Limit, 1990.0);
        let err = h.client.preview(working).await.unwrap_err();
        assert_eq!(err.kind(), "INVALID_REQUEST");
    }
    assert!(h.broker.calls().is_empty());
    assert_eq!(h.broker.auth_calls(), 0);
    assert_eq!(h.client.risk_policy_snapshot().pending_previews, 0);
}

#[tokio::test]
async fn test_preview_kind_must_match_entry_point() {
    let h = harness(trading_config());
    let working =
        TradeRequest::working_order(EPIC, Direction::Sell, 1.0, WorkingOrderType::Stop, 1990.0);

    assert!(matches!(
        h.client.preview_position(working).await,
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        h.client.preview_working_order(gold_buy(1.0)).await,
        Err(AppError::Validation(_))
    ));
}

#[test]
fn test_expired_previews_leave_the_snapshot() {
    let h = harness(trading_config());
    block_on(h.client.preview_position(gold_buy(1.0))).unwrap();
    assert_eq!(h.client.risk_policy_snapshot().pending_previews, 1);

    h.clock.advance(Duration::from_secs(121));
    assert_eq!(h.client.risk_policy_snapshot().pending_previews, 0);
}
