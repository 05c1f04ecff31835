use capital_guard::prelude::*;
use serde_json::json;

#[test]
fn test_price_query_normalizes_resolution() {
    let query = PriceQuery::new()
        .with_resolution(" minute_5 ")
        .with_max(1000)
        .with_from("2026-03-01T00:00:00")
        .with_to("2026-03-02T00:00:00");
    assert_eq!(
        query.to_query().unwrap(),
        vec![
            ("resolution", "MINUTE_5".to_string()),
            ("max", "1000".to_string()),
            ("from", "2026-03-01T00:00:00".to_string()),
            ("to", "2026-03-02T00:00:00".to_string()),
        ]
    );
    assert!(PriceQuery::new().to_query().unwrap().is_empty());
}

#[test]
fn test_price_query_rejects_bad_values() {
    assert!(matches!(
        PriceQuery::new().with_resolution("MONTH").to_query(),
        Err(AppError::Validation(_))
    ));
    assert!(PriceQuery::new().with_max(1001).to_query().is_err());
    assert!(PriceQuery::new().with_max(0).to_query().is_err());
}

#[test]
fn test_history_query_pairs() {
    assert!(HistoryQuery::new().to_query().is_empty());
    let query = HistoryQuery::new().with_last_period(3600).with_transaction_type("DEPOSIT");
    assert_eq!(
        query.to_query(),
        vec![
            ("lastPeriod", "3600".to_string()),
            ("type", "DEPOSIT".to_string())
        ]
    );
}

#[test]
fn test_trade_request_from_caller_json() {
    let request: TradeRequest = serde_json::from_value(json!({
        "epic": "GOLD",
        "direction": "SELL",
        "size": 1.5,
        "stop_level": 2100.0,
        "working_order": {"type": "LIMIT", "level": 2050.0, "good_till_date": "2026-04-01T00:00:00"}
    }))
    .unwrap();

    assert!(request.is_working_order());
    assert_eq!(request.endpoint(), "/workingorders");
    assert!(!request.guaranteed_stop);
    request.validate().unwrap();
    assert_eq!(
        request.to_broker_body().unwrap(),
        json!({
            "epic": "GOLD",
            "direction": "SELL",
            "size": 1.5,
            "type": "LIMIT",
            "level": 2050.0,
            "goodTillDate": "2026-04-01T00:00:00",
            "stopLevel": 2100.0
        })
    );
}

#[test]
fn test_stop_flags_only_sent_when_set() {
    let body = TradeRequest::position("GOLD", Direction::Buy, 1.0)
        .with_guaranteed_stop()
        .with_stop_distance(10.0)
        .to_broker_body()
        .unwrap();
    assert_eq!(body["guaranteedStop"], true);
    assert!(body.get("trailingStop").is_none());
    assert_eq!(body["stopDistance"], 10.0);
}

#[test]
fn test_validation_messages_name_the_field() {
    let err = TradeRequest::position("GOLD", Direction::Buy, 1.0)
        .with_profit_amount(-5.0)
        .validate()
        .unwrap_err();
    assert!(err.to_string().contains("profit_amount"));

    let err = TradeRequest::working_order("GOLD", Direction::Buy, 1.0, WorkingOrderType::Limit, 0.0)
        .validate()
        .unwrap_err();
    assert!(err.to_string().contains("level"));

    let err = TradeRequest::position(" ", Direction::Buy, 1.0)
        .validate()
        .unwrap_err();
    assert_eq!(err.to_string(), "invalid request: epic is required");

    assert!(
        TradeRequest::position("GOLD", Direction::Buy, f64::NAN)
            .validate()
            .is_err()
    );
}
