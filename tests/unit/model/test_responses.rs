use capital_guard::prelude::*;
use capital_guard::model::responses::count_positions;
use serde_json::json;

fn rules(min: f64, max: f64, increment: f64) -> DealingRules {
    DealingRules {
        min_size: min,
        max_size: max,
        size_increment: increment,
        min_stop_distance: None,
    }
}

#[test]
fn test_normalized_sizes_are_multiples_within_bounds() {
    let cases = [
        (rules(0.1, 100.0, 0.1), [0.05, 0.15, 0.44, 0.45, 3.33, 99.99, 250.0]),
        (rules(1.0, 50.0, 1.0), [0.2, 1.4, 1.5, 7.49, 7.5, 49.6, 60.0]),
        (rules(0.01, 10.0, 0.01), [0.001, 0.015, 0.994, 1.005, 5.555, 9.999, 11.0]),
    ];
    for (rules, sizes) in cases {
        for size in sizes {
            let (normalized, _) = normalize_size(size, &rules);
            assert!(
                normalized >= rules.min_size && normalized <= rules.max_size,
                "{size} -> {normalized}"
            );
            let steps = normalized / rules.size_increment;
            assert!((steps - steps.round()).abs() < 1e-6, "{size} -> {normalized}");
        }
    }
}

#[test]
fn test_normalization_is_idempotent() {
    let rules = rules(0.5, 20.0, 0.5);
    for size in [0.1, 0.74, 0.75, 3.2, 19.8, 40.0] {
        let (once, _) = normalize_size(size, &rules);
        let (twice, warnings) = normalize_size(once, &rules);
        assert_eq!(once, twice);
        assert!(warnings.is_empty(), "{size}: {warnings:?}");
    }
}

#[test]
fn test_dealing_rules_repair_inverted_bounds() {
    let details = json!({
        "dealingRules": {
            "minDealSize": {"unit": "POINTS", "value": 5.0},
            "maxDealSize": {"unit": "POINTS", "value": 2.0},
            "minSizeIncrement": {"unit": "POINTS", "value": -1.0}
        }
    });
    let parsed = DealingRules::from_market_details(&details).unwrap();
    assert_eq!(parsed.min_size, 5.0);
    assert_eq!(parsed.max_size, 5.0);
    assert_eq!(parsed.size_increment, 0.1);
    assert_eq!(parsed.min_stop_distance, None);
}

#[test]
fn test_count_positions_requires_array() {
    assert_eq!(count_positions(&json!({"positions": [{}, {}]})), Some(2));
    assert_eq!(count_positions(&json!({"positions": null})), None);
    assert_eq!(count_positions(&json!([])), None);
}

#[test]
fn test_execution_result_shape() {
    let result = ExecutionResult {
        preview_id: Some("PV_1".to_string()),
        deal_reference: Some("o_REF".to_string()),
        confirmation: Some(DealConfirmation::pending("o_REF")),
        confirmation_timed_out: true,
        response: json!({"dealReference": "o_REF"}),
    };
    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["preview_id"], "PV_1");
    assert_eq!(value["confirmation"]["dealStatus"], "PENDING");
    assert_eq!(value["confirmation_timed_out"], true);
}
