use capital_guard::constants::REDACTED;
use capital_guard::prelude::*;
use capital_guard::utils::redact::is_secret_key;
use serde_json::json;

#[test]
fn test_secret_key_names() {
    for key in ["password", "encryptedPassword", "CST", "X-SECURITY-TOKEN", "apiKey", "api_key", "clientSecret"] {
        assert!(is_secret_key(key), "{key}");
    }
    for key in ["epic", "dealId", "dealReference", "identifier", "accountId", "preview_id"] {
        assert!(!is_secret_key(key), "{key}");
    }
}

#[test]
fn test_redact_all_combines_both_passes() {
    let value = json!({
        "token": "abc",
        "log": ["X-CAP-API-KEY: my-api-key-1", "plain"],
        "quote": "value secret-value-1 quoted"
    });
    let out = redact_all(&value, &["secret-value-1"]);
    assert_eq!(out["token"], REDACTED);
    assert_eq!(out["log"][0], format!("X-CAP-API-KEY: {REDACTED}"));
    assert_eq!(out["log"][1], "plain");
    assert_eq!(out["quote"], format!("value {REDACTED} quoted"));
}

#[test]
fn test_null_secret_fields_stay_null() {
    let out = redact_value(&json!({"password": null, "size": 1.0}));
    assert!(out["password"].is_null());
    assert_eq!(out["size"], 1.0);
}
