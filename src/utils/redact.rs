/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Secret redaction for structured data and free text
//!
//! Two complementary passes are applied to everything that leaves the process:
//! key-based masking of JSON objects ([`redact_value`]) and value-based masking of
//! strings that may quote a secret verbatim, such as broker error bodies or
//! `Display` output of errors ([`redact_text`]).

use crate::constants::REDACTED;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Object keys whose values are always masked
static SECRET_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(password|token|secret|key$|api[_-]?key|^cst$)").expect("valid regex")
});

/// Header-style or JSON-style secret assignments inside free text
static SECRET_ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)("?(?:password|encryptedPassword|cst|x-security-token|x-cap-api-key|api[_-]?key)"?\s*[:=]\s*"?)([^",\s}]+)"#,
    )
    .expect("valid regex")
});

/// Returns true when an object key names a secret
#[must_use]
pub fn is_secret_key(key: &str) -> bool {
    SECRET_KEY.is_match(key)
}

/// Returns a copy of `value` with every secret-named field masked, recursively
#[must_use]
pub fn redact_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    if is_secret_key(k) && !v.is_null() {
                        (k.clone(), Value::String(REDACTED.to_string()))
                    } else {
                        (k.clone(), redact_value(v))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_value).collect()),
        other => other.clone(),
    }
}

/// Masks secret assignments and every occurrence of the given secret values
///
/// Secrets shorter than four characters are ignored to avoid masking unrelated
/// text.
#[must_use]
pub fn redact_text<S: AsRef<str>>(text: &str, secrets: &[S]) -> String {
    let mut out = SECRET_ASSIGNMENT
        .replace_all(text, |caps: &regex::Captures<'_>| {
            format!("{}{}", &caps[1], REDACTED)
        })
        .into_owned();
    for secret in secrets {
        let secret = secret.as_ref();
        if secret.len() >= 4 && out.contains(secret) {
            out = out.replace(secret, REDACTED);
        }
    }
    out
}

/// Applies [`redact_value`] and then [`redact_text`] to every string leaf
#[must_use]
pub fn redact_all<S: AsRef<str>>(value: &Value, secrets: &[S]) -> Value {
    match redact_value(value) {
        Value::String(s) => Value::String(redact_text(&s, secrets)),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, redact_all(&v, secrets)))
                .collect(),
        ),
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| redact_all(v, secrets)).collect())
        }
        other => other,
    }
}
