use capital_guard::prelude::*;
use std::time::Duration;

#[test]
fn test_retry_config_defaults() {
    let config = RetryConfig::new();
    assert_eq!(config.max_retries(), 3);
    assert_eq!(config.delay_ms(), 1000);
}

#[test]
fn test_retry_config_builders() {
    assert_eq!(RetryConfig::with_max_retries(5).max_retries(), 5);
    assert_eq!(RetryConfig::with_max_retries(0).max_retries(), 1);

    let config = RetryConfig::with_max_retries_and_delay(4, 250);
    assert_eq!(config.max_retries(), 4);
    assert_eq!(config.delay_ms(), 250);
    let backoff = config.backoff(2);
    assert!(backoff >= Duration::from_millis(1000));
    assert!(backoff <= Duration::from_millis(1100));
}

#[test]
fn test_backoff_is_capped() {
    let config = RetryConfig::with_max_retries_and_delay(10, 5000);
    assert!(config.backoff(6) <= Duration::from_millis(11_000));
}
