/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

/// User agent string used in HTTP requests to identify this client to the broker
pub const USER_AGENT: &str = "capital-guard/0.1.0";
/// Base URL of the demo environment
pub const DEMO_BASE_URL: &str = "https://demo-api-capital.backend-capital.com/api/v1";
/// Base URL of the live environment
pub const LIVE_BASE_URL: &str = "https://api-capital.backend-capital.com/api/v1";
/// Default HTTP timeout in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

/// Sessions are refreshed once they have been idle this long.
///
/// The broker drops a session after ten minutes without activity; refreshing at
/// nine leaves a minute of slack for clock drift and in-flight calls.
pub const SESSION_REFRESH_THRESHOLD_SECS: i64 = 540;

/// Time-to-live of a preview record
pub const PREVIEW_TTL_SECS: i64 = 120;

/// Delay before the first confirmation poll
pub const CONFIRM_INITIAL_DELAY_MS: u64 = 200;
/// Interval between confirmation polls
pub const CONFIRM_POLL_INTERVAL_MS: u64 = 500;
/// Maximum time spent polling for a deal confirmation
pub const CONFIRM_MAX_WAIT_SECS: u64 = 15;

/// Global bucket capacity (broker limit: 10 requests per second)
pub const GLOBAL_RATE_CAPACITY: f64 = 10.0;
/// Global bucket refill rate per second
pub const GLOBAL_RATE_PER_SEC: f64 = 10.0;
/// Session bucket capacity (broker limit: 1 login per second)
pub const SESSION_RATE_CAPACITY: f64 = 1.0;
/// Session bucket refill rate per second
pub const SESSION_RATE_PER_SEC: f64 = 1.0;
/// Trading bucket capacity (broker limit: 1 trade request per 0.1 seconds)
pub const TRADING_RATE_CAPACITY: f64 = 10.0;
/// Trading bucket refill rate per second
pub const TRADING_RATE_PER_SEC: f64 = 10.0;
/// Default time a caller waits for rate admission
pub const DEFAULT_RATE_TIMEOUT_SECS: u64 = 10;

/// Default number of attempts for safe reads
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Base delay of the exponential backoff for safe reads
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1000;
/// Cap of the exponential backoff for safe reads
pub const MAX_RETRY_DELAY_MS: u64 = 10_000;

/// Fallback minimum deal size when the broker omits it
pub const DEFAULT_MIN_DEAL_SIZE: f64 = 0.1;
/// Fallback maximum deal size when the broker omits it
pub const DEFAULT_MAX_DEAL_SIZE: f64 = 1000.0;
/// Fallback size increment when the broker omits it
pub const DEFAULT_SIZE_INCREMENT: f64 = 0.1;

/// Wildcard allowlist entry that admits every instrument
pub const ALLOW_ALL_EPICS: &str = "ALL";
/// Replacement text for redacted secrets
pub const REDACTED: &str = "***REDACTED***";
