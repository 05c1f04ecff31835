/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/
use crate::constants::{
    ALLOW_ALL_EPICS, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_RATE_TIMEOUT_SECS, DEMO_BASE_URL,
    GLOBAL_RATE_CAPACITY, GLOBAL_RATE_PER_SEC, LIVE_BASE_URL, REDACTED, SESSION_RATE_CAPACITY,
    SESSION_RATE_PER_SEC, TRADING_RATE_CAPACITY, TRADING_RATE_PER_SEC,
};
use crate::error::AppError;
use crate::model::retry::RetryConfig;
use crate::utils::config::{get_env_flag, get_env_or_default, get_env_or_none, split_list};
use dotenv::dotenv;
use pretty_simple_display::{DebugPretty, DisplaySimple};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, error};

fn serialize_redacted<T: ?Sized, S: Serializer>(_: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(REDACTED)
}

/// Broker environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Demo account, no real money
    #[default]
    Demo,
    /// Live account
    Live,
}

impl Environment {
    /// Default REST base URL of the environment
    #[must_use]
    pub fn base_url(&self) -> &'static str {
        match self {
            Environment::Demo => DEMO_BASE_URL,
            Environment::Live => LIVE_BASE_URL,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Demo => write!(f, "demo"),
            Environment::Live => write!(f, "live"),
        }
    }
}

impl FromStr for Environment {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "demo" => Ok(Environment::Demo),
            "live" => Ok(Environment::Live),
            other => Err(AppError::Config(format!(
                "environment must be demo or live, got '{other}'"
            ))),
        }
    }
}

#[derive(DebugPretty, DisplaySimple, Serialize, Clone, Default)]
/// Authentication credentials for the Capital.com API
///
/// The API key and password are masked whenever the value is serialized,
/// displayed or debug-printed.
pub struct Credentials {
    /// API key generated in the Capital.com platform
    #[serde(serialize_with = "serialize_redacted")]
    pub api_key: String,
    /// Login identifier (e-mail)
    pub identifier: String,
    /// Custom password attached to the API key
    #[serde(serialize_with = "serialize_redacted")]
    pub password: String,
}

impl Credentials {
    /// Creates a credential set
    pub fn new(
        api_key: impl Into<String>,
        identifier: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            identifier: identifier.into(),
            password: password.into(),
        }
    }

    /// Secret values that must never leave the process
    #[must_use]
    pub fn secrets(&self) -> Vec<String> {
        vec![self.api_key.clone(), self.password.clone()]
    }
}

#[derive(DebugPretty, DisplaySimple, Serialize, Deserialize, Clone)]
/// Configuration for the REST API
pub struct RestApiConfig {
    /// Base URL including the `/api/v1` prefix
    pub base_url: String,
    /// Timeout in seconds for REST API requests
    pub timeout: u64,
}

#[derive(DebugPretty, DisplaySimple, Serialize, Deserialize, Clone, Copy, PartialEq)]
/// Shape of one token bucket
pub struct BucketConfig {
    /// Maximum number of tokens held
    pub capacity: f64,
    /// Tokens added per second
    pub refill_per_sec: f64,
}

#[derive(DebugPretty, DisplaySimple, Serialize, Deserialize, Clone)]
/// Configuration for rate admission control
pub struct RateLimiterConfig {
    /// Bucket shared by every outbound call
    pub global: BucketConfig,
    /// Bucket for session creation
    pub session: BucketConfig,
    /// Bucket for trade writes
    pub trading: BucketConfig,
    /// Seconds a caller waits for admission before giving up
    pub acquire_timeout_secs: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            global: BucketConfig {
                capacity: GLOBAL_RATE_CAPACITY,
                refill_per_sec: GLOBAL_RATE_PER_SEC,
            },
            session: BucketConfig {
                capacity: SESSION_RATE_CAPACITY,
                refill_per_sec: SESSION_RATE_PER_SEC,
            },
            trading: BucketConfig {
                capacity: TRADING_RATE_CAPACITY,
                refill_per_sec: TRADING_RATE_PER_SEC,
            },
            acquire_timeout_secs: DEFAULT_RATE_TIMEOUT_SECS,
        }
    }
}

#[derive(DebugPretty, DisplaySimple, Serialize, Deserialize, Clone)]
/// Local trading policy enforced by the risk engine
pub struct RiskPolicy {
    /// Master switch for every trade write
    pub allow_trading: bool,
    /// Instruments that may be traded; `ALL` admits every instrument
    pub allowed_epics: Vec<String>,
    /// Largest size of a new position after normalization
    pub max_position_size: f64,
    /// Largest size of a working order after normalization
    pub max_working_order_size: f64,
    /// Maximum number of simultaneously open positions
    pub max_open_positions: u32,
    /// Maximum number of executed trades per UTC day
    pub max_orders_per_day: u32,
    /// Whether execution requires `confirm = true`
    pub require_explicit_confirm: bool,
    /// Validate everything, submit nothing
    pub dry_run: bool,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            allow_trading: false,
            allowed_epics: Vec::new(),
            max_position_size: 1.0,
            max_working_order_size: 1.0,
            max_open_positions: 3,
            max_orders_per_day: 20,
            require_explicit_confirm: true,
            dry_run: false,
        }
    }
}

impl RiskPolicy {
    /// True when the allowlist contains the `ALL` wildcard
    #[must_use]
    pub fn allows_all(&self) -> bool {
        self.allowed_epics
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ALLOW_ALL_EPICS))
    }

    /// Case-insensitive allowlist lookup
    #[must_use]
    pub fn is_epic_allowed(&self, epic: &str) -> bool {
        let epic = epic.trim();
        self.allows_all() || self.allowed_epics.iter().any(|e| e.eq_ignore_ascii_case(epic))
    }
}

#[derive(DebugPretty, DisplaySimple, Serialize, Clone)]
/// Main configuration of a control surface instance
pub struct Config {
    /// Demo or live
    pub environment: Environment,
    /// Authentication credentials
    pub credentials: Credentials,
    /// REST API configuration
    pub rest_api: RestApiConfig,
    /// Account selected after every login, if any
    pub default_account_id: Option<String>,
    /// Trading policy
    pub risk: RiskPolicy,
    /// Rate limiter configuration for API requests
    pub rate_limiter: RateLimiterConfig,
    /// Retry behaviour for safe reads
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        let environment = Environment::Demo;
        Self {
            environment,
            credentials: Credentials::default(),
            rest_api: RestApiConfig {
                base_url: environment.base_url().to_string(),
                timeout: DEFAULT_HTTP_TIMEOUT_SECS,
            },
            default_account_id: None,
            risk: RiskPolicy::default(),
            rate_limiter: RateLimiterConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Builds the configuration from the environment (and a `.env` file if present)
    ///
    /// Missing or unparsable values fall back to the safe defaults of
    /// [`Config::default`]; run [`Config::validate`] before use.
    pub fn new() -> Self {
        match dotenv() {
            Ok(_) => debug!("Successfully loaded .env file"),
            Err(e) => debug!("Failed to load .env file: {e}"),
        }

        let defaults = Config::default();
        let environment = get_env_or_default("CAP_ENV", String::from("demo"))
            .parse::<Environment>()
            .unwrap_or_else(|e| {
                error!("{e}, using demo");
                Environment::Demo
            });

        let api_key = get_env_or_default("CAP_API_KEY", String::new());
        let identifier = get_env_or_default("CAP_IDENTIFIER", String::new());
        let password = get_env_or_default("CAP_API_PASSWORD", String::new());

        if api_key.is_empty() {
            error!("CAP_API_KEY not found in environment variables or .env file");
        }
        if identifier.is_empty() {
            error!("CAP_IDENTIFIER not found in environment variables or .env file");
        }
        if password.is_empty() {
            error!("CAP_API_PASSWORD not found in environment variables or .env file");
        }

        let risk_defaults = defaults.risk;
        let rate_defaults = defaults.rate_limiter;

        Config {
            environment,
            credentials: Credentials {
                api_key,
                identifier,
                password,
            },
            rest_api: RestApiConfig {
                base_url: get_env_or_default(
                    "CAP_REST_BASE_URL",
                    environment.base_url().to_string(),
                ),
                timeout: get_env_or_default("CAP_HTTP_TIMEOUT_S", DEFAULT_HTTP_TIMEOUT_SECS),
            },
            default_account_id: get_env_or_none::<String>("CAP_DEFAULT_ACCOUNT_ID")
                .filter(|s| !s.is_empty()),
            risk: RiskPolicy {
                allow_trading: get_env_flag("CAP_ALLOW_TRADING", risk_defaults.allow_trading),
                allowed_epics: split_list(&get_env_or_default(
                    "CAP_ALLOWED_EPICS",
                    String::new(),
                )),
                max_position_size: get_env_or_default(
                    "CAP_MAX_POSITION_SIZE",
                    risk_defaults.max_position_size,
                ),
                max_working_order_size: get_env_or_default(
                    "CAP_MAX_WORKING_ORDER_SIZE",
                    risk_defaults.max_working_order_size,
                ),
                max_open_positions: get_env_or_default(
                    "CAP_MAX_OPEN_POSITIONS",
                    risk_defaults.max_open_positions,
                ),
                max_orders_per_day: get_env_or_default(
                    "CAP_MAX_ORDERS_PER_DAY",
                    risk_defaults.max_orders_per_day,
                ),
                require_explicit_confirm: get_env_flag(
                    "CAP_REQUIRE_EXPLICIT_CONFIRM",
                    risk_defaults.require_explicit_confirm,
                ),
                dry_run: get_env_flag("CAP_DRY_RUN", risk_defaults.dry_run),
            },
            rate_limiter: RateLimiterConfig {
                global: BucketConfig {
                    capacity: get_env_or_default(
                        "CAP_RATE_GLOBAL_CAPACITY",
                        rate_defaults.global.capacity,
                    ),
                    refill_per_sec: get_env_or_default(
                        "CAP_RATE_GLOBAL_PER_SEC",
                        rate_defaults.global.refill_per_sec,
                    ),
                },
                session: BucketConfig {
                    capacity: get_env_or_default(
                        "CAP_RATE_SESSION_CAPACITY",
                        rate_defaults.session.capacity,
                    ),
                    refill_per_sec: get_env_or_default(
                        "CAP_RATE_SESSION_PER_SEC",
                        rate_defaults.session.refill_per_sec,
                    ),
                },
                trading: BucketConfig {
                    capacity: get_env_or_default(
                        "CAP_RATE_TRADING_CAPACITY",
                        rate_defaults.trading.capacity,
                    ),
                    refill_per_sec: get_env_or_default(
                        "CAP_RATE_TRADING_PER_SEC",
                        rate_defaults.trading.refill_per_sec,
                    ),
                },
                acquire_timeout_secs: get_env_or_default(
                    "CAP_RATE_TIMEOUT_S",
                    rate_defaults.acquire_timeout_secs,
                ),
            },
            retry: RetryConfig::from_env(),
        }
    }

    /// Checks internal consistency
    ///
    /// # Errors
    /// [`AppError::Config`] naming the first offending setting
    pub fn validate(&self) -> Result<(), AppError> {
        if self.credentials.api_key.trim().is_empty()
            || self.credentials.identifier.trim().is_empty()
            || self.credentials.password.is_empty()
        {
            return Err(AppError::Config(
                "api key, identifier and password are required".to_string(),
            ));
        }
        if self.rest_api.base_url.trim().is_empty() {
            return Err(AppError::Config("REST base URL is empty".to_string()));
        }
        if self.risk.allow_trading && self.risk.allowed_epics.is_empty() {
            return Err(AppError::Config(
                "trading is enabled but the epic allowlist is empty (use ALL for unrestricted)"
                    .to_string(),
            ));
        }
        if !(self.risk.max_position_size > 0.0) || !(self.risk.max_working_order_size > 0.0) {
            return Err(AppError::Config(
                "size ceilings must be positive".to_string(),
            ));
        }
        for (name, bucket) in [
            ("global", &self.rate_limiter.global),
            ("session", &self.rate_limiter.session),
            ("trading", &self.rate_limiter.trading),
        ] {
            if !(bucket.capacity >= 1.0) || !(bucket.refill_per_sec > 0.0) {
                return Err(AppError::Config(format!(
                    "{name} rate bucket needs capacity >= 1 and a positive refill rate"
                )));
            }
        }
        Ok(())
    }
}
