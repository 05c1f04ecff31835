/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Rate limiter module for controlling API request rates
//!
//! Token buckets refilled lazily from the injected [`Clock`] at the moment of each
//! call. Every admission takes one token from the global bucket; tiered
//! admissions also take one from the tier bucket, both or neither, under a single
//! lock.

use crate::application::config::{BucketConfig, RateLimiterConfig};
use crate::error::AppError;
use crate::utils::clock::{Clock, elapsed_secs};
use chrono::{DateTime, Utc};
use pretty_simple_display::{DebugPretty, DisplaySimple};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};

/// Shortest sleep between two admission attempts
const MIN_WAIT: Duration = Duration::from_millis(1);

/// Absorbs floating point drift in the refill arithmetic
const TOKEN_EPSILON: f64 = 1e-9;

/// Endpoint class of an outbound call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateTier {
    /// Every call; global bucket only
    Global,
    /// Session creation
    Session,
    /// Trade writes
    Trading,
}

impl fmt::Display for RateTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateTier::Global => write!(f, "global"),
            RateTier::Session => write!(f, "session"),
            RateTier::Trading => write!(f, "trading"),
        }
    }
}

#[derive(Debug, Clone)]
struct TokenBucket {
    capacity: f64,
    tokens: f64,
    refill_per_sec: f64,
    last_refill: DateTime<Utc>,
}

impl TokenBucket {
    /// Negative, NaN and infinite shapes become zero: such a bucket never refills
    fn new(config: &BucketConfig, now: DateTime<Utc>) -> Self {
        let sanitize = |value: f64| if value.is_finite() { value.max(0.0) } else { 0.0 };
        let capacity = sanitize(config.capacity);
        let refill_per_sec = sanitize(config.refill_per_sec);
        if capacity != config.capacity || refill_per_sec != config.refill_per_sec {
            warn!(
                "Invalid bucket shape {}/{} per s, using {}/{} per s",
                config.capacity, config.refill_per_sec, capacity, refill_per_sec
            );
        }
        Self {
            capacity,
            tokens: capacity,
            refill_per_sec,
            last_refill: now,
        }
    }

    /// Tokens the bucket would hold at `now`, without mutating it
    fn projected(&self, now: DateTime<Utc>) -> f64 {
        let elapsed = elapsed_secs(self.last_refill, now).max(0.0);
        (self.tokens + elapsed * self.refill_per_sec).min(self.capacity)
    }

    fn refill(&mut self, now: DateTime<Utc>) {
        if now > self.last_refill {
            self.tokens = self.projected(now);
            self.last_refill = now;
        }
    }

    fn has_token(&self) -> bool {
        self.tokens + TOKEN_EPSILON >= 1.0
    }

    fn take(&mut self) {
        self.tokens = (self.tokens - 1.0).max(0.0);
    }

    /// Time until one whole token is available
    fn wait_for_token(&self) -> Duration {
        if self.has_token() {
            return Duration::ZERO;
        }
        if self.refill_per_sec <= 0.0 {
            return Duration::MAX;
        }
        let missing = 1.0 - self.tokens;
        Duration::try_from_secs_f64(missing / self.refill_per_sec).unwrap_or(Duration::MAX)
    }
}

#[derive(Debug)]
struct Buckets {
    global: TokenBucket,
    session: TokenBucket,
    trading: TokenBucket,
}

impl Buckets {
    fn tier(&self, tier: RateTier) -> Option<&TokenBucket> {
        match tier {
            RateTier::Global => None,
            RateTier::Session => Some(&self.session),
            RateTier::Trading => Some(&self.trading),
        }
    }

    fn tier_mut(&mut self, tier: RateTier) -> Option<&mut TokenBucket> {
        match tier {
            RateTier::Global => None,
            RateTier::Session => Some(&mut self.session),
            RateTier::Trading => Some(&mut self.trading),
        }
    }

    /// Deducts one token from the global and the tier bucket, or from neither
    ///
    /// On refusal returns how long until both buckets hold a token.
    fn try_take(&mut self, tier: RateTier, now: DateTime<Utc>) -> Result<(), Duration> {
        self.global.refill(now);
        if let Some(bucket) = self.tier_mut(tier) {
            bucket.refill(now);
        }
        let global_ready = self.global.has_token();
        let tier_ready = self.tier(tier).is_none_or(TokenBucket::has_token);
        if global_ready && tier_ready {
            self.global.take();
            if let Some(bucket) = self.tier_mut(tier) {
                bucket.take();
            }
            return Ok(());
        }
        let tier_wait = self
            .tier(tier)
            .map_or(Duration::ZERO, TokenBucket::wait_for_token);
        Err(self.global.wait_for_token().max(tier_wait))
    }
}

/// Availability of one tier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TierStatus {
    /// Tier name
    pub tier: RateTier,
    /// Whole calls that could be admitted right now
    pub available: f64,
    /// Bucket capacity
    pub capacity: f64,
    /// Refill rate per second
    pub refill_per_sec: f64,
}

/// Availability of every tier
#[derive(DebugPretty, DisplaySimple, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateLimitSnapshot {
    /// One entry per tier, global first
    pub tiers: Vec<TierStatus>,
}

/// Rate limiter for controlling API request rates
///
/// Refill happens lazily on every call; there is no background timer. The
/// internal lock guards in-memory bookkeeping only and is never held across a
/// sleep.
pub struct RateLimiter {
    buckets: Mutex<Buckets>,
    clock: Arc<dyn Clock>,
    default_timeout: Duration,
}

impl RateLimiter {
    /// Creates a new rate limiter with full buckets
    ///
    /// # Arguments
    ///
    /// * `config` - Bucket shapes and the default admission timeout
    /// * `clock` - Time source used for refill and waiting
    ///
    /// # Example
    ///
    /// ```ignore
    /// use capital_guard::application::config::RateLimiterConfig;
    /// use capital_guard::application::rate_limiter::{RateLimiter, RateTier};
    /// use capital_guard::utils::SystemClock;
    /// use std::sync::Arc;
    ///
    /// let limiter = RateLimiter::new(&RateLimiterConfig::default(), Arc::new(SystemClock));
    /// limiter.acquire(RateTier::Trading, limiter.default_timeout()).await?;
    /// ```
    #[must_use]
    pub fn new(config: &RateLimiterConfig, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            buckets: Mutex::new(Buckets {
                global: TokenBucket::new(&config.global, now),
                session: TokenBucket::new(&config.session, now),
                trading: TokenBucket::new(&config.trading, now),
            }),
            clock,
            default_timeout: Duration::from_secs(config.acquire_timeout_secs),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Buckets> {
        self.buckets.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Configured admission timeout
    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Admits one call immediately or refuses without waiting
    #[must_use]
    pub fn try_acquire(&self, tier: RateTier) -> bool {
        let now = self.clock.now();
        self.lock().try_take(tier, now).is_ok()
    }

    /// Waits until one call of `tier` may proceed
    ///
    /// # Errors
    /// [`AppError::RateLimited`] once `timeout` elapses without admission
    pub async fn acquire(&self, tier: RateTier, timeout: Duration) -> Result<(), AppError> {
        let start = self.clock.now();
        loop {
            let now = self.clock.now();
            let wait = match self.lock().try_take(tier, now) {
                Ok(()) => return Ok(()),
                Err(wait) => wait,
            };

            let waited = Duration::from_secs_f64(elapsed_secs(start, now).max(0.0));
            let Some(remaining) = timeout.checked_sub(waited).filter(|r| !r.is_zero()) else {
                warn!("Rate admission for {tier} timed out after {:?}", timeout);
                return Err(AppError::RateLimited(format!(
                    "no {tier} capacity within {:.1}s",
                    timeout.as_secs_f64()
                )));
            };
            let sleep_for = wait.min(remaining).max(MIN_WAIT);
            debug!("Rate limited on {tier}, waiting {:?}", sleep_for);
            self.clock.sleep(sleep_for).await;
        }
    }

    /// Whole calls of `tier` admissible right now; consumes nothing
    #[must_use]
    pub fn available_tokens(&self, tier: RateTier) -> f64 {
        let now = self.clock.now();
        let buckets = self.lock();
        let global = buckets.global.projected(now);
        let available = match buckets.tier(tier) {
            Some(bucket) => global.min(bucket.projected(now)),
            None => global,
        };
        (available + TOKEN_EPSILON).floor()
    }

    /// Availability of every tier
    #[must_use]
    pub fn snapshot(&self) -> RateLimitSnapshot {
        let now = self.clock.now();
        let buckets = self.lock();
        let global = buckets.global.projected(now);
        let tiers = [RateTier::Global, RateTier::Session, RateTier::Trading]
            .into_iter()
            .map(|tier| {
                let bucket = buckets.tier(tier).unwrap_or(&buckets.global);
                TierStatus {
                    tier,
                    available: (global.min(bucket.projected(now)) + TOKEN_EPSILON).floor(),
                    capacity: bucket.capacity,
                    refill_per_sec: bucket.refill_per_sec,
                }
            })
            .collect();
        RateLimitSnapshot { tiers }
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("buckets", &*self.lock())
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}
