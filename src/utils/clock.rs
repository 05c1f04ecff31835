/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Time source abstraction
//!
//! Every component that reasons about time (token buckets, session age, preview
//! expiry, the daily order counter and confirmation polling) reads the current
//! instant and sleeps through a [`Clock`]. Production code uses [`SystemClock`];
//! tests use [`ManualClock`], whose `sleep` advances virtual time instead of
//! waiting.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::sync::Mutex;
use std::time::Duration;

/// Source of the current time and of suspension
#[async_trait]
pub trait Clock: Send + Sync + Debug {
    /// Current UTC instant
    fn now(&self) -> DateTime<Utc>;

    /// Suspends the caller for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `chrono::Utc` and `tokio::time::sleep`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Virtual clock for deterministic tests
///
/// Time only moves when [`ManualClock::advance`] is called or when a task sleeps;
/// a sleep advances the clock by the requested duration and yields once.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Creates a clock frozen at the current wall-clock instant
    #[must_use]
    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    /// Moves the clock forward
    pub fn advance(&self, duration: Duration) {
        let delta = chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::zero());
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += delta;
    }

    /// Sets the clock to an absolute instant
    pub fn set(&self, instant: DateTime<Utc>) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now = instant;
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(duration);
        tokio::task::yield_now().await;
    }
}

/// Seconds elapsed between two instants, never negative
#[must_use]
pub fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to - from;
    match delta.num_nanoseconds() {
        Some(ns) if ns > 0 => ns as f64 / 1_000_000_000.0,
        Some(_) => 0.0,
        None => delta.num_milliseconds().max(0) as f64 / 1000.0,
    }
}
