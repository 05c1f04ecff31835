/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! # capital-guard
//!
//! A trading-safety control surface for the Capital.com REST API.
//!
//! The crate sits between an automated caller and the broker and takes care of:
//!
//! - **Session lifecycle**: login, proactive refresh before the broker's ten minute
//!   inactivity expiry, account switching, keep-alive and logout, all serialized
//!   behind a single lock so concurrent callers never race a login.
//! - **Rate admission**: lazily refilled token buckets, one global and one per
//!   endpoint class, acquired both-or-neither.
//! - **Two-phase trading**: every trade is first previewed (validated, normalized
//!   against the broker dealing rules and checked against the local risk policy)
//!   and can then be executed exactly once within two minutes.
//!
//! All state lives inside an explicitly constructed [`application::client::Client`];
//! several independent instances (demo and live, say) can coexist in one process.
//!
//! ```ignore
//! use capital_guard::prelude::*;
//!
//! let client = Client::new(Config::new())?;
//! let preview = client
//!     .preview(TradeRequest::position("GOLD", Direction::Buy, 0.37))
//!     .await?;
//! if preview.all_passed {
//!     let result = client.execute(&preview.preview_id, true, true).await?;
//!     println!("{}", result);
//! }
//! client.shutdown().await?;
//! ```

/// Application layer: configuration, session, rate limiting, risk engine and client
pub mod application;
/// Library-wide constants
pub mod constants;
/// Error types
pub mod error;
/// Request/response models and the HTTP transport
pub mod model;
/// Convenience re-exports
pub mod prelude;
/// Enumerations shared by requests and responses
pub mod presentation;
/// Supporting utilities: clock, ids, logging, redaction, environment helpers
pub mod utils;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the library version
#[must_use]
pub fn version() -> &'static str {
    VERSION
}
