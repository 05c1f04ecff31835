/// Module containing the injectable time source
pub mod clock;
/// Module containing environment variable helpers
pub mod config;
/// Module containing utilities for handling unique identifiers
pub mod id;
/// Module containing logging utilities
pub mod logger;
/// Module containing secret redaction for results and logs
pub mod redact;

pub use clock::*;
pub use id::*;
pub use logger::*;
pub use redact::*;
