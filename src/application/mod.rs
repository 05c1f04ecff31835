/// Session lifecycle
pub mod auth;
/// Client context object and caller API
pub mod client;
/// Application configuration module
pub mod config;
/// Session-bearing, rate-admitted broker calls
pub mod gateway;
/// Service interfaces
pub mod interfaces;
/// Rate limiter module for API request throttling
pub mod rate_limiter;
/// Risk engine and preview cache
pub mod risk;
