/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/
/// Session token models
pub mod auth;
/// REST transport over reqwest
pub mod http;
/// Preview records, risk checks and policy snapshots
pub mod preview;
/// Request models for API calls
pub mod requests;
/// Response models from API calls
pub mod responses;
/// Structured result envelope
pub mod result;
/// Retry configuration for safe reads
pub mod retry;
