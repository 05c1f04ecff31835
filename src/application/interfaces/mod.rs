/// Account service interface
pub mod account;
/// Market service interface
pub mod market;
/// Trading service interface
pub mod order;
/// Broker transport interface
pub mod transport;
