/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/
use crate::utils::config::get_env_or_default;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

static INIT: Once = Once::new();

/// Installs the global `tracing` subscriber
///
/// The level is read from `LOGLEVEL` (`TRACE`, `DEBUG`, `INFO`, `WARN`, `ERROR`;
/// default `INFO`). Calling it more than once is harmless.
pub fn setup_logger() {
    INIT.call_once(|| {
        let log_level = get_env_or_default("LOGLEVEL", String::from("INFO"));
        let level = parse_level(&log_level);

        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(false)
            .finish();

        // another subscriber may already be installed by the embedding binary
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

fn parse_level(value: &str) -> Level {
    match value.trim().to_uppercase().as_str() {
        "TRACE" => Level::TRACE,
        "DEBUG" => Level::DEBUG,
        "WARN" | "WARNING" => Level::WARN,
        "ERROR" | "CRITICAL" => Level::ERROR,
        _ => Level::INFO,
    }
}
