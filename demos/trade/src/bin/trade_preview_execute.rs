use capital_guard::prelude::*;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_logger();

    info!("=== Preview / Execute Example ===");

    // Settings come from CAP_* environment variables or a .env file
    let config = Config::new();
    let epic = std::env::var("CAP_DEMO_EPIC").unwrap_or_else(|_| "GOLD".to_string());
    let client = Client::new(config)?;

    let status = client.ensure_session().await?;
    info!("Session: {}", status);

    let request = TradeRequest::position(&epic, Direction::Buy, 0.37).with_stop_distance(25.0);
    let preview = client.preview_position(request).await?;
    info!(
        "Preview {} for {} size {} (requested {})",
        preview.preview_id, preview.request.epic, preview.request.size, preview.requested_size
    );
    for check in &preview.checks {
        info!(
            "  [{}] {}: {}",
            if check.passed { "ok" } else { "FAIL" },
            check.name,
            check.detail
        );
    }
    for warning in &preview.size_warnings {
        warn!("  {}", warning);
    }

    // With CAP_DRY_RUN=true this stops at the dry-run gate
    let result = client
        .respond(client.execute(&preview.preview_id, true, true).await)
        .await;
    info!("Execution: {}", serde_json::to_string_pretty(&result)?);

    let snapshot = client.risk_policy_snapshot();
    info!("Policy: {}", snapshot);

    client.shutdown().await?;
    Ok(())
}
