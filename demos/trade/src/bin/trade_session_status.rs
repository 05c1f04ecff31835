use capital_guard::prelude::*;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_logger();

    let client = Client::new(Config::new())?;
    info!("Before login: {}", client.session_status().await);

    client.ensure_session().await?;
    let status = client.ping().await?;
    info!("After ping: {}", status);

    let accounts = client.respond(client.get_accounts().await).await;
    info!("Accounts: {}", accounts);

    info!("Rate limits: {:?}", client.rate_limit_snapshot());
    info!("Allowlist: {}", client.allowlist_snapshot());

    client.logout().await?;
    info!("After logout: {}", client.session_status().await);
    Ok(())
}
