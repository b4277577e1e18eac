use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use aqi_dashboard::{
    AirNowClient, ApiKey, AqiLookupService, CityCatalog, DashboardConfig, DashboardSession,
    telemetry, web,
};

#[tokio::main]
async fn main() -> Result<()> {
    // AIRNOW_API_KEY may live in a .env file next to the working directory
    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        eprintln!("Ignoring unreadable .env file: {e}");
    }

    let config = DashboardConfig::load().context("Failed to load configuration")?;
    telemetry::init(&config.logging).context("Failed to initialize logging")?;

    let catalog = CityCatalog::load(&config.catalog.path)
        .with_context(|| format!("Failed to load city catalog from {}", config.catalog.path))?;
    info!("Loaded {} cities from {}", catalog.len(), config.catalog.path);

    let provider = AirNowClient::new(&config.airnow).context("Failed to build AirNow client")?;
    let lookup = AqiLookupService::new(Arc::new(provider), &config.cache);

    let credential = match config.airnow.api_key.as_deref().map(ApiKey::parse) {
        Some(Ok(key)) => Some(key),
        Some(Err(e)) => {
            warn!("Ignoring configured API key: {}", e);
            None
        }
        None => {
            info!("No API key configured; enter one on the dashboard");
            None
        }
    };

    let session = Arc::new(DashboardSession::new(
        catalog,
        lookup,
        config.dashboard.clone(),
        credential,
    ));

    web::run(&config.server, session).await
}
