use dotenvy::dotenv;
use service_core::observability::init_tracing;
use tracing::info;
use warehouse_frontend::config::get_configuration;
use warehouse_frontend::services::{metrics::init_metrics, MarketplaceClient};
use warehouse_frontend::startup::build_router;
use warehouse_frontend::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(
        "warehouse-frontend",
        &configuration.telemetry.log_level,
        configuration.telemetry.otlp_endpoint.as_deref(),
    );

    init_metrics().map_err(|e| anyhow::anyhow!("Failed to register metrics: {}", e))?;

    let api = MarketplaceClient::new(&configuration.backend)
        .map_err(|e| anyhow::anyhow!("Failed to build marketplace client: {}", e))?;
    info!(backend = %api.base_url(), "Marketplace API client ready");

    let address = format!(
        "{}:{}",
        configuration.server.host, configuration.server.port
    );
    let app = build_router(AppState::new(configuration, api));

    let listener = tokio::net::TcpListener::bind(&address).await.map_err(|e| {
        tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
        anyhow::anyhow!("Failed to bind to address {}: {}", address, e)
    })?;

    info!("Starting warehouse-frontend on {}", address);
    axum::serve(listener, app).await.map_err(|e| {
        tracing::error!("Server error: {}", e);
        anyhow::anyhow!("Server error: {}", e)
    })?;

    Ok(())
}
