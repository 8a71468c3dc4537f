use crate::app::{router, AppState};
use crate::cli::{build_registry, utils::output_success, OutputFormat};
use crate::config::AppConfig;

pub async fn handle(config: AppConfig, port: Option<u16>, output_format: OutputFormat) -> anyhow::Result<()> {
    tracing::info!("Starting Campus API in {:?} mode", config.environment);

    let registry = build_registry(&config).await?;
    let app = router(AppState::new(registry.clone(), &config));

    let port = port.unwrap_or(config.api.port);
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", bind_addr, e))?;

    output_success(
        &output_format,
        &format!("Campus API listening on http://{}", bind_addr),
        Some(serde_json::json!({ "address": bind_addr })),
    )?;

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    tracing::info!("Shutting down; closing store {}", registry.store().name());
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
