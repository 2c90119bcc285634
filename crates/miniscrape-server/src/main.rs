use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use miniscrape_client::build_service;
use miniscrape_core::config::AppConfig;
use miniscrape_server::routes;
use miniscrape_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("miniscrape=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let addr = std::env::var("MINISCRAPE_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let admin_token = std::env::var("MINISCRAPE_ADMIN_TOKEN")
        .ok()
        .filter(|token| !token.trim().is_empty());
    if admin_token.is_none() {
        tracing::warn!("MINISCRAPE_ADMIN_TOKEN is not set, admin endpoints are disabled");
    }

    let config = AppConfig::from_env()?;
    let service = build_service(&config)?;

    let state = Arc::new(AppState {
        service,
        admin_token,
    });

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!(
        categories_dir = %config.categories_dir.display(),
        cache = config.cache.enabled,
        "Starting server on {addr}"
    );
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
