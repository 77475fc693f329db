use anyhow::{Context, Result};
use discmaster::api::{create_router, AppState};
use discmaster::auth::non_empty;
use discmaster::config;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "discmaster=info".into()),
        )
        .init();

    info!("DiscMaster starting...");

    let config = config::resolve().context("Failed to load configuration")?;
    let port = config.server.port;

    info!(
        port = port,
        app_url = config.server.app_url.as_deref().unwrap_or("(request host)"),
        discogs_configured = non_empty(config.discogs.consumer_key.as_deref()).is_some(),
        spotify_configured = non_empty(config.spotify.client_id.as_deref()).is_some(),
        "Configuration loaded"
    );

    let state = AppState::new(config).context("Failed to initialize application state")?;
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .context("Failed to bind HTTP port")?;
    info!(port = port, "HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("DiscMaster stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for ctrl_c signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
