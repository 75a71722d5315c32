use std::net::SocketAddr;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use conferenti_admin_api::{config, config::Config, routes::build_router, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    config::load_env_files();

    let config = Config::from_env()?;
    tracing::info!(
        "✅ Configuration loaded (environment: {}, local: {})",
        config.environment,
        config.is_local
    );

    let state = AppState::new(&config).await?;
    tracing::info!("✅ AppState initialized");

    let shutdown = CancellationToken::new();
    let refresher = state.key_provider.spawn_refresh_task(shutdown.clone());
    tracing::info!(
        "✅ JWKS refresh task started (every {}s)",
        state.key_provider.refresh_interval().as_secs()
    );

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    if let Err(e) = refresher.await {
        tracing::error!("❌ JWKS refresh task ended abnormally: {}", e);
    }

    tracing::info!("👋 Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C and cancels the background tasks.
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("❌ Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }

    tracing::info!("🛑 Shutdown signal received");
    shutdown.cancel();
}
