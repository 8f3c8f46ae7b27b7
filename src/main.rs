//! Naptime - a state-managed HTTP service that pauses a web media
//! player after a sleep timer
//!
//! This is the main entry point for the naptime application.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::info;

use naptime::{
    adapter::{DetachedPlayer, LogNotifier, StaticResolver},
    api::create_router,
    config::Config,
    coordinator::Coordinator,
    state::{AppState, FileTimerStore},
    utils::{shutdown_signal, SystemClock},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("naptime={},tower_http=info", config.log_level()))
        .init();

    info!("Starting naptime server v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: host={}, port={}, origin={}, state_file={}",
        config.host,
        config.port,
        config.player_origin,
        config.state_file.display()
    );

    let coordinator = Coordinator::new(
        Arc::new(FileTimerStore::new(&config.state_file)),
        Arc::new(StaticResolver::single(
            config.target.clone(),
            config.player_origin.clone(),
        )),
        Arc::new(DetachedPlayer),
        Arc::new(LogNotifier),
        Arc::new(SystemClock),
        config.player_origin.clone(),
        Duration::from_millis(config.min_delay_ms),
    );

    // Recover any persisted timer before accepting requests: an
    // expired one fires immediately, a future one is re-armed.
    if let Err(e) = coordinator.recover().await {
        tracing::error!("timer recovery failed: {e}");
    }

    // Create application state
    let state = Arc::new(AppState::new(
        Arc::clone(&coordinator),
        config.port,
        config.host.clone(),
    ));

    // Create HTTP router with all endpoints
    let app = create_router(state);

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST   /timer         - Set or replace the sleep timer");
    info!("  DELETE /timer         - Cancel the sleep timer");
    info!("  GET    /status        - Timer state and countdown");
    info!("  GET    /playing       - Playback diagnostics");
    info!("  POST   /adapter/ready - Content handler liveness");
    info!("  GET    /health        - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}
