// STACKING Prediction Market Ledger - Main Entry Point

use std::sync::Arc;

use stacking_prediction_market::app_state::{AppState, SharedState};
use stacking_prediction_market::config::Config;
use stacking_prediction_market::handlers::build_router;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    let state: SharedState = match AppState::from_config(&config) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!("Failed to initialize state: {}", e);
            std::process::exit(1);
        }
    };

    let app = build_router(state.clone());

    let listener = match tokio::net::TcpListener::bind(&config.bind).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", config.bind, e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        "STACKING prediction market ledger listening on http://{}",
        config.bind
    );

    // Flush the store before exiting on ctrl-c
    let shutdown_state = state.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received, flushing store");
            if let Err(e) = shutdown_state.engine.flush() {
                tracing::error!("Flush failed: {}", e);
            }
            std::process::exit(0);
        }
    });

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
