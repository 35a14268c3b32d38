//! HTTP front-end for the PoP coordinates report.
//!
//! # Routes
//!
//! - `GET /` - Landing page with live log
//! - `GET /generate` - Run the pipeline (409 while another run is in flight)
//! - `GET /download` - Fetch the last report (404 until one exists)
//! - `GET /logs` - Server-sent events for the next run
//! - `GET /health` - Health check

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

pub mod config;
pub mod error;
pub mod generator;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use state::AppState;

pub fn create_router(state: AppState, cors: bool) -> Router {
    let router = Router::new()
        .route("/", get(routes::home))
        .route("/generate", get(routes::generate))
        .route("/download", get(routes::download))
        .route("/logs", get(routes::logs))
        .route("/health", get(routes::health))
        .with_state(state);

    if cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    }
}

/// Serves until `shutdown` is cancelled.
pub async fn serve(config: ServerConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    let state = AppState::from_config(&config, shutdown.clone())?;
    let router = create_router(state, config.cors);

    let address = config.bind_address();
    let listener = TcpListener::bind(address).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    log::info!("Server stopped");
    Ok(())
}
