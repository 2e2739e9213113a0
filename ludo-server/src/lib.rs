//! Ludo Server - HTTP API and peer channel
//!
//! This crate provides the runtime around a `ludo_core::Table`:
//! - Single-owner table actor with timed task re-entry
//! - REST API for presentation clients
//! - Static file serving for the board UI
//! - Host listener and guest dialer for two-peer online play

pub mod peer;
mod routes;
pub mod runtime;
mod state;

use anyhow::Context;
use axum::{
    routing::{get, post, put},
    Router,
};
use ludo_core::GameSettings;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::services::ServeDir;

pub use peer::{HostInfo, Outbox, PeerHub, SessionError};
pub use runtime::{Command, Snapshot, TableHandle};
pub use state::ServerState;

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    /// Port of the peer listener opened when hosting; 0 picks a free one
    pub peer_port: u16,
    pub static_dir: String,
    /// Host name advertised in join URLs
    pub public_host: String,
    /// Fixed dice seed for reproducible games
    pub seed: Option<u64>,
    pub settings: GameSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8003,
            peer_port: 0,
            static_dir: "web".to_string(),
            public_host: "127.0.0.1".to_string(),
            seed: None,
            settings: GameSettings::default(),
        }
    }
}

/// Create the router with all routes
pub fn create_router(config: &ServerConfig, state: Arc<ServerState>) -> Router {
    let static_service = ServeDir::new(&config.static_dir);

    Router::new()
        // Status endpoint
        .route("/api/status", get(routes::status::status_handler))
        // Board geometry
        .route("/api/board", get(routes::board::get_board))
        // Game API
        .route("/api/state", get(routes::game::get_state))
        .route("/api/state/poll", get(routes::game::poll_state))
        .route("/api/roll", post(routes::game::roll))
        .route("/api/select/:piece_id", post(routes::game::select_piece))
        .route("/api/reset", post(routes::game::reset))
        .route("/api/players", put(routes::game::set_players))
        // Session API
        .route("/api/session/host", post(routes::session::host_session))
        .route("/api/session/join", post(routes::session::join_session))
        // Shared state
        .with_state(state)
        // Static file serving (must be last)
        .fallback_service(static_service)
}

/// Start the HTTP server
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let state = Arc::new(ServerState::new(&config));
    serve(config, state).await
}

/// Serve the API over an existing state (e.g. one already hosting a room)
pub async fn serve(config: ServerConfig, state: Arc<ServerState>) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let router = create_router(&config, state);

    tracing::info!("Ludo server starting on http://0.0.0.0:{}", config.port);
    tracing::info!("Static files served from: {}", config.static_dir);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    axum::serve(listener, router).await?;

    Ok(())
}
