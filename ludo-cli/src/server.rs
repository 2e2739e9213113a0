//! Server commands - serve the table locally, host a room, or join one
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: configure_server(), start_server()
//! - Level 3: open_session(), load_settings(), write_default_settings()
//! - Level 4: configuration validation

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use ludo_core::GameSettings;
use ludo_server::{serve, ServerConfig, ServerState};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct ServerArgs {
    /// Port number for the HTTP API
    #[arg(long, default_value = "8003")]
    pub port: u16,

    /// Port for the peer listener when hosting (0 = any free port)
    #[arg(long, default_value = "0")]
    pub peer_port: u16,

    /// Directory containing static files for the board UI
    #[arg(long, default_value = "web")]
    pub static_dir: PathBuf,

    /// Host name advertised to guests in join URLs
    #[arg(long, default_value = "127.0.0.1")]
    pub public_host: String,

    /// Settings JSON file (player names, timings)
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,
}

/// What the instance does once the API is up
pub enum Startup {
    /// Plain local game
    Local,
    /// Open a room and wait for a guest
    Host,
    /// Dial a host's room
    Join { host_url: String, room_id: String },
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run a server command
///
/// This function reads like a table of contents:
/// 1. Configure server
/// 2. Start server, opening a session first if asked (blocking)
pub fn run(args: ServerArgs, startup: Startup, seed: Option<u64>) -> Result<()> {
    let config = configure_server(&args, seed)?;

    tracing::info!("Starting Ludo server on port {}", config.port);

    start_server(config, startup)
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

/// Configure server from command arguments
fn configure_server(args: &ServerArgs, seed: Option<u64>) -> Result<ServerConfig> {
    validate_static_dir(&args.static_dir)?;
    let settings = load_settings(args.settings.as_deref())?;

    Ok(ServerConfig {
        port: args.port,
        peer_port: args.peer_port,
        static_dir: args.static_dir.to_string_lossy().to_string(),
        public_host: args.public_host.clone(),
        seed,
        settings,
    })
}

/// Start the server (blocking)
fn start_server(config: ServerConfig, startup: Startup) -> Result<()> {
    // Create tokio runtime for async server
    let runtime = tokio::runtime::Runtime::new()?;

    runtime.block_on(async {
        let state = Arc::new(ServerState::new(&config));
        open_session(&state, startup).await?;
        serve(config, state).await
    })
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// Open the requested online session before serving
async fn open_session(state: &ServerState, startup: Startup) -> Result<()> {
    match startup {
        Startup::Local => {}
        Startup::Host => {
            let info = state.peers.host().await.context("failed to host a room")?;
            println!("Room: {}", info.room_id);
            println!("Guests join with: --host-url {} --room {}", info.host_url, info.room_id);
        }
        Startup::Join { host_url, room_id } => {
            state
                .peers
                .join(&host_url, &room_id)
                .await
                .with_context(|| format!("failed to join room {}", room_id))?;
            println!("Joined room {}", room_id);
        }
    }
    Ok(())
}

/// Load settings from a file, or use defaults
fn load_settings(path: Option<&Path>) -> Result<GameSettings> {
    match path {
        Some(path) => GameSettings::load(path)
            .with_context(|| format!("Failed to load settings: {}", path.display())),
        None => Ok(GameSettings::default()),
    }
}

/// Write the default settings where `--settings` can pick them up
pub fn write_default_settings(path: &Path) -> Result<()> {
    GameSettings::default()
        .save(path)
        .with_context(|| format!("Failed to write settings: {}", path.display()))?;
    println!("Wrote default settings to {}", path.display());
    Ok(())
}

// ============================================================================
// LEVEL 4 - VALIDATION
// ============================================================================

/// Validate that static directory exists
fn validate_static_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        tracing::warn!(
            "Static directory does not exist: {}. Server will start but may not serve files.",
            path.display()
        );
    } else if !path.is_dir() {
        anyhow::bail!(
            "Static path exists but is not a directory: {}",
            path.display()
        );
    }

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
