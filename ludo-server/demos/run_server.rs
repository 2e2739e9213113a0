//! Example to run the Ludo server standalone
//!
//! Run with: cargo run -p ludo-server --example run_server

use ludo_server::{run_server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let config = ServerConfig {
        port: 8003,
        static_dir: "web".to_string(),
        ..Default::default()
    };

    println!("Starting Ludo server on port {}", config.port);
    println!("Static files from: {}", config.static_dir);
    println!("Open http://localhost:{}/", config.port);

    run_server(config).await
}
