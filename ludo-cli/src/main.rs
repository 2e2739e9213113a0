//! Ludo CLI - Command-line interface
//!
//! Commands:
//! - serve: Start the local table server
//! - host: Start the server and open an online room
//! - join: Start the server and join a host's room
//! - simulate: Play complete local games with seeded dice
//! - init-settings: Write a default settings file to edit

mod server;
mod simulate;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use server::{ServerArgs, Startup};
use simulate::SimulateArgs;

#[derive(Parser)]
#[command(name = "ludo")]
#[command(about = "Four-color Ludo with two-peer online play")]
struct Cli {
    /// Fixed seed for dice (reproducible games)
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct JoinArgs {
    /// Host's peer URL, e.g. ws://192.168.1.20:40123
    #[arg(long)]
    host_url: String,

    /// Room code shown by the host
    #[arg(long)]
    room: String,

    #[command(flatten)]
    server: ServerArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the table server for local play
    Serve(ServerArgs),
    /// Start the server and open a room for a friend
    Host(ServerArgs),
    /// Start the server and join a friend's room
    Join(JoinArgs),
    /// Play complete local games with seeded dice
    Simulate(SimulateArgs),
    /// Write the default settings to a JSON file for use with --settings
    InitSettings {
        /// Output file
        #[arg(long, default_value = "ludo-settings.json")]
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => server::run(args, Startup::Local, cli.seed),
        Commands::Host(args) => server::run(args, Startup::Host, cli.seed),
        Commands::Join(args) => server::run(
            args.server,
            Startup::Join {
                host_url: args.host_url,
                room_id: args.room,
            },
            cli.seed,
        ),
        Commands::Simulate(args) => simulate::run(args, cli.seed),
        Commands::InitSettings { output } => server::write_default_settings(&output),
    }
}
