use clap::Parser;
use log::info;
use server::{launch, LayoutConfig, ServerConfig};
use shared::RoomUnits;
use std::time::Duration;

/// Main-method of the server.
/// Parses command-line arguments, launches the hub and runs until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Address to listen on
        #[clap(short, long, default_value = "localhost:8080")]
        listen: String,
        /// Length of one match in seconds
        #[clap(short, long, default_value = "45", value_parser = clap::value_parser!(u64).range(1..))]
        match_secs: u64,
        /// Seed for reproducible worlds
        #[clap(short, long)]
        seed: Option<u64>,
        /// Candidate rooms drawn per layout
        #[clap(long, default_value = "100000")]
        attempts: u32,
        /// Height unit of rooms in pixels; defaults to the width unit
        #[clap(long)]
        height_unit: Option<i32>,
        /// Points awarded per diamond
        #[clap(long, default_value = "30")]
        reward: u32,
    }

    env_logger::init();
    let args = Args::parse();

    let mut units = RoomUnits::default();
    if let Some(height) = args.height_unit {
        units.height = height;
    }

    let config = ServerConfig {
        listen_addr: args.listen,
        match_duration: Duration::from_secs(args.match_secs),
        diamond_reward: args.reward,
        layout: LayoutConfig {
            attempts: args.attempts,
            units,
            ..LayoutConfig::default()
        },
        seed: args.seed,
    };

    let server = launch(config).await?;
    info!("Server ready on {}", server.local_addr());

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down gracefully...");
    server.shutdown();
    server.wait().await;

    Ok(())
}
