use clap::Parser;
use client::game::MatchReplica;
use client::network::{Client, ClientConfig, ClientError};
use log::{info, warn};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "localhost:8080")]
    server: String,

    /// Display name announced to other players
    #[arg(short = 'n', long, default_value = "runner")]
    name: String,

    /// Milliseconds between movement steps
    #[arg(long, default_value = "50")]
    step_ms: u64,

    /// Pixels moved per axis on every step
    #[arg(long, default_value = "8")]
    step_px: i32,

    /// Seconds to wait for the join confirmation
    #[arg(long, default_value = "5")]
    handshake_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let config = ClientConfig {
        handshake_timeout: Duration::from_secs(args.handshake_secs),
    };

    info!("Connecting to {} as {}", args.server, args.name);
    let mut client = Client::connect(args.server.as_str(), &args.name, &config).await?;
    let mut replica = MatchReplica::new(client.id());

    let mut ticker = interval(Duration::from_millis(args.step_ms.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            event = client.next_event() => match event {
                Ok(event) => replica.apply(event),
                Err(ClientError::Protocol(e)) => warn!("Ignoring bad message: {}", e),
                Err(e) => return Err(e.into()),
            },

            _ = ticker.tick() => {
                let Some(target) = replica.nearest_diamond().map(|diamond| diamond.origin()) else {
                    continue;
                };
                let next = replica.step_towards(target, args.step_px);
                replica.move_to(next);

                let claim = replica.touching_diamond();
                if let Some(diamond) = claim {
                    replica.claim(diamond);
                    info!("Collected diamond {}, score {}", diamond, replica.score);
                }
                client.send_update(next, claim).await?;
            },

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, leaving the match");
                break;
            }
        }
    }

    client.close().await?;
    Ok(())
}
