//! # Dungeon Match Server Library
//!
//! This library provides the authoritative server for the dungeon diamond
//! game. It generates the world every match, keeps the canonical list of
//! diamonds and scores, and relays player movement between clients.
//!
//! ## Core Responsibilities
//!
//! ### World Generation
//! Each match is a fresh layout of non-overlapping rectangular rooms placed
//! by rejection sampling, joined into a spanning tree of L-shaped corridors
//! and seeded with one diamond per room.
//!
//! ### Session Coordination
//! Handles the complete lifecycle of player connections including:
//! - The name handshake and player id assignment
//! - Sending the current match and roster to newcomers
//! - Relaying position updates and resolving diamond claims
//! - Announcing arrivals and departures
//!
//! ### Match Rotation
//! Every match lasts a fixed duration. When it runs out a new world is
//! generated, every score goes back to zero and all players are
//! reinitialized with the new match.
//!
//! ## Architecture Design
//!
//! ### Single Owner Hub
//! All mutable state (current match, diamonds, registry, scores) lives in
//! one hub task. Connection tasks and the reset timer only send it
//! messages, so every claim is resolved in a single, linear order and
//! nothing needs a lock.
//!
//! ### TCP With Line Framing
//! Each message is one line of JSON holding a `{ "Type", "Body" }`
//! envelope. Every player has a bounded outbound queue; a player that
//! cannot keep up loses messages instead of stalling everyone else.
//!
//! ## Module Organization
//!
//! ### Layout (`generator`, `connector`, `match_gen`)
//! Room placement, the Prim style corridor builder and the match
//! generator combining them with diamond placement.
//!
//! ### Session (`client_manager`, `game`, `hub`)
//! The player registry, the current match with its round clock, and the
//! hub actor tying them together.
//!
//! ### Network Module (`network`)
//! Listener, per-connection reader and writer tasks, and the
//! [`network::launch`] entry point.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::{launch, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = launch(ServerConfig::default()).await?;
//!     println!("listening on {}", server.local_addr());
//!
//!     tokio::signal::ctrl_c().await?;
//!     server.shutdown();
//!     server.wait().await;
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod config;
pub mod connector;
pub mod game;
pub mod generator;
pub mod hub;
pub mod match_gen;
pub mod network;

pub use config::{LayoutConfig, ServerConfig};
pub use hub::{HubHandle, HubStats};
pub use match_gen::{GenerationError, MatchGenerator};
pub use network::{launch, ServerError, ServerHandle};
