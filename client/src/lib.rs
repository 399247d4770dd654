//! # Dungeon Match Client Library
//!
//! This library provides a headless client for the dungeon diamond game. It
//! joins a server, keeps a local replica of the current match and reports
//! the player's movement and diamond claims.
//!
//! ## Architecture Overview
//!
//! ### Handshake
//! The client opens a TCP connection, sends its display name as the first
//! line and waits for the join confirmation carrying its player id. The
//! full match snapshot and roster arrive right after.
//!
//! ### Local Replica
//! Every server message updates a [`game::MatchReplica`]: new matches
//! replace the world wholesale, other players' updates move them and
//! remove the diamonds they collected. The player's own claims are applied
//! optimistically, since the server does not echo them back.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! The match replica, roster tracking and the movement helpers used by
//! the bot binary.
//!
//! ### Network Module (`network`)
//! Connection handling over newline-delimited JSON envelopes:
//! - Name handshake with a configurable timeout
//! - Decoding server messages into typed events
//! - Sending position updates and claims
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::game::MatchReplica;
//! use client::network::{Client, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::connect("127.0.0.1:8080", "ana", &ClientConfig::default()).await?;
//!     let mut replica = MatchReplica::new(client.id());
//!
//!     loop {
//!         let event = client.next_event().await?;
//!         replica.apply(event);
//!
//!         if let Some(diamond) = replica.touching_diamond() {
//!             replica.claim(diamond);
//!             client.send_update(replica.position, Some(diamond)).await?;
//!         }
//!     }
//! }
//! ```

pub mod game;
pub mod network;
