//! Registry of connected players for the session hub
//!
//! This module holds the server-side record of every connected player:
//! - Identity (unique id, display name)
//! - Last reported position and current score
//! - The bounded outbound queue feeding the player's connection writer
//!
//! The registry is owned by the hub task alone, so nothing here needs
//! locking. Delivery is always non-blocking: a slow or vanished player
//! loses messages, it never stalls the hub.

use log::{debug, info, warn};
use shared::{Envelope, PlayerJoin, Point};
use std::collections::BTreeMap;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Capacity of each player's outbound queue
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// A connected player as seen by the hub
///
/// Each client maintains:
/// - Its id, assigned once and never reused
/// - The position and score broadcast to other players
/// - The sending half of its outbound queue
#[derive(Debug)]
pub struct Client {
    /// Unique client identifier assigned by the server
    pub id: u32,
    /// Display name sent during the handshake
    pub name: String,
    /// Last position reported by the player
    pub position: Point,
    /// Points collected during the current match
    pub score: u32,
    /// Outbound envelopes, drained by the connection's writer task
    sender: mpsc::Sender<Envelope>,
}

impl Client {
    /// Creates a player with a zero score at the given position
    pub fn new(id: u32, name: String, position: Point, sender: mpsc::Sender<Envelope>) -> Self {
        Self {
            id,
            name,
            position,
            score: 0,
            sender,
        }
    }

    /// Roster entry describing this player to others
    pub fn to_player_join(&self) -> PlayerJoin {
        PlayerJoin {
            id: self.id,
            name: self.name.clone(),
            position: self.position,
            score: self.score,
        }
    }

    /// Queues an envelope without waiting
    ///
    /// Returns false when the envelope was dropped, either because the
    /// queue is full or because the writer has already gone away.
    pub fn deliver(&self, envelope: Envelope) -> bool {
        match self.sender.try_send(envelope) {
            Ok(()) => true,
            Err(TrySendError::Full(envelope)) => {
                warn!(
                    "Outbound queue full for client {}, dropping {:?} message",
                    self.id, envelope.kind
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Client {} writer closed, message discarded", self.id);
                false
            }
        }
    }
}

/// Manages all connected players
///
/// Players are kept ordered by id so that rosters and broadcasts follow
/// join order. Ids start at 1 and only ever grow, even after disconnects.
#[derive(Debug)]
pub struct ClientManager {
    /// Connected clients indexed by their unique ID
    clients: BTreeMap<u32, Client>,
    /// Next id to hand out
    next_client_id: u32,
}

impl Default for ClientManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientManager {
    pub fn new() -> Self {
        Self {
            clients: BTreeMap::new(),
            next_client_id: 1,
        }
    }

    /// Reserves the next client id
    ///
    /// Ids are reserved before the player is inserted so the handshake
    /// replies can carry it.
    pub fn next_id(&mut self) -> u32 {
        let id = self.next_client_id;
        self.next_client_id += 1;
        id
    }

    /// Inserts a player under its already reserved id
    pub fn add_client(&mut self, client: Client) {
        info!("Client {} ({}) joined", client.id, client.name);
        self.clients.insert(client.id, client);
    }

    /// Removes a player. Returns the removed record, or None if it was
    /// already gone.
    pub fn remove_client(&mut self, client_id: u32) -> Option<Client> {
        let client = self.clients.remove(&client_id)?;
        info!("Client {} ({}) left", client.id, client.name);
        Some(client)
    }

    pub fn get(&self, client_id: u32) -> Option<&Client> {
        self.clients.get(&client_id)
    }

    pub fn get_mut(&mut self, client_id: u32) -> Option<&mut Client> {
        self.clients.get_mut(&client_id)
    }

    /// Ids of every connected player, in join order
    pub fn ids(&self) -> Vec<u32> {
        self.clients.keys().copied().collect()
    }

    /// Roster of every connected player except `exclude`
    pub fn roster(&self, exclude: Option<u32>) -> Vec<PlayerJoin> {
        self.clients
            .values()
            .filter(|client| Some(client.id) != exclude)
            .map(Client::to_player_join)
            .collect()
    }

    /// Queues an envelope for a single player. Returns false if the player
    /// is unknown or the envelope was dropped.
    pub fn send_to(&self, client_id: u32, envelope: Envelope) -> bool {
        match self.clients.get(&client_id) {
            Some(client) => client.deliver(envelope),
            None => false,
        }
    }

    /// Queues an envelope for every player except `exclude`
    ///
    /// Returns how many queues accepted it.
    pub fn broadcast(&self, envelope: &Envelope, exclude: Option<u32>) -> usize {
        self.clients
            .values()
            .filter(|client| Some(client.id) != exclude)
            .filter(|client| client.deliver(envelope.clone()))
            .count()
    }

    /// Zeroes every score at the start of a new match
    pub fn reset_scores(&mut self) {
        for client in self.clients.values_mut() {
            client.score = 0;
        }
    }

    /// Returns the number of currently connected clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if no clients are currently connected
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
