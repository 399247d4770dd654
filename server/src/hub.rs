//! Session hub: the single task that owns the match and the player registry
//!
//! Every other task talks to the hub through a [`HubHandle`], which wraps a
//! bounded inbox of [`HubMessage`]s. The hub processes one message at a
//! time, so all match and registry mutation is serialized through it and no
//! state is shared behind locks. A full inbox makes senders wait, so a
//! flooding connection only slows its own reader. Outbound traffic leaves
//! through each player's bounded queue and never blocks the hub loop.

use crate::client_manager::{Client, ClientManager};
use crate::game::GameState;
use crate::match_gen::{GenerationError, MatchGenerator};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::Rng;
use shared::{Envelope, JoinAccepted, PlayerLeft, ServerEvent, Update, NO_DIAMOND};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval, MissedTickBehavior};

/// Generation attempts per reset before the previous match is kept
pub const MAX_GENERATION_RETRIES: u32 = 5;

/// Requests the hub inbox holds before senders wait
pub const HUB_INBOX_CAPACITY: usize = 1000;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("session hub is no longer running")]
    Closed,
    #[error("session hub inbox is full")]
    Full,
}

/// Requests processed by the hub loop
#[derive(Debug)]
pub enum HubMessage {
    Register {
        name: String,
        sender: mpsc::Sender<Envelope>,
        reply: oneshot::Sender<u32>,
    },
    Unregister {
        client_id: u32,
    },
    Update {
        client_id: u32,
        update: Update,
    },
    Broadcast {
        envelope: Envelope,
        exclude: Option<u32>,
    },
    ResetMatch,
    Stats {
        reply: oneshot::Sender<HubStats>,
    },
    Shutdown,
}

/// Point-in-time view of the hub, for diagnostics and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubStats {
    pub clients: usize,
    pub diamonds: usize,
    pub remaining: Duration,
}

/// Cheap, clonable front door to the hub
#[derive(Debug, Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubMessage>,
}

impl HubHandle {
    /// Queues a request, waiting while the inbox is full
    async fn send(&self, message: HubMessage) -> Result<(), HubError> {
        self.tx.send(message).await.map_err(|_| HubError::Closed)
    }

    /// Registers a player whose outbound envelopes go to `sender` and
    /// returns its assigned id
    pub async fn register(
        &self,
        name: String,
        sender: mpsc::Sender<Envelope>,
    ) -> Result<u32, HubError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubMessage::Register {
            name,
            sender,
            reply,
        })
        .await?;
        rx.await.map_err(|_| HubError::Closed)
    }

    /// Removes a player; unknown ids are ignored by the hub
    pub async fn unregister(&self, client_id: u32) -> Result<(), HubError> {
        self.send(HubMessage::Unregister { client_id }).await
    }

    /// Forwards a player's reported position and optional claim
    pub async fn update(&self, client_id: u32, update: Update) -> Result<(), HubError> {
        self.send(HubMessage::Update { client_id, update }).await
    }

    /// Sends `envelope` to every player except `exclude`
    pub async fn broadcast(&self, envelope: Envelope, exclude: Option<u32>) -> Result<(), HubError> {
        self.send(HubMessage::Broadcast { envelope, exclude }).await
    }

    /// Replaces the match and re-initializes every player
    pub async fn reset_match(&self) -> Result<(), HubError> {
        self.send(HubMessage::ResetMatch).await
    }

    pub async fn stats(&self) -> Result<HubStats, HubError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubMessage::Stats { reply }).await?;
        rx.await.map_err(|_| HubError::Closed)
    }

    /// Asks the hub loop to stop without waiting for inbox space. When the
    /// inbox is full the hub still stops once every handle is dropped.
    pub fn shutdown(&self) -> Result<(), HubError> {
        self.tx.try_send(HubMessage::Shutdown).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => HubError::Full,
            mpsc::error::TrySendError::Closed(_) => HubError::Closed,
        })
    }
}

pub struct Hub<R = StdRng> {
    generator: MatchGenerator<R>,
    game: GameState,
    clients: ClientManager,
    reward: u32,
    inbox: mpsc::Receiver<HubMessage>,
}

impl<R: Rng> Hub<R> {
    /// Creates the hub with a freshly generated first match. Failing to
    /// generate it is fatal.
    pub fn new(
        mut generator: MatchGenerator<R>,
        match_duration: Duration,
        reward: u32,
    ) -> Result<(Self, HubHandle), GenerationError> {
        let first = generator.generate()?;
        let (tx, inbox) = mpsc::channel(HUB_INBOX_CAPACITY);

        let hub = Self {
            generator,
            game: GameState::new(first, match_duration),
            clients: ClientManager::new(),
            reward,
            inbox,
        };
        Ok((hub, HubHandle { tx }))
    }

    /// Runs until a shutdown message arrives or every handle is dropped
    pub async fn run(mut self) {
        info!("Session hub started");

        while let Some(message) = self.inbox.recv().await {
            if !self.handle_message(message) {
                break;
            }
        }

        info!("Session hub shutting down with {} clients", self.clients.len());
    }

    /// Applies one request. Returns false when the hub should stop.
    pub fn handle_message(&mut self, message: HubMessage) -> bool {
        match message {
            HubMessage::Register {
                name,
                sender,
                reply,
            } => self.register(name, sender, reply),
            HubMessage::Unregister { client_id } => self.unregister(client_id),
            HubMessage::Update { client_id, update } => self.update(client_id, update),
            HubMessage::Broadcast { envelope, exclude } => {
                self.clients.broadcast(&envelope, exclude);
            }
            HubMessage::ResetMatch => self.reset_match(),
            HubMessage::Stats { reply } => {
                let _ = reply.send(self.stats());
            }
            HubMessage::Shutdown => return false,
        }
        true
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            clients: self.clients.len(),
            diamonds: self.game.current.diamonds().len(),
            remaining: self.game.remaining(),
        }
    }

    fn register(
        &mut self,
        name: String,
        sender: mpsc::Sender<Envelope>,
        reply: oneshot::Sender<u32>,
    ) {
        let id = self.clients.next_id();
        let name = display_name(&name, id);
        let client = Client::new(id, name, self.game.spawn_point(), sender);

        // The newcomer hears about itself first, then gets the world
        let init = self.game.match_init(self.clients.roster(None));
        for event in [
            ServerEvent::JoinAccepted(JoinAccepted { id }),
            ServerEvent::MatchInit(init),
        ] {
            if let Some(envelope) = encode(&event) {
                client.deliver(envelope);
            }
        }

        let joined = client.to_player_join();
        let greeting = Envelope::text(format!("{} joined the match", client.name));
        self.clients.add_client(client);

        if let Some(envelope) = encode(&ServerEvent::PlayerJoined(joined)) {
            self.clients.broadcast(&envelope, Some(id));
        }
        self.clients.broadcast(&greeting, None);

        if reply.send(id).is_err() {
            warn!("Client {} went away during registration", id);
            self.unregister(id);
        }
    }

    fn unregister(&mut self, client_id: u32) {
        if self.clients.remove_client(client_id).is_none() {
            debug!("Unregister for unknown client {}", client_id);
            return;
        }
        if let Some(envelope) = encode(&ServerEvent::PlayerLeft(PlayerLeft { id: client_id })) {
            self.clients.broadcast(&envelope, None);
        }
    }

    fn update(&mut self, client_id: u32, update: Update) {
        let Some(client) = self.clients.get_mut(client_id) else {
            debug!("Update from unknown client {}", client_id);
            return;
        };
        client.position = update.position;

        let claimed = update
            .claimed_diamond()
            .and_then(|diamond_id| self.game.claim_diamond(diamond_id));
        match &claimed {
            Some(diamond) => {
                client.score += self.reward;
                debug!(
                    "Client {} collected diamond {}, score {}",
                    client_id,
                    diamond.id(),
                    client.score
                );
            }
            None if update.diamond_id != NO_DIAMOND => {
                debug!(
                    "Client {} claimed unavailable diamond {}",
                    client_id, update.diamond_id
                );
            }
            None => {}
        }

        let echoed = Update {
            id: client_id,
            position: update.position,
            diamond_id: claimed.map_or(NO_DIAMOND, |diamond| i64::from(diamond.id())),
            score: client.score,
        };
        if let Some(envelope) = encode(&ServerEvent::Update(echoed)) {
            self.clients.broadcast(&envelope, Some(client_id));
        }
    }

    fn reset_match(&mut self) {
        for attempt in 1..=MAX_GENERATION_RETRIES {
            match self.generator.generate() {
                Ok(next) => {
                    self.game.reset(next);
                    self.clients.reset_scores();
                    self.send_match_init_to_all();
                    return;
                }
                Err(e) => warn!("Match generation attempt {} failed: {}", attempt, e),
            }
        }
        error!(
            "Keeping the previous match after {} failed generation attempts",
            MAX_GENERATION_RETRIES
        );
    }

    /// Every player gets the new match with the roster of everyone else
    fn send_match_init_to_all(&self) {
        for id in self.clients.ids() {
            let init = self.game.match_init(self.clients.roster(Some(id)));
            if let Some(envelope) = encode(&ServerEvent::MatchInit(init)) {
                self.clients.send_to(id, envelope);
            }
        }
    }
}

/// Trimmed handshake name, or `player <id>` when nothing usable was sent
fn display_name(raw: &str, id: u32) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        format!("player {}", id)
    } else {
        trimmed.to_string()
    }
}

fn encode(event: &ServerEvent) -> Option<Envelope> {
    match event.to_envelope() {
        Ok(envelope) => Some(envelope),
        Err(e) => {
            error!("Failed to encode {:?} message: {}", event.kind(), e);
            None
        }
    }
}

/// Asks the hub for a new match every `period` until shutdown is signalled
/// or the hub is gone. `period` must be non-zero.
pub fn spawn_reset_timer(
    hub: HubHandle,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if hub.reset_match().await.is_err() {
                        debug!("Reset timer stopping, hub closed");
                        break;
                    }
                }
                _ = shutdown.changed() => {
                    debug!("Reset timer stopping on shutdown");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use shared::{MatchInit, MessageType, Point};

    fn test_hub() -> (Hub, HubHandle) {
        let config = LayoutConfig {
            attempts: 5_000,
            ..LayoutConfig::default()
        };
        Hub::new(
            MatchGenerator::seeded(config, 17),
            Duration::from_secs(45),
            30,
        )
        .unwrap()
    }

    fn join(hub: &mut Hub, name: &str) -> (u32, mpsc::Receiver<Envelope>) {
        let (tx, rx) = mpsc::channel(64);
        let (reply, mut reply_rx) = oneshot::channel();
        assert!(hub.handle_message(HubMessage::Register {
            name: name.to_string(),
            sender: tx,
            reply,
        }));
        (reply_rx.try_recv().unwrap(), rx)
    }

    fn drain(rx: &mut mpsc::Receiver<Envelope>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(envelope) = rx.try_recv() {
            events.push(ServerEvent::try_from(&envelope).unwrap());
        }
        events
    }

    fn claim(hub: &mut Hub, client_id: u32, diamond_id: u32) {
        let update = Update::claiming(Point::new(100, 100).unwrap(), diamond_id);
        hub.handle_message(HubMessage::Update { client_id, update });
    }

    #[test]
    fn test_handshake_order() {
        let (mut hub, _handle) = test_hub();
        let (id, mut rx) = join(&mut hub, "ana");
        assert_eq!(id, 1);

        let events = drain(&mut rx);
        assert_eq!(events[0], ServerEvent::JoinAccepted(JoinAccepted { id: 1 }));
        match &events[1] {
            ServerEvent::MatchInit(init) => {
                assert!(init.players.is_empty());
                assert!(init.remaining() <= Duration::from_secs(45));
                assert_eq!(init.game_match, hub.game.current);
            }
            other => panic!("expected match init, got {:?}", other),
        }
        assert_eq!(
            events[2],
            ServerEvent::ServerMessage("ana joined the match".to_string())
        );
    }

    #[test]
    fn test_join_notifies_others() {
        let (mut hub, _handle) = test_hub();
        let (first, mut first_rx) = join(&mut hub, "ana");
        drain(&mut first_rx);

        let (second, mut second_rx) = join(&mut hub, "  ");
        let first_events = drain(&mut first_rx);
        match &first_events[0] {
            ServerEvent::PlayerJoined(joined) => {
                assert_eq!(joined.id, second);
                assert_eq!(joined.name, "player 2");
            }
            other => panic!("expected player join, got {:?}", other),
        }

        let second_events = drain(&mut second_rx);
        let ServerEvent::MatchInit(MatchInit { players, .. }) = &second_events[1] else {
            panic!("expected match init");
        };
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].id, first);
        assert_eq!(players[0].name, "ana");
    }

    #[test]
    fn test_diamond_claimed_at_most_once() {
        let (mut hub, _handle) = test_hub();
        let (a, _a_rx) = join(&mut hub, "a");
        let (b, mut b_rx) = join(&mut hub, "b");
        drain(&mut b_rx);

        let before = hub.stats().diamonds;
        assert!(before > 0);

        claim(&mut hub, a, 0);
        assert_eq!(hub.stats().diamonds, before - 1);
        assert_eq!(hub.clients.get(a).unwrap().score, 30);

        let events = drain(&mut b_rx);
        assert_eq!(events.len(), 1);
        let ServerEvent::Update(update) = &events[0] else {
            panic!("expected update");
        };
        assert_eq!(update.id, a);
        assert_eq!(update.diamond_id, 0);
        assert_eq!(update.score, 30);

        claim(&mut hub, b, 0);
        claim(&mut hub, a, 0);
        assert_eq!(hub.stats().diamonds, before - 1);
        assert_eq!(hub.clients.get(a).unwrap().score, 30);
        assert_eq!(hub.clients.get(b).unwrap().score, 0);
    }

    #[test]
    fn test_failed_claim_echoes_sentinel() {
        let (mut hub, _handle) = test_hub();
        let (a, _a_rx) = join(&mut hub, "a");
        let (_b, mut b_rx) = join(&mut hub, "b");
        drain(&mut b_rx);

        claim(&mut hub, a, 9_999);
        let events = drain(&mut b_rx);
        let ServerEvent::Update(update) = &events[0] else {
            panic!("expected update");
        };
        assert_eq!(update.diamond_id, NO_DIAMOND);
        assert_eq!(update.score, 0);
        assert_eq!(update.position, Point::new(100, 100).unwrap());
    }

    #[test]
    fn test_unregister_broadcasts_player_left() {
        let (mut hub, _handle) = test_hub();
        let (a, a_rx) = join(&mut hub, "a");
        let (_b, mut b_rx) = join(&mut hub, "b");
        drain(&mut b_rx);
        drop(a_rx);

        hub.handle_message(HubMessage::Unregister { client_id: a });
        assert_eq!(drain(&mut b_rx), vec![ServerEvent::PlayerLeft(PlayerLeft { id: a })]);
        assert_eq!(hub.stats().clients, 1);

        // A second unregister is a no-op
        hub.handle_message(HubMessage::Unregister { client_id: a });
        assert!(drain(&mut b_rx).is_empty());
    }

    #[test]
    fn test_reset_zeroes_scores_and_reinitializes() {
        let (mut hub, _handle) = test_hub();
        let (a, mut a_rx) = join(&mut hub, "a");
        claim(&mut hub, a, 0);
        drain(&mut a_rx);

        hub.handle_message(HubMessage::ResetMatch);
        assert_eq!(hub.clients.get(a).unwrap().score, 0);

        let events = drain(&mut a_rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), MessageType::GameInitialization);
        let ServerEvent::MatchInit(init) = &events[0] else {
            panic!("expected match init");
        };
        assert_eq!(init.game_match, hub.game.current);
        assert_eq!(init.game_match.diamonds().len(), init.game_match.rooms().len());
    }

    #[test]
    fn test_broadcast_routing() {
        let (mut hub, _handle) = test_hub();
        let (a, mut a_rx) = join(&mut hub, "a");
        let (b, mut b_rx) = join(&mut hub, "b");
        drain(&mut a_rx);
        drain(&mut b_rx);

        hub.handle_message(HubMessage::Broadcast {
            envelope: Envelope::text("to everyone"),
            exclude: None,
        });
        let everyone = vec![ServerEvent::ServerMessage("to everyone".to_string())];
        assert_eq!(drain(&mut a_rx), everyone);
        assert_eq!(drain(&mut b_rx), everyone);

        hub.handle_message(HubMessage::Broadcast {
            envelope: Envelope::text("not for a"),
            exclude: Some(a),
        });
        assert!(drain(&mut a_rx).is_empty());
        assert_eq!(
            drain(&mut b_rx),
            vec![ServerEvent::ServerMessage("not for a".to_string())]
        );
        assert_eq!(hub.clients.get(b).unwrap().score, 0);
    }

    #[tokio::test]
    async fn test_broadcast_through_handle() {
        let (hub, handle) = test_hub();
        let task = tokio::spawn(hub.run());

        let (tx, mut rx) = mpsc::channel(8);
        let id = handle.register("ana".to_string(), tx).await.unwrap();
        // Join confirmation, snapshot and greeting
        for _ in 0..3 {
            rx.recv().await.unwrap();
        }

        handle
            .broadcast(Envelope::text("skipped"), Some(id))
            .await
            .unwrap();
        handle.broadcast(Envelope::text("hello"), None).await.unwrap();
        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope, Envelope::text("hello"));

        handle.shutdown().unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_full_inbox_makes_senders_wait() {
        let (tx, mut inbox) = mpsc::channel(1);
        let handle = HubHandle { tx };

        handle.reset_match().await.unwrap();
        assert!(matches!(handle.shutdown(), Err(HubError::Full)));
        let blocked = tokio::time::timeout(Duration::from_millis(50), handle.reset_match()).await;
        assert!(blocked.is_err());

        assert!(matches!(inbox.recv().await, Some(HubMessage::ResetMatch)));
        handle.reset_match().await.unwrap();
        drop(inbox);
        assert!(matches!(handle.reset_match().await, Err(HubError::Closed)));
    }

    #[test]
    fn test_registration_with_dropped_reply() {
        let (mut hub, _handle) = test_hub();
        let (tx, _rx) = mpsc::channel(8);
        let (reply, reply_rx) = oneshot::channel();
        drop(reply_rx);

        hub.handle_message(HubMessage::Register {
            name: "ghost".to_string(),
            sender: tx,
            reply,
        });
        assert_eq!(hub.stats().clients, 0);
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(" ana \n", 3), "ana");
        assert_eq!(display_name("", 3), "player 3");
    }

    #[tokio::test]
    async fn test_handle_round_trip() {
        let (hub, handle) = test_hub();
        let task = tokio::spawn(hub.run());

        let (tx, mut rx) = mpsc::channel(8);
        let id = handle.register("ana".to_string(), tx).await.unwrap();
        assert_eq!(id, 1);
        assert_eq!(rx.recv().await.unwrap().kind, MessageType::JoinAccepted);

        let stats = handle.stats().await.unwrap();
        assert_eq!(stats.clients, 1);

        handle.shutdown().unwrap();
        task.await.unwrap();
        assert!(matches!(handle.stats().await, Err(HubError::Closed)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_timer_fires_each_period() {
        let (tx, mut inbox) = mpsc::channel(16);
        let handle = HubHandle { tx };
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let timer = spawn_reset_timer(handle, Duration::from_secs(45), shutdown_rx);
        tokio::time::sleep(Duration::from_secs(100)).await;

        let mut resets = 0;
        while let Ok(message) = inbox.try_recv() {
            assert!(matches!(message, HubMessage::ResetMatch));
            resets += 1;
        }
        assert_eq!(resets, 2);

        shutdown_tx.send(true).unwrap();
        timer.await.unwrap();
    }
}
