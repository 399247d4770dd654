use log::{debug, info, warn};
use shared::{
    distance, player_rect, Diamond, DiamondId, Match, Point, ServerEvent, DIAMOND_REWARD,
    PLAYER_SIZE_PX,
};
use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

/// Another player as last reported by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePlayer {
    pub id: u32,
    pub name: String,
    pub position: Point,
    pub score: u32,
}

/// Client-side copy of the match, kept current by server events.
///
/// The local player's own claims are applied immediately; the server never
/// echoes a player's updates back to it. Each diamond is consumed at most
/// once, so when another player's accepted claim names a diamond this
/// player also claimed, the local claim lost and its reward is taken back.
#[derive(Debug, Clone)]
pub struct MatchReplica {
    pub own_id: u32,
    pub position: Point,
    pub score: u32,
    pub game_match: Match,
    pub players: BTreeMap<u32, RemotePlayer>,
    pub last_message: Option<String>,
    deadline: Option<Instant>,
    pending_claims: BTreeSet<DiamondId>,
}

impl MatchReplica {
    pub fn new(own_id: u32) -> Self {
        Self {
            own_id,
            position: Point::default(),
            score: 0,
            game_match: Match::default(),
            players: BTreeMap::new(),
            last_message: None,
            deadline: None,
            pending_claims: BTreeSet::new(),
        }
    }

    pub fn apply(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::JoinAccepted(accepted) => {
                self.own_id = accepted.id;
            }
            ServerEvent::MatchInit(init) => {
                self.deadline = Some(Instant::now() + init.remaining());
                self.game_match = init.game_match;
                self.position = self.game_match.spawn_point().unwrap_or_default();
                self.score = 0;
                self.pending_claims.clear();
                self.players = init
                    .players
                    .into_iter()
                    .filter(|player| player.id != self.own_id)
                    .map(|player| {
                        (
                            player.id,
                            RemotePlayer {
                                id: player.id,
                                name: player.name,
                                position: player.position,
                                score: player.score,
                            },
                        )
                    })
                    .collect();
                info!(
                    "Match started with {} diamonds and {} other players",
                    self.game_match.diamonds().len(),
                    self.players.len()
                );
            }
            ServerEvent::Update(update) => {
                if update.id == self.own_id {
                    return;
                }
                if let Some(diamond) = update.claimed_diamond() {
                    if self.game_match.claim_diamond(diamond).is_some() {
                        debug!("Player {} collected diamond {}", update.id, diamond);
                    } else if self.pending_claims.remove(&diamond) {
                        self.score = self.score.saturating_sub(DIAMOND_REWARD);
                        warn!(
                            "Player {} got diamond {} first, score back to {}",
                            update.id, diamond, self.score
                        );
                    }
                }
                let player = self.players.entry(update.id).or_insert_with(|| RemotePlayer {
                    id: update.id,
                    name: format!("player {}", update.id),
                    position: update.position,
                    score: 0,
                });
                player.position = update.position;
                player.score = update.score;
            }
            ServerEvent::ServerMessage(text) => {
                info!("Server: {}", text);
                self.last_message = Some(text);
            }
            ServerEvent::PlayerJoined(joined) => {
                if joined.id == self.own_id {
                    return;
                }
                self.players.insert(
                    joined.id,
                    RemotePlayer {
                        id: joined.id,
                        name: joined.name,
                        position: joined.position,
                        score: joined.score,
                    },
                );
            }
            ServerEvent::PlayerLeft(left) => {
                if let Some(player) = self.players.remove(&left.id) {
                    info!("{} left", player.name);
                }
            }
        }
    }

    /// Time left in the current match, zero before the first snapshot
    pub fn remaining(&self) -> Duration {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .unwrap_or_default()
    }

    pub fn move_to(&mut self, position: Point) {
        self.position = position;
    }

    /// First diamond the runner currently touches
    pub fn touching_diamond(&self) -> Option<DiamondId> {
        let runner = player_rect(self.position).ok()?;
        self.game_match
            .diamonds()
            .iter()
            .find(|diamond| diamond.collides(&runner))
            .map(Diamond::id)
    }

    /// Removes the diamond locally and credits the reward before the
    /// server has confirmed it
    pub fn claim(&mut self, id: DiamondId) -> Option<Diamond> {
        let diamond = self.game_match.claim_diamond(id)?;
        self.score += DIAMOND_REWARD;
        self.pending_claims.insert(id);
        Some(diamond)
    }

    /// Remaining diamond closest to the runner's center
    pub fn nearest_diamond(&self) -> Option<&Diamond> {
        let half = PLAYER_SIZE_PX / 2;
        let center = Point::new(self.position.x() + half, self.position.y() + half).ok()?;
        self.game_match
            .diamonds()
            .iter()
            .min_by_key(|diamond| distance(center, diamond.rect().center()))
    }

    /// Next position after moving at most `step` pixels per axis towards
    /// `target`
    pub fn step_towards(&self, target: Point, step: i32) -> Point {
        let approach = |from: i32, to: i32| from + (to - from).clamp(-step, step);
        let x = approach(self.position.x(), target.x()).max(0);
        let y = approach(self.position.y(), target.y()).max(0);
        Point::new(x, y).unwrap_or(self.position)
    }
}
