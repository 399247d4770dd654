use log::info;
use shared::{Diamond, DiamondId, Match, MatchInit, PlayerJoin, Point};
use std::time::{Duration, Instant};

/// The match currently being played and the clock of its round
#[derive(Debug, Clone)]
pub struct GameState {
    pub current: Match,
    pub started_at: Instant,
    pub match_duration: Duration,
}

impl GameState {
    pub fn new(current: Match, match_duration: Duration) -> Self {
        Self {
            current,
            started_at: Instant::now(),
            match_duration,
        }
    }

    /// Time left in the current round, zero once it has run out
    pub fn remaining(&self) -> Duration {
        self.match_duration.saturating_sub(self.started_at.elapsed())
    }

    /// Replaces the match wholesale and restarts the round clock
    pub fn reset(&mut self, next: Match) {
        info!(
            "New match with {} rooms and {} diamonds",
            next.rooms().len(),
            next.diamonds().len()
        );
        self.current = next;
        self.started_at = Instant::now();
    }

    pub fn claim_diamond(&mut self, id: DiamondId) -> Option<Diamond> {
        self.current.claim_diamond(id)
    }

    /// Where newly joined players appear
    pub fn spawn_point(&self) -> Point {
        self.current.spawn_point().unwrap_or_default()
    }

    /// Full snapshot for (re)initializing a client
    pub fn match_init(&self, players: Vec<PlayerJoin>) -> MatchInit {
        MatchInit {
            game_match: self.current.clone(),
            remaining_ms: u64::try_from(self.remaining().as_millis()).unwrap_or(u64::MAX),
            players,
        }
    }
}
