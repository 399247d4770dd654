//! Tunables for world generation and the session hub

use shared::{RoomUnits, CANVAS_HEIGHT, CANVAS_WIDTH, DIAMOND_REWARD, PATH_WIDTH_PX};
use std::time::Duration;

pub const DEFAULT_LISTEN_ADDR: &str = "localhost:8080";
pub const DEFAULT_MATCH_DURATION: Duration = Duration::from_secs(45);

/// Parameters of the rejection-sampling room placement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutConfig {
    pub canvas_width: i32,
    pub canvas_height: i32,
    pub units: RoomUnits,
    pub max_width_factor: i32,
    pub max_height_factor: i32,
    /// Candidate rooms drawn per layout, accepted or not
    pub attempts: u32,
    /// Clearance band kept around every claimed room edge and center line
    pub path_width: i32,
    /// Fewer accepted rooms than this fails generation
    pub min_rooms: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            canvas_width: CANVAS_WIDTH,
            canvas_height: CANVAS_HEIGHT,
            units: RoomUnits::default(),
            max_width_factor: 8,
            max_height_factor: 5,
            attempts: 100_000,
            path_width: PATH_WIDTH_PX,
            min_rooms: 1,
        }
    }
}

/// Everything the server binary needs to run
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub match_duration: Duration,
    pub diamond_reward: u32,
    pub layout: LayoutConfig,
    /// Fixed seed for reproducible worlds; entropy when unset
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            match_duration: DEFAULT_MATCH_DURATION,
            diamond_reward: DIAMOND_REWARD,
            layout: LayoutConfig::default(),
            seed: None,
        }
    }
}
