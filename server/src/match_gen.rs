//! Builds complete matches: rooms, then the corridors joining them, then one
//! diamond per room.

use crate::config::LayoutConfig;
use crate::connector::build_paths;
use crate::generator::generate_rooms;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{
    Diamond, DiamondId, GeometryError, Match, Point, Room, DIAMOND_HEIGHT_PX, DIAMOND_WIDTH_PX,
};
use thiserror::Error;

/// Reasons a match could not be built
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("layout produced {generated} rooms, at least {required} required")]
    TooFewRooms { generated: usize, required: usize },
    #[error("invalid geometry while building match: {0}")]
    Geometry(#[from] GeometryError),
}

/// Owns the layout parameters and the random source used for every match
/// it produces
pub struct MatchGenerator<R = StdRng> {
    config: LayoutConfig,
    rng: R,
}

impl MatchGenerator<StdRng> {
    /// Reproducible generator: the same seed and config give the same
    /// sequence of matches
    pub fn seeded(config: LayoutConfig, seed: u64) -> Self {
        Self::new(config, StdRng::seed_from_u64(seed))
    }

    /// Generator seeded from the operating system
    pub fn from_entropy(config: LayoutConfig) -> Self {
        Self::new(config, StdRng::from_entropy())
    }
}

impl<R: Rng> MatchGenerator<R> {
    pub fn new(config: LayoutConfig, rng: R) -> Self {
        Self { config, rng }
    }

    /// Builds the next match: rooms, then corridors, then one diamond per
    /// room large enough to hold one
    pub fn generate(&mut self) -> Result<Match, GenerationError> {
        let rooms = generate_rooms(&self.config, &mut self.rng);
        let required = self.config.min_rooms.max(1);
        if rooms.len() < required {
            return Err(GenerationError::TooFewRooms {
                generated: rooms.len(),
                required,
            });
        }

        let paths = build_paths(&rooms)?;
        let diamonds = self.place_diamonds(&rooms)?;

        info!(
            "Generated match with {} rooms, {} paths and {} diamonds",
            rooms.len(),
            paths.len(),
            diamonds.len()
        );
        Ok(Match::new(rooms, paths, diamonds))
    }

    /// One diamond per room, fully inside the room's floor. Ids follow room
    /// order starting at 0.
    fn place_diamonds(&mut self, rooms: &[Room]) -> Result<Vec<Diamond>, GeometryError> {
        let mut diamonds = Vec::with_capacity(rooms.len());
        let mut next_id: DiamondId = 0;

        for room in rooms {
            let interior = room.interior()?;
            let span_x = interior.width() - DIAMOND_WIDTH_PX;
            let span_y = interior.height() - DIAMOND_HEIGHT_PX;
            if span_x <= 0 || span_y <= 0 {
                debug!("Room at {:?} too small for a diamond", room.center());
                continue;
            }

            let x = interior.left() + self.rng.gen_range(0..span_x);
            let y = interior.top() + self.rng.gen_range(0..span_y);
            diamonds.push(Diamond::new(next_id, Point::new(x, y)?)?);
            next_id += 1;
        }

        Ok(diamonds)
    }
}
