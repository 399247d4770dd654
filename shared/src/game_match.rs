use crate::diamond::{Diamond, DiamondId};
use crate::geometry::{GeometryError, Point, Rect};
use crate::path::Path;
use crate::room::Room;
use crate::PLAYER_SIZE_PX;
use serde::{Deserialize, Serialize};

/// One full playable round: rooms, the corridors joining them and the
/// diamonds still to be collected.
///
/// A match is replaced wholesale when a new round starts; the only
/// mutation during a round is diamond removal.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Match {
    rooms: Vec<Room>,
    paths: Vec<Path>,
    diamonds: Vec<Diamond>,
}

impl Match {
    pub fn new(rooms: Vec<Room>, paths: Vec<Path>, diamonds: Vec<Diamond>) -> Self {
        Self {
            rooms,
            paths,
            diamonds,
        }
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    pub fn diamonds(&self) -> &[Diamond] {
        &self.diamonds
    }

    pub fn diamond(&self, id: DiamondId) -> Option<&Diamond> {
        self.diamonds.iter().find(|d| d.id() == id)
    }

    /// Removes the diamond with the given id. Returns `None` when it was
    /// already collected or never existed.
    pub fn claim_diamond(&mut self, id: DiamondId) -> Option<Diamond> {
        let index = self.diamonds.iter().position(|d| d.id() == id)?;
        Some(self.diamonds.remove(index))
    }

    /// First room fully containing `rect`
    pub fn room_containing(&self, rect: &Rect) -> Option<&Room> {
        self.rooms.iter().find(|room| room.in_bounds(rect))
    }

    /// Top-left corner that centers a runner in the first room
    pub fn spawn_point(&self) -> Option<Point> {
        let room = self.rooms.first()?;
        let center = room.center();
        Point::new(
            center.x() - PLAYER_SIZE_PX / 2,
            center.y() - PLAYER_SIZE_PX / 2,
        )
        .ok()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Bounding rectangle of a runner whose top-left corner is `position`
pub fn player_rect(position: Point) -> Result<Rect, GeometryError> {
    Rect::new(
        position.x(),
        position.y(),
        position.x() + PLAYER_SIZE_PX,
        position.y() + PLAYER_SIZE_PX,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::DimensionFactor;
    use crate::room::RoomUnits;

    fn p(x: i32, y: i32) -> Point {
        Point::new(x, y).unwrap()
    }

    fn sample_match() -> Match {
        let units = RoomUnits::default();
        let a = Room::new(p(0, 0), DimensionFactor::new(2, 2).unwrap(), units).unwrap();
        let b = Room::new(p(400, 300), DimensionFactor::new(3, 1).unwrap(), units).unwrap();
        let path = a.path_to(&b).unwrap();
        let diamonds = vec![
            Diamond::new(0, p(20, 20)).unwrap(),
            Diamond::new(1, p(420, 320)).unwrap(),
        ];
        Match::new(vec![a, b], vec![path], diamonds)
    }

    #[test]
    fn test_claim_diamond_at_most_once() {
        let mut m = sample_match();
        assert_eq!(m.diamonds().len(), 2);

        let claimed = m.claim_diamond(1).unwrap();
        assert_eq!(claimed.id(), 1);
        assert_eq!(m.diamonds().len(), 1);

        assert!(m.claim_diamond(1).is_none());
        assert_eq!(m.diamonds().len(), 1);
        assert!(m.diamond(0).is_some());
    }

    #[test]
    fn test_claim_after_removal_keeps_ids_stable() {
        let mut m = sample_match();
        m.claim_diamond(0);
        let remaining = m.diamond(1).unwrap();
        assert_eq!(remaining.origin(), p(420, 320));
    }

    #[test]
    fn test_json_roundtrip() {
        let m = sample_match();
        let json = m.to_json().unwrap();
        let back = Match::from_json(&json).unwrap();

        assert_eq!(back, m);
        for (a, b) in back.rooms().iter().zip(m.rooms()) {
            assert_eq!(a.rect(), b.rect());
            assert_eq!(a.factor(), b.factor());
            assert_eq!(a.barrier(), b.barrier());
        }
    }

    #[test]
    fn test_rejects_corrupted_path() {
        let m = sample_match();
        let mut value = serde_json::to_value(&m).unwrap();
        value["paths"][0]["horizontal"]["p2"] = value["paths"][0]["horizontal"]["p1"].clone();
        let result: Result<Match, _> = serde_json::from_value(value);
        assert!(result.is_err());
    }

    #[test]
    fn test_spawn_point_and_lookup() {
        let m = sample_match();
        let spawn = m.spawn_point().unwrap();
        assert_eq!(spawn, p(48, 48));

        let runner = player_rect(spawn).unwrap();
        assert_eq!(m.room_containing(&runner), m.rooms().first());
        assert!(Match::default().spawn_point().is_none());
    }
}
