use crate::geometry::{Dimension, GeometryError, Point, Rect};
use crate::{DIAMOND_HEIGHT_PX, DIAMOND_WIDTH_PX};
use serde::{Deserialize, Serialize};

/// Identifier of a diamond, unique within one match
pub type DiamondId = u32;

/// Collectible placed inside a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "DiamondJson", try_from = "DiamondJson")]
pub struct Diamond {
    id: DiamondId,
    rect: Rect,
}

/// Wire form: the id plus the top-left corner; the size is fixed
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct DiamondJson {
    id: DiamondId,
    origin: Point,
}

impl From<Diamond> for DiamondJson {
    fn from(diamond: Diamond) -> Self {
        Self {
            id: diamond.id,
            origin: diamond.origin(),
        }
    }
}

impl TryFrom<DiamondJson> for Diamond {
    type Error = GeometryError;

    fn try_from(json: DiamondJson) -> Result<Self, Self::Error> {
        Diamond::new(json.id, json.origin)
    }
}

impl Diamond {
    pub fn new(id: DiamondId, origin: Point) -> Result<Self, GeometryError> {
        let size = Dimension::new(DIAMOND_WIDTH_PX, DIAMOND_HEIGHT_PX)?;
        let rect = Rect::from_origin(origin, size)?;
        Ok(Self { id, rect })
    }

    pub fn id(&self) -> DiamondId {
        self.id
    }

    pub fn rect(&self) -> &Rect {
        &self.rect
    }

    pub fn origin(&self) -> Point {
        self.rect.origin()
    }

    /// True when a player's bounding rectangle touches this diamond
    pub fn collides(&self, rect: &Rect) -> bool {
        self.rect.intersects(rect)
    }
}
