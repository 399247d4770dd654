use crate::geometry::{will_collide, Dimension, DimensionFactor, GeometryError, Movement, Point, Rect};
use crate::path::{Line, Path};
use crate::WALL_WIDTH_PX;
use serde::{Deserialize, Serialize};

/// Pixel size of one size-factor step on each axis.
///
/// The default uses the horizontal unit width for both axes, so a room's
/// height is `factor.height * width`. Set a distinct `height` to size the
/// two axes independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomUnits {
    pub width: i32,
    pub height: i32,
}

impl RoomUnits {
    /// Same unit on both axes
    pub fn square(unit: i32) -> Self {
        Self {
            width: unit,
            height: unit,
        }
    }

    /// Pixel dimension of a room sized by `factor`
    pub fn size_of(&self, factor: DimensionFactor) -> Result<Dimension, GeometryError> {
        Dimension::new(factor.width() * self.width, factor.height() * self.height)
    }
}

impl Default for RoomUnits {
    fn default() -> Self {
        Self::square(crate::HORIZONTAL_UNIT_WIDTH_PX)
    }
}

/// One of the four solid edges of a room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wall {
    pub rect: Rect,
}

/// The walls enclosing a room, derived from its rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Barrier {
    pub factor: DimensionFactor,
    pub left: Wall,
    pub top: Wall,
    pub right: Wall,
    pub bottom: Wall,
}

impl Barrier {
    /// Derives the four walls of `rect`, each [`WALL_WIDTH_PX`] thick
    pub fn new(rect: Rect, factor: DimensionFactor) -> Result<Self, GeometryError> {
        let w = WALL_WIDTH_PX;
        Ok(Self {
            factor,
            left: Wall {
                rect: Rect::new(rect.left(), rect.top(), rect.left() + w, rect.bottom())?,
            },
            top: Wall {
                rect: Rect::new(rect.left(), rect.top(), rect.right(), rect.top() + w)?,
            },
            right: Wall {
                rect: Rect::new(rect.right() - w, rect.top(), rect.right(), rect.bottom())?,
            },
            bottom: Wall {
                rect: Rect::new(rect.left(), rect.bottom() - w, rect.right(), rect.bottom())?,
            },
        })
    }

    /// Left, top, right and bottom walls
    pub fn walls(&self) -> [&Wall; 4] {
        [&self.left, &self.top, &self.right, &self.bottom]
    }

    /// True when moving `obj` by `movement` would hit any wall
    pub fn will_collide(&self, movement: Movement, obj: &Rect) -> bool {
        self.walls()
            .iter()
            .any(|wall| will_collide(movement, &wall.rect, obj))
    }
}

/// A rectangular dungeon room tiled by wall blocks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "RoomJson", try_from = "RoomJson")]
pub struct Room {
    rect: Rect,
    barrier: Barrier,
}

/// Wire form of a room; walls are re-derived on the receiving side
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RoomJson {
    rect: Rect,
    factor: DimensionFactor,
}

impl From<Room> for RoomJson {
    fn from(room: Room) -> Self {
        Self {
            rect: room.rect,
            factor: room.barrier.factor,
        }
    }
}

impl TryFrom<RoomJson> for Room {
    type Error = GeometryError;

    fn try_from(json: RoomJson) -> Result<Self, Self::Error> {
        Room::from_rect(json.rect, json.factor)
    }
}

impl Room {
    /// Builds a room whose top-left corner is `origin`, sized by `factor`
    /// multiples of `units`
    pub fn new(origin: Point, factor: DimensionFactor, units: RoomUnits) -> Result<Self, GeometryError> {
        let rect = Rect::from_origin(origin, units.size_of(factor)?)?;
        Self::from_rect(rect, factor)
    }

    /// Rebuilds a room, walls included, from its rectangle and size factor
    pub fn from_rect(rect: Rect, factor: DimensionFactor) -> Result<Self, GeometryError> {
        let barrier = Barrier::new(rect, factor)?;
        Ok(Self { rect, barrier })
    }

    /// Outer rectangle, walls included
    pub fn rect(&self) -> &Rect {
        &self.rect
    }

    /// The four walls
    pub fn barrier(&self) -> &Barrier {
        &self.barrier
    }

    /// Size in units
    pub fn factor(&self) -> DimensionFactor {
        self.barrier.factor
    }

    /// Width in pixels
    pub fn width(&self) -> i32 {
        self.rect.width()
    }

    /// Height in pixels
    pub fn height(&self) -> i32 {
        self.rect.height()
    }

    /// Center of the outer rectangle
    pub fn center(&self) -> Point {
        self.rect.center()
    }

    /// Walkable floor: the room rectangle without its walls
    pub fn interior(&self) -> Result<Rect, GeometryError> {
        self.rect.inset(WALL_WIDTH_PX)
    }

    /// True when `rect` overlaps or touches the room
    pub fn intersects(&self, rect: &Rect) -> bool {
        self.rect.intersects(rect)
    }

    /// True when `rect` lies entirely inside the room
    pub fn in_bounds(&self, rect: &Rect) -> bool {
        self.rect.in_bounds(rect)
    }

    /// True when `rect` is outside the room, or inside it and `movement`
    /// does not run into a wall
    pub fn can_move_towards(&self, movement: Movement, rect: &Rect) -> bool {
        if !self.in_bounds(rect) {
            return true;
        }
        !self.barrier.will_collide(movement, rect)
    }

    /// L-shaped path from this room's center to `other`'s center.
    ///
    /// The horizontal leg runs along `other`'s center row and the vertical
    /// leg along this room's center column; they meet at
    /// `(self.cx, other.cy)`.
    pub fn path_to(&self, other: &Room) -> Result<Path, GeometryError> {
        let from = self.center();
        let to = other.center();

        let horizontal = Line::new(
            Point::new(from.x().min(to.x()), to.y())?,
            Point::new(from.x().max(to.x()), to.y())?,
        );
        let vertical = Line::new(
            Point::new(from.x(), from.y().min(to.y()))?,
            Point::new(from.x(), from.y().max(to.y()))?,
        );
        Path::new(horizontal, vertical)
    }
}
