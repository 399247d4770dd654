//! Integer geometry used by the layout generator, the connector and every
//! collaborator that tests movement against rooms and paths.
//!
//! All coordinates are non-negative screen pixels. Constructors validate
//! their inputs and return [`GeometryError`] instead of producing values that
//! would break the invariants other modules rely on. Deserialization goes
//! through the same constructors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Violations of the construction invariants of geometric values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("point coordinates must be non-negative, got ({x}, {y})")]
    NegativePoint { x: i32, y: i32 },
    #[error("dimension must be positive, got {width}x{height}")]
    NonPositiveDimension { width: i32, height: i32 },
    #[error("rectangle edges must be non-negative, got ({left}, {top}, {right}, {bottom})")]
    NegativeRect {
        left: i32,
        top: i32,
        right: i32,
        bottom: i32,
    },
    #[error("rectangle must satisfy left < right and top < bottom, got ({left}, {top}, {right}, {bottom})")]
    InvertedRect {
        left: i32,
        top: i32,
        right: i32,
        bottom: i32,
    },
    #[error("dimension factor must be at least 1x1, got {width}x{height}")]
    InvalidFactor { width: i32, height: i32 },
    #[error("line from {p1:?} to {p2:?} has zero length")]
    DegenerateLine { p1: Point, p2: Point },
    #[error("path requires a horizontal line followed by a vertical line")]
    MisorientedPath,
    #[error("path lines do not share an endpoint")]
    DisjointPath,
    #[error("line points are not in ascending order")]
    UnorderedLine,
    #[error("moving {length}px {direction:?} leaves the canvas")]
    InvalidMovement { direction: Direction, length: i32 },
}

/// A non-negative integer coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "RawPoint")]
pub struct Point {
    x: i32,
    y: i32,
}

#[derive(Deserialize)]
struct RawPoint {
    x: i32,
    y: i32,
}

impl TryFrom<RawPoint> for Point {
    type Error = GeometryError;

    fn try_from(raw: RawPoint) -> Result<Self, Self::Error> {
        Point::new(raw.x, raw.y)
    }
}

impl Point {
    /// Fails on negative coordinates
    pub fn new(x: i32, y: i32) -> Result<Self, GeometryError> {
        if x < 0 || y < 0 {
            return Err(GeometryError::NegativePoint { x, y });
        }
        Ok(Self { x, y })
    }

    /// Horizontal coordinate in pixels
    pub fn x(&self) -> i32 {
        self.x
    }

    /// Vertical coordinate in pixels
    pub fn y(&self) -> i32 {
        self.y
    }
}

/// Integer-truncated Euclidean distance between two points
pub fn distance(p1: Point, p2: Point) -> i32 {
    let dx = i64::from(p1.x - p2.x);
    let dy = i64::from(p1.y - p2.y);
    ((dx * dx + dy * dy) as f64).sqrt() as i32
}

/// Positive pixel width and height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDimension")]
pub struct Dimension {
    width: i32,
    height: i32,
}

#[derive(Deserialize)]
struct RawDimension {
    width: i32,
    height: i32,
}

impl TryFrom<RawDimension> for Dimension {
    type Error = GeometryError;

    fn try_from(raw: RawDimension) -> Result<Self, Self::Error> {
        Dimension::new(raw.width, raw.height)
    }
}

impl Dimension {
    /// Fails unless both sides are positive
    pub fn new(width: i32, height: i32) -> Result<Self, GeometryError> {
        if width <= 0 || height <= 0 {
            return Err(GeometryError::NonPositiveDimension { width, height });
        }
        Ok(Self { width, height })
    }

    /// Width in pixels
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Half the width, rounded down
    pub fn semi_width(&self) -> i32 {
        self.width / 2
    }

    /// Half the height, rounded down
    pub fn semi_height(&self) -> i32 {
        self.height / 2
    }
}

/// Size of a room expressed in multiples of a base unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawFactor")]
pub struct DimensionFactor {
    width: i32,
    height: i32,
}

#[derive(Deserialize)]
struct RawFactor {
    width: i32,
    height: i32,
}

impl TryFrom<RawFactor> for DimensionFactor {
    type Error = GeometryError;

    fn try_from(raw: RawFactor) -> Result<Self, Self::Error> {
        DimensionFactor::new(raw.width, raw.height)
    }
}

impl DimensionFactor {
    /// Fails unless both factors are at least 1
    pub fn new(width: i32, height: i32) -> Result<Self, GeometryError> {
        if width < 1 || height < 1 {
            return Err(GeometryError::InvalidFactor { width, height });
        }
        Ok(Self { width, height })
    }

    /// Multiple of the width unit
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Multiple of the height unit
    pub fn height(&self) -> i32 {
        self.height
    }
}

/// Axis-aligned rectangle with `left < right` and `top < bottom`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRect")]
pub struct Rect {
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
}

#[derive(Deserialize)]
struct RawRect {
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
}

impl TryFrom<RawRect> for Rect {
    type Error = GeometryError;

    fn try_from(raw: RawRect) -> Result<Self, Self::Error> {
        Rect::new(raw.left, raw.top, raw.right, raw.bottom)
    }
}

impl Rect {
    /// Fails on negative coordinates or when `right`/`bottom` do not lie
    /// strictly past `left`/`top`
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Result<Self, GeometryError> {
        if left < 0 || top < 0 || right < 0 || bottom < 0 {
            return Err(GeometryError::NegativeRect {
                left,
                top,
                right,
                bottom,
            });
        }
        if !(left < right && top < bottom) {
            return Err(GeometryError::InvertedRect {
                left,
                top,
                right,
                bottom,
            });
        }
        Ok(Self {
            left,
            top,
            right,
            bottom,
        })
    }

    /// Rectangle of the given size whose top-left corner is `origin`
    pub fn from_origin(origin: Point, size: Dimension) -> Result<Self, GeometryError> {
        Self::new(
            origin.x,
            origin.y,
            origin.x + size.width,
            origin.y + size.height,
        )
    }

    /// Left edge x
    pub fn left(&self) -> i32 {
        self.left
    }

    /// Top edge y
    pub fn top(&self) -> i32 {
        self.top
    }

    /// Right edge x
    pub fn right(&self) -> i32 {
        self.right
    }

    /// Bottom edge y
    pub fn bottom(&self) -> i32 {
        self.bottom
    }

    /// Width in pixels
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    /// Height in pixels
    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn semi_width(&self) -> i32 {
        self.width() / 2
    }

    pub fn semi_height(&self) -> i32 {
        self.height() / 2
    }

    /// Center x, rounded down
    pub fn cx(&self) -> i32 {
        self.left + self.semi_width()
    }

    /// Center y, rounded down
    pub fn cy(&self) -> i32 {
        self.top + self.semi_height()
    }

    /// Top-left corner
    pub fn origin(&self) -> Point {
        Point {
            x: self.left,
            y: self.top,
        }
    }

    /// Center point, rounded down on both axes
    pub fn center(&self) -> Point {
        Point {
            x: self.cx(),
            y: self.cy(),
        }
    }

    /// Midpoint of the left edge
    pub fn center_left(&self) -> Point {
        Point {
            x: self.left,
            y: self.cy(),
        }
    }

    /// Midpoint of the top edge
    pub fn center_top(&self) -> Point {
        Point {
            x: self.cx(),
            y: self.top,
        }
    }

    /// Midpoint of the right edge
    pub fn center_right(&self) -> Point {
        Point {
            x: self.right,
            y: self.cy(),
        }
    }

    /// Midpoint of the bottom edge
    pub fn center_bottom(&self) -> Point {
        Point {
            x: self.cx(),
            y: self.bottom,
        }
    }

    /// Overlap test where touching edges count as intersecting
    pub fn intersects(&self, other: &Rect) -> bool {
        let xi = self.left <= other.right && self.right >= other.left;
        let yi = self.top <= other.bottom && self.bottom >= other.top;
        xi && yi
    }

    /// True when `other` lies entirely within this rectangle
    pub fn in_bounds(&self, other: &Rect) -> bool {
        self.left <= other.left
            && self.top <= other.top
            && self.right >= other.right
            && self.bottom >= other.bottom
    }

    /// Shrinks every edge inwards by `amount`
    pub fn inset(&self, amount: i32) -> Result<Rect, GeometryError> {
        Rect::new(
            self.left + amount,
            self.top + amount,
            self.right - amount,
            self.bottom - amount,
        )
    }

    /// Grows every edge outwards by `amount`
    pub fn inflate(&self, amount: i32) -> Result<Rect, GeometryError> {
        self.inset(-amount)
    }

    /// Copy of this rectangle moved by `movement`
    pub fn translated(&self, movement: Movement) -> Result<Rect, GeometryError> {
        let Movement { direction, length } = movement;
        if length < 0 {
            return Err(GeometryError::InvalidMovement { direction, length });
        }
        let (dx, dy) = match direction {
            Direction::Left => (-length, 0),
            Direction::Top => (0, -length),
            Direction::Right => (length, 0),
            Direction::Bottom => (0, length),
        };
        Rect::new(
            self.left + dx,
            self.top + dy,
            self.right + dx,
            self.bottom + dy,
        )
        .map_err(|_| GeometryError::InvalidMovement { direction, length })
    }
}

/// Direction of a single runner step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Top,
    Right,
    Bottom,
}

/// A step of `length` pixels towards `direction`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub direction: Direction,
    pub length: i32,
}

impl Movement {
    /// A step of `length` pixels towards `direction`
    pub fn new(direction: Direction, length: i32) -> Self {
        Self { direction, length }
    }
}

/// True when `rect` moved by `movement` stays strictly inside `host`
/// along the moving axis
pub fn check_movement(movement: Movement, rect: &Rect, host: &Rect) -> bool {
    match movement.direction {
        Direction::Left => rect.left - movement.length > host.left,
        Direction::Top => rect.top - movement.length > host.top,
        Direction::Right => rect.right + movement.length < host.right,
        Direction::Bottom => rect.bottom + movement.length < host.bottom,
    }
}

/// True when `obj` moved by `movement` would touch `obstacle`.
/// A move that would leave the canvas counts as a collision.
pub fn will_collide(movement: Movement, obstacle: &Rect, obj: &Rect) -> bool {
    match obj.translated(movement) {
        Ok(dst) => obstacle.intersects(&dst),
        Err(_) => true,
    }
}
