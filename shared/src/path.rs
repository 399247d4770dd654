use crate::geometry::{check_movement, distance, GeometryError, Movement, Point, Rect};
use crate::PATH_WIDTH_PX;
use serde::{Deserialize, Serialize};

/// Straight segment between two points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    p1: Point,
    p2: Point,
}

impl Line {
    /// Segment from `p1` to `p2`; ordering is checked by [`Path::new`]
    pub fn new(p1: Point, p2: Point) -> Self {
        Self { p1, p2 }
    }

    /// Start point, the smaller coordinate on the segment's axis
    pub fn p1(&self) -> Point {
        self.p1
    }

    /// End point
    pub fn p2(&self) -> Point {
        self.p2
    }

    /// True when both ends coincide
    pub fn is_degenerate(&self) -> bool {
        distance(self.p1, self.p2) == 0
    }

    /// True when both ends share a y coordinate
    pub fn is_horizontal(&self) -> bool {
        self.p1.y() == self.p2.y()
    }

    /// True when both ends share an x coordinate
    pub fn is_vertical(&self) -> bool {
        self.p1.x() == self.p2.x()
    }

    fn shares_endpoint(&self, other: &Line) -> bool {
        self.p1 == other.p1 || self.p1 == other.p2 || self.p2 == other.p1 || self.p2 == other.p2
    }
}

/// Corridor joining two rooms: one horizontal and one vertical leg, each
/// widened into a capsule rectangle of [`PATH_WIDTH_PX`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "PathJson", try_from = "PathJson")]
pub struct Path {
    horizontal: Line,
    horizontal_rect: Rect,
    vertical: Line,
    vertical_rect: Rect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PathJson {
    horizontal: Line,
    vertical: Line,
}

impl From<Path> for PathJson {
    fn from(path: Path) -> Self {
        Self {
            horizontal: path.horizontal,
            vertical: path.vertical,
        }
    }
}

impl TryFrom<PathJson> for Path {
    type Error = GeometryError;

    fn try_from(json: PathJson) -> Result<Self, Self::Error> {
        Path::new(json.horizontal, json.vertical)
    }
}

impl Path {
    /// Validates the pair and builds the two capsules. Fails on degenerate,
    /// misoriented or unordered segments, on segments sharing no endpoint
    /// and when a capsule would reach past the canvas origin.
    pub fn new(horizontal: Line, vertical: Line) -> Result<Self, GeometryError> {
        for line in [&horizontal, &vertical] {
            if line.is_degenerate() {
                return Err(GeometryError::DegenerateLine {
                    p1: line.p1,
                    p2: line.p2,
                });
            }
        }
        if !(horizontal.is_horizontal() && vertical.is_vertical()) {
            return Err(GeometryError::MisorientedPath);
        }
        if !horizontal.shares_endpoint(&vertical) {
            return Err(GeometryError::DisjointPath);
        }
        if horizontal.p1.x() > horizontal.p2.x() || vertical.p1.y() > vertical.p2.y() {
            return Err(GeometryError::UnorderedLine);
        }

        let sw = PATH_WIDTH_PX / 2;
        let horizontal_rect = Rect::new(
            horizontal.p1.x() - sw,
            horizontal.p1.y() - sw,
            horizontal.p2.x() + sw,
            horizontal.p1.y() + sw,
        )?;
        let vertical_rect = Rect::new(
            vertical.p1.x() - sw,
            vertical.p1.y() - sw,
            vertical.p1.x() + sw,
            vertical.p2.y() + sw,
        )?;

        Ok(Self {
            horizontal,
            horizontal_rect,
            vertical,
            vertical_rect,
        })
    }

    /// The horizontal segment
    pub fn horizontal(&self) -> &Line {
        &self.horizontal
    }

    /// The vertical segment
    pub fn vertical(&self) -> &Line {
        &self.vertical
    }

    /// Walkable capsule around the horizontal segment
    pub fn horizontal_rect(&self) -> &Rect {
        &self.horizontal_rect
    }

    /// Walkable capsule around the vertical segment
    pub fn vertical_rect(&self) -> &Rect {
        &self.vertical_rect
    }

    /// Endpoint shared by both legs
    pub fn corner(&self) -> Point {
        let v = &self.vertical;
        if self.horizontal.p1 == v.p1 || self.horizontal.p2 == v.p1 {
            v.p1
        } else {
            v.p2
        }
    }

    /// True when `rect` lies entirely inside either capsule
    pub fn in_bounds(&self, rect: &Rect) -> bool {
        self.horizontal_rect.in_bounds(rect) || self.vertical_rect.in_bounds(rect)
    }

    /// A rect inside the corridor may move as long as it stays inside one
    /// of the capsules it currently occupies
    pub fn can_move_towards(&self, movement: Movement, rect: &Rect) -> bool {
        if !self.in_bounds(rect) {
            return true;
        }
        let mx = self.horizontal_rect.in_bounds(rect)
            && check_movement(movement, rect, &self.horizontal_rect);
        let my = self.vertical_rect.in_bounds(rect)
            && check_movement(movement, rect, &self.vertical_rect);
        mx || my
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Direction;

    fn p(x: i32, y: i32) -> Point {
        Point::new(x, y).unwrap()
    }

    fn sample_path() -> Path {
        Path::new(
            Line::new(p(100, 300), p(400, 300)),
            Line::new(p(100, 100), p(100, 300)),
        )
        .unwrap()
    }

    #[test]
    fn test_path_capsules() {
        let path = sample_path();
        assert_eq!(*path.horizontal_rect(), Rect::new(82, 282, 418, 318).unwrap());
        assert_eq!(*path.vertical_rect(), Rect::new(82, 82, 118, 318).unwrap());
        assert_eq!(path.corner(), p(100, 300));
    }

    #[test]
    fn test_rejects_degenerate_lines() {
        let result = Path::new(
            Line::new(p(100, 300), p(100, 300)),
            Line::new(p(100, 100), p(100, 300)),
        );
        assert!(matches!(result, Err(GeometryError::DegenerateLine { .. })));
    }

    #[test]
    fn test_rejects_swapped_orientation() {
        let result = Path::new(
            Line::new(p(100, 100), p(100, 300)),
            Line::new(p(100, 300), p(400, 300)),
        );
        assert_eq!(result, Err(GeometryError::MisorientedPath));
    }

    #[test]
    fn test_rejects_disjoint_lines() {
        let result = Path::new(
            Line::new(p(100, 300), p(400, 300)),
            Line::new(p(500, 100), p(500, 200)),
        );
        assert_eq!(result, Err(GeometryError::DisjointPath));
    }

    #[test]
    fn test_rejects_descending_points() {
        let result = Path::new(
            Line::new(p(400, 300), p(100, 300)),
            Line::new(p(100, 100), p(100, 300)),
        );
        assert_eq!(result, Err(GeometryError::UnorderedLine));

        let result = Path::new(
            Line::new(p(100, 300), p(400, 300)),
            Line::new(p(100, 300), p(100, 100)),
        );
        assert_eq!(result, Err(GeometryError::UnorderedLine));
    }

    #[test]
    fn test_corridor_movement() {
        let path = sample_path();
        let runner = Rect::new(200, 284, 232, 316).unwrap();

        assert!(path.in_bounds(&runner));
        assert!(path.can_move_towards(Movement::new(Direction::Right, 1), &runner));
        assert!(!path.can_move_towards(Movement::new(Direction::Top, 2), &runner));
    }

    #[test]
    fn test_path_json_roundtrip() {
        let path = sample_path();
        let json = serde_json::to_string(&path).unwrap();
        let back: Path = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }
}
