//! Random room placement.
//!
//! Rooms are placed by rejection sampling: a fixed number of candidates is
//! drawn and each one is kept only if it overlaps no accepted room and none
//! of its edge or center lines lies within the path width of a line
//! already claimed by an accepted room, on either side. The band keeps corridors, which run along room center
//! lines, from ever lying flush against another room's wall.

use crate::config::LayoutConfig;
use log::debug;
use rand::Rng;
use shared::{DimensionFactor, Point, Rect, Room};
use std::collections::BTreeSet;

/// Places non-overlapping rooms on the canvas described by `config`.
///
/// Rooms come back in acceptance order. The result may be short or even
/// empty when the canvas is small relative to the room sizes; callers
/// decide whether that is acceptable.
pub fn generate_rooms<R: Rng + ?Sized>(config: &LayoutConfig, rng: &mut R) -> Vec<Room> {
    let mut rooms: Vec<Room> = Vec::new();
    let mut claimed = ClaimedLines::new(config.path_width);

    for _ in 0..config.attempts {
        let Some((rect, factor)) = candidate(config, rng) else {
            continue;
        };

        if rooms.iter().any(|room| room.intersects(&rect)) {
            continue;
        }
        if !claimed.is_clear(&rect) {
            continue;
        }

        let Ok(room) = Room::new(rect.origin(), factor, config.units) else {
            continue;
        };
        claimed.claim(&rect);
        rooms.push(room);
    }

    debug!(
        "Placed {} rooms in {} attempts on a {}x{} canvas",
        rooms.len(),
        config.attempts,
        config.canvas_width,
        config.canvas_height
    );
    rooms
}

/// Draws a center uniformly so that the largest possible room stays on
/// the canvas, then a size factor, and builds the candidate rectangle
fn candidate<R: Rng + ?Sized>(config: &LayoutConfig, rng: &mut R) -> Option<(Rect, DimensionFactor)> {
    let max_width = config.max_width_factor * config.units.width;
    let max_height = config.max_height_factor * config.units.height;
    let span_x = (config.canvas_width - max_width).max(0);
    let span_y = (config.canvas_height - max_height).max(0);

    let cx = max_width / 2 + (f64::from(span_x) * rng.gen::<f64>()) as i32;
    let cy = max_height / 2 + (f64::from(span_y) * rng.gen::<f64>()) as i32;
    let center = Point::new(cx, cy).ok()?;
    let factor = random_factor(config, rng)?;

    let size = config.units.size_of(factor).ok()?;
    let left = center.x() - size.width() / 2;
    let top = center.y() - size.height() / 2;
    let rect = Rect::new(left, top, left + size.width(), top + size.height()).ok()?;

    if rect.right() > config.canvas_width || rect.bottom() > config.canvas_height {
        return None;
    }
    Some((rect, factor))
}

/// Width factor in `[1, max_width_factor]`, height factor in
/// `[1, max_height_factor]`, drawn independently
fn random_factor<R: Rng + ?Sized>(config: &LayoutConfig, rng: &mut R) -> Option<DimensionFactor> {
    let width = 1 + (f64::from(config.max_width_factor) * rng.gen::<f64>()).floor() as i32;
    let height = 1 + (f64::from(config.max_height_factor) * rng.gen::<f64>()).floor() as i32;
    DimensionFactor::new(width, height).ok()
}

/// Critical lines of accepted rooms, per axis
struct ClaimedLines {
    band: i32,
    xs: BTreeSet<i32>,
    ys: BTreeSet<i32>,
}

impl ClaimedLines {
    fn new(band: i32) -> Self {
        Self {
            band,
            xs: BTreeSet::new(),
            ys: BTreeSet::new(),
        }
    }

    /// True when every one of the candidate's six critical lines lies more
    /// than `band` away from every claimed line on the same axis
    fn is_clear(&self, rect: &Rect) -> bool {
        let clear = |claimed: &BTreeSet<i32>, line: i32| {
            claimed.range(line - self.band..=line + self.band).next().is_none()
        };
        critical_xs(rect).into_iter().all(|x| clear(&self.xs, x))
            && critical_ys(rect).into_iter().all(|y| clear(&self.ys, y))
    }

    fn claim(&mut self, rect: &Rect) {
        self.xs.extend(critical_xs(rect));
        self.ys.extend(critical_ys(rect));
    }
}

/// Left edge, center and right edge
fn critical_xs(rect: &Rect) -> [i32; 3] {
    [rect.left(), rect.cx(), rect.right()]
}

/// Top edge, center and bottom edge
fn critical_ys(rect: &Rect) -> [i32; 3] {
    [rect.top(), rect.cy(), rect.bottom()]
}
