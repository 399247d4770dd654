//! Spanning corridors between rooms.
//!
//! Grows a tree from the first room, Prim style: on every round the closest
//! (connected, unconnected) pair of room centers is joined, until every room
//! is in the tree. Distances are integer-truncated Euclidean and ties go to
//! the pair found first in iteration order.

use crate::match_gen::GenerationError;
use log::warn;
use shared::{distance, Path, Room};

/// Tree edges as `(connected room, newly connected room)` index pairs,
/// in the order they were added
pub fn spanning_edges(rooms: &[Room]) -> Result<Vec<(usize, usize)>, GenerationError> {
    if rooms.is_empty() {
        return Err(GenerationError::TooFewRooms {
            generated: 0,
            required: 1,
        });
    }

    let mut tree = vec![0];
    let mut done = vec![false; rooms.len()];
    done[0] = true;
    let mut edges = Vec::with_capacity(rooms.len() - 1);

    while tree.len() < rooms.len() {
        let mut best: Option<(usize, usize)> = None;
        let mut min_distance = i32::MAX;

        for &a in &tree {
            let p1 = rooms[a].center();

            for (b, room) in rooms.iter().enumerate() {
                if done[b] {
                    continue;
                }
                let d = distance(p1, room.center());
                if d < min_distance {
                    min_distance = d;
                    best = Some((a, b));
                }
            }
        }

        let Some((a, b)) = best else {
            warn!(
                "No pair left to connect with {} of {} rooms in the tree",
                tree.len(),
                rooms.len()
            );
            break;
        };
        tree.push(b);
        done[b] = true;
        edges.push((a, b));
    }

    Ok(edges)
}

/// One L-shaped path per tree edge; `rooms.len() - 1` paths in total
pub fn build_paths(rooms: &[Room]) -> Result<Vec<Path>, GenerationError> {
    spanning_edges(rooms)?
        .into_iter()
        .map(|(a, b)| rooms[a].path_to(&rooms[b]).map_err(GenerationError::from))
        .collect()
}
