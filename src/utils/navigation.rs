//! # Grid Navigation
//!
//! Path search and reachability over a level's tile grid, built on the
//! `pathfinding` crate.

use crate::{Direction, Level, Position};
use ::pathfinding::prelude::{astar, bfs_reach};
use std::collections::HashSet;

/// Finds a shortest 8-connected path from `start` to `goal`.
///
/// The returned path includes both endpoints. Tiles for which `is_blocked`
/// returns true are avoided, except the goal itself (which is typically
/// occupied by the entity being approached).
pub fn find_path<F>(
    level: &Level,
    start: Position,
    goal: Position,
    is_blocked: F,
) -> Option<Vec<Position>>
where
    F: Fn(Position) -> bool,
{
    if !level.is_passable(goal) {
        return None;
    }

    astar(
        &start,
        |&pos| {
            pos.adjacent_positions()
                .into_iter()
                .filter(|&next| level.is_passable(next) && (next == goal || !is_blocked(next)))
                .map(|next| (next, 1u32))
                .collect::<Vec<_>>()
        },
        |&pos| pos.chebyshev_distance(goal),
        |&pos| pos == goal,
    )
    .map(|(path, _cost)| path)
}

/// Returns the first step from `start` toward `goal`, if any path exists.
pub fn next_step_toward<F>(
    level: &Level,
    start: Position,
    goal: Position,
    is_blocked: F,
) -> Option<Position>
where
    F: Fn(Position) -> bool,
{
    find_path(level, start, goal, is_blocked).and_then(|path| path.get(1).copied())
}

/// Returns the direction of a single step between two adjacent positions.
pub fn direction_between(from: Position, to: Position) -> Option<Direction> {
    Direction::from_delta(to - from)
}

/// Flood-fills passable tiles 4-connected to `start`.
///
/// Cardinal connectivity is stricter than movement (which allows diagonals),
/// so a level that passes this check is traversable in every movement model.
pub fn reachable_from(level: &Level, start: Position) -> HashSet<Position> {
    if !level.is_passable(start) {
        return HashSet::new();
    }

    bfs_reach(start, |&pos| {
        pos.cardinal_adjacent_positions()
            .into_iter()
            .filter(|&next| level.is_passable(next))
            .collect::<Vec<_>>()
    })
    .collect()
}
