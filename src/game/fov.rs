//! # Field of View
//!
//! Symmetric shadowcasting over the level grid. Each quadrant is scanned row by
//! row outward from the observer; rows carry a start and end slope kept as exact
//! fractions, so shadows never drift from floating point error.
//!
//! A floor tile is revealed only when its centre lies inside the lit sector,
//! which makes the result symmetric: for two non-wall tiles within range of each
//! other, A sees B exactly when B sees A. Walls are revealed whenever any part
//! of them is lit. Work is bounded by the scanned sector, not the level size.

use crate::{Level, Position};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Computes every tile visible from `origin` within a Euclidean `radius`.
///
/// Walls and out-of-bounds cells are opaque; doors and stairs are transparent.
/// The level is not modified.
///
/// # Examples
///
/// ```
/// use delve::{compute_visible, Level, Position, Tile};
///
/// let mut level = Level::new(0, 9, 9);
/// for y in 1..8 {
///     for x in 1..8 {
///         level.set_tile(Position::new(x, y), Tile::floor()).unwrap();
///     }
/// }
/// let visible = compute_visible(&level, Position::new(4, 4), 8);
/// assert!(visible.contains(&Position::new(1, 1)));
/// assert!(visible.contains(&Position::new(0, 4))); // bounding wall
/// ```
pub fn compute_visible(level: &Level, origin: Position, radius: u32) -> HashSet<Position> {
    let mut visible = HashSet::new();
    visible.insert(origin);

    // Sight never needs to reach past the level's diagonal
    let span = i64::from(level.width) + i64::from(level.height);
    let radius = i64::from(radius).min(span);
    let radius_squared = radius.saturating_mul(radius);

    for quadrant in Quadrant::ALL {
        let mut rows = vec![Row::first()];

        while let Some(mut row) = rows.pop() {
            if row.depth > radius {
                continue;
            }

            let mut previous_was_wall: Option<bool> = None;
            for col in row.min_col()..=row.max_col() {
                let pos = quadrant.transform(origin, row.depth, col);
                let is_wall = level.is_opaque(pos);

                if (is_wall || row.is_symmetric(col))
                    && row.depth * row.depth + col * col <= radius_squared
                {
                    visible.insert(pos);
                }

                match previous_was_wall {
                    Some(true) if !is_wall => row.start = Slope::of_tile(row.depth, col),
                    Some(false) if is_wall => {
                        let mut next = row.next();
                        next.end = Slope::of_tile(row.depth, col);
                        rows.push(next);
                    }
                    _ => {}
                }
                previous_was_wall = Some(is_wall);
            }

            if previous_was_wall == Some(false) {
                rows.push(row.next());
            }
        }
    }

    visible
}

#[derive(Debug, Clone, Copy)]
enum Quadrant {
    North,
    East,
    South,
    West,
}

impl Quadrant {
    const ALL: [Quadrant; 4] = [
        Quadrant::North,
        Quadrant::East,
        Quadrant::South,
        Quadrant::West,
    ];

    fn transform(self, origin: Position, depth: i64, col: i64) -> Position {
        let (depth, col) = (depth as i32, col as i32);
        match self {
            Quadrant::North => Position::new(origin.x + col, origin.y - depth),
            Quadrant::South => Position::new(origin.x + col, origin.y + depth),
            Quadrant::East => Position::new(origin.x + depth, origin.y + col),
            Quadrant::West => Position::new(origin.x - depth, origin.y + col),
        }
    }
}

/// Exact slope `num / den`, with `den > 0`.
#[derive(Debug, Clone, Copy)]
struct Slope {
    num: i64,
    den: i64,
}

impl Slope {
    const fn new(num: i64, den: i64) -> Self {
        Self { num, den }
    }

    /// Slope through the near-left corner of tile `(depth, col)`.
    fn of_tile(depth: i64, col: i64) -> Self {
        Self::new(2 * col - 1, 2 * depth)
    }
}

#[derive(Debug, Clone, Copy)]
struct Row {
    depth: i64,
    start: Slope,
    end: Slope,
}

impl Row {
    fn first() -> Self {
        Self {
            depth: 1,
            start: Slope::new(-1, 1),
            end: Slope::new(1, 1),
        }
    }

    /// `round_ties_up(depth * start)`
    fn min_col(&self) -> i64 {
        floor_div(2 * self.depth * self.start.num + self.start.den, 2 * self.start.den)
    }

    /// `round_ties_down(depth * end)`
    fn max_col(&self) -> i64 {
        ceil_div(2 * self.depth * self.end.num - self.end.den, 2 * self.end.den)
    }

    /// Whether the centre of `col` lies inside `[start, end]` at this depth.
    fn is_symmetric(&self, col: i64) -> bool {
        col * self.start.den >= self.depth * self.start.num
            && col * self.end.den <= self.depth * self.end.num
    }

    fn next(&self) -> Row {
        Row {
            depth: self.depth + 1,
            start: self.start,
            end: self.end,
        }
    }
}

fn floor_div(a: i64, b: i64) -> i64 {
    a.div_euclid(b)
}

fn ceil_div(a: i64, b: i64) -> i64 {
    -(-a).div_euclid(b)
}

/// Per-level record of what the player sees now and has ever seen.
///
/// `discovered` only grows until [`VisibilityMap::reset`] is called on a level
/// transition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisibilityMap {
    visible: HashSet<Position>,
    discovered: HashSet<Position>,
}

impl VisibilityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the visible set and folds it into the discovered set.
    ///
    /// Returns how many tiles were discovered for the first time.
    pub fn update(&mut self, visible: HashSet<Position>) -> usize {
        let before = self.discovered.len();
        self.discovered.extend(visible.iter().copied());
        self.visible = visible;
        self.discovered.len() - before
    }

    pub fn is_visible(&self, pos: Position) -> bool {
        self.visible.contains(&pos)
    }

    pub fn is_discovered(&self, pos: Position) -> bool {
        self.discovered.contains(&pos)
    }

    pub fn visible(&self) -> &HashSet<Position> {
        &self.visible
    }

    pub fn discovered(&self) -> &HashSet<Position> {
        &self.discovered
    }

    /// Forgets everything. Used when the player enters a new level.
    pub fn reset(&mut self) {
        self.visible.clear();
        self.discovered.clear();
    }
}
