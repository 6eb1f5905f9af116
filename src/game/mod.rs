//! # Game Module
//!
//! Core simulation state: world geometry, entities, combat, visibility, quests
//! and the turn engine that ties them together.
//!
//! This module contains the fundamental building blocks of the simulation:
//! - Level representation and tile-level invariants
//! - The shared entity stat model and combat resolution
//! - Field of view and discovered-tile tracking
//! - Per-tick orchestration through [`TurnEngine`]

pub mod actions;
pub mod autopilot;
pub mod combat;
pub mod difficulty;
pub mod engine;
pub mod entities;
pub mod events;
pub mod fov;
pub mod items;
pub mod quests;
pub mod state;
pub mod world;

pub use actions::*;
pub use autopilot::*;
pub use combat::*;
pub use difficulty::*;
pub use engine::*;
pub use entities::*;
pub use events::*;
pub use fov::*;
pub use items::*;
pub use quests::*;
pub use state::*;
pub use world::*;

use crate::RandomStream;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tile coordinate. `x` grows east, `y` grows south.
///
/// # Examples
///
/// ```
/// use delve::{Direction, Position};
///
/// let here = Position::new(4, 7);
/// assert_eq!(here.step(Direction::North), Position::new(4, 6));
/// assert_eq!(here.adjacent_positions().len(), 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const fn origin() -> Self {
        Self::new(0, 0)
    }

    /// Taxicab distance.
    ///
    /// ```
    /// use delve::Position;
    ///
    /// assert_eq!(Position::new(1, 1).manhattan_distance(Position::new(4, -3)), 7);
    /// ```
    pub fn manhattan_distance(self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// King-move distance. Combatants must be exactly 1 apart.
    pub fn chebyshev_distance(self, other: Position) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Squared Euclidean distance, exact in integers.
    pub fn distance_squared(self, other: Position) -> i64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        dx * dx + dy * dy
    }

    pub fn euclidean_distance(self, other: Position) -> f64 {
        (self.distance_squared(other) as f64).sqrt()
    }

    pub fn is_adjacent(self, other: Position) -> bool {
        self.chebyshev_distance(other) == 1
    }

    /// The 8 surrounding tiles, row by row from the north-west corner.
    pub fn adjacent_positions(self) -> Vec<Position> {
        Direction::NEIGHBOURS
            .iter()
            .map(|&direction| self.step(direction))
            .collect()
    }

    /// The 4 orthogonal neighbours.
    pub fn cardinal_adjacent_positions(self) -> Vec<Position> {
        Direction::cardinal()
            .into_iter()
            .map(|direction| self.step(direction))
            .collect()
    }

    pub fn step(self, direction: Direction) -> Position {
        self + direction.to_delta()
    }
}

impl std::ops::Add for Position {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Position {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// One of the 8 king-move steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
    Northeast,
    Northwest,
    Southeast,
    Southwest,
}

impl Direction {
    /// Scan order used for neighbour lists; fixed so searches stay deterministic.
    const NEIGHBOURS: [Direction; 8] = [
        Direction::Northwest,
        Direction::North,
        Direction::Northeast,
        Direction::West,
        Direction::East,
        Direction::Southwest,
        Direction::South,
        Direction::Southeast,
    ];

    /// Unit offset of one step in this direction.
    ///
    /// ```
    /// use delve::{Direction, Position};
    ///
    /// assert_eq!(Direction::Southwest.to_delta(), Position::new(-1, 1));
    /// ```
    pub fn to_delta(self) -> Position {
        let (dx, dy) = match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
            Direction::Northeast => (1, -1),
            Direction::Northwest => (-1, -1),
            Direction::Southeast => (1, 1),
            Direction::Southwest => (-1, 1),
        };
        Position::new(dx, dy)
    }

    /// Inverse of [`Direction::to_delta`]; `None` for anything but a unit step.
    pub fn from_delta(delta: Position) -> Option<Direction> {
        Self::NEIGHBOURS
            .into_iter()
            .find(|direction| direction.to_delta() == delta)
    }

    pub fn all() -> Vec<Direction> {
        Self::NEIGHBOURS.to_vec()
    }

    pub fn cardinal() -> Vec<Direction> {
        vec![
            Direction::North,
            Direction::West,
            Direction::East,
            Direction::South,
        ]
    }
}

/// Unique identifier for game entities.
pub type EntityId = Uuid;

/// Creates a new entity ID drawn from the random stream.
///
/// IDs come from the run's stream rather than the OS so that a seed
/// reproduces the same roster.
pub fn new_entity_id(rng: &mut RandomStream) -> EntityId {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    uuid::Builder::from_random_bytes(bytes).into_uuid()
}
