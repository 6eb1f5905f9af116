//! # Delve
//!
//! The simulation core of a roguelike dungeon crawler: the part that decides what
//! the world *is* and how it *changes*, independent of how it is drawn or played.
//!
//! ## Architecture Overview
//!
//! - **Generation**: room-and-corridor dungeon layouts with guaranteed connectivity,
//!   biome tagging and spawn placement
//! - **Field of View**: symmetric shadowcasting over the generated tile grid
//! - **Entities and Combat**: one stat record shared by players, enemies and NPCs,
//!   and a deterministic attack/counter-attack resolver with cascading level-ups
//! - **Turn Engine**: per-tick orchestration of movement, AI, combat, visibility
//!   and quest bookkeeping, exposing read-only snapshots between ticks
//!
//! Randomness is never global. Every operation that needs it takes an explicit
//! [`RandomStream`], so a seed fully determines a run.

pub mod game;
pub mod generation;
pub mod utils;

// Core module re-exports
pub use game::*;
pub use generation::*;
pub use utils::*;

// Explicit re-exports for commonly used types
pub use game::{
    CombatOutcome, CombatResolver, Direction, EntityId, EntityKind, EntityState, GameEvent,
    GameState, Item, ItemKind, Level, PlayerIntent, Position, Quest, QuestLedger, Tile, TileType,
    TurnEngine, VisibilityMap, WorldSnapshot,
};

pub use generation::{
    generate_level, Biome, GenerationConfig, Generator, Room, RoomCorridorGenerator, RoomType,
    SpawnKind, SpawnPoint,
};

/// Core error type for the Delve simulation core.
#[derive(thiserror::Error, Debug)]
pub enum DelveError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A configuration value is outside its recognised domain
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Room placement ran out of attempts. Recovered inside the generator.
    #[error("Generation exhausted after {attempts} layout attempts")]
    GenerationExhausted { attempts: u32 },

    /// Combat was requested between entities that cannot fight
    #[error("Invalid combat state: {0}")]
    InvalidCombatState(String),

    /// A move targeted a tile the mover cannot enter
    #[error("Move to {target:?} rejected: {reason}")]
    OutOfBoundsMove {
        target: Position,
        reason: game::MoveRejection,
    },

    /// A level invariant was found violated at runtime
    #[error("Corrupt level state: {0}")]
    CorruptLevelState(String),

    /// Game state is invalid
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// Action cannot be performed
    #[error("Invalid action: {0}")]
    InvalidAction(String),
}

impl DelveError {
    /// Returns true for errors that must halt the run rather than abort one tick.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DelveError::CorruptLevelState(_))
    }
}

/// Result type used throughout the Delve codebase.
pub type DelveResult<T> = Result<T, DelveError>;

/// Version information for the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation configuration constants.
pub mod config {
    /// Default dungeon width in tiles
    pub const DEFAULT_DUNGEON_WIDTH: u32 = 60;

    /// Default dungeon height in tiles
    pub const DEFAULT_DUNGEON_HEIGHT: u32 = 40;

    /// Default player sight radius in tiles
    pub const DEFAULT_FOV_RADIUS: u32 = 8;

    /// Upper bound for sight and detection radii in difficulty tables
    pub const MAX_SIGHT_RADIUS: u32 = 1024;

    /// Maximum number of quests that can be active at once
    pub const MAX_ACTIVE_QUESTS: usize = 3;

    /// Every n-th difficulty tier hides an artifact quest item
    pub const ARTIFACT_TIER_INTERVAL: u32 = 5;
}
