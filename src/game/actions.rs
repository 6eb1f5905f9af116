//! # Actions Module
//!
//! Player intents accepted by the turn engine, and the reasons a move can be
//! turned away.

use crate::Direction;
use serde::{Deserialize, Serialize};

/// The single mutation entry point handed to [`crate::TurnEngine`] once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerIntent {
    /// Step one tile; stepping into a live enemy attacks it instead
    Move(Direction),
    /// Use the inventory item at this index
    UseItem(usize),
    /// Talk to an adjacent NPC, or pick up what lies underfoot
    Interact,
    /// Let the world take a turn without acting
    Wait,
}

impl PlayerIntent {
    /// Short label used in log lines.
    pub fn label(&self) -> &'static str {
        match self {
            PlayerIntent::Move(_) => "move",
            PlayerIntent::UseItem(_) => "use_item",
            PlayerIntent::Interact => "interact",
            PlayerIntent::Wait => "wait",
        }
    }
}

/// Why a move was refused. Reported to the caller as a no-op, never a crash.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveRejection {
    #[error("target is outside the level")]
    OutOfBounds,

    #[error("target is a wall")]
    Wall,

    #[error("target is occupied by {name}")]
    Occupied { name: String },
}
