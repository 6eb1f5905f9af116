//! # Events Module
//!
//! Per-tick notifications emitted by the turn engine for the presentation
//! layer to render or play.

use crate::{
    Biome, CombatOutcome, EntityId, Item, ItemUse, MoveRejection, Position, QuestId, Reward,
};
use serde::{Deserialize, Serialize};

/// Importance levels for free-form messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MessageImportance {
    Low,
    Normal,
    High,
    Critical,
}

/// Something that happened during a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    EntityMoved {
        entity_id: EntityId,
        from: Position,
        to: Position,
    },
    /// A move was refused; the turn was not consumed
    MoveRejected {
        target: Position,
        reason: MoveRejection,
    },
    Combat(CombatOutcome),
    EntityDied {
        entity_id: EntityId,
        killer: Option<EntityId>,
    },
    LevelUp {
        entity_id: EntityId,
        new_level: u32,
    },
    ItemPickedUp {
        entity_id: EntityId,
        item: Item,
    },
    GoldCollected {
        entity_id: EntityId,
        amount: u32,
    },
    ItemUsed {
        entity_id: EntityId,
        effect: ItemUse,
    },
    QuestAccepted {
        quest_id: QuestId,
        name: String,
    },
    QuestProgressed {
        quest_id: QuestId,
        progress: u32,
        required: u32,
    },
    QuestCompleted {
        quest_id: QuestId,
        reward: Reward,
    },
    LevelTransition {
        from_depth: u32,
        to_depth: u32,
        biome: Biome,
        difficulty_tier: u32,
    },
    PlayerDied {
        killer: Option<EntityId>,
    },
    Message {
        text: String,
        importance: MessageImportance,
    },
}

impl GameEvent {
    pub fn message(text: impl Into<String>, importance: MessageImportance) -> Self {
        GameEvent::Message {
            text: text.into(),
            importance,
        }
    }
}
