//! # Game State Module
//!
//! The mutable world the turn engine advances: the current level, the entity
//! roster with its spatial index, visibility, quests and run statistics.
//!
//! The roster is keyed by id for lookup, but every ordered walk goes through
//! the spawn order so that a seed replays identically.

use crate::generation::SpawnKind;
use crate::{
    new_entity_id, DelveError, DelveResult, DifficultyTable, EntityId, EntityState, GameEvent,
    Level, MoveRejection, NpcKind, Position, QuestLedger, RandomStream, VisibilityMap,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Game statistics tracking player progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStatistics {
    /// Number of enemies the player defeated
    pub enemies_defeated: u32,
    /// Number of levels entered after the first
    pub levels_explored: u32,
    /// Number of items picked up
    pub items_collected: u32,
    /// Total damage dealt by the player
    pub damage_dealt: u64,
    /// Total damage taken by the player
    pub damage_taken: u64,
    /// Deepest level reached
    pub max_depth_reached: u32,
    /// Total steps taken by the player
    pub steps_taken: u64,
    /// Quests completed
    pub quests_completed: u32,
}

impl GameStatistics {
    /// Creates new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates statistics based on a game event.
    pub fn update_from_event(&mut self, event: &GameEvent, player_id: Option<EntityId>) {
        let is_player = |id: &EntityId| Some(*id) == player_id;

        match event {
            GameEvent::EntityMoved { entity_id, .. } if is_player(entity_id) => {
                self.steps_taken += 1;
            }
            GameEvent::Combat(outcome) => {
                if let Some(player) = player_id {
                    for strike in &outcome.strikes {
                        if strike.attacker == player {
                            self.damage_dealt += strike.damage as u64;
                        } else if strike.defender == player {
                            self.damage_taken += strike.damage as u64;
                        }
                    }
                }
            }
            GameEvent::EntityDied {
                killer: Some(killer),
                ..
            } if is_player(killer) => {
                self.enemies_defeated += 1;
            }
            GameEvent::ItemPickedUp { entity_id, .. } | GameEvent::GoldCollected { entity_id, .. }
                if is_player(entity_id) =>
            {
                self.items_collected += 1;
            }
            GameEvent::QuestCompleted { .. } => {
                self.quests_completed += 1;
            }
            GameEvent::LevelTransition { to_depth, .. } => {
                self.levels_explored += 1;
                self.max_depth_reached = self.max_depth_reached.max(*to_depth);
            }
            _ => {}
        }
    }
}

/// Whether the run can still accept intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameCompletionState {
    /// Game is still in progress
    Playing,
    /// The player died; further intents are rejected
    PlayerDied,
    /// A fatal error stopped the run
    Halted,
}

/// Central game state containing the level and everything on it.
#[derive(Debug, Clone)]
pub struct GameState {
    /// The level the player is on
    pub level: Level,
    /// Current depth, starting at 0
    pub depth: u32,
    entities: HashMap<EntityId, EntityState>,
    /// Entity ids in the order they were added
    spawn_order: Vec<EntityId>,
    /// Live blocking entity per tile
    position_index: HashMap<Position, EntityId>,
    /// The player entity ID
    pub player_id: Option<EntityId>,
    /// Completed ticks
    pub turn_number: u64,
    pub statistics: GameStatistics,
    pub completion_state: GameCompletionState,
    pub visibility: VisibilityMap,
    pub quests: QuestLedger,
}

impl GameState {
    /// Creates a state on `level` with an empty roster.
    pub fn new(level: Level) -> Self {
        let depth = level.id;
        Self {
            level,
            depth,
            entities: HashMap::new(),
            spawn_order: Vec::new(),
            position_index: HashMap::new(),
            player_id: None,
            turn_number: 0,
            statistics: GameStatistics {
                max_depth_reached: depth,
                ..GameStatistics::new()
            },
            completion_state: GameCompletionState::Playing,
            visibility: VisibilityMap::new(),
            quests: QuestLedger::new(),
        }
    }

    /// Adds an entity to the roster.
    ///
    /// The entity must stand on a passable tile not held by another live
    /// blocking entity.
    pub fn add_entity(&mut self, entity: EntityState) -> DelveResult<EntityId> {
        let entity_id = entity.id;
        let position = entity.position;

        if self.entities.contains_key(&entity_id) {
            return Err(DelveError::InvalidState(format!(
                "Entity {} already exists",
                entity_id
            )));
        }
        if !self.level.is_passable(position) {
            return Err(DelveError::InvalidState(format!(
                "Cannot place {} on impassable tile {:?}",
                entity.name, position
            )));
        }
        if entity.is_alive() && entity.blocks_movement() && self.is_occupied(position) {
            return Err(DelveError::InvalidState(format!(
                "Cannot place {} on occupied tile {:?}",
                entity.name, position
            )));
        }

        if entity.is_alive() && entity.blocks_movement() {
            self.position_index.insert(position, entity_id);
        }
        if entity.is_player() {
            self.player_id = Some(entity_id);
        }
        self.spawn_order.push(entity_id);
        self.entities.insert(entity_id, entity);

        Ok(entity_id)
    }

    /// Creates entities for every spawn point on the current level.
    ///
    /// Ids are drawn from `rng`, so the roster is reproducible.
    pub fn spawn_from_level(
        &mut self,
        rng: &mut RandomStream,
        table: &DifficultyTable,
    ) -> DelveResult<Vec<EntityId>> {
        let tier = self.level.difficulty_tier;
        let spawns = self.level.spawn_points.clone();

        spawns
            .into_iter()
            .map(|spawn| {
                let id = new_entity_id(rng);
                let entity = match spawn.kind {
                    SpawnKind::Enemy(kind) => {
                        EntityState::enemy(id, kind, spawn.position, tier, table)
                    }
                    SpawnKind::Npc(kind) => {
                        EntityState::npc(id, kind, npc_name(kind), spawn.position)
                    }
                };
                self.add_entity(entity)
            })
            .collect()
    }

    /// Replaces the level, dropping every entity except the player.
    ///
    /// The player is moved to the new level's start position and visibility
    /// is forgotten.
    pub fn enter_level(&mut self, level: Level) -> DelveResult<()> {
        let player = self
            .player_id
            .and_then(|id| self.entities.remove(&id))
            .ok_or_else(|| DelveError::InvalidState("No player to carry forward".to_string()))?;

        self.entities.clear();
        self.spawn_order.clear();
        self.position_index.clear();
        self.visibility.reset();

        self.depth = level.id;
        self.level = level;

        let mut player = player;
        player.position = self.level.start_position;
        self.add_entity(player)?;
        Ok(())
    }

    pub fn entity(&self, entity_id: EntityId) -> Option<&EntityState> {
        self.entities.get(&entity_id)
    }

    pub fn entity_mut(&mut self, entity_id: EntityId) -> Option<&mut EntityState> {
        self.entities.get_mut(&entity_id)
    }

    /// Entity ids in spawn order, dead ones included.
    pub fn spawn_order(&self) -> &[EntityId] {
        &self.spawn_order
    }

    /// All entities in spawn order.
    pub fn entities(&self) -> impl Iterator<Item = &EntityState> {
        self.spawn_order
            .iter()
            .filter_map(move |id| self.entities.get(id))
    }

    /// Live entities in spawn order.
    pub fn living_entities(&self) -> impl Iterator<Item = &EntityState> {
        self.entities().filter(|entity| entity.is_alive())
    }

    pub fn get_player(&self) -> Option<&EntityState> {
        self.player_id.and_then(|id| self.entities.get(&id))
    }

    pub fn get_player_mut(&mut self) -> Option<&mut EntityState> {
        self.player_id.and_then(|id| self.entities.get_mut(&id))
    }

    /// Checks if an entity exists.
    pub fn entity_exists(&self, entity_id: EntityId) -> bool {
        self.entities.contains_key(&entity_id)
    }

    /// Checks if an entity is alive.
    pub fn is_entity_alive(&self, entity_id: EntityId) -> bool {
        self.entities
            .get(&entity_id)
            .map(|entity| entity.is_alive())
            .unwrap_or(false)
    }

    /// Gets an entity's position.
    pub fn get_entity_position(&self, entity_id: EntityId) -> Option<Position> {
        self.entities.get(&entity_id).map(|entity| entity.position)
    }

    /// Gets the live blocking entity at a position.
    pub fn get_entity_at_position(&self, position: Position) -> Option<EntityId> {
        self.position_index.get(&position).copied()
    }

    /// Gets the live blocking entity at a position.
    pub fn blocker_at(&self, position: Position) -> Option<&EntityState> {
        self.get_entity_at_position(position)
            .and_then(|id| self.entities.get(&id))
    }

    /// Checks whether a mover may step onto `target`.
    ///
    /// Returns the hostile entity standing there, if any, so the step can turn
    /// into an attack. Walls, the level edge and friendly blockers are refused
    /// with [`DelveError::OutOfBoundsMove`].
    pub fn check_step(&self, target: Position) -> DelveResult<Option<EntityId>> {
        let reason = if !self.level.is_valid_position(target) {
            MoveRejection::OutOfBounds
        } else if !self.level.is_passable(target) {
            MoveRejection::Wall
        } else {
            match self.blocker_at(target) {
                Some(blocker) if blocker.is_hostile() => return Ok(Some(blocker.id)),
                Some(blocker) => MoveRejection::Occupied {
                    name: blocker.name.clone(),
                },
                None => return Ok(None),
            }
        };

        Err(DelveError::OutOfBoundsMove { target, reason })
    }

    pub fn is_occupied(&self, position: Position) -> bool {
        self.position_index.contains_key(&position)
    }

    /// Moves an entity, keeping the spatial index in step.
    pub fn set_entity_position(
        &mut self,
        entity_id: EntityId,
        new_position: Position,
    ) -> DelveResult<()> {
        let old_position = self
            .get_entity_position(entity_id)
            .ok_or_else(|| DelveError::InvalidState(format!("Entity {} not found", entity_id)))?;

        if !self.level.is_passable(new_position) {
            return Err(DelveError::InvalidState(format!(
                "Entity {} cannot stand on {:?}",
                entity_id, new_position
            )));
        }
        if let Some(other) = self.get_entity_at_position(new_position) {
            if other != entity_id {
                return Err(DelveError::InvalidState(format!(
                    "Tile {:?} is held by {}",
                    new_position, other
                )));
            }
        }

        if self.position_index.get(&old_position) == Some(&entity_id) {
            self.position_index.remove(&old_position);
        }
        if let Some(entity) = self.entities.get_mut(&entity_id) {
            entity.position = new_position;
            if entity.is_alive() && entity.blocks_movement() {
                self.position_index.insert(new_position, entity_id);
            }
        }

        Ok(())
    }

    /// Runs `f` with mutable access to two distinct entities.
    pub fn with_pair<R>(
        &mut self,
        first: EntityId,
        second: EntityId,
        f: impl FnOnce(&mut EntityState, &mut EntityState) -> R,
    ) -> DelveResult<R> {
        if first == second {
            return Err(DelveError::InvalidCombatState(format!(
                "Entity {} cannot pair with itself",
                first
            )));
        }

        let mut taken = self
            .entities
            .remove(&first)
            .ok_or_else(|| DelveError::InvalidState(format!("Entity {} not found", first)))?;
        let result = match self.entities.get_mut(&second) {
            Some(other) => Ok(f(&mut taken, other)),
            None => Err(DelveError::InvalidState(format!(
                "Entity {} not found",
                second
            ))),
        };
        self.entities.insert(first, taken);
        result
    }

    /// Clears a dead entity's tile. The entity stays in the roster.
    pub fn handle_death(&mut self, entity_id: EntityId) {
        if let Some(position) = self.get_entity_position(entity_id) {
            if self.position_index.get(&position) == Some(&entity_id) {
                self.position_index.remove(&position);
            }
        }
    }

    /// Folds a tick's events into the statistics.
    pub fn record_events(&mut self, events: &[GameEvent]) {
        for event in events {
            self.statistics.update_from_event(event, self.player_id);
        }
    }

    pub fn is_game_ended(&self) -> bool {
        self.completion_state != GameCompletionState::Playing
    }
}

fn npc_name(kind: NpcKind) -> &'static str {
    match kind {
        NpcKind::QuestGiver => "Wandering Sage",
    }
}
