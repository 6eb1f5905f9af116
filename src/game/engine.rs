//! # Turn Engine
//!
//! Advances the world one tick per player intent:
//!
//! `Idle -> PlayerInputResolved -> EnemyTurnsResolved -> VisibilityUpdated -> Idle`
//!
//! A tick either completes or leaves no trace. The engine keeps a copy of the
//! state and random stream from before the tick and restores both on any
//! error; a fatal error additionally halts the run.

use crate::generation::{generate_level, Biome, GenerationConfig};
use crate::utils::next_step_toward;
use crate::{
    compute_visible, new_entity_id, CombatResolver, DelveError, DelveResult, DifficultyTable,
    Direction, EntityId, EntityKind, EntityState, GameCompletionState, GameEvent, GameState,
    GameStatistics, ItemKind, Level, MessageImportance, MovementPolicy,
    PlayerIntent, Position, Quest, QuestTrigger, RandomStream, VisibilityMap,
};
use log::{debug, error, info, warn};
use rand::seq::SliceRandom;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Mana regenerated by spell casters each tick.
const CASTER_MANA_REGEN: u32 = 1;

/// Where the engine is within a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickPhase {
    Idle,
    PlayerInputResolved,
    EnemyTurnsResolved,
    VisibilityUpdated,
}

/// Result of one submitted intent.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Turn number after the tick
    pub turn: u64,
    pub events: Vec<GameEvent>,
    /// False when the intent was turned away and the world did not advance
    pub consumed_turn: bool,
    pub completion: GameCompletionState,
}

/// Read-only view of the world between ticks.
#[derive(Debug, Clone)]
pub struct WorldSnapshot<'a> {
    pub level: &'a Level,
    /// Live entities in spawn order
    pub entities: Vec<&'a EntityState>,
    pub player: Option<&'a EntityState>,
    pub visibility: &'a VisibilityMap,
    pub active_quests: Vec<&'a Quest>,
    pub statistics: &'a GameStatistics,
    pub turn: u64,
    pub depth: u32,
    pub completion: GameCompletionState,
}

/// Owns the game state and the run's random stream.
#[derive(Debug, Clone)]
pub struct TurnEngine {
    state: GameState,
    rng: RandomStream,
    generation: GenerationConfig,
    difficulty: DifficultyTable,
    resolver: CombatResolver,
    phase: TickPhase,
    last_events: Vec<GameEvent>,
}

impl TurnEngine {
    /// Starts a run: generates depth 0 and places the player at its start.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::{DifficultyTable, GenerationConfig, PlayerIntent, TurnEngine};
    ///
    /// let config = GenerationConfig::for_testing();
    /// let mut engine = TurnEngine::new(42, config, DifficultyTable::default()).unwrap();
    /// let report = engine.submit_player_intent(PlayerIntent::Wait).unwrap();
    /// assert_eq!(report.turn, 1);
    /// assert!(!engine.snapshot().visibility.visible().is_empty());
    /// ```
    pub fn new(
        seed: u64,
        generation: GenerationConfig,
        difficulty: DifficultyTable,
    ) -> DelveResult<Self> {
        let mut rng = RandomStream::new(seed);
        let config = GenerationConfig {
            depth: 0,
            ..generation.clone()
        };
        let level = generate_level(rng.next_u64(), &config)?;
        Self::with_stream(level, rng, generation, difficulty)
    }

    /// Starts a run on a prepared level.
    ///
    /// The level must pass connectivity validation. Its spawn points are
    /// populated and the player is placed at its start position.
    pub fn from_level(
        level: Level,
        seed: u64,
        generation: GenerationConfig,
        difficulty: DifficultyTable,
    ) -> DelveResult<Self> {
        Self::with_stream(level, RandomStream::new(seed), generation, difficulty)
    }

    fn with_stream(
        level: Level,
        mut rng: RandomStream,
        generation: GenerationConfig,
        difficulty: DifficultyTable,
    ) -> DelveResult<Self> {
        generation.validate()?;
        difficulty.validate()?;
        level.validate_connectivity()?;

        let mut state = GameState::new(level);
        let player = EntityState::player(
            new_entity_id(&mut rng),
            "Adventurer",
            state.level.start_position,
            &difficulty,
        );
        state.add_entity(player)?;
        state.spawn_from_level(&mut rng, &difficulty)?;

        let mut engine = Self {
            state,
            rng,
            generation,
            resolver: CombatResolver::from_table(&difficulty),
            difficulty,
            phase: TickPhase::Idle,
            last_events: Vec::new(),
        };

        let mut events = Vec::new();
        engine.enter_room_at(engine.state.level.start_position, &mut events)?;
        engine.update_visibility()?;

        info!(
            "Run started at depth {} ({}), {} entities",
            engine.state.depth,
            engine.state.level.biome.name(),
            engine.state.living_entities().count()
        );
        Ok(engine)
    }

    /// Applies one player intent and advances the world.
    ///
    /// Rejected moves return a report with `consumed_turn == false` and a
    /// `MoveRejected` event. Errors leave the engine exactly as it was before
    /// the call, except that a fatal error halts the run.
    pub fn submit_player_intent(&mut self, intent: PlayerIntent) -> DelveResult<TickReport> {
        if self.state.is_game_ended() {
            return Err(DelveError::InvalidAction(format!(
                "The run is over ({:?})",
                self.state.completion_state
            )));
        }

        let saved_state = self.state.clone();
        let saved_rng = self.rng.clone();

        match self.run_tick(intent) {
            Ok(report) => {
                self.last_events = report.events.clone();
                Ok(report)
            }
            Err(err) => {
                self.state = saved_state;
                self.rng = saved_rng;
                self.phase = TickPhase::Idle;

                if err.is_fatal() {
                    error!("Halting run after fatal error: {}", err);
                    self.state.completion_state = GameCompletionState::Halted;
                } else {
                    warn!("Rejected {} intent: {}", intent.label(), err);
                }
                Err(err)
            }
        }
    }

    /// Borrows a read-only view of the world.
    pub fn snapshot(&self) -> WorldSnapshot<'_> {
        WorldSnapshot {
            level: &self.state.level,
            entities: self.state.living_entities().collect(),
            player: self.state.get_player(),
            visibility: &self.state.visibility,
            active_quests: self.state.quests.active_quests().collect(),
            statistics: &self.state.statistics,
            turn: self.state.turn_number,
            depth: self.state.depth,
            completion: self.state.completion_state,
        }
    }

    /// Events emitted by the last successful tick.
    pub fn last_events(&self) -> &[GameEvent] {
        &self.last_events
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn phase(&self) -> TickPhase {
        self.phase
    }

    pub fn player_id(&self) -> Option<EntityId> {
        self.state.player_id
    }

    pub fn difficulty(&self) -> &DifficultyTable {
        &self.difficulty
    }

    /// Adds an entity to the current level between ticks.
    pub fn spawn_entity(&mut self, entity: EntityState) -> DelveResult<EntityId> {
        self.state.add_entity(entity)
    }

    /// Draws a fresh entity id from the run's stream.
    pub fn next_entity_id(&mut self) -> EntityId {
        new_entity_id(&mut self.rng)
    }

    fn run_tick(&mut self, intent: PlayerIntent) -> DelveResult<TickReport> {
        let mut events = Vec::new();
        let depth_before = self.state.depth;

        let consumed_turn = self.resolve_player_intent(intent, &mut events)?;
        self.phase = TickPhase::PlayerInputResolved;
        self.check_player_death(&mut events);

        // Enemies on a freshly entered level wait for the player's first move
        if consumed_turn && !self.state.is_game_ended() && self.state.depth == depth_before {
            self.run_enemy_turns(&mut events)?;
        }
        self.phase = TickPhase::EnemyTurnsResolved;

        self.update_visibility()?;
        self.phase = TickPhase::VisibilityUpdated;

        if consumed_turn {
            self.state.turn_number += 1;
        }
        self.state.record_events(&events);
        self.phase = TickPhase::Idle;

        debug!(
            "Turn {}: {} -> {} events",
            self.state.turn_number,
            intent.label(),
            events.len()
        );

        Ok(TickReport {
            turn: self.state.turn_number,
            events,
            consumed_turn,
            completion: self.state.completion_state,
        })
    }

    fn player(&self) -> DelveResult<&EntityState> {
        self.state
            .get_player()
            .ok_or_else(|| DelveError::InvalidState("No player in the game state".to_string()))
    }

    fn player_mut(&mut self) -> DelveResult<&mut EntityState> {
        self.state
            .get_player_mut()
            .ok_or_else(|| DelveError::InvalidState("No player in the game state".to_string()))
    }

    fn resolve_player_intent(
        &mut self,
        intent: PlayerIntent,
        events: &mut Vec<GameEvent>,
    ) -> DelveResult<bool> {
        match intent {
            PlayerIntent::Move(direction) => self.resolve_move(direction, events),
            PlayerIntent::UseItem(index) => {
                let player = self.player_mut()?;
                let entity_id = player.id;
                let effect = player.use_item(index)?;
                events.push(GameEvent::ItemUsed { entity_id, effect });
                Ok(true)
            }
            PlayerIntent::Interact => self.resolve_interact(events),
            PlayerIntent::Wait => Ok(true),
        }
    }

    fn resolve_move(
        &mut self,
        direction: Direction,
        events: &mut Vec<GameEvent>,
    ) -> DelveResult<bool> {
        let player = self.player()?;
        let player_id = player.id;
        let from = player.position;
        let target = from.step(direction);

        match self.state.check_step(target) {
            Ok(Some(defender)) => {
                self.resolve_combat(player_id, defender, events)?;
                return Ok(true);
            }
            Ok(None) => {}
            Err(DelveError::OutOfBoundsMove { target, reason }) => {
                debug!("Player move to {:?} rejected: {}", target, reason);
                events.push(GameEvent::MoveRejected { target, reason });
                return Ok(false);
            }
            Err(err) => return Err(err),
        }

        self.state.set_entity_position(player_id, target)?;
        events.push(GameEvent::EntityMoved {
            entity_id: player_id,
            from,
            to: target,
        });

        self.pick_up_items(target, events)?;
        self.enter_room_at(target, events)?;

        if target == self.state.level.descent_position {
            self.descend(events)?;
        }

        Ok(true)
    }

    fn resolve_interact(&mut self, events: &mut Vec<GameEvent>) -> DelveResult<bool> {
        let player_position = self.player()?.position;
        let npc_nearby = self.state.living_entities().any(|entity| {
            matches!(entity.kind, EntityKind::Npc(_))
                && entity.position.is_adjacent(player_position)
        });

        if npc_nearby {
            if self.state.quests.is_full() {
                events.push(GameEvent::message(
                    "You cannot take on more quests.",
                    MessageImportance::Normal,
                ));
                return Ok(false);
            }

            let quest = self.state.quests.generate_quest(
                self.state.depth,
                self.state.level.difficulty_tier,
                self.state.level.biome,
                &mut self.rng,
            );
            let name = quest.name.clone();
            let quest_id = self.state.quests.accept(quest)?;
            events.push(GameEvent::QuestAccepted { quest_id, name });
            return Ok(true);
        }

        if self.state.level.items_at(player_position).next().is_some() {
            self.pick_up_items(player_position, events)?;
            return Ok(true);
        }

        events.push(GameEvent::message(
            "There is nothing here.",
            MessageImportance::Low,
        ));
        Ok(false)
    }

    fn resolve_combat(
        &mut self,
        attacker: EntityId,
        defender: EntityId,
        events: &mut Vec<GameEvent>,
    ) -> DelveResult<()> {
        let resolver = &self.resolver;
        let rng = &mut self.rng;
        let outcome = self
            .state
            .with_pair(attacker, defender, |a, d| resolver.resolve_attack(a, d, rng))??;

        events.push(GameEvent::Combat(outcome.clone()));
        for level_up in &outcome.level_ups {
            events.push(GameEvent::LevelUp {
                entity_id: level_up.entity,
                new_level: level_up.new_level,
            });
        }

        if let Some(victim) = outcome.killed {
            let killer = if victim == attacker { defender } else { attacker };
            self.state.handle_death(victim);
            events.push(GameEvent::EntityDied {
                entity_id: victim,
                killer: Some(killer),
            });

            let killed_kind = self.state.entity(victim).and_then(EntityState::enemy_kind);
            if Some(killer) == self.state.player_id {
                if let Some(kind) = killed_kind {
                    self.apply_quest_trigger(QuestTrigger::EnemyKilled(kind), events)?;
                }
            }
        }

        Ok(())
    }

    fn pick_up_items(
        &mut self,
        position: Position,
        events: &mut Vec<GameEvent>,
    ) -> DelveResult<()> {
        let items = self.state.level.take_items_at(position);
        if items.is_empty() {
            return Ok(());
        }

        let mut collected_tags = Vec::new();
        {
            let player = self.player_mut()?;
            let entity_id = player.id;
            for item in items {
                match item.kind {
                    ItemKind::Gold { amount } => {
                        events.push(GameEvent::GoldCollected { entity_id, amount })
                    }
                    _ => events.push(GameEvent::ItemPickedUp {
                        entity_id,
                        item: item.clone(),
                    }),
                }
                if let Some(tag) = item.quest_tag() {
                    collected_tags.push(tag.to_string());
                }
                player.pick_up(item);
            }
        }

        for tag in collected_tags {
            self.apply_quest_trigger(QuestTrigger::ItemCollected(tag), events)?;
        }
        Ok(())
    }

    fn enter_room_at(
        &mut self,
        position: Position,
        events: &mut Vec<GameEvent>,
    ) -> DelveResult<()> {
        if let Some(room) = self.state.level.room_interior_at(position).map(|room| room.id) {
            let depth = self.state.depth;
            self.apply_quest_trigger(QuestTrigger::RoomEntered { depth, room }, events)?;
        }
        Ok(())
    }

    fn apply_quest_trigger(
        &mut self,
        trigger: QuestTrigger,
        events: &mut Vec<GameEvent>,
    ) -> DelveResult<()> {
        for update in self.state.quests.record(&trigger) {
            events.push(GameEvent::QuestProgressed {
                quest_id: update.quest_id,
                progress: update.progress,
                required: update.required,
            });

            let Some(reward) = update.completed_reward else {
                continue;
            };

            let curve = self.resolver.curve().clone();
            let player = self.player_mut()?;
            let entity_id = player.id;
            player.gold = player.gold.saturating_add(reward.gold);
            let levels = player.gain_xp(reward.xp, &curve);
            if let Some(item) = reward.item.clone() {
                player.pick_up(item);
            }

            for new_level in levels {
                events.push(GameEvent::LevelUp {
                    entity_id,
                    new_level,
                });
            }
            info!("Quest {} completed", update.quest_id);
            events.push(GameEvent::QuestCompleted {
                quest_id: update.quest_id,
                reward,
            });
        }
        Ok(())
    }

    /// Generates the next level and carries the player onto it.
    fn descend(&mut self, events: &mut Vec<GameEvent>) -> DelveResult<()> {
        let from_depth = self.state.depth;
        let to_depth = from_depth + 1;
        let tier = self.state.level.difficulty_tier + 1;
        let biome = self.state.level.biome.max(Biome::for_tier(tier));

        let config = GenerationConfig {
            depth: to_depth,
            difficulty_tier: tier,
            biome,
            ..self.generation.clone()
        };
        let level = generate_level(self.rng.next_u64(), &config)?;
        let start = level.start_position;

        self.state.enter_level(level)?;
        self.state.spawn_from_level(&mut self.rng, &self.difficulty)?;

        info!(
            "Descended from depth {} to {} ({}, tier {})",
            from_depth,
            to_depth,
            biome.name(),
            tier
        );
        events.push(GameEvent::LevelTransition {
            from_depth,
            to_depth,
            biome,
            difficulty_tier: tier,
        });

        self.apply_quest_trigger(QuestTrigger::DepthReached(to_depth), events)?;
        self.enter_room_at(start, events)?;
        Ok(())
    }

    fn run_enemy_turns(&mut self, events: &mut Vec<GameEvent>) -> DelveResult<()> {
        let player_id = self.player()?.id;
        let order: Vec<EntityId> = self.state.spawn_order().to_vec();

        for enemy_id in order {
            if !self.state.is_entity_alive(player_id) {
                break;
            }
            let Some(enemy) = self.state.entity(enemy_id) else {
                continue;
            };
            if !enemy.is_alive() || !enemy.is_hostile() {
                continue;
            }

            if enemy.capabilities.can_cast_spells {
                if let Some(enemy) = self.state.entity_mut(enemy_id) {
                    enemy.restore_mana(CASTER_MANA_REGEN);
                }
            }

            self.take_enemy_turn(enemy_id, player_id, events)?;
            self.check_player_death(events);
        }

        Ok(())
    }

    fn take_enemy_turn(
        &mut self,
        enemy_id: EntityId,
        player_id: EntityId,
        events: &mut Vec<GameEvent>,
    ) -> DelveResult<()> {
        let player_position = self.player()?.position;
        let (position, behavior) = match self.state.entity(enemy_id) {
            Some(enemy) => (enemy.position, enemy.behavior.unwrap_or_default()),
            None => return Ok(()),
        };

        if position.is_adjacent(player_position) {
            return self.resolve_combat(enemy_id, player_id, events);
        }

        let radius = i64::from(behavior.detection_radius);
        let detected = position.distance_squared(player_position) <= radius.saturating_mul(radius);

        let step = match behavior.movement {
            MovementPolicy::Stationary => None,
            MovementPolicy::Chase if detected => {
                let state = &self.state;
                next_step_toward(&state.level, position, player_position, |pos| {
                    state.is_occupied(pos)
                })
            }
            MovementPolicy::Chase | MovementPolicy::Wander => {
                if self.rng.chance(behavior.wander_chance) {
                    let candidates: Vec<Position> = position
                        .adjacent_positions()
                        .into_iter()
                        .filter(|pos| {
                            self.state.level.is_passable(*pos) && !self.state.is_occupied(*pos)
                        })
                        .collect();
                    candidates.choose(&mut self.rng).copied()
                } else {
                    None
                }
            }
        };

        let Some(step) = step else {
            return Ok(());
        };
        if self.state.is_occupied(step) {
            return Ok(());
        }

        self.state.set_entity_position(enemy_id, step)?;
        events.push(GameEvent::EntityMoved {
            entity_id: enemy_id,
            from: position,
            to: step,
        });

        if step.is_adjacent(player_position) {
            self.resolve_combat(enemy_id, player_id, events)?;
        }
        Ok(())
    }

    fn check_player_death(&mut self, events: &mut Vec<GameEvent>) {
        if self.state.completion_state != GameCompletionState::Playing {
            return;
        }
        let Some(player) = self.state.get_player() else {
            return;
        };
        if player.is_alive() {
            return;
        }

        let player_id = player.id;
        let killer = events.iter().rev().find_map(|event| match event {
            GameEvent::EntityDied {
                entity_id,
                killer,
            } if *entity_id == player_id => *killer,
            _ => None,
        });

        info!("Player died on depth {}", self.state.depth);
        self.state.completion_state = GameCompletionState::PlayerDied;
        events.push(GameEvent::PlayerDied { killer });
    }

    fn update_visibility(&mut self) -> DelveResult<()> {
        let origin = self.player()?.position;
        if !self.state.level.is_passable(origin) {
            return Err(DelveError::CorruptLevelState(format!(
                "Player stands on impassable tile {:?}",
                origin
            )));
        }

        let visible = compute_visible(&self.state.level, origin, self.difficulty.fov_radius);
        let newly = self.state.visibility.update(visible);
        if newly > 0 {
            debug!("Discovered {} tiles", newly);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        EnemyBehavior, EnemyKind, Item, MoveRejection, NpcKind, Room, RoomType, Tile, TileType,
    };

    /// A 12x7 room with the player start at (2, 3) and the descent at (9, 3).
    fn arena() -> Level {
        let mut level = Level::new(0, 12, 7);
        let room = Room::new(0, Position::new(0, 0), 12, 7, RoomType::Start);
        for pos in room.floor_positions() {
            level.set_tile(pos, Tile::floor()).unwrap();
        }
        level.start_position = Position::new(2, 3);
        level.descent_position = Position::new(9, 3);
        level
            .set_tile(level.descent_position, Tile::new(TileType::StairsDown))
            .unwrap();
        level.rooms.push(room);
        level
    }

    fn quiet_table() -> DifficultyTable {
        DifficultyTable::default()
    }

    fn engine_on(level: Level) -> TurnEngine {
        TurnEngine::from_level(level, 7, GenerationConfig::for_testing(), quiet_table()).unwrap()
    }

    fn goblin(engine: &mut TurnEngine, position: Position) -> EntityState {
        let id = engine.next_entity_id();
        EntityState::enemy(id, EnemyKind::Goblin, position, 1, engine.difficulty())
    }

    #[test]
    fn test_wait_advances_the_turn() {
        let mut engine = engine_on(arena());
        let report = engine.submit_player_intent(PlayerIntent::Wait).unwrap();
        assert!(report.consumed_turn);
        assert_eq!(report.turn, 1);
        assert_eq!(engine.phase(), TickPhase::Idle);
    }

    #[test]
    fn test_wall_move_is_rejected_without_consuming_the_turn() {
        let mut level = arena();
        level.start_position = Position::new(1, 1);
        let mut engine = engine_on(level);

        let report = engine
            .submit_player_intent(PlayerIntent::Move(Direction::North))
            .unwrap();
        assert!(!report.consumed_turn);
        assert_eq!(report.turn, 0);
        assert_eq!(
            report.events,
            vec![GameEvent::MoveRejected {
                target: Position::new(1, 0),
                reason: MoveRejection::Wall,
            }]
        );
    }

    #[test]
    fn test_moving_into_enemy_attacks_without_relocating() {
        let mut engine = engine_on(arena());
        let enemy = goblin(&mut engine, Position::new(3, 3)).with_health(200);
        let enemy_id = engine.spawn_entity(enemy).unwrap();

        let report = engine
            .submit_player_intent(PlayerIntent::Move(Direction::East))
            .unwrap();
        let snapshot = engine.snapshot();
        let player = snapshot.player.unwrap();

        assert_eq!(player.position, Position::new(2, 3));
        assert!(report.events.iter().any(|event| {
            matches!(event, GameEvent::Combat(outcome) if outcome.defender == enemy_id)
        }));
        assert!(engine.state().entity(enemy_id).unwrap().health < 200);
    }

    #[test]
    fn test_killing_an_enemy_awards_xp_and_frees_the_tile() {
        let mut engine = engine_on(arena());
        let enemy = goblin(&mut engine, Position::new(3, 3)).with_health(5);
        let enemy_id = engine.spawn_entity(enemy).unwrap();

        let report = engine
            .submit_player_intent(PlayerIntent::Move(Direction::East))
            .unwrap();

        assert!(report.events.contains(&GameEvent::EntityDied {
            entity_id: enemy_id,
            killer: engine.player_id(),
        }));
        assert_eq!(engine.snapshot().player.unwrap().xp, 20);
        assert!(!engine.state().is_occupied(Position::new(3, 3)));
        assert_eq!(engine.snapshot().statistics.enemies_defeated, 1);
    }

    #[test]
    fn test_npc_blocks_movement() {
        let mut engine = engine_on(arena());
        let id = engine.next_entity_id();
        let npc = EntityState::npc(id, NpcKind::QuestGiver, "Sage", Position::new(3, 3));
        engine.spawn_entity(npc).unwrap();

        let report = engine
            .submit_player_intent(PlayerIntent::Move(Direction::East))
            .unwrap();
        assert!(!report.consumed_turn);
        assert!(matches!(
            report.events[0],
            GameEvent::MoveRejected {
                reason: MoveRejection::Occupied { .. },
                ..
            }
        ));

        let report = engine.submit_player_intent(PlayerIntent::Interact).unwrap();
        assert!(matches!(report.events[0], GameEvent::QuestAccepted { .. }));
        assert_eq!(engine.snapshot().active_quests.len(), 1);
    }

    #[test]
    fn test_pickup_on_move() {
        let mut level = arena();
        level.place_item(Position::new(3, 3), Item::health_potion(50));
        level.place_item(Position::new(3, 3), Item::gold(12));
        let mut engine = engine_on(level);

        let report = engine
            .submit_player_intent(PlayerIntent::Move(Direction::East))
            .unwrap();
        let player = engine.snapshot().player.unwrap().clone();

        assert_eq!(player.inventory, vec![Item::health_potion(50)]);
        assert_eq!(player.gold, 10 + 12);
        assert!(report
            .events
            .iter()
            .any(|event| matches!(event, GameEvent::GoldCollected { amount: 12, .. })));
        assert!(engine.snapshot().level.floor_items.is_empty());
    }

    #[test]
    fn test_invalid_item_use_restores_state() {
        let mut engine = engine_on(arena());
        let enemy = goblin(&mut engine, Position::new(6, 3));
        engine.spawn_entity(enemy).unwrap();
        let before = engine.state().clone();

        let result = engine.submit_player_intent(PlayerIntent::UseItem(4));
        assert!(matches!(result, Err(DelveError::InvalidAction(_))));
        assert_eq!(engine.state().turn_number, before.turn_number);
        assert_eq!(
            engine.state().entities().cloned().collect::<Vec<_>>(),
            before.entities().cloned().collect::<Vec<_>>()
        );
        assert_eq!(engine.snapshot().completion, GameCompletionState::Playing);
    }

    #[test]
    fn test_chasing_enemy_closes_in() {
        let mut engine = engine_on(arena());
        let enemy = goblin(&mut engine, Position::new(7, 3)).with_health(500);
        let enemy_id = engine.spawn_entity(enemy).unwrap();

        engine.submit_player_intent(PlayerIntent::Wait).unwrap();
        let after_one = engine.state().get_entity_position(enemy_id).unwrap();
        assert_eq!(after_one.chebyshev_distance(Position::new(2, 3)), 4);

        for _ in 0..4 {
            engine.submit_player_intent(PlayerIntent::Wait).unwrap();
        }
        let adjacent = engine.state().get_entity_position(enemy_id).unwrap();
        assert!(adjacent.is_adjacent(Position::new(2, 3)));
        assert!(engine.snapshot().player.unwrap().health < 100);
    }

    #[test]
    fn test_player_death_ends_the_run() {
        let mut engine = engine_on(arena());
        let id = engine.next_entity_id();
        let brute = EntityState::new(
            id,
            EntityKind::Enemy(EnemyKind::Orc),
            "Brute",
            Position::new(3, 3),
        )
        .with_health(1000)
        .with_damage(500);
        engine.spawn_entity(brute).unwrap();

        let report = engine.submit_player_intent(PlayerIntent::Wait).unwrap();
        assert_eq!(report.completion, GameCompletionState::PlayerDied);
        assert!(report
            .events
            .contains(&GameEvent::PlayerDied { killer: Some(id) }));

        let rejected = engine.submit_player_intent(PlayerIntent::Wait);
        assert!(matches!(rejected, Err(DelveError::InvalidAction(_))));
    }

    #[test]
    fn test_descent_generates_next_level() {
        let mut level = arena();
        level.start_position = Position::new(8, 3);
        let mut engine = engine_on(level);
        let player_id = engine.player_id();

        let report = engine
            .submit_player_intent(PlayerIntent::Move(Direction::East))
            .unwrap();
        assert!(report.events.contains(&GameEvent::LevelTransition {
            from_depth: 0,
            to_depth: 1,
            biome: Biome::Cavern,
            difficulty_tier: 2,
        }));

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.depth, 1);
        assert_eq!(snapshot.level.difficulty_tier, 2);
        assert_eq!(snapshot.player.map(|p| p.id), player_id);
        assert_eq!(snapshot.player.unwrap().position, snapshot.level.start_position);
        assert!(snapshot.visibility.is_visible(snapshot.level.start_position));
    }

    #[test]
    fn test_caster_regenerates_mana() {
        let mut engine = engine_on(arena());
        let id = engine.next_entity_id();
        let mut elemental = EntityState::enemy(
            id,
            EnemyKind::MagmaElemental,
            Position::new(9, 5),
            1,
            engine.difficulty(),
        );
        elemental.mana = 10;
        engine.spawn_entity(elemental).unwrap();

        engine.submit_player_intent(PlayerIntent::Wait).unwrap();
        assert_eq!(engine.state().entity(id).unwrap().mana, 11);
    }

    #[test]
    fn test_stationary_enemy_holds_its_tile() {
        let mut engine = engine_on(arena());
        let id = engine.next_entity_id();
        let elemental = EntityState::enemy(
            id,
            EnemyKind::MagmaElemental,
            Position::new(5, 3),
            1,
            engine.difficulty(),
        );
        assert_eq!(elemental.behavior.unwrap().movement, MovementPolicy::Stationary);
        engine.spawn_entity(elemental).unwrap();

        // The player is within detection range but never adjacent
        for _ in 0..5 {
            let report = engine.submit_player_intent(PlayerIntent::Wait).unwrap();
            assert!(!report.events.iter().any(|event| {
                matches!(event, GameEvent::EntityMoved { entity_id, .. } if *entity_id == id)
            }));
        }
        assert_eq!(engine.state().entity(id).unwrap().position, Position::new(5, 3));
    }

    #[test]
    fn test_wanderer_ignores_the_player() {
        let mut engine = engine_on(arena());
        let idle = EnemyBehavior {
            detection_radius: 10,
            movement: MovementPolicy::Wander,
            wander_chance: 0.0,
        };

        let mut wanderer = goblin(&mut engine, Position::new(6, 3));
        wanderer.behavior = Some(idle);
        let wanderer_id = engine.spawn_entity(wanderer).unwrap();

        let mut chaser = goblin(&mut engine, Position::new(6, 5));
        chaser.behavior = Some(EnemyBehavior {
            movement: MovementPolicy::Chase,
            ..idle
        });
        let chaser_id = engine.spawn_entity(chaser).unwrap();

        engine.submit_player_intent(PlayerIntent::Wait).unwrap();

        let player = Position::new(2, 3);
        let chaser_at = engine.state().entity(chaser_id).unwrap().position;
        assert!(chaser_at.distance_squared(player) < Position::new(6, 5).distance_squared(player));
        assert_eq!(engine.state().entity(wanderer_id).unwrap().position, Position::new(6, 3));
    }
}
