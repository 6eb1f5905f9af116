//! # Autopilot Module
//!
//! Debug driver that plays the player: it walks toward the descent tile,
//! fights whatever stands adjacent or in the way, drinks a potion when
//! badly hurt and equips better gear it has picked up.

use crate::utils::{direction_between, find_path};
use crate::{
    DelveError, DelveResult, EntityState, ItemKind, PlayerIntent, Position, WorldSnapshot,
};

/// Health fraction below which the autopilot reaches for a potion.
const HEAL_THRESHOLD: f64 = 0.35;

/// Autopilot state. Disabled until toggled on.
#[derive(Debug, Clone, Default)]
pub struct Autopilot {
    /// Whether the autopilot is currently choosing intents
    pub enabled: bool,
    /// Remaining steps toward the target, excluding the player's tile
    pub current_path: Vec<Position>,
    /// Current target position
    pub target: Option<Position>,
}

impl Autopilot {
    pub fn new() -> Self {
        Self::default()
    }

    /// An autopilot that is already switched on.
    pub fn engaged() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    /// Toggles the autopilot on/off, forgetting any planned path.
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        if !self.enabled {
            self.current_path.clear();
            self.target = None;
        }
        self.enabled
    }

    /// Picks the next intent, or `None` when disabled or the player is dead.
    pub fn next_intent(
        &mut self,
        snapshot: &WorldSnapshot<'_>,
    ) -> DelveResult<Option<PlayerIntent>> {
        if !self.enabled {
            return Ok(None);
        }

        let player = snapshot
            .player
            .ok_or_else(|| DelveError::InvalidState("No player found".to_string()))?;
        if !player.is_alive() {
            return Ok(None);
        }
        let position = player.position;

        if let Some(index) = Self::item_worth_using(player) {
            return Ok(Some(PlayerIntent::UseItem(index)));
        }

        if let Some(enemy) = snapshot
            .entities
            .iter()
            .find(|entity| entity.is_hostile() && entity.position.is_adjacent(position))
        {
            return Ok(Self::step(position, enemy.position));
        }

        let goal = snapshot.level.descent_position;
        let path_is_stale = self.target != Some(goal)
            || self
                .current_path
                .first()
                .map_or(true, |next| !next.is_adjacent(position));
        if path_is_stale {
            self.plan(snapshot, position, goal, false);
        }

        let Some(&next) = self.current_path.first() else {
            return Ok(Some(PlayerIntent::Wait));
        };

        match snapshot.entities.iter().find(|entity| entity.position == next) {
            Some(occupant) if occupant.is_hostile() => Ok(Self::step(position, next)),
            Some(_) => {
                // Route around friendly blockers
                self.plan(snapshot, position, goal, true);
                match self.current_path.first().copied() {
                    Some(detour) => {
                        self.current_path.remove(0);
                        Ok(Self::step(position, detour))
                    }
                    None => Ok(Some(PlayerIntent::Wait)),
                }
            }
            None => {
                self.current_path.remove(0);
                Ok(Self::step(position, next))
            }
        }
    }

    fn plan(
        &mut self,
        snapshot: &WorldSnapshot<'_>,
        from: Position,
        goal: Position,
        avoid_entities: bool,
    ) {
        let occupied = |pos: Position| {
            avoid_entities && snapshot.entities.iter().any(|entity| entity.position == pos)
        };
        self.current_path = find_path(snapshot.level, from, goal, occupied)
            .map(|path| path.into_iter().skip(1).collect())
            .unwrap_or_default();
        self.target = Some(goal);
    }

    fn step(from: Position, to: Position) -> Option<PlayerIntent> {
        Some(direction_between(from, to).map_or(PlayerIntent::Wait, PlayerIntent::Move))
    }

    /// A potion when badly hurt, or gear better than what is equipped.
    fn item_worth_using(player: &EntityState) -> Option<usize> {
        let hurt = (player.health as f64) < player.max_health as f64 * HEAL_THRESHOLD;

        player
            .inventory
            .iter()
            .position(|item| match item.kind {
                ItemKind::Potion { .. } => hurt,
                ItemKind::Weapon { damage_bonus } => damage_bonus > player.weapon_bonus(),
                ItemKind::Armor { defense_bonus } => defense_bonus > player.armor_bonus(),
                _ => false,
            })
    }
}
