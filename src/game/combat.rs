//! # Combat Module
//!
//! Resolution of one attack exchange: the strike, an optional counter-attack,
//! death, rewards and cascading level-ups.
//!
//! Damage per strike is `max(1, attack_power - total_defense)`, where attack
//! power is base damage plus weapon bonus and total defense is base defense
//! plus armor bonus. Critical hits are off unless [`CombatRules`] enable them.

use crate::{
    CombatRules, DelveError, DelveResult, DifficultyTable, EntityId, EntityState, LevelCurve,
    RandomStream,
};
use log::debug;
use serde::{Deserialize, Serialize};

/// One blow landed by one entity on another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strike {
    pub attacker: EntityId,
    pub defender: EntityId,
    pub damage: u32,
    pub critical: bool,
    /// Defender health after the blow
    pub remaining_health: u32,
}

/// A level reached during resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUp {
    pub entity: EntityId,
    pub new_level: u32,
}

/// Everything that happened in one exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatOutcome {
    pub attacker: EntityId,
    pub defender: EntityId,
    /// The initial strike, then the counter-attack if there was one
    pub strikes: Vec<Strike>,
    /// Entity killed in this exchange, if any
    pub killed: Option<EntityId>,
    /// XP paid to the killer
    pub xp_awarded: u32,
    /// Gold looted by the killer
    pub gold_awarded: u32,
    pub level_ups: Vec<LevelUp>,
}

impl CombatOutcome {
    /// Total damage dealt by `entity` in this exchange.
    pub fn damage_dealt_by(&self, entity: EntityId) -> u32 {
        self.strikes
            .iter()
            .filter(|strike| strike.attacker == entity)
            .map(|strike| strike.damage)
            .sum()
    }

    /// Whether the defender struck back.
    pub fn was_countered(&self) -> bool {
        self.strikes.len() > 1
    }
}

/// Stateless attack resolver, parameterised by combat rules and the XP curve.
#[derive(Debug, Clone, Default)]
pub struct CombatResolver {
    rules: CombatRules,
    curve: LevelCurve,
}

impl CombatResolver {
    pub fn new(rules: CombatRules, curve: LevelCurve) -> Self {
        Self { rules, curve }
    }

    pub fn from_table(table: &DifficultyTable) -> Self {
        Self::new(table.combat.clone(), table.progression.clone())
    }

    pub fn rules(&self) -> &CombatRules {
        &self.rules
    }

    pub fn curve(&self) -> &LevelCurve {
        &self.curve
    }

    /// Damage `attacker` deals to `defender` before any critical multiplier.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::{CombatResolver, EntityKind, EntityState, Item, Position};
    /// use uuid::Uuid;
    ///
    /// let hero = EntityState::new(Uuid::nil(), EntityKind::Player, "Hero", Position::new(0, 0))
    ///     .with_damage(10)
    ///     .with_weapon(Item::weapon("Iron Sword", 2));
    /// let rat = EntityState::new(Uuid::nil(), EntityKind::Player, "Rat", Position::new(1, 0))
    ///     .with_defense(3);
    /// assert_eq!(CombatResolver::effective_damage(&hero, &rat), 9);
    /// assert_eq!(CombatResolver::effective_damage(&rat, &hero), 1);
    /// ```
    pub fn effective_damage(attacker: &EntityState, defender: &EntityState) -> u32 {
        attacker
            .attack_power()
            .saturating_sub(defender.total_defense())
            .max(1)
    }

    /// Resolves `attacker` striking `defender`, with a counter-attack if the
    /// defender survives.
    ///
    /// Fails with `InvalidCombatState` when either side is dead, when both
    /// sides are the same entity, or when they are not adjacent. On failure
    /// neither entity is touched and no randomness is consumed.
    pub fn resolve_attack(
        &self,
        attacker: &mut EntityState,
        defender: &mut EntityState,
        rng: &mut RandomStream,
    ) -> DelveResult<CombatOutcome> {
        Self::check_participants(attacker, defender)?;

        let mut outcome = CombatOutcome {
            attacker: attacker.id,
            defender: defender.id,
            strikes: Vec::with_capacity(2),
            killed: None,
            xp_awarded: 0,
            gold_awarded: 0,
            level_ups: Vec::new(),
        };

        let strike = self.strike(attacker, defender, rng);
        outcome.strikes.push(strike);

        if defender.is_alive() {
            let counter = self.strike(defender, attacker, rng);
            outcome.strikes.push(counter);
            if !attacker.is_alive() {
                self.settle_kill(defender, attacker, &mut outcome);
            }
        } else {
            self.settle_kill(attacker, defender, &mut outcome);
        }

        debug!(
            "{} vs {}: {:?} damage, killed {:?}",
            attacker.name,
            defender.name,
            outcome
                .strikes
                .iter()
                .map(|strike| strike.damage)
                .collect::<Vec<_>>(),
            outcome.killed
        );

        Ok(outcome)
    }

    fn check_participants(attacker: &EntityState, defender: &EntityState) -> DelveResult<()> {
        if attacker.id == defender.id {
            return Err(DelveError::InvalidCombatState(format!(
                "{} cannot attack itself",
                attacker.name
            )));
        }
        if !attacker.is_alive() {
            return Err(DelveError::InvalidCombatState(format!(
                "Attacker {} is dead",
                attacker.name
            )));
        }
        if !defender.is_alive() {
            return Err(DelveError::InvalidCombatState(format!(
                "Defender {} is dead",
                defender.name
            )));
        }
        if !attacker.position.is_adjacent(defender.position) {
            return Err(DelveError::InvalidCombatState(format!(
                "{} at {:?} is not adjacent to {} at {:?}",
                attacker.name, attacker.position, defender.name, defender.position
            )));
        }
        Ok(())
    }

    fn strike(
        &self,
        attacker: &EntityState,
        defender: &mut EntityState,
        rng: &mut RandomStream,
    ) -> Strike {
        let mut damage = Self::effective_damage(attacker, defender);
        let critical = rng.chance(self.rules.crit_chance);
        if critical {
            damage = ((damage as f64 * self.rules.crit_multiplier).floor() as u32).max(damage);
        }

        defender.take_damage(damage);
        Strike {
            attacker: attacker.id,
            defender: defender.id,
            damage,
            critical,
            remaining_health: defender.health,
        }
    }

    fn settle_kill(
        &self,
        killer: &mut EntityState,
        victim: &mut EntityState,
        outcome: &mut CombatOutcome,
    ) {
        outcome.killed = Some(victim.id);
        outcome.xp_awarded = victim.xp_reward;
        outcome.gold_awarded = victim.gold;

        killer.gold = killer.gold.saturating_add(victim.gold);
        victim.gold = 0;

        for new_level in killer.gain_xp(victim.xp_reward, &self.curve) {
            outcome.level_ups.push(LevelUp {
                entity: killer.id,
                new_level,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EnemyKind, EntityKind, Item, Position};
    use uuid::Uuid;

    fn hero() -> EntityState {
        EntityState::new(
            Uuid::from_u128(1),
            EntityKind::Player,
            "Hero",
            Position::new(5, 5),
        )
        .with_health(100)
        .with_damage(10)
        .with_weapon(Item::weapon("Iron Sword", 2))
    }

    fn goblin(health: u32, defense: u32) -> EntityState {
        EntityState::new(
            Uuid::from_u128(2),
            EntityKind::Enemy(EnemyKind::Goblin),
            "Goblin",
            Position::new(6, 5),
        )
        .with_health(health)
        .with_damage(10)
        .with_defense(defense)
        .with_xp_reward(20)
        .with_gold(5)
    }

    #[test]
    fn test_lethal_strike_has_no_counter() {
        let resolver = CombatResolver::default();
        let mut rng = RandomStream::new(42);
        let mut attacker = hero();
        let mut defender = goblin(9, 3);

        let outcome = resolver
            .resolve_attack(&mut attacker, &mut defender, &mut rng)
            .unwrap();

        assert_eq!(outcome.strikes.len(), 1);
        assert_eq!(outcome.strikes[0].damage, 9);
        assert_eq!(outcome.killed, Some(defender.id));
        assert!(!defender.is_alive());
        assert_eq!(defender.health, 0);
        assert_eq!(attacker.health, 100);
        assert_eq!(attacker.xp, 20);
        assert_eq!(attacker.gold, 5);
        assert_eq!(outcome.xp_awarded, 20);
    }

    #[test]
    fn test_survivor_counter_attacks() {
        let resolver = CombatResolver::default();
        let mut rng = RandomStream::new(42);
        let mut attacker = hero();
        let mut defender = goblin(50, 0);

        let outcome = resolver
            .resolve_attack(&mut attacker, &mut defender, &mut rng)
            .unwrap();

        assert!(outcome.was_countered());
        assert_eq!(defender.health, 38);
        assert_eq!(attacker.health, 90);
        assert_eq!(outcome.damage_dealt_by(defender.id), 10);
        assert!(outcome.killed.is_none());
    }

    #[test]
    fn test_counter_attack_can_kill_attacker() {
        let resolver = CombatResolver::default();
        let mut rng = RandomStream::new(1);
        let mut attacker = hero().with_health(5);
        let mut defender = goblin(50, 0);
        defender.xp_reward = 0;

        let outcome = resolver
            .resolve_attack(&mut attacker, &mut defender, &mut rng)
            .unwrap();

        assert_eq!(outcome.killed, Some(attacker.id));
        assert!(!attacker.is_alive());
        assert!(defender.is_alive());
    }

    #[test]
    fn test_minimum_damage_is_one() {
        let resolver = CombatResolver::default();
        let mut rng = RandomStream::new(3);
        let mut attacker = hero().with_damage(1);
        attacker.weapon = None;
        let mut defender = goblin(50, 40);

        let outcome = resolver
            .resolve_attack(&mut attacker, &mut defender, &mut rng)
            .unwrap();
        assert_eq!(outcome.strikes[0].damage, 1);
        assert_eq!(defender.health, 49);
    }

    #[test]
    fn test_dead_participants_rejected() {
        let resolver = CombatResolver::default();
        let mut rng = RandomStream::new(3);
        let mut attacker = hero();
        let mut defender = goblin(10, 0);
        defender.take_damage(10);

        let err = resolver
            .resolve_attack(&mut attacker, &mut defender, &mut rng)
            .unwrap_err();
        assert!(matches!(err, DelveError::InvalidCombatState(_)));
        assert_eq!(attacker.health, 100);
    }

    #[test]
    fn test_non_adjacent_rejected() {
        let resolver = CombatResolver::default();
        let mut rng = RandomStream::new(3);
        let mut attacker = hero();
        let mut defender = goblin(10, 0);
        defender.position = Position::new(8, 5);

        assert!(resolver
            .resolve_attack(&mut attacker, &mut defender, &mut rng)
            .is_err());
        assert_eq!(defender.health, 10);
    }

    #[test]
    fn test_self_attack_rejected() {
        let resolver = CombatResolver::default();
        let mut rng = RandomStream::new(3);
        let mut attacker = hero();
        let mut twin = hero();
        twin.position = Position::new(6, 5);

        assert!(resolver
            .resolve_attack(&mut attacker, &mut twin, &mut rng)
            .is_err());
    }

    #[test]
    fn test_kill_triggers_cascading_level_ups() {
        let resolver = CombatResolver::default();
        let mut rng = RandomStream::new(5);
        let mut attacker = hero();
        let mut defender = goblin(1, 0).with_xp_reward(250);

        let outcome = resolver
            .resolve_attack(&mut attacker, &mut defender, &mut rng)
            .unwrap();

        let levels: Vec<u32> = outcome.level_ups.iter().map(|l| l.new_level).collect();
        assert_eq!(levels, vec![2, 3]);
        assert_eq!(attacker.level, 3);
        assert_eq!(attacker.xp, 0);
    }

    #[test]
    fn test_guaranteed_critical() {
        let resolver = CombatResolver::new(
            CombatRules {
                crit_chance: 1.0,
                crit_multiplier: 2.0,
            },
            LevelCurve::default(),
        );
        let mut rng = RandomStream::new(8);
        let mut attacker = hero();
        let mut defender = goblin(100, 0);

        let outcome = resolver
            .resolve_attack(&mut attacker, &mut defender, &mut rng)
            .unwrap();
        assert!(outcome.strikes[0].critical);
        assert_eq!(outcome.strikes[0].damage, 24);
    }
}
