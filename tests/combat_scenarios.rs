//! Combat scenarios and stat invariants exercised through the public API.

use delve::{
    CombatResolver, DelveError, DifficultyTable, EnemyKind, EntityKind, EntityState, Item,
    LevelCurve, Position, RandomStream,
};
use proptest::prelude::*;
use uuid::Uuid;

fn fighter(name: &str, x: i32) -> EntityState {
    EntityState::new(
        Uuid::from_u128(x as u128 + 1),
        EntityKind::Player,
        name,
        Position::new(x, 0),
    )
}

#[test]
fn test_armored_defender_takes_reduced_damage_and_dies() {
    let resolver = CombatResolver::default();
    let mut rng = RandomStream::new(1);

    let mut hero = fighter("Hero", 0)
        .with_health(40)
        .with_damage(10)
        .with_weapon(Item::weapon("Iron Sword", 2));
    let mut rat = EntityState::new(
        Uuid::from_u128(99),
        EntityKind::Enemy(EnemyKind::Goblin),
        "Rat",
        Position::new(1, 0),
    )
    .with_health(9)
    .with_defense(3)
    .with_xp_reward(15);

    let outcome = resolver.resolve_attack(&mut hero, &mut rat, &mut rng).unwrap();

    assert_eq!(outcome.strikes.len(), 1);
    assert_eq!(outcome.strikes[0].damage, 9);
    assert!(!outcome.was_countered());
    assert_eq!(outcome.killed, Some(rat.id));
    assert_eq!(outcome.xp_awarded, 15);
    assert_eq!(hero.xp, 15);
    assert_eq!(hero.health, 40);
    assert!(!rat.is_alive());
    assert_eq!(rat.health, 0);
}

#[test]
fn test_survivor_strikes_back_with_the_same_formula() {
    let resolver = CombatResolver::default();
    let mut rng = RandomStream::new(1);

    let mut hero = fighter("Hero", 0).with_health(30).with_damage(5).with_defense(2);
    let mut orc = fighter("Orc", 1).with_health(50).with_damage(8).with_defense(1);

    let outcome = resolver.resolve_attack(&mut hero, &mut orc, &mut rng).unwrap();

    assert!(outcome.was_countered());
    assert_eq!(outcome.damage_dealt_by(hero.id), 4);
    assert_eq!(outcome.damage_dealt_by(orc.id), 6);
    assert_eq!(orc.health, 46);
    assert_eq!(hero.health, 24);
    assert_eq!(outcome.killed, None);
}

#[test]
fn test_attacking_a_corpse_is_rejected_untouched() {
    let resolver = CombatResolver::default();
    let mut rng = RandomStream::new(1);

    let mut hero = fighter("Hero", 0).with_health(30);
    let mut corpse = fighter("Corpse", 1).with_health(0);
    let before = (hero.clone(), corpse.clone());

    let result = resolver.resolve_attack(&mut hero, &mut corpse, &mut rng);
    assert!(matches!(result, Err(DelveError::InvalidCombatState(_))));
    assert_eq!((hero, corpse), before);
}

#[test]
fn test_big_kill_cascades_level_ups() {
    let table = DifficultyTable::default();
    let resolver = CombatResolver::from_table(&table);
    let mut rng = RandomStream::new(1);

    let mut hero = EntityState::player(Uuid::from_u128(7), "Hero", Position::new(0, 0), &table);
    let mut dragon = fighter("Dragon", 1).with_health(1).with_xp_reward(1000);

    let outcome = resolver.resolve_attack(&mut hero, &mut dragon, &mut rng).unwrap();

    // 100 + 150 + 225 + 337 = 812 spent, 188 left against a 505 threshold
    let levels: Vec<u32> = outcome.level_ups.iter().map(|up| up.new_level).collect();
    assert_eq!(levels, vec![2, 3, 4, 5]);
    assert_eq!(hero.level, 5);
    assert_eq!(hero.xp, 188);
    assert_eq!(hero.xp_to_next_level, 505);
    assert_eq!(hero.health, hero.max_health);
    assert_eq!(hero.max_health, 100 + 4 * 20);
}

proptest! {
    #[test]
    fn health_stays_within_bounds(
        max_health in 1u32..500,
        hits in prop::collection::vec(0u32..200, 0..20),
        heals in prop::collection::vec(0u32..200, 0..20),
    ) {
        let mut entity = fighter("Target", 0).with_health(max_health);

        for (hit, heal) in hits.iter().zip(heals.iter().chain(std::iter::repeat(&0))) {
            entity.take_damage(*hit);
            prop_assert!(entity.health <= entity.max_health);
            entity.heal(*heal);
            prop_assert!(entity.health <= entity.max_health);
            prop_assert_eq!(entity.is_alive(), entity.health > 0);
        }
    }

    #[test]
    fn leveling_always_terminates_below_threshold(
        amount in 0u32..5_000_000,
        base_xp in 1u32..500,
        multiplier in 1.0f64..3.0,
        max_level in 1u32..60,
    ) {
        let curve = LevelCurve { base_xp, xp_multiplier: multiplier, max_level };
        let mut entity = fighter("Learner", 0).with_health(10);
        entity.xp_to_next_level = base_xp;

        let reached = entity.gain_xp(amount, &curve);

        prop_assert!(entity.xp < entity.xp_to_next_level);
        prop_assert!(entity.level <= max_level.max(1));
        prop_assert_eq!(reached.len() as u32, entity.level - 1);
        prop_assert!(reached.windows(2).all(|pair| pair[1] == pair[0] + 1));
    }

    #[test]
    fn damage_is_never_below_one(
        damage in 0u32..50,
        weapon in 0u32..20,
        defense in 0u32..80,
        armor in 0u32..20,
    ) {
        let attacker = fighter("A", 0)
            .with_damage(damage)
            .with_weapon(Item::weapon("Blade", weapon));
        let defender = fighter("B", 1)
            .with_defense(defense)
            .with_armor(Item::armor("Plate", armor));

        let expected = (damage + weapon).saturating_sub(defense + armor).max(1);
        prop_assert_eq!(CombatResolver::effective_damage(&attacker, &defender), expected);
    }
}
