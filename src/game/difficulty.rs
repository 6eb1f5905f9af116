//! # Difficulty Module
//!
//! The difficulty-scaling table supplied at startup: player base stats and
//! per-level growth, the XP curve, enemy stat profiles with their behaviour,
//! and combat rules. Every field has a default, so a JSON document only needs
//! to name what it overrides.
//!
//! ```
//! use delve::DifficultyTable;
//!
//! let table = DifficultyTable::from_json_str(r#"{ "fov_radius": 6 }"#).unwrap();
//! assert_eq!(table.fov_radius, 6);
//! assert_eq!(table.progression.base_xp, 100);
//! ```

use crate::{config, DelveError, DelveResult, EnemyBehavior, EnemyKind, MovementPolicy, StatGrowth};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Starting stats for a fresh player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerProfile {
    pub health: u32,
    pub mana: u32,
    pub damage: u32,
    pub defense: u32,
    pub gold: u32,
    pub growth: StatGrowth,
}

impl Default for PlayerProfile {
    fn default() -> Self {
        Self {
            health: 100,
            mana: 100,
            damage: 10,
            defense: 0,
            gold: 10,
            growth: StatGrowth {
                health: 20,
                mana: 10,
                damage: 5,
                defense: 1,
            },
        }
    }
}

/// XP thresholds per character level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelCurve {
    /// XP needed to go from level 1 to level 2
    pub base_xp: u32,
    /// Each threshold is the previous one times this
    pub xp_multiplier: f64,
    /// No level-ups happen past this level
    pub max_level: u32,
}

impl LevelCurve {
    /// Threshold that follows `current`. Always strictly larger.
    pub fn next_threshold(&self, current: u32) -> u32 {
        let grown = (current as f64 * self.xp_multiplier).floor() as u32;
        grown.max(current.saturating_add(1))
    }
}

impl Default for LevelCurve {
    fn default() -> Self {
        Self {
            base_xp: 100,
            xp_multiplier: 1.5,
            max_level: 20,
        }
    }
}

/// Optional critical-hit rule applied on every strike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatRules {
    /// Probability in [0, 1] that a strike is critical
    pub crit_chance: f64,
    /// Damage multiplier for critical strikes
    pub crit_multiplier: f64,
}

impl CombatRules {
    /// No critical hits; the damage formula is exact.
    pub fn deterministic() -> Self {
        Self {
            crit_chance: 0.0,
            crit_multiplier: 1.0,
        }
    }
}

impl Default for CombatRules {
    fn default() -> Self {
        Self::deterministic()
    }
}

/// Tier-1 stats and behaviour for one enemy kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyProfile {
    pub kind: EnemyKind,
    pub health: u32,
    #[serde(default)]
    pub mana: u32,
    pub damage: u32,
    #[serde(default)]
    pub defense: u32,
    pub xp_reward: u32,
    pub gold: u32,
    #[serde(default)]
    pub behavior: EnemyBehavior,
}

impl EnemyProfile {
    fn builtin(kind: EnemyKind) -> Self {
        let chaser = EnemyBehavior::default();
        let (health, mana, damage, defense, xp_reward, gold, behavior) = match kind {
            EnemyKind::Goblin => (50, 0, 10, 0, 20, 5, chaser),
            EnemyKind::Skeleton => (70, 0, 15, 1, 30, 8, chaser),
            EnemyKind::Orc => (100, 0, 20, 2, 40, 12, chaser),
            EnemyKind::Lynx => (
                60,
                0,
                25,
                0,
                35,
                7,
                EnemyBehavior {
                    detection_radius: 12,
                    movement: MovementPolicy::Chase,
                    wander_chance: 0.2,
                },
            ),
            EnemyKind::FrostTroll => (120, 0, 30, 3, 50, 15, chaser),
            EnemyKind::MagmaElemental => (
                150,
                50,
                35,
                2,
                60,
                20,
                EnemyBehavior {
                    detection_radius: 6,
                    movement: MovementPolicy::Stationary,
                    wander_chance: 0.0,
                },
            ),
            EnemyKind::ShadowWraith => (80, 50, 40, 0, 45, 10, chaser),
        };

        Self {
            kind,
            health,
            mana,
            damage,
            defense,
            xp_reward,
            gold,
            behavior,
        }
    }
}

/// Difficulty-scaling table: the tunable numbers behind stats, leveling and AI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyTable {
    pub player: PlayerProfile,
    pub progression: LevelCurve,
    /// Enemy stats grow by this fraction per difficulty tier above 1
    pub enemy_tier_scaling: f64,
    /// Per-kind overrides; kinds missing here use the built-in profile
    pub enemies: Vec<EnemyProfile>,
    pub combat: CombatRules,
    /// Player sight radius in tiles
    pub fov_radius: u32,
}

impl Default for DifficultyTable {
    fn default() -> Self {
        Self {
            player: PlayerProfile::default(),
            progression: LevelCurve::default(),
            enemy_tier_scaling: 0.2,
            enemies: EnemyKind::all()
                .into_iter()
                .map(EnemyProfile::builtin)
                .collect(),
            combat: CombatRules::default(),
            fov_radius: config::DEFAULT_FOV_RADIUS,
        }
    }
}

impl DifficultyTable {
    /// The default table with 10% critical hits at 1.5x damage.
    pub fn classic() -> Self {
        Self {
            combat: CombatRules {
                crit_chance: 0.1,
                crit_multiplier: 1.5,
            },
            ..Self::default()
        }
    }

    /// Parses and validates a table from JSON.
    pub fn from_json_str(json: &str) -> DelveResult<Self> {
        let table: DifficultyTable = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    /// Reads, parses and validates a table from a JSON file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> DelveResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Checks that every value lies in its recognised domain.
    pub fn validate(&self) -> DelveResult<()> {
        if self.progression.base_xp == 0 {
            return Err(DelveError::InvalidConfig(
                "progression.base_xp must be at least 1".to_string(),
            ));
        }
        if !(self.progression.xp_multiplier >= 1.0) {
            return Err(DelveError::InvalidConfig(format!(
                "progression.xp_multiplier must be >= 1.0, got {}",
                self.progression.xp_multiplier
            )));
        }
        if self.progression.max_level == 0 {
            return Err(DelveError::InvalidConfig(
                "progression.max_level must be at least 1".to_string(),
            ));
        }
        if self.player.health == 0 {
            return Err(DelveError::InvalidConfig(
                "player.health must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.combat.crit_chance) {
            return Err(DelveError::InvalidConfig(format!(
                "combat.crit_chance must be within [0, 1], got {}",
                self.combat.crit_chance
            )));
        }
        if !(self.combat.crit_multiplier >= 1.0) {
            return Err(DelveError::InvalidConfig(format!(
                "combat.crit_multiplier must be >= 1.0, got {}",
                self.combat.crit_multiplier
            )));
        }
        if self.fov_radius > config::MAX_SIGHT_RADIUS {
            return Err(DelveError::InvalidConfig(format!(
                "fov_radius must be at most {}, got {}",
                config::MAX_SIGHT_RADIUS,
                self.fov_radius
            )));
        }
        if !(self.enemy_tier_scaling >= 0.0) {
            return Err(DelveError::InvalidConfig(format!(
                "enemy_tier_scaling must be non-negative, got {}",
                self.enemy_tier_scaling
            )));
        }
        for profile in &self.enemies {
            if profile.health == 0 {
                return Err(DelveError::InvalidConfig(format!(
                    "{} profile has zero health",
                    profile.kind.name()
                )));
            }
            if profile.behavior.detection_radius > config::MAX_SIGHT_RADIUS {
                return Err(DelveError::InvalidConfig(format!(
                    "{} detection_radius must be at most {}",
                    profile.kind.name(),
                    config::MAX_SIGHT_RADIUS
                )));
            }
            if !(0.0..=1.0).contains(&profile.behavior.wander_chance) {
                return Err(DelveError::InvalidConfig(format!(
                    "{} wander_chance must be within [0, 1]",
                    profile.kind.name()
                )));
            }
        }
        Ok(())
    }

    /// Profile for an enemy kind, falling back to the built-in one.
    pub fn enemy_profile(&self, kind: EnemyKind) -> EnemyProfile {
        self.enemies
            .iter()
            .find(|profile| profile.kind == kind)
            .cloned()
            .unwrap_or_else(|| EnemyProfile::builtin(kind))
    }

    /// Stat multiplier applied to enemies spawned at a tier.
    pub fn tier_multiplier(&self, tier: u32) -> f64 {
        1.0 + tier.saturating_sub(1) as f64 * self.enemy_tier_scaling
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_table_values() {
        let table = DifficultyTable::default();
        assert_eq!(table.player.health, 100);
        assert_eq!(table.player.growth.damage, 5);
        assert_eq!(table.progression.max_level, 20);
        assert_eq!(table.fov_radius, 8);
        assert_eq!(table.combat.crit_chance, 0.0);
        assert_eq!(table.enemies.len(), EnemyKind::all().len());
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_classic_enables_crits() {
        let table = DifficultyTable::classic();
        assert_eq!(table.combat.crit_chance, 0.1);
        assert_eq!(table.combat.crit_multiplier, 1.5);
    }

    #[test]
    fn test_level_curve_grows() {
        let curve = LevelCurve::default();
        assert_eq!(curve.next_threshold(100), 150);
        assert_eq!(curve.next_threshold(150), 225);

        let flat = LevelCurve {
            xp_multiplier: 1.0,
            ..LevelCurve::default()
        };
        assert_eq!(flat.next_threshold(100), 101);
    }

    #[test]
    fn test_tier_multiplier() {
        let table = DifficultyTable::default();
        assert_eq!(table.tier_multiplier(1), 1.0);
        assert!((table.tier_multiplier(6) - 2.0).abs() < 1e-9);
        assert_eq!(table.tier_multiplier(0), 1.0);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{
            "progression": { "xp_multiplier": 2.0 },
            "enemies": [
                { "kind": "Goblin", "health": 5, "damage": 1, "xp_reward": 3, "gold": 0 }
            ]
        }"#;
        let table = DifficultyTable::from_json_str(json).unwrap();
        assert_eq!(table.progression.xp_multiplier, 2.0);
        assert_eq!(table.progression.base_xp, 100);
        assert_eq!(table.enemy_profile(EnemyKind::Goblin).health, 5);
        // Kinds dropped from the list fall back to the built-in profile
        assert_eq!(table.enemy_profile(EnemyKind::Orc).health, 100);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = DifficultyTable::from_json_str(r#"{ "combat": { "crit_chance": 1.5 } }"#)
            .unwrap_err();
        assert!(matches!(err, DelveError::InvalidConfig(_)));

        let err = DifficultyTable::from_json_str(r#"{ "progression": { "xp_multiplier": 0.5 } }"#)
            .unwrap_err();
        assert!(matches!(err, DelveError::InvalidConfig(_)));

        let err = DifficultyTable::from_json_str("not json").unwrap_err();
        assert!(matches!(err, DelveError::Serde(_)));
    }

    #[test]
    fn test_oversized_radii_rejected() {
        let err = DifficultyTable::from_json_str(r#"{ "fov_radius": 4294967295 }"#).unwrap_err();
        assert!(matches!(err, DelveError::InvalidConfig(_)));

        let json = r#"{
            "enemies": [
                {
                    "kind": "Goblin", "health": 5, "damage": 1, "xp_reward": 3, "gold": 0,
                    "behavior": {
                        "detection_radius": 4294967295,
                        "movement": "Chase",
                        "wander_chance": 0.1
                    }
                }
            ]
        }"#;
        let err = DifficultyTable::from_json_str(json).unwrap_err();
        assert!(matches!(err, DelveError::InvalidConfig(_)));

        let mut table = DifficultyTable::default();
        table.fov_radius = config::MAX_SIGHT_RADIUS;
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_load_from_path() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "fov_radius": 5, "enemy_tier_scaling": 0.5 }}"#).unwrap();

        let table = DifficultyTable::from_path(file.path()).unwrap();
        assert_eq!(table.fov_radius, 5);
        assert_eq!(table.enemy_tier_scaling, 0.5);

        let missing = DifficultyTable::from_path(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(DelveError::Io(_))));
    }
}
