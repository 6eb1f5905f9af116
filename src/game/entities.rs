//! # Entities Module
//!
//! One stat record shared by the player, enemies and NPCs. Kind-specific
//! behaviour comes from the [`EntityKind`] tag, the [`Capabilities`] flags and,
//! for enemies, an [`EnemyBehavior`] resolved once at spawn.

use crate::{
    DelveError, DelveResult, DifficultyTable, EntityId, Item, ItemKind, ItemUse, LevelCurve,
    Position,
};
use serde::{Deserialize, Serialize};

/// Enemy variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EnemyKind {
    Goblin,
    Skeleton,
    Orc,
    Lynx,
    FrostTroll,
    MagmaElemental,
    ShadowWraith,
}

impl EnemyKind {
    pub fn all() -> Vec<EnemyKind> {
        vec![
            EnemyKind::Goblin,
            EnemyKind::Skeleton,
            EnemyKind::Orc,
            EnemyKind::Lynx,
            EnemyKind::FrostTroll,
            EnemyKind::MagmaElemental,
            EnemyKind::ShadowWraith,
        ]
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            EnemyKind::Goblin => "Goblin",
            EnemyKind::Skeleton => "Skeleton",
            EnemyKind::Orc => "Orc",
            EnemyKind::Lynx => "Lynx",
            EnemyKind::FrostTroll => "Frost Troll",
            EnemyKind::MagmaElemental => "Magma Elemental",
            EnemyKind::ShadowWraith => "Shadow Wraith",
        }
    }

    /// Relative strength, 1 (weakest) to 7.
    pub fn threat(self) -> u32 {
        match self {
            EnemyKind::Goblin => 1,
            EnemyKind::Skeleton => 2,
            EnemyKind::Lynx => 3,
            EnemyKind::Orc => 4,
            EnemyKind::ShadowWraith => 5,
            EnemyKind::FrostTroll => 6,
            EnemyKind::MagmaElemental => 7,
        }
    }

    /// Spell-casting enemies carry mana and regenerate it each tick.
    pub fn casts_spells(self) -> bool {
        matches!(self, EnemyKind::MagmaElemental | EnemyKind::ShadowWraith)
    }
}

/// Non-hostile characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NpcKind {
    /// Hands out quests when talked to
    QuestGiver,
}

/// What an entity is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Enemy(EnemyKind),
    Npc(NpcKind),
}

/// Capability flags derived from the entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub can_cast_spells: bool,
    pub is_hostile: bool,
    pub blocks_movement: bool,
}

impl Capabilities {
    pub fn for_kind(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Player => Self {
                can_cast_spells: true,
                is_hostile: false,
                blocks_movement: true,
            },
            EntityKind::Enemy(enemy) => Self {
                can_cast_spells: enemy.casts_spells(),
                is_hostile: true,
                blocks_movement: true,
            },
            EntityKind::Npc(_) => Self {
                can_cast_spells: false,
                is_hostile: false,
                blocks_movement: true,
            },
        }
    }
}

/// Stat increase applied on every level-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StatGrowth {
    pub health: u32,
    pub mana: u32,
    pub damage: u32,
    pub defense: u32,
}

/// How an enemy moves when it is not adjacent to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementPolicy {
    /// Path toward the player once detected, wander otherwise
    Chase,
    /// Never pursue; only wander
    Wander,
    /// Hold position; still strikes when the player comes adjacent
    Stationary,
}

/// Per-kind AI parameters, looked up once at spawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnemyBehavior {
    /// Euclidean distance within which the player is noticed
    pub detection_radius: u32,
    pub movement: MovementPolicy,
    /// Chance per tick of a random step while not chasing
    pub wander_chance: f64,
}

impl Default for EnemyBehavior {
    fn default() -> Self {
        Self {
            detection_radius: 10,
            movement: MovementPolicy::Chase,
            wander_chance: 0.1,
        }
    }
}

/// The shared stat model.
///
/// Health stays within `[0, max_health]` and mana within `[0, max_mana]`.
/// Health reaching 0 is the only way to die, and dead entities never come back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub id: EntityId,
    pub kind: EntityKind,
    pub name: String,
    pub position: Position,
    pub health: u32,
    pub max_health: u32,
    pub mana: u32,
    pub max_mana: u32,
    pub base_damage: u32,
    pub base_defense: u32,
    pub weapon: Option<Item>,
    pub armor: Option<Item>,
    pub level: u32,
    pub xp: u32,
    pub xp_to_next_level: u32,
    /// XP awarded to whoever kills this entity
    pub xp_reward: u32,
    pub gold: u32,
    pub inventory: Vec<Item>,
    pub alive: bool,
    pub capabilities: Capabilities,
    pub growth: StatGrowth,
    pub behavior: Option<EnemyBehavior>,
}

impl EntityState {
    /// Creates a level-1 entity with minimal stats. Use the `with_*` builders
    /// or the kind-specific constructors for real values.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::{EntityKind, EntityState, Position};
    /// use uuid::Uuid;
    ///
    /// let dummy = EntityState::new(Uuid::nil(), EntityKind::Player, "Dummy", Position::new(1, 1))
    ///     .with_health(30)
    ///     .with_damage(4);
    /// assert_eq!(dummy.health, 30);
    /// assert!(dummy.is_alive());
    /// ```
    pub fn new(
        id: EntityId,
        kind: EntityKind,
        name: impl Into<String>,
        position: Position,
    ) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            position,
            health: 10,
            max_health: 10,
            mana: 0,
            max_mana: 0,
            base_damage: 1,
            base_defense: 0,
            weapon: None,
            armor: None,
            level: 1,
            xp: 0,
            xp_to_next_level: 100,
            xp_reward: 0,
            gold: 0,
            inventory: Vec::new(),
            alive: true,
            capabilities: Capabilities::for_kind(kind),
            growth: StatGrowth::default(),
            behavior: None,
        }
    }

    /// Creates a fresh player from the difficulty table.
    pub fn player(
        id: EntityId,
        name: impl Into<String>,
        position: Position,
        table: &DifficultyTable,
    ) -> Self {
        let profile = &table.player;
        let mut player = Self::new(id, EntityKind::Player, name, position)
            .with_health(profile.health)
            .with_mana(profile.mana)
            .with_damage(profile.damage)
            .with_defense(profile.defense)
            .with_gold(profile.gold);
        player.growth = profile.growth;
        player.xp_to_next_level = table.progression.base_xp;
        player
    }

    /// Creates an enemy scaled to a difficulty tier, with its behaviour resolved.
    pub fn enemy(
        id: EntityId,
        kind: EnemyKind,
        position: Position,
        tier: u32,
        table: &DifficultyTable,
    ) -> Self {
        let profile = table.enemy_profile(kind);
        let multiplier = table.tier_multiplier(tier);
        let scale = |value: u32| (value as f64 * multiplier).floor() as u32;

        let mut enemy = Self::new(id, EntityKind::Enemy(kind), kind.name(), position)
            .with_health(scale(profile.health).max(1))
            .with_mana(profile.mana)
            .with_damage(scale(profile.damage))
            .with_defense(profile.defense)
            .with_xp_reward(scale(profile.xp_reward))
            .with_gold(scale(profile.gold));
        enemy.level = tier.max(1);
        enemy.behavior = Some(profile.behavior);
        enemy
    }

    /// Creates a non-hostile character.
    pub fn npc(id: EntityId, kind: NpcKind, name: impl Into<String>, position: Position) -> Self {
        Self::new(id, EntityKind::Npc(kind), name, position).with_health(50)
    }

    pub fn with_health(mut self, health: u32) -> Self {
        self.max_health = health;
        self.health = health;
        self.alive = health > 0;
        self
    }

    pub fn with_mana(mut self, mana: u32) -> Self {
        self.max_mana = mana;
        self.mana = mana;
        self
    }

    pub fn with_damage(mut self, damage: u32) -> Self {
        self.base_damage = damage;
        self
    }

    pub fn with_defense(mut self, defense: u32) -> Self {
        self.base_defense = defense;
        self
    }

    pub fn with_xp_reward(mut self, xp_reward: u32) -> Self {
        self.xp_reward = xp_reward;
        self
    }

    pub fn with_gold(mut self, gold: u32) -> Self {
        self.gold = gold;
        self
    }

    pub fn with_weapon(mut self, weapon: Item) -> Self {
        self.weapon = Some(weapon);
        self
    }

    pub fn with_armor(mut self, armor: Item) -> Self {
        self.armor = Some(armor);
        self
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn is_player(&self) -> bool {
        self.kind == EntityKind::Player
    }

    pub fn is_hostile(&self) -> bool {
        self.capabilities.is_hostile
    }

    pub fn blocks_movement(&self) -> bool {
        self.capabilities.blocks_movement
    }

    /// Enemy kind, if this is an enemy.
    pub fn enemy_kind(&self) -> Option<EnemyKind> {
        match self.kind {
            EntityKind::Enemy(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn weapon_bonus(&self) -> u32 {
        self.weapon.as_ref().map(Item::damage_bonus).unwrap_or(0)
    }

    pub fn armor_bonus(&self) -> u32 {
        self.armor.as_ref().map(Item::defense_bonus).unwrap_or(0)
    }

    /// Base damage plus equipped weapon.
    pub fn attack_power(&self) -> u32 {
        self.base_damage.saturating_add(self.weapon_bonus())
    }

    /// Base defense plus equipped armor.
    pub fn total_defense(&self) -> u32 {
        self.base_defense.saturating_add(self.armor_bonus())
    }

    /// Applies damage, clamping at zero. Returns the health actually lost.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        let lost = amount.min(self.health);
        self.health -= lost;
        if self.health == 0 {
            self.alive = false;
        }
        lost
    }

    /// Restores health up to the maximum. Returns the amount actually healed.
    pub fn heal(&mut self, amount: u32) -> u32 {
        if !self.alive {
            return 0;
        }
        let healed = amount.min(self.max_health - self.health);
        self.health += healed;
        healed
    }

    /// Restores mana up to the maximum.
    pub fn restore_mana(&mut self, amount: u32) -> u32 {
        let restored = amount.min(self.max_mana - self.mana);
        self.mana += restored;
        restored
    }

    /// Adds XP and applies every level-up it pays for.
    ///
    /// Returns the levels reached, in order. Leveling loops until XP is below
    /// the threshold; at the curve's max level XP is clamped just below it.
    pub fn gain_xp(&mut self, amount: u32, curve: &LevelCurve) -> Vec<u32> {
        let mut reached = Vec::new();
        self.xp = self.xp.saturating_add(amount);

        while self.xp >= self.xp_to_next_level {
            if self.level >= curve.max_level {
                self.xp = self.xp_to_next_level.saturating_sub(1);
                break;
            }
            self.xp -= self.xp_to_next_level;
            self.xp_to_next_level = curve.next_threshold(self.xp_to_next_level);
            self.level_up();
            reached.push(self.level);
        }

        reached
    }

    fn level_up(&mut self) {
        self.level += 1;
        self.max_health = self.max_health.saturating_add(self.growth.health);
        self.max_mana = self.max_mana.saturating_add(self.growth.mana);
        self.base_damage = self.base_damage.saturating_add(self.growth.damage);
        self.base_defense = self.base_defense.saturating_add(self.growth.defense);
        self.health = self.max_health;
        self.mana = self.max_mana;
    }

    /// Puts an item into the inventory, or the wallet if it is gold.
    pub fn pick_up(&mut self, item: Item) {
        match item.kind {
            ItemKind::Gold { amount } => self.gold = self.gold.saturating_add(amount),
            _ => self.inventory.push(item),
        }
    }

    /// Uses the inventory item at `index`.
    ///
    /// Potions heal and are consumed. Weapons and armor are equipped, and the
    /// previously equipped piece returns to the inventory.
    pub fn use_item(&mut self, index: usize) -> DelveResult<ItemUse> {
        let item = self.inventory.get(index).ok_or_else(|| {
            DelveError::InvalidAction(format!(
                "No inventory item at index {} ({} held)",
                index,
                self.inventory.len()
            ))
        })?;
        if !item.is_usable() {
            return Err(DelveError::InvalidAction(format!(
                "{} cannot be used",
                item.name
            )));
        }

        let item = self.inventory.remove(index);
        let name = item.name.clone();
        match item.kind {
            ItemKind::Potion { heal } => {
                let amount = self.heal(heal);
                Ok(ItemUse::Healed { item: name, amount })
            }
            ItemKind::Weapon { .. } => {
                let replaced = self.weapon.replace(item).map(|old| {
                    let old_name = old.name.clone();
                    self.inventory.push(old);
                    old_name
                });
                Ok(ItemUse::Equipped { item: name, replaced })
            }
            ItemKind::Armor { .. } => {
                let replaced = self.armor.replace(item).map(|old| {
                    let old_name = old.name.clone();
                    self.inventory.push(old);
                    old_name
                });
                Ok(ItemUse::Equipped { item: name, replaced })
            }
            ItemKind::Gold { .. } | ItemKind::QuestItem { .. } => Err(DelveError::InvalidState(
                format!("{} passed the usability check", name),
            )),
        }
    }
}
