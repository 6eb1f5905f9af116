//! # Items Module
//!
//! Item kinds and their effects. Items live either in exactly one entity's
//! inventory or on a level's floor; moving between the two is a move, not a copy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What an item is and what it does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    /// Restores health when used
    Potion { heal: u32 },
    /// Adds to attack damage while equipped
    Weapon { damage_bonus: u32 },
    /// Adds to defense while equipped
    Armor { defense_bonus: u32 },
    /// Currency, credited straight to the wallet on pickup
    Gold { amount: u32 },
    /// Quest objective token
    QuestItem { tag: String },
}

/// A named item.
///
/// # Examples
///
/// ```
/// use delve::{Item, ItemKind};
///
/// let potion = Item::health_potion(50);
/// assert!(potion.is_usable());
/// assert_eq!(potion.kind, ItemKind::Potion { heal: 50 });
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub kind: ItemKind,
}

impl Item {
    pub fn new(name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn health_potion(heal: u32) -> Self {
        Self::new("Health Potion", ItemKind::Potion { heal })
    }

    pub fn weapon(name: impl Into<String>, damage_bonus: u32) -> Self {
        Self::new(name, ItemKind::Weapon { damage_bonus })
    }

    pub fn armor(name: impl Into<String>, defense_bonus: u32) -> Self {
        Self::new(name, ItemKind::Armor { defense_bonus })
    }

    pub fn gold(amount: u32) -> Self {
        Self::new(format!("{} gold coins", amount), ItemKind::Gold { amount })
    }

    pub fn quest_item(name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self::new(name, ItemKind::QuestItem { tag: tag.into() })
    }

    /// Whether using this item from the inventory does anything.
    pub fn is_usable(&self) -> bool {
        matches!(
            self.kind,
            ItemKind::Potion { .. } | ItemKind::Weapon { .. } | ItemKind::Armor { .. }
        )
    }

    /// Damage bonus granted while equipped as a weapon.
    pub fn damage_bonus(&self) -> u32 {
        match self.kind {
            ItemKind::Weapon { damage_bonus } => damage_bonus,
            _ => 0,
        }
    }

    /// Defense bonus granted while equipped as armor.
    pub fn defense_bonus(&self) -> u32 {
        match self.kind {
            ItemKind::Armor { defense_bonus } => defense_bonus,
            _ => 0,
        }
    }

    /// Quest tag carried by this item, if any.
    pub fn quest_tag(&self) -> Option<&str> {
        match &self.kind {
            ItemKind::QuestItem { tag } => Some(tag),
            _ => None,
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ItemKind::Potion { heal } => write!(f, "{} (restores {} health)", self.name, heal),
            ItemKind::Weapon { damage_bonus } => {
                write!(f, "{} (+{} damage)", self.name, damage_bonus)
            }
            ItemKind::Armor { defense_bonus } => {
                write!(f, "{} (+{} defense)", self.name, defense_bonus)
            }
            ItemKind::Gold { .. } => write!(f, "{}", self.name),
            ItemKind::QuestItem { tag } => write!(f, "{} [{}]", self.name, tag),
        }
    }
}

/// Item quality bands. Deeper tiers roll better equipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    /// The best rarity available at a difficulty tier.
    pub fn for_tier(tier: u32) -> Self {
        match tier {
            0..=4 => Rarity::Common,
            5..=9 => Rarity::Uncommon,
            10..=14 => Rarity::Rare,
            15..=19 => Rarity::Epic,
            _ => Rarity::Legendary,
        }
    }

    pub fn weapon_name(self) -> &'static str {
        match self {
            Rarity::Common => "Rusty Dagger",
            Rarity::Uncommon => "Iron Sword",
            Rarity::Rare => "Steel Greatsword",
            Rarity::Epic => "Enchanted Blade",
            Rarity::Legendary => "Dragonslayer",
        }
    }

    pub fn armor_name(self) -> &'static str {
        match self {
            Rarity::Common => "Leather Scraps",
            Rarity::Uncommon => "Chainmail",
            Rarity::Rare => "Steel Plate",
            Rarity::Epic => "Enchanted Armor",
            Rarity::Legendary => "Dragonscale",
        }
    }

    /// Equipment bonus for items of this rarity.
    pub fn bonus(self) -> u32 {
        match self {
            Rarity::Common => 3,
            Rarity::Uncommon => 6,
            Rarity::Rare => 10,
            Rarity::Epic => 15,
            Rarity::Legendary => 22,
        }
    }
}

/// What happened when an inventory item was used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemUse {
    /// A potion was drunk and consumed
    Healed { item: String, amount: u32 },
    /// A weapon or armor piece was equipped; the old piece went back to the inventory
    Equipped {
        item: String,
        replaced: Option<String>,
    },
}
