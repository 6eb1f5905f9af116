//! # Loot Generation
//!
//! Floor items scattered through a carved level: potions, gold, tier-scaled
//! equipment and the artifact hidden on every fifth tier.

use crate::generation::{GenerationConfig, Populator, Room};
use crate::{
    artifact_tag, config, DelveResult, FloorItem, Item, Level, Position, RandomStream, Rarity,
};
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// Places floor items room by room.
///
/// Every chance is scaled by the config's `item_density`. Items never land on
/// the start or descent tile and never share a tile.
#[derive(Debug, Clone)]
pub struct ItemGenerator {
    pub potion_chance: f64,
    pub potion_heal: u32,
    pub gold_chance: f64,
    /// Equipment chance per tier; reaches this value at tier 5
    pub equipment_chance_per_five_tiers: f64,
}

impl Default for ItemGenerator {
    fn default() -> Self {
        Self {
            potion_chance: 0.4,
            potion_heal: 50,
            gold_chance: 0.3,
            equipment_chance_per_five_tiers: 0.15,
        }
    }
}

impl ItemGenerator {
    /// Chance of a weapon or armor piece per room at a tier, capped at 0.6.
    pub fn equipment_chance(&self, tier: u32) -> f64 {
        (self.equipment_chance_per_five_tiers * tier as f64 / 5.0).min(0.6)
    }

    /// Rolls the equipment piece found at a tier.
    pub fn roll_equipment(&self, tier: u32, rng: &mut RandomStream) -> Item {
        let rarity = Rarity::for_tier(tier);
        if rng.gen_bool(0.5) {
            Item::weapon(rarity.weapon_name(), rarity.bonus())
        } else {
            Item::armor(rarity.armor_name(), rarity.bonus())
        }
    }

    fn free_tile(
        room: &Room,
        occupied: &HashSet<Position>,
        rng: &mut RandomStream,
    ) -> Option<Position> {
        room.floor_positions()
            .into_iter()
            .filter(|pos| !occupied.contains(pos))
            .collect::<Vec<_>>()
            .choose(rng)
            .copied()
    }
}

impl Populator<Vec<FloorItem>> for ItemGenerator {
    fn populate(
        &self,
        level: &Level,
        config: &GenerationConfig,
        rng: &mut RandomStream,
    ) -> DelveResult<Vec<FloorItem>> {
        let tier = config.difficulty_tier;
        let density = config.item_density;
        let mut occupied: HashSet<Position> =
            [level.start_position, level.descent_position].into_iter().collect();
        let mut items = Vec::new();

        let mut place = |room: &Room, item: Item, rng: &mut RandomStream| -> bool {
            match Self::free_tile(room, &occupied, rng) {
                Some(position) => {
                    occupied.insert(position);
                    items.push(FloorItem { position, item });
                    true
                }
                None => false,
            }
        };

        for room in &level.rooms {
            if rng.chance(self.potion_chance * density) {
                place(room, Item::health_potion(self.potion_heal), rng);
            }
            if rng.chance(self.equipment_chance(tier) * density) {
                let equipment = self.roll_equipment(tier, rng);
                place(room, equipment, rng);
            }
            if rng.chance(self.gold_chance * density) {
                let amount = rng.gen_range(5..=20) * tier;
                place(room, Item::gold(amount), rng);
            }
        }

        if tier % config::ARTIFACT_TIER_INTERVAL == 0 {
            let mut hiding_places: Vec<&Room> = level
                .rooms
                .iter()
                .filter(|room| room.id != level.start_room)
                .collect();
            hiding_places.shuffle(rng);
            hiding_places.extend(level.rooms.iter().filter(|room| room.id == level.start_room));

            for room in hiding_places {
                let artifact = Item::quest_item("Ancient Artifact", artifact_tag(tier));
                if place(room, artifact, rng) {
                    break;
                }
            }
        }

        debug!("Scattered {} floor items", items.len());
        Ok(items)
    }

    fn populator_type(&self) -> &'static str {
        "ItemGenerator"
    }
}
