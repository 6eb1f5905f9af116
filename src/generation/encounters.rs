//! # Encounter Generation
//!
//! Spawn-point placement: enemies weighted by biome and tier, plus the quest
//! giver waiting in the start room.

use crate::generation::{Biome, GenerationConfig, Populator, Room, SpawnKind, SpawnPoint};
use crate::{DelveError, DelveResult, EnemyKind, Level, NpcKind, Position, RandomStream};
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Default weights for a biome's native enemies, most common first.
const NATIVE_WEIGHTS: [f64; 3] = [0.6, 0.3, 0.1];

/// Chance that the descent room is left unguarded.
const EMPTY_DESCENT_CHANCE: f64 = 0.5;

/// One weighted enemy option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterEntry {
    pub enemy: EnemyKind,
    pub weight: f64,
}

/// Enemy options for one biome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomeEncounters {
    pub biome: Biome,
    pub entries: Vec<EncounterEntry>,
}

/// Biome to weighted enemy kinds.
///
/// `tier_bias` shifts weight toward stronger enemies as the tier rises: each
/// entry's weight is multiplied by `1 + tier_bias * (tier - 1) * threat / 7`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterTable {
    pub biomes: Vec<BiomeEncounters>,
    pub tier_bias: f64,
}

impl Default for EncounterTable {
    fn default() -> Self {
        let biomes = Biome::all()
            .into_iter()
            .map(|biome| BiomeEncounters {
                biome,
                entries: biome
                    .enemy_kinds()
                    .into_iter()
                    .zip(NATIVE_WEIGHTS)
                    .map(|(enemy, weight)| EncounterEntry { enemy, weight })
                    .collect(),
            })
            .collect();

        Self {
            biomes,
            tier_bias: 0.1,
        }
    }
}

impl EncounterTable {
    /// Entries for a biome; empty if the table does not list it.
    pub fn entries(&self, biome: Biome) -> &[EncounterEntry] {
        self.biomes
            .iter()
            .find(|candidate| candidate.biome == biome)
            .map(|candidate| candidate.entries.as_slice())
            .unwrap_or(&[])
    }

    /// Picks an enemy kind for a biome at the given tier.
    ///
    /// Returns `None` if the biome has no positively weighted entries.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::{Biome, EncounterTable, RandomStream};
    ///
    /// let table = EncounterTable::default();
    /// let mut rng = RandomStream::new(4);
    /// let kind = table.pick(Biome::Ice, 3, &mut rng).unwrap();
    /// assert!(Biome::Ice.enemy_kinds().contains(&kind));
    /// ```
    pub fn pick(&self, biome: Biome, tier: u32, rng: &mut RandomStream) -> Option<EnemyKind> {
        let entries = self.entries(biome);
        let boost = self.tier_bias * tier.saturating_sub(1) as f64;
        let weights: Vec<f64> = entries
            .iter()
            .map(|entry| entry.weight * (1.0 + boost * entry.enemy.threat() as f64 / 7.0))
            .collect();

        rng.weighted_index(&weights).map(|index| entries[index].enemy)
    }

    pub fn validate(&self) -> DelveResult<()> {
        if !self.tier_bias.is_finite() || self.tier_bias < 0.0 {
            return Err(DelveError::InvalidConfig(format!(
                "encounter tier_bias must be non-negative, got {}",
                self.tier_bias
            )));
        }

        for biome in &self.biomes {
            if let Some(entry) = biome
                .entries
                .iter()
                .find(|entry| !entry.weight.is_finite() || entry.weight < 0.0)
            {
                return Err(DelveError::InvalidConfig(format!(
                    "{} weight for {} must be non-negative, got {}",
                    entry.enemy.name(),
                    biome.biome.name(),
                    entry.weight
                )));
            }
        }

        Ok(())
    }
}

/// Places enemy and NPC spawn points in a carved level.
///
/// Spawn points never share a tile and never sit on the start or descent
/// tile. The start room holds no enemies.
#[derive(Debug, Clone)]
pub struct EncounterGenerator {
    /// Whether to place a quest giver in the start room
    pub quest_giver: bool,
}

impl Default for EncounterGenerator {
    fn default() -> Self {
        Self { quest_giver: true }
    }
}

impl EncounterGenerator {
    /// Most enemies a room can hold at a tier.
    pub fn max_slots(tier: u32) -> u32 {
        3 + (tier / 2).min(3)
    }

    fn free_tiles(
        room: &Room,
        occupied: &HashSet<Position>,
        rng: &mut RandomStream,
    ) -> Vec<Position> {
        let mut tiles: Vec<Position> = room
            .floor_positions()
            .into_iter()
            .filter(|pos| !occupied.contains(pos))
            .collect();
        tiles.shuffle(rng);
        tiles
    }
}

impl Populator<Vec<SpawnPoint>> for EncounterGenerator {
    fn populate(
        &self,
        level: &Level,
        config: &GenerationConfig,
        rng: &mut RandomStream,
    ) -> DelveResult<Vec<SpawnPoint>> {
        let tier = config.difficulty_tier;
        let max_slots = Self::max_slots(tier);
        let mut occupied: HashSet<Position> =
            [level.start_position, level.descent_position].into_iter().collect();
        let mut spawns = Vec::new();

        for room in &level.rooms {
            if room.id == level.start_room {
                if self.quest_giver {
                    if let Some(position) = Self::free_tiles(room, &occupied, rng).pop() {
                        occupied.insert(position);
                        spawns.push(SpawnPoint {
                            kind: SpawnKind::Npc(NpcKind::QuestGiver),
                            position,
                        });
                    }
                }
                continue;
            }

            if room.id == level.descent_room && rng.chance(EMPTY_DESCENT_CHANCE) {
                continue;
            }

            let slots = rng.gen_range(0..=max_slots);
            let mut free = Self::free_tiles(room, &occupied, rng);
            for _ in 0..slots {
                if !rng.chance(config.enemy_density) {
                    continue;
                }
                let Some(kind) = config.encounter_table.pick(level.biome, tier, rng) else {
                    break;
                };
                let Some(position) = free.pop() else {
                    break;
                };
                occupied.insert(position);
                spawns.push(SpawnPoint {
                    kind: SpawnKind::Enemy(kind),
                    position,
                });
            }
        }

        debug!(
            "Placed {} spawn points across {} rooms",
            spawns.len(),
            level.rooms.len()
        );
        Ok(spawns)
    }

    fn populator_type(&self) -> &'static str {
        "EncounterGenerator"
    }
}
