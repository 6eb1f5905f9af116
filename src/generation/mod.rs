//! # Generation Module
//!
//! Procedural level generation: room-and-corridor layout, spawn placement and
//! floor loot.
//!
//! Everything here draws randomness from an explicit [`RandomStream`], so the
//! same seed and [`GenerationConfig`] always produce the same [`Level`].

pub mod dungeon;
pub mod encounters;
pub mod loot;

pub use dungeon::*;
pub use encounters::*;
pub use loot::*;

use crate::game::{EnemyKind, Level, NpcKind, Position};
use crate::{config, DelveError, DelveResult, RandomStream};
use serde::{Deserialize, Serialize};

/// Thematic palette applied uniformly to a level.
///
/// Biomes are ordered by depth; a run never moves to an earlier biome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Biome {
    Cavern,
    Forest,
    Ice,
    Lava,
    Shadow,
}

impl Biome {
    pub fn all() -> Vec<Biome> {
        vec![
            Biome::Cavern,
            Biome::Forest,
            Biome::Ice,
            Biome::Lava,
            Biome::Shadow,
        ]
    }

    /// The biome a difficulty tier belongs to.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::Biome;
    ///
    /// assert_eq!(Biome::for_tier(1), Biome::Cavern);
    /// assert_eq!(Biome::for_tier(5), Biome::Forest);
    /// assert_eq!(Biome::for_tier(42), Biome::Shadow);
    /// ```
    pub fn for_tier(tier: u32) -> Biome {
        match tier {
            0..=4 => Biome::Cavern,
            5..=9 => Biome::Forest,
            10..=14 => Biome::Ice,
            15..=19 => Biome::Lava,
            _ => Biome::Shadow,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Biome::Cavern => "Cavern",
            Biome::Forest => "Forest",
            Biome::Ice => "Ice",
            Biome::Lava => "Lava",
            Biome::Shadow => "Shadow",
        }
    }

    /// Native enemies, most common first.
    pub fn enemy_kinds(self) -> [EnemyKind; 3] {
        match self {
            Biome::Cavern => [EnemyKind::Goblin, EnemyKind::Skeleton, EnemyKind::Orc],
            Biome::Forest => [EnemyKind::Lynx, EnemyKind::Goblin, EnemyKind::Orc],
            Biome::Ice => [EnemyKind::FrostTroll, EnemyKind::Skeleton, EnemyKind::Lynx],
            Biome::Lava => [
                EnemyKind::MagmaElemental,
                EnemyKind::Orc,
                EnemyKind::FrostTroll,
            ],
            Biome::Shadow => [
                EnemyKind::ShadowWraith,
                EnemyKind::Skeleton,
                EnemyKind::MagmaElemental,
            ],
        }
    }

    /// Number of cosmetic floor variants in this biome's palette.
    pub fn palette_size(self) -> u8 {
        match self {
            Biome::Cavern | Biome::Shadow => 3,
            Biome::Forest | Biome::Ice | Biome::Lava => 4,
        }
    }
}

impl std::str::FromStr for Biome {
    type Err = DelveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Biome::all()
            .into_iter()
            .find(|biome| biome.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| DelveError::InvalidConfig(format!("Unknown biome '{}'", s)))
    }
}

/// Configuration for level generation.
///
/// Controls layout size, room counts, biome, difficulty and spawn density.
/// Sizes are outer dimensions and include the room's wall ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Inclusive (min, max) number of rooms
    pub room_count_range: (u32, u32),
    /// Inclusive (min, max) room side length, walls included
    pub room_size_range: (u32, u32),
    pub biome: Biome,
    /// Difficulty tier, starting at 1
    pub difficulty_tier: u32,
    /// Probability in [0, 1] that each enemy slot is filled
    pub enemy_density: f64,
    /// Level width in tiles
    pub width: u32,
    /// Level height in tiles
    pub height: u32,
    /// Depth recorded on the generated level
    pub depth: u32,
    /// Per-room chance of a corridor beyond the spanning tree
    pub extra_connection_chance: f64,
    /// Candidate rectangles tried per room before skipping it
    pub max_placement_attempts: u32,
    /// Layout attempts before falling back to a chain of rooms
    pub max_layout_retries: u32,
    /// Multiplier in [0, 1] on floor loot chances
    pub item_density: f64,
    pub encounter_table: EncounterTable,
}

impl GenerationConfig {
    /// Creates the default configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::GenerationConfig;
    ///
    /// let config = GenerationConfig::new();
    /// assert!(config.room_size_range.0 >= 4);
    /// assert!(config.room_count_range.0 <= config.room_count_range.1);
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn new() -> Self {
        Self {
            room_count_range: (6, 12),
            room_size_range: (5, 11),
            biome: Biome::Cavern,
            difficulty_tier: 1,
            enemy_density: 0.5,
            width: config::DEFAULT_DUNGEON_WIDTH,
            height: config::DEFAULT_DUNGEON_HEIGHT,
            depth: 0,
            extra_connection_chance: 0.15,
            max_placement_attempts: 60,
            max_layout_retries: 5,
            item_density: 1.0,
            encounter_table: EncounterTable::default(),
        }
    }

    /// Smaller maps and fewer rooms, for quick tests.
    pub fn for_testing() -> Self {
        Self {
            room_count_range: (3, 6),
            room_size_range: (4, 8),
            width: 40,
            height: 30,
            enemy_density: 0.3,
            extra_connection_chance: 0.1,
            ..Self::new()
        }
    }

    pub fn with_biome(mut self, biome: Biome) -> Self {
        self.biome = biome;
        self
    }

    pub fn with_tier(mut self, tier: u32) -> Self {
        self.difficulty_tier = tier;
        self
    }

    pub fn with_enemy_density(mut self, density: f64) -> Self {
        self.enemy_density = density;
        self
    }

    pub fn with_room_count(mut self, min: u32, max: u32) -> Self {
        self.room_count_range = (min, max);
        self
    }

    /// Checks that every option lies in its recognised domain.
    pub fn validate(&self) -> DelveResult<()> {
        let (min_rooms, max_rooms) = self.room_count_range;
        if min_rooms == 0 || min_rooms > max_rooms {
            return Err(DelveError::InvalidConfig(format!(
                "room_count_range must satisfy 1 <= min <= max, got {:?}",
                self.room_count_range
            )));
        }

        let (min_size, max_size) = self.room_size_range;
        if min_size < 4 || min_size > max_size {
            return Err(DelveError::InvalidConfig(format!(
                "room_size_range must satisfy 4 <= min <= max, got {:?}",
                self.room_size_range
            )));
        }

        if self.width < max_size + 2 || self.height < max_size + 2 {
            return Err(DelveError::InvalidConfig(format!(
                "A {}x{} level cannot hold a room of size {}",
                self.width, self.height, max_size
            )));
        }

        if self.difficulty_tier == 0 {
            return Err(DelveError::InvalidConfig(
                "difficulty_tier must be at least 1".to_string(),
            ));
        }

        for (name, value) in [
            ("enemy_density", self.enemy_density),
            ("item_density", self.item_density),
            ("extra_connection_chance", self.extra_connection_chance),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(DelveError::InvalidConfig(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        if self.max_placement_attempts == 0 {
            return Err(DelveError::InvalidConfig(
                "max_placement_attempts must be at least 1".to_string(),
            ));
        }

        self.encounter_table.validate()
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Role a room plays in the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomType {
    Normal,
    /// Holds the player start position
    Start,
    /// Holds the descent tile
    Descent,
}

/// A rectangular room. `width` and `height` include the wall ring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: u32,
    pub top_left: Position,
    pub width: u32,
    pub height: u32,
    pub room_type: RoomType,
    pub biome: Biome,
    /// Ids of rooms joined to this one by a corridor
    pub connections: Vec<u32>,
}

impl Room {
    /// Creates an unconnected room in the default biome.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::{Position, Room, RoomType};
    ///
    /// let room = Room::new(3, Position::new(2, 4), 6, 5, RoomType::Normal);
    /// assert_eq!(room.floor_positions().len(), 12);
    /// assert_eq!(room.center(), Position::new(5, 6));
    /// ```
    pub fn new(id: u32, top_left: Position, width: u32, height: u32, room_type: RoomType) -> Self {
        Self {
            id,
            top_left,
            width,
            height,
            room_type,
            biome: Biome::Cavern,
            connections: Vec::new(),
        }
    }

    /// First column east of the room.
    fn right(&self) -> i32 {
        self.top_left.x + self.width as i32
    }

    /// First row south of the room.
    fn bottom(&self) -> i32 {
        self.top_left.y + self.height as i32
    }

    /// Last tile of the wall ring, inclusive.
    pub fn bottom_right(&self) -> Position {
        Position::new(self.right() - 1, self.bottom() - 1)
    }

    /// Always an interior tile for rooms of size 3 or more.
    pub fn center(&self) -> Position {
        Position::new(
            self.top_left.x + self.width as i32 / 2,
            self.top_left.y + self.height as i32 / 2,
        )
    }

    /// Footprint test, walls included.
    pub fn contains(&self, pos: Position) -> bool {
        (self.top_left.x..self.right()).contains(&pos.x)
            && (self.top_left.y..self.bottom()).contains(&pos.y)
    }

    /// Strictly inside the wall ring.
    pub fn interior_contains(&self, pos: Position) -> bool {
        (self.top_left.x + 1..self.right() - 1).contains(&pos.x)
            && (self.top_left.y + 1..self.bottom() - 1).contains(&pos.y)
    }

    /// On the wall ring.
    pub fn is_border(&self, pos: Position) -> bool {
        self.contains(pos) && !self.interior_contains(pos)
    }

    pub fn overlaps(&self, other: &Room) -> bool {
        self.overlaps_with_margin(other, 0)
    }

    /// True when the footprints, grown by `margin` tiles, intersect.
    pub fn overlaps_with_margin(&self, other: &Room, margin: i32) -> bool {
        self.top_left.x < other.right() + margin
            && other.top_left.x < self.right() + margin
            && self.top_left.y < other.bottom() + margin
            && other.top_left.y < self.bottom() + margin
    }

    /// Interior tiles in row-major order.
    pub fn floor_positions(&self) -> Vec<Position> {
        (self.top_left.y + 1..self.bottom() - 1)
            .flat_map(|y| (self.top_left.x + 1..self.right() - 1).map(move |x| Position::new(x, y)))
            .collect()
    }

    /// Records a corridor to `room_id`; duplicates are ignored.
    pub fn add_connection(&mut self, room_id: u32) {
        if !self.connections.contains(&room_id) {
            self.connections.push(room_id);
        }
    }
}

/// What a spawn point will create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpawnKind {
    Enemy(EnemyKind),
    Npc(NpcKind),
}

/// A position and entity kind used to populate a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnPoint {
    pub kind: SpawnKind,
    pub position: Position,
}

/// Trait for procedural generators that build content from scratch.
pub trait Generator<T> {
    /// Generates content using the provided configuration and random stream.
    fn generate(&self, config: &GenerationConfig, rng: &mut RandomStream) -> DelveResult<T>;

    /// Checks the invariants every generated `T` must satisfy.
    fn validate(&self, content: &T, config: &GenerationConfig) -> DelveResult<()>;

    /// Name used in log lines.
    fn generator_type(&self) -> &'static str;
}

/// Trait for generators that decorate an already carved level.
pub trait Populator<T> {
    /// Produces content for `level` without modifying it.
    fn populate(
        &self,
        level: &Level,
        config: &GenerationConfig,
        rng: &mut RandomStream,
    ) -> DelveResult<T>;

    /// Name used in log lines.
    fn populator_type(&self) -> &'static str;
}

/// Generates a complete level from a seed.
///
/// This is the main entry point. Generation is total for valid configs and
/// deterministic in `(seed, config)`; the only error is `InvalidConfig`.
///
/// # Examples
///
/// ```
/// use delve::{generate_level, GenerationConfig};
///
/// let config = GenerationConfig::for_testing();
/// let a = generate_level(7, &config).unwrap();
/// let b = generate_level(7, &config).unwrap();
/// assert_eq!(a, b);
/// assert!(a.validate_connectivity().is_ok());
/// ```
pub fn generate_level(seed: u64, config: &GenerationConfig) -> DelveResult<Level> {
    let mut rng = RandomStream::new(seed);
    let mut level = RoomCorridorGenerator::new().generate(config, &mut rng)?;
    level.seed = seed;
    Ok(level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generation_config_creation() {
        let config = GenerationConfig::new();
        assert_eq!(config.width, 60);
        assert_eq!(config.height, 40);
        assert!(config.room_size_range.0 >= 4);
        assert!(config.validate().is_ok());
        assert!(GenerationConfig::for_testing().validate().is_ok());
    }

    #[test]
    fn test_config_validation_rejects_bad_values() {
        let bad = [
            GenerationConfig::new().with_room_count(0, 3),
            GenerationConfig::new().with_room_count(5, 2),
            GenerationConfig::new().with_tier(0),
            GenerationConfig::new().with_enemy_density(1.5),
            GenerationConfig {
                room_size_range: (3, 6),
                ..GenerationConfig::new()
            },
            GenerationConfig {
                width: 8,
                ..GenerationConfig::new()
            },
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(DelveError::InvalidConfig(_))),
                "{:?} should be rejected",
                config
            );
        }
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: GenerationConfig =
            serde_json::from_str(r#"{ "biome": "Ice", "difficulty_tier": 4 }"#).unwrap();
        assert_eq!(config.biome, Biome::Ice);
        assert_eq!(config.difficulty_tier, 4);
        assert_eq!(config.room_count_range, (6, 12));
    }

    #[test]
    fn test_biome_order_and_parsing() {
        assert!(Biome::Cavern < Biome::Forest);
        assert!(Biome::Lava < Biome::Shadow);
        assert_eq!(Biome::for_tier(10), Biome::Ice);
        assert_eq!(Biome::for_tier(15), Biome::Lava);
        assert_eq!("lava".parse::<Biome>().unwrap(), Biome::Lava);
        assert!("swamp".parse::<Biome>().is_err());
    }

    #[test]
    fn test_room_geometry() {
        let room = Room::new(0, Position::new(3, 2), 7, 6, RoomType::Normal);

        assert_eq!(room.bottom_right(), Position::new(9, 7));
        assert_eq!(room.center(), Position::new(6, 5));

        assert!(room.contains(Position::new(3, 2)));
        assert!(room.contains(Position::new(9, 7)));
        assert!(!room.contains(Position::new(10, 7)));
        assert!(!room.contains(Position::new(2, 4)));

        assert!(room.is_border(Position::new(6, 2)));
        assert!(room.is_border(Position::new(9, 4)));
        assert!(!room.is_border(Position::new(5, 4)));
        assert!(!room.is_border(Position::new(20, 20)));
        assert!(room.interior_contains(Position::new(8, 6)));
        assert!(!room.interior_contains(Position::new(3, 4)));
        assert!(room.interior_contains(room.center()));
    }

    #[test]
    fn test_room_overlap_with_margin() {
        let left = Room::new(0, Position::new(0, 0), 6, 6, RoomType::Normal);
        let adjoining = Room::new(1, Position::new(6, 2), 4, 4, RoomType::Normal);
        let gapped = Room::new(2, Position::new(7, 0), 4, 4, RoomType::Normal);
        let inside = Room::new(3, Position::new(1, 1), 4, 4, RoomType::Normal);

        assert!(!left.overlaps(&adjoining));
        assert!(left.overlaps_with_margin(&adjoining, 1));
        assert!(!left.overlaps_with_margin(&gapped, 1));
        assert!(left.overlaps(&inside));
        assert!(inside.overlaps(&left));
    }

    #[test]
    fn test_floor_positions_cover_the_interior() {
        let room = Room::new(0, Position::new(1, 1), 5, 4, RoomType::Normal);

        let floor = room.floor_positions();
        assert_eq!(floor.len(), 6);
        assert_eq!(floor[0], Position::new(2, 2));
        assert_eq!(floor[5], Position::new(4, 3));
        assert!(floor.iter().all(|pos| room.interior_contains(*pos)));

        let unique: HashSet<_> = floor.into_iter().collect();
        assert_eq!(unique.len(), 6);
    }

    #[test]
    fn test_connections_are_deduplicated() {
        let mut room = Room::new(4, Position::new(0, 0), 5, 5, RoomType::Start);
        room.add_connection(1);
        room.add_connection(0);
        room.add_connection(1);
        assert_eq!(room.connections, vec![1, 0]);
    }
}
