//! # Dungeon Generation
//!
//! Room-and-corridor layout generation.
//!
//! The generator:
//! 1. Places rooms randomly with a one-tile gap between wall rings
//! 2. Joins them with a minimum spanning tree of L-shaped corridors, plus a
//!    few extra loops
//! 3. Picks the start room and the descent room farthest from it
//! 4. Applies biome palette variants and hands the level to the populators

use crate::generation::{
    EncounterGenerator, GenerationConfig, Generator, ItemGenerator, Populator, Room, RoomType,
};
use crate::{DelveError, DelveResult, Level, Position, RandomStream, Tile, TileType};
use ::pathfinding::prelude::dijkstra_all;
use log::{debug, info, warn};
use noise::{NoiseFn, Perlin};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use std::cmp::Reverse;

/// Scale applied to tile coordinates before sampling palette noise.
const PALETTE_NOISE_SCALE: f64 = 0.15;

/// Primary dungeon generator using the room-and-corridor algorithm.
#[derive(Debug, Clone, Default)]
pub struct RoomCorridorGenerator {
    pub encounters: EncounterGenerator,
    pub loot: ItemGenerator,
}

/// Rooms and the grid size they were laid out on.
#[derive(Debug, Clone)]
struct Layout {
    width: u32,
    height: u32,
    rooms: Vec<Room>,
}

impl RoomCorridorGenerator {
    /// Creates a new dungeon generator with default populators.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::{GenerationConfig, Generator, RandomStream, RoomCorridorGenerator};
    ///
    /// let generator = RoomCorridorGenerator::new();
    /// let mut rng = RandomStream::new(3);
    /// let level = generator.generate(&GenerationConfig::for_testing(), &mut rng).unwrap();
    /// assert!(!level.rooms.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Lays out rooms, lowering the target count after each failed attempt.
    fn plan_layout(&self, config: &GenerationConfig, rng: &mut RandomStream) -> Layout {
        let (min_rooms, max_rooms) = config.room_count_range;
        let mut target = rng.gen_range(min_rooms..=max_rooms);
        let attempts = config.max_layout_retries.max(1);

        for attempt in 1..=attempts {
            match self.try_layout(config, target, rng) {
                Ok(rooms) => {
                    debug!(
                        "Placed {} rooms on layout attempt {}/{}",
                        rooms.len(),
                        attempt,
                        attempts
                    );
                    return Layout {
                        width: config.width,
                        height: config.height,
                        rooms,
                    };
                }
                Err(err) => {
                    warn!("Room placement fell short of {} rooms: {}", target, err);
                    target = target.saturating_sub(1).max(min_rooms);
                }
            }
        }

        warn!("{}", DelveError::GenerationExhausted { attempts });
        self.chain_layout(config)
    }

    /// One rejection-sampling pass. Fails if fewer than `target` rooms fit.
    fn try_layout(
        &self,
        config: &GenerationConfig,
        target: u32,
        rng: &mut RandomStream,
    ) -> DelveResult<Vec<Room>> {
        let mut rooms: Vec<Room> = Vec::with_capacity(target as usize);
        let mut failed_rooms = 0;

        for _ in 0..target {
            match self.try_place_room(config, rng, rooms.len() as u32, &rooms) {
                Some(room) => rooms.push(room),
                None => failed_rooms += 1,
            }
        }

        if failed_rooms > 0 {
            return Err(DelveError::GenerationExhausted {
                attempts: config.max_placement_attempts * failed_rooms,
            });
        }

        Ok(rooms)
    }

    /// Attempts to place a single room.
    fn try_place_room(
        &self,
        config: &GenerationConfig,
        rng: &mut RandomStream,
        room_id: u32,
        existing_rooms: &[Room],
    ) -> Option<Room> {
        let (min_size, max_size) = config.room_size_range;

        for _ in 0..config.max_placement_attempts {
            let width = rng.gen_range(min_size..=max_size);
            let height = rng.gen_range(min_size..=max_size);
            let x = rng.gen_range(0..=config.width - width) as i32;
            let y = rng.gen_range(0..=config.height - height) as i32;

            let mut room = Room::new(room_id, Position::new(x, y), width, height, RoomType::Normal);
            room.biome = config.biome;

            if existing_rooms
                .iter()
                .all(|existing| !room.overlaps_with_margin(existing, 1))
            {
                return Some(room);
            }
        }

        None
    }

    /// Minimum-size rooms in a single row, widening the grid if needed.
    fn chain_layout(&self, config: &GenerationConfig) -> Layout {
        let (min_rooms, _) = config.room_count_range;
        let size = config.room_size_range.0;
        let stride = size + 1;

        let width = config.width.max(min_rooms * stride + 1);
        let height = config.height.max(size + 2);
        let rooms = (0..min_rooms)
            .map(|id| {
                let mut room = Room::new(
                    id,
                    Position::new((1 + id * stride) as i32, 1),
                    size,
                    size,
                    RoomType::Normal,
                );
                room.biome = config.biome;
                room
            })
            .collect();

        info!(
            "Using chain layout of {} rooms on a {}x{} grid",
            min_rooms, width, height
        );
        Layout {
            width,
            height,
            rooms,
        }
    }

    /// Carves out a room in the level by setting interior tiles to floor.
    fn carve_room(&self, level: &mut Level, room: &Room) -> DelveResult<()> {
        for pos in room.floor_positions() {
            level.set_tile(pos, Tile::floor())?;
        }
        Ok(())
    }

    /// Picks the extra corridors that turn the spanning tree into a graph
    /// with loops.
    fn extra_edges(
        &self,
        rooms: &[Room],
        tree: &[(usize, usize)],
        config: &GenerationConfig,
        rng: &mut RandomStream,
    ) -> Vec<(usize, usize)> {
        let mut edges: Vec<(usize, usize)> = tree.to_vec();
        let mut extra = Vec::new();

        for i in 0..rooms.len() {
            if !rng.chance(config.extra_connection_chance) {
                continue;
            }

            let nearest = (0..rooms.len())
                .filter(|&j| j != i && !has_edge(&edges, i, j))
                .min_by_key(|&j| (rooms[i].center().manhattan_distance(rooms[j].center()), j));

            if let Some(j) = nearest {
                edges.push((i, j));
                extra.push((i, j));
            }
        }

        extra
    }

    /// Carves an L-shaped corridor between two points.
    ///
    /// Wall tiles on a room's wall ring become doors; all other walls become
    /// floor. Already passable tiles are left alone.
    fn carve_l_corridor(
        &self,
        level: &mut Level,
        rooms: &[Room],
        start: Position,
        end: Position,
        horizontal_first: bool,
    ) -> DelveResult<()> {
        let corner = if horizontal_first {
            Position::new(end.x, start.y)
        } else {
            Position::new(start.x, end.y)
        };

        for pos in segment(start, corner).chain(segment(corner, end)) {
            let is_wall = level
                .get_tile(pos)
                .map(|tile| tile.tile_type == TileType::Wall)
                .unwrap_or(false);
            if !is_wall {
                continue;
            }

            let tile_type = if rooms.iter().any(|room| room.is_border(pos)) {
                TileType::Door
            } else {
                TileType::Floor
            };
            level.set_tile(pos, Tile::new(tile_type))?;
        }

        Ok(())
    }

    /// Assigns cosmetic floor variants from Perlin noise.
    fn apply_palette(&self, level: &mut Level, rng: &mut RandomStream) {
        let perlin = Perlin::new(rng.next_u32());
        let variants = level.biome.palette_size().max(1);

        for (y, row) in level.tiles.iter_mut().enumerate() {
            for (x, tile) in row.iter_mut().enumerate() {
                if tile.tile_type != TileType::Floor {
                    continue;
                }
                let sample = perlin.get([
                    x as f64 * PALETTE_NOISE_SCALE,
                    y as f64 * PALETTE_NOISE_SCALE,
                ]);
                let normalized = ((sample + 1.0) / 2.0).clamp(0.0, 1.0);
                tile.variant = ((normalized * variants as f64) as u8).min(variants - 1);
            }
        }
    }
}

impl Generator<Level> for RoomCorridorGenerator {
    fn generate(&self, config: &GenerationConfig, rng: &mut RandomStream) -> DelveResult<Level> {
        config.validate()?;

        let Layout {
            width,
            height,
            mut rooms,
        } = self.plan_layout(config, rng);

        let mut level = Level::new(config.depth, width, height);
        level.biome = config.biome;
        level.difficulty_tier = config.difficulty_tier;
        level.seed = rng.seed();

        for room in &rooms {
            self.carve_room(&mut level, room)?;
        }

        let tree = spanning_tree(&rooms);
        let extra = self.extra_edges(&rooms, &tree, config, rng);
        for &(a, b) in tree.iter().chain(extra.iter()) {
            let horizontal_first = rng.gen_bool(0.5);
            let (from, to) = (rooms[a].center(), rooms[b].center());
            self.carve_l_corridor(&mut level, &rooms, from, to, horizontal_first)?;

            let (id_a, id_b) = (rooms[a].id, rooms[b].id);
            rooms[a].add_connection(id_b);
            rooms[b].add_connection(id_a);
        }

        let descent_index = farthest_room(&rooms, &tree);
        let start_position = rooms[0].center();
        let descent_position = rooms[descent_index]
            .floor_positions()
            .into_iter()
            .filter(|pos| *pos != start_position)
            .collect::<Vec<_>>()
            .choose(rng)
            .copied()
            .ok_or_else(|| {
                DelveError::InvalidState("Descent room has no free floor tile".to_string())
            })?;

        rooms[0].room_type = RoomType::Start;
        if descent_index != 0 {
            rooms[descent_index].room_type = RoomType::Descent;
        }

        level.start_room = rooms[0].id;
        level.start_position = start_position;
        level.descent_room = rooms[descent_index].id;
        level.descent_position = descent_position;
        level.set_tile(descent_position, Tile::new(TileType::StairsDown))?;
        level.rooms = rooms;

        self.apply_palette(&mut level, rng);

        level.spawn_points = self.encounters.populate(&level, config, rng)?;
        level.floor_items = self.loot.populate(&level, config, rng)?;

        self.validate(&level, config)?;

        info!(
            "Generated depth {} ({}, tier {}): {} rooms, {} corridors, {} spawns, {} items",
            level.id,
            level.biome.name(),
            level.difficulty_tier,
            level.rooms.len(),
            tree.len() + extra.len(),
            level.spawn_points.len(),
            level.floor_items.len()
        );

        Ok(level)
    }

    fn validate(&self, level: &Level, _config: &GenerationConfig) -> DelveResult<()> {
        if level.rooms.is_empty() {
            return Err(DelveError::CorruptLevelState(
                "Level has no rooms".to_string(),
            ));
        }

        match level.get_tile(level.descent_position) {
            Some(tile) if tile.tile_type == TileType::StairsDown => {}
            _ => {
                return Err(DelveError::CorruptLevelState(format!(
                    "Descent position {:?} is not a descent tile",
                    level.descent_position
                )))
            }
        }

        if !level.is_passable(level.start_position) {
            return Err(DelveError::CorruptLevelState(format!(
                "Start position {:?} is not passable",
                level.start_position
            )));
        }

        level.validate_connectivity()
    }

    fn generator_type(&self) -> &'static str {
        "RoomCorridorGenerator"
    }
}

/// Inclusive straight run of positions from `from` to `to`.
fn segment(from: Position, to: Position) -> impl Iterator<Item = Position> {
    let dx = (to.x - from.x).signum();
    let dy = (to.y - from.y).signum();
    let steps = from.chebyshev_distance(to) as i32;
    (0..=steps).map(move |i| Position::new(from.x + dx * i, from.y + dy * i))
}

fn has_edge(edges: &[(usize, usize)], a: usize, b: usize) -> bool {
    edges
        .iter()
        .any(|&(x, y)| (x == a && y == b) || (x == b && y == a))
}

/// Prim's algorithm over room centres with Manhattan edge weights.
///
/// Ties are broken by the lower room index so the tree is deterministic.
fn spanning_tree(rooms: &[Room]) -> Vec<(usize, usize)> {
    let n = rooms.len();
    if n < 2 {
        return Vec::new();
    }

    let distance = |a: usize, b: usize| rooms[a].center().manhattan_distance(rooms[b].center());
    let mut in_tree = vec![false; n];
    in_tree[0] = true;
    let mut best: Vec<(u32, usize)> = (0..n).map(|i| (distance(0, i), 0)).collect();
    let mut edges = Vec::with_capacity(n - 1);

    for _ in 1..n {
        let Some(next) = (0..n)
            .filter(|&i| !in_tree[i])
            .min_by_key(|&i| (best[i].0, i))
        else {
            break;
        };

        in_tree[next] = true;
        edges.push((best[next].1, next));

        for i in 0..n {
            if !in_tree[i] {
                let d = distance(next, i);
                if d < best[i].0 {
                    best[i] = (d, next);
                }
            }
        }
    }

    edges
}

/// The room with the most spanning-tree hops from room 0.
///
/// Ties go to the room whose centre is farther from the start, then to the
/// lower index.
fn farthest_room(rooms: &[Room], tree: &[(usize, usize)]) -> usize {
    if rooms.len() < 2 {
        return 0;
    }

    let mut adjacency = vec![Vec::new(); rooms.len()];
    for &(a, b) in tree {
        adjacency[a].push(b);
        adjacency[b].push(a);
    }

    let hops = dijkstra_all(&0usize, |&room| {
        adjacency[room]
            .iter()
            .map(|&next| (next, 1u32))
            .collect::<Vec<_>>()
    });

    let start = rooms[0].center();
    (1..rooms.len())
        .max_by_key(|&i| {
            let hop_count = hops.get(&i).map(|&(_, cost)| cost).unwrap_or(0);
            (
                hop_count,
                start.manhattan_distance(rooms[i].center()),
                Reverse(i),
            )
        })
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{generate_level, Biome};
    use std::collections::HashSet;

    fn row_of_rooms(count: u32) -> Vec<Room> {
        (0..count)
            .map(|id| {
                Room::new(
                    id,
                    Position::new(1 + id as i32 * 7, 1),
                    6,
                    6,
                    RoomType::Normal,
                )
            })
            .collect()
    }

    #[test]
    fn test_generation_with_small_level() {
        let generator = RoomCorridorGenerator::new();
        let config = GenerationConfig::for_testing();
        let mut rng = RandomStream::new(12345);

        let level = generator.generate(&config, &mut rng).unwrap();
        assert_eq!(level.width, config.width);
        assert_eq!(level.height, config.height);
        assert!(level.count_tiles(TileType::Floor) > 0);
        assert_eq!(level.count_tiles(TileType::StairsDown), 1);
        assert!(level.validate_connectivity().is_ok());
    }

    #[test]
    fn test_rooms_keep_a_gap_and_fit_the_grid() {
        let config = GenerationConfig::new();
        for seed in 0..10 {
            let level = generate_level(seed, &config).unwrap();
            for (i, a) in level.rooms.iter().enumerate() {
                assert!(level.is_valid_position(a.top_left));
                assert!(level.is_valid_position(a.bottom_right()));
                for b in &level.rooms[i + 1..] {
                    assert!(!a.overlaps_with_margin(b, 1), "rooms {} and {}", a.id, b.id);
                }
            }
        }
    }

    #[test]
    fn test_start_and_descent_rooms() {
        let config = GenerationConfig::for_testing().with_room_count(3, 6);
        for seed in 0..10 {
            let level = generate_level(seed, &config).unwrap();
            let start = level.room(level.start_room).unwrap();
            let descent = level.room(level.descent_room).unwrap();

            assert_eq!(start.room_type, RoomType::Start);
            assert_eq!(descent.room_type, RoomType::Descent);
            assert_eq!(level.start_position, start.center());
            assert!(descent.interior_contains(level.descent_position));
            assert_ne!(level.start_position, level.descent_position);
        }
    }

    #[test]
    fn test_single_room_level() {
        let config = GenerationConfig::for_testing().with_room_count(1, 1);
        let level = generate_level(8, &config).unwrap();
        assert_eq!(level.rooms.len(), 1);
        assert_eq!(level.start_room, level.descent_room);
        assert_ne!(level.start_position, level.descent_position);
        assert!(level.validate_connectivity().is_ok());
    }

    #[test]
    fn test_crowded_grid_falls_back_to_chain() {
        let config = GenerationConfig {
            width: 12,
            height: 12,
            room_count_range: (5, 5),
            room_size_range: (6, 6),
            max_layout_retries: 2,
            ..GenerationConfig::for_testing()
        };
        let level = generate_level(1, &config).unwrap();
        assert_eq!(level.rooms.len(), 5);
        assert!(level.width >= 36);
        assert!(level.validate_connectivity().is_ok());
    }

    #[test]
    fn test_spanning_tree_connects_every_room() {
        let rooms = row_of_rooms(5);
        let tree = spanning_tree(&rooms);
        assert_eq!(tree.len(), 4);

        let touched: HashSet<usize> = tree.iter().flat_map(|&(a, b)| [a, b]).collect();
        assert_eq!(touched.len(), 5);
        // A row of equally spaced rooms forms a chain
        assert_eq!(tree, vec![(0, 1), (1, 2), (2, 3), (3, 4)]);
        assert_eq!(farthest_room(&rooms, &tree), 4);
    }

    #[test]
    fn test_l_corridor_carving_adds_doors() {
        let generator = RoomCorridorGenerator::new();
        let rooms = row_of_rooms(2);
        let mut level = Level::new(0, 20, 10);
        for room in &rooms {
            generator.carve_room(&mut level, room).unwrap();
        }

        let (from, to) = (rooms[0].center(), rooms[1].center());
        generator
            .carve_l_corridor(&mut level, &rooms, from, to, true)
            .unwrap();

        // Wall rings at x = 6 and x = 8, bare rock at x = 7
        assert_eq!(level.get_tile(Position::new(6, 4)).unwrap().tile_type, TileType::Door);
        assert_eq!(level.get_tile(Position::new(7, 4)).unwrap().tile_type, TileType::Floor);
        assert_eq!(level.get_tile(Position::new(8, 4)).unwrap().tile_type, TileType::Door);

        level.start_position = from;
        level.descent_position = to;
        level.rooms = rooms;
        assert!(level.validate_connectivity().is_ok());
    }

    #[test]
    fn test_palette_stays_in_range() {
        for biome in Biome::all() {
            let config = GenerationConfig::for_testing().with_biome(biome);
            let level = generate_level(21, &config).unwrap();
            assert_eq!(level.biome, biome);
            assert!(level.rooms.iter().all(|room| room.biome == biome));
            assert!(level
                .tiles
                .iter()
                .flatten()
                .all(|tile| tile.variant < biome.palette_size()));
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let generator = RoomCorridorGenerator::new();
        let mut rng = RandomStream::new(1);
        let config = GenerationConfig::new().with_tier(0);
        assert!(matches!(
            generator.generate(&config, &mut rng),
            Err(DelveError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validation() {
        let generator = RoomCorridorGenerator::new();
        let config = GenerationConfig::for_testing();

        let empty_level = Level::new(0, 10, 10);
        assert!(generator.validate(&empty_level, &config).is_err());

        let mut rng = RandomStream::new(99);
        let level = generator.generate(&config, &mut rng).unwrap();
        assert!(generator.validate(&level, &config).is_ok());
    }
}
