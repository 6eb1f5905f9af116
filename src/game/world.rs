//! # World Module
//!
//! Level geometry: the tile grid, rooms, spawn points and floor items produced
//! by generation, plus the connectivity invariant every level must keep.

use crate::generation::{Biome, Room, SpawnPoint};
use crate::utils::reachable_from;
use crate::{DelveError, DelveResult, Item, Position};
use serde::{Deserialize, Serialize};

/// Kinds of terrain a tile can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileType {
    /// Open ground
    Floor,
    /// Solid rock; blocks movement and sight
    Wall,
    /// Doorway where a corridor pierces a room wall
    Door,
    /// The descent tile leading to the next level
    StairsDown,
}

impl TileType {
    /// Whether entities can stand on this tile.
    pub fn is_passable(self) -> bool {
        !matches!(self, TileType::Wall)
    }

    /// Whether this tile blocks line of sight.
    pub fn is_opaque(self) -> bool {
        matches!(self, TileType::Wall)
    }
}

/// A single cell of the level grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub tile_type: TileType,
    /// Cosmetic palette variant (0 = plain). Never affects simulation.
    pub variant: u8,
}

impl Tile {
    /// Creates a tile of the given type with the plain palette variant.
    pub fn new(tile_type: TileType) -> Self {
        Self {
            tile_type,
            variant: 0,
        }
    }

    /// Shorthand for a floor tile.
    pub fn floor() -> Self {
        Self::new(TileType::Floor)
    }

    /// Shorthand for a wall tile.
    pub fn wall() -> Self {
        Self::new(TileType::Wall)
    }
}

/// An item lying on the level floor, waiting to be picked up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorItem {
    pub position: Position,
    pub item: Item,
}

/// One generated dungeon level.
///
/// Created once per descent by the generator. After that only
/// [`Level::mutate_tile`] may change terrain, and it refuses changes that
/// would disconnect the level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    /// Depth of this level, starting at 0
    pub id: u32,
    pub width: u32,
    pub height: u32,
    /// Row-major tile grid, indexed `tiles[y][x]`
    pub tiles: Vec<Vec<Tile>>,
    pub rooms: Vec<Room>,
    pub biome: Biome,
    pub difficulty_tier: u32,
    /// Seed the level was generated from
    pub seed: u64,
    pub start_room: u32,
    pub start_position: Position,
    pub descent_room: u32,
    pub descent_position: Position,
    pub spawn_points: Vec<SpawnPoint>,
    pub floor_items: Vec<FloorItem>,
}

impl Level {
    /// Creates a level of solid wall with no rooms.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::{Level, Position, TileType};
    ///
    /// let level = Level::new(0, 20, 10);
    /// assert_eq!(level.get_tile(Position::new(3, 3)).unwrap().tile_type, TileType::Wall);
    /// assert!(level.get_tile(Position::new(20, 0)).is_none());
    /// ```
    pub fn new(id: u32, width: u32, height: u32) -> Self {
        Self {
            id,
            width,
            height,
            tiles: vec![vec![Tile::wall(); width as usize]; height as usize],
            rooms: Vec::new(),
            biome: Biome::Cavern,
            difficulty_tier: 1,
            seed: 0,
            start_room: 0,
            start_position: Position::origin(),
            descent_room: 0,
            descent_position: Position::origin(),
            spawn_points: Vec::new(),
            floor_items: Vec::new(),
        }
    }

    /// Checks whether a position lies inside the grid.
    pub fn is_valid_position(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    /// Gets the tile at a position.
    pub fn get_tile(&self, pos: Position) -> Option<&Tile> {
        if !self.is_valid_position(pos) {
            return None;
        }
        self.tiles
            .get(pos.y as usize)
            .and_then(|row| row.get(pos.x as usize))
    }

    /// Gets the tile at a position mutably.
    pub fn get_tile_mut(&mut self, pos: Position) -> Option<&mut Tile> {
        if !self.is_valid_position(pos) {
            return None;
        }
        self.tiles
            .get_mut(pos.y as usize)
            .and_then(|row| row.get_mut(pos.x as usize))
    }

    /// Sets a tile without checking level invariants.
    ///
    /// Used while a level is being built. Gameplay code must go through
    /// [`Level::mutate_tile`].
    pub fn set_tile(&mut self, pos: Position, tile: Tile) -> DelveResult<()> {
        let slot = self.get_tile_mut(pos).ok_or_else(|| {
            DelveError::InvalidState(format!("Position {:?} is outside the level", pos))
        })?;
        *slot = tile;
        Ok(())
    }

    /// Whether an entity could stand at this position.
    pub fn is_passable(&self, pos: Position) -> bool {
        self.get_tile(pos)
            .map(|tile| tile.tile_type.is_passable())
            .unwrap_or(false)
    }

    /// Whether this position blocks sight. Out-of-bounds counts as opaque.
    pub fn is_opaque(&self, pos: Position) -> bool {
        self.get_tile(pos)
            .map(|tile| tile.tile_type.is_opaque())
            .unwrap_or(true)
    }

    /// Finds the room whose interior contains a position.
    pub fn room_interior_at(&self, pos: Position) -> Option<&Room> {
        self.rooms.iter().find(|room| room.interior_contains(pos))
    }

    /// Gets a room by id.
    pub fn room(&self, id: u32) -> Option<&Room> {
        self.rooms.iter().find(|room| room.id == id)
    }

    /// Counts tiles of a given type.
    pub fn count_tiles(&self, tile_type: TileType) -> usize {
        self.tiles
            .iter()
            .flat_map(|row| row.iter())
            .filter(|tile| tile.tile_type == tile_type)
            .count()
    }

    /// Items lying at a position.
    pub fn items_at(&self, pos: Position) -> impl Iterator<Item = &Item> {
        self.floor_items
            .iter()
            .filter(move |floor_item| floor_item.position == pos)
            .map(|floor_item| &floor_item.item)
    }

    /// Removes and returns every item at a position.
    ///
    /// Ownership moves to the caller; nothing is left behind on the floor.
    pub fn take_items_at(&mut self, pos: Position) -> Vec<Item> {
        let (taken, remaining): (Vec<FloorItem>, Vec<FloorItem>) = self
            .floor_items
            .drain(..)
            .partition(|floor_item| floor_item.position == pos);
        self.floor_items = remaining;
        taken.into_iter().map(|floor_item| floor_item.item).collect()
    }

    /// Drops an item on the floor.
    pub fn place_item(&mut self, position: Position, item: Item) {
        self.floor_items.push(FloorItem { position, item });
    }

    /// Verifies the level's structural invariants.
    ///
    /// Every room interior, the descent tile, every spawn point and every floor
    /// item must be 4-connected to the start position over passable tiles.
    pub fn validate_connectivity(&self) -> DelveResult<()> {
        if !self.is_passable(self.start_position) {
            return Err(DelveError::CorruptLevelState(format!(
                "Start position {:?} is not passable",
                self.start_position
            )));
        }

        let reached = reachable_from(self, self.start_position);

        if !reached.contains(&self.descent_position) {
            return Err(DelveError::CorruptLevelState(format!(
                "Descent tile {:?} is unreachable from the start",
                self.descent_position
            )));
        }

        for room in &self.rooms {
            if let Some(pos) = room
                .floor_positions()
                .into_iter()
                .find(|pos| !reached.contains(pos))
            {
                return Err(DelveError::CorruptLevelState(format!(
                    "Room {} is not connected to the start room (tile {:?})",
                    room.id, pos
                )));
            }
        }

        if let Some(spawn) = self
            .spawn_points
            .iter()
            .find(|spawn| !reached.contains(&spawn.position))
        {
            return Err(DelveError::CorruptLevelState(format!(
                "Spawn point {:?} is unreachable",
                spawn.position
            )));
        }

        if let Some(floor_item) = self
            .floor_items
            .iter()
            .find(|floor_item| !reached.contains(&floor_item.position))
        {
            return Err(DelveError::CorruptLevelState(format!(
                "Floor item at {:?} is unreachable",
                floor_item.position
            )));
        }

        Ok(())
    }

    /// Changes a tile during play, keeping the level connected.
    ///
    /// The change is reverted and `CorruptLevelState` returned if it would
    /// cut any part of the level off from the start.
    pub fn mutate_tile(&mut self, pos: Position, tile: Tile) -> DelveResult<()> {
        let previous = *self.get_tile(pos).ok_or_else(|| {
            DelveError::InvalidState(format!("Position {:?} is outside the level", pos))
        })?;

        self.set_tile(pos, tile)?;
        if let Err(err) = self.validate_connectivity() {
            self.set_tile(pos, previous)?;
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{RoomType, SpawnKind};
    use crate::{EnemyKind, ItemKind};

    /// Two 5x5 rooms joined by a one-tile corridor along y = 3.
    fn two_room_level() -> Level {
        let mut level = Level::new(0, 16, 8);
        let mut left = Room::new(0, Position::new(1, 1), 5, 5, RoomType::Start);
        let mut right = Room::new(1, Position::new(9, 1), 5, 5, RoomType::Descent);
        left.add_connection(1);
        right.add_connection(0);

        for room in [&left, &right] {
            for pos in room.floor_positions() {
                level.set_tile(pos, Tile::floor()).unwrap();
            }
        }
        for x in 4..=10 {
            level.set_tile(Position::new(x, 3), Tile::floor()).unwrap();
        }
        level.set_tile(Position::new(5, 3), Tile::new(TileType::Door)).unwrap();
        level.set_tile(Position::new(9, 3), Tile::new(TileType::Door)).unwrap();

        level.start_position = left.center();
        level.descent_position = Position::new(11, 2);
        level
            .set_tile(level.descent_position, Tile::new(TileType::StairsDown))
            .unwrap();
        level.rooms = vec![left, right];
        level
    }

    #[test]
    fn test_new_level_is_solid() {
        let level = Level::new(3, 12, 6);
        assert_eq!(level.id, 3);
        assert_eq!(level.count_tiles(TileType::Wall), 72);
        assert!(!level.is_passable(Position::new(2, 2)));
        assert!(level.is_opaque(Position::new(-1, 0)));
    }

    #[test]
    fn test_set_tile_out_of_bounds() {
        let mut level = Level::new(0, 5, 5);
        assert!(level.set_tile(Position::new(5, 0), Tile::floor()).is_err());
        assert!(level.set_tile(Position::new(4, 4), Tile::floor()).is_ok());
    }

    #[test]
    fn test_tile_properties() {
        assert!(TileType::Door.is_passable());
        assert!(!TileType::Door.is_opaque());
        assert!(TileType::StairsDown.is_passable());
        assert!(TileType::Wall.is_opaque());
    }

    #[test]
    fn test_connected_level_validates() {
        let level = two_room_level();
        assert!(level.validate_connectivity().is_ok());
        assert_eq!(level.room_interior_at(Position::new(11, 3)).map(|r| r.id), Some(1));
        assert!(level.room_interior_at(Position::new(7, 3)).is_none());
    }

    #[test]
    fn test_disconnected_level_is_corrupt() {
        let mut level = two_room_level();
        level.set_tile(Position::new(7, 3), Tile::wall()).unwrap();
        let err = level.validate_connectivity().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_unreachable_spawn_is_corrupt() {
        let mut level = two_room_level();
        level.spawn_points.push(SpawnPoint {
            kind: SpawnKind::Enemy(EnemyKind::Goblin),
            position: Position::new(0, 0),
        });
        assert!(level.validate_connectivity().is_err());
    }

    #[test]
    fn test_mutate_tile_reverts_disconnection() {
        let mut level = two_room_level();
        let choke = Position::new(7, 3);

        assert!(level.mutate_tile(choke, Tile::wall()).is_err());
        assert_eq!(level.get_tile(choke).unwrap().tile_type, TileType::Floor);

        // Opening extra floor never disconnects anything
        assert!(level.mutate_tile(Position::new(7, 2), Tile::floor()).is_ok());
    }

    #[test]
    fn test_floor_item_pickup_moves_ownership() {
        let mut level = two_room_level();
        let pos = Position::new(2, 2);
        level.place_item(pos, Item::gold(15));
        level.place_item(pos, Item::health_potion(20));
        level.place_item(Position::new(3, 3), Item::gold(5));

        assert_eq!(level.items_at(pos).count(), 2);
        let taken = level.take_items_at(pos);
        assert_eq!(taken.len(), 2);
        assert!(matches!(taken[0].kind, ItemKind::Gold { amount: 15 }));
        assert_eq!(level.items_at(pos).count(), 0);
        assert_eq!(level.floor_items.len(), 1);
    }
}
