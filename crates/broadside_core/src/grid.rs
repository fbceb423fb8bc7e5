//! Hex grid model: tile classification and map-wide lookups.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::hex::HexCoord;
use crate::ids::PlayerId;

/// Identifier of a generated land mass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IslandId(pub u32);

/// Tile classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TileKind {
    /// Open water.
    #[default]
    Sea,
    /// Island interior. Ships may not enter.
    Land,
    /// Water cell on a coastline where a structure can stand.
    Harbor,
}

impl TileKind {
    /// Whether ships may occupy this tile.
    #[must_use]
    pub const fn is_navigable(self) -> bool {
        !matches!(self, Self::Land)
    }
}

/// A single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    /// Position of this tile.
    pub coord: HexCoord,
    /// Classification.
    pub kind: TileKind,
    /// Island the tile belongs to (land) or borders (harbor).
    pub island: Option<IslandId>,
}

impl Tile {
    /// Create a sea tile.
    #[must_use]
    pub const fn sea(coord: HexCoord) -> Self {
        Self {
            coord,
            kind: TileKind::Sea,
            island: None,
        }
    }

    /// Create a land tile belonging to an island.
    #[must_use]
    pub const fn land(coord: HexCoord, island: IslandId) -> Self {
        Self {
            coord,
            kind: TileKind::Land,
            island: Some(island),
        }
    }

    /// Create a harbor tile bordering an island.
    #[must_use]
    pub const fn harbor(coord: HexCoord, island: Option<IslandId>) -> Self {
        Self {
            coord,
            kind: TileKind::Harbor,
            island,
        }
    }
}

/// A player's starting site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartIsland {
    /// Island the player starts on.
    pub island: IslandId,
    /// Harbor that becomes the player's first shipyard.
    pub shipyard: HexCoord,
    /// Ordered spawn cells for the initial fleet.
    pub spawns: Vec<HexCoord>,
}

/// Serde support for coordinate-keyed tile maps.
///
/// Serializes the map as a plain sequence of tiles so the grid stays
/// encodable by formats that only accept string map keys.
mod tile_map_serde {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Tile;
    use crate::hex::HexCoord;

    pub fn serialize<S>(value: &BTreeMap<HexCoord, Tile>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let tiles: Vec<&Tile> = value.values().collect();
        tiles.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<HexCoord, Tile>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let tiles = Vec::<Tile>::deserialize(deserializer)?;
        Ok(tiles.into_iter().map(|t| (t.coord, t)).collect())
    }
}

/// The world map.
///
/// Tiles are keyed by coordinate (one tile per coordinate) and iterate in
/// coordinate order, so every map-wide scan is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Grid {
    #[serde(with = "tile_map_serde")]
    tiles: BTreeMap<HexCoord, Tile>,
    start_islands: Vec<(PlayerId, StartIsland)>,
    pirate_coves: Vec<HexCoord>,
}

impl Grid {
    /// Create an empty grid.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a hexagon of sea tiles of the given radius around the origin.
    #[must_use]
    pub fn hexagon(radius: u32) -> Self {
        let mut grid = Self::new();
        for coord in HexCoord::ORIGIN.range(radius) {
            grid.insert(Tile::sea(coord));
        }
        grid
    }

    /// Insert or replace a tile.
    pub fn insert(&mut self, tile: Tile) {
        self.tiles.insert(tile.coord, tile);
    }

    /// Change the classification of an existing tile.
    ///
    /// Returns `false` if the coordinate is off the map.
    pub fn set_kind(&mut self, coord: HexCoord, kind: TileKind) -> bool {
        match self.tiles.get_mut(&coord) {
            Some(tile) => {
                tile.kind = kind;
                true
            }
            None => false,
        }
    }

    /// Tile at a coordinate.
    #[must_use]
    pub fn tile(&self, coord: HexCoord) -> Option<&Tile> {
        self.tiles.get(&coord)
    }

    /// Mutable tile at a coordinate.
    pub fn tile_mut(&mut self, coord: HexCoord) -> Option<&mut Tile> {
        self.tiles.get_mut(&coord)
    }

    /// Classification at a coordinate, `None` if off the map.
    #[must_use]
    pub fn kind(&self, coord: HexCoord) -> Option<TileKind> {
        self.tiles.get(&coord).map(|t| t.kind)
    }

    /// Whether the coordinate is on the map.
    #[must_use]
    pub fn contains(&self, coord: HexCoord) -> bool {
        self.tiles.contains_key(&coord)
    }

    /// Whether a ship may occupy the coordinate.
    #[must_use]
    pub fn is_navigable(&self, coord: HexCoord) -> bool {
        self.kind(coord).is_some_and(TileKind::is_navigable)
    }

    /// Navigable neighbors of a coordinate, in direction order.
    #[must_use]
    pub fn navigable_neighbors(&self, coord: HexCoord) -> Vec<HexCoord> {
        coord
            .neighbors()
            .into_iter()
            .filter(|n| self.is_navigable(*n))
            .collect()
    }

    /// Whether any neighbor of the coordinate is land.
    #[must_use]
    pub fn borders_land(&self, coord: HexCoord) -> bool {
        coord
            .neighbors()
            .iter()
            .any(|n| self.kind(*n) == Some(TileKind::Land))
    }

    /// Iterate over all tiles in coordinate order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    /// Coordinates of every tile of the given kind, sorted.
    #[must_use]
    pub fn coords_of(&self, kind: TileKind) -> Vec<HexCoord> {
        self.tiles
            .values()
            .filter(|t| t.kind == kind)
            .map(|t| t.coord)
            .collect()
    }

    /// Number of tiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether the grid has no tiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Record a player's starting site (replaces any previous one).
    pub fn set_start_island(&mut self, player: PlayerId, start: StartIsland) {
        self.start_islands.retain(|(p, _)| *p != player);
        self.start_islands.push((player, start));
        self.start_islands.sort_by_key(|(p, _)| *p);
    }

    /// A player's starting site.
    #[must_use]
    pub fn start_island(&self, player: PlayerId) -> Option<&StartIsland> {
        self.start_islands
            .iter()
            .find(|(p, _)| *p == player)
            .map(|(_, s)| s)
    }

    /// All starting sites in player order.
    pub fn start_islands(&self) -> impl Iterator<Item = (PlayerId, &StartIsland)> {
        self.start_islands.iter().map(|(p, s)| (*p, s))
    }

    /// Record a pirate cove location.
    pub fn add_pirate_cove(&mut self, coord: HexCoord) {
        if !self.pirate_coves.contains(&coord) {
            self.pirate_coves.push(coord);
            self.pirate_coves.sort_unstable();
        }
    }

    /// Pirate cove locations, sorted.
    #[must_use]
    pub fn pirate_coves(&self) -> &[HexCoord] {
        &self.pirate_coves
    }
}
