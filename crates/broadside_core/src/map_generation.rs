//! Seeded procedural archipelago generation.
//!
//! Builds a hexagonal sea, grows islands from random seed tiles, marks a
//! share of the coastline as harbors and assigns every player a start
//! island with a shipyard site and spawn cells. The same config always
//! produces the same grid.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GameError, Result};
use crate::grid::{Grid, IslandId, StartIsland, Tile, TileKind};
use crate::hex::HexCoord;
use crate::ids::PlayerId;
use crate::math::{fixed_serde, percent, Fixed};

/// Attempts at placing a single island before giving up.
const ISLAND_ATTEMPTS: u32 = 64;

/// Map configuration for procedural generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapConfig {
    /// Random seed for deterministic generation.
    pub seed: u64,
    /// Minimum number of tiles in the map hexagon.
    pub num_sea_tiles: u32,
    /// Islands to grow.
    pub num_islands: u32,
    /// Smallest island, in land tiles.
    pub min_island_size: u32,
    /// Largest island, in land tiles.
    pub max_island_size: u32,
    /// Players needing a start island.
    pub num_players: u32,
    /// Initial ships per player.
    pub spawns_per_player: u32,
    /// Chance that a coastal sea tile becomes a harbor.
    #[serde(with = "fixed_serde")]
    pub harbor_chance: Fixed,
    /// Pirate coves to place on islands nobody starts on.
    pub pirate_coves: u32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            num_sea_tiles: 400,
            num_islands: 8,
            min_island_size: 4,
            max_island_size: 9,
            num_players: 2,
            spawns_per_player: 2,
            harbor_chance: percent(40),
            pirate_coves: 1,
        }
    }
}

impl MapConfig {
    /// A compact map for quick games and tests.
    #[must_use]
    pub fn small() -> Self {
        Self {
            num_sea_tiles: 170,
            num_islands: 4,
            min_island_size: 3,
            max_island_size: 6,
            ..Default::default()
        }
    }

    /// A map with room for four players.
    #[must_use]
    pub fn large() -> Self {
        Self {
            num_sea_tiles: 900,
            num_islands: 14,
            num_players: 4,
            pirate_coves: 3,
            ..Default::default()
        }
    }

    /// Set the random seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the number of players.
    #[must_use]
    pub const fn with_players(mut self, players: u32) -> Self {
        self.num_players = players;
        self
    }

    /// Set the island count and size range.
    #[must_use]
    pub const fn with_islands(mut self, count: u32, min_size: u32, max_size: u32) -> Self {
        self.num_islands = count;
        self.min_island_size = min_size;
        self.max_island_size = max_size;
        self
    }

    /// Set the harbor chance.
    #[must_use]
    pub fn with_harbor_chance(mut self, chance: Fixed) -> Self {
        self.harbor_chance = chance.clamp(Fixed::ZERO, Fixed::ONE);
        self
    }

    /// Set the number of pirate coves.
    #[must_use]
    pub const fn with_pirate_coves(mut self, coves: u32) -> Self {
        self.pirate_coves = coves;
        self
    }

    /// Hexagon radius needed to hold `num_sea_tiles`.
    #[must_use]
    pub fn radius(&self) -> u32 {
        radius_for_tiles(self.num_sea_tiles)
    }

    fn check(&self) -> Result<()> {
        let fail = |msg: String| Err(GameError::MapGeneration(msg));
        if self.num_players == 0 {
            return fail("at least one player is required".to_string());
        }
        if self.num_islands < self.num_players {
            return fail(format!(
                "{} islands cannot host {} players",
                self.num_islands, self.num_players
            ));
        }
        if self.min_island_size == 0 || self.min_island_size > self.max_island_size {
            return fail(format!(
                "invalid island size range {}..={}",
                self.min_island_size, self.max_island_size
            ));
        }
        if self.spawns_per_player == 0 {
            return fail("spawns_per_player must be positive".to_string());
        }
        Ok(())
    }
}

/// Smallest radius `R` with `3R(R+1) + 1 >= tiles`.
#[must_use]
pub fn radius_for_tiles(tiles: u32) -> u32 {
    let mut radius = 0u32;
    while 3 * u64::from(radius) * u64::from(radius + 1) + 1 < u64::from(tiles) {
        radius += 1;
    }
    radius
}

/// Generate a grid from the config.
///
/// # Errors
///
/// Returns [`GameError::MapGeneration`] when the config is inconsistent or
/// when islands or start sites cannot be placed. The failure is not retried.
pub fn generate(config: &MapConfig) -> Result<Grid> {
    config.check()?;

    let radius = config.radius().max(3);
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut grid = Grid::hexagon(radius);

    let islands = grow_islands(&mut grid, config, radius, &mut rng)?;
    fill_enclosed_water(&mut grid, radius);
    place_harbors(&mut grid, config, &mut rng);

    let starts = choose_start_islands(&islands, config.num_players as usize, &mut rng);
    let mut reserved: BTreeSet<HexCoord> = BTreeSet::new();
    for (index, island) in starts.iter().enumerate() {
        let player = PlayerId::new(index as u32);
        let start = build_start_site(&mut grid, *island, config, &reserved, &mut rng)?;
        reserved.insert(start.shipyard);
        reserved.extend(start.spawns.iter().copied());
        grid.set_start_island(player, start);
    }

    let start_set: BTreeSet<IslandId> = starts.iter().copied().collect();
    let mut placed = 0;
    for island in islands.keys().filter(|i| !start_set.contains(i)) {
        if placed >= config.pirate_coves {
            break;
        }
        if let Some(site) = harbor_site(&mut grid, *island, &reserved, &mut rng) {
            reserved.insert(site);
            grid.add_pirate_cove(site);
            placed += 1;
        }
    }

    debug!(
        "Generated map: seed {}, radius {}, {} islands, {} harbors, {} coves",
        config.seed,
        radius,
        islands.len(),
        grid.coords_of(TileKind::Harbor).len(),
        placed
    );
    Ok(grid)
}

/// Grow every island. Returns the land tiles of each, keyed by island.
fn grow_islands(
    grid: &mut Grid,
    config: &MapConfig,
    radius: u32,
    rng: &mut ChaCha8Rng,
) -> Result<BTreeMap<IslandId, Vec<HexCoord>>> {
    // Land stays off the outer ring so the sea around the map is connected
    let interior: Vec<HexCoord> = HexCoord::ORIGIN.range(radius.saturating_sub(1));
    let mut islands = BTreeMap::new();

    for index in 0..config.num_islands {
        let id = IslandId(index);
        let target = rng.gen_range(config.min_island_size..=config.max_island_size) as usize;
        let mut placed = None;

        for _ in 0..ISLAND_ATTEMPTS {
            let seed = interior[rng.gen_range(0..interior.len())];
            if !can_be_land(grid, seed, radius) {
                continue;
            }
            let tiles = grow_one(grid, seed, target, radius, rng);
            if tiles.len() >= config.min_island_size as usize {
                placed = Some(tiles);
                break;
            }
        }

        let tiles = placed.ok_or_else(|| {
            GameError::MapGeneration(format!("could not place island {index} of {}", config.num_islands))
        })?;
        for coord in &tiles {
            grid.insert(Tile::land(*coord, id));
        }
        islands.insert(id, tiles);
    }

    Ok(islands)
}

/// A sea tile inside the margin with no land around it.
fn can_be_land(grid: &Grid, coord: HexCoord, radius: u32) -> bool {
    coord.length() < radius
        && grid.kind(coord) == Some(TileKind::Sea)
        && !grid.borders_land(coord)
}

fn grow_one(
    grid: &Grid,
    seed: HexCoord,
    target: usize,
    radius: u32,
    rng: &mut ChaCha8Rng,
) -> Vec<HexCoord> {
    let mut tiles = vec![seed];
    let mut members: BTreeSet<HexCoord> = BTreeSet::from([seed]);

    while tiles.len() < target {
        let frontier: BTreeSet<HexCoord> = tiles
            .iter()
            .flat_map(|t| t.neighbors())
            .filter(|n| !members.contains(n) && can_be_land(grid, *n, radius))
            .collect();
        if frontier.is_empty() {
            break;
        }
        let pick = rng.gen_range(0..frontier.len());
        if let Some(next) = frontier.into_iter().nth(pick) {
            members.insert(next);
            tiles.push(next);
        }
    }

    tiles
}

/// Turn sea pockets unreachable from the outer ring into land.
fn fill_enclosed_water(grid: &mut Grid, radius: u32) {
    let mut reached: BTreeSet<HexCoord> = BTreeSet::new();
    let mut queue: VecDeque<HexCoord> = HexCoord::ORIGIN.ring(radius).into_iter().collect();
    reached.extend(queue.iter().copied());

    while let Some(current) = queue.pop_front() {
        for next in grid.navigable_neighbors(current) {
            if reached.insert(next) {
                queue.push_back(next);
            }
        }
    }

    let pockets: Vec<HexCoord> = grid
        .tiles()
        .filter(|t| t.kind.is_navigable() && !reached.contains(&t.coord))
        .map(|t| t.coord)
        .collect();
    for coord in pockets {
        let island = neighbor_island(grid, coord).unwrap_or(IslandId(0));
        grid.insert(Tile::land(coord, island));
    }
}

/// Island of the first land neighbor, in direction order.
fn neighbor_island(grid: &Grid, coord: HexCoord) -> Option<IslandId> {
    coord
        .neighbors()
        .iter()
        .filter_map(|n| grid.tile(*n))
        .find(|t| t.kind == TileKind::Land)
        .and_then(|t| t.island)
}

fn place_harbors(grid: &mut Grid, config: &MapConfig, rng: &mut ChaCha8Rng) {
    let coastal: Vec<HexCoord> = grid
        .tiles()
        .filter(|t| t.kind == TileKind::Sea && grid.borders_land(t.coord))
        .map(|t| t.coord)
        .collect();

    for coord in coastal {
        // Uniform fraction in [0, 1)
        let roll = Fixed::from_bits(i64::from(rng.gen::<u32>()));
        if roll < config.harbor_chance {
            let island = neighbor_island(grid, coord);
            grid.insert(Tile::harbor(coord, island));
        }
    }
}

/// Pick start islands spread across the map (farthest-point selection).
fn choose_start_islands(
    islands: &BTreeMap<IslandId, Vec<HexCoord>>,
    count: usize,
    rng: &mut ChaCha8Rng,
) -> Vec<IslandId> {
    let anchors: Vec<(IslandId, HexCoord)> = islands
        .iter()
        .filter_map(|(id, tiles)| tiles.first().map(|c| (*id, *c)))
        .collect();
    if anchors.is_empty() || count == 0 {
        return Vec::new();
    }

    let mut chosen = vec![anchors[rng.gen_range(0..anchors.len())]];
    while chosen.len() < count {
        let next = anchors
            .iter()
            .filter(|(id, _)| chosen.iter().all(|(c, _)| c != id))
            .max_by_key(|(id, anchor)| {
                let nearest = chosen
                    .iter()
                    .map(|(_, c)| c.distance(*anchor))
                    .min()
                    .unwrap_or(0);
                // Prefer the lower id on ties
                (nearest, std::cmp::Reverse(*id))
            });
        match next {
            Some(pick) => chosen.push(*pick),
            None => break,
        }
    }

    chosen.into_iter().map(|(id, _)| id).collect()
}

/// Navigable tiles bordering an island.
fn coast_of(grid: &Grid, island: IslandId) -> Vec<HexCoord> {
    grid.tiles()
        .filter(|t| t.kind.is_navigable())
        .filter(|t| {
            t.coord.neighbors().iter().any(|n| {
                grid.tile(*n)
                    .is_some_and(|nt| nt.kind == TileKind::Land && nt.island == Some(island))
            })
        })
        .map(|t| t.coord)
        .collect()
}

/// A harbor on the island's coast, promoting a coastal tile if none exists.
fn harbor_site(
    grid: &mut Grid,
    island: IslandId,
    reserved: &BTreeSet<HexCoord>,
    rng: &mut ChaCha8Rng,
) -> Option<HexCoord> {
    let coast: Vec<HexCoord> = coast_of(grid, island)
        .into_iter()
        .filter(|c| !reserved.contains(c) && !reserved.iter().any(|r| r.is_adjacent(*c)))
        .collect();
    let harbors: Vec<HexCoord> = coast
        .iter()
        .copied()
        .filter(|c| grid.kind(*c) == Some(TileKind::Harbor))
        .collect();

    let site = if harbors.is_empty() {
        *coast.get(rng.gen_range(0..coast.len().max(1)))?
    } else {
        harbors[rng.gen_range(0..harbors.len())]
    };
    grid.insert(Tile::harbor(site, Some(island)));
    Some(site)
}

fn build_start_site(
    grid: &mut Grid,
    island: IslandId,
    config: &MapConfig,
    reserved: &BTreeSet<HexCoord>,
    rng: &mut ChaCha8Rng,
) -> Result<StartIsland> {
    let shipyard = harbor_site(grid, island, reserved, rng).ok_or_else(|| {
        GameError::MapGeneration(format!("island {} has no usable harbor site", island.0))
    })?;

    let spawns: Vec<HexCoord> = grid
        .navigable_neighbors(shipyard)
        .into_iter()
        .filter(|c| !reserved.contains(c))
        .take(config.spawns_per_player as usize)
        .collect();
    if spawns.is_empty() {
        return Err(GameError::MapGeneration(format!(
            "shipyard at {shipyard} has no free spawn cells"
        )));
    }

    Ok(StartIsland {
        island,
        shipyard,
        spawns,
    })
}
