//! Test fixtures and helpers.
//!
//! Hand-built game states on small open-sea maps, so tests can place ships
//! and structures exactly where a scenario needs them instead of relying on
//! map generation.

use fixed::types::I32F32;

use broadside_core::data::GameRules;
use broadside_core::engine::GameEngine;
use broadside_core::grid::{Grid, TileKind};
use broadside_core::hex::HexCoord;
use broadside_core::ids::{PlayerId, StructureId, UnitId};
use broadside_core::players::{Player, PlayerKind};
use broadside_core::state::GameState;
use broadside_core::structures::Structure;
use broadside_core::units::{Unit, UnitKind};

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point ratio `numerator / denominator`.
#[must_use]
pub fn ratio(numerator: i32, denominator: i32) -> I32F32 {
    I32F32::from_num(numerator) / I32F32::from_num(denominator)
}

/// Shorthand for [`HexCoord::new`].
#[must_use]
pub const fn hex(q: i32, r: i32) -> HexCoord {
    HexCoord::new(q, r)
}

/// A straight path of `steps` cells east of `start`, including `start`.
#[must_use]
pub fn east(start: HexCoord, steps: i32) -> Vec<HexCoord> {
    (0..=steps).map(|i| hex(start.q + i, start.r)).collect()
}

/// Builder for hand-placed scenarios.
///
/// The map is a hexagon of sea around the origin. Players receive ids in
/// the order they are added, starting from zero. Ships and structures are
/// numbered in the order they are added, starting from one; use [`ship_id`]
/// and [`structure_id`] to name them by zero-based position.
#[derive(Debug, Clone)]
pub struct ScenarioBuilder {
    seed: u64,
    radius: u32,
    rules: GameRules,
    players: Vec<(String, PlayerKind)>,
    land: Vec<HexCoord>,
    ships: Vec<(PlayerId, HexCoord)>,
    harbors: Vec<HexCoord>,
    shipyards: Vec<(PlayerId, HexCoord)>,
    coves: Vec<HexCoord>,
}

impl Default for ScenarioBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioBuilder {
    /// Empty radius-5 map with default rules and seed 42.
    #[must_use]
    pub fn new() -> Self {
        Self {
            seed: 42,
            radius: 5,
            rules: GameRules::default(),
            players: Vec::new(),
            land: Vec::new(),
            ships: Vec::new(),
            harbors: Vec::new(),
            shipyards: Vec::new(),
            coves: Vec::new(),
        }
    }

    /// Two human players, "Anne" and "Mary".
    #[must_use]
    pub fn duel() -> Self {
        Self::new().human("Anne").human("Mary")
    }

    /// Two AI players.
    #[must_use]
    pub fn ai_duel() -> Self {
        Self::new().ai("Drake").ai("Morgan")
    }

    /// Set the game seed.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the map radius.
    #[must_use]
    pub fn radius(mut self, radius: u32) -> Self {
        self.radius = radius;
        self
    }

    /// Replace the rules.
    #[must_use]
    pub fn rules(mut self, rules: GameRules) -> Self {
        self.rules = rules;
        self
    }

    /// Add a human player.
    #[must_use]
    pub fn human(mut self, name: &str) -> Self {
        self.players.push((name.to_string(), PlayerKind::Human));
        self
    }

    /// Add an AI player.
    #[must_use]
    pub fn ai(mut self, name: &str) -> Self {
        self.players.push((name.to_string(), PlayerKind::Ai));
        self
    }

    /// Turn a cell into land.
    #[must_use]
    pub fn land(mut self, at: HexCoord) -> Self {
        self.land.push(at);
        self
    }

    /// Place a standard ship.
    #[must_use]
    pub fn ship(mut self, owner: u32, at: HexCoord) -> Self {
        self.ships.push((PlayerId(owner), at));
        self
    }

    /// Place a pirate ship.
    #[must_use]
    pub fn pirate(mut self, at: HexCoord) -> Self {
        self.ships.push((PlayerId::PIRATE, at));
        self
    }

    /// Place a neutral harbor.
    #[must_use]
    pub fn harbor(mut self, at: HexCoord) -> Self {
        self.harbors.push(at);
        self
    }

    /// Place a registered shipyard.
    #[must_use]
    pub fn shipyard(mut self, owner: u32, at: HexCoord) -> Self {
        self.shipyards.push((PlayerId(owner), at));
        self
    }

    /// Place a pirate cove.
    #[must_use]
    pub fn cove(mut self, at: HexCoord) -> Self {
        self.coves.push(at);
        self
    }

    /// Build the state.
    ///
    /// # Panics
    ///
    /// Panics if a placement lies off the map.
    #[must_use]
    pub fn build(self) -> GameState {
        let mut grid = Grid::hexagon(self.radius);
        for &at in &self.land {
            assert!(grid.set_kind(at, TileKind::Land), "{at} is off the map");
        }
        let sites = self
            .harbors
            .iter()
            .chain(self.shipyards.iter().map(|(_, at)| at))
            .chain(&self.coves);
        for &at in sites {
            assert!(grid.set_kind(at, TileKind::Harbor), "{at} is off the map");
        }
        for &at in &self.coves {
            grid.add_pirate_cove(at);
        }

        let mut state = GameState::new(self.seed, grid, self.rules);
        for (i, (name, kind)) in self.players.into_iter().enumerate() {
            let id = PlayerId(i as u32);
            let gold = state.rules.starting_gold;
            state.players.insert(id, Player::new(id, name, kind, gold));
        }

        for (owner, at) in self.ships {
            assert!(state.grid.contains(at), "{at} is off the map");
            let (kind, stats) = if owner.is_pirate() {
                (UnitKind::PirateShip, state.rules.pirate)
            } else {
                (UnitKind::Ship, state.rules.ship)
            };
            state
                .units
                .insert_with(|id| Unit::new(id, owner, kind, at, stats));
        }

        for at in self.harbors {
            state.structures.insert_with(|id| Structure::harbor(id, at));
        }
        for (owner, at) in self.shipyards {
            let stats = state.rules.structures;
            let id = state.structures.insert_with(|id| {
                let mut yard = Structure::harbor(id, at);
                yard.claim(owner, &stats);
                yard
            });
            state.construction.register_shipyard(id);
        }
        for at in self.coves {
            state
                .structures
                .insert_with(|id| Structure::pirate_cove(id, at));
        }

        state
    }

    /// Build the state and wrap it in an engine.
    #[must_use]
    pub fn engine(self) -> GameEngine {
        GameEngine::from_state(self.build())
    }
}

/// Id of the ship added at zero-based position `n`.
#[must_use]
pub const fn ship_id(n: u64) -> UnitId {
    UnitId(n + 1)
}

/// Id of the structure at zero-based position `n`.
///
/// Harbors are numbered first, then shipyards, then coves.
#[must_use]
pub const fn structure_id(n: u64) -> StructureId {
    StructureId(n + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use broadside_core::structures::StructureKind;

    #[test]
    fn test_builder_places_everything() {
        let state = ScenarioBuilder::duel()
            .land(hex(0, -2))
            .ship(0, hex(0, 0))
            .ship(1, hex(2, 0))
            .pirate(hex(-2, 0))
            .harbor(hex(1, -2))
            .shipyard(0, hex(-1, -1))
            .cove(hex(0, 3))
            .build();

        assert_eq!(state.players.len(), 2);
        assert_eq!(state.units.len(), 3);
        assert_eq!(state.pirate_count(), 1);
        assert_eq!(state.grid.kind(hex(0, -2)), Some(TileKind::Land));
        assert_eq!(state.shipyard_count(PlayerId(0)), 1);
        assert!(state.construction.is_registered(structure_id(1)));
        assert_eq!(
            state.structures.get(structure_id(2)).map(|s| s.kind),
            Some(StructureKind::PirateCove)
        );
        assert_eq!(state.grid.pirate_coves(), &[hex(0, 3)]);
    }

    #[test]
    fn test_east_path() {
        assert_eq!(east(hex(-1, 2), 2), vec![hex(-1, 2), hex(0, 2), hex(1, 2)]);
    }
}
