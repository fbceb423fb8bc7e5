//! Match lifecycle.
//!
//! [`GameEngine`] owns the [`GameState`] and is the only entry point external
//! collaborators need: start a game from a [`GameSetup`], submit orders and
//! decisions, resolve turns, save and reload.
//!
//! Decisions never arrive through callbacks. A caller that sees
//! [`TurnProgress::AwaitingDecisions`] submits decisions with
//! [`GameEngine::submit_decision`], polls [`GameEngine::decisions_complete`]
//! and calls [`GameEngine::resolve_turn`] again.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ai;
use crate::data::GameRules;
use crate::encounter::{Decision, Encounter, EncounterKind};
use crate::error::{GameError, Result};
use crate::grid::{StartIsland, TileKind};
use crate::hex::HexCoord;
use crate::ids::{PlayerId, UnitId};
use crate::map_generation::{generate, MapConfig};
use crate::orders::Order;
use crate::players::{Player, PlayerKind};
use crate::resolver::{RejectedOrder, TurnProgress, TurnResolver};
use crate::state::{GamePhase, GameState, ResolutionStage};
use crate::structures::Structure;
use crate::units::{Unit, UnitKind};
use crate::validation::{validate, OrderRejection};

/// One seat at the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSetup {
    /// Display name.
    pub name: String,
    /// Who controls the seat.
    pub kind: PlayerKind,
}

impl PlayerSetup {
    /// A human-controlled seat.
    pub fn human(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PlayerKind::Human,
        }
    }

    /// An AI-controlled seat.
    pub fn ai(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PlayerKind::Ai,
        }
    }
}

/// Everything needed to start a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSetup {
    /// Seats in player id order.
    pub players: Vec<PlayerSetup>,
    /// Map parameters. The player count is taken from `players`.
    pub map: MapConfig,
    /// Balance constants.
    pub rules: GameRules,
}

impl GameSetup {
    /// A setup with no players on the given map.
    #[must_use]
    pub fn new(map: MapConfig) -> Self {
        Self {
            players: Vec::new(),
            map,
            rules: GameRules::default(),
        }
    }

    /// All-AI match with `players` seats.
    #[must_use]
    pub fn ai_match(seed: u64, players: u32) -> Self {
        (0..players).fold(Self::new(MapConfig::default().with_seed(seed)), |setup, i| {
            setup.with_player(PlayerSetup::ai(format!("AI {}", i + 1)))
        })
    }

    /// Add a seat.
    #[must_use]
    pub fn with_player(mut self, player: PlayerSetup) -> Self {
        self.players.push(player);
        self
    }

    /// Replace the map parameters.
    #[must_use]
    pub fn with_map(mut self, map: MapConfig) -> Self {
        self.map = map;
        self
    }

    /// Replace the rules.
    #[must_use]
    pub fn with_rules(mut self, rules: GameRules) -> Self {
        self.rules = rules;
        self
    }
}

/// A running match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameEngine {
    state: GameState,
}

impl GameEngine {
    /// Generate the map and place every player's starting shipyard and fleet.
    ///
    /// # Errors
    ///
    /// Fails if the rules are inconsistent, there are no players, or the map
    /// cannot give every player a start island.
    pub fn new_game(setup: &GameSetup) -> Result<Self> {
        let problems = setup.rules.validate();
        if !problems.is_empty() {
            return Err(GameError::InvalidState(format!(
                "Invalid rules: {}",
                problems.join("; ")
            )));
        }
        if setup.players.is_empty() {
            return Err(GameError::InvalidState(
                "A game needs at least one player".to_string(),
            ));
        }

        let map = setup.map.clone().with_players(setup.players.len() as u32);
        let grid = generate(&map)?;
        let mut state = GameState::new(map.seed, grid, setup.rules.clone());

        for (i, seat) in setup.players.iter().enumerate() {
            let id = PlayerId(i as u32);
            state.players.insert(
                id,
                Player::new(id, seat.name.clone(), seat.kind, state.rules.starting_gold),
            );
        }

        let coves: BTreeSet<HexCoord> = state.grid.pirate_coves().iter().copied().collect();
        for coord in state.grid.coords_of(TileKind::Harbor) {
            state.structures.insert_with(|id| {
                if coves.contains(&coord) {
                    Structure::pirate_cove(id, coord)
                } else {
                    Structure::harbor(id, coord)
                }
            });
        }

        let starts: Vec<(PlayerId, StartIsland)> = state
            .grid
            .start_islands()
            .map(|(player, start)| (player, start.clone()))
            .collect();
        for (player, start) in starts {
            let Some(yard) = state.structure_at(start.shipyard).map(|s| s.id) else {
                return Err(GameError::MapGeneration(format!(
                    "No harbor at start site {} for {}",
                    start.shipyard, player
                )));
            };
            let stats = state.rules.structures;
            if let Some(s) = state.structures.get_mut(yard) {
                s.claim(player, &stats);
            }
            state.construction.register_shipyard(yard);

            let ship = state.rules.ship;
            for &spawn in &start.spawns {
                state
                    .units
                    .insert_with(|id| Unit::new(id, player, UnitKind::Ship, spawn, ship));
            }
        }

        tracing::info!(
            "New game: {} players, seed {}, {} tiles, {} structures",
            state.players.len(),
            state.seed,
            state.grid.len(),
            state.structures.len()
        );

        Ok(Self { state })
    }

    /// Wrap an existing state.
    #[must_use]
    pub const fn from_state(state: GameState) -> Self {
        Self { state }
    }

    /// Read access to the authoritative state.
    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    /// Give up the engine and keep the state.
    #[must_use]
    pub fn into_state(self) -> GameState {
        self.state
    }

    /// Current turn number.
    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.state.turn
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> GamePhase {
        self.state.phase
    }

    /// Whether the match has ended.
    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.state.phase == GamePhase::GameOver
    }

    /// The winner of a finished match.
    #[must_use]
    pub const fn winner(&self) -> Option<PlayerId> {
        self.state.winner
    }

    fn active_player(&self, player: PlayerId) -> Result<&Player> {
        self.state
            .player(player)
            .filter(|p| !p.eliminated)
            .ok_or(GameError::InvalidPlayerId(player))
    }

    /// Queue orders for the next resolution.
    ///
    /// Each order is validated against the current state. Valid ones are
    /// appended to the player's batch in submission order; the rest come back
    /// with their reasons.
    ///
    /// # Errors
    ///
    /// Fails outside the orders phase or for an unknown or eliminated player.
    pub fn submit_orders(
        &mut self,
        player: PlayerId,
        orders: Vec<Order>,
    ) -> Result<Vec<RejectedOrder>> {
        if self.state.phase != GamePhase::Orders {
            return Err(GameError::InvalidState(format!(
                "Orders are closed during {:?}",
                self.state.phase
            )));
        }
        self.active_player(player)?;

        let mut accepted = Vec::new();
        let mut rejected = Vec::new();
        for order in orders {
            if order.player() != player {
                rejected.push(RejectedOrder {
                    player,
                    reason: OrderRejection::ForeignOrder {
                        issuer: order.player(),
                        submitter: player,
                    },
                    order,
                });
                continue;
            }
            match validate(&order, &self.state) {
                Ok(()) => accepted.push(order),
                Err(reason) => {
                    tracing::debug!(
                        "{} submitted an invalid {} order: {}",
                        player,
                        order.kind_name(),
                        reason
                    );
                    rejected.push(RejectedOrder {
                        player,
                        order,
                        reason,
                    });
                }
            }
        }

        self.state.pending_orders.entry(player).or_default().extend(accepted);
        Ok(rejected)
    }

    /// Mark a player as done submitting orders.
    ///
    /// # Errors
    ///
    /// Fails for an unknown or eliminated player.
    pub fn set_ready(&mut self, player: PlayerId) -> Result<()> {
        self.active_player(player)?;
        if let Some(p) = self.state.players.get_mut(&player) {
            p.ready = true;
        }
        Ok(())
    }

    /// Whether every remaining player is ready.
    #[must_use]
    pub fn all_ready(&self) -> bool {
        self.state
            .players
            .values()
            .filter(|p| !p.eliminated)
            .all(|p| p.ready)
    }

    /// Plan, submit and ready up for every AI player.
    ///
    /// # Errors
    ///
    /// Fails outside the orders phase.
    pub fn plan_ai_orders(&mut self) -> Result<Vec<RejectedOrder>> {
        let ai_players: Vec<PlayerId> = self
            .state
            .players
            .values()
            .filter(|p| p.is_ai() && !p.eliminated)
            .map(|p| p.id)
            .collect();

        let mut rejected = Vec::new();
        for player in ai_players {
            let orders = ai::plan_orders(&self.state, player);
            tracing::debug!("{} planned {} order(s)", player, orders.len());
            rejected.extend(self.submit_orders(player, orders)?);
            self.set_ready(player)?;
        }
        Ok(rejected)
    }

    /// Encounters still missing decisions.
    #[must_use]
    pub fn pending_encounters(&self) -> &[Encounter] {
        &self.state.pending_encounters
    }

    /// Whether a suspended resolution has everything it needs to continue.
    #[must_use]
    pub fn decisions_complete(&self) -> bool {
        self.state.pending_encounters.iter().all(Encounter::is_decided)
    }

    /// Record a unit's answer to its open encounter.
    ///
    /// Returns whether every pending decision is now in.
    ///
    /// # Errors
    ///
    /// Fails when no resolution is waiting, when the unit has no open
    /// encounter, or when the decision fits none of its encounters.
    pub fn submit_decision(&mut self, unit: UnitId, decision: Decision) -> Result<bool> {
        if self.state.stage() != ResolutionStage::ConflictPending {
            return Err(GameError::InvalidState(
                "No resolution is waiting for decisions".to_string(),
            ));
        }

        let kinds: Vec<EncounterKind> = self
            .state
            .pending_encounters
            .iter()
            .filter(|e| e.involves(unit))
            .map(Encounter::kind)
            .collect();
        if kinds.is_empty() {
            return Err(GameError::InvalidDecision {
                unit,
                message: "unit is not part of a pending encounter".to_string(),
            });
        }
        if !kinds.iter().any(|kind| decision.allowed_for(*kind)) {
            return Err(GameError::InvalidDecision {
                unit,
                message: format!("{decision:?} is not an answer to a {:?} encounter", kinds[0]),
            });
        }

        // A unit both swapping and contesting a tile answers once; a
        // peaceful answer means the peaceful choice of each kind.
        for encounter in &mut self.state.pending_encounters {
            if !encounter.involves(unit) {
                continue;
            }
            let kind = encounter.kind();
            let answer = if decision.allowed_for(kind) {
                decision
            } else {
                Decision::peaceful(kind)
            };
            encounter.set_decision(unit, answer);
        }

        let (ready, open): (Vec<Encounter>, Vec<Encounter>) =
            std::mem::take(&mut self.state.pending_encounters)
                .into_iter()
                .partition(Encounter::is_decided);
        self.state.decided_encounters.extend(ready);
        self.state.pending_encounters = open;
        Ok(self.state.pending_encounters.is_empty())
    }

    /// Resolve the current turn, or continue a suspended resolution.
    ///
    /// # Errors
    ///
    /// Fails once the game is over.
    pub fn resolve_turn(&mut self) -> Result<TurnProgress> {
        if self.is_game_over() {
            return Err(GameError::InvalidState("The game is over".to_string()));
        }
        if self.state.stage() == ResolutionStage::ConflictPending && !self.decisions_complete() {
            return Ok(TurnProgress::AwaitingDecisions(
                self.state.pending_encounters.clone(),
            ));
        }
        Ok(TurnResolver::new(&mut self.state).run())
    }

    /// Encode the full state, including a suspended resolution.
    ///
    /// # Errors
    ///
    /// Fails if encoding fails.
    pub fn save_state(&self) -> Result<Vec<u8>> {
        self.state.serialize()
    }

    /// Restore an engine from [`GameEngine::save_state`] output.
    ///
    /// # Errors
    ///
    /// Fails on malformed input.
    pub fn load_state(bytes: &[u8]) -> Result<Self> {
        GameState::deserialize(bytes).map(Self::from_state)
    }

    /// Hash of the current state.
    ///
    /// # Errors
    ///
    /// Fails if encoding fails.
    pub fn state_hash(&self) -> Result<u64> {
        self.state.state_hash()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::hex::EdgeKey;
    use crate::encounter::EncounterKey;
    use crate::structures::StructureKind;

    fn two_player_setup() -> GameSetup {
        GameSetup::new(MapConfig::small().with_seed(7))
            .with_player(PlayerSetup::human("Anne"))
            .with_player(PlayerSetup::ai("Blackbeard"))
    }

    #[test]
    fn test_new_game_places_start_sites() {
        let engine = GameEngine::new_game(&two_player_setup()).unwrap();
        let state = engine.state();
        assert_eq!(state.turn, 1);
        assert_eq!(state.phase, GamePhase::Orders);
        assert_eq!(state.players.len(), 2);

        for player in [PlayerId(0), PlayerId(1)] {
            assert_eq!(state.shipyard_count(player), 1);
            let start = state.grid.start_island(player).unwrap();
            assert!(!start.spawns.is_empty());
            assert_eq!(state.unit_count(player), start.spawns.len() as u32);
            let yard = state.structure_at(start.shipyard).unwrap();
            assert_eq!(yard.kind, StructureKind::Shipyard);
            assert!(state.construction.is_registered(yard.id));
        }
        for coord in state.grid.coords_of(TileKind::Harbor) {
            assert!(state.structure_at(coord).is_some());
        }
    }

    #[test]
    fn test_new_game_rejects_empty_table() {
        let setup = GameSetup::new(MapConfig::small());
        assert!(matches!(
            GameEngine::new_game(&setup),
            Err(GameError::InvalidState(_))
        ));
    }

    #[test]
    fn test_new_game_is_deterministic() {
        let a = GameEngine::new_game(&two_player_setup()).unwrap();
        let b = GameEngine::new_game(&two_player_setup()).unwrap();
        assert_eq!(a.state_hash().unwrap(), b.state_hash().unwrap());
    }

    #[test]
    fn test_submit_orders_filters_invalid() {
        let mut engine = GameEngine::new_game(&two_player_setup()).unwrap();
        let enemy_ship = engine
            .state()
            .units
            .values()
            .find(|u| u.owner == PlayerId(1))
            .unwrap()
            .id;
        let bogus = Order::Move {
            player: PlayerId(0),
            unit: enemy_ship,
            path: vec![HexCoord::ORIGIN],
        };

        let rejected = engine.submit_orders(PlayerId(0), vec![bogus]).unwrap();
        assert_eq!(rejected.len(), 1);
        assert!(engine
            .state()
            .pending_orders
            .get(&PlayerId(0))
            .map_or(true, Vec::is_empty));

        assert!(matches!(
            engine.submit_orders(PlayerId(9), Vec::new()),
            Err(GameError::InvalidPlayerId(_))
        ));
    }

    #[test]
    fn test_ready_tracking() {
        let mut engine = GameEngine::new_game(&two_player_setup()).unwrap();
        assert!(!engine.all_ready());
        engine.set_ready(PlayerId(1)).unwrap();
        assert!(!engine.all_ready());
        engine.set_ready(PlayerId(0)).unwrap();
        assert!(engine.all_ready());

        engine.resolve_turn().unwrap();
        assert!(!engine.all_ready());
    }

    #[test]
    fn test_decision_outside_resolution_is_refused() {
        let mut engine = GameEngine::new_game(&two_player_setup()).unwrap();
        assert!(matches!(
            engine.submit_decision(UnitId(0), Decision::Attack),
            Err(GameError::InvalidState(_))
        ));
    }

    #[test]
    fn test_decision_must_fit_encounter_kind() {
        let engine = GameEngine::new_game(&two_player_setup()).unwrap();
        let ours = engine
            .state()
            .units
            .values()
            .find(|u| u.owner == PlayerId(0))
            .unwrap()
            .clone();
        let theirs = engine
            .state()
            .units
            .values()
            .find(|u| u.owner == PlayerId(1))
            .unwrap()
            .id;

        // Park the enemy ship next to ours and sail into it
        let target = ours.position.neighbors().into_iter().find(|c| {
            engine.state().grid.is_navigable(*c) && engine.state().units_at(*c).next().is_none()
        });
        let Some(target) = target else {
            return;
        };
        let mut state = engine.into_state();
        state.units.get_mut(theirs).unwrap().position = target;
        let mut engine = GameEngine::from_state(state);
        engine
            .submit_orders(
                PlayerId(0),
                vec![Order::Move {
                    player: PlayerId(0),
                    unit: ours.id,
                    path: vec![ours.position, target],
                }],
            )
            .unwrap();

        let progress = engine.resolve_turn().unwrap();
        let TurnProgress::AwaitingDecisions(open) = progress else {
            panic!("expected a pending encounter");
        };
        assert_eq!(open[0].kind(), EncounterKind::Entry);
        assert!(!engine.decisions_complete());

        assert!(matches!(
            engine.submit_decision(ours.id, Decision::Proceed),
            Err(GameError::InvalidDecision { .. })
        ));
        assert!(matches!(
            engine.submit_decision(UnitId(999), Decision::Yield),
            Err(GameError::InvalidDecision { .. })
        ));

        // Still waiting: resolving again is a no-op
        assert!(!engine.resolve_turn().unwrap().is_complete());

        assert!(engine.submit_decision(ours.id, Decision::Yield).unwrap());
        assert!(engine.decisions_complete());
        let result = engine.resolve_turn().unwrap().into_result().unwrap();
        assert_eq!(result.turn, 1);
        assert_eq!(engine.turn(), 2);
    }

    #[test]
    fn test_one_answer_covers_swap_and_tile() {
        let rules = GameRules::default();
        let mut state = GameState::new(5, Grid::hexagon(5), rules.clone());
        for (i, kind) in [PlayerKind::Human, PlayerKind::Ai].into_iter().enumerate() {
            let id = PlayerId(i as u32);
            state
                .players
                .insert(id, Player::new(id, format!("P{i}"), kind, rules.starting_gold));
        }
        let mut place = |owner: u32, at: HexCoord, to: HexCoord| {
            let id = state
                .units
                .insert_with(|id| Unit::new(id, PlayerId(owner), UnitKind::Ship, at, rules.ship));
            if let Some(u) = state.units.get_mut(id) {
                u.queued_path = vec![to];
            }
            id
        };
        let a = place(0, HexCoord::new(0, 0), HexCoord::new(1, 0));
        let b = place(1, HexCoord::new(1, 0), HexCoord::new(0, 0));
        let c = place(1, HexCoord::new(2, 0), HexCoord::new(1, 0));
        let mut engine = GameEngine::from_state(state);

        let TurnProgress::AwaitingDecisions(open) = engine.resolve_turn().unwrap() else {
            panic!("expected a pending encounter");
        };
        let keys: Vec<EncounterKey> = open.iter().map(|e| e.key).collect();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&EncounterKey::Edge(EdgeKey::new(
            HexCoord::new(0, 0),
            HexCoord::new(1, 0)
        ))));
        assert!(keys.contains(&EncounterKey::Tile(HexCoord::new(1, 0))));
        assert!(open.iter().all(|e| e.undecided() == vec![a]));

        assert!(engine.submit_decision(a, Decision::Yield).unwrap());
        let answers: Vec<(EncounterKind, Decision)> = engine
            .state()
            .decided_encounters
            .iter()
            .filter_map(|e| e.participant(a).map(|p| (e.kind(), p.decision)))
            .collect();
        assert!(answers.contains(&(EncounterKind::Passing, Decision::Proceed)));
        assert!(answers.contains(&(EncounterKind::Entry, Decision::Yield)));

        engine.resolve_turn().unwrap().into_result().unwrap();
        let state = engine.state();
        for u in state.units.values().filter(|u| u.is_alive()) {
            assert!(state
                .units_at(u.position)
                .all(|other| other.owner == u.owner || !other.is_alive()));
        }
        // The swap escalated, so both swappers held; the tile went to the attacker
        let at = |id: UnitId, coord: HexCoord| state.units.get(id).map_or(true, |u| u.position == coord);
        assert!(at(a, HexCoord::new(0, 0)));
        assert!(at(b, HexCoord::new(1, 0)));
        assert!(at(c, HexCoord::new(1, 0)));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let mut engine = GameEngine::new_game(&two_player_setup()).unwrap();
        engine.plan_ai_orders().unwrap();
        let bytes = engine.save_state().unwrap();
        let restored = GameEngine::load_state(&bytes).unwrap();
        assert_eq!(engine, restored);
    }

    #[test]
    fn test_resolving_after_game_over_fails() {
        let mut state = GameEngine::new_game(&two_player_setup()).unwrap().into_state();
        state.phase = GamePhase::GameOver;
        let mut engine = GameEngine::from_state(state);
        assert!(matches!(
            engine.resolve_turn(),
            Err(GameError::InvalidState(_))
        ));
        assert!(engine.submit_orders(PlayerId(0), Vec::new()).is_err());
    }
}
