//! Authoritative game state.
//!
//! Everything the engine needs to resume a turn lives here, including the
//! progress of a suspended resolution pass, so a state saved while waiting
//! for decisions can be reloaded and resumed elsewhere.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::combat::OngoingCombat;
use crate::construction::ConstructionManager;
use crate::data::GameRules;
use crate::encounter::{CollisionInfo, Encounter, EncounterKey};
use crate::error::{GameError, Result};
use crate::events::GameEvent;
use crate::grid::Grid;
use crate::hex::HexCoord;
use crate::ids::{PlayerId, StructureId, UnitId};
use crate::orders::Order;
use crate::players::Player;
use crate::registry::Registry;
use crate::structures::Structure;
use crate::units::Unit;
use crate::validation::RejectedOrder;

/// Lifecycle phase of the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GamePhase {
    /// Players are submitting orders.
    Orders,
    /// A resolution pass is underway (possibly waiting for decisions).
    Resolving,
    /// The match has ended.
    GameOver,
}

/// Stage of a resolution pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolutionStage {
    /// Orders not applied yet.
    Idle,
    /// Lock-step movement ticks are running.
    MovementInProgress,
    /// Movement is suspended until every open encounter has decisions.
    ConflictPending,
    /// Movement finished; ongoing combats, assaults and upkeep remain.
    CombatPending,
    /// The pass is complete.
    Done,
}

/// Working data of an in-flight resolution pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionProgress {
    /// Current stage.
    pub stage: ResolutionStage,
    /// Movement tick within the turn.
    pub tick: u32,
    /// Events emitted so far this turn.
    pub events: Vec<GameEvent>,
    /// Orders dropped by validation this turn.
    pub rejections: Vec<RejectedOrder>,
    /// Entry collisions recorded this turn.
    pub collisions: Vec<CollisionInfo>,
    /// Number of random streams consumed this turn.
    pub combat_sequence: u32,
    /// Units that stopped moving for the rest of the turn.
    pub halted: BTreeSet<UnitId>,
    /// Encounters already announced in the current tick.
    pub announced: BTreeSet<EncounterKey>,
    /// Cells visited by each unit this turn, starting with its turn-start cell.
    pub tracks: BTreeMap<UnitId, Vec<HexCoord>>,
    /// Shipyard assaults to resolve once movement is over.
    pub assaults: Vec<(UnitId, StructureId)>,
}

impl ResolutionProgress {
    /// A fresh pass.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stage: ResolutionStage::Idle,
            tick: 0,
            events: Vec::new(),
            rejections: Vec::new(),
            collisions: Vec::new(),
            combat_sequence: 0,
            halted: BTreeSet::new(),
            announced: BTreeSet::new(),
            tracks: BTreeMap::new(),
            assaults: Vec::new(),
        }
    }

    /// Claim the next random stream index.
    pub fn next_sequence(&mut self) -> u32 {
        let seq = self.combat_sequence;
        self.combat_sequence += 1;
        seq
    }
}

impl Default for ResolutionProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// The complete, serializable state of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Current turn, starting at 1.
    pub turn: u32,
    /// Lifecycle phase.
    pub phase: GamePhase,
    /// Seed for every random draw.
    pub seed: u64,
    /// The map.
    pub grid: Grid,
    /// Ships.
    pub units: Registry<UnitId, Unit>,
    /// Harbors, shipyards and coves.
    pub structures: Registry<StructureId, Structure>,
    /// Participants by id.
    pub players: BTreeMap<PlayerId, Player>,
    /// Orders waiting for the next resolution, per player in submission order.
    pub pending_orders: BTreeMap<PlayerId, Vec<Order>>,
    /// Encounters still missing at least one decision.
    pub pending_encounters: Vec<Encounter>,
    /// Encounters with every decision in, awaiting resolution.
    pub decided_encounters: Vec<Encounter>,
    /// Engagements carried across turns.
    pub ongoing_combats: Vec<OngoingCombat>,
    /// Build queues.
    pub construction: ConstructionManager,
    /// Balance constants.
    pub rules: GameRules,
    /// Every event of every completed turn.
    pub history: Vec<GameEvent>,
    /// The in-flight resolution pass, if any.
    pub resolution: Option<ResolutionProgress>,
    /// Winner once the game is over.
    pub winner: Option<PlayerId>,
}

impl GameState {
    /// Create a state at turn 1 with no entities.
    #[must_use]
    pub fn new(seed: u64, grid: Grid, rules: GameRules) -> Self {
        Self {
            turn: 1,
            phase: GamePhase::Orders,
            seed,
            grid,
            units: Registry::new(),
            structures: Registry::new(),
            players: BTreeMap::new(),
            pending_orders: BTreeMap::new(),
            pending_encounters: Vec::new(),
            decided_encounters: Vec::new(),
            ongoing_combats: Vec::new(),
            construction: ConstructionManager::new(&rules),
            rules,
            history: Vec::new(),
            resolution: None,
            winner: None,
        }
    }

    /// A player by id.
    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// A living unit by id.
    #[must_use]
    pub fn living_unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id).filter(|u| u.is_alive())
    }

    /// Living units on a cell, in id order.
    pub fn units_at(&self, coord: HexCoord) -> impl Iterator<Item = &Unit> {
        self.units
            .values()
            .filter(move |u| u.is_alive() && u.position == coord)
    }

    /// The structure on a cell (a tile hosts at most one).
    #[must_use]
    pub fn structure_at(&self, coord: HexCoord) -> Option<&Structure> {
        self.structures.values().find(|s| s.position == coord)
    }

    /// Players still in the game, in id order.
    #[must_use]
    pub fn active_players(&self) -> Vec<PlayerId> {
        self.players
            .values()
            .filter(|p| !p.eliminated)
            .map(|p| p.id)
            .collect()
    }

    /// Number of shipyard-class structures owned by a player.
    #[must_use]
    pub fn shipyard_count(&self, player: PlayerId) -> u32 {
        self.structures
            .values()
            .filter(|s| s.is_shipyard_of(player))
            .count() as u32
    }

    /// Number of living units owned by a player.
    #[must_use]
    pub fn unit_count(&self, player: PlayerId) -> u32 {
        self.units
            .values()
            .filter(|u| u.is_alive() && u.owner == player)
            .count() as u32
    }

    /// Living pirate ships.
    #[must_use]
    pub fn pirate_count(&self) -> u32 {
        self.unit_count(PlayerId::PIRATE)
    }

    /// The engagement a unit is part of.
    #[must_use]
    pub fn combat_of(&self, unit: UnitId) -> Option<&OngoingCombat> {
        self.ongoing_combats.iter().find(|c| c.involves(unit))
    }

    /// Whether the unit must decide on an open encounter.
    #[must_use]
    pub fn awaits_decision(&self, unit: UnitId) -> bool {
        self.pending_encounters
            .iter()
            .any(|e| e.undecided().contains(&unit))
    }

    /// Current resolution stage (`Idle` outside a pass).
    #[must_use]
    pub fn stage(&self) -> ResolutionStage {
        self.resolution
            .as_ref()
            .map_or(ResolutionStage::Idle, |r| r.stage)
    }

    /// Hash of the full serialized state.
    ///
    /// Identical states hash identically, which is what desync and replay
    /// checks rely on.
    pub fn state_hash(&self) -> Result<u64> {
        let bytes = self.serialize()?;
        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        Ok(hasher.finish())
    }

    /// Serialize the state with bincode.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::Serialization(format!("Failed to serialize state: {e}")))
    }

    /// Deserialize a state produced by [`GameState::serialize`].
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| GameError::Serialization(format!("Failed to deserialize state: {e}")))
    }
}
