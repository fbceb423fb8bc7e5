//! Simultaneous-movement conflicts and the decisions that resolve them.
//!
//! Two units that want the same tile in the same tick open an
//! [`EncounterKind::Entry`] encounter keyed by the tile. Two hostile units
//! that swap cells across one edge open an [`EncounterKind::Passing`]
//! encounter keyed by the unordered edge. Every participant carries a
//! decision slot that starts at [`Decision::None`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hex::{EdgeKey, HexCoord};
use crate::ids::{PlayerId, UnitId};

/// The two conflict shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncounterKind {
    /// Units crossing one edge in opposite directions.
    Passing,
    /// Units contending for one tile.
    Entry,
}

/// Identity of an encounter within a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EncounterKey {
    /// Edge crossed by a passing encounter.
    Edge(EdgeKey),
    /// Tile contested by an entry encounter.
    Tile(HexCoord),
}

impl EncounterKey {
    /// Kind of encounter this key identifies.
    #[must_use]
    pub const fn kind(self) -> EncounterKind {
        match self {
            Self::Edge(_) => EncounterKind::Passing,
            Self::Tile(_) => EncounterKind::Entry,
        }
    }
}

impl fmt::Display for EncounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Edge(edge) => write!(f, "edge {edge}"),
            Self::Tile(tile) => write!(f, "tile {tile}"),
        }
    }
}

/// A participant's answer to an encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Decision {
    /// Not decided yet.
    #[default]
    None,
    /// Sail past without engaging (passing only).
    Proceed,
    /// Give way and hold position (entry only).
    Yield,
    /// Engage.
    Attack,
}

impl Decision {
    /// Whether this decision is a legal answer to the given kind.
    #[must_use]
    pub const fn allowed_for(self, kind: EncounterKind) -> bool {
        matches!(
            (self, kind),
            (Self::Attack, _)
                | (Self::Proceed, EncounterKind::Passing)
                | (Self::Yield, EncounterKind::Entry)
        )
    }

    /// The non-aggressive answer for a kind.
    #[must_use]
    pub const fn peaceful(kind: EncounterKind) -> Self {
        match kind {
            EncounterKind::Passing => Self::Proceed,
            EncounterKind::Entry => Self::Yield,
        }
    }
}

/// One unit's stake in an encounter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Unit involved.
    pub unit: UnitId,
    /// Its owner.
    pub owner: PlayerId,
    /// Cell the unit occupies this tick.
    pub from: HexCoord,
    /// Cell the unit wants to enter (equal to `from` for a stationary occupant).
    pub to: HexCoord,
    /// Decision slot.
    pub decision: Decision,
}

impl Participant {
    /// Whether the participant is trying to move this tick.
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.from != self.to
    }
}

/// A conflict detected during lock-step movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encounter {
    /// Identity within the tick.
    pub key: EncounterKey,
    /// Turn the encounter arose in.
    pub turn: u32,
    /// Movement tick within the turn.
    pub tick: u32,
    /// Participants in unit id order.
    pub participants: Vec<Participant>,
}

impl Encounter {
    /// Create an encounter; participants are sorted by unit id.
    #[must_use]
    pub fn new(key: EncounterKey, turn: u32, tick: u32, mut participants: Vec<Participant>) -> Self {
        participants.sort_by_key(|p| p.unit);
        Self {
            key,
            turn,
            tick,
            participants,
        }
    }

    /// Passing or entry.
    #[must_use]
    pub const fn kind(&self) -> EncounterKind {
        self.key.kind()
    }

    /// Units involved, sorted.
    #[must_use]
    pub fn units(&self) -> Vec<UnitId> {
        self.participants.iter().map(|p| p.unit).collect()
    }

    /// Whether a unit takes part.
    #[must_use]
    pub fn involves(&self, unit: UnitId) -> bool {
        self.participants.iter().any(|p| p.unit == unit)
    }

    /// A participant by unit id.
    #[must_use]
    pub fn participant(&self, unit: UnitId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.unit == unit)
    }

    /// Record a decision. Returns `false` if the unit is not a participant.
    pub fn set_decision(&mut self, unit: UnitId, decision: Decision) -> bool {
        match self.participants.iter_mut().find(|p| p.unit == unit) {
            Some(p) => {
                p.decision = decision;
                true
            }
            None => false,
        }
    }

    /// Whether every participant has decided.
    #[must_use]
    pub fn is_decided(&self) -> bool {
        self.participants.iter().all(|p| p.decision != Decision::None)
    }

    /// Participants still owing a decision.
    #[must_use]
    pub fn undecided(&self) -> Vec<UnitId> {
        self.participants
            .iter()
            .filter(|p| p.decision == Decision::None)
            .map(|p| p.unit)
            .collect()
    }

    /// Whether anyone chose to attack.
    #[must_use]
    pub fn escalated(&self) -> bool {
        self.participants.iter().any(|p| p.decision == Decision::Attack)
    }

    /// Copy decisions from an earlier detection of the same encounter.
    pub fn merge_decisions(&mut self, earlier: &Self) {
        for p in &mut self.participants {
            if p.decision != Decision::None {
                continue;
            }
            if let Some(prev) = earlier.participant(p.unit) {
                p.decision = prev.decision;
            }
        }
    }
}

/// Movement bookkeeping for one unit in an entry collision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionEntry {
    /// Unit involved.
    pub unit: UnitId,
    /// Cells already traversed this turn, starting with the turn-start cell.
    pub traversed: Vec<HexCoord>,
    /// Cells still queued, starting with the contested tile.
    pub remaining: Vec<HexCoord>,
}

/// Units that tried to enter the same tile in the same tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionInfo {
    /// Contested tile.
    pub tile: HexCoord,
    /// Tick within the turn.
    pub tick: u32,
    /// Per-unit path segments, in unit id order.
    pub entries: Vec<CollisionEntry>,
}

impl CollisionInfo {
    /// Units involved.
    #[must_use]
    pub fn units(&self) -> Vec<UnitId> {
        self.entries.iter().map(|e| e.unit).collect()
    }
}
