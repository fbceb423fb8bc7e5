//! Turn-stamped records of everything that happened during resolution.

use serde::{Deserialize, Serialize};

use crate::construction::BuildItemKind;
use crate::encounter::{EncounterKey, EncounterKind};
use crate::hex::HexCoord;
use crate::ids::{PlayerId, StructureId, UnitId};
use crate::orders::UpgradeKind;
use crate::structures::StructureKind;

/// Something that happened during resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Turn the event belongs to.
    pub turn: u32,
    /// Payload.
    pub kind: GameEventKind,
}

impl GameEvent {
    /// Stamp a payload with a turn number.
    #[must_use]
    pub const fn new(turn: u32, kind: GameEventKind) -> Self {
        Self { turn, kind }
    }
}

/// Event payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEventKind {
    /// A unit changed position this turn.
    UnitMoved {
        /// Unit that moved.
        unit: UnitId,
        /// Cell at turn start.
        from: HexCoord,
        /// Cell at turn end.
        to: HexCoord,
        /// Every cell visited, starting with `from`.
        path: Vec<HexCoord>,
        /// Cells still queued for later turns.
        remaining: Vec<HexCoord>,
        /// Whether the unit stopped short of its destination.
        partial: bool,
    },
    /// A unit was sunk.
    UnitDestroyed {
        /// Sunk unit.
        unit: UnitId,
        /// Its owner.
        owner: PlayerId,
        /// Where it sank.
        position: HexCoord,
        /// Unit that dealt the final blow, if any.
        destroyed_by: Option<UnitId>,
    },
    /// Units tried to enter the same tile in the same tick.
    UnitsCollided {
        /// Contested tile.
        tile: HexCoord,
        /// Units involved.
        units: Vec<UnitId>,
    },
    /// An encounter needs decisions.
    ConflictDetected {
        /// Passing or entry.
        kind: EncounterKind,
        /// Encounter identity.
        key: EncounterKey,
        /// Units involved.
        units: Vec<UnitId>,
    },
    /// An encounter was settled.
    EncounterResolved {
        /// Encounter identity.
        key: EncounterKey,
        /// Whether anyone attacked.
        escalated: bool,
    },
    /// One round of ship-to-ship combat.
    CombatOccurred {
        /// Initiating unit.
        attacker: UnitId,
        /// Defending unit.
        defender: UnitId,
        /// Attacker's dice, sorted high to low.
        attacker_rolls: Vec<u32>,
        /// Defender's dice, sorted high to low.
        defender_rolls: Vec<u32>,
        /// Damage taken by the attacker.
        damage_to_attacker: u32,
        /// Damage taken by the defender.
        damage_to_defender: u32,
        /// Whether the attacker was sunk.
        attacker_destroyed: bool,
        /// Whether the defender was sunk.
        defender_destroyed: bool,
        /// Round number within a multi-turn engagement (1 for a fresh fight).
        round: u32,
    },
    /// Two units in an ongoing combat are no longer adjacent.
    CombatDisengaged {
        /// First unit (lower id).
        first: UnitId,
        /// Second unit.
        second: UnitId,
    },
    /// A ship bombarded a shipyard-class structure.
    StructureAttacked {
        /// Attacking ship.
        unit: UnitId,
        /// Target.
        structure: StructureId,
        /// Ship's dice.
        attacker_rolls: Vec<u32>,
        /// Structure's dice.
        defender_rolls: Vec<u32>,
        /// Damage taken by the ship.
        damage_to_attacker: u32,
        /// Damage taken by the structure.
        damage_to_structure: u32,
        /// Whether the structure fell.
        structure_destroyed: bool,
    },
    /// A harbor was claimed as a shipyard.
    ShipyardDeployed {
        /// New owner.
        player: PlayerId,
        /// Unit that claimed it.
        unit: UnitId,
        /// Structure converted in place.
        structure: StructureId,
        /// Harbor coordinate.
        position: HexCoord,
    },
    /// A shipyard-class structure fell and reverted to a neutral harbor.
    ShipyardDestroyed {
        /// Structure.
        structure: StructureId,
        /// Owner before it fell.
        previous_owner: Option<PlayerId>,
        /// Its position.
        position: HexCoord,
    },
    /// An item joined a build queue.
    BuildQueued {
        /// Structure.
        structure: StructureId,
        /// Item queued.
        item: BuildItemKind,
        /// Queue length after the insertion.
        queue_len: usize,
    },
    /// A queued ship was launched.
    ShipBuilt {
        /// New unit.
        unit: UnitId,
        /// Shipyard it came from.
        structure: StructureId,
        /// Owner.
        owner: PlayerId,
        /// Spawn cell.
        position: HexCoord,
    },
    /// A docked ship was repaired.
    ShipRepaired {
        /// Ship.
        unit: UnitId,
        /// Shipyard.
        structure: StructureId,
        /// Health restored.
        restored: u32,
    },
    /// A docked ship was upgraded.
    ShipUpgraded {
        /// Ship.
        unit: UnitId,
        /// Component improved.
        upgrade: UpgradeKind,
        /// Tier after the upgrade.
        tier: u8,
    },
    /// A fortification completed.
    StructureUpgraded {
        /// Structure.
        structure: StructureId,
        /// Kind after the upgrade.
        kind: StructureKind,
    },
    /// A pirate ship appeared at a cove.
    PirateSpawned {
        /// New pirate.
        unit: UnitId,
        /// Spawning cove.
        cove: StructureId,
        /// Spawn cell.
        position: HexCoord,
    },
    /// Gold paid for sinking a pirate.
    BountyAwarded {
        /// Recipient.
        player: PlayerId,
        /// Sunk pirate.
        pirate: UnitId,
        /// Gold.
        amount: u32,
    },
    /// End-of-turn income.
    IncomeCollected {
        /// Recipient.
        player: PlayerId,
        /// Gold.
        amount: u32,
    },
    /// A player has no ships and no shipyards left.
    PlayerEliminated {
        /// Player knocked out.
        player: PlayerId,
    },
    /// The match ended.
    GameOver {
        /// Last player standing, if any.
        winner: Option<PlayerId>,
    },
}

impl GameEventKind {
    /// Short name for logs and metrics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::UnitMoved { .. } => "unit_moved",
            Self::UnitDestroyed { .. } => "unit_destroyed",
            Self::UnitsCollided { .. } => "units_collided",
            Self::ConflictDetected { .. } => "conflict_detected",
            Self::EncounterResolved { .. } => "encounter_resolved",
            Self::CombatOccurred { .. } => "combat_occurred",
            Self::CombatDisengaged { .. } => "combat_disengaged",
            Self::StructureAttacked { .. } => "structure_attacked",
            Self::ShipyardDeployed { .. } => "shipyard_deployed",
            Self::ShipyardDestroyed { .. } => "shipyard_destroyed",
            Self::BuildQueued { .. } => "build_queued",
            Self::ShipBuilt { .. } => "ship_built",
            Self::ShipRepaired { .. } => "ship_repaired",
            Self::ShipUpgraded { .. } => "ship_upgraded",
            Self::StructureUpgraded { .. } => "structure_upgraded",
            Self::PirateSpawned { .. } => "pirate_spawned",
            Self::BountyAwarded { .. } => "bounty_awarded",
            Self::IncomeCollected { .. } => "income_collected",
            Self::PlayerEliminated { .. } => "player_eliminated",
            Self::GameOver { .. } => "game_over",
        }
    }
}
