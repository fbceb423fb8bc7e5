//! Harbors, shipyards and pirate coves.

use serde::{Deserialize, Serialize};

use crate::data::StructureStats;
use crate::hex::HexCoord;
use crate::ids::{PlayerId, StructureId};

/// Kind of structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructureKind {
    /// Unclaimed harbor site.
    Harbor,
    /// Basic player shipyard.
    Shipyard,
    /// Fortified shipyard.
    NavalYard,
    /// Fully fortified shipyard.
    NavalFortress,
    /// Pirate spawn point.
    PirateCove,
}

impl StructureKind {
    /// Whether this is a player-owned production site that can be attacked.
    #[must_use]
    pub const fn is_shipyard_class(self) -> bool {
        matches!(self, Self::Shipyard | Self::NavalYard | Self::NavalFortress)
    }

    /// Defense tier of a shipyard-class structure (0 otherwise).
    #[must_use]
    pub const fn defense_tier(self) -> u8 {
        match self {
            Self::Shipyard => 1,
            Self::NavalYard => 2,
            Self::NavalFortress => 3,
            Self::Harbor | Self::PirateCove => 0,
        }
    }

    /// Kind reached by fortifying this one, if any.
    #[must_use]
    pub const fn fortified(self) -> Option<Self> {
        match self {
            Self::Shipyard => Some(Self::NavalYard),
            Self::NavalYard => Some(Self::NavalFortress),
            _ => None,
        }
    }

    /// Maximum health for this kind.
    #[must_use]
    pub const fn max_health(self, stats: &StructureStats) -> u32 {
        match self {
            Self::Shipyard => stats.shipyard_health,
            Self::NavalYard => stats.naval_yard_health,
            Self::NavalFortress => stats.fortress_health,
            Self::Harbor | Self::PirateCove => 0,
        }
    }
}

/// A structure standing on a harbor tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Structure {
    /// Stable identifier, preserved across conversions.
    pub id: StructureId,
    /// Owner; `None` for neutral harbors.
    pub owner: Option<PlayerId>,
    /// Tile the structure stands on.
    pub position: HexCoord,
    /// Current kind.
    pub kind: StructureKind,
    /// Current health (0 for harbors and coves).
    pub health: u32,
    /// Health at full strength.
    pub max_health: u32,
}

impl Structure {
    /// A neutral harbor.
    #[must_use]
    pub const fn harbor(id: StructureId, position: HexCoord) -> Self {
        Self {
            id,
            owner: None,
            position,
            kind: StructureKind::Harbor,
            health: 0,
            max_health: 0,
        }
    }

    /// A pirate cove.
    #[must_use]
    pub const fn pirate_cove(id: StructureId, position: HexCoord) -> Self {
        Self {
            id,
            owner: Some(PlayerId::PIRATE),
            position,
            kind: StructureKind::PirateCove,
            health: 0,
            max_health: 0,
        }
    }

    /// Whether the structure is a shipyard-class site owned by `player`.
    #[must_use]
    pub fn is_shipyard_of(&self, player: PlayerId) -> bool {
        self.kind.is_shipyard_class() && self.owner == Some(player)
    }

    /// Whether the structure is an unclaimed harbor.
    #[must_use]
    pub fn is_free_harbor(&self) -> bool {
        self.kind == StructureKind::Harbor && self.owner.is_none()
    }

    /// Convert a harbor in place to a shipyard owned by `player`.
    ///
    /// Identity and position are preserved.
    pub fn claim(&mut self, player: PlayerId, stats: &StructureStats) {
        self.owner = Some(player);
        self.kind = StructureKind::Shipyard;
        self.max_health = StructureKind::Shipyard.max_health(stats);
        self.health = self.max_health;
    }

    /// Upgrade to the next fortification level, restoring full health.
    ///
    /// Returns `false` if the structure cannot be fortified further.
    pub fn fortify(&mut self, stats: &StructureStats) -> bool {
        match self.kind.fortified() {
            Some(next) => {
                self.kind = next;
                self.max_health = next.max_health(stats);
                self.health = self.max_health;
                true
            }
            None => false,
        }
    }

    /// Revert to a neutral harbor.
    pub fn revert_to_harbor(&mut self) {
        self.owner = None;
        self.kind = StructureKind::Harbor;
        self.health = 0;
        self.max_health = 0;
    }

    /// Apply damage, saturating at zero. Returns `true` if health reached zero.
    pub fn take_damage(&mut self, amount: u32) -> bool {
        self.health = self.health.saturating_sub(amount);
        self.health == 0
    }
}
