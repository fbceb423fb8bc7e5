//! Player orders.

use serde::{Deserialize, Serialize};

use crate::hex::HexCoord;
use crate::ids::{PlayerId, StructureId, UnitId};

/// Which ship component an upgrade improves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpgradeKind {
    /// +1 movement per tier.
    Sails,
    /// +1 combat die per tier.
    Cannons,
}

/// An order issued by a player for the coming turn.
///
/// Every variant names the issuing player so that a batch can be validated
/// without outside context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    /// Sail along `path`, which starts at the unit's current position.
    Move {
        /// Issuing player.
        player: PlayerId,
        /// Unit to move.
        unit: UnitId,
        /// Full route including the start cell.
        path: Vec<HexCoord>,
    },
    /// Claim the harbor the unit is sitting on as a shipyard.
    DeployShipyard {
        /// Issuing player.
        player: PlayerId,
        /// Unit standing on the harbor.
        unit: UnitId,
        /// Harbor coordinate.
        position: HexCoord,
    },
    /// Queue a new ship at a shipyard.
    BuildShip {
        /// Issuing player.
        player: PlayerId,
        /// Shipyard to build at.
        structure: StructureId,
    },
    /// Fully repair a docked ship.
    RepairShip {
        /// Issuing player.
        player: PlayerId,
        /// Ship to repair.
        unit: UnitId,
        /// Shipyard the ship is docked at.
        structure: StructureId,
    },
    /// Upgrade a docked ship.
    UpgradeShip {
        /// Issuing player.
        player: PlayerId,
        /// Ship to upgrade.
        unit: UnitId,
        /// Shipyard the ship is docked at.
        structure: StructureId,
        /// Component to improve.
        upgrade: UpgradeKind,
    },
    /// Bombard an adjacent enemy shipyard.
    AttackShipyard {
        /// Issuing player.
        player: PlayerId,
        /// Attacking ship.
        unit: UnitId,
        /// Target structure.
        structure: StructureId,
    },
    /// Queue a fortification of an owned shipyard.
    FortifyStructure {
        /// Issuing player.
        player: PlayerId,
        /// Structure to fortify.
        structure: StructureId,
    },
}

impl Order {
    /// The issuing player.
    #[must_use]
    pub const fn player(&self) -> PlayerId {
        match self {
            Self::Move { player, .. }
            | Self::DeployShipyard { player, .. }
            | Self::BuildShip { player, .. }
            | Self::RepairShip { player, .. }
            | Self::UpgradeShip { player, .. }
            | Self::AttackShipyard { player, .. }
            | Self::FortifyStructure { player, .. } => *player,
        }
    }

    /// The unit the order acts on, if any.
    #[must_use]
    pub const fn unit(&self) -> Option<UnitId> {
        match self {
            Self::Move { unit, .. }
            | Self::DeployShipyard { unit, .. }
            | Self::RepairShip { unit, .. }
            | Self::UpgradeShip { unit, .. }
            | Self::AttackShipyard { unit, .. } => Some(*unit),
            Self::BuildShip { .. } | Self::FortifyStructure { .. } => None,
        }
    }

    /// The structure the order acts on, if any.
    #[must_use]
    pub const fn structure(&self) -> Option<StructureId> {
        match self {
            Self::BuildShip { structure, .. }
            | Self::RepairShip { structure, .. }
            | Self::UpgradeShip { structure, .. }
            | Self::AttackShipyard { structure, .. }
            | Self::FortifyStructure { structure, .. } => Some(*structure),
            Self::Move { .. } | Self::DeployShipyard { .. } => None,
        }
    }

    /// Short name for logs.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Move { .. } => "move",
            Self::DeployShipyard { .. } => "deploy_shipyard",
            Self::BuildShip { .. } => "build_ship",
            Self::RepairShip { .. } => "repair_ship",
            Self::UpgradeShip { .. } => "upgrade_ship",
            Self::AttackShipyard { .. } => "attack_shipyard",
            Self::FortifyStructure { .. } => "fortify_structure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let order = Order::UpgradeShip {
            player: PlayerId(2),
            unit: UnitId(7),
            structure: StructureId(3),
            upgrade: UpgradeKind::Cannons,
        };
        assert_eq!(order.player(), PlayerId(2));
        assert_eq!(order.unit(), Some(UnitId(7)));
        assert_eq!(order.structure(), Some(StructureId(3)));
        assert_eq!(order.kind_name(), "upgrade_ship");

        let build = Order::BuildShip {
            player: PlayerId(0),
            structure: StructureId(1),
        };
        assert_eq!(build.unit(), None);
    }
}
