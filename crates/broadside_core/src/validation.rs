//! Order validation.
//!
//! [`validate`] classifies an order against the current state without
//! mutating anything. Checks run in a fixed priority: the issuing player,
//! then the referenced entities and their claimed positions, then the
//! order-specific rules.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::construction::BuildItemKind;
use crate::grid::TileKind;
use crate::hex::HexCoord;
use crate::ids::{PlayerId, StructureId, UnitId};
use crate::orders::{Order, UpgradeKind};
use crate::pathfinding::{is_contiguous, step_count};
use crate::players::Player;
use crate::state::GameState;
use crate::structures::Structure;
use crate::units::Unit;

/// Why an order was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum OrderRejection {
    /// The issuing player is not in the game.
    #[error("Unknown player {0}")]
    UnknownPlayer(PlayerId),
    /// The issuing player has been eliminated.
    #[error("Player {0} has been eliminated")]
    PlayerEliminated(PlayerId),
    /// The unit does not exist (or has been sunk).
    #[error("Unknown unit {0}")]
    UnknownUnit(UnitId),
    /// The structure does not exist.
    #[error("Unknown structure {0}")]
    UnknownStructure(StructureId),
    /// The player does not own the unit.
    #[error("Unit {0} belongs to another player")]
    UnitNotOwned(UnitId),
    /// The player does not own the structure.
    #[error("Structure {0} belongs to another player")]
    StructureNotOwned(StructureId),
    /// The unit is not where the order claims.
    #[error("Unit is at {actual}, not {expected}")]
    NotAtPosition {
        /// Claimed position.
        expected: HexCoord,
        /// Actual position.
        actual: HexCoord,
    },
    /// The path has no steps.
    #[error("Path has no steps")]
    EmptyPath,
    /// The path does not start at the unit.
    #[error("Path starts at {start}, unit is at {position}")]
    PathStartMismatch {
        /// First cell of the path.
        start: HexCoord,
        /// Unit position.
        position: HexCoord,
    },
    /// The path is not a chain of adjacent navigable cells.
    #[error("Path is not contiguous over navigable tiles")]
    InvalidPath,
    /// The path is longer than the unit's remaining movement.
    #[error("Path needs {required} movement, {available} available")]
    InsufficientMovement {
        /// Steps in the path.
        required: u32,
        /// Movement remaining.
        available: u32,
    },
    /// The cell has no unclaimed harbor.
    #[error("No unclaimed harbor at {0}")]
    NotAFreeHarbor(HexCoord),
    /// The structure is not a shipyard.
    #[error("Structure {0} is not a shipyard")]
    NotAShipyard(StructureId),
    /// The build queue is at its bound.
    #[error("Build queue of {0} is full")]
    QueueFull(StructureId),
    /// The player cannot pay.
    #[error("Costs {required} gold, {available} available")]
    InsufficientGold {
        /// Cost.
        required: u32,
        /// Balance.
        available: u32,
    },
    /// The ship is not docked at the structure.
    #[error("Unit {unit} is not docked at {structure}")]
    NotDocked {
        /// Ship.
        unit: UnitId,
        /// Structure.
        structure: StructureId,
    },
    /// Repair requested for an undamaged ship.
    #[error("Unit {0} is already at full health")]
    AlreadyAtFullHealth(UnitId),
    /// Upgrade requested beyond the last tier.
    #[error("Unit {0} is already at the maximum tier")]
    AlreadyAtMaxTier(UnitId),
    /// The target is not an enemy shipyard-class structure.
    #[error("Structure {0} is not an enemy shipyard")]
    NotAnEnemyShipyard(StructureId),
    /// The unit is not next to the target.
    #[error("Unit {unit} is not adjacent to {structure}")]
    NotAdjacent {
        /// Ship.
        unit: UnitId,
        /// Structure.
        structure: StructureId,
    },
    /// The structure cannot be fortified further.
    #[error("Structure {0} is already fully fortified")]
    FullyFortified(StructureId),
    /// The order names a different issuing player than the submitter.
    #[error("Order issued by {issuer} was submitted by {submitter}")]
    ForeignOrder {
        /// Player named in the order.
        issuer: PlayerId,
        /// Player who submitted it.
        submitter: PlayerId,
    },
}

impl OrderRejection {
    /// Whether the order refers to an entity that no longer exists.
    ///
    /// Stale orders are skipped during resolution rather than reported.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::UnknownUnit(_) | Self::UnknownStructure(_))
    }
}

/// An order that was dropped, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedOrder {
    /// Issuing player.
    pub player: PlayerId,
    /// The order as submitted.
    pub order: Order,
    /// Why it was dropped.
    pub reason: OrderRejection,
}

/// Check an order against the current state.
///
/// # Errors
///
/// Returns the first failing check as an [`OrderRejection`].
pub fn validate(order: &Order, state: &GameState) -> Result<(), OrderRejection> {
    let player = check_player(state, order.player())?;

    match order {
        Order::Move { unit, path, .. } => {
            let unit = owned_unit(state, player.id, *unit)?;
            validate_move(state, unit, path)
        }
        Order::DeployShipyard { unit, position, .. } => {
            let unit = owned_unit(state, player.id, *unit)?;
            if unit.position != *position {
                return Err(OrderRejection::NotAtPosition {
                    expected: *position,
                    actual: unit.position,
                });
            }
            let harbor = state.grid.kind(*position) == Some(TileKind::Harbor)
                && state
                    .structure_at(*position)
                    .is_some_and(Structure::is_free_harbor);
            if !harbor {
                return Err(OrderRejection::NotAFreeHarbor(*position));
            }
            check_gold(player, state.rules.shipyard_cost)
        }
        Order::BuildShip { structure, .. } => {
            let structure = owned_shipyard(state, player.id, *structure)?;
            check_queue(state, structure.id)?;
            check_gold(player, state.rules.ship_cost)
        }
        Order::RepairShip {
            unit, structure, ..
        } => {
            let unit = owned_unit(state, player.id, *unit)?;
            let structure = owned_shipyard(state, player.id, *structure)?;
            check_docked(unit, structure)?;
            if !unit.is_damaged() {
                return Err(OrderRejection::AlreadyAtFullHealth(unit.id));
            }
            check_gold(player, state.rules.repair_cost)
        }
        Order::UpgradeShip {
            unit,
            structure,
            upgrade,
            ..
        } => {
            let unit = owned_unit(state, player.id, *unit)?;
            let structure = owned_shipyard(state, player.id, *structure)?;
            check_docked(unit, structure)?;
            let tier = match upgrade {
                UpgradeKind::Sails => unit.sail_tier,
                UpgradeKind::Cannons => unit.cannon_tier,
            };
            if tier >= state.rules.max_tier {
                return Err(OrderRejection::AlreadyAtMaxTier(unit.id));
            }
            check_gold(player, state.rules.upgrade_cost)
        }
        Order::AttackShipyard {
            unit, structure, ..
        } => {
            let unit = owned_unit(state, player.id, *unit)?;
            let target = state
                .structures
                .get(*structure)
                .ok_or(OrderRejection::UnknownStructure(*structure))?;
            if !target.kind.is_shipyard_class() || target.owner == Some(player.id) {
                return Err(OrderRejection::NotAnEnemyShipyard(target.id));
            }
            if !unit.position.is_adjacent(target.position) {
                return Err(OrderRejection::NotAdjacent {
                    unit: unit.id,
                    structure: target.id,
                });
            }
            Ok(())
        }
        Order::FortifyStructure { structure, .. } => {
            let structure = owned_shipyard(state, player.id, *structure)?;
            let projected = state.construction.projected_kind(structure);
            if BuildItemKind::fortification_of(projected).is_none() {
                return Err(OrderRejection::FullyFortified(structure.id));
            }
            check_queue(state, structure.id)?;
            check_gold(player, state.rules.fortify_cost)
        }
    }
}

fn check_player(state: &GameState, id: PlayerId) -> Result<&Player, OrderRejection> {
    let player = state
        .player(id)
        .ok_or(OrderRejection::UnknownPlayer(id))?;
    if player.eliminated {
        return Err(OrderRejection::PlayerEliminated(id));
    }
    Ok(player)
}

fn owned_unit(state: &GameState, player: PlayerId, id: UnitId) -> Result<&Unit, OrderRejection> {
    let unit = state
        .living_unit(id)
        .ok_or(OrderRejection::UnknownUnit(id))?;
    if unit.owner != player {
        return Err(OrderRejection::UnitNotOwned(id));
    }
    Ok(unit)
}

fn owned_shipyard(
    state: &GameState,
    player: PlayerId,
    id: StructureId,
) -> Result<&Structure, OrderRejection> {
    let structure = state
        .structures
        .get(id)
        .ok_or(OrderRejection::UnknownStructure(id))?;
    if structure.owner != Some(player) {
        return Err(OrderRejection::StructureNotOwned(id));
    }
    if !structure.kind.is_shipyard_class() {
        return Err(OrderRejection::NotAShipyard(id));
    }
    Ok(structure)
}

fn check_docked(unit: &Unit, structure: &Structure) -> Result<(), OrderRejection> {
    if unit.position == structure.position {
        Ok(())
    } else {
        Err(OrderRejection::NotDocked {
            unit: unit.id,
            structure: structure.id,
        })
    }
}

fn check_queue(state: &GameState, id: StructureId) -> Result<(), OrderRejection> {
    match state.construction.queue(id) {
        Some(queue) if !queue.is_full() => Ok(()),
        _ => Err(OrderRejection::QueueFull(id)),
    }
}

fn check_gold(player: &Player, cost: u32) -> Result<(), OrderRejection> {
    if player.can_afford(cost) {
        Ok(())
    } else {
        Err(OrderRejection::InsufficientGold {
            required: cost,
            available: player.gold,
        })
    }
}

fn validate_move(state: &GameState, unit: &Unit, path: &[HexCoord]) -> Result<(), OrderRejection> {
    let Some(&start) = path.first() else {
        return Err(OrderRejection::EmptyPath);
    };
    if start != unit.position {
        return Err(OrderRejection::PathStartMismatch {
            start,
            position: unit.position,
        });
    }
    if path.len() < 2 {
        return Err(OrderRejection::EmptyPath);
    }
    let required = step_count(path);
    if required > unit.movement_remaining {
        return Err(OrderRejection::InsufficientMovement {
            required,
            available: unit.movement_remaining,
        });
    }
    if !is_contiguous(&state.grid, path) {
        return Err(OrderRejection::InvalidPath);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::GameRules;
    use crate::grid::{Grid, IslandId, Tile};
    use crate::players::PlayerKind;
    use crate::units::UnitKind;

    struct Fixture {
        state: GameState,
        ship: UnitId,
        enemy: UnitId,
        yard: StructureId,
        harbor: StructureId,
        enemy_yard: StructureId,
    }

    fn h(q: i32, r: i32) -> HexCoord {
        HexCoord::new(q, r)
    }

    fn fixture() -> Fixture {
        let rules = GameRules::default();
        let mut grid = Grid::hexagon(4);
        grid.insert(Tile::land(h(1, 1), IslandId(0)));
        grid.insert(Tile::harbor(h(0, 0), None));
        grid.insert(Tile::harbor(h(1, 0), None));
        grid.insert(Tile::harbor(h(-2, 0), None));

        let mut state = GameState::new(1, grid, rules.clone());
        for (id, name) in [(0, "Anne"), (1, "Bart")] {
            state.players.insert(
                PlayerId(id),
                Player::new(PlayerId(id), name, PlayerKind::Human, rules.starting_gold),
            );
        }

        let claim = |state: &mut GameState, pos: HexCoord, owner: Option<PlayerId>| {
            let id = state.structures.insert_with(|id| Structure::harbor(id, pos));
            if let (Some(owner), Some(s)) = (owner, state.structures.get_mut(id)) {
                s.claim(owner, &rules.structures);
                state.construction.register_shipyard(id);
            }
            id
        };
        let yard = claim(&mut state, h(0, 0), Some(PlayerId(0)));
        let harbor = claim(&mut state, h(1, 0), None);
        let enemy_yard = claim(&mut state, h(-2, 0), Some(PlayerId(1)));

        let ship = state
            .units
            .insert_with(|id| Unit::new(id, PlayerId(0), UnitKind::Ship, h(0, 0), rules.ship));
        let enemy = state
            .units
            .insert_with(|id| Unit::new(id, PlayerId(1), UnitKind::Ship, h(3, 0), rules.ship));

        Fixture {
            state,
            ship,
            enemy,
            yard,
            harbor,
            enemy_yard,
        }
    }

    fn mv(unit: UnitId, path: Vec<HexCoord>) -> Order {
        Order::Move {
            player: PlayerId(0),
            unit,
            path,
        }
    }

    #[test]
    fn test_valid_move() {
        let f = fixture();
        assert_eq!(validate(&mv(f.ship, vec![h(0, 0), h(0, 1), h(0, 2)]), &f.state), Ok(()));
    }

    #[test]
    fn test_move_rejections() {
        let f = fixture();
        assert!(matches!(
            validate(&mv(f.ship, vec![h(1, 2), h(1, 3)]), &f.state),
            Err(OrderRejection::PathStartMismatch { .. })
        ));
        assert_eq!(
            validate(&mv(f.ship, vec![h(0, 0)]), &f.state),
            Err(OrderRejection::EmptyPath)
        );
        assert_eq!(
            validate(&mv(f.ship, vec![]), &f.state),
            Err(OrderRejection::EmptyPath)
        );
        assert_eq!(
            validate(&mv(f.ship, vec![h(0, 0), h(0, 2)]), &f.state),
            Err(OrderRejection::InvalidPath)
        );
        assert_eq!(
            validate(
                &mv(f.ship, vec![h(0, 0), h(0, 1), h(0, 2), h(0, 3), h(-1, 4)]),
                &f.state
            ),
            Err(OrderRejection::InsufficientMovement {
                required: 4,
                available: 3
            })
        );
        assert_eq!(
            validate(&mv(f.ship, vec![h(0, 0), h(0, 1), h(1, 1)]), &f.state),
            Err(OrderRejection::InvalidPath),
            "land cell"
        );
    }

    #[test]
    fn test_ownership_checked_before_path() {
        let f = fixture();
        assert_eq!(
            validate(&mv(f.enemy, vec![h(9, 9)]), &f.state),
            Err(OrderRejection::UnitNotOwned(f.enemy))
        );
        assert_eq!(
            validate(&mv(UnitId(99), vec![]), &f.state),
            Err(OrderRejection::UnknownUnit(UnitId(99)))
        );
    }

    #[test]
    fn test_player_checks_come_first() {
        let mut f = fixture();
        let order = Order::Move {
            player: PlayerId(7),
            unit: UnitId(99),
            path: vec![],
        };
        assert_eq!(
            validate(&order, &f.state),
            Err(OrderRejection::UnknownPlayer(PlayerId(7)))
        );

        if let Some(p) = f.state.players.get_mut(&PlayerId(0)) {
            p.eliminated = true;
        }
        assert_eq!(
            validate(&mv(f.ship, vec![h(0, 0), h(0, 1)]), &f.state),
            Err(OrderRejection::PlayerEliminated(PlayerId(0)))
        );
    }

    #[test]
    fn test_deploy_requires_free_harbor_and_gold() {
        let mut f = fixture();
        let deploy = |unit, position| Order::DeployShipyard {
            player: PlayerId(0),
            unit,
            position,
        };
        // Sitting on its own shipyard, not a free harbor
        assert_eq!(
            validate(&deploy(f.ship, h(0, 0)), &f.state),
            Err(OrderRejection::NotAFreeHarbor(h(0, 0)))
        );
        assert!(matches!(
            validate(&deploy(f.ship, h(1, 0)), &f.state),
            Err(OrderRejection::NotAtPosition { .. })
        ));

        if let Some(u) = f.state.units.get_mut(f.ship) {
            u.position = h(1, 0);
        }
        assert_eq!(validate(&deploy(f.ship, h(1, 0)), &f.state), Ok(()));

        if let Some(p) = f.state.players.get_mut(&PlayerId(0)) {
            p.gold = 10;
        }
        assert!(matches!(
            validate(&deploy(f.ship, h(1, 0)), &f.state),
            Err(OrderRejection::InsufficientGold { required: 100, .. })
        ));
        assert!(f.state.structures.contains(f.harbor));
    }

    #[test]
    fn test_build_ship_checks_queue() {
        let mut f = fixture();
        let build = Order::BuildShip {
            player: PlayerId(0),
            structure: f.yard,
        };
        assert_eq!(validate(&build, &f.state), Ok(()));

        for _ in 0..f.state.rules.max_queue_size {
            f.state
                .construction
                .enqueue(f.yard, BuildItemKind::Ship)
                .unwrap();
        }
        assert_eq!(validate(&build, &f.state), Err(OrderRejection::QueueFull(f.yard)));

        let foreign = Order::BuildShip {
            player: PlayerId(0),
            structure: f.enemy_yard,
        };
        assert_eq!(
            validate(&foreign, &f.state),
            Err(OrderRejection::StructureNotOwned(f.enemy_yard))
        );
    }

    #[test]
    fn test_repair_and_upgrade() {
        let mut f = fixture();
        let repair = Order::RepairShip {
            player: PlayerId(0),
            unit: f.ship,
            structure: f.yard,
        };
        assert_eq!(
            validate(&repair, &f.state),
            Err(OrderRejection::AlreadyAtFullHealth(f.ship))
        );
        if let Some(u) = f.state.units.get_mut(f.ship) {
            u.health -= 1;
        }
        assert_eq!(validate(&repair, &f.state), Ok(()));

        let upgrade = Order::UpgradeShip {
            player: PlayerId(0),
            unit: f.ship,
            structure: f.yard,
            upgrade: UpgradeKind::Cannons,
        };
        assert_eq!(validate(&upgrade, &f.state), Ok(()));
        if let Some(u) = f.state.units.get_mut(f.ship) {
            u.cannon_tier = f.state.rules.max_tier;
        }
        assert_eq!(
            validate(&upgrade, &f.state),
            Err(OrderRejection::AlreadyAtMaxTier(f.ship))
        );

        if let Some(u) = f.state.units.get_mut(f.ship) {
            u.position = h(0, 1);
        }
        assert!(matches!(
            validate(&repair, &f.state),
            Err(OrderRejection::NotDocked { .. })
        ));
    }

    #[test]
    fn test_attack_requires_adjacent_enemy_yard() {
        let mut f = fixture();
        let ship = f.ship;
        let attack = move |structure| Order::AttackShipyard {
            player: PlayerId(0),
            unit: ship,
            structure,
        };
        assert_eq!(
            validate(&attack(f.yard), &f.state),
            Err(OrderRejection::NotAnEnemyShipyard(f.yard))
        );
        assert!(matches!(
            validate(&attack(f.enemy_yard), &f.state),
            Err(OrderRejection::NotAdjacent { .. })
        ));
        if let Some(u) = f.state.units.get_mut(f.ship) {
            u.position = h(-1, 0);
        }
        assert_eq!(validate(&attack(f.enemy_yard), &f.state), Ok(()));
    }

    #[test]
    fn test_fortify_limit_counts_queued_items() {
        let mut f = fixture();
        let fortify = Order::FortifyStructure {
            player: PlayerId(0),
            structure: f.yard,
        };
        assert_eq!(validate(&fortify, &f.state), Ok(()));
        f.state
            .construction
            .enqueue(f.yard, BuildItemKind::NavalYard)
            .unwrap();
        assert_eq!(validate(&fortify, &f.state), Ok(()));
        f.state
            .construction
            .enqueue(f.yard, BuildItemKind::NavalFortress)
            .unwrap();
        assert_eq!(
            validate(&fortify, &f.state),
            Err(OrderRejection::FullyFortified(f.yard))
        );
    }
}
