//! Built-in policies for AI players and pirates.
//!
//! Everything here reads the state and returns plain values; the resolver
//! and engine decide what to do with them.

use std::collections::BTreeSet;

use crate::data::GameRules;
use crate::encounter::{Decision, EncounterKind};
use crate::grid::TileKind;
use crate::hex::HexCoord;
use crate::ids::{PlayerId, StructureId, UnitId};
use crate::orders::{Order, UpgradeKind};
use crate::pathfinding::find_path;
use crate::state::GameState;
use crate::units::Unit;
use crate::validation::validate;

/// Step budget for AI route searches.
const SEARCH_BUDGET: u32 = 64;

/// Ships an AI fleet builds before it starts fortifying.
const FLEET_TARGET: u32 = 6;

/// Automatic answer to an encounter.
///
/// Pirates always attack. Other AI units give way when their health ratio
/// drops below the retreat threshold and attack otherwise.
#[must_use]
pub fn encounter_decision(unit: &Unit, kind: EncounterKind, rules: &GameRules) -> Decision {
    if unit.owner.is_pirate() {
        return Decision::Attack;
    }
    if unit.health_ratio() < rules.ai_retreat_threshold {
        Decision::peaceful(kind)
    } else {
        Decision::Attack
    }
}

/// Routes for every pirate that has a player ship within hunting range.
///
/// Each route excludes the pirate's own cell and is cut to its remaining
/// movement. Pirates pick the nearest target, breaking ties by unit id.
#[must_use]
pub fn plan_pirate_moves(state: &GameState) -> Vec<(UnitId, Vec<HexCoord>)> {
    let radius = state.rules.pirate_hunt_radius;
    let mut moves = Vec::new();

    for pirate in state
        .units
        .values()
        .filter(|u| u.is_alive() && u.owner.is_pirate() && !u.is_in_combat())
    {
        let target = state
            .units
            .values()
            .filter(|u| u.is_alive() && !u.owner.is_pirate())
            .map(|u| (pirate.position.distance(u.position), u.id, u.position))
            .filter(|(d, _, _)| *d <= radius)
            .min();
        let Some((_, _, goal)) = target else {
            continue;
        };
        if let Some(route) = route_toward(state, pirate, goal, radius * 2) {
            moves.push((pirate.id, route[1..].to_vec()));
        }
    }

    moves
}

/// A legal order batch for an AI player.
///
/// Orders are checked with [`validate`] against the current state and the
/// player's gold is tracked across the batch so it never overspends.
#[must_use]
pub fn plan_orders(state: &GameState, player: PlayerId) -> Vec<Order> {
    let Some(me) = state.player(player).filter(|p| !p.eliminated) else {
        return Vec::new();
    };
    let rules = &state.rules;
    let mut planner = Planner {
        state,
        player,
        budget: me.gold,
        orders: Vec::new(),
        claimed: BTreeSet::new(),
    };

    let ships: Vec<&Unit> = state
        .units
        .values()
        .filter(|u| u.is_alive() && u.owner == player)
        .collect();

    for ship in ships {
        if ship.is_in_combat() {
            continue;
        }
        if planner.dockyard_order(ship) || planner.deploy_order(ship) || planner.assault_order(ship) {
            continue;
        }
        planner.move_order(ship);
    }

    let yards: Vec<StructureId> = state
        .structures
        .values()
        .filter(|s| s.is_shipyard_of(player))
        .map(|s| s.id)
        .collect();
    let fleet = state.unit_count(player);
    for yard in yards {
        let fortify = Order::FortifyStructure {
            player,
            structure: yard,
        };
        if fleet >= FLEET_TARGET && planner.try_push(fortify, rules.fortify_cost) {
            continue;
        }
        planner.try_push(
            Order::BuildShip {
                player,
                structure: yard,
            },
            rules.ship_cost,
        );
    }

    planner.orders
}

/// Cheapest route from `unit` toward `goal`, cut to its remaining movement.
fn route_toward(state: &GameState, unit: &Unit, goal: HexCoord, budget: u32) -> Option<Vec<HexCoord>> {
    let mut route = find_path(&state.grid, unit.position, goal, budget)?;
    route.truncate(unit.movement_remaining as usize + 1);
    (route.len() >= 2).then_some(route)
}

struct Planner<'a> {
    state: &'a GameState,
    player: PlayerId,
    budget: u32,
    orders: Vec<Order>,
    claimed: BTreeSet<HexCoord>,
}

impl Planner<'_> {
    /// Queue `order` if it validates and fits the remaining budget.
    fn try_push(&mut self, order: Order, cost: u32) -> bool {
        if cost > self.budget || validate(&order, self.state).is_err() {
            return false;
        }
        self.budget -= cost;
        self.orders.push(order);
        true
    }

    fn dockyard_order(&mut self, ship: &Unit) -> bool {
        let state = self.state;
        let rules = &state.rules;
        let Some(yard) = state
            .structure_at(ship.position)
            .filter(|s| s.is_shipyard_of(self.player))
        else {
            return false;
        };

        if ship.is_damaged() {
            let repair = Order::RepairShip {
                player: self.player,
                unit: ship.id,
                structure: yard.id,
            };
            return self.try_push(repair, rules.repair_cost);
        }

        // Upgrade only out of surplus, keeping enough for a new ship
        if self.budget >= rules.upgrade_cost + rules.ship_cost {
            let upgrade = if ship.cannon_tier <= ship.sail_tier {
                UpgradeKind::Cannons
            } else {
                UpgradeKind::Sails
            };
            let order = Order::UpgradeShip {
                player: self.player,
                unit: ship.id,
                structure: yard.id,
                upgrade,
            };
            return self.try_push(order, rules.upgrade_cost);
        }
        false
    }

    fn deploy_order(&mut self, ship: &Unit) -> bool {
        if self.claimed.contains(&ship.position) {
            return false;
        }
        let order = Order::DeployShipyard {
            player: self.player,
            unit: ship.id,
            position: ship.position,
        };
        if self.try_push(order, self.state.rules.shipyard_cost) {
            self.claimed.insert(ship.position);
            return true;
        }
        false
    }

    fn assault_order(&mut self, ship: &Unit) -> bool {
        let state = self.state;
        let target = state.structures.values().find(|s| {
            s.kind.is_shipyard_class()
                && s.owner.is_some_and(|o| o != self.player)
                && s.position.is_adjacent(ship.position)
        });
        let Some(target) = target else {
            return false;
        };
        self.try_push(
            Order::AttackShipyard {
                player: self.player,
                unit: ship.id,
                structure: target.id,
            },
            0,
        )
    }

    fn move_order(&mut self, ship: &Unit) {
        let Some(goal) = self.move_goal(ship) else {
            return;
        };
        let Some(path) = route_toward(self.state, ship, goal, SEARCH_BUDGET) else {
            return;
        };
        if path.last() == Some(&goal) && self.state.grid.kind(goal) == Some(TileKind::Harbor) {
            self.claimed.insert(goal);
        }
        self.try_push(
            Order::Move {
                player: self.player,
                unit: ship.id,
                path,
            },
            0,
        );
    }

    fn move_goal(&self, ship: &Unit) -> Option<HexCoord> {
        let state = self.state;
        let from = ship.position;

        if ship.health_ratio() < state.rules.ai_retreat_threshold {
            let yards = state
                .structures
                .values()
                .filter(|s| s.is_shipyard_of(self.player))
                .map(|s| s.position);
            if let Some(goal) = nearest(from, yards) {
                return Some(goal);
            }
        }

        if self.budget >= state.rules.shipyard_cost {
            let harbors = state
                .structures
                .values()
                .filter(|s| s.is_free_harbor() && !self.claimed.contains(&s.position))
                .map(|s| s.position);
            if let Some(goal) = nearest(from, harbors) {
                return Some(goal);
            }
        }

        let enemies = state
            .units
            .values()
            .filter(|u| u.is_alive() && u.owner != self.player)
            .map(|u| u.position);
        if let Some(goal) = nearest(from, enemies) {
            return Some(goal);
        }

        let targets = state
            .structures
            .values()
            .filter(|s| s.kind.is_shipyard_class() && s.owner.is_some_and(|o| o != self.player))
            .map(|s| s.position);
        nearest(from, targets)
    }
}

/// Closest cell other than `from`, ties broken by coordinate order.
fn nearest(from: HexCoord, cells: impl Iterator<Item = HexCoord>) -> Option<HexCoord> {
    cells
        .filter(|c| *c != from)
        .min_by_key(|c| (from.distance(*c), *c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Grid, IslandId, Tile};
    use crate::math::percent;
    use crate::players::{Player, PlayerKind};
    use crate::structures::Structure;
    use crate::units::UnitKind;

    fn h(q: i32, r: i32) -> HexCoord {
        HexCoord::new(q, r)
    }

    struct Fixture {
        state: GameState,
        yard: StructureId,
    }

    fn fixture() -> Fixture {
        let rules = GameRules::default();
        let mut grid = Grid::hexagon(6);
        grid.insert(Tile::land(h(1, -1), IslandId(0)));
        grid.insert(Tile::harbor(h(0, 0), Some(IslandId(0))));
        grid.insert(Tile::harbor(h(2, -1), Some(IslandId(0))));

        let mut state = GameState::new(7, grid, rules.clone());
        state.players.insert(
            PlayerId(0),
            Player::new(PlayerId(0), "Grace", PlayerKind::Ai, rules.starting_gold),
        );
        state.players.insert(
            PlayerId(1),
            Player::new(PlayerId(1), "Jack", PlayerKind::Ai, rules.starting_gold),
        );

        let yard = state.structures.insert_with(|id| {
            let mut s = Structure::harbor(id, h(0, 0));
            s.claim(PlayerId(0), &rules.structures);
            s
        });
        state.construction.register_shipyard(yard);
        state
            .structures
            .insert_with(|id| Structure::harbor(id, h(2, -1)));
        Fixture { state, yard }
    }

    fn add_unit(state: &mut GameState, owner: PlayerId, at: HexCoord) -> UnitId {
        let (kind, stats) = if owner.is_pirate() {
            (UnitKind::PirateShip, state.rules.pirate)
        } else {
            (UnitKind::Ship, state.rules.ship)
        };
        state
            .units
            .insert_with(|id| Unit::new(id, owner, kind, at, stats))
    }

    #[test]
    fn test_encounter_policy() {
        let rules = GameRules::default();
        let mut ship = Unit::new(UnitId(1), PlayerId(0), UnitKind::Ship, h(0, 0), rules.ship);
        assert_eq!(
            encounter_decision(&ship, EncounterKind::Entry, &rules),
            Decision::Attack
        );

        ship.take_damage(3);
        assert!(ship.health_ratio() < percent(50));
        assert_eq!(
            encounter_decision(&ship, EncounterKind::Entry, &rules),
            Decision::Yield
        );
        assert_eq!(
            encounter_decision(&ship, EncounterKind::Passing, &rules),
            Decision::Proceed
        );

        let mut pirate = Unit::new(UnitId(2), PlayerId::PIRATE, UnitKind::PirateShip, h(0, 0), rules.pirate);
        pirate.take_damage(3);
        assert_eq!(
            encounter_decision(&pirate, EncounterKind::Passing, &rules),
            Decision::Attack
        );
    }

    #[test]
    fn test_pirates_hunt_nearest_ship_in_range() {
        let Fixture { mut state, .. } = fixture();
        let near = add_unit(&mut state, PlayerId(0), h(-3, 0));
        add_unit(&mut state, PlayerId(1), h(4, 0));
        let pirate = add_unit(&mut state, PlayerId::PIRATE, h(-3, 4));

        let moves = plan_pirate_moves(&state);
        assert_eq!(moves.len(), 1);
        let (id, route) = &moves[0];
        assert_eq!(*id, pirate);
        let movement = state.units.get(pirate).unwrap().movement_remaining as usize;
        assert_eq!(route.len(), movement);
        assert!(!route.contains(&h(-3, 4)));

        let target = state.units.get(near).unwrap().position;
        assert!(route.last().unwrap().distance(target) < h(-3, 4).distance(target));
    }

    #[test]
    fn test_pirates_ignore_distant_ships() {
        let Fixture { mut state, .. } = fixture();
        add_unit(&mut state, PlayerId(0), h(-6, 0));
        add_unit(&mut state, PlayerId::PIRATE, h(6, 0));
        assert!(plan_pirate_moves(&state).is_empty());
    }

    #[test]
    fn test_docked_damaged_ship_repairs() {
        let Fixture { mut state, yard } = fixture();
        let ship = add_unit(&mut state, PlayerId(0), h(0, 0));
        state.units.get_mut(ship).unwrap().take_damage(1);

        let orders = plan_orders(&state, PlayerId(0));
        assert!(orders.contains(&Order::RepairShip {
            player: PlayerId(0),
            unit: ship,
            structure: yard,
        }));
    }

    #[test]
    fn test_ship_on_free_harbor_deploys() {
        let Fixture { mut state, .. } = fixture();
        let ship = add_unit(&mut state, PlayerId(0), h(2, -1));
        let orders = plan_orders(&state, PlayerId(0));
        assert!(orders.contains(&Order::DeployShipyard {
            player: PlayerId(0),
            unit: ship,
            position: h(2, -1),
        }));
    }

    #[test]
    fn test_batch_is_valid_and_affordable() {
        let Fixture { mut state, .. } = fixture();
        add_unit(&mut state, PlayerId(0), h(-2, 1));
        add_unit(&mut state, PlayerId(0), h(-1, 2));
        add_unit(&mut state, PlayerId(1), h(4, -2));

        let orders = plan_orders(&state, PlayerId(0));
        assert!(!orders.is_empty());
        for order in &orders {
            assert_eq!(validate(order, &state), Ok(()));
            assert_eq!(order.player(), PlayerId(0));
        }

        let rules = &state.rules;
        let spent: u32 = orders
            .iter()
            .map(|o| match o {
                Order::DeployShipyard { .. } => rules.shipyard_cost,
                Order::BuildShip { .. } => rules.ship_cost,
                Order::RepairShip { .. } => rules.repair_cost,
                Order::UpgradeShip { .. } => rules.upgrade_cost,
                Order::FortifyStructure { .. } => rules.fortify_cost,
                Order::Move { .. } | Order::AttackShipyard { .. } => 0,
            })
            .sum();
        assert!(spent <= state.player(PlayerId(0)).unwrap().gold);
    }

    #[test]
    fn test_eliminated_player_plans_nothing() {
        let Fixture { mut state, .. } = fixture();
        add_unit(&mut state, PlayerId(1), h(3, 0));
        state.players.get_mut(&PlayerId(1)).unwrap().eliminated = true;
        assert!(plan_orders(&state, PlayerId(1)).is_empty());
    }
}
