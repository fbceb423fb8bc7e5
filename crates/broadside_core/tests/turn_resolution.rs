//! End-to-end turn resolution scenarios.
//!
//! Every scenario is hand-placed with the scenario builder and driven
//! through the public engine API, the same way a UI or server would.

use broadside_core::prelude::*;
use broadside_test_utils::fixtures::{east, hex, ship_id, structure_id, ScenarioBuilder};

fn move_order(player: u32, unit: UnitId, path: Vec<HexCoord>) -> Order {
    Order::Move {
        player: PlayerId(player),
        unit,
        path,
    }
}

fn complete(engine: &mut GameEngine) -> TurnResult {
    match engine.resolve_turn().unwrap() {
        TurnProgress::Complete(result) => result,
        TurnProgress::AwaitingDecisions(open) => panic!("unexpected pending encounters: {open:?}"),
    }
}

fn count(events: &[GameEvent], name: &str) -> usize {
    events.iter().filter(|e| e.kind.name() == name).count()
}

fn health(engine: &GameEngine, unit: UnitId) -> u32 {
    engine.state().units.get(unit).map_or(0, |u| u.health)
}

fn position(engine: &GameEngine, unit: UnitId) -> HexCoord {
    engine.state().units.get(unit).unwrap().position
}

/// Two hostile ships swapping across one edge.
fn swap_scenario() -> GameEngine {
    let mut engine = ScenarioBuilder::duel()
        .ship(0, hex(0, 0))
        .ship(1, hex(1, 0))
        .engine();
    let (a, b) = (ship_id(0), ship_id(1));
    engine
        .submit_orders(PlayerId(0), vec![move_order(0, a, vec![hex(0, 0), hex(1, 0)])])
        .unwrap();
    engine
        .submit_orders(PlayerId(1), vec![move_order(1, b, vec![hex(1, 0), hex(0, 0)])])
        .unwrap();
    engine
}

// =============================================================================
// Passing
// =============================================================================

#[test]
fn test_passing_ships_that_proceed_swap_unharmed() {
    let mut engine = swap_scenario();
    let (a, b) = (ship_id(0), ship_id(1));

    let TurnProgress::AwaitingDecisions(open) = engine.resolve_turn().unwrap() else {
        panic!("expected a passing encounter");
    };
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].kind(), EncounterKind::Passing);
    assert_eq!(
        open[0].key,
        EncounterKey::Edge(EdgeKey::new(hex(0, 0), hex(1, 0)))
    );

    assert!(!engine.submit_decision(a, Decision::Proceed).unwrap());
    assert!(engine.submit_decision(b, Decision::Proceed).unwrap());
    let result = complete(&mut engine);

    assert_eq!(position(&engine, a), hex(1, 0));
    assert_eq!(position(&engine, b), hex(0, 0));
    assert_eq!(health(&engine, a), 5);
    assert_eq!(health(&engine, b), 5);
    assert_eq!(count(&result.events, "combat_occurred"), 0);
    assert_eq!(count(&result.events, "unit_moved"), 2);
}

#[test]
fn test_passing_attack_holds_both_and_deals_damage() {
    let mut engine = swap_scenario();
    let (a, b) = (ship_id(0), ship_id(1));

    engine.resolve_turn().unwrap();
    engine.submit_decision(a, Decision::Attack).unwrap();
    engine.submit_decision(b, Decision::Proceed).unwrap();
    let result = complete(&mut engine);

    assert_eq!(position(&engine, a), hex(0, 0));
    assert_eq!(position(&engine, b), hex(1, 0));
    assert_eq!(count(&result.events, "combat_occurred"), 1);

    // Two dice a side: every pair hurts exactly one ship
    let lost = 10 - health(&engine, a) - health(&engine, b);
    assert_eq!(lost, 2 * engine.state().rules.damage_per_hit);

    // Still adjacent, so the fight carries into next turn
    let combat = engine.state().combat_of(a).unwrap();
    assert!(combat.is_pair(a, b));
    assert!(engine.state().units.get(a).unwrap().queued_path.is_empty());
}

// =============================================================================
// Entry
// =============================================================================

#[test]
fn test_entry_all_yield_leaves_tile_empty() {
    let mut engine = ScenarioBuilder::duel()
        .ship(0, hex(-1, 0))
        .ship(1, hex(1, 0))
        .engine();
    let (a, b) = (ship_id(0), ship_id(1));
    engine
        .submit_orders(PlayerId(0), vec![move_order(0, a, east(hex(-1, 0), 1))])
        .unwrap();
    engine
        .submit_orders(PlayerId(1), vec![move_order(1, b, vec![hex(1, 0), hex(0, 0)])])
        .unwrap();

    let TurnProgress::AwaitingDecisions(open) = engine.resolve_turn().unwrap() else {
        panic!("expected an entry encounter");
    };
    assert_eq!(open[0].key, EncounterKey::Tile(hex(0, 0)));
    engine.submit_decision(a, Decision::Yield).unwrap();
    engine.submit_decision(b, Decision::Yield).unwrap();
    let result = complete(&mut engine);

    assert_eq!(result.collisions.len(), 1);
    assert_eq!(result.collisions[0].tile, hex(0, 0));
    assert_eq!(position(&engine, a), hex(-1, 0));
    assert_eq!(position(&engine, b), hex(1, 0));
    assert_eq!(engine.state().units_at(hex(0, 0)).count(), 0);
    // The unfinished step is kept for next turn
    assert_eq!(
        engine.state().units.get(a).unwrap().queued_path,
        vec![hex(0, 0)]
    );
}

#[test]
fn test_friendly_ships_share_a_tile() {
    let mut engine = ScenarioBuilder::duel()
        .ship(0, hex(-1, 0))
        .ship(0, hex(1, 0))
        .ship(1, hex(0, 4))
        .engine();
    let (a, b) = (ship_id(0), ship_id(1));
    engine
        .submit_orders(
            PlayerId(0),
            vec![
                move_order(0, a, vec![hex(-1, 0), hex(0, 0)]),
                move_order(0, b, vec![hex(1, 0), hex(0, 0)]),
            ],
        )
        .unwrap();

    let result = complete(&mut engine);
    assert_eq!(result.collisions.len(), 1);
    assert_eq!(count(&result.events, "conflict_detected"), 0);
    assert_eq!(engine.state().units_at(hex(0, 0)).count(), 2);
}

#[test]
fn test_pirate_kill_pays_bounty() {
    let mut kills = 0;
    for seed in 0..20 {
        let mut state = ScenarioBuilder::ai_duel()
            .seed(seed)
            .ship(0, hex(0, 0))
            .ship(1, hex(0, 4))
            .pirate(hex(1, 0))
            .build();
        let pirate = ship_id(2);
        state.units.get_mut(pirate).unwrap().health = 1;
        let mut engine = GameEngine::from_state(state);
        engine
            .submit_orders(PlayerId(0), vec![move_order(0, ship_id(0), east(hex(0, 0), 1))])
            .unwrap();

        let gold_before = engine.state().players[&PlayerId(0)].gold;
        let result = complete(&mut engine);
        let bounty = result.events.iter().find_map(|e| match e.kind {
            GameEventKind::BountyAwarded { player, amount, .. } if player == PlayerId(0) => {
                Some(amount)
            }
            _ => None,
        });
        let Some(bounty) = bounty else {
            continue;
        };

        kills += 1;
        let rules = &engine.state().rules;
        assert!(bounty >= rules.bounty_min && bounty <= rules.bounty_max);
        assert_eq!(
            engine.state().players[&PlayerId(0)].gold,
            gold_before + bounty + rules.base_income
        );
        assert!(engine.state().units.get(pirate).is_none());
    }
    assert!(kills > 0, "no seed sank the pirate");
}

// =============================================================================
// Movement
// =============================================================================

#[test]
fn test_movement_stops_at_capacity_and_resumes() {
    let mut state = ScenarioBuilder::duel()
        .radius(6)
        .ship(0, hex(-5, 0))
        .ship(1, hex(0, 5))
        .build();
    let a = ship_id(0);
    state.units.get_mut(a).unwrap().queued_path = east(hex(-5, 0), 8)[1..].to_vec();
    let mut engine = GameEngine::from_state(state);

    let capacity = engine.state().units.get(a).unwrap().movement_capacity;
    let result = complete(&mut engine);
    assert_eq!(position(&engine, a), hex(-5 + capacity as i32, 0));
    let partial = result.events.iter().any(|e| {
        matches!(e.kind, GameEventKind::UnitMoved { unit, partial: true, .. } if unit == a)
    });
    assert!(partial);

    complete(&mut engine);
    complete(&mut engine);
    assert_eq!(position(&engine, a), hex(3, 0));
    assert!(engine.state().units.get(a).unwrap().queued_path.is_empty());
}

#[test]
fn test_route_through_land_is_rejected() {
    let mut engine = ScenarioBuilder::duel()
        .land(hex(1, 0))
        .ship(0, hex(0, 0))
        .ship(1, hex(0, 4))
        .engine();
    let rejected = engine
        .submit_orders(PlayerId(0), vec![move_order(0, ship_id(0), east(hex(0, 0), 2))])
        .unwrap();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].reason, OrderRejection::InvalidPath);
}

// =============================================================================
// Construction
// =============================================================================

#[test]
fn test_build_queue_is_bounded() {
    let mut rules = GameRules::default();
    rules.starting_gold = 10_000;
    let mut engine = ScenarioBuilder::duel()
        .rules(rules.clone())
        .shipyard(0, hex(0, 0))
        .ship(0, hex(-2, 0))
        .ship(1, hex(0, 4))
        .engine();
    let yard = structure_id(0);
    let build = Order::BuildShip {
        player: PlayerId(0),
        structure: yard,
    };

    engine
        .submit_orders(PlayerId(0), vec![build.clone(); 6])
        .unwrap();
    let result = complete(&mut engine);

    assert_eq!(count(&result.events, "build_queued"), 5);
    assert_eq!(result.rejections.len(), 1);
    assert_eq!(result.rejections[0].reason, OrderRejection::QueueFull(yard));
    assert_eq!(engine.state().construction.queue(yard).unwrap().len(), 5);
    assert_eq!(
        engine.state().players[&PlayerId(0)].gold,
        10_000 - 5 * rules.ship_cost + rules.base_income + rules.income_per_shipyard
    );
}

#[test]
fn test_ship_launches_after_build_time() {
    let mut engine = ScenarioBuilder::duel()
        .shipyard(0, hex(0, 0))
        .ship(0, hex(-2, 0))
        .ship(1, hex(0, 4))
        .engine();
    let yard = structure_id(0);
    engine
        .submit_orders(
            PlayerId(0),
            vec![Order::BuildShip {
                player: PlayerId(0),
                structure: yard,
            }],
        )
        .unwrap();

    let build_time = engine.state().rules.ship_build_time;
    for turn in 1..build_time {
        let result = complete(&mut engine);
        assert_eq!(count(&result.events, "ship_built"), 0, "early launch on turn {turn}");
    }
    let result = complete(&mut engine);
    assert_eq!(count(&result.events, "ship_built"), 1);
    assert_eq!(engine.state().unit_count(PlayerId(0)), 2);
    assert_eq!(engine.state().units_at(hex(0, 0)).count(), 1);
}

#[test]
fn test_fortify_upgrades_in_place() {
    let mut rules = GameRules::default();
    rules.starting_gold = 1_000;
    let mut engine = ScenarioBuilder::duel()
        .rules(rules)
        .shipyard(0, hex(0, 0))
        .ship(1, hex(0, 4))
        .engine();
    let yard = structure_id(0);
    engine
        .submit_orders(
            PlayerId(0),
            vec![Order::FortifyStructure {
                player: PlayerId(0),
                structure: yard,
            }],
        )
        .unwrap();

    let turns = engine.state().rules.fortify_build_time;
    let mut upgraded = 0;
    for _ in 0..turns {
        upgraded += count(&complete(&mut engine).events, "structure_upgraded");
    }
    assert_eq!(upgraded, 1);
    let s = engine.state().structures.get(yard).unwrap();
    assert_eq!(s.kind, StructureKind::NavalYard);
    assert_eq!(s.health, engine.state().rules.structures.naval_yard_health);
}

// =============================================================================
// Suspension and persistence
// =============================================================================

#[test]
fn test_suspended_turn_survives_save_and_load() {
    let mut engine = swap_scenario();
    let (a, b) = (ship_id(0), ship_id(1));
    engine.resolve_turn().unwrap();
    engine.submit_decision(a, Decision::Attack).unwrap();

    let bytes = engine.save_state().unwrap();
    let mut restored = GameEngine::load_state(&bytes).unwrap();
    assert_eq!(restored.state().stage(), ResolutionStage::ConflictPending);
    assert_eq!(restored.pending_encounters().len(), 1);
    assert!(restored.state().awaits_decision(b));
    assert!(!restored.state().awaits_decision(a));

    engine.submit_decision(b, Decision::Proceed).unwrap();
    restored.submit_decision(b, Decision::Proceed).unwrap();
    let original = complete(&mut engine);
    let reloaded = complete(&mut restored);

    assert_eq!(original, reloaded);
    assert_eq!(engine.state_hash().unwrap(), restored.state_hash().unwrap());
}

#[test]
fn test_identical_inputs_resolve_identically() {
    let build = || {
        ScenarioBuilder::ai_duel()
            .seed(77)
            .ship(0, hex(-2, 0))
            .ship(0, hex(-2, 1))
            .ship(1, hex(2, 0))
            .ship(1, hex(2, -1))
            .pirate(hex(0, 3))
            .engine()
    };
    let mut first = build();
    let mut second = build();

    for _ in 0..5 {
        if first.is_game_over() {
            break;
        }
        first.plan_ai_orders().unwrap();
        second.plan_ai_orders().unwrap();
        assert_eq!(complete(&mut first), complete(&mut second));
    }
    assert_eq!(first.state(), second.state());
}
