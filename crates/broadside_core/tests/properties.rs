//! Property-based tests for the core invariants.

use std::collections::BTreeMap;

use proptest::prelude::*;

use broadside_core::combat::compare_rolls;
use broadside_core::map_generation::generate;
use broadside_core::pathfinding::{find_path, is_contiguous, step_count};
use broadside_core::prelude::*;
use broadside_test_utils::determinism::{play_turn, start, verify_game_determinism};
use broadside_test_utils::fixtures::hex;
use broadside_test_utils::strategies::{arb_directions, arb_hex, arb_map_config, arb_rolls, arb_seed};

proptest! {
    #[test]
    fn prop_distance_is_symmetric(a in arb_hex(8), b in arb_hex(8)) {
        prop_assert_eq!(a.distance(b), b.distance(a));
        prop_assert_eq!(a.distance(a), 0);
    }

    #[test]
    fn prop_distance_obeys_triangle_inequality(
        a in arb_hex(8),
        b in arb_hex(8),
        c in arb_hex(8),
    ) {
        prop_assert!(a.distance(c) <= a.distance(b) + b.distance(c));
    }

    #[test]
    fn prop_neighbors_are_one_step_away(a in arb_hex(8)) {
        for (i, n) in a.neighbors().into_iter().enumerate() {
            prop_assert_eq!(a.distance(n), 1);
            prop_assert_eq!(a.direction(n), Some(i));
        }
    }

    #[test]
    fn prop_ring_has_six_r_cells(a in arb_hex(4), radius in 1u32..6) {
        let ring = a.ring(radius);
        prop_assert_eq!(ring.len(), 6 * radius as usize);
        prop_assert!(ring.iter().all(|c| a.distance(*c) == radius));
    }

    /// A walk of n steps never ends further than n away.
    #[test]
    fn prop_walk_is_bounded(start in arb_hex(3), walk in arb_directions(12)) {
        let end = walk.iter().fold(start, |at, d| at.neighbor(*d));
        prop_assert!(start.distance(end) <= walk.len() as u32);
    }

    /// Every compared pair of dice hurts exactly one side.
    #[test]
    fn prop_dice_damage_is_conserved(
        attacker in arb_rolls(5, 6),
        defender in arb_rolls(5, 6),
        damage in 1u32..4,
    ) {
        let (to_attacker, to_defender) = compare_rolls(&attacker, &defender, damage);
        let pairs = attacker.len().min(defender.len()) as u32;
        prop_assert_eq!(to_attacker + to_defender, pairs * damage);
    }

    #[test]
    fn prop_ties_favor_the_defender(face in 1u32..=6, dice in 1usize..4) {
        let rolls = vec![face; dice];
        prop_assert_eq!(compare_rolls(&rolls, &rolls, 1), (dice as u32, 0));
    }

    /// On open sea the shortest route is exactly the hex distance.
    #[test]
    fn prop_open_sea_paths_are_shortest(a in arb_hex(5), b in arb_hex(5)) {
        prop_assume!(a != b);
        let grid = Grid::hexagon(5);
        let path = find_path(&grid, a, b, 20);
        prop_assert!(path.is_some());
        let path = path.unwrap_or_default();
        prop_assert_eq!(path.first(), Some(&a));
        prop_assert_eq!(path.last(), Some(&b));
        prop_assert!(is_contiguous(&grid, &path));
        prop_assert_eq!(step_count(&path), a.distance(b));
    }

    #[test]
    fn prop_build_queue_never_exceeds_limit(attempts in 0usize..12) {
        let rules = GameRules::default();
        let yard = StructureId(1);
        let mut construction = ConstructionManager::new(&rules);
        construction.register_shipyard(yard);

        let accepted = (0..attempts)
            .filter(|_| construction.enqueue(yard, BuildItemKind::Ship).is_ok())
            .count();
        prop_assert_eq!(accepted, attempts.min(rules.max_queue_size));
        prop_assert!(construction.queue(yard).map_or(0, |q| q.len()) <= rules.max_queue_size);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_map_generation_is_deterministic(config in arb_map_config()) {
        match (generate(&config), generate(&config)) {
            (Ok(first), Ok(second)) => {
                prop_assert_eq!(&first, &second);
                for player in 0..config.num_players {
                    prop_assert!(first.start_island(PlayerId(player)).is_some());
                }
            }
            (Err(first), Err(second)) => prop_assert_eq!(first.to_string(), second.to_string()),
            _ => prop_assert!(false, "generation outcome changed between runs"),
        }
    }

    /// No ship moves further in one turn than its movement allows.
    #[test]
    fn prop_movement_respects_budget(seed in arb_seed()) {
        let setup = GameSetup::ai_match(seed, 2).with_map(MapConfig::small().with_seed(seed));
        prop_assume!(GameEngine::new_game(&setup).is_ok());
        let mut engine = start(&setup);

        for _ in 0..4 {
            let before: BTreeMap<UnitId, HexCoord> = engine
                .state()
                .units
                .values()
                .map(|u| (u.id, u.position))
                .collect();
            if play_turn(&mut engine).is_none() {
                break;
            }
            for unit in engine.state().units.values() {
                if let Some(&from) = before.get(&unit.id) {
                    prop_assert!(from.distance(unit.position) <= unit.movement_capacity);
                }
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(6))]

    #[test]
    fn prop_random_games_are_deterministic(seed in arb_seed()) {
        let setup = GameSetup::ai_match(seed, 2).with_map(MapConfig::small().with_seed(seed));
        prop_assume!(GameEngine::new_game(&setup).is_ok());
        prop_assert!(verify_game_determinism(&setup, 8).is_deterministic);
    }
}

#[test]
fn test_origin_ring_starts_toward_direction_four() {
    assert_eq!(hex(0, 0).ring(1)[0], hex(0, 0).neighbor(4));
}
