//! Proptest strategies.
//!
//! These strategies generate random but reproducible inputs for
//! property-based tests of the core.

use proptest::prelude::*;

use broadside_core::encounter::{Decision, EncounterKind};
use broadside_core::hex::HexCoord;
use broadside_core::map_generation::MapConfig;

/// A coordinate within `radius` of the origin.
pub fn arb_hex(radius: u32) -> impl Strategy<Value = HexCoord> {
    let r = radius as i32;
    (-r..=r, -r..=r)
        .prop_filter("outside the hexagon", move |(q, s)| {
            HexCoord::new(*q, *s).length() <= radius
        })
        .prop_map(|(q, r)| HexCoord::new(q, r))
}

/// Any game seed.
pub fn arb_seed() -> impl Strategy<Value = u64> {
    any::<u64>()
}

/// A small generated map with a random seed and two or three players.
pub fn arb_map_config() -> impl Strategy<Value = MapConfig> {
    (arb_seed(), 2u32..=3).prop_map(|(seed, players)| {
        MapConfig::small()
            .with_seed(seed)
            .with_players(players)
            .with_islands(5, 3, 6)
    })
}

/// A decision that is legal for `kind`.
pub fn arb_decision(kind: EncounterKind) -> impl Strategy<Value = Decision> {
    prop_oneof![Just(Decision::peaceful(kind)), Just(Decision::Attack)]
}

/// A set of dice faces.
pub fn arb_rolls(max_dice: usize, sides: u32) -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(1..=sides, 1..=max_dice)
}

/// Ship health between 1 and 10.
pub fn arb_health() -> impl Strategy<Value = u32> {
    1u32..=10
}

/// A walk of up to `max_steps` random direction indices.
pub fn arb_directions(max_steps: usize) -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0usize..6, 0..=max_steps)
}
