//! Dice combat between ships and against shipyards.
//!
//! Each side rolls dice according to its tier, both rolls are sorted high
//! to low and compared pairwise down to the shorter side. The loser of each
//! pair takes `damage_per_hit`; ties go to the defender.
//!
//! Randomness comes from a ChaCha stream derived from the game seed, the
//! turn number and a per-turn combat counter, so a resolution can be
//! suspended, serialized and resumed without carrying RNG state.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::data::GameRules;
use crate::hex::HexCoord;
use crate::ids::UnitId;
use crate::structures::Structure;
use crate::units::Unit;

/// Random stream used for one combat or bounty roll.
pub type CombatRng = ChaCha8Rng;

/// Derive the random stream for the `sequence`-th draw of a turn.
#[must_use]
pub fn combat_rng(seed: u64, turn: u32, sequence: u32) -> CombatRng {
    let mut bytes = [0u8; 32];
    bytes[..8].copy_from_slice(&seed.to_le_bytes());
    bytes[8..12].copy_from_slice(&turn.to_le_bytes());
    bytes[12..16].copy_from_slice(&sequence.to_le_bytes());
    bytes[16..24].copy_from_slice(b"combat\0\0");
    ChaCha8Rng::from_seed(bytes)
}

/// Roll `count` dice with `sides` faces, sorted high to low.
pub fn roll_dice(rng: &mut impl Rng, count: u32, sides: u32) -> Vec<u32> {
    let mut rolls: Vec<u32> = (0..count).map(|_| rng.gen_range(1..=sides)).collect();
    rolls.sort_unstable_by(|a, b| b.cmp(a));
    rolls
}

/// Compare two sorted rolls pairwise.
///
/// Returns `(damage_to_attacker, damage_to_defender)`.
#[must_use]
pub fn compare_rolls(attacker: &[u32], defender: &[u32], damage_per_hit: u32) -> (u32, u32) {
    attacker
        .iter()
        .zip(defender)
        .fold((0, 0), |(to_attacker, to_defender), (a, d)| {
            if a > d {
                (to_attacker, to_defender + damage_per_hit)
            } else {
                (to_attacker + damage_per_hit, to_defender)
            }
        })
}

/// Result of one duel round between two ships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuelOutcome {
    /// Initiating unit.
    pub attacker: UnitId,
    /// Defending unit.
    pub defender: UnitId,
    /// Attacker's dice.
    pub attacker_rolls: Vec<u32>,
    /// Defender's dice.
    pub defender_rolls: Vec<u32>,
    /// Damage to the attacker.
    pub damage_to_attacker: u32,
    /// Damage to the defender.
    pub damage_to_defender: u32,
    /// Whether the damage sinks the attacker.
    pub attacker_destroyed: bool,
    /// Whether the damage sinks the defender.
    pub defender_destroyed: bool,
}

/// Roll one round of combat. Does not mutate the units.
pub fn resolve_duel(
    attacker: &Unit,
    defender: &Unit,
    rules: &GameRules,
    rng: &mut impl Rng,
) -> DuelOutcome {
    let attacker_rolls = roll_dice(rng, rules.dice_for_tier(attacker.cannon_tier), rules.dice_sides);
    let defender_rolls = roll_dice(rng, rules.dice_for_tier(defender.cannon_tier), rules.dice_sides);
    let (damage_to_attacker, damage_to_defender) =
        compare_rolls(&attacker_rolls, &defender_rolls, rules.damage_per_hit);

    DuelOutcome {
        attacker: attacker.id,
        defender: defender.id,
        attacker_destroyed: damage_to_attacker >= attacker.health,
        defender_destroyed: damage_to_defender >= defender.health,
        attacker_rolls,
        defender_rolls,
        damage_to_attacker,
        damage_to_defender,
    }
}

/// Result of a ship bombarding a structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssaultOutcome {
    /// Ship's dice.
    pub attacker_rolls: Vec<u32>,
    /// Structure's dice.
    pub defender_rolls: Vec<u32>,
    /// Damage to the ship.
    pub damage_to_attacker: u32,
    /// Damage to the structure.
    pub damage_to_structure: u32,
    /// Whether the ship sinks.
    pub attacker_destroyed: bool,
    /// Whether the structure falls.
    pub structure_destroyed: bool,
}

/// Roll a ship's cannons against a structure's defense tier.
pub fn resolve_structure_assault(
    attacker: &Unit,
    structure: &Structure,
    rules: &GameRules,
    rng: &mut impl Rng,
) -> AssaultOutcome {
    let attacker_rolls = roll_dice(rng, rules.dice_for_tier(attacker.cannon_tier), rules.dice_sides);
    let defender_rolls = roll_dice(
        rng,
        rules.dice_for_tier(structure.kind.defense_tier()),
        rules.dice_sides,
    );
    let (damage_to_attacker, damage_to_structure) =
        compare_rolls(&attacker_rolls, &defender_rolls, rules.damage_per_hit);

    AssaultOutcome {
        attacker_destroyed: damage_to_attacker >= attacker.health,
        structure_destroyed: damage_to_structure >= structure.health,
        attacker_rolls,
        defender_rolls,
        damage_to_attacker,
        damage_to_structure,
    }
}

/// Gold awarded for sinking a pirate.
pub fn roll_bounty(rng: &mut impl Rng, rules: &GameRules) -> u32 {
    rng.gen_range(rules.bounty_min..=rules.bounty_max)
}

/// A multi-turn engagement between two adjacent units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OngoingCombat {
    /// Lower unit id.
    pub first: UnitId,
    /// Higher unit id.
    pub second: UnitId,
    /// Position of `first` when the engagement began.
    pub first_position: HexCoord,
    /// Position of `second` when the engagement began.
    pub second_position: HexCoord,
    /// Turn the engagement began.
    pub started_turn: u32,
    /// Turns the engagement has lasted.
    pub turns_engaged: u32,
    /// Rounds fought so far.
    pub round: u32,
}

impl OngoingCombat {
    /// Start an engagement after its first round.
    #[must_use]
    pub fn new(turn: u32, a: UnitId, a_position: HexCoord, b: UnitId, b_position: HexCoord) -> Self {
        let ((first, first_position), (second, second_position)) = if a <= b {
            ((a, a_position), (b, b_position))
        } else {
            ((b, b_position), (a, a_position))
        };
        Self {
            first,
            second,
            first_position,
            second_position,
            started_turn: turn,
            turns_engaged: 1,
            round: 1,
        }
    }

    /// Whether the pair is the same as `a`/`b` in either order.
    #[must_use]
    pub fn is_pair(&self, a: UnitId, b: UnitId) -> bool {
        (self.first == a && self.second == b) || (self.first == b && self.second == a)
    }

    /// Whether the engagement involves `unit`.
    #[must_use]
    pub fn involves(&self, unit: UnitId) -> bool {
        self.first == unit || self.second == unit
    }

    /// The opponent of `unit`, if it takes part.
    #[must_use]
    pub fn opponent_of(&self, unit: UnitId) -> Option<UnitId> {
        if self.first == unit {
            Some(self.second)
        } else if self.second == unit {
            Some(self.first)
        } else {
            None
        }
    }

    /// Record another round fought on a new turn.
    pub fn continue_round(&mut self) {
        self.turns_engaged += 1;
        self.round += 1;
    }
}
