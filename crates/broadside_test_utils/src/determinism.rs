//! Determinism testing utilities.
//!
//! Provides a harness for verifying that turn resolution produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Hot-seat, networked and replayed games must all agree turn for turn.
//! Sources of non-determinism include:
//!
//! - **Floating-point math**: ratios use [`broadside_core::math::Fixed`].
//!
//! - **HashMap iteration order**: the core only uses ordered maps and
//!   iterates entities in id order.
//!
//! - **System randomness**: every roll draws from a stream seeded by the game
//!   seed, the turn and a per-turn sequence number.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: individual modules (dice, detection, queues)
//! 2. **Property tests**: random inputs must still produce deterministic outputs
//! 3. **Integration tests**: full games are reproducible
//! 4. **Parallel tests**: running N games on threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use broadside_core::ai;
use broadside_core::encounter::Decision;
use broadside_core::engine::{GameEngine, GameSetup};
use broadside_core::resolver::{TurnProgress, TurnResult};

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps simulated.
    pub turns: u32,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic game).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the game was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Game is non-deterministic!\n\
                 Runs: {}\n\
                 Turns: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.turns,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a stepped process multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `turns` - Number of steps per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance by one step
/// * `hash` - Function to compute the state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    turns: u32,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..turns {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        turns,
    }
}

/// Play one turn with every seat driven by the built-in AI.
///
/// Human seats submit no orders but answer their encounters with the AI
/// encounter policy, so mixed tables never stall. Returns `None` once the
/// game is over or if the engine refuses an input.
pub fn play_turn(engine: &mut GameEngine) -> Option<TurnResult> {
    if engine.is_game_over() {
        return None;
    }
    engine.plan_ai_orders().ok()?;

    loop {
        match engine.resolve_turn().ok()? {
            TurnProgress::Complete(result) => return Some(result),
            TurnProgress::AwaitingDecisions(open) => {
                for encounter in open {
                    let kind = encounter.kind();
                    for unit in encounter.undecided() {
                        if !engine.state().awaits_decision(unit) {
                            continue;
                        }
                        let decision = engine.state().units.get(unit).map_or(
                            Decision::peaceful(kind),
                            |u| ai::encounter_decision(u, kind, &engine.state().rules),
                        );
                        engine.submit_decision(unit, decision).ok()?;
                    }
                }
            }
        }
    }
}

/// Start a game, panicking on setup failure.
///
/// # Panics
///
/// Panics if the setup cannot produce a game.
#[must_use]
pub fn start(setup: &GameSetup) -> GameEngine {
    match GameEngine::new_game(setup) {
        Ok(engine) => engine,
        Err(e) => panic!("Test setup failed: {e}"),
    }
}

/// Hash of an engine's state, panicking on encoding failure.
///
/// # Panics
///
/// Panics if the state cannot be encoded.
#[must_use]
pub fn hash_of(engine: &GameEngine) -> u64 {
    match engine.state_hash() {
        Ok(hash) => hash,
        Err(e) => panic!("State hash failed: {e}"),
    }
}

/// Play the same AI game twice and compare final hashes.
#[must_use]
pub fn verify_game_determinism(setup: &GameSetup, turns: u32) -> DeterminismResult {
    verify_determinism(
        2,
        turns,
        || start(setup),
        |engine| {
            play_turn(engine);
        },
        hash_of,
    )
}

/// Result of parallel game runs.
#[derive(Debug, Clone)]
pub struct ParallelGameResult {
    /// Final state hash from each game.
    pub hashes: Vec<u64>,
    /// Number of turns each game ran.
    pub turns: u32,
    /// Number of games run.
    pub num_games: usize,
}

impl ParallelGameResult {
    /// Check if all games produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all games matched.
    ///
    /// # Panics
    ///
    /// Panics if games produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel games diverged!\n\
                 Games: {}\n\
                 Turns: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_games,
                self.turns,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run N copies of a game on scoped threads and collect final hashes.
///
/// # Panics
///
/// Panics if a game thread panics.
#[must_use]
pub fn run_parallel_games(setup: &GameSetup, num_games: usize, turns: u32) -> ParallelGameResult {
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_games)
            .map(|_| {
                s.spawn(|| {
                    let mut engine = start(setup);
                    for _ in 0..turns {
                        play_turn(&mut engine);
                    }
                    hash_of(&engine)
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    ParallelGameResult {
        hashes,
        turns,
        num_games,
    }
}

/// Compare two runs turn by turn, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs agree throughout, `Some(turn)` for the first turn
/// after which they differ (0 means the initial states differ).
#[must_use]
pub fn find_first_divergence(setup: &GameSetup, turns: u32) -> Option<u32> {
    let mut first = start(setup);
    let mut second = start(setup);

    if hash_of(&first) != hash_of(&second) {
        return Some(0);
    }

    for turn in 1..=turns {
        play_turn(&mut first);
        play_turn(&mut second);

        if hash_of(&first) != hash_of(&second) {
            tracing::warn!("Games diverged after turn {}", turn);
            return Some(turn);
        }
    }

    None
}

/// Verify that a save/load round trip mid-game does not change the future.
///
/// Plays `turns`, saves, reloads, then plays one more turn on both the
/// original and the restored engine.
#[must_use]
pub fn verify_serialization_determinism(setup: &GameSetup, turns: u32) -> bool {
    let mut engine = start(setup);
    for _ in 0..turns {
        play_turn(&mut engine);
    }

    let Ok(bytes) = engine.save_state() else {
        return false;
    };
    let Ok(mut restored) = GameEngine::load_state(&bytes) else {
        return false;
    };
    if hash_of(&engine) != hash_of(&restored) {
        return false;
    }

    play_turn(&mut engine);
    play_turn(&mut restored);
    hash_of(&engine) == hash_of(&restored)
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}
