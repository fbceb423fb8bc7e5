//! Batch game runner for balance testing.
//!
//! Runs many seeded games in parallel using rayon and aggregates their
//! metrics.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use broadside_core::data::GameRules;

use crate::error::{HeadlessError, Result};
use crate::game_runner::{run_game, GameConfig, MapSize, DEFAULT_MAX_TURNS};
use crate::metrics::{BatchSummary, GameMetrics};

/// Configuration for a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of games to run
    pub game_count: u32,
    /// Maximum parallel games (0 = use rayon default)
    pub parallel_games: u32,
    /// Starting seed; game `i` uses `seed_start + i`
    pub seed_start: u64,
    /// AI seats per game
    pub players: u32,
    /// Map preset
    pub map_size: MapSize,
    /// Turn limit per game
    pub max_turns: u32,
    /// Balance constants
    pub rules: GameRules,
    /// Output directory for results
    pub output_dir: PathBuf,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            game_count: 100,
            parallel_games: 0,
            seed_start: 0,
            players: 2,
            map_size: MapSize::Small,
            max_turns: DEFAULT_MAX_TURNS,
            rules: GameRules::default(),
            output_dir: PathBuf::from("results"),
        }
    }
}

impl BatchConfig {
    /// Create config for `game_count` games
    pub fn new(game_count: u32) -> Self {
        Self {
            game_count,
            ..Default::default()
        }
    }

    /// Set output directory
    pub fn with_output(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    /// Set seed start
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set the turn limit
    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Config for the game at `index`
    pub fn game(&self, index: u32) -> GameConfig {
        GameConfig::new(self.seed_start.wrapping_add(u64::from(index)))
            .with_players(self.players)
            .with_map_size(self.map_size)
            .with_max_turns(self.max_turns)
            .with_rules(self.rules.clone())
    }
}

/// Results from a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Individual game metrics, in seed order
    pub games: Vec<GameMetrics>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
    /// Errors encountered
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| HeadlessError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| HeadlessError::io(path, e))
    }

    /// Load results from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| HeadlessError::io(path, e))?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Error during batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    /// Game index
    pub game_index: u32,
    /// Seed used
    pub seed: u64,
    /// Error message
    pub message: String,
}

/// Run a batch of games
pub fn run_batch(config: BatchConfig) -> BatchResults {
    let start = Instant::now();
    let completed = AtomicU32::new(0);

    info!(
        "Starting batch run: {} games, {} players, seeds from {}",
        config.game_count, config.players, config.seed_start
    );

    if config.parallel_games > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_games as usize)
            .build_global()
            .ok(); // Ignore if already set
    }

    let results: Vec<std::result::Result<GameMetrics, BatchError>> = (0..config.game_count)
        .into_par_iter()
        .map(|i| {
            let game = config.game(i);
            match run_game(&game) {
                Ok(result) => {
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if done % 10 == 0 {
                        debug!("Progress: {}/{}", done, config.game_count);
                    }
                    Ok(result.metrics)
                }
                Err(e) => {
                    warn!("Game {} (seed {}) failed: {}", i, game.seed, e);
                    Err(BatchError {
                        game_index: i,
                        seed: game.seed,
                        message: e.to_string(),
                    })
                }
            }
        })
        .collect();

    let (games, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(|r| r.is_ok());
    let games: Vec<GameMetrics> = games.into_iter().filter_map(|r| r.ok()).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(|r| r.err()).collect();

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} games in {:.1}s ({:.1} games/sec)",
        games.len(),
        duration_seconds,
        games.len() as f64 / duration_seconds.max(0.001)
    );

    BatchResults {
        config,
        games,
        summary,
        duration_seconds,
        errors,
    }
}

/// Run the same game `runs` times and check every final hash matches.
///
/// Returns the common hash.
pub fn verify_determinism(config: &GameConfig, runs: u32) -> Result<Option<u64>> {
    if runs == 0 {
        return Err(HeadlessError::Empty("zero runs requested".to_string()));
    }
    let hashes = (0..runs)
        .into_par_iter()
        .map(|_| run_game(config).map(|r| r.final_state_hash))
        .collect::<Result<Vec<u64>>>()?;

    let first = hashes[0];
    if hashes.iter().all(|h| *h == first) {
        Ok(Some(first))
    } else {
        warn!("Non-determinism detected: hashes {:?}", hashes);
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_config_default() {
        let config = BatchConfig::default();
        assert_eq!(config.game_count, 100);
        assert_eq!(config.players, 2);
    }

    #[test]
    fn test_batch_config_builder() {
        let config = BatchConfig::new(500)
            .with_output(PathBuf::from("/tmp/results"))
            .with_seed(12345)
            .with_max_turns(50);

        assert_eq!(config.game_count, 500);
        assert_eq!(config.seed_start, 12345);
        let game = config.game(3);
        assert_eq!(game.seed, 12348);
        assert_eq!(game.max_turns, 50);
    }

    #[test]
    fn test_run_batch_small() {
        let results = run_batch(BatchConfig::new(4).with_max_turns(10));

        assert_eq!(results.games.len() + results.errors.len(), 4);
        assert!(results.errors.is_empty());
        assert_eq!(results.summary.total_games, 4);
        let seeds: Vec<u64> = results.games.iter().map(|g| g.seed).collect();
        assert_eq!(seeds, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_verify_determinism() {
        let config = GameConfig::new(12345).with_max_turns(12);
        assert!(verify_determinism(&config, 3).unwrap().is_some());
    }

    #[test]
    fn test_verify_zero_runs() {
        assert!(verify_determinism(&GameConfig::new(1), 0).is_err());
    }
}
