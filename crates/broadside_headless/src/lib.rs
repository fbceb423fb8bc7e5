//! Headless game runner for AI testing and CI verification.
//!
//! This crate plays Broadside matches without any UI. This enables:
//!
//! - **Balance testing**: seeded AI-vs-AI batches with JSON metrics
//! - **CI verification**: repeated runs of one seed must hash identically
//! - **Replay verification**: recorded games must re-simulate exactly
//!
//! # Example
//!
//! ```bash
//! # Play one game and record it
//! cargo run -p broadside_headless -- run --seed 7 --replay game.replay
//!
//! # Run 500 games in parallel
//! cargo run -p broadside_headless -- batch --count 500 --output results/
//!
//! # Verify a replay
//! cargo run -p broadside_headless -- verify --replay game.replay
//! ```

pub mod batch;
pub mod error;
pub mod game_runner;
pub mod metrics;

pub use batch::{run_batch, verify_determinism, BatchConfig, BatchResults};
pub use error::{HeadlessError, Result};
pub use game_runner::{load_rules, run_game, GameConfig, GameResult, MapSize};
pub use metrics::{BatchSummary, GameMetrics, MetricsCollector, PlayerMetrics};
