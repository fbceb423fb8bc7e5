//! Headless Broadside game runner.
//!
//! Plays AI-vs-AI games without a UI. Designed for balance batches, CI
//! determinism checks and replay verification.
//!
//! # Usage
//!
//! ```bash
//! # Play one game, print metrics as JSON
//! cargo run -p broadside_headless -- run --seed 42
//!
//! # Record a replay and use custom rules
//! cargo run -p broadside_headless -- --rules rules.ron run --seed 42 --replay game.replay
//!
//! # Run a batch of 1000 games
//! cargo run -p broadside_headless -- batch --count 1000 --output results/
//!
//! # Verify a replay, or run one seed repeatedly
//! cargo run -p broadside_headless -- verify --replay game.replay
//! cargo run -p broadside_headless -- verify --seed 42 --runs 5
//! ```
//!
//! Logs go to stderr; `RUST_LOG` overrides the default filter.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use broadside_core::data::GameRules;
use broadside_core::replay::Replay;
use broadside_headless::{
    batch::{run_batch, verify_determinism, BatchConfig},
    game_runner::{load_rules, run_game, GameConfig, MapSize, DEFAULT_MAX_TURNS},
    HeadlessError, Result,
};

#[derive(Parser)]
#[command(name = "broadside_headless")]
#[command(about = "Headless Broadside runner for AI batches and replay verification")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// RON file with balance constants
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that starts games.
#[derive(Args, Clone, Copy)]
struct MatchArgs {
    /// AI seats per game
    #[arg(short, long, default_value = "2")]
    players: u32,

    /// Map preset
    #[arg(short, long, value_enum, default_value = "small")]
    map: MapSize,

    /// Turn limit per game
    #[arg(long, default_value_t = DEFAULT_MAX_TURNS)]
    max_turns: u32,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a single AI game
    Run {
        /// Game seed
        #[arg(long, default_value = "12345")]
        seed: u64,

        #[command(flatten)]
        game: MatchArgs,

        /// Record a replay to this file
        #[arg(long)]
        replay: Option<PathBuf>,

        /// Write metrics JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a batch of seeded games in parallel
    Batch {
        /// Number of games to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel games (0 = auto)
        #[arg(long, default_value = "0")]
        parallel: u32,

        /// Starting random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        #[command(flatten)]
        game: MatchArgs,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },

    /// Verify determinism from a replay file or by repeating a seed
    Verify {
        /// Replay file to re-simulate
        #[arg(long)]
        replay: Option<PathBuf>,

        /// Seed to repeat when no replay is given
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of runs when repeating a seed
        #[arg(short, long, default_value = "5")]
        runs: u32,

        #[command(flatten)]
        game: MatchArgs,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logging goes to stderr so stdout stays clean for JSON
    let default_filter = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(e) = dispatch(cli) {
        tracing::error!(error = %e, "Command failed");
        eprintln!("FATAL: {e}");
        std::process::exit(1);
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    let rules = match &cli.rules {
        Some(path) => {
            tracing::info!("Loading rules from {}", path.display());
            load_rules(path)?
        }
        None => GameRules::default(),
    };

    match cli.command {
        Commands::Run {
            seed,
            game,
            replay,
            output,
        } => cmd_run(game_config(seed, game, rules), replay, output),
        Commands::Batch {
            count,
            parallel,
            seed,
            game,
            output,
        } => {
            let config = BatchConfig {
                game_count: count,
                parallel_games: parallel,
                seed_start: seed,
                players: game.players,
                map_size: game.map,
                max_turns: game.max_turns,
                rules,
                output_dir: output,
            };
            cmd_batch(config)
        }
        Commands::Verify {
            replay: Some(file), ..
        } => cmd_verify_replay(&file),
        Commands::Verify {
            replay: None,
            seed,
            runs,
            game,
        } => cmd_verify_seed(&game_config(seed, game, rules), runs),
    }
}

fn game_config(seed: u64, game: MatchArgs, rules: GameRules) -> GameConfig {
    GameConfig::new(seed)
        .with_players(game.players)
        .with_map_size(game.map)
        .with_max_turns(game.max_turns)
        .with_rules(rules)
}

/// Play one game
fn cmd_run(mut config: GameConfig, replay: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    config.record_replay = replay.is_some();
    let result = run_game(&config)?;

    if let (Some(path), Some(recorded)) = (&replay, &result.replay) {
        recorded.save(path)?;
        tracing::info!("Replay saved to {}", path.display());
    }

    let json = serde_json::to_string_pretty(&result.metrics)?;
    match output {
        Some(path) => {
            std::fs::write(&path, json).map_err(|e| HeadlessError::io(&path, e))?;
            eprintln!("Metrics saved to: {}", path.display());
        }
        None => println!("{json}"),
    }

    eprintln!(
        "Game {} finished after {} turns: {} ({})",
        result.metrics.game_id,
        result.metrics.turns,
        result.metrics.winner.as_deref().unwrap_or("no winner"),
        result.metrics.win_condition
    );
    Ok(())
}

/// Run a batch of games
fn cmd_batch(config: BatchConfig) -> Result<()> {
    let num_cpus = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1);
    tracing::info!(
        count = config.game_count,
        parallel = config.parallel_games,
        seed = config.seed_start,
        players = config.players,
        max_turns = config.max_turns,
        output = %config.output_dir.display(),
        cpus_available = num_cpus,
        "Batch configuration"
    );

    let output = config.output_dir.clone();
    std::fs::create_dir_all(&output).map_err(|e| HeadlessError::io(&output, e))?;

    let results = run_batch(config);
    let results_path = output.join("batch_results.json");
    results.save(&results_path)?;

    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Games played: {}", results.games.len());
    if !results.errors.is_empty() {
        eprintln!("Games FAILED: {}", results.errors.len());
    }
    eprintln!("Duration: {:.1}s", results.duration_seconds);
    eprintln!("Average length: {:.1} turns", results.summary.avg_turns);
    eprintln!("\nWin Rates:");
    for (seat, rate) in &results.summary.win_rates {
        eprintln!("  {}: {:.1}%", seat, rate * 100.0);
    }
    eprintln!(
        "  draws: {}, unfinished: {}",
        results.summary.draws, results.summary.unfinished
    );

    if !results.errors.is_empty() {
        eprintln!("\nGAME FAILURES:");
        for error in results.errors.iter().take(10) {
            eprintln!(
                "  Game {} (seed {}): {}",
                error.game_index, error.seed, error.message
            );
        }
        if results.errors.len() > 10 {
            eprintln!("  ... and {} more failures", results.errors.len() - 10);
        }
    }

    eprintln!("\nResults saved to: {}", results_path.display());
    Ok(())
}

/// Re-simulate a recorded game
fn cmd_verify_replay(file: &Path) -> Result<()> {
    tracing::info!("Verifying replay: {}", file.display());
    let replay = Replay::load(file)?;

    eprintln!("Loaded replay:");
    eprintln!("  Seed: {}", replay.setup.map.seed);
    eprintln!("  Players: {}", replay.setup.players.len());
    eprintln!("  Turns: {}", replay.turn_count());

    let hash = replay.verify()?;
    eprintln!("PASS: Replay verification successful");
    eprintln!("  Final hash: {hash:016x}");
    Ok(())
}

/// Repeat one seed and compare hashes
fn cmd_verify_seed(config: &GameConfig, runs: u32) -> Result<()> {
    tracing::info!(
        "Verifying determinism: seed {} ({} runs)",
        config.seed,
        runs
    );
    match verify_determinism(config, runs)? {
        Some(hash) => {
            eprintln!("PASS: All {runs} runs produced identical results ({hash:016x})");
            Ok(())
        }
        None => {
            eprintln!("FAIL: Non-determinism detected!");
            std::process::exit(1);
        }
    }
}
