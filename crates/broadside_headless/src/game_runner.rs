//! Real game execution for headless testing.
//!
//! Runs complete AI-vs-AI matches on the broadside_core engine, collects
//! metrics from the event stream and optionally records a replay.
//!
//! Every loop is bounded: games stop at `max_turns` even when nobody has
//! been eliminated.

use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use broadside_core::ai;
use broadside_core::data::GameRules;
use broadside_core::encounter::Decision;
use broadside_core::engine::{GameEngine, GameSetup};
use broadside_core::ids::UnitId;
use broadside_core::map_generation::MapConfig;
use broadside_core::replay::{Replay, ReplayTurn};
use broadside_core::resolver::{TurnProgress, TurnResult};

use crate::error::{HeadlessError, Result};
use crate::metrics::{GameMetrics, MetricsCollector, LAST_STANDING, MUTUAL_DESTRUCTION, TURN_LIMIT};

/// Default turn limit for a single game.
pub const DEFAULT_MAX_TURNS: u32 = 200;

/// Turn interval between progress logs.
const PROGRESS_LOG_INTERVAL: u32 = 25;

/// Map size presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum MapSize {
    /// Compact map for quick games.
    #[default]
    Small,
    /// The default archipelago.
    Medium,
    /// Room for four players.
    Large,
}

impl MapSize {
    /// Map parameters for this preset and seed.
    #[must_use]
    pub fn config(self, seed: u64) -> MapConfig {
        let base = match self {
            Self::Small => MapConfig::small(),
            Self::Medium => MapConfig::default(),
            Self::Large => MapConfig::large(),
        };
        base.with_seed(seed)
    }
}

/// Configuration for a single game run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Game ID for tracking.
    pub game_id: String,
    /// Seed for map generation and every roll.
    pub seed: u64,
    /// AI seats.
    pub players: u32,
    /// Map preset.
    pub map_size: MapSize,
    /// Turns before the game is called unfinished.
    pub max_turns: u32,
    /// Balance constants.
    pub rules: GameRules,
    /// Whether to record a replay.
    pub record_replay: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            game_id: "game_0".to_string(),
            seed: 0,
            players: 2,
            map_size: MapSize::Small,
            max_turns: DEFAULT_MAX_TURNS,
            rules: GameRules::default(),
            record_replay: false,
        }
    }
}

impl GameConfig {
    /// Config for a seeded game with default settings.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            game_id: format!("game_{seed}"),
            seed,
            ..Default::default()
        }
    }

    /// Set the number of seats.
    #[must_use]
    pub fn with_players(mut self, players: u32) -> Self {
        self.players = players;
        self
    }

    /// Set the map preset.
    #[must_use]
    pub fn with_map_size(mut self, map_size: MapSize) -> Self {
        self.map_size = map_size;
        self
    }

    /// Set the turn limit.
    #[must_use]
    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Replace the rules.
    #[must_use]
    pub fn with_rules(mut self, rules: GameRules) -> Self {
        self.rules = rules;
        self
    }

    /// Record a replay while playing.
    #[must_use]
    pub fn recording(mut self) -> Self {
        self.record_replay = true;
        self
    }

    /// Engine setup for this game.
    #[must_use]
    pub fn setup(&self) -> GameSetup {
        GameSetup::ai_match(self.seed, self.players)
            .with_map(self.map_size.config(self.seed))
            .with_rules(self.rules.clone())
    }
}

/// Result of running a game.
#[derive(Debug, Clone)]
pub struct GameResult {
    /// Collected metrics.
    pub metrics: GameMetrics,
    /// Hash of the final state.
    pub final_state_hash: u64,
    /// Recorded replay, when requested.
    pub replay: Option<Replay>,
}

/// Load balance constants from a RON file.
pub fn load_rules(path: &Path) -> Result<GameRules> {
    let source = std::fs::read_to_string(path).map_err(|e| HeadlessError::io(path, e))?;
    Ok(GameRules::from_ron_str(&source)?)
}

/// Run a complete game.
pub fn run_game(config: &GameConfig) -> Result<GameResult> {
    info!(
        game_id = %config.game_id,
        seed = config.seed,
        players = config.players,
        max_turns = config.max_turns,
        "Starting game"
    );

    let setup = config.setup();
    let mut engine = GameEngine::new_game(&setup)?;
    let mut replay = config.record_replay.then(|| Replay::new(setup));
    let mut collector = MetricsCollector::new(config.game_id.clone(), config.seed);
    let mut turns = 0;

    while turns < config.max_turns && !engine.is_game_over() {
        collector.observe(engine.state());
        engine.plan_ai_orders()?;
        let orders = engine.state().pending_orders.clone();

        let (result, decision_rounds) = resolve_with_ai_decisions(&mut engine)?;
        collector.record_events(&result.events);
        turns += 1;

        if let Some(replay) = replay.as_mut() {
            replay.record_turn(ReplayTurn {
                orders,
                decision_rounds,
                state_hash: engine.state_hash()?,
            });
        }
        if turns % PROGRESS_LOG_INTERVAL == 0 {
            debug!(
                game_id = %config.game_id,
                turn = turns,
                ships = engine.state().units.len(),
                "Game progress"
            );
        }
    }

    let final_state_hash = engine.state_hash()?;
    if let Some(replay) = replay.as_mut() {
        replay.finalize(final_state_hash);
    }

    let condition = if !engine.is_game_over() {
        TURN_LIMIT
    } else if engine.winner().is_some() {
        LAST_STANDING
    } else {
        MUTUAL_DESTRUCTION
    };
    let metrics = collector.finish(engine.state(), turns, condition, final_state_hash);

    info!(
        game_id = %config.game_id,
        turns,
        winner = ?metrics.winner,
        condition,
        "Game finished"
    );

    Ok(GameResult {
        metrics,
        final_state_hash,
        replay,
    })
}

/// Resolve the current turn, answering any suspension with the AI policy.
///
/// Returns the turn result and the decisions given at each suspension.
fn resolve_with_ai_decisions(
    engine: &mut GameEngine,
) -> Result<(TurnResult, Vec<Vec<(UnitId, Decision)>>)> {
    let mut rounds = Vec::new();
    loop {
        match engine.resolve_turn()? {
            TurnProgress::Complete(result) => return Ok((result, rounds)),
            TurnProgress::AwaitingDecisions(open) => {
                let mut round = Vec::new();
                for encounter in &open {
                    let kind = encounter.kind();
                    for unit in encounter.undecided() {
                        if !engine.state().awaits_decision(unit) {
                            continue;
                        }
                        let decision = engine.state().units.get(unit).map_or(
                            Decision::peaceful(kind),
                            |u| ai::encounter_decision(u, kind, &engine.state().rules),
                        );
                        engine.submit_decision(unit, decision)?;
                        round.push((unit, decision));
                    }
                }
                rounds.push(round);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = GameConfig::new(9)
            .with_players(3)
            .with_map_size(MapSize::Large)
            .with_max_turns(40)
            .recording();

        assert_eq!(config.game_id, "game_9");
        assert_eq!(config.players, 3);
        assert!(config.record_replay);
        let setup = config.setup();
        assert_eq!(setup.players.len(), 3);
        assert_eq!(setup.map.seed, 9);
        assert_eq!(setup.map.num_sea_tiles, MapConfig::large().num_sea_tiles);
    }

    #[test]
    fn test_game_respects_turn_limit() {
        let result = run_game(&GameConfig::new(4).with_max_turns(3)).unwrap();
        assert!(result.metrics.turns <= 3);
        assert_eq!(result.metrics.final_state_hash, result.final_state_hash);
        assert!(result.replay.is_none());
        if result.metrics.turns == 3 && result.metrics.win_condition == TURN_LIMIT {
            assert!(result.metrics.winner.is_none());
        }
    }

    #[test]
    fn test_recorded_game_replays() {
        let result = run_game(&GameConfig::new(6).with_max_turns(8).recording()).unwrap();
        let replay = result.replay.unwrap();
        assert_eq!(replay.turn_count() as u32, result.metrics.turns);
        assert_eq!(replay.verify().unwrap(), result.final_state_hash);
    }

    #[test]
    fn test_same_seed_same_metrics() {
        let config = GameConfig::new(13).with_max_turns(15);
        let first = run_game(&config).unwrap();
        let second = run_game(&config).unwrap();
        assert_eq!(first.metrics, second.metrics);
    }

    #[test]
    fn test_every_seat_is_reported() {
        let result = run_game(&GameConfig::new(2).with_max_turns(2)).unwrap();
        assert!(result.metrics.players.contains_key("P0"));
        assert!(result.metrics.players.contains_key("P1"));
    }
}
