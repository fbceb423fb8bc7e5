//! Replay recording and verification.
//!
//! A replay stores the game setup plus, for each turn, the orders each player
//! queued and the decisions given at every suspension. Because resolution is
//! deterministic that is enough to recreate the whole match.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::encounter::Decision;
use crate::engine::{GameEngine, GameSetup};
use crate::error::{GameError, Result};
use crate::ids::{PlayerId, UnitId};
use crate::orders::Order;
use crate::resolver::TurnProgress;

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// Inputs of one resolved turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayTurn {
    /// Orders queued by each player before resolution.
    pub orders: BTreeMap<PlayerId, Vec<Order>>,
    /// Decisions submitted at each suspension, in order.
    pub decision_rounds: Vec<Vec<(UnitId, Decision)>>,
    /// State hash once the turn completed.
    pub state_hash: u64,
}

/// Complete replay data structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replay {
    /// Replay format version.
    pub version: u32,
    /// How the match was started.
    pub setup: GameSetup,
    /// Turns in order.
    pub turns: Vec<ReplayTurn>,
    /// State hash at the end of the recording.
    pub final_hash: Option<u64>,
}

impl Replay {
    /// Start recording a match.
    #[must_use]
    pub fn new(setup: GameSetup) -> Self {
        Self {
            version: REPLAY_VERSION,
            setup,
            turns: Vec::new(),
            final_hash: None,
        }
    }

    /// Append a resolved turn.
    pub fn record_turn(&mut self, turn: ReplayTurn) {
        self.turns.push(turn);
    }

    /// Stamp the end-of-game hash.
    pub fn finalize(&mut self, final_hash: u64) {
        self.final_hash = Some(final_hash);
    }

    /// Number of recorded turns.
    #[must_use]
    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    /// Encode with bincode.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::Serialization(format!("Failed to serialize replay: {e}")))
    }

    /// Decode bytes from [`Replay::to_bytes`], checking the format version.
    ///
    /// # Errors
    /// Returns an error on malformed input or a version mismatch.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let replay: Self = bincode::deserialize(bytes)
            .map_err(|e| GameError::Serialization(format!("Failed to deserialize replay: {e}")))?;

        if replay.version != REPLAY_VERSION {
            return Err(GameError::Serialization(format!(
                "Replay version mismatch: expected {}, got {}",
                REPLAY_VERSION, replay.version
            )));
        }

        Ok(replay)
    }

    /// Save the replay to a file.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| GameError::Serialization(format!("Failed to write replay file: {e}")))
    }

    /// Load a replay from a file.
    ///
    /// # Errors
    /// Returns an error if file reading or deserialization fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| GameError::Serialization(format!("Failed to read replay file: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /// Re-simulate the replay on a fresh engine.
    ///
    /// Every turn's hash is compared as soon as the turn completes, so a
    /// divergence is reported at the first turn where it appears. Returns the
    /// final state hash.
    ///
    /// # Errors
    /// Returns [`GameError::ReplayDesync`] on divergence, or any error the
    /// engine raises while replaying.
    pub fn verify(&self) -> Result<u64> {
        let mut engine = GameEngine::new_game(&self.setup)?;

        for recorded in &self.turns {
            let turn = engine.turn();
            for (player, orders) in &recorded.orders {
                engine.submit_orders(*player, orders.clone())?;
            }

            let mut rounds = recorded.decision_rounds.iter();
            loop {
                match engine.resolve_turn()? {
                    TurnProgress::Complete(_) => break,
                    TurnProgress::AwaitingDecisions(_) => {
                        let Some(round) = rounds.next() else {
                            return Err(GameError::InvalidState(format!(
                                "Replay has no decisions for the suspension in turn {turn}"
                            )));
                        };
                        for (unit, decision) in round {
                            engine.submit_decision(*unit, *decision)?;
                        }
                    }
                }
            }

            let actual = engine.state_hash()?;
            if actual != recorded.state_hash {
                return Err(GameError::ReplayDesync {
                    turn,
                    expected: recorded.state_hash,
                    actual,
                });
            }
        }

        let actual = engine.state_hash()?;
        if let Some(expected) = self.final_hash {
            if expected != actual {
                return Err(GameError::ReplayDesync {
                    turn: engine.turn(),
                    expected,
                    actual,
                });
            }
        }
        tracing::debug!("Replay verified over {} turns", self.turns.len());
        Ok(actual)
    }
}
