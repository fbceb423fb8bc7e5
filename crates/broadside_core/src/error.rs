//! Error types for the turn-resolution engine.

use thiserror::Error;

use crate::ids::{PlayerId, StructureId, UnitId};

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all engine errors.
///
/// Only setup failures and API misuse surface here. Rejected orders,
/// stale references and pending decisions are part of normal play and are
/// reported through events, [`crate::validation::OrderRejection`] values or
/// [`crate::resolver::TurnProgress`] instead.
#[derive(Debug, Error)]
pub enum GameError {
    /// Map generation could not satisfy the per-player start guarantees.
    #[error("Map generation failed: {0}")]
    MapGeneration(String),

    /// Invalid unit identifier.
    #[error("Invalid unit ID: {0}")]
    InvalidUnitId(UnitId),

    /// Invalid structure identifier.
    #[error("Invalid structure ID: {0}")]
    InvalidStructureId(StructureId),

    /// Unknown or eliminated player.
    #[error("Invalid player ID: {0}")]
    InvalidPlayerId(PlayerId),

    /// A decision was submitted that the pending encounters cannot accept.
    #[error("Invalid decision for unit {unit}: {message}")]
    InvalidDecision {
        /// Unit the decision was submitted for.
        unit: UnitId,
        /// Why the decision was refused.
        message: String,
    },

    /// Failed to parse a rules or configuration document.
    #[error("Failed to parse rules: {0}")]
    RulesParse(String),

    /// Failed to encode or decode persisted state.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Invalid game state or lifecycle misuse.
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// Replay verification found a divergence.
    #[error("Replay diverged at turn {turn}: expected hash {expected}, got {actual}")]
    ReplayDesync {
        /// Turn where the divergence was detected.
        turn: u32,
        /// Recorded hash.
        expected: u64,
        /// Hash produced by re-simulation.
        actual: u64,
    },
}
