//! # Broadside Core
//!
//! Deterministic turn-resolution engine for Broadside, a turn-based naval
//! strategy game played on a hex ocean.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No network
//! - No system randomness (every roll is seeded from the game seed)
//! - No floating-point math (ratios use fixed-point)
//!
//! This separation enables:
//! - Hot-seat, AI and networked play on the same rules
//! - Headless batch simulation
//! - Replay verification
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`hex`] / [`grid`] - Axial hex coordinates and the tile map
//! - [`map_generation`] - Seeded archipelago generation
//! - [`pathfinding`] - Shortest navigable routes
//! - [`validation`] - Order legality checks
//! - [`encounter`] - ENTRY / PASSING conflict model
//! - [`combat`] - Dice combat and multi-turn engagements
//! - [`construction`] - Shipyard build queues
//! - [`resolver`] - The turn-resolution state machine
//! - [`engine`] - Match lifecycle entry points

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ai;
pub mod combat;
pub mod construction;
pub mod data;
pub mod encounter;
pub mod engine;
pub mod error;
pub mod events;
pub mod grid;
pub mod hex;
pub mod ids;
pub mod map_generation;
pub mod math;
pub mod orders;
pub mod pathfinding;
pub mod players;
pub mod registry;
pub mod replay;
pub mod resolver;
pub mod state;
pub mod structures;
pub mod units;
pub mod validation;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::construction::{BuildItemKind, ConstructionError, ConstructionManager};
    pub use crate::data::{GameRules, ShipStats, StructureStats};
    pub use crate::encounter::{
        CollisionInfo, Decision, Encounter, EncounterKey, EncounterKind, Participant,
    };
    pub use crate::engine::{GameEngine, GameSetup, PlayerSetup};
    pub use crate::error::{GameError, Result};
    pub use crate::events::{GameEvent, GameEventKind};
    pub use crate::grid::{Grid, Tile, TileKind};
    pub use crate::hex::{EdgeKey, HexCoord};
    pub use crate::ids::{PlayerId, StructureId, UnitId};
    pub use crate::map_generation::MapConfig;
    pub use crate::math::Fixed;
    pub use crate::orders::{Order, UpgradeKind};
    pub use crate::players::{Player, PlayerKind};
    pub use crate::replay::Replay;
    pub use crate::resolver::{RejectedOrder, TurnProgress, TurnResult};
    pub use crate::state::{GamePhase, GameState, ResolutionStage};
    pub use crate::structures::{Structure, StructureKind};
    pub use crate::units::{Unit, UnitKind};
    pub use crate::validation::OrderRejection;
}
