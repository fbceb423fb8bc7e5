//! Data structures for balance configuration.
//!
//! This module contains pure data structures that define ship stats,
//! costs, build times and other tunables. All structs are designed to be
//! deserialized from RON documents.
//!
//! **Note:** This module contains no IO - it only parses text handed to it.
//! File loading is handled by the headless runner.

mod rules;
mod ship_data;

pub use rules::GameRules;
pub use ship_data::{ShipStats, StructureStats};
