//! Player records.

use serde::{Deserialize, Serialize};

use crate::ids::PlayerId;

/// Who controls a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerKind {
    /// Decisions come from outside the engine.
    Human,
    /// Decisions are made by the built-in policy.
    Ai,
}

/// A participant in the match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Identifier.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Controller.
    pub kind: PlayerKind,
    /// Gold balance, never negative.
    pub gold: u32,
    /// Whether the player has finished submitting orders this turn.
    pub ready: bool,
    /// Whether the player has been knocked out.
    pub eliminated: bool,
}

impl Player {
    /// Create a player with a starting balance.
    #[must_use]
    pub fn new(id: PlayerId, name: impl Into<String>, kind: PlayerKind, gold: u32) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            gold,
            ready: false,
            eliminated: false,
        }
    }

    /// Whether the built-in policy controls this player.
    #[must_use]
    pub fn is_ai(&self) -> bool {
        self.kind == PlayerKind::Ai
    }

    /// Whether the player can afford `cost`.
    #[must_use]
    pub const fn can_afford(&self, cost: u32) -> bool {
        self.gold >= cost
    }

    /// Deduct `cost` if affordable. Returns `false` (and leaves the balance
    /// untouched) otherwise.
    pub fn spend(&mut self, cost: u32) -> bool {
        match self.gold.checked_sub(cost) {
            Some(rest) => {
                self.gold = rest;
                true
            }
            None => false,
        }
    }

    /// Add gold, saturating.
    pub fn earn(&mut self, amount: u32) {
        self.gold = self.gold.saturating_add(amount);
    }
}
