//! Ship and structure stat blocks.

use serde::{Deserialize, Serialize};

/// Stats used to spawn a ship.
///
/// # Example RON
///
/// ```ron
/// ShipStats(
///     max_health: 5,
///     movement: 3,
///     sail_tier: 1,
///     cannon_tier: 1,
/// )
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipStats {
    /// Maximum (and starting) health.
    pub max_health: u32,
    /// Movement capacity at sail tier 1.
    pub movement: u32,
    /// Starting sail tier.
    pub sail_tier: u8,
    /// Starting cannon tier.
    pub cannon_tier: u8,
}

impl ShipStats {
    /// Standard player ship.
    #[must_use]
    pub const fn ship() -> Self {
        Self {
            max_health: 5,
            movement: 3,
            sail_tier: 1,
            cannon_tier: 1,
        }
    }

    /// Pirate raider.
    #[must_use]
    pub const fn pirate() -> Self {
        Self {
            max_health: 4,
            movement: 2,
            sail_tier: 1,
            cannon_tier: 1,
        }
    }
}

impl Default for ShipStats {
    fn default() -> Self {
        Self::ship()
    }
}

/// Stats for shipyard-class structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureStats {
    /// Health of a shipyard.
    pub shipyard_health: u32,
    /// Health of a naval yard.
    pub naval_yard_health: u32,
    /// Health of a naval fortress.
    pub fortress_health: u32,
}

impl Default for StructureStats {
    fn default() -> Self {
        Self {
            shipyard_health: 6,
            naval_yard_health: 9,
            fortress_health: 12,
        }
    }
}
