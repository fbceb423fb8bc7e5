//! Balance constants for a match.

use serde::{Deserialize, Serialize};

use super::ship_data::{ShipStats, StructureStats};
use crate::error::{GameError, Result};
use crate::math::{fixed_serde, percent, Fixed};

/// Every tunable the engine consults while resolving turns.
///
/// Missing fields fall back to [`GameRules::default`], so a rules file only
/// needs to list what it changes.
///
/// # Example RON
///
/// ```ron
/// GameRules(
///     ship_cost: 60,
///     max_queue_size: 3,
///     bounty_min: 10,
///     bounty_max: 30,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRules {
    /// Stats for ships built by players.
    pub ship: ShipStats,
    /// Stats for pirate raiders.
    pub pirate: ShipStats,
    /// Health of shipyard-class structures.
    pub structures: StructureStats,

    /// Gold each player starts with.
    pub starting_gold: u32,
    /// Gold granted to every surviving player each turn.
    pub base_income: u32,
    /// Extra gold per owned shipyard-class structure each turn.
    pub income_per_shipyard: u32,

    /// Cost to claim a harbor as a shipyard.
    pub shipyard_cost: u32,
    /// Cost to queue a ship.
    pub ship_cost: u32,
    /// Turns a queued ship needs once it reaches the head of the queue.
    pub ship_build_time: u32,
    /// Cost to fully repair a docked ship.
    pub repair_cost: u32,
    /// Cost of one sail or cannon upgrade.
    pub upgrade_cost: u32,
    /// Highest sail / cannon tier.
    pub max_tier: u8,
    /// Cost to queue a structure fortification.
    pub fortify_cost: u32,
    /// Turns a fortification needs once at the head of the queue.
    pub fortify_build_time: u32,
    /// Bound on every build queue.
    pub max_queue_size: usize,

    /// Faces on each combat die.
    pub dice_sides: u32,
    /// Dice rolled at tier 1; each further tier adds one.
    pub base_dice: u32,
    /// Damage taken by the loser of each paired comparison.
    pub damage_per_hit: u32,

    /// Smallest gold bounty for sinking a pirate.
    pub bounty_min: u32,
    /// Largest gold bounty for sinking a pirate.
    pub bounty_max: u32,

    /// AI units yield or pass when health / max health falls below this.
    #[serde(with = "fixed_serde")]
    pub ai_retreat_threshold: Fixed,

    /// Turns between pirate spawns at each cove.
    pub pirate_spawn_interval: u32,
    /// Cap on living pirate ships.
    pub max_pirates: u32,
    /// Distance within which pirates hunt player ships.
    pub pirate_hunt_radius: u32,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            ship: ShipStats::ship(),
            pirate: ShipStats::pirate(),
            structures: StructureStats::default(),
            starting_gold: 150,
            base_income: 10,
            income_per_shipyard: 15,
            shipyard_cost: 100,
            ship_cost: 50,
            ship_build_time: 3,
            repair_cost: 20,
            upgrade_cost: 40,
            max_tier: 3,
            fortify_cost: 80,
            fortify_build_time: 4,
            max_queue_size: 5,
            dice_sides: 6,
            base_dice: 2,
            damage_per_hit: 1,
            bounty_min: 20,
            bounty_max: 60,
            ai_retreat_threshold: percent(50),
            pirate_spawn_interval: 5,
            max_pirates: 4,
            pirate_hunt_radius: 6,
        }
    }
}

impl GameRules {
    /// Parse rules from a RON document.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        let rules: Self = ron::from_str(source).map_err(|e| GameError::RulesParse(e.to_string()))?;
        let errors = rules.validate();
        if errors.is_empty() {
            Ok(rules)
        } else {
            Err(GameError::RulesParse(errors.join("; ")))
        }
    }

    /// Render the rules as pretty RON.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| GameError::RulesParse(e.to_string()))
    }

    /// Number of combat dice for a cannon or defense tier.
    #[must_use]
    pub fn dice_for_tier(&self, tier: u8) -> u32 {
        self.base_dice + u32::from(tier.saturating_sub(1))
    }

    /// Movement capacity of a ship with the given base movement and sail tier.
    #[must_use]
    pub fn movement_for_tier(base: u32, sail_tier: u8) -> u32 {
        base + u32::from(sail_tier.saturating_sub(1))
    }

    /// Check internal consistency.
    ///
    /// Returns a list of human-readable problems; empty when valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.dice_sides < 2 {
            errors.push(format!("dice_sides must be at least 2, got {}", self.dice_sides));
        }
        if self.base_dice == 0 {
            errors.push("base_dice must be positive".to_string());
        }
        if self.bounty_min > self.bounty_max {
            errors.push(format!(
                "bounty_min ({}) exceeds bounty_max ({})",
                self.bounty_min, self.bounty_max
            ));
        }
        if self.max_queue_size == 0 {
            errors.push("max_queue_size must be positive".to_string());
        }
        if self.max_tier == 0 {
            errors.push("max_tier must be positive".to_string());
        }
        for (name, stats) in [("ship", &self.ship), ("pirate", &self.pirate)] {
            if stats.max_health == 0 {
                errors.push(format!("{name}.max_health must be positive"));
            }
            if stats.sail_tier == 0 || stats.sail_tier > self.max_tier {
                errors.push(format!("{name}.sail_tier out of range"));
            }
            if stats.cannon_tier == 0 || stats.cannon_tier > self.max_tier {
                errors.push(format!("{name}.cannon_tier out of range"));
            }
        }
        if self.ship_build_time == 0 || self.fortify_build_time == 0 {
            errors.push("build times must be positive".to_string());
        }

        errors
    }
}
