//! Ships and their per-turn movement and combat bookkeeping.

use serde::{Deserialize, Serialize};

use crate::data::{GameRules, ShipStats};
use crate::hex::HexCoord;
use crate::ids::{PlayerId, UnitId};
use crate::math::{ratio, Fixed};

/// Kind of unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    /// A player-built ship.
    Ship,
    /// A pirate raider owned by [`PlayerId::PIRATE`].
    PirateShip,
}

/// A ship on the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Stable identifier.
    pub id: UnitId,
    /// Owning player (or the pirate id).
    pub owner: PlayerId,
    /// Current cell.
    pub position: HexCoord,
    /// Unit kind.
    pub kind: UnitKind,
    /// Current health, never above `max_health`.
    pub health: u32,
    /// Health at full repair.
    pub max_health: u32,
    /// Movement points restored at turn start.
    pub movement_capacity: u32,
    /// Movement points left this turn.
    pub movement_remaining: u32,
    /// Sail upgrade tier.
    pub sail_tier: u8,
    /// Cannon upgrade tier.
    pub cannon_tier: u8,
    /// Cells still to travel (excluding the current position).
    pub queued_path: Vec<HexCoord>,
    /// Opponent in an ongoing engagement.
    pub combat_opponent: Option<UnitId>,
    /// Tombstone set when health reaches zero; removed at end of phase.
    pub destroyed: bool,
}

impl Unit {
    /// Create a unit at full health with movement ready.
    #[must_use]
    pub fn new(id: UnitId, owner: PlayerId, kind: UnitKind, position: HexCoord, stats: ShipStats) -> Self {
        let movement = GameRules::movement_for_tier(stats.movement, stats.sail_tier);
        Self {
            id,
            owner,
            position,
            kind,
            health: stats.max_health,
            max_health: stats.max_health,
            movement_capacity: movement,
            movement_remaining: movement,
            sail_tier: stats.sail_tier,
            cannon_tier: stats.cannon_tier,
            queued_path: Vec::new(),
            combat_opponent: None,
            destroyed: false,
        }
    }

    /// Whether the unit is still in play.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        !self.destroyed && self.health > 0
    }

    /// Whether the unit is engaged in an ongoing combat.
    #[must_use]
    pub const fn is_in_combat(&self) -> bool {
        self.combat_opponent.is_some()
    }

    /// Whether the unit is damaged.
    #[must_use]
    pub const fn is_damaged(&self) -> bool {
        self.health < self.max_health
    }

    /// Health as a fraction of maximum.
    #[must_use]
    pub fn health_ratio(&self) -> Fixed {
        ratio(self.health, self.max_health)
    }

    /// Whether two units belong to different owners.
    #[must_use]
    pub fn is_hostile_to(&self, other: &Self) -> bool {
        self.owner != other.owner
    }

    /// Next cell on the queued path.
    #[must_use]
    pub fn next_step(&self) -> Option<HexCoord> {
        self.queued_path.first().copied()
    }

    /// Restore movement points. Called once per unit at turn start.
    pub fn reset_movement(&mut self) {
        self.movement_remaining = self.movement_capacity;
    }

    /// Move one cell along the queued path, spending one movement point.
    ///
    /// Returns the new position, or `None` if the unit cannot step.
    pub fn advance_step(&mut self) -> Option<HexCoord> {
        if self.movement_remaining == 0 || self.queued_path.is_empty() {
            return None;
        }
        let next = self.queued_path.remove(0);
        self.position = next;
        self.movement_remaining -= 1;
        Some(next)
    }

    /// Apply damage, saturating at zero. Sets the tombstone on death.
    ///
    /// Returns `true` if this damage destroyed the unit.
    pub fn take_damage(&mut self, amount: u32) -> bool {
        if self.destroyed {
            return false;
        }
        self.health = self.health.saturating_sub(amount);
        if self.health == 0 {
            self.destroyed = true;
            self.queued_path.clear();
            self.combat_opponent = None;
            return true;
        }
        false
    }

    /// Restore full health.
    pub fn repair(&mut self) {
        self.health = self.max_health;
    }

    /// Raise the sail tier by one and recompute movement capacity.
    pub fn upgrade_sails(&mut self, rules: &GameRules) {
        let base = self.movement_capacity - u32::from(self.sail_tier.saturating_sub(1));
        self.sail_tier = (self.sail_tier + 1).min(rules.max_tier);
        self.movement_capacity = GameRules::movement_for_tier(base, self.sail_tier);
    }

    /// Raise the cannon tier by one.
    pub fn upgrade_cannons(&mut self, rules: &GameRules) {
        self.cannon_tier = (self.cannon_tier + 1).min(rules.max_tier);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ship() -> Unit {
        Unit::new(
            UnitId(1),
            PlayerId(0),
            UnitKind::Ship,
            HexCoord::ORIGIN,
            ShipStats::ship(),
        )
    }

    #[test]
    fn test_new_unit_is_ready() {
        let unit = ship();
        assert!(unit.is_alive());
        assert!(!unit.is_damaged());
        assert_eq!(unit.movement_remaining, unit.movement_capacity);
        assert_eq!(unit.health_ratio(), Fixed::ONE);
    }

    #[test]
    fn test_advance_step_spends_movement() {
        let mut unit = ship();
        unit.queued_path = vec![HexCoord::new(1, 0), HexCoord::new(2, 0)];
        assert_eq!(unit.advance_step(), Some(HexCoord::new(1, 0)));
        assert_eq!(unit.movement_remaining, unit.movement_capacity - 1);
        assert_eq!(unit.next_step(), Some(HexCoord::new(2, 0)));

        unit.movement_remaining = 0;
        assert_eq!(unit.advance_step(), None);
        assert_eq!(unit.position, HexCoord::new(1, 0));
    }

    #[test]
    fn test_damage_saturates_and_tombstones() {
        let mut unit = ship();
        assert!(!unit.take_damage(2));
        assert_eq!(unit.health, 3);
        assert!(unit.take_damage(10));
        assert_eq!(unit.health, 0);
        assert!(unit.destroyed);
        assert!(!unit.is_alive());
        assert!(!unit.take_damage(1), "already destroyed");
    }

    #[test]
    fn test_upgrades_cap_at_max_tier() {
        let rules = GameRules::default();
        let mut unit = ship();
        let base = unit.movement_capacity;
        unit.upgrade_sails(&rules);
        assert_eq!(unit.sail_tier, 2);
        assert_eq!(unit.movement_capacity, base + 1);
        unit.upgrade_sails(&rules);
        unit.upgrade_sails(&rules);
        assert_eq!(unit.sail_tier, rules.max_tier);
        assert_eq!(unit.movement_capacity, base + 2);

        unit.upgrade_cannons(&rules);
        assert_eq!(unit.cannon_tier, 2);
    }
}
