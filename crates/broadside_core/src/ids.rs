//! Stable identifiers for players, units and structures.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

impl PlayerId {
    /// Reserved owner of pirate ships and pirate coves.
    pub const PIRATE: Self = Self(u32::MAX);

    /// Create a new player ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Whether this is the reserved pirate owner.
    #[must_use]
    pub const fn is_pirate(self) -> bool {
        self.0 == u32::MAX
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_pirate() {
            write!(f, "pirates")
        } else {
            write!(f, "P{}", self.0)
        }
    }
}

/// Unique identifier for a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId(pub u64);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U{}", self.0)
    }
}

/// Unique identifier for a structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StructureId(pub u64);

impl fmt::Display for StructureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

impl From<u64> for UnitId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<u64> for StructureId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pirate_id_is_reserved() {
        assert!(PlayerId::PIRATE.is_pirate());
        assert!(!PlayerId::new(0).is_pirate());
        assert_eq!(PlayerId::PIRATE.to_string(), "pirates");
        assert_eq!(PlayerId::new(2).to_string(), "P2");
    }

    #[test]
    fn test_id_ordering() {
        assert!(UnitId(1) < UnitId(2));
        assert!(StructureId(10) > StructureId(3));
    }
}
