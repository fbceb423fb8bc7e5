//! Fixed-point math utilities for deterministic simulation.
//!
//! Balance ratios (AI retreat threshold, harbor density) are fixed-point so
//! that no floating-point value ever influences an outcome.

use fixed::types::I32F32;

/// Fixed-point number type for all simulation ratios.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Ratio `numerator / denominator` as a fixed-point value.
///
/// A zero denominator yields zero rather than panicking.
#[must_use]
pub fn ratio(numerator: u32, denominator: u32) -> Fixed {
    if denominator == 0 {
        return Fixed::ZERO;
    }
    Fixed::from_num(numerator) / Fixed::from_num(denominator)
}

/// Fixed-point value from a whole percentage (`50` -> `0.5`).
#[must_use]
pub fn percent(value: u32) -> Fixed {
    ratio(value, 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio() {
        assert_eq!(ratio(1, 2), Fixed::from_num(0.5));
        assert_eq!(ratio(3, 3), Fixed::ONE);
        assert_eq!(ratio(5, 0), Fixed::ZERO);
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(50), ratio(1, 2));
        assert_eq!(percent(0), Fixed::ZERO);
    }

    #[test]
    fn test_fixed_serde_roundtrip() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Wrapper {
            #[serde(with = "fixed_serde")]
            value: Fixed,
        }

        let original = Wrapper {
            value: ratio(2, 3),
        };
        let bytes = bincode::serialize(&original).unwrap();
        let restored: Wrapper = bincode::deserialize(&bytes).unwrap();
        assert_eq!(original.value, restored.value);
    }
}
