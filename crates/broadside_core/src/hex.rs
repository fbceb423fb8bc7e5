//! Axial hex coordinates.
//!
//! Uses the axial `(q, r)` system with the implied cube coordinate
//! `s = -q - r`. All arithmetic is integer so coordinates can be hashed,
//! ordered and compared across clients.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The six axial neighbor offsets, clockwise from east.
pub const DIRECTIONS: [HexCoord; 6] = [
    HexCoord::new(1, 0),  // East
    HexCoord::new(1, -1), // Northeast
    HexCoord::new(0, -1), // Northwest
    HexCoord::new(-1, 0), // West
    HexCoord::new(-1, 1), // Southwest
    HexCoord::new(0, 1),  // Southeast
];

/// A cell address on the hex grid.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct HexCoord {
    /// Column axis.
    pub q: i32,
    /// Row axis.
    pub r: i32,
}

impl HexCoord {
    /// The map origin.
    pub const ORIGIN: Self = Self::new(0, 0);

    /// Create a new coordinate.
    #[must_use]
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Implied third cube coordinate.
    #[must_use]
    pub const fn s(self) -> i32 {
        -self.q - self.r
    }

    /// Number of steps between two cells.
    #[must_use]
    pub fn distance(self, other: Self) -> u32 {
        let dq = (self.q - other.q).unsigned_abs();
        let dr = (self.r - other.r).unsigned_abs();
        let ds = (self.s() - other.s()).unsigned_abs();
        dq.max(dr).max(ds)
    }

    /// Distance from the origin.
    #[must_use]
    pub fn length(self) -> u32 {
        self.distance(Self::ORIGIN)
    }

    /// Neighbor in one of the six [`DIRECTIONS`] (index wraps).
    #[must_use]
    pub fn neighbor(self, direction: usize) -> Self {
        self + DIRECTIONS[direction % DIRECTIONS.len()]
    }

    /// All six neighbors in direction order.
    #[must_use]
    pub fn neighbors(self) -> [Self; 6] {
        DIRECTIONS.map(|d| self + d)
    }

    /// Index into [`DIRECTIONS`] of the step from this cell to `other`.
    ///
    /// `None` unless the cells are adjacent.
    #[must_use]
    pub fn direction(self, other: Self) -> Option<usize> {
        let delta = other - self;
        DIRECTIONS.iter().position(|d| *d == delta)
    }

    /// Whether `other` shares an edge with this cell.
    #[must_use]
    pub fn is_adjacent(self, other: Self) -> bool {
        self.distance(other) == 1
    }

    /// Cells at exactly `radius` steps, in ring order.
    ///
    /// Radius zero yields only this cell.
    #[must_use]
    pub fn ring(self, radius: u32) -> Vec<Self> {
        if radius == 0 {
            return vec![self];
        }
        let mut cells = Vec::with_capacity(6 * radius as usize);
        let mut current = self + DIRECTIONS[4].scale(radius as i32);
        for direction in DIRECTIONS {
            for _ in 0..radius {
                cells.push(current);
                current = current + direction;
            }
        }
        cells
    }

    /// All cells within `radius` steps, sorted.
    #[must_use]
    pub fn range(self, radius: u32) -> Vec<Self> {
        let n = radius as i32;
        let mut cells = Vec::new();
        for dq in -n..=n {
            for dr in (-n).max(-dq - n)..=n.min(-dq + n) {
                cells.push(Self::new(self.q + dq, self.r + dr));
            }
        }
        cells.sort_unstable();
        cells
    }

    /// Multiply both axes by `factor`.
    #[must_use]
    pub const fn scale(self, factor: i32) -> Self {
        Self::new(self.q * factor, self.r * factor)
    }
}

impl std::ops::Add for HexCoord {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.q + rhs.q, self.r + rhs.r)
    }
}

impl std::ops::Sub for HexCoord {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.q - rhs.q, self.r - rhs.r)
    }
}

impl fmt::Display for HexCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.q, self.r)
    }
}

/// Unordered pair of cells, used to key edge crossings.
///
/// `EdgeKey::new(a, b) == EdgeKey::new(b, a)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    low: HexCoord,
    high: HexCoord,
}

impl EdgeKey {
    /// Create a normalized edge key.
    #[must_use]
    pub fn new(a: HexCoord, b: HexCoord) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    /// Both endpoints, smaller first.
    #[must_use]
    pub const fn endpoints(self) -> (HexCoord, HexCoord) {
        (self.low, self.high)
    }

    /// Whether the cell is one of the two endpoints.
    #[must_use]
    pub fn touches(self, coord: HexCoord) -> bool {
        self.low == coord || self.high == coord
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.low, self.high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let origin = HexCoord::ORIGIN;
        assert_eq!(origin.distance(HexCoord::new(0, 0)), 0);
        assert_eq!(origin.distance(HexCoord::new(1, 0)), 1);
        assert_eq!(origin.distance(HexCoord::new(2, -1)), 2);
        assert_eq!(origin.distance(HexCoord::new(-3, 3)), 3);
        assert_eq!(HexCoord::new(1, 2).distance(HexCoord::new(-2, 2)), 3);
    }

    #[test]
    fn test_neighbors_are_adjacent_and_distinct() {
        let center = HexCoord::new(3, -1);
        let neighbors = center.neighbors();
        for (i, n) in neighbors.iter().enumerate() {
            assert!(center.is_adjacent(*n));
            for other in &neighbors[i + 1..] {
                assert_ne!(n, other);
            }
        }
    }

    #[test]
    fn test_neighbor_wraps_direction() {
        let c = HexCoord::ORIGIN;
        assert_eq!(c.neighbor(0), c.neighbor(6));
    }

    #[test]
    fn test_direction_inverts_neighbor() {
        let center = HexCoord::new(2, -1);
        for (i, n) in center.neighbors().into_iter().enumerate() {
            assert_eq!(center.direction(n), Some(i));
        }
        assert_eq!(center.direction(center), None);
        assert_eq!(center.direction(HexCoord::new(4, -1)), None);
    }

    #[test]
    fn test_ring_sizes() {
        let c = HexCoord::new(2, 2);
        assert_eq!(c.ring(0), vec![c]);
        assert_eq!(c.ring(1).len(), 6);
        assert_eq!(c.ring(3).len(), 18);
        assert!(c.ring(3).iter().all(|h| h.distance(c) == 3));
    }

    #[test]
    fn test_range_count() {
        // 3R(R+1)+1 cells within radius R
        assert_eq!(HexCoord::ORIGIN.range(0).len(), 1);
        assert_eq!(HexCoord::ORIGIN.range(1).len(), 7);
        assert_eq!(HexCoord::ORIGIN.range(4).len(), 61);
    }

    #[test]
    fn test_edge_key_is_unordered() {
        let a = HexCoord::new(0, 0);
        let b = HexCoord::new(1, 0);
        assert_eq!(EdgeKey::new(a, b), EdgeKey::new(b, a));
        assert!(EdgeKey::new(a, b).touches(a));
        assert!(!EdgeKey::new(a, b).touches(HexCoord::new(5, 5)));
        assert_eq!(EdgeKey::new(b, a).endpoints(), (a, b));
    }
}
