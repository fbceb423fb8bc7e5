//! Hex-grid pathfinding using the A* algorithm.
//!
//! Every navigable step costs one movement point and hex distance is the
//! admissible heuristic. Equal-priority nodes are expanded in insertion order
//! so that the same request always yields the same route.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use crate::grid::Grid;
use crate::hex::HexCoord;

/// A node in the A* open set priority queue.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct SearchNode {
    coord: HexCoord,
    /// Steps taken from the start.
    cost: u32,
    /// cost + heuristic.
    priority: u32,
    /// Insertion counter; earlier insertions win ties.
    sequence: u64,
}

impl Ord for SearchNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap, so reverse both comparisons for min-heap behavior.
        match other.priority.cmp(&self.priority) {
            Ordering::Equal => other.sequence.cmp(&self.sequence),
            ord => ord,
        }
    }
}

impl PartialOrd for SearchNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Find the cheapest route from `start` to `goal` within `max_steps`.
///
/// The returned path includes `start` as its first element and `goal` as
/// its last. Returns `None` when start and goal coincide, when either end is
/// not navigable, or when no route of at most `max_steps` steps exists.
#[must_use]
pub fn find_path(
    grid: &Grid,
    start: HexCoord,
    goal: HexCoord,
    max_steps: u32,
) -> Option<Vec<HexCoord>> {
    find_path_avoiding(grid, start, goal, max_steps, &BTreeSet::new())
}

/// Like [`find_path`], but treats the cells in `avoid` as impassable.
///
/// The goal itself is never avoided so callers can path *to* an occupied
/// cell (for example to engage a target).
#[must_use]
pub fn find_path_avoiding(
    grid: &Grid,
    start: HexCoord,
    goal: HexCoord,
    max_steps: u32,
    avoid: &BTreeSet<HexCoord>,
) -> Option<Vec<HexCoord>> {
    if start == goal || !grid.is_navigable(start) || !grid.is_navigable(goal) {
        return None;
    }
    if start.distance(goal) > max_steps {
        return None;
    }

    let mut open_set = BinaryHeap::new();
    let mut came_from: BTreeMap<HexCoord, HexCoord> = BTreeMap::new();
    let mut best_cost: BTreeMap<HexCoord, u32> = BTreeMap::new();
    let mut sequence = 0u64;

    best_cost.insert(start, 0);
    open_set.push(SearchNode {
        coord: start,
        cost: 0,
        priority: start.distance(goal),
        sequence,
    });

    while let Some(current) = open_set.pop() {
        if current.coord == goal {
            return Some(reconstruct_path(&came_from, goal));
        }

        // Stale heap entry superseded by a cheaper one
        if best_cost
            .get(&current.coord)
            .is_some_and(|&c| c < current.cost)
        {
            continue;
        }

        let next_cost = current.cost + 1;
        if next_cost > max_steps {
            continue;
        }

        for neighbor in current.coord.neighbors() {
            if !grid.is_navigable(neighbor) {
                continue;
            }
            if neighbor != goal && avoid.contains(&neighbor) {
                continue;
            }
            let known = best_cost.get(&neighbor).copied().unwrap_or(u32::MAX);
            if next_cost >= known {
                continue;
            }
            let priority = next_cost + neighbor.distance(goal);
            if priority > max_steps {
                continue;
            }

            came_from.insert(neighbor, current.coord);
            best_cost.insert(neighbor, next_cost);
            sequence += 1;
            open_set.push(SearchNode {
                coord: neighbor,
                cost: next_cost,
                priority,
                sequence,
            });
        }
    }

    None
}

/// Reconstruct path from came_from map.
fn reconstruct_path(came_from: &BTreeMap<HexCoord, HexCoord>, goal: HexCoord) -> Vec<HexCoord> {
    let mut path = vec![goal];
    let mut current = goal;

    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }

    path.reverse();
    path
}

/// Number of steps in a path (cells minus one).
#[must_use]
pub fn step_count(path: &[HexCoord]) -> u32 {
    path.len().saturating_sub(1) as u32
}

/// Whether consecutive cells of the path are adjacent and navigable.
#[must_use]
pub fn is_contiguous(grid: &Grid, path: &[HexCoord]) -> bool {
    path.iter().all(|c| grid.is_navigable(*c)) && path.windows(2).all(|w| w[0].is_adjacent(w[1]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{IslandId, Tile};

    fn h(q: i32, r: i32) -> HexCoord {
        HexCoord::new(q, r)
    }

    #[test]
    fn test_simple_path() {
        let grid = Grid::hexagon(4);
        let path = find_path(&grid, h(0, 0), h(3, 0), 10).unwrap();
        assert_eq!(path.first(), Some(&h(0, 0)));
        assert_eq!(path.last(), Some(&h(3, 0)));
        assert_eq!(step_count(&path), 3);
        assert!(is_contiguous(&grid, &path));
    }

    #[test]
    fn test_path_around_land() {
        let mut grid = Grid::hexagon(4);
        // Wall of land between origin and (3, 0), leaving the far rows open
        for r in -2..=1 {
            grid.insert(Tile::land(h(1, r), IslandId(0)));
        }
        let path = find_path(&grid, h(0, 0), h(3, 0), 10).unwrap();
        assert!(path.iter().all(|c| grid.is_navigable(*c)));
        assert!(step_count(&path) > 3);
        assert!(is_contiguous(&grid, &path));
    }

    #[test]
    fn test_no_path_when_enclosed() {
        let mut grid = Grid::hexagon(4);
        for n in h(0, 0).neighbors() {
            grid.insert(Tile::land(n, IslandId(0)));
        }
        assert!(find_path(&grid, h(0, 0), h(3, 0), 20).is_none());
    }

    #[test]
    fn test_step_budget() {
        let grid = Grid::hexagon(4);
        assert!(find_path(&grid, h(0, 0), h(3, 0), 2).is_none());
        assert!(find_path(&grid, h(0, 0), h(3, 0), 3).is_some());
    }

    #[test]
    fn test_budget_excludes_detours() {
        let mut grid = Grid::hexagon(4);
        grid.insert(Tile::land(h(1, 0), IslandId(0)));
        // Straight line is blocked; the detour needs 3 steps
        assert!(find_path(&grid, h(0, 0), h(2, 0), 2).is_none());
        assert_eq!(
            find_path(&grid, h(0, 0), h(2, 0), 3).map(|p| step_count(&p)),
            Some(3)
        );
    }

    #[test]
    fn test_same_cell_is_none() {
        let grid = Grid::hexagon(2);
        assert!(find_path(&grid, h(1, 0), h(1, 0), 5).is_none());
    }

    #[test]
    fn test_land_goal_is_none() {
        let mut grid = Grid::hexagon(2);
        grid.insert(Tile::land(h(2, 0), IslandId(0)));
        assert!(find_path(&grid, h(0, 0), h(2, 0), 5).is_none());
    }

    #[test]
    fn test_avoid_set() {
        let grid = Grid::hexagon(3);
        let avoid: BTreeSet<_> = [h(1, 0)].into_iter().collect();
        let path = find_path_avoiding(&grid, h(0, 0), h(2, 0), 5, &avoid).unwrap();
        assert!(!path.contains(&h(1, 0)));

        // The goal is reachable even if listed in the avoid set
        let avoid_goal: BTreeSet<_> = [h(2, 0)].into_iter().collect();
        assert!(find_path_avoiding(&grid, h(0, 0), h(2, 0), 5, &avoid_goal).is_some());
    }

    #[test]
    fn test_determinism() {
        let mut grid = Grid::hexagon(6);
        for r in -3..=2 {
            grid.insert(Tile::land(h(2, r), IslandId(0)));
        }
        let first = find_path(&grid, h(-2, 0), h(5, -1), 30);
        for _ in 0..5 {
            assert_eq!(find_path(&grid, h(-2, 0), h(5, -1), 30), first);
        }
    }
}
