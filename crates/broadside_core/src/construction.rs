//! Per-structure build queues.
//!
//! Every shipyard-class structure owns a bounded FIFO queue. Each call to
//! [`ConstructionManager::advance`] moves only the head item one turn closer
//! to completion; a head reaching zero turns remaining is popped and its
//! effect applied at the structure. A finished ship with nowhere to launch
//! stays at the head until a launch site clears.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::data::GameRules;
use crate::events::{GameEvent, GameEventKind};
use crate::grid::Grid;
use crate::hex::HexCoord;
use crate::ids::{PlayerId, StructureId, UnitId};
use crate::registry::Registry;
use crate::structures::{Structure, StructureKind};
use crate::units::{Unit, UnitKind};

/// What a queue entry produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildItemKind {
    /// A new ship at the structure.
    Ship,
    /// Upgrade the structure to a naval yard.
    NavalYard,
    /// Upgrade the structure to a naval fortress.
    NavalFortress,
}

impl BuildItemKind {
    /// The fortification item that turns `kind` into the next level.
    #[must_use]
    pub const fn fortification_of(kind: StructureKind) -> Option<Self> {
        match kind {
            StructureKind::Shipyard => Some(Self::NavalYard),
            StructureKind::NavalYard => Some(Self::NavalFortress),
            _ => None,
        }
    }

    /// Whether this item upgrades the structure rather than launching a ship.
    #[must_use]
    pub const fn is_fortification(self) -> bool {
        !matches!(self, Self::Ship)
    }
}

/// An entry in a build queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildItem {
    /// What is being built.
    pub kind: BuildItemKind,
    /// Turns of progress still needed once at the head.
    pub turns_remaining: u32,
}

impl BuildItem {
    /// Create a queue entry.
    #[must_use]
    pub const fn new(kind: BuildItemKind, turns: u32) -> Self {
        Self {
            kind,
            turns_remaining: turns,
        }
    }

    /// Check if the item is done.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.turns_remaining == 0
    }

    /// Advance by one turn.
    pub fn tick(&mut self) {
        self.turns_remaining = self.turns_remaining.saturating_sub(1);
    }
}

/// Errors from queue operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConstructionError {
    /// The queue is already at its bound.
    #[error("Build queue is full")]
    QueueFull,
    /// The structure has no build queue.
    #[error("Structure {0} has no build queue")]
    NotRegistered(StructureId),
}

/// Bounded FIFO build queue for one structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildQueue {
    items: VecDeque<BuildItem>,
    max_size: usize,
}

impl BuildQueue {
    /// Create an empty queue with the given bound.
    #[must_use]
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            items: VecDeque::new(),
            max_size,
        }
    }

    /// Check if the queue is full.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.max_size
    }

    /// Check if the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Maximum number of items.
    #[must_use]
    pub const fn max_size(&self) -> usize {
        self.max_size
    }

    /// Item currently in progress.
    #[must_use]
    pub fn head(&self) -> Option<&BuildItem> {
        self.items.front()
    }

    /// Iterate front to back.
    pub fn iter(&self) -> impl Iterator<Item = &BuildItem> {
        self.items.iter()
    }

    /// Append an item, failing when full.
    pub fn push(&mut self, item: BuildItem) -> Result<(), ConstructionError> {
        if self.is_full() {
            return Err(ConstructionError::QueueFull);
        }
        self.items.push_back(item);
        Ok(())
    }

    /// Advance the head by one turn. Returns its kind once it is done.
    fn advance(&mut self) -> Option<BuildItemKind> {
        let head = self.items.front_mut()?;
        head.tick();
        head.is_complete().then_some(head.kind)
    }

    fn pop_head(&mut self) -> Option<BuildItem> {
        self.items.pop_front()
    }
}

/// Owner of every build queue in the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructionManager {
    queues: BTreeMap<StructureId, BuildQueue>,
    max_queue_size: usize,
    ship_build_time: u32,
    fortify_build_time: u32,
}

impl Default for ConstructionManager {
    fn default() -> Self {
        Self::new(&GameRules::default())
    }
}

impl ConstructionManager {
    /// Create a manager using the queue bound and build times from `rules`.
    #[must_use]
    pub fn new(rules: &GameRules) -> Self {
        Self {
            queues: BTreeMap::new(),
            max_queue_size: rules.max_queue_size,
            ship_build_time: rules.ship_build_time,
            fortify_build_time: rules.fortify_build_time,
        }
    }

    /// Give a structure an empty queue. Existing queues are kept.
    pub fn register_shipyard(&mut self, id: StructureId) {
        let max = self.max_queue_size;
        self.queues
            .entry(id)
            .or_insert_with(|| BuildQueue::with_max_size(max));
    }

    /// Drop a structure's queue and everything in it.
    pub fn unregister(&mut self, id: StructureId) -> Option<BuildQueue> {
        self.queues.remove(&id)
    }

    /// Whether the structure has a queue.
    #[must_use]
    pub fn is_registered(&self, id: StructureId) -> bool {
        self.queues.contains_key(&id)
    }

    /// A structure's queue.
    #[must_use]
    pub fn queue(&self, id: StructureId) -> Option<&BuildQueue> {
        self.queues.get(&id)
    }

    /// Registered structures in id order.
    pub fn registered(&self) -> impl Iterator<Item = StructureId> + '_ {
        self.queues.keys().copied()
    }

    /// Build time of an item kind.
    #[must_use]
    pub const fn build_time(&self, kind: BuildItemKind) -> u32 {
        match kind {
            BuildItemKind::Ship => self.ship_build_time,
            BuildItemKind::NavalYard | BuildItemKind::NavalFortress => self.fortify_build_time,
        }
    }

    /// Queue an item at a structure.
    ///
    /// Returns the queue length after insertion.
    pub fn enqueue(&mut self, id: StructureId, kind: BuildItemKind) -> Result<usize, ConstructionError> {
        let turns = self.build_time(kind);
        let queue = self
            .queues
            .get_mut(&id)
            .ok_or(ConstructionError::NotRegistered(id))?;
        queue.push(BuildItem::new(kind, turns))?;
        Ok(queue.len())
    }

    /// Kind the structure will have once every queued fortification lands.
    #[must_use]
    pub fn projected_kind(&self, structure: &Structure) -> StructureKind {
        let queued = self
            .queues
            .get(&structure.id)
            .map_or(0, |q| q.iter().filter(|i| i.kind.is_fortification()).count());
        (0..queued).fold(structure.kind, |kind, _| kind.fortified().unwrap_or(kind))
    }

    /// Advance every queue by one turn.
    ///
    /// Completed ships spawn at the structure's tile, or at its first
    /// navigable neighbor in direction order when a hostile ship holds the
    /// tile. With every site blocked the ship waits at the head of the queue.
    /// Completed fortifications upgrade the structure in place. Queues whose
    /// structure no longer exists or is no longer owned are dropped.
    pub fn advance(
        &mut self,
        turn: u32,
        structures: &mut Registry<StructureId, Structure>,
        units: &mut Registry<UnitId, Unit>,
        grid: &Grid,
        rules: &GameRules,
    ) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let mut orphaned = Vec::new();

        for (&id, queue) in &mut self.queues {
            let Some(structure) = structures.get_mut(id) else {
                orphaned.push(id);
                continue;
            };
            let Some(owner) = structure.owner.filter(|_| structure.kind.is_shipyard_class()) else {
                orphaned.push(id);
                continue;
            };
            let Some(kind) = queue.advance() else {
                continue;
            };

            match kind {
                BuildItemKind::Ship => {
                    let Some(position) = launch_site(structure.position, owner, grid, units) else {
                        debug!("Turn {}: {} has a ship ready but every launch site is blocked", turn, id);
                        continue;
                    };
                    queue.pop_head();
                    let unit = units.insert_with(|uid| {
                        Unit::new(uid, owner, UnitKind::Ship, position, rules.ship)
                    });
                    debug!("Turn {}: {} launched {} at {}", turn, id, unit, position);
                    events.push(GameEvent::new(
                        turn,
                        GameEventKind::ShipBuilt {
                            unit,
                            structure: id,
                            owner,
                            position,
                        },
                    ));
                }
                BuildItemKind::NavalYard | BuildItemKind::NavalFortress => {
                    queue.pop_head();
                    if structure.fortify(&rules.structures) {
                        events.push(GameEvent::new(
                            turn,
                            GameEventKind::StructureUpgraded {
                                structure: id,
                                kind: structure.kind,
                            },
                        ));
                    }
                }
            }
        }

        for id in orphaned {
            warn!("Dropping build queue of {} (structure lost)", id);
            self.queues.remove(&id);
        }

        events
    }
}

/// First tile a new ship can take: the yard itself, then its navigable
/// neighbors, skipping any tile a hostile ship sits on.
fn launch_site(
    yard: HexCoord,
    owner: PlayerId,
    grid: &Grid,
    units: &Registry<UnitId, Unit>,
) -> Option<HexCoord> {
    let clear = |at: HexCoord| {
        !units
            .values()
            .any(|u| u.is_alive() && u.position == at && u.owner != owner)
    };
    std::iter::once(yard)
        .chain(yard.neighbors().into_iter().filter(|c| grid.is_navigable(*c)))
        .find(|c| clear(*c))
}
