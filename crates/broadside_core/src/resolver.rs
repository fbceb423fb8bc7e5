//! Turn resolution.
//!
//! A [`TurnResolver`] drives one pass over the pending orders:
//!
//! 1. **Orders** - every pending order is re-validated and applied in player
//!    id order, then submission order. Paid actions are charged here.
//! 2. **Movement** - all units advance one cell per tick in lock-step. Each
//!    tick compares a single snapshot of intended steps, so two ships racing
//!    for a tile are treated identically whatever their ids.
//! 3. **Encounters** - hostile swaps across an edge open PASSING encounters,
//!    hostile arrivals at a tile open ENTRY encounters. If a human still owes
//!    a decision the pass suspends, leaving its progress in
//!    [`GameState::resolution`].
//! 4. **Combat and upkeep** - ongoing engagements, shipyard assaults,
//!    construction, pirate spawns, elimination, income and victory.
//!
//! # Determinism
//!
//! Units, structures and players iterate in id order, encounters in key order,
//! and each dice roll draws from a fresh stream derived from the game seed,
//! the turn and a per-turn sequence number. Resolving the same state twice
//! produces identical events and identical resulting state, including when
//! the pass is suspended, saved, reloaded and resumed.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::ai;
use crate::combat::{combat_rng, resolve_duel, resolve_structure_assault, roll_bounty, OngoingCombat};
use crate::construction::BuildItemKind;
use crate::encounter::{
    CollisionEntry, CollisionInfo, Decision, Encounter, EncounterKey, EncounterKind, Participant,
};
use crate::events::{GameEvent, GameEventKind};
use crate::hex::{EdgeKey, HexCoord};
use crate::ids::{PlayerId, StructureId, UnitId};
use crate::orders::{Order, UpgradeKind};
use crate::players::PlayerKind;
use crate::state::{GamePhase, GameState, ResolutionProgress, ResolutionStage};
use crate::structures::StructureKind;
use crate::units::{Unit, UnitKind};
use crate::validation::validate;

pub use crate::validation::RejectedOrder;

/// Summary of a completed turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnResult {
    /// The turn that was resolved.
    pub turn: u32,
    /// Every event of the turn, in emission order.
    pub events: Vec<GameEvent>,
    /// Entry collisions seen during movement.
    pub collisions: Vec<CollisionInfo>,
    /// Winner, once the game is over.
    pub winner: Option<PlayerId>,
    /// Orders dropped during application.
    pub rejections: Vec<RejectedOrder>,
    /// Whether this turn ended the game.
    pub game_over: bool,
}

/// Outcome of a call to [`TurnResolver::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnProgress {
    /// Resolution is suspended until these encounters have every decision.
    AwaitingDecisions(Vec<Encounter>),
    /// The turn is fully resolved.
    Complete(TurnResult),
}

impl TurnProgress {
    /// Whether the turn finished.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }

    /// The result of a finished turn.
    #[must_use]
    pub fn into_result(self) -> Option<TurnResult> {
        match self {
            Self::Complete(result) => Some(result),
            Self::AwaitingDecisions(_) => None,
        }
    }
}

/// A unit's intended step for the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Intent {
    unit: UnitId,
    owner: PlayerId,
    from: HexCoord,
    to: HexCoord,
}

impl Intent {
    const fn participant(&self) -> Participant {
        Participant {
            unit: self.unit,
            owner: self.owner,
            from: self.from,
            to: self.to,
            decision: Decision::None,
        }
    }
}

/// Conflicts found in one tick.
#[derive(Debug, Default)]
struct Detection {
    encounters: Vec<Encounter>,
    collisions: Vec<CollisionInfo>,
}

/// Classify the conflicts in a tick's intents. Pure.
///
/// Hostile units swapping across an edge share a PASSING encounter keyed by
/// that edge; everyone crossing the edge takes part. Every mover, swapping
/// or not, is also grouped by destination: any group with two or more
/// movers is a collision, and a group (plus the units already sitting on
/// the tile) with more than one owner is an ENTRY encounter. A swapping
/// unit can therefore hold a stake in both kinds in the same tick.
fn detect(
    state: &GameState,
    intents: &[Intent],
    tracks: &BTreeMap<UnitId, Vec<HexCoord>>,
    tick: u32,
) -> Detection {
    let mut detection = Detection::default();

    let mut hostile_edges = BTreeSet::new();
    for (i, a) in intents.iter().enumerate() {
        for b in &intents[i + 1..] {
            if a.owner != b.owner && a.from == b.to && a.to == b.from {
                hostile_edges.insert(EdgeKey::new(a.from, a.to));
            }
        }
    }

    let mut crossing: BTreeMap<EdgeKey, Vec<Participant>> = BTreeMap::new();
    for intent in intents {
        let edge = EdgeKey::new(intent.from, intent.to);
        if hostile_edges.contains(&edge) {
            crossing.entry(edge).or_default().push(intent.participant());
        }
    }
    for (edge, participants) in crossing {
        detection.encounters.push(Encounter::new(
            EncounterKey::Edge(edge),
            state.turn,
            tick,
            participants,
        ));
    }

    let moving: BTreeSet<UnitId> = intents.iter().map(|i| i.unit).collect();
    let mut arrivals: BTreeMap<HexCoord, Vec<&Intent>> = BTreeMap::new();
    for intent in intents {
        arrivals.entry(intent.to).or_default().push(intent);
    }

    for (tile, movers) in arrivals {
        if movers.len() >= 2 {
            let entries = movers
                .iter()
                .map(|m| CollisionEntry {
                    unit: m.unit,
                    traversed: tracks.get(&m.unit).cloned().unwrap_or_else(|| vec![m.from]),
                    remaining: state
                        .units
                        .get(m.unit)
                        .map(|u| u.queued_path.clone())
                        .unwrap_or_default(),
                })
                .collect();
            detection.collisions.push(CollisionInfo {
                tile,
                tick,
                entries,
            });
        }

        let mut participants: Vec<Participant> = movers.iter().map(|m| m.participant()).collect();
        participants.extend(
            state
                .units_at(tile)
                .filter(|u| !moving.contains(&u.id))
                .map(|u| Participant {
                    unit: u.id,
                    owner: u.owner,
                    from: tile,
                    to: tile,
                    decision: Decision::None,
                }),
        );
        let owners: BTreeSet<PlayerId> = participants.iter().map(|p| p.owner).collect();
        if owners.len() >= 2 {
            detection.encounters.push(Encounter::new(
                EncounterKey::Tile(tile),
                state.turn,
                tick,
                participants,
            ));
        }
    }

    detection.encounters.sort_by_key(|e| e.key);
    detection
}

/// Exclusive driver of one resolution pass.
///
/// The resolver borrows the state mutably for the whole pass; nothing else
/// can touch units, structures or players while it runs.
pub struct TurnResolver<'a> {
    state: &'a mut GameState,
    progress: ResolutionProgress,
}

impl<'a> TurnResolver<'a> {
    /// Pick up the state's in-flight pass, or start a fresh one.
    pub fn new(state: &'a mut GameState) -> Self {
        let progress = state.resolution.take().unwrap_or_default();
        Self { state, progress }
    }

    /// Run until the turn completes or a decision is needed.
    ///
    /// A suspended pass is stored back into the state; calling `run` on a
    /// new resolver after the decisions arrive resumes it exactly where it
    /// stopped.
    pub fn run(mut self) -> TurnProgress {
        loop {
            match self.progress.stage {
                ResolutionStage::Idle => {
                    self.state.phase = GamePhase::Resolving;
                    self.apply_orders();
                    self.progress.stage = ResolutionStage::MovementInProgress;
                }
                ResolutionStage::MovementInProgress | ResolutionStage::ConflictPending => {
                    self.progress.stage = ResolutionStage::MovementInProgress;
                    if let Some(open) = self.run_movement() {
                        self.progress.stage = ResolutionStage::ConflictPending;
                        self.state.resolution = Some(std::mem::take(&mut self.progress));
                        return TurnProgress::AwaitingDecisions(open);
                    }
                    self.report_moves();
                    self.progress.stage = ResolutionStage::CombatPending;
                }
                ResolutionStage::CombatPending => {
                    self.resolve_ongoing_combats();
                    self.resolve_assaults();
                    self.upkeep();
                    self.progress.stage = ResolutionStage::Done;
                }
                ResolutionStage::Done => return TurnProgress::Complete(self.finish()),
            }
        }
    }

    fn emit(&mut self, kind: GameEventKind) {
        let turn = self.state.turn;
        self.progress.events.push(GameEvent::new(turn, kind));
    }

    fn halt(&mut self, unit: UnitId) {
        self.progress.halted.insert(unit);
    }

    // ------------------------------------------------------------------
    // Orders
    // ------------------------------------------------------------------

    fn apply_orders(&mut self) {
        let turn = self.state.turn;
        let batches = std::mem::take(&mut self.state.pending_orders);

        for (player, orders) in batches {
            for order in orders {
                match validate(&order, self.state) {
                    Ok(()) => self.apply(order),
                    Err(reason) if reason.is_stale() => {
                        tracing::debug!(
                            "Turn {}: skipping stale {} order from {}: {}",
                            turn,
                            order.kind_name(),
                            player,
                            reason
                        );
                    }
                    Err(reason) => {
                        tracing::warn!(
                            "Turn {}: rejected {} order from {}: {}",
                            turn,
                            order.kind_name(),
                            player,
                            reason
                        );
                        self.progress.rejections.push(RejectedOrder {
                            player,
                            order,
                            reason,
                        });
                    }
                }
            }
        }

        for (unit, path) in ai::plan_pirate_moves(self.state) {
            if let Some(pirate) = self.state.units.get_mut(unit) {
                pirate.queued_path = path;
            }
        }
    }

    fn apply(&mut self, order: Order) {
        let turn = self.state.turn;
        match order {
            Order::Move { unit, path, .. } => {
                if let Some(u) = self.state.units.get_mut(unit) {
                    u.queued_path = path.get(1..).map(<[HexCoord]>::to_vec).unwrap_or_default();
                }
            }
            Order::DeployShipyard {
                player,
                unit,
                position,
            } => {
                let Some(structure) = self.state.structure_at(position).map(|s| s.id) else {
                    return;
                };
                self.charge(player, self.state.rules.shipyard_cost);
                if let Some(s) = self.state.structures.get_mut(structure) {
                    s.claim(player, &self.state.rules.structures);
                }
                self.state.construction.register_shipyard(structure);
                tracing::info!("Turn {}: {} claimed a shipyard at {}", turn, player, position);
                self.emit(GameEventKind::ShipyardDeployed {
                    player,
                    unit,
                    structure,
                    position,
                });
            }
            Order::BuildShip { player, structure } => {
                let cost = self.state.rules.ship_cost;
                self.queue_item(player, structure, BuildItemKind::Ship, cost);
            }
            Order::FortifyStructure { player, structure } => {
                let construction = &self.state.construction;
                let item = self
                    .state
                    .structures
                    .get(structure)
                    .and_then(|s| BuildItemKind::fortification_of(construction.projected_kind(s)));
                if let Some(item) = item {
                    let cost = self.state.rules.fortify_cost;
                    self.queue_item(player, structure, item, cost);
                }
            }
            Order::RepairShip {
                player,
                unit,
                structure,
            } => {
                self.charge(player, self.state.rules.repair_cost);
                let Some(u) = self.state.units.get_mut(unit) else {
                    return;
                };
                let restored = u.max_health - u.health;
                u.repair();
                self.emit(GameEventKind::ShipRepaired {
                    unit,
                    structure,
                    restored,
                });
            }
            Order::UpgradeShip {
                player,
                unit,
                upgrade,
                ..
            } => {
                self.charge(player, self.state.rules.upgrade_cost);
                let Some(u) = self.state.units.get_mut(unit) else {
                    return;
                };
                let tier = match upgrade {
                    UpgradeKind::Sails => {
                        u.upgrade_sails(&self.state.rules);
                        u.sail_tier
                    }
                    UpgradeKind::Cannons => {
                        u.upgrade_cannons(&self.state.rules);
                        u.cannon_tier
                    }
                };
                self.emit(GameEventKind::ShipUpgraded {
                    unit,
                    upgrade,
                    tier,
                });
            }
            Order::AttackShipyard {
                unit, structure, ..
            } => {
                self.progress.assaults.push((unit, structure));
            }
        }
    }

    fn charge(&mut self, player: PlayerId, cost: u32) {
        if let Some(p) = self.state.players.get_mut(&player) {
            if !p.spend(cost) {
                tracing::warn!("{} could not pay {} gold", player, cost);
            }
        }
    }

    fn queue_item(&mut self, player: PlayerId, structure: StructureId, item: BuildItemKind, cost: u32) {
        match self.state.construction.enqueue(structure, item) {
            Ok(queue_len) => {
                self.charge(player, cost);
                self.emit(GameEventKind::BuildQueued {
                    structure,
                    item,
                    queue_len,
                });
            }
            Err(err) => {
                tracing::warn!("Could not queue {:?} at {}: {}", item, structure, err);
            }
        }
    }

    // ------------------------------------------------------------------
    // Movement
    // ------------------------------------------------------------------

    fn intents(&self) -> Vec<Intent> {
        self.state
            .units
            .values()
            .filter(|u| u.is_alive() && u.movement_remaining > 0)
            .filter(|u| !self.progress.halted.contains(&u.id))
            .filter_map(|u| {
                u.next_step().map(|to| Intent {
                    unit: u.id,
                    owner: u.owner,
                    from: u.position,
                    to,
                })
            })
            .collect()
    }

    /// Run movement ticks. Returns the open encounters if the pass must wait.
    fn run_movement(&mut self) -> Option<Vec<Encounter>> {
        // Every tick each mover either steps or halts, so this bound is never hit
        let limit = self
            .state
            .units
            .values()
            .map(|u| u.movement_capacity)
            .max()
            .unwrap_or(0)
            + 1;

        while self.progress.tick < limit {
            let intents = self.intents();
            if intents.is_empty() {
                break;
            }
            let tick = self.progress.tick;
            let Detection {
                mut encounters,
                collisions,
            } = detect(self.state, &intents, &self.progress.tracks, tick);

            for encounter in &mut encounters {
                let (key, turn) = (encounter.key, encounter.turn);
                for earlier in self
                    .state
                    .decided_encounters
                    .iter()
                    .chain(&self.state.pending_encounters)
                    .filter(|e| e.key == key && e.turn == turn && e.tick == tick)
                {
                    encounter.merge_decisions(earlier);
                }
                self.auto_decide(encounter);
            }

            // First visit of this tick; a resumed tick has already announced
            if self.progress.announced.is_empty() {
                for collision in &collisions {
                    self.emit(GameEventKind::UnitsCollided {
                        tile: collision.tile,
                        units: collision.units(),
                    });
                }
                self.progress.collisions.extend(collisions);
            }
            for encounter in &encounters {
                if self.progress.announced.insert(encounter.key) {
                    tracing::debug!(
                        "Turn {} tick {}: {:?} encounter at {} involving {:?}",
                        encounter.turn,
                        tick,
                        encounter.kind(),
                        encounter.key,
                        encounter.units()
                    );
                    self.emit(GameEventKind::ConflictDetected {
                        kind: encounter.kind(),
                        key: encounter.key,
                        units: encounter.units(),
                    });
                }
            }

            let (open, ready): (Vec<Encounter>, Vec<Encounter>) =
                encounters.iter().cloned().partition(|e| !e.is_decided());
            if !open.is_empty() {
                tracing::info!(
                    "Turn {} tick {}: waiting for decisions on {} encounter(s)",
                    self.state.turn,
                    tick,
                    open.len()
                );
                self.state.pending_encounters = open.clone();
                self.state.decided_encounters = ready;
                return Some(open);
            }

            self.resolve_tick(&intents, &encounters);
            self.state.pending_encounters.clear();
            self.state.decided_encounters.clear();
            self.progress.announced.clear();
            self.progress.tick += 1;
        }

        None
    }

    /// Fill in decisions for pirates and AI players.
    fn auto_decide(&self, encounter: &mut Encounter) {
        let kind = encounter.kind();
        for p in &mut encounter.participants {
            if p.decision != Decision::None {
                continue;
            }
            let human = self
                .state
                .player(p.owner)
                .is_some_and(|pl| pl.kind == PlayerKind::Human);
            if human {
                continue;
            }
            if let Some(unit) = self.state.units.get(p.unit) {
                p.decision = ai::encounter_decision(unit, kind, &self.state.rules);
            }
        }
    }

    fn resolve_tick(&mut self, intents: &[Intent], encounters: &[Encounter]) {
        for encounter in encounters {
            match encounter.kind() {
                EncounterKind::Entry => self.resolve_entry(encounter),
                EncounterKind::Passing => self.resolve_passing(encounter),
            }
            self.emit(GameEventKind::EncounterResolved {
                key: encounter.key,
                escalated: encounter.escalated(),
            });
        }

        let targets: BTreeMap<UnitId, HexCoord> = intents.iter().map(|i| (i.unit, i.to)).collect();
        let mut proceeding: BTreeSet<UnitId> = intents
            .iter()
            .map(|i| i.unit)
            .filter(|id| !self.progress.halted.contains(id) && self.state.living_unit(*id).is_some())
            .collect();

        // Hostile ships never end a tick on the same tile: hold back anyone
        // who would, until the set of movers is stable.
        loop {
            let ends: BTreeMap<UnitId, (PlayerId, HexCoord)> = self
                .state
                .units
                .values()
                .filter(|u| u.is_alive())
                .map(|u| {
                    let end = if proceeding.contains(&u.id) {
                        targets.get(&u.id).copied().unwrap_or(u.position)
                    } else {
                        u.position
                    };
                    (u.id, (u.owner, end))
                })
                .collect();
            let blocked: Vec<UnitId> = proceeding
                .iter()
                .copied()
                .filter(|id| {
                    ends.get(id).is_some_and(|(owner, end)| {
                        ends.iter()
                            .any(|(other, (o, e))| other != id && o != owner && e == end)
                    })
                })
                .collect();
            if blocked.is_empty() {
                break;
            }
            for id in blocked {
                proceeding.remove(&id);
                self.halt(id);
            }
        }

        for id in proceeding {
            let Some(unit) = self.state.units.get_mut(id) else {
                continue;
            };
            let from = unit.position;
            if let Some(to) = unit.advance_step() {
                self.progress
                    .tracks
                    .entry(id)
                    .or_insert_with(|| vec![from])
                    .push(to);
            }
        }
    }

    fn resolve_entry(&mut self, encounter: &Encounter) {
        let participants = &encounter.participants;
        if !encounter.escalated() {
            for p in participants.iter().filter(|p| p.is_moving()) {
                self.halt(p.unit);
            }
            return;
        }

        let attackers: Vec<&Participant> = participants
            .iter()
            .filter(|p| p.decision == Decision::Attack)
            .collect();
        let mut duels = Vec::new();
        for (i, a) in attackers.iter().enumerate() {
            for b in &attackers[i + 1..] {
                if a.owner == b.owner {
                    continue;
                }
                // The ship already on the tile defends; otherwise the lower id attacks
                let pair = if !a.is_moving() && b.is_moving() {
                    (b.unit, a.unit)
                } else {
                    (a.unit, b.unit)
                };
                duels.push(pair);
            }
        }
        for a in attackers.iter().filter(|p| p.is_moving()) {
            for s in participants.iter().filter(|s| {
                !s.is_moving() && s.decision != Decision::Attack && s.owner != a.owner
            }) {
                duels.push((a.unit, s.unit));
            }
        }

        for (attacker, defender) in &duels {
            self.fight(*attacker, *defender, 1);
        }
        for (a, b) in duels {
            self.start_combat(a, b);
        }

        for mover in participants.iter().filter(|p| p.is_moving()) {
            let free = self
                .state
                .living_unit(mover.unit)
                .is_some_and(|u| !u.is_in_combat());
            let contested = participants.iter().any(|p| {
                p.unit != mover.unit
                    && p.owner != mover.owner
                    && (!p.is_moving() || p.decision == Decision::Attack)
                    && self.state.living_unit(p.unit).is_some()
            });
            if mover.decision != Decision::Attack || !free || contested {
                self.halt(mover.unit);
            }
        }
    }

    fn resolve_passing(&mut self, encounter: &Encounter) {
        let participants = &encounter.participants;
        if participants.iter().all(|p| p.decision == Decision::Proceed) {
            return;
        }

        let mut duels = Vec::new();
        for (i, a) in participants.iter().enumerate() {
            for b in &participants[i + 1..] {
                let opposed = a.owner != b.owner && a.to == b.from;
                let engaged = a.decision == Decision::Attack || b.decision == Decision::Attack;
                if !opposed || !engaged {
                    continue;
                }
                if a.decision == Decision::Attack {
                    duels.push((a.unit, b.unit));
                } else {
                    duels.push((b.unit, a.unit));
                }
            }
        }

        for (attacker, defender) in &duels {
            self.fight(*attacker, *defender, 1);
        }
        for p in participants {
            self.halt(p.unit);
        }
        for (a, b) in duels {
            self.start_combat(a, b);
        }
    }

    fn report_moves(&mut self) {
        let tracks = std::mem::take(&mut self.progress.tracks);
        for (unit, path) in tracks {
            let (Some(&from), Some(&to)) = (path.first(), path.last()) else {
                continue;
            };
            let remaining = self
                .state
                .units
                .get(unit)
                .map(|u| u.queued_path.clone())
                .unwrap_or_default();
            let partial = !remaining.is_empty();
            self.emit(GameEventKind::UnitMoved {
                unit,
                from,
                to,
                path,
                remaining,
                partial,
            });
        }
    }

    // ------------------------------------------------------------------
    // Combat
    // ------------------------------------------------------------------

    /// Roll one duel round and apply its damage.
    fn fight(&mut self, attacker: UnitId, defender: UnitId, round: u32) {
        let (Some(a), Some(d)) = (
            self.state.living_unit(attacker),
            self.state.living_unit(defender),
        ) else {
            return;
        };
        let sequence = self.progress.next_sequence();
        let mut rng = combat_rng(self.state.seed, self.state.turn, sequence);
        let outcome = resolve_duel(a, d, &self.state.rules, &mut rng);

        if let Some(u) = self.state.units.get_mut(attacker) {
            u.take_damage(outcome.damage_to_attacker);
        }
        if let Some(u) = self.state.units.get_mut(defender) {
            u.take_damage(outcome.damage_to_defender);
        }
        tracing::debug!(
            "Turn {}: {} vs {} round {}: {:?} vs {:?}, damage {}/{}",
            self.state.turn,
            attacker,
            defender,
            round,
            outcome.attacker_rolls,
            outcome.defender_rolls,
            outcome.damage_to_attacker,
            outcome.damage_to_defender
        );

        let attacker_destroyed = outcome.attacker_destroyed;
        let defender_destroyed = outcome.defender_destroyed;
        self.emit(GameEventKind::CombatOccurred {
            attacker,
            defender,
            attacker_rolls: outcome.attacker_rolls,
            defender_rolls: outcome.defender_rolls,
            damage_to_attacker: outcome.damage_to_attacker,
            damage_to_defender: outcome.damage_to_defender,
            attacker_destroyed,
            defender_destroyed,
            round,
        });

        if attacker_destroyed {
            self.record_destruction(attacker, Some(defender));
        }
        if defender_destroyed {
            self.record_destruction(defender, Some(attacker));
        }
    }

    /// Bookkeeping for a unit that just sank.
    fn record_destruction(&mut self, victim: UnitId, killer: Option<UnitId>) {
        let Some(unit) = self.state.units.get(victim) else {
            return;
        };
        let (owner, position) = (unit.owner, unit.position);
        tracing::debug!("Turn {}: {} sunk at {}", self.state.turn, victim, position);
        self.emit(GameEventKind::UnitDestroyed {
            unit: victim,
            owner,
            position,
            destroyed_by: killer,
        });

        let partners: Vec<UnitId> = self
            .state
            .ongoing_combats
            .iter()
            .filter_map(|c| c.opponent_of(victim))
            .collect();
        self.state.ongoing_combats.retain(|c| !c.involves(victim));
        for partner in partners {
            if let Some(u) = self.state.units.get_mut(partner) {
                if u.combat_opponent == Some(victim) {
                    u.combat_opponent = None;
                }
            }
        }

        if !owner.is_pirate() {
            return;
        }
        let claimant = killer
            .and_then(|k| self.state.units.get(k))
            .map(|k| k.owner)
            .filter(|o| !o.is_pirate());
        let Some(player) = claimant else {
            return;
        };
        let sequence = self.progress.next_sequence();
        let mut rng = combat_rng(self.state.seed, self.state.turn, sequence);
        let amount = roll_bounty(&mut rng, &self.state.rules);
        let paid = match self.state.players.get_mut(&player) {
            Some(p) => {
                p.earn(amount);
                true
            }
            None => false,
        };
        if paid {
            self.emit(GameEventKind::BountyAwarded {
                player,
                pirate: victim,
                amount,
            });
        }
    }

    /// Open an ongoing engagement if both ships survived side by side.
    fn start_combat(&mut self, a: UnitId, b: UnitId) {
        let (Some(ua), Some(ub)) = (self.state.living_unit(a), self.state.living_unit(b)) else {
            return;
        };
        if !ua.position.is_adjacent(ub.position) || ua.is_in_combat() || ub.is_in_combat() {
            return;
        }
        let combat = OngoingCombat::new(self.state.turn, a, ua.position, b, ub.position);
        tracing::debug!("Turn {}: {} and {} are locked in combat", self.state.turn, a, b);
        self.state.ongoing_combats.push(combat);

        for (id, opponent) in [(a, b), (b, a)] {
            if let Some(u) = self.state.units.get_mut(id) {
                u.combat_opponent = Some(opponent);
                u.queued_path.clear();
            }
            self.halt(id);
        }
    }

    fn end_combat(&mut self, index: usize) -> OngoingCombat {
        let combat = self.state.ongoing_combats.remove(index);
        for (id, opponent) in [(combat.first, combat.second), (combat.second, combat.first)] {
            if let Some(u) = self.state.units.get_mut(id) {
                if u.combat_opponent == Some(opponent) {
                    u.combat_opponent = None;
                }
            }
        }
        combat
    }

    /// Engagements from earlier turns fight another round or break off.
    fn resolve_ongoing_combats(&mut self) {
        let turn = self.state.turn;
        let pairs: Vec<(UnitId, UnitId)> = self
            .state
            .ongoing_combats
            .iter()
            .filter(|c| c.started_turn < turn)
            .map(|c| (c.first, c.second))
            .collect();

        for (first, second) in pairs {
            let Some(index) = self
                .state
                .ongoing_combats
                .iter()
                .position(|c| c.is_pair(first, second))
            else {
                continue;
            };
            let positions = (
                self.state.living_unit(first).map(|u| u.position),
                self.state.living_unit(second).map(|u| u.position),
            );
            match positions {
                (Some(a), Some(b)) if a.is_adjacent(b) => {
                    let combat = &mut self.state.ongoing_combats[index];
                    combat.continue_round();
                    let round = combat.round;
                    self.fight(first, second, round);
                }
                (Some(_), Some(_)) => {
                    self.end_combat(index);
                    tracing::debug!("Turn {}: {} and {} disengaged", turn, first, second);
                    self.emit(GameEventKind::CombatDisengaged { first, second });
                }
                _ => {
                    self.end_combat(index);
                }
            }
        }
    }

    fn resolve_assaults(&mut self) {
        let turn = self.state.turn;
        let assaults = std::mem::take(&mut self.progress.assaults);

        for (unit, structure) in assaults {
            let (Some(attacker), Some(target)) = (
                self.state.living_unit(unit),
                self.state.structures.get(structure),
            ) else {
                tracing::debug!("Turn {}: assault by {} on {} is stale", turn, unit, structure);
                continue;
            };
            let hostile = target.kind.is_shipyard_class()
                && target.owner.is_some_and(|o| o != attacker.owner);
            if !hostile || !attacker.position.is_adjacent(target.position) {
                tracing::debug!("Turn {}: {} can no longer reach {}", turn, unit, structure);
                continue;
            }

            let sequence = self.progress.next_sequence();
            let mut rng = combat_rng(self.state.seed, turn, sequence);
            let outcome = resolve_structure_assault(attacker, target, &self.state.rules, &mut rng);
            let (previous_owner, position) = (target.owner, target.position);

            if let Some(u) = self.state.units.get_mut(unit) {
                u.take_damage(outcome.damage_to_attacker);
            }
            let fell = self
                .state
                .structures
                .get_mut(structure)
                .is_some_and(|s| s.take_damage(outcome.damage_to_structure));

            let attacker_destroyed = outcome.attacker_destroyed;
            self.emit(GameEventKind::StructureAttacked {
                unit,
                structure,
                attacker_rolls: outcome.attacker_rolls,
                defender_rolls: outcome.defender_rolls,
                damage_to_attacker: outcome.damage_to_attacker,
                damage_to_structure: outcome.damage_to_structure,
                structure_destroyed: fell,
            });

            if fell {
                if let Some(s) = self.state.structures.get_mut(structure) {
                    s.revert_to_harbor();
                }
                self.state.construction.unregister(structure);
                tracing::info!("Turn {}: shipyard {} at {} destroyed", turn, structure, position);
                self.emit(GameEventKind::ShipyardDestroyed {
                    structure,
                    previous_owner,
                    position,
                });
            }
            if attacker_destroyed {
                self.record_destruction(unit, None);
            }
        }
    }

    // ------------------------------------------------------------------
    // Upkeep
    // ------------------------------------------------------------------

    fn upkeep(&mut self) {
        let turn = self.state.turn;
        let removed = self.state.units.retain(Unit::is_alive);
        if !removed.is_empty() {
            tracing::debug!("Turn {}: cleared {} wreck(s)", turn, removed.len());
        }

        let built = self.state.construction.advance(
            turn,
            &mut self.state.structures,
            &mut self.state.units,
            &self.state.grid,
            &self.state.rules,
        );
        self.progress.events.extend(built);

        self.spawn_pirates();
        self.check_eliminations();
        self.collect_income();
        self.check_game_over();
    }

    fn spawn_pirates(&mut self) {
        let turn = self.state.turn;
        let interval = self.state.rules.pirate_spawn_interval;
        if interval == 0 || turn % interval != 0 {
            return;
        }

        let coves: Vec<(StructureId, HexCoord)> = self
            .state
            .structures
            .values()
            .filter(|s| s.kind == StructureKind::PirateCove)
            .map(|s| (s.id, s.position))
            .collect();
        for (cove, position) in coves {
            if self.state.pirate_count() >= self.state.rules.max_pirates {
                break;
            }
            if self.state.units_at(position).next().is_some() {
                continue;
            }
            let stats = self.state.rules.pirate;
            let unit = self.state.units.insert_with(|id| {
                Unit::new(id, PlayerId::PIRATE, UnitKind::PirateShip, position, stats)
            });
            tracing::debug!("Turn {}: pirate {} sails from {}", turn, unit, position);
            self.emit(GameEventKind::PirateSpawned {
                unit,
                cove,
                position,
            });
        }
    }

    fn check_eliminations(&mut self) {
        for player in self.state.active_players() {
            if self.state.unit_count(player) > 0 || self.state.shipyard_count(player) > 0 {
                continue;
            }
            if let Some(p) = self.state.players.get_mut(&player) {
                p.eliminated = true;
            }
            self.state.pending_orders.remove(&player);
            tracing::info!("Turn {}: {} has been eliminated", self.state.turn, player);
            self.emit(GameEventKind::PlayerEliminated { player });
        }
    }

    fn collect_income(&mut self) {
        let rules = &self.state.rules;
        let (base, per_yard) = (rules.base_income, rules.income_per_shipyard);
        for player in self.state.active_players() {
            let amount = base + per_yard * self.state.shipyard_count(player);
            if let Some(p) = self.state.players.get_mut(&player) {
                p.earn(amount);
            }
            self.emit(GameEventKind::IncomeCollected { player, amount });
        }
    }

    fn check_game_over(&mut self) {
        let started = self.state.players.len();
        let active = self.state.active_players();
        let over = active.is_empty() || (started > 1 && active.len() <= 1);
        if !over {
            return;
        }

        let winner = match active.as_slice() {
            [only] => Some(*only),
            _ => None,
        };
        self.state.phase = GamePhase::GameOver;
        self.state.winner = winner;
        tracing::info!("Game over on turn {}: winner {:?}", self.state.turn, winner);
        self.emit(GameEventKind::GameOver { winner });
    }

    fn finish(&mut self) -> TurnResult {
        let progress = std::mem::take(&mut self.progress);
        let turn = self.state.turn;
        let game_over = self.state.phase == GamePhase::GameOver;

        self.state.history.extend(progress.events.iter().cloned());
        if !game_over {
            self.state.turn += 1;
            self.state.phase = GamePhase::Orders;
            for unit in self.state.units.values_mut() {
                unit.reset_movement();
            }
            for player in self.state.players.values_mut() {
                player.ready = false;
            }
        }
        self.state.pending_encounters.clear();
        self.state.decided_encounters.clear();
        self.state.resolution = None;

        #[cfg(debug_assertions)]
        {
            if let Ok(hash) = self.state.state_hash() {
                tracing::debug!(turn, state_hash = hash, "Turn state hash");
            }
        }

        TurnResult {
            turn,
            events: progress.events,
            collisions: progress.collisions,
            winner: self.state.winner,
            rejections: progress.rejections,
            game_over,
        }
    }
}
