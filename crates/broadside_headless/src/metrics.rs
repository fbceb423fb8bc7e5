//! Game metrics collection for balance analysis.
//!
//! Metrics are gathered from the event stream of each resolved turn, so the
//! runner never has to look inside the resolver.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use broadside_core::events::{GameEvent, GameEventKind};
use broadside_core::ids::{PlayerId, StructureId, UnitId};
use broadside_core::state::GameState;

/// Complete metrics for a single game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameMetrics {
    /// Unique game identifier.
    pub game_id: String,
    /// Random seed used.
    pub seed: u64,
    /// Turns resolved.
    pub turns: u32,
    /// Winning seat (None = draw or unfinished).
    pub winner: Option<String>,
    /// How the game ended.
    pub win_condition: String,
    /// Per-seat metrics, keyed by seat label (`P0`, `P1`, ...).
    pub players: BTreeMap<String, PlayerMetrics>,
    /// Pirate ships that appeared.
    pub pirates_spawned: u32,
    /// Encounters that needed decisions.
    pub encounters: u32,
    /// Collisions recorded.
    pub collisions: u32,
    /// Final state hash (for determinism validation).
    pub final_state_hash: u64,
}

impl GameMetrics {
    /// Create a new game metrics instance.
    #[must_use]
    pub fn new(game_id: impl Into<String>, seed: u64) -> Self {
        Self {
            game_id: game_id.into(),
            seed,
            ..Default::default()
        }
    }

    /// Get or create a seat's metrics.
    pub fn player_mut(&mut self, player: PlayerId) -> &mut PlayerMetrics {
        self.players
            .entry(player.to_string())
            .or_insert_with(|| PlayerMetrics::new(player))
    }

    /// Finalize the game with outcome.
    pub fn finalize(&mut self, turns: u32, winner: Option<PlayerId>, condition: &str) {
        self.turns = turns;
        self.winner = winner.map(|w| w.to_string());
        self.win_condition = condition.to_string();
    }

    /// Copy end-of-game holdings from the final state.
    pub fn record_final_state(&mut self, state: &GameState) {
        for player in state.players.values() {
            let ships = state.unit_count(player.id);
            let shipyards = state.shipyard_count(player.id);
            let metrics = self.player_mut(player.id);
            metrics.final_gold = player.gold;
            metrics.final_ships = ships;
            metrics.final_shipyards = shipyards;
            metrics.peak_fleet = metrics.peak_fleet.max(ships);
        }
    }
}

/// Metrics for one seat in a game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerMetrics {
    /// Seat label.
    pub player: String,

    // === Fleet ===
    /// Ships launched from shipyards.
    pub ships_built: u32,
    /// Own ships sunk.
    pub ships_lost: u32,
    /// Enemy player ships sunk.
    pub ships_sunk: u32,
    /// Pirate ships sunk.
    pub pirates_sunk: u32,
    /// Largest fleet seen at a turn boundary.
    pub peak_fleet: u32,

    // === Structures ===
    /// Harbors claimed.
    pub shipyards_deployed: u32,
    /// Own shipyards that fell.
    pub shipyards_lost: u32,
    /// Fortifications completed.
    pub fortifications: u32,

    // === Economy ===
    /// Gold from turn income.
    pub income_earned: u32,
    /// Gold from pirate bounties.
    pub bounty_earned: u32,

    // === Combat ===
    /// Combat rounds fought.
    pub combat_rounds: u32,
    /// Damage dealt to ships and structures.
    pub damage_dealt: u32,
    /// Damage taken by own ships.
    pub damage_taken: u32,

    // === Outcome ===
    /// Turn of elimination.
    pub eliminated_on: Option<u32>,
    /// Gold at game end.
    pub final_gold: u32,
    /// Ships at game end.
    pub final_ships: u32,
    /// Shipyards at game end.
    pub final_shipyards: u32,
}

impl PlayerMetrics {
    /// Create empty metrics for a seat.
    #[must_use]
    pub fn new(player: PlayerId) -> Self {
        Self {
            player: player.to_string(),
            ..Default::default()
        }
    }
}

/// Folds turn events into [`GameMetrics`].
///
/// Events name units and structures, not owners, and sunk units are gone by
/// the time a turn completes, so the collector remembers every owner it has
/// seen.
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    metrics: GameMetrics,
    owners: BTreeMap<UnitId, PlayerId>,
    structure_owners: BTreeMap<StructureId, PlayerId>,
}

impl MetricsCollector {
    /// Start collecting for a game.
    #[must_use]
    pub fn new(game_id: impl Into<String>, seed: u64) -> Self {
        Self {
            metrics: GameMetrics::new(game_id, seed),
            owners: BTreeMap::new(),
            structure_owners: BTreeMap::new(),
        }
    }

    /// Remember owners of every unit and structure before a turn resolves.
    pub fn observe(&mut self, state: &GameState) {
        for unit in state.units.values() {
            self.owners.insert(unit.id, unit.owner);
        }
        for structure in state.structures.values() {
            if let Some(owner) = structure.owner {
                self.structure_owners.insert(structure.id, owner);
            }
        }
        for player in state.players.values() {
            let fleet = state.unit_count(player.id);
            let metrics = self.metrics.player_mut(player.id);
            metrics.peak_fleet = metrics.peak_fleet.max(fleet);
        }
    }

    /// Record the events of one resolved turn.
    pub fn record_events(&mut self, events: &[GameEvent]) {
        for event in events {
            self.record(event);
        }
    }

    fn owner(&self, unit: UnitId) -> Option<PlayerId> {
        self.owners.get(&unit).copied()
    }

    /// Metrics for a seat, skipping the pirate faction.
    fn seat(&mut self, player: Option<PlayerId>) -> Option<&mut PlayerMetrics> {
        player
            .filter(|p| !p.is_pirate())
            .map(|p| self.metrics.player_mut(p))
    }

    fn record(&mut self, event: &GameEvent) {
        match &event.kind {
            GameEventKind::ShipBuilt { unit, owner, .. } => {
                self.owners.insert(*unit, *owner);
                if let Some(m) = self.seat(Some(*owner)) {
                    m.ships_built += 1;
                }
            }
            GameEventKind::PirateSpawned { unit, .. } => {
                self.owners.insert(*unit, PlayerId::PIRATE);
                self.metrics.pirates_spawned += 1;
            }
            GameEventKind::UnitDestroyed {
                owner, destroyed_by, ..
            } => {
                if let Some(m) = self.seat(Some(*owner)) {
                    m.ships_lost += 1;
                }
                let killer = destroyed_by.and_then(|u| self.owner(u));
                let victim_is_pirate = owner.is_pirate();
                if let Some(m) = self.seat(killer) {
                    if victim_is_pirate {
                        m.pirates_sunk += 1;
                    } else {
                        m.ships_sunk += 1;
                    }
                }
            }
            GameEventKind::CombatOccurred {
                attacker,
                defender,
                damage_to_attacker,
                damage_to_defender,
                ..
            } => {
                let (a, d) = (self.owner(*attacker), self.owner(*defender));
                if let Some(m) = self.seat(a) {
                    m.combat_rounds += 1;
                    m.damage_dealt += damage_to_defender;
                    m.damage_taken += damage_to_attacker;
                }
                if let Some(m) = self.seat(d) {
                    m.combat_rounds += 1;
                    m.damage_dealt += damage_to_attacker;
                    m.damage_taken += damage_to_defender;
                }
            }
            GameEventKind::StructureAttacked {
                unit,
                damage_to_attacker,
                damage_to_structure,
                ..
            } => {
                let owner = self.owner(*unit);
                if let Some(m) = self.seat(owner) {
                    m.combat_rounds += 1;
                    m.damage_dealt += damage_to_structure;
                    m.damage_taken += damage_to_attacker;
                }
            }
            GameEventKind::ShipyardDeployed {
                player, structure, ..
            } => {
                self.structure_owners.insert(*structure, *player);
                if let Some(m) = self.seat(Some(*player)) {
                    m.shipyards_deployed += 1;
                }
            }
            GameEventKind::ShipyardDestroyed { previous_owner, .. } => {
                if let Some(m) = self.seat(*previous_owner) {
                    m.shipyards_lost += 1;
                }
            }
            GameEventKind::StructureUpgraded { structure, .. } => {
                let owner = self.structure_owners.get(structure).copied();
                if let Some(m) = self.seat(owner) {
                    m.fortifications += 1;
                }
            }
            GameEventKind::IncomeCollected { player, amount } => {
                if let Some(m) = self.seat(Some(*player)) {
                    m.income_earned += amount;
                }
            }
            GameEventKind::BountyAwarded { player, amount, .. } => {
                if let Some(m) = self.seat(Some(*player)) {
                    m.bounty_earned += amount;
                }
            }
            GameEventKind::PlayerEliminated { player } => {
                let turn = event.turn;
                if let Some(m) = self.seat(Some(*player)) {
                    m.eliminated_on = Some(turn);
                }
            }
            GameEventKind::ConflictDetected { .. } => self.metrics.encounters += 1,
            GameEventKind::UnitsCollided { .. } => self.metrics.collisions += 1,
            _ => {}
        }
    }

    /// Finish collection after `turns` resolved turns.
    #[must_use]
    pub fn finish(
        mut self,
        state: &GameState,
        turns: u32,
        condition: &str,
        final_state_hash: u64,
    ) -> GameMetrics {
        self.metrics.record_final_state(state);
        self.metrics.finalize(turns, state.winner, condition);
        self.metrics.final_state_hash = final_state_hash;
        self.metrics
    }
}

/// Aggregated summary across a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Total games played.
    pub total_games: u32,
    /// Games won by each seat.
    pub wins_by_player: BTreeMap<String, u32>,
    /// Win rates by seat.
    pub win_rates: BTreeMap<String, f64>,
    /// Games ending with no survivor.
    pub draws: u32,
    /// Games stopped by the turn limit.
    pub unfinished: u32,
    /// Average game length in turns.
    pub avg_turns: f64,
    /// Shortest game.
    pub min_turns: u32,
    /// Longest game.
    pub max_turns: u32,
    /// Average ships built per game by seat.
    pub avg_ships_built: BTreeMap<String, f64>,
    /// Average pirates sunk per game by seat.
    pub avg_pirates_sunk: BTreeMap<String, f64>,
}

impl BatchSummary {
    /// Calculate summary from a list of game metrics.
    #[must_use]
    pub fn from_games(games: &[GameMetrics]) -> Self {
        if games.is_empty() {
            return Self::default();
        }

        let total = games.len() as u32;
        let mut summary = Self {
            total_games: total,
            min_turns: u32::MAX,
            ..Default::default()
        };

        let mut turn_sum = 0u64;
        let mut ships_built: BTreeMap<String, u32> = BTreeMap::new();
        let mut pirates_sunk: BTreeMap<String, u32> = BTreeMap::new();

        for game in games {
            turn_sum += u64::from(game.turns);
            summary.min_turns = summary.min_turns.min(game.turns);
            summary.max_turns = summary.max_turns.max(game.turns);

            match (&game.winner, game.win_condition.as_str()) {
                (Some(winner), _) => {
                    *summary.wins_by_player.entry(winner.clone()).or_default() += 1;
                }
                (None, TURN_LIMIT) => summary.unfinished += 1,
                (None, _) => summary.draws += 1,
            }

            for (seat, m) in &game.players {
                *ships_built.entry(seat.clone()).or_default() += m.ships_built;
                *pirates_sunk.entry(seat.clone()).or_default() += m.pirates_sunk;
            }
        }

        let n = f64::from(total);
        summary.avg_turns = turn_sum as f64 / n;
        summary.win_rates = summary
            .wins_by_player
            .iter()
            .map(|(seat, wins)| (seat.clone(), f64::from(*wins) / n))
            .collect();
        summary.avg_ships_built = ships_built
            .into_iter()
            .map(|(seat, sum)| (seat, f64::from(sum) / n))
            .collect();
        summary.avg_pirates_sunk = pirates_sunk
            .into_iter()
            .map(|(seat, sum)| (seat, f64::from(sum) / n))
            .collect();
        summary
    }
}

/// Win condition label for a sole survivor.
pub const LAST_STANDING: &str = "last_standing";
/// Win condition label when every seat fell together.
pub const MUTUAL_DESTRUCTION: &str = "mutual_destruction";
/// Win condition label for a game cut off by the turn limit.
pub const TURN_LIMIT: &str = "turn_limit";

#[cfg(test)]
mod tests {
    use super::*;
    use broadside_core::hex::HexCoord;
    use broadside_core::ids::StructureId;

    fn event(turn: u32, kind: GameEventKind) -> GameEvent {
        GameEvent::new(turn, kind)
    }

    fn game(winner: Option<&str>, condition: &str, turns: u32) -> GameMetrics {
        GameMetrics {
            winner: winner.map(str::to_string),
            win_condition: condition.to_string(),
            turns,
            ..Default::default()
        }
    }

    #[test]
    fn test_kills_are_credited_to_the_killer() {
        let mut collector = MetricsCollector::new("g", 1);
        collector.owners.insert(UnitId(1), PlayerId(0));
        collector.owners.insert(UnitId(2), PlayerId::PIRATE);
        collector.owners.insert(UnitId(3), PlayerId(1));

        collector.record_events(&[
            event(
                2,
                GameEventKind::UnitDestroyed {
                    unit: UnitId(2),
                    owner: PlayerId::PIRATE,
                    position: HexCoord::new(0, 0),
                    destroyed_by: Some(UnitId(1)),
                },
            ),
            event(
                2,
                GameEventKind::UnitDestroyed {
                    unit: UnitId(3),
                    owner: PlayerId(1),
                    position: HexCoord::new(1, 0),
                    destroyed_by: Some(UnitId(1)),
                },
            ),
        ]);

        let p0 = &collector.metrics.players["P0"];
        assert_eq!(p0.pirates_sunk, 1);
        assert_eq!(p0.ships_sunk, 1);
        assert_eq!(collector.metrics.players["P1"].ships_lost, 1);
        assert!(!collector.metrics.players.contains_key("pirates"));
    }

    #[test]
    fn test_economy_and_structures_are_tallied() {
        let mut collector = MetricsCollector::new("g", 1);
        collector.record_events(&[
            event(
                1,
                GameEventKind::IncomeCollected {
                    player: PlayerId(0),
                    amount: 25,
                },
            ),
            event(
                1,
                GameEventKind::BountyAwarded {
                    player: PlayerId(0),
                    pirate: UnitId(9),
                    amount: 40,
                },
            ),
            event(
                3,
                GameEventKind::ShipyardDestroyed {
                    structure: StructureId(4),
                    previous_owner: Some(PlayerId(0)),
                    position: HexCoord::new(2, 2),
                },
            ),
            event(
                5,
                GameEventKind::PlayerEliminated {
                    player: PlayerId(0),
                },
            ),
        ]);

        let p0 = &collector.metrics.players["P0"];
        assert_eq!(p0.income_earned, 25);
        assert_eq!(p0.bounty_earned, 40);
        assert_eq!(p0.shipyards_lost, 1);
        assert_eq!(p0.eliminated_on, Some(5));
    }

    #[test]
    fn test_summary_rates() {
        let games = vec![
            game(Some("P0"), LAST_STANDING, 10),
            game(Some("P0"), LAST_STANDING, 20),
            game(Some("P1"), LAST_STANDING, 30),
            game(None, MUTUAL_DESTRUCTION, 12),
            game(None, TURN_LIMIT, 200),
        ];
        let summary = BatchSummary::from_games(&games);

        assert_eq!(summary.total_games, 5);
        assert_eq!(summary.wins_by_player["P0"], 2);
        assert!((summary.win_rates["P0"] - 0.4).abs() < 1e-9);
        assert_eq!(summary.draws, 1);
        assert_eq!(summary.unfinished, 1);
        assert_eq!(summary.min_turns, 10);
        assert_eq!(summary.max_turns, 200);
        assert!((summary.avg_turns - 54.4).abs() < 1e-9);
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(BatchSummary::from_games(&[]), BatchSummary::default());
    }
}
