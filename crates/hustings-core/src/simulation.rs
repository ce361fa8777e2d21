//! The simulation: time engine, campaigns, polling, and resolution wired
//! together behind one tick entry point.
//!
//! [`Simulation`] owns every piece of mutable game state and dispatches the
//! events each tick drains. It performs no I/O: the engine binary persists
//! and broadcasts the [`TickReport`] it returns. The process wraps the
//! whole structure in a single `Arc<RwLock<_>>`, so ticks and control
//! operations serialize in one critical section.
//!
//! # Failure isolation
//!
//! One event handler failing must not starve the rest of the tick.
//! Handler errors are logged, recorded in the report, and the remaining
//! due events still fire. Only clock-level errors (overflow, invalid
//! fast-forward) abort a tick, and those leave the queue untouched.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{info, warn};

use hustings_types::{
    CampaignCycle, CampaignPhase, CandidateId, ElectionResult, EventId, EventPayload,
    PlayerId, PollingAggregate, PollingSnapshot, ScheduledEvent, StateCode,
};

use crate::baseline::BaselineTable;
use crate::campaign::{CampaignError, CampaignRegistry, PhaseAdvanceOutcome};
use crate::clock::GameClock;
use crate::config::HustingsConfig;
use crate::election;
use crate::engine::{EngineError, TimeEngine};
use crate::polling::{self, PollingError};

/// Errors that can occur at the simulation surface.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// A time engine operation failed.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A campaign lifecycle operation failed.
    #[error(transparent)]
    Campaign(#[from] CampaignError),

    /// The configured clock start time is not valid RFC 3339.
    #[error("invalid start time {value:?}: {source}")]
    InvalidStartTime {
        /// The rejected configuration value.
        value: String,
        /// The underlying parse error.
        source: chrono::ParseError,
    },

    /// The configuration would break the tick dispatcher.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Which constraint the value violates.
        reason: String,
    },
}

/// One phase transition observed during a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseChange {
    /// The player whose cycle moved.
    pub player_id: PlayerId,
    /// Phase before the firing.
    pub from: CampaignPhase,
    /// Phase after the firing.
    pub to: CampaignPhase,
}

/// One event handler failure observed during a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickFailure {
    /// The event whose handler failed.
    pub event_id: EventId,
    /// Human-readable failure description.
    pub message: String,
}

/// Everything that happened in one tick.
///
/// The core hands this to the engine binary, which persists and
/// broadcasts it; nothing in the report is load-bearing for the next tick.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    /// Game time after the tick.
    pub game_time: DateTime<Utc>,
    /// Whether the clock was paused when the tick ran.
    pub paused: bool,
    /// Every event drained this tick, in firing order.
    pub fired_events: Vec<ScheduledEvent>,
    /// Polling snapshots generated this tick.
    pub snapshots: Vec<PollingSnapshot>,
    /// Phase transitions applied this tick.
    pub phase_changes: Vec<PhaseChange>,
    /// Election results produced this tick.
    pub resolutions: Vec<ElectionResult>,
    /// System broadcast notices fired this tick.
    pub notices: Vec<String>,
    /// Handler failures; the tick itself still completed.
    pub failures: Vec<TickFailure>,
}

impl TickReport {
    fn new(game_time: DateTime<Utc>, paused: bool) -> Self {
        Self {
            game_time,
            paused,
            fired_events: Vec::new(),
            snapshots: Vec::new(),
            phase_changes: Vec::new(),
            resolutions: Vec::new(),
            notices: Vec::new(),
            failures: Vec::new(),
        }
    }
}

/// The complete simulation state.
#[derive(Debug)]
pub struct Simulation {
    /// Game clock plus due-event queue.
    engine: TimeEngine,
    /// Per-player campaign cycles.
    campaigns: CampaignRegistry,
    /// Append-only polling snapshot log per player.
    snapshots: BTreeMap<PlayerId, Vec<PollingSnapshot>>,
    /// Resolved election results per player, oldest first.
    results: BTreeMap<PlayerId, Vec<ElectionResult>>,
    /// Read-only state baseline table.
    baseline: BaselineTable,
    /// Engine configuration.
    config: HustingsConfig,
    /// Seeded RNG for polling jitter; single owner keeps runs reproducible.
    rng: SmallRng,
}

impl Simulation {
    /// Build a simulation from configuration and a baseline table.
    ///
    /// Seeds the RNG from `world.seed` and schedules a startup broadcast
    /// that fires on the first tick.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidStartTime`] if `world.start_time`
    /// is not valid RFC 3339, [`SimulationError::InvalidConfig`] if the
    /// polling interval is zero, or [`SimulationError::Engine`] if the
    /// clock configuration is invalid.
    pub fn new(config: HustingsConfig, baseline: BaselineTable) -> Result<Self, SimulationError> {
        // The loader validates this too, but programmatic configs bypass
        // the loader. A zero interval would reschedule polling at its own
        // due time and spin the dispatch loop.
        if config.campaign.polling_interval_hours == 0 {
            return Err(SimulationError::InvalidConfig {
                reason: "campaign.polling_interval_hours must be at least 1".to_owned(),
            });
        }
        let start: DateTime<Utc> = config.world.start_time.parse().map_err(|source| {
            SimulationError::InvalidStartTime {
                value: config.world.start_time.clone(),
                source,
            }
        })?;
        let clock =
            GameClock::new(start, config.world.step_hours).map_err(EngineError::from)?;
        let mut engine = TimeEngine::new(clock);
        engine.schedule_event(ScheduledEvent {
            id: EventId::new(),
            scheduled_for: start,
            payload: EventPayload::SystemBroadcast {
                message: format!("{} engine started", config.world.name),
            },
            persist: true,
        })?;

        let rng = SmallRng::seed_from_u64(config.world.seed);
        Ok(Self {
            engine,
            campaigns: CampaignRegistry::new(),
            snapshots: BTreeMap::new(),
            results: BTreeMap::new(),
            baseline,
            config,
            rng,
        })
    }

    /// Current game time.
    pub const fn game_time(&self) -> DateTime<Utc> {
        self.engine.game_time()
    }

    /// Whether time advancement is frozen.
    pub const fn is_paused(&self) -> bool {
        self.engine.is_paused()
    }

    /// Hours added per unpaused tick.
    pub const fn step_hours(&self) -> u32 {
        self.config.world.step_hours
    }

    /// Number of events waiting in the queue.
    pub fn pending_events(&self) -> usize {
        self.engine.pending_events()
    }

    /// Freeze time advancement. Idempotent.
    pub const fn pause(&mut self) {
        self.engine.pause();
    }

    /// Unfreeze time advancement. Idempotent.
    pub const fn resume(&mut self) {
        self.engine.resume();
    }

    /// Administrative absolute clock set. Queues a broadcast so the
    /// action surfaces in the next tick report.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Engine`] if the engine rejects the time.
    pub fn set_game_time(&mut self, time: DateTime<Utc>) -> Result<(), SimulationError> {
        self.engine.set_game_time(time)?;
        self.engine.schedule_event(ScheduledEvent {
            id: EventId::new(),
            scheduled_for: time,
            payload: EventPayload::SystemBroadcast {
                message: format!("game clock set to {time}"),
            },
            persist: true,
        })?;
        Ok(())
    }

    /// The player's active cycle, if any.
    pub fn active_cycle(&self, player_id: PlayerId) -> Option<&CampaignCycle> {
        self.campaigns.active(player_id)
    }

    /// The player's complete cycle history, oldest first.
    pub fn cycle_history(&self, player_id: PlayerId) -> &[CampaignCycle] {
        self.campaigns.history(player_id)
    }

    /// The player's most recent election result, if any cycle resolved.
    pub fn latest_result(&self, player_id: PlayerId) -> Option<&ElectionResult> {
        self.results.get(&player_id).and_then(|r| r.last())
    }

    /// The most recent cycle of every player, for the persistence layer.
    pub fn latest_cycles(&self) -> impl Iterator<Item = &CampaignCycle> {
        self.campaigns.latest_cycles()
    }

    /// Start a new campaign cycle and schedule its phase-advance and
    /// polling chains.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Campaign`] if the player already has an
    /// active cycle, or [`SimulationError::Engine`] if scheduling fails.
    pub fn initialize_campaign(
        &mut self,
        player_id: PlayerId,
        candidate: CandidateId,
        opponent: CandidateId,
    ) -> Result<CampaignCycle, SimulationError> {
        let now = self.engine.game_time();
        let cycle = self
            .campaigns
            .initialize_campaign(player_id, candidate, opponent, now)?;

        if let Some(hours) = self.config.campaign.phase_hours(CampaignPhase::Announcement) {
            self.schedule_in(now, hours, EventPayload::PhaseAdvance { player_id }, true)?;
        }
        self.schedule_in(
            now,
            self.config.campaign.polling_interval_hours,
            EventPayload::PollingGeneration { player_id },
            false,
        )?;
        Ok(cycle)
    }

    /// Record a signed state modifier on the player's active cycle.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Campaign`] if the player has no active
    /// cycle.
    pub fn record_modifier(
        &mut self,
        player_id: PlayerId,
        state: StateCode,
        delta: f64,
    ) -> Result<f64, SimulationError> {
        Ok(self.campaigns.record_modifier(player_id, state, delta)?)
    }

    /// Polling trend over the trailing window, computed on demand.
    ///
    /// # Errors
    ///
    /// Returns [`PollingError::InsufficientData`] if fewer than two
    /// snapshots fall inside the window.
    pub fn polling_trend(
        &self,
        player_id: PlayerId,
        window_hours: u32,
    ) -> Result<PollingAggregate, PollingError> {
        let snapshots = self
            .snapshots
            .get(&player_id)
            .map_or(&[] as &[PollingSnapshot], |s| s.as_slice());
        polling::aggregate_trend(
            snapshots,
            window_hours,
            self.engine.game_time(),
            self.config.polling.trend_epsilon_pct,
        )
    }

    /// Run one tick: drain due events, advance the clock if unpaused, and
    /// dispatch everything that fired.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Engine`] only for clock-level failures;
    /// individual handler failures land in the report instead.
    pub fn run_tick(&mut self) -> Result<TickReport, SimulationError> {
        let fired = self.engine.tick_once()?;
        Ok(self.dispatch(fired))
    }

    /// Fast-forward the clock and dispatch every event the jump made due.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Engine`] if `hours` is out of range or
    /// the jump overflows; a rejected call changes nothing.
    pub fn fast_forward(&mut self, hours: u32) -> Result<TickReport, SimulationError> {
        let fired = self.engine.fast_forward(hours)?;
        Ok(self.dispatch(fired))
    }

    /// Handle a drained batch, then keep draining: handlers schedule
    /// follow-up events anchored at the triggering event's due time, and
    /// any follow-up that lands inside the already-elapsed window belongs
    /// to this same tick. Every chain either ends or advances its due time
    /// by at least one hour (the polling interval is rejected at zero in
    /// [`Simulation::new`]), so the loop terminates.
    fn dispatch(&mut self, fired: Vec<ScheduledEvent>) -> TickReport {
        let mut report = TickReport::new(self.engine.game_time(), self.engine.is_paused());
        let mut batch = fired;
        loop {
            for event in batch {
                if let Err(message) = self.handle_event(&event, &mut report) {
                    warn!(event_id = %event.id, %message, "event handler failed");
                    report.failures.push(TickFailure {
                        event_id: event.id,
                        message,
                    });
                }
                report.fired_events.push(event);
            }
            batch = self.engine.drain_overdue();
            if batch.is_empty() {
                break;
            }
        }
        report
    }

    fn handle_event(
        &mut self,
        event: &ScheduledEvent,
        report: &mut TickReport,
    ) -> Result<(), String> {
        // Anchoring on the event's own due time keeps chains drift-free
        // across fast-forwards and uneven tick cadences.
        let due = event.scheduled_for;
        match &event.payload {
            EventPayload::PollingGeneration { player_id } => {
                self.handle_polling(*player_id, due, report)
            }
            EventPayload::PhaseAdvance { player_id } => {
                self.handle_phase_advance(*player_id, due, report)
            }
            EventPayload::ElectionResolution { player_id } => {
                self.handle_resolution(*player_id, due, report)
            }
            EventPayload::SystemBroadcast { message } => {
                info!(%message, "system broadcast");
                report.notices.push(message.clone());
                Ok(())
            }
        }
    }

    fn handle_polling(
        &mut self,
        player_id: PlayerId,
        due: DateTime<Utc>,
        report: &mut TickReport,
    ) -> Result<(), String> {
        // A resolved (or missing) cycle ends the polling chain quietly.
        let Some(cycle) = self.campaigns.active(player_id) else {
            return Ok(());
        };
        let snapshot =
            polling::generate_snapshot(cycle, &self.config.polling, &mut self.rng, due);
        self.snapshots
            .entry(player_id)
            .or_default()
            .push(snapshot.clone());
        report.snapshots.push(snapshot);

        self.schedule_in(
            due,
            self.config.campaign.polling_interval_hours,
            EventPayload::PollingGeneration { player_id },
            false,
        )
        .map_err(|e| e.to_string())
    }

    fn handle_phase_advance(
        &mut self,
        player_id: PlayerId,
        due: DateTime<Utc>,
        report: &mut TickReport,
    ) -> Result<(), String> {
        match self.campaigns.advance_phase(player_id) {
            PhaseAdvanceOutcome::Advanced { from, to } => {
                report.phase_changes.push(PhaseChange {
                    player_id,
                    from,
                    to,
                });
                if to == CampaignPhase::ElectionDay {
                    // Resolution is only ever scheduled from this
                    // transition.
                    self.schedule_in(
                        due,
                        0,
                        EventPayload::ElectionResolution { player_id },
                        true,
                    )
                    .map_err(|e| e.to_string())
                } else if let Some(hours) = self.config.campaign.phase_hours(to) {
                    self.schedule_in(
                        due,
                        hours,
                        EventPayload::PhaseAdvance { player_id },
                        true,
                    )
                    .map_err(|e| e.to_string())
                } else {
                    Ok(())
                }
            }
            // Stale events against finished or missing cycles are no-ops.
            PhaseAdvanceOutcome::AwaitingResolution
            | PhaseAdvanceOutcome::AlreadyResolved
            | PhaseAdvanceOutcome::NoCycle => Ok(()),
        }
    }

    fn handle_resolution(
        &mut self,
        player_id: PlayerId,
        due: DateTime<Utc>,
        report: &mut TickReport,
    ) -> Result<(), String> {
        let Some(cycle) = self.campaigns.active(player_id) else {
            return Ok(());
        };

        let cycle_snapshots: Vec<PollingSnapshot> = self
            .snapshots
            .get(&player_id)
            .map(|all| {
                all.iter()
                    .filter(|s| s.cycle_sequence == cycle.cycle_sequence)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        let volatility = polling::cycle_volatility(&cycle_snapshots)
            .unwrap_or(self.config.election.default_volatility);

        match election::resolve(cycle, volatility, &self.baseline, &self.config.election, due)
        {
            Ok(result) => {
                self.campaigns
                    .mark_resolved(player_id)
                    .map_err(|e| e.to_string())?;
                self.results
                    .entry(player_id)
                    .or_default()
                    .push(result.clone());
                info!(
                    %player_id,
                    cycle = result.cycle_sequence,
                    winner = %result.summary.ev_lead.candidate,
                    "election resolved"
                );
                report.resolutions.push(result);
                Ok(())
            }
            Err(error) => {
                // The cycle stays on ElectionDay; retry one step later.
                self.schedule_in(
                    due,
                    self.config.world.step_hours,
                    EventPayload::ElectionResolution { player_id },
                    true,
                )
                .map_err(|e| e.to_string())?;
                Err(error.to_string())
            }
        }
    }

    fn schedule_in(
        &mut self,
        now: DateTime<Utc>,
        hours: u32,
        payload: EventPayload,
        persist: bool,
    ) -> Result<(), EngineError> {
        let scheduled_for = now
            .checked_add_signed(Duration::hours(i64::from(hours)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.engine.schedule_event(ScheduledEvent {
            id: EventId::new(),
            scheduled_for,
            payload,
            persist,
        })
    }
}
