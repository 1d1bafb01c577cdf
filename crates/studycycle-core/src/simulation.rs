//! Deterministic simulation harness for the cycle engine.
//!
//! Runs a fresh engine tick by tick, without a clock, against a seeded alarm
//! source. The same scenario always produces the same event trace, which
//! makes it usable for regression tests and for previewing a configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::{CycleEngine, EngineOptions};
use crate::error::ConfigurationError;
use crate::events::Event;
use crate::phase::Phase;
use crate::settings::Settings;
use crate::state::RuntimeState;
use crate::timer::SeededIntervals;

/// Seed for the simulated alarm draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimulationSeed(pub u64);

impl SimulationSeed {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }
}

impl Default for SimulationSeed {
    fn default() -> Self {
        Self(42)
    }
}

/// Simulation scenario definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationScenario {
    pub name: String,
    pub seed: SimulationSeed,
    pub settings: Settings,
    pub options: EngineOptions,
    /// Hard stop in case the cycle never completes.
    pub tick_limit: u64,
}

impl SimulationScenario {
    pub fn new(name: impl Into<String>, seed: SimulationSeed) -> Self {
        Self {
            name: name.into(),
            seed,
            settings: Settings::default(),
            options: EngineOptions::default(),
            tick_limit: 24 * 60 * 60,
        }
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_tick_limit(mut self, tick_limit: u64) -> Self {
        self.tick_limit = tick_limit;
        self
    }
}

/// One event and the tick it happened on (0 = the `start()` command).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedEvent {
    pub tick: u64,
    pub event: Event,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationMetrics {
    pub ticks: u64,
    pub eye_rests: u32,
    pub alarms_armed: u32,
    pub study_ms: u64,
    pub break_ms: u64,
    pub cycle_completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub scenario: SimulationScenario,
    pub events: Vec<TimedEvent>,
    pub final_state: RuntimeState,
    pub metrics: SimulationMetrics,
    pub run_at: DateTime<Utc>,
}

impl SimulationReport {
    /// Events minus the per-tick noise.
    pub fn milestones(&self) -> impl Iterator<Item = &TimedEvent> {
        self.events.iter().filter(|e| {
            !matches!(
                e.event,
                Event::TimerTick { .. } | Event::AlarmTick { .. } | Event::EyeRestTick { .. }
            )
        })
    }
}

/// Run one full cycle of `scenario`.
///
/// # Errors
///
/// Returns a [`ConfigurationError`] if the scenario's settings are invalid.
pub fn simulate(scenario: &SimulationScenario) -> Result<SimulationReport, ConfigurationError> {
    let mut engine = CycleEngine::with_source(
        &scenario.settings,
        scenario.options,
        Box::new(SeededIntervals::seeded(scenario.seed.0)),
    )?;

    let mut events: Vec<TimedEvent> = engine
        .start()
        .into_iter()
        .map(|event| TimedEvent { tick: 0, event })
        .collect();

    let mut tick = 0;
    while engine.phase() != Phase::Idle && tick < scenario.tick_limit {
        tick += 1;
        events.extend(
            engine
                .tick()
                .into_iter()
                .map(|event| TimedEvent { tick, event }),
        );
    }

    if engine.phase() != Phase::Idle {
        tracing::warn!(name = %scenario.name, tick, "simulation hit its tick limit");
    }

    let durations = engine.active_durations();
    let final_state = engine.state();
    let metrics = SimulationMetrics {
        ticks: tick,
        eye_rests: count(&events, |e| matches!(e, Event::EyeRestStarted { .. })),
        alarms_armed: count(&events, |e| matches!(e, Event::AlarmArmed { .. })),
        study_ms: durations.study_ms,
        break_ms: durations.break_ms,
        cycle_completed: final_state.cycle_completed,
    };

    Ok(SimulationReport {
        scenario: scenario.clone(),
        events,
        final_state,
        metrics,
        run_at: Utc::now(),
    })
}

fn count(events: &[TimedEvent], pred: impl Fn(&Event) -> bool) -> u32 {
    events.iter().filter(|e| pred(&e.event)).count() as u32
}
