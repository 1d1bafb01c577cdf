//! Phase state machine.
//!
//! The engine is a tick-driven state machine. It does not use internal
//! threads or clocks - the caller feeds it one `tick()` per cadence interval
//! (see [`CycleService`](crate::service::CycleService) for the async driver).
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Studying <-> EyeRest
//!            |
//!            v
//!          Break -> Idle (cycle completed)
//! ```
//!
//! Within one tick, timer sources are drained in a fixed order: session
//! countdown, alarm, eye-rest countdown, deferred re-arm. Each source's
//! event is fully applied before the next source is looked at, so a study
//! session that ends on the same tick its alarm would fire goes to Break.
//! A timer armed during a tick counts its first tick on the next one.
//!
//! `tick()` is `tick_timers()` followed by `tick_rearm()`. Hosts that call
//! the two halves separately can observe the state an eye rest restored
//! before a re-arm falling due on the same tick replaces the alarm time.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = CycleEngine::new(&Settings::default())?;
//! engine.start();
//! // Once per second:
//! for event in engine.tick() { /* notify */ }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, CoreError};
use crate::events::Event;
use crate::phase::{transition, Effect, Phase, Trigger};
use crate::settings::{Durations, Settings, EYE_REST_MS};
use crate::state::{CycleView, RuntimeState};
use crate::timer::{
    AlarmScheduler, AlarmStep, Countdown, CountdownStep, DeferredRearm, EyeRestScheduler,
    EyeRestSnapshot, EyeRestStep, IntervalSource, SeededIntervals, TICK_MS,
};

/// When the alarm is re-armed after an eye rest begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RearmPolicy {
    /// A fixed delay after the eye rest starts, independent of how long the
    /// eye-rest countdown actually is.
    Fixed(u64),
    /// Exactly when the eye-rest countdown ends.
    EyeRestEnd,
}

impl Default for RearmPolicy {
    fn default() -> Self {
        RearmPolicy::Fixed(EYE_REST_MS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    pub tick_ms: u64,
    /// Overrides the resolved eye-rest length.
    pub eye_rest_ms: Option<u64>,
    pub rearm: RearmPolicy,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            tick_ms: TICK_MS,
            eye_rest_ms: None,
            rearm: RearmPolicy::default(),
        }
    }
}

/// Core cycle engine. Single writer of [`RuntimeState`]; not thread-safe,
/// drive it from one context.
#[derive(Debug)]
pub struct CycleEngine {
    options: EngineOptions,
    /// Takes effect on the next `start()`.
    pending: Durations,
    /// Captured at `start()`; what the running cycle is measured against.
    active: Durations,
    state: RuntimeState,
    session: Countdown,
    alarm: AlarmScheduler,
    eye_rest: EyeRestScheduler,
    rearm: DeferredRearm,
    /// Snapshot handed back by a finished eye rest, consumed by the restore.
    resuming: Option<EyeRestSnapshot>,
    /// A re-arm was pending when the current tick started.
    rearm_live: bool,
}

impl CycleEngine {
    /// Engine with default options and entropy-seeded alarm draws.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if `settings` is invalid.
    pub fn new(settings: &Settings) -> Result<Self, ConfigurationError> {
        Self::with_source(
            settings,
            EngineOptions::default(),
            Box::new(SeededIntervals::default()),
        )
    }

    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if `settings` is invalid.
    pub fn with_source(
        settings: &Settings,
        options: EngineOptions,
        source: Box<dyn IntervalSource>,
    ) -> Result<Self, ConfigurationError> {
        let durations = resolve(settings, &options)?;
        Ok(Self {
            options,
            pending: durations,
            active: durations,
            state: RuntimeState::default(),
            session: Countdown::new(options.tick_ms),
            alarm: AlarmScheduler::new(source, options.tick_ms),
            eye_rest: EyeRestScheduler::new(options.tick_ms),
            rearm: DeferredRearm::new(options.tick_ms),
            resuming: None,
            rearm_live: false,
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> RuntimeState {
        self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn view(&self) -> CycleView {
        CycleView::new(self.state, self.active).with_alarm_armed(self.alarm.is_running())
    }

    pub fn active_durations(&self) -> Durations {
        self.active
    }

    pub fn pending_durations(&self) -> Durations {
        self.pending
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    pub fn tick_ms(&self) -> u64 {
        self.options.tick_ms
    }

    pub fn eye_rest_snapshot(&self) -> Option<&EyeRestSnapshot> {
        self.eye_rest.snapshot()
    }

    /// Time until the deferred alarm re-arm runs, if one is scheduled.
    pub fn pending_rearm_ms(&self) -> Option<u64> {
        self.rearm.pending_ms()
    }

    pub fn alarm_running(&self) -> bool {
        self.alarm.is_running()
    }

    /// Delay between an eye rest starting and the alarm being re-armed.
    pub fn rearm_delay_ms(&self) -> u64 {
        match self.options.rearm {
            RearmPolicy::Fixed(ms) => ms,
            RearmPolicy::EyeRestEnd => self.active.eye_rest_ms,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Replace the settings. A running cycle keeps the lengths it started
    /// with; the new ones apply from the next `start()`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] and leaves the engine untouched if
    /// `settings` is invalid.
    pub fn configure(&mut self, settings: &Settings) -> Result<(), ConfigurationError> {
        let durations = resolve(settings, &self.options)?;
        self.pending = durations;
        if self.state.phase == Phase::Idle {
            self.active = durations;
        }
        tracing::info!(?settings, phase = ?self.state.phase, "settings configured");
        Ok(())
    }

    /// Begin a new cycle. From any active phase this cancels everything and
    /// starts over.
    pub fn start(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        self.apply(Trigger::Start, &mut events);
        events
    }

    /// Force Idle from any phase.
    pub fn stop(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        self.apply(Trigger::Stop, &mut events);
        events
    }

    pub fn reset_cycle_completed(&mut self) {
        self.state.cycle_completed = false;
    }

    /// Advance every active timer by one tick.
    pub fn tick(&mut self) -> Vec<Event> {
        let mut events = self.tick_timers();
        events.extend(self.tick_rearm());
        events
    }

    /// First half of a tick: session, alarm and eye-rest countdowns.
    pub fn tick_timers(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        let eye_rest_live = self.eye_rest.is_running();
        self.rearm_live = self.rearm.pending_ms().is_some();

        if let Some(step) = self.session.tick() {
            match step {
                CountdownStep::Tick(remaining) => {
                    self.state.time_left_in_session_ms = remaining;
                    self.state.elapsed_time_in_full_cycle_ms = match self.state.phase {
                        Phase::Studying => self.active.study_ms.saturating_sub(remaining),
                        Phase::Break => {
                            self.active.study_ms + self.active.break_ms.saturating_sub(remaining)
                        }
                        _ => self.state.elapsed_time_in_full_cycle_ms,
                    };
                    tracing::trace!(remaining, "session tick");
                    events.push(Event::TimerTick {
                        remaining_ms: remaining,
                    });
                }
                CountdownStep::Finished => {
                    self.state.time_left_in_session_ms = 0;
                    self.apply(Trigger::SessionElapsed, &mut events);
                }
            }
        }

        if let Some(step) = self.alarm.tick() {
            match step {
                AlarmStep::Tick(remaining) => {
                    self.state.time_until_next_alarm_ms = remaining;
                    tracing::trace!(remaining, "alarm tick");
                    events.push(Event::AlarmTick {
                        remaining_ms: remaining,
                    });
                }
                AlarmStep::Fired => {
                    self.state.time_until_next_alarm_ms = 0;
                    self.apply(Trigger::AlarmFired, &mut events);
                }
            }
        }

        if let Some(step) = eye_rest_live.then(|| self.eye_rest.tick()).flatten() {
            match step {
                EyeRestStep::Tick(remaining) => {
                    self.state.time_left_in_session_ms = remaining;
                    tracing::trace!(remaining, "eye rest tick");
                    events.push(Event::EyeRestTick {
                        remaining_ms: remaining,
                    });
                }
                EyeRestStep::Finished(snapshot) => {
                    let resume_to = snapshot.map(|s| s.previous_phase);
                    if resume_to != Some(Phase::Studying) {
                        let err = CoreError::InvalidTransition {
                            phase: self.state.phase,
                            action: "restore the interrupted session",
                        };
                        tracing::error!(%err, ?snapshot, "eye rest ended without a study snapshot, stopping");
                    }
                    self.resuming = snapshot;
                    self.apply(Trigger::EyeRestElapsed { resume_to }, &mut events);
                }
            }
        }

        events
    }

    /// Second half of a tick: the deferred re-arm, if one was pending when
    /// `tick_timers()` ran. A no-op when called on its own.
    pub fn tick_rearm(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        if std::mem::take(&mut self.rearm_live) && self.rearm.tick() {
            tracing::debug!(phase = ?self.state.phase, "deferred alarm re-arm");
            self.arm_alarm(&mut events);
        }
        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn apply(&mut self, trigger: Trigger, events: &mut Vec<Event>) {
        let from = self.state.phase;
        let Some((to, effect)) = transition(from, trigger) else {
            tracing::warn!(?from, ?trigger, "trigger does not apply, ignoring");
            return;
        };

        tracing::info!(?from, ?to, ?effect, "phase transition");

        match effect {
            Effect::BeginStudy => {
                self.cancel_all();
                self.active = self.pending;
                self.state = RuntimeState {
                    phase: to,
                    time_left_in_session_ms: self.active.study_ms,
                    time_until_next_alarm_ms: 0,
                    elapsed_time_in_full_cycle_ms: 0,
                    cycle_completed: false,
                };
                self.session.start(self.active.study_ms);
                push_phase_change(events, from, to);
                self.arm_alarm(events);
            }
            Effect::BeginBreak => {
                // The alarm and any pending re-arm belong to the study session.
                self.alarm.cancel();
                self.rearm.cancel();
                self.state.phase = to;
                self.state.elapsed_time_in_full_cycle_ms = self.active.study_ms;
                self.state.time_left_in_session_ms = self.active.break_ms;
                self.state.time_until_next_alarm_ms = 0;
                self.session.start(self.active.break_ms);
                events.push(Event::StudySessionFinished);
                push_phase_change(events, from, to);
            }
            Effect::BeginEyeRest => {
                let snapshot = EyeRestSnapshot {
                    previous_phase: from,
                    time_left_before_eye_rest: self.state.time_left_in_session_ms,
                    time_until_next_alarm_before_eye_rest: self.state.time_until_next_alarm_ms,
                };
                self.session.cancel();
                self.alarm.cancel();
                self.state.phase = to;
                self.state.time_left_in_session_ms = self.active.eye_rest_ms;
                self.eye_rest.start(self.active.eye_rest_ms, snapshot);
                self.rearm.schedule(self.rearm_delay_ms());
                events.push(Event::AlarmTriggered);
                push_phase_change(events, from, to);
                events.push(Event::EyeRestStarted {
                    duration_ms: self.active.eye_rest_ms,
                });
            }
            Effect::RestoreStudy => {
                let Some(snapshot) = self.resuming.take() else {
                    let err = CoreError::InvalidTransition {
                        phase: from,
                        action: "restore without a snapshot",
                    };
                    tracing::error!(%err, "forcing idle");
                    self.halt(events);
                    return;
                };
                let alarm_ms = if self.alarm.is_running() {
                    // Re-armed while a long eye rest was still running.
                    self.alarm.remaining_ms()
                } else {
                    let paused = snapshot.time_until_next_alarm_before_eye_rest;
                    if paused > 0 {
                        self.alarm.resume(paused);
                    }
                    paused
                };
                self.state.phase = to;
                self.state.time_left_in_session_ms = snapshot.time_left_before_eye_rest;
                self.state.time_until_next_alarm_ms = alarm_ms;
                self.session.start(snapshot.time_left_before_eye_rest);
                events.push(Event::EyeRestFinished {
                    time_left_in_session_ms: snapshot.time_left_before_eye_rest,
                    time_until_next_alarm_ms: alarm_ms,
                });
                push_phase_change(events, from, to);
            }
            Effect::CompleteCycle => {
                self.cancel_all();
                self.state.phase = to;
                self.state.elapsed_time_in_full_cycle_ms = self.active.cycle_ms();
                self.state.time_left_in_session_ms = 0;
                self.state.time_until_next_alarm_ms = 0;
                self.state.cycle_completed = true;
                events.push(Event::BreakFinished);
                push_phase_change(events, from, to);
                events.push(Event::CycleCompleted);
            }
            Effect::Halt => self.halt(events),
        }
    }

    fn halt(&mut self, events: &mut Vec<Event>) {
        let from = self.state.phase;
        self.cancel_all();
        self.state = RuntimeState {
            phase: Phase::Idle,
            cycle_completed: self.state.cycle_completed,
            ..RuntimeState::default()
        };
        push_phase_change(events, from, Phase::Idle);
    }

    fn arm_alarm(&mut self, events: &mut Vec<Event>) {
        let interval = self
            .alarm
            .start(self.active.alarm_min_ms, self.active.alarm_max_ms);
        self.state.time_until_next_alarm_ms = interval;
        events.push(Event::AlarmArmed {
            interval_ms: interval,
        });
    }

    fn cancel_all(&mut self) {
        self.session.cancel();
        self.alarm.cancel();
        self.eye_rest.cancel();
        self.rearm.cancel();
        self.rearm_live = false;
        self.resuming = None;
    }

    #[cfg(test)]
    pub(crate) fn fire_alarm(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        self.alarm.cancel();
        self.apply(Trigger::AlarmFired, &mut events);
        events
    }

    #[cfg(test)]
    pub(crate) fn lose_eye_rest_snapshot(&mut self) {
        self.eye_rest.drop_snapshot();
    }
}

fn resolve(settings: &Settings, options: &EngineOptions) -> Result<Durations, ConfigurationError> {
    let mut durations = Durations::resolve(settings)?;
    if let Some(ms) = options.eye_rest_ms {
        if ms == 0 {
            return Err(ConfigurationError::NonPositiveDuration {
                field: "eye_rest_ms",
            });
        }
        durations.eye_rest_ms = ms;
    }
    Ok(durations)
}

fn push_phase_change(events: &mut Vec<Event>, from: Phase, to: Phase) {
    if from != to {
        events.push(Event::PhaseChanged { from, to });
    }
}
