//! Published runtime state and the read-only view derived from it.

use serde::{Deserialize, Serialize};

use crate::phase::Phase;
use crate::settings::Durations;

/// The single mutable record owned by the engine. Observers only ever get
/// copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuntimeState {
    pub phase: Phase,
    pub time_left_in_session_ms: u64,
    /// Only meaningful while studying.
    pub time_until_next_alarm_ms: u64,
    /// Frozen during eye rests; reset only when a new study session starts.
    pub elapsed_time_in_full_cycle_ms: u64,
    /// Set once per completed break, cleared only by an explicit reset.
    pub cycle_completed: bool,
}

/// `elapsed / (study + break)`, clamped to `[0, 1]`.
pub fn cycle_progress(state: &RuntimeState, durations: &Durations) -> f64 {
    let total = durations.cycle_ms();
    if total == 0 {
        return 0.0;
    }
    (state.elapsed_time_in_full_cycle_ms as f64 / total as f64).clamp(0.0, 1.0)
}

/// Progress through the current phase's countdown, clamped to `[0, 1]`.
/// Idle is always 0.
pub fn phase_progress(state: &RuntimeState, durations: &Durations) -> f64 {
    let total = durations.phase_ms(state.phase);
    if total == 0 {
        return 0.0;
    }
    let done = total.saturating_sub(state.time_left_in_session_ms);
    (done as f64 / total as f64).clamp(0.0, 1.0)
}

/// Ring fill for a display: same as [`phase_progress`] except that idle
/// shows a full ring. Presentation only; the scheduler's idle progress is 0.
pub fn ring_fill(state: &RuntimeState, durations: &Durations) -> f64 {
    match state.phase {
        Phase::Idle => 1.0,
        _ => phase_progress(state, durations),
    }
}

/// Read-only projection of the runtime state plus the lengths it is measured
/// against. This is what display layers consume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleView {
    pub state: RuntimeState,
    pub durations: Durations,
    /// An alarm countdown is running. `time_until_next_alarm_ms` is stale
    /// while this is false.
    #[serde(default)]
    pub alarm_armed: bool,
}

impl CycleView {
    pub fn new(state: RuntimeState, durations: Durations) -> Self {
        Self {
            state,
            durations,
            alarm_armed: false,
        }
    }

    pub fn with_alarm_armed(mut self, armed: bool) -> Self {
        self.alarm_armed = armed;
        self
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn is_idle(&self) -> bool {
        self.state.phase == Phase::Idle
    }

    pub fn is_studying(&self) -> bool {
        self.state.phase == Phase::Studying
    }

    pub fn is_break(&self) -> bool {
        self.state.phase == Phase::Break
    }

    pub fn is_eye_rest(&self) -> bool {
        self.state.phase == Phase::EyeRest
    }

    pub fn cycle_progress(&self) -> f64 {
        cycle_progress(&self.state, &self.durations)
    }

    pub fn phase_progress(&self) -> f64 {
        phase_progress(&self.state, &self.durations)
    }

    pub fn ring_fill(&self) -> f64 {
        ring_fill(&self.state, &self.durations)
    }
}

/// `mm:ss`, or `h:mm:ss` past the hour.
pub fn format_clock(ms: u64) -> String {
    let secs = ms.div_ceil(1000);
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}
