//! Eye-rest sub-scheduler and the deferred alarm re-arm.

use serde::{Deserialize, Serialize};

use super::countdown::{Countdown, CountdownStep};
use crate::phase::Phase;

/// What an eye rest interrupted. Lives exactly as long as one eye rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EyeRestSnapshot {
    pub previous_phase: Phase,
    pub time_left_before_eye_rest: u64,
    pub time_until_next_alarm_before_eye_rest: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EyeRestStep {
    Tick(u64),
    /// Countdown hit zero. The snapshot is handed back, if one was held.
    Finished(Option<EyeRestSnapshot>),
}

#[derive(Debug, Clone, Default)]
pub struct EyeRestScheduler {
    countdown: Countdown,
    snapshot: Option<EyeRestSnapshot>,
}

impl EyeRestScheduler {
    pub fn new(tick_ms: u64) -> Self {
        Self {
            countdown: Countdown::new(tick_ms),
            snapshot: None,
        }
    }

    pub fn start(&mut self, duration_ms: u64, snapshot: EyeRestSnapshot) {
        self.snapshot = Some(snapshot);
        self.countdown.start(duration_ms);
    }

    /// Stop and drop the snapshot.
    pub fn cancel(&mut self) {
        self.countdown.cancel();
        self.snapshot = None;
    }

    pub fn tick(&mut self) -> Option<EyeRestStep> {
        match self.countdown.tick()? {
            CountdownStep::Tick(remaining) => Some(EyeRestStep::Tick(remaining)),
            CountdownStep::Finished => Some(EyeRestStep::Finished(self.snapshot.take())),
        }
    }

    pub fn is_running(&self) -> bool {
        self.countdown.is_running()
    }

    pub fn snapshot(&self) -> Option<&EyeRestSnapshot> {
        self.snapshot.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn drop_snapshot(&mut self) {
        self.snapshot = None;
    }
}

/// One-shot delayed action: re-arm the alarm `delay` after an eye rest began,
/// whether or not the eye rest is still running by then.
#[derive(Debug, Clone, Default)]
pub struct DeferredRearm {
    countdown: Countdown,
}

impl DeferredRearm {
    pub fn new(tick_ms: u64) -> Self {
        Self {
            countdown: Countdown::new(tick_ms),
        }
    }

    pub fn schedule(&mut self, delay_ms: u64) {
        self.countdown.start(delay_ms);
    }

    pub fn cancel(&mut self) {
        self.countdown.cancel();
    }

    /// `true` on the tick the re-arm is due.
    pub fn tick(&mut self) -> bool {
        matches!(self.countdown.tick(), Some(CountdownStep::Finished))
    }

    pub fn pending_ms(&self) -> Option<u64> {
        self.countdown
            .is_running()
            .then(|| self.countdown.remaining_ms())
    }
}
