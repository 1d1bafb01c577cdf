//! Cancellable fixed-cadence countdown.
//!
//! Does not own a clock: the caller feeds it one `tick()` per cadence
//! interval. A cancelled countdown ignores every tick that follows, so a
//! late tick can never resurrect it.

/// Default tick cadence.
pub const TICK_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStep {
    /// Still running; time left after this tick.
    Tick(u64),
    /// Reached zero on this tick. Terminal.
    Finished,
}

#[derive(Debug, Clone)]
pub struct Countdown {
    tick_ms: u64,
    remaining_ms: u64,
    running: bool,
}

impl Countdown {
    pub fn new(tick_ms: u64) -> Self {
        Self {
            tick_ms: tick_ms.max(1),
            remaining_ms: 0,
            running: false,
        }
    }

    /// (Re)start from `duration_ms`, discarding any previous run.
    pub fn start(&mut self, duration_ms: u64) {
        self.remaining_ms = duration_ms;
        self.running = true;
    }

    /// Stop immediately. Idempotent.
    pub fn cancel(&mut self) {
        self.running = false;
        self.remaining_ms = 0;
    }

    pub fn tick(&mut self) -> Option<CountdownStep> {
        if !self.running {
            return None;
        }
        self.remaining_ms = self.remaining_ms.saturating_sub(self.tick_ms);
        if self.remaining_ms == 0 {
            self.running = false;
            Some(CountdownStep::Finished)
        } else {
            Some(CountdownStep::Tick(self.remaining_ms))
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    pub fn tick_ms(&self) -> u64 {
        self.tick_ms
    }
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new(TICK_MS)
    }
}
