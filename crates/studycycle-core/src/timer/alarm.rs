//! Randomized alarm scheduler.
//!
//! Every `start` draws a fresh interval from `[min, max)` and counts it down
//! at the tick cadence. Nothing about a previous draw survives a restart.

use rand::prelude::*;
use rand_pcg::Mcg128Xsl64;

use super::countdown::{Countdown, CountdownStep};

/// Where alarm intervals come from. The engine only ever sees this trait,
/// which is what lets tests pin or disable the alarm.
pub trait IntervalSource: Send {
    fn draw(&mut self, min_ms: u64, max_ms: u64) -> u64;
}

/// Uniform draw in `[min_ms, max_ms)`; collapses to `min_ms` when the range
/// is empty.
pub fn draw_uniform<R: Rng + ?Sized>(rng: &mut R, min_ms: u64, max_ms: u64) -> u64 {
    if max_ms <= min_ms {
        return min_ms;
    }
    rng.gen_range(min_ms..max_ms)
}

/// PCG-backed source. Seeded for reproducible runs, entropy otherwise.
#[derive(Debug, Clone)]
pub struct SeededIntervals {
    rng: Mcg128Xsl64,
}

impl SeededIntervals {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
            None => Mcg128Xsl64::from_entropy(),
        };
        Self { rng }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(Some(seed))
    }
}

impl Default for SeededIntervals {
    fn default() -> Self {
        Self::new(None)
    }
}

impl IntervalSource for SeededIntervals {
    fn draw(&mut self, min_ms: u64, max_ms: u64) -> u64 {
        draw_uniform(&mut self.rng, min_ms, max_ms)
    }
}

/// Always returns the same interval, ignoring the bounds.
/// `FixedInterval(u64::MAX)` is an alarm that never fires.
#[derive(Debug, Clone, Copy)]
pub struct FixedInterval(pub u64);

impl IntervalSource for FixedInterval {
    fn draw(&mut self, _min_ms: u64, _max_ms: u64) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmStep {
    Tick(u64),
    Fired,
}

pub struct AlarmScheduler {
    countdown: Countdown,
    source: Box<dyn IntervalSource>,
}

impl AlarmScheduler {
    pub fn new(source: Box<dyn IntervalSource>, tick_ms: u64) -> Self {
        Self {
            countdown: Countdown::new(tick_ms),
            source,
        }
    }

    /// Draw a new interval and start counting it down. Any running alarm is
    /// replaced. Returns the drawn interval.
    pub fn start(&mut self, min_ms: u64, max_ms: u64) -> u64 {
        let interval = self.source.draw(min_ms, max_ms);
        tracing::debug!(min_ms, max_ms, interval, "alarm armed");
        self.countdown.start(interval);
        interval
    }

    /// Continue a paused alarm with `remaining_ms` left, without drawing.
    pub fn resume(&mut self, remaining_ms: u64) {
        tracing::debug!(remaining_ms, "alarm resumed");
        self.countdown.start(remaining_ms);
    }

    pub fn cancel(&mut self) {
        self.countdown.cancel();
    }

    pub fn tick(&mut self) -> Option<AlarmStep> {
        self.countdown.tick().map(|step| match step {
            CountdownStep::Tick(remaining) => AlarmStep::Tick(remaining),
            CountdownStep::Finished => AlarmStep::Fired,
        })
    }

    pub fn is_running(&self) -> bool {
        self.countdown.is_running()
    }

    pub fn remaining_ms(&self) -> u64 {
        self.countdown.remaining_ms()
    }
}

impl std::fmt::Debug for AlarmScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlarmScheduler")
            .field("countdown", &self.countdown)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn ten_thousand_draws_stay_in_half_open_range() {
        let mut source = SeededIntervals::seeded(7);
        for _ in 0..10_000 {
            let x = source.draw(180_000, 300_000);
            assert!((180_000..300_000).contains(&x), "draw {x} out of range");
        }
    }

    #[test]
    fn empty_range_collapses_to_min() {
        let mut source = SeededIntervals::seeded(1);
        assert_eq!(source.draw(5000, 5000), 5000);
        assert_eq!(source.draw(5000, 1000), 5000);
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = SeededIntervals::seeded(42);
        let mut b = SeededIntervals::seeded(42);
        for _ in 0..100 {
            assert_eq!(a.draw(0, 1_000_000), b.draw(0, 1_000_000));
        }
    }

    #[test]
    fn fires_after_drawn_interval() {
        let mut alarm = AlarmScheduler::new(Box::new(FixedInterval(3000)), 1000);
        assert_eq!(alarm.start(0, 10), 3000);
        assert_eq!(alarm.tick(), Some(AlarmStep::Tick(2000)));
        assert_eq!(alarm.tick(), Some(AlarmStep::Tick(1000)));
        assert_eq!(alarm.tick(), Some(AlarmStep::Fired));
        assert_eq!(alarm.tick(), None);
    }

    #[test]
    fn restart_discards_previous_countdown() {
        let mut alarm = AlarmScheduler::new(Box::new(SeededIntervals::seeded(3)), 1000);
        alarm.start(60_000, 120_000);
        alarm.tick();
        let second = alarm.start(2000, 2000);
        assert_eq!(second, 2000);
        assert_eq!(alarm.remaining_ms(), 2000);
    }

    #[test]
    fn resume_counts_down_from_given_time_without_drawing() {
        let mut alarm = AlarmScheduler::new(Box::new(FixedInterval(60_000)), 1000);
        alarm.start(0, 0);
        alarm.cancel();
        alarm.resume(2000);
        assert!(alarm.is_running());
        assert_eq!(alarm.tick(), Some(AlarmStep::Tick(1000)));
        assert_eq!(alarm.tick(), Some(AlarmStep::Fired));
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut alarm = AlarmScheduler::new(Box::new(FixedInterval(5000)), 1000);
        alarm.start(0, 0);
        alarm.cancel();
        alarm.cancel();
        assert!(!alarm.is_running());
        assert_eq!(alarm.tick(), None);
    }

    proptest! {
        #[test]
        fn draw_respects_bounds(seed in any::<u64>(), min in 0u64..1_000_000, span in 0u64..1_000_000) {
            let mut source = SeededIntervals::seeded(seed);
            let max = min + span;
            let x = source.draw(min, max);
            if span == 0 {
                prop_assert_eq!(x, min);
            } else {
                prop_assert!(x >= min && x < max);
            }
        }
    }
}
