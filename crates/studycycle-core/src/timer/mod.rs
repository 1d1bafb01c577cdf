mod alarm;
mod countdown;
mod eye_rest;

pub use alarm::{draw_uniform, AlarmScheduler, AlarmStep, FixedInterval, IntervalSource, SeededIntervals};
pub use countdown::{Countdown, CountdownStep, TICK_MS};
pub use eye_rest::{DeferredRearm, EyeRestScheduler, EyeRestSnapshot, EyeRestStep};
