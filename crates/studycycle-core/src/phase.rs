//! Phases and the pure transition table.
//!
//! ```text
//! Idle --start--> Studying --session--> Break --session--> Idle
//!                    |  ^
//!               alarm|  |eye rest elapsed
//!                    v  |
//!                   EyeRest
//! ```
//!
//! `transition` only decides *where* to go and *what* has to happen; the
//! engine owns the timers and applies the returned [`Effect`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Studying,
    EyeRest,
    Break,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Studying => "studying",
            Phase::EyeRest => "eye rest",
            Phase::Break => "break",
        }
    }
}

/// Something that can move the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Start,
    Stop,
    /// The session countdown reached zero.
    SessionElapsed,
    /// The randomized alarm reached zero.
    AlarmFired,
    /// The eye-rest countdown reached zero. Carries the phase recorded in the
    /// eye-rest snapshot, or `None` if no snapshot exists.
    EyeRestElapsed { resume_to: Option<Phase> },
}

/// Work the engine must do to honor a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    BeginStudy,
    BeginBreak,
    BeginEyeRest,
    RestoreStudy,
    CompleteCycle,
    /// Cancel everything and go idle.
    Halt,
}

/// `(phase, trigger) -> (next phase, effect)`. `None` means the trigger
/// does not apply in `phase` and must be dropped.
pub fn transition(phase: Phase, trigger: Trigger) -> Option<(Phase, Effect)> {
    use Phase::*;

    match (phase, trigger) {
        (_, Trigger::Start) => Some((Studying, Effect::BeginStudy)),
        (_, Trigger::Stop) => Some((Idle, Effect::Halt)),
        (Studying, Trigger::SessionElapsed) => Some((Break, Effect::BeginBreak)),
        (Break, Trigger::SessionElapsed) => Some((Idle, Effect::CompleteCycle)),
        (Studying, Trigger::AlarmFired) => Some((EyeRest, Effect::BeginEyeRest)),
        (EyeRest, Trigger::EyeRestElapsed { resume_to: Some(Studying) }) => {
            Some((Studying, Effect::RestoreStudy))
        }
        // Anything else coming out of an eye rest is a broken snapshot.
        (EyeRest, Trigger::EyeRestElapsed { .. }) => Some((Idle, Effect::Halt)),
        _ => None,
    }
}
