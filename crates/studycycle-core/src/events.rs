//! Engine events and the host callback trait they are routed to.

use serde::{Deserialize, Serialize};

use crate::phase::Phase;

/// Every observable thing the engine does produces an Event.
/// Hosts route them to sound, vibration or notifications; the core never
/// knows how they are rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    PhaseChanged {
        from: Phase,
        to: Phase,
    },
    /// Session countdown tick (study or break).
    TimerTick {
        remaining_ms: u64,
    },
    AlarmArmed {
        interval_ms: u64,
    },
    AlarmTick {
        remaining_ms: u64,
    },
    AlarmTriggered,
    EyeRestStarted {
        duration_ms: u64,
    },
    EyeRestTick {
        remaining_ms: u64,
    },
    /// Carries the values restored into the interrupted study session.
    EyeRestFinished {
        time_left_in_session_ms: u64,
        time_until_next_alarm_ms: u64,
    },
    StudySessionFinished,
    BreakFinished,
    CycleCompleted,
}

/// Host callbacks. Every method defaults to a no-op.
pub trait CycleListener: Send {
    fn on_phase_changed(&mut self, _from: Phase, _to: Phase) {}
    fn on_timer_tick(&mut self, _remaining_ms: u64) {}
    fn on_alarm_armed(&mut self, _interval_ms: u64) {}
    fn on_alarm_tick(&mut self, _remaining_ms: u64) {}
    fn on_alarm_triggered(&mut self) {}
    fn on_eye_rest_started(&mut self, _duration_ms: u64) {}
    fn on_eye_rest_tick(&mut self, _remaining_ms: u64) {}
    /// The session and alarm times restored into the interrupted study
    /// session, before any re-arm on the same tick replaces the alarm time.
    fn on_eye_rest_finished(
        &mut self,
        _time_left_in_session_ms: u64,
        _time_until_next_alarm_ms: u64,
    ) {
    }
    fn on_study_session_finished(&mut self) {}
    fn on_break_finished(&mut self) {}
    fn on_cycle_completed(&mut self) {}
}

/// Listener that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl CycleListener for NoopListener {}

/// Route one event to the matching callback.
pub fn dispatch(event: &Event, listener: &mut dyn CycleListener) {
    match *event {
        Event::PhaseChanged { from, to } => listener.on_phase_changed(from, to),
        Event::TimerTick { remaining_ms } => listener.on_timer_tick(remaining_ms),
        Event::AlarmArmed { interval_ms } => listener.on_alarm_armed(interval_ms),
        Event::AlarmTick { remaining_ms } => listener.on_alarm_tick(remaining_ms),
        Event::AlarmTriggered => listener.on_alarm_triggered(),
        Event::EyeRestStarted { duration_ms } => listener.on_eye_rest_started(duration_ms),
        Event::EyeRestTick { remaining_ms } => listener.on_eye_rest_tick(remaining_ms),
        Event::EyeRestFinished {
            time_left_in_session_ms,
            time_until_next_alarm_ms,
        } => listener.on_eye_rest_finished(time_left_in_session_ms, time_until_next_alarm_ms),
        Event::StudySessionFinished => listener.on_study_session_finished(),
        Event::BreakFinished => listener.on_break_finished(),
        Event::CycleCompleted => listener.on_cycle_completed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<&'static str>, Option<(u64, u64)>);

    impl CycleListener for Recorder {
        fn on_alarm_triggered(&mut self) {
            self.0.push("alarm");
        }
        fn on_eye_rest_finished(&mut self, time_left_ms: u64, alarm_ms: u64) {
            self.0.push("eye_rest_finished");
            self.1 = Some((time_left_ms, alarm_ms));
        }
        fn on_cycle_completed(&mut self) {
            self.0.push("cycle");
        }
    }

    #[test]
    fn dispatch_hits_overridden_callbacks_only() {
        let mut rec = Recorder::default();
        for event in [
            Event::TimerTick { remaining_ms: 1 },
            Event::AlarmTriggered,
            Event::EyeRestFinished {
                time_left_in_session_ms: 57_000,
                time_until_next_alarm_ms: 4_000,
            },
            Event::BreakFinished,
            Event::CycleCompleted,
        ] {
            dispatch(&event, &mut rec);
        }
        assert_eq!(rec.0, vec!["alarm", "eye_rest_finished", "cycle"]);
        assert_eq!(rec.1, Some((57_000, 4_000)));
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(Event::AlarmTick { remaining_ms: 5 }).unwrap();
        assert_eq!(json["type"], "alarm_tick");
        assert_eq!(json["remaining_ms"], 5);

        let json = serde_json::to_value(Event::PhaseChanged {
            from: Phase::Studying,
            to: Phase::EyeRest,
        })
        .unwrap();
        assert_eq!(json["to"], "eye_rest");
    }
}
