//! User settings and the duration resolver.
//!
//! [`Settings`] is the immutable record handed in by the host. [`Durations`]
//! is what the engine actually runs on: every phase length resolved to
//! milliseconds, with the test-mode override applied.

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::phase::Phase;

/// Length of one eye-rest interruption. Identical in normal and test mode.
pub const EYE_REST_MS: u64 = 20 * 1000;

/// Shortest break the derived formula may produce, in the settings' time unit.
pub const MIN_BREAK_DURATION: u32 = 5;

// Test mode swaps every configured length for these.
pub const TEST_STUDY_MS: u64 = 60 * 1000;
pub const TEST_BREAK_MS: u64 = 20 * 1000;
pub const TEST_ALARM_MIN_MS: u64 = 10 * 1000;
pub const TEST_ALARM_MAX_MS: u64 = 20 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    #[default]
    Minutes,
    Seconds,
}

impl TimeUnit {
    pub fn millis(self) -> u64 {
        match self {
            TimeUnit::Minutes => 60 * 1000,
            TimeUnit::Seconds => 1000,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeUnit::Minutes => "min",
            TimeUnit::Seconds => "s",
        }
    }
}

/// Scheduler settings. All lengths are expressed in `time_unit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub study_duration: u32,
    pub min_alarm_interval: u32,
    pub max_alarm_interval: u32,
    #[serde(default)]
    pub test_mode: bool,
    #[serde(default)]
    pub time_unit: TimeUnit,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            study_duration: 90,
            min_alarm_interval: 3,
            max_alarm_interval: 5,
            test_mode: false,
            time_unit: TimeUnit::Minutes,
        }
    }
}

impl Settings {
    /// `max(5, round(study * 2/9))`, in the same unit as `study_duration`.
    pub fn break_duration(&self) -> u32 {
        // round(2s/9) == floor((4s + 9) / 18); 2s/9 never lands on .5
        let study = u64::from(self.study_duration);
        let rounded = (4 * study + 9) / 18;
        (rounded as u32).max(MIN_BREAK_DURATION)
    }

    /// Check the record without resolving it.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if any length is zero, the alarm
    /// bounds are inverted, or a bound exceeds the study duration.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (field, value) in [
            ("study_duration", self.study_duration),
            ("min_alarm_interval", self.min_alarm_interval),
            ("max_alarm_interval", self.max_alarm_interval),
        ] {
            if value == 0 {
                return Err(ConfigurationError::NonPositiveDuration { field });
            }
        }

        if self.min_alarm_interval > self.max_alarm_interval {
            return Err(ConfigurationError::IntervalBoundsInverted {
                min: self.min_alarm_interval,
                max: self.max_alarm_interval,
            });
        }

        if self.max_alarm_interval > self.study_duration {
            return Err(ConfigurationError::IntervalExceedsStudy {
                field: "max_alarm_interval",
                value: self.max_alarm_interval,
                study: self.study_duration,
            });
        }

        Ok(())
    }
}

/// Millisecond lengths the engine runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Durations {
    pub study_ms: u64,
    pub break_ms: u64,
    pub eye_rest_ms: u64,
    pub alarm_min_ms: u64,
    pub alarm_max_ms: u64,
}

impl Durations {
    /// Resolve a settings record. Pure; the only failure is validation.
    ///
    /// # Errors
    ///
    /// See [`Settings::validate`].
    pub fn resolve(settings: &Settings) -> Result<Self, ConfigurationError> {
        settings.validate()?;

        if settings.test_mode {
            return Ok(Self {
                study_ms: TEST_STUDY_MS,
                break_ms: TEST_BREAK_MS,
                eye_rest_ms: EYE_REST_MS,
                alarm_min_ms: TEST_ALARM_MIN_MS,
                alarm_max_ms: TEST_ALARM_MAX_MS,
            });
        }

        let unit = settings.time_unit.millis();
        Ok(Self {
            study_ms: u64::from(settings.study_duration) * unit,
            break_ms: u64::from(settings.break_duration()) * unit,
            eye_rest_ms: EYE_REST_MS,
            alarm_min_ms: u64::from(settings.min_alarm_interval) * unit,
            alarm_max_ms: u64::from(settings.max_alarm_interval) * unit,
        })
    }

    /// One full study + break traversal.
    pub fn cycle_ms(&self) -> u64 {
        self.study_ms + self.break_ms
    }

    /// Length of the countdown that drives `phase`; zero for IDLE.
    pub fn phase_ms(&self, phase: Phase) -> u64 {
        match phase {
            Phase::Idle => 0,
            Phase::Studying => self.study_ms,
            Phase::EyeRest => self.eye_rest_ms,
            Phase::Break => self.break_ms,
        }
    }
}

impl Default for Durations {
    fn default() -> Self {
        // Settings::default() is valid by construction.
        Self::resolve(&Settings::default()).unwrap_or(Self {
            study_ms: 90 * 60 * 1000,
            break_ms: 20 * 60 * 1000,
            eye_rest_ms: EYE_REST_MS,
            alarm_min_ms: 3 * 60 * 1000,
            alarm_max_ms: 5 * 60 * 1000,
        })
    }
}
