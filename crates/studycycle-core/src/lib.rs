//! # studycycle Core Library
//!
//! Core logic for a focus/break cycle scheduler: a long study session, a
//! derived break, and randomized eye-rest micro-breaks injected while
//! studying. The CLI binary is a thin host over this library.
//!
//! ## Architecture
//!
//! - **Cycle Engine**: a tick-driven state machine over
//!   `Idle | Studying | EyeRest | Break` that the caller advances once per
//!   tick interval
//! - **Timers**: cancellable countdowns, the randomized alarm scheduler and
//!   the eye-rest sub-scheduler, all owned by the engine
//! - **Service**: a tokio actor that owns an engine, applies commands, and
//!   publishes versioned snapshots
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`CycleEngine`]: Core phase state machine
//! - [`Durations`]: Settings resolved to millisecond lengths
//! - [`CycleService`]: Async single-writer driver
//! - [`CycleListener`]: Host callback surface

pub mod engine;
pub mod error;
pub mod events;
pub mod phase;
pub mod service;
pub mod settings;
pub mod simulation;
pub mod state;
pub mod storage;
pub mod timer;

pub use engine::{CycleEngine, EngineOptions, RearmPolicy};
pub use error::{ConfigError, ConfigurationError, CoreError, Result};
pub use events::{dispatch, CycleListener, Event, NoopListener};
pub use phase::Phase;
pub use service::{CycleHandle, CycleService, Published};
pub use settings::{Durations, Settings, TimeUnit};
pub use simulation::{simulate, SimulationReport};
pub use state::{CycleView, RuntimeState};
pub use storage::{Config, EngineConfig, RearmMode};
pub use timer::{FixedInterval, IntervalSource, SeededIntervals};
