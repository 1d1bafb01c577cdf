//! Async driver for [`CycleEngine`].
//!
//! The engine lives inside one tokio task and is never shared. Commands
//! arrive over an mpsc channel and are applied between ticks, so a `stop()`
//! or `start()` cancels every timer before any later tick is looked at.
//! Readers get immutable, versioned snapshots over a `watch` channel and
//! discrete events over a `broadcast` channel.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{self, MissedTickBehavior};

use crate::engine::CycleEngine;
use crate::error::{ConfigurationError, CoreError, Result};
use crate::events::{dispatch, CycleListener, Event};
use crate::phase::Phase;
use crate::settings::Settings;
use crate::state::CycleView;

const EVENT_BUFFER: usize = 256;

/// One publication of the runtime state. `version` increases by one per
/// publication.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Published {
    pub version: u64,
    pub published_at: DateTime<Utc>,
    pub view: CycleView,
}

enum Command {
    Configure(Settings, oneshot::Sender<Result<(), ConfigurationError>>),
    Start,
    Stop,
    ResetCycleCompleted,
    Shutdown,
}

/// Cloneable handle to a running service. The service task exits when the
/// last handle is dropped or `shutdown()` is called.
#[derive(Clone)]
pub struct CycleHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<Published>,
    events: broadcast::Sender<Event>,
}

impl CycleHandle {
    /// # Errors
    ///
    /// Returns [`CoreError::Configuration`] for invalid settings, or
    /// [`CoreError::ServiceClosed`] if the service is gone.
    pub async fn configure(&self, settings: Settings) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Configure(settings, reply))?;
        response.await.map_err(|_| CoreError::ServiceClosed)??;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`CoreError::ServiceClosed`] if the service is gone.
    pub fn start(&self) -> Result<()> {
        self.send(Command::Start)
    }

    /// # Errors
    ///
    /// Returns [`CoreError::ServiceClosed`] if the service is gone.
    pub fn stop(&self) -> Result<()> {
        self.send(Command::Stop)
    }

    /// # Errors
    ///
    /// Returns [`CoreError::ServiceClosed`] if the service is gone.
    pub fn reset_cycle_completed(&self) -> Result<()> {
        self.send(Command::ResetCycleCompleted)
    }

    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }

    pub fn subscribe(&self) -> watch::Receiver<Published> {
        self.state.clone()
    }

    pub fn current(&self) -> Published {
        *self.state.borrow()
    }

    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| CoreError::ServiceClosed)
    }
}

pub struct CycleService {
    engine: CycleEngine,
    listener: Box<dyn CycleListener>,
    state: watch::Sender<Published>,
    events: broadcast::Sender<Event>,
    version: u64,
}

impl CycleService {
    /// Move `engine` into a new task and return a handle to it.
    /// Must be called from within a tokio runtime.
    pub fn spawn(engine: CycleEngine, listener: Box<dyn CycleListener>) -> CycleHandle {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(Published {
            version: 0,
            published_at: Utc::now(),
            view: engine.view(),
        });
        let (events_tx, _) = broadcast::channel(EVENT_BUFFER);

        let service = Self {
            engine,
            listener,
            state: state_tx,
            events: events_tx.clone(),
            version: 0,
        };
        tokio::spawn(service.run(commands_rx));

        CycleHandle {
            commands: commands_tx,
            state: state_rx,
            events: events_tx,
        }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let period = Duration::from_millis(self.engine.tick_ms());
        let mut ticker = time::interval_at(time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

        tracing::info!(tick_ms = self.engine.tick_ms(), "cycle service started");

        loop {
            tokio::select! {
                // Commands first: nothing queued behind a stop may tick.
                biased;

                command = commands.recv() => {
                    let Some(command) = command else { break };
                    match command {
                        Command::Configure(settings, reply) => {
                            let result = self.engine.configure(&settings);
                            if let Err(err) = &result {
                                tracing::warn!(%err, "rejected settings");
                            }
                            let _ = reply.send(result);
                        }
                        Command::Start => {
                            let events = self.engine.start();
                            // Align the first tick to a full period after start.
                            ticker.reset();
                            self.emit(events);
                        }
                        Command::Stop => {
                            let events = self.engine.stop();
                            self.emit(events);
                        }
                        Command::ResetCycleCompleted => self.engine.reset_cycle_completed(),
                        Command::Shutdown => break,
                    }
                    self.publish();
                }
                _ = ticker.tick() => {
                    if self.engine.phase() == Phase::Idle {
                        continue;
                    }
                    let events = self.engine.tick();
                    self.emit(events);
                    self.publish();
                }
            }
        }

        tracing::info!("cycle service stopped");
    }

    fn emit(&mut self, events: Vec<Event>) {
        for event in events {
            dispatch(&event, self.listener.as_mut());
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
    }

    fn publish(&mut self) {
        self.version += 1;
        let published = Published {
            version: self.version,
            published_at: Utc::now(),
            view: self.engine.view(),
        };
        self.state.send_replace(published);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::engine::EngineOptions;
    use crate::events::NoopListener;
    use crate::settings::TimeUnit;
    use crate::timer::FixedInterval;

    const NEVER: u64 = u64::MAX;

    fn seconds(study: u32) -> Settings {
        Settings {
            study_duration: study,
            min_alarm_interval: 1,
            max_alarm_interval: 2,
            test_mode: false,
            time_unit: TimeUnit::Seconds,
        }
    }

    fn engine(settings: &Settings, alarm_ms: u64) -> CycleEngine {
        CycleEngine::with_source(
            settings,
            EngineOptions::default(),
            Box::new(FixedInterval(alarm_ms)),
        )
        .unwrap()
    }

    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<&'static str>>>);

    impl CycleListener for Shared {
        fn on_alarm_triggered(&mut self) {
            self.0.lock().unwrap().push("alarm");
        }
        fn on_study_session_finished(&mut self) {
            self.0.lock().unwrap().push("study_finished");
        }
        fn on_cycle_completed(&mut self) {
            self.0.lock().unwrap().push("cycle");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn runs_a_cycle_to_completion() {
        let listener = Shared::default();
        let handle = CycleService::spawn(engine(&seconds(10), NEVER), Box::new(listener.clone()));
        let mut rx = handle.subscribe();

        handle.start().unwrap();
        rx.wait_for(|p| p.view.is_break()).await.unwrap();
        let published = rx
            .wait_for(|p| p.view.is_idle() && p.view.state.cycle_completed)
            .await
            .unwrap();
        // start + 10 study ticks + 5 break ticks
        assert_eq!(published.version, 16);
        drop(published);

        assert_eq!(*listener.0.lock().unwrap(), vec!["study_finished", "cycle"]);
        handle.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_silences_all_timers() {
        let handle = CycleService::spawn(engine(&seconds(10), 3_000), Box::new(NoopListener));
        let mut events = handle.events();

        handle.start().unwrap();
        handle.stop().unwrap();
        time::sleep(Duration::from_secs(30)).await;

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert_eq!(
            seen,
            vec![
                Event::PhaseChanged {
                    from: Phase::Idle,
                    to: Phase::Studying
                },
                Event::AlarmArmed { interval_ms: 3_000 },
                Event::PhaseChanged {
                    from: Phase::Studying,
                    to: Phase::Idle
                },
            ]
        );
        assert!(handle.current().view.is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn alarm_interrupts_study_and_notifies() {
        let listener = Shared::default();
        let handle = CycleService::spawn(engine(&seconds(60), 3_000), Box::new(listener.clone()));
        let mut rx = handle.subscribe();

        handle.start().unwrap();
        let published = rx.wait_for(|p| p.view.is_eye_rest()).await.unwrap();
        assert_eq!(published.view.state.time_left_in_session_ms, 20_000);
        drop(published);

        let published = rx.wait_for(|p| p.view.is_studying()).await.unwrap();
        assert_eq!(published.view.state.time_left_in_session_ms, 57_000);
        drop(published);

        assert_eq!(*listener.0.lock().unwrap(), vec!["alarm"]);
    }

    #[tokio::test(start_paused = true)]
    async fn configure_reports_invalid_settings() {
        let handle = CycleService::spawn(engine(&seconds(10), NEVER), Box::new(NoopListener));

        let err = handle
            .configure(Settings {
                min_alarm_interval: 5,
                max_alarm_interval: 2,
                ..seconds(10)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Configuration(_)));

        handle.configure(seconds(30)).await.unwrap();
        assert_eq!(handle.current().view.durations.study_ms, 30_000);
    }

    #[tokio::test(start_paused = true)]
    async fn commands_fail_after_shutdown() {
        let handle = CycleService::spawn(engine(&seconds(10), NEVER), Box::new(NoopListener));
        handle.shutdown();
        // Let the task observe the shutdown.
        time::sleep(Duration::from_millis(10)).await;

        assert!(matches!(handle.start(), Err(CoreError::ServiceClosed)));
        assert!(matches!(
            handle.configure(seconds(10)).await,
            Err(CoreError::ServiceClosed)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_clears_completion_flag() {
        let handle = CycleService::spawn(engine(&seconds(5), NEVER), Box::new(NoopListener));
        let mut rx = handle.subscribe();

        handle.start().unwrap();
        rx.wait_for(|p| p.view.state.cycle_completed).await.unwrap();
        handle.reset_cycle_completed().unwrap();
        rx.wait_for(|p| !p.view.state.cycle_completed).await.unwrap();
        assert!(handle.current().view.is_idle());
    }
}
