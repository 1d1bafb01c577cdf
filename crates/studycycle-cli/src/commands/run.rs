use std::io::Write;

use clap::Args;
use studycycle_core::state::format_clock;
use studycycle_core::{Config, CycleEngine, CycleListener, CycleService, CycleView, SeededIntervals};

#[derive(Args)]
pub struct RunArgs {
    /// Use the fixed short test durations
    #[arg(long)]
    test_mode: bool,
    /// Seed for the alarm draws (defaults to engine.seed, then entropy)
    #[arg(long)]
    seed: Option<u64>,
}

const BELL: &str = "\x07";

/// Prints one line per notable event and rings the terminal bell where a
/// phone would vibrate.
struct TerminalListener;

impl TerminalListener {
    fn say(&self, bell: bool, message: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{}>> {message}", if bell { BELL } else { "" });
        let _ = out.flush();
    }
}

impl CycleListener for TerminalListener {
    fn on_alarm_triggered(&mut self) {
        self.say(true, "alarm");
    }
    fn on_eye_rest_started(&mut self, duration_ms: u64) {
        self.say(
            false,
            &format!("eye rest: look into the distance for {}", format_clock(duration_ms)),
        );
    }
    fn on_eye_rest_finished(
        &mut self,
        time_left_in_session_ms: u64,
        _time_until_next_alarm_ms: u64,
    ) {
        self.say(
            false,
            &format!(
                "eye rest over, back to study with {} left",
                format_clock(time_left_in_session_ms)
            ),
        );
    }
    fn on_study_session_finished(&mut self) {
        self.say(true, "study session finished, take a break");
    }
    fn on_break_finished(&mut self) {
        self.say(true, "break finished");
    }
    fn on_cycle_completed(&mut self) {
        self.say(false, "cycle completed");
    }
}

fn status_line(view: &CycleView) -> String {
    let mut line = format!(
        "{:<9} {:>8}",
        view.phase().label(),
        format_clock(view.state.time_left_in_session_ms)
    );
    if view.is_studying() && view.alarm_armed {
        line.push_str(&format!(
            "  alarm {:>8}",
            format_clock(view.state.time_until_next_alarm_ms)
        ));
    }
    line.push_str(&format!("  cycle {:>3.0}%", view.cycle_progress() * 100.0));
    line
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_cycle(args))
}

async fn run_cycle(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let mut settings = config.cycle;
    settings.test_mode |= args.test_mode;

    let engine = CycleEngine::with_source(
        &settings,
        config.engine_options(),
        Box::new(SeededIntervals::new(args.seed.or(config.engine.seed))),
    )?;
    let handle = CycleService::spawn(engine, Box::new(TerminalListener));
    let mut state = handle.subscribe();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    handle.start()?;
    loop {
        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let published = *state.borrow_and_update();
                println!("{}", status_line(&published.view));
                if published.view.is_idle() {
                    break;
                }
            }
            _ = &mut ctrl_c => {
                tracing::info!("interrupted, stopping cycle");
                handle.stop()?;
                println!("stopped");
                break;
            }
        }
    }

    handle.shutdown();
    Ok(())
}
