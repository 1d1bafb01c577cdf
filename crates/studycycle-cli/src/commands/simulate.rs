use clap::Args;
use studycycle_core::simulation::{SimulationScenario, SimulationSeed};
use studycycle_core::state::format_clock;
use studycycle_core::{simulate, Config, Event};

#[derive(Args)]
pub struct SimulateArgs {
    /// Seed for the alarm draws (defaults to engine.seed, then 42)
    #[arg(long)]
    seed: Option<u64>,
    /// Use the fixed short test durations
    #[arg(long)]
    test_mode: bool,
    /// Print the full report as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: SimulateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let mut settings = config.cycle;
    settings.test_mode |= args.test_mode;

    let seed = args
        .seed
        .or(config.engine.seed)
        .map(SimulationSeed::new)
        .unwrap_or_default();

    let scenario = SimulationScenario::new("cli", seed)
        .with_settings(settings)
        .with_options(config.engine_options());
    let report = simulate(&scenario)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let tick_ms = scenario.options.tick_ms;
    for timed in report.milestones() {
        let at = format_clock(timed.tick * tick_ms);
        match &timed.event {
            Event::PhaseChanged { from, to } => {
                println!("{at:>8}  {} -> {}", from.label(), to.label());
            }
            Event::AlarmArmed { interval_ms } => {
                println!("{at:>8}  alarm in {}", format_clock(*interval_ms));
            }
            Event::EyeRestFinished {
                time_left_in_session_ms,
                ..
            } => {
                println!(
                    "{at:>8}  eye rest over, {} of study left",
                    format_clock(*time_left_in_session_ms)
                );
            }
            other => println!("{at:>8}  {}", event_name(other)),
        }
    }

    let m = &report.metrics;
    println!();
    println!("seed        {}", seed.0);
    println!("eye rests   {}", m.eye_rests);
    println!("wall clock  {}", format_clock(m.ticks * tick_ms));
    println!("completed   {}", m.cycle_completed);
    Ok(())
}

fn event_name(event: &Event) -> &'static str {
    match event {
        Event::AlarmTriggered => "alarm",
        Event::EyeRestStarted { .. } => "eye rest",
        Event::StudySessionFinished => "study finished",
        Event::BreakFinished => "break finished",
        Event::CycleCompleted => "cycle completed",
        Event::PhaseChanged { .. } => "phase changed",
        Event::AlarmArmed { .. } => "alarm armed",
        Event::EyeRestFinished { .. } => "eye rest over",
        Event::TimerTick { .. } => "tick",
        Event::AlarmTick { .. } => "alarm tick",
        Event::EyeRestTick { .. } => "eye rest tick",
    }
}
