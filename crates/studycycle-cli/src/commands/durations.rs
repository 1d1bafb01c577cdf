use studycycle_core::state::format_clock;
use studycycle_core::{Config, Durations};

pub fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let mut durations = Durations::resolve(&config.cycle)?;
    if let Some(eye_rest_ms) = config.engine_options().eye_rest_ms {
        durations.eye_rest_ms = eye_rest_ms;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&durations)?);
        return Ok(());
    }

    if config.cycle.test_mode {
        println!("test mode: fixed short durations");
    }
    println!("study     {}", format_clock(durations.study_ms));
    println!("break     {}", format_clock(durations.break_ms));
    println!("eye rest  {}", format_clock(durations.eye_rest_ms));
    println!(
        "alarm     every {} to {}",
        format_clock(durations.alarm_min_ms),
        format_clock(durations.alarm_max_ms)
    );
    println!("cycle     {}", format_clock(durations.cycle_ms()));
    Ok(())
}
