use chrono::NaiveDateTime;
use clap::Args;
use duebell_core::{
    Clock, Config, CountdownEngine, RecordingPorts, SystemClock, TaskFile, TaskSource,
};

use super::parse_datetime;

#[derive(Args)]
pub struct StatusArgs {
    /// Evaluate at this local time instead of now (YYYY-MM-DDTHH:MM[:SS])
    #[arg(long, value_parser = parse_datetime)]
    at: Option<NaiveDateTime>,
}

/// One silent tick: effects are recorded, not played.
pub fn run(args: StatusArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let file = TaskFile::open_default()?;
    let now = args.at.unwrap_or_else(|| SystemClock.now());

    let mut engine = CountdownEngine::from_config(&config);
    let mut ports = RecordingPorts::default();
    let outcome = engine.tick(&file.task_snapshot(), now, &mut ports);

    let report = serde_json::json!({
        "at": now,
        "zone": outcome.classification.map(|c| c.zone),
        "snapshot": outcome.snapshot,
        "events": outcome.events,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
