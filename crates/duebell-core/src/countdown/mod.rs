mod alert;
mod clock;
mod engine;
mod runner;
mod selector;
mod zone;

pub use alert::{
    AlertDriver, AlertPorts, DriverOutput, EngineState, RecordingPorts, DEFAULT_NOTIFICATION_TITLE,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{CountdownEngine, DisplaySink, DisplaySnapshot, TickOutcome};
pub use runner::{spawn_engine, EngineCommand, EngineHandle, EngineParts, DEFAULT_TICK_INTERVAL};
pub use selector::{select_target, Selection, Target, TargetKey};
pub use zone::{classify, format_remaining, Classification, Color, Zone, ZoneThresholds};
