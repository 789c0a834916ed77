//! # duebell Core Library
//!
//! Deadline tracking with a live "time remaining" indicator that escalates
//! through chime, looping alarm and system notification as the nearest
//! deadline approaches. The `duebell` CLI is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Tasks**: data model, validation, recurrence and the completion hook
//! - **Countdown**: target selection, zone classification, the stateful
//!   alert driver, and a tokio loop that ticks them at a fixed cadence
//! - **Storage**: TOML configuration and a JSON task file
//!
//! ## Key Components
//!
//! - [`CountdownEngine`]: one synchronous tick over a task snapshot
//! - [`AlertPorts`]: effect ports the host implements for audio/notifications
//! - [`TaskSource`]: collaborator that owns the task collection
//! - [`Config`]: application configuration management

pub mod countdown;
pub mod error;
pub mod events;
pub mod storage;
pub mod task;

pub use countdown::{
    spawn_engine, AlertDriver, AlertPorts, Clock, CountdownEngine, DisplaySink, DisplaySnapshot,
    EngineHandle, EngineParts, EngineState, RecordingPorts, Selection, SystemClock, TickOutcome,
    Zone, ZoneThresholds,
};
pub use error::{AlertError, ConfigError, CoreError, Result, ValidationError};
pub use events::Event;
pub use storage::{Config, TaskFile};
pub use task::{Recurrence, Task, TaskDraft, TaskSource, TaskStore};
