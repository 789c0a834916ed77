//! Task data model.
//!
//! A task carries its start and end as separate calendar-date and
//! time-of-day fields, each independently optional. Instants are derived
//! from them in local wall-clock time:
//!
//! - start instant = start date + (start time or 00:00:00)
//! - end instant   = end date + (end time or 23:59:59)
//!
//! Without a date there is no instant, regardless of the time field.

pub mod recurrence;
pub mod store;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

pub use recurrence::{next_occurrence, successor_of, toggle_complete, ToggleOutcome};
pub use store::{TaskSource, TaskStore};

/// How a task repeats once an occurrence is completed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Recurrence::None => "none",
            Recurrence::Daily => "daily",
            Recurrence::Weekly => "weekly",
            Recurrence::Monthly => "monthly",
        };
        f.write_str(s)
    }
}

impl FromStr for Recurrence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Recurrence::None),
            "daily" => Ok(Recurrence::Daily),
            "weekly" => Ok(Recurrence::Weekly),
            "monthly" => Ok(Recurrence::Monthly),
            other => Err(format!(
                "unknown recurrence '{other}' (expected none, daily, weekly or monthly)"
            )),
        }
    }
}

/// A unit of work with an optional time window.
///
/// Every field except `id` and `title` defaults when absent from persisted
/// JSON, so older task files keep loading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    /// Unique identifier, immutable after creation
    pub id: String,
    /// Display title, never empty
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_time: Option<NaiveTime>,
    #[serde(default)]
    pub recurrence: Recurrence,
    /// Creation instant, only used for display ordering
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// User-supplied fields for a new task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub start_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_date: Option<NaiveDate>,
    pub end_time: Option<NaiveTime>,
    pub recurrence: Recurrence,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn starting(mut self, date: NaiveDate, time: Option<NaiveTime>) -> Self {
        self.start_date = Some(date);
        self.start_time = time;
        self
    }

    pub fn ending(mut self, date: NaiveDate, time: Option<NaiveTime>) -> Self {
        self.end_date = Some(date);
        self.end_time = time;
        self
    }

    pub fn repeating(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = recurrence;
        self
    }
}

impl Task {
    /// Build a task from a draft with a fresh id and creation instant.
    ///
    /// Does not validate; [`TaskStore::create`] validates before storing.
    pub fn from_draft(draft: TaskDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: draft.title,
            completed: false,
            start_date: draft.start_date,
            start_time: draft.start_time,
            end_date: draft.end_date,
            end_time: draft.end_time,
            recurrence: draft.recurrence,
            created_at,
        }
    }

    pub fn start_instant(&self) -> Option<NaiveDateTime> {
        let date = self.start_date?;
        Some(date.and_time(self.start_time.unwrap_or(NaiveTime::MIN)))
    }

    pub fn end_instant(&self) -> Option<NaiveDateTime> {
        let date = self.end_date?;
        match self.end_time {
            Some(time) => Some(date.and_time(time)),
            None => date.and_hms_opt(23, 59, 59),
        }
    }

    /// Effective deadline: the end instant, or the start instant if no end.
    pub fn due_instant(&self) -> Option<NaiveDateTime> {
        self.end_instant().or_else(|| self.start_instant())
    }

    /// A task without a start instant counts as started.
    pub fn is_started(&self, now: NaiveDateTime) -> bool {
        self.start_instant().map_or(true, |start| start <= now)
    }

    pub fn is_active(&self) -> bool {
        !self.completed
    }

    /// Check the invariants that must hold before a task is stored.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if let (Some(start), Some(end)) = (self.start_instant(), self.end_instant()) {
            if end < start {
                return Err(ValidationError::EndBeforeStart { start, end });
            }
        }
        Ok(())
    }
}
