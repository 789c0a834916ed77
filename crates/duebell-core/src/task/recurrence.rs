//! Recurrence calculation and the completion hook.
//!
//! Completing a recurring task spawns exactly one successor. The successor is
//! created through the [`TaskSource`] collaborator, never by mutating a
//! snapshot in place.

use chrono::{DateTime, Days, Months, NaiveDate, TimeDelta, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{Recurrence, Task, TaskSource};
use crate::error::{CoreError, Result};

/// Next occurrence of `date` under `rule`.
///
/// Monthly steps use calendar-month arithmetic and clamp the day to the end
/// of the target month, so Jan 31 becomes Feb 29 in a leap year and Feb 28
/// otherwise.
pub fn next_occurrence(date: NaiveDate, rule: Recurrence) -> Option<NaiveDate> {
    match rule {
        Recurrence::None => None,
        Recurrence::Daily => date.checked_add_days(Days::new(1)),
        Recurrence::Weekly => date.checked_add_days(Days::new(7)),
        Recurrence::Monthly => date.checked_add_months(Months::new(1)),
    }
}

/// Build the next occurrence of a recurring task, if it has one.
///
/// Both dates advance under the same rule, the end falling back to the start
/// date when no end is set. If a month-end clamp on the end date would put it
/// before the new start, the end instead keeps its day offset from the start.
/// Time-of-day fields are carried over unchanged.
pub fn successor_of(task: &Task, created_at: DateTime<Utc>) -> Option<Task> {
    if task.recurrence == Recurrence::None {
        return None;
    }
    let next_start = task
        .start_date
        .and_then(|d| next_occurrence(d, task.recurrence));
    let next_end = task
        .end_date
        .or(task.start_date)
        .and_then(|d| next_occurrence(d, task.recurrence));
    if next_start.is_none() && next_end.is_none() {
        return None;
    }

    let mut next = Task {
        id: Uuid::new_v4().to_string(),
        title: task.title.clone(),
        completed: false,
        start_date: next_start,
        start_time: task.start_time,
        end_date: next_end,
        end_time: task.end_time,
        recurrence: task.recurrence,
        created_at,
    };
    if let (Some(start), Some(end), Some(new_start)) = (task.start_date, task.end_date, next_start) {
        if next.end_instant() < next.start_instant() {
            let span = TimeDelta::try_days(end.signed_duration_since(start).num_days())?;
            next.end_date = new_start.checked_add_signed(span);
        }
    }
    Some(next)
}

/// Result of toggling a task's completion flag.
#[derive(Debug, Clone, Serialize)]
pub struct ToggleOutcome {
    pub task_id: String,
    pub completed: bool,
    /// Successor appended to the collection, if one was spawned
    pub spawned: Option<Task>,
}

/// Flip `completed` on a task and spawn its successor when it recurs.
///
/// Un-completing a task never spawns anything. The successor is validated
/// before anything is written, and the flag and the successor reach the
/// source as one request.
pub fn toggle_complete<S>(
    source: &mut S,
    task_id: &str,
    now: DateTime<Utc>,
) -> Result<ToggleOutcome>
where
    S: TaskSource + ?Sized,
{
    let task = source
        .task_snapshot()
        .into_iter()
        .find(|t| t.id == task_id)
        .ok_or_else(|| CoreError::TaskNotFound {
            id: task_id.to_string(),
        })?;

    let completed = !task.completed;
    let spawned = if completed {
        successor_of(&task, now)
    } else {
        None
    };
    if let Some(ref next) = spawned {
        next.validate()?;
    }
    source.request_complete_and_create(task_id, completed, spawned.clone())?;

    if let Some(ref next) = spawned {
        tracing::info!(
            task_id = %task.id,
            successor_id = %next.id,
            recurrence = %task.recurrence,
            "Spawned next occurrence"
        );
    }

    Ok(ToggleOutcome {
        task_id: task.id,
        completed,
        spawned,
    })
}
