//! Target selection: which task the countdown tracks right now.
//!
//! Recomputed from scratch every tick, so arbitrary edits between ticks are
//! always reflected.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::task::Task;

/// Identity of a tracked occurrence: the task plus the due instant.
///
/// Editing a task's deadline yields a new key, which resets alert state and
/// re-arms the notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetKey {
    pub task_id: String,
    pub due: NaiveDateTime,
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.task_id, self.due.format("%Y-%m-%dT%H:%M:%S"))
    }
}

/// The nearest upcoming started task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub task: Task,
    pub due: NaiveDateTime,
    pub start: Option<NaiveDateTime>,
}

impl Target {
    pub fn key(&self) -> TargetKey {
        TargetKey {
            task_id: self.task.id.clone(),
            due: self.due,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every task is completed, or there are none
    NoActiveTasks,
    /// Active tasks exist but all start in the future
    NoneStartedYet,
    /// Started tasks exist but none has a date
    NoDeadlineSet,
    Selected(Target),
}

impl Selection {
    pub fn target(&self) -> Option<&Target> {
        match self {
            Selection::Selected(target) => Some(target),
            _ => None,
        }
    }
}

/// Pick the started, active task with the soonest due instant.
///
/// Ties keep list order. Started tasks without any date stay in the started
/// set but are never ranked.
pub fn select_target(tasks: &[Task], now: NaiveDateTime) -> Selection {
    let mut active = tasks.iter().filter(|t| t.is_active()).peekable();
    if active.peek().is_none() {
        return Selection::NoActiveTasks;
    }

    let mut started = active.filter(|t| t.is_started(now)).peekable();
    if started.peek().is_none() {
        return Selection::NoneStartedYet;
    }

    let mut best: Option<(&Task, NaiveDateTime)> = None;
    for task in started {
        let Some(due) = task.due_instant() else {
            continue;
        };
        match best {
            Some((_, best_due)) if best_due <= due => {}
            _ => best = Some((task, due)),
        }
    }

    match best {
        Some((task, due)) => Selection::Selected(Target {
            task: task.clone(),
            due,
            start: task.start_instant(),
        }),
        None => Selection::NoDeadlineSet,
    }
}
