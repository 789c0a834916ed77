//! Task management commands for CLI.

use chrono::{NaiveDate, NaiveTime, Utc};
use clap::{Args, Subcommand};
use duebell_core::task::toggle_complete;
use duebell_core::{Recurrence, Task, TaskDraft, TaskFile};

use super::{parse_date, parse_time};

/// Date/time window flags shared by add and edit.
#[derive(Args)]
pub struct WindowArgs {
    /// Start date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    start_date: Option<NaiveDate>,
    /// Start time (HH:MM[:SS])
    #[arg(long, value_parser = parse_time)]
    start_time: Option<NaiveTime>,
    /// End date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    end_date: Option<NaiveDate>,
    /// End time (HH:MM[:SS])
    #[arg(long, value_parser = parse_time)]
    end_time: Option<NaiveTime>,
    /// Recurrence: none, daily, weekly or monthly
    #[arg(long)]
    recurrence: Option<Recurrence>,
}

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Add {
        /// Task title
        title: String,
        #[command(flatten)]
        window: WindowArgs,
    },
    /// List tasks in stored order
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit a task
    Edit {
        /// Task ID
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        window: WindowArgs,
        /// Remove start date and time
        #[arg(long)]
        clear_start: bool,
        /// Remove end date and time
        #[arg(long)]
        clear_end: bool,
    },
    /// Toggle completion; completing a recurring task creates its next occurrence
    Toggle {
        /// Task ID
        id: String,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: String,
    },
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut file = TaskFile::open_default()?;

    match action {
        TaskAction::Add { title, window } => {
            let draft = TaskDraft {
                title,
                start_date: window.start_date,
                start_time: window.start_time,
                end_date: window.end_date,
                end_time: window.end_time,
                recurrence: window.recurrence.unwrap_or_default(),
            };
            let task = file.update(|store| store.create(draft, Utc::now()))?;
            println!("Task created: {}", task.id);
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::List { json } => {
            let store = file.load()?;
            if json {
                println!("{}", serde_json::to_string_pretty(store.tasks())?);
            } else if store.is_empty() {
                println!("No tasks");
            } else {
                for task in store.tasks() {
                    println!("{}", describe(task));
                }
            }
        }
        TaskAction::Edit {
            id,
            title,
            window,
            clear_start,
            clear_end,
        } => {
            let task = file.update(|store| {
                store.edit(&id, |task| {
                    if let Some(t) = title {
                        task.title = t;
                    }
                    if clear_start {
                        task.start_date = None;
                        task.start_time = None;
                    }
                    if clear_end {
                        task.end_date = None;
                        task.end_time = None;
                    }
                    if let Some(d) = window.start_date {
                        task.start_date = Some(d);
                    }
                    if let Some(t) = window.start_time {
                        task.start_time = Some(t);
                    }
                    if let Some(d) = window.end_date {
                        task.end_date = Some(d);
                    }
                    if let Some(t) = window.end_time {
                        task.end_time = Some(t);
                    }
                    if let Some(r) = window.recurrence {
                        task.recurrence = r;
                    }
                })
            })?;
            println!("Task updated:");
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::Toggle { id } => {
            let outcome = toggle_complete(&mut file, &id, Utc::now())?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        TaskAction::Delete { id } => {
            file.update(|store| store.delete(&id))?;
            println!("Task deleted: {id}");
        }
    }
    Ok(())
}

fn describe(task: &Task) -> String {
    let mark = if task.completed { "x" } else { " " };
    let fmt = |dt: Option<chrono::NaiveDateTime>| {
        dt.map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string())
    };
    let mut line = format!(
        "{}  [{}] {}  {} -> {}",
        task.id,
        mark,
        task.title,
        fmt(task.start_instant()),
        fmt(task.end_instant()),
    );
    if task.recurrence != Recurrence::None {
        line.push_str(&format!("  ({})", task.recurrence));
    }
    line
}
