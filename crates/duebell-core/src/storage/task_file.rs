//! JSON task collection on disk.
//!
//! The file holds a plain ordered array of tasks with no schema version.
//! Missing fields take their defaults, and a missing file is an empty list.

use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::{CoreError, Result};
use crate::task::{Task, TaskSource, TaskStore};

/// Task collection backed by a JSON file.
///
/// As a [`TaskSource`] it re-reads the file on every snapshot, so edits made
/// by another process show up on the next tick. Mutations are written
/// through immediately.
#[derive(Debug, Clone)]
pub struct TaskFile {
    path: PathBuf,
    /// Contents as of `open` or the last successful save
    cache: Vec<Task>,
}

impl TaskFile {
    /// Open `<data_dir>/tasks.json`.
    pub fn open_default() -> Result<Self> {
        Self::open(data_dir()?.join("tasks.json"))
    }

    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let cache = read_tasks(&path)?;
        Ok(Self { path, cache })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current contents as an editable store.
    pub fn load(&self) -> Result<TaskStore> {
        Ok(TaskStore::from_tasks(read_tasks(&self.path)?))
    }

    pub fn save(&mut self, store: &TaskStore) -> Result<()> {
        write_tasks(&self.path, store.tasks())?;
        self.cache = store.tasks().to_vec();
        Ok(())
    }

    /// Load, apply `change`, and save only if `change` succeeds.
    pub fn update<T, F>(&mut self, change: F) -> Result<T>
    where
        F: FnOnce(&mut TaskStore) -> Result<T>,
    {
        let mut store = self.load()?;
        let value = change(&mut store)?;
        self.save(&store)?;
        Ok(value)
    }
}

impl TaskSource for TaskFile {
    fn task_snapshot(&self) -> Vec<Task> {
        match read_tasks(&self.path) {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Using cached tasks");
                self.cache.clone()
            }
        }
    }

    fn request_complete(&mut self, task_id: &str, completed: bool) -> Result<()> {
        self.update(|store| store.request_complete(task_id, completed))
    }

    fn request_create(&mut self, task: Task) -> Result<()> {
        self.update(|store| store.request_create(task))
    }

    fn request_complete_and_create(
        &mut self,
        task_id: &str,
        completed: bool,
        successor: Option<Task>,
    ) -> Result<()> {
        self.update(|store| store.request_complete_and_create(task_id, completed, successor))
    }
}

fn read_tasks(path: &Path) -> Result<Vec<Task>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(storage_error(path, e)),
    };
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&content).map_err(|e| storage_error(path, e))
}

fn write_tasks(path: &Path, tasks: &[Task]) -> Result<()> {
    let json = serde_json::to_string_pretty(tasks)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(|e| storage_error(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| storage_error(path, e))?;
    Ok(())
}

fn storage_error(path: &Path, err: impl std::fmt::Display) -> CoreError {
    CoreError::Storage {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
