//! In-memory task collection and the collaborator trait the engine uses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Task, TaskDraft};
use crate::error::{CoreError, Result};

/// Authoritative owner of the task collection, as seen by the engine.
///
/// The engine reads a snapshot once per tick and routes every mutation back
/// through this trait.
pub trait TaskSource {
    /// Ordered copy of every task.
    fn task_snapshot(&self) -> Vec<Task>;

    /// Set the completion flag of a task.
    fn request_complete(&mut self, task_id: &str, completed: bool) -> Result<()>;

    /// Append a task to the collection.
    fn request_create(&mut self, task: Task) -> Result<()>;

    /// Set the completion flag and append `successor` as one change.
    ///
    /// The default issues the two requests in order. Sources that persist
    /// each request separately should override it so a failed append does
    /// not leave the flag flipped.
    fn request_complete_and_create(
        &mut self,
        task_id: &str,
        completed: bool,
        successor: Option<Task>,
    ) -> Result<()> {
        self.request_complete(task_id, completed)?;
        if let Some(task) = successor {
            self.request_create(task)?;
        }
        Ok(())
    }
}

/// Ordered task collection with validated create/edit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct TaskStore {
    tasks: Vec<Task>,
}

impl TaskStore {
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn into_tasks(self) -> Vec<Task> {
        self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Validate and append a new task.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] without touching the collection if
    /// the draft is invalid.
    pub fn create(&mut self, draft: TaskDraft, now: DateTime<Utc>) -> Result<Task> {
        let task = Task::from_draft(draft, now);
        task.validate()?;
        self.tasks.push(task.clone());
        Ok(task)
    }

    /// Apply `change` to a copy of the task and store it if still valid.
    ///
    /// `id` and `created_at` are restored after `change` runs.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TaskNotFound`] or [`CoreError::Validation`]; the
    /// stored task is left unchanged on error.
    pub fn edit<F>(&mut self, id: &str, change: F) -> Result<Task>
    where
        F: FnOnce(&mut Task),
    {
        let slot = self
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| CoreError::TaskNotFound { id: id.to_string() })?;

        let mut edited = slot.clone();
        change(&mut edited);
        edited.id = slot.id.clone();
        edited.created_at = slot.created_at;
        edited.validate()?;

        *slot = edited.clone();
        Ok(edited)
    }

    pub fn delete(&mut self, id: &str) -> Result<Task> {
        let index = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| CoreError::TaskNotFound { id: id.to_string() })?;
        Ok(self.tasks.remove(index))
    }
}

impl TaskSource for TaskStore {
    fn task_snapshot(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    fn request_complete(&mut self, task_id: &str, completed: bool) -> Result<()> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| CoreError::TaskNotFound {
                id: task_id.to_string(),
            })?;
        task.completed = completed;
        Ok(())
    }

    fn request_create(&mut self, task: Task) -> Result<()> {
        self.tasks.push(task);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use chrono::{NaiveDate, NaiveTime};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn create_rejects_invalid_and_keeps_collection() {
        let mut store = TaskStore::default();
        let err = store
            .create(
                TaskDraft::new("Bad").starting(date(10), None).ending(date(9), None),
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::EndBeforeStart { .. })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn edit_failure_leaves_task_unchanged() {
        let mut store = TaskStore::default();
        let task = store
            .create(
                TaskDraft::new("Draft").starting(date(10), None).ending(date(12), None),
                Utc::now(),
            )
            .unwrap();

        let result = store.edit(&task.id, |t| t.end_date = Some(date(1)));
        assert!(result.is_err());
        assert_eq!(store.get(&task.id), Some(&task));
    }

    #[test]
    fn edit_keeps_identity() {
        let mut store = TaskStore::default();
        let task = store.create(TaskDraft::new("Draft"), Utc::now()).unwrap();
        let edited = store
            .edit(&task.id, |t| {
                t.id = "hijacked".into();
                t.title = "Final".into();
                t.end_date = Some(date(3));
                t.end_time = NaiveTime::from_hms_opt(17, 0, 0);
            })
            .unwrap();
        assert_eq!(edited.id, task.id);
        assert_eq!(edited.title, "Final");
        assert_eq!(edited.created_at, task.created_at);
    }

    #[test]
    fn delete_removes_by_id() {
        let mut store = TaskStore::default();
        let a = store.create(TaskDraft::new("A"), Utc::now()).unwrap();
        let b = store.create(TaskDraft::new("B"), Utc::now()).unwrap();
        store.delete(&a.id).unwrap();
        assert_eq!(store.task_snapshot(), vec![b]);
        assert!(store.delete(&a.id).is_err());
    }

    #[test]
    fn store_serializes_as_plain_array() {
        let store = TaskStore::default();
        assert_eq!(serde_json::to_string(&store).unwrap(), "[]");
    }
}
