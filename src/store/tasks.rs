//! Task records and the task store.
//!
//! Tasks live in `{data_dir}/tasks.json` as an ordered array. A task's `id`
//! is its 1-based position in that array and is renumbered after every
//! delete or sort — positions, not identities, which is what the LED bank
//! and the scan responses key on.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::sync::Mutex;

// ─── Status ───────────────────────────────────────────────────────────────────

/// Three-value task progress cycle, stored on the wire as `0 | 1 | 2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl TaskStatus {
    /// Advance one step around the cycle: 0 → 1 → 2 → 0.
    pub fn next(self) -> TaskStatus {
        match self {
            TaskStatus::NotStarted => TaskStatus::InProgress,
            TaskStatus::InProgress => TaskStatus::Completed,
            TaskStatus::Completed => TaskStatus::NotStarted,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "Not Started",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
        }
    }
}

impl From<TaskStatus> for u8 {
    fn from(s: TaskStatus) -> u8 {
        match s {
            TaskStatus::NotStarted => 0,
            TaskStatus::InProgress => 1,
            TaskStatus::Completed => 2,
        }
    }
}

impl TryFrom<u8> for TaskStatus {
    type Error = String;

    fn try_from(v: u8) -> Result<TaskStatus, String> {
        match v {
            0 => Ok(TaskStatus::NotStarted),
            1 => Ok(TaskStatus::InProgress),
            2 => Ok(TaskStatus::Completed),
            other => Err(format!("invalid task status {other} (expected 0, 1, or 2)")),
        }
    }
}

// ─── Task ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// 1-based position in the store; 0 on subtasks, which are not addressable.
    #[serde(default)]
    pub id: usize,
    pub title: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: u8,
    #[serde(default)]
    pub effort: u8,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub has_subtasks: bool,
    #[serde(default)]
    pub subtasks: Vec<Task>,
}

/// Fields a caller may supply when creating a task; everything else is filled in.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub priority: u8,
    #[serde(default)]
    pub effort: u8,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        NewTask {
            title: title.into(),
            ..NewTask::default()
        }
    }
}

// ─── Sorting & stats ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    Priority,
    DueDate,
    Effort,
    Status,
    Title,
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<SortBy, String> {
        match s {
            "priority" => Ok(SortBy::Priority),
            "due_date" => Ok(SortBy::DueDate),
            "effort" => Ok(SortBy::Effort),
            "status" => Ok(SortBy::Status),
            "title" => Ok(SortBy::Title),
            other => Err(format!("unknown sort criterion: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub not_started: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub has_subtasks: usize,
    pub overdue: usize,
}

// ─── List operations ──────────────────────────────────────────────────────────
//
// Pure functions over the task vector, shared by the JSON and in-memory
// store implementations.

pub(crate) fn renumber(tasks: &mut [Task]) {
    for (i, task) in tasks.iter_mut().enumerate() {
        task.id = i + 1;
    }
}

pub(crate) fn push_task(tasks: &mut Vec<Task>, new: NewTask) -> Task {
    let now = Utc::now();
    let task = Task {
        id: tasks.len() + 1,
        title: new.title,
        status: TaskStatus::NotStarted,
        priority: new.priority,
        effort: new.effort,
        due_date: new.due_date,
        created_at: now,
        updated_at: now,
        has_subtasks: false,
        subtasks: Vec::new(),
    };
    tasks.push(task.clone());
    task
}

/// Find a task by title, case-insensitively and ignoring surrounding
/// whitespace. First match wins.
pub(crate) fn find_by_title<'a>(tasks: &'a [Task], title: &str) -> Option<&'a Task> {
    let needle = title.trim().to_lowercase();
    tasks
        .iter()
        .find(|t| t.title.trim().to_lowercase() == needle)
}

/// Set or cycle the status of the task at 1-based `index`. Returns the new
/// status, or `None` when the index is out of range.
pub(crate) fn set_status_at(
    tasks: &mut [Task],
    index: usize,
    status: Option<TaskStatus>,
) -> Option<TaskStatus> {
    let task = checked_get_mut(tasks, index)?;
    task.status = match status {
        Some(s) => s,
        None => task.status.next(),
    };
    task.updated_at = Utc::now();
    Some(task.status)
}

pub(crate) fn remove_at(tasks: &mut Vec<Task>, index: usize) -> Option<Task> {
    if index == 0 || index > tasks.len() {
        return None;
    }
    let removed = tasks.remove(index - 1);
    renumber(tasks);
    Some(removed)
}

pub(crate) fn sort_tasks(tasks: &mut [Task], by: SortBy) {
    match by {
        SortBy::Priority => tasks.sort_by(|a, b| b.priority.cmp(&a.priority)),
        // Undated tasks sink to the end.
        SortBy::DueDate => tasks.sort_by(|a, b| match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }),
        SortBy::Effort => tasks.sort_by_key(|t| t.effort),
        SortBy::Status => tasks.sort_by_key(|t| u8::from(t.status)),
        SortBy::Title => tasks.sort_by_key(|t| t.title.to_lowercase()),
    }
    renumber(tasks);
}

pub(crate) fn compute_stats(tasks: &[Task]) -> TaskStats {
    let today = Utc::now().date_naive();
    let mut stats = TaskStats {
        total: tasks.len(),
        ..TaskStats::default()
    };
    for task in tasks {
        match task.status {
            TaskStatus::NotStarted => stats.not_started += 1,
            TaskStatus::InProgress => stats.in_progress += 1,
            TaskStatus::Completed => stats.completed += 1,
        }
        if task.has_subtasks {
            stats.has_subtasks += 1;
        }
        if let Some(due) = task.due_date {
            if due < today && task.status != TaskStatus::Completed {
                stats.overdue += 1;
            }
        }
    }
    stats
}

fn checked_get_mut(tasks: &mut [Task], index: usize) -> Option<&mut Task> {
    if index == 0 {
        return None;
    }
    tasks.get_mut(index - 1)
}

// ─── TaskStore ────────────────────────────────────────────────────────────────

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Task>>;
    async fn get(&self, index: usize) -> Result<Option<Task>>;
    /// Append a new task at status 0 and return it with its assigned id.
    async fn add(&self, new: NewTask) -> Result<Task>;
    async fn find_by_title(&self, title: &str) -> Result<Option<Task>>;
    /// Set the status of the task at `index`, or cycle it when `status` is
    /// `None`. Returns the new status, or `None` when no such task exists.
    async fn set_status(&self, index: usize, status: Option<TaskStatus>)
        -> Result<Option<TaskStatus>>;
    /// Remove the task at `index`, renumbering the remainder.
    async fn remove(&self, index: usize) -> Result<bool>;
    async fn sort(&self, by: SortBy) -> Result<()>;
    async fn stats(&self) -> Result<TaskStats>;
}

// ─── JSON-file implementation ─────────────────────────────────────────────────

/// Task store backed by `{data_dir}/tasks.json`.
///
/// Each operation re-reads the file, applies the change, and rewrites it,
/// serialized behind the store's mutex.
pub struct JsonTaskStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonTaskStore {
    pub fn new(data_dir: &Path) -> Self {
        JsonTaskStore {
            path: data_dir.join("tasks.json"),
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Vec<Task>> {
        super::read_json_or(&self.path, Vec::new()).await
    }

    async fn persist(&self, tasks: &[Task]) -> Result<()> {
        super::write_json(&self.path, &tasks).await
    }
}

#[async_trait]
impl TaskStore for JsonTaskStore {
    async fn list(&self) -> Result<Vec<Task>> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    async fn get(&self, index: usize) -> Result<Option<Task>> {
        let _guard = self.lock.lock().await;
        let tasks = self.load().await?;
        if index == 0 {
            return Ok(None);
        }
        Ok(tasks.get(index - 1).cloned())
    }

    async fn add(&self, new: NewTask) -> Result<Task> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.load().await?;
        let task = push_task(&mut tasks, new);
        self.persist(&tasks).await?;
        tracing::info!(title = %task.title, id = task.id, "task added");
        Ok(task)
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<Task>> {
        let _guard = self.lock.lock().await;
        let tasks = self.load().await?;
        Ok(find_by_title(&tasks, title).cloned())
    }

    async fn set_status(
        &self,
        index: usize,
        status: Option<TaskStatus>,
    ) -> Result<Option<TaskStatus>> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.load().await?;
        let new_status = set_status_at(&mut tasks, index, status);
        if let Some(s) = new_status {
            self.persist(&tasks).await?;
            tracing::info!(id = index, status = u8::from(s), "task status updated");
        }
        Ok(new_status)
    }

    async fn remove(&self, index: usize) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.load().await?;
        match remove_at(&mut tasks, index) {
            Some(removed) => {
                self.persist(&tasks).await?;
                tracing::info!(title = %removed.title, "task removed");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn sort(&self, by: SortBy) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.load().await?;
        sort_tasks(&mut tasks, by);
        self.persist(&tasks).await
    }

    async fn stats(&self) -> Result<TaskStats> {
        let _guard = self.lock.lock().await;
        let tasks = self.load().await?;
        Ok(compute_stats(&tasks))
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
