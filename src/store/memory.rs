//! In-memory store implementations.
//!
//! Same contracts as the JSON-file stores, minus the filesystem. The scan
//! engine's unit tests run against these, and they are handy for driving
//! the daemon in a scratch environment without a writable data directory.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use super::pings::{ScanEvent, ScanLog, SCAN_LOG_CAP};
use super::tasks::{self, NewTask, SortBy, Task, TaskStats, TaskStatus, TaskStore};
use super::TagMappingStore;

#[derive(Default)]
pub struct MemoryTaskStore {
    tasks: Mutex<Vec<Task>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        MemoryTaskStore::default()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn list(&self) -> Result<Vec<Task>> {
        Ok(self.tasks.lock().await.clone())
    }

    async fn get(&self, index: usize) -> Result<Option<Task>> {
        let tasks = self.tasks.lock().await;
        if index == 0 {
            return Ok(None);
        }
        Ok(tasks.get(index - 1).cloned())
    }

    async fn add(&self, new: NewTask) -> Result<Task> {
        Ok(tasks::push_task(&mut *self.tasks.lock().await, new))
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<Task>> {
        Ok(tasks::find_by_title(&self.tasks.lock().await, title).cloned())
    }

    async fn set_status(
        &self,
        index: usize,
        status: Option<TaskStatus>,
    ) -> Result<Option<TaskStatus>> {
        Ok(tasks::set_status_at(
            &mut self.tasks.lock().await,
            index,
            status,
        ))
    }

    async fn remove(&self, index: usize) -> Result<bool> {
        Ok(tasks::remove_at(&mut *self.tasks.lock().await, index).is_some())
    }

    async fn sort(&self, by: SortBy) -> Result<()> {
        tasks::sort_tasks(&mut self.tasks.lock().await, by);
        Ok(())
    }

    async fn stats(&self) -> Result<TaskStats> {
        Ok(tasks::compute_stats(&self.tasks.lock().await))
    }
}

#[derive(Default)]
pub struct MemoryMappingStore {
    mappings: Mutex<BTreeMap<String, String>>,
}

impl MemoryMappingStore {
    pub fn new() -> Self {
        MemoryMappingStore::default()
    }
}

#[async_trait]
impl TagMappingStore for MemoryMappingStore {
    async fn get(&self, tag_id: &str) -> Result<Option<String>> {
        Ok(self.mappings.lock().await.get(tag_id).cloned())
    }

    async fn upsert(&self, tag_id: &str, title: &str) -> Result<()> {
        self.mappings
            .lock()
            .await
            .insert(tag_id.to_string(), title.to_string());
        Ok(())
    }

    async fn remove(&self, tag_id: &str) -> Result<bool> {
        Ok(self.mappings.lock().await.remove(tag_id).is_some())
    }

    async fn list(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.mappings.lock().await.clone())
    }
}

#[derive(Default)]
pub struct MemoryScanLog {
    events: Mutex<Vec<ScanEvent>>,
}

impl MemoryScanLog {
    pub fn new() -> Self {
        MemoryScanLog::default()
    }
}

#[async_trait]
impl ScanLog for MemoryScanLog {
    async fn append(&self, event: ScanEvent) -> Result<()> {
        let mut events = self.events.lock().await;
        events.push(event);
        if events.len() > SCAN_LOG_CAP {
            let excess = events.len() - SCAN_LOG_CAP;
            events.drain(..excess);
        }
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ScanEvent>> {
        let events = self.events.lock().await;
        let start = events.len().saturating_sub(limit);
        Ok(events[start..].to_vec())
    }
}
