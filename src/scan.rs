//! The scan handler: what happens when an NFC tag is presented.
//!
//! Four outcomes, resolved in order:
//! 1. tag mapped, task exists        → cycle its status (`task_incremented`)
//! 2. tag mapped, task gone          → recreate it at status 0 (`task_created_remapped`)
//! 3. tag unmapped, title supplied   → create/find the task and map the tag
//!                                     (`task_created_and_mapped`)
//! 4. tag unmapped, no title         → `unmapped_tag`, nothing is written
//!
//! After the stores are updated the LED sink is notified on a spawned task,
//! so a wedged GPIO write can never hold up the HTTP response.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::hardware::StatusSink;
use crate::store::{NewTask, ScanEvent, ScanLog, TagMappingStore, TaskStatus, TaskStore};

/// Reader name recorded when the scan request does not carry one.
pub const DEFAULT_READER: &str = "api";

// ─── Request / outcome types ──────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ScanRequest {
    pub tag_id: String,
    pub task_title: Option<String>,
    pub reader: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanAction {
    TaskIncremented,
    TaskCreatedRemapped,
    TaskCreatedAndMapped,
}

impl ScanAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ScanAction::TaskIncremented => "task_incremented",
            ScanAction::TaskCreatedRemapped => "task_created_remapped",
            ScanAction::TaskCreatedAndMapped => "task_created_and_mapped",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    pub action: ScanAction,
    pub tag_id: String,
    pub task_title: String,
    pub task_index: usize,
    pub new_status: TaskStatus,
    /// True when this scan created the task (drives the 201 response).
    pub created: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("tag_id must be a non-empty string")]
    EmptyTag,
    #[error("tag {0} is not mapped to a task; supply task_title to create one")]
    UnmappedTag(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

// ─── Engine ───────────────────────────────────────────────────────────────────

/// Resolves scans against the three stores and notifies the LED sink.
pub struct ScanEngine {
    tasks: Arc<dyn TaskStore>,
    mappings: Arc<dyn TagMappingStore>,
    scan_log: Arc<dyn ScanLog>,
    sink: Arc<dyn StatusSink>,
}

impl ScanEngine {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        mappings: Arc<dyn TagMappingStore>,
        scan_log: Arc<dyn ScanLog>,
        sink: Arc<dyn StatusSink>,
    ) -> Self {
        ScanEngine {
            tasks,
            mappings,
            scan_log,
            sink,
        }
    }

    pub async fn scan(&self, req: ScanRequest) -> Result<ScanOutcome, ScanError> {
        let tag_id = req.tag_id.trim().to_string();
        if tag_id.is_empty() {
            return Err(ScanError::EmptyTag);
        }
        let title = req
            .task_title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());
        let reader = req
            .reader
            .clone()
            .unwrap_or_else(|| DEFAULT_READER.to_string());

        let outcome = match self.mappings.get(&tag_id).await? {
            Some(stored_title) => {
                self.scan_mapped(&tag_id, &stored_title, title).await?
            }
            None => match title {
                Some(title) => self.scan_unmapped(&tag_id, title).await?,
                // No mapping, no title: refuse without touching any store.
                None => return Err(ScanError::UnmappedTag(tag_id)),
            },
        };

        self.scan_log
            .append(ScanEvent {
                tag_id: outcome.tag_id.clone(),
                action: outcome.action,
                task_title: Some(outcome.task_title.clone()),
                task_index: Some(outcome.task_index),
                new_status: Some(outcome.new_status),
                reader,
                timestamp: chrono::Utc::now(),
            })
            .await?;

        crate::hardware::dispatch(&self.sink, outcome.task_index, outcome.new_status);
        Ok(outcome)
    }

    /// Cases 1 and 2: the tag already has a mapping.
    async fn scan_mapped(
        &self,
        tag_id: &str,
        stored_title: &str,
        supplied_title: Option<&str>,
    ) -> Result<ScanOutcome, ScanError> {
        if let Some(task) = self.tasks.find_by_title(stored_title).await? {
            if let Some(new_status) = self.tasks.set_status(task.id, None).await? {
                return Ok(ScanOutcome {
                    action: ScanAction::TaskIncremented,
                    tag_id: tag_id.to_string(),
                    task_title: task.title,
                    task_index: task.id,
                    new_status,
                    created: false,
                });
            }
        }

        // The mapped task is gone — recreate it so the mapping invariant
        // holds again. A supplied title wins over the stored one.
        let title = supplied_title.unwrap_or(stored_title);
        let task = self.tasks.add(NewTask::titled(title)).await?;
        if title != stored_title {
            self.mappings.upsert(tag_id, title).await?;
        }
        Ok(ScanOutcome {
            action: ScanAction::TaskCreatedRemapped,
            tag_id: tag_id.to_string(),
            task_title: task.title,
            task_index: task.id,
            new_status: task.status,
            created: true,
        })
    }

    /// Case 3: no mapping yet, but a title to work with.
    async fn scan_unmapped(&self, tag_id: &str, title: &str) -> Result<ScanOutcome, ScanError> {
        let (task_title, task_index, new_status, created) =
            match self.tasks.find_by_title(title).await? {
                Some(task) => {
                    let new_status = self
                        .tasks
                        .set_status(task.id, None)
                        .await?
                        .unwrap_or(task.status);
                    (task.title, task.id, new_status, false)
                }
                None => {
                    let task = self.tasks.add(NewTask::titled(title)).await?;
                    (task.title, task.id, task.status, true)
                }
            };
        self.mappings.upsert(tag_id, &task_title).await?;
        Ok(ScanOutcome {
            action: ScanAction::TaskCreatedAndMapped,
            tag_id: tag_id.to_string(),
            task_title,
            task_index,
            new_status,
            created,
        })
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
