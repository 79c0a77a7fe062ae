//! Bounded scan-event log, backed by `{data_dir}/nfc_pings.json`.
//!
//! The file holds a JSON array with the newest event last. Appends beyond
//! [`SCAN_LOG_CAP`] drop the oldest entries so the file cannot grow without
//! bound on a device that scans tags all day for years.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::scan::ScanAction;
use crate::store::TaskStatus;

/// Maximum number of retained scan events; oldest entries drop first.
pub const SCAN_LOG_CAP: usize = 1000;

/// One logged record of a tag-scan outcome. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanEvent {
    pub tag_id: String,
    pub action: ScanAction,
    pub task_title: Option<String>,
    pub task_index: Option<usize>,
    pub new_status: Option<TaskStatus>,
    pub reader: String,
    pub timestamp: DateTime<Utc>,
}

#[async_trait]
pub trait ScanLog: Send + Sync {
    /// Append one event, evicting the oldest entries beyond the cap.
    async fn append(&self, event: ScanEvent) -> Result<()>;
    /// The newest `limit` events, oldest first within the slice.
    async fn recent(&self, limit: usize) -> Result<Vec<ScanEvent>>;
}

/// Scan log backed by a capped JSON array on disk.
pub struct JsonScanLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonScanLog {
    pub fn new(data_dir: &Path) -> Self {
        JsonScanLog {
            path: data_dir.join("nfc_pings.json"),
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Vec<ScanEvent>> {
        super::read_json_or(&self.path, Vec::new()).await
    }
}

#[async_trait]
impl ScanLog for JsonScanLog {
    async fn append(&self, event: ScanEvent) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut events = self.load().await?;
        events.push(event);
        if events.len() > SCAN_LOG_CAP {
            let excess = events.len() - SCAN_LOG_CAP;
            events.drain(..excess);
        }
        super::write_json(&self.path, &events).await
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ScanEvent>> {
        let _guard = self.lock.lock().await;
        let events = self.load().await?;
        let start = events.len().saturating_sub(limit);
        Ok(events[start..].to_vec())
    }
}
