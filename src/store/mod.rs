//! Flat-file JSON persistence for tasks, tag mappings, and the scan log.
//!
//! Every store is a trait so the scan engine and the HTTP handlers never
//! touch the filesystem directly — tests swap in the [`memory`] variants.
//! The production implementations re-read and rewrite their backing file on
//! every operation, each behind its own `tokio::sync::Mutex`. There is no
//! cross-store transaction: a scan and a concurrent task delete can still
//! interleave between files, same as the single-process design this grew
//! out of.

pub mod mappings;
pub mod memory;
pub mod pings;
pub mod tasks;

pub use mappings::{JsonMappingStore, TagMappingStore};
pub use pings::{JsonScanLog, ScanEvent, ScanLog, SCAN_LOG_CAP};
pub use tasks::{JsonTaskStore, NewTask, SortBy, Task, TaskStats, TaskStatus, TaskStore};

use anyhow::{Context as _, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;

/// Read a JSON file, returning `default` when the file does not exist.
///
/// A file that exists but fails to parse is an error — silently resetting a
/// store would let the next rewrite destroy whatever the user had on disk.
pub(crate) async fn read_json_or<T: DeserializeOwned>(path: &Path, default: T) -> Result<T> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(default),
        Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
    }
}

/// Serialize `value` as pretty-printed JSON and rewrite `path` in place,
/// creating the parent directory on first write.
pub(crate) async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let contents = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}
