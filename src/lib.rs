pub mod config;
pub mod hardware;
pub mod rest;
pub mod scan;
pub mod store;

use std::sync::Arc;

use config::DaemonConfig;
use hardware::StatusSink;
use scan::ScanEngine;
use store::{
    JsonMappingStore, JsonScanLog, JsonTaskStore, ScanLog, TagMappingStore, TaskStore,
};

/// Shared application state passed to every HTTP handler.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<DaemonConfig>,
    pub tasks: Arc<dyn TaskStore>,
    pub mappings: Arc<dyn TagMappingStore>,
    pub scan_log: Arc<dyn ScanLog>,
    pub sink: Arc<dyn StatusSink>,
    pub engine: Arc<ScanEngine>,
    pub started_at: std::time::Instant,
}

impl AppContext {
    /// Wire up the JSON-file stores under `config.data_dir` and the scan
    /// engine over them.
    pub fn new(config: Arc<DaemonConfig>, sink: Arc<dyn StatusSink>) -> Self {
        let tasks: Arc<dyn TaskStore> = Arc::new(JsonTaskStore::new(&config.data_dir));
        let mappings: Arc<dyn TagMappingStore> = Arc::new(JsonMappingStore::new(&config.data_dir));
        let scan_log: Arc<dyn ScanLog> = Arc::new(JsonScanLog::new(&config.data_dir));
        Self::with_stores(config, tasks, mappings, scan_log, sink)
    }

    /// Build over explicit store implementations (tests use the in-memory
    /// ones from [`store::memory`]).
    pub fn with_stores(
        config: Arc<DaemonConfig>,
        tasks: Arc<dyn TaskStore>,
        mappings: Arc<dyn TagMappingStore>,
        scan_log: Arc<dyn ScanLog>,
        sink: Arc<dyn StatusSink>,
    ) -> Self {
        let engine = Arc::new(ScanEngine::new(
            tasks.clone(),
            mappings.clone(),
            scan_log.clone(),
            sink.clone(),
        ));
        AppContext {
            config,
            tasks,
            mappings,
            scan_log,
            sink,
            engine,
            started_at: std::time::Instant::now(),
        }
    }
}
