//! LED status output.
//!
//! The daemon reflects each task's status on an RGB LED: red for not
//! started, yellow for in progress, green for completed. Everything goes
//! through the [`StatusSink`] trait so the rest of the daemon neither knows
//! nor cares whether a real GPIO header is attached — off-hardware builds
//! and tests get [`NullSink`].

#[cfg(feature = "gpio")]
pub mod led;

use anyhow::Result;
use std::sync::Arc;
use tracing::warn;

use crate::config::HardwareConfig;
use crate::store::TaskStatus;

/// Best-effort status output. Implementations must be cheap enough to call
/// on every state change and must not panic on hardware faults.
pub trait StatusSink: Send + Sync {
    /// Reflect `status` for the task at 1-based `task_index`. Indexes with
    /// no corresponding output are ignored, not errors.
    fn apply(&self, task_index: usize, status: TaskStatus) -> Result<()>;

    /// Whether a real output device is attached (reported by `/api/health`).
    fn enabled(&self) -> bool;
}

/// Sink for machines without LEDs. Does nothing, fails never.
pub struct NullSink;

impl StatusSink for NullSink {
    fn apply(&self, _task_index: usize, _status: TaskStatus) -> Result<()> {
        Ok(())
    }

    fn enabled(&self) -> bool {
        false
    }
}

/// Pick the best available sink at startup.
///
/// With the `gpio` feature the configured LED bank is probed once; if the
/// GPIO peripheral is unavailable (not a Pi, `/dev/gpiomem` missing, no
/// permissions) the daemon logs a warning and runs with the no-op sink
/// rather than refusing to start.
pub fn detect(config: &HardwareConfig) -> Arc<dyn StatusSink> {
    if !config.enabled {
        return Arc::new(NullSink);
    }

    #[cfg(feature = "gpio")]
    {
        match led::GpioLedBank::new(&config.led_pins) {
            Ok(bank) => {
                tracing::info!(leds = config.led_pins.len(), "GPIO LED bank initialized");
                return Arc::new(bank);
            }
            Err(e) => warn!(err = %e, "GPIO unavailable — LED updates disabled"),
        }
    }
    #[cfg(not(feature = "gpio"))]
    tracing::info!("built without the gpio feature — LED updates disabled");

    Arc::new(NullSink)
}

/// Fire-and-forget a sink update off the request path. Failures are logged
/// and swallowed; a dead LED must never fail a scan.
pub fn dispatch(sink: &Arc<dyn StatusSink>, task_index: usize, status: TaskStatus) {
    let sink = Arc::clone(sink);
    tokio::spawn(async move {
        if let Err(e) = sink.apply(task_index, status) {
            warn!(task_index, err = %e, "LED update failed");
        }
    });
}
