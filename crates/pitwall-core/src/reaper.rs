//! Periodic eviction of stale per-instance resources.
//!
//! Terminal instances keep their crash window briefly for post-mortem
//! inspection, then their whole registry record for a longer retrospective
//! period. The reaper runs both passes on a fixed interval against the
//! shared monitor. It is pure cleanup: it never changes a lifecycle status
//! and never touches a non-terminal instance, no matter how long that
//! instance has been silent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use crate::monitor::LogMonitor;
use crate::runtime::lock_monitor;

/// Summary of a single reaper sweep.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SweepReport {
    /// Crash windows evicted from terminal instances past the window grace.
    pub windows_evicted: usize,
    /// Registry entries (with their log entries) removed past the registry
    /// grace.
    pub instances_evicted: usize,
}

impl SweepReport {
    /// Whether the sweep evicted anything.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.windows_evicted == 0 && self.instances_evicted == 0
    }
}

/// Run the reaper loop until `shutdown` is signalled.
///
/// Intended to be spawned as a background `tokio::spawn` task next to the
/// event loop. An interval of zero disables the reaper entirely.
pub async fn run_reaper(
    monitor: Arc<Mutex<LogMonitor>>,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
) {
    if interval.is_zero() {
        info!("reaper disabled (reap_interval = 0)");
        return;
    }

    info!(interval_secs = interval.as_secs(), "reaper started");

    loop {
        tokio::time::sleep(interval).await;

        if shutdown.load(Ordering::Relaxed) {
            info!("reaper shutting down");
            break;
        }

        let report = lock_monitor(&monitor).sweep(Utc::now());

        if report.is_noop() {
            debug!("reaper sweep: nothing to evict");
        } else {
            info!(
                windows_evicted = report.windows_evicted,
                instances_evicted = report.instances_evicted,
                "reaper sweep evicted stale instance state"
            );
        }
    }
}
