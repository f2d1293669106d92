//! Owned async wrapper around the monitor.
//!
//! The core [`LogMonitor`](crate::monitor::LogMonitor) is synchronous; this
//! module supplies the plumbing an embedding launcher needs: an unbounded
//! event channel so the supervisor side never blocks, a single consumer task
//! that applies events in arrival order, and a background reaper task.
//!
//! ```text
//! Supervisor ──► UnboundedSender ──► event loop ──► LogMonitor
//!                                                      ▲
//!                                    reaper loop ──────┘
//! ```
//!
//! The event loop is the only writer on the hot path; snapshot reads from
//! the handle take the same lock briefly between events.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::MonitorConfig;
use crate::error::Result;
use crate::instance::Instance;
use crate::monitor::{LogExporter, LogMonitor, UiHint};
use crate::reaper::{SweepReport, run_reaper};
use crate::store::LogEntry;

/// Lock the shared monitor, recovering from a poisoned lock.
///
/// Monitor state is valid after any panic in a holder (all mutations are
/// single-step or re-entrant safe), so the poison flag carries no
/// information here.
pub(crate) fn lock_monitor(monitor: &Arc<Mutex<LogMonitor>>) -> MutexGuard<'_, LogMonitor> {
    monitor
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Handle to a running monitor: event sender, snapshot access, shutdown.
pub struct MonitorHandle {
    monitor: Arc<Mutex<LogMonitor>>,
    tx: mpsc::UnboundedSender<Value>,
    shutdown: Arc<AtomicBool>,
    event_task: JoinHandle<()>,
    reaper_task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Spawn the monitor with its event loop and reaper task.
    ///
    /// Fails only on invalid configuration or unparseable signature
    /// patterns; once running, nothing the supervisor sends can error.
    pub fn spawn(config: MonitorConfig, exporter: Box<dyn LogExporter>) -> Result<Self> {
        let reap_interval = config.reap_interval;
        let monitor = Arc::new(Mutex::new(LogMonitor::new(config, exporter)?));
        let shutdown = Arc::new(AtomicBool::new(false));

        let (tx, mut rx) = mpsc::unbounded_channel::<Value>();

        let event_monitor = Arc::clone(&monitor);
        let event_task = tokio::spawn(async move {
            while let Some(value) = rx.recv().await {
                lock_monitor(&event_monitor).handle_json(&value);
            }
            debug!("event loop finished, channel closed");
        });

        let reaper_task = tokio::spawn(run_reaper(
            Arc::clone(&monitor),
            reap_interval,
            Arc::clone(&shutdown),
        ));

        info!("monitor runtime started");
        Ok(Self {
            monitor,
            tx,
            shutdown,
            event_task,
            reaper_task,
        })
    }

    /// A cloneable sender for raw supervisor payloads. Sending never blocks;
    /// events are applied strictly in send order.
    #[must_use]
    pub fn sender(&self) -> mpsc::UnboundedSender<Value> {
        self.tx.clone()
    }

    // ========================================================================
    // Delegated operations
    // ========================================================================

    /// Engage the ingress gate. See [`LogMonitor::pause`].
    pub fn pause(&self) {
        lock_monitor(&self.monitor).pause();
    }

    /// Release the ingress gate and replay buffered events.
    pub fn resume(&self) {
        lock_monitor(&self.monitor).resume();
    }

    /// Export logs through the configured exporter.
    pub fn export_logs(&self, instance_id: Option<&str>) {
        lock_monitor(&self.monitor).export_logs(instance_id);
    }

    /// Clear retained log entries, scoped or global.
    pub fn clear_logs(&self, instance_id: Option<&str>) {
        lock_monitor(&self.monitor).clear_logs(instance_id);
    }

    /// Remove an instance and everything attributed to it.
    pub fn remove_instance(&self, instance_id: &str) {
        lock_monitor(&self.monitor).remove_instance(instance_id);
    }

    /// Run one reaper sweep immediately, outside the background schedule.
    pub fn sweep_now(&self) -> SweepReport {
        lock_monitor(&self.monitor).sweep(chrono::Utc::now())
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// Snapshot of all tracked instances, oldest launch first.
    #[must_use]
    pub fn instances(&self) -> Vec<Instance> {
        lock_monitor(&self.monitor).instances()
    }

    /// Snapshot of one instance.
    #[must_use]
    pub fn instance(&self, instance_id: &str) -> Option<Instance> {
        lock_monitor(&self.monitor).instance(instance_id)
    }

    /// Game output entries for an instance.
    #[must_use]
    pub fn game_logs(&self, instance_id: &str) -> Vec<LogEntry> {
        lock_monitor(&self.monitor).game_logs(instance_id)
    }

    /// Launcher entries, instance-scoped or global.
    #[must_use]
    pub fn launcher_logs(&self, instance_id: Option<&str>) -> Vec<LogEntry> {
        lock_monitor(&self.monitor).launcher_logs(instance_id)
    }

    /// Whether the ingress gate is engaged.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        lock_monitor(&self.monitor).is_paused()
    }

    /// Drain pending UI hints, oldest first.
    #[must_use]
    pub fn drain_ui_hints(&self) -> Vec<UiHint> {
        lock_monitor(&self.monitor).drain_ui_hints()
    }

    // ========================================================================
    // Shutdown
    // ========================================================================

    /// Stop both background tasks. Events already queued on the channel are
    /// drained and applied before the event loop exits.
    pub async fn shutdown(self) {
        self.shutdown.store(true, Ordering::Relaxed);
        drop(self.tx);
        let _ = self.event_task.await;
        self.reaper_task.abort();
        let _ = self.reaper_task.await;
        info!("monitor runtime stopped");
    }
}
