//! The event-processing core: instance registry, ingress gate, and dispatch.
//!
//! `LogMonitor` is a synchronous, single-logical-path component: events are
//! handled in arrival order, non-reentrant, with no I/O on the processing
//! path. Every step (classification, window append, signature matching) is
//! bounded-time, so the producer of log lines is never blocked. The async
//! wrapper in [`runtime`](crate::runtime) owns the channel plumbing; this
//! type owns the semantics.
//!
//! Per-instance state (registry record + crash window) lives in one arena
//! keyed by instance id so the two are always created and evicted together.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::classify::{LogLevel, classify};
use crate::config::MonitorConfig;
use crate::error::Result;
use crate::events::{LauncherLogMessage, ProcessPayload, SupervisorEvent};
use crate::instance::{Instance, InstanceStatus};
use crate::reaper::SweepReport;
use crate::signatures::{SignatureSet, crash_summary};
use crate::store::{LogEntry, LogSource, LogStore};
use crate::window::CrashWindow;

// =============================================================================
// Export seam
// =============================================================================

/// External collaborator that persists log entries (to disk, a support
/// bundle, etc). The monitor never does the I/O itself; failures are
/// surfaced as a single error-level log entry and never propagate.
pub trait LogExporter: Send {
    fn export(&self, instance_id: Option<&str>, entries: &[LogEntry]) -> Result<()>;
}

/// Exporter that discards everything. Useful for embedders that only read
/// snapshots, and for tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullExporter;

impl LogExporter for NullExporter {
    fn export(&self, _instance_id: Option<&str>, _entries: &[LogEntry]) -> Result<()> {
        Ok(())
    }
}

// =============================================================================
// UI hints
// =============================================================================

/// Pass-through hint for the presentation layer, produced by
/// `navigate-to-logs` events. Detection logic never depends on these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiHint {
    pub instance_id: String,
    pub reason: String,
}

// =============================================================================
// Monitor
// =============================================================================

/// Per-instance arena slot: the registry record and its crash window.
#[derive(Debug)]
struct InstanceEntry {
    instance: Instance,
    window: Option<CrashWindow>,
}

/// A payload buffered behind the ingress gate, with its arrival timestamp.
/// Raw payloads stay unparsed while buffered; even the malformed-event error
/// entry waits for replay.
#[derive(Debug)]
enum Pending {
    Raw(Value),
    Typed(SupervisorEvent),
}

/// The log ingestion, classification, and crash-detection core.
pub struct LogMonitor {
    config: MonitorConfig,
    signatures: SignatureSet,
    registry: HashMap<String, InstanceEntry>,
    store: LogStore,
    paused: bool,
    queue: VecDeque<(Pending, DateTime<Utc>)>,
    ui_hints: VecDeque<UiHint>,
    exporter: Box<dyn LogExporter>,
}

impl LogMonitor {
    /// Create a monitor from a validated configuration and an export seam.
    pub fn new(config: MonitorConfig, exporter: Box<dyn LogExporter>) -> Result<Self> {
        config.validate()?;
        let signatures = SignatureSet::compile(&config.signature_patterns)?;
        let store = LogStore::new(config.max_memory_logs);
        Ok(Self {
            config,
            signatures,
            registry: HashMap::new(),
            store,
            paused: false,
            queue: VecDeque::new(),
            ui_hints: VecDeque::new(),
            exporter,
        })
    }

    /// Monitor with default configuration and a discarding exporter.
    pub fn with_defaults() -> Result<Self> {
        Self::new(MonitorConfig::default(), Box::new(NullExporter))
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    // ========================================================================
    // Ingress
    // ========================================================================

    /// Handle a raw supervisor payload at the current time. Malformed input
    /// is logged once as a global error-level entry and discarded; it never
    /// propagates and never leaves an instance inconsistent.
    pub fn handle_json(&mut self, value: &Value) {
        self.handle_json_at(value, Utc::now());
    }

    /// Handle a raw supervisor payload with an explicit timestamp.
    ///
    /// While paused, the payload is buffered unparsed, so malformed input
    /// cannot touch the store until [`resume`](Self::resume) replays it.
    pub fn handle_json_at(&mut self, value: &Value, now: DateTime<Utc>) {
        if self.paused {
            self.queue.push_back((Pending::Raw(value.clone()), now));
            return;
        }
        match SupervisorEvent::from_json(value) {
            Ok(event) => self.dispatch(event, now),
            Err(e) => self.record_malformed(&e, now),
        }
    }

    /// Handle a typed event at the current time.
    pub fn handle(&mut self, event: SupervisorEvent) {
        self.handle_at(event, Utc::now());
    }

    /// Handle a typed event with an explicit timestamp.
    ///
    /// While paused, the event is buffered verbatim with its arrival
    /// timestamp; it is replayed through the same dispatch path, stamped
    /// with that timestamp, on [`resume`](Self::resume).
    pub fn handle_at(&mut self, event: SupervisorEvent, now: DateTime<Utc>) {
        if self.paused {
            self.queue.push_back((Pending::Typed(event), now));
            return;
        }
        self.dispatch(event, now);
    }

    /// Engage the ingress gate: subsequent payloads are buffered, not
    /// processed, so a caller can take a frozen snapshot without racing new
    /// arrivals. Nothing reaches the registry or the store while paused.
    /// Never drops data, never fails.
    pub fn pause(&mut self) {
        if !self.paused {
            debug!("ingress gate paused");
            self.paused = true;
        }
    }

    /// Release the ingress gate and synchronously replay every buffered
    /// payload, in original arrival order and with its original arrival
    /// timestamp, before any new live event is accepted.
    pub fn resume(&mut self) {
        if !self.paused {
            return;
        }
        self.paused = false;
        let replayed = self.queue.len();
        while let Some((pending, now)) = self.queue.pop_front() {
            match pending {
                Pending::Typed(event) => self.dispatch(event, now),
                Pending::Raw(value) => match SupervisorEvent::from_json(&value) {
                    Ok(event) => self.dispatch(event, now),
                    Err(e) => self.record_malformed(&e, now),
                },
            }
        }
        if replayed > 0 {
            debug!(replayed, "ingress gate resumed, queue replayed");
        }
    }

    fn record_malformed(&mut self, error: &crate::Error, now: DateTime<Utc>) {
        warn!(error = %error, "discarding malformed supervisor event");
        self.append_global_error(format!("failed to parse supervisor event: {error}"), now);
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    fn dispatch(&mut self, event: SupervisorEvent, now: DateTime<Utc>) {
        match event {
            SupervisorEvent::ProcessLaunched {
                instance_id,
                profile_name,
                installation_path,
            } => self.on_launched(instance_id, profile_name, installation_path, now),
            SupervisorEvent::ProcessEvent {
                instance_id,
                payload,
            } => self.on_process_event(&instance_id, payload, now),
            SupervisorEvent::LauncherLog(message) => self.route_launcher_log(message, now),
            SupervisorEvent::LauncherLogBatch(messages) => {
                // Batches coalesce into the same store path as singletons.
                for message in messages {
                    self.route_launcher_log(message, now);
                }
            }
            SupervisorEvent::NavigateToLogs {
                instance_id,
                reason,
            } => self.ui_hints.push_back(UiHint {
                instance_id,
                reason,
            }),
        }
    }

    fn on_launched(
        &mut self,
        instance_id: String,
        profile_name: String,
        installation_path: String,
        now: DateTime<Utc>,
    ) {
        if let Some(entry) = self.registry.get_mut(&instance_id) {
            warn!(instance_id, "duplicate process-launched event ignored");
            entry.instance.touch(now);
            return;
        }
        info!(instance_id, profile_name, "instance registered");
        let instance = Instance::new(instance_id.clone(), profile_name, installation_path, now);
        self.registry.insert(
            instance_id,
            InstanceEntry {
                instance,
                window: None,
            },
        );
    }

    fn on_process_event(&mut self, instance_id: &str, payload: ProcessPayload, now: DateTime<Utc>) {
        if !self.registry.contains_key(instance_id) {
            warn!(instance_id, "event for unknown instance discarded");
            self.append_global_error(
                format!("received process event for unknown instance `{instance_id}`"),
                now,
            );
            return;
        }
        match payload {
            ProcessPayload::Started { pid } => {
                // Scoped borrow: started never touches the store.
                if let Some(entry) = self.registry.get_mut(instance_id) {
                    if entry.instance.mark_started(pid, now) {
                        info!(instance_id, pid, "instance running");
                    } else {
                        warn!(instance_id, pid, "started event in invalid state ignored");
                    }
                }
            }
            ProcessPayload::Output { line } | ProcessPayload::ErrorLine { line } => {
                self.on_output_line(instance_id, &line, now);
            }
            ProcessPayload::Exit { code } => {
                if let Some(entry) = self.registry.get_mut(instance_id) {
                    match entry
                        .instance
                        .record_exit(code, &self.config.stop_exit_codes, now)
                    {
                        Some(status) => {
                            info!(instance_id, exit_code = code, status = %status, "instance exited");
                        }
                        None => {
                            debug!(instance_id, exit_code = code, "exit event absorbed");
                        }
                    }
                }
            }
        }
    }

    /// The classification/windowing/detection path for one game output line.
    fn on_output_line(&mut self, instance_id: &str, line: &str, now: DateTime<Utc>) {
        let level = classify(line);
        self.store.append(LogEntry {
            timestamp: now,
            level,
            message: line.to_string(),
            instance_id: Some(instance_id.to_string()),
            source: LogSource::Game,
        });

        let window_capacity = self.config.window_capacity;
        let Some(entry) = self.registry.get_mut(instance_id) else {
            return;
        };
        entry.instance.touch(now);

        // Window is created lazily on the first output line.
        let window = entry
            .window
            .get_or_insert_with(|| CrashWindow::new(window_capacity));
        window.append(line);

        // Detection only fires for running instances; terminal states absorb.
        if entry.instance.status != InstanceStatus::Running {
            return;
        }
        let Some(signature) = self.signatures.first_match(&window.context()) else {
            return;
        };
        if !entry.instance.mark_crashed(now) {
            return;
        }
        warn!(instance_id, signature, "crash detected in output window");
        let tail = window.tail(self.config.summary_tail_lines);
        let summary = crash_summary(&tail, self.config.summary_max_chars);
        self.store.append(LogEntry {
            timestamp: now,
            level: LogLevel::Error,
            message: format!("game crashed (matched signature `{signature}`):\n{summary}"),
            instance_id: Some(instance_id.to_string()),
            source: LogSource::Launcher,
        });
    }

    fn route_launcher_log(&mut self, message: LauncherLogMessage, now: DateTime<Utc>) {
        if let Some(id) = message.instance_id.as_deref() {
            if let Some(entry) = self.registry.get_mut(id) {
                entry.instance.touch(now);
            }
        }
        self.store.append(LogEntry {
            timestamp: now,
            level: message.level,
            message: message.message,
            instance_id: message.instance_id,
            source: LogSource::Launcher,
        });
    }

    fn append_global_error(&mut self, message: String, now: DateTime<Utc>) {
        self.store.append(LogEntry {
            timestamp: now,
            level: LogLevel::Error,
            message,
            instance_id: None,
            source: LogSource::Launcher,
        });
    }

    // ========================================================================
    // Presentation operations
    // ========================================================================

    /// Delegate persistence of the scoped entries to the export
    /// collaborator. Failure is reported as a single error-level entry;
    /// this never throws to the caller and never affects ingestion.
    pub fn export_logs(&mut self, instance_id: Option<&str>) {
        let entries = match instance_id {
            Some(id) => self.store.all_for_instance(id),
            None => self.store.all(),
        };
        if let Err(e) = self.exporter.export(instance_id, &entries) {
            warn!(error = %e, "log export failed");
            self.append_global_error(format!("log export failed: {e}"), Utc::now());
        } else {
            info!(exported = entries.len(), "logs exported");
        }
    }

    /// Clear the log store, scoped to one instance or globally. Registry
    /// status is unaffected.
    pub fn clear_logs(&mut self, instance_id: Option<&str>) {
        self.store.clear(instance_id);
    }

    /// Explicit external removal of an instance: registry entry, crash
    /// window, and log entries all go together.
    pub fn remove_instance(&mut self, instance_id: &str) {
        if self.registry.remove(instance_id).is_some() {
            self.store.remove_instance(instance_id);
            info!(instance_id, "instance removed");
        }
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// Snapshot of all tracked instances, oldest launch first.
    #[must_use]
    pub fn instances(&self) -> Vec<Instance> {
        let mut all: Vec<Instance> = self
            .registry
            .values()
            .map(|e| e.instance.clone())
            .collect();
        all.sort_by(|a, b| a.launched_at.cmp(&b.launched_at).then(a.id.cmp(&b.id)));
        all
    }

    /// Snapshot of one instance.
    #[must_use]
    pub fn instance(&self, instance_id: &str) -> Option<Instance> {
        self.registry.get(instance_id).map(|e| e.instance.clone())
    }

    /// Game output entries for an instance.
    #[must_use]
    pub fn game_logs(&self, instance_id: &str) -> Vec<LogEntry> {
        self.store.for_instance(instance_id, LogSource::Game)
    }

    /// Launcher entries: instance-scoped when an id is given, otherwise the
    /// launcher-global stream.
    #[must_use]
    pub fn launcher_logs(&self, instance_id: Option<&str>) -> Vec<LogEntry> {
        match instance_id {
            Some(id) => self.store.for_instance(id, LogSource::Launcher),
            None => self.store.global(),
        }
    }

    /// Whether the ingress gate is engaged.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Number of events buffered behind the gate.
    #[must_use]
    pub fn queued_events(&self) -> usize {
        self.queue.len()
    }

    /// Whether an instance currently holds a crash window.
    #[must_use]
    pub fn has_window(&self, instance_id: &str) -> bool {
        self.registry
            .get(instance_id)
            .is_some_and(|e| e.window.is_some())
    }

    /// Total retained log entries.
    #[must_use]
    pub fn log_count(&self) -> usize {
        self.store.len()
    }

    /// Drain pending UI hints, oldest first.
    pub fn drain_ui_hints(&mut self) -> Vec<UiHint> {
        self.ui_hints.drain(..).collect()
    }

    // ========================================================================
    // Reaper sweep
    // ========================================================================

    /// One reaper sweep at `now`. Two independent passes, both pure cleanup:
    /// crash windows of terminal instances idle past the short grace are
    /// evicted, and terminal instances idle past the long grace are removed
    /// from the registry and store entirely. Non-terminal instances are
    /// never touched, regardless of inactivity.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        for entry in self.registry.values_mut() {
            if entry.instance.status.is_terminal()
                && entry.window.is_some()
                && older_than(entry.instance.last_activity, now, self.config.window_grace)
            {
                entry.window = None;
                report.windows_evicted += 1;
            }
        }

        let expired: Vec<String> = self
            .registry
            .values()
            .filter(|e| {
                e.instance.status.is_terminal()
                    && older_than(e.instance.last_activity, now, self.config.registry_grace)
            })
            .map(|e| e.instance.id.clone())
            .collect();
        for id in expired {
            self.registry.remove(&id);
            self.store.remove_instance(&id);
            report.instances_evicted += 1;
        }

        report
    }
}

fn older_than(
    last_activity: DateTime<Utc>,
    now: DateTime<Utc>,
    grace: std::time::Duration,
) -> bool {
    let grace = chrono::TimeDelta::from_std(grace).unwrap_or(chrono::TimeDelta::MAX);
    now.signed_duration_since(last_activity) > grace
}
