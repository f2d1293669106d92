//! Instance records and the lifecycle state machine.
//!
//! Lifecycle: `Launching → Running → {Closed, Crashed, Stopped}`. Terminal
//! states are absorbing: once an instance closes, crashes, or is stopped, no
//! further status transition is permitted — later events only advance
//! `last_activity`. Exit data (exit code, completion time) is recorded at
//! most once, at the first terminal transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Status
// =============================================================================

/// Lifecycle state of a launched instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    /// Registered at launch intent, process not yet reported started.
    Launching,
    /// The supervisor reported the process started.
    Running,
    /// Exited with code 0.
    Closed,
    /// Crash detected, either via exit code or via signature match.
    Crashed,
    /// Exited with a known user/OS-initiated termination code.
    Stopped,
}

impl InstanceStatus {
    /// Whether this is an absorbing terminal state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Crashed | Self::Stopped)
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Launching => write!(f, "launching"),
            Self::Running => write!(f, "running"),
            Self::Closed => write!(f, "closed"),
            Self::Crashed => write!(f, "crashed"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

// =============================================================================
// Instance
// =============================================================================

/// One launched external process tracked by id.
///
/// Invariants: `last_activity >= launched_at` always; `completed_at` is set
/// if and only if the status is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Opaque stable identifier, assigned at launch intent time.
    pub id: String,
    /// Profile the instance was launched from. Immutable after creation.
    pub profile_name: String,
    /// Installation directory. Immutable after creation.
    pub installation_path: String,
    /// Current lifecycle status.
    pub status: InstanceStatus,
    /// OS process id, set only once the supervisor reports a start.
    pub process_id: Option<u32>,
    /// When the launch intent was registered.
    pub launched_at: DateTime<Utc>,
    /// Advanced on every output line or status update.
    pub last_activity: DateTime<Utc>,
    /// Set exactly once, at the first terminal transition.
    pub completed_at: Option<DateTime<Utc>>,
    /// Process exit code, recorded at most once from the exit event.
    pub exit_code: Option<i32>,
}

impl Instance {
    /// Register a new instance in the `Launching` state.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        profile_name: impl Into<String>,
        installation_path: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            profile_name: profile_name.into(),
            installation_path: installation_path.into(),
            status: InstanceStatus::Launching,
            process_id: None,
            launched_at: now,
            last_activity: now,
            completed_at: None,
            exit_code: None,
        }
    }

    /// Advance `last_activity`, never moving it backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_activity {
            self.last_activity = now;
        }
    }

    /// Handle a "process started" report. Valid only from `Launching`;
    /// anything else is a no-op apart from the activity bump.
    ///
    /// Returns whether the transition happened.
    pub fn mark_started(&mut self, pid: u32, now: DateTime<Utc>) -> bool {
        self.touch(now);
        if self.status != InstanceStatus::Launching {
            return false;
        }
        self.status = InstanceStatus::Running;
        self.process_id = Some(pid);
        true
    }

    /// Handle the exit event. Valid only from `Running`: code 0 closes,
    /// a configured stop code stops, anything else is a crash. Terminal
    /// instances only get the activity bump — exit data is never rewritten.
    ///
    /// Returns the terminal status reached, if a transition happened.
    pub fn record_exit(
        &mut self,
        code: i32,
        stop_exit_codes: &[i32],
        now: DateTime<Utc>,
    ) -> Option<InstanceStatus> {
        self.touch(now);
        if self.status != InstanceStatus::Running {
            return None;
        }
        let status = if code == 0 {
            InstanceStatus::Closed
        } else if stop_exit_codes.contains(&code) {
            InstanceStatus::Stopped
        } else {
            InstanceStatus::Crashed
        };
        self.status = status;
        self.exit_code = Some(code);
        self.completed_at = Some(now);
        Some(status)
    }

    /// Crash transition from the signature matcher. Fires only while
    /// `Running`; a second trigger for an already-terminal instance is a
    /// no-op and never re-fires.
    ///
    /// Returns whether the transition happened.
    pub fn mark_crashed(&mut self, now: DateTime<Utc>) -> bool {
        self.touch(now);
        if self.status != InstanceStatus::Running {
            return false;
        }
        self.status = InstanceStatus::Crashed;
        self.completed_at = Some(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn later(secs: i64) -> DateTime<Utc> {
        t0() + TimeDelta::seconds(secs)
    }

    // -- Creation ---------------------------------------------------------------

    #[test]
    fn new_instance_is_launching() {
        let inst = Instance::new("i1", "Vanilla 1.21", "/mc", t0());
        assert_eq!(inst.status, InstanceStatus::Launching);
        assert_eq!(inst.process_id, None);
        assert_eq!(inst.exit_code, None);
        assert_eq!(inst.completed_at, None);
        assert_eq!(inst.last_activity, inst.launched_at);
    }

    // -- Started ----------------------------------------------------------------

    #[test]
    fn started_moves_launching_to_running() {
        let mut inst = Instance::new("i1", "p", "/mc", t0());
        assert!(inst.mark_started(100, later(1)));
        assert_eq!(inst.status, InstanceStatus::Running);
        assert_eq!(inst.process_id, Some(100));
    }

    #[test]
    fn started_is_noop_when_already_running() {
        let mut inst = Instance::new("i1", "p", "/mc", t0());
        inst.mark_started(100, later(1));
        assert!(!inst.mark_started(200, later(2)));
        assert_eq!(inst.process_id, Some(100));
        assert_eq!(inst.last_activity, later(2));
    }

    // -- Exit disambiguation ----------------------------------------------------

    #[test]
    fn exit_zero_closes() {
        let mut inst = Instance::new("i1", "p", "/mc", t0());
        inst.mark_started(100, later(1));
        let status = inst.record_exit(0, &[130, 143], later(2));
        assert_eq!(status, Some(InstanceStatus::Closed));
        assert_eq!(inst.exit_code, Some(0));
        assert_eq!(inst.completed_at, Some(later(2)));
    }

    #[test]
    fn stop_code_stops_rather_than_crashes() {
        let mut inst = Instance::new("i2", "p", "/mc", t0());
        inst.mark_started(100, later(1));
        let status = inst.record_exit(130, &[130, 143], later(2));
        assert_eq!(status, Some(InstanceStatus::Stopped));
    }

    #[test]
    fn abnormal_exit_crashes() {
        let mut inst = Instance::new("i1", "p", "/mc", t0());
        inst.mark_started(100, later(1));
        let status = inst.record_exit(-1, &[130, 143], later(2));
        assert_eq!(status, Some(InstanceStatus::Crashed));
    }

    #[test]
    fn exit_while_launching_is_invalid_edge() {
        let mut inst = Instance::new("i1", "p", "/mc", t0());
        assert_eq!(inst.record_exit(0, &[], later(1)), None);
        assert_eq!(inst.status, InstanceStatus::Launching);
        assert_eq!(inst.exit_code, None);
        assert_eq!(inst.last_activity, later(1));
    }

    // -- Terminal states absorb -------------------------------------------------

    #[test]
    fn terminal_states_absorb_further_exits() {
        let mut inst = Instance::new("i1", "p", "/mc", t0());
        inst.mark_started(100, later(1));
        inst.record_exit(0, &[], later(2));
        assert_eq!(inst.record_exit(9, &[], later(3)), None);
        assert_eq!(inst.status, InstanceStatus::Closed);
        assert_eq!(inst.exit_code, Some(0));
        assert_eq!(inst.completed_at, Some(later(2)));
        assert_eq!(inst.last_activity, later(3));
    }

    #[test]
    fn crash_fires_once_from_running_only() {
        let mut inst = Instance::new("i1", "p", "/mc", t0());
        assert!(!inst.mark_crashed(later(1))); // still launching
        inst.mark_started(100, later(2));
        assert!(inst.mark_crashed(later(3)));
        assert!(!inst.mark_crashed(later(4))); // idempotent
        assert_eq!(inst.status, InstanceStatus::Crashed);
        assert_eq!(inst.completed_at, Some(later(3)));
    }

    #[test]
    fn exit_after_signature_crash_keeps_first_terminal_data() {
        let mut inst = Instance::new("i1", "p", "/mc", t0());
        inst.mark_started(100, later(1));
        inst.mark_crashed(later(2));
        assert_eq!(inst.record_exit(1, &[], later(3)), None);
        assert_eq!(inst.exit_code, None);
        assert_eq!(inst.completed_at, Some(later(2)));
    }

    // -- Invariants -------------------------------------------------------------

    #[test]
    fn touch_never_moves_activity_backwards() {
        let mut inst = Instance::new("i1", "p", "/mc", t0());
        inst.touch(later(10));
        inst.touch(later(5));
        assert_eq!(inst.last_activity, later(10));
        assert!(inst.last_activity >= inst.launched_at);
    }

    #[test]
    fn completed_at_set_iff_terminal() {
        let mut inst = Instance::new("i1", "p", "/mc", t0());
        assert!(inst.completed_at.is_none());
        inst.mark_started(100, later(1));
        assert!(inst.completed_at.is_none());
        inst.record_exit(143, &[143], later(2));
        assert!(inst.status.is_terminal());
        assert!(inst.completed_at.is_some());
    }

    // -- Status helpers ---------------------------------------------------------

    #[test]
    fn terminal_classification() {
        assert!(!InstanceStatus::Launching.is_terminal());
        assert!(!InstanceStatus::Running.is_terminal());
        assert!(InstanceStatus::Closed.is_terminal());
        assert!(InstanceStatus::Crashed.is_terminal());
        assert!(InstanceStatus::Stopped.is_terminal());
    }

    #[test]
    fn status_display() {
        assert_eq!(InstanceStatus::Launching.to_string(), "launching");
        assert_eq!(InstanceStatus::Crashed.to_string(), "crashed");
    }

    #[test]
    fn status_serde_uses_snake_case() {
        let json = serde_json::to_string(&InstanceStatus::Stopped).unwrap();
        assert_eq!(json, "\"stopped\"");
    }
}
