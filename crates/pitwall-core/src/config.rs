//! Monitor configuration
//!
//! The crash-window capacity and the signature list are deliberately
//! configuration rather than constants: deployments have shipped window sizes
//! anywhere between 100 and 1000 lines, and the signature set evolves with
//! the game versions being launched.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::signatures::DEFAULT_SIGNATURES;

/// Exit codes that indicate user- or OS-initiated termination rather than a
/// crash: SIGINT (130), SIGTERM (143), and the Windows Ctrl+C sentinel
/// (STATUS_CONTROL_C_EXIT). A plain exit code 1 is NOT in this set — on Unix
/// it is the most common crash code and treating it as a stop would mask
/// real failures.
pub const DEFAULT_STOP_EXIT_CODES: &[i32] = &[130, 143, -1_073_741_510];

/// Configuration for the log monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Crash window capacity in lines, per instance.
    pub window_capacity: usize,

    /// Number of trailing window lines included in a crash summary.
    pub summary_tail_lines: usize,

    /// Hard character cap on a crash summary. When exceeded, the tail is
    /// kept and the summary is prefixed with a truncation marker.
    pub summary_max_chars: usize,

    /// How long a terminal instance's crash window survives past its last
    /// activity before the reaper evicts it.
    pub window_grace: Duration,

    /// How long a terminal instance's registry entry (and its log entries)
    /// survive past last activity before the reaper removes them.
    pub registry_grace: Duration,

    /// Period of the background reaper sweep. Zero disables the reaper.
    pub reap_interval: Duration,

    /// Maximum number of log entries retained in memory across all streams.
    pub max_memory_logs: usize,

    /// Exit codes treated as user/OS-initiated termination (`Stopped`).
    pub stop_exit_codes: Vec<i32>,

    /// Crash signature patterns, compiled as case-insensitive regexes.
    pub signature_patterns: Vec<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            window_capacity: 500,
            summary_tail_lines: 40,
            summary_max_chars: 4000,
            window_grace: Duration::from_secs(5 * 60),
            registry_grace: Duration::from_secs(30 * 60),
            reap_interval: Duration::from_secs(60),
            max_memory_logs: 5000,
            stop_exit_codes: DEFAULT_STOP_EXIT_CODES.to_vec(),
            signature_patterns: DEFAULT_SIGNATURES.iter().map(ToString::to_string).collect(),
        }
    }
}

impl MonitorConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.window_capacity == 0 {
            return Err(Error::Config("window_capacity must be > 0".to_string()));
        }
        if self.summary_tail_lines == 0 {
            return Err(Error::Config("summary_tail_lines must be > 0".to_string()));
        }
        if self.summary_max_chars == 0 {
            return Err(Error::Config("summary_max_chars must be > 0".to_string()));
        }
        if self.max_memory_logs == 0 {
            return Err(Error::Config("max_memory_logs must be > 0".to_string()));
        }
        if self.registry_grace < self.window_grace {
            return Err(Error::Config(
                "registry_grace must be >= window_grace".to_string(),
            ));
        }
        if self.signature_patterns.is_empty() {
            return Err(Error::Config(
                "signature_patterns must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
