//! pitwall-core: Core library for Pitwall
//!
//! Pitwall watches externally-launched game processes for a desktop launcher:
//! it ingests their raw output, classifies every line by severity, and decides
//! from bounded recent context whether an instance has crashed. Memory is
//! bounded per instance and the producer of log lines is never blocked.
//!
//! # Architecture
//!
//! ```text
//! Process supervisor → Ingress gate → Classifier → Crash window
//!                                          ↓            ↓
//!                                      Log store ← Signature matcher
//!                                          ↓            ↓
//!                                    Presentation   Instance registry
//! ```
//!
//! # Modules
//!
//! - `classify`: Severity classification of raw output lines
//! - `config`: Monitor configuration with deployment defaults
//! - `events`: Typed inbound supervisor events and the JSON boundary parser
//! - `instance`: Instance records and the lifecycle state machine
//! - `logging`: Structured diagnostics via `tracing`
//! - `monitor`: The event-processing core (registry, gate, dispatch)
//! - `reaper`: Periodic eviction of stale per-instance resources
//! - `runtime`: Owned async wrapper (channel, event loop, reaper task)
//! - `signatures`: High-precision crash signature matching and summaries
//! - `store`: Append-only bounded in-memory log store
//! - `window`: Per-instance bounded ring buffer of recent output lines
//!
//! # Safety
//!
//! This crate forbids unsafe code.

#![forbid(unsafe_code)]

pub mod classify;
pub mod config;
pub mod error;
pub mod events;
pub mod instance;
pub mod logging;
pub mod monitor;
pub mod reaper;
pub mod runtime;
pub mod signatures;
pub mod store;
pub mod window;

pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
