//! Severity classification of raw output lines.
//!
//! Classification is a pure, total function over line content: no regex
//! machinery, just case-insensitive keyword inspection with a fixed priority
//! order. Unclassifiable input always falls through to `Info` — a line can
//! never fail to classify.

use serde::{Deserialize, Serialize};

/// Severity level assigned to a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Error,
    Warn,
    Debug,
    Info,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warn => write!(f, "warn"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// Keywords checked in priority order; first group with a hit wins.
const ERROR_KEYWORDS: &[&str] = &["error", "exception", "failed"];
const WARN_KEYWORDS: &[&str] = &["warn", "warning"];
const DEBUG_KEYWORDS: &[&str] = &["debug", "trace"];

/// Classify a raw output line by severity.
///
/// Case-insensitive substring inspection, deterministic, no side effects.
#[must_use]
pub fn classify(line: &str) -> LogLevel {
    let folded = line.to_lowercase();
    if ERROR_KEYWORDS.iter().any(|k| folded.contains(k)) {
        LogLevel::Error
    } else if WARN_KEYWORDS.iter().any(|k| folded.contains(k)) {
        LogLevel::Warn
    } else if DEBUG_KEYWORDS.iter().any(|k| folded.contains(k)) {
        LogLevel::Debug
    } else {
        LogLevel::Info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- Priority order ---------------------------------------------------------

    #[test]
    fn error_keywords_win() {
        assert_eq!(classify("java.lang.NullPointerException"), LogLevel::Error);
        assert_eq!(classify("Failed to bind port"), LogLevel::Error);
        assert_eq!(classify("[Render thread/ERROR]: boom"), LogLevel::Error);
    }

    #[test]
    fn error_beats_warn_in_same_line() {
        assert_eq!(classify("warning: operation failed"), LogLevel::Error);
    }

    #[test]
    fn warn_keywords() {
        assert_eq!(classify("[main/WARN]: outdated mod"), LogLevel::Warn);
        assert_eq!(classify("Warning: slow tick"), LogLevel::Warn);
    }

    #[test]
    fn debug_keywords() {
        assert_eq!(classify("[main/DEBUG]: chunk loaded"), LogLevel::Debug);
        assert_eq!(classify("stack trace follows"), LogLevel::Debug);
    }

    #[test]
    fn warn_beats_debug() {
        assert_eq!(classify("debug warning enabled"), LogLevel::Warn);
    }

    // -- Fallthrough ------------------------------------------------------------

    #[test]
    fn plain_lines_are_info() {
        assert_eq!(classify("Loading world 'survival'"), LogLevel::Info);
        assert_eq!(classify(""), LogLevel::Info);
        assert_eq!(classify("   "), LogLevel::Info);
    }

    #[test]
    fn non_ascii_input_is_total() {
        assert_eq!(classify("ünïcödé 世界"), LogLevel::Info);
    }

    // -- Case folding -----------------------------------------------------------

    #[test]
    fn classification_is_case_insensitive() {
        assert_eq!(classify("ERROR"), LogLevel::Error);
        assert_eq!(classify("ErRoR"), LogLevel::Error);
        assert_eq!(classify("WARNING"), LogLevel::Warn);
        assert_eq!(classify("TRACE"), LogLevel::Debug);
    }

    // -- Display ----------------------------------------------------------------

    #[test]
    fn level_display() {
        assert_eq!(LogLevel::Error.to_string(), "error");
        assert_eq!(LogLevel::Warn.to_string(), "warn");
        assert_eq!(LogLevel::Debug.to_string(), "debug");
        assert_eq!(LogLevel::Info.to_string(), "info");
    }

    #[test]
    fn level_serde_uses_snake_case() {
        let json = serde_json::to_string(&LogLevel::Warn).unwrap();
        assert_eq!(json, "\"warn\"");
        let back: LogLevel = serde_json::from_str("\"error\"").unwrap();
        assert_eq!(back, LogLevel::Error);
    }
}
