//! Crash signature matching over window context.
//!
//! Signatures are high-precision by design: each one is an unambiguous crash
//! indicator, and matching any single signature is sufficient — there is no
//! voting or score threshold. Precision is preserved by keeping the set
//! narrow rather than filtering matches afterwards: ordinary error-level
//! lines, recoverable stack traces, and benign mentions of the word "crash"
//! (e.g. "generating crash report") must never match. Favor false negatives
//! over false positives.

use regex::{Regex, RegexBuilder};

use crate::error::{Error, Result};

/// Marker prefixed to a crash summary whose head was trimmed by the char cap.
pub const TRUNCATION_MARKER: &str = "[truncated] ";

/// Built-in signature set: native fatal-error banners, segfaults, access
/// violations, out-of-memory errors, and explicit crash banners.
pub const DEFAULT_SIGNATURES: &[&str] = &[
    r"a fatal error has been detected by the java runtime environment",
    r"---- minecraft crash report ----",
    r"#\s*an error report file with more information is saved as",
    r"exception_access_violation",
    r"segmentation fault",
    r"java\.lang\.outofmemoryerror",
    r"the game crashed",
    r"crash report saved to",
];

/// An ordered, compiled set of crash signatures.
#[derive(Debug)]
pub struct SignatureSet {
    patterns: Vec<Regex>,
    sources: Vec<String>,
}

impl SignatureSet {
    /// Compile a signature set from pattern strings.
    ///
    /// Patterns are compiled case-insensitive with `.` matching newlines so
    /// a signature may span window lines.
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(patterns.len());
        let mut sources = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let source = pattern.as_ref();
            let regex = RegexBuilder::new(source)
                .case_insensitive(true)
                .dot_matches_new_line(true)
                .build()
                .map_err(|e| Error::Signature {
                    pattern: source.to_string(),
                    source: Box::new(e),
                })?;
            compiled.push(regex);
            sources.push(source.to_string());
        }
        Ok(Self {
            patterns: compiled,
            sources,
        })
    }

    /// Test the window context against every signature in order, returning
    /// the source of the first one that matches.
    #[must_use]
    pub fn first_match(&self, context: &str) -> Option<&str> {
        self.patterns
            .iter()
            .position(|p| p.is_match(context))
            .map(|i| self.sources[i].as_str())
    }

    /// Whether any signature matches the window context.
    #[must_use]
    pub fn is_crash(&self, context: &str) -> bool {
        self.first_match(context).is_some()
    }

    /// Number of signatures in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Build a bounded crash summary from the tail of a crash window.
///
/// Joins the given lines (already the last K of the window), then enforces
/// the hard character cap by keeping the tail and prefixing the truncation
/// marker. Character-boundary safe for non-ASCII output.
#[must_use]
pub fn crash_summary(tail_lines: &[&str], max_chars: usize) -> String {
    let joined = tail_lines.join("\n");
    let total = joined.chars().count();
    if total <= max_chars {
        return joined;
    }
    let tail: String = joined
        .chars()
        .skip(total - max_chars)
        .collect();
    format!("{TRUNCATION_MARKER}{tail}")
}
