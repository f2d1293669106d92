//! Per-instance crash window: a bounded ring of recent output lines.
//!
//! The window is an intentionally lossy view — crash detection only ever
//! needs the most recent lines, so there is no mechanism to see anything
//! older than capacity. Insertion is strict FIFO with O(1) amortized
//! eviction of the oldest line once full.
//!
//! Each window is owned by exactly one instance and addressed purely by
//! instance id, so windows for different instances never contend.

use std::collections::VecDeque;

/// Fixed-capacity ring of the most recent raw output lines for one instance.
#[derive(Debug)]
pub struct CrashWindow {
    lines: VecDeque<String>,
    capacity: usize,
    total_appended: u64,
}

impl CrashWindow {
    /// Create a window with the given line capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0 (rejected earlier by config validation).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be > 0");
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
            total_appended: 0,
        }
    }

    /// Append a raw line, evicting and returning the oldest line when full.
    pub fn append(&mut self, line: impl Into<String>) -> Option<String> {
        self.total_appended += 1;
        let evicted = if self.lines.len() == self.capacity {
            self.lines.pop_front()
        } else {
            None
        };
        self.lines.push_back(line.into());
        evicted
    }

    /// The current window contents joined with newlines and case-folded for
    /// signature matching. Reflects only the window, never older history.
    #[must_use]
    pub fn context(&self) -> String {
        let mut out = String::new();
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&line.to_lowercase());
        }
        out
    }

    /// The last `count` raw lines, oldest first.
    #[must_use]
    pub fn tail(&self, count: usize) -> Vec<&str> {
        let skip = self.lines.len().saturating_sub(count);
        self.lines.iter().skip(skip).map(String::as_str).collect()
    }

    /// Current number of buffered lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the window holds no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Line capacity, fixed at creation.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total lines ever appended, including evicted ones.
    #[must_use]
    pub fn total_appended(&self) -> u64 {
        self.total_appended
    }
}
