//! Line-oriented log sink used by the loader.
//!
//! Diagnostics are plain human-readable lines. [`Monitor::log_once`]
//! deduplicates by exact message within one mod load so that many
//! instructions tripping the same rule produce a single line.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Alert,
}

/// Messages already logged for the current mod, in first-seen order.
#[derive(Debug, Default, Clone)]
pub struct LoggedMessages {
    seen: HashSet<String>,
    lines: Vec<String>,
}

impl LoggedMessages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message; returns `false` if it was already recorded.
    pub fn insert(&mut self, message: &str) -> bool {
        if self.seen.contains(message) {
            return false;
        }
        self.seen.insert(message.to_string());
        self.lines.push(message.to_string());
        true
    }

    pub fn contains(&self, message: &str) -> bool {
        self.seen.contains(message)
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

pub trait Monitor {
    fn log(&self, message: &str, level: LogLevel);

    /// Log a message unless the same text was already logged into `logged`.
    fn log_once(&self, logged: &mut LoggedMessages, message: &str, level: LogLevel) {
        if logged.insert(message) {
            self.log(message, level);
        }
    }
}

/// Forwards log lines to `tracing`, tagged with the source name.
#[derive(Debug, Clone)]
pub struct TracingMonitor {
    source: String,
}

impl TracingMonitor {
    pub fn new(source: impl Into<String>) -> Self {
        Self { source: source.into() }
    }
}

impl Monitor for TracingMonitor {
    fn log(&self, message: &str, level: LogLevel) {
        let source = self.source.as_str();
        match level {
            LogLevel::Trace => tracing::trace!(source, "{message}"),
            LogLevel::Debug => tracing::debug!(source, "{message}"),
            LogLevel::Info => tracing::info!(source, "{message}"),
            LogLevel::Warn => tracing::warn!(source, "{message}"),
            LogLevel::Error | LogLevel::Alert => tracing::error!(source, "{message}"),
        }
    }
}

/// Keeps every logged line in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryMonitor {
    entries: Rc<RefCell<Vec<(LogLevel, String)>>>,
}

impl MemoryMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(LogLevel, String)> {
        self.entries.borrow().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries.borrow().iter().map(|(_, m)| m.clone()).collect()
    }

    /// Number of logged lines equal to `message`.
    pub fn count(&self, message: &str) -> usize {
        self.entries.borrow().iter().filter(|(_, m)| m == message).count()
    }
}

impl Monitor for MemoryMonitor {
    fn log(&self, message: &str, level: LogLevel) {
        self.entries.borrow_mut().push((level, message.to_string()));
    }
}
