//! A status logger that accumulates diagnostics in memory for assertions.

use std::sync::Arc;

use log::Level;
use parking_lot::Mutex;

use crate::status::{SharedStatus, StatusLogger};

/// Status logger that stores every line it receives for later inspection.
#[derive(Clone, Default)]
pub struct CollectingStatus {
    lines: Arc<Mutex<Vec<(Level, String)>>>,
}

impl CollectingStatus {
    /// Create a new empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a shared handle suitable for injecting into components.
    pub fn shared(&self) -> SharedStatus {
        Arc::new(self.clone())
    }

    /// Return a snapshot of all lines received so far.
    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines.lock().clone()
    }

    pub fn contains(&self, fragment: &str) -> bool {
        self.count_containing(fragment) > 0
    }

    pub fn count_containing(&self, fragment: &str) -> usize {
        self.lines
            .lock()
            .iter()
            .filter(|(_, line)| line.contains(fragment))
            .count()
    }

    /// Whether a line at `level` containing `fragment` was logged.
    pub fn contains_at(&self, level: Level, fragment: &str) -> bool {
        self.lines
            .lock()
            .iter()
            .any(|(l, line)| *l == level && line.contains(fragment))
    }
}

impl StatusLogger for CollectingStatus {
    fn log(&self, level: Level, message: &str) {
        self.lines.lock().push((level, message.to_string()));
    }
}
