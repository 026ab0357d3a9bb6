//! Status logger recording diagnostics for assertions.

use std::sync::{Arc, Mutex};

use log::Level;
use logship::{SharedStatus, StatusLogger};

#[derive(Clone, Default)]
pub struct RecordingStatus {
    lines: Arc<Mutex<Vec<(Level, String)>>>,
}

impl RecordingStatus {
    pub fn shared(&self) -> SharedStatus {
        Arc::new(self.clone())
    }

    pub fn contains(&self, level: Level, fragment: &str) -> bool {
        self.lines
            .lock()
            .expect("status lock")
            .iter()
            .any(|(l, line)| *l == level && line.contains(fragment))
    }
}

impl StatusLogger for RecordingStatus {
    fn log(&self, level: Level, message: &str) {
        self.lines
            .lock()
            .expect("status lock")
            .push((level, message.to_string()));
    }
}
