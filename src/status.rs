//! Injected diagnostics capability.
//!
//! Every component reports drops, evictions, send failures, and shutdown
//! problems through a [`StatusLogger`] handed to it at construction time
//! rather than reaching for a global logger. Production code uses
//! [`LogStatus`], which forwards to the `log` facade under
//! [`STATUS_TARGET`]; tests inject a collecting implementation and assert on
//! the captured lines.

use std::sync::Arc;

use log::Level;

/// `log` target used by [`LogStatus`] for every diagnostic line.
pub const STATUS_TARGET: &str = "logship::status";

/// Sink for internal diagnostics.
pub trait StatusLogger: Send + Sync {
    /// Emit one diagnostic message at `level`.
    fn log(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }

    fn warn(&self, message: &str) {
        self.log(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }
}

/// Shared handle to a status logger.
pub type SharedStatus = Arc<dyn StatusLogger>;

/// Status logger routing diagnostics into the `log` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogStatus;

impl StatusLogger for LogStatus {
    fn log(&self, level: Level, message: &str) {
        log::log!(target: STATUS_TARGET, level, "{message}");
    }
}

/// Return the default status logger.
pub fn default_status() -> SharedStatus {
    Arc::new(LogStatus)
}
