//! Compatibility bridge for the Rust `log` crate.
//!
//! [`ShipperLogAdapter`] implements `log::Log` and feeds every enabled record
//! into a [`LogShipper`]. Records logged under
//! [`STATUS_TARGET`](crate::status::STATUS_TARGET) are skipped so the
//! shipper's own diagnostics never loop back into its buffer. So are records
//! from the HTTP stack and anything logged on the flush thread, since those
//! are produced by shipping itself.

use std::{
    sync::Arc,
    thread,
    time::{SystemTime, UNIX_EPOCH},
};

use log::{LevelFilter, Metadata, Record, SetLoggerError};

use crate::{flusher::THREAD_NAME, shipper::LogShipper, status::STATUS_TARGET};

/// Crates whose logging happens while a batch is being posted.
const TRANSPORT_TARGETS: &[&str] = &["ureq", "native_tls", "rustls"];

fn produced_by_shipping(target: &str) -> bool {
    let root = target.split("::").next().unwrap_or(target);
    target.starts_with(STATUS_TARGET)
        || TRANSPORT_TARGETS.contains(&root)
        || thread::current().name() == Some(THREAD_NAME)
}

/// Turns a record into the bytes shipped for it.
pub type LayoutFn = Box<dyn Fn(&Record<'_>) -> Vec<u8> + Send + Sync>;

/// `<unix millis> <LEVEL> <target> - <message>\n`
pub fn default_layout(record: &Record<'_>) -> Vec<u8> {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis());
    format!(
        "{millis} {:<5} {} - {}\n",
        record.level(),
        record.target(),
        record.args()
    )
    .into_bytes()
}

/// Adapter implementing the Rust `log::Log` trait on top of a shipper.
pub struct ShipperLogAdapter {
    shipper: Arc<LogShipper>,
    layout: LayoutFn,
    level: LevelFilter,
}

impl ShipperLogAdapter {
    /// Ship records at `Info` and above using [`default_layout`].
    pub fn new(shipper: Arc<LogShipper>) -> Self {
        Self {
            shipper,
            layout: Box::new(default_layout),
            level: LevelFilter::Info,
        }
    }

    pub fn with_layout<F>(mut self, layout: F) -> Self
    where
        F: Fn(&Record<'_>) -> Vec<u8> + Send + Sync + 'static,
    {
        self.layout = Box::new(layout);
        self
    }

    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    /// Install the adapter as the global logger and raise the global max
    /// level to the adapter's level.
    ///
    /// # Errors
    ///
    /// Fails when another global logger is already installed.
    pub fn install(self) -> Result<(), SetLoggerError> {
        let level = self.level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(level);
        Ok(())
    }
}

impl log::Log for ShipperLogAdapter {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level && !produced_by_shipping(metadata.target())
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.shipper.add((self.layout)(record));
    }

    fn flush(&self) {}
}

impl std::fmt::Debug for ShipperLogAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShipperLogAdapter")
            .field("shipper", &self.shipper)
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}
