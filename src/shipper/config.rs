//! Fully resolved shipper configuration.

use std::time::Duration;

use crate::{
    flusher::FlushSettings,
    http_sender::{SenderConfig, TransportConfig},
    rate_limited_warner::DEFAULT_WARN_INTERVAL,
};

/// Default buffer capacity in bytes.
pub const DEFAULT_MAX_QUEUE_SIZE_BYTES: u64 = 1_000_000;

/// Everything a [`LogShipper`](super::LogShipper) needs, with defaults
/// applied. Usually produced by [`ShipperBuilder`](super::ShipperBuilder).
#[derive(Clone, Debug)]
pub struct ShipperConfig {
    pub sender: SenderConfig,
    pub transport: TransportConfig,
    pub flush: FlushSettings,
    /// Buffer capacity, measured as the sum of item byte lengths.
    pub max_queue_size_bytes: u64,
    /// Minimum spacing of eviction and drop summaries.
    pub warn_interval: Duration,
}

impl ShipperConfig {
    /// Default configuration shipping to `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            sender: SenderConfig::new(url),
            transport: TransportConfig::default(),
            flush: FlushSettings::default(),
            max_queue_size_bytes: DEFAULT_MAX_QUEUE_SIZE_BYTES,
            warn_interval: DEFAULT_WARN_INTERVAL,
        }
    }
}
