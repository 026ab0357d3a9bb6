//! The public face of the crate: buffer, flusher, and sender wired together.
//!
//! ```no_run
//! use logship::LogShipper;
//!
//! let shipper = LogShipper::builder()
//!     .with_url("https://collectors.example.com/receiver/v1/http/TOKEN")
//!     .with_source_category("prod/web")
//!     .build()?;
//! shipper.start()?;
//! shipper.add("GET /health 200\n");
//! shipper.stop();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Producers call [`LogShipper::add`], which never blocks and never fails
//! loudly: under pressure the oldest buffered lines are evicted. A
//! background thread drains the buffer, concatenates the lines into one
//! body, and posts it with retries.

mod builder;
mod config;


use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

pub use builder::ShipperBuilder;
pub use config::{DEFAULT_MAX_QUEUE_SIZE_BYTES, ShipperConfig};

use crate::{
    cancel::CancellationToken,
    flusher::{BoxError, BufferFlusher, FlushError, FlushScheduler, LifecycleError},
    http_sender::{HttpTransport, RetryingSender, concatenate},
    queue::{CostBoundedQueue, EvictingBuffer, FifoEvictionBuffer, byte_len},
    rate_limited_warner::RateLimitedWarner,
    status::SharedStatus,
};

/// Buffers log lines and ships them to an HTTP collector in batches.
pub struct LogShipper {
    buffer: Arc<FifoEvictionBuffer<Vec<u8>>>,
    flusher: BufferFlusher<Vec<u8>, Vec<u8>>,
    closed: AtomicBool,
    closed_drops: RateLimitedWarner,
    status: SharedStatus,
}

impl LogShipper {
    pub fn builder() -> ShipperBuilder {
        ShipperBuilder::new()
    }

    /// Assemble a shipper from resolved configuration and a transport.
    ///
    /// The shipper starts idle; items added before [`start`](Self::start)
    /// are buffered.
    pub fn with_transport<T>(config: ShipperConfig, transport: T, status: SharedStatus) -> Self
    where
        T: HttpTransport + 'static,
    {
        let queue = CostBoundedQueue::new(config.max_queue_size_bytes, byte_len::<Vec<u8>>);
        let buffer = Arc::new(
            FifoEvictionBuffer::with_queue(queue, Arc::clone(&status))
                .with_warn_interval(config.warn_interval),
        );
        let sender = RetryingSender::new(transport, config.sender, Arc::clone(&status));
        let scheduler = FlushScheduler::new(
            Arc::clone(&buffer) as Arc<dyn EvictingBuffer<Vec<u8>>>,
            Box::new(|items: Vec<Vec<u8>>| Ok::<_, BoxError>(concatenate(&items))),
            Box::new(
                move |payload: Vec<u8>, cancel: &CancellationToken| -> Result<(), FlushError> {
                    sender.send(&payload, cancel)?;
                    Ok(())
                },
            ),
            config.flush,
            Arc::clone(&status),
        );
        Self {
            buffer,
            flusher: BufferFlusher::new(scheduler, Arc::clone(&status)),
            closed: AtomicBool::new(false),
            closed_drops: RateLimitedWarner::new(config.warn_interval),
            status,
        }
    }

    /// Buffer one log line for delivery.
    ///
    /// Never blocks. Returns `false` when the line was dropped, either
    /// because it alone exceeds the buffer capacity or because the shipper
    /// has been stopped.
    pub fn add(&self, line: impl Into<Vec<u8>>) -> bool {
        if self.closed.load(Ordering::Acquire) {
            self.closed_drops.record();
            self.closed_drops.warn_if_due(|count| {
                self.status
                    .warn(&format!("dropped {count} items added after shutdown"));
            });
            return false;
        }
        self.buffer.add(line.into())
    }

    /// Start the background flush thread.
    ///
    /// # Errors
    ///
    /// Fails if the shipper was already started or stopped, or the thread
    /// cannot be spawned.
    pub fn start(&self) -> Result<(), LifecycleError> {
        self.flusher.start()
    }

    /// Flush what is buffered and stop the background thread.
    ///
    /// Blocks for at most the configured `max_flush_timeout` plus one flush
    /// period. Returns `false` if the final flush did not finish in time.
    pub fn stop(&self) -> bool {
        self.closed.store(true, Ordering::Release);
        let finished = self.flusher.stop();
        self.closed_drops.flush(|count| {
            self.status
                .warn(&format!("dropped {count} items added after shutdown"));
        });
        finished
    }

    pub fn is_running(&self) -> bool {
        self.flusher.is_running()
    }

    /// Number of buffered lines awaiting delivery.
    pub fn pending(&self) -> usize {
        self.buffer.size()
    }

    /// Total bytes of buffered lines awaiting delivery.
    pub fn pending_cost(&self) -> u64 {
        self.buffer.cost()
    }

    /// Lines evicted to make room for newer ones.
    pub fn evicted(&self) -> u64 {
        self.buffer.evicted()
    }

    /// Lines refused by the buffer.
    pub fn dropped(&self) -> u64 {
        self.buffer.dropped()
    }

    pub fn capacity(&self) -> u64 {
        self.buffer.capacity()
    }
}

impl Drop for LogShipper {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for LogShipper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogShipper")
            .field("buffer", &self.buffer)
            .field("flusher", &self.flusher)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
