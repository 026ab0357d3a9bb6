//! Buffers that enforce capacity by evicting queued items.
//!
//! [`EvictingBuffer`] is the surface the flush scheduler and producers see.
//! [`FifoEvictionBuffer`] is the only strategy today: it discards the oldest
//! items until a new one fits.

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use crate::{
    rate_limited_warner::DEFAULT_WARN_INTERVAL,
    status::{SharedStatus, default_status},
};

use super::{
    CostBoundedQueue, CostFn,
    drop_warner::{DropReason, DropWarner},
};

/// Attempts made while the queue reads empty but concurrent reservations
/// still block an insert.
const EMPTY_QUEUE_RETRIES: usize = 16;

/// A cost-bounded buffer that makes room for new items by evicting old ones.
pub trait EvictingBuffer<T>: Send + Sync {
    /// Insert `item`, evicting existing items if needed.
    ///
    /// Returns `false` when the item was dropped instead. Never blocks.
    fn add(&self, item: T) -> bool;

    /// Number of buffered items.
    fn size(&self) -> usize;

    /// Sum of the costs of buffered items.
    fn cost(&self) -> u64;

    /// Move up to `max` of the oldest items into `sink`.
    fn drain_to(&self, sink: &mut Vec<T>, max: usize) -> usize;

    /// Report any coalesced drop warnings immediately.
    fn flush_warnings(&self) {}
}

/// FIFO eviction: the oldest data is lost first.
pub struct FifoEvictionBuffer<T> {
    queue: CostBoundedQueue<T>,
    status: SharedStatus,
    warner: DropWarner,
    evicted: AtomicU64,
    dropped: AtomicU64,
}

impl<T> FifoEvictionBuffer<T> {
    /// Create a buffer with the default status logger.
    pub fn new<F>(capacity: u64, cost_fn: F) -> Self
    where
        F: Fn(&T) -> u64 + Send + Sync + 'static,
    {
        Self::with_queue(CostBoundedQueue::new(capacity, cost_fn), default_status())
    }

    /// Create a buffer sharing `cost_fn` and reporting to `status`.
    pub fn with_status(capacity: u64, cost_fn: CostFn<T>, status: SharedStatus) -> Self {
        Self::with_queue(CostBoundedQueue::with_cost_fn(capacity, cost_fn), status)
    }

    /// Wrap an existing queue.
    pub fn with_queue(queue: CostBoundedQueue<T>, status: SharedStatus) -> Self {
        let warner = DropWarner::new(DEFAULT_WARN_INTERVAL, queue.capacity());
        Self {
            queue,
            status,
            warner,
            evicted: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Override how often drop summaries are logged.
    pub fn with_warn_interval(mut self, interval: Duration) -> Self {
        self.warner = DropWarner::new(interval, self.queue.capacity());
        self
    }

    /// Total items evicted to make room since construction.
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    /// Total new items refused since construction.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> u64 {
        self.queue.capacity()
    }

    fn drop_item(&self, reason: DropReason) -> bool {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        self.warner.record(reason, &self.status);
        false
    }

    fn evict_oldest(&self) -> bool {
        if self.queue.poll().is_none() {
            return false;
        }
        self.evicted.fetch_add(1, Ordering::Relaxed);
        self.warner.record(DropReason::Evicted, &self.status);
        true
    }
}

impl<T: Send> EvictingBuffer<T> for FifoEvictionBuffer<T> {
    fn add(&self, item: T) -> bool {
        // An item that cannot fit even in an empty buffer is refused before
        // anything is evicted, keeping the older data intact.
        if self.queue.cost_of(&item) > self.queue.capacity() {
            return self.drop_item(DropReason::Oversized);
        }

        let mut item = item;
        let mut empty_retries = 0;
        loop {
            match self.queue.offer(item) {
                Ok(()) => return true,
                Err(rejected) => item = rejected,
            }
            if self.evict_oldest() {
                continue;
            }
            // Empty, yet other producers still hold reservations. They either
            // commit (leaving something to evict) or roll back shortly.
            empty_retries += 1;
            if empty_retries > EMPTY_QUEUE_RETRIES {
                return self.drop_item(DropReason::Contended);
            }
            std::hint::spin_loop();
        }
    }

    fn size(&self) -> usize {
        self.queue.size()
    }

    fn cost(&self) -> u64 {
        self.queue.cost()
    }

    fn drain_to(&self, sink: &mut Vec<T>, max: usize) -> usize {
        self.queue.drain_to(sink, max)
    }

    fn flush_warnings(&self) {
        self.warner.flush(&self.status);
    }
}

impl<T> fmt::Debug for FifoEvictionBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FifoEvictionBuffer")
            .field("queue", &self.queue)
            .field("evicted", &self.evicted())
            .field("dropped", &self.dropped())
            .finish_non_exhaustive()
    }
}
