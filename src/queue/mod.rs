//! Concurrent FIFO queue bounded by accumulated item cost.
//!
//! [`CostBoundedQueue`] stores items in an unbounded lock-free channel and
//! tracks the running sum of their costs in an atomic counter. Capacity is
//! expressed in cost units (normally bytes), not item count. Inserts reserve
//! their cost up front and roll the reservation back when it would exceed the
//! capacity, so concurrent producers never jointly overshoot it.
//!
//! Eviction policies live in [`eviction`] and are layered on top of the queue
//! without touching its accounting.

mod drop_warner;
pub mod eviction;


use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use crossbeam_channel::{Receiver, Sender, unbounded};

pub use eviction::{EvictingBuffer, FifoEvictionBuffer};

/// Function assigning a cost to an item.
///
/// Must be pure: the queue calls it once on insert and once on removal and
/// relies on both calls agreeing.
pub type CostFn<T> = Arc<dyn Fn(&T) -> u64 + Send + Sync>;

/// Cost of a byte buffer: its length.
pub fn byte_len<T: AsRef<[u8]>>(item: &T) -> u64 {
    item.as_ref().len() as u64
}

/// Cost of a string: its character count.
///
/// This approximates the serialized size. It under-counts multi-byte UTF-8
/// characters; use [`byte_len`] when the exact byte size matters.
pub fn char_count<T: AsRef<str>>(item: &T) -> u64 {
    item.as_ref().chars().count() as u64
}

/// Thread-safe FIFO queue whose total item cost never exceeds `capacity`.
pub struct CostBoundedQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
    cost: AtomicU64,
    capacity: u64,
    cost_fn: CostFn<T>,
}

impl<T> CostBoundedQueue<T> {
    /// Create an empty queue holding at most `capacity` cost units.
    pub fn new<F>(capacity: u64, cost_fn: F) -> Self
    where
        F: Fn(&T) -> u64 + Send + Sync + 'static,
    {
        Self::with_cost_fn(capacity, Arc::new(cost_fn))
    }

    /// Create an empty queue sharing an existing cost function.
    pub fn with_cost_fn(capacity: u64, cost_fn: CostFn<T>) -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            cost: AtomicU64::new(0),
            capacity,
            cost_fn,
        }
    }

    /// Insert `item` if its cost fits in the remaining capacity.
    ///
    /// # Errors
    ///
    /// Returns the item unchanged when accepting it would exceed the
    /// capacity. The queue contents and tracked cost are left untouched.
    pub fn offer(&self, item: T) -> Result<(), T> {
        let cost = self.cost_of(&item);
        if cost > self.capacity {
            return Err(item);
        }
        let previous = self.cost.fetch_add(cost, Ordering::AcqRel);
        if previous.saturating_add(cost) > self.capacity {
            self.cost.fetch_sub(cost, Ordering::AcqRel);
            return Err(item);
        }
        // The channel is unbounded and we hold the receiver, so this only
        // fails if the queue itself is being torn down.
        self.tx.send(item).map_err(|err| {
            self.cost.fetch_sub(cost, Ordering::AcqRel);
            err.into_inner()
        })
    }

    /// Remove and return the oldest item, if any.
    pub fn poll(&self) -> Option<T> {
        let item = self.rx.try_recv().ok()?;
        self.release(&item);
        Some(item)
    }

    /// Move up to `max` of the oldest items into `sink`.
    ///
    /// Stops early once the queue is empty and returns the number of items
    /// moved. Items offered while the drain runs may or may not be included;
    /// whatever is not taken stays queued for the next drain.
    pub fn drain_to(&self, sink: &mut Vec<T>, max: usize) -> usize {
        let mut drained = 0;
        while drained < max {
            let Some(item) = self.poll() else {
                break;
            };
            sink.push(item);
            drained += 1;
        }
        drained
    }

    /// Number of queued items. May be stale under concurrent use.
    pub fn size(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Sum of the costs of queued items. May be stale under concurrent use.
    pub fn cost(&self) -> u64 {
        self.cost.load(Ordering::Acquire)
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Cost the configured function assigns to `item`.
    pub fn cost_of(&self, item: &T) -> u64 {
        (self.cost_fn)(item)
    }

    fn release(&self, item: &T) {
        self.cost.fetch_sub(self.cost_of(item), Ordering::AcqRel);
    }
}

impl<T> fmt::Debug for CostBoundedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CostBoundedQueue")
            .field("size", &self.size())
            .field("cost", &self.cost())
            .field("capacity", &self.capacity)
            .finish()
    }
}
