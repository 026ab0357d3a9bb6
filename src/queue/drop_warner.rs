//! Rate-limited warnings for items the buffer discards.
//!
//! The eviction buffer loses data in three ways: evicting old items to make
//! room, refusing an item larger than the whole capacity, and giving up on an
//! insert that kept losing races with other producers. Each reason gets its
//! own warner so one noisy cause cannot hide another.

use std::time::Duration;

use crate::{rate_limited_warner::RateLimitedWarner, status::SharedStatus};

/// Categorises why an item was lost.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DropReason {
    Evicted,
    Oversized,
    Contended,
}

/// Tracks lost items and emits rate-limited warnings.
#[derive(Debug)]
pub(crate) struct DropWarner {
    evicted: RateLimitedWarner,
    oversized: RateLimitedWarner,
    contended: RateLimitedWarner,
    capacity: u64,
}

impl DropWarner {
    pub(crate) fn new(interval: Duration, capacity: u64) -> Self {
        Self {
            evicted: RateLimitedWarner::new(interval),
            oversized: RateLimitedWarner::new(interval),
            contended: RateLimitedWarner::new(interval),
            capacity,
        }
    }

    pub(crate) fn record(&self, reason: DropReason, status: &SharedStatus) {
        let capacity = self.capacity;
        match reason {
            DropReason::Evicted => {
                self.evicted.record();
                self.evicted.warn_if_due(|count| {
                    status.warn(&format!(
                        "evicted {count} oldest buffered items to stay within {capacity} cost units"
                    ));
                });
            }
            DropReason::Oversized => {
                self.oversized.record();
                self.oversized.warn_if_due(|count| {
                    status.warn(&format!(
                        "dropped {count} items whose cost alone exceeds the buffer capacity of {capacity}"
                    ));
                });
            }
            DropReason::Contended => {
                self.contended.record();
                self.contended.warn_if_due(|count| {
                    status.warn(&format!(
                        "dropped {count} items after losing repeated races for buffer capacity"
                    ));
                });
            }
        }
    }

    /// Report everything still pending, regardless of the interval.
    pub(crate) fn flush(&self, status: &SharedStatus) {
        let capacity = self.capacity;
        self.evicted.flush(|count| {
            status.warn(&format!(
                "evicted {count} oldest buffered items to stay within {capacity} cost units"
            ));
        });
        self.oversized.flush(|count| {
            status.warn(&format!(
                "dropped {count} items whose cost alone exceeds the buffer capacity of {capacity}"
            ));
        });
        self.contended.flush(|count| {
            status.warn(&format!(
                "dropped {count} items after losing repeated races for buffer capacity"
            ));
        });
    }
}
