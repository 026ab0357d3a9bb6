//! Coalesces repeated drop and eviction warnings.
//!
//! Under sustained overflow every `add` can evict something. Logging each
//! eviction would flood the status logger, so callers count events with
//! [`RateLimitedWarner::record`] and emit one summary per interval via
//! [`RateLimitedWarner::warn_if_due`].

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

/// Default interval between successive summaries.
pub const DEFAULT_WARN_INTERVAL: Duration = Duration::from_secs(5);

/// Counts events and rate limits the warnings reporting them.
#[derive(Debug)]
pub struct RateLimitedWarner {
    origin: Instant,
    interval_ms: u64,
    /// Milliseconds since `origin` at the last emission, offset by one
    /// interval so the first warning is emitted immediately.
    last_warn_ms: AtomicU64,
    pending: AtomicU64,
}

impl Default for RateLimitedWarner {
    fn default() -> Self {
        Self::new(DEFAULT_WARN_INTERVAL)
    }
}

impl RateLimitedWarner {
    /// Create a warner emitting at most one summary per `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            origin: Instant::now(),
            interval_ms: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            last_warn_ms: AtomicU64::new(0),
            pending: AtomicU64::new(0),
        }
    }

    /// Count one event.
    pub fn record(&self) {
        self.pending.fetch_add(1, Ordering::Relaxed);
    }

    /// Call `warn` with the pending count if the interval has elapsed.
    pub fn warn_if_due(&self, warn: impl FnOnce(u64)) {
        let now = self.elapsed_ms();
        let prev = self.last_warn_ms.load(Ordering::Relaxed);
        if now.saturating_sub(prev) < self.interval_ms {
            return;
        }
        // Only one caller per interval wins the right to report.
        if self
            .last_warn_ms
            .compare_exchange(prev, now, Ordering::Relaxed, Ordering::Relaxed)
            .is_err()
        {
            return;
        }
        let count = self.pending.swap(0, Ordering::Relaxed);
        if count > 0 {
            warn(count);
        }
    }

    /// Report any pending events immediately.
    pub fn flush(&self, warn: impl FnOnce(u64)) {
        let count = self.pending.swap(0, Ordering::Relaxed);
        if count > 0 {
            warn(count);
            self.last_warn_ms.store(self.elapsed_ms(), Ordering::Relaxed);
        }
    }

    fn elapsed_ms(&self) -> u64 {
        // Offset by one interval so the very first check is always due.
        let elapsed = u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX);
        elapsed.saturating_add(self.interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_first_warning_immediately() {
        let warner = RateLimitedWarner::new(Duration::from_secs(60));
        let mut warnings = Vec::new();
        warner.record();
        warner.warn_if_due(|c| warnings.push(c));
        assert_eq!(warnings, vec![1]);
    }

    #[test]
    fn rate_limits_subsequent_warnings() {
        let warner = RateLimitedWarner::new(Duration::from_secs(60));
        let mut warnings = Vec::new();
        warner.record();
        warner.warn_if_due(|c| warnings.push(c));
        warner.record();
        warner.record();
        warner.warn_if_due(|c| warnings.push(c));
        assert_eq!(warnings, vec![1]);
    }

    #[test]
    fn flush_reports_coalesced_count() {
        let warner = RateLimitedWarner::new(Duration::from_secs(60));
        let mut warnings = Vec::new();
        warner.record();
        warner.warn_if_due(|c| warnings.push(c));
        warner.record();
        warner.record();
        warner.flush(|c| warnings.push(c));
        assert_eq!(warnings, vec![1, 2]);
    }

    #[test]
    fn zero_interval_never_suppresses() {
        let warner = RateLimitedWarner::new(Duration::ZERO);
        let mut warnings = Vec::new();
        for _ in 0..3 {
            warner.record();
            warner.warn_if_due(|c| warnings.push(c));
        }
        assert_eq!(warnings, vec![1, 1, 1]);
    }
}
