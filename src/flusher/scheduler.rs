//! The flush loop run on the background thread.

use std::{
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};

use thiserror::Error;

use crate::{
    cancel::CancellationToken, http_sender::SendError, queue::EvictingBuffer,
    status::SharedStatus,
};

/// Default wake cadence of the flush loop.
pub const DEFAULT_FLUSH_PERIOD: Duration = Duration::from_millis(250);
/// Default upper bound on how long an item may wait unflushed.
pub const DEFAULT_MAX_FLUSH_INTERVAL: Duration = Duration::from_secs(10);
/// Default buffered item count that forces an immediate flush.
pub const DEFAULT_ITEMS_PER_BATCH: usize = 100;
/// Default grace period granted to the final flush on shutdown.
pub const DEFAULT_MAX_FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Turns a drained batch into one outbound payload.
pub type AggregateFn<T, P> = Box<dyn FnMut(Vec<T>) -> Result<P, BoxError> + Send>;

/// Delivers one payload, blocking until done or until the token fires.
pub type SendFn<P> = Box<dyn FnMut(P, &CancellationToken) -> Result<(), FlushError> + Send>;

/// Timing of the flush loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlushSettings {
    /// How often the loop wakes to evaluate the flush trigger.
    pub flush_period: Duration,
    /// Flush once this long has passed since the last flush.
    pub max_flush_interval: Duration,
    /// Flush as soon as this many items are buffered.
    pub items_per_batch: usize,
    /// How long `stop` waits for the final flush before giving up.
    pub max_flush_timeout: Duration,
}

impl Default for FlushSettings {
    fn default() -> Self {
        Self {
            flush_period: DEFAULT_FLUSH_PERIOD,
            max_flush_interval: DEFAULT_MAX_FLUSH_INTERVAL,
            items_per_batch: DEFAULT_ITEMS_PER_BATCH,
            max_flush_timeout: DEFAULT_MAX_FLUSH_TIMEOUT,
        }
    }
}

impl FlushSettings {
    /// Time `stop` waits for the loop to exit.
    pub fn shutdown_grace(&self) -> Duration {
        self.max_flush_timeout
            .saturating_add(self.flush_period)
            .saturating_add(Duration::from_millis(1))
    }
}

/// Failure of one flush cycle. Logged by the loop, never propagated.
#[derive(Debug, Error)]
pub enum FlushError {
    #[error("failed to aggregate {count} items: {source}")]
    Aggregation {
        count: usize,
        #[source]
        source: BoxError,
    },
    #[error(transparent)]
    Send(#[from] SendError),
}

/// Periodic drain, aggregate, and send over an [`EvictingBuffer`].
///
/// `shutdown` is the terminating flag and doubles as the wake-up for the
/// sleep between cycles. `abort` is handed to the send function and is only
/// cancelled when the owner gives up waiting for a final flush.
pub struct FlushScheduler<T, P> {
    buffer: Arc<dyn EvictingBuffer<T>>,
    aggregate: AggregateFn<T, P>,
    send: SendFn<P>,
    settings: FlushSettings,
    last_flush: Instant,
    shutdown: CancellationToken,
    abort: CancellationToken,
    status: SharedStatus,
}

impl<T, P> FlushScheduler<T, P> {
    pub fn new(
        buffer: Arc<dyn EvictingBuffer<T>>,
        aggregate: AggregateFn<T, P>,
        send: SendFn<P>,
        settings: FlushSettings,
        status: SharedStatus,
    ) -> Self {
        Self {
            buffer,
            aggregate,
            send,
            settings,
            last_flush: Instant::now(),
            shutdown: CancellationToken::new(),
            abort: CancellationToken::new(),
            status,
        }
    }

    pub fn settings(&self) -> &FlushSettings {
        &self.settings
    }

    /// Items currently waiting in the buffer.
    pub fn pending(&self) -> usize {
        self.buffer.size()
    }

    /// Token that asks the loop to flush one last time and exit.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Token that interrupts an in-flight send.
    pub fn abort_token(&self) -> CancellationToken {
        self.abort.clone()
    }

    /// Whether a flush is due: the interval has elapsed or enough items wait.
    pub fn needs_flushing(&self, now: Instant) -> bool {
        let since_last = now.saturating_duration_since(self.last_flush);
        since_last >= self.settings.max_flush_interval
            || self.buffer.size() >= self.settings.items_per_batch
    }

    /// Run one cycle. When `terminating`, any buffered item forces a flush.
    pub fn run_task(&mut self, terminating: bool) {
        if (terminating && self.buffer.size() > 0) || self.needs_flushing(Instant::now()) {
            if let Err(err) = self.flush_and_send() {
                self.status
                    .warn(&format!("error while attempting to flush and send: {err}"));
            }
        }
    }

    /// Drain a snapshot of the buffer, aggregate it, and send it.
    ///
    /// Returns the number of items drained.
    ///
    /// # Errors
    ///
    /// Returns [`FlushError`] when aggregation or sending fails. The drained
    /// items are lost in that case.
    pub fn flush_and_send(&mut self) -> Result<usize, FlushError> {
        // Racy: items arriving after the snapshot wait for the next cycle.
        let size = self.buffer.size();
        let mut items = Vec::with_capacity(size);
        let count = self.buffer.drain_to(&mut items, size);
        if count == 0 {
            return Ok(0);
        }
        self.status.debug(&format!(
            "flushing {count} items ({} left)",
            self.buffer.size()
        ));
        let payload =
            (self.aggregate)(items).map_err(|source| FlushError::Aggregation { count, source })?;
        (self.send)(payload, &self.abort)?;
        self.last_flush = Instant::now();
        Ok(count)
    }

    /// Loop until the shutdown token fires, then flush once more and return.
    pub fn run(mut self) {
        loop {
            let terminating = self.shutdown.is_cancelled();
            self.run_task(terminating);
            if terminating {
                self.buffer.flush_warnings();
                return;
            }
            // Cancellation is a wake-up; the flag is re-read at the top.
            self.shutdown.wait_for(self.settings.flush_period);
        }
    }
}

impl<T, P> fmt::Debug for FlushScheduler<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlushScheduler")
            .field("settings", &self.settings)
            .field("buffered", &self.buffer.size())
            .field("terminating", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}
