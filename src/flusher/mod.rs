//! Background flushing of an [`EvictingBuffer`](crate::queue::EvictingBuffer).
//!
//! [`FlushScheduler`] holds the loop itself: wake every `flush_period`,
//! decide whether a flush is due, drain, aggregate, send. [`BufferFlusher`]
//! owns the thread running it and gives it a start/stop lifecycle.
//!
//! Stopping is bounded. `stop` wakes the loop for a final flush and waits
//! for at most `max_flush_timeout + flush_period + 1ms`. If the final send is
//! still retrying at that point it is cancelled and the thread is detached.
//! Stopping a flusher that was never started runs the same final flush.

mod scheduler;


use std::{io, thread};

use crossbeam_channel::{Receiver, RecvTimeoutError, bounded};
use parking_lot::Mutex;
use thiserror::Error;

use crate::{cancel::CancellationToken, status::SharedStatus};

pub use scheduler::{
    AggregateFn, BoxError, DEFAULT_FLUSH_PERIOD, DEFAULT_ITEMS_PER_BATCH,
    DEFAULT_MAX_FLUSH_INTERVAL, DEFAULT_MAX_FLUSH_TIMEOUT, FlushError, FlushScheduler,
    FlushSettings, SendFn,
};

/// Name given to the flush thread.
pub(crate) const THREAD_NAME: &str = "logship-flusher";

/// Misuse of the flusher lifecycle.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("buffer flusher already started")]
    AlreadyStarted,
    #[error("buffer flusher already stopped")]
    AlreadyStopped,
    #[error("failed to spawn flusher thread: {0}")]
    Spawn(#[from] io::Error),
}

enum State<T, P> {
    Idle(FlushScheduler<T, P>),
    Running {
        handle: thread::JoinHandle<()>,
        done_rx: Receiver<()>,
    },
    Stopped,
}

/// Owner of the flush thread.
pub struct BufferFlusher<T: Send + 'static, P: 'static> {
    state: Mutex<State<T, P>>,
    shutdown: CancellationToken,
    abort: CancellationToken,
    settings: FlushSettings,
    status: SharedStatus,
}

impl<T, P> BufferFlusher<T, P>
where
    T: Send + 'static,
    P: 'static,
{
    pub fn new(scheduler: FlushScheduler<T, P>, status: SharedStatus) -> Self {
        Self {
            shutdown: scheduler.shutdown_token(),
            abort: scheduler.abort_token(),
            settings: *scheduler.settings(),
            state: Mutex::new(State::Idle(scheduler)),
            status,
        }
    }

    /// Spawn the flush thread.
    ///
    /// # Errors
    ///
    /// Fails if the flusher was started before or the thread cannot be
    /// spawned. A failed spawn leaves the flusher stopped.
    pub fn start(&self) -> Result<(), LifecycleError> {
        let mut state = self.state.lock();
        let scheduler = match std::mem::replace(&mut *state, State::Stopped) {
            State::Idle(scheduler) => scheduler,
            running @ State::Running { .. } => {
                *state = running;
                return Err(LifecycleError::AlreadyStarted);
            }
            State::Stopped => return Err(LifecycleError::AlreadyStopped),
        };
        let (handle, done_rx) = spawn(scheduler)?;
        *state = State::Running { handle, done_rx };
        Ok(())
    }
}

fn spawn<T, P>(
    scheduler: FlushScheduler<T, P>,
) -> io::Result<(thread::JoinHandle<()>, Receiver<()>)>
where
    T: Send + 'static,
    P: 'static,
{
    let (done_tx, done_rx) = bounded(1);
    let handle = thread::Builder::new()
        .name(THREAD_NAME.to_string())
        .spawn(move || {
            scheduler.run();
            let _ = done_tx.send(());
        })?;
    Ok((handle, done_rx))
}

impl<T, P> BufferFlusher<T, P>
where
    T: Send + 'static,
    P: 'static,
{
    /// Ask the loop to flush what is buffered and exit, waiting a bounded
    /// time for it.
    ///
    /// A flusher that was never started still runs its final flush, on a
    /// thread spawned for that purpose alone.
    ///
    /// Returns `false` when the final flush did not finish within the grace
    /// period, or could not run at all. Its in-flight send is cancelled and
    /// the thread is left to exit on its own. Calling `stop` again is a
    /// no-op returning `true`.
    pub fn stop(&self) -> bool {
        let previous = std::mem::replace(&mut *self.state.lock(), State::Stopped);
        self.shutdown.cancel();
        let (handle, done_rx) = match previous {
            State::Running { handle, done_rx } => (handle, done_rx),
            State::Idle(scheduler) if scheduler.pending() > 0 => {
                let pending = scheduler.pending();
                match spawn(scheduler) {
                    Ok(running) => running,
                    Err(err) => {
                        self.status.error(&format!(
                            "could not spawn final flush, {pending} items not sent: {err}"
                        ));
                        return false;
                    }
                }
            }
            State::Idle(_) | State::Stopped => return true,
        };
        self.await_exit(handle, &done_rx)
    }

    fn await_exit(&self, handle: thread::JoinHandle<()>, done_rx: &Receiver<()>) -> bool {
        if let Err(RecvTimeoutError::Timeout) = done_rx.recv_timeout(self.settings.shutdown_grace())
        {
            self.abort.cancel();
            self.status
                .warn("timed out waiting for buffer flusher to finish");
            return false;
        }
        if handle.join().is_err() {
            self.status.error("buffer flusher thread panicked");
        }
        true
    }
}

impl<T: Send + 'static, P: 'static> BufferFlusher<T, P> {
    pub fn is_running(&self) -> bool {
        matches!(*self.state.lock(), State::Running { .. })
    }
}

impl<T: Send + 'static, P: 'static> Drop for BufferFlusher<T, P> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<T: Send + 'static, P: 'static> std::fmt::Debug for BufferFlusher<T, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match *self.state.lock() {
            State::Idle(_) => "idle",
            State::Running { .. } => "running",
            State::Stopped => "stopped",
        };
        f.debug_struct("BufferFlusher")
            .field("state", &state)
            .field("settings", &self.settings)
            .finish()
    }
}
