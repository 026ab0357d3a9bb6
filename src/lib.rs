//! Buffered, batching log shipping over HTTP.
//!
//! Log lines go into a cost-bounded buffer that evicts the oldest entries
//! under pressure. A background flusher drains the buffer on a schedule,
//! concatenates the drained lines, and hands the batch to a sender that
//! retries transient failures with jittered exponential backoff.
//!
//! Most users only need [`LogShipper`] and its [`ShipperBuilder`]. The
//! building blocks are public for callers who want their own item type,
//! aggregation, or transport.

pub mod cancel;
pub mod error;
pub mod flusher;
pub mod http_sender;
#[cfg(feature = "log-compat")]
pub mod log_compat;
pub mod queue;
pub mod rate_limited_warner;
pub mod shipper;
pub mod status;

#[cfg(test)]
mod test_utils;

pub use cancel::CancellationToken;
pub use error::BuildError;
pub use flusher::{BufferFlusher, FlushError, FlushScheduler, FlushSettings, LifecycleError};
pub use http_sender::{
    HttpTransport, OutboundRequest, RetryPolicy, RetryingSender, SendError, SendOutcome,
    TransportError, UreqTransport,
};
#[cfg(feature = "log-compat")]
pub use log_compat::ShipperLogAdapter;
pub use queue::{CostBoundedQueue, EvictingBuffer, FifoEvictionBuffer};
pub use shipper::{LogShipper, ShipperBuilder, ShipperConfig};
pub use status::{LogStatus, STATUS_TARGET, SharedStatus, StatusLogger};
