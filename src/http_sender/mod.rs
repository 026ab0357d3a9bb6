//! Retrying HTTP delivery of aggregated log batches.
//!
//! [`RetryingSender`] posts one payload at a time through an
//! [`HttpTransport`] and blocks until the collector accepts it, rejects it
//! permanently, or the caller's [`CancellationToken`](crate::cancel::CancellationToken)
//! fires.
//!
//! # Retry Semantics
//!
//! - **2xx**: Success.
//! - **503, or a status matching the retryable pattern (default `^5.*`)**:
//!   Retryable - back off and retry.
//! - **Network errors**: Retryable - back off and retry.
//! - **Anything else**: Permanent - log a warning and treat the payload as
//!   handled.
//!
//! The delay before retry `n` is `retry_interval * 2^(n-1)`, capped at
//! `100 * retry_interval`, with Gaussian jitter of a quarter of the delay.

mod aggregate;
mod config;
mod retry;
mod sender;
mod transport;


pub use aggregate::{concatenate, gzip};
pub use config::{
    CLIENT_HEADER, DEFAULT_CLIENT_NAME, DEFAULT_CONNECT_TIMEOUT, DEFAULT_RETRY_INTERVAL,
    DEFAULT_SOCKET_TIMEOUT, ProxyAuth, ProxySettings, SOURCE_CATEGORY_HEADER, SOURCE_HOST_HEADER,
    SOURCE_NAME_HEADER, SenderConfig, SourceHeaders, TransportConfig,
};
pub use retry::{
    DEFAULT_RETRYABLE_STATUS_PATTERN, MAX_BACKOFF_FACTOR, ResponseClass, RetryPolicy,
    exponential_backoff, jitter, nominal_backoff,
};
pub use sender::{RetryingSender, SendError, SendOutcome};
pub use transport::{HttpTransport, OutboundRequest, TransportError, UreqTransport};
