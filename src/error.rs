//! Errors surfaced while configuring the shipper.

use thiserror::Error;

/// Errors that may occur while building a shipper or its transport.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Invalid user supplied configuration.
    #[error("invalid shipper configuration: {0}")]
    InvalidConfig(String),
    /// The retryable status pattern is not a valid regular expression.
    #[error("invalid retryable status pattern: {0}")]
    Pattern(#[from] regex::Error),
    /// The TLS backend could not be initialised.
    #[error("failed to initialise TLS: {0}")]
    Tls(#[from] native_tls::Error),
    /// The proxy settings could not be turned into a proxy.
    #[error("invalid proxy settings: {0}")]
    Proxy(String),
}
