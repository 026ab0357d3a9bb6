//! The seam between the sender and the HTTP client.
//!
//! [`HttpTransport`] performs exactly one blocking POST and reports the
//! response status. It knows nothing about retries; that is the sender's
//! job. [`UreqTransport`] is the production implementation on top of a
//! pooled `ureq::Agent`.

use std::{io, sync::Arc};

use thiserror::Error;
use ureq::{Agent, AgentBuilder};

use crate::error::BuildError;

use super::config::TransportConfig;

/// One outbound POST.
#[derive(Clone, Copy, Debug)]
pub struct OutboundRequest<'a> {
    pub url: &'a str,
    pub headers: &'a [(String, String)],
    pub body: &'a [u8],
}

/// Failure of a single HTTP exchange below the status-code level.
///
/// Always treated as transient by the sender.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be sent or no response arrived.
    #[error("request failed: {0}")]
    Request(String),
    /// The response arrived but its body could not be consumed.
    #[error("failed to read response body: {0}")]
    Body(#[from] io::Error),
}

/// Blocking HTTP client capable of a single POST.
pub trait HttpTransport: Send {
    /// Send `request` and return the response status code.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when no status could be obtained.
    fn post(&self, request: &OutboundRequest<'_>) -> Result<u16, TransportError>;
}

impl<T: HttpTransport + Sync> HttpTransport for Arc<T> {
    fn post(&self, request: &OutboundRequest<'_>) -> Result<u16, TransportError> {
        (**self).post(request)
    }
}

/// Production transport backed by a connection-pooling `ureq::Agent`.
#[derive(Clone, Debug)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    /// Build an agent with the configured timeouts, native TLS, and proxy.
    ///
    /// # Errors
    ///
    /// Fails if the TLS backend cannot be initialised or the proxy settings
    /// are rejected by `ureq`.
    pub fn new(config: &TransportConfig) -> Result<Self, BuildError> {
        let tls = native_tls::TlsConnector::new()?;
        let mut builder = AgentBuilder::new()
            .timeout_connect(config.connect_timeout)
            .timeout_read(config.socket_timeout)
            .timeout_write(config.socket_timeout)
            .tls_connector(Arc::new(tls));
        if let Some(proxy) = &config.proxy {
            let proxy = ureq::Proxy::new(proxy.to_url())
                .map_err(|err| BuildError::Proxy(err.to_string()))?;
            builder = builder.proxy(proxy);
        }
        Ok(Self {
            agent: builder.build(),
        })
    }

    /// Wrap an agent the caller has already configured.
    pub fn from_agent(agent: Agent) -> Self {
        Self { agent }
    }
}

impl HttpTransport for UreqTransport {
    fn post(&self, request: &OutboundRequest<'_>) -> Result<u16, TransportError> {
        let mut req = self.agent.post(request.url);
        for (key, value) in request.headers {
            req = req.set(key, value);
        }
        match req.send_bytes(request.body) {
            Ok(response) => consume(response),
            Err(ureq::Error::Status(_, response)) => consume(response),
            Err(ureq::Error::Transport(err)) => Err(TransportError::Request(err.to_string())),
        }
    }
}

/// Read the body to the end so the pooled connection can be reused.
fn consume(response: ureq::Response) -> Result<u16, TransportError> {
    let status = response.status();
    io::copy(&mut response.into_reader(), &mut io::sink())?;
    Ok(status)
}
