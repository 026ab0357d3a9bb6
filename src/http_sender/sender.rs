//! Blocking delivery of one payload with exponential backoff.

use std::{borrow::Cow, io, time::Duration};

use thiserror::Error;

use crate::{cancel::CancellationToken, status::SharedStatus};

use super::{
    aggregate::gzip,
    config::SenderConfig,
    retry::{ResponseClass, RetryPolicy, exponential_backoff},
    transport::{HttpTransport, OutboundRequest},
};

/// How a call to [`RetryingSender::send`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The collector accepted the payload.
    Delivered { attempts: u32 },
    /// The collector answered with a non-retryable status. The payload is
    /// considered handled and is not retried.
    Rejected { status: u16 },
    /// Cancellation arrived before delivery succeeded. The payload is lost.
    Cancelled { attempts: u32 },
}

/// Local failure that makes a payload unsendable.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("failed to compress payload: {0}")]
    Compression(#[from] io::Error),
}

/// Posts payloads and keeps retrying transient failures until delivery or
/// cancellation.
pub struct RetryingSender<T> {
    transport: T,
    url: String,
    headers: Vec<(String, String)>,
    retry_interval: Duration,
    compress: bool,
    policy: RetryPolicy,
    status: SharedStatus,
}

impl<T: HttpTransport> RetryingSender<T> {
    pub fn new(transport: T, config: SenderConfig, status: SharedStatus) -> Self {
        let mut headers = config.source.to_pairs();
        headers.extend(config.headers);
        if config.compress {
            headers.push(("Content-Encoding".to_string(), "gzip".to_string()));
        }
        Self {
            transport,
            url: config.url,
            headers,
            retry_interval: config.retry_interval,
            compress: config.compress,
            policy: config.retry_policy,
            status,
        }
    }

    /// Jittered delay applied before retry number `n_try`.
    pub fn backoff_delay(&self, n_try: u32) -> Duration {
        exponential_backoff(self.retry_interval, n_try)
    }

    /// Deliver `payload`, blocking until it is accepted, rejected, or
    /// `cancel` fires.
    ///
    /// Transport failures and retryable statuses never surface as errors;
    /// they are retried after a backoff sleep that `cancel` interrupts.
    ///
    /// # Errors
    ///
    /// Returns [`SendError`] only when the payload cannot be prepared.
    pub fn send(
        &self,
        payload: &[u8],
        cancel: &CancellationToken,
    ) -> Result<SendOutcome, SendError> {
        let body = if self.compress {
            Cow::Owned(gzip(payload)?)
        } else {
            Cow::Borrowed(payload)
        };
        let request = OutboundRequest {
            url: &self.url,
            headers: &self.headers,
            body: &body,
        };

        let mut attempts = 0u32;
        let mut n_try = 1u32;
        while !cancel.is_cancelled() {
            attempts = attempts.saturating_add(1);
            let failure = match self.transport.post(&request) {
                Ok(status) => match self.policy.classify(status) {
                    ResponseClass::Success => {
                        self.status.debug("successfully sent log batch");
                        return Ok(SendOutcome::Delivered { attempts });
                    }
                    ResponseClass::Permanent => {
                        self.status.warn(&format!(
                            "received HTTP error {status} from collector; not retrying"
                        ));
                        return Ok(SendOutcome::Rejected { status });
                    }
                    ResponseClass::Retryable => {
                        format!("received retryable HTTP status {status} from collector")
                    }
                },
                Err(err) => format!("could not send log batch: {err}"),
            };

            let delay = self.backoff_delay(n_try);
            self.status
                .warn(&format!("{failure}; retrying in {delay:?} (attempt {attempts})"));
            if cancel.wait_for(delay) {
                break;
            }
            n_try = n_try.saturating_add(1);
        }
        self.status
            .warn(&format!("log batch not sent after {attempts} attempts: cancelled"));
        Ok(SendOutcome::Cancelled { attempts })
    }
}

impl<T> std::fmt::Debug for RetryingSender<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingSender")
            .field("url", &self.url)
            .field("retry_interval", &self.retry_interval)
            .field("compress", &self.compress)
            .field("retryable", &self.policy.pattern())
            .finish()
    }
}
