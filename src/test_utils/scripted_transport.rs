//! An [`HttpTransport`] that replays scripted outcomes.
//!
//! Each call to `post` consumes the next scripted result and records the
//! request. Once the script runs out every request succeeds with 200.

use std::{collections::VecDeque, sync::Arc};

use parking_lot::Mutex;

use crate::http_sender::{HttpTransport, OutboundRequest, TransportError};

/// Request as seen by the scripted transport.
#[derive(Clone, Debug)]
pub struct CapturedRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    /// Value of the first header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<VecDeque<Result<u16, TransportError>>>>,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    fail_forever: bool,
}

impl ScriptedTransport {
    /// Transport answering with the given statuses in order, then 200.
    pub fn with_statuses(statuses: impl IntoIterator<Item = u16>) -> Self {
        let transport = Self::default();
        transport.script.lock().extend(statuses.into_iter().map(Ok));
        transport
    }

    /// Transport failing every request at the transport level.
    pub fn failing() -> Self {
        Self {
            fail_forever: true,
            ..Self::default()
        }
    }

    /// Queue a transport-level failure before the remaining script.
    pub fn push_front_error(&self, message: &str) {
        self.script
            .lock()
            .push_front(Err(TransportError::Request(message.to_string())));
    }

    /// Snapshot of requests received so far.
    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl HttpTransport for ScriptedTransport {
    fn post(&self, request: &OutboundRequest<'_>) -> Result<u16, TransportError> {
        self.requests.lock().push(CapturedRequest {
            url: request.url.to_string(),
            headers: request.headers.to_vec(),
            body: request.body.to_vec(),
        });
        if self.fail_forever {
            return Err(TransportError::Request("connection refused".into()));
        }
        self.script.lock().pop_front().unwrap_or(Ok(200))
    }
}
