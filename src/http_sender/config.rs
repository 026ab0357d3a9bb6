//! Configuration consumed by the retrying sender and its transport.

use std::{collections::HashMap, time::Duration};

use super::retry::RetryPolicy;

/// Default base interval between delivery retries.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(10);
/// Default timeout for establishing a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);
/// Default read/write timeout on an established connection.
pub const DEFAULT_SOCKET_TIMEOUT: Duration = Duration::from_secs(60);
/// Client identifier sent when none is configured.
pub const DEFAULT_CLIENT_NAME: &str = "logship-rust";

pub const SOURCE_NAME_HEADER: &str = "X-Sumo-Name";
pub const SOURCE_HOST_HEADER: &str = "X-Sumo-Host";
pub const SOURCE_CATEGORY_HEADER: &str = "X-Sumo-Category";
pub const CLIENT_HEADER: &str = "X-Sumo-Client";

/// Descriptive headers attached to every request when set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceHeaders {
    pub name: Option<String>,
    pub host: Option<String>,
    pub category: Option<String>,
    pub client: Option<String>,
}

impl SourceHeaders {
    pub(crate) fn to_pairs(&self) -> Vec<(String, String)> {
        [
            (SOURCE_NAME_HEADER, &self.name),
            (SOURCE_HOST_HEADER, &self.host),
            (SOURCE_CATEGORY_HEADER, &self.category),
            (CLIENT_HEADER, &self.client),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| (key.to_string(), v.clone())))
        .collect()
    }
}

/// Credentials presented to an HTTP proxy.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ProxyAuth {
    #[default]
    None,
    Basic { username: String, password: String },
}

/// HTTP proxy the transport should tunnel through.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxySettings {
    pub host: String,
    pub port: u16,
    pub auth: ProxyAuth,
}

impl ProxySettings {
    /// Proxy URL in the form `ureq::Proxy::new` expects.
    pub(crate) fn to_url(&self) -> String {
        match &self.auth {
            ProxyAuth::None => format!("http://{}:{}", self.host, self.port),
            ProxyAuth::Basic { username, password } => {
                format!("http://{username}:{password}@{}:{}", self.host, self.port)
            }
        }
    }
}

/// Settings for the production HTTP transport.
#[derive(Clone, Debug)]
pub struct TransportConfig {
    pub connect_timeout: Duration,
    pub socket_timeout: Duration,
    pub proxy: Option<ProxySettings>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            socket_timeout: DEFAULT_SOCKET_TIMEOUT,
            proxy: None,
        }
    }
}

/// Settings for [`RetryingSender`](super::RetryingSender).
#[derive(Clone, Debug)]
pub struct SenderConfig {
    /// Collector endpoint receiving the POSTs.
    pub url: String,
    /// Base delay of the exponential backoff.
    pub retry_interval: Duration,
    /// Gzip the body and send `Content-Encoding: gzip`.
    pub compress: bool,
    pub source: SourceHeaders,
    /// Additional headers sent verbatim.
    pub headers: HashMap<String, String>,
    pub retry_policy: RetryPolicy,
}

impl SenderConfig {
    /// Configuration posting to `url` with default retry behaviour.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            retry_interval: DEFAULT_RETRY_INTERVAL,
            compress: true,
            source: SourceHeaders {
                client: Some(DEFAULT_CLIENT_NAME.to_string()),
                ..SourceHeaders::default()
            },
            headers: HashMap::new(),
            retry_policy: RetryPolicy::default(),
        }
    }
}
