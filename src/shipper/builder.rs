//! Builder for [`LogShipper`](super::LogShipper).
//!
//! Every setting is optional except the collector URL. Unset values fall
//! back to the defaults in [`ShipperConfig::new`], and all numeric settings
//! must be greater than zero.

use std::{collections::HashMap, fmt, time::Duration};

use crate::{
    error::BuildError,
    http_sender::{
        HttpTransport, ProxyAuth, ProxySettings, RetryPolicy, SourceHeaders, UreqTransport,
    },
    status::{SharedStatus, default_status},
};

use super::{LogShipper, config::ShipperConfig};

macro_rules! ensure_positive {
    ($value:expr, $field:expr) => {{
        if $value == 0 {
            Err(BuildError::InvalidConfig(format!(
                "{} must be greater than zero",
                $field
            )))
        } else {
            Ok($value)
        }
    }};
}

macro_rules! option_setter {
    ($(#[$meta:meta])* $fn_name:ident, $field:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $fn_name(mut self, value: $ty) -> Self {
            self.$field = Some(value);
            self
        }
    };
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct ProxyCredentials {
    scheme: String,
    username: String,
    password: String,
}

/// Builder for constructing [`LogShipper`] instances.
#[derive(Clone, Default)]
pub struct ShipperBuilder {
    url: Option<String>,
    source_name: Option<String>,
    source_host: Option<String>,
    source_category: Option<String>,
    client_name: Option<String>,
    headers: HashMap<String, String>,
    max_queue_size_bytes: Option<u64>,
    flushing_accuracy_ms: Option<u64>,
    max_flush_interval_ms: Option<u64>,
    messages_per_request: Option<usize>,
    retry_interval_ms: Option<u64>,
    connect_timeout_ms: Option<u64>,
    socket_timeout_ms: Option<u64>,
    max_flush_timeout_ms: Option<u64>,
    warn_interval_ms: Option<u64>,
    retryable_status_pattern: Option<String>,
    compress: Option<bool>,
    proxy: Option<(String, u16)>,
    proxy_auth: Option<ProxyCredentials>,
    status: Option<SharedStatus>,
}

impl ShipperBuilder {
    /// Create a new builder with no URL configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the collector URL (required).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the `X-Sumo-Name` header.
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }

    /// Set the `X-Sumo-Host` header.
    pub fn with_source_host(mut self, host: impl Into<String>) -> Self {
        self.source_host = Some(host.into());
        self
    }

    /// Set the `X-Sumo-Category` header.
    pub fn with_source_category(mut self, category: impl Into<String>) -> Self {
        self.source_category = Some(category.into());
        self
    }

    /// Override the `X-Sumo-Client` header.
    pub fn with_client_name(mut self, client: impl Into<String>) -> Self {
        self.client_name = Some(client.into());
        self
    }

    /// Add a single custom HTTP header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    option_setter!(
        #[doc = "Set the buffer capacity in bytes."]
        with_max_queue_size_bytes,
        max_queue_size_bytes,
        u64
    );
    option_setter!(
        #[doc = "Set how often, in milliseconds, the flusher checks whether a flush is due."]
        with_flushing_accuracy_ms,
        flushing_accuracy_ms,
        u64
    );
    option_setter!(
        #[doc = "Set the longest time, in milliseconds, an item may wait unflushed."]
        with_max_flush_interval_ms,
        max_flush_interval_ms,
        u64
    );
    option_setter!(
        #[doc = "Set the buffered item count that forces an immediate flush."]
        with_messages_per_request,
        messages_per_request,
        usize
    );
    option_setter!(
        #[doc = "Set the base retry interval in milliseconds."]
        with_retry_interval_ms,
        retry_interval_ms,
        u64
    );
    option_setter!(
        #[doc = "Set the connect timeout in milliseconds."]
        with_connect_timeout_ms,
        connect_timeout_ms,
        u64
    );
    option_setter!(
        #[doc = "Set the socket read/write timeout in milliseconds."]
        with_socket_timeout_ms,
        socket_timeout_ms,
        u64
    );
    option_setter!(
        #[doc = "Set how long, in milliseconds, shutdown waits for the final flush."]
        with_max_flush_timeout_ms,
        max_flush_timeout_ms,
        u64
    );
    option_setter!(
        #[doc = "Set the minimum spacing of drop summaries in milliseconds."]
        with_warn_interval_ms,
        warn_interval_ms,
        u64
    );
    option_setter!(
        #[doc = "Enable or disable gzip compression of request bodies."]
        with_compression,
        compress,
        bool
    );

    /// Retry statuses whose decimal form matches `pattern`. 503 is always
    /// retried.
    pub fn with_retryable_status_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.retryable_status_pattern = Some(pattern.into());
        self
    }

    /// Route requests through an HTTP proxy.
    pub fn with_proxy(mut self, host: impl Into<String>, port: u16) -> Self {
        self.proxy = Some((host.into(), port));
        self
    }

    /// Authenticate to the proxy. Only the `basic` scheme is supported.
    pub fn with_proxy_auth(
        mut self,
        scheme: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.proxy_auth = Some(ProxyCredentials {
            scheme: scheme.into(),
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Report diagnostics to `status` instead of the `log` crate.
    pub fn with_status(mut self, status: SharedStatus) -> Self {
        self.status = Some(status);
        self
    }

    fn validate(&self) -> Result<(), BuildError> {
        self.validate_url()?;
        self.validate_sizes()?;
        self.validate_intervals()?;
        Ok(())
    }

    fn validate_url(&self) -> Result<(), BuildError> {
        match &self.url {
            None => Err(BuildError::InvalidConfig("log shipper requires a URL".into())),
            Some(url) if url.trim().is_empty() => {
                Err(BuildError::InvalidConfig("URL must not be empty".into()))
            }
            _ => Ok(()),
        }
    }

    fn validate_sizes(&self) -> Result<(), BuildError> {
        if let Some(size) = self.max_queue_size_bytes {
            ensure_positive!(size, "max_queue_size_bytes")?;
        }
        if let Some(count) = self.messages_per_request {
            ensure_positive!(count, "messages_per_request")?;
        }
        Ok(())
    }

    fn validate_intervals(&self) -> Result<(), BuildError> {
        let intervals = [
            (self.flushing_accuracy_ms, "flushing_accuracy_ms"),
            (self.max_flush_interval_ms, "max_flush_interval_ms"),
            (self.retry_interval_ms, "retry_interval_ms"),
            (self.connect_timeout_ms, "connect_timeout_ms"),
            (self.socket_timeout_ms, "socket_timeout_ms"),
            (self.max_flush_timeout_ms, "max_flush_timeout_ms"),
            (self.warn_interval_ms, "warn_interval_ms"),
        ];
        for (value, field) in intervals {
            if let Some(ms) = value {
                ensure_positive!(ms, field)?;
            }
        }
        Ok(())
    }

    fn build_proxy(&self) -> Result<Option<ProxySettings>, BuildError> {
        let Some((host, port)) = &self.proxy else {
            if self.proxy_auth.is_some() {
                return Err(BuildError::InvalidConfig(
                    "proxy authentication requires a proxy host".into(),
                ));
            }
            return Ok(None);
        };
        if host.trim().is_empty() {
            return Err(BuildError::InvalidConfig("proxy host must not be empty".into()));
        }
        ensure_positive!(*port, "proxy port")?;
        let auth = match &self.proxy_auth {
            None => ProxyAuth::None,
            Some(creds) if creds.scheme.eq_ignore_ascii_case("basic") => ProxyAuth::Basic {
                username: creds.username.clone(),
                password: creds.password.clone(),
            },
            Some(creds) => {
                return Err(BuildError::Proxy(format!(
                    "unsupported proxy authentication scheme: {}",
                    creds.scheme
                )));
            }
        };
        Ok(Some(ProxySettings {
            host: host.clone(),
            port: *port,
            auth,
        }))
    }

    /// Validate the settings and resolve them into a [`ShipperConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] when the URL is missing, a numeric setting is
    /// zero, the retry pattern does not compile, or the proxy settings are
    /// unusable.
    pub fn build_config(&self) -> Result<ShipperConfig, BuildError> {
        self.validate()?;

        let mut config = ShipperConfig::new(self.url.clone().unwrap_or_default());
        let millis =
            |value: Option<u64>, default: Duration| value.map_or(default, Duration::from_millis);

        let sender = &mut config.sender;
        sender.source = SourceHeaders {
            name: self.source_name.clone(),
            host: self.source_host.clone(),
            category: self.source_category.clone(),
            client: self.client_name.clone().or(sender.source.client.take()),
        };
        sender.headers = self.headers.clone();
        sender.retry_interval = millis(self.retry_interval_ms, sender.retry_interval);
        sender.compress = self.compress.unwrap_or(sender.compress);
        if let Some(pattern) = &self.retryable_status_pattern {
            sender.retry_policy = RetryPolicy::from_pattern(pattern)?;
        }

        let transport = &mut config.transport;
        transport.connect_timeout = millis(self.connect_timeout_ms, transport.connect_timeout);
        transport.socket_timeout = millis(self.socket_timeout_ms, transport.socket_timeout);
        transport.proxy = self.build_proxy()?;

        let flush = &mut config.flush;
        flush.flush_period = millis(self.flushing_accuracy_ms, flush.flush_period);
        flush.max_flush_interval = millis(self.max_flush_interval_ms, flush.max_flush_interval);
        flush.max_flush_timeout = millis(self.max_flush_timeout_ms, flush.max_flush_timeout);
        flush.items_per_batch = self.messages_per_request.unwrap_or(flush.items_per_batch);

        config.max_queue_size_bytes = self
            .max_queue_size_bytes
            .unwrap_or(config.max_queue_size_bytes);
        config.warn_interval = millis(self.warn_interval_ms, config.warn_interval);
        Ok(config)
    }

    /// Build a shipper posting through a [`UreqTransport`].
    ///
    /// The shipper is returned idle; call [`LogShipper::start`] to begin
    /// flushing.
    ///
    /// # Errors
    ///
    /// See [`build_config`](Self::build_config). Also fails when the TLS
    /// backend or proxy cannot be set up.
    pub fn build(self) -> Result<LogShipper, BuildError> {
        let config = self.build_config()?;
        let transport = UreqTransport::new(&config.transport)?;
        Ok(LogShipper::with_transport(config, transport, self.status_or_default()))
    }

    /// Build a shipper posting through `transport`.
    ///
    /// Timeouts and proxy settings are ignored; they configure the default
    /// transport only.
    ///
    /// # Errors
    ///
    /// See [`build_config`](Self::build_config).
    pub fn build_with_transport<T>(self, transport: T) -> Result<LogShipper, BuildError>
    where
        T: HttpTransport + 'static,
    {
        let config = self.build_config()?;
        Ok(LogShipper::with_transport(config, transport, self.status_or_default()))
    }

    fn status_or_default(&self) -> SharedStatus {
        self.status.clone().unwrap_or_else(default_status)
    }
}

impl fmt::Debug for ShipperBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShipperBuilder")
            .field("url", &self.url)
            .field("source_name", &self.source_name)
            .field("source_host", &self.source_host)
            .field("source_category", &self.source_category)
            .field("client_name", &self.client_name)
            .field("max_queue_size_bytes", &self.max_queue_size_bytes)
            .field("messages_per_request", &self.messages_per_request)
            .field("compress", &self.compress)
            .finish_non_exhaustive()
    }
}
