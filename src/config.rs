//! Bridge configuration.
//!
//! This type intentionally contains no transport-specific concepts
//! (e.g. MQTT client options). The transport layer is responsible for
//! interpreting this config into concrete connection settings.
//!
//! `from_env()` mirrors how the service is deployed: everything comes from
//! `BRIDGE_*` environment variables with sensible defaults for local use.

use std::env;
use std::time::Duration;

/// Default width of a history aggregation bucket.
///
/// Two hours, matching what deployed dashboards already render.
pub const DEFAULT_BUCKET_WIDTH: Duration = Duration::from_secs(7200);

/// Connection and behavior parameters for the bridge process.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    // ---
    /// Broker connection URI.
    ///
    /// `mqtt://host:port` for plain TCP, `mqtts://host:port` for TLS.
    /// `None` selects the in-memory transport (tests, local development).
    pub broker_uri: Option<String>,

    /// Broker username, if the broker requires authentication.
    pub broker_user: Option<String>,

    /// Broker password, paired with `broker_user`.
    pub broker_password: Option<String>,

    /// MQTT client identifier, also used as the logging prefix.
    pub client_id: String,

    /// Topic namespace prefix shared by all sensor and actuator channels
    /// (topics are `<namespace>/<channelKey>`).
    pub namespace: String,

    /// Broker keep-alive interval in seconds.
    pub keep_alive_secs: Option<u16>,

    /// Bind address for the HTTP front end.
    pub http_addr: String,

    /// Width of a history aggregation bucket.
    pub bucket_width: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            broker_uri: None,
            broker_user: None,
            broker_password: None,
            client_id: "growhouse-bridge".to_string(),
            namespace: "growhouse".to_string(),
            keep_alive_secs: None,
            http_addr: "0.0.0.0:8000".to_string(),
            bucket_width: DEFAULT_BUCKET_WIDTH,
        }
    }
}

impl BridgeConfig {
    /// Create a config for the given broker URI, leaving everything else
    /// at its default.
    pub fn with_broker(broker_uri: impl Into<String>) -> Self {
        Self {
            broker_uri: Some(broker_uri.into()),
            ..Self::default()
        }
    }

    /// Create a config backed by the in-memory transport (no broker).
    pub fn memory() -> Self {
        Self::default()
    }

    /// Set broker credentials.
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.broker_user = Some(user.into());
        self.broker_password = Some(password.into());
        self
    }

    /// Set the topic namespace prefix.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set an explicit keep-alive interval.
    pub fn with_keep_alive_secs(mut self, secs: u16) -> Self {
        self.keep_alive_secs = Some(secs);
        self
    }

    /// Set the HTTP bind address.
    pub fn with_http_addr(mut self, addr: impl Into<String>) -> Self {
        self.http_addr = addr.into();
        self
    }

    /// Set the history bucket width.
    pub fn with_bucket_width(mut self, width: Duration) -> Self {
        self.bucket_width = width;
        self
    }

    /// Load configuration from `BRIDGE_*` environment variables.
    ///
    /// Recognized variables:
    /// - `BRIDGE_BROKER_URI` (unset selects the in-memory transport)
    /// - `BRIDGE_BROKER_USER` / `BRIDGE_BROKER_PASSWORD`
    /// - `BRIDGE_CLIENT_ID`
    /// - `BRIDGE_NAMESPACE`
    /// - `BRIDGE_KEEP_ALIVE_SECS`
    /// - `BRIDGE_HTTP_ADDR`
    /// - `BRIDGE_BUCKET_WIDTH_SECS`
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.broker_uri = env::var("BRIDGE_BROKER_URI").ok();
        config.broker_user = env::var("BRIDGE_BROKER_USER").ok();
        config.broker_password = env::var("BRIDGE_BROKER_PASSWORD").ok();

        if let Ok(id) = env::var("BRIDGE_CLIENT_ID") {
            config.client_id = id;
        }
        if let Ok(ns) = env::var("BRIDGE_NAMESPACE") {
            config.namespace = ns;
        }
        if let Some(secs) = env::var("BRIDGE_KEEP_ALIVE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.keep_alive_secs = Some(secs);
        }
        if let Ok(addr) = env::var("BRIDGE_HTTP_ADDR") {
            config.http_addr = addr;
        }
        if let Some(secs) = env::var("BRIDGE_BUCKET_WIDTH_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.bucket_width = Duration::from_secs(secs);
        }

        config
    }
}
