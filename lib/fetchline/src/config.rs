//! Default request configuration and transport configuration.

use std::collections::HashMap;
use std::time::Duration;

use fetchline_core::{JSON_CONTENT_TYPE, Method};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Defaults every request starts from before caller overrides are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchDefaults {
    /// HTTP method (GET).
    pub method: Method,
    /// Prefix for relative URLs.
    pub base_url: Option<String>,
    /// Request timeout.
    pub timeout: Duration,
    /// Request headers (`Content-Type: application/json`).
    pub headers: HashMap<String, String>,
}

impl Default for FetchDefaults {
    fn default() -> Self {
        Self {
            method: Method::Get,
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            headers: HashMap::from([(
                "Content-Type".to_string(),
                JSON_CONTENT_TYPE.to_string(),
            )]),
        }
    }
}

impl FetchDefaults {
    /// Create a new defaults builder.
    #[must_use]
    pub fn builder() -> FetchDefaultsBuilder {
        FetchDefaultsBuilder::default()
    }
}

/// Builder for [`FetchDefaults`].
#[derive(Debug, Clone, Default)]
pub struct FetchDefaultsBuilder {
    method: Option<Method>,
    base_url: Option<String>,
    timeout: Option<Duration>,
    headers: HashMap<String, String>,
}

impl FetchDefaultsBuilder {
    /// Set the default method.
    #[must_use]
    pub const fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Set the base URL relative paths are joined to.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the default timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add or replace a default header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Build the defaults.
    #[must_use]
    pub fn build(self) -> FetchDefaults {
        let defaults = FetchDefaults::default();
        let mut headers = defaults.headers;
        for (name, value) in self.headers {
            headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
            headers.insert(name, value);
        }

        FetchDefaults {
            method: self.method.unwrap_or(defaults.method),
            base_url: self.base_url.or(defaults.base_url),
            timeout: self.timeout.unwrap_or(defaults.timeout),
            headers,
        }
    }
}

/// Configuration of the hyper transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Connection timeout duration.
    pub connect_timeout: Duration,
    /// Maximum idle connections per host.
    pub pool_idle_per_host: usize,
    /// Idle connection timeout.
    pub pool_idle_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            pool_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
        }
    }
}

impl TransportConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> TransportConfigBuilder {
        TransportConfigBuilder::default()
    }
}

/// Builder for [`TransportConfig`].
#[derive(Debug, Clone, Default)]
pub struct TransportConfigBuilder {
    connect_timeout: Option<Duration>,
    pool_idle_per_host: Option<usize>,
    pool_idle_timeout: Option<Duration>,
}

impl TransportConfigBuilder {
    /// Set the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub const fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.pool_idle_per_host = Some(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub const fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> TransportConfig {
        let defaults = TransportConfig::default();
        TransportConfig {
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            pool_idle_per_host: self
                .pool_idle_per_host
                .unwrap_or(defaults.pool_idle_per_host),
            pool_idle_timeout: self.pool_idle_timeout.unwrap_or(defaults.pool_idle_timeout),
        }
    }
}
