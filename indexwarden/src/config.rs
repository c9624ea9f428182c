//! Engine connection configuration.

use crate::error::{Result, WardenError};
use std::env;
use std::time::Duration;

/// Environment variable prefix read by [`ClientConfig::from_env`].
pub const ENV_PREFIX: &str = "INDEXWARDEN";

/// Connection settings for the OpenSearch engine adapter.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Node URL(s). Only the first one is used for the single-node pool.
    pub urls: Vec<String>,
    /// Basic auth username.
    pub username: Option<String>,
    /// Basic auth password.
    pub password: Option<String>,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Bypass any system proxy.
    pub disable_proxy: bool,
}

impl ClientConfig {
    /// Create a configuration for a single node.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            password: None,
            request_timeout: Duration::from_secs(30),
            disable_proxy: true,
        }
    }

    /// Read `INDEXWARDEN_URL`, `INDEXWARDEN_USERNAME`, `INDEXWARDEN_PASSWORD`
    /// and `INDEXWARDEN_REQUEST_TIMEOUT_SECS`, after loading a `.env` file if
    /// one is present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (environment, test map, ...).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(&format!("{}_{}", ENV_PREFIX, name));

        let url = var("URL").unwrap_or_else(|| "http://localhost:9200".to_string());
        let mut config = Self::new(url);

        if let (Some(user), Some(pass)) = (var("USERNAME"), var("PASSWORD")) {
            config = config.with_basic_auth(user, pass);
        }

        if let Some(secs) = var("REQUEST_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                WardenError::Config(format!(
                    "{}_REQUEST_TIMEOUT_SECS must be a number of seconds, got \"{}\"",
                    ENV_PREFIX, secs
                ))
            })?;
            config = config.with_request_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Set basic authentication credentials.
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Honour system proxy settings.
    pub fn with_proxy(mut self) -> Self {
        self.disable_proxy = false;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:9200")
    }
}
