pub mod backend;
pub mod http;

pub use backend::{Backend, BackendError, FunctionReply};
pub use http::{HttpBackend, HttpBackendConfig};

use crate::config::{Config, FallbackConfig};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Credentials accepted in local mode.
#[derive(Debug, Clone)]
pub struct LocalCredentials {
    pub username: String,
    pub password: SecretString,
}

impl LocalCredentials {
    #[must_use]
    pub fn matches(&self, username: &str, password: &SecretString) -> bool {
        self.username == username.trim()
            && self.password.expose_secret() == password.expose_secret()
    }
}

impl From<&FallbackConfig> for LocalCredentials {
    fn from(config: &FallbackConfig) -> Self {
        Self {
            username: config.username.clone(),
            password: SecretString::from(config.password.clone()),
        }
    }
}

/// Either a configured remote service or the local fallback.
#[derive(Clone)]
pub enum BackendMode {
    Remote(Arc<dyn Backend>),
    Local(LocalCredentials),
}

impl std::fmt::Debug for BackendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote(_) => f.write_str("BackendMode::Remote"),
            Self::Local(c) => write!(f, "BackendMode::Local({})", c.username),
        }
    }
}

impl BackendMode {
    /// Remote when both the URL and key are configured, local otherwise.
    pub fn from_config(config: &Config) -> Result<Self, BackendError> {
        let Some((url, key)) = config.backend.credentials() else {
            warn!("Backend URL or key missing, running in local mode");
            return Ok(Self::Local(LocalCredentials::from(&config.fallback)));
        };

        let timeout = match config.backend.request_timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let backend = HttpBackend::new(HttpBackendConfig {
            base_url: url.to_string(),
            anon_key: SecretString::from(key.to_string()),
            timeout,
        })?;

        info!(url, "Using remote backend");
        Ok(Self::Remote(Arc::new(backend)))
    }

    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    #[must_use]
    pub fn remote(&self) -> Option<&Arc<dyn Backend>> {
        match self {
            Self::Remote(backend) => Some(backend),
            Self::Local(_) => None,
        }
    }
}
