//! Client configuration

use serde::{Deserialize, Serialize};

use crate::error::CoreResult;

/// Base URL used when no configuration is provided
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Configuration for the massmail client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the backend API, without a trailing slash
    pub server_url: String,

    /// OAuth client identifier for Google sign-in tokens
    #[serde(default)]
    pub google_client_id: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            google_client_id: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from `MASSMAIL_*` environment variables over
    /// the built-in defaults
    pub fn from_env() -> CoreResult<Self> {
        let defaults = Self::default();

        let settings = config::Config::builder()
            .set_default("server_url", defaults.server_url)?
            .add_source(config::Environment::with_prefix("MASSMAIL"))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        Ok(config.normalized())
    }

    /// Load configuration from a TOML file, with `MASSMAIL_*` environment
    /// variables taking precedence
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> CoreResult<Self> {
        let defaults = Self::default();

        let settings = config::Config::builder()
            .set_default("server_url", defaults.server_url)?
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix("MASSMAIL"))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        Ok(config.normalized())
    }

    /// Replace the server URL, e.g. from a command-line override
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = url.into();
        self.normalized()
    }

    fn normalized(mut self) -> Self {
        while self.server_url.ends_with('/') {
            self.server_url.pop();
        }
        self
    }
}
