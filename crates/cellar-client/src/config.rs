//! Client configuration

use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where and how to reach the inventory API
///
/// ```toml
/// base_url = "http://cellar.local:3000"
/// cellar_id = "home"
/// timeout_secs = 10
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Scheme, host and port of the API, without a trailing path
    pub base_url: String,
    /// Sent as `X-Cellar-Id` when set
    pub cellar_id: Option<String>,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl ClientConfig {
    /// Configuration for `base_url` with defaults otherwise
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// With cellar id header
    #[inline]
    #[must_use]
    pub fn with_cellar_id(mut self, id: impl Into<String>) -> Self {
        self.cellar_id = Some(id.into());
        self
    }

    /// With request timeout
    #[inline]
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Request timeout as a duration
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Parse from TOML
    ///
    /// # Errors
    /// `ClientError::Config` on malformed input.
    pub fn from_toml_str(text: &str) -> Result<Self, ClientError> {
        toml::from_str(text).map_err(|e| ClientError::Config(e.to_string()))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            cellar_id: None,
            timeout_secs: 30,
        }
    }
}
