//! Client configuration.

use crate::{ClientError, ClientResult};
use serde::{Deserialize, Serialize};
use url::Url;

/// Default seconds before expiry at which a proactive refresh fires.
pub const DEFAULT_REFRESH_BEFORE_EXPIRY: u64 = 60;

/// Configuration for an [`crate::NhostClient`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NhostConfig {
    /// NHost instance root, e.g. `https://myapp.nhost.run`.
    pub base_url: String,
    /// Proactively refresh the access token before it expires.
    #[serde(default = "default_true")]
    pub auto_refresh_token: bool,
    /// Restore the persisted session at construction.
    #[serde(default = "default_true")]
    pub auto_load_session: bool,
    /// Seconds before expiry at which a refresh is due.
    #[serde(default = "default_refresh_before_expiry")]
    pub refresh_before_expiry: u64,
}

fn default_true() -> bool {
    true
}

fn default_refresh_before_expiry() -> u64 {
    DEFAULT_REFRESH_BEFORE_EXPIRY
}

impl NhostConfig {
    /// Create a configuration with defaults for the given instance.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auto_refresh_token: true,
            auto_load_session: true,
            refresh_before_expiry: DEFAULT_REFRESH_BEFORE_EXPIRY,
        }
    }

    /// Validate the base URL.
    pub fn validate(&self) -> ClientResult<Url> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::Config(format!("invalid base URL: {}", e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ClientError::Config(format!(
                "base URL must be http(s), got {}",
                url.scheme()
            )));
        }
        Ok(url)
    }
}
