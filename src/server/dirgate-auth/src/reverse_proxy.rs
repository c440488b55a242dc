//! Reverse proxy identity bypass.
//!
//! When enabled, an upstream proxy that has already authenticated the user
//! passes the username in a configured header. The header is trusted as is,
//! so the bypass is disabled unless explicitly configured.

use http::{HeaderMap, HeaderName};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Reverse proxy section of the configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverseProxyConfig {
    /// Trust the identity header.
    pub enabled: bool,

    /// Header carrying the username, e.g. `X-Forwarded-User`.
    pub header_name: Option<String>,
}

/// Validated reverse proxy settings.
#[derive(Debug, Clone, Default)]
pub struct ReverseProxySettings {
    /// Set only when the bypass is enabled.
    header: Option<HeaderName>,
}

impl ReverseProxySettings {
    /// Settings with the bypass turned off.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Validates the configuration section.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::MissingHeaderName`] - Enabled without a non-blank header name
    /// * [`ConfigError::InvalidHeaderName`] - The name is not a valid HTTP header name
    pub fn from_config(config: &ReverseProxyConfig) -> Result<Self, ConfigError> {
        if !config.enabled {
            return Ok(Self::disabled());
        }

        let name = config
            .header_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or(ConfigError::MissingHeaderName)?;

        let header = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ConfigError::InvalidHeaderName(name.to_string()))?;

        Ok(Self {
            header: Some(header),
        })
    }

    /// Whether the bypass is enabled.
    pub fn is_enabled(&self) -> bool {
        self.header.is_some()
    }

    /// The trusted header, when enabled.
    pub fn header_name(&self) -> Option<&HeaderName> {
        self.header.as_ref()
    }

    /// Username carried by the trusted header.
    ///
    /// Returns `None` when the bypass is disabled, the header is missing,
    /// not valid UTF-8, or blank after trimming. A returned value is never
    /// empty.
    pub fn trusted_user(&self, headers: &HeaderMap) -> Option<String> {
        let header = self.header.as_ref()?;
        let value = headers.get(header)?.to_str().ok()?.trim();

        if value.is_empty() {
            return None;
        }

        Some(value.to_string())
    }
}
