//! LDAP backend configuration.

use std::fmt;
use std::time::Duration;

use dirgate_directory::{BindMode, DirectoryError};
use serde::Deserialize;

/// Placeholder replaced by the escaped login in [`UserMapping::request`].
pub const LOGIN_PLACEHOLDER: &str = "{login}";

/// One configured LDAP server.
#[derive(Clone, Deserialize)]
pub struct LdapBackendConfig {
    /// Unique backend key, used in logs.
    pub key: String,

    /// Server URL (`ldap://` or `ldaps://`).
    pub url: String,

    /// How this backend binds.
    #[serde(default)]
    pub bind_mode: BindMode,

    /// Service account DN, required for `simple` mode.
    #[serde(default)]
    pub bind_dn: Option<String>,

    /// Service account password.
    #[serde(default)]
    pub bind_password: Option<String>,

    /// Upgrade plain connections with STARTTLS.
    #[serde(default)]
    pub start_tls: bool,

    /// Timeout in seconds, applied to the connect and to every bind,
    /// search and unbind.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// How logins map to directory entries.
    pub user_mapping: UserMapping,
}

fn default_timeout() -> u64 {
    10
}

// Keeps the service password out of logs.
impl fmt::Debug for LdapBackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LdapBackendConfig")
            .field("key", &self.key)
            .field("url", &self.url)
            .field("bind_mode", &self.bind_mode)
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &self.bind_password.as_ref().map(|_| "***"))
            .field("start_tls", &self.start_tls)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("user_mapping", &self.user_mapping)
            .finish()
    }
}

impl LdapBackendConfig {
    /// Connect timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Checks the configuration before any connection is attempted.
    pub fn validate(&self) -> Result<(), DirectoryError> {
        if self.key.trim().is_empty() {
            return Err(DirectoryError::InvalidConfig("backend key is required".into()));
        }

        if !self.url.starts_with("ldap://") && !self.url.starts_with("ldaps://") {
            return Err(DirectoryError::InvalidConfig(format!(
                "backend {}: url must start with ldap:// or ldaps://",
                self.key
            )));
        }

        if self.bind_mode == BindMode::Simple
            && self.bind_dn.as_deref().map_or(true, |dn| dn.trim().is_empty())
        {
            return Err(DirectoryError::InvalidConfig(format!(
                "backend {}: bind_dn is required for simple bind mode",
                self.key
            )));
        }

        if !self.bind_mode.is_sasl() {
            self.user_mapping
                .validate()
                .map_err(|e| DirectoryError::InvalidConfig(format!("backend {}: {e}", self.key)))?;
        }

        Ok(())
    }
}

/// Rule turning a login into a directory search.
#[derive(Debug, Clone, Deserialize)]
pub struct UserMapping {
    /// Base DN of the subtree search.
    pub base_dn: String,

    /// Filter template; `{login}` is replaced by the escaped login.
    #[serde(default = "default_request")]
    pub request: String,

    /// Attribute holding the principal. The entry DN is used when unset.
    #[serde(default)]
    pub principal_attribute: Option<String>,
}

fn default_request() -> String {
    "(&(objectClass=inetOrgPerson)(uid={login}))".to_string()
}

impl UserMapping {
    /// Builds the search filter for `login`.
    pub fn build_filter(&self, login: &str) -> String {
        self.request
            .replace(LOGIN_PLACEHOLDER, &ldap3::ldap_escape(login))
    }

    fn validate(&self) -> Result<(), String> {
        if self.base_dn.trim().is_empty() {
            return Err("user_mapping.base_dn is required".into());
        }
        if !self.request.contains(LOGIN_PLACEHOLDER) {
            return Err(format!(
                "user_mapping.request must contain {LOGIN_PLACEHOLDER}"
            ));
        }
        Ok(())
    }
}
