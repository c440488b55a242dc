//! Server configuration file.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use dirgate_api::AppState;
use dirgate_auth::{
    install_login_configuration, Authenticator, Backend, BackendRegistry, ConfigError,
    KerberosConfig, ReverseProxyConfig, ReverseProxySettings,
};
use dirgate_directory_ldap::{LdapBackend, LdapBackendConfig};
use serde::Deserialize;
use tracing::info;

fn default_bind() -> String {
    "0.0.0.0:9000".to_string()
}

fn default_public_scheme() -> String {
    "http".to_string()
}

/// Top level of `dirgate.toml`.
#[derive(Debug, Deserialize)]
pub struct DirgateConfig {
    /// Listen address.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Path the application is served under.
    #[serde(default)]
    pub context_path: String,

    /// Scheme clients use to reach the application.
    #[serde(default = "default_public_scheme")]
    pub public_scheme: String,

    /// Where a validated bypass lands; served by the protected application.
    /// Defaults to `{context_path}/`.
    #[serde(default)]
    pub home_path: Option<String>,

    /// Reverse proxy bypass.
    #[serde(default)]
    pub reverse_proxy: ReverseProxyConfig,

    /// Kerberos login options.
    #[serde(default)]
    pub kerberos: KerberosConfig,

    /// Directory backends, tried in order.
    #[serde(default)]
    pub backends: Vec<LdapBackendConfig>,
}

impl DirgateConfig {
    /// Reads and parses a configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("Invalid configuration file {}", path.display()))
    }

    /// Parses configuration text.
    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Validates the configuration and builds the application state.
    ///
    /// Installs the process-wide Kerberos login configuration. No directory
    /// server is contacted.
    pub fn into_state(self) -> Result<AppState> {
        let scheme = self.public_scheme.trim().to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(ConfigError::Invalid(format!(
                "public_scheme must be http or https, got {}",
                self.public_scheme
            ))
            .into());
        }

        let reverse_proxy = ReverseProxySettings::from_config(&self.reverse_proxy)?;

        let mut backends = Vec::with_capacity(self.backends.len());
        for config in self.backends {
            let key = config.key.clone();
            let ldap = LdapBackend::from_config(config)
                .with_context(|| format!("Invalid backend {key}"))?;

            info!(
                backend = %key,
                url = %ldap.config.url,
                mode = %ldap.config.bind_mode,
                "Directory backend configured"
            );
            backends.push(Backend::new(
                key,
                ldap.config.bind_mode,
                ldap.connector,
                ldap.resolver,
            ));
        }
        let registry = BackendRegistry::new(backends)?;

        install_login_configuration(self.kerberos.to_login_configuration());
        let authenticator = Authenticator::new(Arc::new(registry))
            .with_kerberos(Arc::new(self.kerberos.login_facility()));

        if let Some(header) = reverse_proxy.header_name() {
            info!(header = %header, "Reverse proxy bypass enabled");
        }

        let mut state = AppState::new(Arc::new(authenticator), reverse_proxy)
            .with_context_path(&self.context_path)
            .with_public_scheme(&scheme);
        if let Some(home) = self.home_path.as_deref() {
            state = state.with_home_path(home);
        }

        Ok(state)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use std::io::Write;

    const BACKEND: &str = r#"
        [[backends]]
        key = "example"
        url = "ldap://127.0.0.1:1"
        bind_mode = "anonymous"
        [backends.user_mapping]
        base_dn = "ou=people,dc=example,dc=org"
    "#;

    fn error_chain(result: Result<AppState>) -> String {
        match result {
            Ok(_) => panic!("configuration unexpectedly accepted"),
            Err(e) => format!("{e:#}"),
        }
    }

    #[test]
    fn test_defaults() {
        let config = DirgateConfig::parse(BACKEND).unwrap();

        assert_eq!(config.bind, "0.0.0.0:9000");
        assert_eq!(config.public_scheme, "http");
        assert!(!config.reverse_proxy.enabled);
        assert_eq!(config.backends.len(), 1);

        let state = config.into_state().unwrap();
        assert_eq!(state.context_path(), "");
        assert!(!state.reverse_proxy().is_enabled());
        assert_eq!(state.authenticator().registry().keys(), vec!["example"]);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            bind = "127.0.0.1:9100"
            context_path = "/app/"
            [reverse_proxy]
            enabled = true
            header_name = "X-Forwarded-User"
            {BACKEND}
            "#
        )
        .unwrap();

        let config = DirgateConfig::from_file(file.path()).unwrap();
        assert_eq!(config.bind, "127.0.0.1:9100");

        let state = config.into_state().unwrap();
        assert_eq!(state.context_path(), "/app");
        assert!(state.reverse_proxy().is_enabled());
    }

    #[test]
    fn test_home_path() {
        let state = DirgateConfig::parse(&format!("context_path = \"/app\"\n{BACKEND}"))
            .unwrap()
            .into_state()
            .unwrap();
        assert_eq!(state.home_path(), "/app/");

        let raw = format!("context_path = \"/app\"\nhome_path = \"/portal/\"\n{BACKEND}");
        let state = DirgateConfig::parse(&raw).unwrap().into_state().unwrap();
        assert_eq!(state.home_path(), "/portal/");
    }

    #[test]
    fn test_missing_file() {
        let result = DirgateConfig::from_file(Path::new("/nonexistent/dirgate.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_bypass_without_header_is_fatal() {
        let raw = format!("[reverse_proxy]\nenabled = true\n{BACKEND}");
        let message = error_chain(DirgateConfig::parse(&raw).unwrap().into_state());

        assert!(message.contains("no header name"));
    }

    #[test]
    fn test_no_backends_is_fatal() {
        let message = error_chain(DirgateConfig::parse("").unwrap().into_state());

        assert!(message.contains("no directory backend"));
    }

    #[test]
    fn test_duplicate_backend_is_fatal() {
        let raw = format!("{BACKEND}{BACKEND}");
        let message = error_chain(DirgateConfig::parse(&raw).unwrap().into_state());

        assert!(message.contains("duplicate backend key: example"));
    }

    #[test]
    fn test_invalid_backend_is_fatal() {
        let raw = BACKEND.replace("ldap://127.0.0.1:1", "http://127.0.0.1:1");
        let message = error_chain(DirgateConfig::parse(&raw).unwrap().into_state());

        assert!(message.contains("Invalid backend example"));
    }

    #[test]
    fn test_invalid_public_scheme() {
        let raw = format!("public_scheme = \"ftp\"\n{BACKEND}");
        let message = error_chain(DirgateConfig::parse(&raw).unwrap().into_state());

        assert!(message.contains("public_scheme"));
    }
}
