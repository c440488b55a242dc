//! Shared application state.

use std::sync::Arc;

use dirgate_auth::{Authenticator, ReverseProxySettings};

/// Scheme used for bypass redirects when no forwarded scheme is present.
pub const DEFAULT_PUBLIC_SCHEME: &str = "http";

/// State shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    authenticator: Arc<Authenticator>,
    reverse_proxy: Arc<ReverseProxySettings>,
    context_path: String,
    public_scheme: String,
    home_path: Option<String>,
}

impl AppState {
    /// Creates the state, served at the root path.
    pub fn new(authenticator: Arc<Authenticator>, reverse_proxy: ReverseProxySettings) -> Self {
        Self {
            authenticator,
            reverse_proxy: Arc::new(reverse_proxy),
            context_path: String::new(),
            public_scheme: DEFAULT_PUBLIC_SCHEME.to_string(),
            home_path: None,
        }
    }

    /// Serves the application under `path`.
    ///
    /// The path is normalised to a leading slash and no trailing slash; an
    /// empty path or `/` means the root.
    pub fn with_context_path(mut self, path: &str) -> Self {
        let trimmed = path.trim().trim_matches('/');
        self.context_path = if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        };
        self
    }

    /// Sets the scheme the application is reached with.
    pub fn with_public_scheme(mut self, scheme: &str) -> Self {
        self.public_scheme = scheme.trim().to_ascii_lowercase();
        self
    }

    /// Sets where a validated bypass lands.
    ///
    /// This router serves no page there; the location belongs to the
    /// application behind it. A blank value restores the default.
    pub fn with_home_path(mut self, path: &str) -> Self {
        let path = path.trim();
        self.home_path = (!path.is_empty()).then(|| path.to_string());
        self
    }

    /// The authenticator.
    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    /// The reverse proxy bypass settings.
    pub fn reverse_proxy(&self) -> &ReverseProxySettings {
        &self.reverse_proxy
    }

    /// Normalised context path, empty at the root.
    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    /// Scheme used when the request carries no forwarded scheme.
    pub fn public_scheme(&self) -> &str {
        &self.public_scheme
    }

    /// Where a validated bypass lands, `{context_path}/` unless configured.
    pub fn home_path(&self) -> String {
        match &self.home_path {
            Some(path) => path.clone(),
            None => format!("{}/", self.context_path),
        }
    }
}
