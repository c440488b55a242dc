//! Directory backends and the credential verification trait.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use dirgate_directory::{BindMode, DirectoryConnector, PrincipalResolver};

use crate::ConfigError;

/// One configured directory server.
///
/// The binding mode is fixed when the backend is built.
pub struct Backend {
    key: String,
    mode: BindMode,
    connector: Arc<dyn DirectoryConnector>,
    resolver: Arc<dyn PrincipalResolver>,
}

impl Backend {
    /// Creates a backend from its directory collaborators.
    pub fn new(
        key: impl Into<String>,
        mode: BindMode,
        connector: Arc<dyn DirectoryConnector>,
        resolver: Arc<dyn PrincipalResolver>,
    ) -> Self {
        Self {
            key: key.into(),
            mode,
            connector,
            resolver,
        }
    }

    /// Unique key of this backend.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Binding mode of this backend.
    pub fn mode(&self) -> BindMode {
        self.mode
    }

    /// Connection facility used for password binds.
    pub fn connector(&self) -> &dyn DirectoryConnector {
        self.connector.as_ref()
    }

    /// Resolver turning logins into principals.
    pub fn resolver(&self) -> &dyn PrincipalResolver {
        self.resolver.as_ref()
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("key", &self.key)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// Ordered, immutable set of backends.
///
/// Iteration order is configuration order. The registry is built once at
/// startup and shared read-only.
#[derive(Debug)]
pub struct BackendRegistry {
    backends: Vec<Backend>,
}

impl BackendRegistry {
    /// Builds the registry, rejecting empty lists and duplicate keys.
    pub fn new(backends: Vec<Backend>) -> Result<Self, ConfigError> {
        if backends.is_empty() {
            return Err(ConfigError::NoBackends);
        }

        let mut seen = HashSet::new();
        for backend in &backends {
            if !seen.insert(backend.key()) {
                return Err(ConfigError::DuplicateBackend(backend.key().to_string()));
            }
        }

        Ok(Self { backends })
    }

    /// Backends in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &Backend> {
        self.backends.iter()
    }

    /// Number of backends.
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Always false for a built registry.
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Backend keys in configuration order.
    pub fn keys(&self) -> Vec<&str> {
        self.backends.iter().map(Backend::key).collect()
    }
}

/// Strategy answering "is this password valid for this principal?".
///
/// Implementations return `false` on any failure and never log the
/// password.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Verifies `password` for `principal` on `backend`.
    async fn verify(&self, backend: &Backend, principal: &str, password: Option<&str>) -> bool;

    /// Returns the name of this strategy for logging.
    fn name(&self) -> &'static str;
}
