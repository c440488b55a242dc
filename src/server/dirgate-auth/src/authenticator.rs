//! Multi-backend authentication.

use std::sync::Arc;

use tracing::debug;

use crate::backend::{Backend, BackendRegistry, CredentialVerifier};
use crate::bind::DirectBind;
use crate::context::CredentialSource;
use crate::gssapi::GssapiVerifier;
use crate::kerberos::KerberosLogin;

/// Authenticates logins against the configured backends.
///
/// Backends are tried in configuration order and the first one that
/// verifies the password wins. A backend that cannot resolve the login or
/// rejects the password hands over to the next one.
#[derive(Debug, Clone)]
pub struct Authenticator {
    registry: Arc<BackendRegistry>,
    bind: DirectBind,
    gssapi: GssapiVerifier,
}

impl Authenticator {
    /// Creates an authenticator using `kinit` for Kerberos backends.
    pub fn new(registry: Arc<BackendRegistry>) -> Self {
        Self {
            registry,
            bind: DirectBind::new(),
            gssapi: GssapiVerifier::default(),
        }
    }

    /// Replaces the Kerberos login facility.
    pub fn with_kerberos(mut self, login: Arc<dyn KerberosLogin>) -> Self {
        self.gssapi = GssapiVerifier::new(login);
        self
    }

    /// The backends, in the order they are tried.
    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Authenticates `login`.
    ///
    /// When `check_password` is false the first backend that resolves the
    /// login authenticates it without contacting any verifier. The password
    /// is never logged.
    pub async fn authenticate(
        &self,
        login: &str,
        password: Option<&str>,
        check_password: bool,
    ) -> bool {
        for backend in self.registry.iter() {
            let Some(principal) = self.resolve(backend, login).await else {
                continue;
            };

            if !check_password {
                debug!(backend = backend.key(), login, "Password check skipped");
                return true;
            }

            let verifier = self.verifier(backend);
            if verifier.verify(backend, &principal, password).await {
                debug!(
                    backend = backend.key(),
                    login,
                    method = verifier.name(),
                    "User authenticated"
                );
                return true;
            }
        }

        debug!(login, "User not found");
        false
    }

    /// Authenticates the attempt produced by `source`.
    ///
    /// A source yielding no attempt is not authenticated.
    pub async fn authenticate_with(&self, source: &dyn CredentialSource) -> bool {
        let Some(attempt) = source.attempt() else {
            debug!("No credentials supplied");
            return false;
        };

        self.authenticate(attempt.login(), attempt.password(), attempt.check_password())
            .await
    }

    async fn resolve(&self, backend: &Backend, login: &str) -> Option<String> {
        if backend.mode().is_sasl() {
            return Some(login.to_string());
        }

        match backend.resolver().find_unique(login).await {
            Ok(Some(principal)) => Some(principal),
            Ok(None) => {
                debug!(backend = backend.key(), login, "No entry for login");
                None
            }
            Err(e) => {
                debug!(backend = backend.key(), login, error = %e, "Principal lookup failed");
                None
            }
        }
    }

    fn verifier(&self, backend: &Backend) -> &dyn CredentialVerifier {
        if backend.mode().is_gssapi() {
            &self.gssapi
        } else {
            &self.bind
        }
    }
}
