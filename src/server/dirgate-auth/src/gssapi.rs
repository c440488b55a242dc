//! Password verification by Kerberos login.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::backend::{Backend, CredentialVerifier};
use crate::kerberos::{login_configuration, KerberosLogin, KinitLogin, LoginCallback};

/// Verifies a password by obtaining Kerberos credentials for the principal.
///
/// The credentials are released right after a successful login.
#[derive(Clone)]
pub struct GssapiVerifier {
    login: Arc<dyn KerberosLogin>,
}

impl GssapiVerifier {
    /// Creates the verifier on top of a login facility.
    pub fn new(login: Arc<dyn KerberosLogin>) -> Self {
        Self { login }
    }
}

impl Default for GssapiVerifier {
    fn default() -> Self {
        Self::new(Arc::new(KinitLogin::default()))
    }
}

impl std::fmt::Debug for GssapiVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GssapiVerifier")
            .field("login", &self.login.name())
            .finish()
    }
}

#[async_trait]
impl CredentialVerifier for GssapiVerifier {
    async fn verify(&self, backend: &Backend, principal: &str, password: Option<&str>) -> bool {
        let Some(password) = password.filter(|p| !p.is_empty()) else {
            debug!(backend = backend.key(), "Password is empty");
            return false;
        };

        let callback = LoginCallback {
            principal,
            password,
        };

        let session = match self.login.login(login_configuration(), &callback).await {
            Ok(session) => session,
            Err(e) => {
                debug!(
                    backend = backend.key(),
                    principal,
                    error = %e,
                    "Kerberos login failed"
                );
                return false;
            }
        };

        if let Err(e) = session.logout().await {
            warn!(backend = backend.key(), principal, error = %e, "Kerberos logout failed");
        }

        true
    }

    fn name(&self) -> &'static str {
        "gssapi"
    }
}
