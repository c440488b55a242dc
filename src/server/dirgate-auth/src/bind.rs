//! Password verification by directory bind.

use async_trait::async_trait;
use tracing::debug;

use crate::backend::{Backend, CredentialVerifier};

/// Verifies a password by binding to the backend as the principal.
///
/// An empty password is rejected before the directory is contacted, since
/// an empty simple bind is an anonymous bind that most servers accept.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectBind;

impl DirectBind {
    /// Creates the verifier.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CredentialVerifier for DirectBind {
    async fn verify(&self, backend: &Backend, principal: &str, password: Option<&str>) -> bool {
        let Some(password) = password.filter(|p| !p.is_empty()) else {
            debug!(backend = backend.key(), "Password is empty");
            return false;
        };

        match backend
            .connector()
            .open_user_connection(principal, password)
            .await
        {
            Ok(connection) => {
                connection.close().await;
                true
            }
            Err(e) => {
                debug!(
                    backend = backend.key(),
                    principal,
                    error = %e,
                    "Directory bind failed"
                );
                false
            }
        }
    }

    fn name(&self) -> &'static str {
        "bind"
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::testing::InMemoryDirectory;
    use dirgate_directory::BindMode;
    use std::sync::Arc;

    const GODIN_DN: &str = "uid=godin,ou=people,dc=example,dc=org";

    fn directory() -> Arc<InMemoryDirectory> {
        Arc::new(InMemoryDirectory::new().with_user("godin", GODIN_DN, "secret1"))
    }

    #[tokio::test]
    async fn test_bind_accepts_valid_password() {
        let directory = directory();
        let backend = directory.backend("ldap", BindMode::Simple);

        assert!(DirectBind.verify(&backend, GODIN_DN, Some("secret1")).await);
        assert_eq!(directory.bind_count(), 1);
        assert_eq!(directory.closed_count(), 1);
    }

    #[tokio::test]
    async fn test_bind_rejects_wrong_password() {
        let directory = directory();
        let backend = directory.backend("ldap", BindMode::Simple);

        assert!(!DirectBind.verify(&backend, GODIN_DN, Some("wrong")).await);
        assert_eq!(directory.bind_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_password_never_reaches_directory() {
        let directory = directory();
        let backend = directory.backend("ldap", BindMode::Simple);

        assert!(!DirectBind.verify(&backend, GODIN_DN, Some("")).await);
        assert!(!DirectBind.verify(&backend, GODIN_DN, None).await);
        assert_eq!(directory.bind_count(), 0);
    }

    #[tokio::test]
    async fn test_whitespace_password_is_bound() {
        let directory = Arc::new(InMemoryDirectory::new().with_user("ws", "uid=ws", "   "));
        let backend = directory.backend("ldap", BindMode::Simple);

        assert!(DirectBind.verify(&backend, "uid=ws", Some("   ")).await);
        assert!(!DirectBind.verify(&backend, GODIN_DN, Some("   ")).await);
        assert_eq!(directory.bind_count(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_directory_is_a_rejection() {
        let directory = Arc::new(
            InMemoryDirectory::new()
                .with_user("godin", GODIN_DN, "secret1")
                .unreachable(),
        );
        let backend = directory.backend("ldap", BindMode::Simple);

        assert!(!DirectBind.verify(&backend, GODIN_DN, Some("secret1")).await);
    }

    #[test]
    fn test_name() {
        assert_eq!(DirectBind::new().name(), "bind");
    }
}
