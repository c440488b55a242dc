//! # Dirgate Directory - LDAP Backend
//!
//! LDAP implementation of the directory traits, built on `ldap3`.
//!
//! Every operation opens its own connection and releases it before
//! returning. Connection pooling is left to deployments that need it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use tracing::{debug, warn};

use dirgate_directory::{
    BindMode, DirectoryConnection, DirectoryConnector, DirectoryError, PrincipalResolver,
};

pub use config::{LdapBackendConfig, UserMapping};

/// Opens connections to one LDAP server.
pub struct LdapConnector {
    config: Arc<LdapBackendConfig>,
}

impl LdapConnector {
    /// Creates a connector for a validated backend configuration.
    pub fn new(config: Arc<LdapBackendConfig>) -> Self {
        Self { config }
    }

    /// Opens an unauthenticated connection and spawns its driver.
    ///
    /// The driver task ends once every handle to the connection is dropped.
    async fn connect(&self) -> Result<Ldap, DirectoryError> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(self.config.timeout())
            .set_starttls(self.config.start_tls);

        debug!(backend = %self.config.key, url = %self.config.url, "Connecting to LDAP server");

        let (conn, ldap) = LdapConnAsync::with_settings(settings, &self.config.url)
            .await
            .map_err(|e| DirectoryError::Connection(e.to_string()))?;

        let key = self.config.key.clone();
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(backend = %key, "LDAP connection driver error: {}", e);
            }
        });

        Ok(ldap)
    }

    /// Opens a connection bound the way this backend searches.
    ///
    /// Anonymous backends skip the bind. Every other mode binds with the
    /// service account when one is configured.
    async fn connect_for_search(&self) -> Result<Ldap, DirectoryError> {
        let mut ldap = self.connect().await?;

        if self.config.bind_mode == BindMode::Anonymous {
            return Ok(ldap);
        }

        if let Some(bind_dn) = self.config.bind_dn.as_deref() {
            let password = self.config.bind_password.as_deref().unwrap_or_default();
            ldap.with_timeout(self.config.timeout())
                .simple_bind(bind_dn, password)
                .await
                .map_err(|e| DirectoryError::Connection(e.to_string()))?
                .success()
                .map_err(|e| DirectoryError::Bind(format!("service bind failed: {e}")))?;
        }

        Ok(ldap)
    }
}

#[async_trait]
impl DirectoryConnector for LdapConnector {
    async fn open_user_connection(
        &self,
        principal: &str,
        password: &str,
    ) -> Result<Box<dyn DirectoryConnection>, DirectoryError> {
        let mut ldap = self.connect().await?;

        // SASL backends hand the raw login to the server as bind identity.
        ldap.with_timeout(self.config.timeout())
            .simple_bind(principal, password)
            .await
            .map_err(|e| DirectoryError::Connection(e.to_string()))?
            .success()
            .map_err(|e| DirectoryError::Bind(e.to_string()))?;

        Ok(Box::new(LdapUserConnection {
            ldap,
            timeout: self.config.timeout(),
        }))
    }
}

/// A connection bound as an end user.
struct LdapUserConnection {
    ldap: Ldap,
    timeout: Duration,
}

#[async_trait]
impl DirectoryConnection for LdapUserConnection {
    async fn close(self: Box<Self>) {
        let mut ldap = self.ldap;
        unbind(&mut ldap, self.timeout).await;
    }
}

/// Resolves logins by searching one LDAP server.
pub struct LdapPrincipalResolver {
    connector: Arc<LdapConnector>,
}

impl LdapPrincipalResolver {
    /// Creates a resolver sharing the backend's connector.
    pub fn new(connector: Arc<LdapConnector>) -> Self {
        Self { connector }
    }

    fn mapping(&self) -> &UserMapping {
        &self.connector.config.user_mapping
    }
}

#[async_trait]
impl PrincipalResolver for LdapPrincipalResolver {
    async fn find_unique(&self, login: &str) -> Result<Option<String>, DirectoryError> {
        let mut ldap = self.connector.connect_for_search().await?;

        let mapping = self.mapping();
        let filter = mapping.build_filter(login);
        // "1.1" asks for no attributes, only the DN.
        let attrs = match mapping.principal_attribute.as_deref() {
            Some(attr) => vec![attr],
            None => vec!["1.1"],
        };

        debug!(backend = %self.connector.config.key, filter = %filter, "Searching for user");

        let result = ldap
            .with_timeout(self.connector.config.timeout())
            .search(&mapping.base_dn, Scope::Subtree, &filter, attrs)
            .await
            .map_err(|e| DirectoryError::Search(e.to_string()))
            .and_then(|rs| {
                rs.success()
                    .map_err(|e| DirectoryError::Search(e.to_string()))
            });

        unbind(&mut ldap, self.connector.config.timeout()).await;
        let (entries, _res) = result?;

        let mut entries = entries.into_iter();
        let entry = match (entries.next(), entries.next()) {
            (None, _) => return Ok(None),
            (Some(entry), None) => SearchEntry::construct(entry),
            (Some(_), Some(_)) => return Err(DirectoryError::NonUnique(filter)),
        };

        match mapping.principal_attribute.as_deref() {
            None => Ok(Some(entry.dn)),
            Some(attr) => entry
                .attrs
                .get(attr)
                .and_then(|values| values.first().cloned())
                .map(Some)
                .ok_or_else(|| {
                    DirectoryError::Search(format!("{} has no {} attribute", entry.dn, attr))
                }),
        }
    }
}

/// Releases a connection, logging a failed unbind.
async fn unbind(ldap: &mut Ldap, timeout: Duration) {
    if let Err(e) = ldap.with_timeout(timeout).unbind().await {
        debug!("LDAP unbind failed: {}", e);
    }
}

/// Connector and resolver for one configured backend.
pub struct LdapBackend {
    /// The validated configuration.
    pub config: Arc<LdapBackendConfig>,
    /// Opens user-bound connections.
    pub connector: Arc<LdapConnector>,
    /// Resolves logins to principals.
    pub resolver: Arc<LdapPrincipalResolver>,
}

impl LdapBackend {
    /// Validates the configuration and builds the backend.
    ///
    /// No connection is opened here.
    pub fn from_config(config: LdapBackendConfig) -> Result<Self, DirectoryError> {
        config.validate()?;

        let config = Arc::new(config);
        let connector = Arc::new(LdapConnector::new(config.clone()));
        let resolver = Arc::new(LdapPrincipalResolver::new(connector.clone()));

        Ok(Self {
            config,
            connector,
            resolver,
        })
    }
}
