//! In-memory directory and Kerberos doubles.
//!
//! Available to this crate's tests and, through the `testing` feature, to
//! downstream crates.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dirgate_directory::{
    BindMode, DirectoryConnection, DirectoryConnector, DirectoryError, PrincipalResolver,
};

use crate::backend::Backend;
use crate::kerberos::{KerberosLogin, KerberosSession, Krb5LoginConfiguration, LoginCallback};
use crate::KerberosError;

#[derive(Debug, Clone)]
struct User {
    login: String,
    principal: String,
    password: String,
}

/// Directory holding a fixed list of users.
///
/// Counts binds, searches and closed connections so tests can assert which
/// collaborators an operation reached.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    users: Vec<User>,
    duplicated: Vec<String>,
    unreachable: bool,
    binds: AtomicUsize,
    searches: AtomicUsize,
    closed: Arc<AtomicUsize>,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user whose entry resolves to `principal`.
    pub fn with_user(
        mut self,
        login: impl Into<String>,
        principal: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.users.push(User {
            login: login.into(),
            principal: principal.into(),
            password: password.into(),
        });
        self
    }

    /// Makes searches for `login` match several entries.
    pub fn with_duplicate(mut self, login: impl Into<String>) -> Self {
        self.duplicated.push(login.into());
        self
    }

    /// Makes every operation fail with a connection error.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Number of bind attempts.
    pub fn bind_count(&self) -> usize {
        self.binds.load(Ordering::SeqCst)
    }

    /// Number of searches.
    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    /// Number of connections closed after a successful bind.
    pub fn closed_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Builds a backend served by this directory, keeping it observable.
    pub fn backend(self: &Arc<Self>, key: &str, mode: BindMode) -> Backend {
        Backend::new(key, mode, self.clone(), self.clone())
    }

    /// Builds a backend served by this directory.
    pub fn into_backend(self, key: &str, mode: BindMode) -> Backend {
        Arc::new(self).backend(key, mode)
    }

    fn check_reachable(&self) -> Result<(), DirectoryError> {
        if self.unreachable {
            return Err(DirectoryError::Connection("connection refused".into()));
        }
        Ok(())
    }
}

struct InMemoryConnection {
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl DirectoryConnection for InMemoryConnection {
    async fn close(self: Box<Self>) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DirectoryConnector for InMemoryDirectory {
    async fn open_user_connection(
        &self,
        principal: &str,
        password: &str,
    ) -> Result<Box<dyn DirectoryConnection>, DirectoryError> {
        self.binds.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;

        let accepted = self.users.iter().any(|u| {
            (u.principal == principal || u.login == principal) && u.password == password
        });
        if !accepted {
            return Err(DirectoryError::Bind("invalid credentials".into()));
        }

        Ok(Box::new(InMemoryConnection {
            closed: self.closed.clone(),
        }))
    }
}

#[async_trait]
impl PrincipalResolver for InMemoryDirectory {
    async fn find_unique(&self, login: &str) -> Result<Option<String>, DirectoryError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;

        if self.duplicated.iter().any(|d| d == login) {
            return Err(DirectoryError::NonUnique(format!("(uid={login})")));
        }

        Ok(self
            .users
            .iter()
            .find(|u| u.login == login)
            .map(|u| u.principal.clone()))
    }
}

/// Kerberos facility accepting a single principal and password.
#[derive(Debug)]
pub struct StaticKerberos {
    principal: String,
    password: String,
    logout_fails: bool,
    logins: AtomicUsize,
    logouts: Arc<AtomicUsize>,
}

impl StaticKerberos {
    /// Accepts `password` for `principal` only.
    pub fn new(principal: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            password: password.into(),
            logout_fails: false,
            logins: AtomicUsize::new(0),
            logouts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Makes every logout fail.
    pub fn failing_logout(mut self) -> Self {
        self.logout_fails = true;
        self
    }

    /// Number of login handshakes.
    pub fn login_count(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    /// Number of logouts, failed or not.
    pub fn logout_count(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }
}

struct StaticSession {
    fails: bool,
    logouts: Arc<AtomicUsize>,
}

#[async_trait]
impl KerberosSession for StaticSession {
    async fn logout(self: Box<Self>) -> Result<(), KerberosError> {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        if self.fails {
            return Err(KerberosError::LogoutFailed("credential cache busy".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl KerberosLogin for StaticKerberos {
    async fn login(
        &self,
        _config: &Krb5LoginConfiguration,
        callback: &LoginCallback<'_>,
    ) -> Result<Box<dyn KerberosSession>, KerberosError> {
        self.logins.fetch_add(1, Ordering::SeqCst);

        if callback.principal != self.principal || callback.password != self.password {
            return Err(KerberosError::LoginFailed(
                "Preauthentication failed".into(),
            ));
        }

        Ok(Box::new(StaticSession {
            fails: self.logout_fails,
            logouts: self.logouts.clone(),
        }))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
