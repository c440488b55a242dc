//! Authentication request and credential source types.

use std::fmt;

use http::HeaderMap;
use zeroize::Zeroizing;

use crate::ReverseProxySettings;

/// One authentication attempt.
///
/// Lives for a single call; the password is wiped when dropped.
pub struct AuthAttempt {
    login: String,
    password: Option<Zeroizing<String>>,
    check_password: bool,
}

impl AuthAttempt {
    /// An attempt whose password must be verified.
    pub fn with_password(login: impl Into<String>, password: Option<&str>) -> Self {
        Self {
            login: login.into(),
            password: password.map(|p| Zeroizing::new(p.to_string())),
            check_password: true,
        }
    }

    /// An attempt for an identity already vouched for out of band.
    ///
    /// Carries no password and skips verification.
    pub fn trusted(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: None,
            check_password: false,
        }
    }

    /// The login to resolve.
    pub fn login(&self) -> &str {
        &self.login
    }

    /// The supplied password, if any.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().map(String::as_str)
    }

    /// Whether the password must be verified.
    pub fn check_password(&self) -> bool {
        self.check_password
    }
}

impl fmt::Debug for AuthAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthAttempt")
            .field("login", &self.login)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("check_password", &self.check_password)
            .finish()
    }
}

/// What an authenticator needs to know about an inbound request.
#[derive(Default)]
pub struct AuthRequest {
    /// Login typed by the user.
    pub login: Option<String>,
    /// Password typed by the user.
    pub password: Option<Zeroizing<String>>,
    /// Headers of the originating HTTP request.
    pub headers: HeaderMap,
}

impl AuthRequest {
    /// A request carrying typed credentials.
    pub fn new(login: impl Into<String>, password: Option<&str>, headers: HeaderMap) -> Self {
        Self {
            login: Some(login.into()),
            password: password.map(|p| Zeroizing::new(p.to_string())),
            headers,
        }
    }

    /// A request carrying only headers.
    pub fn from_headers(headers: HeaderMap) -> Self {
        Self {
            headers,
            ..Self::default()
        }
    }
}

/// Produces the attempt to run for a request.
pub trait CredentialSource: Send + Sync {
    /// Returns the attempt, or `None` when the request carries no usable
    /// identity.
    fn attempt(&self) -> Option<AuthAttempt>;
}

/// Credentials typed by the user; the password is always checked.
pub struct PlainCredentials<'a> {
    request: &'a AuthRequest,
}

impl<'a> PlainCredentials<'a> {
    /// Wraps a request.
    pub fn new(request: &'a AuthRequest) -> Self {
        Self { request }
    }
}

impl CredentialSource for PlainCredentials<'_> {
    fn attempt(&self) -> Option<AuthAttempt> {
        let login = self.request.login.as_deref().filter(|l| !l.trim().is_empty())?;
        let password = self.request.password.as_deref().map(String::as_str);
        Some(AuthAttempt::with_password(login, password))
    }
}

/// Identity from a trusted reverse proxy header, falling back to the
/// typed credentials when the header yields nothing.
pub struct ReverseProxyCredentials<'a> {
    settings: &'a ReverseProxySettings,
    request: &'a AuthRequest,
}

impl<'a> ReverseProxyCredentials<'a> {
    /// Wraps a request.
    pub fn new(settings: &'a ReverseProxySettings, request: &'a AuthRequest) -> Self {
        Self { settings, request }
    }
}

impl CredentialSource for ReverseProxyCredentials<'_> {
    fn attempt(&self) -> Option<AuthAttempt> {
        match self.settings.trusted_user(&self.request.headers) {
            Some(user) => Some(AuthAttempt::trusted(user)),
            None => PlainCredentials::new(self.request).attempt(),
        }
    }
}
