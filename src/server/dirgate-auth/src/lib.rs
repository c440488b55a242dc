//! # Dirgate Auth
//!
//! Authentication of a login against one or more directory servers.
//!
//! ## Flow
//!
//! - A [`CredentialSource`] turns an inbound request into an
//!   [`AuthAttempt`]. The reverse proxy source substitutes the identity
//!   carried by a trusted header and skips the password check.
//! - The [`Authenticator`] walks the [`BackendRegistry`] in configuration
//!   order, resolves the login to a principal and verifies the password
//!   with exactly one strategy per backend: Kerberos for `gssapi`
//!   backends, a directory bind for every other mode.
//! - The first backend that verifies wins. Failures are reported as a
//!   plain `false`; the reason only appears in debug logs.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod authenticator;
pub mod backend;
pub mod bind;
pub mod context;
pub mod error;
pub mod gssapi;
pub mod kerberos;
pub mod reverse_proxy;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use authenticator::Authenticator;
pub use backend::{Backend, BackendRegistry, CredentialVerifier};
pub use bind::DirectBind;
pub use context::{
    AuthAttempt, AuthRequest, CredentialSource, PlainCredentials, ReverseProxyCredentials,
};
pub use error::{ConfigError, KerberosError};
pub use gssapi::GssapiVerifier;
pub use kerberos::{
    install_login_configuration, login_configuration, KerberosConfig, KerberosLogin,
    KerberosSession, KinitLogin, Krb5LoginConfiguration, LoginCallback,
};
pub use reverse_proxy::{ReverseProxyConfig, ReverseProxySettings};
