//! Authentication error types.
//!
//! Authentication itself never fails with an error: a rejected login is a
//! plain `false`. These errors cover startup configuration and the Kerberos
//! login facility.

use thiserror::Error;

/// Invalid configuration detected at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reverse proxy bypass enabled without a header name.
    #[error("reverse proxy is enabled but no header name is set")]
    MissingHeaderName,

    /// Configured header name is not a valid HTTP header name.
    #[error("invalid reverse proxy header name: {0}")]
    InvalidHeaderName(String),

    /// The backend registry is empty.
    #[error("no directory backend configured")]
    NoBackends,

    /// Two backends share a key.
    #[error("duplicate backend key: {0}")]
    DuplicateBackend(String),

    /// Any other invalid setting.
    #[error("configuration error: {0}")]
    Invalid(String),
}

/// Errors raised by a Kerberos login facility.
#[derive(Debug, Error)]
pub enum KerberosError {
    /// The login program could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The KDC rejected the principal or password.
    #[error("kerberos login failed: {0}")]
    LoginFailed(String),

    /// The handshake did not finish in time.
    #[error("kerberos login timed out")]
    Timeout,

    /// Releasing the credentials failed.
    #[error("kerberos logout failed: {0}")]
    LogoutFailed(String),

    /// I/O error while talking to the login program.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
