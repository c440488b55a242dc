//! Backend binding modes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a backend authenticates its own connections.
///
/// Fixed at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindMode {
    /// No service bind before searching.
    Anonymous,
    /// Service account simple bind before searching.
    #[default]
    Simple,
    /// SASL: the login is the bind identity, no search is performed.
    Sasl,
    /// Kerberos: passwords are verified with a ticket-granting exchange.
    Gssapi,
}

impl BindMode {
    /// Whether the login is used verbatim as the principal.
    pub fn is_sasl(self) -> bool {
        self == BindMode::Sasl
    }

    /// Whether passwords are verified through Kerberos.
    pub fn is_gssapi(self) -> bool {
        self == BindMode::Gssapi
    }
}

impl fmt::Display for BindMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindMode::Anonymous => write!(f, "anonymous"),
            BindMode::Simple => write!(f, "simple"),
            BindMode::Sasl => write!(f, "sasl"),
            BindMode::Gssapi => write!(f, "gssapi"),
        }
    }
}
