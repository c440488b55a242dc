//! # Dirgate Directory
//!
//! Directory access abstraction for Dirgate backends.
//!
//! Provides the traits the authentication core consumes to reach a
//! directory server: opening user-bound connections and resolving a login
//! to a principal.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod connector;
pub mod error;
pub mod mode;

pub use connector::{DirectoryConnection, DirectoryConnector, PrincipalResolver};
pub use error::DirectoryError;
pub use mode::BindMode;
