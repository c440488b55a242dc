//! Directory collaborator traits.

use async_trait::async_trait;

use crate::error::DirectoryError;

/// An open, authenticated directory connection.
///
/// Dropping the connection releases it. [`close`](Self::close) performs an
/// orderly release (an LDAP unbind) and should be preferred when the caller
/// can await.
#[async_trait]
pub trait DirectoryConnection: Send {
    /// Releases the connection.
    async fn close(self: Box<Self>);
}

/// Opens directory connections on behalf of a single backend.
#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    /// Opens a connection authenticated as `principal` with `password`.
    ///
    /// Success means the directory accepted the credentials. Callers must
    /// never pass an empty password: some directories treat it as an
    /// anonymous bind that always succeeds.
    async fn open_user_connection(
        &self,
        principal: &str,
        password: &str,
    ) -> Result<Box<dyn DirectoryConnection>, DirectoryError>;
}

/// Resolves a login name to a directory principal.
#[async_trait]
pub trait PrincipalResolver: Send + Sync {
    /// Searches for the entry matching `login`.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(principal))` - Exactly one entry matched
    /// * `Ok(None)` - No entry matched
    /// * `Err(DirectoryError::NonUnique)` - More than one entry matched
    /// * `Err(_)` - The directory could not be searched
    async fn find_unique(&self, login: &str) -> Result<Option<String>, DirectoryError>;
}
