//! Pluggable credential check

use async_trait::async_trait;

use crate::chat::Conversant;
use crate::error::AuthError;
use crate::protocol::Credentials;

/// Resolves handshake credentials to a conversant
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Authenticate a client
    async fn authenticate(&self, credentials: &Credentials) -> Result<Conversant, AuthError>;
}

#[async_trait]
impl<F> Authenticator for F
where
    F: Fn(&Credentials) -> Result<Conversant, AuthError> + Send + Sync,
{
    async fn authenticate(&self, credentials: &Credentials) -> Result<Conversant, AuthError> {
        self(credentials)
    }
}
