//! Authentication API trait

use async_trait::async_trait;

use crate::client::models::SessionGrant;
use crate::error::ApiError;
use crate::session::Credentials;

/// Upstream session handshake
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Open a session for `credentials`
    async fn init_session(&self, credentials: &Credentials) -> Result<SessionGrant, ApiError>;

    /// Close the session identified by `token`
    async fn kill_session(&self, token: &str) -> Result<(), ApiError>;
}
