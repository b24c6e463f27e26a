//! Followup API trait

use async_trait::async_trait;

use crate::client::models::Followup;
use crate::error::Result;

/// Ticket followup (comment) operations
#[async_trait]
pub trait FollowupApi: Send + Sync {
    /// Followups on a ticket, oldest first
    async fn get_followups(&self, ticket_id: u64) -> Result<Vec<Followup>>;

    /// Add a followup and return its id
    async fn add_followup(&self, ticket_id: u64, content: &str, is_private: bool) -> Result<u64>;
}
