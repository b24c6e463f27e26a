//! Ticket API trait

use async_trait::async_trait;

use crate::client::models::{NewTicket, Ticket, TicketDetails, TicketUpdate};
use crate::client::search::TicketFilters;
use crate::error::Result;

/// Ticket operations
///
/// Every write invalidates cached ticket listings, searches and reports.
#[async_trait]
pub trait TicketApi: Send + Sync {
    // ========================================================================
    // Read Operations
    // ========================================================================

    /// List tickets matching `filters`, newest first
    async fn get_tickets(&self, filters: &TicketFilters) -> Result<Vec<Ticket>>;

    /// Get a single ticket with dropdowns expanded
    async fn get_ticket(&self, id: u64) -> Result<Ticket>;

    /// Ticket with its followups and documents, fetched concurrently
    async fn get_ticket_details(&self, id: u64) -> Result<TicketDetails>;

    // ========================================================================
    // Write Operations
    // ========================================================================

    /// Create a ticket and return its new id
    async fn create_ticket(&self, ticket: NewTicket) -> Result<u64>;

    /// Update the set fields of a ticket
    async fn update_ticket(&self, id: u64, update: TicketUpdate) -> Result<()>;

    /// Purge a ticket
    async fn delete_ticket(&self, id: u64) -> Result<()>;

    /// Add `user_id` as an assigned technician
    async fn assign_ticket(&self, ticket_id: u64, user_id: u64) -> Result<u64>;
}
