//! Report API trait

use async_trait::async_trait;

use super::TicketApi;
use crate::client::models::TicketReport;
use crate::client::search::TicketFilters;
use crate::error::Result;

/// Dashboard aggregates computed from ticket listings.
///
/// Built on [`TicketApi::get_tickets`], so reports share its cache entries
/// and are invalidated by the same ticket writes.
#[async_trait]
pub trait ReportApi: TicketApi {
    async fn ticket_report(&self, filters: &TicketFilters) -> Result<TicketReport> {
        let tickets = self.get_tickets(filters).await?;
        Ok(TicketReport::from_tickets(&tickets))
    }
}
