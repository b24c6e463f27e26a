//! Document API trait

use async_trait::async_trait;

use crate::client::models::{Document, Upload};
use crate::error::Result;

/// Document upload and attachment operations
#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// Documents attached to a ticket
    async fn get_ticket_documents(&self, ticket_id: u64) -> Result<Vec<Document>>;

    /// Upload a file as a standalone document owned by `owner_id`
    async fn upload_document(&self, upload: Upload, owner_id: Option<u64>) -> Result<u64>;

    /// Attach an existing document to a ticket
    async fn link_document_to_ticket(&self, document_id: u64, ticket_id: u64) -> Result<u64>;

    /// Upload then link, with no rollback.
    ///
    /// If linking fails the uploaded document stays in GLPI and its id is
    /// reported in [`AttachError::LinkFailed`](crate::error::AttachError::LinkFailed).
    async fn attach_to_ticket(
        &self,
        upload: Upload,
        ticket_id: u64,
        owner_id: Option<u64>,
    ) -> Result<u64>;
}
