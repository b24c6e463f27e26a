//! API trait definitions split by responsibility
//!
//! This module organizes the GLPI API surface into focused sub-traits:
//! - [`AuthApi`] - Session handshake (used by the session provider)
//! - [`TicketApi`] - Ticket CRUD and assignment
//! - [`FollowupApi`] - Ticket followups
//! - [`DocumentApi`] - Uploads and ticket attachments
//! - [`CategoryApi`] - ITIL categories
//! - [`DirectoryApi`] - Users and groups
//! - [`ReportApi`] - Dashboard aggregates
//!
//! The [`GlpiApi`](super::GlpiApi) super-trait combines all resource traits.

mod auth;
mod categories;
mod directory;
mod documents;
mod followups;
mod reports;
mod tickets;

pub use auth::AuthApi;
pub use categories::CategoryApi;
pub use directory::DirectoryApi;
pub use documents::DocumentApi;
pub use followups::FollowupApi;
pub use reports::ReportApi;
pub use tickets::TicketApi;
