//! GLPI API client
//!
//! [`GlpiClient`] wraps GLPI's REST endpoints with session handling, a TTL
//! response cache, retries for reads, and error normalization.

pub mod api;
mod auth;
mod family;
mod glpi;
pub mod models;
pub mod request;
pub mod search;

pub use api::{
    AuthApi, CategoryApi, DirectoryApi, DocumentApi, FollowupApi, ReportApi, TicketApi,
};
pub use auth::GlpiAuthenticator;
pub use family::ResourceFamily;
pub use glpi::GlpiClient;
pub use request::RequestOptions;
pub use search::{Range, SearchCriteria, SearchType, TicketFilters};

/// Everything a support-desk screen needs from GLPI
pub trait GlpiApi:
    TicketApi + FollowupApi + DocumentApi + CategoryApi + DirectoryApi + ReportApi
{
}

impl<T> GlpiApi for T where
    T: TicketApi + FollowupApi + DocumentApi + CategoryApi + DirectoryApi + ReportApi
{
}
