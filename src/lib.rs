//! glpidesk - GLPI REST client for the CEAD support desk
//!
//! Three layers sit between the UI and GLPI:
//! - [`cache`] - TTL response cache with pattern invalidation and optional persistence
//! - [`session`] - sign-in, token validity, and proactive refresh
//! - [`client`] - typed resource calls with normalized errors

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod session;

pub use cache::TtlCache;
pub use client::models::{map_priority_to_string, map_status_to_string};
pub use client::{GlpiApi, GlpiClient, RequestOptions, TicketFilters};
pub use config::Config;
pub use error::{ApiError, AttachError, AuthError, Error, ErrorKind, NormalizedError, Result};
pub use session::{Credentials, Role, Session, SessionPhase, SessionProvider};
