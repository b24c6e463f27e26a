//! GLPI data models
//!
//! Loose mirrors of GLPI's item schemas. Each keeps the fields this layer
//! uses and passes everything else through in `extra`.

mod auth;
mod category;
mod common;
mod document;
mod report;
mod status;
mod ticket;
mod user;

pub use auth::{ActiveProfile, FullSession, InitSessionResponse, SessionGrant, SessionUser};
pub use category::{Category, CategoryUpdate, NewCategory};
pub use common::{DropdownRef, Input, ItemCreated};
pub use document::{Document, DocumentItem, Followup, Upload};
pub use report::{TicketReport, UNCATEGORIZED};
pub use status::{
    DEFAULT_PRIORITY, Priority, TicketStatus, UNKNOWN_STATUS, map_priority_to_string,
    map_status_to_string,
};
pub use ticket::{NewTicket, Ticket, TicketActor, TicketDetails, TicketUpdate, TicketUser};
pub use user::{Group, GroupUser, User};
