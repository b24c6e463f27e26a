//! Ticket models

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::common::DropdownRef;
use super::status::{TicketStatus, map_priority_to_string, map_status_to_string};

/// GLPI `Ticket` item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: u64,

    /// Ticket title
    #[serde(default)]
    pub name: String,

    /// Description (HTML as stored by GLPI)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default)]
    pub status: i64,

    #[serde(default)]
    pub priority: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<i64>,

    /// 1 = incident, 2 = request
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub ticket_type: Option<i64>,

    #[serde(
        default,
        rename = "itilcategories_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<DropdownRef>,

    /// Opening date (`YYYY-MM-DD HH:MM:SS`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_mod: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solvedate: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closedate: Option<String>,

    /// Fields this layer does not model, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Ticket {
    pub fn status_label(&self) -> &'static str {
        map_status_to_string(self.status)
    }

    pub fn priority_label(&self) -> &'static str {
        map_priority_to_string(self.priority)
    }

    /// Unknown status codes count as open
    pub fn is_open(&self) -> bool {
        TicketStatus::from_code(self.status).is_none_or(|s| s.is_open())
    }
}

/// Payload for `POST /Ticket`
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewTicket {
    pub name: String,

    pub content: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgency: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ticket_type: Option<i64>,

    #[serde(rename = "itilcategories_id", skip_serializing_if = "Option::is_none")]
    pub category_id: Option<u64>,

    #[serde(rename = "_users_id_requester", skip_serializing_if = "Option::is_none")]
    pub requester_id: Option<u64>,

    #[serde(rename = "_groups_id_assign", skip_serializing_if = "Option::is_none")]
    pub assign_group_id: Option<u64>,
}

impl NewTicket {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            ..Self::default()
        }
    }
}

/// Payload for `PUT /Ticket/{id}`; only set fields are sent
#[derive(Debug, Clone, Default, Serialize)]
pub struct TicketUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgency: Option<i64>,

    #[serde(rename = "itilcategories_id", skip_serializing_if = "Option::is_none")]
    pub category_id: Option<u64>,
}

/// Actor role on a ticket (`Ticket_User.type`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketActor {
    Requester,
    Assigned,
    Observer,
}

impl TicketActor {
    pub fn code(&self) -> i64 {
        match self {
            TicketActor::Requester => 1,
            TicketActor::Assigned => 2,
            TicketActor::Observer => 3,
        }
    }
}

/// GLPI `Ticket_User` link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketUser {
    pub id: u64,

    pub tickets_id: u64,

    pub users_id: u64,

    #[serde(rename = "type")]
    pub actor_type: i64,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Ticket with its followups and attached documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketDetails {
    pub ticket: Ticket,
    pub followups: Vec<super::Followup>,
    pub documents: Vec<super::Document>,
}
