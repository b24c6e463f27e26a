//! Ticket status and priority codes
//!
//! GLPI encodes both as small integers. The string forms are stable
//! identifiers for the UI layer to translate.

use serde::{Deserialize, Serialize};

/// Label returned for status codes outside 1..=6
pub const UNKNOWN_STATUS: &str = "unknown";

/// Label returned for priority codes outside 1..=6 (GLPI's default priority)
pub const DEFAULT_PRIORITY: &str = "medium";

/// Ticket lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    New,
    Assigned,
    Planned,
    Pending,
    Solved,
    Closed,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 6] = [
        TicketStatus::New,
        TicketStatus::Assigned,
        TicketStatus::Planned,
        TicketStatus::Pending,
        TicketStatus::Solved,
        TicketStatus::Closed,
    ];

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(TicketStatus::New),
            2 => Some(TicketStatus::Assigned),
            3 => Some(TicketStatus::Planned),
            4 => Some(TicketStatus::Pending),
            5 => Some(TicketStatus::Solved),
            6 => Some(TicketStatus::Closed),
            _ => None,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            TicketStatus::New => 1,
            TicketStatus::Assigned => 2,
            TicketStatus::Planned => 3,
            TicketStatus::Pending => 4,
            TicketStatus::Solved => 5,
            TicketStatus::Closed => 6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::New => "new",
            TicketStatus::Assigned => "assigned",
            TicketStatus::Planned => "planned",
            TicketStatus::Pending => "pending",
            TicketStatus::Solved => "solved",
            TicketStatus::Closed => "closed",
        }
    }

    /// Solved and closed tickets need no further work
    pub fn is_open(&self) -> bool {
        !matches!(self, TicketStatus::Solved | TicketStatus::Closed)
    }
}

/// Ticket priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
    Major,
}

impl Priority {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Priority::VeryLow),
            2 => Some(Priority::Low),
            3 => Some(Priority::Medium),
            4 => Some(Priority::High),
            5 => Some(Priority::VeryHigh),
            6 => Some(Priority::Major),
            _ => None,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Priority::VeryLow => 1,
            Priority::Low => 2,
            Priority::Medium => 3,
            Priority::High => 4,
            Priority::VeryHigh => 5,
            Priority::Major => 6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::VeryLow => "very_low",
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::VeryHigh => "very_high",
            Priority::Major => "major",
        }
    }
}

/// Map a GLPI status code to its label. Never fails.
pub fn map_status_to_string(code: i64) -> &'static str {
    TicketStatus::from_code(code)
        .map(|s| s.as_str())
        .unwrap_or(UNKNOWN_STATUS)
}

/// Map a GLPI priority code to its label. Never fails.
pub fn map_priority_to_string(code: i64) -> &'static str {
    Priority::from_code(code)
        .map(|p| p.as_str())
        .unwrap_or(DEFAULT_PRIORITY)
}
