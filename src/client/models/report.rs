//! Ticket report aggregates

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::Ticket;

/// GLPI's datetime format
const GLPI_DATETIME: &str = "%Y-%m-%d %H:%M:%S";

/// Label used for tickets without a category
pub const UNCATEGORIZED: &str = "uncategorized";

/// Dashboard summary over a set of tickets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketReport {
    pub total: usize,
    pub open: usize,
    pub closed: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
    /// Mean hours from opening to solution, over tickets that have both dates
    pub average_resolution_hours: Option<f64>,
}

impl TicketReport {
    pub fn from_tickets(tickets: &[Ticket]) -> Self {
        let mut report = TicketReport {
            total: tickets.len(),
            ..Self::default()
        };

        let mut resolution_hours = Vec::new();

        for ticket in tickets {
            if ticket.is_open() {
                report.open += 1;
            } else {
                report.closed += 1;
            }

            *report
                .by_status
                .entry(ticket.status_label().to_string())
                .or_default() += 1;
            *report
                .by_priority
                .entry(ticket.priority_label().to_string())
                .or_default() += 1;

            let category = ticket
                .category
                .as_ref()
                .and_then(|c| c.label())
                .unwrap_or_else(|| UNCATEGORIZED.to_string());
            *report.by_category.entry(category).or_default() += 1;

            if let Some(hours) = resolution_hours_of(ticket) {
                resolution_hours.push(hours);
            }
        }

        if !resolution_hours.is_empty() {
            let sum: f64 = resolution_hours.iter().sum();
            report.average_resolution_hours = Some(sum / resolution_hours.len() as f64);
        }

        report
    }
}

fn resolution_hours_of(ticket: &Ticket) -> Option<f64> {
    let opened = parse_glpi_datetime(ticket.date.as_deref()?)?;
    let solved = parse_glpi_datetime(ticket.solvedate.as_deref()?)?;
    let minutes = (solved - opened).num_minutes();
    (minutes >= 0).then(|| minutes as f64 / 60.0)
}

fn parse_glpi_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), GLPI_DATETIME).ok()
}
