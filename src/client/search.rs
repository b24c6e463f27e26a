//! GLPI search criteria and ticket filters
//!
//! GLPI's `search/<ItemType>` endpoint takes criteria as indexed query
//! parameters (`criteria[0][field]=12&criteria[0][searchtype]=equals&...`)
//! and returns rows keyed by numeric search-option ids.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::models::Ticket;
use crate::error::ApiError;

/// Ticket search-option ids
pub mod ticket_field {
    pub const NAME: u32 = 1;
    pub const ID: u32 = 2;
    pub const PRIORITY: u32 = 3;
    pub const REQUESTER: u32 = 4;
    pub const ASSIGNED_TECHNICIAN: u32 = 5;
    pub const CATEGORY: u32 = 7;
    pub const STATUS: u32 = 12;
    pub const OPENING_DATE: u32 = 15;
    pub const CLOSE_DATE: u32 = 16;
    pub const SOLVE_DATE: u32 = 17;
    pub const LAST_UPDATE: u32 = 19;
}

/// Search-option id -> `Ticket` field, for rebuilding tickets from search rows
const TICKET_COLUMNS: [(u32, &str); 9] = [
    (ticket_field::ID, "id"),
    (ticket_field::NAME, "name"),
    (ticket_field::STATUS, "status"),
    (ticket_field::PRIORITY, "priority"),
    (ticket_field::CATEGORY, "itilcategories_id"),
    (ticket_field::OPENING_DATE, "date"),
    (ticket_field::LAST_UPDATE, "date_mod"),
    (ticket_field::SOLVE_DATE, "solvedate"),
    (ticket_field::CLOSE_DATE, "closedate"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    Equals,
    NotEquals,
    Contains,
    LessThan,
    MoreThan,
    Under,
}

impl SearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Equals => "equals",
            SearchType::NotEquals => "notequals",
            SearchType::Contains => "contains",
            SearchType::LessThan => "lessthan",
            SearchType::MoreThan => "morethan",
            SearchType::Under => "under",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    And,
    Or,
    AndNot,
}

impl Link {
    pub fn as_str(&self) -> &'static str {
        match self {
            Link::And => "AND",
            Link::Or => "OR",
            Link::AndNot => "AND NOT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criterion {
    pub link: Link,
    pub field: u32,
    pub searchtype: SearchType,
    pub value: String,
}

/// Ordered list of search criteria
///
/// # Example
/// ```ignore
/// let criteria = SearchCriteria::new()
///     .and(ticket_field::STATUS, SearchType::Equals, "1")
///     .and(ticket_field::CATEGORY, SearchType::Equals, "4");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    criteria: Vec<Criterion>,
}

impl SearchCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(self, field: u32, searchtype: SearchType, value: impl Into<String>) -> Self {
        self.push(Link::And, field, searchtype, value)
    }

    pub fn or(self, field: u32, searchtype: SearchType, value: impl Into<String>) -> Self {
        self.push(Link::Or, field, searchtype, value)
    }

    pub fn push(
        mut self,
        link: Link,
        field: u32,
        searchtype: SearchType,
        value: impl Into<String>,
    ) -> Self {
        self.criteria.push(Criterion {
            link,
            field,
            searchtype,
            value: value.into(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Encode as GLPI query parameters. The first criterion carries no link.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::with_capacity(self.criteria.len() * 4);
        for (i, c) in self.criteria.iter().enumerate() {
            if i > 0 {
                query.push((format!("criteria[{}][link]", i), c.link.as_str().to_string()));
            }
            query.push((format!("criteria[{}][field]", i), c.field.to_string()));
            query.push((
                format!("criteria[{}][searchtype]", i),
                c.searchtype.as_str().to_string(),
            ));
            query.push((format!("criteria[{}][value]", i), c.value.clone()));
        }
        query
    }
}

/// Inclusive item range (`range=start-end`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Default for Range {
    fn default() -> Self {
        Self { start: 0, end: 999 }
    }
}

impl Range {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn as_param(&self) -> String {
        format!("{}-{}", self.start, self.end)
    }
}

/// Filters for ticket listings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketFilters {
    pub status: Option<i64>,
    pub priority: Option<i64>,
    pub category_id: Option<u64>,
    pub requester_id: Option<u64>,
    pub assigned_to: Option<u64>,
    pub range: Range,
}

impl TicketFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: i64) -> Self {
        self.status = Some(status);
        self
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn category(mut self, category_id: u64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn requester(mut self, user_id: u64) -> Self {
        self.requester_id = Some(user_id);
        self
    }

    pub fn assigned_to(mut self, user_id: u64) -> Self {
        self.assigned_to = Some(user_id);
        self
    }

    pub fn range(mut self, range: Range) -> Self {
        self.range = range;
        self
    }

    pub fn criteria(&self) -> SearchCriteria {
        let mut criteria = SearchCriteria::new();
        if let Some(status) = self.status {
            criteria = criteria.and(ticket_field::STATUS, SearchType::Equals, status.to_string());
        }
        if let Some(priority) = self.priority {
            criteria =
                criteria.and(ticket_field::PRIORITY, SearchType::Equals, priority.to_string());
        }
        if let Some(category) = self.category_id {
            criteria =
                criteria.and(ticket_field::CATEGORY, SearchType::Equals, category.to_string());
        }
        if let Some(requester) = self.requester_id {
            criteria =
                criteria.and(ticket_field::REQUESTER, SearchType::Equals, requester.to_string());
        }
        if let Some(tech) = self.assigned_to {
            criteria = criteria.and(
                ticket_field::ASSIGNED_TECHNICIAN,
                SearchType::Equals,
                tech.to_string(),
            );
        }
        criteria
    }

    /// Endpoint and query for this listing.
    ///
    /// Without filters the plain item listing is used; otherwise the search
    /// engine, with the columns needed to rebuild [`Ticket`]s.
    pub fn to_request(&self) -> (String, Vec<(String, String)>) {
        let criteria = self.criteria();

        if criteria.is_empty() {
            return (
                "Ticket".to_string(),
                vec![
                    ("expand_dropdowns".to_string(), "true".to_string()),
                    ("range".to_string(), self.range.as_param()),
                    ("sort".to_string(), "id".to_string()),
                    ("order".to_string(), "DESC".to_string()),
                ],
            );
        }

        let mut query = criteria.to_query();
        for (i, (field, _)) in TICKET_COLUMNS.iter().enumerate() {
            query.push((format!("forcedisplay[{}]", i), field.to_string()));
        }
        query.push(("range".to_string(), self.range.as_param()));
        query.push(("sort".to_string(), ticket_field::ID.to_string()));
        query.push(("order".to_string(), "DESC".to_string()));

        ("search/Ticket".to_string(), query)
    }
}

/// Body of `GET /search/<ItemType>`
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub totalcount: usize,

    #[serde(default)]
    pub data: Vec<Map<String, Value>>,
}

impl SearchResponse {
    /// Rebuild tickets from search rows keyed by search-option id
    pub fn into_tickets(self) -> Result<Vec<Ticket>, ApiError> {
        self.data.into_iter().map(ticket_from_row).collect()
    }
}

fn ticket_from_row(row: Map<String, Value>) -> Result<Ticket, ApiError> {
    let mut object = Map::new();
    for (field, name) in TICKET_COLUMNS {
        let Some(value) = row.get(&field.to_string()) else {
            continue;
        };
        let value = match (name, value) {
            (_, Value::Null) => continue,
            // Search rows may stringify numbers
            ("id" | "status" | "priority", Value::String(s)) => match s.trim().parse::<i64>() {
                Ok(n) => Value::from(n),
                Err(_) => continue,
            },
            _ => value.clone(),
        };
        object.insert(name.to_string(), value);
    }

    serde_json::from_value(Value::Object(object))
        .map_err(|e| ApiError::InvalidResponse(format!("Unexpected search row: {}", e)))
}
