//! Resource families and their cache invalidation patterns

use std::sync::LazyLock;

use regex::Regex;

static TICKET: LazyLock<Regex> = LazyLock::new(|| family_pattern("Ticket"));
static USER: LazyLock<Regex> = LazyLock::new(|| family_pattern("User"));
static GROUP: LazyLock<Regex> = LazyLock::new(|| family_pattern("Group"));
static CATEGORY: LazyLock<Regex> = LazyLock::new(|| family_pattern("ITILCategory"));
static DOCUMENT: LazyLock<Regex> = LazyLock::new(|| family_pattern("Document"));
static FOLLOWUP: LazyLock<Regex> = LazyLock::new(|| family_pattern("ITILFollowup"));

/// Match cache keys for an itemtype, its sub-items and its searches,
/// whichever identity they are scoped to.
///
/// `Ticket` matches `user:7|Ticket`, `user:7|Ticket/12/ITILFollowup` and
/// `user:7|search/Ticket?...` but not `user:7|Ticket_User`.
fn family_pattern(itemtype: &str) -> Regex {
    let pattern = format!(r"^[^|]*\|(search/)?{}(/|\?|$)", regex::escape(itemtype));
    Regex::new(&pattern).expect("escaped itemtype is a valid regex")
}

/// Group of cached endpoints invalidated together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceFamily {
    Ticket,
    User,
    Group,
    Category,
    Document,
    Followup,
}

const ALL: [ResourceFamily; 6] = [
    ResourceFamily::Ticket,
    ResourceFamily::User,
    ResourceFamily::Group,
    ResourceFamily::Category,
    ResourceFamily::Document,
    ResourceFamily::Followup,
];

impl ResourceFamily {
    pub fn itemtype(&self) -> &'static str {
        match self {
            ResourceFamily::Ticket => "Ticket",
            ResourceFamily::User => "User",
            ResourceFamily::Group => "Group",
            ResourceFamily::Category => "ITILCategory",
            ResourceFamily::Document => "Document",
            ResourceFamily::Followup => "ITILFollowup",
        }
    }

    /// Family addressed by an endpoint such as `Ticket/12` or `search/Ticket`
    pub fn of_endpoint(endpoint: &str) -> Option<Self> {
        let endpoint = endpoint.trim_matches('/');
        let endpoint = endpoint.strip_prefix("search/").unwrap_or(endpoint);
        let itemtype = endpoint.split(['/', '?']).next()?;
        ALL.into_iter().find(|family| family.itemtype() == itemtype)
    }

    pub fn pattern(&self) -> &'static Regex {
        match self {
            ResourceFamily::Ticket => &TICKET,
            ResourceFamily::User => &USER,
            ResourceFamily::Group => &GROUP,
            ResourceFamily::Category => &CATEGORY,
            ResourceFamily::Document => &DOCUMENT,
            ResourceFamily::Followup => &FOLLOWUP,
        }
    }
}
