//! Authentication models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response to `GET /initSession?get_full_session=true`
#[derive(Debug, Clone, Deserialize)]
pub struct InitSessionResponse {
    pub session_token: String,

    #[serde(default)]
    pub session: Option<FullSession>,
}

/// Profile GLPI activated for the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveProfile {
    pub id: u64,
    pub name: String,
}

/// The authenticated user as described by `getFullSession`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    #[serde(rename = "glpiID")]
    pub id: u64,

    #[serde(rename = "glpiname", default)]
    pub login: String,

    #[serde(rename = "glpirealname", default)]
    pub realname: Option<String>,

    #[serde(rename = "glpifirstname", default)]
    pub firstname: Option<String>,
}

/// GLPI session data, reduced to what the session layer needs
#[derive(Debug, Clone, Deserialize)]
pub struct FullSession {
    #[serde(flatten)]
    pub user: Option<SessionUser>,

    #[serde(rename = "glpiactiveprofile", default)]
    pub active_profile: Option<ActiveProfile>,
}

/// What a successful authentication hands to the session provider
#[derive(Debug, Clone)]
pub struct SessionGrant {
    pub token: String,

    /// Explicit role claim; `None` when the upstream did not provide one
    pub profile: Option<ActiveProfile>,

    pub user: Option<SessionUser>,

    /// Upstream-reported expiry; GLPI does not send one
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionGrant {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            profile: None,
            user: None,
            expires_at: None,
        }
    }
}
