//! User and group models

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::common::int_bool;

/// GLPI `User` item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,

    /// Login name
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realname: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firstname: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default = "default_active", deserialize_with = "int_bool")]
    pub is_active: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_active() -> bool {
    true
}

impl User {
    /// "First Last", falling back to the login
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [self.firstname.as_deref(), self.realname.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        if parts.is_empty() {
            self.name.clone()
        } else {
            parts.join(" ")
        }
    }
}

/// GLPI `Group` item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: u64,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completename: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// GLPI `Group_User` membership
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupUser {
    pub id: u64,

    pub groups_id: u64,

    pub users_id: u64,

    #[serde(default, deserialize_with = "int_bool")]
    pub is_manager: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_name() {
        let user: User = serde_json::from_value(json!({
            "id": 7,
            "name": "maria.silva@pucgo.edu.br",
            "firstname": "Maria",
            "realname": "Silva",
            "is_active": 1
        }))
        .unwrap();
        assert_eq!(user.display_name(), "Maria Silva");
        assert!(user.is_active);

        let bare: User = serde_json::from_value(json!({"id": 8, "name": "glpi", "realname": " "}))
            .unwrap();
        assert_eq!(bare.display_name(), "glpi");
        assert!(bare.is_active);
    }

    #[test]
    fn test_group_user_flags() {
        let membership: GroupUser = serde_json::from_value(json!({
            "id": 1, "groups_id": 2, "users_id": 3, "is_manager": 0
        }))
        .unwrap();
        assert!(!membership.is_manager);
    }
}
