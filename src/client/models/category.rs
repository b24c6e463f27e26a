//! ITIL category models

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::common::{DropdownRef, int_bool};

/// GLPI `ITILCategory` item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,

    #[serde(default)]
    pub name: String,

    /// Full path, e.g. `Moodle > Acesso`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completename: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    #[serde(
        default,
        rename = "itilcategories_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent: Option<DropdownRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,

    #[serde(default = "default_visible", deserialize_with = "int_bool")]
    pub is_helpdeskvisible: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_visible() -> bool {
    true
}

impl Category {
    pub fn display_name(&self) -> &str {
        self.completename
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.name)
    }
}

/// Payload for `POST /ITILCategory`
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewCategory {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    #[serde(rename = "itilcategories_id", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<u64>,
}

impl NewCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Payload for `PUT /ITILCategory/{id}`
#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    #[serde(rename = "itilcategories_id", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_helpdeskvisible: Option<u8>,
}
