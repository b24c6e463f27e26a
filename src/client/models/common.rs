//! Shapes shared by several GLPI resources

use serde::{Deserialize, Serialize};

/// A foreign-key field as GLPI returns it.
///
/// With `expand_dropdowns=true` GLPI replaces the id with the display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DropdownRef {
    Id(u64),
    Name(String),
}

impl DropdownRef {
    /// The numeric id, if not expanded. `0` means "none" in GLPI.
    pub fn id(&self) -> Option<u64> {
        match self {
            DropdownRef::Id(0) => None,
            DropdownRef::Id(id) => Some(*id),
            DropdownRef::Name(_) => None,
        }
    }

    /// A label usable for grouping, whichever form was returned
    pub fn label(&self) -> Option<String> {
        match self {
            DropdownRef::Id(0) => None,
            DropdownRef::Id(id) => Some(id.to_string()),
            DropdownRef::Name(name) if name.trim().is_empty() => None,
            DropdownRef::Name(name) => Some(name.clone()),
        }
    }
}

/// Response to `POST /<ItemType>`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemCreated {
    pub id: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Wraps a payload in GLPI's `{"input": ...}` envelope
#[derive(Debug, Serialize)]
pub struct Input<T> {
    pub input: T,
}

impl<T> Input<T> {
    pub fn new(input: T) -> Self {
        Self { input }
    }
}

/// GLPI booleans arrive as 0/1 integers
pub(crate) fn int_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::Number(n) => n.as_i64().unwrap_or(0) != 0,
        serde_json::Value::String(s) => s == "1" || s.eq_ignore_ascii_case("true"),
        _ => false,
    })
}
