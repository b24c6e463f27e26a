//! Document and followup models

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::common::int_bool;

/// GLPI `Document` item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: u64,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_creation: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// GLPI `Document_Item` link between a document and an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentItem {
    pub id: u64,

    pub documents_id: u64,

    pub items_id: u64,

    pub itemtype: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A file to upload
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            mime: None,
            bytes,
        }
    }

    pub fn mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

/// GLPI `ITILFollowup` item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Followup {
    pub id: u64,

    #[serde(default)]
    pub itemtype: String,

    #[serde(default)]
    pub items_id: u64,

    #[serde(default)]
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users_id: Option<Value>,

    #[serde(default, deserialize_with = "int_bool")]
    pub is_private: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
