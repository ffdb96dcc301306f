use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{DocumentError, EntityKind, Result};

/// Tools every new document knows about, with their starting configuration
fn default_tools() -> BTreeMap<String, Value> {
    [
        ("select", json!({})),
        ("brush", json!({ "char": "#", "size": 1 })),
        ("eraser", json!({ "size": 1 })),
        ("text", json!({ "skipSpaces": false })),
        ("box", json!({ "style": "single" })),
        ("line", json!({ "char": "-" })),
    ]
    .into_iter()
    .map(|(name, config)| (name.to_string(), config))
    .collect()
}

/// Selected tool plus per-tool configuration. Configs are opaque to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolState {
    pub active_tool: String,
    pub data: BTreeMap<String, Value>,
}

impl Default for ToolState {
    fn default() -> Self {
        Self {
            active_tool: "select".to_string(),
            data: default_tools(),
        }
    }
}

impl ToolState {
    pub fn active_tool(&self) -> &str {
        &self.active_tool
    }

    pub fn set_active_tool(&mut self, name: &str) -> Result<()> {
        if !self.data.contains_key(name) {
            return Err(DocumentError::NotFound {
                kind: EntityKind::Tool,
                id: name.to_string(),
            });
        }
        self.active_tool = name.to_string();
        Ok(())
    }

    pub fn tool_config(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    /// Replace a tool's configuration, registering the tool if it is new
    pub fn set_tool_config(&mut self, name: impl Into<String>, config: Value) {
        self.data.insert(name.into(), config);
    }

    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }
}
