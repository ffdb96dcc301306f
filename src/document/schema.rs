//! Plain-data document schema, the JSON shape written to storage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{LayerId, LayerModel};

use super::camera::Camera;
use super::tools::ToolState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSchema {
    pub meta: MetaSchema,
    pub config: ConfigSchema,
    pub layers: LayersSchema,
    #[serde(default)]
    pub camera: Camera,
    #[serde(default)]
    pub tools: ToolState,
    /// Always written as `null`; history is not persisted
    #[serde(default)]
    pub history: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaSchema {
    pub id: String,
    pub version: u32,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSchema {
    pub tile_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayersSchema {
    pub active_layer_key: Option<LayerId>,
    /// Keyed by layer id
    pub data: BTreeMap<String, LayerModel>,
}
