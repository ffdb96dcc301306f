//! Document ↔ schema conversion.
//!
//! Loading is all-or-nothing: the whole schema is validated and every layer
//! rebuilt before the target document is touched, so a bad blob leaves the
//! current document exactly as it was.

use std::collections::HashSet;

use tracing::info;

use crate::constants::{MAX_TILE_SIZE, SCHEMA_VERSION};
use crate::error::{DocumentError, Result};
use crate::layers::{EventMeta, Layer};

use super::Document;
use super::schema::{ConfigSchema, DocumentSchema, LayersSchema, MetaSchema};

/// Snapshot a document into its plain-data schema. History is not included.
pub fn serialize(doc: &Document) -> DocumentSchema {
    let data = doc
        .layers
        .models()
        .into_iter()
        .map(|model| (model.id.to_string(), model))
        .collect();

    DocumentSchema {
        meta: MetaSchema {
            id: doc.meta.id.clone(),
            version: SCHEMA_VERSION,
            title: doc.meta.title.clone(),
        },
        config: ConfigSchema {
            tile_size: doc.tile_size,
        },
        layers: LayersSchema {
            active_layer_key: doc.layers.active_layer_key().cloned(),
            data,
        },
        camera: doc.camera,
        tools: doc.tools.clone(),
        history: None,
    }
}

/// Check a schema without loading it
pub fn validate(schema: &DocumentSchema) -> Result<()> {
    build_layers(schema).map(|_| ())
}

/// Validate the schema and rebuild its layers, sorted by index
fn build_layers(schema: &DocumentSchema) -> Result<Vec<Layer>> {
    let version = schema.meta.version;
    if version == 0 || version > SCHEMA_VERSION {
        return Err(invalid(format!(
            "unsupported version {} (expected 1..={})",
            version, SCHEMA_VERSION
        )));
    }

    let tile_size = schema.config.tile_size;
    if tile_size == 0 || tile_size > MAX_TILE_SIZE {
        return Err(invalid(format!("tile size {} out of range", tile_size)));
    }

    if !schema.camera.is_valid() {
        return Err(invalid("camera has non-finite offset or non-positive scale"));
    }

    if schema.tools.tool_config(&schema.tools.active_tool).is_none() {
        return Err(invalid(format!(
            "active tool {:?} has no configuration",
            schema.tools.active_tool
        )));
    }

    let mut indices = HashSet::new();
    let mut layers = Vec::with_capacity(schema.layers.data.len());
    for (key, model) in &schema.layers.data {
        if key != model.id.as_str() {
            return Err(invalid(format!("layer key {} does not match id {}", key, model.id)));
        }
        if !indices.insert(model.index) {
            return Err(invalid(format!("duplicate layer index {}", model.index)));
        }
        if let Some(map) = &model.tile_map
            && map.tile_size != tile_size
        {
            return Err(invalid(format!(
                "layer {} uses tile size {}, document uses {}",
                key, map.tile_size, tile_size
            )));
        }
        let layer = Layer::from_model(model).map_err(|err| match err {
            DocumentError::SchemaInvalid(msg) => invalid(format!("layer {}: {}", key, msg)),
            other => other,
        })?;
        layers.push(layer);
    }

    if let Some(active) = &schema.layers.active_layer_key
        && !schema.layers.data.contains_key(active.as_str())
    {
        return Err(invalid(format!("active layer {} does not exist", active)));
    }

    layers.sort_by_key(Layer::index);
    Ok(layers)
}

fn invalid(msg: impl Into<String>) -> DocumentError {
    DocumentError::SchemaInvalid(msg.into())
}

/// Replace the document's content with the schema's.
///
/// Events are tagged as hydration. History and any open gesture are dropped.
pub fn deserialize(doc: &mut Document, schema: DocumentSchema) -> Result<()> {
    let layers = build_layers(&schema)?;
    let meta = EventMeta::hydration();

    doc.layers.clear_layers_with(meta);
    doc.layers.clear_temp_layers();
    doc.layers.set_tile_size(schema.config.tile_size);
    for layer in layers {
        let index = layer.index();
        doc.layers.insert_layer_with(index, layer, meta)?;
    }
    doc.layers
        .set_active_layer_with(schema.layers.active_layer_key, meta)?;

    doc.meta.id = schema.meta.id;
    doc.meta.title = schema.meta.title;
    doc.tile_size = schema.config.tile_size;
    doc.camera = schema.camera;
    doc.tools = schema.tools;
    doc.history.clear();
    doc.gesture = None;

    info!(
        "Loaded document {} with {} layers",
        doc.meta.id,
        doc.layers.len()
    );
    Ok(())
}

pub fn to_json(doc: &Document) -> Result<String> {
    Ok(serde_json::to_string_pretty(&serialize(doc))?)
}

pub fn from_json(json: &str) -> Result<DocumentSchema> {
    Ok(serde_json::from_str(json)?)
}
