//! The document context: everything one open drawing consists of.
//!
//! A [`Document`] bundles the layers, camera, tool state and undo history of
//! a single drawing and is passed explicitly to whoever edits it. Edits made
//! through the document are recorded in history; edits made directly on
//! [`Document::layers_mut`] are not.
//!
//! ## Gestures
//!
//! A drag or stroke produces many small edits. Between
//! [`Document::begin_gesture`] and [`Document::commit_gesture`] those edits
//! are collected and pushed as a single undo step. Tile edits on the same
//! layer are merged. [`Document::cancel_gesture`] reverts everything the
//! gesture did instead.
//!
//! ## Module Structure
//!
//! - [`camera`] - viewport offset and zoom
//! - [`tools`] - active tool and per-tool configuration
//! - [`schema`] - serialized JSON shape
//! - [`serializer`] - document ↔ schema with validation
//! - [`store`] - key/value persistence of serialized blobs

mod camera;
mod schema;
pub mod serializer;
mod store;
mod tools;


pub use camera::Camera;
pub use schema::{ConfigSchema, DocumentSchema, LayersSchema, MetaSchema};
pub use store::{DocumentStore, FileStore, MemoryStore};
pub use tools::ToolState;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::AppConfigData;
use crate::constants::{DEFAULT_DOCUMENT_TITLE, MAX_TILE_SIZE};
use crate::error::{DocumentError, Result};
use crate::history::{ActiveChange, HistoryAction, HistoryContext, HistoryManager, Reversible};
use crate::layers::{DocumentEvent, Layer, LayersManager, SubscriptionId, text_block_size};
use crate::types::{LayerId, LayerPatch, LayerUpdate, TileCoord};

/// Identity of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMeta {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Default)]
struct Gesture {
    actions: Vec<HistoryAction>,
}

#[derive(Debug)]
pub struct Document {
    meta: DocumentMeta,
    tile_size: u32,
    layers: LayersManager,
    camera: Camera,
    tools: ToolState,
    history: HistoryManager<HistoryAction>,
    gesture: Option<Gesture>,
}

impl Document {
    /// An empty document. The tile size is clamped to `1..=MAX_TILE_SIZE`.
    pub fn new(title: impl Into<String>, tile_size: u32) -> Self {
        let tile_size = tile_size.clamp(1, MAX_TILE_SIZE);
        Self {
            meta: DocumentMeta {
                id: Uuid::new_v4().to_string(),
                title: title.into(),
            },
            tile_size,
            layers: LayersManager::new(tile_size),
            camera: Camera::default(),
            tools: ToolState::default(),
            history: HistoryManager::default(),
            gesture: None,
        }
    }

    pub fn from_config(config: &AppConfigData) -> Self {
        let mut doc = Self::new(DEFAULT_DOCUMENT_TITLE, config.default_tile_size);
        doc.history.set_max_size(config.max_history_size);
        doc
    }

    pub fn meta(&self) -> &DocumentMeta {
        &self.meta
    }

    pub fn id(&self) -> &str {
        &self.meta.id
    }

    pub fn title(&self) -> &str {
        &self.meta.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.meta.title = title.into();
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn layers(&self) -> &LayersManager {
        &self.layers
    }

    /// Direct access to the layers. Changes made here bypass history.
    pub fn layers_mut(&mut self) -> &mut LayersManager {
        &mut self.layers
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn tools(&self) -> &ToolState {
        &self.tools
    }

    pub fn tools_mut(&mut self) -> &mut ToolState {
        &mut self.tools
    }

    pub fn history(&self) -> &HistoryManager<HistoryAction> {
        &self.history
    }

    pub fn set_max_history_size(&mut self, max_size: usize) {
        self.history.set_max_size(max_size);
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: FnMut(&DocumentEvent) + 'static,
    {
        self.layers.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.layers.unsubscribe(id)
    }

    fn history_context(&self) -> HistoryContext {
        HistoryContext {
            tile_size: self.tile_size,
        }
    }

    fn record(&mut self, action: HistoryAction) {
        if action.is_noop() {
            return;
        }
        match &mut self.gesture {
            Some(gesture) => match gesture.actions.last_mut() {
                Some(last) => {
                    if let Some(rest) = last.absorb(action) {
                        gesture.actions.push(rest);
                    }
                }
                None => gesture.actions.push(action),
            },
            None => self.history.push(action),
        }
    }

    /// Make sure a layer exists and is active, without recording history.
    ///
    /// Used to give a brand new document its first layer.
    pub fn ensure_layer(&mut self) -> LayerId {
        self.layers.ensure_layer()
    }

    pub fn add_layer(&mut self) -> LayerId {
        let before = self.layers.active_layer_key().cloned();
        let (id, layer) = self.layers.add_layer();
        let model = layer.to_model();
        self.record(HistoryAction::CreateLayer {
            layer: model,
            active: ActiveChange::new(before, Some(id.clone())),
        });
        id
    }

    pub fn remove_layer(&mut self, id: &LayerId) -> Result<()> {
        let model = self.layers.require(id)?.to_model();
        let before = self.layers.active_layer_key().cloned();
        self.layers.remove_layer(id)?;
        let after = self.layers.active_layer_key().cloned();
        self.record(HistoryAction::RemoveLayer {
            layer: model,
            active: ActiveChange::new(before, after),
        });
        Ok(())
    }

    pub fn update_layer(&mut self, id: &LayerId, patch: &LayerPatch) -> Result<LayerUpdate> {
        let update = self.layers.update_layer(id, patch)?;
        self.record(HistoryAction::UpdateLayer {
            layer_id: id.clone(),
            before: update.before.clone(),
            after: update.after.clone(),
        });
        Ok(update)
    }

    pub fn move_layer(&mut self, id: &LayerId, index: usize) -> Result<LayerUpdate> {
        self.update_layer(id, &LayerPatch::index(index))
    }

    pub fn duplicate_layer(&mut self, id: &LayerId) -> Result<LayerId> {
        let before = self.layers.active_layer_key().cloned();
        let copy = self.layers.duplicate_layer(id)?;
        let model = self.layers.require(&copy)?.to_model();
        self.record(HistoryAction::CreateLayer {
            layer: model,
            active: ActiveChange::new(before, Some(copy.clone())),
        });
        Ok(copy)
    }

    pub fn set_active_layer(&mut self, id: Option<LayerId>) -> Result<()> {
        let before = self.layers.active_layer_key().cloned();
        self.layers.set_active_layer(id.clone())?;
        self.record(HistoryAction::SetActiveLayer {
            active: ActiveChange::new(before, id),
        });
        Ok(())
    }

    fn active_id(&self) -> Result<LayerId> {
        self.layers
            .active_layer_key()
            .cloned()
            .ok_or_else(|| DocumentError::PreconditionMissing("no active layer".to_string()))
    }

    /// Run a tile edit on one layer and record the touched tiles before and after
    fn edit_tiles<T>(
        &mut self,
        id: &LayerId,
        coords: Vec<TileCoord>,
        edit: impl FnOnce(&mut Layer) -> Result<T>,
    ) -> Result<T> {
        let layer = self.layers.require_mut(id)?;
        let before: Vec<_> = coords.iter().map(|c| layer.fragment(*c)).collect();
        let out = edit(layer)?;
        let after: Vec<_> = coords.iter().map(|c| layer.fragment(*c)).collect();
        self.record(HistoryAction::EditTiles {
            layer_id: id.clone(),
            before,
            after,
        });
        Ok(out)
    }

    /// Write one character on the active layer
    pub fn set_char(&mut self, x: i32, y: i32, ch: char) -> Result<()> {
        let id = self.active_id()?;
        let coords = vec![TileCoord::containing(x, y, self.tile_size)];
        self.edit_tiles(&id, coords, |layer| layer.set_char(x, y, ch).map(|_| ()))
    }

    /// Write a text block on the active layer
    pub fn set_to_region(&mut self, x: i32, y: i32, text: &str, skip_spaces: bool) -> Result<()> {
        let id = self.active_id()?;
        let (width, height) = text_block_size(text);
        let coords = self.layers.require(&id)?.tiles_spanned(x, y, width, height)?;
        self.edit_tiles(&id, coords, |layer| {
            layer.set_to_region(x, y, text, skip_spaces).map(|_| ())
        })
    }

    /// Blank a rectangle on the active layer
    pub fn clear_region(&mut self, x: i32, y: i32, width: u32, height: u32) -> Result<()> {
        let id = self.active_id()?;
        let coords = self.layers.require(&id)?.occupied_tiles_in(x, y, width, height)?;
        self.edit_tiles(&id, coords, |layer| {
            layer.clear_region(x, y, width, height).map(|_| ())
        })
    }

    /// Drop every tile of a layer. Returns how many tiles were removed.
    pub fn clear_layer(&mut self, id: &LayerId) -> Result<usize> {
        let coords = self
            .layers
            .require(id)?
            .tile_map()
            .map(|map| map.coords())
            .unwrap_or_default();
        self.edit_tiles(id, coords, |layer| Ok(layer.clear()))
    }

    /// Undo the last step. An open gesture is committed first.
    pub fn undo(&mut self) -> Result<bool> {
        self.commit_gesture();
        let ctx = self.history_context();
        self.history.undo(&mut self.layers, &ctx)
    }

    pub fn redo(&mut self) -> Result<bool> {
        self.commit_gesture();
        let ctx = self.history_context();
        self.history.redo(&mut self.layers, &ctx)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo() || self.gesture.as_ref().is_some_and(|g| !g.actions.is_empty())
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Start collecting edits into one undo step. Returns false if a gesture is already open.
    pub fn begin_gesture(&mut self) -> bool {
        if self.gesture.is_some() {
            return false;
        }
        self.gesture = Some(Gesture::default());
        true
    }

    pub fn is_gesture_active(&self) -> bool {
        self.gesture.is_some()
    }

    /// Close the open gesture and push what it collected. Returns true if anything was recorded.
    pub fn commit_gesture(&mut self) -> bool {
        let Some(gesture) = self.gesture.take() else {
            return false;
        };
        let mut actions = gesture.actions;
        let action = match actions.len() {
            0 => return false,
            1 => actions.remove(0),
            _ => HistoryAction::Batch(actions),
        };
        debug!("Committed gesture as {}", action.kind());
        self.history.push(action);
        true
    }

    /// Close the open gesture and revert everything it did
    pub fn cancel_gesture(&mut self) -> Result<bool> {
        let Some(gesture) = self.gesture.take() else {
            return Ok(false);
        };
        let ctx = self.history_context();
        for action in gesture.actions.iter().rev() {
            action.revert(&mut self.layers, &ctx)?;
        }
        debug!("Cancelled gesture of {} actions", gesture.actions.len());
        Ok(true)
    }

    pub fn serialize(&self) -> DocumentSchema {
        serializer::serialize(self)
    }

    /// Replace this document's content. Leaves it untouched if the schema is invalid.
    pub fn deserialize(&mut self, schema: DocumentSchema) -> Result<()> {
        serializer::deserialize(self, schema)
    }

    pub fn to_json(&self) -> Result<String> {
        serializer::to_json(self)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let schema = serializer::from_json(json)?;
        let mut doc = Self::new(schema.meta.title.clone(), schema.config.tile_size);
        doc.deserialize(schema)?;
        Ok(doc)
    }

    /// Serialize into `store` under `key`. Failures are logged.
    pub fn save_to(&self, store: &mut dyn DocumentStore, key: &str) {
        match self.to_json() {
            Ok(blob) => store.save(key, &blob),
            Err(e) => warn!("Failed to serialize document {}: {}", self.meta.id, e),
        }
    }

    /// Load the document stored under `key`; `None` when missing or corrupt
    pub fn load_from(store: &dyn DocumentStore, key: &str) -> Option<Self> {
        let blob = store.load(key)?;
        match Self::from_json(&blob) {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!("Discarding stored document {}: {}", key, e);
                None
            }
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::from_config(&AppConfigData::default())
    }
}
