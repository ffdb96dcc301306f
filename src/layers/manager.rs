use std::collections::BTreeMap;

use tracing::debug;

use crate::constants::EMPTY_CHAR;
use crate::error::{DocumentError, EntityKind, Result};
use crate::types::{LayerId, LayerModel, LayerPatch, LayerUpdate};

use super::events::{DocumentEvent, EventHub, EventMeta, SubscriptionId};
use super::layer::{Layer, clip_rect};

/// Ordered collection of layers with active-layer tracking.
///
/// Layers are kept sorted by index and every structural change renumbers them
/// so indices stay a contiguous `0..len` run. The active key, when set, always
/// names a layer in the collection. Temp layers live beside the ordered set:
/// they carry no index, never reach history or serialization, and report
/// through their own hub (see [`LayersManager::subscribe_temp`]).
#[derive(Debug)]
pub struct LayersManager {
    tile_size: u32,
    layers: Vec<Layer>,
    active: Option<LayerId>,
    temp_layers: BTreeMap<LayerId, Layer>,
    hub: EventHub,
    temp_hub: EventHub,
}

impl LayersManager {
    pub fn new(tile_size: u32) -> Self {
        Self {
            tile_size,
            layers: Vec::new(),
            active: None,
            temp_layers: BTreeMap::new(),
            hub: EventHub::new(),
            temp_hub: EventHub::new(),
        }
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub(crate) fn set_tile_size(&mut self, tile_size: u32) {
        self.tile_size = tile_size;
    }

    pub fn hub(&self) -> &EventHub {
        &self.hub
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: FnMut(&DocumentEvent) + 'static,
    {
        self.hub.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.hub.unsubscribe(id)
    }

    /// Listen to tile events from temp layers only. Document subscribers
    /// never see them.
    pub fn subscribe_temp<F>(&self, listener: F) -> SubscriptionId
    where
        F: FnMut(&DocumentEvent) + 'static,
    {
        self.temp_hub.subscribe(listener)
    }

    pub fn unsubscribe_temp(&self, id: SubscriptionId) -> bool {
        self.temp_hub.unsubscribe(id)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn contains(&self, id: &LayerId) -> bool {
        self.position(id).is_some()
    }

    /// Layers in ascending index order
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, id: &LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id() == id)
    }

    pub fn layer_mut(&mut self, id: &LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id() == id)
    }

    pub fn require(&self, id: &LayerId) -> Result<&Layer> {
        self.layer(id).ok_or_else(|| DocumentError::layer_not_found(id))
    }

    pub fn require_mut(&mut self, id: &LayerId) -> Result<&mut Layer> {
        self.layers
            .iter_mut()
            .find(|l| l.id() == id)
            .ok_or_else(|| DocumentError::layer_not_found(id))
    }

    fn position(&self, id: &LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id() == id)
    }

    fn reindex(&mut self) {
        for (index, layer) in self.layers.iter_mut().enumerate() {
            layer.update_index(index);
        }
    }

    fn next_layer_name(&self) -> String {
        let mut n = self.layers.len() + 1;
        loop {
            let candidate = format!("Layer {}", n);
            if !self.layers.iter().any(|l| l.name() == candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Create a layer on top of the stack and make it active
    pub fn add_layer(&mut self) -> (LayerId, &mut Layer) {
        let id = LayerId::new();
        let mut layer = Layer::new(id.clone(), self.next_layer_name(), self.layers.len(), self.tile_size);
        layer.attach(self.hub.clone());
        debug!("Created layer {} ({})", id, layer.name());
        self.layers.push(layer);

        let meta = EventMeta::default();
        self.hub.emit(DocumentEvent::LayerCreated {
            layer_id: id.clone(),
            meta,
        });
        self.switch_active(Some(id.clone()), meta);

        let last = self.layers.len() - 1;
        (id, &mut self.layers[last])
    }

    /// Reinstate a layer at the index it carries
    pub fn insert_layer(&mut self, layer: Layer) -> Result<()> {
        let index = layer.index();
        self.insert_layer_with(index, layer, EventMeta::default())
    }

    pub fn insert_layer_at_index(&mut self, index: usize, layer: Layer) -> Result<()> {
        self.insert_layer_with(index, layer, EventMeta::default())
    }

    /// Insert a layer at `index` (clamped to the stack) and renumber siblings
    pub fn insert_layer_with(&mut self, index: usize, mut layer: Layer, meta: EventMeta) -> Result<()> {
        if self.contains(layer.id()) || self.temp_layers.contains_key(layer.id()) {
            return Err(DocumentError::AlreadyExists {
                kind: EntityKind::Layer,
                id: layer.id().to_string(),
            });
        }
        layer.attach(self.hub.clone());
        let id = layer.id().clone();
        let index = index.min(self.layers.len());
        self.layers.insert(index, layer);
        self.reindex();

        debug!("Inserted layer {} at index {}", id, index);
        self.hub.emit(DocumentEvent::LayerCreated { layer_id: id, meta });
        Ok(())
    }

    pub fn remove_layer(&mut self, id: &LayerId) -> Result<Layer> {
        self.remove_layer_with(id, EventMeta::default())
    }

    /// Remove a layer. If it was active, the neighbour above takes over,
    /// else the one below, else nothing is active.
    pub fn remove_layer_with(&mut self, id: &LayerId, meta: EventMeta) -> Result<Layer> {
        let pos = self
            .position(id)
            .ok_or_else(|| DocumentError::layer_not_found(id))?;
        let mut layer = self.layers.remove(pos);
        layer.attach(EventHub::new());
        self.reindex();

        debug!("Removed layer {} from index {}", id, pos);
        self.hub.emit(DocumentEvent::LayerRemoved {
            layer_id: id.clone(),
            meta,
        });

        if self.active.as_ref() == Some(id) {
            let next = self
                .layers
                .get(pos)
                .or_else(|| pos.checked_sub(1).and_then(|below| self.layers.get(below)))
                .map(|l| l.id().clone());
            self.switch_active(next, meta);
        }
        Ok(layer)
    }

    pub fn update_layer(&mut self, id: &LayerId, patch: &LayerPatch) -> Result<LayerUpdate> {
        self.apply_update(id, patch, EventMeta::default())
    }

    /// Same as [`LayersManager::update_layer`] but tagged as a history replay,
    /// so listeners that keep their own history do not record it again
    pub fn update_layer_silent(&mut self, id: &LayerId, patch: &LayerPatch) -> Result<LayerUpdate> {
        self.apply_update(id, patch, EventMeta::history())
    }

    fn apply_update(&mut self, id: &LayerId, patch: &LayerPatch, meta: EventMeta) -> Result<LayerUpdate> {
        let pos = self
            .position(id)
            .ok_or_else(|| DocumentError::layer_not_found(id))?;
        let before = self.layers[pos].attributes();
        self.layers[pos].update(patch);

        if let Some(target) = patch.index {
            let target = target.min(self.layers.len() - 1);
            let layer = self.layers.remove(pos);
            self.layers.insert(target, layer);
            self.reindex();
        }

        let after = self.require(id)?.attributes();
        let update = LayerUpdate { before, after };
        if !update.is_noop() {
            self.hub.emit(DocumentEvent::LayerUpdated {
                layer_id: id.clone(),
                update: update.clone(),
                meta,
            });
        }
        Ok(update)
    }

    /// Move a layer to a new index, shifting the layers in between
    pub fn move_layer(&mut self, id: &LayerId, index: usize) -> Result<LayerUpdate> {
        self.update_layer(id, &LayerPatch::index(index))
    }

    /// Copy a layer's full content under a derived id and a "(Copy)" name,
    /// append it on top and make it active
    pub fn duplicate_layer(&mut self, id: &LayerId) -> Result<LayerId> {
        let mut model = self.require(id)?.to_model();
        model.id = id.derived();
        model.name = format!("{} (Copy)", model.name);
        model.index = self.layers.len();

        let copy = Layer::from_model(&model)?;
        let new_id = model.id.clone();
        self.insert_layer_at_index(model.index, copy)?;
        self.switch_active(Some(new_id.clone()), EventMeta::default());
        Ok(new_id)
    }

    pub fn set_active_layer(&mut self, id: Option<LayerId>) -> Result<()> {
        self.set_active_layer_with(id, EventMeta::default())
    }

    pub fn set_active_layer_with(&mut self, id: Option<LayerId>, meta: EventMeta) -> Result<()> {
        if let Some(id) = &id
            && !self.contains(id)
        {
            return Err(DocumentError::layer_not_found(id));
        }
        self.switch_active(id, meta);
        Ok(())
    }

    fn switch_active(&mut self, id: Option<LayerId>, meta: EventMeta) {
        if self.active == id {
            return;
        }
        let previous = std::mem::replace(&mut self.active, id.clone());
        self.hub.emit(DocumentEvent::ActiveLayerChanged {
            previous,
            current: id,
            meta,
        });
    }

    pub fn active_layer_key(&self) -> Option<&LayerId> {
        self.active.as_ref()
    }

    pub fn active_layer(&self) -> Option<&Layer> {
        self.active.as_ref().and_then(|id| self.layer(id))
    }

    pub fn active_layer_mut(&mut self) -> Option<&mut Layer> {
        let id = self.active.clone()?;
        self.layer_mut(&id)
    }

    /// The working set a layer belongs to, ascending by index.
    ///
    /// A layer's group root is its `parent` when set, otherwise the layer
    /// itself. The composition is the root plus every layer whose parent is
    /// the root. A removed root still groups the children that name it.
    pub fn layer_composition(&self, id: &LayerId) -> Result<Vec<&Layer>> {
        let layer = self.require(id)?;
        let root = layer.parent().unwrap_or(layer.id()).clone();
        Ok(self
            .layers
            .iter()
            .filter(|l| l.id() == &root || l.parent() == Some(&root))
            .collect())
    }

    /// Composition of the active layer, empty when nothing is active
    pub fn active_composition(&self) -> Vec<&Layer> {
        self.active
            .as_ref()
            .and_then(|id| self.layer_composition(id).ok())
            .unwrap_or_default()
    }

    /// Visible layers in ascending index order
    pub fn all_visible_layers_sorted(&self) -> Vec<&Layer> {
        self.layers.iter().filter(|l| l.is_visible()).collect()
    }

    /// Composite of every visible layer's tile at one tile coordinate.
    ///
    /// Higher-index layers sit on top; spaces are transparent.
    pub fn combined_tile_data(&self, tile_x: i32, tile_y: i32) -> String {
        let size = self.tile_size as usize;
        let mut cells = vec![EMPTY_CHAR; size * size];
        for layer in self.all_visible_layers_sorted() {
            let Some(tile) = layer.tile_map().and_then(|m| m.get_tile(tile_x, tile_y)) else {
                continue;
            };
            for (cell, ch) in cells.iter_mut().zip(tile.data().chars()) {
                if ch != EMPTY_CHAR {
                    *cell = ch;
                }
            }
        }
        cells.into_iter().collect()
    }

    /// Composite of every visible layer over a world rectangle
    pub fn read_combined_region(&self, x: i32, y: i32, width: u32, height: u32) -> String {
        let mut rows: Vec<Vec<char>> = vec![vec![EMPTY_CHAR; width as usize]; height as usize];
        for layer in self.all_visible_layers_sorted() {
            let block = layer.read_region(x, y, width, height);
            for (row, line) in rows.iter_mut().zip(block.split('\n')) {
                for (cell, ch) in row.iter_mut().zip(line.chars()) {
                    if ch != EMPTY_CHAR {
                        *cell = ch;
                    }
                }
            }
        }
        rows.iter()
            .map(|row| row.iter().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// World rectangle covering everything drawn on visible layers
    pub fn occupied_bounds(&self) -> Option<(i32, i32, u32, u32)> {
        self.all_visible_layers_sorted()
            .into_iter()
            .filter_map(Layer::occupied_bounds)
            .map(|(x, y, w, h)| {
                let (x, y) = (x as i64, y as i64);
                (x, y, x + w as i64, y + h as i64)
            })
            .reduce(|a, b| (a.0.min(b.0), a.1.min(b.1), a.2.max(b.2), a.3.max(b.3)))
            .map(|(x0, y0, x1, y1)| clip_rect(x0, y0, x1, y1))
    }

    pub fn clear_layers(&mut self) {
        self.clear_layers_with(EventMeta::default());
    }

    pub fn clear_layers_with(&mut self, meta: EventMeta) {
        let removed: Vec<Layer> = self.layers.drain(..).collect();
        for mut layer in removed {
            layer.attach(EventHub::new());
            self.hub.emit(DocumentEvent::LayerRemoved {
                layer_id: layer.id().clone(),
                meta,
            });
        }
        self.switch_active(None, meta);
    }

    /// Guarantee at least one layer exists and one is active; returns the active id
    pub fn ensure_layer(&mut self) -> LayerId {
        if self.layers.is_empty() {
            return self.add_layer().0;
        }
        if let Some(active) = self.active.clone() {
            return active;
        }
        let top = self.layers[self.layers.len() - 1].id().clone();
        self.switch_active(Some(top.clone()), EventMeta::default());
        top
    }

    /// Serializable models in index order
    pub fn models(&self) -> Vec<LayerModel> {
        self.layers.iter().map(Layer::to_model).collect()
    }

    /// Create a scratch layer for transient overlays such as stroke previews
    pub fn add_temp_layer(&mut self, name: impl Into<String>) -> LayerId {
        let id = LayerId::new();
        let mut layer = Layer::new(id.clone(), name, 0, self.tile_size);
        layer.attach(self.temp_hub.clone());
        self.temp_layers.insert(id.clone(), layer);
        id
    }

    pub fn temp_layer(&self, id: &LayerId) -> Option<&Layer> {
        self.temp_layers.get(id)
    }

    pub fn temp_layer_mut(&mut self, id: &LayerId) -> Option<&mut Layer> {
        self.temp_layers.get_mut(id)
    }

    pub fn temp_layers(&self) -> impl Iterator<Item = &Layer> {
        self.temp_layers.values()
    }

    pub fn remove_temp_layer(&mut self, id: &LayerId) -> Result<Layer> {
        let mut layer = self
            .temp_layers
            .remove(id)
            .ok_or_else(|| DocumentError::layer_not_found(id))?;
        layer.attach(EventHub::new());
        Ok(layer)
    }

    pub fn clear_temp_layers(&mut self) {
        self.temp_layers.clear();
    }
}
