//! Apply and revert handlers for each history action kind.

use tracing::debug;

use crate::error::{DocumentError, Result};
use crate::layers::{EventMeta, Layer, LayersManager};
use crate::types::{LayerAttributes, LayerId, LayerModel, TileFragment};

use super::commands::{HistoryAction, HistoryContext, Reversible};

impl Reversible for HistoryAction {
    type Target = LayersManager;
    type Context = HistoryContext;

    fn apply(&self, layers: &mut LayersManager, ctx: &HistoryContext) -> Result<()> {
        debug!("Redo {}", self.kind());
        match self {
            HistoryAction::CreateLayer { layer, active } => {
                restore_layer(layers, layer, ctx)?;
                activate(layers, active.after.clone())
            }
            HistoryAction::RemoveLayer { layer, active } => {
                layers.remove_layer_with(&layer.id, EventMeta::history())?;
                activate(layers, active.after.clone())
            }
            HistoryAction::UpdateLayer { layer_id, after, .. } => {
                set_attributes(layers, layer_id, after)
            }
            HistoryAction::EditTiles { layer_id, after, .. } => {
                restore_tiles(layers, layer_id, after)
            }
            HistoryAction::SetActiveLayer { active } => activate(layers, active.after.clone()),
            HistoryAction::Batch(actions) => {
                for action in actions {
                    action.apply(layers, ctx)?;
                }
                Ok(())
            }
        }
    }

    fn revert(&self, layers: &mut LayersManager, ctx: &HistoryContext) -> Result<()> {
        debug!("Undo {}", self.kind());
        match self {
            HistoryAction::CreateLayer { layer, active } => {
                layers.remove_layer_with(&layer.id, EventMeta::history())?;
                activate(layers, active.before.clone())
            }
            HistoryAction::RemoveLayer { layer, active } => {
                restore_layer(layers, layer, ctx)?;
                activate(layers, active.before.clone())
            }
            HistoryAction::UpdateLayer {
                layer_id, before, ..
            } => set_attributes(layers, layer_id, before),
            HistoryAction::EditTiles {
                layer_id, before, ..
            } => restore_tiles(layers, layer_id, before),
            HistoryAction::SetActiveLayer { active } => activate(layers, active.before.clone()),
            HistoryAction::Batch(actions) => {
                for action in actions.iter().rev() {
                    action.revert(layers, ctx)?;
                }
                Ok(())
            }
        }
    }
}

/// Rebuild a layer from its captured model and put it back at its index
fn restore_layer(layers: &mut LayersManager, model: &LayerModel, ctx: &HistoryContext) -> Result<()> {
    if let Some(map) = &model.tile_map
        && map.tile_size != ctx.tile_size
    {
        return Err(DocumentError::SchemaInvalid(format!(
            "layer {} has tile size {}, document uses {}",
            model.id, map.tile_size, ctx.tile_size
        )));
    }
    let layer = Layer::from_model(model)?;
    layers.insert_layer_with(model.index, layer, EventMeta::history())
}

fn activate(layers: &mut LayersManager, id: Option<LayerId>) -> Result<()> {
    layers.set_active_layer_with(id, EventMeta::history())
}

fn set_attributes(layers: &mut LayersManager, id: &LayerId, attributes: &LayerAttributes) -> Result<()> {
    layers.update_layer_silent(id, &attributes.to_patch())?;
    Ok(())
}

fn restore_tiles(layers: &mut LayersManager, id: &LayerId, fragments: &[TileFragment]) -> Result<()> {
    let layer = layers.require_mut(id)?;
    for fragment in fragments {
        layer.replace_tile(fragment.coord, fragment.data.as_deref())?;
    }
    Ok(())
}
