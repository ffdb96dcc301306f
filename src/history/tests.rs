//! Unit tests for the history module.

use super::*;
use crate::constants::MAX_HISTORY_SIZE;
use crate::error::{DocumentError, Result};
use crate::layers::{ChangeReason, DocumentEvent, LayersManager, record_events, text_block_size};
use crate::types::{LayerId, LayerPatch};

const CTX: HistoryContext = HistoryContext { tile_size: 4 };

/// Minimal command for exercising the stacks without a document
#[derive(Debug, Clone, PartialEq)]
struct Add(i32);

impl Reversible for Add {
    type Target = i32;
    type Context = ();

    fn apply(&self, target: &mut i32, _: &()) -> Result<()> {
        *target += self.0;
        Ok(())
    }

    fn revert(&self, target: &mut i32, _: &()) -> Result<()> {
        if *target - self.0 < 0 {
            return Err(DocumentError::PreconditionMissing("negative".into()));
        }
        *target -= self.0;
        Ok(())
    }
}

fn write(layers: &mut LayersManager, id: &LayerId, x: i32, y: i32, text: &str) -> HistoryAction {
    let layer = layers.require_mut(id).unwrap();
    let (w, h) = text_block_size(text);
    let coords = layer.tiles_spanned(x, y, w, h).unwrap();
    let before = coords.iter().map(|c| layer.fragment(*c)).collect();
    layer.set_to_region(x, y, text, false).unwrap();
    let after = coords.iter().map(|c| layer.fragment(*c)).collect();
    HistoryAction::EditTiles {
        layer_id: id.clone(),
        before,
        after,
    }
}

fn create(layers: &mut LayersManager) -> HistoryAction {
    let before = layers.active_layer_key().cloned();
    let (id, _) = layers.add_layer();
    HistoryAction::CreateLayer {
        layer: layers.require(&id).unwrap().to_model(),
        active: ActiveChange::new(before, Some(id)),
    }
}

#[test]
fn test_command_history_push() {
    let mut history = HistoryManager::<Add>::default();
    assert!(!history.can_undo());

    history.push(Add(1));
    assert!(history.can_undo());
    assert_eq!(history.undo_count(), 1);
    assert_eq!(history.peek_undo(), Some(&Add(1)));
}

#[test]
fn test_command_history_push_clears_redo() {
    let mut history = HistoryManager::default();
    let mut total = 0;
    history.push(Add(1));
    history.push(Add(2));
    total += 3;

    assert!(history.undo(&mut total, &()).unwrap());
    assert_eq!(total, 1);
    assert!(history.can_redo());

    history.push(Add(5));
    assert!(!history.can_redo());
}

#[test]
fn test_command_history_max_size() {
    let mut history = HistoryManager::default();
    for i in 0..150 {
        history.push(Add(i));
    }
    assert_eq!(history.undo_count(), MAX_HISTORY_SIZE);
    // The oldest entries are the ones dropped
    assert_eq!(history.peek_undo(), Some(&Add(149)));

    history.set_max_size(10);
    assert_eq!(history.undo_count(), 10);
}

#[test]
fn test_undo_redo_on_empty_stacks() {
    let mut history = HistoryManager::<Add>::new(5);
    let mut total = 0;
    assert!(!history.undo(&mut total, &()).unwrap());
    assert!(!history.redo(&mut total, &()).unwrap());
}

#[test]
fn test_failed_undo_keeps_command() {
    let mut history = HistoryManager::new(5);
    history.push(Add(10));
    let mut total = 3;

    assert!(history.undo(&mut total, &()).is_err());
    assert_eq!(total, 3);
    assert_eq!(history.undo_count(), 1);
    assert_eq!(history.redo_count(), 0);
}

#[test]
fn test_create_layer_undo_redo() {
    let mut layers = LayersManager::new(4);
    let first = layers.add_layer().0;
    let action = create(&mut layers);
    let HistoryAction::CreateLayer { layer, .. } = &action else {
        unreachable!();
    };
    let created = layer.id.clone();

    action.revert(&mut layers, &CTX).unwrap();
    assert!(layers.layer(&created).is_none());
    assert_eq!(layers.active_layer_key(), Some(&first));

    action.apply(&mut layers, &CTX).unwrap();
    assert_eq!(layers.require(&created).unwrap().index(), 1);
    assert_eq!(layers.active_layer_key(), Some(&created));
}

#[test]
fn test_remove_layer_revert_restores_content_and_index() {
    let mut layers = LayersManager::new(4);
    let ids: Vec<_> = (0..3).map(|_| layers.add_layer().0).collect();
    write(&mut layers, &ids[1], 2, 2, "ink");
    layers.set_active_layer(Some(ids[1].clone())).unwrap();

    let model = layers.require(&ids[1]).unwrap().to_model();
    layers.remove_layer(&ids[1]).unwrap();
    let action = HistoryAction::RemoveLayer {
        layer: model,
        active: ActiveChange::new(Some(ids[1].clone()), layers.active_layer_key().cloned()),
    };

    action.revert(&mut layers, &CTX).unwrap();
    let restored = layers.require(&ids[1]).unwrap();
    assert_eq!(restored.index(), 1);
    assert_eq!(restored.read_region(2, 2, 3, 1), "ink");
    assert_eq!(layers.active_layer_key(), Some(&ids[1]));
}

#[test]
fn test_restore_rejects_foreign_tile_size() {
    let mut layers = LayersManager::new(4);
    let action = create(&mut layers);
    let other = HistoryContext { tile_size: 8 };

    action.revert(&mut layers, &CTX).unwrap();
    let err = action.apply(&mut layers, &other).unwrap_err();
    assert!(matches!(err, DocumentError::SchemaInvalid(_)));
}

#[test]
fn test_update_layer_round_trip() {
    let mut layers = LayersManager::new(4);
    let ids: Vec<_> = (0..3).map(|_| layers.add_layer().0).collect();
    let patch = LayerPatch {
        name: Some("Top".into()),
        index: Some(2),
        ..Default::default()
    };
    let update = layers.update_layer(&ids[0], &patch).unwrap();
    let action = HistoryAction::UpdateLayer {
        layer_id: ids[0].clone(),
        before: update.before,
        after: update.after,
    };

    action.revert(&mut layers, &CTX).unwrap();
    let layer = layers.require(&ids[0]).unwrap();
    assert_eq!(layer.name(), "Layer 1");
    assert_eq!(layer.index(), 0);

    action.apply(&mut layers, &CTX).unwrap();
    let layer = layers.require(&ids[0]).unwrap();
    assert_eq!(layer.name(), "Top");
    assert_eq!(layer.index(), 2);
}

#[test]
fn test_edit_tiles_revert_deletes_new_tiles() {
    let mut layers = LayersManager::new(4);
    let id = layers.add_layer().0;
    let action = write(&mut layers, &id, 3, 0, "ab");

    action.revert(&mut layers, &CTX).unwrap();
    let layer = layers.require(&id).unwrap();
    assert!(layer.is_empty());
    assert_eq!(layer.tile_map().unwrap().len(), 0);

    action.apply(&mut layers, &CTX).unwrap();
    assert_eq!(layers.require(&id).unwrap().read_region(3, 0, 2, 1), "ab");
}

#[test]
fn test_replays_are_tagged_history() {
    let mut layers = LayersManager::new(4);
    let action = create(&mut layers);
    let log = record_events(layers.hub());

    action.revert(&mut layers, &CTX).unwrap();
    let events = log.borrow();
    assert!(!events.is_empty());
    assert!(
        events
            .iter()
            .all(|e| e.meta().reason == Some(ChangeReason::History))
    );
    assert!(matches!(events[0], DocumentEvent::LayerRemoved { .. }));
}

#[test]
fn test_undo_all_redo_all_through_manager() {
    let mut layers = LayersManager::new(4);
    let mut history = HistoryManager::default();

    history.push(create(&mut layers));
    let id = layers.active_layer_key().cloned().unwrap();
    history.push(write(&mut layers, &id, 0, 0, "hello\nworld"));
    history.push(write(&mut layers, &id, 2, 1, "  "));
    let update = layers.update_layer(&id, &LayerPatch::name("Sketch")).unwrap();
    history.push(HistoryAction::UpdateLayer {
        layer_id: id.clone(),
        before: update.before,
        after: update.after,
    });
    let final_models = layers.models();

    while history.undo(&mut layers, &CTX).unwrap() {}
    assert!(layers.is_empty());
    assert_eq!(layers.active_layer_key(), None);

    while history.redo(&mut layers, &CTX).unwrap() {}
    assert_eq!(layers.models(), final_models);
    assert_eq!(layers.require(&id).unwrap().read_region(0, 0, 5, 2), "hello\nwo  d");
}

#[test]
fn test_action_noop_detection() {
    let same = ActiveChange::new(None, None);
    assert!(HistoryAction::SetActiveLayer { active: same }.is_noop());
    assert_eq!(
        HistoryAction::EditTiles {
            layer_id: LayerId::from("a"),
            before: vec![],
            after: vec![],
        }
        .kind(),
        "edit_tiles"
    );
}
