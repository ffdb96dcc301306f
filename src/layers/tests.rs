//! Unit tests for the layers manager.

use std::cell::RefCell;
use std::rc::Rc;

use super::*;
use crate::error::DocumentError;
use crate::types::{LayerId, LayerOpts, LayerPatch};

fn manager_with(count: usize) -> (LayersManager, Vec<LayerId>) {
    let mut manager = LayersManager::new(25);
    let ids = (0..count).map(|_| manager.add_layer().0).collect();
    (manager, ids)
}

fn indices(manager: &LayersManager) -> Vec<usize> {
    manager.layers().iter().map(|l| l.index()).collect()
}

fn order(manager: &LayersManager) -> Vec<LayerId> {
    manager.layers().iter().map(|l| l.id().clone()).collect()
}

#[test]
fn test_add_layer_names_and_activates() {
    let (manager, ids) = manager_with(2);
    assert_eq!(manager.len(), 2);
    assert_eq!(manager.layers()[0].name(), "Layer 1");
    assert_eq!(manager.layers()[1].name(), "Layer 2");
    assert_eq!(manager.active_layer_key(), Some(&ids[1]));
    assert_eq!(indices(&manager), vec![0, 1]);
}

#[test]
fn test_add_layer_skips_taken_names() {
    let (mut manager, ids) = manager_with(2);
    manager.remove_layer(&ids[0]).unwrap();
    let (_, layer) = manager.add_layer();
    assert_eq!(layer.name(), "Layer 3");
}

#[test]
fn test_add_layer_emits_created_then_active() {
    let mut manager = LayersManager::new(25);
    let log = record_events(manager.hub());
    let (id, _) = manager.add_layer();

    let events = log.borrow();
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], DocumentEvent::LayerCreated { layer_id, .. } if *layer_id == id));
    assert!(matches!(
        &events[1],
        DocumentEvent::ActiveLayerChanged { previous: None, current: Some(current), .. } if *current == id
    ));
}

#[test]
fn test_remove_active_retargets_above_then_below() {
    let (mut manager, ids) = manager_with(3);
    manager.set_active_layer(Some(ids[1].clone())).unwrap();

    manager.remove_layer(&ids[1]).unwrap();
    assert_eq!(manager.active_layer_key(), Some(&ids[2]));
    assert_eq!(indices(&manager), vec![0, 1]);

    manager.remove_layer(&ids[2]).unwrap();
    assert_eq!(manager.active_layer_key(), Some(&ids[0]));

    manager.remove_layer(&ids[0]).unwrap();
    assert_eq!(manager.active_layer_key(), None);
    assert!(manager.is_empty());
}

#[test]
fn test_remove_inactive_keeps_active() {
    let (mut manager, ids) = manager_with(3);
    manager.remove_layer(&ids[0]).unwrap();
    assert_eq!(manager.active_layer_key(), Some(&ids[2]));
    assert_eq!(manager.layer(&ids[2]).unwrap().index(), 1);
}

#[test]
fn test_remove_missing_layer_is_not_found() {
    let (mut manager, _) = manager_with(1);
    let err = manager.remove_layer(&LayerId::from("ghost")).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_removed_layer_no_longer_emits() {
    let (mut manager, ids) = manager_with(1);
    let mut removed = manager.remove_layer(&ids[0]).unwrap();
    let log = record_events(manager.hub());
    removed.set_char(0, 0, 'x').unwrap();
    assert!(log.borrow().is_empty());
}

#[test]
fn test_insert_layer_at_index_renumbers() {
    let (mut manager, ids) = manager_with(2);
    let extra = Layer::new(LayerId::from("extra"), "Extra", 0, 25);
    manager.insert_layer_at_index(1, extra).unwrap();

    assert_eq!(
        order(&manager),
        vec![ids[0].clone(), LayerId::from("extra"), ids[1].clone()]
    );
    assert_eq!(indices(&manager), vec![0, 1, 2]);
}

#[test]
fn test_insert_layer_clamps_index() {
    let (mut manager, _) = manager_with(1);
    let extra = Layer::new(LayerId::from("extra"), "Extra", 40, 25);
    manager.insert_layer(extra).unwrap();
    assert_eq!(manager.layer(&LayerId::from("extra")).unwrap().index(), 1);
}

#[test]
fn test_insert_duplicate_id_is_rejected() {
    let (mut manager, ids) = manager_with(1);
    let copy = Layer::new(ids[0].clone(), "Again", 0, 25);
    let err = manager.insert_layer(copy).unwrap_err();
    assert!(matches!(err, DocumentError::AlreadyExists { .. }));
    assert_eq!(manager.len(), 1);
}

#[test]
fn test_inserted_layer_routes_tile_events() {
    let (mut manager, _) = manager_with(1);
    manager
        .insert_layer(Layer::new(LayerId::from("extra"), "Extra", 1, 25))
        .unwrap();
    let log = record_events(manager.hub());

    manager
        .layer_mut(&LayerId::from("extra"))
        .unwrap()
        .set_char(3, 3, 'q')
        .unwrap();
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn test_update_layer_reports_before_after() {
    let (mut manager, ids) = manager_with(1);
    let update = manager
        .update_layer(&ids[0], &LayerPatch::name("Ink"))
        .unwrap();
    assert_eq!(update.before.name, "Layer 1");
    assert_eq!(update.after.name, "Ink");
    assert_eq!(manager.layer(&ids[0]).unwrap().name(), "Ink");
}

#[test]
fn test_update_layer_silent_tags_history() {
    let (mut manager, ids) = manager_with(1);
    let log = record_events(manager.hub());
    manager
        .update_layer_silent(
            &ids[0],
            &LayerPatch::opts(LayerOpts {
                visible: false,
                locked: false,
            }),
        )
        .unwrap();

    let events = log.borrow();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].meta(), EventMeta::history());
}

#[test]
fn test_noop_update_emits_nothing() {
    let (mut manager, ids) = manager_with(1);
    let log = record_events(manager.hub());
    let update = manager
        .update_layer(&ids[0], &LayerPatch::name("Layer 1"))
        .unwrap();
    assert!(update.is_noop());
    assert!(log.borrow().is_empty());
}

#[test]
fn test_move_layer_shifts_siblings() {
    let (mut manager, ids) = manager_with(3);
    let update = manager.move_layer(&ids[0], 2).unwrap();

    assert_eq!(update.before.index, 0);
    assert_eq!(update.after.index, 2);
    assert_eq!(
        order(&manager),
        vec![ids[1].clone(), ids[2].clone(), ids[0].clone()]
    );
    assert_eq!(indices(&manager), vec![0, 1, 2]);
}

#[test]
fn test_move_layer_past_end_clamps() {
    let (mut manager, ids) = manager_with(2);
    let update = manager.move_layer(&ids[0], 9).unwrap();
    assert_eq!(update.after.index, 1);
    assert_eq!(indices(&manager), vec![0, 1]);
}

#[test]
fn test_direct_layer_update_keeps_indices_contiguous() {
    let (mut manager, ids) = manager_with(3);
    let update = manager
        .layer_mut(&ids[0])
        .unwrap()
        .update(&LayerPatch::index(2));

    assert_eq!(update.after.index, 0);
    assert_eq!(indices(&manager), vec![0, 1, 2]);
    assert_eq!(order(&manager), ids);

    // Moving still works through the manager
    manager.update_layer(&ids[0], &LayerPatch::index(2)).unwrap();
    assert_eq!(indices(&manager), vec![0, 1, 2]);
    assert_eq!(order(&manager), vec![ids[1].clone(), ids[2].clone(), ids[0].clone()]);
}

#[test]
fn test_duplicate_layer_copies_content() {
    let (mut manager, ids) = manager_with(2);
    manager
        .layer_mut(&ids[0])
        .unwrap()
        .set_to_region(0, 0, "hello", false)
        .unwrap();

    let copy = manager.duplicate_layer(&ids[0]).unwrap();
    let layer = manager.layer(&copy).unwrap();

    assert!(copy.as_str().starts_with(ids[0].as_str()));
    assert_eq!(layer.name(), "Layer 1 (Copy)");
    assert_eq!(layer.index(), 2);
    assert_eq!(layer.read_region(0, 0, 5, 1), "hello");
    assert_eq!(manager.active_layer_key(), Some(&copy));
}

#[test]
fn test_set_active_layer_validates() {
    let (mut manager, ids) = manager_with(2);
    manager.set_active_layer(Some(ids[0].clone())).unwrap();
    assert_eq!(manager.active_layer().unwrap().id(), &ids[0]);

    let err = manager
        .set_active_layer(Some(LayerId::from("ghost")))
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(manager.active_layer_key(), Some(&ids[0]));

    manager.set_active_layer(None).unwrap();
    assert!(manager.active_layer().is_none());
}

#[test]
fn test_set_same_active_layer_is_silent() {
    let (mut manager, ids) = manager_with(1);
    let log = record_events(manager.hub());
    manager.set_active_layer(Some(ids[0].clone())).unwrap();
    assert!(log.borrow().is_empty());
}

#[test]
fn test_layer_composition_groups_by_parent() {
    let (mut manager, ids) = manager_with(4);
    manager
        .update_layer(&ids[1], &LayerPatch::parent(Some(ids[0].clone())))
        .unwrap();
    manager
        .update_layer(&ids[3], &LayerPatch::parent(Some(ids[0].clone())))
        .unwrap();

    let from_root: Vec<_> = manager
        .layer_composition(&ids[0])
        .unwrap()
        .iter()
        .map(|l| l.id().clone())
        .collect();
    assert_eq!(from_root, vec![ids[0].clone(), ids[1].clone(), ids[3].clone()]);

    let from_child: Vec<_> = manager
        .layer_composition(&ids[3])
        .unwrap()
        .iter()
        .map(|l| l.id().clone())
        .collect();
    assert_eq!(from_child, from_root);

    let alone = manager.layer_composition(&ids[2]).unwrap();
    assert_eq!(alone.len(), 1);
}

#[test]
fn test_composition_survives_removed_root() {
    let (mut manager, ids) = manager_with(3);
    for child in &ids[1..] {
        manager
            .update_layer(child, &LayerPatch::parent(Some(ids[0].clone())))
            .unwrap();
    }
    manager.remove_layer(&ids[0]).unwrap();

    let group = manager.layer_composition(&ids[1]).unwrap();
    assert_eq!(group.len(), 2);
}

#[test]
fn test_combined_tile_data_higher_index_wins() {
    let mut manager = LayersManager::new(2);
    let (bottom, _) = manager.add_layer();
    let (top, _) = manager.add_layer();
    manager
        .layer_mut(&bottom)
        .unwrap()
        .set_to_region(0, 0, "ab\ncd", false)
        .unwrap();
    manager.layer_mut(&top).unwrap().set_char(1, 0, 'X').unwrap();

    assert_eq!(manager.combined_tile_data(0, 0), "aXcd");
    assert_eq!(manager.combined_tile_data(5, 5), "    ");
}

#[test]
fn test_hidden_layers_are_not_composited() {
    let (mut manager, ids) = manager_with(2);
    manager.layer_mut(&ids[1]).unwrap().set_char(0, 0, 'h').unwrap();
    manager
        .update_layer(
            &ids[1],
            &LayerPatch::opts(LayerOpts {
                visible: false,
                locked: false,
            }),
        )
        .unwrap();

    assert_eq!(manager.all_visible_layers_sorted().len(), 1);
    assert_eq!(manager.read_combined_region(0, 0, 2, 1), "  ");
}

#[test]
fn test_read_combined_region_across_layers() {
    let (mut manager, ids) = manager_with(2);
    manager
        .layer_mut(&ids[0])
        .unwrap()
        .set_to_region(24, 0, "abc", false)
        .unwrap();
    manager
        .layer_mut(&ids[1])
        .unwrap()
        .set_to_region(25, 1, "Z", false)
        .unwrap();

    assert_eq!(manager.read_combined_region(24, 0, 3, 2), "abc\n Z ");
    assert_eq!(manager.occupied_bounds(), Some((0, 0, 50, 25)));
}

#[test]
fn test_clear_layers_resets_active() {
    let (mut manager, _) = manager_with(3);
    let log = record_events(manager.hub());
    manager.clear_layers();

    assert!(manager.is_empty());
    assert_eq!(manager.active_layer_key(), None);
    let removed = log
        .borrow()
        .iter()
        .filter(|e| matches!(e, DocumentEvent::LayerRemoved { .. }))
        .count();
    assert_eq!(removed, 3);
}

#[test]
fn test_ensure_layer() {
    let mut manager = LayersManager::new(25);
    let first = manager.ensure_layer();
    assert_eq!(manager.len(), 1);
    assert_eq!(manager.ensure_layer(), first);

    manager.set_active_layer(None).unwrap();
    assert_eq!(manager.ensure_layer(), first);
    assert_eq!(manager.active_layer_key(), Some(&first));
}

#[test]
fn test_temp_layers_stay_out_of_the_stack() {
    let (mut manager, _) = manager_with(1);
    let temp = manager.add_temp_layer("preview");
    manager
        .temp_layer_mut(&temp)
        .unwrap()
        .set_char(0, 0, '*')
        .unwrap();

    assert_eq!(manager.len(), 1);
    assert_eq!(manager.models().len(), 1);
    assert_eq!(manager.temp_layers().count(), 1);
    assert_eq!(manager.read_combined_region(0, 0, 1, 1), " ");
    assert!(manager.layer(&temp).is_none());

    manager.remove_temp_layer(&temp).unwrap();
    assert!(manager.temp_layer(&temp).is_none());
    assert!(manager.remove_temp_layer(&temp).unwrap_err().is_not_found());
}

#[test]
fn test_temp_layer_events_stay_off_the_document_hub() {
    let (mut manager, ids) = manager_with(1);
    let document_log = record_events(manager.hub());
    let preview_log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&preview_log);
    manager.subscribe_temp(move |event| sink.borrow_mut().push(event.clone()));

    let temp = manager.add_temp_layer("preview");
    let layer = manager.temp_layer_mut(&temp).unwrap();
    layer.set_char(0, 0, '*').unwrap();
    layer.set_char(0, 0, ' ').unwrap();
    assert!(document_log.borrow().is_empty());
    assert_eq!(preview_log.borrow().len(), 2);
    assert!(
        preview_log
            .borrow()
            .iter()
            .all(|e| e.layer_id() == Some(&temp))
    );

    manager.layer_mut(&ids[0]).unwrap().set_char(0, 0, 'x').unwrap();
    assert_eq!(document_log.borrow().len(), 1);
    assert_eq!(preview_log.borrow().len(), 2);
}

#[test]
fn test_unsubscribe_stops_manager_events() {
    let (mut manager, _) = manager_with(1);
    let log = std::rc::Rc::new(std::cell::RefCell::new(0));
    let sink = std::rc::Rc::clone(&log);
    let id = manager.subscribe(move |_| *sink.borrow_mut() += 1);

    manager.add_layer();
    assert!(manager.unsubscribe(id));
    manager.add_layer();

    assert_eq!(*log.borrow(), 2);
}
