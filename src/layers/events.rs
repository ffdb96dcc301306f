//! Change events and the observer hub that fans them out.
//!
//! A [`LayersManager`](super::LayersManager) owns one hub and hands a clone of
//! it to every layer it holds, so tile events and structural events reach the
//! same subscribers. Dispatch is synchronous and in subscription order.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::types::{LayerId, LayerUpdate};

/// Why a change happened when it was not a direct user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeReason {
    /// Replaying a serialized document
    Hydration,
    /// Undo or redo replaying a recorded command
    History,
}

impl ChangeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeReason::Hydration => "hydration",
            ChangeReason::History => "history",
        }
    }
}

/// Metadata attached to structural events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventMeta {
    pub reason: Option<ChangeReason>,
}

impl EventMeta {
    pub fn hydration() -> Self {
        Self {
            reason: Some(ChangeReason::Hydration),
        }
    }

    pub fn history() -> Self {
        Self {
            reason: Some(ChangeReason::History),
        }
    }

    /// Consumers that keep their own history should only record user actions
    pub fn should_record(&self) -> bool {
        self.reason.is_none()
    }
}

/// Everything a renderer or UI store can observe. Tile coordinates, not world ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    TileChanged {
        x: i32,
        y: i32,
        data: String,
        layer_id: LayerId,
    },
    TileDeleted {
        x: i32,
        y: i32,
        layer_id: LayerId,
    },
    LayerCreated {
        layer_id: LayerId,
        meta: EventMeta,
    },
    LayerRemoved {
        layer_id: LayerId,
        meta: EventMeta,
    },
    LayerUpdated {
        layer_id: LayerId,
        update: LayerUpdate,
        meta: EventMeta,
    },
    ActiveLayerChanged {
        previous: Option<LayerId>,
        current: Option<LayerId>,
        meta: EventMeta,
    },
}

impl DocumentEvent {
    pub fn layer_id(&self) -> Option<&LayerId> {
        match self {
            DocumentEvent::TileChanged { layer_id, .. }
            | DocumentEvent::TileDeleted { layer_id, .. }
            | DocumentEvent::LayerCreated { layer_id, .. }
            | DocumentEvent::LayerRemoved { layer_id, .. }
            | DocumentEvent::LayerUpdated { layer_id, .. } => Some(layer_id),
            DocumentEvent::ActiveLayerChanged { current, .. } => current.as_ref(),
        }
    }

    pub fn meta(&self) -> EventMeta {
        match self {
            DocumentEvent::LayerCreated { meta, .. }
            | DocumentEvent::LayerRemoved { meta, .. }
            | DocumentEvent::LayerUpdated { meta, .. }
            | DocumentEvent::ActiveLayerChanged { meta, .. } => *meta,
            DocumentEvent::TileChanged { .. } | DocumentEvent::TileDeleted { .. } => {
                EventMeta::default()
            }
        }
    }
}

/// Handle returned by [`EventHub::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&DocumentEvent)>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(SubscriptionId, Listener)>,
    dispatching: bool,
    pending_removals: Vec<SubscriptionId>,
}

/// Shared, single-threaded observer registry.
#[derive(Clone, Default)]
pub struct EventHub {
    inner: Rc<RefCell<Listeners>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: FnMut(&DocumentEvent) + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.entries.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if the id was never handed out or is already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.borrow_mut();
        if let Some(pos) = inner.entries.iter().position(|(entry, _)| *entry == id) {
            inner.entries.remove(pos);
            return true;
        }
        // Listeners are detached while an event is being delivered
        if inner.dispatching && id.0 < inner.next_id && !inner.pending_removals.contains(&id) {
            inner.pending_removals.push(id);
            return true;
        }
        false
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Deliver an event to every listener, synchronously.
    pub fn emit(&self, event: DocumentEvent) {
        let mut delivering = {
            let mut inner = self.inner.borrow_mut();
            if inner.dispatching {
                // Nested emit from inside a listener: nobody left to deliver to
                return;
            }
            inner.dispatching = true;
            std::mem::take(&mut inner.entries)
        };

        for (_, listener) in delivering.iter_mut() {
            listener(&event);
        }

        let mut inner = self.inner.borrow_mut();
        let removals = std::mem::take(&mut inner.pending_removals);
        delivering.retain(|(id, _)| !removals.contains(id));
        // Keep listeners subscribed during dispatch after the existing ones
        delivering.append(&mut inner.entries);
        inner.entries = delivering;
        inner.dispatching = false;
    }
}

impl fmt::Debug for EventHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHub")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Subscribe a recorder that collects every event, for tests.
#[cfg(test)]
pub(crate) fn record_events(hub: &EventHub) -> Rc<RefCell<Vec<DocumentEvent>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    hub.subscribe(move |event| sink.borrow_mut().push(event.clone()));
    log
}
