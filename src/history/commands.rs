//! History command types.

use crate::error::Result;
use crate::types::{LayerAttributes, LayerId, LayerModel, TileFragment};

/// A command that can be replayed forwards and backwards against a target.
pub trait Reversible {
    type Target;
    type Context;

    /// Forward effect, used for redo
    fn apply(&self, target: &mut Self::Target, ctx: &Self::Context) -> Result<()>;

    /// Inverse effect from the captured `before` state, used for undo
    fn revert(&self, target: &mut Self::Target, ctx: &Self::Context) -> Result<()>;
}

/// Cross-cutting information handlers need beyond the layers themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryContext {
    /// Tile size of the document; rebuilt layers must agree with it
    pub tile_size: u32,
}

/// Active layer before and after a command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveChange {
    pub before: Option<LayerId>,
    pub after: Option<LayerId>,
}

impl ActiveChange {
    pub fn new(before: Option<LayerId>, after: Option<LayerId>) -> Self {
        Self { before, after }
    }
}

/// A reversible document edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryAction {
    /// A layer was created and made active
    CreateLayer { layer: LayerModel, active: ActiveChange },
    /// A layer was removed and the active layer re-targeted
    RemoveLayer { layer: LayerModel, active: ActiveChange },
    /// Layer attributes changed
    UpdateLayer {
        layer_id: LayerId,
        before: LayerAttributes,
        after: LayerAttributes,
    },
    /// Tiles of one layer changed; fragments hold whole-tile content
    EditTiles {
        layer_id: LayerId,
        before: Vec<TileFragment>,
        after: Vec<TileFragment>,
    },
    /// A different layer was selected
    SetActiveLayer { active: ActiveChange },
    /// Several actions recorded as one step, e.g. a committed gesture
    Batch(Vec<HistoryAction>),
}

impl HistoryAction {
    /// Short tag used in log output
    pub fn kind(&self) -> &'static str {
        match self {
            HistoryAction::CreateLayer { .. } => "create_layer",
            HistoryAction::RemoveLayer { .. } => "remove_layer",
            HistoryAction::UpdateLayer { .. } => "update_layer",
            HistoryAction::EditTiles { .. } => "edit_tiles",
            HistoryAction::SetActiveLayer { .. } => "set_active_layer",
            HistoryAction::Batch(_) => "batch",
        }
    }

    /// True when replaying the command would change nothing
    pub fn is_noop(&self) -> bool {
        match self {
            HistoryAction::CreateLayer { .. } | HistoryAction::RemoveLayer { .. } => false,
            HistoryAction::UpdateLayer { before, after, .. } => before == after,
            HistoryAction::EditTiles { before, after, .. } => before == after,
            HistoryAction::SetActiveLayer { active } => active.before == active.after,
            HistoryAction::Batch(actions) => actions.iter().all(HistoryAction::is_noop),
        }
    }

    /// Fold a later tile edit on the same layer into this one, keeping the
    /// earliest `before` and the latest `after` per tile.
    ///
    /// Returns `next` back when the two cannot be merged.
    pub fn absorb(&mut self, next: HistoryAction) -> Option<HistoryAction> {
        match (self, next) {
            (
                HistoryAction::EditTiles {
                    layer_id,
                    before,
                    after,
                },
                HistoryAction::EditTiles {
                    layer_id: next_id,
                    before: next_before,
                    after: next_after,
                },
            ) if *layer_id == next_id => {
                for (prior, latest) in next_before.into_iter().zip(next_after) {
                    match after.iter_mut().find(|f| f.coord == latest.coord) {
                        Some(slot) => *slot = latest,
                        None => {
                            before.push(prior);
                            after.push(latest);
                        }
                    }
                }
                None
            }
            (_, next) => Some(next),
        }
    }
}
