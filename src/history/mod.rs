//! Undo/Redo for document edits.
//!
//! Every reversible edit is recorded as a self-contained [`HistoryAction`]
//! carrying the full before/after state of what it touched, never a diff.
//! [`HistoryManager`] keeps the two linear stacks and drives replay through
//! the [`Reversible`] trait, so it works for any command type.
//!
//! ## Supported Operations
//!
//! - Layer creation and removal (including the active-layer switch that comes with them)
//! - Layer attribute updates (name, index, visibility, lock, parent)
//! - Tile edits: single characters, region writes and clears
//! - Active layer selection
//!
//! ## Module Structure
//!
//! - [`command_history`] - HistoryManager undo/redo stacks
//! - [`commands`] - HistoryAction enum and the Reversible trait
//! - [`execute`] - apply/revert handlers per action kind

mod command_history;
mod commands;
mod execute;

#[cfg(test)]
mod tests;

pub use command_history::HistoryManager;
pub use commands::{ActiveChange, HistoryAction, HistoryContext, Reversible};
