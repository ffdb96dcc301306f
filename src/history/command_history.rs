//! Undo/redo stacks.

use tracing::debug;

use crate::constants::MAX_HISTORY_SIZE;
use crate::error::Result;

use super::commands::Reversible;

/// Linear command history with a bounded undo stack.
#[derive(Debug, Clone)]
pub struct HistoryManager<C> {
    /// Commands that can be undone (most recent last)
    undo_stack: Vec<C>,
    /// Commands that can be redone (most recent last)
    redo_stack: Vec<C>,
    max_size: usize,
}

impl<C> Default for HistoryManager<C> {
    fn default() -> Self {
        Self::new(MAX_HISTORY_SIZE)
    }
}

impl<C> HistoryManager<C> {
    pub fn new(max_size: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_size: max_size.max(1),
        }
    }

    /// Record a command that has already been applied
    pub fn push(&mut self, command: C) {
        // A new action invalidates whatever was undone
        self.redo_stack.clear();
        self.undo_stack.push(command);
        self.trim();
    }

    fn trim(&mut self) {
        if self.undo_stack.len() > self.max_size {
            let excess = self.undo_stack.len() - self.max_size;
            self.undo_stack.drain(..excess);
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Change the cap, dropping the oldest entries if needed
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size.max(1);
        self.trim();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// The command the next undo would revert
    pub fn peek_undo(&self) -> Option<&C> {
        self.undo_stack.last()
    }

    /// The command the next redo would apply
    pub fn peek_redo(&self) -> Option<&C> {
        self.redo_stack.last()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl<C: Reversible> HistoryManager<C> {
    /// Revert the most recent command. Returns `Ok(false)` when there is nothing to undo.
    ///
    /// If the revert fails the command stays on the undo stack.
    pub fn undo(&mut self, target: &mut C::Target, ctx: &C::Context) -> Result<bool> {
        let Some(command) = self.undo_stack.pop() else {
            return Ok(false);
        };
        if let Err(err) = command.revert(target, ctx) {
            debug!("Undo failed, keeping command: {}", err);
            self.undo_stack.push(command);
            return Err(err);
        }
        self.redo_stack.push(command);
        Ok(true)
    }

    /// Re-apply the most recently undone command. Returns `Ok(false)` when there is nothing to redo.
    pub fn redo(&mut self, target: &mut C::Target, ctx: &C::Context) -> Result<bool> {
        let Some(command) = self.redo_stack.pop() else {
            return Ok(false);
        };
        if let Err(err) = command.apply(target, ctx) {
            debug!("Redo failed, keeping command: {}", err);
            self.redo_stack.push(command);
            return Err(err);
        }
        self.undo_stack.push(command);
        self.trim();
        Ok(true)
    }
}
