//! Layers over the sparse grid.
//!
//! A [`Layer`] is a named, ordered surface over one [`TileMap`](crate::grid::TileMap).
//! It speaks world (character) coordinates, creates tiles on write and deletes
//! them once they are blank again. [`LayersManager`] owns every layer of a
//! document, keeps their indices contiguous and tracks the active one.
//!
//! ## Module Structure
//!
//! - [`events`] - change events and the shared observer hub
//! - [`layer`] - single layer with world-coordinate tile access
//! - [`manager`] - ordered layer collection, active layer, temp layers, composition

mod events;
mod layer;
mod manager;

#[cfg(test)]
mod tests;

pub use events::{ChangeReason, DocumentEvent, EventHub, EventMeta, SubscriptionId};
pub use layer::{Layer, text_block_size};
pub use manager::LayersManager;

#[cfg(test)]
pub(crate) use events::record_events;
