//! Document engine for a layered ASCII canvas.
//!
//! Characters live in fixed-size square [`grid::Tile`]s stored sparsely in a
//! [`grid::TileMap`], so the canvas extends in every direction and costs
//! nothing where it is blank. Each [`layers::Layer`] wraps one tile map and a
//! [`layers::LayersManager`] orders them. Edits go through a
//! [`document::Document`], which records them as reversible
//! [`history::HistoryAction`]s and converts to and from a versioned JSON
//! schema.
//!
//! ```
//! use asciiforge::document::Document;
//!
//! let mut doc = Document::new("notes", 8);
//! doc.add_layer();
//! doc.set_to_region(-3, 2, "hi\nthere", false).unwrap();
//! assert_eq!(doc.layers().read_combined_region(-3, 2, 5, 2), "hi   \nthere");
//!
//! doc.undo().unwrap();
//! assert_eq!(doc.layers().read_combined_region(-3, 2, 5, 2), "     \n     ");
//! ```

pub mod config;
pub mod constants;
pub mod document;
pub mod error;
pub mod grid;
pub mod history;
pub mod layers;
pub mod logging;
pub mod paths;
pub mod types;

pub use document::Document;
pub use error::{DocumentError, Result};
