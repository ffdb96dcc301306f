//! Sparse character storage.
//!
//! - [`tile`] - fixed-size square character buffer
//! - [`tile_map`] - sparse tile-coordinate → tile dictionary with lazy allocation

mod tile;
mod tile_map;

pub use tile::Tile;
pub use tile_map::TileMap;
