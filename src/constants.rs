//! Centralized constants used across the engine.
//!
//! This module contains magic numbers and configuration values that are used
//! in multiple places or would benefit from being named constants.

/// The character every unwritten cell holds. A tile made only of this is empty.
pub const EMPTY_CHAR: char = ' ';

/// Default edge length of a square tile, in characters.
pub const DEFAULT_TILE_SIZE: u32 = 25;

/// Largest tile edge accepted from config or a serialized document.
pub const MAX_TILE_SIZE: u32 = 256;

/// Stored-tile count above which a tile map sweeps out empty tiles
/// before inserting a new one.
pub const TILE_EVICTION_THRESHOLD: usize = 1000;

/// Maximum number of commands to keep in history
pub const MAX_HISTORY_SIZE: usize = 100;

/// Version written into `meta.version`. Documents with a newer version are rejected.
pub const SCHEMA_VERSION: u32 = 1;

/// Title given to documents created without one.
pub const DEFAULT_DOCUMENT_TITLE: &str = "Untitled Document";

/// Camera zoom bounds
pub const MIN_CAMERA_SCALE: f64 = 0.1;
pub const MAX_CAMERA_SCALE: f64 = 10.0;
