//! Error taxonomy shared by every engine component.

use std::fmt;

use thiserror::Error;

/// What kind of entity a lookup failed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Document,
    Layer,
    Tile,
    Tool,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Document => "document",
            EntityKind::Layer => "layer",
            EntityKind::Tile => "tile",
            EntityKind::Tool => "tool",
        };
        f.write_str(name)
    }
}

/// Errors raised by tile, layer, history and serialization operations.
///
/// None of these are retried internally; they propagate to the caller
/// (tool or store layer) which decides how to surface them.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// A layer, tile or tool id that must exist does not.
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// Creating an entity whose id is already taken.
    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: EntityKind, id: String },

    /// Serialized input failed structural validation.
    #[error("invalid document schema: {0}")]
    SchemaInvalid(String),

    /// An operation needs state that was never set up, such as tile
    /// editing on a layer without a tile map.
    #[error("precondition missing: {0}")]
    PreconditionMissing(String),

    /// The persistence blob was not valid JSON for the document schema.
    #[error("failed to parse document: {0}")]
    Json(#[from] serde_json::Error),
}

impl DocumentError {
    pub fn layer_not_found(id: impl fmt::Display) -> Self {
        DocumentError::NotFound {
            kind: EntityKind::Layer,
            id: id.to_string(),
        }
    }

    pub fn tile_not_found(x: i32, y: i32) -> Self {
        DocumentError::NotFound {
            kind: EntityKind::Tile,
            id: format!("{},{}", x, y),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DocumentError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, DocumentError>;
