//! Plain data types shared by the grid, layers, history and document modules.
//!
//! Nothing in here depends on another engine module, so every component can
//! name these types without creating a cycle.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique, immutable identifier of a layer within a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(String);

impl LayerId {
    /// A fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// An id derived from this one, used for duplicated layers
    pub fn derived(&self) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("{}-copy-{}", self.0, &suffix[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for LayerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Integer tile coordinates (not world/character coordinates).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Tile containing the world position `(world_x, world_y)`
    pub fn containing(world_x: i32, world_y: i32, tile_size: u32) -> Self {
        let size = tile_size as i32;
        Self {
            x: world_x.div_euclid(size),
            y: world_y.div_euclid(size),
        }
    }

    /// The `"x,y"` key used by the serialized tile map
    pub fn key(&self) -> String {
        format!("{},{}", self.x, self.y)
    }

    /// Parse a `"x,y"` key
    pub fn parse_key(key: &str) -> Option<Self> {
        let (x, y) = key.split_once(',')?;
        Some(Self {
            x: x.trim().parse().ok()?,
            y: y.trim().parse().ok()?,
        })
    }
}

/// Visibility and edit lock of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerOpts {
    pub visible: bool,
    pub locked: bool,
}

impl Default for LayerOpts {
    fn default() -> Self {
        Self {
            visible: true,
            locked: false,
        }
    }
}

/// Serializable snapshot of one tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileModel {
    pub tile_size: u32,
    pub x: i32,
    pub y: i32,
    pub data: String,
}

/// Serializable sparse tile map, keyed by `"x,y"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileMapSchema {
    pub tile_size: u32,
    #[serde(default)]
    pub map: BTreeMap<String, TileModel>,
}

/// Full serializable state of a layer, used both for persistence and for
/// history entries that must rebuild a layer exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerModel {
    pub id: LayerId,
    pub name: String,
    pub index: usize,
    #[serde(default)]
    pub opts: LayerOpts,
    /// Group root for composition queries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<LayerId>,
    /// Absent only for layers that were never given a tile map
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_map: Option<TileMapSchema>,
}

/// The attribute set of a layer that `update` can change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerAttributes {
    pub name: String,
    pub index: usize,
    pub opts: LayerOpts,
    pub parent: Option<LayerId>,
}

impl LayerAttributes {
    /// A patch that sets every attribute back to this snapshot
    pub fn to_patch(&self) -> LayerPatch {
        LayerPatch {
            name: Some(self.name.clone()),
            index: Some(self.index),
            opts: Some(self.opts),
            parent: Some(self.parent.clone()),
        }
    }
}

/// Partial attribute change. `None` leaves the attribute untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerPatch {
    pub name: Option<String>,
    pub index: Option<usize>,
    pub opts: Option<LayerOpts>,
    pub parent: Option<Option<LayerId>>,
}

impl LayerPatch {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn index(index: usize) -> Self {
        Self {
            index: Some(index),
            ..Default::default()
        }
    }

    pub fn opts(opts: LayerOpts) -> Self {
        Self {
            opts: Some(opts),
            ..Default::default()
        }
    }

    pub fn parent(parent: Option<LayerId>) -> Self {
        Self {
            parent: Some(parent),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.index.is_none() && self.opts.is_none() && self.parent.is_none()
    }
}

/// Before/after snapshots returned by an attribute update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerUpdate {
    pub before: LayerAttributes,
    pub after: LayerAttributes,
}

impl LayerUpdate {
    pub fn is_noop(&self) -> bool {
        self.before == self.after
    }
}

/// Content of one tile slot at a point in time; `data: None` means no tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileFragment {
    pub coord: TileCoord,
    pub data: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_coord_key_roundtrip() {
        let coord = TileCoord::new(-3, 12);
        assert_eq!(coord.key(), "-3,12");
        assert_eq!(TileCoord::parse_key("-3,12"), Some(coord));
    }

    #[test]
    fn test_tile_coord_parse_rejects_garbage() {
        assert_eq!(TileCoord::parse_key("3"), None);
        assert_eq!(TileCoord::parse_key("a,b"), None);
        assert_eq!(TileCoord::parse_key(""), None);
    }

    #[test]
    fn test_tile_coord_containing_negative() {
        assert_eq!(TileCoord::containing(26, 0, 25), TileCoord::new(1, 0));
        assert_eq!(TileCoord::containing(-1, -25, 25), TileCoord::new(-1, -1));
        assert_eq!(TileCoord::containing(-26, 24, 25), TileCoord::new(-2, 0));
    }

    #[test]
    fn test_layer_id_derived_keeps_prefix() {
        let id = LayerId::from("base");
        let copy = id.derived();
        assert!(copy.as_str().starts_with("base-copy-"));
        assert_ne!(copy, id);
    }

    #[test]
    fn test_layer_opts_default_visible_unlocked() {
        let opts = LayerOpts::default();
        assert!(opts.visible);
        assert!(!opts.locked);
    }

    #[test]
    fn test_layer_model_uses_camel_case() {
        let model = LayerModel {
            id: LayerId::from("l1"),
            name: "Layer 1".to_string(),
            index: 0,
            opts: LayerOpts::default(),
            parent: None,
            tile_map: Some(TileMapSchema {
                tile_size: 2,
                map: BTreeMap::new(),
            }),
        };
        let json = serde_json::to_string(&model).unwrap();
        assert!(json.contains("\"tileMap\""));
        assert!(json.contains("\"tileSize\":2"));
        assert!(!json.contains("parent"));
    }

    #[test]
    fn test_patch_from_attributes_covers_everything() {
        let attrs = LayerAttributes {
            name: "Ink".to_string(),
            index: 2,
            opts: LayerOpts {
                visible: false,
                locked: true,
            },
            parent: Some(LayerId::from("root")),
        };
        let patch = attrs.to_patch();
        assert_eq!(patch.name.as_deref(), Some("Ink"));
        assert_eq!(patch.index, Some(2));
        assert_eq!(patch.parent, Some(Some(LayerId::from("root"))));
        assert!(!patch.is_empty());
        assert!(LayerPatch::default().is_empty());
    }
}
