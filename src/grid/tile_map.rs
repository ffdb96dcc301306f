use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::constants::TILE_EVICTION_THRESHOLD;
use crate::error::{DocumentError, Result};
use crate::types::{TileCoord, TileMapSchema};

use super::tile::Tile;

/// Sparse grid of tiles keyed by integer tile coordinates.
///
/// Storage model:
/// - Missing key = the whole tile is spaces
/// - Tiles are allocated lazily on first write
/// - Once more than [`TILE_EVICTION_THRESHOLD`] tiles are stored, inserting a
///   new one first sweeps out tiles that became empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileMap {
    tile_size: u32,
    tiles: HashMap<TileCoord, Tile>,
}

impl TileMap {
    pub fn new(tile_size: u32) -> Self {
        Self {
            tile_size,
            tiles: HashMap::new(),
        }
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Number of stored tiles, empty ones included
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Return the tile at `(x, y)`, allocating it if needed.
    ///
    /// Calling this twice for the same coordinate yields the same tile.
    pub fn add_tile(&mut self, x: i32, y: i32) -> &mut Tile {
        let coord = TileCoord::new(x, y);
        if !self.tiles.contains_key(&coord) && self.tiles.len() > TILE_EVICTION_THRESHOLD {
            self.evict_empty_tiles();
        }
        let tile_size = self.tile_size;
        self.tiles
            .entry(coord)
            .or_insert_with(|| Tile::new(tile_size, x, y))
    }

    /// Cache-oriented access: always returns a tile and never sweeps.
    ///
    /// The tile may stay empty; [`TileMap::serialize`] leaves such tiles out.
    pub fn get_or_create_tile(&mut self, x: i32, y: i32) -> &mut Tile {
        let tile_size = self.tile_size;
        self.tiles
            .entry(TileCoord::new(x, y))
            .or_insert_with(|| Tile::new(tile_size, x, y))
    }

    pub fn get_tile(&self, x: i32, y: i32) -> Option<&Tile> {
        self.tiles.get(&TileCoord::new(x, y))
    }

    pub fn get_tile_mut(&mut self, x: i32, y: i32) -> Option<&mut Tile> {
        self.tiles.get_mut(&TileCoord::new(x, y))
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.tiles.contains_key(&TileCoord::new(x, y))
    }

    pub fn remove_tile(&mut self, x: i32, y: i32) -> Option<Tile> {
        self.tiles.remove(&TileCoord::new(x, y))
    }

    /// Tiles whose coordinate lies in the closed range
    /// `[floor(x), ceil(x + w)] × [floor(y), ceil(y + h)]`, in tile units.
    ///
    /// Boundary tiles are over-included; callers culling for visibility must
    /// tolerate the overscan. Results are ordered row by row.
    pub fn query(&self, x: f64, y: f64, w: f64, h: f64) -> Vec<&Tile> {
        if !(x.is_finite() && y.is_finite() && w.is_finite() && h.is_finite()) {
            return Vec::new();
        }
        let min_x = x.floor() as i64;
        let max_x = (x + w).ceil() as i64;
        let min_y = y.floor() as i64;
        let max_y = (y + h).ceil() as i64;
        if max_x < min_x || max_y < min_y {
            return Vec::new();
        }

        let columns = max_x.saturating_sub(min_x).saturating_add(1);
        let rows = max_y.saturating_sub(min_y).saturating_add(1);
        let span = columns.saturating_mul(rows);
        let mut found: Vec<&Tile> = if span <= self.tiles.len() as i64 {
            // Small window: probe each coordinate
            (min_y..=max_y)
                .flat_map(|ty| (min_x..=max_x).map(move |tx| (tx, ty)))
                .filter_map(|(tx, ty)| {
                    let tx = i32::try_from(tx).ok()?;
                    let ty = i32::try_from(ty).ok()?;
                    self.get_tile(tx, ty)
                })
                .collect()
        } else {
            // Sparse map: scan what is stored
            self.tiles
                .values()
                .filter(|tile| {
                    let tx = tile.x() as i64;
                    let ty = tile.y() as i64;
                    tx >= min_x && tx <= max_x && ty >= min_y && ty <= max_y
                })
                .collect()
        };
        found.sort_by_key(|tile| (tile.y(), tile.x()));
        found
    }

    /// Every stored tile, ordered row by row
    pub fn query_all(&self) -> Vec<&Tile> {
        let mut all: Vec<&Tile> = self.tiles.values().collect();
        all.sort_by_key(|tile| (tile.y(), tile.x()));
        all
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    pub fn coords(&self) -> Vec<TileCoord> {
        let mut coords: Vec<TileCoord> = self.tiles.keys().copied().collect();
        coords.sort_by_key(|c| (c.y, c.x));
        coords
    }

    pub fn clear(&mut self) {
        self.tiles.clear();
    }

    /// Drop every tile that holds only spaces. Returns how many were removed.
    pub fn evict_empty_tiles(&mut self) -> usize {
        let before = self.tiles.len();
        self.tiles.retain(|_, tile| !tile.is_empty());
        let evicted = before - self.tiles.len();
        if evicted > 0 {
            debug!("Evicted {} empty tiles ({} remain)", evicted, self.tiles.len());
        }
        evicted
    }

    /// Smallest and largest coordinates among non-empty tiles
    pub fn bounds(&self) -> Option<(TileCoord, TileCoord)> {
        let mut occupied = self.tiles.values().filter(|t| !t.is_empty());
        let first = occupied.next()?.coord();
        Some(occupied.fold((first, first), |(min, max), tile| {
            let c = tile.coord();
            (
                TileCoord::new(min.x.min(c.x), min.y.min(c.y)),
                TileCoord::new(max.x.max(c.x), max.y.max(c.y)),
            )
        }))
    }

    /// Sparse schema of the occupied tiles. Empty tiles are not written.
    pub fn serialize(&self) -> TileMapSchema {
        let map: BTreeMap<String, _> = self
            .tiles
            .iter()
            .filter(|(_, tile)| !tile.is_empty())
            .map(|(coord, tile)| (coord.key(), tile.serialize()))
            .collect();
        TileMapSchema {
            tile_size: self.tile_size,
            map,
        }
    }

    /// Rebuild from a schema, validating every entry first.
    pub fn deserialize(schema: &TileMapSchema) -> Result<Self> {
        if schema.tile_size == 0 {
            return Err(DocumentError::SchemaInvalid(
                "tile map has zero tile size".to_string(),
            ));
        }

        let mut tile_map = TileMap::new(schema.tile_size);
        for (key, model) in &schema.map {
            let coord = TileCoord::parse_key(key).ok_or_else(|| {
                DocumentError::SchemaInvalid(format!("malformed tile key {:?}", key))
            })?;
            if coord.x != model.x || coord.y != model.y {
                return Err(DocumentError::SchemaInvalid(format!(
                    "tile key {} does not match tile coordinates {},{}",
                    key, model.x, model.y
                )));
            }
            if model.tile_size != schema.tile_size {
                return Err(DocumentError::SchemaInvalid(format!(
                    "tile {} has size {} in a map of size {}",
                    key, model.tile_size, schema.tile_size
                )));
            }
            let tile = Tile::deserialize(model)?;
            if !tile.is_empty() {
                tile_map.tiles.insert(coord, tile);
            }
        }
        Ok(tile_map)
    }
}
