use crate::constants::EMPTY_CHAR;
use crate::error::{DocumentError, Result};
use crate::grid::{Tile, TileMap};
use crate::types::{
    LayerAttributes, LayerId, LayerModel, LayerOpts, LayerPatch, LayerUpdate, TileCoord,
    TileFragment, TileModel,
};

use super::events::{DocumentEvent, EventHub};

/// Width and height of a newline-separated text block, in characters
pub fn text_block_size(text: &str) -> (u32, u32) {
    if text.is_empty() {
        return (0, 0);
    }
    let width = text.split('\n').map(|l| l.chars().count()).max().unwrap_or(0);
    let height = text.split('\n').count();
    (width as u32, height as u32)
}

/// A named, ordered, toggleable drawing surface over one [`TileMap`].
///
/// All coordinates are world (character) coordinates unless a method says
/// otherwise. The layer owns tile lifecycle: a tile is created by the first
/// non-space write inside it and removed as soon as a write leaves it blank.
/// Every call that touches tiles emits one `TileChanged` or `TileDeleted`
/// per touched tile.
#[derive(Debug)]
pub struct Layer {
    id: LayerId,
    name: String,
    index: usize,
    opts: LayerOpts,
    parent: Option<LayerId>,
    tile_map: Option<TileMap>,
    hub: EventHub,
}

impl Layer {
    pub fn new(id: LayerId, name: impl Into<String>, index: usize, tile_size: u32) -> Self {
        Self {
            id,
            name: name.into(),
            index,
            opts: LayerOpts::default(),
            parent: None,
            tile_map: Some(TileMap::new(tile_size)),
            hub: EventHub::new(),
        }
    }

    /// A layer with no tile map; tile-based edits fail until [`Layer::init_tile_map`]
    pub fn without_tile_map(id: LayerId, name: impl Into<String>, index: usize) -> Self {
        Self {
            id,
            name: name.into(),
            index,
            opts: LayerOpts::default(),
            parent: None,
            tile_map: None,
            hub: EventHub::new(),
        }
    }

    pub fn init_tile_map(&mut self, tile_size: u32) {
        if self.tile_map.is_none() {
            self.tile_map = Some(TileMap::new(tile_size));
        }
    }

    pub fn from_model(model: &LayerModel) -> Result<Self> {
        let tile_map = model
            .tile_map
            .as_ref()
            .map(TileMap::deserialize)
            .transpose()?;
        Ok(Self {
            id: model.id.clone(),
            name: model.name.clone(),
            index: model.index,
            opts: model.opts,
            parent: model.parent.clone(),
            tile_map,
            hub: EventHub::new(),
        })
    }

    pub fn to_model(&self) -> LayerModel {
        LayerModel {
            id: self.id.clone(),
            name: self.name.clone(),
            index: self.index,
            opts: self.opts,
            parent: self.parent.clone(),
            tile_map: self.tile_map.as_ref().map(TileMap::serialize),
        }
    }

    /// Route this layer's events through `hub` (done by the owning manager)
    pub(crate) fn attach(&mut self, hub: EventHub) {
        self.hub = hub;
    }

    pub fn id(&self) -> &LayerId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn opts(&self) -> LayerOpts {
        self.opts
    }

    pub fn parent(&self) -> Option<&LayerId> {
        self.parent.as_ref()
    }

    pub fn is_visible(&self) -> bool {
        self.opts.visible
    }

    pub fn is_locked(&self) -> bool {
        self.opts.locked
    }

    pub fn tile_map(&self) -> Option<&TileMap> {
        self.tile_map.as_ref()
    }

    pub fn tile_size(&self) -> Option<u32> {
        self.tile_map.as_ref().map(TileMap::tile_size)
    }

    pub fn attributes(&self) -> LayerAttributes {
        LayerAttributes {
            name: self.name.clone(),
            index: self.index,
            opts: self.opts,
            parent: self.parent.clone(),
        }
    }

    fn map(&self) -> Result<&TileMap> {
        self.tile_map.as_ref().ok_or_else(|| missing_map(&self.id))
    }

    /// Emit the event for a tile that was just written and drop it if it became blank
    fn settle_tile(&mut self, coord: TileCoord) -> Option<TileModel> {
        let map = self.tile_map.as_mut()?;
        let tile = map.get_tile(coord.x, coord.y)?;
        if tile.is_empty() {
            map.remove_tile(coord.x, coord.y);
            self.hub.emit(DocumentEvent::TileDeleted {
                x: coord.x,
                y: coord.y,
                layer_id: self.id.clone(),
            });
            None
        } else {
            let model = tile.serialize();
            self.hub.emit(DocumentEvent::TileChanged {
                x: coord.x,
                y: coord.y,
                data: model.data.clone(),
                layer_id: self.id.clone(),
            });
            Some(model)
        }
    }

    /// Allocate the tile at tile coordinates `(x, y)`
    pub fn add_tile(&mut self, x: i32, y: i32) -> Result<&mut Tile> {
        let map = self.tile_map.as_mut().ok_or_else(|| missing_map(&self.id))?;
        Ok(map.add_tile(x, y))
    }

    /// Remove the tile at tile coordinates `(x, y)`
    pub fn remove_tile(&mut self, x: i32, y: i32) -> Result<Tile> {
        let map = self.tile_map.as_mut().ok_or_else(|| missing_map(&self.id))?;
        let tile = map
            .remove_tile(x, y)
            .ok_or_else(|| DocumentError::tile_not_found(x, y))?;
        self.hub.emit(DocumentEvent::TileDeleted {
            x,
            y,
            layer_id: self.id.clone(),
        });
        Ok(tile)
    }

    /// Tiles overlapping a world rectangle (with the tile map's overscan)
    pub fn query_tiles(&self, x: i32, y: i32, width: u32, height: u32) -> Vec<&Tile> {
        let Some(map) = self.tile_map.as_ref() else {
            return Vec::new();
        };
        let size = map.tile_size() as f64;
        map.query(
            x as f64 / size,
            y as f64 / size,
            width as f64 / size,
            height as f64 / size,
        )
    }

    pub fn query_all_tiles(&self) -> Vec<&Tile> {
        self.tile_map
            .as_ref()
            .map(TileMap::query_all)
            .unwrap_or_default()
    }

    /// Tile containing the world position, if one is stored
    pub fn tile_at_position(&self, world_x: i32, world_y: i32) -> Option<&Tile> {
        let map = self.tile_map.as_ref()?;
        let coord = TileCoord::containing(world_x, world_y, map.tile_size());
        map.get_tile(coord.x, coord.y)
    }

    /// Character at a world position; a space wherever nothing is stored
    pub fn get_char(&self, x: i32, y: i32) -> char {
        self.tile_at_position(x, y)
            .and_then(|tile| tile.get_char(x, y))
            .unwrap_or(EMPTY_CHAR)
    }

    /// Write one character at a world position.
    ///
    /// Returns the resulting tile, or `None` when the tile ended up (or stayed) absent.
    pub fn set_char(&mut self, x: i32, y: i32, ch: char) -> Result<Option<TileModel>> {
        let map = self.map()?;
        let coord = TileCoord::containing(x, y, map.tile_size());
        self.set_char_to_tile(x, y, ch, coord)
    }

    /// Write one character into a named tile, local coordinates wrapped
    pub fn set_char_to_tile(
        &mut self,
        lx: i32,
        ly: i32,
        ch: char,
        tile: TileCoord,
    ) -> Result<Option<TileModel>> {
        let map = self.tile_map.as_mut().ok_or_else(|| missing_map(&self.id))?;
        if ch == EMPTY_CHAR && !map.contains(tile.x, tile.y) {
            return Ok(None);
        }
        map.add_tile(tile.x, tile.y).set_char(lx, ly, ch);
        Ok(self.settle_tile(tile))
    }

    /// Write a block of lines into a named tile at a local offset
    pub fn set_region_to_tile<S: AsRef<str>>(
        &mut self,
        offset_x: i32,
        offset_y: i32,
        lines: &[S],
        skip_spaces: bool,
        tile: TileCoord,
    ) -> Result<Option<TileModel>> {
        let map = self.tile_map.as_mut().ok_or_else(|| missing_map(&self.id))?;
        let has_ink = lines
            .iter()
            .any(|l| l.as_ref().chars().any(|c| c != EMPTY_CHAR));
        if !has_ink && !map.contains(tile.x, tile.y) {
            return Ok(None);
        }
        map.add_tile(tile.x, tile.y)
            .set_region(offset_x, offset_y, lines, skip_spaces);
        Ok(self.settle_tile(tile))
    }

    /// Fill a rectangle of a named tile at a local offset
    pub fn fill_region_to_tile(
        &mut self,
        offset_x: i32,
        offset_y: i32,
        width: u32,
        height: u32,
        ch: char,
        tile: TileCoord,
    ) -> Result<Option<TileModel>> {
        let map = self.tile_map.as_mut().ok_or_else(|| missing_map(&self.id))?;
        if ch == EMPTY_CHAR && !map.contains(tile.x, tile.y) {
            return Ok(None);
        }
        map.add_tile(tile.x, tile.y)
            .fill_region(offset_x, offset_y, width, height, ch);
        Ok(self.settle_tile(tile))
    }

    /// Tile coordinates covered by a world rectangle, whether stored or not
    pub fn tiles_spanned(&self, x: i32, y: i32, width: u32, height: u32) -> Result<Vec<TileCoord>> {
        let size = self.map()?.tile_size();
        Ok(Region::new(x, y, width, height)
            .map(|region| region.tiles(size))
            .unwrap_or_default())
    }

    /// Stored tiles overlapping a world rectangle, row by row
    pub fn occupied_tiles_in(&self, x: i32, y: i32, width: u32, height: u32) -> Result<Vec<TileCoord>> {
        let map = self.map()?;
        Ok(Region::new(x, y, width, height)
            .map(|region| region.stored_tiles(map))
            .unwrap_or_default())
    }

    /// Write a newline-separated block with its top-left corner at `(start_x, start_y)`.
    ///
    /// Each overlapped tile receives the intersecting sub-rectangle. Lines
    /// shorter than the block leave the cells past their end untouched.
    /// Characters that would land past `i32::MAX` are dropped.
    /// Returns the tiles that were touched.
    pub fn set_to_region(
        &mut self,
        start_x: i32,
        start_y: i32,
        text: &str,
        skip_spaces: bool,
    ) -> Result<Vec<TileCoord>> {
        let map = self.tile_map.as_mut().ok_or_else(|| missing_map(&self.id))?;
        let (width, height) = text_block_size(text);
        let Some(region) = Region::new(start_x, start_y, width, height) else {
            return Ok(Vec::new());
        };
        let size = map.tile_size();
        let lines: Vec<Vec<char>> = text.split('\n').map(|l| l.chars().collect()).collect();

        let mut touched = Vec::new();
        for coord in region.tiles(size) {
            let part = region.within_tile(coord, size);
            let block: Vec<String> = (part.y0..part.y1)
                .map(|wy| {
                    let row = &lines[(wy - region.y0) as usize];
                    let from = ((part.x0 - region.x0) as usize).min(row.len());
                    let to = ((part.x1 - region.x0) as usize).min(row.len());
                    row[from..to].iter().collect()
                })
                .collect();
            if block.iter().all(String::is_empty) {
                continue;
            }

            let has_ink = block.iter().any(|l| l.chars().any(|c| c != EMPTY_CHAR));
            let exists = map.contains(coord.x, coord.y);
            if !has_ink && (!exists || skip_spaces) {
                continue;
            }

            let (lx, ly) = part.local_origin(coord, size);
            map.add_tile(coord.x, coord.y)
                .set_region(lx, ly, &block, skip_spaces);
            touched.push(coord);
        }

        for coord in &touched {
            self.settle_tile(*coord);
        }
        Ok(touched)
    }

    /// Read a `width`×`height` block; always exactly `height` rows of `width` characters
    pub fn read_region(&self, start_x: i32, start_y: i32, width: u32, height: u32) -> String {
        let mut grid = vec![vec![EMPTY_CHAR; width as usize]; height as usize];
        if let (Some(map), Some(region)) = (
            self.tile_map.as_ref(),
            Region::new(start_x, start_y, width, height),
        ) {
            let size = map.tile_size();
            for coord in region.stored_tiles(map) {
                let Some(tile) = map.get_tile(coord.x, coord.y) else {
                    continue;
                };
                let part = region.within_tile(coord, size);
                let (origin_x, origin_y) = tile_origin(coord, size);
                for wy in part.y0..part.y1 {
                    for wx in part.x0..part.x1 {
                        let lx = (wx - origin_x) as i32;
                        let ly = (wy - origin_y) as i32;
                        if let Some(ch) = tile.get_char(lx, ly) {
                            grid[(wy - region.y0) as usize][(wx - region.x0) as usize] = ch;
                        }
                    }
                }
            }
        }
        grid.iter()
            .map(|row| row.iter().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Blank a world rectangle; same result as writing a block of spaces with
    /// `skip_spaces = false`. Returns the tiles that were touched.
    pub fn clear_region(&mut self, x: i32, y: i32, width: u32, height: u32) -> Result<Vec<TileCoord>> {
        let map = self.tile_map.as_mut().ok_or_else(|| missing_map(&self.id))?;
        let Some(region) = Region::new(x, y, width, height) else {
            return Ok(Vec::new());
        };
        let size = map.tile_size();

        let touched = region.stored_tiles(map);
        for coord in &touched {
            let Some(tile) = map.get_tile_mut(coord.x, coord.y) else {
                continue;
            };
            let part = region.within_tile(*coord, size);
            let (lx, ly) = part.local_origin(*coord, size);
            tile.fill_region(lx, ly, part.width(), part.height(), EMPTY_CHAR);
        }

        for coord in &touched {
            self.settle_tile(*coord);
        }
        Ok(touched)
    }

    /// Restore one tile slot to captured content; `None` or blank data removes the tile
    pub fn replace_tile(&mut self, coord: TileCoord, data: Option<&str>) -> Result<()> {
        let map = self.tile_map.as_mut().ok_or_else(|| missing_map(&self.id))?;
        let size = map.tile_size() as usize;

        match data {
            Some(data) if data.chars().any(|c| c != EMPTY_CHAR) => {
                let len = data.chars().count();
                if len != size * size {
                    return Err(DocumentError::SchemaInvalid(format!(
                        "tile {} expects {} characters, got {}",
                        coord.key(),
                        size * size,
                        len
                    )));
                }
                map.add_tile(coord.x, coord.y).replace_data(data)?;
                self.settle_tile(coord);
            }
            _ => {
                if map.remove_tile(coord.x, coord.y).is_some() {
                    self.hub.emit(DocumentEvent::TileDeleted {
                        x: coord.x,
                        y: coord.y,
                        layer_id: self.id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Current content of a tile slot, `None` when absent or blank
    pub fn fragment(&self, coord: TileCoord) -> TileFragment {
        let data = self
            .tile_map
            .as_ref()
            .and_then(|map| map.get_tile(coord.x, coord.y))
            .filter(|tile| !tile.is_empty())
            .map(Tile::data);
        TileFragment { coord, data }
    }

    /// World rectangle `(x, y, width, height)` covering every occupied tile,
    /// clipped to the `i32` coordinate space
    pub fn occupied_bounds(&self) -> Option<(i32, i32, u32, u32)> {
        let map = self.tile_map.as_ref()?;
        let (min, max) = map.bounds()?;
        let size = map.tile_size();
        let (x0, y0) = tile_origin(min, size);
        let (x1, y1) = tile_origin(max, size);
        Some(clip_rect(x0, y0, x1 + size as i64, y1 + size as i64))
    }

    /// Apply a partial attribute change and return both snapshots.
    ///
    /// `patch.index` is ignored here. A layer's position belongs to its
    /// manager, which moves it through [`LayersManager::update_layer`] and
    /// renumbers the siblings.
    ///
    /// [`LayersManager::update_layer`]: super::LayersManager::update_layer
    pub fn update(&mut self, patch: &LayerPatch) -> LayerUpdate {
        let before = self.attributes();
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(opts) = patch.opts {
            self.opts = opts;
        }
        if let Some(parent) = &patch.parent {
            self.parent = parent.clone();
        }
        LayerUpdate {
            before,
            after: self.attributes(),
        }
    }

    pub(crate) fn update_index(&mut self, index: usize) {
        self.index = index;
    }

    /// Drop every tile. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let Some(map) = self.tile_map.as_mut() else {
            return 0;
        };
        let coords = map.coords();
        map.clear();
        for coord in &coords {
            self.hub.emit(DocumentEvent::TileDeleted {
                x: coord.x,
                y: coord.y,
                layer_id: self.id.clone(),
            });
        }
        coords.len()
    }

    /// True when no tile holds a non-space character
    pub fn is_empty(&self) -> bool {
        self.tile_map
            .as_ref()
            .is_none_or(|map| map.iter().all(Tile::is_empty))
    }
}

fn missing_map(id: &LayerId) -> DocumentError {
    DocumentError::PreconditionMissing(format!("layer {} has no tile map", id))
}

/// World position of a tile's top-left cell
fn tile_origin(coord: TileCoord, tile_size: u32) -> (i64, i64) {
    let size = tile_size as i64;
    (coord.x as i64 * size, coord.y as i64 * size)
}

/// Half-open world rectangle, clamped to what `i32` coordinates can address
pub(crate) fn clip_rect(x0: i64, y0: i64, x1: i64, y1: i64) -> (i32, i32, u32, u32) {
    let lo = i32::MIN as i64;
    let hi = i32::MAX as i64 + 1;
    let (x0, y0) = (x0.clamp(lo, hi - 1), y0.clamp(lo, hi - 1));
    let (x1, y1) = (x1.clamp(x0, hi), y1.clamp(y0, hi));
    (x0 as i32, y0 as i32, (x1 - x0) as u32, (y1 - y0) as u32)
}

/// A non-empty world rectangle with half-open bounds held as `i64`.
///
/// The far edges are clamped to `i32::MAX + 1`, so the cells it covers are
/// always addressable and `x + width` cannot overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Region {
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
}

impl Region {
    fn new(x: i32, y: i32, width: u32, height: u32) -> Option<Self> {
        let limit = i32::MAX as i64 + 1;
        let region = Self {
            x0: x as i64,
            y0: y as i64,
            x1: (x as i64 + width as i64).min(limit),
            y1: (y as i64 + height as i64).min(limit),
        };
        (region.x1 > region.x0 && region.y1 > region.y0).then_some(region)
    }

    fn width(&self) -> u32 {
        (self.x1 - self.x0) as u32
    }

    fn height(&self) -> u32 {
        (self.y1 - self.y0) as u32
    }

    /// First and last tile covered, inclusive
    fn tile_range(&self, tile_size: u32) -> (TileCoord, TileCoord) {
        let first = TileCoord::containing(self.x0 as i32, self.y0 as i32, tile_size);
        let last = TileCoord::containing((self.x1 - 1) as i32, (self.y1 - 1) as i32, tile_size);
        (first, last)
    }

    /// Every tile covered, row by row
    fn tiles(&self, tile_size: u32) -> Vec<TileCoord> {
        let (first, last) = self.tile_range(tile_size);
        (first.y..=last.y)
            .flat_map(|ty| (first.x..=last.x).map(move |tx| TileCoord::new(tx, ty)))
            .collect()
    }

    /// Covered tiles that are stored in `map`, row by row.
    ///
    /// Probes each covered slot when that is cheaper than scanning the map.
    fn stored_tiles(&self, map: &TileMap) -> Vec<TileCoord> {
        let (first, last) = self.tile_range(map.tile_size());
        let columns = last.x as i64 - first.x as i64 + 1;
        let rows = last.y as i64 - first.y as i64 + 1;
        if columns.saturating_mul(rows) <= map.len() as i64 {
            self.tiles(map.tile_size())
                .into_iter()
                .filter(|c| map.contains(c.x, c.y))
                .collect()
        } else {
            map.coords()
                .into_iter()
                .filter(|c| c.x >= first.x && c.x <= last.x && c.y >= first.y && c.y <= last.y)
                .collect()
        }
    }

    /// The part of this region inside one tile
    fn within_tile(&self, coord: TileCoord, tile_size: u32) -> Self {
        let (origin_x, origin_y) = tile_origin(coord, tile_size);
        let size = tile_size as i64;
        Self {
            x0: self.x0.max(origin_x),
            y0: self.y0.max(origin_y),
            x1: self.x1.min(origin_x + size),
            y1: self.y1.min(origin_y + size),
        }
    }

    /// Top-left corner relative to the tile's origin
    fn local_origin(&self, coord: TileCoord, tile_size: u32) -> (i32, i32) {
        let (origin_x, origin_y) = tile_origin(coord, tile_size);
        ((self.x0 - origin_x) as i32, (self.y0 - origin_y) as i32)
    }
}
