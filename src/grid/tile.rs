use crate::constants::EMPTY_CHAR;
use crate::error::{DocumentError, Result};
use crate::types::{TileCoord, TileModel};

/// Fixed-size square buffer of characters, the atomic unit of storage.
///
/// Every coordinate-taking method expects tile-local coordinates and wraps
/// them with a euclidean modulo, so `(-1, 0)` addresses the last column.
/// The buffer always holds exactly `tile_size²` characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    tile_size: u32,
    x: i32,
    y: i32,
    cells: Vec<char>,
}

impl Tile {
    /// Create an all-space tile at tile coordinates `(x, y)`
    pub fn new(tile_size: u32, x: i32, y: i32) -> Self {
        let len = (tile_size as usize) * (tile_size as usize);
        Self {
            tile_size,
            x,
            y,
            cells: vec![EMPTY_CHAR; len],
        }
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn y(&self) -> i32 {
        self.y
    }

    pub fn coord(&self) -> TileCoord {
        TileCoord::new(self.x, self.y)
    }

    fn size(&self) -> i32 {
        self.tile_size as i32
    }

    /// Buffer index of a local position, wrapping negative and oversized coordinates
    fn index(&self, lx: i32, ly: i32) -> Option<usize> {
        let size = self.size();
        if size <= 0 {
            return None;
        }
        let idx = (ly.rem_euclid(size) * size + lx.rem_euclid(size)) as usize;
        (idx < self.cells.len()).then_some(idx)
    }

    /// Write one character. Returns false if the position could not be addressed.
    pub fn set_char(&mut self, lx: i32, ly: i32, ch: char) -> bool {
        match self.index(lx, ly) {
            Some(idx) => {
                self.cells[idx] = ch;
                true
            }
            None => false,
        }
    }

    pub fn get_char(&self, lx: i32, ly: i32) -> Option<char> {
        self.index(lx, ly).map(|idx| self.cells[idx])
    }

    /// Write a block of lines with its top-left corner at the (wrapped) offset.
    ///
    /// Characters falling past the right or bottom edge are dropped. With
    /// `skip_spaces`, a space in the source leaves the existing cell alone.
    pub fn set_region<S: AsRef<str>>(
        &mut self,
        offset_x: i32,
        offset_y: i32,
        lines: &[S],
        skip_spaces: bool,
    ) {
        let size = self.size();
        if size <= 0 {
            return;
        }
        let ox = offset_x.rem_euclid(size);
        let oy = offset_y.rem_euclid(size);

        for (row, line) in lines.iter().enumerate() {
            let ly = oy + row as i32;
            if ly >= size {
                break;
            }
            for (col, ch) in line.as_ref().chars().enumerate() {
                let lx = ox + col as i32;
                if lx >= size {
                    break;
                }
                if skip_spaces && ch == EMPTY_CHAR {
                    continue;
                }
                self.cells[(ly * size + lx) as usize] = ch;
            }
        }
    }

    /// Fill a `width`×`height` rectangle starting at the (wrapped) offset, clipped to the tile
    pub fn fill_region(&mut self, offset_x: i32, offset_y: i32, width: u32, height: u32, ch: char) {
        let size = self.size();
        if size <= 0 {
            return;
        }
        let ox = offset_x.rem_euclid(size);
        let oy = offset_y.rem_euclid(size);
        let x_end = (ox as i64 + width as i64).min(size as i64) as i32;
        let y_end = (oy as i64 + height as i64).min(size as i64) as i32;

        for ly in oy..y_end {
            for lx in ox..x_end {
                self.cells[(ly * size + lx) as usize] = ch;
            }
        }
    }

    /// Read a rectangle in local coordinates, clipped to the tile bounds.
    ///
    /// Rows are joined with `'\n'`. Returns an empty string when the
    /// rectangle does not overlap the tile at all.
    pub fn query(&self, x: i32, y: i32, width: u32, height: u32) -> String {
        let size = self.size() as i64;
        let x0 = (x as i64).max(0);
        let y0 = (y as i64).max(0);
        let x1 = (x as i64 + width as i64).min(size);
        let y1 = (y as i64 + height as i64).min(size);
        if x0 >= x1 || y0 >= y1 {
            return String::new();
        }

        let rows: Vec<String> = (y0..y1)
            .map(|ly| {
                let start = (ly * size + x0) as usize;
                let end = (ly * size + x1) as usize;
                self.cells[start..end].iter().collect()
            })
            .collect();
        rows.join("\n")
    }

    /// True when every cell is a space
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|c| *c == EMPTY_CHAR)
    }

    /// Number of non-space cells
    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| **c != EMPTY_CHAR).count()
    }

    /// The whole buffer as a row-major string
    pub fn data(&self) -> String {
        self.cells.iter().collect()
    }

    /// Replace the whole buffer. The data must hold exactly `tile_size²` characters.
    pub fn replace_data(&mut self, data: &str) -> Result<()> {
        let cells: Vec<char> = data.chars().collect();
        if cells.len() != self.cells.len() {
            return Err(DocumentError::SchemaInvalid(format!(
                "tile {},{} expects {} characters, got {}",
                self.x,
                self.y,
                self.cells.len(),
                cells.len()
            )));
        }
        self.cells = cells;
        Ok(())
    }

    pub fn serialize(&self) -> TileModel {
        TileModel {
            tile_size: self.tile_size,
            x: self.x,
            y: self.y,
            data: self.data(),
        }
    }

    pub fn deserialize(model: &TileModel) -> Result<Self> {
        if model.tile_size == 0 {
            return Err(DocumentError::SchemaInvalid(format!(
                "tile {},{} has zero tile size",
                model.x, model.y
            )));
        }
        let mut tile = Tile::new(model.tile_size, model.x, model.y);
        tile.replace_data(&model.data)?;
        Ok(tile)
    }
}
