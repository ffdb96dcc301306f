use serde::{Deserialize, Serialize};

use crate::constants::{MAX_CAMERA_SCALE, MIN_CAMERA_SCALE};
use crate::types::TileCoord;

/// Viewport position and zoom, persisted with the document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Camera {
    pub offset_x: f64,
    pub offset_y: f64,
    pub scale: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            scale: 1.0,
        }
    }
}

impl Camera {
    /// Move the viewport by a screen-space delta
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.offset_x -= dx / self.scale;
        self.offset_y -= dy / self.scale;
    }

    /// Multiply the zoom level, clamped to the supported range
    pub fn zoom(&mut self, factor: f64) {
        self.set_scale(self.scale * factor);
    }

    pub fn set_scale(&mut self, scale: f64) {
        if scale.is_finite() {
            self.scale = scale.clamp(MIN_CAMERA_SCALE, MAX_CAMERA_SCALE);
        }
    }

    /// Screen position to world (character) position
    pub fn screen_to_world(&self, screen_x: f64, screen_y: f64) -> (f64, f64) {
        (
            screen_x / self.scale + self.offset_x,
            screen_y / self.scale + self.offset_y,
        )
    }

    /// Tile containing a world (character) position
    pub fn world_to_tile(&self, world_x: f64, world_y: f64, tile_size: u32) -> TileCoord {
        let size = f64::from(tile_size.max(1));
        TileCoord::new(
            (world_x / size).floor() as i32,
            (world_y / size).floor() as i32,
        )
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.offset_x.is_finite() && self.offset_y.is_finite() && self.scale.is_finite() && self.scale > 0.0
    }
}
