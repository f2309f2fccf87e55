//! Shared types for overlay surfaces and their pixel layout.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Width of every overlay surface in pixels.
pub const SURFACE_WIDTH: u32 = 512;
/// Height of every overlay surface in pixels.
pub const SURFACE_HEIGHT: u32 = 512;
/// BGRA8 pixels.
pub const BYTES_PER_PIXEL: u32 = 4;
/// Bytes per surface row.
pub const SURFACE_ROW_PITCH: u32 = SURFACE_WIDTH * BYTES_PER_PIXEL;
/// Total size of a full surface frame in bytes.
pub const SURFACE_BYTES: usize = (SURFACE_ROW_PITCH * SURFACE_HEIGHT) as usize;

/// Identifies one of the two overlay surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum SurfaceId {
    /// Head-locked surface floating in front of the headset.
    Hmd,
    /// Surface attached to the wrist (left controller).
    Wrist,
}

impl SurfaceId {
    pub const ALL: [SurfaceId; 2] = [SurfaceId::Hmd, SurfaceId::Wrist];

    /// Map the numeric id used by the host boundary (0 = HMD, 1 = wrist).
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(SurfaceId::Hmd),
            1 => Some(SurfaceId::Wrist),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        match self {
            SurfaceId::Hmd => 0,
            SurfaceId::Wrist => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SurfaceId::Hmd => "hmd",
            SurfaceId::Wrist => "wrist",
        }
    }
}

impl std::fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rectangle inside a surface, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole surface.
    pub fn full() -> Self {
        Self::new(0, 0, SURFACE_WIDTH, SURFACE_HEIGHT)
    }

    /// True when the rectangle is non-empty and lies fully inside the surface.
    pub fn fits_surface(&self) -> bool {
        let right = self.x.checked_add(self.width);
        let bottom = self.y.checked_add(self.height);

        self.width > 0
            && self.height > 0
            && matches!(right, Some(r) if r <= SURFACE_WIDTH)
            && matches!(bottom, Some(b) if b <= SURFACE_HEIGHT)
    }

    /// True when the rectangle spans whole rows.
    pub fn is_full_width(&self) -> bool {
        self.x == 0 && self.width == SURFACE_WIDTH
    }

    /// Byte offset of the rectangle's top-left pixel in a surface buffer.
    pub fn byte_offset(&self) -> usize {
        ((self.y * SURFACE_WIDTH + self.x) * BYTES_PER_PIXEL) as usize
    }

    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }
}
