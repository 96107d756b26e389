//! Rendering surface a capture device binds to

/// Default surface identifier
pub const DEFAULT_SURFACE_ID: &str = "camera";

/// Default surface width in pixels
pub const DEFAULT_SURFACE_WIDTH: u32 = 640;

/// Default surface height in pixels
pub const DEFAULT_SURFACE_HEIGHT: u32 = 480;

/// A named rendering target. Snapshots are rastered at its size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    id: String,
    width: u32,
    height: u32,
}

impl Surface {
    /// Create a surface. Zero dimensions are bumped to one pixel.
    pub fn new(id: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

impl Default for Surface {
    fn default() -> Self {
        Self::new(DEFAULT_SURFACE_ID, DEFAULT_SURFACE_WIDTH, DEFAULT_SURFACE_HEIGHT)
    }
}
