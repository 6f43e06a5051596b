pub use kurbo::{Affine, Point, Rect, Vec2};

/// RGBA8 pixel, stored premultiplied inside surfaces.
pub type Rgba8 = [u8; 4];

/// Surface dimensions in pixels. Both sides are always at least 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SurfaceSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl SurfaceSize {
    /// Create a size, clamping zero sides to 1.
    ///
    /// Hosts emit transient zero-sized resize events (minimized windows, detached canvases);
    /// those degrade to a 1x1 surface instead of failing the frame.
    pub fn new(width: u32, height: u32) -> Self {
        if width == 0 || height == 0 {
            tracing::debug!(width, height, "clamping degenerate surface size");
        }
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Create a size from host-provided floating point dimensions.
    ///
    /// Non-finite and non-positive values clamp to 1.
    pub fn from_host(width: f64, height: f64) -> Self {
        fn side(v: f64) -> u32 {
            if !v.is_finite() || v < 1.0 {
                return 1;
            }
            v.round().min(f64::from(u32::MAX)) as u32
        }
        Self::new(side(width), side(height))
    }

    /// Square size with side `side`.
    pub fn square(side: u32) -> Self {
        Self::new(side, side)
    }

    /// Width divided by height.
    pub fn aspect(self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }

    /// Number of pixels.
    pub fn pixel_count(self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    /// Byte length of a tightly packed RGBA8 buffer of this size.
    pub fn byte_len(self) -> usize {
        self.pixel_count().saturating_mul(4)
    }
}

/// Storage format of a surface.
///
/// Both formats are 4 bytes per pixel; the tag decides whether an existing surface can be
/// reused or must be recreated.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// Linear 8-bit RGBA, premultiplied alpha.
    #[default]
    Rgba8Unorm,
    /// sRGB-encoded 8-bit RGBA, premultiplied alpha.
    Rgba8Srgb,
}

/// Sampling filter used when a surface is read at a different resolution.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Nearest-neighbour sampling.
    Nearest,
    /// Bilinear sampling.
    #[default]
    Linear,
}

/// Full description of a surface allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceDesc {
    /// Pixel dimensions.
    pub size: SurfaceSize,
    /// Storage format.
    pub format: PixelFormat,
    /// Sampling filter.
    pub filter: FilterMode,
}

impl SurfaceDesc {
    /// Default-format descriptor for `size`.
    pub fn new(size: SurfaceSize) -> Self {
        Self {
            size,
            format: PixelFormat::default(),
            filter: FilterMode::default(),
        }
    }

    /// Return a copy with a different format.
    pub fn with_format(mut self, format: PixelFormat) -> Self {
        self.format = format;
        self
    }

    /// Return a copy with a different filter.
    pub fn with_filter(mut self, filter: FilterMode) -> Self {
        self.filter = filter;
        self
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
