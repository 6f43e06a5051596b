use crate::foundation::core::{FilterMode, PixelFormat, Rgba8, SurfaceDesc, SurfaceSize};
use crate::foundation::error::{FxError, FxResult};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a [`RenderSurface`].
///
/// Identity survives [`RenderSurface::resize`]; only [`RenderSurface::create`] mints a new one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(u64);

impl SurfaceId {
    fn next() -> Self {
        Self(NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value, for logging.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Offscreen RGBA8 image with an explicit create/resize/dispose lifecycle.
///
/// Pixels are premultiplied, tightly packed and row-major. A surface is owned by exactly one
/// stage; disposing it releases the pixel storage and is idempotent.
#[derive(Debug)]
pub struct RenderSurface {
    id: SurfaceId,
    desc: SurfaceDesc,
    data: Vec<u8>,
    disposed: bool,
}

impl RenderSurface {
    /// Allocate a transparent surface.
    pub fn create(desc: SurfaceDesc) -> Self {
        let id = SurfaceId::next();
        tracing::debug!(
            surface = id.get(),
            width = desc.size.width,
            height = desc.size.height,
            "create surface"
        );
        Self {
            id,
            desc,
            data: vec![0; desc.size.byte_len()],
            disposed: false,
        }
    }

    /// Allocate a default-format surface of `size`.
    pub fn with_size(size: SurfaceSize) -> Self {
        Self::create(SurfaceDesc::new(size))
    }

    /// Allocate a surface filled with a single color.
    pub fn solid(size: SurfaceSize, rgba: Rgba8) -> Self {
        let mut s = Self::with_size(size);
        s.fill(rgba);
        s
    }

    /// Build a surface from premultiplied RGBA8 bytes.
    pub fn from_premul_bytes(size: SurfaceSize, bytes: Vec<u8>) -> FxResult<Self> {
        if bytes.len() != size.byte_len() {
            return Err(FxError::validation(format!(
                "expected {} bytes for {}x{}, got {}",
                size.byte_len(),
                size.width,
                size.height,
                bytes.len()
            )));
        }
        let mut s = Self::create(SurfaceDesc::new(size));
        s.data = bytes;
        Ok(s)
    }

    /// Build a surface from a straight-alpha `image` buffer.
    pub fn from_rgba_image(img: &image::RgbaImage) -> FxResult<Self> {
        let size = SurfaceSize::new(img.width(), img.height());
        let mut bytes = img.as_raw().clone();
        premultiply_in_place(&mut bytes);
        Self::from_premul_bytes(size, bytes)
    }

    /// Copy the surface into a straight-alpha `image` buffer.
    pub fn to_rgba_image(&self) -> FxResult<image::RgbaImage> {
        self.ensure_live()?;
        let mut bytes = self.data.clone();
        unpremultiply_in_place(&mut bytes);
        image::RgbaImage::from_raw(self.width(), self.height(), bytes)
            .ok_or_else(|| FxError::validation("surface byte length does not match its size"))
    }

    /// Identity of this surface.
    pub fn id(&self) -> SurfaceId {
        self.id
    }

    /// Allocation descriptor.
    pub fn desc(&self) -> SurfaceDesc {
        self.desc
    }

    /// Pixel dimensions.
    pub fn size(&self) -> SurfaceSize {
        self.desc.size
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.desc.size.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.desc.size.height
    }

    /// Storage format.
    pub fn format(&self) -> PixelFormat {
        self.desc.format
    }

    /// Sampling filter.
    pub fn filter(&self) -> FilterMode {
        self.desc.filter
    }

    /// Change the sampling filter in place.
    pub fn set_filter(&mut self, filter: FilterMode) {
        self.desc.filter = filter;
    }

    /// Resize in place, keeping identity. Returns `true` when the size changed.
    ///
    /// Contents are cleared to transparent on a real resize. Disposed surfaces ignore resizes.
    pub fn resize(&mut self, size: SurfaceSize) -> bool {
        if self.disposed || self.desc.size == size {
            return false;
        }
        tracing::debug!(
            surface = self.id.get(),
            from_w = self.desc.size.width,
            from_h = self.desc.size.height,
            to_w = size.width,
            to_h = size.height,
            "resize surface"
        );
        self.desc.size = size;
        self.data.clear();
        self.data.resize(size.byte_len(), 0);
        true
    }

    /// Release pixel storage. Safe to call more than once.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        tracing::debug!(surface = self.id.get(), "dispose surface");
        self.disposed = true;
        self.data = Vec::new();
    }

    /// Return `true` once [`RenderSurface::dispose`] has run.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Borrow the pixel bytes. Empty after dispose.
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Mutably borrow the pixel bytes. Empty after dispose.
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Read one pixel. Out-of-range coordinates and disposed surfaces read as transparent.
    pub fn pixel(&self, x: u32, y: u32) -> Rgba8 {
        if self.disposed || x >= self.width() || y >= self.height() {
            return [0; 4];
        }
        let i = self.offset(x, y);
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// Write one pixel. Out-of-range coordinates are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: Rgba8) {
        if self.disposed || x >= self.width() || y >= self.height() {
            return;
        }
        let i = self.offset(x, y);
        self.data[i..i + 4].copy_from_slice(&rgba);
    }

    /// Fill every pixel with `rgba`.
    pub fn fill(&mut self, rgba: Rgba8) {
        for px in self.data.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }

    /// Copy `src` into this surface.
    ///
    /// Equal sizes copy bytes directly; otherwise `src` is resampled with this surface's filter.
    pub fn copy_from(&mut self, src: &RenderSurface) -> FxResult<()> {
        self.ensure_live()?;
        src.ensure_live()?;
        if self.id == src.id {
            return Err(FxError::ordering("surface copied onto itself"));
        }
        if self.size() == src.size() {
            self.data.copy_from_slice(&src.data);
            return Ok(());
        }
        match self.desc.filter {
            FilterMode::Nearest => resample_nearest(src, self),
            FilterMode::Linear => resample_bilinear(src, self),
        }
        Ok(())
    }

    pub(crate) fn ensure_live(&self) -> FxResult<()> {
        if self.disposed {
            return Err(FxError::validation(format!(
                "surface {} used after dispose",
                self.id.get()
            )));
        }
        Ok(())
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width() as usize) + (x as usize)) * 4
    }
}

fn resample_nearest(src: &RenderSurface, dst: &mut RenderSurface) {
    let (sw, sh) = (src.width() as usize, src.height() as usize);
    let (dw, dh) = (dst.width() as usize, dst.height() as usize);
    for y in 0..dh {
        let sy = (y * sh / dh).min(sh - 1);
        for x in 0..dw {
            let sx = (x * sw / dw).min(sw - 1);
            let s = (sy * sw + sx) * 4;
            let d = (y * dw + x) * 4;
            dst.data[d..d + 4].copy_from_slice(&src.data[s..s + 4]);
        }
    }
}

fn resample_bilinear(src: &RenderSurface, dst: &mut RenderSurface) {
    let (sw, sh) = (src.width() as usize, src.height() as usize);
    let (dw, dh) = (dst.width() as usize, dst.height() as usize);
    let sx_scale = sw as f32 / dw as f32;
    let sy_scale = sh as f32 / dh as f32;
    for y in 0..dh {
        let fy = ((y as f32 + 0.5) * sy_scale - 0.5).clamp(0.0, (sh - 1) as f32);
        let y0 = fy.floor() as usize;
        let y1 = (y0 + 1).min(sh - 1);
        let ty = fy - y0 as f32;
        for x in 0..dw {
            let fx = ((x as f32 + 0.5) * sx_scale - 0.5).clamp(0.0, (sw - 1) as f32);
            let x0 = fx.floor() as usize;
            let x1 = (x0 + 1).min(sw - 1);
            let tx = fx - x0 as f32;
            let d = (y * dw + x) * 4;
            for c in 0..4 {
                let p00 = f32::from(src.data[(y0 * sw + x0) * 4 + c]);
                let p10 = f32::from(src.data[(y0 * sw + x1) * 4 + c]);
                let p01 = f32::from(src.data[(y1 * sw + x0) * 4 + c]);
                let p11 = f32::from(src.data[(y1 * sw + x1) * 4 + c]);
                let top = p00 + (p10 - p00) * tx;
                let bottom = p01 + (p11 - p01) * tx;
                dst.data[d + c] = (top + (bottom - top) * ty).round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}

fn premultiply_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * a + 127) / 255) as u8;
        }
    }
}

fn unpremultiply_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
