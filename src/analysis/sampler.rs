use crate::foundation::core::SurfaceSize;
use crate::foundation::error::FxError;
use crate::foundation::math::{to_u8, unit};
use crate::render::renderer::Renderer;
use crate::render::surface::RenderSurface;

const DEFAULT_ANALYSIS_SIZE: u32 = 128;
const MIN_ANALYSIS_SIZE: u32 = 16;
const MAX_ANALYSIS_SIZE: u32 = 512;

/// Options for an [`AnalysisSampler`].
#[derive(Debug, Clone, Copy)]
pub struct SamplerOpts {
    pub(crate) size: u32,
}

impl SamplerOpts {
    /// Return options with a square analysis surface of side `size`, clamped to `16..=512`.
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size.clamp(MIN_ANALYSIS_SIZE, MAX_ANALYSIS_SIZE);
        self
    }

    /// Side length of the analysis surface.
    pub fn size(&self) -> u32 {
        self.size
    }
}

impl Default for SamplerOpts {
    fn default() -> Self {
        let size = std::env::var("FRAMEFX_ANALYSIS_SIZE")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_ANALYSIS_SIZE);
        Self {
            size: size.clamp(MIN_ANALYSIS_SIZE, MAX_ANALYSIS_SIZE),
        }
    }
}

/// Provenance of the bytes returned by [`AnalysisSampler::readback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadbackStatus {
    /// Read back this frame.
    Fresh,
    /// This frame failed; these are the last good bytes.
    Stale,
    /// Nothing was ever read back; all zeros.
    Empty,
}

/// One frame of analysis pixels.
#[derive(Debug, Clone, Copy)]
pub struct Readback<'a> {
    /// RGBA8 bytes, `width * height * 4` long.
    pub data: &'a [u8],
    /// Analysis width in pixels.
    pub width: u32,
    /// Analysis height in pixels.
    pub height: u32,
    /// Where the bytes came from.
    pub status: ReadbackStatus,
}

/// Downsamples a source onto a small square surface so per-pixel CPU inspection stays cheap.
///
/// The readback is the one synchronous, pipeline-flushing operation in the core; it only ever
/// touches the analysis surface, never the full-resolution source.
#[derive(Debug)]
pub struct AnalysisSampler {
    surface: RenderSurface,
    gain: f32,
    ready: bool,
    last_good: Option<Vec<u8>>,
    scratch: Vec<u8>,
    zeros: Vec<u8>,
}

impl AnalysisSampler {
    /// Allocate the analysis surface.
    pub fn new(opts: SamplerOpts) -> Self {
        let size = SurfaceSize::square(opts.size);
        Self {
            surface: RenderSurface::with_size(size),
            gain: 1.0,
            ready: false,
            last_good: None,
            scratch: Vec::with_capacity(size.byte_len()),
            zeros: vec![0; size.byte_len()],
        }
    }

    /// Analysis surface dimensions.
    pub fn size(&self) -> SurfaceSize {
        self.surface.size()
    }

    /// The downsampled surface.
    pub fn surface(&self) -> &RenderSurface {
        &self.surface
    }

    /// Gain applied by the last [`AnalysisSampler::configure`].
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Downsample `source` with color pre-multiplied by `gain` and clamped to `[0, 1]`.
    ///
    /// Returns `false` when the source is unavailable; the next readback then serves the
    /// previous good buffer.
    pub fn configure(&mut self, source: Option<&RenderSurface>, gain: f32) -> bool {
        self.gain = if gain.is_finite() { gain.max(0.0) } else { 1.0 };
        match source {
            Some(src) if !src.is_disposed() && !self.surface.is_disposed() => {
                downsample_box(src, &mut self.surface, self.gain);
                self.ready = true;
            }
            _ => {
                self.ready = false;
            }
        }
        self.ready
    }

    /// Synchronously read the analysis surface back.
    ///
    /// Never fails: an unavailable source, a missing renderer or a failed readback serve the last
    /// good buffer, or zeros when there is none.
    pub fn readback(&mut self, renderer: Option<&mut dyn Renderer>) -> Readback<'_> {
        let fresh = self.ready && self.try_readback(renderer);
        self.ready = false;
        let size = self.surface.size();
        let (data, status) = match (&self.last_good, fresh) {
            (Some(buf), true) => (buf.as_slice(), ReadbackStatus::Fresh),
            (Some(buf), false) => (buf.as_slice(), ReadbackStatus::Stale),
            (None, _) => (self.zeros.as_slice(), ReadbackStatus::Empty),
        };
        Readback {
            data,
            width: size.width,
            height: size.height,
            status,
        }
    }

    /// Release the analysis surface. Idempotent.
    pub fn dispose(&mut self) {
        self.surface.dispose();
        self.ready = false;
    }

    fn try_readback(&mut self, renderer: Option<&mut dyn Renderer>) -> bool {
        let Some(renderer) = renderer else {
            tracing::warn!("analysis readback skipped: renderer is not live");
            return false;
        };
        let expected = self.surface.size().byte_len();
        let res = renderer
            .read_pixels(&self.surface, &mut self.scratch)
            .and_then(|()| {
                if self.scratch.len() == expected {
                    Ok(())
                } else {
                    Err(FxError::readback(format!(
                        "expected {expected} bytes, got {}",
                        self.scratch.len()
                    )))
                }
            });
        match res {
            Ok(()) => {
                let buf = self.last_good.get_or_insert_with(Vec::new);
                std::mem::swap(buf, &mut self.scratch);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "analysis readback failed; serving last good buffer");
                false
            }
        }
    }
}

/// Area-average `src` into `dst`; each source pixel's color is scaled by `gain` and clamped first.
fn downsample_box(src: &RenderSurface, dst: &mut RenderSurface, gain: f32) {
    let (sw, sh) = (src.width() as usize, src.height() as usize);
    let (dw, dh) = (dst.width() as usize, dst.height() as usize);
    let s = src.pixels();
    let d = dst.pixels_mut();
    for dy in 0..dh {
        let y0 = dy * sh / dh;
        let y1 = ((dy + 1) * sh / dh).max(y0 + 1).min(sh);
        for dx in 0..dw {
            let x0 = dx * sw / dw;
            let x1 = ((dx + 1) * sw / dw).max(x0 + 1).min(sw);
            let mut rgb = [0f32; 3];
            let mut alpha = 0u64;
            for y in y0..y1 {
                let row = y * sw;
                for x in x0..x1 {
                    let i = (row + x) * 4;
                    for (acc, &v) in rgb.iter_mut().zip(&s[i..i + 3]) {
                        *acc += (unit(v) * gain).min(1.0);
                    }
                    alpha += u64::from(s[i + 3]);
                }
            }
            let n = ((y1 - y0) * (x1 - x0)) as f32;
            let o = (dy * dw + dx) * 4;
            for (out, acc) in d[o..o + 3].iter_mut().zip(rgb) {
                *out = to_u8(acc / n);
            }
            d[o + 3] = to_u8(alpha as f32 / n / 255.0);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/analysis/sampler.rs"]
mod tests;
