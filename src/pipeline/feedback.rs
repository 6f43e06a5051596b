use crate::foundation::core::{FilterMode, PixelFormat, SurfaceDesc};
use crate::foundation::error::{FxError, FxResult};
use crate::foundation::math::lerp_u8;
use crate::render::feedback_pair::{FeedbackBufferPair, OrderingPolicy};
use crate::render::surface::RenderSurface;

/// Per-frame transform combining the previous frame with the current source.
///
/// Implementations write the complete new frame into `dst`. `prev` and `dst` are guaranteed to
/// be different surfaces of the same size as `source`.
pub trait BlendTransform {
    /// Produce the next frame from `prev` and `source` into `dst`.
    fn blend(
        &mut self,
        prev: &RenderSurface,
        source: &RenderSurface,
        dst: &mut RenderSurface,
    ) -> FxResult<()>;
}

impl<F> BlendTransform for F
where
    F: FnMut(&RenderSurface, &RenderSurface, &mut RenderSurface) -> FxResult<()>,
{
    fn blend(
        &mut self,
        prev: &RenderSurface,
        source: &RenderSurface,
        dst: &mut RenderSurface,
    ) -> FxResult<()> {
        self(prev, source, dst)
    }
}

/// Blend that shows the source unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityBlend;

impl BlendTransform for IdentityBlend {
    fn blend(
        &mut self,
        _prev: &RenderSurface,
        source: &RenderSurface,
        dst: &mut RenderSurface,
    ) -> FxResult<()> {
        dst.copy_from(source)
    }
}

/// Parameters of [`HoldBlend`], passed through unmodified from the stage's schema.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct HoldBlendParams {
    /// Preference for the previous frame where change is small, `[0, 1]`.
    pub hold_strength: f32,
    /// Per-pixel change magnitude below which holding kicks in, `[0, 1]`.
    pub threshold: f32,
    /// Fraction of the source leaking back every frame, `[0, 1]`.
    pub decay: f32,
}

impl Default for HoldBlendParams {
    fn default() -> Self {
        Self {
            hold_strength: 0.9,
            threshold: 0.1,
            decay: 0.02,
        }
    }
}

/// Datamosh-style hold: pixels that barely changed keep their previous value, with a slow
/// leak of the source so the loop cannot lock up forever.
#[derive(Debug, Default, Clone, Copy)]
pub struct HoldBlend {
    /// Blend parameters.
    pub params: HoldBlendParams,
}

impl HoldBlend {
    /// Create a hold blend.
    pub fn new(params: HoldBlendParams) -> Self {
        Self { params }
    }
}

impl BlendTransform for HoldBlend {
    fn blend(
        &mut self,
        prev: &RenderSurface,
        source: &RenderSurface,
        dst: &mut RenderSurface,
    ) -> FxResult<()> {
        let (p, s) = (prev.pixels(), source.pixels());
        if p.len() != s.len() || dst.pixels().len() != s.len() || !s.len().is_multiple_of(4) {
            return Err(FxError::validation(
                "hold blend expects equal-length rgba8 buffers",
            ));
        }
        let hold = self.params.hold_strength.clamp(0.0, 1.0);
        let threshold = (self.params.threshold.clamp(0.0, 1.0) * 255.0).round() as u8;
        let decay = self.params.decay.clamp(0.0, 1.0);

        for ((d, p), s) in dst
            .pixels_mut()
            .chunks_exact_mut(4)
            .zip(p.chunks_exact(4))
            .zip(s.chunks_exact(4))
        {
            let change = (0..3).map(|i| p[i].abs_diff(s[i])).max().unwrap_or(0);
            for i in 0..4 {
                let held = if change < threshold {
                    lerp_u8(s[i], p[i], hold)
                } else {
                    s[i]
                };
                d[i] = lerp_u8(held, s[i], decay);
            }
        }
        Ok(())
    }
}

/// Options for a [`FeedbackPipeline`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedbackOpts {
    pub(crate) policy: OrderingPolicy,
    pub(crate) format: PixelFormat,
    pub(crate) filter: FilterMode,
}

impl FeedbackOpts {
    /// Return options with an explicit ordering policy.
    pub fn with_policy(mut self, policy: OrderingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Return options with an explicit buffer format.
    pub fn with_format(mut self, format: PixelFormat) -> Self {
        self.format = format;
        self
    }
}

/// Drives capture → read previous → write next → swap once per frame.
///
/// Buffers are allocated lazily at the first source's size and follow later size changes in
/// place (re-priming after a resize).
#[derive(Debug, Default)]
pub struct FeedbackPipeline {
    opts: FeedbackOpts,
    pair: Option<FeedbackBufferPair>,
    frames: u64,
}

impl FeedbackPipeline {
    /// Create a pipeline; no buffers are allocated until the first frame.
    pub fn new(opts: FeedbackOpts) -> Self {
        Self {
            opts,
            pair: None,
            frames: 0,
        }
    }

    /// Frames completed since creation or the last reset.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Underlying buffer pair, once allocated.
    pub fn pair(&self) -> Option<&FeedbackBufferPair> {
        self.pair.as_ref()
    }

    /// Displayed surface: the most recently completed frame.
    pub fn current(&self) -> Option<&RenderSurface> {
        self.pair.as_ref().map(FeedbackBufferPair::current)
    }

    /// Run one frame of the protocol and return the surface to display.
    ///
    /// On a blend failure nothing is flipped: the previous frame stays current and the error is
    /// returned so the caller can show it.
    #[tracing::instrument(skip_all, fields(frame = self.frames, source = source.id().get()))]
    pub fn run_frame<B>(
        &mut self,
        source: &RenderSurface,
        blend: &mut B,
    ) -> FxResult<&RenderSurface>
    where
        B: BlendTransform + ?Sized,
    {
        source.ensure_live()?;
        let desc = SurfaceDesc::new(source.size())
            .with_format(self.opts.format)
            .with_filter(self.opts.filter);
        let policy = self.opts.policy;
        let pair = self
            .pair
            .get_or_insert_with(|| FeedbackBufferPair::new(desc, policy));
        if pair.is_disposed() {
            *pair = FeedbackBufferPair::new(desc, policy);
        }
        pair.resize(source.size());

        if !pair.is_primed() {
            pair.prime(source)?;
        }

        pair.write_with(|prev, dst| blend.blend(prev, source, dst))?;
        pair.advance()?;
        self.frames = self.frames.saturating_add(1);
        Ok(pair.current())
    }

    /// Forget history; the next frame primes from its source again.
    pub fn reset(&mut self) {
        if let Some(pair) = self.pair.as_mut() {
            pair.reset();
        }
        self.frames = 0;
    }

    /// Release both buffers. Idempotent.
    pub fn dispose(&mut self) {
        if let Some(pair) = self.pair.as_mut() {
            pair.dispose();
        }
        self.pair = None;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/feedback.rs"]
mod tests;
