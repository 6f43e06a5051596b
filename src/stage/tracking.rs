use crate::analysis::sampler::{AnalysisSampler, SamplerOpts};
use crate::analysis::tracker::{TargetMode, TargetTracker, TrackedPoint, TrackerOpts};
use crate::foundation::core::{Point, Rgba8};
use crate::foundation::error::{FxError, FxResult};
use crate::foundation::math::mul_div255_u8;
use crate::pipeline::compositor::FrameCompositor;
use crate::pipeline::context::FrameContext;
use crate::render::surface::RenderSurface;
use crate::schema::params::{ParamSchema, ParamSpec, ParamValues};
use crate::stage::{Stage, StageInput, publish_output, resolve_source};

const DEFAULT_MARKER: Rgba8 = [255, 64, 32, 255];

/// Options for a [`TrackingStage`].
#[derive(Debug, Clone, Copy)]
pub struct TrackingOpts {
    /// Tracker configuration.
    pub tracker: TrackerOpts,
    /// Analysis surface configuration.
    pub sampler: SamplerOpts,
    /// Color multiplier applied before analysis.
    pub gain: f32,
    /// Marker half-size in output pixels; `0` draws nothing.
    pub marker_radius: u32,
    /// Marker color, premultiplied.
    pub marker_rgba: Rgba8,
}

impl Default for TrackingOpts {
    fn default() -> Self {
        Self {
            tracker: TrackerOpts::default(),
            sampler: SamplerOpts::default(),
            gain: 1.0,
            marker_radius: 3,
            marker_rgba: DEFAULT_MARKER,
        }
    }
}

impl TrackingOpts {
    /// Return options with explicit tracker settings.
    pub fn with_tracker(mut self, tracker: TrackerOpts) -> Self {
        self.tracker = tracker;
        self
    }

    /// Return options with explicit sampler settings.
    pub fn with_sampler(mut self, sampler: SamplerOpts) -> Self {
        self.sampler = sampler;
        self
    }

    /// Return options with an analysis gain.
    pub fn with_gain(mut self, gain: f32) -> Self {
        self.gain = gain;
        self
    }

    /// Return options with a marker size; `0` disables the overlay.
    pub fn with_marker_radius(mut self, marker_radius: u32) -> Self {
        self.marker_radius = marker_radius;
        self
    }
}

/// Tracks bright, dark or colored spots and draws a marker over each one.
#[derive(Debug)]
pub struct TrackingStage {
    compositor: FrameCompositor,
    sampler: AnalysisSampler,
    tracker: TargetTracker,
    gain: f32,
    marker_radius: u32,
    marker_rgba: Rgba8,
    output: Option<RenderSurface>,
}

impl TrackingStage {
    /// Create a tracking stage.
    pub fn new(opts: TrackingOpts) -> Self {
        Self {
            compositor: FrameCompositor::default(),
            sampler: AnalysisSampler::new(opts.sampler),
            tracker: TargetTracker::new(opts.tracker),
            gain: opts.gain,
            marker_radius: opts.marker_radius,
            marker_rgba: opts.marker_rgba,
            output: None,
        }
    }

    /// Tracker state.
    pub fn tracker(&self) -> &TargetTracker {
        &self.tracker
    }

    /// Smoothed points from the latest frame.
    pub fn points(&self) -> &[TrackedPoint] {
        self.tracker.points()
    }

    /// Analysis sampler.
    pub fn sampler(&self) -> &AnalysisSampler {
        &self.sampler
    }

    /// Parameters this stage exposes to hosts.
    pub fn param_schema() -> FxResult<ParamSchema> {
        let d = TrackerOpts::default();
        ParamSchema::new(vec![
            ParamSpec::number("count", d.count as f64, 1.0, 32.0).with_step(1.0),
            ParamSpec::select("mode", "brightness", ["brightness", "color"]),
            ParamSpec::boolean("invert", false),
            ParamSpec::color("target_color", "#ffffff"),
            ParamSpec::number("threshold", f64::from(d.threshold), 0.0, 1.0).with_step(0.01),
            ParamSpec::number("min_separation", f64::from(d.min_separation), 0.0, 128.0)
                .with_step(0.5),
            ParamSpec::number("trail", f64::from(d.trail), 0.0, 0.99).with_step(0.01),
            ParamSpec::number("trail_len", d.trail_len as f64, 0.0, 128.0).with_step(1.0),
            ParamSpec::number("gain", 1.0, 0.0, 8.0).with_step(0.05),
        ])
    }

    /// Resolve host values against [`TrackingStage::param_schema`] and apply them.
    pub fn apply_params(&mut self, values: &ParamValues) -> FxResult<()> {
        let schema = Self::param_schema()?;
        let mode = match schema.resolve_select("mode", values)? {
            "color" => TargetMode::Color {
                rgb: schema.resolve_color("target_color", values)?,
            },
            _ => TargetMode::Brightness {
                invert: schema.resolve_bool("invert", values)?,
            },
        };
        let opts = TrackerOpts {
            count: schema.resolve_number("count", values)? as usize,
            mode,
            threshold: schema.resolve_number("threshold", values)? as f32,
            min_separation: schema.resolve_number("min_separation", values)? as f32,
            trail: schema.resolve_number("trail", values)? as f32,
            trail_len: schema.resolve_number("trail_len", values)? as usize,
        };
        self.tracker.set_opts(opts);
        self.gain = schema.resolve_number("gain", values)? as f32;
        Ok(())
    }
}

impl Default for TrackingStage {
    fn default() -> Self {
        Self::new(TrackingOpts::default())
    }
}

impl Stage for TrackingStage {
    fn name(&self) -> &'static str {
        "track"
    }

    #[tracing::instrument(skip_all, fields(global = input.is_global))]
    fn render_frame(
        &mut self,
        ctx: &mut FrameContext<'_>,
        input: &StageInput<'_>,
    ) -> FxResult<Vec<Point>> {
        let source = resolve_source(&mut self.compositor, ctx, input)?.surface();

        self.sampler.configure(Some(source), self.gain);
        let readback = self.sampler.readback(ctx.renderer());
        let aspect = input.size.aspect();
        self.tracker.update_from(&readback, aspect);

        if self.output.as_ref().is_none_or(RenderSurface::is_disposed) {
            self.output = Some(RenderSurface::with_size(input.size));
        }
        let Some(out) = self.output.as_mut() else {
            return Err(FxError::missing_context("tracking output unavailable"));
        };
        out.resize(input.size);
        out.copy_from(source)?;

        let mut markers = Vec::new();
        for p in self.tracker.points().iter().filter(|p| p.is_active()) {
            draw_marker(out, p.uv(aspect), self.marker_radius, self.marker_rgba);
            markers.push(p.position());
        }

        publish_output(ctx, input, out)?;
        Ok(markers)
    }

    fn output(&self) -> Option<&RenderSurface> {
        self.output.as_ref().filter(|o| !o.is_disposed())
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.tracker.set_enabled(enabled);
    }

    fn dispose(&mut self) {
        self.compositor.dispose();
        self.sampler.dispose();
        if let Some(o) = self.output.as_mut() {
            o.dispose();
        }
        self.output = None;
        self.tracker.reset();
    }
}

/// Composite a filled square centered on `uv` (texture space) source-over onto `dst`.
fn draw_marker(dst: &mut RenderSurface, uv: Point, radius: u32, rgba: Rgba8) {
    if radius == 0 {
        return;
    }
    let (w, h) = (i64::from(dst.width()), i64::from(dst.height()));
    let cx = (uv.x * w as f64).floor() as i64;
    let cy = (uv.y * h as f64).floor() as i64;
    let r = i64::from(radius);
    let inv_a = 255 - u16::from(rgba[3]);
    for y in (cy - r).max(0)..=(cy + r).min(h - 1) {
        for x in (cx - r).max(0)..=(cx + r).min(w - 1) {
            let d = dst.pixel(x as u32, y as u32);
            let mut px = [0u8; 4];
            for c in 0..4 {
                px[c] = rgba[c].saturating_add(mul_div255_u8(u16::from(d[c]), inv_a));
            }
            dst.set_pixel(x as u32, y as u32, px);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stage/tracking.rs"]
mod tests;
