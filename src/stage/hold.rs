use crate::foundation::core::Point;
use crate::foundation::error::FxResult;
use crate::pipeline::compositor::FrameCompositor;
use crate::pipeline::context::FrameContext;
use crate::pipeline::feedback::{FeedbackOpts, FeedbackPipeline, HoldBlend, HoldBlendParams};
use crate::render::surface::RenderSurface;
use crate::schema::params::{ParamSchema, ParamSpec, ParamValues};
use crate::stage::{Stage, StageInput, publish_output, resolve_source};

/// Holds pixels that barely change between frames, smearing motion across the image.
#[derive(Debug, Default)]
pub struct HoldStage {
    compositor: FrameCompositor,
    feedback: FeedbackPipeline,
    blend: HoldBlend,
}

impl HoldStage {
    /// Create a hold stage with default feedback options.
    pub fn new(params: HoldBlendParams) -> Self {
        Self::with_opts(params, FeedbackOpts::default())
    }

    /// Create a hold stage with explicit feedback options.
    pub fn with_opts(params: HoldBlendParams, opts: FeedbackOpts) -> Self {
        Self {
            compositor: FrameCompositor::default(),
            feedback: FeedbackPipeline::new(opts),
            blend: HoldBlend::new(params),
        }
    }

    /// Current blend parameters.
    pub fn params(&self) -> HoldBlendParams {
        self.blend.params
    }

    /// Parameters this stage exposes to hosts.
    pub fn param_schema() -> FxResult<ParamSchema> {
        let d = HoldBlendParams::default();
        ParamSchema::new(vec![
            ParamSpec::number("hold_strength", f64::from(d.hold_strength), 0.0, 1.0)
                .with_step(0.01),
            ParamSpec::number("threshold", f64::from(d.threshold), 0.0, 1.0).with_step(0.01),
            ParamSpec::number("decay", f64::from(d.decay), 0.0, 1.0).with_step(0.005),
        ])
    }

    /// Resolve host values against [`HoldStage::param_schema`] and apply them.
    pub fn apply_params(&mut self, values: &ParamValues) -> FxResult<()> {
        let schema = Self::param_schema()?;
        self.blend.params = HoldBlendParams {
            hold_strength: schema.resolve_number("hold_strength", values)? as f32,
            threshold: schema.resolve_number("threshold", values)? as f32,
            decay: schema.resolve_number("decay", values)? as f32,
        };
        Ok(())
    }

    /// Compositor used in global mode.
    pub fn compositor(&self) -> &FrameCompositor {
        &self.compositor
    }

    /// Feedback state.
    pub fn feedback(&self) -> &FeedbackPipeline {
        &self.feedback
    }
}

impl Stage for HoldStage {
    fn name(&self) -> &'static str {
        "hold"
    }

    #[tracing::instrument(skip_all, fields(global = input.is_global))]
    fn render_frame(
        &mut self,
        ctx: &mut FrameContext<'_>,
        input: &StageInput<'_>,
    ) -> FxResult<Vec<Point>> {
        let source = resolve_source(&mut self.compositor, ctx, input)?;
        let shown = self.feedback.run_frame(source.surface(), &mut self.blend)?;
        publish_output(ctx, input, shown)?;
        Ok(Vec::new())
    }

    fn output(&self) -> Option<&RenderSurface> {
        self.feedback.current()
    }

    fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.feedback.reset();
        }
    }

    fn dispose(&mut self) {
        self.compositor.dispose();
        self.feedback.dispose();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stage/hold.rs"]
mod tests;
