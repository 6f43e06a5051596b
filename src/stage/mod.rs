//! Stage contract and the reference stages built on the shared core.
//!
//! A stage turns one frame of input (an external source, or a capture of the whole scene in
//! global mode) into a drawable image plus optional marker positions. Hosts hold stages in
//! [`slot::StageSlot`]s so one failing stage degrades to its last good frame instead of
//! taking the host loop down.

use crate::foundation::core::{Point, SurfaceSize};
use crate::foundation::error::{FxError, FxResult};
use crate::pipeline::compositor::{FrameCompositor, SceneSource};
use crate::pipeline::context::FrameContext;
use crate::render::scene::NodeId;
use crate::render::surface::RenderSurface;

/// Datamosh-style hold through the feedback pipeline.
pub mod hold;
/// Failure containment and lifecycle around a stage.
pub mod slot;
/// Salient-point tracking with marker overlay.
pub mod tracking;

/// Per-frame input handed to a stage.
#[derive(Debug, Clone, Copy)]
pub struct StageInput<'a> {
    /// External source image; ignored in global mode.
    pub source: Option<&'a RenderSurface>,
    /// Capture the whole scene instead of using `source`.
    pub is_global: bool,
    /// Composition size in pixels.
    pub size: SurfaceSize,
    /// Scene node showing this stage's output, hidden during its own captures.
    pub own_node: Option<NodeId>,
}

impl<'a> StageInput<'a> {
    /// Input fed by an external source.
    pub fn external(source: &'a RenderSurface, size: SurfaceSize) -> Self {
        Self {
            source: Some(source),
            is_global: false,
            size,
            own_node: None,
        }
    }

    /// Input captured from the scene, excluding `own_node`.
    pub fn global(size: SurfaceSize, own_node: Option<NodeId>) -> Self {
        Self {
            source: None,
            is_global: true,
            size,
            own_node,
        }
    }

    /// Return this input with the stage's scene node set.
    pub fn with_own_node(mut self, own_node: NodeId) -> Self {
        self.own_node = Some(own_node);
        self
    }
}

/// One visual-effect unit.
pub trait Stage {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Render one frame and return marker positions in normalized device coordinates.
    ///
    /// On error the previous [`Stage::output`] must still be displayable.
    fn render_frame(
        &mut self,
        ctx: &mut FrameContext<'_>,
        input: &StageInput<'_>,
    ) -> FxResult<Vec<Point>>;

    /// Latest displayable image.
    fn output(&self) -> Option<&RenderSurface>;

    /// Called when the host toggles the stage.
    fn set_enabled(&mut self, _enabled: bool) {}

    /// Release every surface the stage owns. Idempotent.
    fn dispose(&mut self);
}

/// Pick this frame's input image: a scene capture in global mode, the external source otherwise.
///
/// Errors when there is nothing usable yet, so the caller keeps its last output.
pub(crate) fn resolve_source<'a>(
    compositor: &'a mut FrameCompositor,
    ctx: &mut FrameContext<'_>,
    input: &StageInput<'a>,
) -> FxResult<SceneSource<'a>> {
    if input.is_global {
        let source = compositor.capture(ctx, input.own_node, input.size);
        if source.is_placeholder() {
            return Err(FxError::missing_context("no scene captured yet"));
        }
        return Ok(source);
    }
    match input.source {
        Some(s) if !s.is_disposed() => Ok(SceneSource::Fresh(s)),
        _ => Err(FxError::missing_context("no source image")),
    }
}

/// Show `surface` in the stage's scene node when both exist.
pub(crate) fn publish_output(
    ctx: &mut FrameContext<'_>,
    input: &StageInput<'_>,
    surface: &RenderSurface,
) -> FxResult<()> {
    match input.own_node {
        Some(node) if ctx.scene.is_some() => FrameCompositor::publish(ctx, node, surface),
        _ => Ok(()),
    }
}
