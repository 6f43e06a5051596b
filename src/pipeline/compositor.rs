use crate::foundation::core::{PixelFormat, SurfaceDesc, SurfaceSize};
use crate::foundation::error::{FxError, FxResult};
use crate::pipeline::context::FrameContext;
use crate::render::renderer::{Renderer, TargetStack};
use crate::render::scene::{NodeId, Scene};
use crate::render::surface::RenderSurface;

/// Image a stage should use as this frame's scene input.
#[derive(Debug, Clone, Copy)]
pub enum SceneSource<'a> {
    /// Captured this frame.
    Fresh(&'a RenderSurface),
    /// Capture failed; this is the last successful capture.
    Stale(&'a RenderSurface),
    /// Nothing was ever captured; a 1x1 transparent surface.
    Placeholder(&'a RenderSurface),
}

impl<'a> SceneSource<'a> {
    /// The surface to read from, whatever its provenance.
    pub fn surface(self) -> &'a RenderSurface {
        match self {
            Self::Fresh(s) | Self::Stale(s) | Self::Placeholder(s) => s,
        }
    }

    /// Return `true` for a capture taken this frame.
    pub fn is_fresh(self) -> bool {
        matches!(self, Self::Fresh(_))
    }

    /// Return `true` for the neutral placeholder.
    pub fn is_placeholder(self) -> bool {
        matches!(self, Self::Placeholder(_))
    }
}

/// Capture counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CompositorStats {
    /// Successful captures.
    pub captures: u64,
    /// Frames that fell back to a stale capture or the placeholder.
    pub fallbacks: u64,
    /// Times the capture target was recreated for a format change.
    pub recreations: u64,
}

/// Captures "everything visible right now" without the calling stage's own output.
///
/// Owns one full-resolution capture target per stage. The renderer's active target and the
/// stage node's visibility are restored on every exit path, including unwinding.
#[derive(Debug)]
pub struct FrameCompositor {
    format: PixelFormat,
    capture_target: Option<RenderSurface>,
    has_capture: bool,
    placeholder: RenderSurface,
    stack: TargetStack,
    stats: CompositorStats,
}

struct CaptureGuard<'g> {
    stack: &'g mut TargetStack,
    renderer: &'g mut dyn Renderer,
    scene: &'g mut Scene,
    pushed: bool,
    hidden: Option<(NodeId, bool)>,
}

impl Drop for CaptureGuard<'_> {
    fn drop(&mut self) {
        if self.pushed {
            self.stack.pop(&mut *self.renderer);
        }
        if let Some((id, visible)) = self.hidden
            && let Err(e) = self.scene.set_visible(id, visible)
        {
            tracing::error!(node = id.0, error = %e, "failed to restore node visibility");
        }
    }
}

impl FrameCompositor {
    /// Create a compositor whose capture target uses `format`.
    pub fn new(format: PixelFormat) -> Self {
        Self {
            format,
            capture_target: None,
            has_capture: false,
            placeholder: RenderSurface::with_size(SurfaceSize::new(1, 1)),
            stack: TargetStack::new(),
            stats: CompositorStats::default(),
        }
    }

    /// Capture counters.
    pub fn stats(&self) -> CompositorStats {
        self.stats
    }

    /// Outstanding active-target saves. Zero between captures.
    pub fn stack_depth(&self) -> usize {
        self.stack.depth()
    }

    /// The capture target, once allocated.
    pub fn capture_target(&self) -> Option<&RenderSurface> {
        self.capture_target.as_ref()
    }

    /// Change the capture format. The target is recreated on the next capture.
    pub fn set_format(&mut self, format: PixelFormat) {
        self.format = format;
    }

    /// Render the scene into the capture target with `own_node` hidden.
    ///
    /// Never fails: missing handles or renderer errors fall back to the last capture, or to the
    /// placeholder when nothing was captured yet.
    #[tracing::instrument(skip_all, fields(frame = ctx.frame, w = size.width, h = size.height))]
    pub fn capture(
        &mut self,
        ctx: &mut FrameContext<'_>,
        own_node: Option<NodeId>,
        size: SurfaceSize,
    ) -> SceneSource<'_> {
        match self.try_capture(ctx, own_node, size) {
            Ok(()) => {
                self.has_capture = true;
                self.stats.captures = self.stats.captures.saturating_add(1);
                match self.capture_target.as_ref() {
                    Some(t) => SceneSource::Fresh(t),
                    None => SceneSource::Placeholder(&self.placeholder),
                }
            }
            Err(e) => {
                self.stats.fallbacks = self.stats.fallbacks.saturating_add(1);
                tracing::warn!(error = %e, stale = self.has_capture, "scene capture skipped");
                self.fallback()
            }
        }
    }

    /// The last successful capture, or the placeholder.
    pub fn fallback(&self) -> SceneSource<'_> {
        if self.has_capture
            && let Some(t) = self.capture_target.as_ref()
        {
            return SceneSource::Stale(t);
        }
        SceneSource::Placeholder(&self.placeholder)
    }

    /// Show `surface` in the stage's own scene node so later captures by other stages see it.
    pub fn publish(
        ctx: &mut FrameContext<'_>,
        own_node: NodeId,
        surface: &RenderSurface,
    ) -> FxResult<()> {
        let scene = ctx
            .scene
            .as_deref_mut()
            .ok_or_else(|| FxError::missing_context("scene is not live"))?;
        scene.set_node_surface(own_node, surface)
    }

    /// Release the capture target. Idempotent.
    pub fn dispose(&mut self) {
        if let Some(t) = self.capture_target.as_mut() {
            t.dispose();
        }
        self.capture_target = None;
        self.has_capture = false;
    }

    fn try_capture(
        &mut self,
        ctx: &mut FrameContext<'_>,
        own_node: Option<NodeId>,
        size: SurfaceSize,
    ) -> FxResult<()> {
        let renderer = ctx
            .renderer
            .as_deref_mut()
            .ok_or_else(|| FxError::missing_context("renderer is not live"))?;
        let scene = ctx
            .scene
            .as_deref_mut()
            .ok_or_else(|| FxError::missing_context("scene is not live"))?;
        let camera = ctx
            .camera
            .ok_or_else(|| FxError::missing_context("camera is not live"))?;

        self.prepare_target(size);
        let Some(target) = self.capture_target.as_mut() else {
            return Err(FxError::missing_context("capture target unavailable"));
        };

        let mut guard = CaptureGuard {
            stack: &mut self.stack,
            renderer,
            scene,
            pushed: false,
            hidden: None,
        };

        if let Some(id) = own_node {
            let visible = guard
                .scene
                .is_visible(id)
                .ok_or_else(|| FxError::validation(format!("unknown scene node {}", id.0)))?;
            guard.hidden = Some((id, visible));
            guard.scene.set_visible(id, false)?;
        }

        guard.stack.push(&mut *guard.renderer, Some(target.id()));
        guard.pushed = true;

        guard.renderer.render(&*guard.scene, camera, target)
    }

    fn prepare_target(&mut self, size: SurfaceSize) {
        let desc = SurfaceDesc::new(size).with_format(self.format);
        match self.capture_target.as_mut() {
            Some(t) if t.format() == desc.format && !t.is_disposed() => {
                if t.resize(size) {
                    self.has_capture = false;
                }
            }
            Some(t) => {
                tracing::debug!(surface = t.id().get(), "recreating capture target");
                t.dispose();
                self.capture_target = Some(RenderSurface::create(desc));
                self.has_capture = false;
                self.stats.recreations = self.stats.recreations.saturating_add(1);
            }
            None => {
                self.capture_target = Some(RenderSurface::create(desc));
                self.has_capture = false;
            }
        }
    }
}

impl Default for FrameCompositor {
    fn default() -> Self {
        Self::new(PixelFormat::default())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/compositor.rs"]
mod tests;
