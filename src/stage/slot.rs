use crate::foundation::core::Point;
use crate::pipeline::context::FrameContext;
use crate::render::surface::RenderSurface;
use crate::stage::{Stage, StageInput};

/// What a slot hands back to the host for one frame.
#[derive(Debug, Clone, Copy)]
pub struct StageFrame<'a> {
    /// Image to draw, if the stage has produced one.
    pub image: Option<&'a RenderSurface>,
    /// Marker positions in normalized device coordinates.
    pub markers: &'a [Point],
    /// `true` when this frame failed and `image` is the last good one.
    pub degraded: bool,
}

/// Owns one mounted stage and contains its failures.
///
/// Errors from the stage are logged and turned into a degraded frame showing the last good
/// output. The stage is disposed on unmount, on remount and when the slot is dropped, including
/// while unwinding.
pub struct StageSlot {
    stage: Box<dyn Stage>,
    enabled: bool,
    mounted: bool,
    markers: Vec<Point>,
    failures: u64,
}

impl StageSlot {
    /// Mount `stage`.
    pub fn new(stage: Box<dyn Stage>) -> Self {
        Self {
            stage,
            enabled: true,
            mounted: true,
            markers: Vec::new(),
            failures: 0,
        }
    }

    /// Name of the mounted stage.
    pub fn name(&self) -> &'static str {
        self.stage.name()
    }

    /// Failed frames since mount.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Latest displayable image of the mounted stage.
    pub fn output(&self) -> Option<&RenderSurface> {
        if self.mounted {
            self.stage.output()
        } else {
            None
        }
    }

    /// Whether the stage is currently mounted.
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Whether the stage is invoked each frame.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Toggle the stage. Disabled stages are not invoked and show no markers.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            self.stage.set_enabled(enabled);
            self.markers.clear();
        }
        self.enabled = enabled;
    }

    /// Run one frame of the stage, containing any failure.
    #[tracing::instrument(skip_all, fields(stage = self.stage.name(), frame = ctx.frame))]
    pub fn render_frame(
        &mut self,
        ctx: &mut FrameContext<'_>,
        input: &StageInput<'_>,
    ) -> StageFrame<'_> {
        if !self.mounted {
            return StageFrame {
                image: None,
                markers: &[],
                degraded: true,
            };
        }
        if !self.enabled {
            return StageFrame {
                image: self.stage.output(),
                markers: &[],
                degraded: false,
            };
        }

        let degraded = match self.stage.render_frame(ctx, input) {
            Ok(markers) => {
                self.markers = markers;
                false
            }
            Err(e) => {
                self.failures = self.failures.saturating_add(1);
                if e.is_ordering_violation() {
                    tracing::error!(error = %e, "stage broke frame ordering; showing last frame");
                } else {
                    tracing::warn!(error = %e, "stage frame failed; showing last good frame");
                }
                true
            }
        };

        StageFrame {
            image: self.stage.output(),
            markers: &self.markers,
            degraded,
        }
    }

    /// Replace the mounted stage, disposing the old one first.
    pub fn remount(&mut self, stage: Box<dyn Stage>) {
        self.unmount();
        self.stage = stage;
        self.mounted = true;
        self.enabled = true;
        self.failures = 0;
    }

    /// Dispose the stage. Idempotent.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        tracing::debug!(stage = self.stage.name(), "unmount stage");
        self.stage.dispose();
        self.mounted = false;
        self.markers.clear();
    }
}

impl Drop for StageSlot {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stage/slot.rs"]
mod tests;
