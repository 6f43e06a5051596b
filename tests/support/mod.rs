#![allow(dead_code)]

use framefx::{
    Camera, FxError, FxResult, NodeKind, RenderSurface, Renderer, Rgba8, Scene, SurfaceId,
};

/// Renderer double: paints the topmost visible fill node's color and records every transition
/// of the active-target register.
#[derive(Debug, Default)]
pub struct MockRenderer {
    pub active: Option<SurfaceId>,
    pub transitions: Vec<Option<SurfaceId>>,
    pub renders: Vec<Option<SurfaceId>>,
    pub fail_render: bool,
    pub fail_readback: bool,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_render: true,
            ..Self::default()
        }
    }
}

impl Renderer for MockRenderer {
    fn active_target(&self) -> Option<SurfaceId> {
        self.active
    }

    fn set_active_target(&mut self, target: Option<SurfaceId>) {
        self.transitions.push(target);
        self.active = target;
    }

    fn render(
        &mut self,
        scene: &Scene,
        _camera: &Camera,
        target: &mut RenderSurface,
    ) -> FxResult<()> {
        self.renders.push(self.active);
        if self.fail_render {
            return Err(FxError::missing_context("device lost"));
        }
        let color = top_fill(scene).unwrap_or([0, 0, 0, 0]);
        target.fill(color);
        Ok(())
    }

    fn read_pixels(&mut self, surface: &RenderSurface, out: &mut Vec<u8>) -> FxResult<()> {
        if self.fail_readback {
            return Err(FxError::readback("context lost"));
        }
        out.clear();
        out.extend_from_slice(surface.pixels());
        Ok(())
    }
}

fn top_fill(scene: &Scene) -> Option<Rgba8> {
    scene
        .nodes()
        .iter()
        .rev()
        .filter(|n| n.visible)
        .find_map(|n| match n.kind {
            NodeKind::Fill { color, .. } => Some(color),
            NodeKind::Image { .. } => None,
        })
}

/// RGBA8 buffer of `w * h` copies of `px`.
pub fn solid_buffer(w: u32, h: u32, px: Rgba8) -> Vec<u8> {
    px.repeat((w * h) as usize)
}

/// Overwrite pixel `(x, y)` of a row-major RGBA8 buffer.
pub fn put(buf: &mut [u8], w: u32, x: u32, y: u32, px: Rgba8) {
    let i = ((y * w + x) * 4) as usize;
    buf[i..i + 4].copy_from_slice(&px);
}
