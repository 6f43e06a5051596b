use crate::foundation::core::{Affine, Rect, Rgba8, SurfaceSize};
use crate::foundation::error::{FxError, FxResult};
use crate::render::renderer::Renderer;
use crate::render::scene::{Camera, NodeImage, NodeKind, Scene};
use crate::render::surface::{RenderSurface, SurfaceId};
use std::sync::Arc;

/// Options for the CPU renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuRendererOpts {
    pub(crate) clear_rgba: Option<Rgba8>,
}

impl CpuRendererOpts {
    /// Return options with a clear color painted under every scene render.
    pub fn with_clear_rgba(mut self, clear: Option<Rgba8>) -> Self {
        self.clear_rgba = clear;
        self
    }
}

/// Counters for renderer activity.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CpuRendererStats {
    /// Completed scene renders.
    pub renders: u64,
    /// Completed pixel readbacks.
    pub readbacks: u64,
}

/// Reference [`Renderer`] powered by `vello_cpu`.
///
/// Draws the flat [`Scene`] model and enforces the active-target register: rendering into a
/// surface that is not the active target is an ordering violation.
pub struct CpuRenderer {
    opts: CpuRendererOpts,
    active: Option<SurfaceId>,
    ctx: Option<vello_cpu::RenderContext>,
    pixmap: Option<vello_cpu::Pixmap>,
    pixmap_dims: (u16, u16),
    stats: CpuRendererStats,
}

impl CpuRenderer {
    /// Create a renderer with no active target.
    pub fn new(opts: CpuRendererOpts) -> Self {
        Self {
            opts,
            active: None,
            ctx: None,
            pixmap: None,
            pixmap_dims: (0, 0),
            stats: CpuRendererStats::default(),
        }
    }

    /// Activity counters.
    pub fn stats(&self) -> CpuRendererStats {
        self.stats
    }

    fn take_ctx(&mut self, width: u16, height: u16) -> vello_cpu::RenderContext {
        let mut ctx = match self.ctx.take() {
            None => vello_cpu::RenderContext::new(width, height),
            Some(ctx) if ctx.width() == width && ctx.height() == height => ctx,
            Some(_) => vello_cpu::RenderContext::new(width, height),
        };
        ctx.reset();
        ctx
    }

    fn take_pixmap(&mut self, width: u16, height: u16) -> vello_cpu::Pixmap {
        let mut pixmap = match self.pixmap.take() {
            Some(p) if self.pixmap_dims == (width, height) => p,
            _ => vello_cpu::Pixmap::new(width, height),
        };
        self.pixmap_dims = (width, height);
        pixmap.data_as_u8_slice_mut().fill(0);
        pixmap
    }
}

impl Default for CpuRenderer {
    fn default() -> Self {
        Self::new(CpuRendererOpts::default())
    }
}

impl Renderer for CpuRenderer {
    fn active_target(&self) -> Option<SurfaceId> {
        self.active
    }

    fn set_active_target(&mut self, target: Option<SurfaceId>) {
        self.active = target;
    }

    #[tracing::instrument(skip_all, fields(nodes = scene.nodes().len()))]
    fn render(
        &mut self,
        scene: &Scene,
        camera: &Camera,
        target: &mut RenderSurface,
    ) -> FxResult<()> {
        if self.active != Some(target.id()) {
            return Err(FxError::ordering(format!(
                "render into surface {} which is not the active target",
                target.id().get()
            )));
        }
        target.ensure_live()?;
        let (w, h) = dims_u16(target.size())?;

        let mut ctx = self.take_ctx(w, h);
        let drawn = draw_scene(&mut ctx, scene, camera, self.opts.clear_rgba, w, h);
        let out = match drawn {
            Ok(()) => {
                ctx.flush();
                let mut pixmap = self.take_pixmap(w, h);
                ctx.render_to_pixmap(&mut pixmap);
                target
                    .pixels_mut()
                    .copy_from_slice(pixmap.data_as_u8_slice());
                self.pixmap = Some(pixmap);
                self.stats.renders = self.stats.renders.saturating_add(1);
                Ok(())
            }
            Err(e) => Err(e),
        };
        self.ctx = Some(ctx);
        out
    }

    fn read_pixels(&mut self, surface: &RenderSurface, out: &mut Vec<u8>) -> FxResult<()> {
        if surface.is_disposed() {
            return Err(FxError::readback(format!(
                "surface {} is disposed",
                surface.id().get()
            )));
        }
        out.clear();
        out.extend_from_slice(surface.pixels());
        self.stats.readbacks = self.stats.readbacks.saturating_add(1);
        Ok(())
    }
}

fn draw_scene(
    ctx: &mut vello_cpu::RenderContext,
    scene: &Scene,
    camera: &Camera,
    clear: Option<Rgba8>,
    width: u16,
    height: u16,
) -> FxResult<()> {
    ctx.set_blend_mode(vello_cpu::peniko::BlendMode::default());
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

    if let Some([r, g, b, a]) = clear {
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(width),
            f64::from(height),
        ));
    }

    for node in scene.nodes() {
        if !node.visible || node.opacity <= 0.0 {
            continue;
        }
        let layered = node.opacity < 1.0;
        if layered {
            ctx.push_opacity_layer(node.opacity);
        }
        match &node.kind {
            NodeKind::Fill { rect, color } => {
                ctx.set_transform(affine_to_cpu(camera.view));
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    color[0], color[1], color[2], color[3],
                ));
                ctx.fill_rect(&rect_to_cpu(*rect));
            }
            NodeKind::Image { rect, image } => {
                let paint = image_paint(image)?;
                let iw = f64::from(image.size.width);
                let ih = f64::from(image.size.height);
                let tr = camera.view
                    * Affine::translate((rect.x0, rect.y0))
                    * Affine::scale_non_uniform(rect.width() / iw, rect.height() / ih);
                ctx.set_transform(affine_to_cpu(tr));
                ctx.set_paint(paint);
                ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, iw, ih));
            }
        }
        if layered {
            ctx.pop_layer();
        }
    }
    Ok(())
}

fn dims_u16(size: SurfaceSize) -> FxResult<(u16, u16)> {
    let w: u16 = size
        .width
        .try_into()
        .map_err(|_| FxError::surface_size("surface width exceeds u16"))?;
    let h: u16 = size
        .height
        .try_into()
        .map_err(|_| FxError::surface_size("surface height exceeds u16"))?;
    Ok((w, h))
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

fn image_paint(image: &NodeImage) -> FxResult<vello_cpu::Image> {
    let pixmap = pixmap_from_premul_bytes(&image.pixels, image.size)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

fn pixmap_from_premul_bytes(bytes: &[u8], size: SurfaceSize) -> FxResult<vello_cpu::Pixmap> {
    let (w, h) = dims_u16(size)?;
    if bytes.len() != size.byte_len() {
        return Err(FxError::validation("pixmap byte len mismatch"));
    }
    let mut pixels =
        Vec::<vello_cpu::peniko::color::PremulRgba8>::with_capacity(size.pixel_count());
    for px in bytes.chunks_exact(4) {
        pixels.push(vello_cpu::peniko::color::PremulRgba8::from_u8_array([
            px[0], px[1], px[2], px[3],
        ]));
    }
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels, w, h, true,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
