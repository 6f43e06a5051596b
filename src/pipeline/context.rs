use crate::render::renderer::Renderer;
use crate::render::scene::{Camera, Scene};

/// Host handles lent to the core for one frame.
///
/// Every handle is optional: hosts call stages before their renderer, scene or camera are live,
/// and the core has to survive that.
pub struct FrameContext<'a> {
    /// Renderer used for captures and readbacks.
    pub renderer: Option<&'a mut dyn Renderer>,
    /// Scene that captures draw.
    pub scene: Option<&'a mut Scene>,
    /// Camera that captures draw through.
    pub camera: Option<&'a Camera>,
    /// Host frame counter, for logging.
    pub frame: u64,
}

impl<'a> FrameContext<'a> {
    /// Context with every handle live.
    pub fn new(renderer: &'a mut dyn Renderer, scene: &'a mut Scene, camera: &'a Camera) -> Self {
        Self {
            renderer: Some(renderer),
            scene: Some(scene),
            camera: Some(camera),
            frame: 0,
        }
    }

    /// Context with only a renderer, for stages fed by an external source.
    pub fn with_renderer(renderer: &'a mut dyn Renderer) -> Self {
        Self {
            renderer: Some(renderer),
            scene: None,
            camera: None,
            frame: 0,
        }
    }

    /// Context with nothing live yet.
    pub fn empty() -> Self {
        Self {
            renderer: None,
            scene: None,
            camera: None,
            frame: 0,
        }
    }

    /// Return a copy tagged with frame number `frame`.
    pub fn at_frame(mut self, frame: u64) -> Self {
        self.frame = frame;
        self
    }

    /// Reborrow the renderer, if live.
    pub fn renderer(&mut self) -> Option<&mut dyn Renderer> {
        match self.renderer.as_mut() {
            Some(r) => Some(&mut **r),
            None => None,
        }
    }
}
