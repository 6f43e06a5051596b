use crate::foundation::core::{Affine, Rect, Rgba8, SurfaceSize};
use crate::foundation::error::{FxError, FxResult};
use crate::render::surface::RenderSurface;
use std::sync::Arc;

/// Index of a node inside a [`Scene`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

/// Premultiplied RGBA8 pixels shared between a stage's output and the scene node showing it.
#[derive(Clone, Debug)]
pub struct NodeImage {
    /// Image dimensions.
    pub size: SurfaceSize,
    /// Tightly packed premultiplied RGBA8 bytes.
    pub pixels: Arc<Vec<u8>>,
}

/// What a node draws.
#[derive(Clone, Debug)]
pub enum NodeKind {
    /// Solid color rectangle (straight alpha).
    Fill {
        /// Rectangle in scene units.
        rect: Rect,
        /// Fill color.
        color: Rgba8,
    },
    /// Image stretched over a rectangle.
    Image {
        /// Rectangle in scene units.
        rect: Rect,
        /// Pixels to draw.
        image: NodeImage,
    },
}

/// One drawable entry of the scene.
#[derive(Clone, Debug)]
pub struct SceneNode {
    /// Node identity.
    pub id: NodeId,
    /// Hidden nodes are skipped by renderers.
    pub visible: bool,
    /// Opacity multiplier in `[0, 1]`.
    pub opacity: f32,
    /// Drawable content.
    pub kind: NodeKind,
}

/// Flat, ordered list of drawable nodes, painted back to front.
///
/// This is the minimal scene the built-in CPU renderer understands; hosts with their own scene
/// graph implement [`crate::render::renderer::Renderer`] against it instead.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    nodes: Vec<SceneNode>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a visible, opaque node and return its id.
    pub fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(SceneNode {
            id,
            visible: true,
            opacity: 1.0,
            kind,
        });
        id
    }

    /// Append an image node showing a copy of `surface` over `rect`.
    pub fn push_surface(&mut self, rect: Rect, surface: &RenderSurface) -> FxResult<NodeId> {
        let image = node_image_from(surface)?;
        Ok(self.push(NodeKind::Image { rect, image }))
    }

    /// Nodes in paint order.
    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    /// Borrow a node.
    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0 as usize)
    }

    /// Visibility of a node, or `None` when the id is unknown.
    pub fn is_visible(&self, id: NodeId) -> Option<bool> {
        self.node(id).map(|n| n.visible)
    }

    /// Set a node's visibility.
    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> FxResult<()> {
        self.node_mut(id)?.visible = visible;
        Ok(())
    }

    /// Set a node's opacity, clamped to `[0, 1]`.
    pub fn set_opacity(&mut self, id: NodeId, opacity: f32) -> FxResult<()> {
        self.node_mut(id)?.opacity = opacity.clamp(0.0, 1.0);
        Ok(())
    }

    /// Replace the pixels an image node shows with a copy of `surface`.
    ///
    /// Stages call this after rendering so the next capture of the scene sees their output.
    pub fn set_node_surface(&mut self, id: NodeId, surface: &RenderSurface) -> FxResult<()> {
        let next = node_image_from(surface)?;
        match &mut self.node_mut(id)?.kind {
            NodeKind::Image { image, .. } => {
                *image = next;
                Ok(())
            }
            NodeKind::Fill { .. } => Err(FxError::validation(format!(
                "node {} is not an image node",
                id.0
            ))),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> FxResult<&mut SceneNode> {
        self.nodes
            .get_mut(id.0 as usize)
            .ok_or_else(|| FxError::validation(format!("unknown scene node {}", id.0)))
    }
}

fn node_image_from(surface: &RenderSurface) -> FxResult<NodeImage> {
    surface.ensure_live()?;
    Ok(NodeImage {
        size: surface.size(),
        pixels: Arc::new(surface.pixels().to_vec()),
    })
}

/// View transform applied to every node before drawing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    /// Scene-to-pixel transform.
    pub view: Affine,
}

impl Camera {
    /// Camera mapping scene units one-to-one onto pixels.
    pub fn identity() -> Self {
        Self {
            view: Affine::IDENTITY,
        }
    }

    /// Camera with an explicit view transform.
    pub fn new(view: Affine) -> Self {
        Self { view }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::identity()
    }
}
