//! framefx is the shared rendering core of a live visual-effects compositor.
//!
//! Effect stages are built from three mechanisms:
//!
//! - [`FrameCompositor`] captures the whole scene without the calling stage's own output
//! - [`FeedbackPipeline`] lets a stage blend against its own previous frame without aliasing
//! - [`AnalysisSampler`] and [`TargetTracker`] pick smoothed salient points from a downsampled
//!   readback
//!
//! Stages run inside a [`StageSlot`], which contains their failures so a broken stage shows its
//! last good frame instead of taking the host loop down.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Analysis readback and salient-point tracking.
pub mod analysis;
/// Scene capture and temporal feedback.
pub mod pipeline;
/// Surfaces, the renderer contract and the CPU reference renderer.
pub mod render;
/// Stage parameter schemas.
pub mod schema;
/// Stage contract and reference stages.
pub mod stage;

pub use crate::foundation::core::{
    Affine, FilterMode, PixelFormat, Point, Rect, Rgba8, SurfaceDesc, SurfaceSize, Vec2,
};
pub use crate::foundation::error::{FxError, FxResult};

pub use crate::analysis::sampler::{AnalysisSampler, Readback, ReadbackStatus, SamplerOpts};
pub use crate::analysis::tracker::{
    TargetCandidate, TargetMode, TargetTracker, TrackedPoint, TrackerOpts, pick_targets,
};
pub use crate::pipeline::compositor::{FrameCompositor, SceneSource};
pub use crate::pipeline::context::FrameContext;
pub use crate::pipeline::feedback::{
    BlendTransform, FeedbackOpts, FeedbackPipeline, HoldBlend, HoldBlendParams, IdentityBlend,
};
pub use crate::render::cpu::{CpuRenderer, CpuRendererOpts};
pub use crate::render::feedback_pair::{FeedbackBufferPair, OrderingPolicy};
pub use crate::render::renderer::{Renderer, TargetStack};
pub use crate::render::scene::{Camera, NodeId, NodeKind, Scene};
pub use crate::render::surface::{RenderSurface, SurfaceId};
pub use crate::schema::params::{ParamKind, ParamSchema, ParamSpec, ParamValues};
pub use crate::stage::hold::HoldStage;
pub use crate::stage::slot::{StageFrame, StageSlot};
pub use crate::stage::tracking::{TrackingOpts, TrackingStage};
pub use crate::stage::{Stage, StageInput};
