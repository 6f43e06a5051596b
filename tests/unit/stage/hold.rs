use super::*;
use crate::foundation::core::{Rect, SurfaceSize};
use crate::foundation::error::FxError;
use crate::render::cpu::CpuRenderer;
use crate::render::scene::{Camera, NodeKind, Scene};
use serde_json::json;

const SIZE: SurfaceSize = SurfaceSize {
    width: 16,
    height: 16,
};

#[test]
fn first_frame_is_primed_from_external_source() {
    let src = RenderSurface::solid(SIZE, [200, 100, 50, 255]);
    let mut stage = HoldStage::default();
    let mut ctx = FrameContext::empty();
    let markers = stage
        .render_frame(&mut ctx, &StageInput::external(&src, SIZE))
        .unwrap();
    assert!(markers.is_empty());
    assert_eq!(stage.output().unwrap().pixel(5, 5), [200, 100, 50, 255]);
}

#[test]
fn missing_external_source_keeps_last_output() {
    let src = RenderSurface::solid(SIZE, [10, 20, 30, 255]);
    let mut stage = HoldStage::default();
    let mut ctx = FrameContext::empty();
    stage
        .render_frame(&mut ctx, &StageInput::external(&src, SIZE))
        .unwrap();

    let none = StageInput {
        source: None,
        is_global: false,
        size: SIZE,
        own_node: None,
    };
    let err = stage.render_frame(&mut ctx, &none).unwrap_err();
    assert!(matches!(err, FxError::MissingContext(_)));
    assert_eq!(stage.output().unwrap().pixel(0, 0), [10, 20, 30, 255]);
    assert_eq!(stage.feedback().frames(), 1);
}

#[test]
fn global_mode_captures_scene_without_own_output_and_publishes() {
    let mut scene = Scene::new();
    scene.push(NodeKind::Fill {
        rect: Rect::new(0.0, 0.0, 16.0, 16.0),
        color: [0, 0, 255, 255],
    });
    let red = RenderSurface::solid(SIZE, [255, 0, 0, 255]);
    let own = scene
        .push_surface(Rect::new(0.0, 0.0, 16.0, 16.0), &red)
        .unwrap();
    let camera = Camera::identity();
    let mut r = CpuRenderer::default();
    let mut stage = HoldStage::default();

    for frame in 0..3 {
        let mut ctx = FrameContext::new(&mut r, &mut scene, &camera).at_frame(frame);
        stage
            .render_frame(&mut ctx, &StageInput::global(SIZE, Some(own)))
            .unwrap();
        assert_eq!(stage.output().unwrap().pixel(8, 8), [0, 0, 255, 255]);
    }
    assert_eq!(stage.compositor().stats().captures, 3);
    assert_eq!(scene.is_visible(own), Some(true));
    match &scene.node(own).unwrap().kind {
        NodeKind::Image { image, .. } => assert_eq!(&image.pixels[..4], &[0, 0, 255, 255]),
        NodeKind::Fill { .. } => panic!("expected image node"),
    }
}

#[test]
fn global_mode_without_context_fails_without_output() {
    let mut stage = HoldStage::default();
    let mut ctx = FrameContext::empty();
    let err = stage
        .render_frame(&mut ctx, &StageInput::global(SIZE, None))
        .unwrap_err();
    assert!(matches!(err, FxError::MissingContext(_)));
    assert!(stage.output().is_none());
}

#[test]
fn params_resolve_through_schema() {
    let schema = HoldStage::param_schema().unwrap();
    assert_eq!(schema.params().len(), 3);

    let mut stage = HoldStage::default();
    let values = match json!({"hold_strength": 2.0, "threshold": 0.25}) {
        serde_json::Value::Object(m) => m,
        _ => unreachable!(),
    };
    stage.apply_params(&values).unwrap();
    let p = stage.params();
    assert_eq!(p.hold_strength, 1.0);
    assert!((p.threshold - 0.25).abs() < 1e-6);
    assert!((p.decay - HoldBlendParams::default().decay).abs() < 1e-6);
}

#[test]
fn dispose_releases_buffers() {
    let src = RenderSurface::solid(SIZE, [1, 1, 1, 255]);
    let mut stage = HoldStage::default();
    let mut ctx = FrameContext::empty();
    stage
        .render_frame(&mut ctx, &StageInput::external(&src, SIZE))
        .unwrap();
    stage.dispose();
    stage.dispose();
    assert!(stage.output().is_none());
}
