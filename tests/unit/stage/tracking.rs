use super::*;
use crate::analysis::sampler::SamplerOpts;
use crate::foundation::core::SurfaceSize;
use crate::render::cpu::CpuRenderer;
use serde_json::json;

fn opts() -> TrackingOpts {
    TrackingOpts::default()
        .with_sampler(SamplerOpts::default().with_size(32))
        .with_tracker(TrackerOpts::default().with_count(2).with_trail(0.0))
        .with_marker_radius(1)
}

fn spot_source() -> RenderSurface {
    let mut src = RenderSurface::solid(SurfaceSize::new(64, 64), [0, 0, 0, 255]);
    // A 2x2 block maps onto one analysis pixel at (5, 10).
    for (x, y) in [(10, 20), (11, 20), (10, 21), (11, 21)] {
        src.set_pixel(x, y, [255, 255, 255, 255]);
    }
    src
}

#[test]
fn tracks_spot_and_draws_marker() {
    let src = spot_source();
    let size = src.size();
    let mut r = CpuRenderer::default();
    let mut stage = TrackingStage::new(opts());
    let mut ctx = FrameContext::with_renderer(&mut r);
    let markers = stage
        .render_frame(&mut ctx, &StageInput::external(&src, size))
        .unwrap();

    assert_eq!(markers.len(), 1);
    let expected = crate::analysis::tracker::pixel_to_ndc(5, 10, 32, 32, 1.0);
    assert!((markers[0].x - expected.x).abs() < 1e-9);
    assert!((markers[0].y - expected.y).abs() < 1e-9);

    let out = stage.output().unwrap();
    assert_eq!(out.size(), size);
    assert_eq!(out.pixel(11, 21), DEFAULT_MARKER);
    assert_eq!(out.pixel(40, 40), [0, 0, 0, 255]);
    assert!(stage.points()[0].is_active());
    assert!(!stage.points()[1].is_active());
}

#[test]
fn no_renderer_means_no_markers_but_output_still_shows_source() {
    let src = spot_source();
    let size = src.size();
    let mut stage = TrackingStage::new(opts());
    let mut ctx = FrameContext::empty();
    let markers = stage
        .render_frame(&mut ctx, &StageInput::external(&src, size))
        .unwrap();
    assert!(markers.is_empty());
    assert_eq!(stage.output().unwrap().pixel(10, 20), [255, 255, 255, 255]);
}

#[test]
fn marker_blends_source_over() {
    let mut dst = RenderSurface::solid(SurfaceSize::new(4, 4), [0, 0, 200, 255]);
    draw_marker(&mut dst, Point::new(0.5, 0.5), 0, [255, 0, 0, 255]);
    assert_eq!(dst.pixel(2, 2), [0, 0, 200, 255]);

    draw_marker(&mut dst, Point::new(0.0, 0.0), 1, [128, 0, 0, 128]);
    assert_eq!(dst.pixel(0, 0), [128, 0, 100, 255]);
    assert_eq!(dst.pixel(1, 1), [128, 0, 100, 255]);
    assert_eq!(dst.pixel(2, 2), [0, 0, 200, 255]);
}

#[test]
fn params_switch_to_color_mode() {
    let mut stage = TrackingStage::default();
    let values = match json!({
        "mode": "color",
        "target_color": "#ff0000",
        "count": 3.2,
        "gain": 2.0
    }) {
        serde_json::Value::Object(m) => m,
        _ => unreachable!(),
    };
    stage.apply_params(&values).unwrap();
    let o = stage.tracker().opts();
    assert_eq!(o.count, 3);
    assert_eq!(o.mode, TargetMode::Color { rgb: [1.0, 0.0, 0.0] });
    assert_eq!(stage.points().len(), 3);
}

#[test]
fn disable_resets_tracking_and_dispose_is_idempotent() {
    let src = spot_source();
    let size = src.size();
    let mut r = CpuRenderer::default();
    let mut stage = TrackingStage::new(opts());
    let mut ctx = FrameContext::with_renderer(&mut r);
    stage
        .render_frame(&mut ctx, &StageInput::external(&src, size))
        .unwrap();
    stage.set_enabled(false);
    assert!(stage.points().iter().all(|p| !p.is_initialized()));
    stage.set_enabled(true);

    stage.dispose();
    stage.dispose();
    assert!(stage.output().is_none());
}
