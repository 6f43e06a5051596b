use super::*;

const BLACK: [u8; 4] = [0, 0, 0, 255];
const WHITE: [u8; 4] = [255, 255, 255, 255];

fn buffer(w: u32, h: u32, fill: [u8; 4]) -> Vec<u8> {
    fill.repeat((w * h) as usize)
}

fn put(buf: &mut [u8], w: u32, x: u32, y: u32, px: [u8; 4]) {
    let i = ((y * w + x) * 4) as usize;
    buf[i..i + 4].copy_from_slice(&px);
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn single_white_pixel_is_tracked_exactly_on_first_frame() {
    let mut buf = buffer(64, 64, BLACK);
    put(&mut buf, 64, 10, 20, WHITE);
    let mut tracker = TargetTracker::new(TrackerOpts::default().with_count(1).with_threshold(0.5));
    let points = tracker.update(&buf, 64, 64, 1.0);
    assert_eq!(points.len(), 1);
    let p = points[0].position();
    assert!(close(p.x, -0.671875), "x = {}", p.x);
    assert!(close(p.y, 0.359375), "y = {}", p.y);
    assert!(points[0].is_active());
    let uv = points[0].uv(1.0);
    assert!(close(uv.x, 10.5 / 64.0));
    assert!(close(uv.y, 20.5 / 64.0));
}

#[test]
fn close_candidates_are_suppressed() {
    let mut buf = buffer(32, 32, BLACK);
    put(&mut buf, 32, 10, 10, WHITE);
    put(&mut buf, 32, 12, 10, [204, 204, 204, 255]);
    let opts = TrackerOpts::default()
        .with_count(2)
        .with_threshold(0.5)
        .with_min_separation(10.0);
    let picked = pick_targets(&buf, 32, 32, &opts);
    assert_eq!(picked.len(), 2);
    let first = picked[0].unwrap();
    assert_eq!((first.x, first.y), (10, 10));
    assert!(picked[1].is_none());
}

#[test]
fn results_are_padded_to_count() {
    let mut buf = buffer(16, 16, BLACK);
    put(&mut buf, 16, 3, 3, WHITE);
    let picked = pick_targets(&buf, 16, 16, &TrackerOpts::default().with_count(5));
    assert_eq!(picked.len(), 5);
    assert!(picked[0].is_some());
    assert!(picked[1..].iter().all(Option::is_none));
}

#[test]
fn zero_count_yields_nothing() {
    let buf = buffer(8, 8, WHITE);
    let opts = TrackerOpts::default().with_count(0);
    assert!(pick_targets(&buf, 8, 8, &opts).is_empty());
}

#[test]
fn equal_scores_favor_earlier_pixel() {
    let mut buf = buffer(64, 64, BLACK);
    for x in 0..20 {
        put(&mut buf, 64, x, 30, WHITE);
    }
    put(&mut buf, 64, 5, 5, WHITE);
    let opts = TrackerOpts::default()
        .with_count(1)
        .with_min_separation(0.0);
    let c = pick_targets(&buf, 64, 64, &opts)[0].unwrap();
    assert_eq!((c.x, c.y, c.index), (5, 5, 5 * 64 + 5));
}

fn noise(w: u32, h: u32, seed: u32) -> Vec<u8> {
    let mut state = seed;
    let mut out = Vec::with_capacity((w * h * 4) as usize);
    for _ in 0..w * h {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        let v = (state >> 24) as u8;
        out.extend_from_slice(&[v, v, v, 255]);
    }
    out
}

#[test]
fn accepted_points_respect_separation_and_threshold() {
    for seed in [1, 7, 42, 1234] {
        let buf = noise(48, 48, seed);
        for min_sep in [1.5f32, 4.0, 9.0] {
            let opts = TrackerOpts::default()
                .with_count(6)
                .with_threshold(0.6)
                .with_min_separation(min_sep);
            let picked: Vec<_> = pick_targets(&buf, 48, 48, &opts)
        .into_iter()
        .flatten()
        .collect();
            for (i, a) in picked.iter().enumerate() {
                assert!(a.score >= 0.6);
                for b in &picked[i + 1..] {
                    assert!(a.distance(b) >= min_sep, "seed {seed}: {a:?} vs {b:?}");
                }
            }
        }
    }
}

#[test]
fn accepted_points_come_out_in_descending_score() {
    let buf = noise(32, 32, 99);
    let opts = TrackerOpts::default().with_count(4).with_threshold(0.0);
    let picked: Vec<_> = pick_targets(&buf, 32, 32, &opts)
        .into_iter()
        .flatten()
        .collect();
    assert_eq!(picked.len(), 4);
    assert!(picked.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn inverted_mode_mirrors_threshold() {
    let mut buf = buffer(16, 16, WHITE);
    put(&mut buf, 16, 7, 9, [102, 102, 102, 255]);
    let invert = TargetMode::Brightness { invert: true };

    let strict = TrackerOpts::default()
        .with_count(1)
        .with_mode(invert)
        .with_threshold(0.3);
    assert!(pick_targets(&buf, 16, 16, &strict)[0].is_none());

    let loose = strict.with_threshold(0.5);
    let c = pick_targets(&buf, 16, 16, &loose)[0].unwrap();
    assert_eq!((c.x, c.y), (7, 9));
    assert!(c.score >= invert.min_score(0.5));
}

#[test]
fn color_mode_prefers_nearest_color() {
    let mut buf = buffer(16, 16, BLACK);
    put(&mut buf, 16, 2, 2, [128, 0, 0, 255]);
    put(&mut buf, 16, 12, 12, [255, 0, 0, 255]);
    let opts = TrackerOpts::default()
        .with_count(2)
        .with_threshold(0.5)
        .with_mode(TargetMode::Color { rgb: [1.0, 0.0, 0.0] });
    let picked = pick_targets(&buf, 16, 16, &opts);
    let best = picked[0].unwrap();
    assert_eq!((best.x, best.y), (12, 12));
    assert!((best.score - 1.0).abs() < 1e-6);
    assert_eq!(picked[1].map(|c| (c.x, c.y)), Some((2, 2)));
}

#[test]
fn all_zero_buffer_has_no_candidates_even_inverted() {
    let buf = vec![0u8; 16 * 16 * 4];
    let opts = TrackerOpts::default()
        .with_count(3)
        .with_mode(TargetMode::Brightness { invert: true });
    let picked = pick_targets(&buf, 16, 16, &opts);
    assert!(picked.iter().all(Option::is_none));
}

#[test]
fn non_finite_threshold_accepts_nothing() {
    let buf = buffer(16, 16, BLACK);
    for invert in [false, true] {
        let opts = TrackerOpts::default()
            .with_count(2)
            .with_mode(TargetMode::Brightness { invert })
            .with_threshold(f32::NAN);
        let picked = pick_targets(&buf, 16, 16, &opts);
    assert!(picked.iter().all(Option::is_none));
    }
    let bound = TargetMode::default().min_score(f32::INFINITY);
    assert_eq!(bound, f32::INFINITY);
}

#[test]
fn short_buffer_has_no_candidates() {
    let buf = buffer(4, 4, WHITE);
    let picked = pick_targets(&buf, 8, 8, &TrackerOpts::default());
    assert!(picked.iter().all(Option::is_none));
}

#[test]
fn smoothing_converges_to_repeated_position() {
    let mut a = buffer(64, 64, BLACK);
    put(&mut a, 64, 10, 20, WHITE);
    let mut b = buffer(64, 64, BLACK);
    put(&mut b, 64, 40, 40, WHITE);
    let target = pixel_to_ndc(40, 40, 64, 64, 1.0);

    let mut tracker = TargetTracker::new(TrackerOpts::default().with_count(1).with_trail(0.9));
    tracker.update(&a, 64, 64, 1.0);
    let after_one = tracker.update(&b, 64, 64, 1.0)[0].position();
    assert!(!close(after_one.x, target.x), "second frame should lag");

    // 0.9^100 is far below the tolerance.
    for _ in 0..100 {
        tracker.update(&b, 64, 64, 1.0);
    }
    let p = tracker.points()[0].position();
    assert!((p.x - target.x).abs() < 1e-3);
    assert!((p.y - target.y).abs() < 1e-3);
}

#[test]
fn smoothing_factor_is_clamped() {
    let clamped = TrackerOpts::default().with_trail(5.0).smoothing();
    assert!((clamped - 0.99).abs() < 1e-6);
    assert_eq!(TrackerOpts::default().with_trail(-1.0).smoothing(), 0.0);
    let nan = TrackerOpts::default().with_trail(f32::NAN);
    assert_eq!(nan.smoothing(), 0.0);
}

#[test]
fn aspect_scales_horizontal_coordinate() {
    let p = pixel_to_ndc(63, 0, 64, 64, 16.0 / 9.0);
    let square = pixel_to_ndc(63, 0, 64, 64, 1.0);
    assert!(close(p.x, square.x * 16.0 / 9.0));
    assert!(close(p.y, square.y));
}

#[test]
fn missed_slot_goes_inactive_but_keeps_position() {
    let mut buf = buffer(32, 32, BLACK);
    put(&mut buf, 32, 4, 4, WHITE);
    let mut tracker = TargetTracker::new(TrackerOpts::default().with_count(1));
    let seen = tracker.update(&buf, 32, 32, 1.0)[0].position();

    let dark = buffer(32, 32, BLACK);
    let point = &tracker.update(&dark, 32, 32, 1.0)[0];
    assert!(!point.is_active());
    assert!(point.is_initialized());
    assert_eq!(point.position(), seen);
}

#[test]
fn stale_readback_counts_as_no_candidates() {
    let mut buf = buffer(16, 16, BLACK);
    put(&mut buf, 16, 8, 8, WHITE);
    let mut tracker = TargetTracker::new(TrackerOpts::default().with_count(1));
    let stale = Readback {
        data: &buf,
        width: 16,
        height: 16,
        status: ReadbackStatus::Stale,
    };
    assert!(!tracker.update_from(&stale, 1.0)[0].is_active());

    let fresh = Readback {
        status: ReadbackStatus::Fresh,
        ..stale
    };
    assert!(tracker.update_from(&fresh, 1.0)[0].is_active());
}

#[test]
fn trail_ring_keeps_most_recent_positions() {
    let mut tracker = TargetTracker::new(
        TrackerOpts::default()
            .with_count(1)
            .with_trail(0.0)
            .with_trail_len(3),
    );
    for x in 0..5 {
        let mut buf = buffer(16, 16, BLACK);
        put(&mut buf, 16, x, 0, WHITE);
        tracker.update(&buf, 16, 16, 1.0);
    }
    let trail: Vec<_> = tracker.points()[0].trail().iter().copied().collect();
    let expected: Vec<_> = (2..5).map(|x| pixel_to_ndc(x, 0, 16, 16, 1.0)).collect();
    assert_eq!(trail, expected);
}

#[test]
fn disabling_resets_and_freezes_points() {
    let mut buf = buffer(16, 16, BLACK);
    put(&mut buf, 16, 1, 1, WHITE);
    let mut tracker = TargetTracker::new(TrackerOpts::default().with_count(2));
    tracker.update(&buf, 16, 16, 1.0);
    assert!(tracker.points()[0].is_initialized());

    tracker.set_enabled(false);
    assert!(tracker.points().iter().all(|p| !p.is_initialized()));
    tracker.update(&buf, 16, 16, 1.0);
    assert!(tracker.points().iter().all(|p| !p.is_initialized()));

    tracker.set_enabled(true);
    assert!(tracker.update(&buf, 16, 16, 1.0)[0].is_initialized());
}

#[test]
fn changing_count_resizes_slots() {
    let mut tracker = TargetTracker::default();
    assert_eq!(tracker.points().len(), 4);
    tracker.set_opts(TrackerOpts::default().with_count(2));
    assert_eq!(tracker.points().len(), 2);
    assert_eq!(tracker.candidates().len(), 2);
}

#[test]
fn opts_load_from_json() {
    let opts: TrackerOpts = serde_json::from_str(
        r#"{"count": 2, "threshold": 0.7, "mode": {"mode": "color", "rgb": [1.0, 0.0, 0.0]}}"#,
    )
    .unwrap();
    assert_eq!(opts.count, 2);
    assert_eq!(opts.mode, TargetMode::Color { rgb: [1.0, 0.0, 0.0] });
    assert_eq!(opts.trail_len, TrackerOpts::default().trail_len);

    let inverted: TargetMode =
        serde_json::from_str(r#"{"mode": "brightness", "invert": true}"#).unwrap();
    assert_eq!(inverted, TargetMode::Brightness { invert: true });
}
