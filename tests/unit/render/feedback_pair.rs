use super::*;

fn pair(policy: OrderingPolicy) -> FeedbackBufferPair {
    FeedbackBufferPair::new(SurfaceDesc::new(SurfaceSize::new(4, 4)), policy)
}

#[test]
fn write_target_is_never_current() {
    let mut p = pair(OrderingPolicy::Strict);
    for _ in 0..5 {
        assert_ne!(p.current().id(), p.write_target().id());
        let (prev, dst) = p.begin_write();
        assert_ne!(prev.id(), dst.id());
        p.finish_write();
        p.advance().unwrap();
    }
}

#[test]
fn advance_makes_written_surface_current() {
    let mut p = pair(OrderingPolicy::Strict);
    let mut written = None;
    p.write_with(|_, dst| {
        dst.fill([200, 0, 0, 255]);
        written = Some(dst.id());
        Ok(())
    })
    .unwrap();
    p.advance().unwrap();
    assert_eq!(Some(p.current().id()), written);
    assert_eq!(p.current().pixel(0, 0), [200, 0, 0, 255]);
}

#[test]
fn strict_advance_without_write_is_an_error() {
    let mut p = pair(OrderingPolicy::Strict);
    let before = p.read_index();
    let err = p.advance().unwrap_err();
    assert!(err.is_ordering_violation());
    assert_eq!(p.read_index(), before);
}

#[test]
fn degrade_advance_without_write_keeps_stale_frame() {
    let mut p = pair(OrderingPolicy::Degrade);
    let before = p.current().id();
    p.advance().unwrap();
    assert_eq!(p.current().id(), before);
}

#[test]
fn second_advance_in_same_frame_is_rejected() {
    let mut p = pair(OrderingPolicy::Strict);
    p.write_with(|_, _| Ok(())).unwrap();
    p.advance().unwrap();
    assert!(p.advance().is_err());
}

#[test]
fn failed_write_does_not_count_as_written() {
    let mut p = pair(OrderingPolicy::Strict);
    let res = p.write_with(|_, _| Err(FxError::validation("blend failed")));
    assert!(res.is_err());
    assert!(!p.has_pending_write());
    assert!(p.advance().is_err());
}

#[test]
fn prime_fills_both_surfaces() {
    let mut p = pair(OrderingPolicy::Strict);
    let src = RenderSurface::solid(SurfaceSize::new(4, 4), [128, 128, 128, 255]);
    p.prime(&src).unwrap();
    assert!(p.is_primed());
    assert_eq!(p.current().pixel(2, 2), [128, 128, 128, 255]);
    assert_eq!(p.write_target().pixel(2, 2), [128, 128, 128, 255]);
}

#[test]
fn resize_keeps_identities_and_unprimes() {
    let mut p = pair(OrderingPolicy::Strict);
    let src = RenderSurface::solid(SurfaceSize::new(4, 4), [1, 1, 1, 255]);
    p.prime(&src).unwrap();
    let ids = (p.current().id(), p.write_target().id());
    assert!(p.resize(SurfaceSize::new(8, 2)));
    assert_eq!((p.current().id(), p.write_target().id()), ids);
    assert!(!p.is_primed());
    assert!(!p.resize(SurfaceSize::new(8, 2)));
}

#[test]
fn dispose_is_idempotent() {
    let mut p = pair(OrderingPolicy::Strict);
    p.dispose();
    p.dispose();
    assert!(p.is_disposed());
}
