use super::*;
use crate::foundation::core::SurfaceSize;

#[derive(Default)]
struct RegisterOnly {
    active: Option<SurfaceId>,
}

impl Renderer for RegisterOnly {
    fn active_target(&self) -> Option<SurfaceId> {
        self.active
    }

    fn set_active_target(&mut self, target: Option<SurfaceId>) {
        self.active = target;
    }

    fn render(
        &mut self,
        _scene: &Scene,
        _camera: &Camera,
        _target: &mut RenderSurface,
    ) -> FxResult<()> {
        Ok(())
    }
}

#[test]
fn nested_pushes_restore_in_reverse_order() {
    let a = RenderSurface::with_size(SurfaceSize::new(1, 1));
    let b = RenderSurface::with_size(SurfaceSize::new(1, 1));
    let mut r = RegisterOnly::default();
    let mut stack = TargetStack::new();

    stack.push(&mut r, Some(a.id()));
    stack.push(&mut r, Some(b.id()));
    assert_eq!(r.active_target(), Some(b.id()));
    assert_eq!(stack.depth(), 2);

    assert!(stack.pop(&mut r));
    assert_eq!(r.active_target(), Some(a.id()));
    assert!(stack.pop(&mut r));
    assert_eq!(r.active_target(), None);
    assert_eq!(stack.depth(), 0);
}

#[test]
fn pop_on_empty_stack_leaves_register_alone() {
    let s = RenderSurface::with_size(SurfaceSize::new(1, 1));
    let mut r = RegisterOnly {
        active: Some(s.id()),
    };
    let mut stack = TargetStack::new();
    assert!(!stack.pop(&mut r));
    assert_eq!(r.active_target(), Some(s.id()));
}

#[test]
fn default_read_pixels_copies_and_rejects_disposed() {
    let mut s = RenderSurface::solid(SurfaceSize::new(2, 1), [1, 2, 3, 255]);
    let mut r = RegisterOnly::default();
    let mut out = vec![99; 3];
    r.read_pixels(&s, &mut out).unwrap();
    assert_eq!(out, vec![1, 2, 3, 255, 1, 2, 3, 255]);

    s.dispose();
    let err = r.read_pixels(&s, &mut out).unwrap_err();
    assert!(matches!(err, FxError::ReadbackUnavailable(_)));
}
