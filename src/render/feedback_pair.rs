use crate::foundation::core::{SurfaceDesc, SurfaceSize};
use crate::foundation::error::{FxError, FxResult};
use crate::render::surface::RenderSurface;

/// How a [`FeedbackBufferPair`] reacts to frame-ordering mistakes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingPolicy {
    /// Return [`FxError::OrderingViolation`] to the caller.
    Strict,
    /// Log, skip the flip and keep showing the previous frame.
    Degrade,
}

impl Default for OrderingPolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Strict
        } else {
            Self::Degrade
        }
    }
}

/// Two identically sized surfaces used for ping-pong accumulation.
///
/// The surface at `read_index` is the previous frame. Writes always go to the other surface and
/// the index only flips in [`FeedbackBufferPair::advance`], after a write has been completed.
#[derive(Debug)]
pub struct FeedbackBufferPair {
    surfaces: [RenderSurface; 2],
    read_index: usize,
    primed: bool,
    written: bool,
    policy: OrderingPolicy,
}

impl FeedbackBufferPair {
    /// Allocate both surfaces.
    pub fn new(desc: SurfaceDesc, policy: OrderingPolicy) -> Self {
        Self {
            surfaces: [RenderSurface::create(desc), RenderSurface::create(desc)],
            read_index: 0,
            primed: false,
            written: false,
            policy,
        }
    }

    /// The read surface: last frame's result.
    pub fn current(&self) -> &RenderSurface {
        &self.surfaces[self.read_index]
    }

    /// The surface the next write lands in.
    pub fn write_target(&self) -> &RenderSurface {
        &self.surfaces[1 - self.read_index]
    }

    /// Index of the read surface, `0` or `1`.
    pub fn read_index(&self) -> usize {
        self.read_index
    }

    /// Shared size of both surfaces.
    pub fn size(&self) -> SurfaceSize {
        self.surfaces[0].size()
    }

    /// Return `true` once both surfaces hold a real frame.
    pub fn is_primed(&self) -> bool {
        self.primed
    }

    /// Return `true` when a write finished since the last flip.
    pub fn has_pending_write(&self) -> bool {
        self.written
    }

    /// Ordering policy in effect.
    pub fn policy(&self) -> OrderingPolicy {
        self.policy
    }

    /// Copy `source` into both surfaces so accumulation never starts from a blank frame.
    pub fn prime(&mut self, source: &RenderSurface) -> FxResult<()> {
        for s in &mut self.surfaces {
            s.copy_from(source)?;
        }
        self.primed = true;
        self.written = false;
        tracing::debug!(
            a = self.surfaces[0].id().get(),
            b = self.surfaces[1].id().get(),
            "primed feedback pair"
        );
        Ok(())
    }

    /// Split borrow: `(previous frame, write target)`.
    ///
    /// The two references never alias. Call [`FeedbackBufferPair::finish_write`] once the write
    /// target holds the complete new frame.
    pub fn begin_write(&mut self) -> (&RenderSurface, &mut RenderSurface) {
        self.written = false;
        let (lo, hi) = self.surfaces.split_at_mut(1);
        if self.read_index == 0 {
            (&lo[0], &mut hi[0])
        } else {
            (&hi[0], &mut lo[0])
        }
    }

    /// Mark the write started by [`FeedbackBufferPair::begin_write`] as complete.
    pub fn finish_write(&mut self) {
        self.written = true;
    }

    /// Run `f(prev, dst)` against the split buffers and mark the write complete on success.
    pub fn write_with<F>(&mut self, f: F) -> FxResult<()>
    where
        F: FnOnce(&RenderSurface, &mut RenderSurface) -> FxResult<()>,
    {
        let (prev, dst) = self.begin_write();
        f(prev, dst)?;
        self.finish_write();
        Ok(())
    }

    /// Flip the read index so the freshly written surface becomes current.
    ///
    /// Without a completed write this is an ordering violation: under
    /// [`OrderingPolicy::Strict`] it returns an error, under [`OrderingPolicy::Degrade`] it logs
    /// and keeps the previous frame current.
    pub fn advance(&mut self) -> FxResult<()> {
        if !self.written {
            let msg = "feedback pair advanced without a completed write";
            return match self.policy {
                OrderingPolicy::Strict => {
                    tracing::error!(read_index = self.read_index, "{msg}");
                    Err(FxError::ordering(msg))
                }
                OrderingPolicy::Degrade => {
                    tracing::warn!(read_index = self.read_index, "{msg}; keeping stale frame");
                    Ok(())
                }
            };
        }
        self.read_index = 1 - self.read_index;
        self.written = false;
        Ok(())
    }

    /// Resize both surfaces in place. A real resize drops the primed state.
    pub fn resize(&mut self, size: SurfaceSize) -> bool {
        let mut changed = false;
        for s in &mut self.surfaces {
            changed |= s.resize(size);
        }
        if changed {
            self.primed = false;
            self.written = false;
        }
        changed
    }

    /// Forget accumulated history; the next frame primes again.
    pub fn reset(&mut self) {
        self.primed = false;
        self.written = false;
    }

    /// Dispose both surfaces. Idempotent.
    pub fn dispose(&mut self) {
        for s in &mut self.surfaces {
            s.dispose();
        }
        self.primed = false;
        self.written = false;
    }

    /// Return `true` once both surfaces are disposed.
    pub fn is_disposed(&self) -> bool {
        self.surfaces.iter().all(RenderSurface::is_disposed)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/feedback_pair.rs"]
mod tests;
