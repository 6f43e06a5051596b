use std::collections::VecDeque;

use smallvec::SmallVec;

use crate::analysis::sampler::{Readback, ReadbackStatus};
use crate::foundation::core::Point;
use crate::foundation::math::{ema, luma, rgb_distance, unit};

const MAX_TRAIL: f32 = 0.99;
const CANDIDATE_FACTOR: usize = 8;

/// What the tracker looks for.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TargetMode {
    /// Brightest pixels, or darkest when `invert` is set.
    Brightness {
        /// Track dark regions instead of bright ones.
        #[serde(default)]
        invert: bool,
    },
    /// Pixels closest to `rgb` (channels in `[0, 1]`).
    Color {
        /// Target color.
        rgb: [f32; 3],
    },
}

impl Default for TargetMode {
    fn default() -> Self {
        Self::Brightness { invert: false }
    }
}

impl TargetMode {
    /// Score of one RGBA8 pixel in `[0, 1]`; higher is a better match.
    pub fn score(&self, px: &[u8]) -> f32 {
        let rgb = [unit(px[0]), unit(px[1]), unit(px[2])];
        match *self {
            Self::Brightness { invert: false } => luma(rgb[0], rgb[1], rgb[2]),
            Self::Brightness { invert: true } => 1.0 - luma(rgb[0], rgb[1], rgb[2]),
            Self::Color { rgb: target } => {
                (1.0 - rgb_distance(rgb, target) / 3f32.sqrt()).clamp(0.0, 1.0)
            }
        }
    }

    /// Lowest score a candidate may have under `threshold`.
    ///
    /// In inverted brightness mode the threshold stays a brightness cutoff, so the bound is
    /// mirrored to `1 - threshold`. A non-finite threshold accepts nothing.
    pub fn min_score(&self, threshold: f32) -> f32 {
        if !threshold.is_finite() {
            return f32::INFINITY;
        }
        let t = threshold.clamp(0.0, 1.0);
        match self {
            Self::Brightness { invert: true } => 1.0 - t,
            _ => t,
        }
    }
}

/// Tracker configuration.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TrackerOpts {
    /// Number of point slots.
    pub count: usize,
    /// Scoring mode.
    pub mode: TargetMode,
    /// Score cutoff in `[0, 1]`.
    pub threshold: f32,
    /// Minimum distance between accepted points, in analysis pixels.
    pub min_separation: f32,
    /// Smoothing factor; the share of the previous position kept each frame.
    pub trail: f32,
    /// Capacity of each point's trail ring; `0` disables trails.
    pub trail_len: usize,
}

impl Default for TrackerOpts {
    fn default() -> Self {
        Self {
            count: 4,
            mode: TargetMode::default(),
            threshold: 0.5,
            min_separation: 8.0,
            trail: 0.8,
            trail_len: 16,
        }
    }
}

impl TrackerOpts {
    /// Return options with `count` slots.
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Return options with a scoring mode.
    pub fn with_mode(mut self, mode: TargetMode) -> Self {
        self.mode = mode;
        self
    }

    /// Return options with a score cutoff.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Return options with a minimum point separation.
    pub fn with_min_separation(mut self, min_separation: f32) -> Self {
        self.min_separation = min_separation;
        self
    }

    /// Return options with a smoothing factor.
    pub fn with_trail(mut self, trail: f32) -> Self {
        self.trail = trail;
        self
    }

    /// Return options with a trail ring capacity.
    pub fn with_trail_len(mut self, trail_len: usize) -> Self {
        self.trail_len = trail_len;
        self
    }

    /// Smoothing factor clamped to `[0, 0.99]`.
    pub fn smoothing(&self) -> f64 {
        if self.trail.is_finite() {
            f64::from(self.trail.clamp(0.0, MAX_TRAIL))
        } else {
            0.0
        }
    }
}

/// A pixel selected for one frame, in analysis-surface space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetCandidate {
    /// Row-major pixel index.
    pub index: usize,
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
    /// Match score in `[0, 1]`.
    pub score: f32,
}

impl TargetCandidate {
    fn distance(&self, other: &Self) -> f32 {
        let dx = self.x as f32 - other.x as f32;
        let dy = self.y as f32 - other.y as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Select up to `opts.count` mutually separated pixels from an RGBA8 buffer.
///
/// Always returns exactly `opts.count` entries; unmatched slots are `None`. A buffer that is too
/// short, or entirely zero (nothing was ever read back), yields no candidates.
pub fn pick_targets(
    buf: &[u8],
    width: u32,
    height: u32,
    opts: &TrackerOpts,
) -> Vec<Option<TargetCandidate>> {
    let n = opts.count;
    let mut out = vec![None; n];
    if n == 0 {
        return out;
    }
    let pixels = (width as usize).saturating_mul(height as usize);
    if buf.len() < pixels.saturating_mul(4) {
        tracing::warn!(
            len = buf.len(),
            width,
            height,
            "analysis buffer shorter than its dimensions"
        );
        return out;
    }
    if buf.iter().all(|&b| b == 0) {
        return out;
    }

    let min_score = opts.mode.min_score(opts.threshold);
    let k = n.saturating_mul(CANDIDATE_FACTOR).max(n);
    let mut best: Vec<TargetCandidate> = Vec::with_capacity(k + 1);

    for (index, px) in buf[..pixels * 4].chunks_exact(4).enumerate() {
        let score = opts.mode.score(px);
        if score < min_score {
            continue;
        }
        if best.len() == k && best.last().is_some_and(|c| c.score >= score) {
            continue;
        }
        // Equal scores land after existing entries, so the earlier pixel wins ties.
        let pos = best.partition_point(|c| c.score >= score);
        best.insert(
            pos,
            TargetCandidate {
                index,
                x: (index % width as usize) as u32,
                y: (index / width as usize) as u32,
                score,
            },
        );
        best.truncate(k);
    }

    let min_sep = opts.min_separation.max(0.0);
    let mut accepted: SmallVec<[TargetCandidate; 8]> = SmallVec::new();
    for c in best {
        if accepted.len() == n {
            break;
        }
        if accepted.iter().all(|a| a.distance(&c) >= min_sep) {
            accepted.push(c);
        }
    }

    for (slot, c) in out.iter_mut().zip(accepted) {
        *slot = Some(c);
    }
    out
}

/// Map analysis pixel `(x, y)` to normalized device coordinates, with x scaled by the
/// composition aspect ratio so the square analysis grid lines up with the real frame.
pub fn pixel_to_ndc(x: u32, y: u32, width: u32, height: u32, aspect: f64) -> Point {
    let w = f64::from(width.max(1));
    let h = f64::from(height.max(1));
    let nx = (f64::from(x) + 0.5) / w * 2.0 - 1.0;
    let ny = 1.0 - (f64::from(y) + 0.5) / h * 2.0;
    Point::new(nx * aspect, ny)
}

/// One smoothed tracking slot.
#[derive(Debug, Clone, Default)]
pub struct TrackedPoint {
    position: Point,
    score: f32,
    active: bool,
    initialized: bool,
    trail: VecDeque<Point>,
}

impl TrackedPoint {
    /// Smoothed position in aspect-corrected normalized device coordinates.
    pub fn position(&self) -> Point {
        self.position
    }

    /// Position in `[0, 1]` texture space, top-left origin.
    pub fn uv(&self, aspect: f64) -> Point {
        let aspect = if aspect.is_finite() && aspect > 0.0 {
            aspect
        } else {
            1.0
        };
        Point::new(
            (self.position.x / aspect + 1.0) * 0.5,
            (1.0 - self.position.y) * 0.5,
        )
    }

    /// Score of the candidate matched this frame.
    pub fn score(&self) -> f32 {
        self.score
    }

    /// Whether a candidate matched this slot on the latest frame.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether this slot has ever been matched since the last reset.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Recent smoothed positions, oldest first.
    pub fn trail(&self) -> &VecDeque<Point> {
        &self.trail
    }

    fn observe(&mut self, raw: Point, score: f32, keep: f64, trail_len: usize) {
        if self.initialized {
            self.position = Point::new(
                ema(self.position.x, raw.x, keep),
                ema(self.position.y, raw.y, keep),
            );
        } else {
            self.position = raw;
            self.initialized = true;
        }
        self.score = score;
        self.active = true;
        if trail_len > 0 {
            while self.trail.len() >= trail_len {
                self.trail.pop_front();
            }
            self.trail.push_back(self.position);
        }
    }

    fn miss(&mut self) {
        self.active = false;
        self.score = 0.0;
    }
}

/// Selects salient points from analysis readbacks and smooths them frame to frame.
#[derive(Debug, Clone)]
pub struct TargetTracker {
    opts: TrackerOpts,
    points: Vec<TrackedPoint>,
    candidates: Vec<Option<TargetCandidate>>,
    enabled: bool,
}

impl TargetTracker {
    /// Create a tracker with `opts.count` empty slots.
    pub fn new(opts: TrackerOpts) -> Self {
        Self {
            opts,
            points: vec![TrackedPoint::default(); opts.count],
            candidates: vec![None; opts.count],
            enabled: true,
        }
    }

    /// Current options.
    pub fn opts(&self) -> &TrackerOpts {
        &self.opts
    }

    /// Replace options. Changing the slot count resets every point.
    pub fn set_opts(&mut self, opts: TrackerOpts) {
        let recount = opts.count != self.opts.count;
        self.opts = opts;
        if recount {
            self.reset();
        } else if opts.trail_len == 0 {
            self.points.iter_mut().for_each(|p| p.trail.clear());
        }
    }

    /// Tracked slots, one per `opts.count`.
    pub fn points(&self) -> &[TrackedPoint] {
        &self.points
    }

    /// Raw candidates picked on the latest frame.
    pub fn candidates(&self) -> &[Option<TargetCandidate>] {
        &self.candidates
    }

    /// Whether updates are applied.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable tracking. Disabling clears every point.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled && !enabled {
            self.reset();
        }
        self.enabled = enabled;
    }

    /// Drop all smoothing state and trails.
    pub fn reset(&mut self) {
        self.points = vec![TrackedPoint::default(); self.opts.count];
        self.candidates = vec![None; self.opts.count];
    }

    /// Pick targets in `buf` and fold them into the smoothed points.
    ///
    /// `aspect` is the composition's width over height.
    #[tracing::instrument(skip(self, buf), fields(count = self.opts.count))]
    pub fn update(&mut self, buf: &[u8], width: u32, height: u32, aspect: f64) -> &[TrackedPoint] {
        if !self.enabled {
            return &self.points;
        }
        let candidates = pick_targets(buf, width, height, &self.opts);
        self.apply(candidates, width, height, aspect);
        &self.points
    }

    /// Like [`TargetTracker::update`], but a readback that is not fresh counts as no candidates.
    pub fn update_from(&mut self, readback: &Readback<'_>, aspect: f64) -> &[TrackedPoint] {
        if !self.enabled {
            return &self.points;
        }
        if readback.status != ReadbackStatus::Fresh {
            tracing::debug!(status = ?readback.status, "readback not fresh; no candidates");
            let none = vec![None; self.opts.count];
            self.apply(none, readback.width, readback.height, aspect);
            return &self.points;
        }
        self.update(readback.data, readback.width, readback.height, aspect)
    }

    fn apply(
        &mut self,
        candidates: Vec<Option<TargetCandidate>>,
        width: u32,
        height: u32,
        aspect: f64,
    ) {
        let aspect = if aspect.is_finite() && aspect > 0.0 {
            aspect
        } else {
            1.0
        };
        let keep = self.opts.smoothing();
        let trail_len = self.opts.trail_len;
        for (point, slot) in self.points.iter_mut().zip(&candidates) {
            match slot {
                Some(c) => {
                    let raw = pixel_to_ndc(c.x, c.y, width, height, aspect);
                    point.observe(raw, c.score, keep, trail_len);
                }
                None => point.miss(),
            }
        }
        self.candidates = candidates;
    }
}

impl Default for TargetTracker {
    fn default() -> Self {
        Self::new(TrackerOpts::default())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/analysis/tracker.rs"]
mod tests;
