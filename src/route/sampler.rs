//! Deterministic mapping from a [`Progress`] value to what a frame shows.
//!
//! Live playback and offline export both go through these functions, so an exported frame at
//! progress `p` matches what playback displays at `p`.

use crate::foundation::core::Progress;
use crate::foundation::math::Vec3;

/// Values that can be linearly interpolated in the renderer's coordinate space.
pub trait Lerp: Copy {
    fn lerp(self, to: Self, t: f64) -> Self;
}

impl Lerp for Vec3 {
    fn lerp(self, to: Self, t: f64) -> Self {
        Vec3::lerp(self, to, t)
    }
}

impl Lerp for f64 {
    fn lerp(self, to: Self, t: f64) -> Self {
        self + (to - self) * t
    }
}

impl Lerp for kurbo::Point {
    fn lerp(self, to: Self, t: f64) -> Self {
        kurbo::Point::lerp(self, to, t)
    }
}

/// Number of points revealed at `progress` for a sequence of length `len`.
pub fn visible_len(len: usize, progress: Progress) -> usize {
    if len == 0 {
        return 0;
    }
    let revealed = (progress.get() * (len - 1) as f64).floor() as usize + 1;
    revealed.clamp(1, len)
}

/// The already-travelled prefix of `points`: at least one point, all of them at the end.
pub fn visible_prefix<T>(points: &[T], progress: Progress) -> &[T] {
    &points[..visible_len(points.len(), progress)]
}

/// Interpolated position along `points` at `progress`.
///
/// Returns `None` only for an empty sequence.
pub fn current_position<T: Lerp>(points: &[T], progress: Progress) -> Option<T> {
    match points {
        [] => None,
        [only] => Some(*only),
        _ => {
            let last = points.len() - 1;
            let scaled = progress.get() * last as f64;
            let i0 = (scaled.floor() as usize).min(last);
            let i1 = (i0 + 1).min(last);
            if i0 == i1 {
                return Some(points[i0]);
            }
            let t = scaled - i0 as f64;
            Some(points[i0].lerp(points[i1], t))
        }
    }
}

/// Frame count of an export run: `max(2, round(duration_secs * fps))`.
///
/// Negative or non-finite durations produce the minimum of two frames.
pub fn total_frames(duration_secs: f64, fps: u32) -> u64 {
    let frames = duration_secs * f64::from(fps);
    if !frames.is_finite() || frames <= 2.0 {
        return 2;
    }
    (frames.round() as u64).max(2)
}

/// Progress of frame `index`: `index / (total_frames - 1)`, so the last frame lands on the end.
pub fn frame_progress(index: u64, total_frames: u64) -> Progress {
    Progress::at_frame(index, total_frames)
}

#[cfg(test)]
#[path = "../../tests/unit/route/sampler.rs"]
mod tests;
