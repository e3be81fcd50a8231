//! Mathematical helpers for window statistics and lag geometry.

use std::ops::Range;

/// First and second moments of a window accumulated in `f64`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct WindowStats {
    pub(crate) mean: f64,
    pub(crate) variance: f64,
    /// `max - min` over the samples that are not NaN.
    pub(crate) range: f64,
}

impl WindowStats {
    /// Returns true when the window carries no usable contrast.
    ///
    /// A window is flat when its variance is at most `tolerance` times its
    /// squared range. Constant windows are always flat. Both sides scale
    /// with `a^2` under `a * w + b`, so the test ignores gain and offset.
    pub(crate) fn is_flat(&self, tolerance: f64) -> bool {
        self.variance <= tolerance * self.range * self.range
    }
}

/// Computes mean, population variance and range of `samples`.
pub(crate) fn window_stats(samples: &[f32]) -> WindowStats {
    if samples.is_empty() {
        return WindowStats {
            mean: 0.0,
            variance: 0.0,
            range: 0.0,
        };
    }
    let count = samples.len() as f64;
    let mut sum = 0.0f64;
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &value in samples {
        let v = value as f64;
        sum += v;
        lo = lo.min(v);
        hi = hi.max(v);
    }
    let mean = sum / count;
    let mut variance = 0.0f64;
    for &value in samples {
        let d = value as f64 - mean;
        variance += d * d;
    }
    WindowStats {
        mean,
        variance: variance / count,
        range: hi - lo,
    }
}

/// Chebyshev length of a lag.
#[inline]
pub(crate) fn chebyshev(dx: isize, dy: isize) -> usize {
    dx.unsigned_abs().max(dy.unsigned_abs())
}

/// Coordinates along one axis whose window does not come within `window / 2`
/// of either border.
pub(crate) fn interior_range(len: usize, window: usize) -> Range<usize> {
    let margin = window / 2;
    if len <= 2 * margin {
        return margin..margin;
    }
    margin..len - margin
}

#[cfg(test)]
mod tests {
    use super::{chebyshev, interior_range, window_stats};

    #[test]
    fn stats_of_constant_window_are_flat() {
        let stats = window_stats(&[3.5f32; 25]);
        assert_eq!(stats.mean, 3.5);
        assert_eq!(stats.variance, 0.0);
        assert!(stats.is_flat(1e-10));
    }

    #[test]
    fn stats_match_known_values() {
        let stats = window_stats(&[0.0, 1.0, 2.0, 3.0]);
        assert!((stats.mean - 1.5).abs() < 1e-12);
        assert!((stats.variance - 1.25).abs() < 1e-12);
        assert_eq!(stats.range, 3.0);
        assert!(!stats.is_flat(1e-10));
    }

    #[test]
    fn flatness_ignores_a_large_offset() {
        let texture: Vec<f32> = (0..25).map(|k| ((k * 13) % 64) as f32 / 8.0).collect();
        let lifted: Vec<f32> = texture.iter().map(|v| v + 1.0e5).collect();
        let base = window_stats(&texture);
        let moved = window_stats(&lifted);
        assert!(!base.is_flat(1e-10));
        assert!(!moved.is_flat(1e-10));
        assert_eq!(base.range, moved.range);
        assert!((base.variance - moved.variance).abs() < 1e-9);
    }

    #[test]
    fn non_finite_windows_are_not_flat() {
        assert!(!window_stats(&[1.0, f32::NAN, 2.0]).is_flat(1e-10));
        assert!(!window_stats(&[f32::NAN; 4]).is_flat(1e-10));
    }

    #[test]
    fn all_zero_window_is_flat() {
        assert!(window_stats(&[0.0f32; 9]).is_flat(0.0));
    }

    #[test]
    fn chebyshev_takes_larger_component() {
        assert_eq!(chebyshev(-3, 2), 3);
        assert_eq!(chebyshev(0, -1), 1);
        assert_eq!(chebyshev(0, 0), 0);
    }

    #[test]
    fn interior_range_excludes_margins() {
        assert_eq!(interior_range(10, 5), 2..8);
        assert_eq!(interior_range(10, 1), 0..10);
        assert_eq!(interior_range(5, 5), 2..3);
        assert!(interior_range(4, 4).is_empty());
    }
}
