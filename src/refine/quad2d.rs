//! Separable refinement of a peak on a square correlation surface.

use crate::refine::SubpixelMode;

/// Refines the integer peak `(i, j)` of an `n x n` row-major surface.
///
/// `dx` is fitted along row `j` and `dy` along column `i`, each from the peak
/// sample and its two neighbors. An axis whose neighbors fall outside the
/// surface keeps its integer coordinate. Returns refined `(i, j)`.
pub fn refine_subpixel_2d(
    surface: &[f32],
    n: usize,
    i: usize,
    j: usize,
    mode: SubpixelMode,
) -> (f32, f32) {
    let at = |x: usize, y: usize| surface[y * n + x];
    let peak = at(i, j);

    let dx = if i >= 1 && i + 1 < n {
        mode.offset(at(i - 1, j), peak, at(i + 1, j))
    } else {
        0.0
    };
    let dy = if j >= 1 && j + 1 < n {
        mode.offset(at(i, j - 1), peak, at(i, j + 1))
    } else {
        0.0
    };

    (i as f32 + dx, j as f32 + dy)
}

#[cfg(test)]
mod tests {
    use super::refine_subpixel_2d;
    use crate::refine::SubpixelMode;

    fn paraboloid(n: usize, cx: f32, cy: f32) -> Vec<f32> {
        let mut s = Vec::with_capacity(n * n);
        for y in 0..n {
            for x in 0..n {
                s.push(1.0 - (x as f32 - cx).powi(2) - (y as f32 - cy).powi(2));
            }
        }
        s
    }

    #[test]
    fn refine_subpixel_separable_paraboloid() {
        let s = paraboloid(5, 2.3, 1.8);
        let (x_ref, y_ref) = refine_subpixel_2d(&s, 5, 2, 2, SubpixelMode::Parabolic);
        assert!((x_ref - 2.3).abs() < 1e-3);
        assert!((y_ref - 1.8).abs() < 1e-3);
    }

    #[test]
    fn none_mode_keeps_integer_peak() {
        let s = paraboloid(5, 2.3, 1.8);
        assert_eq!(
            refine_subpixel_2d(&s, 5, 2, 2, SubpixelMode::None),
            (2.0, 2.0)
        );
    }

    #[test]
    fn edge_peaks_are_not_refined_along_the_clipped_axis() {
        let s = paraboloid(5, 0.2, 2.4);
        let (x_ref, y_ref) = refine_subpixel_2d(&s, 5, 0, 2, SubpixelMode::Parabolic);
        assert_eq!(x_ref, 0.0);
        assert!((y_ref - 2.4).abs() < 1e-3);
    }
}
