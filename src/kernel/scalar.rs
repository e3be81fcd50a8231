//! Scalar reference kernels for surface evaluation.

use crate::candidate::lobe::ZeroLagLobe;
use crate::candidate::peak::select_peak;
use crate::flow::plan::FlowPlan;
use crate::kernel::{LagKernel, RowTask};
use crate::refine::quad2d::refine_subpixel_2d;
use crate::util::math::window_stats;

/// Plain loop lag kernel.
pub struct ScalarLag;

impl LagKernel for ScalarLag {
    #[inline]
    fn dot(a: &[f32], b: &[f32]) -> f32 {
        let mut acc = 0.0f32;
        for (&x, &y) in a.iter().zip(b) {
            acc += x * y;
        }
        acc
    }
}

/// Result of one pixel's work unit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Estimate {
    pub(crate) dx: f32,
    pub(crate) dy: f32,
    pub(crate) confidence: f32,
}

impl Estimate {
    /// Written where no estimate is available.
    pub(crate) const NONE: Estimate = Estimate {
        dx: 0.0,
        dy: 0.0,
        confidence: 0.0,
    };

    /// A flat window matches itself at every lag.
    const FLAT: Estimate = Estimate {
        dx: 0.0,
        dy: 0.0,
        confidence: 1.0,
    };
}

/// Overlap energy below which one side of a lag carries no contrast. The
/// window has unit energy, so this is relative to the whole window.
const MIN_OVERLAP_ENERGY: f64 = 1e-6;

/// Correlation coefficient between the part `A` of the window at `p` and the
/// part `B` at `p + (dx, dy)`, over the positions where both lie in the
/// `n x n` window.
///
/// The expression is symmetric in `A` and `B`, so a lag and its negation
/// give bit-identical values.
fn lag_coefficient<K: LagKernel>(window: &[f32], n: usize, dx: isize, dy: isize) -> f32 {
    let cols = n - dx.unsigned_abs();
    let rows = n - dy.unsigned_abs();
    let (ax, bx) = if dx >= 0 {
        (0, dx as usize)
    } else {
        (dx.unsigned_abs(), 0)
    };
    let (ay, by) = if dy >= 0 {
        (0, dy as usize)
    } else {
        (dy.unsigned_abs(), 0)
    };

    let (mut sa, mut sb, mut saa, mut sbb, mut sab) = (0.0f64, 0.0f64, 0.0f64, 0.0f64, 0.0f64);
    for r in 0..rows {
        let a = &window[(ay + r) * n + ax..][..cols];
        let b = &window[(by + r) * n + bx..][..cols];
        for (&x, &y) in a.iter().zip(b) {
            let (x, y) = (x as f64, y as f64);
            sa += x;
            sb += y;
            saa += x * x;
            sbb += y * y;
        }
        sab += K::dot(a, b) as f64;
    }

    let m = (rows * cols) as f64;
    let va = saa - sa * sa / m;
    let vb = sbb - sb * sb / m;
    if va <= MIN_OVERLAP_ENERGY || vb <= MIN_OVERLAP_ENERGY {
        return 0.0;
    }
    let cov = sab - sa * sb / m;
    (cov / (va * vb).sqrt()).clamp(-1.0, 1.0) as f32
}

/// Fills `surface` with the per-lag correlation of a normalized window.
///
/// Surface index `k` stands for the lag `(k % n - center, k / n - center)`.
/// The zero lag is exactly `1`.
pub(crate) fn fill_surface<K: LagKernel>(
    window: &[f32],
    n: usize,
    center: usize,
    surface: &mut [f32],
) {
    for (k, out) in surface.iter_mut().enumerate() {
        let dx = (k % n) as isize - center as isize;
        let dy = (k / n) as isize - center as isize;
        *out = if dx == 0 && dy == 0 {
            1.0
        } else {
            lag_coefficient::<K>(window, n, dx, dy)
        };
    }
}

/// Runs the full work unit for the interior pixel `(x, y)`.
///
/// On return `surface` holds the pixel's correlation surface; it is zeroed
/// when the window holds non-finite samples.
pub(crate) fn estimate_at<K: LagKernel>(
    plan: &FlowPlan,
    image: &[f32],
    x: usize,
    y: usize,
    window: &mut [f32],
    surface: &mut [f32],
    lobe: &mut ZeroLagLobe,
) -> Estimate {
    let n = plan.window;
    let c = plan.center;
    let width = plan.extent.width;
    let (x0, y0) = (x - c, y - c);

    for (j, dst) in window.chunks_exact_mut(n).enumerate() {
        let start = (y0 + j) * width + x0;
        dst.copy_from_slice(&image[start..start + n]);
    }

    let stats = window_stats(window);
    if !stats.mean.is_finite() {
        surface.fill(0.0);
        return Estimate::NONE;
    }
    if stats.is_flat(plan.params.flat_tolerance) {
        surface.fill(1.0);
        return Estimate::FLAT;
    }

    let energy = stats.variance * (n * n) as f64;
    let scale = 1.0 / energy.sqrt();
    for value in window.iter_mut() {
        *value = ((*value as f64 - stats.mean) * scale) as f32;
    }

    fill_surface::<K>(window, n, c, surface);

    let excluded = lobe.mark(surface, n, c, plan.params.lobe_level);
    match select_peak(surface, n, c, &plan.candidates, excluded) {
        Some(peak) => {
            let (pi, pj) = refine_subpixel_2d(surface, n, peak.i, peak.j, plan.params.subpixel);
            Estimate {
                dx: pi - c as f32,
                dy: pj - c as f32,
                confidence: peak.value.clamp(0.0, 1.0),
            }
        }
        None => Estimate::NONE,
    }
}

/// Processes one image row: interior pixels get an estimate and their
/// surface tile, border pixels get the zero sentinel and a zeroed tile.
pub(crate) fn process_row<K: LagKernel>(plan: &FlowPlan, image: &[f32], task: RowTask<'_>) {
    let RowTask {
        y,
        flow_x,
        flow_y,
        confidence,
        tiles,
        scratch,
    } = task;
    let n = plan.window;
    let tile_row = plan.extent.width * n;
    let interior_row = plan.rows.contains(&y);
    let (window, surface) = scratch.split_at_mut(plan.tile_len());
    let mut lobe = ZeroLagLobe::new(plan.tile_len());

    for x in 0..plan.extent.width {
        let estimate = if interior_row && plan.cols.contains(&x) {
            let estimate = estimate_at::<K>(plan, image, x, y, window, surface, &mut lobe);
            for (j, src) in surface.chunks_exact(n).enumerate() {
                tiles[j * tile_row + x * n..][..n].copy_from_slice(src);
            }
            estimate
        } else {
            for j in 0..n {
                tiles[j * tile_row + x * n..][..n].fill(0.0);
            }
            Estimate::NONE
        };
        flow_x[x] = estimate.dx;
        flow_y[x] = estimate.dy;
        confidence[x] = estimate.confidence;
    }
}

/// Runs [`process_row`] for every task on the calling thread.
pub(crate) fn process_rows<K: LagKernel>(
    plan: &FlowPlan,
    image: &[f32],
    tasks: Vec<RowTask<'_>>,
) {
    for task in tasks {
        process_row::<K>(plan, image, task);
    }
}
