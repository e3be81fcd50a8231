//! Zero-lag lobe segmentation.
//!
//! Every surface peaks at the zero lag. The lobe around it is the set of
//! lags reachable from the center through 8-connected steps that stay above
//! a level and never climb. Lobe lags cannot be reported as displacements.

use crate::candidate::peak::PEAK_TIE;

/// Reusable mask and work stack for one row of surfaces.
pub(crate) struct ZeroLagLobe {
    mask: Vec<bool>,
    stack: Vec<usize>,
}

impl ZeroLagLobe {
    pub(crate) fn new(tile_len: usize) -> Self {
        Self {
            mask: vec![false; tile_len],
            stack: Vec::new(),
        }
    }

    /// Marks the lobe of an `n x n` surface whose zero lag sits at
    /// `(center, center)` and returns the mask, row-major like the surface.
    ///
    /// A step from `k` to a neighbor `m` is taken when `S(m) > level` and
    /// `S(m) <= S(k)` up to the peak tie tolerance. Nothing is marked when
    /// the center itself is not above `level`.
    pub(crate) fn mark(&mut self, surface: &[f32], n: usize, center: usize, level: f32) -> &[bool] {
        self.mask.clear();
        self.mask.resize(surface.len(), false);
        self.stack.clear();

        let origin = center * n + center;
        if surface[origin] > level {
            self.mask[origin] = true;
            self.stack.push(origin);
        }

        while let Some(k) = self.stack.pop() {
            let (i, j) = (k % n, k / n);
            let ceiling = surface[k] + PEAK_TIE;
            for nj in j.saturating_sub(1)..(j + 2).min(n) {
                for ni in i.saturating_sub(1)..(i + 2).min(n) {
                    let m = nj * n + ni;
                    if self.mask[m] {
                        continue;
                    }
                    let value = surface[m];
                    if value > level && value <= ceiling {
                        self.mask[m] = true;
                        self.stack.push(m);
                    }
                }
            }
        }
        &self.mask
    }
}
