//! Intra-surface maximum reduction.

/// Values within this distance of the maximum count as tied.
pub(crate) const PEAK_TIE: f32 = 1e-5;

/// Integer peak on a correlation surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct SurfacePeak {
    /// Column of the peak inside the surface tile.
    pub(crate) i: usize,
    /// Row of the peak inside the surface tile.
    pub(crate) j: usize,
    /// Surface value at the peak.
    pub(crate) value: f32,
}

/// Finds the peak of an `n x n` surface over `candidates`, skipping lags
/// flagged in `excluded`.
///
/// `candidates` are flat row-major indices in ascending order. Values within
/// [`PEAK_TIE`] of the maximum are tied; among those the lag closest to
/// `(center, center)` wins, then the first row-major index. Non-finite
/// samples never win; `None` means no candidate survived.
pub(crate) fn select_peak(
    surface: &[f32],
    n: usize,
    center: usize,
    candidates: &[u32],
    excluded: &[bool],
) -> Option<SurfacePeak> {
    let usable = move || {
        candidates
            .iter()
            .map(|&k| k as usize)
            .filter(move |&k| !excluded[k] && surface[k].is_finite())
    };

    let max = usable().map(|k| surface[k]).max_by(f32::total_cmp)?;
    let floor = max - PEAK_TIE;
    let lag_len = |k: usize| {
        let dx = (k % n).abs_diff(center);
        let dy = (k / n).abs_diff(center);
        dx * dx + dy * dy
    };

    let k = usable()
        .filter(|&k| surface[k] >= floor)
        .min_by_key(|&k| (lag_len(k), k))?;
    Some(SurfacePeak {
        i: k % n,
        j: k / n,
        value: surface[k],
    })
}
