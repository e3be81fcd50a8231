//! Correlation surface kernels.
//!
//! A row kernel processes every pixel of one image row: it extracts and
//! normalizes the window, fills the pixel's surface tile over the flat index
//! space of `window * window` lags, reduces it to a peak and writes the flow
//! and confidence samples. Rows share nothing mutable, so the same kernel
//! runs sequentially ([`scalar`]) or on the accelerator's pool ([`rayon`]).

/// Inner product used for one row segment of a lag sum.
pub trait LagKernel {
    /// Returns `sum(a[k] * b[k])`; slices have equal length.
    fn dot(a: &[f32], b: &[f32]) -> f32;
}

/// Output slices and scratch owned by one row of work.
pub(crate) struct RowTask<'a> {
    pub(crate) y: usize,
    pub(crate) flow_x: &'a mut [f32],
    pub(crate) flow_y: &'a mut [f32],
    pub(crate) confidence: &'a mut [f32],
    /// `window` consecutive rows of the tile buffer.
    pub(crate) tiles: &'a mut [f32],
    /// Normalized window followed by the surface accumulator.
    pub(crate) scratch: &'a mut [f32],
}

pub mod scalar;

#[cfg(feature = "simd")]
pub mod simd;

#[cfg(feature = "rayon")]
pub mod rayon;

#[cfg(not(feature = "simd"))]
pub(crate) use scalar::ScalarLag as ActiveLag;
#[cfg(feature = "simd")]
pub(crate) use simd::SimdLag as ActiveLag;
