//! SIMD lag products using the `wide` crate.
//!
//! Row segments are consumed eight samples at a time as `f32x8`, with a
//! scalar tail for the remainder.

use crate::kernel::LagKernel;
use wide::f32x8;

const LANES: usize = 8;

#[inline]
fn load_f32x8(slice: &[f32]) -> f32x8 {
    f32x8::from([
        slice[0], slice[1], slice[2], slice[3], slice[4], slice[5], slice[6], slice[7],
    ])
}

/// Horizontal sum of f32x8.
#[inline]
fn hsum(v: f32x8) -> f32 {
    let arr = v.to_array();
    arr[0] + arr[1] + arr[2] + arr[3] + arr[4] + arr[5] + arr[6] + arr[7]
}

/// Vectorized lag kernel.
pub struct SimdLag;

impl LagKernel for SimdLag {
    #[inline]
    fn dot(a: &[f32], b: &[f32]) -> f32 {
        let len = a.len().min(b.len());
        let simd_end = len / LANES * LANES;

        let mut acc = f32x8::ZERO;
        let mut k = 0;
        while k < simd_end {
            acc += load_f32x8(&a[k..]) * load_f32x8(&b[k..]);
            k += LANES;
        }

        let mut tail = 0.0f32;
        while k < len {
            tail += a[k] * b[k];
            k += 1;
        }
        hsum(acc) + tail
    }
}
