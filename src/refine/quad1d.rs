//! Three-point peak interpolation along one axis.
//!
//! Both fits place a parabola through the samples at `-1, 0, +1` and return
//! the vertex offset from the middle sample. The Gaussian fit works on the
//! logarithm of the samples, which is exact for a Gaussian-shaped peak.

/// Smallest curvature magnitude accepted as a real maximum.
const MIN_CURVATURE: f32 = 1e-6;

/// Vertex of the parabola through `(-1, fm)`, `(0, f0)`, `(1, fp)`.
///
/// Rejects non-finite samples, non-concave or nearly flat fits and vertices
/// outside the sample span.
fn parabola_vertex(fm: f32, f0: f32, fp: f32) -> Option<f32> {
    if !(fm.is_finite() && f0.is_finite() && fp.is_finite()) {
        return None;
    }
    let curvature = fm + fp - 2.0 * f0;
    if curvature > -MIN_CURVATURE {
        return None;
    }
    let offset = (fm - fp) / (2.0 * curvature);
    (offset.is_finite() && offset.abs() <= 1.0).then_some(offset)
}

/// Sub-sample peak offset from a parabolic fit.
pub fn quad_peak_offset_1d(fm: f32, f0: f32, fp: f32) -> Option<f32> {
    parabola_vertex(fm, f0, fp)
}

/// Sub-sample peak offset from a Gaussian fit; every sample must be positive.
pub fn gauss_peak_offset_1d(fm: f32, f0: f32, fp: f32) -> Option<f32> {
    if fm > 0.0 && f0 > 0.0 && fp > 0.0 {
        parabola_vertex(fm.ln(), f0.ln(), fp.ln())
    } else {
        None
    }
}
