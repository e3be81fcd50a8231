//! Sub-pixel peak refinement.

pub(crate) mod quad1d;
pub(crate) mod quad2d;

/// Interpolation used to refine an integer surface peak.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SubpixelMode {
    /// Keep the integer peak.
    None,
    /// Three-point parabola per axis.
    #[default]
    Parabolic,
    /// Three-point parabola on log values per axis; falls back to the
    /// parabolic fit when a sample is not positive.
    Gaussian,
}

impl SubpixelMode {
    /// Maps the `subpixel_order` registry value to a mode.
    pub fn from_order(order: usize) -> Option<Self> {
        match order {
            0 => Some(SubpixelMode::None),
            1 => Some(SubpixelMode::Parabolic),
            2 => Some(SubpixelMode::Gaussian),
            _ => None,
        }
    }

    /// Inverse of [`SubpixelMode::from_order`].
    pub fn order(self) -> usize {
        match self {
            SubpixelMode::None => 0,
            SubpixelMode::Parabolic => 1,
            SubpixelMode::Gaussian => 2,
        }
    }

    /// Offset of the peak from the middle sample, `0.0` if the fit fails.
    pub(crate) fn offset(self, fm: f32, f0: f32, fp: f32) -> f32 {
        match self {
            SubpixelMode::None => None,
            SubpixelMode::Parabolic => quad1d::quad_peak_offset_1d(fm, f0, fp),
            SubpixelMode::Gaussian => quad1d::gauss_peak_offset_1d(fm, f0, fp)
                .or_else(|| quad1d::quad_peak_offset_1d(fm, f0, fp)),
        }
        .unwrap_or(0.0)
    }
}
