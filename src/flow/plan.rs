//! Per-call parameter resolution and candidate offset tables.

use crate::frame::FrameExtent;
use crate::params::ParamRegistry;
use crate::refine::SubpixelMode;
use crate::util::math::{chebyshev, interior_range};
use crate::util::{CorrFlowError, CorrFlowResult};
use std::ops::Range;

/// Registry key for the largest Chebyshev lag searched for the peak.
pub const OFFSET_RADIUS: &str = "offset_radius";
/// Registry key for the smallest Chebyshev lag searched for the peak.
pub const MIN_OFFSET: &str = "min_offset";
/// Registry key selecting the sub-pixel interpolation (0, 1 or 2).
pub const SUBPIXEL_ORDER: &str = "subpixel_order";
/// Registry key for the variance, relative to the squared sample range,
/// below which a window is flat.
pub const FLAT_TOLERANCE: &str = "flat_tolerance";
/// Registry key for the surface level that bounds the zero-lag lobe.
pub const LOBE_LEVEL: &str = "lobe_level";

/// Default relative variance threshold for flat windows.
pub const DEFAULT_FLAT_TOLERANCE: f64 = 1e-10;
/// Default zero-lag lobe level.
pub const DEFAULT_LOBE_LEVEL: f32 = 0.5;

/// Tunable behavior of one compute call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlowParams {
    /// Largest Chebyshev lag considered for the peak.
    pub offset_radius: usize,
    /// Smallest Chebyshev lag considered for the peak.
    pub min_offset: usize,
    /// Lags connected to the zero lag above this level are never reported.
    /// `1.0` disables the exclusion.
    pub lobe_level: f32,
    /// Sub-pixel interpolation.
    pub subpixel: SubpixelMode,
    /// Windows with `variance <= flat_tolerance * (max - min)^2` are flat.
    pub flat_tolerance: f64,
}

impl FlowParams {
    /// Compiled-in defaults for a window of edge `window`.
    pub fn defaults(window: usize) -> Self {
        let offset_radius = window / 2;
        Self {
            offset_radius,
            min_offset: offset_radius.min(1),
            lobe_level: DEFAULT_LOBE_LEVEL,
            subpixel: SubpixelMode::Parabolic,
            flat_tolerance: DEFAULT_FLAT_TOLERANCE,
        }
    }

    /// Applies registry overrides on top of [`FlowParams::defaults`].
    ///
    /// Unknown keys are ignored. A `min_offset` default follows an overridden
    /// `offset_radius`.
    pub fn resolve(window: usize, registry: &ParamRegistry) -> CorrFlowResult<Self> {
        let mut params = Self::defaults(window);
        let center = window / 2;

        if let Some(radius) = registry.usize_param(OFFSET_RADIUS)? {
            if radius > center {
                return Err(CorrFlowError::invalid_parameter(
                    OFFSET_RADIUS,
                    format!("{radius} exceeds half the window ({center})"),
                ));
            }
            params.offset_radius = radius;
            params.min_offset = radius.min(1);
        }

        if let Some(min_offset) = registry.usize_param(MIN_OFFSET)? {
            if min_offset > params.offset_radius {
                return Err(CorrFlowError::invalid_parameter(
                    MIN_OFFSET,
                    format!(
                        "{min_offset} exceeds the offset radius ({})",
                        params.offset_radius
                    ),
                ));
            }
            params.min_offset = min_offset;
        }

        if let Some(level) = registry.f64_param(LOBE_LEVEL)? {
            if !(0.0..=1.0).contains(&level) {
                return Err(CorrFlowError::invalid_parameter(
                    LOBE_LEVEL,
                    format!("{level} must lie in [0, 1]"),
                ));
            }
            params.lobe_level = level as f32;
        }

        if let Some(order) = registry.usize_param(SUBPIXEL_ORDER)? {
            params.subpixel = SubpixelMode::from_order(order).ok_or_else(|| {
                CorrFlowError::invalid_parameter(
                    SUBPIXEL_ORDER,
                    format!("{order} is not one of 0 (none), 1 (parabolic), 2 (gaussian)"),
                )
            })?;
        }

        if let Some(tolerance) = registry.f64_param(FLAT_TOLERANCE)? {
            if !tolerance.is_finite() || tolerance < 0.0 {
                return Err(CorrFlowError::invalid_parameter(
                    FLAT_TOLERANCE,
                    format!("{tolerance} must be finite and non-negative"),
                ));
            }
            params.flat_tolerance = tolerance;
        }

        Ok(params)
    }
}

/// Everything a row kernel needs for one compute call.
#[derive(Clone, Debug)]
pub(crate) struct FlowPlan {
    pub(crate) extent: FrameExtent,
    pub(crate) window: usize,
    /// Tile index of the zero lag along each axis.
    pub(crate) center: usize,
    pub(crate) params: FlowParams,
    /// Row-major tile indices whose lag lies in the candidate ring.
    pub(crate) candidates: Vec<u32>,
    pub(crate) cols: Range<usize>,
    pub(crate) rows: Range<usize>,
}

impl FlowPlan {
    pub(crate) fn new(extent: FrameExtent, window: usize, params: FlowParams) -> Self {
        let center = window / 2;
        let mut candidates = Vec::new();
        for j in 0..window {
            for i in 0..window {
                let lag = chebyshev(i as isize - center as isize, j as isize - center as isize);
                if lag >= params.min_offset && lag <= params.offset_radius {
                    candidates.push((j * window + i) as u32);
                }
            }
        }
        Self {
            extent,
            window,
            center,
            params,
            candidates,
            cols: interior_range(extent.width, window),
            rows: interior_range(extent.height, window),
        }
    }

    /// Samples per surface tile.
    pub(crate) fn tile_len(&self) -> usize {
        self.window * self.window
    }

    /// Scratch samples per row lane: one normalized window and one surface.
    pub(crate) fn lane_len(&self) -> usize {
        2 * self.tile_len()
    }
}
