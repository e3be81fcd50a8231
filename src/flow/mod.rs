//! The autocorrelation flow engine.
//!
//! [`CorrelationFlow`] is bound to one [`Accelerator`] for its lifetime and
//! moves through `Uninitialized -> Initialized -> Destroyed`. `initialize`
//! fixes the image extent and window size and allocates the device scratch;
//! `compute_flow` may then run any number of times; `destroy` frees the
//! scratch and is terminal.
//!
//! # Surface definition
//!
//! For a pixel with window `W` (`n x n`, centered on the pixel) and a lag
//! `l = (dx, dy)`, let `A` be the samples of `W` at positions `p` and `B` the
//! samples at `p + l`, over every `p` where both lie inside `W`. The surface
//! holds the correlation coefficient of the two parts:
//!
//! ```text
//! S(l) = cov(A, B) / sqrt(var(A) * var(B))
//! ```
//!
//! with `S(0, 0) = 1` and `S(l) = 0` when either part has no contrast. Each
//! lag is normalized over its own overlap, so a long shift with few
//! overlapping samples scores as high as a short one when the pattern
//! repeats. Lags cover `[-c, n - c)` on both axes, `c = n / 2`; tile index
//! `(i, j)` holds `S(i - c, j - c)`. `S(l) == S(-l)`, and the values are
//! unchanged by `W -> a * W + b` (`a != 0`) up to rounding.
//!
//! Windows whose variance is at most `flat_tolerance` times their squared
//! range are perfectly self-similar: their tile is all ones, their
//! displacement `(0, 0)` and their confidence `1`. Windows holding NaN or
//! infinite samples get the border sentinel and a zeroed tile.
//!
//! # Peak rule
//!
//! 1. The zero-lag lobe is every lag reachable from `(0, 0)` through
//!    8-connected steps onto values above `lobe_level` (default `0.5`) that
//!    never rise above the previous value. Lobe lags are excluded; a level of
//!    `1` excludes nothing.
//! 2. The remaining lags with Chebyshev length in
//!    `[min_offset, offset_radius]` (defaults `[min(1, c), c]`) are searched
//!    for the maximum.
//! 3. Values within `1e-5` of the maximum are tied. The tied lag with the
//!    smallest `dx^2 + dy^2` wins, then the first row-major index (smaller
//!    `dy`, then smaller `dx`).
//!
//! The peak is refined per axis from its tile neighbors; the displacement is
//! the refined tile position minus `c` and the confidence is the integer
//! peak value clamped to `[0, 1]`. When no lag survives the exclusion the
//! pixel gets `(0, 0)` with confidence `0` and keeps its surface tile.

use crate::accel::{Accelerator, DeviceBuffer};
use crate::frame::{FrameBuffer, FrameExtent};
use crate::kernel::{ActiveLag, RowTask};
use crate::params::ParamRegistry;
use crate::trace::{trace_event, trace_span};
use crate::util::{CorrFlowError, CorrFlowResult};

pub mod plan;

pub use plan::FlowParams;
use plan::FlowPlan;

/// Lifecycle state of a [`CorrelationFlow`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Initialized,
    Destroyed,
}

impl EngineState {
    fn name(self) -> &'static str {
        match self {
            EngineState::Uninitialized => "uninitialized",
            EngineState::Initialized => "initialized",
            EngineState::Destroyed => "destroyed",
        }
    }

    fn reject(self, operation: &'static str) -> CorrFlowError {
        CorrFlowError::InvalidState {
            operation,
            state: self.name(),
        }
    }
}

struct Session {
    extent: FrameExtent,
    window: usize,
    /// One normalized window plus one surface per image row.
    scratch: DeviceBuffer,
}

/// Single-image autocorrelation flow estimator.
pub struct CorrelationFlow<'a> {
    accel: &'a Accelerator,
    state: EngineState,
    session: Option<Session>,
}

impl<'a> CorrelationFlow<'a> {
    /// Creates an uninitialized engine on `accel`.
    pub fn new(accel: &'a Accelerator) -> Self {
        Self {
            accel,
            state: EngineState::Uninitialized,
            session: None,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Image extent fixed by `initialize`.
    pub fn extent(&self) -> Option<FrameExtent> {
        self.session.as_ref().map(|s| s.extent)
    }

    /// Window size fixed by `initialize`.
    pub fn window(&self) -> Option<usize> {
        self.session.as_ref().map(|s| s.window)
    }

    /// Validates the geometry and allocates device scratch.
    ///
    /// The window must satisfy `1 <= window <= min(width, height)`. On error
    /// the engine stays `Uninitialized` and may be initialized again.
    pub fn initialize(&mut self, extent: FrameExtent, window: usize) -> CorrFlowResult<()> {
        if self.state != EngineState::Uninitialized {
            return Err(self.state.reject("initialize"));
        }
        extent.sample_count()?;
        if window == 0 || window > extent.width.min(extent.height) {
            return Err(CorrFlowError::InvalidWindow {
                window,
                width: extent.width,
                height: extent.height,
            });
        }
        // The tile buffer must be addressable as well.
        extent.scaled(window)?.sample_count()?;

        let lane = 2 * window * window;
        let scratch_len = lane
            .checked_mul(extent.height)
            .ok_or(CorrFlowError::InvalidDimensions {
                width: extent.width,
                height: extent.height,
            })?;
        let scratch = self.accel.alloc(scratch_len)?;

        self.session = Some(Session {
            extent,
            window,
            scratch,
        });
        self.state = EngineState::Initialized;
        trace_event!(
            "flow_initialize",
            width = extent.width,
            height = extent.height,
            window = window
        );
        Ok(())
    }

    /// Computes displacement, confidence and surface tiles for `image`.
    ///
    /// `image`, `flow_x`, `flow_y` and `confidence` must match the
    /// initialized extent; `surfaces` must be `window` times larger on both
    /// axes. Shapes, state and `params` are checked before any output is
    /// touched. On success every output is current on the host.
    pub fn compute_flow(
        &mut self,
        image: &mut FrameBuffer,
        flow_x: &mut FrameBuffer,
        flow_y: &mut FrameBuffer,
        confidence: &mut FrameBuffer,
        surfaces: &mut FrameBuffer,
        params: &ParamRegistry,
    ) -> CorrFlowResult<()> {
        let state = self.state;
        let accel = self.accel;
        let session = match self.session.as_mut() {
            Some(session) if state == EngineState::Initialized => session,
            _ => return Err(state.reject("compute_flow")),
        };
        let extent = session.extent;
        let window = session.window;

        check_shape("image", image, extent)?;
        check_shape("flow_x", flow_x, extent)?;
        check_shape("flow_y", flow_y, extent)?;
        check_shape("confidence", confidence, extent)?;
        check_shape("surfaces", surfaces, extent.scaled(window)?)?;
        let plan = FlowPlan::new(extent, window, FlowParams::resolve(window, params)?);

        let _span = trace_span!(
            "compute_flow",
            width = extent.width,
            height = extent.height,
            window = window,
            candidates = plan.candidates.len()
        )
        .entered();

        image.ensure_device(accel)?;
        let image_dev = image
            .device()
            .ok_or_else(|| CorrFlowError::Device("image upload did not complete".into()))?;

        let width = extent.width;
        let tile_rows = width * plan.tile_len();
        let tasks: Vec<RowTask<'_>> = flow_x
            .device_mut(accel)?
            .chunks_mut(width)
            .zip(flow_y.device_mut(accel)?.chunks_mut(width))
            .zip(confidence.device_mut(accel)?.chunks_mut(width))
            .zip(surfaces.device_mut(accel)?.chunks_mut(tile_rows))
            .zip(session.scratch.as_mut_slice().chunks_mut(plan.lane_len()))
            .enumerate()
            .map(|(y, ((((fx, fy), conf), tiles), scratch))| RowTask {
                y,
                flow_x: fx,
                flow_y: fy,
                confidence: conf,
                tiles,
                scratch,
            })
            .collect();
        if tasks.len() != extent.height {
            return Err(CorrFlowError::Device(format!(
                "dispatched {} rows for a {}-row image",
                tasks.len(),
                extent.height
            )));
        }

        dispatch(accel, &plan, image_dev, tasks);

        flow_x.ensure_host()?;
        flow_y.ensure_host()?;
        confidence.ensure_host()?;
        surfaces.ensure_host()?;

        trace_event!(
            "flow_computed",
            interior_cols = plan.cols.len(),
            interior_rows = plan.rows.len()
        );
        Ok(())
    }

    /// Releases device scratch. Idempotent; a no-op unless initialized.
    pub fn destroy(&mut self) {
        if self.state != EngineState::Initialized {
            return;
        }
        self.session = None;
        self.state = EngineState::Destroyed;
        trace_event!("flow_destroy", live_bytes = self.accel.allocated_bytes());
    }
}

impl Drop for CorrelationFlow<'_> {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn check_shape(
    name: &'static str,
    frame: &FrameBuffer,
    expected: FrameExtent,
) -> CorrFlowResult<()> {
    if frame.extent() == expected {
        return Ok(());
    }
    Err(CorrFlowError::ShapeMismatch {
        name,
        expected_width: expected.width,
        expected_height: expected.height,
        width: frame.width(),
        height: frame.height(),
    })
}

#[cfg(feature = "rayon")]
fn dispatch(accel: &Accelerator, plan: &FlowPlan, image: &[f32], tasks: Vec<RowTask<'_>>) {
    match accel.pool() {
        Some(pool) => {
            crate::kernel::rayon::process_rows_par::<ActiveLag>(pool, plan, image, tasks)
        }
        None => crate::kernel::scalar::process_rows::<ActiveLag>(plan, image, tasks),
    }
}

#[cfg(not(feature = "rayon"))]
fn dispatch(_accel: &Accelerator, plan: &FlowPlan, image: &[f32], tasks: Vec<RowTask<'_>>) {
    crate::kernel::scalar::process_rows::<ActiveLag>(plan, image, tasks);
}
