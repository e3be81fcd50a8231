//! CorrFlow estimates a dense displacement field from a single image.
//!
//! Every pixel's neighborhood is correlated against shifted copies of itself;
//! the strongest off-center peak of that autocorrelation surface, refined to
//! sub-pixel precision, gives the pixel's displacement and its height gives a
//! confidence. Work runs on an [`Accelerator`], sequentially or data-parallel
//! via the `rayon` feature, with optional SIMD lag products (`simd`).
//!
//! ```no_run
//! use corrflow::{
//!     Accelerator, AcceleratorConfig, CorrelationFlow, ElementKind, FrameBuffer, ParamRegistry,
//! };
//!
//! # fn main() -> corrflow::CorrFlowResult<()> {
//! let accel = Accelerator::acquire(AcceleratorConfig::default())?;
//! let mut image = FrameBuffer::read_raw("frame-128-100.raw", 128, 100, ElementKind::F32)?;
//! let window = 18;
//!
//! let mut engine = CorrelationFlow::new(&accel);
//! engine.initialize(image.extent(), window)?;
//! let mut flow_x = FrameBuffer::with_extent(image.extent())?;
//! let mut flow_y = FrameBuffer::with_extent(image.extent())?;
//! let mut confidence = FrameBuffer::with_extent(image.extent())?;
//! let mut surfaces = FrameBuffer::with_extent(image.extent().scaled(window)?)?;
//! engine.compute_flow(
//!     &mut image,
//!     &mut flow_x,
//!     &mut flow_y,
//!     &mut confidence,
//!     &mut surfaces,
//!     &ParamRegistry::new(),
//! )?;
//! engine.destroy();
//! # Ok(())
//! # }
//! ```

pub mod accel;
mod candidate;
pub mod export;
pub mod flow;
pub mod frame;
pub mod kernel;
pub mod params;
mod refine;
mod trace;
pub mod util;

pub use accel::{Accelerator, AcceleratorConfig, DeviceBuffer, TransferStats};
pub use flow::plan::{FLAT_TOLERANCE, LOBE_LEVEL, MIN_OFFSET, OFFSET_RADIUS, SUBPIXEL_ORDER};
pub use flow::{CorrelationFlow, EngineState, FlowParams};
pub use frame::{ElementKind, FrameBuffer, FrameExtent, Residency};
pub use params::{ParamRegistry, ParamValue};
pub use refine::quad1d::{gauss_peak_offset_1d, quad_peak_offset_1d};
pub use refine::quad2d::refine_subpixel_2d;
pub use refine::SubpixelMode;
pub use util::{CorrFlowError, CorrFlowResult, ErrorKind};
