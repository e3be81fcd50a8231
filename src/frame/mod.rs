//! Frame buffers: owned 2D sample grids with an accelerator mirror.
//!
//! A [`FrameBuffer`] stores `width * height` row-major `f32` samples on the
//! host. The first device use creates a mirror on the [`Accelerator`];
//! afterwards the two copies are tracked independently. Mutating the host
//! copy marks the mirror stale and kernel writes mark the host copy stale.
//! Nothing resynchronizes implicitly: callers (and the engine) use
//! [`FrameBuffer::ensure_device`] and [`FrameBuffer::ensure_host`], which only
//! transfer when the target copy is out of date.

use crate::accel::{Accelerator, DeviceBuffer};
use crate::util::{CorrFlowError, CorrFlowResult};

pub mod raw;

pub use raw::ElementKind;

/// Width and height of a frame in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameExtent {
    pub width: usize,
    pub height: usize,
}

impl FrameExtent {
    /// Creates an extent, rejecting zero or overflowing dimensions.
    pub fn new(width: usize, height: usize) -> CorrFlowResult<Self> {
        let extent = Self { width, height };
        extent.sample_count()?;
        Ok(extent)
    }

    /// Number of samples covered by the extent.
    pub fn sample_count(&self) -> CorrFlowResult<usize> {
        let (width, height) = (self.width, self.height);
        if width == 0 || height == 0 {
            return Err(CorrFlowError::InvalidDimensions { width, height });
        }
        width
            .checked_mul(height)
            .ok_or(CorrFlowError::InvalidDimensions { width, height })
    }

    /// Returns the extent scaled by `factor` along both axes.
    pub fn scaled(&self, factor: usize) -> CorrFlowResult<Self> {
        let width = self.width.checked_mul(factor);
        let height = self.height.checked_mul(factor);
        match (width, height) {
            (Some(width), Some(height)) => Self::new(width, height),
            _ => Err(CorrFlowError::InvalidDimensions {
                width: self.width,
                height: self.height,
            }),
        }
    }
}

/// Where the authoritative copy of a frame lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Residency {
    /// No device mirror exists yet.
    HostOnly,
    /// Host and device copies hold the same samples.
    Synced,
    /// The host copy changed after the last upload.
    DeviceStale,
    /// A kernel wrote the device copy after the last download.
    HostStale,
}

/// Owned contiguous frame of `f32` samples.
#[derive(Clone, Debug)]
pub struct FrameBuffer {
    data: Vec<f32>,
    width: usize,
    height: usize,
    mirror: Option<DeviceBuffer>,
    device_current: bool,
    host_current: bool,
}

impl FrameBuffer {
    /// Creates a zero-filled frame.
    pub fn new(width: usize, height: usize) -> CorrFlowResult<Self> {
        let len = FrameExtent { width, height }.sample_count()?;
        Self::from_vec(vec![0.0; len], width, height)
    }

    /// Creates a zero-filled frame covering `extent`.
    pub fn with_extent(extent: FrameExtent) -> CorrFlowResult<Self> {
        Self::new(extent.width, extent.height)
    }

    /// Wraps row-major samples; `data.len()` must equal `width * height`.
    pub fn from_vec(data: Vec<f32>, width: usize, height: usize) -> CorrFlowResult<Self> {
        let expected = FrameExtent { width, height }.sample_count()?;
        if data.len() != expected {
            return Err(CorrFlowError::LengthMismatch {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            mirror: None,
            device_current: false,
            host_current: true,
        })
    }

    /// Builds a frame by evaluating `f(x, y)` at every pixel.
    pub fn from_fn(
        width: usize,
        height: usize,
        mut f: impl FnMut(usize, usize) -> f32,
    ) -> CorrFlowResult<Self> {
        let mut frame = Self::new(width, height)?;
        for (y, row) in frame.data.chunks_exact_mut(width).enumerate() {
            for (x, value) in row.iter_mut().enumerate() {
                *value = f(x, y);
            }
        }
        Ok(frame)
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Frame geometry.
    pub fn extent(&self) -> FrameExtent {
        FrameExtent {
            width: self.width,
            height: self.height,
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false: frames have at least one sample.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Host samples in row-major order.
    ///
    /// These may lag behind the device copy; see [`FrameBuffer::residency`].
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Mutable host samples. Marks the device mirror stale.
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        self.device_current = false;
        &mut self.data
    }

    /// Consumes the frame and returns its host samples.
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Sample at `(x, y)`, or `None` outside the frame.
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }

    /// Sample at `(x, y)`.
    ///
    /// Coordinates are checked in debug builds only; callers guarantee them.
    #[inline]
    pub fn at(&self, x: usize, y: usize) -> f32 {
        debug_assert!(x < self.width && y < self.height, "({x}, {y}) out of range");
        self.data[y * self.width + x]
    }

    /// Writes the sample at `(x, y)`. Marks the device mirror stale.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        debug_assert!(x < self.width && y < self.height, "({x}, {y}) out of range");
        self.device_current = false;
        self.data[y * self.width + x] = value;
    }

    /// Fills every sample with `value`. Marks the device mirror stale.
    pub fn fill(&mut self, value: f32) {
        self.device_current = false;
        self.data.fill(value);
    }

    /// Row `y` of the host copy, or `None` past the last row.
    pub fn row(&self, y: usize) -> Option<&[f32]> {
        if y >= self.height {
            return None;
        }
        let start = y * self.width;
        self.data.get(start..start + self.width)
    }

    /// Iterator over host rows.
    pub fn rows(&self) -> std::slice::ChunksExact<'_, f32> {
        self.data.chunks_exact(self.width)
    }

    /// Reports which copy is current.
    pub fn residency(&self) -> Residency {
        match (&self.mirror, self.device_current, self.host_current) {
            (None, _, _) => Residency::HostOnly,
            (Some(_), true, true) => Residency::Synced,
            (Some(_), false, _) => Residency::DeviceStale,
            (Some(_), true, false) => Residency::HostStale,
        }
    }

    /// Makes the device mirror current, allocating it on first use.
    ///
    /// Uploads only when the host copy changed since the last upload.
    pub fn ensure_device(&mut self, accel: &Accelerator) -> CorrFlowResult<()> {
        if self.mirror.is_some() && self.device_current {
            return Ok(());
        }
        let mirror = match self.mirror.take() {
            Some(mirror) => mirror,
            None => accel.alloc(self.data.len())?,
        };
        let mirror = self.mirror.insert(mirror);
        mirror.upload(&self.data)?;
        self.device_current = true;
        self.host_current = true;
        Ok(())
    }

    /// Makes the host copy current, downloading only when a kernel wrote the
    /// mirror since the last download.
    pub fn ensure_host(&mut self) -> CorrFlowResult<()> {
        if self.host_current {
            return Ok(());
        }
        if let Some(mirror) = &self.mirror {
            mirror.download(&mut self.data)?;
        }
        self.host_current = true;
        Ok(())
    }

    /// Read access to the device mirror, if it is current.
    pub(crate) fn device(&self) -> Option<&[f32]> {
        match &self.mirror {
            Some(mirror) if self.device_current => Some(mirror.as_slice()),
            _ => None,
        }
    }

    /// Write access to the device mirror for a kernel that overwrites every
    /// sample. The host copy becomes stale.
    pub(crate) fn device_mut(&mut self, accel: &Accelerator) -> CorrFlowResult<&mut [f32]> {
        if self.mirror.is_none() {
            self.mirror = Some(accel.alloc(self.data.len())?);
        }
        self.device_current = true;
        self.host_current = false;
        match self.mirror.as_mut() {
            Some(mirror) => Ok(mirror.as_mut_slice()),
            None => Err(CorrFlowError::Device("device mirror missing".into())),
        }
    }
}
