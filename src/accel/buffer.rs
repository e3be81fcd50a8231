//! Device-resident sample storage.

use crate::accel::Ledger;
use crate::util::{CorrFlowError, CorrFlowResult};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Contiguous `f32` allocation owned by an accelerator context.
///
/// The allocation is returned to the context's accounting when dropped.
pub struct DeviceBuffer {
    data: Vec<f32>,
    ledger: Arc<Ledger>,
}

impl DeviceBuffer {
    pub(crate) fn zeroed(len: usize, ledger: Arc<Ledger>) -> CorrFlowResult<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|err| {
            CorrFlowError::Device(format!("failed to allocate {len} samples: {err}"))
        })?;
        data.resize(len, 0.0);
        ledger
            .allocated
            .fetch_add(len * std::mem::size_of::<f32>(), Ordering::Relaxed);
        Ok(Self { data, ledger })
    }

    /// Number of samples in the buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true for a zero-length allocation.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Device contents.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Copies `host` into the buffer. Lengths must match.
    pub(crate) fn upload(&mut self, host: &[f32]) -> CorrFlowResult<()> {
        if host.len() != self.data.len() {
            return Err(CorrFlowError::LengthMismatch {
                expected: self.data.len(),
                got: host.len(),
            });
        }
        self.data.copy_from_slice(host);
        self.ledger.uploads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Copies the buffer into `host`. Lengths must match.
    pub(crate) fn download(&self, host: &mut [f32]) -> CorrFlowResult<()> {
        if host.len() != self.data.len() {
            return Err(CorrFlowError::LengthMismatch {
                expected: self.data.len(),
                got: host.len(),
            });
        }
        host.copy_from_slice(&self.data);
        self.ledger.downloads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl Clone for DeviceBuffer {
    fn clone(&self) -> Self {
        self.ledger.allocated.fetch_add(
            self.data.len() * std::mem::size_of::<f32>(),
            Ordering::Relaxed,
        );
        Self {
            data: self.data.clone(),
            ledger: Arc::clone(&self.ledger),
        }
    }
}

impl Drop for DeviceBuffer {
    fn drop(&mut self) {
        self.ledger.allocated.fetch_sub(
            self.data.len() * std::mem::size_of::<f32>(),
            Ordering::Relaxed,
        );
    }
}

impl std::fmt::Debug for DeviceBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("len", &self.data.len())
            .finish()
    }
}
