//! Accelerator context and device-side memory.
//!
//! An [`Accelerator`] is acquired once per process and borrowed by every
//! engine that runs on it; dropping it releases the worker pool. Device memory
//! is a separate address space from the host: [`DeviceBuffer`] allocations are
//! accounted against the context and data only moves through explicit
//! uploads and downloads, which the context counts.
//!
//! The parallel backend runs kernels on a dedicated `rayon` thread pool. The
//! scalar backend executes the same kernels sequentially on the calling
//! thread and produces bit-identical results.

use crate::trace::trace_event;
use crate::util::{CorrFlowError, CorrFlowResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

mod buffer;

pub use buffer::DeviceBuffer;

/// Configuration used when acquiring an [`Accelerator`].
#[derive(Clone, Debug)]
pub struct AcceleratorConfig {
    /// Run kernels on a worker pool instead of the calling thread.
    pub parallel: bool,
    /// Worker count for the parallel backend (`None` picks rayon's default).
    pub threads: Option<usize>,
    /// Upper bound on live device memory in bytes (`None` is unbounded).
    pub memory_limit: Option<usize>,
}

impl Default for AcceleratorConfig {
    fn default() -> Self {
        Self {
            parallel: cfg!(feature = "rayon"),
            threads: None,
            memory_limit: None,
        }
    }
}

/// Host/device transfer counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransferStats {
    /// Number of host-to-device copies.
    pub uploads: usize,
    /// Number of device-to-host copies.
    pub downloads: usize,
}

#[derive(Debug, Default)]
pub(crate) struct Ledger {
    allocated: AtomicUsize,
    uploads: AtomicUsize,
    downloads: AtomicUsize,
}

/// Process-wide compute context.
pub struct Accelerator {
    #[cfg(feature = "rayon")]
    pool: Option<rayon::ThreadPool>,
    memory_limit: Option<usize>,
    ledger: Arc<Ledger>,
}

impl Accelerator {
    /// Acquires a context with the given configuration.
    pub fn acquire(config: AcceleratorConfig) -> CorrFlowResult<Self> {
        if config.threads == Some(0) {
            return Err(CorrFlowError::Device(
                "thread count must be at least 1".into(),
            ));
        }

        #[cfg(feature = "rayon")]
        let pool = if config.parallel {
            let mut builder = rayon::ThreadPoolBuilder::new()
                .thread_name(|idx| format!("corrflow-worker-{idx}"));
            if let Some(threads) = config.threads {
                builder = builder.num_threads(threads);
            }
            let pool = builder
                .build()
                .map_err(|err| CorrFlowError::Device(err.to_string()))?;
            Some(pool)
        } else {
            None
        };

        #[cfg(not(feature = "rayon"))]
        if config.parallel {
            return Err(CorrFlowError::Device(
                "parallel backend requires the `rayon` feature".into(),
            ));
        }

        let accel = Self {
            #[cfg(feature = "rayon")]
            pool,
            memory_limit: config.memory_limit,
            ledger: Arc::new(Ledger::default()),
        };
        trace_event!(
            "accelerator_acquire",
            parallel = accel.is_parallel(),
            workers = accel.workers()
        );
        Ok(accel)
    }

    /// Returns true when kernels run on the worker pool.
    pub fn is_parallel(&self) -> bool {
        #[cfg(feature = "rayon")]
        {
            self.pool.is_some()
        }
        #[cfg(not(feature = "rayon"))]
        {
            false
        }
    }

    /// Number of workers that execute kernels.
    pub fn workers(&self) -> usize {
        #[cfg(feature = "rayon")]
        if let Some(pool) = &self.pool {
            return pool.current_num_threads();
        }
        1
    }

    /// Allocates a zeroed device buffer of `len` samples.
    pub fn alloc(&self, len: usize) -> CorrFlowResult<DeviceBuffer> {
        let bytes = len
            .checked_mul(std::mem::size_of::<f32>())
            .ok_or_else(|| CorrFlowError::Device(format!("allocation of {len} samples overflows")))?;
        if let Some(limit) = self.memory_limit {
            let live = self.ledger.allocated.load(Ordering::Relaxed);
            if live.saturating_add(bytes) > limit {
                return Err(CorrFlowError::Device(format!(
                    "out of device memory: {bytes} bytes requested, {live} of {limit} in use"
                )));
            }
        }
        DeviceBuffer::zeroed(len, Arc::clone(&self.ledger))
    }

    /// Bytes of device memory currently allocated on this context.
    pub fn allocated_bytes(&self) -> usize {
        self.ledger.allocated.load(Ordering::Relaxed)
    }

    /// Transfers performed since the context was acquired.
    pub fn transfer_stats(&self) -> TransferStats {
        TransferStats {
            uploads: self.ledger.uploads.load(Ordering::Relaxed),
            downloads: self.ledger.downloads.load(Ordering::Relaxed),
        }
    }

    #[cfg(feature = "rayon")]
    pub(crate) fn pool(&self) -> Option<&rayon::ThreadPool> {
        self.pool.as_ref()
    }
}

impl Drop for Accelerator {
    fn drop(&mut self) {
        trace_event!(
            "accelerator_release",
            live_bytes = self.ledger.allocated.load(Ordering::Relaxed)
        );
    }
}

impl std::fmt::Debug for Accelerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accelerator")
            .field("parallel", &self.is_parallel())
            .field("workers", &self.workers())
            .field("memory_limit", &self.memory_limit)
            .field("allocated_bytes", &self.allocated_bytes())
            .finish()
    }
}
