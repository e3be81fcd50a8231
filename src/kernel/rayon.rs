//! Rayon-parallel row dispatch (feature-gated).
//!
//! Every row task owns disjoint output slices and its own scratch lane, so
//! rows are mapped over the accelerator's pool without synchronization. The
//! call blocks until the last row has finished.

use crate::flow::plan::FlowPlan;
use crate::kernel::scalar::process_row;
use crate::kernel::{LagKernel, RowTask};
use rayon::prelude::*;
use rayon::ThreadPool;

/// Runs the row kernel for every task on `pool`.
pub(crate) fn process_rows_par<K: LagKernel>(
    pool: &ThreadPool,
    plan: &FlowPlan,
    image: &[f32],
    tasks: Vec<RowTask<'_>>,
) {
    pool.install(|| {
        tasks
            .into_par_iter()
            .for_each(|task| process_row::<K>(plan, image, task));
    });
}
