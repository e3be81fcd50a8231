//! Candidate offsets and peak reduction on correlation surfaces.

pub(crate) mod lobe;
pub(crate) mod peak;
