//! Headerless raw sample files.
//!
//! A raw file is a row-major dump of `width * height` samples in
//! little-endian byte order with no header. The element kind is not stored in
//! the file; the caller selects it for every read and write.

use crate::frame::FrameBuffer;
use crate::util::{CorrFlowError, CorrFlowResult};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Sample encoding of a raw file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementKind {
    /// 32-bit IEEE float.
    F32,
    /// 8-bit unsigned integer.
    U8,
}

impl ElementKind {
    /// Bytes per sample.
    pub fn size(self) -> usize {
        match self {
            ElementKind::F32 => 4,
            ElementKind::U8 => 1,
        }
    }
}

impl FrameBuffer {
    /// Reads a raw file of exactly `width * height` samples of `kind`.
    pub fn read_raw<P: AsRef<Path>>(
        path: P,
        width: usize,
        height: usize,
        kind: ElementKind,
    ) -> CorrFlowResult<Self> {
        let path = path.as_ref();
        let count = crate::frame::FrameExtent { width, height }.sample_count()?;
        let bytes = std::fs::read(path).map_err(|err| CorrFlowError::io(path, err))?;
        let expected = count
            .checked_mul(kind.size())
            .ok_or(CorrFlowError::InvalidDimensions { width, height })?;
        if bytes.len() != expected {
            return Err(CorrFlowError::Io {
                path: path.to_path_buf(),
                reason: format!(
                    "expected {expected} bytes for {width}x{height} {kind:?}, found {}",
                    bytes.len()
                ),
            });
        }

        let data = match kind {
            ElementKind::F32 => bytes
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
            ElementKind::U8 => bytes.iter().map(|&b| b as f32).collect(),
        };
        Self::from_vec(data, width, height)
    }

    /// Writes the host samples as a raw file of `kind`.
    ///
    /// `U8` output rounds to the nearest integer and saturates to `0..=255`;
    /// NaN is written as `0`.
    pub fn write_raw<P: AsRef<Path>>(&self, path: P, kind: ElementKind) -> CorrFlowResult<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|err| CorrFlowError::io(path, err))?;
        let mut writer = BufWriter::new(file);
        let result = match kind {
            ElementKind::F32 => self
                .as_slice()
                .iter()
                .try_for_each(|v| writer.write_all(&v.to_le_bytes())),
            ElementKind::U8 => {
                let bytes: Vec<u8> = self
                    .as_slice()
                    .iter()
                    .map(|&v| v.round().clamp(0.0, 255.0) as u8)
                    .collect();
                writer.write_all(&bytes)
            }
        };
        result
            .and_then(|()| writer.flush())
            .map_err(|err| CorrFlowError::io(path, err))
    }
}
