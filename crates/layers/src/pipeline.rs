use rayon::prelude::*;
use tracing::debug_span;

use crate::operators::{OperatorParameters, PixelOperator};
use crate::raster::{PixelBuffer, RasterError};

/// Runs one operator over one or more same-sized source buffers.
///
/// Sources are never mutated; every pass writes a fresh output buffer, so
/// rows can be produced in any order or concurrently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RasterPipeline {
    parallel: bool,
}

impl RasterPipeline {
    /// Single-threaded pipeline.
    pub fn new() -> Self {
        Self { parallel: false }
    }

    /// Splits the output by rows across the rayon pool.
    pub fn parallel() -> Self {
        Self { parallel: true }
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    pub fn run(
        &self,
        sources: &[PixelBuffer],
        operator: &PixelOperator,
        params: &OperatorParameters,
    ) -> Result<PixelBuffer, RasterError> {
        let first = sources.first().ok_or(RasterError::EmptyInput)?;
        let expected = first.dimensions();
        for (index, source) in sources.iter().enumerate().skip(1) {
            if source.dimensions() != expected {
                return Err(RasterError::DimensionMismatch {
                    index,
                    expected,
                    found: source.dimensions(),
                });
            }
        }

        let prepared = operator.prepare(params)?;
        let (width, height) = expected;
        let _span = debug_span!(
            "raster_pass",
            operator = operator.name(),
            width,
            height,
            sources = sources.len(),
            parallel = self.parallel
        )
        .entered();

        let mut out = PixelBuffer::new(width, height);
        let row_len = width as usize * 4;
        if row_len == 0 || height == 0 {
            return Ok(out);
        }

        let rows = out.as_bytes_mut();
        if self.parallel {
            rows.par_chunks_mut(row_len)
                .enumerate()
                .for_each(|(y, row)| prepared.apply_row(sources, y as u32, row));
        } else {
            for (y, row) in rows.chunks_mut(row_len).enumerate() {
                prepared.apply_row(sources, y as u32, row);
            }
        }
        Ok(out)
    }
}
