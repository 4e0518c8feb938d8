//! Raster recoloring: pixel buffers, operators and the pass that runs them.

pub mod operators;
pub mod pipeline;
pub mod raster;
pub mod symbology;
pub mod terrain;

pub use operators::{OperatorParameters, ParamValue, PixelOperator, PreparedOperator};
pub use pipeline::RasterPipeline;
pub use raster::{PixelBuffer, RasterError};
pub use terrain::{ElevationBands, TerrainRgb, decode_height};
