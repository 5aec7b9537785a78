//! Per-chunk index headers: sample shapes and sample byte ranges, both
//! run-length encoded.

pub mod byte_positions;
mod runs;
pub mod shape;

pub use byte_positions::BytePositionsEncoder;
pub use shape::ShapeEncoder;
