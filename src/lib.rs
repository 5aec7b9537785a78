//! Storage-chunk engine for array datasets.
//!
//! Samples (arrays, byte blobs, text, compressed payloads) are packed into
//! fixed-capacity [`Chunk`]s. Every chunk keeps two run-length encoded
//! headers, one for sample shapes and one for byte ranges, next to its data
//! buffer. Oversized samples are split into tiles that span several chunks.

pub mod compression;
pub mod config;
pub mod encode;
pub mod engine;
pub mod error;
pub mod helpers;
pub mod metadata;
pub mod sample;
pub mod storage;
pub mod tiling;

pub use compression::{CodecTag, CompressionPolicy};
pub use config::ChunkConfig;
pub use encode::{BytePositionsEncoder, ShapeEncoder};
pub use engine::ChunkEngine;
pub use error::{CastError, ChunkError, Result};
pub use metadata::{Dtype, Htype, ShapeInterval, TensorMeta};
pub use sample::{Array, ArrayView, CompressedSample, Element, SampleRead, SampleValue, Scalar};
pub use storage::{Batch, Chunk, ChunkStore, ExtendOutcome, IncomingSample, LocalChunkStore, MemoryChunkStore};
pub use tiling::{SampleTiles, Tile};
