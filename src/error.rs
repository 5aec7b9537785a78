use thiserror::Error;

use crate::compression::CodecTag;
use crate::metadata::{Dtype, Htype};

pub type Result<T> = std::result::Result<T, ChunkError>;

#[derive(Debug, Error)]
pub enum ChunkError {
    /// The incoming bytes would push the chunk to or past `max_data_bytes`.
    #[error("chunk does not have space for the incoming bytes ({incoming}), {used} of {max} bytes used")]
    CapacityExceeded {
        incoming: usize,
        used: usize,
        max: usize,
    },

    /// Headers were synced without matching appended data.
    #[error("cannot update headers: {pending_samples} pending samples, {pending_bytes} pending bytes, {requested} bytes requested")]
    HeaderDesync {
        pending_samples: usize,
        pending_bytes: usize,
        requested: usize,
    },

    /// A shape was added to a shape encoder with a different established rank.
    #[error("shape rank {actual} does not match encoder rank {expected}")]
    RankMismatch { expected: usize, actual: usize },

    /// A sample's rank differs from the rank the tensor already holds.
    #[error("sample shape {shape:?} has rank {}, tensor rank is {expected}", .shape.len())]
    ShapeRankMismatch { expected: usize, shape: Vec<u32> },

    #[error("index {index} is out of range for {len} samples")]
    IndexOutOfRange { index: usize, len: usize },

    #[error(transparent)]
    Cast(#[from] CastError),

    #[error("cannot update sample {index}: new shape {new:?} is incompatible with {old:?}")]
    ShapeIncompatible {
        index: usize,
        old: Vec<u32>,
        new: Vec<u32>,
    },

    #[error("cannot tile sample: {0}")]
    TileImpossible(String),

    /// Oversized sample that cannot be tiled (compressed, or part of a contiguous batch).
    #[error("sample of {nbytes} bytes exceeds the chunk fill target of {limit} bytes")]
    SampleTooLarge { nbytes: usize, limit: usize },

    #[error("sample {0} is tiled across chunks and cannot be updated in place")]
    TiledSampleUpdate(usize),

    #[error("invalid chunk configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid array: {0}")]
    InvalidArray(String),

    /// The chunk container bytes are not valid for the expected format.
    #[error("corrupt chunk data: {0}")]
    CorruptData(&'static str),

    #[error("chunk checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error("{codec} codec failed: {reason}")]
    Codec { codec: CodecTag, reason: String },

    #[error("chunk {0} not found")]
    NotFound(u64),

    #[error("invalid UTF-8 in text sample: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A value in the source array cannot be represented in the target dtype.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot cast {from} to {to} for htype {htype}: {reason}")]
pub struct CastError {
    pub from: Dtype,
    pub to: Dtype,
    pub htype: Htype,
    pub reason: String,
}
