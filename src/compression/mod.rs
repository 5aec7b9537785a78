//! Codec dispatch and per-tensor compression policy.
//!
//! The chunk engine never interprets compressed bytes itself. It carries a
//! [`CodecTag`] and calls through it.

pub mod codec;
pub mod policy;

pub use codec::{CodecTag, decompress_array};
pub use policy::CompressionPolicy;
