use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::compression::codec::CodecTag;
use crate::error::{ChunkError, Result};

const RAW_MARKER: u8 = 0;
const COMPRESSED_MARKER: u8 = 1;

/// When a tensor's sample payloads are compressed.
///
/// `AboveThreshold` payloads carry a one-byte marker so a reader can tell
/// compressed and raw payloads apart. `Always` payloads carry none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionPolicy {
    #[default]
    None,
    Always(CodecTag),
    AboveThreshold { codec: CodecTag, min_bytes: usize },
}

impl CompressionPolicy {
    pub fn codec(&self) -> Option<CodecTag> {
        match *self {
            CompressionPolicy::None => None,
            CompressionPolicy::Always(codec) => Some(codec),
            CompressionPolicy::AboveThreshold { codec, .. } => Some(codec),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, CompressionPolicy::None)
    }

    /// Turns a raw payload into the bytes stored in a chunk.
    pub fn encode(&self, raw: Vec<u8>) -> Result<Vec<u8>> {
        match *self {
            CompressionPolicy::None => Ok(raw),
            CompressionPolicy::Always(codec) => codec.compress(&raw),
            CompressionPolicy::AboveThreshold { codec, min_bytes } => {
                if raw.len() >= min_bytes {
                    let compressed = codec.compress(&raw)?;
                    Ok(framed(COMPRESSED_MARKER, &compressed))
                } else {
                    Ok(framed(RAW_MARKER, &raw))
                }
            }
        }
    }

    /// Stores an already compressed payload without touching it, if it was
    /// produced by this policy's codec.
    pub fn encode_precompressed(&self, codec: CodecTag, compressed: &[u8]) -> Option<Vec<u8>> {
        match *self {
            CompressionPolicy::Always(own) if own == codec => Some(compressed.to_vec()),
            CompressionPolicy::AboveThreshold { codec: own, .. } if own == codec => {
                Some(framed(COMPRESSED_MARKER, compressed))
            }
            _ => None,
        }
    }

    /// Recovers the raw payload from stored bytes. Borrows when nothing was compressed.
    pub fn decode<'a>(&self, stored: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        match *self {
            CompressionPolicy::None => Ok(Cow::Borrowed(stored)),
            CompressionPolicy::Always(codec) => Ok(Cow::Owned(codec.decompress(stored)?)),
            CompressionPolicy::AboveThreshold { codec, .. } => match stored.split_first() {
                Some((&RAW_MARKER, rest)) => Ok(Cow::Borrowed(rest)),
                Some((&COMPRESSED_MARKER, rest)) => Ok(Cow::Owned(codec.decompress(rest)?)),
                Some(_) => Err(ChunkError::CorruptData("unknown compression marker")),
                None => Err(ChunkError::CorruptData("missing compression marker")),
            },
        }
    }
}

fn framed(marker: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 1);
    out.push(marker);
    out.extend_from_slice(payload);
    out
}
