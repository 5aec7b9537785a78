use std::fmt;
use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use serde::{Deserialize, Serialize};

use crate::error::{ChunkError, Result};
use crate::metadata::Dtype;
use crate::sample::Array;

/// Identifies the codec a payload was compressed with.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecTag {
    /// LZ4 block with the uncompressed size prepended.
    Lz4 = 1,
    /// zlib stream.
    Zlib = 2,
}

impl CodecTag {
    pub fn name(self) -> &'static str {
        match self {
            CodecTag::Lz4 => "lz4",
            CodecTag::Zlib => "zlib",
        }
    }

    pub fn compress(self, raw: &[u8]) -> Result<Vec<u8>> {
        match self {
            CodecTag::Lz4 => Ok(lz4_flex::compress_prepend_size(raw)),
            CodecTag::Zlib => {
                let mut encoder = ZlibEncoder::new(Vec::with_capacity(raw.len() / 2), Compression::default());
                encoder.write_all(raw).map_err(|e| self.failure(e))?;
                encoder.finish().map_err(|e| self.failure(e))
            }
        }
    }

    pub fn decompress(self, compressed: &[u8]) -> Result<Vec<u8>> {
        match self {
            CodecTag::Lz4 => lz4_flex::decompress_size_prepended(compressed).map_err(|e| self.failure(e)),
            CodecTag::Zlib => {
                let mut out = Vec::new();
                ZlibDecoder::new(compressed)
                    .read_to_end(&mut out)
                    .map_err(|e| self.failure(e))?;
                Ok(out)
            }
        }
    }

    fn failure(self, reason: impl fmt::Display) -> ChunkError {
        ChunkError::Codec {
            codec: self,
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for CodecTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decompresses `buffer` and reinterprets it as an array of `dtype` and `shape`.
pub fn decompress_array(codec: CodecTag, buffer: &[u8], shape: &[u32], dtype: Dtype) -> Result<Array> {
    let raw = codec.decompress(buffer)?;
    Array::from_bytes(dtype, shape.to_vec(), raw)
}
