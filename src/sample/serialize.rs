use tracing::trace;

use crate::compression::decompress_array;
use crate::config::ChunkConfig;
use crate::error::{ChunkError, Result};
use crate::metadata::TensorMeta;
use crate::sample::array::Array;
use crate::sample::cast::intelligent_cast;
use crate::sample::value::SampleValue;
use crate::tiling::SampleTiles;

/// A sample ready for a chunk: either whole, or handed to the tiler.
#[derive(Debug)]
pub enum SerializedSample {
    Sample { bytes: Vec<u8>, shape: Vec<u32> },
    Tiles(SampleTiles),
}

/// Canonical bytes of a sample before the compression policy is applied.
pub(crate) struct RawSample {
    pub bytes: Vec<u8>,
    pub shape: Vec<u32>,
    /// Element grid and item size used if the sample has to be tiled.
    grid: Vec<u32>,
    itemsize: usize,
    /// Already in stored form, the policy must not touch it again.
    precompressed: bool,
}

impl RawSample {
    fn bytes_like(bytes: Vec<u8>, shape: Vec<u32>) -> Self {
        let grid = vec![bytes.len() as u32];
        Self {
            bytes,
            shape,
            grid,
            itemsize: 1,
            precompressed: false,
        }
    }

    fn array(array: &Array, meta: &mut TensorMeta) -> Result<Self> {
        let dtype = meta.dtype.unwrap_or(array.dtype());
        let cast = intelligent_cast(array, dtype, meta.htype)?;
        meta.dtype = Some(dtype);
        let shape = cast.shape().to_vec();
        Ok(Self {
            bytes: cast.into_owned().into_bytes(),
            grid: shape.clone(),
            shape,
            itemsize: dtype.itemsize(),
            precompressed: false,
        })
    }

    /// Converts a value to bytes and shape. May fix `meta.dtype` on first use.
    pub fn from_value(value: &SampleValue, meta: &mut TensorMeta) -> Result<Self> {
        match value {
            SampleValue::Bytes(bytes) => {
                let shape = vec![bytes.len() as u32];
                Ok(Self::bytes_like(bytes.clone(), shape))
            }
            SampleValue::Text(text) => Ok(Self::bytes_like(text.as_bytes().to_vec(), vec![1])),
            SampleValue::Json(value) => Ok(Self::bytes_like(serde_json::to_vec(value)?, vec![1])),
            SampleValue::Scalar(scalar) => Self::array(&scalar.to_array(), meta),
            SampleValue::Array(array) => Self::array(array, meta),
            SampleValue::Compressed(sample) => {
                let dtype_matches = meta.dtype.is_none_or(|dtype| dtype == sample.dtype);
                if dtype_matches {
                    if let Some(stored) = meta.compression.encode_precompressed(sample.codec, &sample.bytes) {
                        meta.dtype.get_or_insert(sample.dtype);
                        let shape = sample.shape.clone();
                        return Ok(Self {
                            bytes: stored,
                            grid: shape.clone(),
                            shape,
                            itemsize: sample.dtype.itemsize(),
                            precompressed: true,
                        });
                    }
                }
                let array = decompress_array(sample.codec, &sample.bytes, &sample.shape, sample.dtype)?;
                Self::array(&array, meta)
            }
        }
    }

    /// Applies the compression policy, or starts tiling when the sample is
    /// larger than a chunk should hold.
    pub fn into_serialized(self, meta: &TensorMeta, config: &ChunkConfig) -> Result<SerializedSample> {
        let raw_len = self.bytes.len();

        if meta.compression.is_none() {
            if config.needs_to_be_tiled(raw_len) {
                let tiles = SampleTiles::start(self.bytes, self.shape, self.grid, self.itemsize, config)?;
                return Ok(SerializedSample::Tiles(tiles));
            }
            trace!(num_bytes = raw_len, shape = ?self.shape, "serialized sample");
            return Ok(SerializedSample::Sample {
                bytes: self.bytes,
                shape: self.shape,
            });
        }

        let bytes = if self.precompressed {
            self.bytes
        } else {
            meta.compression.encode(self.bytes)?
        };
        if config.needs_to_be_tiled(bytes.len()) {
            return Err(ChunkError::SampleTooLarge {
                nbytes: bytes.len(),
                limit: config.min_data_bytes_target,
            });
        }
        trace!(raw_bytes = raw_len, num_bytes = bytes.len(), shape = ?self.shape, "serialized sample");
        Ok(SerializedSample::Sample {
            bytes,
            shape: self.shape,
        })
    }
}

/// Serializes one sample for `meta`'s tensor.
///
/// Arrays and scalars are cast to the tensor dtype (the first array fixes it
/// when unset). Text is stored as UTF-8 and structured values as JSON, both
/// with shape `[1]`. Compressed payloads made with the tensor's own codec are
/// stored as they are.
///
/// # Errors
/// - `ShapeRankMismatch` if the shape's rank differs from the tensor's.
/// - `Cast` if an element cannot be represented in the tensor dtype.
/// - `SampleTooLarge` if a compressed payload is above the fill target.
/// - `TileImpossible` if an oversized sample cannot be tiled.
pub fn serialize_sample(value: &SampleValue, meta: &mut TensorMeta, config: &ChunkConfig) -> Result<SerializedSample> {
    let raw = RawSample::from_value(value, meta)?;
    meta.check_sample_shape(&raw.shape)?;
    raw.into_serialized(meta, config)
}
