use std::borrow::Cow;

use tracing::{debug, trace, warn};

use crate::config::ChunkConfig;
use crate::encode::{BytePositionsEncoder, ShapeEncoder};
use crate::error::{ChunkError, Result};
use crate::helpers::header_flags::ChunkFlags;
use crate::helpers::helper::{take, to_u32};
use crate::metadata::{Dtype, TensorMeta};
use crate::sample::array::{Array, ArrayView, num_elements};
use crate::sample::cast::intelligent_cast;
use crate::sample::read::{SampleRead, interpret};
use crate::sample::serialize::{RawSample, SerializedSample, serialize_sample};
use crate::sample::value::SampleValue;
use crate::storage::chunk_header::{ChunkHeader, compute_checksum};
use crate::storage::extend::{Batch, ExtendOutcome, IncomingSample};

/// Fixed-capacity container of serialized samples plus their index headers.
///
/// Data bytes are appended first and registered in the headers afterwards.
/// Between the two steps the chunk counts the appended samples as pending;
/// reads only ever see registered samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    id: u64,
    config: ChunkConfig,
    data: Vec<u8>,
    shapes: ShapeEncoder,
    byte_positions: BytePositionsEncoder,
    pending_samples: usize,
    pending_bytes: usize,
    flags: ChunkFlags,
}

impl Chunk {
    pub fn new(id: u64, config: ChunkConfig) -> Self {
        Self {
            id,
            config,
            data: Vec::new(),
            shapes: ShapeEncoder::new(),
            byte_positions: BytePositionsEncoder::new(),
            pending_samples: 0,
            pending_bytes: 0,
            flags: ChunkFlags::empty(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn shapes(&self) -> &ShapeEncoder {
        &self.shapes
    }

    pub fn byte_positions(&self) -> &BytePositionsEncoder {
        &self.byte_positions
    }

    pub fn num_data_bytes(&self) -> usize {
        self.data.len()
    }

    /// Registered samples. Tiles count as one sample each.
    pub fn num_samples(&self) -> usize {
        self.byte_positions.num_samples()
    }

    pub fn pending_samples(&self) -> usize {
        self.pending_samples
    }

    pub fn contains_tiles(&self) -> bool {
        self.flags.contains(ChunkFlags::TILED)
    }

    /// Still below the fill target, so worth offering more samples.
    pub fn is_under_min_space(&self) -> bool {
        self.num_data_bytes() < self.config.min_data_bytes_target
    }

    /// Largest buffer that [`append`](Self::append) still accepts.
    pub fn remaining_capacity(&self) -> usize {
        self.config.max_data_bytes.saturating_sub(self.num_data_bytes() + 1)
    }

    /// Strict check: the chunk never reaches `max_data_bytes`.
    pub fn has_space_for(&self, num_bytes: usize) -> bool {
        self.num_data_bytes() + num_bytes < self.config.max_data_bytes
    }

    pub fn total_byte_footprint(&self) -> usize {
        ChunkHeader::SIZE
            + self.shapes.serialized_size()
            + self.byte_positions.serialized_size()
            + self.num_data_bytes()
    }

    /// Appends one sample's bytes. Headers are synced separately.
    pub fn append(&mut self, buffer: &[u8]) -> Result<()> {
        self.append_batch(buffer, 1)
    }

    /// Appends the bytes of `count` samples in one write.
    pub fn append_batch(&mut self, buffer: &[u8], count: usize) -> Result<()> {
        if !self.has_space_for(buffer.len()) {
            return Err(ChunkError::CapacityExceeded {
                incoming: buffer.len(),
                used: self.num_data_bytes(),
                max: self.config.max_data_bytes,
            });
        }
        self.data.extend_from_slice(buffer);
        self.pending_samples += count;
        self.pending_bytes += buffer.len();
        Ok(())
    }

    pub fn register_sample(&mut self, num_bytes: usize, shape: &[u32]) -> Result<()> {
        self.register_samples(num_bytes, shape, 1)
    }

    /// Advances both headers by `count` samples of `num_bytes` each.
    ///
    /// # Errors
    /// `HeaderDesync` if fewer than `count` samples, or fewer than
    /// `num_bytes * count` bytes, were appended and not yet registered.
    pub fn register_samples(&mut self, num_bytes: usize, shape: &[u32], count: usize) -> Result<()> {
        let requested = num_bytes.checked_mul(count).unwrap_or(usize::MAX);
        if count > self.pending_samples || requested > self.pending_bytes {
            return Err(ChunkError::HeaderDesync {
                pending_samples: self.pending_samples,
                pending_bytes: self.pending_bytes,
                requested,
            });
        }
        to_u32(num_bytes, "sample length exceeds u32")?;
        self.shapes.add_shape(shape, count)?;
        self.byte_positions.add_length(num_bytes, count)?;
        self.pending_samples -= count;
        self.pending_bytes -= requested;
        Ok(())
    }

    /// Registers one whole sample in the headers and counts it in `meta`.
    pub fn register_in_meta_and_headers(&mut self, num_bytes: usize, shape: &[u32], meta: &mut TensorMeta) -> Result<()> {
        meta.check_sample_shape(shape)?;
        self.register_sample(num_bytes, shape)?;
        meta.register_sample(shape)
    }

    /// Packs as much of `batch` as fits.
    ///
    /// A sample that does not fit stops packing; the caller offers the rest
    /// to a successor chunk. An oversized sample in a sequence is tiled: its
    /// slot is replaced by the tiling state, one tile is written here, and
    /// [`ExtendOutcome::TilingInProgress`] is returned until the last tile
    /// lands. Tensor metadata counts the tiled sample on its first tile only.
    ///
    /// # Errors
    /// - `SampleTooLarge` if an array batch holds samples above the fill target.
    /// - `TileImpossible` if an empty chunk cannot take a single tile.
    /// - Any serialization error; samples packed before it stay packed.
    pub fn extend_if_has_space(&mut self, batch: Batch<'_>, meta: &mut TensorMeta) -> Result<ExtendOutcome> {
        match batch {
            Batch::Array(array) => {
                if meta.compression.is_none() {
                    self.extend_with_array(array, meta)
                } else {
                    self.extend_with_array_entries(array, meta)
                }
            }
            Batch::Sequence(samples) => self.extend_with_samples(samples, meta),
        }
    }

    fn extend_with_array(&mut self, array: &Array, meta: &mut TensorMeta) -> Result<ExtendOutcome> {
        let sample_shape = array.inner_shape();
        meta.check_sample_shape(&sample_shape)?;

        let dtype = meta.dtype.unwrap_or(array.dtype());
        let sample_bytes = num_elements(&sample_shape) * dtype.itemsize();
        if self.config.needs_to_be_tiled(sample_bytes) {
            return Err(ChunkError::SampleTooLarge {
                nbytes: sample_bytes,
                limit: self.config.min_data_bytes_target,
            });
        }

        // 1. Longest prefix that fits, priced in the target dtype
        let accepted = if sample_bytes == 0 {
            if self.has_space_for(0) { array.outer_len() } else { 0 }
        } else {
            array.outer_len().min(self.remaining_capacity() / sample_bytes)
        };
        if accepted == 0 {
            return Ok(ExtendOutcome::Consumed(0));
        }

        // 2. One cast over the accepted prefix
        let prefix = if accepted == array.outer_len() {
            Cow::Borrowed(array)
        } else {
            Cow::Owned(array.slice_outer(0..accepted)?)
        };
        let cast = intelligent_cast(&prefix, dtype, meta.htype)?;
        meta.dtype = Some(dtype);

        // 3. One write, then headers and meta
        self.append_batch(cast.as_bytes(), accepted)?;
        self.register_samples(sample_bytes, &sample_shape, accepted)?;
        for _ in 0..accepted {
            meta.register_sample(&sample_shape)?;
        }

        trace!(
            chunk_id = self.id,
            num_samples = accepted,
            num_bytes = accepted * sample_bytes,
            "packed array batch"
        );
        Ok(ExtendOutcome::Consumed(accepted))
    }

    /// Compressed tensors store every sample separately.
    fn extend_with_array_entries(&mut self, array: &Array, meta: &mut TensorMeta) -> Result<ExtendOutcome> {
        let mut consumed = 0;
        for index in 0..array.outer_len() {
            let value = SampleValue::Array(array.entry(index)?);
            match serialize_sample(&value, meta, &self.config)? {
                SerializedSample::Sample { bytes, shape } => {
                    if !self.has_space_for(bytes.len()) {
                        break;
                    }
                    self.append(&bytes)?;
                    self.register_in_meta_and_headers(bytes.len(), &shape, meta)?;
                    consumed += 1;
                }
                SerializedSample::Tiles(tiles) => {
                    return Err(ChunkError::SampleTooLarge {
                        nbytes: tiles.num_bytes(),
                        limit: self.config.min_data_bytes_target,
                    });
                }
            }
        }
        Ok(ExtendOutcome::Consumed(consumed))
    }

    fn extend_with_samples(&mut self, samples: &mut [IncomingSample], meta: &mut TensorMeta) -> Result<ExtendOutcome> {
        let mut consumed = 0;

        for slot in samples.iter_mut() {
            let serialized = match slot {
                IncomingSample::Value(value) => Some(serialize_sample(value, meta, &self.config)?),
                IncomingSample::Tiles(_) => None,
            };
            match serialized {
                Some(SerializedSample::Sample { bytes, shape }) => {
                    if !self.has_space_for(bytes.len()) {
                        return Ok(ExtendOutcome::Consumed(consumed));
                    }
                    self.append(&bytes)?;
                    self.register_in_meta_and_headers(bytes.len(), &shape, meta)?;
                    consumed += 1;
                    continue;
                }
                Some(SerializedSample::Tiles(tiles)) => *slot = IncomingSample::Tiles(tiles),
                None => {}
            }

            let IncomingSample::Tiles(tiles) = slot else {
                continue;
            };
            let Some(tile) = tiles.next_tile(self.remaining_capacity()) else {
                if self.num_data_bytes() == 0 {
                    return Err(ChunkError::TileImpossible(format!(
                        "an empty chunk of {} bytes cannot hold a tile of {} bytes",
                        self.config.max_data_bytes,
                        tiles.num_bytes()
                    )));
                }
                return Ok(ExtendOutcome::TilingInProgress { consumed });
            };

            self.append(&tile.bytes)?;
            self.register_sample(tile.bytes.len(), &tile.shape)?;
            if tile.first {
                meta.register_sample(tiles.sample_shape())?;
            }
            self.flags |= ChunkFlags::TILED;

            if !tile.last {
                return Ok(ExtendOutcome::TilingInProgress { consumed });
            }
            consumed += 1;
        }

        Ok(ExtendOutcome::Consumed(consumed))
    }

    fn stored_bytes(&self, local_index: usize) -> Result<&[u8]> {
        let (start, end) = self.byte_positions.range_at(local_index)?;
        self.data
            .get(start..end)
            .ok_or(ChunkError::CorruptData("byte range outside chunk data"))
    }

    /// Reads one sample.
    ///
    /// With `cast == false` the stored payload is returned untouched as `u8`
    /// of shape `[len]`. Otherwise compression is undone and the payload is
    /// interpreted through the tensor's htype and dtype. The result borrows
    /// the chunk unless `copy` is set or the payload had to be decompressed.
    pub fn read_sample(&self, local_index: usize, meta: &TensorMeta, cast: bool, copy: bool) -> Result<SampleRead<'_>> {
        let shape = self.shapes.shape_at(local_index)?;
        let stored = self.stored_bytes(local_index)?;

        if !cast {
            let view = ArrayView::new(Dtype::U8, vec![stored.len() as u32], stored)?;
            return Ok(if copy {
                SampleRead::Array(view.to_array())
            } else {
                SampleRead::View(view)
            });
        }

        let payload = meta.compression.decode(stored)?;
        trace!(chunk_id = self.id, local_index, num_bytes = payload.len(), "decoded sample");
        interpret(payload, shape, meta, copy)
    }

    /// Replaces sample `local_index` in place.
    ///
    /// The new value must keep the stored shape's rank; its byte length may
    /// change, shifting every later sample. The data buffer is left as it was
    /// on any error.
    ///
    /// # Errors
    /// `TiledSampleUpdate` if the chunk holds tiles. The chunk does not record
    /// which of its entries are tiles, so only a caller that tracks sample
    /// locations can update whole samples in such a chunk.
    pub fn update_sample(&mut self, local_index: usize, value: &SampleValue, meta: &mut TensorMeta) -> Result<()> {
        if self.contains_tiles() {
            return Err(ChunkError::TiledSampleUpdate(local_index));
        }
        self.replace_sample(local_index, value, meta)
    }

    /// Update without the tile guard. `local_index` must hold a whole sample.
    pub(crate) fn replace_sample(&mut self, local_index: usize, value: &SampleValue, meta: &mut TensorMeta) -> Result<()> {
        let old_shape = self.shapes.shape_at(local_index)?.to_vec();
        let (start, end) = self.byte_positions.range_at(local_index)?;

        let raw = RawSample::from_value(value, meta)?;
        if raw.shape.len() != old_shape.len() {
            return Err(ChunkError::ShapeIncompatible {
                index: local_index,
                old: old_shape,
                new: raw.shape,
            });
        }
        let (bytes, shape) = match raw.into_serialized(meta, &self.config)? {
            SerializedSample::Sample { bytes, shape } => (bytes, shape),
            SerializedSample::Tiles(tiles) => {
                return Err(ChunkError::SampleTooLarge {
                    nbytes: tiles.num_bytes(),
                    limit: self.config.min_data_bytes_target,
                });
            }
        };

        let num_bytes = bytes.len();
        self.shapes.update_shape(local_index, &shape)?;
        self.byte_positions.update_num_bytes(local_index, num_bytes)?;
        self.data.splice(start..end, bytes);
        meta.update_shape_interval(&shape)?;

        if self.num_data_bytes() >= self.config.max_data_bytes {
            warn!(
                chunk_id = self.id,
                local_index,
                num_data_bytes = self.num_data_bytes(),
                max_data_bytes = self.config.max_data_bytes,
                "update pushed chunk past its capacity"
            );
        }
        trace!(chunk_id = self.id, local_index, old_bytes = end - start, num_bytes, "updated sample");
        Ok(())
    }

    /// Encodes the chunk into its container form.
    ///
    /// ```text
    /// [ header (32) | shape blob | byte position blob | data ]
    /// ```
    /// The output is exactly [`total_byte_footprint`](Self::total_byte_footprint) bytes.
    ///
    /// # Errors
    /// `HeaderDesync` if appended samples were never registered.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        if self.pending_samples > 0 || self.pending_bytes > 0 {
            warn!(
                chunk_id = self.id,
                pending_samples = self.pending_samples,
                pending_bytes = self.pending_bytes,
                "serializing chunk with unregistered samples"
            );
            return Err(ChunkError::HeaderDesync {
                pending_samples: self.pending_samples,
                pending_bytes: self.pending_bytes,
                requested: 0,
            });
        }

        let mut shape_blob = Vec::with_capacity(self.shapes.serialized_size());
        self.shapes.write_to(&mut shape_blob)?;
        let mut position_blob = Vec::with_capacity(self.byte_positions.serialized_size());
        self.byte_positions.write_to(&mut position_blob)?;

        let mut header = ChunkHeader::new(
            self.id,
            self.flags | ChunkFlags::CHECKSUM,
            to_u32(shape_blob.len(), "shape blob exceeds u32")?,
            to_u32(position_blob.len(), "byte position blob exceeds u32")?,
            to_u32(self.data.len(), "chunk data exceeds u32")?,
        );
        header.checksum = compute_checksum(&[shape_blob.as_slice(), position_blob.as_slice(), self.data.as_slice()]);

        let mut out = Vec::with_capacity(self.total_byte_footprint());
        header.write_to(&mut out);
        out.extend_from_slice(&shape_blob);
        out.extend_from_slice(&position_blob);
        out.extend_from_slice(&self.data);

        debug!(
            chunk_id = self.id,
            num_samples = self.num_samples(),
            num_bytes = out.len(),
            "serialized chunk"
        );
        Ok(out)
    }

    /// Rebuilds a chunk from [`serialize`](Self::serialize) output.
    ///
    /// # Errors
    /// - `CorruptData` for bad framing, or headers that disagree with each other or the data.
    /// - `ChecksumMismatch` if the blobs were altered.
    pub fn deserialize(bytes: &[u8], config: &ChunkConfig) -> Result<Self> {
        let mut cursor = bytes;
        let header = ChunkHeader::read_from(&mut cursor)?;
        if cursor.len() != header.body_len() {
            return Err(ChunkError::CorruptData("chunk length does not match its header"));
        }

        let shape_blob = take(&mut cursor, header.shapes_len as usize)?;
        let position_blob = take(&mut cursor, header.positions_len as usize)?;
        let data = take(&mut cursor, header.data_len as usize)?;

        if header.flags.contains(ChunkFlags::CHECKSUM) {
            let computed = compute_checksum(&[shape_blob, position_blob, data]);
            if computed != header.checksum {
                return Err(ChunkError::ChecksumMismatch {
                    stored: header.checksum,
                    computed,
                });
            }
        }

        let shapes = ShapeEncoder::read_from(shape_blob)?;
        let byte_positions = BytePositionsEncoder::read_from(position_blob)?;
        if shapes.num_samples() != byte_positions.num_samples() {
            return Err(ChunkError::CorruptData("shape and byte position headers disagree"));
        }
        if byte_positions.total_num_bytes() != data.len() as u64 {
            return Err(ChunkError::CorruptData("byte positions do not cover chunk data"));
        }

        trace!(
            chunk_id = header.chunk_id,
            num_samples = shapes.num_samples(),
            num_bytes = bytes.len(),
            "deserialized chunk"
        );
        Ok(Self {
            id: header.chunk_id,
            config: *config,
            data: data.to_vec(),
            shapes,
            byte_positions,
            pending_samples: 0,
            pending_bytes: 0,
            flags: header.flags & ChunkFlags::TILED,
        })
    }
}
