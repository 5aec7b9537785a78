use std::borrow::Cow;

use tracing::{debug, trace};

use crate::config::ChunkConfig;
use crate::error::{ChunkError, Result};
use crate::metadata::TensorMeta;
use crate::sample::array::{Array, num_elements};
use crate::sample::read::{SampleRead, interpret};
use crate::sample::value::SampleValue;
use crate::storage::{Batch, Chunk, ChunkStore, ExtendOutcome, IncomingSample};

/// Where one logical sample lives: one `(chunk_id, local_index)` entry, or
/// one entry per tile in write order.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SampleLocation {
    entries: Vec<(u64, usize)>,
    /// Full shape of a tiled sample.
    tiled_shape: Option<Vec<u32>>,
}

impl SampleLocation {
    fn first(&self) -> Result<(u64, usize)> {
        self.entries
            .first()
            .copied()
            .ok_or(ChunkError::CorruptData("sample has no chunk entries"))
    }
}

/// Tensor-level writer and reader over a sequence of chunks.
///
/// Samples go into one active chunk until it stops accepting them; the chunk
/// is then written to the store and a successor is opened. Oversized samples
/// are tiled across as many successors as they need.
pub struct ChunkEngine<S: ChunkStore> {
    store: S,
    config: ChunkConfig,
    meta: TensorMeta,
    chunk_ids: Vec<u64>,
    active: Option<Chunk>,
    next_chunk_id: u64,
    index: Vec<SampleLocation>,
    /// The last indexed sample still has tiles to write.
    continuing: bool,
}

impl<S: ChunkStore> ChunkEngine<S> {
    pub fn new(store: S, config: ChunkConfig, meta: TensorMeta) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            meta,
            chunk_ids: Vec::new(),
            active: None,
            next_chunk_id: 0,
            index: Vec::new(),
            continuing: false,
        })
    }

    pub fn meta(&self) -> &TensorMeta {
        &self.meta
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Ids of every chunk written so far, in creation order.
    pub fn chunk_ids(&self) -> &[u64] {
        &self.chunk_ids
    }

    pub fn num_samples(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// `(chunk_id, local_index)` entries holding sample `index`.
    pub fn locate(&self, index: usize) -> Option<&[(u64, usize)]> {
        self.index.get(index).map(|location| location.entries.as_slice())
    }

    fn take_active(&mut self) -> Chunk {
        match self.active.take() {
            Some(chunk) => chunk,
            None => {
                let chunk_id = self.next_chunk_id;
                self.next_chunk_id += 1;
                debug!(chunk_id, "opened chunk");
                Chunk::new(chunk_id, self.config)
            }
        }
    }

    /// Writes the active chunk to the store. It stays open for more samples.
    pub fn flush(&mut self) -> Result<()> {
        let Some(chunk) = self.active.as_ref() else {
            return Ok(());
        };
        if chunk.num_samples() == 0 {
            return Ok(());
        }

        let chunk_id = chunk.id();
        let bytes = chunk.serialize()?;
        let num_bytes = bytes.len();
        self.store.put(chunk_id, bytes)?;
        if self.chunk_ids.last() != Some(&chunk_id) {
            self.chunk_ids.push(chunk_id);
        }
        debug!(chunk_id, num_samples = chunk.num_samples(), num_bytes, "flushed chunk");
        Ok(())
    }

    /// Flushes and closes the active chunk so the next sample opens a new one.
    fn rotate(&mut self) -> Result<()> {
        self.flush()?;
        self.active = None;
        Ok(())
    }

    fn rotate_if_full(&mut self) -> Result<()> {
        match &self.active {
            Some(chunk) if !chunk.is_under_min_space() => self.rotate(),
            _ => Ok(()),
        }
    }

    fn no_progress(&self) -> ChunkError {
        ChunkError::CapacityExceeded {
            incoming: self.config.max_data_bytes,
            used: 0,
            max: self.config.max_data_bytes,
        }
    }

    pub fn append(&mut self, value: SampleValue) -> Result<()> {
        self.extend(vec![value])
    }

    /// Packs `values` in order, opening chunks and tiling as needed.
    pub fn extend(&mut self, values: Vec<SampleValue>) -> Result<()> {
        let mut pending: Vec<IncomingSample> = values.into_iter().map(IncomingSample::from).collect();
        let mut offset = 0;
        self.continuing = false;

        while offset < pending.len() {
            let mut chunk = self.take_active();
            let chunk_id = chunk.id();
            let before = chunk.num_samples();
            let result = chunk.extend_if_has_space(Batch::Sequence(&mut pending[offset..]), &mut self.meta);
            let added = chunk.num_samples() - before;
            self.active = Some(chunk);

            // samples packed before a failure stay in the chunk and in meta
            let outcome = result.as_ref().ok().copied();
            self.record_entries(chunk_id, before, added, &pending[offset..], outcome);
            let outcome = result?;

            let consumed = outcome.consumed();
            if added == 0 && consumed == 0 && before == 0 {
                return Err(self.no_progress());
            }
            offset += consumed;
            if offset < pending.len() {
                self.rotate()?;
            }
        }

        self.rotate_if_full()
    }

    /// Maps the entries a chunk just registered onto logical samples.
    /// `outcome` is `None` when the chunk stopped on an error.
    fn record_entries(
        &mut self,
        chunk_id: u64,
        first_local: usize,
        added: usize,
        slots: &[IncomingSample],
        outcome: Option<ExtendOutcome>,
    ) {
        let mut locals = first_local..first_local + added;
        let mut slot = 0;

        if self.continuing {
            if let Some(local_index) = locals.next() {
                if let Some(location) = self.index.last_mut() {
                    location.entries.push((chunk_id, local_index));
                }
                slot = 1;
            }
        }

        for local_index in locals {
            let tiled_shape = match slots.get(slot) {
                Some(IncomingSample::Tiles(tiles)) => Some(tiles.sample_shape().to_vec()),
                _ => None,
            };
            self.index.push(SampleLocation {
                entries: vec![(chunk_id, local_index)],
                tiled_shape,
            });
            slot += 1;
        }

        self.continuing = match outcome {
            Some(ExtendOutcome::TilingInProgress { consumed }) => {
                matches!(slots.get(consumed), Some(IncomingSample::Tiles(tiles)) if !tiles.is_first_write())
            }
            Some(ExtendOutcome::Consumed(_)) | None => false,
        };
    }

    /// Packs a stacked batch of equal-shaped samples.
    ///
    /// Samples above the fill target cannot go through the contiguous batch
    /// path, so such a batch is split and packed one sample at a time.
    pub fn extend_array(&mut self, array: &Array) -> Result<()> {
        let dtype = self.meta.dtype.unwrap_or(array.dtype());
        let sample_bytes = num_elements(&array.inner_shape()) * dtype.itemsize();
        if self.meta.compression.is_none() && self.config.needs_to_be_tiled(sample_bytes) {
            let values = (0..array.outer_len())
                .map(|i| array.entry(i).map(SampleValue::Array))
                .collect::<Result<Vec<_>>>()?;
            return self.extend(values);
        }

        let total = array.outer_len();
        let mut offset = 0;
        self.continuing = false;

        while offset < total {
            let rest = if offset == 0 {
                Cow::Borrowed(array)
            } else {
                Cow::Owned(array.slice_outer(offset..total)?)
            };
            let mut chunk = self.take_active();
            let chunk_id = chunk.id();
            let before = chunk.num_samples();
            let result = chunk.extend_if_has_space(Batch::Array(&rest), &mut self.meta);
            let added = chunk.num_samples() - before;
            self.active = Some(chunk);

            for local_index in before..before + added {
                self.index.push(SampleLocation {
                    entries: vec![(chunk_id, local_index)],
                    tiled_shape: None,
                });
            }
            let consumed = result?.consumed();

            if consumed == 0 && before == 0 {
                return Err(self.no_progress());
            }
            offset += consumed;
            if offset < total {
                self.rotate()?;
            }
        }

        self.rotate_if_full()
    }

    fn load_chunk(&self, chunk_id: u64) -> Result<Cow<'_, Chunk>> {
        if let Some(active) = &self.active {
            if active.id() == chunk_id {
                return Ok(Cow::Borrowed(active));
            }
        }
        let bytes = self.store.get(chunk_id)?;
        Ok(Cow::Owned(Chunk::deserialize(&bytes, &self.config)?))
    }

    /// Reads sample `index`, reassembling it from its tiles if it was tiled.
    pub fn read(&self, index: usize) -> Result<SampleRead<'static>> {
        let location = self.index.get(index).ok_or(ChunkError::IndexOutOfRange {
            index,
            len: self.index.len(),
        })?;

        let Some(shape) = &location.tiled_shape else {
            let (chunk_id, local_index) = location.first()?;
            let chunk = self.load_chunk(chunk_id)?;
            return Ok(chunk.read_sample(local_index, &self.meta, true, true)?.into_owned());
        };

        let mut payload = Vec::new();
        for &(chunk_id, local_index) in &location.entries {
            let chunk = self.load_chunk(chunk_id)?;
            let tile = chunk.read_sample(local_index, &self.meta, false, false)?;
            if let Some(bytes) = tile.as_bytes() {
                payload.extend_from_slice(bytes);
            }
        }
        trace!(index, num_tiles = location.entries.len(), num_bytes = payload.len(), "reassembled tiled sample");
        interpret(Cow::Owned(payload), shape, &self.meta, true)
    }

    /// Replaces sample `index` in place. Tiled samples cannot be updated.
    pub fn update(&mut self, index: usize, value: &SampleValue) -> Result<()> {
        let location = self.index.get(index).ok_or(ChunkError::IndexOutOfRange {
            index,
            len: self.index.len(),
        })?;
        if location.tiled_shape.is_some() {
            return Err(ChunkError::TiledSampleUpdate(index));
        }
        let (chunk_id, local_index) = location.first()?;

        match self.active.as_mut() {
            Some(chunk) if chunk.id() == chunk_id => chunk.replace_sample(local_index, value, &mut self.meta),
            _ => {
                let bytes = self.store.get(chunk_id)?;
                let mut chunk = Chunk::deserialize(&bytes, &self.config)?;
                chunk.replace_sample(local_index, value, &mut self.meta)?;
                self.store.put(chunk_id, chunk.serialize()?)
            }
        }
    }
}
