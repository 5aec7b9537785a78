use crate::encode::runs::Runs;
use crate::error::{ChunkError, Result};
use crate::helpers::helper::{read_u32, to_u32};

/// Run-length encoded byte lengths of the samples in one chunk.
///
/// Only `(num_bytes, count)` pairs are stored. The `[start, end)` range of a
/// sample is the running sum of everything before it; each run caches its
/// start offset so appending `count` equal samples never touches them one by one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BytePositionsEncoder {
    runs: Runs<u32>,
    starts: Vec<u64>,
}

impl BytePositionsEncoder {
    const FIXED_SIZE: usize = 4;
    const RUN_SIZE: usize = 4 + 4;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_samples(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_samples() == 0
    }

    pub fn num_runs(&self) -> usize {
        self.runs.num_runs()
    }

    /// `(num_bytes, count)` pairs in sample order.
    pub fn runs(&self) -> impl Iterator<Item = (u32, usize)> {
        self.runs.iter().map(|(&num_bytes, count)| (num_bytes, count))
    }

    /// End of the last sample, i.e. the number of data bytes covered.
    pub fn total_num_bytes(&self) -> u64 {
        match self.starts.last() {
            Some(&start) => {
                let last = self.num_runs() - 1;
                start + *self.runs.value(last) as u64 * self.runs.run_count(last) as u64
            }
            None => 0,
        }
    }

    pub fn add_length(&mut self, num_bytes: usize, count: usize) -> Result<()> {
        let num_bytes = to_u32(num_bytes, "sample length exceeds u32")?;
        let start = self.total_num_bytes();
        let before = self.num_runs();
        self.runs.push(num_bytes, count);
        if self.num_runs() > before {
            self.starts.push(start);
        }
        Ok(())
    }

    pub fn range_at(&self, local_index: usize) -> Result<(usize, usize)> {
        let run = self.runs.locate(local_index).ok_or(ChunkError::IndexOutOfRange {
            index: local_index,
            len: self.num_samples(),
        })?;
        let num_bytes = *self.runs.value(run) as u64;
        let start = self.starts[run] + (local_index - self.runs.run_start(run)) as u64 * num_bytes;
        Ok((start as usize, (start + num_bytes) as usize))
    }

    pub fn num_bytes_at(&self, local_index: usize) -> Result<usize> {
        let (start, end) = self.range_at(local_index)?;
        Ok(end - start)
    }

    /// Changes one sample's length; every later range shifts by the difference.
    pub fn update_num_bytes(&mut self, local_index: usize, num_bytes: usize) -> Result<()> {
        let num_bytes = to_u32(num_bytes, "sample length exceeds u32")?;
        let len = self.num_samples();
        self.runs
            .set(local_index, num_bytes)
            .ok_or(ChunkError::IndexOutOfRange { index: local_index, len })?;
        self.rebuild_starts();
        Ok(())
    }

    fn rebuild_starts(&mut self) {
        self.starts.clear();
        let mut offset = 0u64;
        for (&num_bytes, count) in self.runs.iter() {
            self.starts.push(offset);
            offset += num_bytes as u64 * count as u64;
        }
    }

    pub fn serialized_size(&self) -> usize {
        Self::FIXED_SIZE + self.num_runs() * Self::RUN_SIZE
    }

    pub fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.extend_from_slice(&to_u32(self.num_runs(), "byte run count exceeds u32")?.to_le_bytes());
        for (num_bytes, count) in self.runs() {
            buf.extend_from_slice(&num_bytes.to_le_bytes());
            buf.extend_from_slice(&to_u32(count, "byte run length exceeds u32")?.to_le_bytes());
        }
        Ok(())
    }

    pub fn read_from(blob: &[u8]) -> Result<Self> {
        let mut cursor = blob;
        let num_runs = read_u32(&mut cursor)? as usize;
        if (num_runs as u64) * Self::RUN_SIZE as u64 != cursor.len() as u64 {
            return Err(ChunkError::CorruptData("byte runs do not match blob length"));
        }

        let mut encoder = Self::new();
        for _ in 0..num_runs {
            let num_bytes = read_u32(&mut cursor)? as usize;
            let count = read_u32(&mut cursor)? as usize;
            if count == 0 {
                return Err(ChunkError::CorruptData("empty byte run"));
            }
            encoder.add_length(num_bytes, count)?;
        }

        Ok(encoder)
    }
}
