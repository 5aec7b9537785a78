use crate::encode::runs::Runs;
use crate::error::{ChunkError, Result};
use crate::helpers::helper::{read_u32, to_u32};

/// Run-length encoded shapes of the samples in one chunk.
///
/// Blob layout (little-endian):
/// ```text
/// [ rank (u32) | num_runs (u32) | num_runs x ( rank x dim (u32) | count (u32) ) ]
/// ```
/// `rank` is written as 0 while the encoder is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShapeEncoder {
    runs: Runs<Vec<u32>>,
}

impl ShapeEncoder {
    const FIXED_SIZE: usize = 4 + 4;

    pub fn new() -> Self {
        Self::default()
    }

    /// Rank established by the first added shape.
    pub fn rank(&self) -> Option<usize> {
        if self.runs.num_runs() == 0 {
            None
        } else {
            Some(self.runs.value(0).len())
        }
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

    /// `(shape, count)` pairs in sample order.
    pub fn runs(&self) -> impl Iterator<Item = (&[u32], usize)> {
        self.runs.iter().map(|(shape, count)| (shape.as_slice(), count))
    }

    fn check_rank(&self, shape: &[u32]) -> Result<()> {
        match self.rank() {
            Some(expected) if expected != shape.len() => Err(ChunkError::RankMismatch {
                expected,
                actual: shape.len(),
            }),
            _ => Ok(()),
        }
    }

    pub fn add_shape(&mut self, shape: &[u32], count: usize) -> Result<()> {
        self.check_rank(shape)?;
        self.runs.push(shape.to_vec(), count);
        Ok(())
    }

    pub fn shape_at(&self, local_index: usize) -> Result<&[u32]> {
        self.runs
            .get(local_index)
            .map(Vec::as_slice)
            .ok_or(ChunkError::IndexOutOfRange {
                index: local_index,
                len: self.num_samples(),
            })
    }

    /// Overwrites the shape of one sample in place.
    pub fn update_shape(&mut self, local_index: usize, shape: &[u32]) -> Result<()> {
        self.check_rank(shape)?;
        let len = self.num_samples();
        self.runs
            .set(local_index, shape.to_vec())
            .map(|_| ())
            .ok_or(ChunkError::IndexOutOfRange { index: local_index, len })
    }

    pub fn serialized_size(&self) -> usize {
        let rank = self.rank().unwrap_or(0);
        Self::FIXED_SIZE + self.num_runs() * (rank + 1) * 4
    }

    pub fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        let rank = self.rank().unwrap_or(0);
        buf.extend_from_slice(&to_u32(rank, "shape rank exceeds u32")?.to_le_bytes());
        buf.extend_from_slice(&to_u32(self.num_runs(), "shape run count exceeds u32")?.to_le_bytes());
        for (shape, count) in self.runs() {
            for dim in shape {
                buf.extend_from_slice(&dim.to_le_bytes());
            }
            buf.extend_from_slice(&to_u32(count, "shape run length exceeds u32")?.to_le_bytes());
        }
        Ok(())
    }

    pub fn read_from(blob: &[u8]) -> Result<Self> {
        let mut cursor = blob;
        let rank = read_u32(&mut cursor)? as usize;
        let num_runs = read_u32(&mut cursor)? as usize;

        // each run is `rank` dims plus its count
        let expected = (rank as u64 + 1).checked_mul(4 * num_runs as u64);
        if expected != Some(cursor.len() as u64) {
            return Err(ChunkError::CorruptData("shape runs do not match blob length"));
        }

        let mut encoder = Self::new();
        for _ in 0..num_runs {
            let mut shape = Vec::with_capacity(rank);
            for _ in 0..rank {
                shape.push(read_u32(&mut cursor)?);
            }
            let count = read_u32(&mut cursor)? as usize;
            if count == 0 {
                return Err(ChunkError::CorruptData("empty shape run"));
            }
            encoder.add_shape(&shape, count)?;
        }

        Ok(encoder)
    }
}
