use crate::sample::{Array, SampleValue};
use crate::tiling::SampleTiles;

/// Input to [`Chunk::extend_if_has_space`](crate::storage::Chunk::extend_if_has_space).
#[derive(Debug)]
pub enum Batch<'a> {
    /// Equal-shaped samples stacked along the outermost axis.
    Array(&'a Array),
    /// Heterogeneous samples, packed one by one. Slots that start tiling are
    /// replaced with their tiling state so the next chunk can resume them.
    Sequence(&'a mut [IncomingSample]),
}

#[derive(Debug)]
pub enum IncomingSample {
    Value(SampleValue),
    Tiles(SampleTiles),
}

impl From<SampleValue> for IncomingSample {
    fn from(value: SampleValue) -> Self {
        IncomingSample::Value(value)
    }
}

/// How far a chunk got through a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendOutcome {
    /// `n` whole samples were packed and the chunk stopped (or the batch ended).
    Consumed(usize),
    /// `consumed` whole samples were packed, then the next sample started or
    /// continued tiling and must be offered to a successor chunk.
    TilingInProgress { consumed: usize },
}

impl ExtendOutcome {
    pub fn consumed(self) -> usize {
        match self {
            ExtendOutcome::Consumed(n) => n,
            ExtendOutcome::TilingInProgress { consumed } => consumed,
        }
    }

    pub fn is_tiling(self) -> bool {
        matches!(self, ExtendOutcome::TilingInProgress { .. })
    }
}
