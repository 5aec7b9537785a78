use serde::{Deserialize, Serialize};

use crate::compression::CompressionPolicy;
use crate::error::{ChunkError, Result};
use crate::metadata::dtype::Dtype;
use crate::metadata::htype::Htype;

/// Running per-axis minimum and maximum over every sample shape seen so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeInterval {
    pub lower: Vec<u32>,
    pub upper: Vec<u32>,
}

impl ShapeInterval {
    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    pub fn is_dynamic(&self) -> bool {
        self.lower != self.upper
    }

    fn update(&mut self, shape: &[u32]) {
        if self.lower.is_empty() {
            self.lower = shape.to_vec();
            self.upper = shape.to_vec();
            return;
        }
        for (axis, &dim) in shape.iter().enumerate() {
            self.lower[axis] = self.lower[axis].min(dim);
            self.upper[axis] = self.upper[axis].max(dim);
        }
    }
}

/// Tensor-level bookkeeping shared by all chunks of one tensor.
///
/// `length` and `shape_interval` change exactly once per logical sample,
/// never per tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorMeta {
    pub htype: Htype,
    pub dtype: Option<Dtype>,
    #[serde(default)]
    pub compression: CompressionPolicy,
    #[serde(default)]
    pub length: u64,
    #[serde(default)]
    pub shape_interval: ShapeInterval,
}

impl TensorMeta {
    pub fn new(htype: Htype) -> Self {
        Self {
            htype,
            dtype: htype.default_dtype(),
            compression: CompressionPolicy::None,
            length: 0,
            shape_interval: ShapeInterval::default(),
        }
    }

    pub fn with_dtype(mut self, dtype: Dtype) -> Self {
        self.dtype = Some(dtype);
        self
    }

    pub fn with_compression(mut self, compression: CompressionPolicy) -> Self {
        self.compression = compression;
        self
    }

    /// Rank fixed by the first registered sample, if any.
    pub fn num_dims(&self) -> Option<usize> {
        if self.shape_interval.is_empty() {
            None
        } else {
            Some(self.shape_interval.lower.len())
        }
    }

    pub fn is_text_like(&self) -> bool {
        self.htype.is_text_like()
    }

    pub fn check_sample_shape(&self, shape: &[u32]) -> Result<()> {
        match self.num_dims() {
            Some(expected) if expected != shape.len() => Err(ChunkError::ShapeRankMismatch {
                expected,
                shape: shape.to_vec(),
            }),
            _ => Ok(()),
        }
    }

    pub fn update_shape_interval(&mut self, shape: &[u32]) -> Result<()> {
        self.check_sample_shape(shape)?;
        self.shape_interval.update(shape);
        Ok(())
    }

    /// Counts one more logical sample of `shape`.
    pub fn register_sample(&mut self, shape: &[u32]) -> Result<()> {
        self.update_shape_interval(shape)?;
        self.length += 1;
        Ok(())
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
