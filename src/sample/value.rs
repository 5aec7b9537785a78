use crate::compression::CodecTag;
use crate::metadata::Dtype;
use crate::sample::array::Array;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl Scalar {
    /// One-element array of the scalar's natural dtype.
    pub fn to_array(self) -> Array {
        match self {
            Scalar::Bool(v) => Array::scalar(v),
            Scalar::Int(v) => Array::scalar(v),
            Scalar::UInt(v) => Array::scalar(v),
            Scalar::Float(v) => Array::scalar(v),
        }
    }
}

/// An array payload that was compressed before it reached the chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedSample {
    pub codec: CodecTag,
    pub shape: Vec<u32>,
    pub dtype: Dtype,
    pub bytes: Vec<u8>,
}

impl CompressedSample {
    pub fn compress(array: &Array, codec: CodecTag) -> crate::Result<Self> {
        Ok(Self {
            codec,
            shape: array.shape().to_vec(),
            dtype: array.dtype(),
            bytes: codec.compress(array.as_bytes())?,
        })
    }
}

/// One sample as handed to a chunk, before serialization.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleValue {
    Bytes(Vec<u8>),
    Array(Array),
    Compressed(CompressedSample),
    Scalar(Scalar),
    Text(String),
    Json(serde_json::Value),
}

impl From<Vec<u8>> for SampleValue {
    fn from(bytes: Vec<u8>) -> Self {
        SampleValue::Bytes(bytes)
    }
}

impl From<Array> for SampleValue {
    fn from(array: Array) -> Self {
        SampleValue::Array(array)
    }
}

impl From<CompressedSample> for SampleValue {
    fn from(sample: CompressedSample) -> Self {
        SampleValue::Compressed(sample)
    }
}

impl From<Scalar> for SampleValue {
    fn from(scalar: Scalar) -> Self {
        SampleValue::Scalar(scalar)
    }
}

impl From<String> for SampleValue {
    fn from(text: String) -> Self {
        SampleValue::Text(text)
    }
}

impl From<&str> for SampleValue {
    fn from(text: &str) -> Self {
        SampleValue::Text(text.to_owned())
    }
}

impl From<serde_json::Value> for SampleValue {
    fn from(value: serde_json::Value) -> Self {
        SampleValue::Json(value)
    }
}
