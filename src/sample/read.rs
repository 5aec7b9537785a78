use std::borrow::Cow;

use crate::error::{ChunkError, Result};
use crate::metadata::{Dtype, Htype, TensorMeta};
use crate::sample::array::{Array, ArrayView, Element, num_elements};

/// A sample read back from a chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleRead<'a> {
    /// Borrowed from the chunk's data buffer.
    View(ArrayView<'a>),
    Array(Array),
    Text(String),
    Json(serde_json::Value),
}

impl<'a> SampleRead<'a> {
    pub fn is_borrowed(&self) -> bool {
        matches!(self, SampleRead::View(_))
    }

    /// Raw element bytes for array reads.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            SampleRead::View(view) => Some(view.as_bytes()),
            SampleRead::Array(array) => Some(array.as_bytes()),
            SampleRead::Text(_) | SampleRead::Json(_) => None,
        }
    }

    pub fn shape(&self) -> Option<&[u32]> {
        match self {
            SampleRead::View(view) => Some(view.shape()),
            SampleRead::Array(array) => Some(array.shape()),
            SampleRead::Text(_) | SampleRead::Json(_) => None,
        }
    }

    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        match self {
            SampleRead::View(view) => view.to_vec(),
            SampleRead::Array(array) => array.to_vec(),
            SampleRead::Text(_) | SampleRead::Json(_) => {
                Err(ChunkError::InvalidArray("text-like sample has no elements".into()))
            }
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SampleRead::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            SampleRead::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Detaches the read from the chunk it came from.
    pub fn into_owned(self) -> SampleRead<'static> {
        match self {
            SampleRead::View(view) => SampleRead::Array(view.to_array()),
            SampleRead::Array(array) => SampleRead::Array(array),
            SampleRead::Text(text) => SampleRead::Text(text),
            SampleRead::Json(value) => SampleRead::Json(value),
        }
    }
}

/// Turns a decoded payload into the value the tensor's htype calls for.
///
/// Text stays text, json and list samples are parsed, everything else is
/// reinterpreted as `meta.dtype` elements of `shape`. Tensors that never saw
/// an array read as `u8`.
pub(crate) fn interpret<'a>(payload: Cow<'a, [u8]>, shape: &[u32], meta: &TensorMeta, copy: bool) -> Result<SampleRead<'a>> {
    match meta.htype {
        Htype::Text => return Ok(SampleRead::Text(std::str::from_utf8(&payload)?.to_owned())),
        Htype::Json | Htype::List => return Ok(SampleRead::Json(serde_json::from_slice(&payload)?)),
        _ => {}
    }

    let dtype = meta.dtype.unwrap_or(Dtype::U8);
    if num_elements(shape) * dtype.itemsize() != payload.len() {
        return Err(ChunkError::CorruptData("sample length does not match its shape"));
    }
    match payload {
        Cow::Borrowed(bytes) if !copy => Ok(SampleRead::View(ArrayView::new(dtype, shape.to_vec(), bytes)?)),
        payload => Ok(SampleRead::Array(Array::from_bytes(dtype, shape.to_vec(), payload.into_owned())?)),
    }
}
