use std::fmt;
use std::ops::Range;

use crate::error::{ChunkError, Result};
use crate::metadata::Dtype;

/// Primitive types that can back an [`Array`].
pub trait Element: Copy + PartialEq + fmt::Debug + 'static {
    const DTYPE: Dtype;

    fn write_le(self, out: &mut Vec<u8>);

    /// `bytes` is exactly `DTYPE.itemsize()` long.
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_element {
    ($($ty:ty => $dtype:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const DTYPE: Dtype = Dtype::$dtype;

                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                fn read_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_element! {
    u8 => U8, u16 => U16, u32 => U32, u64 => U64,
    i8 => I8, i16 => I16, i32 => I32, i64 => I64,
    f32 => F32, f64 => F64,
}

impl Element for bool {
    const DTYPE: Dtype = Dtype::Bool;

    fn write_le(self, out: &mut Vec<u8>) {
        out.push(self as u8);
    }

    fn read_le(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }
}

/// Number of elements described by `shape`. A rank-0 shape holds one element.
pub fn num_elements(shape: &[u32]) -> usize {
    shape.iter().map(|&dim| dim as usize).product()
}

fn normalize_shape(shape: Vec<u32>) -> Vec<u32> {
    if shape.is_empty() { vec![1] } else { shape }
}

fn check_layout(dtype: Dtype, shape: &[u32], len: usize) -> Result<()> {
    let expected = num_elements(shape) * dtype.itemsize();
    if expected != len {
        return Err(ChunkError::InvalidArray(format!(
            "{len} bytes do not match shape {shape:?} of {dtype} ({expected} bytes)"
        )));
    }
    Ok(())
}

fn decode_elements<T: Element>(dtype: Dtype, data: &[u8]) -> Result<Vec<T>> {
    if dtype != T::DTYPE {
        return Err(ChunkError::InvalidArray(format!(
            "array holds {dtype}, not {}",
            T::DTYPE
        )));
    }
    Ok(data.chunks_exact(dtype.itemsize()).map(T::read_le).collect())
}

/// Owned, row-major array of little-endian elements.
///
/// Rank-0 shapes are stored as `[1]`, so every array has at least one axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    dtype: Dtype,
    shape: Vec<u32>,
    data: Vec<u8>,
}

impl Array {
    pub fn from_vec<T: Element>(values: Vec<T>, shape: Vec<u32>) -> Result<Self> {
        let shape = normalize_shape(shape);
        if num_elements(&shape) != values.len() {
            return Err(ChunkError::InvalidArray(format!(
                "{} values do not fill shape {shape:?}",
                values.len()
            )));
        }
        let mut data = Vec::with_capacity(values.len() * T::DTYPE.itemsize());
        for value in values {
            value.write_le(&mut data);
        }
        Ok(Self {
            dtype: T::DTYPE,
            shape,
            data,
        })
    }

    pub fn scalar<T: Element>(value: T) -> Self {
        let mut data = Vec::with_capacity(T::DTYPE.itemsize());
        value.write_le(&mut data);
        Self {
            dtype: T::DTYPE,
            shape: vec![1],
            data,
        }
    }

    pub fn from_bytes(dtype: Dtype, shape: Vec<u32>, data: Vec<u8>) -> Result<Self> {
        let shape = normalize_shape(shape);
        check_layout(dtype, &shape, data.len())?;
        Ok(Self { dtype, shape, data })
    }

    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    pub fn shape(&self) -> &[u32] {
        &self.shape
    }

    pub fn num_elements(&self) -> usize {
        num_elements(&self.shape)
    }

    pub fn nbytes(&self) -> usize {
        self.data.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        decode_elements(self.dtype, &self.data)
    }

    pub fn view(&self) -> ArrayView<'_> {
        ArrayView {
            dtype: self.dtype,
            shape: self.shape.clone(),
            data: &self.data,
        }
    }

    /// Number of entries along the outermost axis.
    pub fn outer_len(&self) -> usize {
        self.shape[0] as usize
    }

    /// Shape of one entry along the outermost axis.
    pub fn inner_shape(&self) -> Vec<u32> {
        normalize_shape(self.shape[1..].to_vec())
    }

    /// Copies entries `range` of the outermost axis into a new array.
    pub fn slice_outer(&self, range: Range<usize>) -> Result<Array> {
        if range.start > range.end || range.end > self.outer_len() {
            return Err(ChunkError::InvalidArray(format!(
                "slice {range:?} is out of bounds for outer length {}",
                self.outer_len()
            )));
        }
        let stride = num_elements(&self.shape[1..]) * self.dtype.itemsize();
        let mut shape = self.shape.clone();
        shape[0] = (range.end - range.start) as u32;
        Ok(Self {
            dtype: self.dtype,
            shape,
            data: self.data[range.start * stride..range.end * stride].to_vec(),
        })
    }

    /// Entry `index` of the outermost axis as a standalone sample.
    pub fn entry(&self, index: usize) -> Result<Array> {
        let mut entry = self.slice_outer(index..index + 1)?;
        entry.shape = self.inner_shape();
        Ok(entry)
    }
}

/// Borrowed array over bytes owned elsewhere, usually a chunk's data buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayView<'a> {
    dtype: Dtype,
    shape: Vec<u32>,
    data: &'a [u8],
}

impl<'a> ArrayView<'a> {
    pub fn new(dtype: Dtype, shape: Vec<u32>, data: &'a [u8]) -> Result<Self> {
        let shape = normalize_shape(shape);
        check_layout(dtype, &shape, data.len())?;
        Ok(Self { dtype, shape, data })
    }

    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    pub fn shape(&self) -> &[u32] {
        &self.shape
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        decode_elements(self.dtype, self.data)
    }

    pub fn to_array(&self) -> Array {
        Array {
            dtype: self.dtype,
            shape: self.shape.clone(),
            data: self.data.to_vec(),
        }
    }
}
