//! Sample values, their typed array forms, and the conversion to and from
//! the bytes stored in a chunk.

pub mod array;
pub mod cast;
pub mod read;
pub mod serialize;
pub mod value;

pub use array::{Array, ArrayView, Element, num_elements};
pub use cast::intelligent_cast;
pub use read::SampleRead;
pub use serialize::{SerializedSample, serialize_sample};
pub use value::{CompressedSample, SampleValue, Scalar};
