pub mod dtype;
pub mod htype;
pub mod tensor_meta;

pub use dtype::Dtype;
pub use htype::Htype;
pub use tensor_meta::{ShapeInterval, TensorMeta};
