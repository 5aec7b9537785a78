pub mod chunk;
pub mod chunk_header;
pub mod extend;
pub mod file;
pub mod store;

pub use chunk::Chunk;
pub use chunk_header::ChunkHeader;
pub use extend::{Batch, ExtendOutcome, IncomingSample};
pub use store::{ChunkStore, LocalChunkStore, MemoryChunkStore};
