pub mod chunk_engine;

pub use chunk_engine::ChunkEngine;
