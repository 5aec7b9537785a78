use std::collections::HashMap;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::error::{ChunkError, Result};
use crate::storage::file::{create_chunk_file, open_chunk_file};

/// Keyed backend holding serialized chunks.
///
/// No ordering or transactional guarantees: the caller decides when chunks
/// are written and in what order.
pub trait ChunkStore {
    fn get(&self, chunk_id: u64) -> Result<Vec<u8>>;

    fn put(&mut self, chunk_id: u64, bytes: Vec<u8>) -> Result<()>;

    fn contains(&self, chunk_id: u64) -> bool;
}

#[derive(Debug, Default)]
pub struct MemoryChunkStore {
    chunks: HashMap<u64, Vec<u8>>,
}

impl MemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

impl ChunkStore for MemoryChunkStore {
    fn get(&self, chunk_id: u64) -> Result<Vec<u8>> {
        self.chunks
            .get(&chunk_id)
            .cloned()
            .ok_or(ChunkError::NotFound(chunk_id))
    }

    fn put(&mut self, chunk_id: u64, bytes: Vec<u8>) -> Result<()> {
        self.chunks.insert(chunk_id, bytes);
        Ok(())
    }

    fn contains(&self, chunk_id: u64) -> bool {
        self.chunks.contains_key(&chunk_id)
    }
}

/// One file per chunk under `<root>/chunks/<chunk_id>`.
#[derive(Debug, Clone)]
pub struct LocalChunkStore {
    root: PathBuf,
}

impl LocalChunkStore {
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join("chunks"))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn chunk_path(&self, chunk_id: u64) -> PathBuf {
        self.root.join("chunks").join(chunk_id.to_string())
    }
}

impl ChunkStore for LocalChunkStore {
    fn get(&self, chunk_id: u64) -> Result<Vec<u8>> {
        let mut file = open_chunk_file(&self.chunk_path(chunk_id), chunk_id)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        trace!(chunk_id, num_bytes = bytes.len(), "read chunk file");
        Ok(bytes)
    }

    fn put(&mut self, chunk_id: u64, bytes: Vec<u8>) -> Result<()> {
        let mut file = create_chunk_file(&self.chunk_path(chunk_id))?;
        file.write_all(&bytes)?;
        file.sync_data()?;
        trace!(chunk_id, num_bytes = bytes.len(), "wrote chunk file");
        Ok(())
    }

    fn contains(&self, chunk_id: u64) -> bool {
        self.chunk_path(chunk_id).is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trip() {
        let mut store = MemoryChunkStore::new();
        assert!(matches!(store.get(3), Err(ChunkError::NotFound(3))));
        store.put(3, vec![1, 2, 3]).unwrap();
        assert!(store.contains(3));
        assert_eq!(store.get(3).unwrap(), vec![1, 2, 3]);
        store.put(3, vec![9]).unwrap();
        assert_eq!(store.get(3).unwrap(), vec![9]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn local_store_writes_one_file_per_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LocalChunkStore::open(dir.path()).unwrap();
        assert!(!store.contains(0));
        assert!(matches!(store.get(0), Err(ChunkError::NotFound(0))));

        store.put(0, vec![4; 10]).unwrap();
        store.put(1, vec![5; 3]).unwrap();
        assert!(dir.path().join("chunks").join("0").is_file());
        assert_eq!(store.get(0).unwrap(), vec![4; 10]);

        store.put(0, vec![6]).unwrap();
        assert_eq!(store.get(0).unwrap(), vec![6]);
    }
}
