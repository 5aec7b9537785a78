use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{ChunkError, Result};

pub fn create_chunk_file(path: &Path) -> Result<File> {
    Ok(OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?)
}

/// Opens an existing chunk file; a missing file is reported as `NotFound(chunk_id)`.
pub fn open_chunk_file(path: &Path, chunk_id: u64) -> Result<File> {
    OpenOptions::new().read(true).open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ChunkError::NotFound(chunk_id),
        _ => ChunkError::Io(e),
    })
}
