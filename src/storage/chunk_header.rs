use std::io::Read;

use crc32fast::Hasher;

use crate::error::{ChunkError, Result};
use crate::helpers::header_flags::ChunkFlags;
use crate::helpers::helper::{read_u8, read_u16, read_u32, read_u64};

pub const CHUNK_MAGIC: [u8; 4] = *b"TCHK";
pub const CHUNK_VERSION: u8 = 1;

/// Fixed framing in front of every serialized chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub magic: [u8; 4],       // 4 BYTES FOR MAGIC
    pub version: u8,          // 1 BYTE FOR FORMAT VERSION
    pub flags: ChunkFlags,    // 1 BYTE FOR FLAGS
    pub reserved: [u8; 2],    // 2 BYTES RESERVED
    pub chunk_id: u64,        // 8 BYTES FOR CHUNK ID
    pub shapes_len: u32,      // 4 BYTES FOR SHAPE BLOB LENGTH
    pub positions_len: u32,   // 4 BYTES FOR BYTE POSITION BLOB LENGTH
    pub data_len: u32,        // 4 BYTES FOR DATA LENGTH
    pub checksum: u32,        // 4 BYTES FOR CRC32 OVER THE BLOBS
}

impl ChunkHeader {
    pub const SIZE: usize = 4 + 1 + 1 + 2 + 8 + 4 + 4 + 4 + 4;

    pub fn new(chunk_id: u64, flags: ChunkFlags, shapes_len: u32, positions_len: u32, data_len: u32) -> Self {
        Self {
            magic: CHUNK_MAGIC,
            version: CHUNK_VERSION,
            flags,
            reserved: [0; 2],
            chunk_id,
            shapes_len,
            positions_len,
            data_len,
            checksum: 0,
        }
    }

    /// Bytes that follow the header.
    pub fn body_len(&self) -> usize {
        self.shapes_len as usize + self.positions_len as usize + self.data_len as usize
    }

    /// Appends the header in its fixed little-endian layout:
    /// ```text
    /// [ magic (4) | version (1) | flags (1) | reserved (2) | chunk_id (8) ]
    /// [ shapes_len (4) | positions_len (4) | data_len (4) | checksum (4) ]
    /// ```
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.magic);
        buf.push(self.version);
        buf.push(self.flags.bits());
        buf.extend_from_slice(&self.reserved);
        buf.extend_from_slice(&self.chunk_id.to_le_bytes());
        buf.extend_from_slice(&self.shapes_len.to_le_bytes());
        buf.extend_from_slice(&self.positions_len.to_le_bytes());
        buf.extend_from_slice(&self.data_len.to_le_bytes());
        buf.extend_from_slice(&self.checksum.to_le_bytes());
    }

    /// Reads and validates a header from the front of a serialized chunk.
    ///
    /// # Errors
    /// `CorruptData` if the buffer is short, the magic does not match
    /// [`CHUNK_MAGIC`], or the version is not [`CHUNK_VERSION`]. The checksum
    /// is not verified here since it covers the blobs after the header.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader
            .read_exact(&mut magic)
            .map_err(|_| ChunkError::CorruptData("chunk buffer ended early"))?;
        if magic != CHUNK_MAGIC {
            return Err(ChunkError::CorruptData("invalid chunk magic"));
        }

        let version = read_u8(reader)?;
        if version != CHUNK_VERSION {
            return Err(ChunkError::CorruptData("unsupported chunk version"));
        }

        let flags = ChunkFlags::from_bits_truncate(read_u8(reader)?);
        let reserved = read_u16(reader)?.to_le_bytes();
        let chunk_id = read_u64(reader)?;
        let shapes_len = read_u32(reader)?;
        let positions_len = read_u32(reader)?;
        let data_len = read_u32(reader)?;
        let checksum = read_u32(reader)?;

        Ok(Self {
            magic,
            version,
            flags,
            reserved,
            chunk_id,
            shapes_len,
            positions_len,
            data_len,
            checksum,
        })
    }
}

pub fn compute_checksum(blobs: &[&[u8]]) -> u32 {
    let mut hasher = Hasher::new();
    for blob in blobs {
        hasher.update(blob);
    }
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_32_bytes() {
        let header = ChunkHeader::new(7, ChunkFlags::CHECKSUM, 12, 20, 80);
        let mut buf = Vec::new();
        header.write_to(&mut buf);
        assert_eq!(buf.len(), ChunkHeader::SIZE);
        assert_eq!(ChunkHeader::SIZE, 32);
        assert_eq!(&buf[0..4], b"TCHK");

        let decoded = ChunkHeader::read_from(&mut buf.as_slice()).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(decoded.body_len(), 112);
    }

    #[test]
    fn rejects_bad_magic_and_version() {
        let mut buf = Vec::new();
        ChunkHeader::new(1, ChunkFlags::empty(), 0, 0, 0).write_to(&mut buf);

        let mut bad_magic = buf.clone();
        bad_magic[0] = b'X';
        assert!(matches!(
            ChunkHeader::read_from(&mut bad_magic.as_slice()),
            Err(ChunkError::CorruptData("invalid chunk magic"))
        ));

        let mut bad_version = buf.clone();
        bad_version[4] = 9;
        assert!(matches!(
            ChunkHeader::read_from(&mut bad_version.as_slice()),
            Err(ChunkError::CorruptData("unsupported chunk version"))
        ));

        assert!(ChunkHeader::read_from(&mut &buf[..10]).is_err());
    }

    #[test]
    fn checksum_covers_blob_order() {
        let a = compute_checksum(&[b"abc", b"def"]);
        assert_eq!(a, compute_checksum(&[b"abcdef"]));
        assert_ne!(a, compute_checksum(&[b"def", b"abc"]));
    }
}
