use std::io::Read;

use crate::error::{ChunkError, Result};

const TRUNCATED: ChunkError = ChunkError::CorruptData("chunk buffer ended early");

pub fn read_u8<R: Read>(r: &mut R) -> Result<u8> {
    let mut b = [0u8; 1];
    r.read_exact(&mut b).map_err(|_| TRUNCATED)?;
    Ok(b[0])
}

pub fn read_u16<R: Read>(r: &mut R) -> Result<u16> {
    let mut b = [0u8; 2];
    r.read_exact(&mut b).map_err(|_| TRUNCATED)?;
    Ok(u16::from_le_bytes(b))
}

pub fn read_u32<R: Read>(r: &mut R) -> Result<u32> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b).map_err(|_| TRUNCATED)?;
    Ok(u32::from_le_bytes(b))
}

pub fn read_u64<R: Read>(r: &mut R) -> Result<u64> {
    let mut b = [0u8; 8];
    r.read_exact(&mut b).map_err(|_| TRUNCATED)?;
    Ok(u64::from_le_bytes(b))
}

/// Splits `len` bytes off the front of `buf` without copying.
pub fn take<'a>(buf: &mut &'a [u8], len: usize) -> Result<&'a [u8]> {
    if buf.len() < len {
        return Err(TRUNCATED);
    }
    let (head, tail) = buf.split_at(len);
    *buf = tail;
    Ok(head)
}

pub fn to_u32(value: usize, what: &'static str) -> Result<u32> {
    u32::try_from(value).map_err(|_| ChunkError::CorruptData(what))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_in_sequence() {
        let mut bytes = Vec::new();
        bytes.push(7u8);
        bytes.extend_from_slice(&513u16.to_le_bytes());
        bytes.extend_from_slice(&70_000u32.to_le_bytes());
        bytes.extend_from_slice(&(u64::MAX - 1).to_le_bytes());

        let mut cursor: &[u8] = &bytes;
        assert_eq!(read_u8(&mut cursor).unwrap(), 7);
        assert_eq!(read_u16(&mut cursor).unwrap(), 513);
        assert_eq!(read_u32(&mut cursor).unwrap(), 70_000);
        assert_eq!(read_u64(&mut cursor).unwrap(), u64::MAX - 1);
        assert!(cursor.is_empty());
    }

    #[test]
    fn short_buffer_is_corrupt() {
        let mut cursor: &[u8] = &[1, 2, 3];
        assert!(matches!(read_u32(&mut cursor), Err(ChunkError::CorruptData(_))));
    }

    #[test]
    fn take_borrows_prefix() {
        let data = [1u8, 2, 3, 4, 5];
        let mut cursor: &[u8] = &data;
        assert_eq!(take(&mut cursor, 2).unwrap(), &[1, 2]);
        assert_eq!(cursor, &[3, 4, 5]);
        assert!(take(&mut cursor, 4).is_err());
        assert_eq!(take(&mut cursor, 0).unwrap(), &[] as &[u8]);
    }
}
