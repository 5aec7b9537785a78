use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ChunkFlags: u8 {
        /// Blob checksum is present and must be validated
        const CHECKSUM = 0b0000_0001;

        /// Chunk holds at least one tile of an oversized sample
        const TILED    = 0b0000_0010;
    }
}
