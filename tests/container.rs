//! Serialized chunk container: round trips, framing and corruption.

use proptest::prelude::*;
use tensorchunk::helpers::header_flags::ChunkFlags;
use tensorchunk::storage::ChunkHeader;
use tensorchunk::{
    Array, Batch, Chunk, ChunkConfig, ChunkError, ChunkStore, Htype, IncomingSample, LocalChunkStore, SampleValue,
    TensorMeta,
};

// ============================================================================
// Helpers
// ============================================================================

fn packed(config: ChunkConfig, samples: Vec<SampleValue>, meta: &mut TensorMeta) -> Chunk {
    let mut chunk = Chunk::new(7, config);
    let mut pending: Vec<IncomingSample> = samples.into_iter().map(IncomingSample::from).collect();
    chunk
        .extend_if_has_space(Batch::Sequence(&mut pending), meta)
        .unwrap();
    chunk
}

fn sample_chunk() -> Chunk {
    let mut meta = TensorMeta::new(Htype::Generic);
    packed(
        ChunkConfig::new(1000, 500).unwrap(),
        vec![
            Array::from_vec(vec![1u8; 4], vec![2, 2]).unwrap().into(),
            Array::from_vec(vec![2u8; 4], vec![2, 2]).unwrap().into(),
            Array::from_vec(vec![3u8; 9], vec![3, 3]).unwrap().into(),
        ],
        &mut meta,
    )
}

fn byte_samples() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 0..30), 0..20)
}

fn sample_lengths() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0usize..120, 1..12)
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #[test]
    fn serialize_round_trip_preserves_lookups(samples in byte_samples()) {
        let config = ChunkConfig::new(1000, 500).unwrap();
        let mut meta = TensorMeta::new(Htype::Generic);
        let chunk = packed(config, samples.iter().cloned().map(SampleValue::from).collect(), &mut meta);
        prop_assert_eq!(chunk.num_samples(), samples.len());

        let bytes = chunk.serialize().unwrap();
        prop_assert_eq!(bytes.len(), chunk.total_byte_footprint());

        let restored = Chunk::deserialize(&bytes, &config).unwrap();
        prop_assert_eq!(&restored, &chunk);
        for (i, sample) in samples.iter().enumerate() {
            prop_assert_eq!(restored.shapes().shape_at(i).unwrap(), chunk.shapes().shape_at(i).unwrap());
            prop_assert_eq!(
                restored.byte_positions().range_at(i).unwrap(),
                chunk.byte_positions().range_at(i).unwrap()
            );
            let read = restored.read_sample(i, &meta, true, false).unwrap();
            prop_assert_eq!(read.as_bytes().unwrap(), sample.as_slice());
        }
    }

    #[test]
    fn data_never_reaches_capacity(lengths in sample_lengths()) {
        let config = ChunkConfig::new(100, 50).unwrap();
        let mut meta = TensorMeta::new(Htype::Generic);
        let samples = lengths.iter().map(|&len| SampleValue::from(vec![0xabu8; len])).collect();
        let chunk = packed(config, samples, &mut meta);

        prop_assert!(chunk.num_data_bytes() < config.max_data_bytes);
        prop_assert_eq!(chunk.shapes().num_samples(), chunk.byte_positions().num_samples());
        prop_assert_eq!(chunk.byte_positions().total_num_bytes(), chunk.num_data_bytes() as u64);
        prop_assert_eq!(chunk.serialize().unwrap().len(), chunk.total_byte_footprint());
    }
}

// ============================================================================
// Framing
// ============================================================================

#[test]
fn empty_chunk_round_trips() {
    let config = ChunkConfig::new(100, 50).unwrap();
    let chunk = Chunk::new(42, config);
    let bytes = chunk.serialize().unwrap();
    assert_eq!(bytes.len(), ChunkHeader::SIZE + 8 + 4);
    assert_eq!(&bytes[..4], b"TCHK");

    let restored = Chunk::deserialize(&bytes, &config).unwrap();
    assert_eq!(restored.id(), 42);
    assert_eq!(restored.num_samples(), 0);
}

#[test]
fn runs_keep_the_container_small() {
    let chunk = sample_chunk();
    assert_eq!(chunk.shapes().num_runs(), 2);
    assert_eq!(chunk.shapes().serialized_size(), 8 + 2 * 3 * 4);
    assert_eq!(chunk.byte_positions().num_runs(), 2);
    assert_eq!(chunk.byte_positions().serialized_size(), 4 + 2 * 8);
    assert_eq!(chunk.total_byte_footprint(), ChunkHeader::SIZE + 32 + 20 + 17);
}

#[test]
fn tiled_flag_survives_round_trip() {
    let config = ChunkConfig::new(100, 50).unwrap();
    let mut meta = TensorMeta::new(Htype::Generic);
    let chunk = packed(config, vec![vec![5u8; 300].into()], &mut meta);
    assert!(chunk.contains_tiles());

    let restored = Chunk::deserialize(&chunk.serialize().unwrap(), &config).unwrap();
    assert!(restored.contains_tiles());
    assert_eq!(restored, chunk);
}

#[test]
fn flipped_data_byte_fails_checksum() {
    let chunk = sample_chunk();
    let mut bytes = chunk.serialize().unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;

    assert!(matches!(
        Chunk::deserialize(&bytes, chunk.config()),
        Err(ChunkError::ChecksumMismatch { .. })
    ));
}

#[test]
fn bad_framing_is_corrupt() {
    let chunk = sample_chunk();
    let bytes = chunk.serialize().unwrap();
    let config = *chunk.config();

    let mut bad_magic = bytes.clone();
    bad_magic[0] = b'X';
    assert!(matches!(Chunk::deserialize(&bad_magic, &config), Err(ChunkError::CorruptData(_))));

    let mut bad_version = bytes.clone();
    bad_version[4] = 9;
    assert!(matches!(Chunk::deserialize(&bad_version, &config), Err(ChunkError::CorruptData(_))));

    assert!(matches!(Chunk::deserialize(&bytes[..20], &config), Err(ChunkError::CorruptData(_))));
    assert!(matches!(
        Chunk::deserialize(&bytes[..bytes.len() - 1], &config),
        Err(ChunkError::CorruptData(_))
    ));

    let mut trailing = bytes.clone();
    trailing.push(0);
    assert!(matches!(Chunk::deserialize(&trailing, &config), Err(ChunkError::CorruptData(_))));
}

#[test]
fn inconsistent_headers_are_corrupt_without_checksum() {
    let chunk = sample_chunk();
    let mut bytes = chunk.serialize().unwrap();

    // clear the checksum flag, then grow the first byte run by one byte
    bytes[5] &= !1;
    let shapes_len = u32::from_le_bytes(bytes[16..20].try_into().unwrap()) as usize;
    let first_run = ChunkHeader::SIZE + shapes_len + 4;
    bytes[first_run] += 1;

    assert!(matches!(
        Chunk::deserialize(&bytes, chunk.config()),
        Err(ChunkError::CorruptData(_))
    ));
}

/// Unchecksummed container around hand-written blobs.
fn raw_container(shape_blob: &[u8], position_blob: &[u8]) -> Vec<u8> {
    let header = ChunkHeader::new(3, ChunkFlags::empty(), shape_blob.len() as u32, position_blob.len() as u32, 0);
    let mut bytes = Vec::new();
    header.write_to(&mut bytes);
    bytes.extend_from_slice(shape_blob);
    bytes.extend_from_slice(position_blob);
    bytes
}

#[test]
fn huge_rank_without_checksum_is_corrupt() {
    let mut shape_blob = Vec::new();
    shape_blob.extend_from_slice(&u32::MAX.to_le_bytes());
    shape_blob.extend_from_slice(&1u32.to_le_bytes());
    let bytes = raw_container(&shape_blob, &0u32.to_le_bytes());

    let config = ChunkConfig::new(100, 50).unwrap();
    assert!(matches!(Chunk::deserialize(&bytes, &config), Err(ChunkError::CorruptData(_))));
}

#[test]
fn huge_run_count_without_checksum_is_corrupt() {
    let mut shape_blob = Vec::new();
    shape_blob.extend_from_slice(&0u32.to_le_bytes());
    shape_blob.extend_from_slice(&0u32.to_le_bytes());
    let bytes = raw_container(&shape_blob, &u32::MAX.to_le_bytes());

    let config = ChunkConfig::new(100, 50).unwrap();
    assert!(matches!(Chunk::deserialize(&bytes, &config), Err(ChunkError::CorruptData(_))));
}

#[test]
fn local_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = LocalChunkStore::open(dir.path()).unwrap();
    let chunk = sample_chunk();

    store.put(chunk.id(), chunk.serialize().unwrap()).unwrap();
    let restored = Chunk::deserialize(&store.get(chunk.id()).unwrap(), chunk.config()).unwrap();
    assert_eq!(restored, chunk);
    assert!(matches!(store.get(99), Err(ChunkError::NotFound(99))));
}
