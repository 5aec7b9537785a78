use tracing::{debug, trace};

use crate::config::ChunkConfig;
use crate::error::{ChunkError, Result};
use crate::sample::array::num_elements;

/// One contiguous piece of an oversized sample, ready to be appended to a chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub bytes: Vec<u8>,
    /// Same rank as the tiling grid; every axis before the split axis is 1.
    pub shape: Vec<u32>,
    pub first: bool,
    pub last: bool,
}

/// Progress of one oversized sample being written across successive chunks.
///
/// The sample is cut into contiguous row-major ranges of its element grid.
/// Each call to [`next_tile`](Self::next_tile) emits the largest range that
/// fits the capacity offered by the current chunk, starting where the previous
/// call stopped.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleTiles {
    data: Vec<u8>,
    sample_shape: Vec<u32>,
    grid: Vec<u32>,
    itemsize: usize,
    /// Elements already emitted.
    cursor: usize,
}

impl SampleTiles {
    /// Begins tiling `data`, laid out as `grid` elements of `itemsize` bytes.
    ///
    /// `sample_shape` is the logical shape recorded in tensor metadata. It
    /// differs from `grid` only for byte-like samples, which tile over `[len]`.
    ///
    /// # Errors
    /// `TileImpossible` when the buffer does not match the grid, or when a
    /// single element is larger than an empty chunk can hold.
    pub fn start(
        data: Vec<u8>,
        sample_shape: Vec<u32>,
        grid: Vec<u32>,
        itemsize: usize,
        config: &ChunkConfig,
    ) -> Result<Self> {
        if grid.is_empty() || itemsize == 0 || num_elements(&grid) * itemsize != data.len() {
            return Err(ChunkError::TileImpossible(format!(
                "{} bytes do not form a grid of {grid:?} x {itemsize} bytes",
                data.len()
            )));
        }
        if itemsize > config.tile_capacity() {
            return Err(ChunkError::TileImpossible(format!(
                "one element of {itemsize} bytes exceeds the chunk capacity of {} bytes",
                config.tile_capacity()
            )));
        }
        debug!(num_bytes = data.len(), shape = ?sample_shape, "tiling oversized sample");
        Ok(Self {
            data,
            sample_shape,
            grid,
            itemsize,
            cursor: 0,
        })
    }

    pub fn sample_shape(&self) -> &[u32] {
        &self.sample_shape
    }

    pub fn num_bytes(&self) -> usize {
        self.data.len()
    }

    pub fn bytes_emitted(&self) -> usize {
        self.cursor * self.itemsize
    }

    /// True until the first tile has been emitted.
    pub fn is_first_write(&self) -> bool {
        self.cursor == 0
    }

    pub fn is_complete(&self) -> bool {
        self.cursor == num_elements(&self.grid)
    }

    /// Elements spanned by one step along `axis`.
    fn slab(&self, axis: usize) -> usize {
        num_elements(&self.grid[axis + 1..])
    }

    /// Emits the next tile that fits in `capacity` bytes.
    ///
    /// Returns `None` when the sample is complete or when `capacity` cannot
    /// hold a single element.
    pub fn next_tile(&mut self, capacity: usize) -> Option<Tile> {
        if self.is_complete() {
            return None;
        }

        // 1. Outermost axis whose slab fits and starts at the cursor.
        let axis = (0..self.grid.len()).find(|&axis| {
            let slab = self.slab(axis);
            slab * self.itemsize <= capacity && self.cursor % slab == 0
        })?;

        // 2. As many slabs as fit without crossing into the next outer index.
        let slab = self.slab(axis);
        let position = (self.cursor / slab) % self.grid[axis] as usize;
        let count = (capacity / (slab * self.itemsize)).min(self.grid[axis] as usize - position);

        let mut shape = vec![1u32; axis];
        shape.push(count as u32);
        shape.extend_from_slice(&self.grid[axis + 1..]);

        // 3. Slice the bytes and advance.
        let first = self.is_first_write();
        let start = self.cursor * self.itemsize;
        self.cursor += count * slab;
        let end = self.cursor * self.itemsize;
        let last = self.is_complete();

        trace!(start, end, shape = ?shape, last, "emitting tile");
        if last {
            debug!(num_bytes = self.data.len(), "tiled sample complete");
        }

        Some(Tile {
            bytes: self.data[start..end].to_vec(),
            shape,
            first,
            last,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max: usize) -> ChunkConfig {
        ChunkConfig::new(max, max / 2).unwrap()
    }

    fn tiles_of(grid: Vec<u32>, itemsize: usize, capacity: usize) -> Vec<Tile> {
        let len = num_elements(&grid) * itemsize;
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        let mut tiles = SampleTiles::start(data, grid.clone(), grid, itemsize, &config(capacity + 1)).unwrap();
        let mut out = Vec::new();
        while let Some(tile) = tiles.next_tile(capacity) {
            out.push(tile);
        }
        assert!(tiles.is_complete());
        out
    }

    #[test]
    fn rows_are_taken_whole_when_they_fit() {
        // 10 rows of 8 bytes, 30 bytes offered: 3 rows per tile
        let tiles = tiles_of(vec![10, 8], 1, 30);
        let shapes: Vec<_> = tiles.iter().map(|t| t.shape.clone()).collect();
        assert_eq!(shapes, vec![vec![3, 8], vec![3, 8], vec![3, 8], vec![1, 8]]);
        assert!(tiles[0].first && !tiles[1].first);
        assert!(tiles[3].last && !tiles[2].last);
    }

    #[test]
    fn rows_larger_than_capacity_split_inner_axis() {
        let tiles = tiles_of(vec![2, 10], 2, 8);
        assert_eq!(tiles[0].shape, vec![1, 4]);
        assert_eq!(tiles[1].shape, vec![1, 4]);
        assert_eq!(tiles[2].shape, vec![1, 2]);
        assert_eq!(tiles.len(), 6);
    }

    #[test]
    fn concatenated_tiles_rebuild_the_sample() {
        let grid = vec![5, 3, 7];
        let len = num_elements(&grid) * 4;
        let data: Vec<u8> = (0..len).map(|i| (i * 7 % 256) as u8).collect();
        let mut tiles = SampleTiles::start(data.clone(), grid.clone(), grid, 4, &config(64)).unwrap();

        let mut rebuilt = Vec::new();
        let mut writes = 0;
        for capacity in [50, 13, 63, 9, 40].into_iter().cycle() {
            match tiles.next_tile(capacity) {
                Some(tile) => {
                    assert_eq!(tile.bytes.len(), num_elements(&tile.shape) * 4);
                    rebuilt.extend_from_slice(&tile.bytes);
                    writes += 1;
                }
                None if tiles.is_complete() => break,
                None => {}
            }
        }
        assert_eq!(rebuilt, data);
        assert!(writes > 1);
    }

    #[test]
    fn capacity_below_one_element_yields_nothing() {
        let mut tiles = SampleTiles::start(vec![0; 64], vec![8], vec![8], 8, &config(100)).unwrap();
        assert!(tiles.next_tile(7).is_none());
        assert!(tiles.is_first_write());
        assert!(tiles.next_tile(8).is_some());
        assert!(!tiles.is_first_write());
    }

    #[test]
    fn element_larger_than_chunk_is_impossible() {
        let err = SampleTiles::start(vec![0; 16], vec![2], vec![2], 8, &config(8)).unwrap_err();
        assert!(matches!(err, ChunkError::TileImpossible(_)));
    }

    #[test]
    fn byte_like_grid_keeps_logical_shape() {
        let tiles = SampleTiles::start(vec![b'a'; 40], vec![1], vec![40], 1, &config(20)).unwrap();
        assert_eq!(tiles.sample_shape(), &[1]);
        assert_eq!(tiles.num_bytes(), 40);
    }
}
