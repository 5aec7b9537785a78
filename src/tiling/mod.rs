pub mod tile;

pub use tile::{SampleTiles, Tile};
