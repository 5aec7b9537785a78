use serde::{Deserialize, Serialize};

use crate::error::{ChunkError, Result};

pub const MB: usize = 1024 * 1024;
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 32 * MB;
pub const DEFAULT_MIN_CHUNK_SIZE: usize = 16 * MB;

/// Capacity parameters shared by every chunk of a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkConfig {
    /// Hard ceiling on data bytes. A chunk never reaches this value.
    pub max_data_bytes: usize,
    /// Soft floor: a chunk below it is still worth filling, and a single
    /// sample larger than it gets tiled.
    pub min_data_bytes_target: usize,
}

impl ChunkConfig {
    pub fn new(max_data_bytes: usize, min_data_bytes_target: usize) -> Result<Self> {
        let config = Self {
            max_data_bytes,
            min_data_bytes_target,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_data_bytes_target == 0 {
            return Err(ChunkError::InvalidConfig(
                "min_data_bytes_target must be positive".into(),
            ));
        }
        if self.min_data_bytes_target >= self.max_data_bytes {
            return Err(ChunkError::InvalidConfig(format!(
                "min_data_bytes_target ({}) must be below max_data_bytes ({})",
                self.min_data_bytes_target, self.max_data_bytes
            )));
        }
        // the container stores the data length as u32
        if self.max_data_bytes > u32::MAX as usize {
            return Err(ChunkError::InvalidConfig(format!(
                "max_data_bytes ({}) does not fit the chunk container",
                self.max_data_bytes
            )));
        }
        Ok(())
    }

    /// Most bytes an empty chunk accepts under the strict capacity rule.
    pub fn tile_capacity(&self) -> usize {
        self.max_data_bytes.saturating_sub(1)
    }

    pub fn needs_to_be_tiled(&self, num_bytes: usize) -> bool {
        num_bytes > self.min_data_bytes_target
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_data_bytes: DEFAULT_MAX_CHUNK_SIZE,
            min_data_bytes_target: DEFAULT_MIN_CHUNK_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = ChunkConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tile_capacity(), 32 * MB - 1);
    }

    #[test]
    fn rejects_inverted_limits() {
        assert!(matches!(
            ChunkConfig::new(50, 100),
            Err(ChunkError::InvalidConfig(_))
        ));
        assert!(matches!(
            ChunkConfig::new(100, 100),
            Err(ChunkError::InvalidConfig(_))
        ));
        assert!(matches!(
            ChunkConfig::new(100, 0),
            Err(ChunkError::InvalidConfig(_))
        ));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: ChunkConfig = serde_json::from_str(r#"{"max_data_bytes": 4096}"#).unwrap();
        assert_eq!(config.max_data_bytes, 4096);
        assert_eq!(config.min_data_bytes_target, DEFAULT_MIN_CHUNK_SIZE);
        assert!(config.validate().is_err());
    }

    #[test]
    fn tiling_threshold_is_exclusive() {
        let config = ChunkConfig::new(100, 50).unwrap();
        assert!(!config.needs_to_be_tiled(50));
        assert!(config.needs_to_be_tiled(51));
    }
}
