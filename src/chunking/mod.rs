//! Splitting course text into overlapping windows for embedding.

mod text;

pub use text::TextChunker;

use crate::error::{Result, SyllabusError};
use serde::{Deserialize, Serialize};

/// Configuration for chunking, measured in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target (maximum) chunk length.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks of the same section.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            overlap: 100,
        }
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size,
            overlap,
        }
    }

    /// Check that the overlap is strictly smaller than the chunk size.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(SyllabusError::Config(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(SyllabusError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ChunkingConfig::default();
        assert_eq!(config.chunk_size, 800);
        assert_eq!(config.overlap, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        assert!(matches!(
            ChunkingConfig::new(100, 100).validate(),
            Err(SyllabusError::Config(_))
        ));
        assert!(matches!(
            ChunkingConfig::new(0, 0).validate(),
            Err(SyllabusError::Config(_))
        ));
        assert!(ChunkingConfig::new(100, 99).validate().is_ok());
    }
}
