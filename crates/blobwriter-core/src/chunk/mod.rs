mod fixed;

pub use fixed::{Chunk, FixedSizeChunker};

use crate::error::{BlobWriterError, Result};

/// Default bridge chunk size: 384 KiB (3 × 128 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 3 * 128 * 1024;

/// Maximum size of a non-final chunk sent through the bridge writer.
///
/// Always a non-zero multiple of 3. Base64 only pads the final group of a
/// stream, so as long as every chunk but the last is a whole number of
/// 3-byte groups, the encoded chunks concatenate into one valid encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkBudget(usize);

impl ChunkBudget {
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(BlobWriterError::Config("chunk size must be non-zero".into()));
        }
        if size % 3 != 0 {
            return Err(BlobWriterError::Config(format!(
                "chunk size must be a multiple of 3, got {size}"
            )));
        }
        Ok(Self(size))
    }

    pub fn get(&self) -> usize {
        self.0
    }

    /// Number of chunks a blob of `len` bytes is split into.
    pub fn chunk_count(&self, len: usize) -> usize {
        len.div_ceil(self.0)
    }
}

impl Default for ChunkBudget {
    fn default() -> Self {
        Self(DEFAULT_CHUNK_SIZE)
    }
}
