pub mod chunk;
pub mod config;
pub mod error;
pub mod types;

pub use chunk::{Chunk, ChunkBudget, FixedSizeChunker};
pub use config::BlobWriterConfig;
pub use error::{BlobWriterError, Channel, Result};
pub use types::{
    BlobHandle, Directory, FallbackObserver, FallbackPolicy, FileUri, ServerConfig, WriteRequest,
};
