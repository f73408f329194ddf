//! Blob-to-file transfer.
//!
//! [`BlobWriter::write`] delivers an in-memory blob to a file, first through
//! the fast channel (a single HTTP PUT to a local transport endpoint) and,
//! when that fails and the request allows it, through the bridge writer,
//! which appends bounded Base64 chunks through a restrictive file API.

pub mod orchestrator;
pub mod platform;

pub use orchestrator::BlobWriter;
pub use platform::{Platform, select_transport};

pub use blobwriter_core::{
    BlobHandle, BlobWriterConfig, BlobWriterError, Channel, ChunkBudget, Directory,
    FallbackObserver, FallbackPolicy, FileUri, Result, ServerConfig, WriteRequest,
};
pub use blobwriter_storage::{FileSystem, LocalFileSystem, MemoryFileSystem};
pub use blobwriter_transport::{NativeTransport, UnavailableTransport};
