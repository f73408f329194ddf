//! Restrictive file API (create + append of Base64 text) and the chunked
//! bridge writer built on top of it.

pub mod bridge;
pub mod local;
pub mod memory;
pub mod provider;

pub use bridge::BridgeWriter;
pub use local::LocalFileSystem;
pub use memory::MemoryFileSystem;
pub use provider::{FileSystem, validate_logical_path};
