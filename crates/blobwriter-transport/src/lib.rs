//! Fast channel: one raw-bytes PUT to the local transport endpoint.
//!
//! The endpoint itself lives behind [`NativeTransport`]; this crate only
//! knows how to ask it for a [`ServerConfig`](blobwriter_core::ServerConfig)
//! and how to upload to it.

pub mod client;
pub mod native;

pub use client::{FastChannelClient, check_status, transfer_url};
pub use native::{NativeTransport, UnavailableTransport};

/// Query flag asking the endpoint to create missing parent directories.
pub const RECURSIVE_QUERY: &str = "recursive=true";
