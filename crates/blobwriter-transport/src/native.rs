use async_trait::async_trait;

use blobwriter_core::ServerConfig;
use blobwriter_core::error::{BlobWriterError, Result};

/// The host-side half of the fast channel.
///
/// Exactly two kinds of implementation exist: a running local server, and
/// [`UnavailableTransport`] for hosts that have none.
#[async_trait]
pub trait NativeTransport: Send + Sync {
    /// Current endpoint address and token. Must be fetched per transfer.
    async fn get_config(&self) -> Result<ServerConfig>;

    /// False when the fast channel can never work on this host, so callers
    /// can skip it instead of failing into a fallback.
    fn is_available(&self) -> bool {
        true
    }

    /// Transport name for display.
    fn name(&self) -> &str;
}

/// Stand-in for hosts without a native transport.
#[derive(Debug, Clone)]
pub struct UnavailableTransport {
    platform: String,
}

impl UnavailableTransport {
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
        }
    }
}

#[async_trait]
impl NativeTransport for UnavailableTransport {
    async fn get_config(&self) -> Result<ServerConfig> {
        Err(BlobWriterError::NotImplemented(self.platform.clone()))
    }

    fn is_available(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}
