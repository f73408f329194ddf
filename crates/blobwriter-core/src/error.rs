use thiserror::Error;

/// Which delivery channel produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Fast,
    Bridge,
}

#[derive(Debug, Error)]
pub enum BlobWriterError {
    // IO
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Config
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration file not found at {0}")]
    ConfigNotFound(String),

    #[error("TOML deserialization error: {0}")]
    TomlDe(String),

    #[error("TOML serialization error: {0}")]
    TomlSer(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    // Fast channel
    #[error("Local transport server unavailable: {0}")]
    ServerUnavailable(String),

    #[error("Native transport not implemented on {0}")]
    NotImplemented(String),

    #[error("Local transport rejected the auth token")]
    AuthFailure,

    #[error("Unexpected HTTP status: {0}")]
    UnexpectedStatus(u16),

    #[error("Network failure: {0}")]
    Network(String),

    #[error("Failed to resolve file URI: {0}")]
    Resolve(String),

    // Bridge
    #[error("Failed to create {path}: {reason}")]
    Create { path: String, reason: String },

    #[error("Failed to append to {path} at byte {offset}: {reason}")]
    Append {
        path: String,
        offset: u64,
        reason: String,
    },
}

impl BlobWriterError {
    /// The channel an error belongs to, if it came from a transfer at all.
    pub fn channel(&self) -> Option<Channel> {
        match self {
            BlobWriterError::ServerUnavailable(_)
            | BlobWriterError::NotImplemented(_)
            | BlobWriterError::AuthFailure
            | BlobWriterError::UnexpectedStatus(_)
            | BlobWriterError::Network(_)
            | BlobWriterError::Resolve(_) => Some(Channel::Fast),
            BlobWriterError::Create { .. } | BlobWriterError::Append { .. } => {
                Some(Channel::Bridge)
            }
            _ => None,
        }
    }

    /// True when the fast channel cannot run at all on this host, as opposed
    /// to having been tried and failed.
    pub fn is_fast_channel_unavailable(&self) -> bool {
        matches!(
            self,
            BlobWriterError::ServerUnavailable(_) | BlobWriterError::NotImplemented(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BlobWriterError>;
