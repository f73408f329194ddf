use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::BlobWriterError;

/// Immutable in-memory byte sequence handed to a transfer.
///
/// Cloning and slicing share the underlying buffer.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct BlobHandle(Bytes);

impl BlobHandle {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self(data.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sub-range of the blob. Panics if the range is out of bounds, like slice indexing.
    pub fn slice(&self, range: Range<usize>) -> BlobHandle {
        BlobHandle(self.0.slice(range))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The underlying buffer (reference-counted, no copy).
    pub fn to_bytes(&self) -> Bytes {
        self.0.clone()
    }
}

impl fmt::Debug for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobHandle")
            .field("len", &self.0.len())
            .finish()
    }
}

impl From<Vec<u8>> for BlobHandle {
    fn from(data: Vec<u8>) -> Self {
        Self(Bytes::from(data))
    }
}

impl From<&'static [u8]> for BlobHandle {
    fn from(data: &'static [u8]) -> Self {
        Self(Bytes::from_static(data))
    }
}

impl From<Bytes> for BlobHandle {
    fn from(data: Bytes) -> Self {
        Self(data)
    }
}

/// Logical storage root a path is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Directory {
    Documents,
    Data,
    Library,
    Cache,
    External,
    ExternalStorage,
}

impl Directory {
    pub const ALL: [Directory; 6] = [
        Directory::Documents,
        Directory::Data,
        Directory::Library,
        Directory::Cache,
        Directory::External,
        Directory::ExternalStorage,
    ];

    /// Lowercase name, used for on-disk root folders.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Directory::Documents => "documents",
            Directory::Data => "data",
            Directory::Library => "library",
            Directory::Cache => "cache",
            Directory::External => "external",
            Directory::ExternalStorage => "external_storage",
        }
    }
}

impl fmt::Display for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directory::Documents => write!(f, "DOCUMENTS"),
            Directory::Data => write!(f, "DATA"),
            Directory::Library => write!(f, "LIBRARY"),
            Directory::Cache => write!(f, "CACHE"),
            Directory::External => write!(f, "EXTERNAL"),
            Directory::ExternalStorage => write!(f, "EXTERNAL_STORAGE"),
        }
    }
}

impl std::str::FromStr for Directory {
    type Err = BlobWriterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DOCUMENTS" => Ok(Directory::Documents),
            "DATA" => Ok(Directory::Data),
            "LIBRARY" => Ok(Directory::Library),
            "CACHE" => Ok(Directory::Cache),
            "EXTERNAL" => Ok(Directory::External),
            "EXTERNAL_STORAGE" | "EXTERNALSTORAGE" => Ok(Directory::ExternalStorage),
            _ => Err(BlobWriterError::Config(format!("unknown directory: {s}"))),
        }
    }
}

/// URI of a written (or to-be-written) file, as reported by the file API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileUri(String);

const FILE_SCHEME: &str = "file://";

impl FileUri {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// `file://` URI for an absolute local path.
    pub fn from_path(path: &Path) -> Self {
        let display = path.display().to_string();
        if cfg!(windows) {
            Self(format!("{FILE_SCHEME}/{}", display.replace('\\', "/")))
        } else {
            Self(format!("{FILE_SCHEME}{display}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for URIs that point at the local file system.
    pub fn is_file(&self) -> bool {
        self.0.starts_with(FILE_SCHEME)
    }

    /// The URI with its `file://` scheme removed; this is the path the local
    /// transport endpoint is addressed with.
    pub fn absolute_path(&self) -> &str {
        self.0.strip_prefix(FILE_SCHEME).unwrap_or(&self.0)
    }

    /// Local path for a `file://` URI.
    pub fn to_path_buf(&self) -> Option<PathBuf> {
        if !self.is_file() {
            return None;
        }
        Some(local_path_from_absolute(self.absolute_path()))
    }
}

impl fmt::Display for FileUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Converts the path part of a `file://` URI back into a local path.
pub fn local_path_from_absolute(absolute: &str) -> PathBuf {
    if cfg!(windows) {
        // "/C:/dir/file" -> "C:/dir/file"
        let trimmed = absolute.strip_prefix('/').unwrap_or(absolute);
        PathBuf::from(trimmed)
    } else {
        PathBuf::from(absolute)
    }
}

/// Address and credentials of the local transport endpoint.
///
/// Short-lived: fetched on every transfer because the server may have
/// restarted with a new port and token.
#[derive(Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub base_url: String,
    pub auth_token: String,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("base_url", &self.base_url)
            .field("auth_token", &"[REDACTED]")
            .finish()
    }
}

pub type FallbackPredicate = Arc<dyn Fn(&BlobWriterError) -> bool + Send + Sync>;

/// Diagnostic hook invoked with the fast-channel error right before the
/// bridge writer takes over.
pub type FallbackObserver = Arc<dyn Fn(&BlobWriterError) + Send + Sync>;

/// Whether a failed fast-channel write may be retried through the bridge.
#[derive(Clone, Default)]
pub enum FallbackPolicy {
    Never,
    #[default]
    Always,
    Decide(FallbackPredicate),
}

impl FallbackPolicy {
    pub fn decide<F>(predicate: F) -> Self
    where
        F: Fn(&BlobWriterError) -> bool + Send + Sync + 'static,
    {
        FallbackPolicy::Decide(Arc::new(predicate))
    }

    pub fn allows(&self, error: &BlobWriterError) -> bool {
        match self {
            FallbackPolicy::Never => false,
            FallbackPolicy::Always => true,
            FallbackPolicy::Decide(predicate) => predicate(error),
        }
    }
}

impl From<bool> for FallbackPolicy {
    fn from(fallback: bool) -> Self {
        if fallback {
            FallbackPolicy::Always
        } else {
            FallbackPolicy::Never
        }
    }
}

impl fmt::Debug for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackPolicy::Never => write!(f, "Never"),
            FallbackPolicy::Always => write!(f, "Always"),
            FallbackPolicy::Decide(_) => write!(f, "Decide(<fn>)"),
        }
    }
}

/// One call to `write`: what to write and where.
#[derive(Clone)]
pub struct WriteRequest {
    /// Path relative to `directory`.
    pub path: String,
    pub directory: Directory,
    pub blob: BlobHandle,
    /// Create missing parent directories.
    pub recursive: bool,
    pub fallback: FallbackPolicy,
    pub on_fallback: Option<FallbackObserver>,
}

impl WriteRequest {
    pub fn new(path: impl Into<String>, directory: Directory, blob: impl Into<BlobHandle>) -> Self {
        Self {
            path: path.into(),
            directory,
            blob: blob.into(),
            recursive: false,
            fallback: FallbackPolicy::default(),
            on_fallback: None,
        }
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn fallback(mut self, policy: impl Into<FallbackPolicy>) -> Self {
        self.fallback = policy.into();
        self
    }

    pub fn on_fallback<F>(mut self, observer: F) -> Self
    where
        F: Fn(&BlobWriterError) + Send + Sync + 'static,
    {
        self.on_fallback = Some(Arc::new(observer));
        self
    }
}

impl fmt::Debug for WriteRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteRequest")
            .field("path", &self.path)
            .field("directory", &self.directory)
            .field("blob", &self.blob)
            .field("recursive", &self.recursive)
            .field("fallback", &self.fallback)
            .field("on_fallback", &self.on_fallback.is_some())
            .finish()
    }
}
