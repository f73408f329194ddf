use async_trait::async_trait;
use blobwriter_core::error::{BlobWriterError, Result};
use blobwriter_core::{Directory, FileUri};
use std::path::{Component, Path, PathBuf};

/// The restrictive, text-oriented file API the bridge writer targets.
///
/// There is no binary write: data only enters a file through `append`,
/// as Base64 text.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Create `path` (or truncate it) as an empty file. With `recursive`,
    /// missing parent directories are created; otherwise a missing parent
    /// is an error.
    async fn create(&self, directory: Directory, path: &str, recursive: bool)
    -> anyhow::Result<FileUri>;

    /// Append Base64-encoded `data` to the file.
    async fn append(&self, directory: Directory, path: &str, data: &str) -> anyhow::Result<()>;

    /// The URI `path` resolves to, without touching the file.
    async fn get_uri(&self, directory: Directory, path: &str) -> anyhow::Result<FileUri>;

    /// Read back the file's bytes.
    async fn read(&self, directory: Directory, path: &str) -> anyhow::Result<Vec<u8>>;

    /// Backend name for display.
    fn name(&self) -> &str;
}

/// Validates a directory-relative path and returns it as a relative `PathBuf`.
///
/// A leading `/` is tolerated; `..`, drive prefixes and paths that name no
/// file (empty, `/`, `.`) fail with [`BlobWriterError::InvalidPath`].
pub fn validate_logical_path(path: &str) -> Result<PathBuf> {
    let trimmed = path.trim_start_matches('/');
    let relative = Path::new(trimmed);

    let mut named = false;
    for component in relative.components() {
        match component {
            Component::Normal(_) => named = true,
            Component::CurDir => {}
            _ => {
                return Err(BlobWriterError::InvalidPath(format!(
                    "path escapes its directory: {path}"
                )));
            }
        }
    }
    if !named {
        return Err(BlobWriterError::InvalidPath(format!(
            "path names no file: {path:?}"
        )));
    }

    Ok(relative.to_path_buf())
}
