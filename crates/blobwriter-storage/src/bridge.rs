//! Chunked bridge writer: delivers a blob through create + append-only
//! Base64 text, one bounded chunk at a time.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::sync::Arc;
use tracing::{debug, info};

use blobwriter_core::error::{BlobWriterError, Result};
use blobwriter_core::{BlobHandle, ChunkBudget, Directory, FileUri, FixedSizeChunker};

use crate::provider::FileSystem;

pub struct BridgeWriter {
    fs: Arc<dyn FileSystem>,
    budget: ChunkBudget,
}

impl BridgeWriter {
    pub fn new(fs: Arc<dyn FileSystem>, budget: ChunkBudget) -> Self {
        Self { fs, budget }
    }

    pub fn budget(&self) -> ChunkBudget {
        self.budget
    }

    /// Creates `path` as an empty file, discarding any previous content.
    pub async fn create_and_truncate(
        &self,
        directory: Directory,
        path: &str,
        recursive: bool,
    ) -> Result<FileUri> {
        self.fs
            .create(directory, path, recursive)
            .await
            .map_err(|e| BlobWriterError::Create {
                path: format!("{directory}/{path}"),
                reason: format!("{e:#}"),
            })
    }

    /// Appends the whole blob, chunk by chunk. The first failing append
    /// aborts the write; nothing is retried and the partial file is left
    /// in place.
    pub async fn append_all(&self, directory: Directory, path: &str, blob: &BlobHandle) -> Result<()> {
        let total = self.budget.chunk_count(blob.len());
        for (index, chunk) in FixedSizeChunker::new(blob, self.budget).enumerate() {
            let encoded = STANDARD.encode(chunk.data.as_bytes());
            self.fs
                .append(directory, path, &encoded)
                .await
                .map_err(|e| BlobWriterError::Append {
                    path: format!("{directory}/{path}"),
                    offset: chunk.offset,
                    reason: format!("{e:#}"),
                })?;

            debug!(
                path,
                chunk = index + 1,
                of = total,
                offset = chunk.offset,
                size = chunk.len(),
                "bridge chunk appended"
            );
        }
        Ok(())
    }

    /// Create + truncate, then append everything.
    pub async fn write(
        &self,
        directory: Directory,
        path: &str,
        blob: &BlobHandle,
        recursive: bool,
    ) -> Result<FileUri> {
        let uri = self.create_and_truncate(directory, path, recursive).await?;
        self.append_all(directory, path, blob).await?;
        info!(
            %directory,
            path,
            bytes = blob.len(),
            backend = self.fs.name(),
            "bridge write complete"
        );
        Ok(uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalFileSystem;
    use crate::memory::MemoryFileSystem;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn pattern(len: usize) -> BlobHandle {
        BlobHandle::from((0..len).map(|i| (i * 31 % 251) as u8).collect::<Vec<u8>>())
    }

    #[tokio::test]
    async fn chunk_boundaries_roundtrip_through_text_store() {
        let budget = ChunkBudget::new(12).unwrap();
        let fs = Arc::new(MemoryFileSystem::new("test-memory"));
        let writer = BridgeWriter::new(fs.clone(), budget);

        for len in [0, 1, 11, 12, 13, 5 * 12 + 7] {
            let blob = pattern(len);
            writer
                .write(Directory::Data, "a.bin", &blob, false)
                .await
                .unwrap();
            let back = fs.read(Directory::Data, "a.bin").await.unwrap();
            assert_eq!(back, blob.as_bytes(), "size {len}");
        }
    }

    #[tokio::test]
    async fn chunk_boundaries_roundtrip_on_disk() {
        let tmp = TempDir::new().unwrap();
        let budget = ChunkBudget::new(9).unwrap();
        let fs = Arc::new(LocalFileSystem::new(tmp.path(), "test-local").unwrap());
        let writer = BridgeWriter::new(fs.clone(), budget);

        for len in [0, 1, 8, 9, 10, 5 * 9 + 7] {
            let blob = pattern(len);
            let uri = writer
                .write(Directory::Data, "a.bin", &blob, false)
                .await
                .unwrap();
            let back = std::fs::read(uri.to_path_buf().unwrap()).unwrap();
            assert_eq!(back, blob.as_bytes(), "size {len}");
        }
    }

    #[tokio::test]
    async fn empty_blob_appends_nothing() {
        let fs = Arc::new(CountingFs::failing_after(usize::MAX));
        let writer = BridgeWriter::new(fs.clone(), ChunkBudget::default());

        writer
            .append_all(Directory::Data, "a.bin", &BlobHandle::default())
            .await
            .unwrap();
        assert_eq!(fs.appends.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn append_failure_is_not_retried() {
        let fs = Arc::new(CountingFs::failing_after(2));
        let writer = BridgeWriter::new(fs.clone(), ChunkBudget::new(3).unwrap());

        let err = writer
            .write(Directory::Data, "a.bin", &pattern(30), false)
            .await
            .unwrap_err();

        match err {
            BlobWriterError::Append { offset, .. } => assert_eq!(offset, 6),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fs.appends.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn create_failure_maps_to_create_error() {
        let fs = Arc::new(MemoryFileSystem::new("test-memory"));
        let writer = BridgeWriter::new(fs, ChunkBudget::default());

        let err = writer
            .write(Directory::Data, "missing/a.bin", &pattern(4), false)
            .await
            .unwrap_err();
        assert!(matches!(err, BlobWriterError::Create { .. }));
    }

    /// Accepts creates; fails every append after the first `ok_appends`.
    struct CountingFs {
        ok_appends: usize,
        appends: AtomicUsize,
    }

    impl CountingFs {
        fn failing_after(ok_appends: usize) -> Self {
            Self {
                ok_appends,
                appends: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl FileSystem for CountingFs {
        async fn create(&self, directory: Directory, path: &str, _: bool) -> anyhow::Result<FileUri> {
            Ok(FileUri::new(format!("{directory}/{path}")))
        }

        async fn append(&self, _: Directory, _: &str, _: &str) -> anyhow::Result<()> {
            let n = self.appends.fetch_add(1, Ordering::SeqCst);
            if n >= self.ok_appends {
                anyhow::bail!("storage full");
            }
            Ok(())
        }

        async fn get_uri(&self, directory: Directory, path: &str) -> anyhow::Result<FileUri> {
            Ok(FileUri::new(format!("{directory}/{path}")))
        }

        async fn read(&self, _: Directory, _: &str) -> anyhow::Result<Vec<u8>> {
            anyhow::bail!("not readable")
        }

        fn name(&self) -> &str {
            "counting"
        }
    }
}
