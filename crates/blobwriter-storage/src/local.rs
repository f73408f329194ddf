use anyhow::Context;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use blobwriter_core::{Directory, FileUri};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::provider::{FileSystem, validate_logical_path};

/// Disk-backed file API, as exposed by native platforms: appended Base64
/// text is decoded before it reaches the file.
pub struct LocalFileSystem {
    roots: HashMap<Directory, PathBuf>,
    name: String,
}

impl LocalFileSystem {
    /// Maps every [`Directory`] to `<base_path>/<directory name>`.
    pub fn new(base_path: &Path, name: &str) -> anyhow::Result<Self> {
        let base = std::path::absolute(base_path)?;
        std::fs::create_dir_all(&base)?;

        let mut roots = HashMap::new();
        for directory in Directory::ALL {
            let root = base.join(directory.dir_name());
            std::fs::create_dir_all(&root)?;
            roots.insert(directory, root);
        }

        Ok(Self {
            roots,
            name: name.to_string(),
        })
    }

    /// Points `directory` at a different root.
    pub fn with_root(mut self, directory: Directory, root: &Path) -> anyhow::Result<Self> {
        let root = std::path::absolute(root)?;
        std::fs::create_dir_all(&root)?;
        self.roots.insert(directory, root);
        Ok(self)
    }

    pub fn root(&self, directory: Directory) -> Option<&Path> {
        self.roots.get(&directory).map(PathBuf::as_path)
    }

    fn resolve(&self, directory: Directory, path: &str) -> anyhow::Result<PathBuf> {
        let relative = validate_logical_path(path)?;
        let root = self
            .roots
            .get(&directory)
            .with_context(|| format!("no root configured for {directory}"))?;
        Ok(root.join(relative))
    }
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn create(
        &self,
        directory: Directory,
        path: &str,
        recursive: bool,
    ) -> anyhow::Result<FileUri> {
        let full_path = self.resolve(directory, path)?;
        if let Some(parent) = full_path.parent() {
            if recursive {
                tokio::fs::create_dir_all(parent).await?;
            } else if !tokio::fs::try_exists(parent).await? {
                anyhow::bail!("parent directory does not exist: {}", parent.display());
            }
        }

        // File::create truncates whatever was there before.
        tokio::fs::File::create(&full_path)
            .await
            .with_context(|| format!("cannot create {}", full_path.display()))?;
        Ok(FileUri::from_path(&full_path))
    }

    async fn append(&self, directory: Directory, path: &str, data: &str) -> anyhow::Result<()> {
        let full_path = self.resolve(directory, path)?;
        let bytes = STANDARD
            .decode(data)
            .context("append data is not valid Base64")?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&full_path)
            .await
            .with_context(|| format!("cannot open {}", full_path.display()))?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        Ok(())
    }

    async fn get_uri(&self, directory: Directory, path: &str) -> anyhow::Result<FileUri> {
        let full_path = self.resolve(directory, path)?;
        Ok(FileUri::from_path(&full_path))
    }

    async fn read(&self, directory: Directory, path: &str) -> anyhow::Result<Vec<u8>> {
        let full_path = self.resolve(directory, path)?;
        Ok(tokio::fs::read(&full_path).await?)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
