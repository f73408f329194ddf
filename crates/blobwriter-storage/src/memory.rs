use anyhow::Context;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use blobwriter_core::{Directory, FileUri};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use crate::provider::{FileSystem, validate_logical_path};

type Key = (Directory, String);

/// Browser-style file API: a file is the concatenation of the Base64 text
/// appended to it, and is only decoded when read.
///
/// A padding character in the middle of that text makes the file
/// unreadable, which is why every non-final bridge chunk has to be a whole
/// number of 3-byte groups.
pub struct MemoryFileSystem {
    state: Mutex<MemoryState>,
    name: String,
}

#[derive(Default)]
struct MemoryState {
    files: HashMap<Key, String>,
    dirs: HashSet<Key>,
}

impl MemoryFileSystem {
    pub fn new(name: &str) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            name: name.to_string(),
        }
    }

    /// Creates `path` and all of its ancestors as directories.
    pub fn create_dir(&self, directory: Directory, path: &str) -> anyhow::Result<()> {
        let normalized = normalize(path)?;
        let mut state = self.lock()?;
        state.add_dir_with_ancestors(directory, &normalized);
        Ok(())
    }

    /// The raw stored text of a file, before decoding.
    pub fn raw_text(&self, directory: Directory, path: &str) -> anyhow::Result<Option<String>> {
        let key = (directory, normalize(path)?);
        Ok(self.lock()?.files.get(&key).cloned())
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| anyhow::anyhow!("memory file system lock poisoned"))
    }

    fn uri(directory: Directory, path: &str) -> FileUri {
        FileUri::new(format!("{directory}/{path}"))
    }
}

impl MemoryState {
    fn add_dir_with_ancestors(&mut self, directory: Directory, path: &str) {
        let mut current = String::new();
        for segment in path.split('/') {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(segment);
            self.dirs.insert((directory, current.clone()));
        }
    }

    fn parent_exists(&self, directory: Directory, path: &str) -> bool {
        match path.rsplit_once('/') {
            Some((parent, _)) => self.dirs.contains(&(directory, parent.to_string())),
            None => true,
        }
    }
}

fn normalize(path: &str) -> anyhow::Result<String> {
    let relative = validate_logical_path(path)?;
    let segments: Vec<String> = relative
        .iter()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| s != ".")
        .collect();
    Ok(segments.join("/"))
}

#[async_trait]
impl FileSystem for MemoryFileSystem {
    async fn create(
        &self,
        directory: Directory,
        path: &str,
        recursive: bool,
    ) -> anyhow::Result<FileUri> {
        let normalized = normalize(path)?;
        let mut state = self.lock()?;

        if !state.parent_exists(directory, &normalized) {
            match (recursive, normalized.rsplit_once('/')) {
                (true, Some((parent, _))) => state.add_dir_with_ancestors(directory, parent),
                _ => anyhow::bail!("parent directory does not exist: {directory}/{normalized}"),
            }
        }

        let uri = Self::uri(directory, &normalized);
        state.files.insert((directory, normalized), String::new());
        Ok(uri)
    }

    async fn append(&self, directory: Directory, path: &str, data: &str) -> anyhow::Result<()> {
        let normalized = normalize(path)?;
        let mut state = self.lock()?;

        if !state.parent_exists(directory, &normalized) {
            anyhow::bail!("parent directory does not exist: {directory}/{normalized}");
        }
        state
            .files
            .entry((directory, normalized))
            .or_default()
            .push_str(data);
        Ok(())
    }

    async fn get_uri(&self, directory: Directory, path: &str) -> anyhow::Result<FileUri> {
        Ok(Self::uri(directory, &normalize(path)?))
    }

    async fn read(&self, directory: Directory, path: &str) -> anyhow::Result<Vec<u8>> {
        let normalized = normalize(path)?;
        let state = self.lock()?;
        let text = state
            .files
            .get(&(directory, normalized.clone()))
            .with_context(|| format!("file not found: {directory}/{normalized}"))?;
        STANDARD
            .decode(text)
            .with_context(|| format!("corrupt file contents: {directory}/{normalized}"))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
