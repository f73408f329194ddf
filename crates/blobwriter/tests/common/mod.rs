#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use rand::RngCore;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

use blobwriter::{
    BlobWriter, BlobWriterConfig, BlobWriterError, Directory, FileSystem, FileUri,
    LocalFileSystem, NativeTransport, Result, ServerConfig, UnavailableTransport,
};
use blobwriter_core::config::ServerSettings;
use blobwriter_server::LocalServer;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn random_blob(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut data);
    data
}

/// Wraps a file system and counts the calls that reach it.
pub struct CountingFs {
    inner: Arc<dyn FileSystem>,
    pub creates: AtomicUsize,
    pub appends: AtomicUsize,
}

impl CountingFs {
    pub fn new(inner: Arc<dyn FileSystem>) -> Self {
        Self {
            inner,
            creates: AtomicUsize::new(0),
            appends: AtomicUsize::new(0),
        }
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn appends(&self) -> usize {
        self.appends.load(Ordering::SeqCst)
    }

    pub fn bridge_untouched(&self) -> bool {
        self.creates() == 0 && self.appends() == 0
    }
}

#[async_trait]
impl FileSystem for CountingFs {
    async fn create(
        &self,
        directory: Directory,
        path: &str,
        recursive: bool,
    ) -> anyhow::Result<FileUri> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create(directory, path, recursive).await
    }

    async fn append(&self, directory: Directory, path: &str, data: &str) -> anyhow::Result<()> {
        self.appends.fetch_add(1, Ordering::SeqCst);
        self.inner.append(directory, path, data).await
    }

    async fn get_uri(&self, directory: Directory, path: &str) -> anyhow::Result<FileUri> {
        self.inner.get_uri(directory, path).await
    }

    async fn read(&self, directory: Directory, path: &str) -> anyhow::Result<Vec<u8>> {
        self.inner.read(directory, path).await
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Hands out the address of a port nobody listens on.
pub struct DeadEndpoint {
    base_url: String,
}

impl DeadEndpoint {
    pub fn new() -> Self {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        Self {
            base_url: format!("http://127.0.0.1:{port}"),
        }
    }
}

#[async_trait]
impl NativeTransport for DeadEndpoint {
    async fn get_config(&self) -> Result<ServerConfig> {
        Ok(ServerConfig {
            base_url: self.base_url.clone(),
            auth_token: "unused".into(),
        })
    }

    fn name(&self) -> &str {
        "dead-endpoint"
    }
}

/// Accepts connections and never answers them.
pub struct SilentEndpoint {
    base_url: String,
    _task: tokio::task::JoinHandle<()>,
}

impl SilentEndpoint {
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let task = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });
        Self {
            base_url,
            _task: task,
        }
    }
}

impl Drop for SilentEndpoint {
    fn drop(&mut self) {
        self._task.abort();
    }
}

#[async_trait]
impl NativeTransport for SilentEndpoint {
    async fn get_config(&self) -> Result<ServerConfig> {
        Ok(ServerConfig {
            base_url: self.base_url.clone(),
            auth_token: "unused".into(),
        })
    }

    fn name(&self) -> &str {
        "silent-endpoint"
    }
}

/// A running server, but a token from a previous start.
pub struct StaleToken(pub Arc<LocalServer>);

#[async_trait]
impl NativeTransport for StaleToken {
    async fn get_config(&self) -> Result<ServerConfig> {
        let mut config = self.0.get_config().await?;
        config.auth_token = "0".repeat(config.auth_token.len());
        Ok(config)
    }

    fn name(&self) -> &str {
        "stale-token"
    }
}

/// Temp directory holding the on-disk files and the server staging area.
pub struct Harness {
    pub tmp: TempDir,
    pub fs: Arc<CountingFs>,
}

impl Harness {
    pub fn new() -> Self {
        init_tracing();
        let tmp = TempDir::new().unwrap();
        let local = LocalFileSystem::new(&tmp.path().join("files"), "local").unwrap();
        Self {
            fs: Arc::new(CountingFs::new(Arc::new(local))),
            tmp,
        }
    }

    pub fn server_settings(&self) -> ServerSettings {
        ServerSettings {
            temp_dir: Some(self.tmp.path().join("staging")),
            ..ServerSettings::default()
        }
    }

    pub async fn start_server(&self) -> Arc<LocalServer> {
        Arc::new(LocalServer::start(&self.server_settings()).await.unwrap())
    }

    pub fn writer(&self, transport: Arc<dyn NativeTransport>) -> BlobWriter {
        self.writer_with(&BlobWriterConfig::default(), transport)
    }

    pub fn writer_with(
        &self,
        config: &BlobWriterConfig,
        transport: Arc<dyn NativeTransport>,
    ) -> BlobWriter {
        BlobWriter::new(config, self.fs.clone(), transport).unwrap()
    }

    pub fn bridge_only(&self) -> BlobWriter {
        self.writer(Arc::new(UnavailableTransport::new("web")))
    }

    /// Bytes currently on disk at the file a URI points to.
    pub fn read_uri(&self, uri: &FileUri) -> Vec<u8> {
        std::fs::read(uri.to_path_buf().unwrap()).unwrap()
    }

    pub fn staging_is_empty(&self) -> bool {
        match std::fs::read_dir(self.tmp.path().join("staging")) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => true,
        }
    }
}

pub fn is_network_failure(err: &BlobWriterError) -> bool {
    matches!(err, BlobWriterError::Network(_))
}
