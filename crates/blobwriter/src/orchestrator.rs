//! Transfer orchestration: fast channel first, bridge writer on authorized
//! fallback.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use blobwriter_core::error::{BlobWriterError, Result};
use blobwriter_core::{
    BlobHandle, BlobWriterConfig, Directory, FileUri, ServerConfig, WriteRequest,
};
use blobwriter_storage::{BridgeWriter, FileSystem, validate_logical_path};
use blobwriter_transport::{FastChannelClient, NativeTransport};

/// Where a write currently is. Only used for tracing.
#[derive(Debug, Clone, Copy)]
enum Phase {
    AttemptingFast,
    FallingBack,
    AttemptingBridge,
    Success,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::AttemptingFast => "attempting_fast",
            Phase::FallingBack => "falling_back",
            Phase::AttemptingBridge => "attempting_bridge",
            Phase::Success => "success",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Entry point for writing blobs to files.
///
/// Tries the fast channel (one raw-bytes PUT to the native transport) and,
/// when that fails and the request's [`FallbackPolicy`] allows it, rewrites
/// the file from scratch through the chunked bridge writer. Exactly one
/// channel produces a successful result.
///
/// [`FallbackPolicy`]: blobwriter_core::FallbackPolicy
pub struct BlobWriter {
    fs: Arc<dyn FileSystem>,
    transport: Arc<dyn NativeTransport>,
    client: FastChannelClient,
    bridge: BridgeWriter,
    fast_timeout: Option<Duration>,
}

impl BlobWriter {
    pub fn new(
        config: &BlobWriterConfig,
        fs: Arc<dyn FileSystem>,
        transport: Arc<dyn NativeTransport>,
    ) -> Result<Self> {
        config.validate()?;
        let budget = config.bridge.chunk_budget()?;

        Ok(Self {
            bridge: BridgeWriter::new(fs.clone(), budget),
            client: FastChannelClient::new()?,
            fast_timeout: config.fast_channel.timeout(),
            fs,
            transport,
        })
    }

    /// Replace the HTTP client used for the fast channel.
    pub fn with_client(mut self, client: FastChannelClient) -> Self {
        self.client = client;
        self
    }

    pub fn transport(&self) -> &dyn NativeTransport {
        self.transport.as_ref()
    }

    pub fn file_system(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    /// Write `request.blob` to `request.path` under `request.directory` and
    /// return the URI of the written file.
    ///
    /// Paths that escape their directory or name no file fail with
    /// `InvalidPath` before either channel runs.
    pub async fn write(&self, request: WriteRequest) -> Result<FileUri> {
        let WriteRequest {
            path,
            directory,
            blob,
            recursive,
            fallback,
            on_fallback,
        } = &request;

        // A bad path is the caller's mistake, not a channel failure.
        validate_logical_path(path)?;

        if !self.transport.is_available() {
            info!(
                %directory,
                path,
                transport = self.transport.name(),
                "fast channel unavailable, using bridge writer"
            );
            return self.bridge_phase(*directory, path, blob, *recursive).await;
        }

        debug!(phase = %Phase::AttemptingFast, %directory, path, bytes = blob.len());
        let err = match self.fast_phase(&request).await {
            Ok(uri) => {
                info!(
                    phase = %Phase::Success,
                    %uri,
                    bytes = blob.len(),
                    "fast channel write complete"
                );
                return Ok(uri);
            }
            Err(err) => err,
        };

        if !fallback.allows(&err) {
            warn!(
                phase = %Phase::Failed,
                %directory,
                path,
                "fast channel failed, fallback denied: {err}"
            );
            return Err(err);
        }

        if matches!(err, BlobWriterError::NotImplemented(_)) {
            debug!(phase = %Phase::FallingBack, "fast channel not implemented: {err}");
        } else {
            warn!(
                phase = %Phase::FallingBack,
                %directory,
                path,
                "fast channel failed, falling back: {err}"
            );
        }
        if let Some(observer) = on_fallback {
            observer(&err);
        }

        self.bridge_phase(*directory, path, blob, *recursive).await
    }

    async fn fast_phase(&self, request: &WriteRequest) -> Result<FileUri> {
        let attempt = self.fast_channel(request);
        match self.fast_timeout {
            Some(limit) => tokio::time::timeout(limit, attempt).await.map_err(|_| {
                BlobWriterError::Network(format!("timed out after {}s", limit.as_secs_f64()))
            })?,
            None => attempt.await,
        }
    }

    async fn fast_channel(&self, request: &WriteRequest) -> Result<FileUri> {
        let (config, uri) = tokio::join!(
            self.get_server_config(),
            self.resolve_target_uri(request.directory, &request.path)
        );
        let config = config?;
        let uri = uri?;

        self.client
            .transfer(&config, uri.absolute_path(), &request.blob, request.recursive)
            .await?;
        Ok(uri)
    }

    /// Current endpoint address and token from the native transport.
    pub async fn get_server_config(&self) -> Result<ServerConfig> {
        self.transport.get_config().await
    }

    /// The URI the file API reports for the target, without touching the
    /// file. The fast channel can only address local files.
    pub async fn resolve_target_uri(&self, directory: Directory, path: &str) -> Result<FileUri> {
        let uri = self
            .fs
            .get_uri(directory, path)
            .await
            .map_err(|e| BlobWriterError::Resolve(format!("{e:#}")))?;

        if !uri.is_file() {
            return Err(BlobWriterError::Resolve(format!(
                "not a local file URI: {uri}"
            )));
        }
        Ok(uri)
    }

    async fn bridge_phase(
        &self,
        directory: Directory,
        path: &str,
        blob: &BlobHandle,
        recursive: bool,
    ) -> Result<FileUri> {
        debug!(
            phase = %Phase::AttemptingBridge,
            %directory,
            path,
            chunk_size = self.bridge.budget().get()
        );
        match self.bridge.write(directory, path, blob, recursive).await {
            Ok(uri) => {
                debug!(phase = %Phase::Success, %uri);
                Ok(uri)
            }
            Err(err) => {
                warn!(phase = %Phase::Failed, %directory, path, "bridge writer failed: {err}");
                Err(err)
            }
        }
    }
}
