//! HTTP client side of the fast channel.
//!
//! Uses `reqwest` to stream the blob as the body of a single PUT.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use std::error::Error as _;
use tracing::debug;

use blobwriter_core::error::{BlobWriterError, Result};
use blobwriter_core::{BlobHandle, ServerConfig};

use crate::RECURSIVE_QUERY;

/// Characters escaped in the path part of the upload URL. `/` stays as is;
/// `\` must not, since URL parsers treat it as a separator too.
const PATH_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Builds `base_url + absolute_path[?recursive=true]`.
pub fn transfer_url(config: &ServerConfig, absolute_path: &str, recursive: bool) -> String {
    let base = config.base_url.trim_end_matches('/');
    let mut url = format!("{base}{}", utf8_percent_encode(absolute_path, PATH_ESCAPE));
    if recursive {
        url.push('?');
        url.push_str(RECURSIVE_QUERY);
    }
    url
}

/// Only 204 means the file was placed.
pub fn check_status(status: StatusCode) -> Result<()> {
    match status {
        StatusCode::NO_CONTENT => Ok(()),
        StatusCode::UNAUTHORIZED => Err(BlobWriterError::AuthFailure),
        other => Err(BlobWriterError::UnexpectedStatus(other.as_u16())),
    }
}

/// Fast-channel uploader. Holds a connection pool; cheap to clone.
#[derive(Debug, Clone)]
pub struct FastChannelClient {
    http: reqwest::Client,
}

impl FastChannelClient {
    pub fn new() -> Result<Self> {
        // Loopback traffic must never be routed through a system proxy.
        let http = reqwest::Client::builder()
            .no_proxy()
            .build()
            .map_err(|e| BlobWriterError::Network(describe(&e)))?;
        Ok(Self { http })
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Uploads the full blob in one request. No retries: any failure is
    /// returned to the caller as is.
    pub async fn transfer(
        &self,
        config: &ServerConfig,
        absolute_path: &str,
        blob: &BlobHandle,
        recursive: bool,
    ) -> Result<()> {
        let url = transfer_url(config, absolute_path, recursive);
        debug!(
            base_url = %config.base_url,
            absolute_path,
            bytes = blob.len(),
            recursive,
            "fast channel PUT"
        );

        let response = self
            .http
            .put(&url)
            .header(AUTHORIZATION, config.auth_token.as_str())
            .body(blob.to_bytes())
            .send()
            .await
            .map_err(|e| BlobWriterError::Network(describe(&e)))?;

        check_status(response.status())
    }
}

/// Flattens a reqwest error and its causes into one line.
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
