use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::header::{AUTHORIZATION, CONTENT_LENGTH};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use percent_encoding::percent_decode_str;
use tokio::io::AsyncWriteExt;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

use blobwriter_core::types::local_path_from_absolute;
use blobwriter_transport::RECURSIVE_QUERY;

use crate::cors::CorsEcho;
use crate::error::ServerError;
use crate::state::AppState;
use crate::token::tokens_match;

/// Every path is a potential upload target, so everything goes through one
/// handler that dispatches on the method.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .fallback(dispatch)
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn dispatch(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let cors = CorsEcho::from_headers(request.headers());
    debug!(method = %request.method(), uri = %request.uri(), "local transport request");

    let method = request.method().clone();
    let result = match method {
        Method::PUT => upload(&state, request).await.map(|()| StatusCode::NO_CONTENT),
        Method::OPTIONS => Ok(StatusCode::OK),
        _ => Err(ServerError::MethodNotAllowed),
    };

    match result {
        Ok(status) => cors.respond(status),
        Err(err) => cors.apply(err.into_response()),
    }
}

/// PUT handler: authenticate, stage the body in a temp file, then move it
/// over the destination.
async fn upload(state: &AppState, request: Request) -> Result<(), ServerError> {
    authorize(state, request.headers())?;

    let expected_len = content_length(request.headers())?;
    let recursive = wants_recursive(request.uri().query());
    let dest = destination_path(request.uri().path())?;

    let temp_path = state
        .temp_dir
        .join(format!("{}.upload", uuid::Uuid::now_v7()));

    let received = match receive_body(request.into_body(), &temp_path).await {
        Ok(n) => n,
        Err(e) => {
            remove_quietly(&temp_path).await;
            warn!(dest = %dest.display(), error = %e, "upload aborted");
            return Err(e);
        }
    };

    if let Some(expected) = expected_len
        && received != expected
    {
        remove_quietly(&temp_path).await;
        return Err(ServerError::BadRequest(format!(
            "expected {expected} bytes, received {received}"
        )));
    }

    if let Err(e) = move_into_place(&temp_path, &dest, recursive).await {
        remove_quietly(&temp_path).await;
        error!(dest = %dest.display(), error = %e, "failed to write file");
        return Err(e);
    }

    debug!(dest = %dest.display(), bytes = received, recursive, "file placed");
    Ok(())
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ServerError> {
    let received = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(ServerError::Unauthorized)?;

    if !tokens_match(received, &state.auth_token) {
        warn!("local transport: invalid token");
        return Err(ServerError::Unauthorized);
    }
    Ok(())
}

fn content_length(headers: &HeaderMap) -> Result<Option<u64>, ServerError> {
    let Some(value) = headers.get(CONTENT_LENGTH) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Some)
        .ok_or_else(|| ServerError::BadRequest("bad content-length".into()))
}

fn wants_recursive(query: Option<&str>) -> bool {
    query.is_some_and(|q| q.split('&').any(|pair| pair == RECURSIVE_QUERY))
}

/// Decodes the request path into an absolute local path.
fn destination_path(uri_path: &str) -> Result<PathBuf, ServerError> {
    let decoded = percent_decode_str(uri_path)
        .decode_utf8()
        .map_err(|e| ServerError::BadRequest(format!("path is not UTF-8: {e}")))?;
    let path = local_path_from_absolute(&decoded);

    if !path.is_absolute() {
        return Err(ServerError::BadRequest(format!(
            "destination must be absolute: {decoded}"
        )));
    }
    if path
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(ServerError::BadRequest(format!(
            "parent traversal not allowed: {decoded}"
        )));
    }
    if path.file_name().is_none() {
        return Err(ServerError::BadRequest(format!(
            "destination has no file name: {decoded}"
        )));
    }
    Ok(path)
}

async fn receive_body(body: Body, temp_path: &Path) -> Result<u64, ServerError> {
    let mut file = tokio::fs::File::create(temp_path).await?;
    let mut stream = body.into_data_stream();
    let mut total: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk =
            chunk.map_err(|e| ServerError::BadRequest(format!("body stream failed: {e}")))?;
        file.write_all(&chunk).await?;
        total += chunk.len() as u64;
    }

    file.flush().await?;
    Ok(total)
}

async fn move_into_place(
    temp_path: &Path,
    dest: &Path,
    recursive: bool,
) -> Result<(), ServerError> {
    if recursive && let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    match tokio::fs::remove_file(dest).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    if tokio::fs::rename(temp_path, dest).await.is_err() {
        // Temp dir and destination may sit on different mounts.
        tokio::fs::copy(temp_path, dest).await?;
        remove_quietly(temp_path).await;
    }
    Ok(())
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!(path = %path.display(), error = %e, "could not remove temp file");
    }
}
