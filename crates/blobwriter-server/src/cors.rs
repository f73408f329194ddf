//! Permissive CORS for browser-hosted callers: whatever origin and headers
//! the request asks for are echoed back.

use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_REQUEST_HEADERS, CONTENT_LENGTH, ORIGIN,
};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

pub const ALLOWED_METHODS: &str = "GET, POST, PUT, HEAD, OPTIONS";

/// CORS-relevant request headers, captured before the request body is consumed.
#[derive(Debug, Clone, Default)]
pub struct CorsEcho {
    origin: Option<HeaderValue>,
    request_headers: Option<HeaderValue>,
}

impl CorsEcho {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            origin: headers.get(ORIGIN).cloned(),
            request_headers: headers.get(ACCESS_CONTROL_REQUEST_HEADERS).cloned(),
        }
    }

    /// An empty response with the given status and the echoed CORS headers.
    pub fn respond(&self, status: StatusCode) -> Response {
        self.apply(status.into_response())
    }

    pub fn apply(&self, mut response: Response) -> Response {
        let carries_length = response_may_carry_length(response.status());
        let headers = response.headers_mut();
        if carries_length {
            headers.insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
        }

        if let Some(origin) = &self.origin {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
            headers.insert(
                ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static(ALLOWED_METHODS),
            );
            if let Some(requested) = &self.request_headers {
                headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, requested.clone());
            }
        }
        response
    }
}

fn response_may_carry_length(status: StatusCode) -> bool {
    status != StatusCode::NO_CONTENT && !status.is_informational()
}
