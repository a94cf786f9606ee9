//! Response types and the single-read / shared body model.
//!
//! A real response body can be drained exactly once. [Body::once] keeps
//! that semantic for the common single-waiter case. When a settled
//! response has to fan out to several waiters, the core replaces the
//! body with a [Body::shared] capture: `text` and `json` then resolve
//! repeatably from the captured text, while binary access operations
//! fail with [DedupeError::UnsupportedBodyAccess].

use crate::*;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, StatusCode};
use std::sync::{Arc, Mutex};

/// The body access operations a response supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyAccess {
    /// [FetchResponse::text].
    Text,
    /// [FetchResponse::json].
    Json,
    /// [FetchResponse::bytes].
    Bytes,
    /// [FetchResponse::blob].
    Blob,
    /// [FetchResponse::form_data].
    FormData,
}

impl std::fmt::Display for BodyAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            BodyAccess::Text => "text",
            BodyAccess::Json => "json",
            BodyAccess::Bytes => "bytes",
            BodyAccess::Blob => "blob",
            BodyAccess::FormData => "form data",
        })
    }
}

/// A binary body payload together with its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    /// The raw bytes.
    pub bytes: Bytes,
    /// Taken from the response `Content-Type` header, if present.
    pub content_type: Option<String>,
}

#[derive(Debug, Clone)]
enum BodyKind {
    /// Single-read payload. Any access operation consumes it.
    Once(Arc<Mutex<Option<Bytes>>>),
    /// Captured text, replayable any number of times.
    Shared(Arc<str>),
}

/// A response body.
///
/// Clones share state: cloning a single-read body does not grant a
/// second read, and cloning a shared body hands out the same capture.
#[derive(Debug, Clone)]
pub struct Body(BodyKind);

impl Body {
    /// A single-read body over a byte payload.
    pub fn once<B: Into<Bytes>>(bytes: B) -> Self {
        Self(BodyKind::Once(Arc::new(Mutex::new(Some(bytes.into())))))
    }

    /// A replayable body over captured text.
    pub fn shared<T: Into<Arc<str>>>(text: T) -> Self {
        Self(BodyKind::Shared(text.into()))
    }

    /// Returns true if this body is a shared capture.
    pub fn is_shared(&self) -> bool {
        matches!(self.0, BodyKind::Shared(_))
    }

    /// Returns true if a single-read payload has already been consumed.
    /// Shared bodies are never consumed.
    pub fn is_consumed(&self) -> bool {
        match &self.0 {
            BodyKind::Once(payload) => payload.lock().unwrap().is_none(),
            BodyKind::Shared(_) => false,
        }
    }

    fn take(&self, access: BodyAccess) -> DedupeResult<Bytes> {
        match &self.0 {
            BodyKind::Once(payload) => payload
                .lock()
                .unwrap()
                .take()
                .ok_or(DedupeError::BodyConsumed),
            BodyKind::Shared(_) => {
                Err(DedupeError::UnsupportedBodyAccess { access })
            }
        }
    }
}

/// A response descriptor as returned from the next stage, and as handed
/// back to every deduplicated caller.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Body,
}

impl FetchResponse {
    /// Construct a new response.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Body) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Construct a `200 OK` response with a single-read payload.
    pub fn ok<B: Into<Bytes>>(body: B) -> Self {
        Self::new(StatusCode::OK, HeaderMap::new(), Body::once(body))
    }

    /// The response status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The response body.
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Decompose into status, headers and body.
    pub fn into_parts(self) -> (StatusCode, HeaderMap, Body) {
        (self.status, self.headers, self.body)
    }

    /// Read the body as text. On a single-read body this consumes the
    /// payload, decoding lossily as utf8. On a shared body this replays
    /// the capture.
    pub async fn text(&self) -> DedupeResult<String> {
        match &self.body.0 {
            BodyKind::Shared(text) => Ok(text.to_string()),
            BodyKind::Once(_) => {
                let bytes = self.body.take(BodyAccess::Text)?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
        }
    }

    /// Read the body as json.
    pub async fn json(&self) -> DedupeResult<serde_json::Value> {
        let text = match &self.body.0 {
            BodyKind::Shared(text) => text.to_string(),
            BodyKind::Once(_) => {
                let bytes = self.body.take(BodyAccess::Json)?;
                String::from_utf8_lossy(&bytes).into_owned()
            }
        };
        serde_json::from_str(&text).map_err(|err| {
            DedupeError::decode_src("could not decode body as json", err)
        })
    }

    /// Read the body as raw bytes. Fails on a shared body.
    pub async fn bytes(&self) -> DedupeResult<Bytes> {
        self.body.take(BodyAccess::Bytes)
    }

    /// Read the body as a [Blob]. Fails on a shared body.
    pub async fn blob(&self) -> DedupeResult<Blob> {
        let bytes = self.body.take(BodyAccess::Blob)?;
        let content_type = self
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Ok(Blob {
            bytes,
            content_type,
        })
    }

    /// Read the body as urlencoded form pairs. Fails on a shared body.
    pub async fn form_data(&self) -> DedupeResult<Vec<(String, String)>> {
        let bytes = self.body.take(BodyAccess::FormData)?;
        Ok(::url::form_urlencoded::parse(&bytes).into_owned().collect())
    }
}
