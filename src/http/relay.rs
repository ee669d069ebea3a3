//! Response relay: the innermost stage of every policy chain.
//!
//! # Responsibilities
//! - Copy backend status and headers to the caller
//! - Re-frame the body as chunked and stream it through as it arrives
//! - Note a backend failure that happens after the head was sent
//! - Release the backend connection when the body ends or is dropped
//!
//! # Design Decisions
//! - No buffering: each backend chunk becomes one caller chunk
//! - No policy logic here; policies run before the relay sees the response

use std::sync::{Arc, OnceLock};
use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};
use futures_util::future::BoxFuture;
use futures_util::StreamExt;

use crate::observability::metrics;
use crate::policy::ResponseHandler;

/// Per-request slot recording a backend failure that happened mid-stream.
#[derive(Debug, Clone, Default)]
pub struct StreamFailure(Arc<OnceLock<String>>);

impl StreamFailure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the first failure only.
    pub fn set(&self, error: impl Into<String>) {
        let _ = self.0.set(error.into());
    }

    pub fn get(&self) -> Option<String> {
        self.0.get().cloned()
    }
}

/// Streams a backend response back to the caller.
#[derive(Debug, Clone)]
pub struct Relay {
    backend: String,
    head_request: bool,
    failure: StreamFailure,
}

impl Relay {
    pub fn new(backend: impl Into<String>, head_request: bool, failure: StreamFailure) -> Self {
        Self {
            backend: backend.into(),
            head_request,
            failure,
        }
    }
}

impl ResponseHandler for Relay {
    fn handle(&self, response: Response<Body>) -> BoxFuture<'static, Response<Body>> {
        let (mut parts, body) = response.into_parts();

        if carries_body(parts.status, self.head_request) {
            parts.headers.remove(header::CONTENT_LENGTH);
            parts
                .headers
                .insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        }

        let body = relay_body(body, BackendLease::new(self.backend.clone(), self.failure.clone()));
        Box::pin(async move { Response::from_parts(parts, body) })
    }
}

fn carries_body(status: StatusCode, head_request: bool) -> bool {
    !(head_request
        || status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED)
}

/// Tracks one relayed body; dropping it releases the backend stream.
#[derive(Debug)]
struct BackendLease {
    backend: String,
    failure: StreamFailure,
    chunks: u64,
    bytes: u64,
}

impl BackendLease {
    fn new(backend: String, failure: StreamFailure) -> Self {
        Self {
            backend,
            failure,
            chunks: 0,
            bytes: 0,
        }
    }
}

impl Drop for BackendLease {
    fn drop(&mut self) {
        tracing::debug!(
            backend = %self.backend,
            chunks = self.chunks,
            bytes = self.bytes,
            "Backend response released"
        );
    }
}

fn relay_body(body: Body, mut lease: BackendLease) -> Body {
    let stream = body.into_data_stream().map(move |chunk| {
        match &chunk {
            Ok(bytes) => {
                lease.chunks += 1;
                lease.bytes += bytes.len() as u64;
                tracing::trace!(backend = %lease.backend, bytes = bytes.len(), "Relayed response chunk");
            }
            Err(e) => {
                tracing::warn!(backend = %lease.backend, error = %e, relayed_bytes = lease.bytes, "Backend stream failed mid-response");
                metrics::record_upstream_error("mid_stream");
                lease.failure.set(format!("backend stream failed after {} bytes: {}", lease.bytes, e));
            }
        }
        chunk
    });
    Body::from_stream(stream)
}
