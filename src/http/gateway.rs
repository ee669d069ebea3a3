//! Gateway front door.
//!
//! # Responsibilities
//! - Time every inbound request
//! - Delegate to the proxy engine and turn its errors into terminal responses
//! - Submit exactly one call detail record per request, whatever the outcome
//!
//! # Design Decisions
//! - The record is submitted by a drop guard, so a request cancelled by the
//!   caller still produces one
//! - Relayed responses are recorded when their body finishes, so a backend
//!   failing mid-stream is counted as an error

use std::sync::Arc;
use std::time::Instant;
use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::response::IntoResponse;
use futures_util::StreamExt;

use crate::http::proxy::{Proxied, ProxyEngine};
use crate::http::relay::StreamFailure;
use crate::http::request::request_id;
use crate::observability::metrics;
use crate::stats::{CallDetailRecord, CallStatistics};

/// Single entry point for proxied traffic.
#[derive(Clone)]
pub struct Gateway {
    engine: ProxyEngine,
    statistics: Arc<CallStatistics>,
}

impl Gateway {
    pub fn new(engine: ProxyEngine, statistics: Arc<CallStatistics>) -> Self {
        Self { engine, statistics }
    }

    pub fn statistics(&self) -> &Arc<CallStatistics> {
        &self.statistics
    }

    pub async fn handle(&self, request: Request<Body>) -> Response<Body> {
        let mut call = CallGuard::start(self.statistics.clone(), &request);

        match self.engine.proxy(request).await {
            Ok(Proxied {
                response,
                stream_failure: Some(failure),
                backend,
            }) => {
                call.status = Some(response.status());
                call.failure = Some(failure);
                call.backend = backend;
                let (parts, body) = response.into_parts();
                Response::from_parts(parts, call.attach(body))
            }
            Ok(Proxied { response, .. }) => {
                call.status = Some(response.status());
                response
            }
            Err(e) => {
                if e.is_failure() {
                    tracing::error!(request_id = ?call.request_id, path = %call.path, error = %e, "Proxying failed");
                    metrics::record_upstream_error(e.kind());
                    call.error = Some(e.to_string());
                } else {
                    tracing::info!(request_id = ?call.request_id, path = %call.path, "No route matched");
                }
                call.status = Some(e.status());
                e.into_response()
            }
        }
    }
}

/// Records one call when dropped.
struct CallGuard {
    statistics: Arc<CallStatistics>,
    start: Instant,
    method: Method,
    path: String,
    request_id: Option<String>,
    backend: Option<String>,
    status: Option<StatusCode>,
    error: Option<String>,
    failure: Option<StreamFailure>,
}

impl CallGuard {
    fn start(statistics: Arc<CallStatistics>, request: &Request<Body>) -> Self {
        Self {
            statistics,
            start: Instant::now(),
            method: request.method().clone(),
            path: request.uri().path().to_string(),
            request_id: request_id(request),
            backend: None,
            status: None,
            error: None,
            failure: None,
        }
    }

    /// Keep the guard alive until `body` is fully sent or dropped.
    fn attach(self, body: Body) -> Body {
        let call = self;
        let stream = body.into_data_stream().map(move |chunk| {
            let _ = &call;
            chunk
        });
        Body::from_stream(stream)
    }
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let (status_line, cancelled) = match self.status {
            Some(status) => (status_line(status), false),
            None => ("499 Client Closed Request".to_string(), true),
        };

        let error = self
            .error
            .take()
            .or_else(|| self.failure.as_ref().and_then(StreamFailure::get))
            .or_else(|| cancelled.then(|| "client disconnected before response".to_string()));

        let mut record = CallDetailRecord::new(elapsed, status_line)
            .with_request_id(self.request_id.take());
        if let Some(error) = error {
            record = record.with_error(error);
        }

        if record.is_error() {
            tracing::warn!(
                request_id = ?record.request_id,
                method = %self.method,
                path = %self.path,
                backend = ?self.backend,
                status = %record.status,
                elapsed_ms = elapsed.as_millis() as u64,
                error = ?record.error,
                "Call failed"
            );
        } else {
            tracing::info!(
                request_id = ?record.request_id,
                method = %self.method,
                path = %self.path,
                backend = ?self.backend,
                status = %record.status,
                elapsed_ms = elapsed.as_millis() as u64,
                "Call completed"
            );
        }
        metrics::record_request(
            self.method.as_str(),
            self.status.map(|s| s.as_u16()).unwrap_or(499),
            elapsed,
        );
        self.statistics.record_call(&record);
    }
}

fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IndexConfig, TimeoutConfig};
    use crate::http::proxy::upstream_client;
    use crate::mapping::{MappingTable, SharedMappings, StaticServiceGroup};

    fn gateway(table: MappingTable) -> Gateway {
        let timeouts = TimeoutConfig::default();
        let engine = ProxyEngine::new(
            Arc::new(SharedMappings::new(table)),
            upstream_client(&timeouts),
            IndexConfig::default(),
            &timeouts,
        );
        Gateway::new(engine, Arc::new(CallStatistics::new()))
    }

    #[tokio::test]
    async fn not_found_is_recorded_without_error() {
        let gw = gateway(MappingTable::new());
        let response = gw
            .handle(Request::builder().uri("/missing").body(Body::empty()).unwrap())
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let snap = gw.statistics().snapshot();
        assert_eq!(snap.count, 1);
        assert!(snap.last_error.is_none());
    }

    #[tokio::test]
    async fn malformed_target_is_recorded_as_error() {
        let table = MappingTable::new().with(
            "/bad/",
            Arc::new(StaticServiceGroup::builder("bad").url("::not-a-url::").build()),
        );
        let gw = gateway(table);
        let response = gw
            .handle(Request::builder().uri("/bad/x").body(Body::empty()).unwrap())
            .await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let snap = gw.statistics().snapshot();
        assert_eq!(snap.count, 1);
        assert!(snap.last_error.unwrap().contains("invalid service url"));
    }

    #[tokio::test]
    async fn dropped_request_still_records_once() {
        let gw = gateway(MappingTable::new());
        let guard = CallGuard::start(
            gw.statistics().clone(),
            &Request::builder().uri("/x").body(Body::empty()).unwrap(),
        );
        drop(guard);

        let snap = gw.statistics().snapshot();
        assert_eq!(snap.count, 1);
        assert!(snap.last_error.unwrap().contains("client disconnected"));
    }

    #[test]
    fn status_lines_include_reason() {
        assert_eq!(status_line(StatusCode::OK), "200 OK");
        assert_eq!(status_line(StatusCode::from_u16(599).unwrap()), "599");
    }
}
