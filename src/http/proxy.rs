//! Proxy engine: route resolution and streaming forwarding.
//!
//! # Data Flow
//! ```text
//! Request
//!     → index path? serve the mapping table as JSON
//!     → MappingTable::resolve (first prefix in table order with an instance)
//!     → BackendTarget (host, port, base path) + backend path + reverse URL
//!     → outbound request (same method, same headers, body streamed)
//!     → location rewrite(policies(boundary hook(relay))) handle the backend response
//! ```
//!
//! # Design Decisions
//! - The mapping table is loaded once per request, never cached
//! - Request and response bodies are streamed, never collected
//! - No retries; a group that wants them does so in `choose_service`
//! - The response timeout starts once the request body has been sent

use std::future::{ready, Future};
use std::sync::Arc;
use std::time::Duration;
use axum::body::{Body, Bytes, HttpBody};
use axum::http::{header, HeaderValue, Method, Request, Response, Uri};
use axum::response::{IntoResponse, Json};
use futures_util::{stream, StreamExt};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::sync::oneshot;
use url::{Host, Url};

use crate::config::{IndexConfig, TimeoutConfig};
use crate::error::{GatewayError, GatewayResult};
use crate::http::relay::{Relay, StreamFailure};
use crate::http::request::{absolute_uri, request_head};
use crate::mapping::{ProxyMappingDetails, SharedMappings};
use crate::policy::{ResponsePolicy, RewriteLocation, SharedHandler};

/// Port assumed for service URLs without one.
pub const DEFAULT_PORT: u16 = 80;

pub type UpstreamClient = Client<HttpConnector, Body>;

/// Build the outbound HTTP client.
pub fn upstream_client(timeouts: &TimeoutConfig) -> UpstreamClient {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
    Client::builder(TokioExecutor::new()).build(connector)
}

/// A parsed service URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTarget {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub base_path: String,
}

impl BackendTarget {
    pub fn parse(service_url: &str) -> GatewayResult<Self> {
        let invalid = |reason: String| GatewayError::InvalidServiceUrl {
            url: service_url.to_string(),
            reason,
        };

        let url = Url::parse(service_url).map_err(|e| invalid(e.to_string()))?;
        let host = match url.host() {
            Some(Host::Ipv6(addr)) => format!("[{}]", addr),
            Some(host) => host.to_string(),
            None => return Err(invalid("missing host".to_string())),
        };

        Ok(Self {
            scheme: url.scheme().to_string(),
            host,
            port: url.port().unwrap_or(DEFAULT_PORT),
            base_path: url.path().to_string(),
        })
    }

    /// Absolute URI for `backend_path` on this target.
    pub fn uri(&self, backend_path: &str) -> GatewayResult<Uri> {
        let raw = format!("{}://{}:{}{}", self.scheme, self.host, self.port, backend_path);
        raw.parse::<Uri>().map_err(|e| GatewayError::InvalidServiceUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })
    }
}

/// Join a backend base path and the unmatched remainder of the request path.
///
/// The base is normalized to end in exactly one `/`, and one leading `/` on
/// `remaining` is dropped, so the join point never doubles or loses a slash.
/// Empty segments further into `remaining` are kept.
pub fn join_backend_path(base_path: &str, remaining: &str, query: Option<&str>) -> String {
    let mut path = format!(
        "{}/{}",
        base_path.trim_end_matches('/'),
        remaining.strip_prefix('/').unwrap_or(remaining)
    );
    if let Some(q) = query {
        path.push('?');
        path.push_str(q);
    }
    path
}

/// Caller-visible URL for `prefix`: the request's absolute URI resolved
/// against the prefix, without a trailing `/`.
pub fn reverse_url<B>(request: &Request<B>, prefix: &str) -> String {
    let resolved = absolute_uri(request)
        .and_then(|base| base.join(prefix).ok())
        .map(|url| url.to_string())
        .unwrap_or_else(|| prefix.to_string());
    resolved.trim_end_matches('/').to_string()
}

/// Result of a successful engine call.
#[derive(Debug)]
pub struct Proxied {
    pub response: Response<Body>,
    /// Set when the response is relayed from a backend.
    pub stream_failure: Option<StreamFailure>,
    pub backend: Option<String>,
}

impl Proxied {
    fn local(response: Response<Body>) -> Self {
        Self {
            response,
            stream_failure: None,
            backend: None,
        }
    }
}

/// Resolves requests against the live mapping table and forwards them.
#[derive(Clone)]
pub struct ProxyEngine {
    mappings: Arc<SharedMappings>,
    client: UpstreamClient,
    index: IndexConfig,
    response_timeout: Duration,
    boundary: Option<Arc<dyn ResponsePolicy>>,
}

impl ProxyEngine {
    pub fn new(
        mappings: Arc<SharedMappings>,
        client: UpstreamClient,
        index: IndexConfig,
        timeouts: &TimeoutConfig,
    ) -> Self {
        Self {
            mappings,
            client,
            index,
            response_timeout: Duration::from_secs(timeouts.request_secs),
            boundary: None,
        }
    }

    /// Gateway-wide hook wrapped directly around the relay, inside group policies.
    pub fn with_boundary_policy(mut self, policy: Arc<dyn ResponsePolicy>) -> Self {
        self.boundary = Some(policy);
        self
    }

    pub async fn proxy(&self, request: Request<Body>) -> GatewayResult<Proxied> {
        let table = self.mappings.load();
        let path = request.uri().path().to_string();

        if self.index.enabled && path == self.index.path {
            tracing::debug!(path = %path, entries = table.len(), "Serving discovery index");
            return Ok(Proxied::local(Json(table.index()).into_response()));
        }

        let head = request_head(&request);
        let route = table.resolve(&path, &head).ok_or_else(|| GatewayError::NoRoute {
            path: path.clone(),
            prefixes: table.prefixes().into_iter().map(str::to_string).collect(),
        })?;

        let target = BackendTarget::parse(&route.service_url)?;
        let backend_path = join_backend_path(&target.base_path, &route.remaining, request.uri().query());
        let details = Arc::new(ProxyMappingDetails::new(
            route.service_url.clone(),
            reverse_url(&head, &route.prefix),
            backend_path.clone(),
        ));

        tracing::debug!(
            prefix = %route.prefix,
            service_id = %route.group.service_id(),
            backend = %route.service_url,
            backend_path = %backend_path,
            reverse_url = %details.reverse_url(),
            "Route resolved"
        );

        let (outbound, body_sent) = outbound_request(request, target.uri(&backend_path)?)?;

        let failure = StreamFailure::new();
        let relay: SharedHandler = Arc::new(Relay::new(
            route.service_url.clone(),
            head.method() == Method::HEAD,
            failure.clone(),
        ));
        let handler = match &self.boundary {
            Some(hook) => hook.wrap(&head, relay, &details),
            None => relay,
        };
        let handler = route
            .group
            .wrap_response_handler_in_policies(&head, handler, &details);
        let handler = if route.group.rewrite_headers() {
            RewriteLocation::for_group(route.group.clone()).wrap(&head, handler, &details)
        } else {
            handler
        };

        let response = self
            .response_head(self.client.request(outbound), body_sent)
            .await?;

        tracing::debug!(backend = %route.service_url, status = %response.status(), "Backend responded");
        let response = handler.handle(response.map(Body::new)).await;

        Ok(Proxied {
            response,
            stream_failure: Some(failure),
            backend: Some(route.service_url),
        })
    }

    /// Wait for the backend response head.
    ///
    /// The timeout only starts once `body_sent` fires (or its sender is
    /// dropped), i.e. after the request body has been fully forwarded.
    async fn response_head<F, T, E>(
        &self,
        pending: F,
        body_sent: oneshot::Receiver<()>,
    ) -> GatewayResult<T>
    where
        F: Future<Output = Result<T, E>>,
        GatewayError: From<E>,
    {
        let mut pending = std::pin::pin!(pending);
        tokio::select! {
            result = &mut pending => return Ok(result?),
            _ = body_sent => {}
        }

        tokio::time::timeout(self.response_timeout, pending)
            .await
            .map_err(|_| GatewayError::UpstreamTimeout(self.response_timeout))?
            .map_err(GatewayError::from)
    }
}

/// Copy method and headers onto a request for `uri`, streaming the body.
///
/// The returned receiver fires once the body has been forwarded completely.
fn outbound_request(
    request: Request<Body>,
    uri: Uri,
) -> GatewayResult<(Request<Body>, oneshot::Receiver<()>)> {
    let (parts, body) = request.into_parts();
    let has_body = parts.headers.contains_key(header::CONTENT_LENGTH)
        || parts.headers.contains_key(header::TRANSFER_ENCODING)
        || !body.is_end_stream();

    let (sent_tx, sent_rx) = oneshot::channel();
    let mut headers = parts.headers;
    let body = if has_body {
        headers.remove(header::CONTENT_LENGTH);
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        forward_body(body, sent_tx)
    } else {
        let _ = sent_tx.send(());
        Body::empty()
    };

    let mut outbound = Request::builder().method(parts.method).uri(uri).body(body)?;
    *outbound.headers_mut() = headers;
    Ok((outbound, sent_rx))
}

/// Forward inbound chunks one by one as they arrive, then signal `sent`.
///
/// Dropping the body early drops `sent` as well, which also wakes the receiver.
fn forward_body(body: Body, sent: oneshot::Sender<()>) -> Body {
    let finished = stream::once(async move {
        tracing::trace!("Request body fully forwarded");
        let _ = sent.send(());
        None::<Result<Bytes, axum::Error>>
    })
    .filter_map(ready);

    let chunks = body.into_data_stream().inspect(|chunk| match chunk {
        Ok(bytes) => tracing::trace!(bytes = bytes.len(), "Forwarded request chunk"),
        Err(e) => tracing::warn!(error = %e, "Inbound request body failed"),
    });
    Body::from_stream(chunks.chain(finished))
}
