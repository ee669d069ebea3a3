//! Header-level response policies.

use std::sync::Arc;
use axum::body::Body;
use axum::http::{header, HeaderName, HeaderValue, Request, Response};
use futures_util::future::BoxFuture;

use crate::mapping::{MappedServiceGroup, ProxyMappingDetails};
use crate::policy::{ResponseHandler, ResponsePolicy, SharedHandler};

/// Sets a header on every response before it reaches the inner handler.
#[derive(Debug, Clone)]
pub struct SetResponseHeader {
    name: HeaderName,
    value: HeaderValue,
}

impl SetResponseHeader {
    pub fn new(name: HeaderName, value: HeaderValue) -> Self {
        Self { name, value }
    }

    /// Build from configuration strings; None if either part is not a valid header.
    pub fn parse(name: &str, value: &str) -> Option<Self> {
        Some(Self::new(
            HeaderName::try_from(name).ok()?,
            HeaderValue::try_from(value).ok()?,
        ))
    }
}

struct SetHeaderHandler {
    policy: SetResponseHeader,
    inner: SharedHandler,
}

impl ResponseHandler for SetHeaderHandler {
    fn handle(&self, mut response: Response<Body>) -> BoxFuture<'static, Response<Body>> {
        response
            .headers_mut()
            .insert(self.policy.name.clone(), self.policy.value.clone());
        self.inner.handle(response)
    }
}

impl ResponsePolicy for SetResponseHeader {
    fn wrap(
        &self,
        _request: &Request<()>,
        inner: SharedHandler,
        _details: &Arc<ProxyMappingDetails>,
    ) -> SharedHandler {
        Arc::new(SetHeaderHandler {
            policy: self.clone(),
            inner,
        })
    }

    fn name(&self) -> &str {
        "set-header"
    }
}

/// Strips a header from every response.
#[derive(Debug, Clone)]
pub struct RemoveResponseHeader {
    name: HeaderName,
}

impl RemoveResponseHeader {
    pub fn new(name: HeaderName) -> Self {
        Self { name }
    }

    pub fn parse(name: &str) -> Option<Self> {
        HeaderName::try_from(name).ok().map(Self::new)
    }
}

struct RemoveHeaderHandler {
    name: HeaderName,
    inner: SharedHandler,
}

impl ResponseHandler for RemoveHeaderHandler {
    fn handle(&self, mut response: Response<Body>) -> BoxFuture<'static, Response<Body>> {
        response.headers_mut().remove(&self.name);
        self.inner.handle(response)
    }
}

impl ResponsePolicy for RemoveResponseHeader {
    fn wrap(
        &self,
        _request: &Request<()>,
        inner: SharedHandler,
        _details: &Arc<ProxyMappingDetails>,
    ) -> SharedHandler {
        Arc::new(RemoveHeaderHandler {
            name: self.name.clone(),
            inner,
        })
    }

    fn name(&self) -> &str {
        "remove-header"
    }
}

/// Rewrites `Location` and `Content-Location` from backend URLs to the
/// reverse URL, as decided by the group's [`MappedServiceGroup::rewrite_url`].
#[derive(Clone)]
pub struct RewriteLocation {
    group: Arc<dyn MappedServiceGroup>,
}

impl RewriteLocation {
    pub fn for_group(group: Arc<dyn MappedServiceGroup>) -> Self {
        Self { group }
    }
}

struct RewriteLocationHandler {
    group: Arc<dyn MappedServiceGroup>,
    details: Arc<ProxyMappingDetails>,
    inner: SharedHandler,
}

impl ResponseHandler for RewriteLocationHandler {
    fn handle(&self, mut response: Response<Body>) -> BoxFuture<'static, Response<Body>> {
        for name in [header::LOCATION, header::CONTENT_LOCATION] {
            let rewritten = response
                .headers()
                .get(&name)
                .and_then(|v| v.to_str().ok())
                .map(|v| self.group.rewrite_url(&self.details, v));
            if let Some(value) = rewritten.and_then(|v| HeaderValue::try_from(v).ok()) {
                tracing::trace!(header = %name, value = ?value, "Rewrote backend URL");
                response.headers_mut().insert(name, value);
            }
        }
        self.inner.handle(response)
    }
}

impl ResponsePolicy for RewriteLocation {
    fn wrap(
        &self,
        _request: &Request<()>,
        inner: SharedHandler,
        details: &Arc<ProxyMappingDetails>,
    ) -> SharedHandler {
        Arc::new(RewriteLocationHandler {
            group: self.group.clone(),
            details: details.clone(),
            inner,
        })
    }

    fn name(&self) -> &str {
        "rewrite-location"
    }
}
