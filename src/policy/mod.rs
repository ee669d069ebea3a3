//! Response policy chain.
//!
//! # Data Flow
//! ```text
//! backend response
//!     → outermost policy (last in the chain)
//!     → ...
//!     → boundary hook (gateway-wide)
//!     → relay (innermost, streams to the caller)
//! ```
//!
//! A policy wraps the handler it is given and returns a new one. It may
//! rewrite the response, replace it with its own, or pass it through.

use std::fmt;
use std::sync::Arc;
use axum::body::Body;
use axum::http::{Request, Response};
use futures_util::future::BoxFuture;

use crate::mapping::ProxyMappingDetails;

pub mod headers;

pub use headers::{RemoveResponseHeader, RewriteLocation, SetResponseHeader};

/// One stage of response handling.
pub trait ResponseHandler: Send + Sync {
    fn handle(&self, response: Response<Body>) -> BoxFuture<'static, Response<Body>>;
}

pub type SharedHandler = Arc<dyn ResponseHandler>;

impl<F> ResponseHandler for F
where
    F: Fn(Response<Body>) -> BoxFuture<'static, Response<Body>> + Send + Sync,
{
    fn handle(&self, response: Response<Body>) -> BoxFuture<'static, Response<Body>> {
        self(response)
    }
}

/// Turns a handler into a wrapped handler.
pub trait ResponsePolicy: Send + Sync {
    fn wrap(
        &self,
        request: &Request<()>,
        inner: SharedHandler,
        details: &Arc<ProxyMappingDetails>,
    ) -> SharedHandler;

    /// Name used in logs and the management surface.
    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> ResponsePolicy for F
where
    F: Fn(&Request<()>, SharedHandler, &Arc<ProxyMappingDetails>) -> SharedHandler + Send + Sync,
{
    fn wrap(
        &self,
        request: &Request<()>,
        inner: SharedHandler,
        details: &Arc<ProxyMappingDetails>,
    ) -> SharedHandler {
        self(request, inner, details)
    }
}

/// Ordered list of policies; the first entry sits closest to the relay.
#[derive(Clone, Default)]
pub struct PolicyChain {
    policies: Vec<Arc<dyn ResponsePolicy>>,
}

impl PolicyChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, policy: Arc<dyn ResponsePolicy>) {
        self.policies.push(policy);
    }

    pub fn with(mut self, policy: Arc<dyn ResponsePolicy>) -> Self {
        self.push(policy);
        self
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.policies.iter().map(|p| p.name().to_string()).collect()
    }

    /// Wrap `base` with every policy, innermost first.
    pub fn wrap(
        &self,
        request: &Request<()>,
        base: SharedHandler,
        details: &Arc<ProxyMappingDetails>,
    ) -> SharedHandler {
        self.policies
            .iter()
            .fold(base, |inner, policy| policy.wrap(request, inner, details))
    }
}

impl fmt::Debug for PolicyChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Handler returning the response unchanged.
pub fn passthrough() -> SharedHandler {
    Arc::new(|response: Response<Body>| -> BoxFuture<'static, Response<Body>> {
        Box::pin(async move { response })
    })
}
