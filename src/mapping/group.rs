//! Service groups: the backend instances registered under one prefix.

use std::fmt;
use std::sync::Arc;
use axum::http::Request;
use serde::Serialize;
use url::Url;

use crate::config::{MappingConfig, PolicyConfig};
use crate::load_balancer::{selector_for, RoundRobin, Selector};
use crate::mapping::ProxyMappingDetails;
use crate::policy::{
    PolicyChain, RemoveResponseHeader, ResponsePolicy, SetResponseHeader, SharedHandler,
};

/// A logical backend service reachable under a path prefix.
///
/// Implementations are supplied by whatever feeds the mapping table and are
/// replaced wholesale when the topology changes; the gateway only reads them.
pub trait MappedServiceGroup: Send + Sync + fmt::Debug {
    fn container_id(&self) -> &str;

    fn version(&self) -> &str;

    fn service_id(&self) -> &str;

    /// Whether backend URLs in response headers are rewritten to the reverse
    /// URL. The engine then wraps the chain in a rewrite bound to this group,
    /// outside every group policy.
    fn rewrite_headers(&self) -> bool;

    /// Current backend service URLs.
    fn service_urls(&self) -> Vec<String>;

    /// Pick one instance for this request. None when the group is empty.
    fn choose_service(&self, request: &Request<()>) -> Option<String>;

    /// Wrap `base` (the relay) in this group's policies.
    fn wrap_response_handler_in_policies(
        &self,
        request: &Request<()>,
        base: SharedHandler,
        details: &Arc<ProxyMappingDetails>,
    ) -> SharedHandler;

    /// Map a backend URL, absolute or backend-relative, to the externally visible one.
    fn rewrite_url(&self, details: &ProxyMappingDetails, proxied_url: &str) -> String {
        rewrite_backend_url(details, proxied_url)
    }

    /// Location of the discovery backend this group came from, if known.
    fn discovery(&self) -> Option<&str> {
        None
    }
}

/// Replace the backend service URL (or, for relative URLs, the backend base
/// path) at the start of `proxied_url` with the reverse URL. URLs pointing
/// anywhere else are returned unchanged.
pub fn rewrite_backend_url(details: &ProxyMappingDetails, proxied_url: &str) -> String {
    let service = details.service_url().trim_end_matches('/');
    if let Some(rest) = strip_segment_prefix(proxied_url, service) {
        return format!("{}{}", details.reverse_url(), rest);
    }

    if proxied_url.starts_with('/') {
        let base_path = Url::parse(service)
            .map(|u| u.path().trim_end_matches('/').to_string())
            .unwrap_or_default();
        if let Some(rest) = strip_segment_prefix(proxied_url, &base_path) {
            return format!("{}{}", details.reverse_url(), rest);
        }
    }

    proxied_url.to_string()
}

/// Strip `prefix` only when it ends on a path boundary.
fn strip_segment_prefix<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = value.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with('/') || rest.starts_with('?') || rest.starts_with('#') {
        Some(rest)
    } else {
        None
    }
}

/// Management-facing view of a group.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GroupSummary {
    pub container_id: String,
    pub version: String,
    pub service_id: String,
    pub rewrite_headers: bool,
    pub urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovery: Option<String>,
}

impl GroupSummary {
    pub fn of(group: &dyn MappedServiceGroup) -> Self {
        Self {
            container_id: group.container_id().to_string(),
            version: group.version().to_string(),
            service_id: group.service_id().to_string(),
            rewrite_headers: group.rewrite_headers(),
            urls: group.service_urls(),
            discovery: group.discovery().map(str::to_string),
        }
    }
}

/// Built-in group with a fixed URL list, a selection strategy and a policy chain.
pub struct StaticServiceGroup {
    container_id: String,
    version: String,
    service_id: String,
    urls: Vec<String>,
    rewrite_headers: bool,
    discovery: Option<String>,
    selector: Box<dyn Selector>,
    policies: PolicyChain,
}

impl StaticServiceGroup {
    pub fn builder(service_id: impl Into<String>) -> StaticServiceGroupBuilder {
        StaticServiceGroupBuilder {
            group: StaticServiceGroup {
                container_id: String::new(),
                version: String::new(),
                service_id: service_id.into(),
                urls: Vec::new(),
                rewrite_headers: false,
                discovery: None,
                selector: Box::new(RoundRobin::new()),
                policies: PolicyChain::new(),
            },
        }
    }

    /// Build a group from a mapping rule. Invalid policy entries are skipped with a warning.
    pub fn from_config(config: &MappingConfig) -> Self {
        let mut builder = Self::builder(config.service_id.clone())
            .container_id(config.container_id.clone())
            .version(config.version.clone())
            .urls(config.urls.clone())
            .rewrite_headers(config.rewrite_headers)
            .selector(selector_for(config.strategy, config.sticky_header.as_deref()));
        if let Some(location) = &config.discovery {
            builder = builder.discovery(location.clone());
        }

        for policy in &config.policies {
            let built: Option<Arc<dyn ResponsePolicy>> = match policy {
                PolicyConfig::SetHeader { name, value } => SetResponseHeader::parse(name, value)
                    .map(|p| Arc::new(p) as Arc<dyn ResponsePolicy>),
                PolicyConfig::RemoveHeader { name } => {
                    RemoveResponseHeader::parse(name).map(|p| Arc::new(p) as Arc<dyn ResponsePolicy>)
                }
            };
            match built {
                Some(p) => builder = builder.policy(p),
                None => tracing::warn!(prefix = %config.prefix, policy = ?policy, "Skipping invalid policy"),
            }
        }

        builder.build()
    }
}

impl fmt::Debug for StaticServiceGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticServiceGroup")
            .field("service_id", &self.service_id)
            .field("version", &self.version)
            .field("urls", &self.urls)
            .field("selector", &self.selector)
            .field("policies", &self.policies)
            .finish()
    }
}

impl MappedServiceGroup for StaticServiceGroup {
    fn container_id(&self) -> &str {
        &self.container_id
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn service_id(&self) -> &str {
        &self.service_id
    }

    fn rewrite_headers(&self) -> bool {
        self.rewrite_headers
    }

    fn service_urls(&self) -> Vec<String> {
        self.urls.clone()
    }

    fn choose_service(&self, request: &Request<()>) -> Option<String> {
        self.selector
            .select(&self.urls, request)
            .and_then(|idx| self.urls.get(idx))
            .cloned()
    }

    fn wrap_response_handler_in_policies(
        &self,
        request: &Request<()>,
        base: SharedHandler,
        details: &Arc<ProxyMappingDetails>,
    ) -> SharedHandler {
        self.policies.wrap(request, base, details)
    }

    fn discovery(&self) -> Option<&str> {
        self.discovery.as_deref()
    }
}

pub struct StaticServiceGroupBuilder {
    group: StaticServiceGroup,
}

impl StaticServiceGroupBuilder {
    pub fn container_id(mut self, id: impl Into<String>) -> Self {
        self.group.container_id = id.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.group.version = version.into();
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.group.urls.push(url.into());
        self
    }

    pub fn urls(mut self, urls: Vec<String>) -> Self {
        self.group.urls = urls;
        self
    }

    pub fn rewrite_headers(mut self, enabled: bool) -> Self {
        self.group.rewrite_headers = enabled;
        self
    }

    pub fn discovery(mut self, location: impl Into<String>) -> Self {
        self.group.discovery = Some(location.into());
        self
    }

    pub fn selector(mut self, selector: Box<dyn Selector>) -> Self {
        self.group.selector = selector;
        self
    }

    /// Append a policy; earlier policies sit closer to the relay.
    pub fn policy(mut self, policy: Arc<dyn ResponsePolicy>) -> Self {
        self.group.policies.push(policy);
        self
    }

    pub fn build(self) -> StaticServiceGroup {
        self.group
    }
}
