//! Per-request mapping details handed to the policy chain.

use serde::Serialize;

/// Immutable description of how one request was mapped.
///
/// Built once the engine has chosen a backend and shared by every policy
/// wrapping that request's response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProxyMappingDetails {
    service_url: String,
    reverse_url: String,
    backend_path: String,
}

impl ProxyMappingDetails {
    pub fn new(
        service_url: impl Into<String>,
        reverse_url: impl Into<String>,
        backend_path: impl Into<String>,
    ) -> Self {
        Self {
            service_url: service_url.into(),
            reverse_url: reverse_url.into(),
            backend_path: backend_path.into(),
        }
    }

    /// Absolute URL of the chosen backend instance, as registered.
    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    /// Externally visible URL standing in for `service_url`. Never ends in `/`.
    pub fn reverse_url(&self) -> &str {
        &self.reverse_url
    }

    /// Path (and query) sent to the backend.
    pub fn backend_path(&self) -> &str {
        &self.backend_path
    }
}
