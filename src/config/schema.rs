//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (host, port).
    pub listener: ListenerConfig,

    /// Discovery index settings.
    pub index: IndexConfig,

    /// Mapping rules, in match order.
    pub mappings: Vec<MappingConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host or address to listen on.
    pub host: String,

    /// Port to listen on.
    pub port: u16,
}

impl ListenerConfig {
    /// `host:port` form accepted by `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Discovery index configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Serve the mapping table as JSON at `path`.
    pub enabled: bool,

    /// Request path the index is served on.
    pub path: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/".to_string(),
        }
    }
}

/// A mapping rule: path prefix to a group of backend service URLs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MappingConfig {
    /// Literal path prefix.
    pub prefix: String,

    /// Container identifier of the backing service.
    #[serde(default)]
    pub container_id: String,

    /// Service version.
    #[serde(default)]
    pub version: String,

    /// Service identifier.
    #[serde(default)]
    pub service_id: String,

    /// Backend service URLs (scheme, host, port, base path).
    #[serde(default)]
    pub urls: Vec<String>,

    /// Rewrite Location headers from backend URLs to the reverse URL.
    #[serde(default)]
    pub rewrite_headers: bool,

    /// Instance selection strategy.
    #[serde(default)]
    pub strategy: SelectionStrategy,

    /// Request header hashed by the sticky strategy.
    #[serde(default)]
    pub sticky_header: Option<String>,

    /// Location of the discovery backend feeding this rule.
    #[serde(default)]
    pub discovery: Option<String>,

    /// Response policies, innermost first.
    #[serde(default)]
    pub policies: Vec<PolicyConfig>,
}

/// Instance selection strategy for a mapping.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionStrategy {
    #[default]
    RoundRobin,
    Random,
    Sticky,
}

/// A configurable response policy.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PolicyConfig {
    /// Set (or overwrite) a response header.
    SetHeader { name: String, value: String },
    /// Remove a response header.
    RemoveHeader { name: String },
}

/// Timeout configuration for upstream calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time allowed for the backend to produce a response head, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Management surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the management API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Management API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
