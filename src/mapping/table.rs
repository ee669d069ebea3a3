//! The mapping table: ordered path prefix → service group snapshot.
//!
//! # Design Decisions
//! - First prefix in table order wins, not the longest one
//! - A snapshot is immutable; topology changes swap in a whole new table
//! - Readers load the current snapshot once per request

use std::sync::Arc;
use arc_swap::ArcSwap;
use axum::http::Request;
use serde_json::{Map, Value};

use crate::config::MappingConfig;
use crate::mapping::{GroupSummary, MappedServiceGroup, StaticServiceGroup};

/// A routing decision for one request.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The registered prefix that matched.
    pub prefix: String,
    pub group: Arc<dyn MappedServiceGroup>,
    /// Service URL chosen by the group.
    pub service_url: String,
    /// Request path with the prefix removed; empty when the prefix consumed it.
    pub remaining: String,
}

/// Ordered mapping from path prefix to service group.
#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    entries: Vec<(String, Arc<dyn MappedServiceGroup>)>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from mapping rules, keeping their order.
    pub fn from_config(mappings: &[MappingConfig]) -> Self {
        mappings.iter().fold(Self::new(), |table, mapping| {
            table.with(
                mapping.prefix.clone(),
                Arc::new(StaticServiceGroup::from_config(mapping)),
            )
        })
    }

    /// Append an entry. Later entries only win when earlier ones don't match.
    pub fn with(mut self, prefix: impl Into<String>, group: Arc<dyn MappedServiceGroup>) -> Self {
        self.entries.push((prefix.into(), group));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn MappedServiceGroup>)> {
        self.entries.iter().map(|(p, g)| (p.as_str(), g))
    }

    pub fn prefixes(&self) -> Vec<&str> {
        self.entries.iter().map(|(p, _)| p.as_str()).collect()
    }

    /// Find the first entry matching `path` whose group yields a service.
    ///
    /// The path also matches prefixes registered with a trailing slash
    /// (`/api` matches `/api/`). Groups with no instance are skipped so that a
    /// later overlapping prefix can still serve the request.
    pub fn resolve(&self, path: &str, request: &Request<()>) -> Option<RouteMatch> {
        let slashed = if path.ends_with('/') {
            None
        } else {
            Some(format!("{}/", path))
        };

        for (prefix, group) in &self.entries {
            let remaining = match path.strip_prefix(prefix.as_str()) {
                Some(rest) => rest,
                None => match slashed.as_deref().and_then(|s| s.strip_prefix(prefix.as_str())) {
                    Some(_) => "",
                    None => continue,
                },
            };

            match group.choose_service(request) {
                Some(service_url) => {
                    return Some(RouteMatch {
                        prefix: prefix.clone(),
                        group: group.clone(),
                        service_url,
                        remaining: remaining.to_string(),
                    });
                }
                None => {
                    tracing::debug!(prefix = %prefix, service_id = %group.service_id(), "Matched group has no instances, continuing");
                }
            }
        }
        None
    }

    /// Discovery index payload: `{ prefix: [service_url, ...] }` in table order.
    pub fn index(&self) -> Value {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|(prefix, group)| {
                let urls = group.service_urls().into_iter().map(Value::String).collect();
                (prefix.clone(), Value::Array(urls))
            })
            .collect();
        Value::Object(map)
    }

    /// Management summary: prefix → group description, in table order.
    pub fn summaries(&self) -> Vec<(String, GroupSummary)> {
        self.entries
            .iter()
            .map(|(prefix, group)| (prefix.clone(), GroupSummary::of(group.as_ref())))
            .collect()
    }
}

/// The current mapping table, swappable while requests are in flight.
#[derive(Debug, Default)]
pub struct SharedMappings {
    current: ArcSwap<MappingTable>,
}

impl SharedMappings {
    pub fn new(table: MappingTable) -> Self {
        Self {
            current: ArcSwap::from_pointee(table),
        }
    }

    /// Snapshot for one request. Two calls may see different tables.
    pub fn load(&self) -> Arc<MappingTable> {
        self.current.load_full()
    }

    /// Atomically replace the whole table.
    pub fn replace(&self, table: MappingTable) {
        tracing::info!(mappings = table.len(), prefixes = ?table.prefixes(), "Mapping table replaced");
        self.current.store(Arc::new(table));
    }
}
