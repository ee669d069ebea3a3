//! Header-affinity selection strategy.
//!
//! Requests carrying the same value for the configured header land on the
//! same instance for as long as the group's URL list is unchanged. Requests
//! without the header are spread round-robin.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use axum::http::{HeaderName, Request};
use crate::load_balancer::{RoundRobin, Selector};

#[derive(Debug)]
pub struct Sticky {
    header: HeaderName,
    fallback: RoundRobin,
}

impl Sticky {
    /// Create a sticky selector keyed on `header`.
    ///
    /// An unparsable header name never matches, so every request falls back
    /// to round-robin.
    pub fn new(header: &str) -> Self {
        let header = HeaderName::try_from(header.to_ascii_lowercase())
            .unwrap_or_else(|_| {
                tracing::warn!(header = %header, "Invalid sticky header name");
                HeaderName::from_static("x-invalid-sticky-header")
            });
        Self {
            header,
            fallback: RoundRobin::new(),
        }
    }
}

impl Selector for Sticky {
    fn select(&self, urls: &[String], request: &Request<()>) -> Option<usize> {
        if urls.is_empty() {
            return None;
        }
        match request.headers().get(&self.header) {
            Some(value) => {
                let mut hasher = DefaultHasher::new();
                value.as_bytes().hash(&mut hasher);
                Some((hasher.finish() % urls.len() as u64) as usize)
            }
            None => self.fallback.next_index(urls.len()),
        }
    }
}
