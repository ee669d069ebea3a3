//! Round-robin selection strategy.

use std::sync::atomic::{AtomicUsize, Ordering};
use axum::http::Request;
use crate::load_balancer::Selector;

/// Round-robin selector.
/// Stores an internal counter to rotate through instances.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next index for a list of `len` entries.
    pub(crate) fn next_index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some(self.counter.fetch_add(1, Ordering::Relaxed) % len)
    }
}

impl Selector for RoundRobin {
    fn select(&self, urls: &[String], _request: &Request<()>) -> Option<usize> {
        self.next_index(urls.len())
    }
}
