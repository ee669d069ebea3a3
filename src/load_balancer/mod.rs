//! Backend instance selection.
//!
//! # Data Flow
//! ```text
//! Route matched → MappedServiceGroup identified
//!     → group's current URL list
//!     → Apply selection strategy:
//!         - round_robin.rs (rotate through instances)
//!         - random.rs (uniform pick)
//!         - sticky.rs (hash of a request header)
//!     → Return chosen index or None
//! ```
//!
//! # Design Decisions
//! - Selection is a pure function of (strategy state, URL list, request)
//! - No I/O on the selection path
//! - Empty lists always yield None; the engine keeps scanning other prefixes

use std::fmt::Debug;
use axum::http::Request;

use crate::config::SelectionStrategy;

pub mod random;
pub mod round_robin;
pub mod sticky;

pub use random::Random;
pub use round_robin::RoundRobin;
pub use sticky::Sticky;

/// Strategy for picking one instance out of a group.
pub trait Selector: Send + Sync + Debug {
    /// Returns the index of the chosen URL, or None if `urls` is empty.
    fn select(&self, urls: &[String], request: &Request<()>) -> Option<usize>;
}

/// Build the selector configured for a mapping.
pub fn selector_for(strategy: SelectionStrategy, sticky_header: Option<&str>) -> Box<dyn Selector> {
    match (strategy, sticky_header) {
        (SelectionStrategy::RoundRobin, _) => Box::new(RoundRobin::new()),
        (SelectionStrategy::Random, _) => Box::new(Random::new()),
        (SelectionStrategy::Sticky, Some(header)) => Box::new(Sticky::new(header)),
        (SelectionStrategy::Sticky, None) => {
            tracing::warn!("Sticky strategy without header, falling back to round-robin");
            Box::new(RoundRobin::new())
        }
    }
}
