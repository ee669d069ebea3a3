//! Mapping subsystem: which backend group serves which path prefix.
//!
//! # Data Flow
//! ```text
//! discovery collaborator / config file
//!     → MappingTable (ordered prefix → MappedServiceGroup)
//!     → SharedMappings::replace (atomic swap)
//!
//! Per request:
//!     SharedMappings::load → MappingTable::resolve
//!     → MappedServiceGroup::choose_service
//!     → RouteMatch (prefix, group, service URL, remaining path)
//! ```

pub mod details;
pub mod group;
pub mod table;

pub use details::ProxyMappingDetails;
pub use group::{rewrite_backend_url, GroupSummary, MappedServiceGroup, StaticServiceGroup, StaticServiceGroupBuilder};
pub use table::{MappingTable, RouteMatch, SharedMappings};
