//! Discovery-driven HTTP gateway library.

pub mod admin;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod mapping;
pub mod observability;
pub mod policy;
pub mod stats;

pub use config::schema::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use http::{Gateway, HttpServer, ProxyEngine};
pub use lifecycle::Shutdown;
pub use mapping::{MappedServiceGroup, MappingTable, ProxyMappingDetails, SharedMappings, StaticServiceGroup};
pub use policy::{PolicyChain, ResponseHandler, ResponsePolicy};
pub use stats::{CallDetailRecord, CallStatistics, StatisticsSnapshot};
