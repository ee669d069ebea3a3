//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → gateway.rs (timing, call statistics, terminal errors)
//!     → proxy.rs (mapping lookup, backend URL, forwarding)
//!     → group policies → relay.rs (stream backend response back)
//!     → Send to client
//! ```

pub mod gateway;
pub mod proxy;
pub mod relay;
pub mod request;
pub mod server;

pub use gateway::Gateway;
pub use proxy::{ProxyEngine, DEFAULT_PORT};
pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::HttpServer;
