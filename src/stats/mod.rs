//! Call statistics.
//!
//! # Data Flow
//! ```text
//! Gateway front door (one per request)
//!     → record.rs (CallDetailRecord, immutable)
//!     → recorder.rs (CallStatistics: count, mean latency, last call, last error)
//!     → admin surface (snapshot / reset)
//! ```
//!
//! # Design Decisions
//! - One explicit handle shared via Arc, no global state
//! - Updates serialized by a mutex so the incremental mean never sees a torn read

pub mod record;
pub mod recorder;

pub use record::CallDetailRecord;
pub use recorder::{CallStatistics, StatisticsSnapshot};
