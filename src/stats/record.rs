//! Call detail records.

use std::time::Duration;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of one proxied request. Produced exactly once per inbound request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallDetailRecord {
    pub timestamp: DateTime<Utc>,
    pub elapsed_nanos: u64,
    /// Status line, e.g. `200 OK`.
    pub status: String,
    pub error: Option<String>,
    pub request_id: Option<String>,
}

impl CallDetailRecord {
    pub fn new(elapsed: Duration, status: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            elapsed_nanos: u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX),
            status: status.into(),
            error: None,
            request_id: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
