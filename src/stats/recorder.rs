//! Running call statistics.

use std::sync::{Mutex, MutexGuard, PoisonError};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::stats::CallDetailRecord;

/// Point-in-time copy of the statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatisticsSnapshot {
    pub count: u64,
    pub average_latency_nanos: u64,
    pub last_call_timestamp: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Shared recorder of call statistics.
///
/// The mean is maintained incrementally as
/// `(avg * count + sample) / (count + 1)` with integer floor division.
#[derive(Debug, Default)]
pub struct CallStatistics {
    state: Mutex<StatisticsSnapshot>,
}

impl CallStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StatisticsSnapshot> {
        // Every update leaves the state consistent, so a poisoned lock is still usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fold one completed call into the statistics.
    pub fn record_call(&self, record: &CallDetailRecord) {
        let mut state = self.lock();

        state.last_call_timestamp = Some(record.timestamp);
        if let Some(error) = &record.error {
            state.last_error = Some(format!("{}: {}", record.timestamp.to_rfc3339(), error));
        }

        let total = u128::from(state.average_latency_nanos) * u128::from(state.count)
            + u128::from(record.elapsed_nanos);
        let average = total / (u128::from(state.count) + 1);
        state.average_latency_nanos = u64::try_from(average).unwrap_or(u64::MAX);
        state.count += 1;
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        self.lock().clone()
    }

    /// Zero all fields in one step.
    pub fn reset(&self) {
        *self.lock() = StatisticsSnapshot::default();
        tracing::info!("Call statistics reset");
    }
}
