use axum::{extract::State, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::mapping::GroupSummary;
use crate::stats::StatisticsSnapshot;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub host: String,
    pub port: u16,
    pub index_enabled: bool,
    pub index_path: String,
    pub mappings: usize,
}

#[derive(Serialize)]
pub struct MappingEntry {
    pub prefix: String,
    #[serde(flatten)]
    pub group: GroupSummary,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        host: state.listener.host.clone(),
        port: state.listener.port,
        index_enabled: state.index.enabled,
        index_path: state.index.path.clone(),
        mappings: state.mappings.load().len(),
    })
}

pub async fn get_mappings(State(state): State<AdminState>) -> Json<Vec<MappingEntry>> {
    let entries = state
        .mappings
        .load()
        .summaries()
        .into_iter()
        .map(|(prefix, group)| MappingEntry { prefix, group })
        .collect();
    Json(entries)
}

pub async fn get_stats(State(state): State<AdminState>) -> Json<StatisticsSnapshot> {
    Json(state.statistics.snapshot())
}

/// Reset and return the zeroed snapshot.
pub async fn reset_stats(State(state): State<AdminState>) -> Json<StatisticsSnapshot> {
    state.statistics.reset();
    Json(state.statistics.snapshot())
}
