//! Management API.
//!
//! Read-only views of the listener, the current mapping table and the call
//! statistics, plus a statistics reset. Every route requires the configured
//! Bearer key.

pub mod auth;
pub mod handlers;

use std::sync::Arc;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::config::{IndexConfig, ListenerConfig};
use crate::mapping::SharedMappings;
use crate::stats::CallStatistics;

/// Shared state for management handlers.
#[derive(Clone)]
pub struct AdminState {
    pub listener: ListenerConfig,
    pub index: IndexConfig,
    pub mappings: Arc<SharedMappings>,
    pub statistics: Arc<CallStatistics>,
    pub api_key: String,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/mappings", get(get_mappings))
        .route("/admin/stats", get(get_stats))
        .route("/admin/stats/reset", post(reset_stats))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    use crate::mapping::{MappingTable, StaticServiceGroup};
    use crate::stats::CallDetailRecord;

    const KEY: &str = "test-key";

    fn state() -> AdminState {
        let table = MappingTable::new()
            .with(
                "/users/",
                Arc::new(
                    StaticServiceGroup::builder("users")
                        .container_id("c-1")
                        .version("1.2")
                        .url("http://users:8000/api")
                        .build(),
                ),
            )
            .with("/empty/", Arc::new(StaticServiceGroup::builder("empty").build()));
        AdminState {
            listener: ListenerConfig::default(),
            index: IndexConfig::default(),
            mappings: Arc::new(SharedMappings::new(table)),
            statistics: Arc::new(CallStatistics::new()),
            api_key: KEY.to_string(),
        }
    }

    fn authed(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {}", KEY))
            .body(Body::empty())
            .unwrap()
    }

    async fn json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn rejects_missing_or_wrong_key() {
        let app = setup_admin_router(state());
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/admin/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/admin/status")
                    .header("authorization", "Bearer nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn status_reports_listener_and_index() {
        let response = setup_admin_router(state())
            .oneshot(authed("GET", "/admin/status"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["port"], 8080);
        assert_eq!(body["index_enabled"], true);
        assert_eq!(body["index_path"], "/");
        assert_eq!(body["mappings"], 2);
    }

    #[tokio::test]
    async fn mappings_are_listed_in_table_order() {
        let response = setup_admin_router(state())
            .oneshot(authed("GET", "/admin/mappings"))
            .await
            .unwrap();
        let body = json(response).await;
        let entries = body.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["prefix"], "/users/");
        assert_eq!(entries[0]["service_id"], "users");
        assert_eq!(entries[0]["version"], "1.2");
        assert_eq!(entries[0]["urls"][0], "http://users:8000/api");
        assert_eq!(entries[1]["prefix"], "/empty/");
        assert!(entries[1]["urls"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stats_snapshot_and_reset() {
        let state = state();
        state
            .statistics
            .record_call(&CallDetailRecord::new(Duration::from_nanos(300), "200 OK"));
        let app = setup_admin_router(state.clone());

        let body = json(app.clone().oneshot(authed("GET", "/admin/stats")).await.unwrap()).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["average_latency_nanos"], 300);

        let response = app.clone().oneshot(authed("POST", "/admin/stats/reset")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["count"], 0);
        assert_eq!(state.statistics.snapshot().count, 0);
    }
}
