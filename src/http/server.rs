//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the gateway handler
//! - Wire up middleware (request ID, tracing)
//! - Bind server to listener
//! - Apply mapping updates while serving
//! - Start the management surface when enabled

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::admin::{setup_admin_router, AdminState};
use crate::config::GatewayConfig;
use crate::http::gateway::Gateway;
use crate::http::proxy::{upstream_client, ProxyEngine};
use crate::http::request::MakeRequestUuid;
use crate::mapping::{MappingTable, SharedMappings};
use crate::observability::metrics;
use crate::policy::ResponsePolicy;
use crate::stats::CallStatistics;

/// HTTP server for the gateway.
pub struct HttpServer {
    config: GatewayConfig,
    mappings: Arc<SharedMappings>,
    statistics: Arc<CallStatistics>,
    boundary: Option<Arc<dyn ResponsePolicy>>,
}

impl HttpServer {
    /// Create a server whose mapping table comes from `config.mappings`.
    pub fn new(config: GatewayConfig) -> Self {
        let table = MappingTable::from_config(&config.mappings);
        Self::with_mappings(config, Arc::new(SharedMappings::new(table)))
    }

    /// Create a server reading an externally maintained mapping table.
    pub fn with_mappings(config: GatewayConfig, mappings: Arc<SharedMappings>) -> Self {
        metrics::record_mapping_entries(mappings.load().len());
        Self {
            config,
            mappings,
            statistics: Arc::new(CallStatistics::new()),
            boundary: None,
        }
    }

    /// Install a gateway-wide response hook (e.g. API management interception).
    pub fn with_boundary_policy(mut self, policy: Arc<dyn ResponsePolicy>) -> Self {
        self.boundary = Some(policy);
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn mappings(&self) -> Arc<SharedMappings> {
        self.mappings.clone()
    }

    pub fn statistics(&self) -> Arc<CallStatistics> {
        self.statistics.clone()
    }

    fn gateway(&self) -> Gateway {
        let mut engine = ProxyEngine::new(
            self.mappings.clone(),
            upstream_client(&self.config.timeouts),
            self.config.index.clone(),
            &self.config.timeouts,
        );
        if let Some(boundary) = &self.boundary {
            engine = engine.with_boundary_policy(boundary.clone());
        }
        Gateway::new(engine, self.statistics.clone())
    }

    /// Build the Axum router with all middleware layers.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", any(gateway_handler))
            .route("/{*path}", any(gateway_handler))
            .with_state(Arc::new(self.gateway()))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    fn admin_state(&self) -> AdminState {
        AdminState {
            listener: self.config.listener.clone(),
            index: self.config.index.clone(),
            mappings: self.mappings.clone(),
            statistics: self.statistics.clone(),
            api_key: self.config.admin.api_key.clone(),
        }
    }

    /// Serve until `shutdown` fires, applying mapping updates as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            index_enabled = self.config.index.enabled,
            index_path = %self.config.index.path,
            mappings = self.mappings.load().len(),
            "Gateway starting"
        );

        let mappings = self.mappings.clone();
        let current_listener = self.config.listener.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                if config.listener.bind_address() != current_listener.bind_address() {
                    tracing::warn!("Listener changes require a restart; applying mappings only");
                }
                let table = MappingTable::from_config(&config.mappings);
                metrics::record_mapping_entries(table.len());
                mappings.replace(table);
            }
        });

        if self.config.admin.enabled {
            let admin_addr = self.config.admin.bind_address.clone();
            let admin = setup_admin_router(self.admin_state());
            let mut admin_shutdown = shutdown.resubscribe();
            match TcpListener::bind(&admin_addr).await {
                Ok(admin_listener) => {
                    tracing::info!(address = %admin_addr, "Management API listening");
                    tokio::spawn(async move {
                        let served = axum::serve(admin_listener, admin)
                            .with_graceful_shutdown(async move {
                                let _ = admin_shutdown.recv().await;
                            })
                            .await;
                        if let Err(e) = served {
                            tracing::error!(error = %e, "Management API failed");
                        }
                    });
                }
                Err(e) => tracing::error!(address = %admin_addr, error = %e, "Failed to bind management API"),
            }
        }

        let app = self.router();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Every path goes through the gateway front door.
async fn gateway_handler(State(gateway): State<Arc<Gateway>>, request: Request<Body>) -> Response {
    gateway.handle(request).await
}
