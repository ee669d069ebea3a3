//! Gateway error taxonomy.
//!
//! Every variant ends in a terminal local response. Detail goes to logs and
//! call statistics; the caller only sees a short reason.

use std::time::Duration;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// No prefix matched, or every matching group was empty.
    #[error("No route for path '{path}'. Known prefixes: [{}]", prefixes.join(", "))]
    NoRoute { path: String, prefixes: Vec<String> },

    #[error("invalid service url `{url}`: {reason}")]
    InvalidServiceUrl { url: String, reason: String },

    #[error("backend request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("backend did not respond within {0:?}")]
    UpstreamTimeout(Duration),

    #[error("failed to build backend request: {0}")]
    Request(#[from] axum::http::Error),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::NoRoute { .. } => StatusCode::NOT_FOUND,
            GatewayError::InvalidServiceUrl { .. } | GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            GatewayError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Request(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::NoRoute { .. } => "no_route",
            GatewayError::InvalidServiceUrl { .. } => "invalid_target",
            GatewayError::Upstream(_) => "unreachable",
            GatewayError::UpstreamTimeout(_) => "timeout",
            GatewayError::Request(_) => "internal",
        }
    }

    /// No-route is a normal outcome, not a failure sample.
    pub fn is_failure(&self) -> bool {
        !matches!(self, GatewayError::NoRoute { .. })
    }

    /// Body text shown to the caller.
    pub fn public_message(&self) -> String {
        match self {
            GatewayError::NoRoute { .. } => self.to_string(),
            GatewayError::InvalidServiceUrl { .. } => "Bad gateway: invalid backend address".to_string(),
            GatewayError::Upstream(_) => "Bad gateway: backend unreachable".to_string(),
            GatewayError::UpstreamTimeout(_) => "Gateway timeout".to_string(),
            GatewayError::Request(_) => "Internal gateway error".to_string(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), self.public_message()).into_response()
    }
}
