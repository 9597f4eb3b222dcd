//! Health check endpoint for probes and monitoring.

use axum::{Json, extract::State};
use serde::Serialize;

use crate::AppState;

/// Health status response.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    /// Overall status, `"healthy"` once the bridge is serving.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
    /// The SSO service this bridge fronts.
    pub sso_url: String,
}

#[tracing::instrument(name = "health.check", skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        sso_url: state.config.sso.url.clone(),
    })
}
