/// Health check endpoint
///
/// Provides a simple health check endpoint that verifies:
/// - The server is running
/// - The hosted backend is reachable
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "gateway": "connected"
/// }
/// ```

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use granite_shared::gateway::AuthGateway;
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Application version
    pub version: String,

    /// Hosted backend status
    pub gateway: String,
}

/// Health check handler
///
/// Reports `degraded` rather than failing when the backend is down, so
/// load balancers can tell the two apart.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let gateway_status = match state.gateway.health().await {
        Ok(()) => "connected",
        Err(err) => {
            tracing::warn!(error = %err, "Gateway health probe failed");
            "disconnected"
        }
    };

    Ok(Json(HealthResponse {
        status: if gateway_status == "connected" {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        gateway: gateway_status.to_string(),
    }))
}
