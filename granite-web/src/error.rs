/// Error handling for the web server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers should return `Result<T, ApiError>`; errors from the shared
/// library convert with `?`.
///
/// # Example
///
/// ```
/// use granite_web::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::json;
///
/// async fn handler(title: String) -> ApiResult<Json<serde_json::Value>> {
///     if title.is_empty() {
///         return Err(ApiError::BadRequest("Title is required".to_string()));
///     }
///     Ok(Json(json!({ "title": title })))
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use granite_shared::{
    auth::flow::FlowError,
    gateway::GatewayError,
    tasks::WorkflowError,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Unprocessable entity (422) - validation errors
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),

    /// Upstream gateway failure (502); the message is user-facing
    Upstream(String),

    /// Service unavailable (503)
    ServiceUnavailable(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::Upstream(msg) => write!(f, "Upstream error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, "bad_gateway", msg, None),
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg,
                None,
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Convert gateway errors to API errors
impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NotFound => ApiError::NotFound("Resource not found".to_string()),
            GatewayError::PermissionDenied(_) => {
                ApiError::Forbidden("Not authorized to access this resource".to_string())
            }
            GatewayError::Auth(msg) => ApiError::Unauthorized(msg),
            GatewayError::Transport(msg) => {
                tracing::warn!(error = %msg, "Gateway unreachable");
                ApiError::ServiceUnavailable("Backend is unreachable".to_string())
            }
            other => ApiError::InternalError(format!("Gateway error: {}", other)),
        }
    }
}

/// Convert auth flow errors to API errors
impl From<FlowError> for ApiError {
    fn from(err: FlowError) -> Self {
        match err {
            FlowError::Validation(fields) => ApiError::ValidationError(
                fields
                    .into_iter()
                    .map(|(field, message)| ValidationErrorDetail { field, message })
                    .collect(),
            ),
            FlowError::Auth(msg) => ApiError::Unauthorized(msg),
            FlowError::Gateway(err) => err.into(),
            FlowError::Cancelled => {
                ApiError::ServiceUnavailable("Request was cancelled".to_string())
            }
        }
    }
}

/// Convert task workflow errors to API errors
impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Validation(msg) => ApiError::BadRequest(msg),
            WorkflowError::NotAuthorized(msg) => ApiError::Forbidden(msg),
            WorkflowError::NotConfirmed => ApiError::BadRequest(err.to_string()),
            WorkflowError::Unauthenticated => ApiError::Unauthorized(err.to_string()),
            WorkflowError::NotFound => ApiError::NotFound(err.to_string()),
            WorkflowError::Remote { notice, source } if source.is_permission_denied() => {
                ApiError::Forbidden(notice.to_string())
            }
            WorkflowError::Remote { notice, .. } => ApiError::Upstream(notice.to_string()),
        }
    }
}
