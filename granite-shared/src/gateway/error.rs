/// Gateway error type
///
/// The gateway reports failures as a status plus a JSON body carrying a
/// `code` and a human-readable message. Two codes are expected and handled
/// specially by callers:
///
/// - `PGRST116`: a single-row read matched zero rows ([`GatewayError::NotFound`])
///   or several ([`GatewayError::MultipleRows`]); the body's `details` holds
///   the count
/// - `42501`: a row-level permission policy rejected the write
///   ([`GatewayError::PermissionDenied`])

use serde_json::Value as JsonValue;

/// Code returned when a single-row read does not match exactly one row
pub const NOT_FOUND_CODE: &str = "PGRST116";

/// Code returned when a row-level permission policy rejects a write
pub const PERMISSION_DENIED_CODE: &str = "42501";

/// Result alias for gateway calls
pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    /// Single-row read returned no rows
    #[error("No rows returned")]
    NotFound,

    /// Single-row read matched more than one row
    #[error("JSON object requested, multiple ({0}) rows returned")]
    MultipleRows(usize),

    /// Row-level permission denial
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Auth service rejection (bad credentials, unconfirmed email, ...)
    ///
    /// The message is the service's own wording and is rewritten for users by
    /// the auth flow.
    #[error("{0}")]
    Auth(String),

    /// Any other error reported by the gateway
    #[error("Gateway error {status}: {message}")]
    Remote {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// Network failure before a response was received
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response could not be decoded
    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Gateway error code, when one is known
    pub fn code(&self) -> Option<&str> {
        match self {
            GatewayError::NotFound | GatewayError::MultipleRows(_) => Some(NOT_FOUND_CODE),
            GatewayError::PermissionDenied(_) => Some(PERMISSION_DENIED_CODE),
            GatewayError::Remote { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound)
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, GatewayError::PermissionDenied(_))
    }

    /// Message field as reported by the gateway
    pub fn message(&self) -> String {
        match self {
            GatewayError::Remote { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Builds an error from a failed table (REST) response
    pub fn from_rest_response(status: u16, body: &str) -> Self {
        let parsed: Option<JsonValue> = serde_json::from_str(body).ok();
        let code = parsed
            .as_ref()
            .and_then(|v| v.get("code"))
            .and_then(|c| match c {
                JsonValue::String(s) => Some(s.clone()),
                JsonValue::Number(n) => Some(n.to_string()),
                _ => None,
            });
        let message = parsed
            .as_ref()
            .and_then(|v| v.get("message"))
            .and_then(JsonValue::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string());

        match code.as_deref() {
            Some(NOT_FOUND_CODE) => match parsed.as_ref().and_then(row_count) {
                Some(n) if n > 1 => GatewayError::MultipleRows(n),
                _ => GatewayError::NotFound,
            },
            Some(PERMISSION_DENIED_CODE) => GatewayError::PermissionDenied(message),
            _ => GatewayError::Remote {
                status,
                code,
                message,
            },
        }
    }

    /// Builds an error from a failed auth-service response
    ///
    /// The auth service uses `msg`, `error_description` or `message` for the
    /// human-readable text depending on the endpoint.
    pub fn from_auth_response(status: u16, body: &str) -> Self {
        let parsed: Option<JsonValue> = serde_json::from_str(body).ok();
        let message = parsed.as_ref().and_then(|v| {
            ["msg", "error_description", "message", "error"]
                .iter()
                .find_map(|key| v.get(*key).and_then(JsonValue::as_str))
                .map(str::to_string)
        });

        match message {
            Some(message) if (400..500).contains(&status) => GatewayError::Auth(message),
            Some(message) => GatewayError::Remote {
                status,
                code: None,
                message,
            },
            None => GatewayError::Remote {
                status,
                code: None,
                message: body.to_string(),
            },
        }
    }
}

/// Row count from a `PGRST116` body, e.g. "The result contains 2 rows"
fn row_count(body: &JsonValue) -> Option<usize> {
    let details = body.get("details")?.as_str()?;
    details
        .split_whitespace()
        .find_map(|word| word.parse::<usize>().ok())
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Decode(err.to_string())
    }
}
