/// Route handlers
///
/// - `health`: Health check endpoint
/// - `views`: Page view models (landing, auth, dashboard pages)
/// - `auth`: Sign-in, sign-up, sign-out, password reset, social sign-in
/// - `tasks`: Task workflow endpoints
/// - `invitations`: Invitation stub
/// - `theme`: Dark-mode preference

pub mod auth;
pub mod health;
pub mod invitations;
pub mod tasks;
pub mod theme;
pub mod views;

use serde::{Deserialize, Serialize};

/// Single user-facing message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
