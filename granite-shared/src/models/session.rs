/// Session and identity types issued by the gateway's auth service
///
/// The gateway owns sessions; this crate only holds a read-only cached copy
/// (see [`crate::auth::session::SessionStore`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Profile metadata attached to the identity at sign-up
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Authenticated identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub user_metadata: UserMetadata,
}

impl AuthUser {
    /// Name used in greetings: first name, else the email local part, else "User"
    pub fn greeting_name(&self) -> String {
        if let Some(first) = self
            .user_metadata
            .first_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
        {
            return first.to_string();
        }

        self.email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .filter(|local| !local.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| "User".to_string())
    }
}

/// Issued session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token presented on every gateway call
    pub access_token: String,

    #[serde(default)]
    pub refresh_token: Option<String>,

    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,

    pub user: AuthUser,
}

impl Session {
    /// Caller identity
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(first: Option<&str>, email: Option<&str>) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: email.map(String::from),
            user_metadata: UserMetadata {
                first_name: first.map(String::from),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_greeting_name_precedence() {
        assert_eq!(user(Some("Grace"), Some("g@example.com")).greeting_name(), "Grace");
        assert_eq!(user(None, Some("grace.hopper@example.com")).greeting_name(), "grace.hopper");
        assert_eq!(user(None, None).greeting_name(), "User");
    }
}
