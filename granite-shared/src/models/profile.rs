/// User profile model
///
/// Profiles live in the gateway's `user_profiles` table and are keyed by the
/// identity id issued by the auth service, so a profile id can be used
/// directly as a task assignee.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE user_profiles (
///     id UUID PRIMARY KEY REFERENCES auth.users(id) ON DELETE CASCADE,
///     email TEXT NOT NULL,
///     first_name TEXT,
///     last_name TEXT,
///     company_name TEXT,
///     phone_number TEXT,
///     avatar_url TEXT,
///     organization_id UUID REFERENCES organizations(id)
/// );
/// ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::session::AuthUser;

/// Gateway table holding profile rows
pub const PROFILES_TABLE: &str = "user_profiles";

/// Profile row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Identity id (same as the auth user id)
    pub id: Uuid,

    /// Contact email
    pub email: String,

    #[serde(default)]
    pub first_name: Option<String>,

    #[serde(default)]
    pub last_name: Option<String>,

    #[serde(default)]
    pub company_name: Option<String>,

    #[serde(default)]
    pub phone_number: Option<String>,

    #[serde(default)]
    pub avatar_url: Option<String>,

    /// Organization the user belongs to, if any
    #[serde(default)]
    pub organization_id: Option<Uuid>,
}

impl UserProfile {
    /// Builds a profile view of an auth user from its sign-up metadata
    ///
    /// Used when the caller cannot list profiles (members only see themselves).
    pub fn from_auth_user(user: &AuthUser) -> Self {
        Self {
            id: user.id,
            email: user.email.clone().unwrap_or_default(),
            first_name: user.user_metadata.first_name.clone(),
            last_name: user.user_metadata.last_name.clone(),
            company_name: user.user_metadata.company.clone(),
            phone_number: user.user_metadata.phone.clone(),
            avatar_url: user.user_metadata.avatar_url.clone(),
            organization_id: None,
        }
    }

    /// "First Last" when a first name is known
    pub fn full_name(&self) -> Option<String> {
        let first = self.first_name.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        match self.last_name.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(last) => Some(format!("{} {}", first, last)),
            None => Some(first.to_string()),
        }
    }
}

/// Input for creating a profile after sign-up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProfile {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub company_name: String,
    pub phone_number: String,
}

/// True when the part after `@` has a dot with text on both sides
///
/// Format checks from `validator` accept single-label hosts such as
/// `localhost`; sign-up, sign-in and assignment all require a dotted domain.
pub fn has_dotted_domain(email: &str) -> bool {
    let Some((local, domain)) = email.trim().rsplit_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain
            .char_indices()
            .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}
