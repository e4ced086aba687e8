/// Remote data/auth gateway
///
/// All persistence, identity and permission enforcement is delegated to a
/// hosted backend. This module defines the narrow surface the dashboard
/// consumes and two implementations of it:
///
/// - [`http::RestGateway`]: talks to the hosted backend over HTTP
/// - [`memory::MemoryGateway`]: in-process backend for tests and local demos
///
/// Table operations are untyped (`serde_json::Value` rows) so the traits stay
/// object safe; [`crate::client::Client`] layers typed access on top.
///
/// # Example
///
/// ```no_run
/// use granite_shared::gateway::{http::RestGateway, AuthGateway};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let gateway = RestGateway::new("https://project.example.co", "public-anon-key")?;
/// let session = gateway.sign_in_with_password("ada@example.com", "correct horse").await?;
/// println!("Signed in as {}", session.user.id);
/// # Ok(())
/// # }
/// ```

pub mod error;
pub mod http;
pub mod memory;
pub mod query;

pub use error::{GatewayError, GatewayResult, NOT_FOUND_CODE, PERMISSION_DENIED_CODE};
pub use query::{Direction, Filter, Order, Query};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::models::session::{AuthUser, Session, UserMetadata};

/// Sign-up request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,

    /// Stored on the identity as `user_metadata`
    pub metadata: UserMetadata,
}

/// Sign-up response
///
/// `session` is `None` when the backend requires email confirmation before
/// issuing a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpResponse {
    pub user: Option<AuthUser>,
    pub session: Option<Session>,
}

/// Identity operations
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Exchanges email and password for a session
    async fn sign_in_with_password(&self, email: &str, password: &str) -> GatewayResult<Session>;

    /// Registers a new identity
    async fn sign_up(&self, request: &SignUpRequest) -> GatewayResult<SignUpResponse>;

    /// Resolves the identity behind an access token
    ///
    /// Returns `Ok(None)` when the token is unknown or expired.
    async fn get_user(&self, access_token: &str) -> GatewayResult<Option<AuthUser>>;

    /// Revokes the session behind an access token
    async fn sign_out(&self, access_token: &str) -> GatewayResult<()>;

    /// Dispatches a password reset email
    async fn reset_password_for_email(&self, email: &str, redirect_to: &str) -> GatewayResult<()>;

    /// URL that starts the provider redirect flow for social sign-in
    fn authorize_url(&self, provider: &str, redirect_to: &str) -> String;

    /// Liveness probe
    async fn health(&self) -> GatewayResult<()>;
}

/// Table operations
///
/// `access_token` is the caller's session token; `None` means the anonymous
/// key is used and row-level policies see an anonymous caller.
#[async_trait]
pub trait TableGateway: Send + Sync {
    /// Selects every row matching the query
    async fn select(
        &self,
        access_token: Option<&str>,
        table: &str,
        query: &Query,
    ) -> GatewayResult<Vec<JsonValue>>;

    /// Selects exactly one row
    ///
    /// Returns [`GatewayError::NotFound`] when no row matches.
    async fn select_single(
        &self,
        access_token: Option<&str>,
        table: &str,
        query: &Query,
    ) -> GatewayResult<JsonValue>;

    /// Inserts rows and returns them as stored
    async fn insert(
        &self,
        access_token: Option<&str>,
        table: &str,
        rows: Vec<JsonValue>,
    ) -> GatewayResult<Vec<JsonValue>>;

    /// Updates matching rows and returns them as stored
    async fn update(
        &self,
        access_token: Option<&str>,
        table: &str,
        fields: JsonValue,
        query: &Query,
    ) -> GatewayResult<Vec<JsonValue>>;

    /// Deletes matching rows
    async fn delete(&self, access_token: Option<&str>, table: &str, query: &Query) -> GatewayResult<()>;
}

/// Full gateway surface
pub trait Gateway: AuthGateway + TableGateway {}

impl<T: AuthGateway + TableGateway> Gateway for T {}
