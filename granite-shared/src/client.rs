/// Session-scoped gateway client
///
/// A [`Client`] pairs the shared gateway with one caller's cached session.
/// Auth operations keep the cache current and emit auth events; table access
/// goes through [`Client::from`], which attaches the caller's access token and
/// decodes rows into typed models.
///
/// # Example
///
/// ```
/// use granite_shared::client::Client;
/// use granite_shared::gateway::{memory::MemoryGateway, Query};
/// use granite_shared::models::task::{Task, TASKS_TABLE};
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let gateway = Arc::new(MemoryGateway::new());
/// gateway.add_user("ada@example.com", "password123", None).await;
///
/// let client = Client::new(gateway);
/// client.sign_in_with_password("ada@example.com", "password123").await?;
///
/// let tasks: Vec<Task> = client.from(TASKS_TABLE).select(&Query::new()).await?;
/// assert!(tasks.is_empty());
/// # Ok(())
/// # }
/// ```

use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

use crate::auth::session::{AuthSubscription, SessionStore};
use crate::gateway::{
    AuthGateway, Gateway, GatewayError, GatewayResult, Query, SignUpRequest, SignUpResponse,
    TableGateway,
};
use crate::models::session::Session;

/// Gateway client bound to one caller's session
#[derive(Clone)]
pub struct Client {
    gateway: Arc<dyn Gateway>,
    session: Arc<SessionStore>,
}

impl Client {
    /// Creates a client with no session
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            session: Arc::new(SessionStore::new()),
        }
    }

    /// Restores a client from a previously issued access token
    ///
    /// The token is validated against the gateway. An unknown or expired
    /// token yields a client without a session, not an error.
    pub async fn restore(gateway: Arc<dyn Gateway>, access_token: &str) -> GatewayResult<Self> {
        let session = gateway.get_user(access_token).await?.map(|user| Session {
            access_token: access_token.to_string(),
            refresh_token: None,
            expires_at: None,
            user,
        });

        Ok(Self {
            gateway,
            session: Arc::new(SessionStore::restored(session)),
        })
    }

    /// Underlying gateway
    pub fn gateway(&self) -> &Arc<dyn Gateway> {
        &self.gateway
    }

    /// Current cached session
    pub async fn get_session(&self) -> Option<Session> {
        self.session.get().await
    }

    /// Subscribes to session changes for the lifetime of the returned handle
    pub fn on_auth_state_change(&self) -> AuthSubscription {
        self.session.subscribe()
    }

    /// Signs in and caches the session
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> GatewayResult<Session> {
        let session = self.gateway.sign_in_with_password(email, password).await?;
        self.session.set(session.clone()).await;
        Ok(session)
    }

    /// Registers an identity; caches the session when one is issued
    pub async fn sign_up(&self, request: &SignUpRequest) -> GatewayResult<SignUpResponse> {
        let response = self.gateway.sign_up(request).await?;
        if let Some(session) = &response.session {
            self.session.set(session.clone()).await;
        }
        Ok(response)
    }

    /// Revokes the session at the gateway and clears the cache
    ///
    /// The local cache is cleared even when the gateway call fails.
    pub async fn sign_out(&self) -> GatewayResult<()> {
        let result = match self.session.get().await {
            Some(session) => self.gateway.sign_out(&session.access_token).await,
            None => Ok(()),
        };
        self.session.clear().await;
        result
    }

    /// Dispatches a password reset email
    pub async fn reset_password_for_email(&self, email: &str, redirect_to: &str) -> GatewayResult<()> {
        self.gateway.reset_password_for_email(email, redirect_to).await
    }

    /// Provider redirect URL for social sign-in
    pub fn authorize_url(&self, provider: &str, redirect_to: &str) -> String {
        self.gateway.authorize_url(provider, redirect_to)
    }

    /// Typed access to one table
    pub fn from(&self, table: &'static str) -> TableRef<'_> {
        TableRef { client: self, table }
    }

    async fn access_token(&self) -> Option<String> {
        self.session.get().await.map(|s| s.access_token)
    }
}

/// Typed table handle
pub struct TableRef<'a> {
    client: &'a Client,
    table: &'static str,
}

impl TableRef<'_> {
    /// All rows matching the query
    pub async fn select<T: DeserializeOwned>(&self, query: &Query) -> GatewayResult<Vec<T>> {
        let token = self.client.access_token().await;
        let rows = self
            .client
            .gateway
            .select(token.as_deref(), self.table, query)
            .await?;
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(GatewayError::from))
            .collect()
    }

    /// Exactly one row; [`GatewayError::NotFound`] when none matches
    pub async fn single<T: DeserializeOwned>(&self, query: &Query) -> GatewayResult<T> {
        let token = self.client.access_token().await;
        let row = self
            .client
            .gateway
            .select_single(token.as_deref(), self.table, query)
            .await?;
        Ok(serde_json::from_value(row)?)
    }

    /// Zero or one row
    pub async fn maybe_single<T: DeserializeOwned>(&self, query: &Query) -> GatewayResult<Option<T>> {
        match self.single(query).await {
            Ok(row) => Ok(Some(row)),
            Err(GatewayError::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Inserts one row and returns it as stored
    pub async fn insert<I: Serialize, T: DeserializeOwned>(&self, row: &I) -> GatewayResult<T> {
        let token = self.client.access_token().await;
        let mut stored = self
            .client
            .gateway
            .insert(token.as_deref(), self.table, vec![serde_json::to_value(row)?])
            .await?;
        if stored.is_empty() {
            return Err(GatewayError::Decode(format!(
                "Insert into {} returned no rows",
                self.table
            )));
        }
        Ok(serde_json::from_value(stored.remove(0))?)
    }

    /// Inserts one row, discarding the stored representation
    pub async fn insert_only<I: Serialize>(&self, row: &I) -> GatewayResult<()> {
        let token = self.client.access_token().await;
        self.client
            .gateway
            .insert(token.as_deref(), self.table, vec![serde_json::to_value(row)?])
            .await
            .map(|_| ())
    }

    /// Applies `fields` to matching rows and returns them as stored
    pub async fn update<I: Serialize, T: DeserializeOwned>(
        &self,
        fields: &I,
        query: &Query,
    ) -> GatewayResult<Vec<T>> {
        let token = self.client.access_token().await;
        let rows = self
            .client
            .gateway
            .update(token.as_deref(), self.table, serde_json::to_value(fields)?, query)
            .await?;
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(GatewayError::from))
            .collect()
    }

    /// Deletes matching rows
    pub async fn delete(&self, query: &Query) -> GatewayResult<()> {
        let token = self.client.access_token().await;
        self.client
            .gateway
            .delete(token.as_deref(), self.table, query)
            .await
    }
}
