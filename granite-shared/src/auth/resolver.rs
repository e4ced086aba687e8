/// Session/role resolver
///
/// Turns "whoever holds this client" into a [`Resolution`]: either nobody, or
/// a session plus exactly one [`Role`].
///
/// Role lookup fails open to the least privileged role:
///
/// | role row lookup         | outcome                                        |
/// |-------------------------|------------------------------------------------|
/// | row present             | stored role (unknown strings → `member`)       |
/// | not found               | insert `member` row (failure only logged) → `member` |
/// | several rows            | logged → `member`, nothing inserted            |
/// | any other error         | logged → `member`                              |

use uuid::Uuid;

use crate::client::Client;
use crate::gateway::{GatewayResult, Query};
use crate::models::{
    role::{Role, RoleAssignment, ROLES_TABLE},
    session::Session,
};

/// Caller identity after resolution
#[derive(Debug, Clone, PartialEq)]
pub struct Caller {
    pub session: Session,
    pub role: Role,
}

impl Caller {
    pub fn user_id(&self) -> Uuid {
        self.session.user_id()
    }
}

/// Result of resolving the current session
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// No session; send the caller to the auth entry point
    Unauthenticated,

    /// Session with its role
    Authenticated(Caller),
}

impl Resolution {
    pub fn caller(&self) -> Option<&Caller> {
        match self {
            Resolution::Authenticated(caller) => Some(caller),
            Resolution::Unauthenticated => None,
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.caller().map(|c| c.role)
    }
}

/// Resolves session and role for a client
pub struct RoleResolver<'a> {
    client: &'a Client,
}

impl<'a> RoleResolver<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Fetches the session and, if present, the caller's role
    pub async fn resolve(&self) -> Resolution {
        let Some(session) = self.client.get_session().await else {
            tracing::debug!("No session, caller is unauthenticated");
            return Resolution::Unauthenticated;
        };

        let role = self.ensure_role(session.user_id()).await;
        Resolution::Authenticated(Caller { session, role })
    }

    /// Looks up the role row, creating a `member` row when none exists
    pub async fn ensure_role(&self, user_id: Uuid) -> Role {
        let query = Query::new().columns("user_id,role").eq("user_id", user_id);
        match self
            .client
            .from(ROLES_TABLE)
            .single::<RoleAssignment>(&query)
            .await
        {
            Ok(row) => row.role(),
            Err(err) if err.is_not_found() => {
                tracing::info!(user_id = %user_id, "No role row, assigning default member role");
                if let Err(err) = assign_role(self.client, user_id, Role::Member).await {
                    tracing::warn!(
                        user_id = %user_id,
                        error = %err,
                        "Failed to create default role row"
                    );
                }
                Role::Member
            }
            Err(err) => {
                tracing::error!(
                    user_id = %user_id,
                    error = %err,
                    "Role fetch failed, defaulting to member"
                );
                Role::Member
            }
        }
    }
}

/// Inserts a role row for a user
pub async fn assign_role(client: &Client, user_id: Uuid, role: Role) -> GatewayResult<()> {
    tracing::debug!(user_id = %user_id, role = %role, "Assigning role");
    client
        .from(ROLES_TABLE)
        .insert_only(&RoleAssignment::new(user_id, role))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{
        memory::{MemoryGateway, TableOp},
        GatewayError,
    };
    use std::sync::Arc;

    async fn signed_in(gateway: &Arc<MemoryGateway>, role: Option<Role>) -> Client {
        let user = gateway.add_user("someone@example.com", "password123", role).await;
        let session = gateway.session_for(&user).await;
        Client::restore(gateway.clone(), &session.access_token).await.unwrap()
    }

    #[tokio::test]
    async fn test_no_session_is_unauthenticated() {
        let gateway = Arc::new(MemoryGateway::new());
        let client = Client::new(gateway);
        assert_eq!(RoleResolver::new(&client).resolve().await, Resolution::Unauthenticated);
    }

    #[tokio::test]
    async fn test_existing_role_is_used() {
        let gateway = Arc::new(MemoryGateway::new());
        let client = signed_in(&gateway, Some(Role::SystemAdmin)).await;
        assert_eq!(RoleResolver::new(&client).resolve().await.role(), Some(Role::SystemAdmin));
    }

    #[tokio::test]
    async fn test_missing_role_inserts_member_row() {
        let gateway = Arc::new(MemoryGateway::new());
        let client = signed_in(&gateway, None).await;

        let resolution = RoleResolver::new(&client).resolve().await;
        assert_eq!(resolution.role(), Some(Role::Member));

        let rows = gateway.rows(ROLES_TABLE).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["role"], "member");
        assert_eq!(rows[0]["user_id"], resolution.caller().unwrap().user_id().to_string());
    }

    #[tokio::test]
    async fn test_failed_default_insert_still_resolves_member() {
        let gateway = Arc::new(MemoryGateway::new());
        let client = signed_in(&gateway, None).await;
        gateway
            .fail_next(ROLES_TABLE, TableOp::Insert, GatewayError::PermissionDenied("rls".into()))
            .await;

        assert_eq!(RoleResolver::new(&client).resolve().await.role(), Some(Role::Member));
        assert!(gateway.rows(ROLES_TABLE).await.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_error_fails_open_to_member() {
        let gateway = Arc::new(MemoryGateway::new());
        let client = signed_in(&gateway, Some(Role::OrgAdmin)).await;
        gateway
            .fail_next(
                ROLES_TABLE,
                TableOp::Select,
                GatewayError::Transport("connection reset".into()),
            )
            .await;

        assert_eq!(RoleResolver::new(&client).resolve().await.role(), Some(Role::Member));
        // The existing row is untouched
        assert_eq!(gateway.rows(ROLES_TABLE).await.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_stored_role_is_member() {
        let gateway = Arc::new(MemoryGateway::new());
        let client = signed_in(&gateway, None).await;
        let user_id = client.get_session().await.unwrap().user_id();
        gateway
            .seed(ROLES_TABLE, serde_json::json!({ "user_id": user_id, "role": "superuser" }))
            .await;

        assert_eq!(RoleResolver::new(&client).resolve().await.role(), Some(Role::Member));
    }

    #[tokio::test]
    async fn test_duplicate_role_rows_resolve_member_without_insert() {
        let gateway = Arc::new(MemoryGateway::new());
        let client = signed_in(&gateway, Some(Role::OrgAdmin)).await;
        let user_id = client.get_session().await.unwrap().user_id();
        gateway
            .seed(ROLES_TABLE, serde_json::json!({ "user_id": user_id, "role": "system_admin" }))
            .await;

        for _ in 0..2 {
            assert_eq!(RoleResolver::new(&client).resolve().await.role(), Some(Role::Member));
        }
        assert_eq!(gateway.rows(ROLES_TABLE).await.len(), 2);
    }
}
