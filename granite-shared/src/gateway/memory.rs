/// In-memory gateway
///
/// An in-process stand-in for the hosted backend, used by the test suites
/// and for local demos. It keeps identities, tokens and tables in memory and
/// applies the same filter/order semantics as the REST dialect.
///
/// Row-level policies are not modelled. Instead, failures can be scripted per
/// table and operation with [`MemoryGateway::fail_next`], which is how tests
/// reproduce permission denials and transient errors.
///
/// # Example
///
/// ```
/// use granite_shared::gateway::{memory::MemoryGateway, AuthGateway};
/// use granite_shared::models::role::Role;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let gateway = MemoryGateway::new();
/// let user = gateway.add_user("ada@example.com", "password123", Some(Role::OrgAdmin)).await;
/// let session = gateway.sign_in_with_password("ada@example.com", "password123").await.unwrap();
/// assert_eq!(session.user.id, user.id);
/// # }
/// ```

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value as JsonValue};
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    AuthGateway, GatewayError, GatewayResult, Query, SignUpRequest, SignUpResponse, TableGateway,
};
use crate::models::{
    profile::PROFILES_TABLE,
    role::{Role, RoleAssignment, ROLES_TABLE},
    session::{AuthUser, Session, UserMetadata},
    task::TASKS_TABLE,
};

/// Table operation, used to script failures and inspect calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableOp {
    Select,
    Insert,
    Update,
    Delete,
}

/// Recorded gateway call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SignIn(String),
    SignUp(String),
    GetUser,
    SignOut,
    ResetPassword(String),
    Table(TableOp, String),
}

#[derive(Debug, Clone)]
struct Account {
    password: String,
    user: AuthUser,
    confirmed: bool,
}

#[derive(Default)]
struct State {
    accounts: HashMap<String, Account>,
    tokens: HashMap<String, Uuid>,
    tables: HashMap<String, Vec<JsonValue>>,
    failures: HashMap<(String, TableOp), VecDeque<GatewayError>>,
    calls: Vec<Call>,
}

/// In-memory gateway
#[derive(Default)]
pub struct MemoryGateway {
    state: Mutex<State>,
    require_confirmation: bool,
}

impl MemoryGateway {
    /// Creates an empty gateway that issues sessions immediately on sign-up
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a gateway whose sign-ups wait for email confirmation
    pub fn with_email_confirmation() -> Self {
        Self {
            state: Mutex::new(State::default()),
            require_confirmation: true,
        }
    }

    /// Registers a confirmed identity with a profile and optional role row
    pub async fn add_user(&self, email: &str, password: &str, role: Option<Role>) -> AuthUser {
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
            user_metadata: UserMetadata::default(),
        };

        let mut state = self.state.lock().await;
        state.accounts.insert(
            email.to_lowercase(),
            Account {
                password: password.to_string(),
                user: user.clone(),
                confirmed: true,
            },
        );
        state
            .tables
            .entry(PROFILES_TABLE.to_string())
            .or_default()
            .push(json!({ "id": user.id, "email": email }));
        if let Some(role) = role {
            state
                .tables
                .entry(ROLES_TABLE.to_string())
                .or_default()
                .push(json!(RoleAssignment::new(user.id, role)));
        }

        user
    }

    /// Issues a session for an existing identity without a password check
    pub async fn session_for(&self, user: &AuthUser) -> Session {
        let mut state = self.state.lock().await;
        issue_session(&mut state, user.clone())
    }

    /// Inserts a raw row
    pub async fn seed(&self, table: &str, row: JsonValue) {
        let mut state = self.state.lock().await;
        let row = with_defaults(table, row);
        state.tables.entry(table.to_string()).or_default().push(row);
    }

    /// Raw rows of a table
    pub async fn rows(&self, table: &str) -> Vec<JsonValue> {
        let state = self.state.lock().await;
        state.tables.get(table).cloned().unwrap_or_default()
    }

    /// Fails the next `op` on `table` with `error`
    ///
    /// Failures queue up; each call consumes one.
    pub async fn fail_next(&self, table: &str, op: TableOp, error: GatewayError) {
        let mut state = self.state.lock().await;
        state
            .failures
            .entry((table.to_string(), op))
            .or_default()
            .push_back(error);
    }

    /// Calls received so far
    pub async fn calls(&self) -> Vec<Call> {
        self.state.lock().await.calls.clone()
    }

    /// Marks an identity's email as confirmed
    pub async fn confirm_email(&self, email: &str) {
        let mut state = self.state.lock().await;
        if let Some(account) = state.accounts.get_mut(&email.to_lowercase()) {
            account.confirmed = true;
        }
    }
}

fn issue_session(state: &mut State, user: AuthUser) -> Session {
    let token = format!("mem-{}", Uuid::new_v4());
    state.tokens.insert(token.clone(), user.id);
    Session {
        access_token: token,
        refresh_token: None,
        expires_at: Some(Utc::now() + chrono::Duration::hours(1)),
        user,
    }
}

fn take_failure(state: &mut State, table: &str, op: TableOp) -> Option<GatewayError> {
    state.calls.push(Call::Table(op, table.to_string()));
    state
        .failures
        .get_mut(&(table.to_string(), op))
        .and_then(VecDeque::pop_front)
}

/// Server-side column defaults
fn with_defaults(table: &str, mut row: JsonValue) -> JsonValue {
    if let Some(object) = row.as_object_mut() {
        if table != ROLES_TABLE {
            object.entry("id").or_insert_with(|| json!(Uuid::new_v4()));
        }
        if table == TASKS_TABLE {
            let now = json!(Utc::now());
            object.entry("created_at").or_insert_with(|| now.clone());
            object.entry("updated_at").or_insert(now);
            object.entry("description").or_insert_with(|| json!(""));
        }
    }
    row
}

#[async_trait]
impl AuthGateway for MemoryGateway {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> GatewayResult<Session> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::SignIn(email.to_string()));

        let account = state
            .accounts
            .get(&email.to_lowercase())
            .filter(|a| a.password == password)
            .cloned()
            .ok_or_else(|| GatewayError::Auth("Invalid login credentials".to_string()))?;

        if !account.confirmed {
            return Err(GatewayError::Auth("Email not confirmed".to_string()));
        }

        Ok(issue_session(&mut state, account.user))
    }

    async fn sign_up(&self, request: &SignUpRequest) -> GatewayResult<SignUpResponse> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::SignUp(request.email.clone()));

        let key = request.email.to_lowercase();
        if state.accounts.contains_key(&key) {
            return Err(GatewayError::Auth("User already registered".to_string()));
        }

        let user = AuthUser {
            id: Uuid::new_v4(),
            email: Some(request.email.clone()),
            user_metadata: request.metadata.clone(),
        };
        state.accounts.insert(
            key,
            Account {
                password: request.password.clone(),
                user: user.clone(),
                confirmed: !self.require_confirmation,
            },
        );

        let session = if self.require_confirmation {
            None
        } else {
            Some(issue_session(&mut state, user.clone()))
        };

        Ok(SignUpResponse {
            user: Some(user),
            session,
        })
    }

    async fn get_user(&self, access_token: &str) -> GatewayResult<Option<AuthUser>> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::GetUser);

        let Some(user_id) = state.tokens.get(access_token).copied() else {
            return Ok(None);
        };
        Ok(state
            .accounts
            .values()
            .find(|a| a.user.id == user_id)
            .map(|a| a.user.clone()))
    }

    async fn sign_out(&self, access_token: &str) -> GatewayResult<()> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::SignOut);
        state.tokens.remove(access_token);
        Ok(())
    }

    async fn reset_password_for_email(&self, email: &str, _redirect_to: &str) -> GatewayResult<()> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::ResetPassword(email.to_string()));
        Ok(())
    }

    fn authorize_url(&self, provider: &str, redirect_to: &str) -> String {
        format!("memory://authorize?provider={}&redirect_to={}", provider, redirect_to)
    }

    async fn health(&self) -> GatewayResult<()> {
        Ok(())
    }
}

#[async_trait]
impl TableGateway for MemoryGateway {
    async fn select(
        &self,
        _access_token: Option<&str>,
        table: &str,
        query: &Query,
    ) -> GatewayResult<Vec<JsonValue>> {
        let mut state = self.state.lock().await;
        if let Some(err) = take_failure(&mut state, table, TableOp::Select) {
            return Err(err);
        }

        let mut rows: Vec<JsonValue> = state
            .tables
            .get(table)
            .map(|rows| rows.iter().filter(|r| query.matches(r)).cloned().collect())
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| order.compare(a, b));
        }

        Ok(rows)
    }

    async fn select_single(
        &self,
        access_token: Option<&str>,
        table: &str,
        query: &Query,
    ) -> GatewayResult<JsonValue> {
        let mut rows = self.select(access_token, table, query).await?;
        match rows.len() {
            1 => Ok(rows.remove(0)),
            0 => Err(GatewayError::NotFound),
            n => Err(GatewayError::MultipleRows(n)),
        }
    }

    async fn insert(
        &self,
        _access_token: Option<&str>,
        table: &str,
        rows: Vec<JsonValue>,
    ) -> GatewayResult<Vec<JsonValue>> {
        let mut state = self.state.lock().await;
        if let Some(err) = take_failure(&mut state, table, TableOp::Insert) {
            return Err(err);
        }

        let stored: Vec<JsonValue> = rows.into_iter().map(|r| with_defaults(table, r)).collect();
        state
            .tables
            .entry(table.to_string())
            .or_default()
            .extend(stored.iter().cloned());
        Ok(stored)
    }

    async fn update(
        &self,
        _access_token: Option<&str>,
        table: &str,
        fields: JsonValue,
        query: &Query,
    ) -> GatewayResult<Vec<JsonValue>> {
        let mut state = self.state.lock().await;
        if let Some(err) = take_failure(&mut state, table, TableOp::Update) {
            return Err(err);
        }

        let Some(changes) = fields.as_object() else {
            return Err(GatewayError::Remote {
                status: 400,
                code: None,
                message: "Update body must be an object".to_string(),
            });
        };

        let mut updated = Vec::new();
        if let Some(rows) = state.tables.get_mut(table) {
            for row in rows.iter_mut().filter(|r| query.matches(r)) {
                if let Some(object) = row.as_object_mut() {
                    for (key, value) in changes {
                        object.insert(key.clone(), value.clone());
                    }
                }
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn delete(&self, _access_token: Option<&str>, table: &str, query: &Query) -> GatewayResult<()> {
        let mut state = self.state.lock().await;
        if let Some(err) = take_failure(&mut state, table, TableOp::Delete) {
            return Err(err);
        }

        if let Some(rows) = state.tables.get_mut(table) {
            rows.retain(|r| !query.matches(r));
        }
        Ok(())
    }
}
