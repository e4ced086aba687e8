/// Authentication endpoints
///
/// Thin HTTP wrappers around [`AuthFlow`]. Browser sessions are carried in
/// the `granite_session` cookie; API callers can use the returned access
/// token as a bearer token instead.
///
/// # Endpoints
///
/// - `POST /v1/auth/sign-in` - Sign in with email and password
/// - `POST /v1/auth/sign-up` - Register and set up the profile
/// - `POST /v1/auth/sign-out` - End the session
/// - `POST /v1/auth/password-reset` - Send a reset link
/// - `GET /v1/auth/oauth/:provider` - Redirect to a social provider
/// - `GET /v1/auth/session` - Current caller (signed in)
///
/// [`AuthFlow`]: granite_shared::auth::flow::AuthFlow

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::session::{cleared_session_cookie, session_cookie},
    routes::MessageResponse,
};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use granite_shared::{
    auth::{
        flow::{
            FlowResult, PendingProfile, Provider, SignInForm, SignUpForm, SignUpOutcome,
            PROFILE_CREATED_NOTICE,
        },
        guard::{AUTH_ROUTE, DEFAULT_ROUTE},
        resolver::{Caller, RoleResolver},
    },
    client::Client,
    models::{profile::UserProfile, role::Role, session::Session},
};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use uuid::Uuid;

/// Signed-in session
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user_id: Uuid,
    pub email: Option<String>,

    /// Greeting name (first name, email local part, or "User")
    pub name: String,

    pub role: Role,

    /// Bearer token for API callers
    pub access_token: String,

    pub expires_at: Option<DateTime<Utc>>,

    /// Where the browser goes next
    pub redirect: &'static str,
}

impl SessionResponse {
    fn new(session: &Session, role: Role) -> Self {
        Self {
            user_id: session.user_id(),
            email: session.user.email.clone(),
            name: session.user.greeting_name(),
            role,
            access_token: session.access_token.clone(),
            expires_at: session.expires_at,
            redirect: DEFAULT_ROUTE,
        }
    }
}

/// Sign-up result
#[derive(Debug, Serialize)]
pub struct SignUpResponse {
    pub user_id: Uuid,

    /// Status line for the user
    pub notice: &'static str,

    /// False when the email must be confirmed before signing in
    pub session_issued: bool,

    pub profile_created: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

/// Password reset request
#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    #[serde(default)]
    pub email: String,
}

/// Current caller
#[derive(Debug, Serialize)]
pub struct CallerResponse {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub name: String,
    pub role: Role,
    pub badge: &'static str,
}

/// Sign in with email and password
///
/// Also writes a missing profile (for accounts that confirmed their email
/// after signing up) and makes sure the caller has a role row.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Form validation failed
/// - `401 Unauthorized`: Rejected by the auth service (message is user-facing)
pub async fn sign_in(
    State(state): State<AppState>,
    Json(form): Json<SignInForm>,
) -> ApiResult<Response> {
    let flow = state.auth_flow(state.anonymous_client());
    let session = flow.sign_in(&form).await?;

    if let Err(err) = flow.ensure_profile(&session.user).await {
        tracing::warn!(user_id = %session.user_id(), error = %err, "Profile check failed at sign-in");
    }
    let role = RoleResolver::new(flow.client()).ensure_role(session.user_id()).await;

    tracing::info!(user_id = %session.user_id(), role = %role, "User signed in");

    let cookie = session_cookie(&session.access_token, state.config.server.production);
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(SessionResponse::new(&session, role)),
    )
        .into_response())
}

/// Register a new account
///
/// When the backend issues a session right away, the profile and default
/// role are written before responding. The setup is cancelled if the client
/// goes away; it is then redone at the next sign-in.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Form validation failed
/// - `401 Unauthorized`: Rejected by the auth service (e.g. already registered)
pub async fn sign_up(
    State(state): State<AppState>,
    Json(form): Json<SignUpForm>,
) -> ApiResult<Response> {
    let flow = state.auth_flow(state.anonymous_client());
    let SignUpOutcome {
        user,
        session_issued,
        mut notice,
        pending,
    } = flow.sign_up(&form).await?;

    let mut profile_created = false;
    if let (true, Some(pending)) = (session_issued, pending) {
        // Dropping the request drops the guard, which stops the setup task
        let (setup, _guard) = spawn_profile_setup(pending);

        match setup.await {
            Ok(Ok(_)) => {
                notice = PROFILE_CREATED_NOTICE;
                profile_created = true;
            }
            Ok(Err(err)) => {
                tracing::warn!(user_id = %user.id, error = %err, "Profile setup deferred to next sign-in");
            }
            Err(err) => {
                tracing::error!(user_id = %user.id, error = %err, "Profile setup task failed");
            }
        }
    }

    let session = flow.client().get_session().await;
    let body = Json(SignUpResponse {
        user_id: user.id,
        notice,
        session_issued,
        profile_created,
        access_token: session.as_ref().map(|s| s.access_token.clone()),
    });

    Ok(match session {
        Some(session) => {
            let cookie = session_cookie(&session.access_token, state.config.server.production);
            (StatusCode::CREATED, [(header::SET_COOKIE, cookie)], body).into_response()
        }
        None => (StatusCode::CREATED, body).into_response(),
    })
}

/// Runs profile setup on its own task
///
/// The task is cancelled when the returned guard is dropped.
fn spawn_profile_setup(
    pending: PendingProfile,
) -> (JoinHandle<FlowResult<UserProfile>>, DropGuard) {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let setup = tokio::spawn(async move { pending.complete(&token).await });
    (setup, cancel.drop_guard())
}

/// End the current session
///
/// Always clears the cookie; a gateway failure is only logged.
pub async fn sign_out(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
) -> Response {
    if let Err(err) = state.auth_flow(client).sign_out().await {
        tracing::warn!(error = %err, "Sign-out did not reach the gateway");
    }

    (
        [(header::SET_COOKIE, cleared_session_cookie())],
        Json(serde_json::json!({ "message": "Signed out", "redirect": AUTH_ROUTE })),
    )
        .into_response()
}

/// Send a password reset link
pub async fn password_reset(
    State(state): State<AppState>,
    Json(req): Json<PasswordResetRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let notice = state
        .auth_flow(state.anonymous_client())
        .request_password_reset(req.email.trim())
        .await?;
    Ok(Json(MessageResponse::new(notice)))
}

/// Redirect to a social provider's sign-in page
///
/// # Errors
///
/// - `400 Bad Request`: Unknown provider
pub async fn oauth_redirect(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> ApiResult<Redirect> {
    let provider: Provider = provider.parse().map_err(ApiError::BadRequest)?;
    let url = state.auth_flow(state.anonymous_client()).social_sign_in(provider);
    Ok(Redirect::to(&url))
}

/// Current caller and role
pub async fn current_session(Extension(caller): Extension<Caller>) -> Json<CallerResponse> {
    let user = &caller.session.user;
    Json(CallerResponse {
        user_id: user.id,
        email: user.email.clone(),
        name: user.greeting_name(),
        role: caller.role,
        badge: caller.role.badge(),
    })
}
