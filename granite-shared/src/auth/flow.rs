/// Sign-in, sign-up and account recovery
///
/// [`AuthFlow`] validates form input, talks to the gateway through a
/// [`Client`], and rewrites well-known gateway messages into something a
/// person can act on.
///
/// Sign-up is two-phase. The identity is created immediately; the profile
/// row is written once the new session is established, because the row-level
/// policies on `user_profiles` only admit the owner. That second phase is a
/// [`PendingProfile`] the caller drives (and may cancel).
///
/// # Example
///
/// ```
/// use granite_shared::auth::flow::{AuthFlow, SignUpForm};
/// use granite_shared::client::Client;
/// use granite_shared::gateway::memory::MemoryGateway;
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Client::new(Arc::new(MemoryGateway::new()));
/// let flow = AuthFlow::new(client, "https://app.example.com");
///
/// let outcome = flow
///     .sign_up(&SignUpForm {
///         first_name: "Ada".into(),
///         last_name: "Lovelace".into(),
///         company: "Analytical Engines".into(),
///         phone: "555-0100".into(),
///         email: "ada@example.com".into(),
///         password: "password123".into(),
///         confirm_password: "password123".into(),
///     })
///     .await?;
/// assert!(outcome.session_issued);
///
/// if let Some(pending) = outcome.pending {
///     let profile = pending.complete(&CancellationToken::new()).await?;
///     assert_eq!(profile.first_name.as_deref(), Some("Ada"));
/// }
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tokio_util::sync::CancellationToken;
use validator::Validate;

use crate::auth::resolver::assign_role;
use crate::auth::retry::{RetryError, RetryPolicy};
use crate::auth::session::{AuthEvent, AuthSubscription};
use crate::client::Client;
use crate::gateway::{GatewayError, Query, SignUpRequest};
use crate::models::{
    profile::{has_dotted_domain, CreateProfile, UserProfile, PROFILES_TABLE},
    role::Role,
    session::{AuthUser, Session, UserMetadata},
};

/// Shown when sign-up returned a session and the profile is being written
pub const PROFILE_SETUP_NOTICE: &str = "Registration successful! Setting up your profile...";

/// Shown when sign-up needs email confirmation first
pub const CONFIRM_EMAIL_NOTICE: &str =
    "Registration successful! Please check your email to confirm your account.";

/// Shown once the profile row exists
pub const PROFILE_CREATED_NOTICE: &str = "Registration and profile creation successful!";

/// Shown after a password reset email was requested
pub const PASSWORD_RESET_NOTICE: &str = "Password reset link sent to your email!";

const INVALID_EMAIL_MESSAGE: &str = "Please enter a valid email";

const NO_USER_MESSAGE: &str = "Account creation failed - no user ID returned.";

/// Per-field validation messages, keyed by form field name
pub type FieldErrors = BTreeMap<String, String>;

/// Auth flow errors
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// Form input rejected before any gateway call
    #[error("Validation failed")]
    Validation(FieldErrors),

    /// Gateway rejected the request; message is already user-facing
    #[error("{0}")]
    Auth(String),

    /// Gateway failure outside the request/response cycle
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Profile setup was cancelled before it finished
    #[error("Profile setup cancelled")]
    Cancelled,
}

pub type FlowResult<T> = Result<T, FlowError>;

/// Rewrites well-known gateway auth messages
///
/// Matching is by substring; unknown messages pass through unchanged.
pub fn friendly_auth_message(message: &str) -> String {
    if message.contains("Invalid login credentials") {
        "Invalid email or password. Please try again.".to_string()
    } else if message.contains("Email not confirmed") {
        "Please check your email and confirm your account before signing in.".to_string()
    } else if message.contains("User already registered") {
        "An account with this email already exists. Please sign in instead.".to_string()
    } else {
        message.to_string()
    }
}

fn auth_error(err: GatewayError) -> FlowError {
    FlowError::Auth(friendly_auth_message(&err.message()))
}

/// Sign-in form
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SignInForm {
    #[validate(email(message = "Please enter a valid email"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

impl SignInForm {
    /// Field errors; empty when the form is valid
    pub fn errors(&self) -> FieldErrors {
        let mut errors = collect_errors(self.validate());
        check_credentials(&mut errors, &self.email, &self.password);
        errors
    }
}

/// Sign-up form
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SignUpForm {
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub phone: String,

    #[validate(email(message = "Please enter a valid email"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
}

impl SignUpForm {
    /// Field errors; empty when the form is valid
    pub fn errors(&self) -> FieldErrors {
        let mut errors = collect_errors(self.validate());

        for (field, value, message) in [
            ("first_name", &self.first_name, "First name is required"),
            ("last_name", &self.last_name, "Last name is required"),
            ("company", &self.company, "Company name is required"),
            ("phone", &self.phone, "Phone number is required"),
        ] {
            if value.trim().is_empty() {
                errors.insert(field.to_string(), message.to_string());
            }
        }

        check_credentials(&mut errors, &self.email, &self.password);
        errors
    }

    fn metadata(&self) -> UserMetadata {
        UserMetadata {
            first_name: Some(self.first_name.clone()),
            last_name: Some(self.last_name.clone()),
            company: Some(self.company.clone()),
            phone: Some(self.phone.clone()),
            avatar_url: None,
        }
    }
}

/// First message per field from a derive validation run
fn collect_errors(result: Result<(), validator::ValidationErrors>) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if let Err(e) = result {
        for (field, field_errors) in e.field_errors().iter() {
            if let Some(message) = field_errors.iter().find_map(|err| err.message.as_ref()) {
                errors
                    .entry(field.to_string())
                    .or_insert_with(|| message.to_string());
            }
        }
    }
    errors
}

/// Required checks take precedence over format checks
fn check_credentials(errors: &mut FieldErrors, email: &str, password: &str) {
    if email.trim().is_empty() {
        errors.insert("email".to_string(), "Email is required".to_string());
    } else if !has_dotted_domain(email) {
        errors.insert("email".to_string(), INVALID_EMAIL_MESSAGE.to_string());
    }
    if password.trim().is_empty() {
        errors.insert("password".to_string(), "Password is required".to_string());
    }
}

/// Social sign-in providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Github,
    Apple,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Github => "github",
            Provider::Apple => "apple",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "google" => Ok(Provider::Google),
            "github" => Ok(Provider::Github),
            "apple" => Ok(Provider::Apple),
            other => Err(format!("Unsupported provider: {}", other)),
        }
    }
}

/// Result of a successful sign-up call
pub struct SignUpOutcome {
    pub user: AuthUser,

    /// Whether the gateway issued a session right away
    pub session_issued: bool,

    /// User-facing status line
    pub notice: &'static str,

    /// Profile write still to be performed
    pub pending: Option<PendingProfile>,
}

impl fmt::Debug for SignUpOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignUpOutcome")
            .field("user", &self.user.id)
            .field("session_issued", &self.session_issued)
            .field("notice", &self.notice)
            .field("pending", &self.pending.is_some())
            .finish()
    }
}

/// Profile row waiting for the new user's session
pub struct PendingProfile {
    client: Client,
    events: AuthSubscription,
    profile: CreateProfile,
    retry: RetryPolicy,
}

impl PendingProfile {
    /// Id of the user the profile belongs to
    pub fn user_id(&self) -> uuid::Uuid {
        self.profile.id
    }

    /// Waits for the user's session, then writes the profile and default role
    ///
    /// Permission-denied inserts are retried under the flow's
    /// [`RetryPolicy`]. A failed role assignment is logged and does not fail
    /// the setup.
    pub async fn complete(mut self, cancel: &CancellationToken) -> FlowResult<UserProfile> {
        self.wait_for_session(cancel).await?;

        let user_id = self.profile.id;
        tracing::info!(user_id = %user_id, "Creating user profile");

        let client = &self.client;
        let profile = &self.profile;
        let created: UserProfile = self
            .retry
            .run(cancel, GatewayError::is_permission_denied, || async move {
                client.from(PROFILES_TABLE).insert(profile).await
            })
            .await
            .map_err(|err| match err {
                RetryError::Cancelled => FlowError::Cancelled,
                RetryError::Failed(err) => {
                    tracing::error!(user_id = %user_id, error = %err, "Profile creation failed");
                    FlowError::Gateway(err)
                }
            })?;

        tracing::info!(user_id = %user_id, "Profile created");

        if let Err(err) = assign_role(&self.client, user_id, Role::Member).await {
            tracing::error!(
                user_id = %user_id,
                error = %err,
                "Role assignment failed, but profile was created"
            );
        }

        Ok(created)
    }

    async fn wait_for_session(&mut self, cancel: &CancellationToken) -> FlowResult<Session> {
        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FlowError::Cancelled),
                event = self.events.next() => event,
            };

            match event {
                Some(AuthEvent::SignedIn(session)) if session.user_id() == self.profile.id => {
                    return Ok(session);
                }
                Some(_) => continue,
                None => return Err(FlowError::Cancelled),
            }
        }
    }
}

/// Auth operations for one client
pub struct AuthFlow {
    client: Client,
    redirect_base: String,
    retry: RetryPolicy,
}

impl AuthFlow {
    /// Creates a flow; `redirect_base` is the public origin used for
    /// provider and password-reset redirects
    pub fn new(client: Client, redirect_base: impl Into<String>) -> Self {
        Self {
            client,
            redirect_base: redirect_base.into().trim_end_matches('/').to_string(),
            retry: RetryPolicy::profile_bootstrap(),
        }
    }

    /// Overrides the profile bootstrap retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Validates the form and signs in
    pub async fn sign_in(&self, form: &SignInForm) -> FlowResult<Session> {
        let errors = form.errors();
        if !errors.is_empty() {
            return Err(FlowError::Validation(errors));
        }

        self.client
            .sign_in_with_password(&form.email, &form.password)
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, "Sign-in failed");
                auth_error(err)
            })
    }

    /// Validates the form and registers a new identity
    pub async fn sign_up(&self, form: &SignUpForm) -> FlowResult<SignUpOutcome> {
        let errors = form.errors();
        if !errors.is_empty() {
            return Err(FlowError::Validation(errors));
        }

        // Subscribe first so the SignedIn event from sign-up is not missed
        let events = self.client.on_auth_state_change();

        let response = self
            .client
            .sign_up(&SignUpRequest {
                email: form.email.clone(),
                password: form.password.clone(),
                metadata: form.metadata(),
            })
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, "Sign-up failed");
                auth_error(err)
            })?;

        let Some(user) = response.user else {
            tracing::error!("Sign-up returned no user");
            return Err(FlowError::Auth(NO_USER_MESSAGE.to_string()));
        };

        let session_issued = response.session.is_some();
        tracing::info!(user_id = %user.id, session_issued, "User registered");

        let pending = PendingProfile {
            client: self.client.clone(),
            events,
            profile: CreateProfile {
                id: user.id,
                email: form.email.clone(),
                first_name: form.first_name.clone(),
                last_name: form.last_name.clone(),
                company_name: form.company.clone(),
                phone_number: form.phone.clone(),
            },
            retry: self.retry,
        };

        Ok(SignUpOutcome {
            user,
            session_issued,
            notice: if session_issued {
                PROFILE_SETUP_NOTICE
            } else {
                CONFIRM_EMAIL_NOTICE
            },
            pending: Some(pending),
        })
    }

    /// Provider redirect URL; the browser is sent there to sign in
    pub fn social_sign_in(&self, provider: Provider) -> String {
        tracing::debug!(provider = %provider, "Starting social sign-in");
        self.client.authorize_url(provider.as_str(), &self.redirect_base)
    }

    /// Sends a password reset email
    pub async fn request_password_reset(&self, email: &str) -> FlowResult<&'static str> {
        if email.trim().is_empty() {
            let mut errors = FieldErrors::new();
            errors.insert(
                "email".to_string(),
                "Please enter your email address first".to_string(),
            );
            return Err(FlowError::Validation(errors));
        }

        let redirect_to = format!("{}/reset-password", self.redirect_base);
        self.client
            .reset_password_for_email(email, &redirect_to)
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "Password reset error");
                FlowError::Auth(err.message())
            })?;

        Ok(PASSWORD_RESET_NOTICE)
    }

    /// Signs out; the local session is dropped even if the gateway call fails
    pub async fn sign_out(&self) -> FlowResult<()> {
        self.client.sign_out().await.map_err(|err| {
            tracing::warn!(error = %err, "Sign-out failed at gateway");
            FlowError::Gateway(err)
        })
    }

    /// Writes a profile from the identity's sign-up metadata if none exists
    ///
    /// Covers sign-ups that needed email confirmation, where no session was
    /// around to drive a [`PendingProfile`]. Returns whether a row was written.
    pub async fn ensure_profile(&self, user: &AuthUser) -> FlowResult<bool> {
        let query = Query::new().eq("id", user.id);
        let existing = self
            .client
            .from(PROFILES_TABLE)
            .maybe_single::<UserProfile>(&query)
            .await?;
        if existing.is_some() {
            return Ok(false);
        }

        let metadata = &user.user_metadata;
        let profile = CreateProfile {
            id: user.id,
            email: user.email.clone().unwrap_or_default(),
            first_name: metadata.first_name.clone().unwrap_or_default(),
            last_name: metadata.last_name.clone().unwrap_or_default(),
            company_name: metadata.company.clone().unwrap_or_default(),
            phone_number: metadata.phone.clone().unwrap_or_default(),
        };
        self.client.from(PROFILES_TABLE).insert_only(&profile).await?;

        tracing::info!(user_id = %user.id, "Created missing profile from sign-up metadata");
        Ok(true)
    }
}
