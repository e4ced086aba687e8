/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use granite_shared::gateway::http::RestGateway;
/// use granite_web::{app::AppState, config::Config};
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let gateway = RestGateway::new(&config.gateway.url, &config.gateway.key)?;
/// let state = AppState::new(Arc::new(gateway), config);
/// let app = granite_web::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{guard, session},
};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, patch, post, put},
    Router,
};
use granite_shared::{auth::flow::AuthFlow, client::Client, gateway::Gateway};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Hosted backend
    pub gateway: Arc<dyn Gateway>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(gateway: Arc<dyn Gateway>, config: Config) -> Self {
        Self {
            gateway,
            config: Arc::new(config),
        }
    }

    /// Client with no session, for sign-in and sign-up
    pub fn anonymous_client(&self) -> Client {
        Client::new(self.gateway.clone())
    }

    /// Auth flow over `client`, redirecting back to this server
    pub fn auth_flow(&self, client: Client) -> AuthFlow {
        AuthFlow::new(client, self.config.server.public_url.as_str())
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET /health                         # Health check (public)
/// ├── GET / , /auth                       # Landing and sign-in views (public)
/// ├── GET /overview /tasks /team          # Dashboard views (signed in)
/// │       /calendar /help
/// ├── GET /members /analytics             # Org admin views
/// │       /org-settings
/// ├── GET /organizations /all-users       # System admin views
/// │       /system-settings
/// └── /v1/
///     ├── /auth/                          # Sign-in, sign-up, sign-out, reset, oauth
///     ├── /tasks/                         # Task workflow (signed in)
///     ├── /invitations                    # Invitation stub (signed in)
///     └── /preferences/theme              # Dark-mode cookie (public)
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Session restore (every route)
/// 4. Access gate (per route group)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no session needed)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Public views
    let public_views = Router::new()
        .route("/", get(routes::views::landing))
        .route("/auth", get(routes::views::auth_page));

    // Views for any signed-in user
    let member_views = Router::new()
        .route("/overview", get(routes::views::overview))
        .route("/tasks", get(routes::views::tasks))
        .route("/team", get(routes::views::team))
        .route("/calendar", get(routes::views::calendar))
        .route("/help", get(routes::views::help))
        .route_layer(axum::middleware::from_fn(guard::require_authenticated));

    // Views for org admins and above
    let org_admin_views = Router::new()
        .route("/members", get(routes::views::members))
        .route("/analytics", get(routes::views::analytics))
        .route("/org-settings", get(routes::views::org_settings))
        .route_layer(axum::middleware::from_fn(guard::require_org_admin));

    // Views for system admins
    let system_admin_views = Router::new()
        .route("/organizations", get(routes::views::organizations))
        .route("/all-users", get(routes::views::all_users))
        .route("/system-settings", get(routes::views::system_settings))
        .route_layer(axum::middleware::from_fn(guard::require_system_admin));

    // Auth routes (public)
    let auth_routes = Router::new()
        .route("/sign-in", post(routes::auth::sign_in))
        .route("/sign-up", post(routes::auth::sign_up))
        .route("/sign-out", post(routes::auth::sign_out))
        .route("/password-reset", post(routes::auth::password_reset))
        .route("/oauth/:provider", get(routes::auth::oauth_redirect))
        .merge(
            Router::new()
                .route("/session", get(routes::auth::current_session))
                .route_layer(axum::middleware::from_fn(guard::require_api_session)),
        );

    // Task routes (signed in; role checks happen in the workflow)
    let task_routes = Router::new()
        .route("/", get(routes::tasks::list_tasks).post(routes::tasks::create_task))
        .route("/stats", get(routes::tasks::task_stats))
        .route("/:id", put(routes::tasks::update_task).delete(routes::tasks::delete_task))
        .route("/:id/status", patch(routes::tasks::update_task_status))
        .route_layer(axum::middleware::from_fn(guard::require_api_session));

    let invitation_routes = Router::new()
        .route("/", post(routes::invitations::send_invitation))
        .route_layer(axum::middleware::from_fn(guard::require_api_session));

    let preference_routes = Router::new().route(
        "/theme",
        get(routes::theme::get_theme).put(routes::theme::set_theme),
    );

    // Build complete v1 API
    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/tasks", task_routes)
        .nest("/invitations", invitation_routes)
        .nest("/preferences", preference_routes);

    // Configure CORS based on environment
    let cors = if state.config.server.cors_origins.iter().any(|o| o == "*") {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .server
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    // Combine all routes with middleware stack
    Router::new()
        .merge(health_routes)
        .merge(public_views)
        .merge(member_views)
        .merge(org_admin_views)
        .merge(system_admin_views)
        .nest("/v1", v1_routes)
        .fallback(routes::views::not_found)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session::attach_session,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}
