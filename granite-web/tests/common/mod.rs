/// Common test utilities for integration tests
///
/// Builds the full router over an in-memory gateway, so requests exercise
/// the real middleware stack without any external services.

use axum::{
    body::Body,
    http::{header, Method, Request},
    response::Response,
    Router,
};
use granite_shared::{
    gateway::memory::MemoryGateway,
    models::{role::Role, session::AuthUser},
};
use granite_web::{
    app::{build_router, AppState},
    config::{Config, GatewayConfig, ServerConfig},
};
use std::sync::Arc;
use tower::ServiceExt;

/// Test context containing the app and its backend
pub struct TestContext {
    pub gateway: Arc<MemoryGateway>,
    pub app: Router,
}

impl TestContext {
    /// Creates a fresh app over an empty in-memory backend
    pub fn new() -> Self {
        Self::with_gateway(MemoryGateway::new())
    }

    pub fn with_gateway(gateway: MemoryGateway) -> Self {
        let gateway = Arc::new(gateway);
        let state = AppState::new(gateway.clone(), test_config());
        Self {
            app: build_router(state),
            gateway,
        }
    }

    /// Registers a user with `role` and returns it with a valid access token
    pub async fn user(&self, email: &str, role: Role) -> (AuthUser, String) {
        let user = self.gateway.add_user(email, "password123", Some(role)).await;
        let session = self.gateway.session_for(&user).await;
        (user, session.access_token)
    }

    /// Sends a request through the router
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.app
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible")
    }
}

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            public_url: "http://localhost:8080".to_string(),
            production: false,
        },
        gateway: GatewayConfig {
            url: "http://gateway.invalid".to_string(),
            key: "anon".to_string(),
        },
    }
}

/// GET with an optional bearer token
pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// JSON request with an optional bearer token
pub fn json(method: Method, uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Parses a response body as JSON
pub async fn body_json(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// `name=value` part of the first `Set-Cookie` header
pub fn set_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}
