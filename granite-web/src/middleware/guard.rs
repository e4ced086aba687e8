/// Access gate middleware
///
/// Wraps [`AccessGate`] for axum. Page routes answer a refused check with a
/// `303 See Other` to the gate's redirect target; API routes answer with a
/// JSON 401 or 403. An admitted [`Caller`] is inserted into the request
/// extensions for the handler.
///
/// [`Caller`]: granite_shared::auth::resolver::Caller

use crate::error::ApiError;
use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use granite_shared::{
    auth::guard::{AccessGate, AccessLevel, GateOutcome, AUTH_ROUTE},
    client::Client,
};

/// How a refusal is answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Page,
    Api,
}

/// Runs the gate for `level` and either continues or refuses
pub async fn enforce(level: AccessLevel, surface: Surface, mut req: Request, next: Next) -> Response {
    let Some(client) = req.extensions().get::<Client>().cloned() else {
        return ApiError::InternalError("Session layer not installed".to_string()).into_response();
    };

    match AccessGate::new(&client).check(level).await {
        GateOutcome::Allow(caller) => {
            req.extensions_mut().insert(caller);
            next.run(req).await
        }
        GateOutcome::Redirect(target) => match surface {
            Surface::Page => Redirect::to(target).into_response(),
            Surface::Api if target == AUTH_ROUTE => {
                ApiError::Unauthorized("Sign in required".to_string()).into_response()
            }
            Surface::Api => {
                ApiError::Forbidden("Insufficient permissions".to_string()).into_response()
            }
        },
    }
}

pub async fn require_authenticated(req: Request, next: Next) -> Response {
    enforce(AccessLevel::Authenticated, Surface::Page, req, next).await
}

pub async fn require_org_admin(req: Request, next: Next) -> Response {
    enforce(AccessLevel::OrgAdmin, Surface::Page, req, next).await
}

pub async fn require_system_admin(req: Request, next: Next) -> Response {
    enforce(AccessLevel::SystemAdmin, Surface::Page, req, next).await
}

/// Any signed-in caller, answered as JSON
pub async fn require_api_session(req: Request, next: Next) -> Response {
    enforce(AccessLevel::Authenticated, Surface::Api, req, next).await
}
