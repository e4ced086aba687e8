/// Invitation endpoint
///
/// ```text
/// POST /v1/invitations
/// { "email": "new@example.com", "name": "New Person" }
/// ```
///
/// No email is sent; the invitation is logged and acknowledged.

use crate::{error::ApiResult, routes::MessageResponse};
use axum::{Extension, Json};
use granite_shared::{auth::resolver::Caller, client::Client, tasks::TaskService};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct InvitationRequest {
    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub name: Option<String>,
}

/// Record an invitation
///
/// # Errors
///
/// - `400 Bad Request`: "Please enter a valid email address"
pub async fn send_invitation(
    Extension(client): Extension<Client>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<InvitationRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let notice = TaskService::new(client)
        .send_invitation(&caller, &req.email, req.name.as_deref())
        .await?;
    Ok(Json(MessageResponse::new(notice)))
}
