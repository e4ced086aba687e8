/// Integration tests for the Granite Flow web server
///
/// These tests drive the full router against the in-memory backend:
/// - Access gate redirects for page routes, 401/403 for API routes
/// - Sign-up, sign-in and session cookies
/// - Task workflow over HTTP
/// - Theme preference and fallback views

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::{body_json, get, json, location, set_cookie, TestContext};
use granite_shared::models::{
    profile::PROFILES_TABLE,
    role::{Role, ROLES_TABLE},
    task::TASKS_TABLE,
};
use serde_json::json as body;

#[tokio::test]
async fn test_health_check() {
    let ctx = TestContext::new();
    let response = ctx.send(get("/health", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["gateway"], "connected");
}

#[tokio::test]
async fn test_pages_redirect_anonymous_to_auth() {
    let ctx = TestContext::new();

    for path in ["/overview", "/tasks", "/members", "/all-users"] {
        let response = ctx.send(get(path, None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", path);
        assert_eq!(location(&response), Some("/auth"), "{}", path);
    }
}

#[tokio::test]
async fn test_member_redirected_from_admin_pages() {
    let ctx = TestContext::new();
    let (_, token) = ctx.user("member@example.com", Role::Member).await;

    for path in ["/members", "/analytics", "/org-settings", "/organizations", "/system-settings"] {
        let response = ctx.send(get(path, Some(&token))).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", path);
        assert_eq!(location(&response), Some("/overview"), "{}", path);
    }

    let response = ctx.send(get("/overview", Some(&token))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_org_admin_shell() {
    let ctx = TestContext::new();
    let (_, token) = ctx.user("boss@example.com", Role::OrgAdmin).await;

    let response = ctx.send(get("/members", Some(&token))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let view = body_json(response).await;
    assert_eq!(view["title"], "Manage Members");
    assert_eq!(view["shell"]["badge"], "ORG ADMIN");
    assert_eq!(view["shell"]["user_name"], "boss");
    assert_eq!(view["shell"]["organization"], "No Organization");
    assert_eq!(view["shell"]["active_path"], "/members");
    assert_eq!(view["shell"]["nav"].as_array().unwrap().len(), 3);

    let response = ctx.send(get("/organizations", Some(&token))).await;
    assert_eq!(location(&response), Some("/overview"));
}

#[tokio::test]
async fn test_system_admin_via_cookie() {
    let ctx = TestContext::new();
    let (_, token) = ctx.user("root@example.com", Role::SystemAdmin).await;

    let request = Request::builder()
        .uri("/all-users")
        .header(header::COOKIE, format!("granite_session={}; darkMode=true", token))
        .body(Body::empty())
        .unwrap();
    let response = ctx.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let view = body_json(response).await;
    assert_eq!(view["theme"]["dark_mode"], true);
    assert_eq!(view["content"]["card"]["title"], "System Users");
    assert_eq!(view["content"]["users"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_api_requires_session() {
    let ctx = TestContext::new();
    let response = ctx.send(get("/v1/tasks", None)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"], "unauthorized");
}

#[tokio::test]
async fn test_unknown_token_is_anonymous() {
    let ctx = TestContext::new();
    let response = ctx.send(get("/overview", Some("not-a-token"))).await;
    assert_eq!(location(&response), Some("/auth"));
}

#[tokio::test]
async fn test_sign_up_sets_up_profile_and_session() {
    let ctx = TestContext::new();

    let response = ctx
        .send(json(
            Method::POST,
            "/v1/auth/sign-up",
            None,
            body!({
                "first_name": "Grace",
                "last_name": "Hopper",
                "company": "Navy",
                "phone": "555-0199",
                "email": "grace@example.com",
                "password": "cobol-forever",
                "confirm_password": "cobol-forever",
            }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let cookie = set_cookie(&response).expect("Session cookie should be set");
    assert!(cookie.starts_with("granite_session="));

    let json = body_json(response).await;
    assert_eq!(json["notice"], "Registration and profile creation successful!");
    assert_eq!(json["profile_created"], true);
    assert_eq!(ctx.gateway.rows(PROFILES_TABLE).await.len(), 1);
    assert_eq!(ctx.gateway.rows(ROLES_TABLE).await.len(), 1);

    let request = Request::builder()
        .uri("/v1/auth/session")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    let response = ctx.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["role"], "member");
    assert_eq!(json["name"], "Grace");
}

#[tokio::test]
async fn test_sign_up_validation_errors() {
    let ctx = TestContext::new();

    let response = ctx
        .send(json(
            Method::POST,
            "/v1/auth/sign-up",
            None,
            body!({
                "first_name": "",
                "last_name": "Hopper",
                "company": "Navy",
                "phone": "555-0199",
                "email": "grace@example.com",
                "password": "short",
                "confirm_password": "short",
            }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let json = body_json(response).await;
    let fields: Vec<&str> = json["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["first_name", "password"]);
    assert!(ctx.gateway.calls().await.is_empty());
}

#[tokio::test]
async fn test_sign_in_with_confirmation_creates_missing_profile() {
    let ctx = TestContext::with_gateway(granite_shared::gateway::memory::MemoryGateway::with_email_confirmation());

    let sign_up = body!({
        "first_name": "Ada",
        "last_name": "Lovelace",
        "company": "Analytical Engines",
        "phone": "555-0100",
        "email": "ada@example.com",
        "password": "password123",
        "confirm_password": "password123",
    });
    let response = ctx.send(json(Method::POST, "/v1/auth/sign-up", None, sign_up)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(set_cookie(&response).is_none());
    let json_body = body_json(response).await;
    assert_eq!(json_body["session_issued"], false);
    assert!(ctx.gateway.rows(PROFILES_TABLE).await.is_empty());

    let credentials = body!({ "email": "ada@example.com", "password": "password123" });
    let response = ctx
        .send(json(Method::POST, "/v1/auth/sign-in", None, credentials.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await["message"],
        "Please check your email and confirm your account before signing in."
    );

    ctx.gateway.confirm_email("ada@example.com").await;
    let response = ctx.send(json(Method::POST, "/v1/auth/sign-in", None, credentials)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json_body = body_json(response).await;
    assert_eq!(json_body["role"], "member");
    assert_eq!(json_body["redirect"], "/overview");

    let profiles = ctx.gateway.rows(PROFILES_TABLE).await;
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0]["first_name"], "Ada");
}

#[tokio::test]
async fn test_sign_in_bad_password() {
    let ctx = TestContext::new();
    ctx.user("member@example.com", Role::Member).await;

    let response = ctx
        .send(json(
            Method::POST,
            "/v1/auth/sign-in",
            None,
            body!({ "email": "member@example.com", "password": "wrong-password" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await["message"],
        "Invalid email or password. Please try again."
    );
}

#[tokio::test]
async fn test_sign_out_clears_cookie() {
    let ctx = TestContext::new();
    let (_, token) = ctx.user("member@example.com", Role::Member).await;

    let response = ctx
        .send(json(Method::POST, "/v1/auth/sign-out", Some(&token), body!({})))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(set_cookie(&response).as_deref(), Some("granite_session="));
    assert_eq!(body_json(response).await["redirect"], "/auth");
}

#[tokio::test]
async fn test_password_reset() {
    let ctx = TestContext::new();

    let response = ctx
        .send(json(Method::POST, "/v1/auth/password-reset", None, body!({ "email": "" })))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = ctx
        .send(json(
            Method::POST,
            "/v1/auth/password-reset",
            None,
            body!({ "email": "ada@example.com" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["message"],
        "Password reset link sent to your email!"
    );
}

#[tokio::test]
async fn test_oauth_redirect() {
    let ctx = TestContext::new();

    let response = ctx.send(get("/v1/auth/oauth/github", None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).unwrap().contains("provider=github"));

    let response = ctx.send(get("/v1/auth/oauth/myspace", None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_task_lifecycle_over_http() {
    let ctx = TestContext::new();
    let (_, admin) = ctx.user("admin@example.com", Role::OrgAdmin).await;
    let (member_user, member) = ctx.user("member@example.com", Role::Member).await;

    // Members cannot create
    let draft = body!({
        "title": "Calibrate press",
        "description": "Line 3",
        "priority": "high",
        "deadline": "2030-01-15T09:30",
        "assigned_to": member_user.id,
    });
    let response = ctx
        .send(json(Method::POST, "/v1/tasks", Some(&member), draft.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(response).await["message"],
        "You are not authorized to add tasks."
    );

    let response = ctx.send(json(Method::POST, "/v1/tasks", Some(&admin), draft)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["task"]["status"], "pending");
    assert_eq!(created["notices"][0], "Task created successfully!");
    let task_id = created["task"]["id"].as_str().unwrap().to_string();

    // Member sees it, filtered to pending
    let response = ctx.send(get("/v1/tasks?status=pending", Some(&member))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let list = body_json(response).await;
    assert_eq!(list["heading"], "Pending Tasks");
    assert_eq!(list["caption"], "Showing 1 task");
    assert_eq!(list["tasks"][0]["assignee_name"], "member@example.com");
    assert_eq!(list["tasks"][0]["overdue"], false);

    // Member moves it straight to completed
    let response = ctx
        .send(json(
            Method::PATCH,
            &format!("/v1/tasks/{}/status", task_id),
            Some(&member),
            body!({ "status": "completed" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json_body = body_json(response).await;
    assert_eq!(json_body["message"], "Task status updated!");
    assert_eq!(json_body["task"]["status"], "completed");

    let response = ctx.send(get("/v1/tasks/stats", Some(&admin))).await;
    let stats = body_json(response).await;
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["completed"], 1);
    assert_eq!(stats["completion_rate"], 100);

    // Members cannot delete, even when confirmed
    let uri = format!("/v1/tasks/{}", task_id);
    let response = ctx
        .send(
            Request::builder()
                .method(Method::DELETE)
                .uri(format!("{}?confirm=true", uri))
                .header(header::AUTHORIZATION, format!("Bearer {}", member))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(response).await["message"],
        "You are not authorized to delete tasks."
    );
    assert_eq!(ctx.gateway.rows(TASKS_TABLE).await.len(), 1);

    // Delete needs confirmation
    let response = ctx
        .send(Request::builder().method(Method::DELETE).uri(&uri).header(header::AUTHORIZATION, format!("Bearer {}", admin)).body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(ctx.gateway.rows(TASKS_TABLE).await.len(), 1);

    let response = ctx
        .send(
            Request::builder()
                .method(Method::DELETE)
                .uri(format!("{}?confirm=true", uri))
                .header(header::AUTHORIZATION, format!("Bearer {}", admin))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "Task deleted successfully");
    assert!(ctx.gateway.rows(TASKS_TABLE).await.is_empty());
}

#[tokio::test]
async fn test_create_task_validation() {
    let ctx = TestContext::new();
    let (_, admin) = ctx.user("admin@example.com", Role::OrgAdmin).await;

    let response = ctx
        .send(json(
            Method::POST,
            "/v1/tasks",
            Some(&admin),
            body!({ "title": "No deadline" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "Deadline is required");

    let response = ctx
        .send(json(
            Method::POST,
            "/v1/tasks",
            Some(&admin),
            body!({
                "title": "Invite",
                "deadline": "2030-01-15",
                "assign_by_email": true,
                "assignee_email": "not an email",
            }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["message"],
        "Please enter a valid email address"
    );
}

#[tokio::test]
async fn test_bad_list_filter() {
    let ctx = TestContext::new();
    let (_, admin) = ctx.user("admin@example.com", Role::OrgAdmin).await;

    let response = ctx.send(get("/v1/tasks?status=archived", Some(&admin))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invitation_stub() {
    let ctx = TestContext::new();
    let (_, admin) = ctx.user("admin@example.com", Role::OrgAdmin).await;

    let response = ctx
        .send(json(
            Method::POST,
            "/v1/invitations",
            Some(&admin),
            body!({ "email": "new@example.com", "name": "New Person" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "Invitation sent to new@example.com");
}

#[tokio::test]
async fn test_theme_preference() {
    let ctx = TestContext::new();

    let request = Request::builder()
        .uri("/v1/preferences/theme")
        .header("Sec-CH-Prefers-Color-Scheme", "dark")
        .body(Body::empty())
        .unwrap();
    let response = ctx.send(request).await;
    assert_eq!(body_json(response).await["dark_mode"], true);

    let response = ctx
        .send(json(
            Method::PUT,
            "/v1/preferences/theme",
            None,
            body!({ "dark_mode": false }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(set_cookie(&response).as_deref(), Some("darkMode=false"));
}

#[tokio::test]
async fn test_public_views_and_fallback() {
    let ctx = TestContext::new();
    let (_, token) = ctx.user("member@example.com", Role::Member).await;

    let response = ctx.send(get("/", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["description"],
        "Revolutionary Factory Management System"
    );

    let response = ctx.send(get("/auth", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx.send(get("/auth", Some(&token))).await;
    assert_eq!(location(&response), Some("/overview"));

    let response = ctx.send(get("/no-such-page", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["title"], "Page not found");
}

#[tokio::test]
async fn test_overview_stats() {
    let ctx = TestContext::new();
    let (_, admin) = ctx.user("admin@example.com", Role::SystemAdmin).await;

    let response = ctx.send(get("/overview", Some(&admin))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let view = body_json(response).await;
    assert_eq!(view["title"], "Welcome back, admin");
    assert_eq!(view["content"]["role_label"], "System Admin");
    assert_eq!(view["content"]["stats"]["total"], 0);
    assert_eq!(view["shell"]["badge"], "ADMIN");
    assert_eq!(view["shell"]["nav"].as_array().unwrap().len(), 4);
}
