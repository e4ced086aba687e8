/// Page view models
///
/// Each page route returns the JSON a browser shell renders: title,
/// description, the dashboard shell (sidebar, badge, greeting) and a
/// page-specific `content` object. The theme and the active path are passed
/// in explicitly; nothing is read from ambient state.
///
/// Access is enforced by the guard layer in front of these handlers, so a
/// handler only runs for an admitted [`Caller`].

use crate::{middleware::session, routes::theme::Theme};
use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Extension, Json,
};
use chrono::Utc;
use granite_shared::{
    auth::{
        guard::{AUTH_ROUTE, DEFAULT_ROUTE},
        resolver::Caller,
    },
    client::Client,
    gateway::Query,
    models::{
        organization::{Organization, ORGANIZATIONS_TABLE},
        profile::{UserProfile, PROFILES_TABLE},
        role::Role,
    },
    tasks::{TaskService, TaskStats},
};
use serde::Serialize;
use serde_json::{json, Value as JsonValue};

const NO_ORGANIZATION: &str = "No Organization";

/// Sidebar link
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavItem {
    pub label: &'static str,
    pub path: &'static str,
    pub active: bool,
}

/// Group of sidebar links
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavSection {
    /// Section heading; the core section has none
    pub title: Option<&'static str>,
    pub items: Vec<NavItem>,
}

const CORE_NAV: [(&str, &str); 4] = [
    ("Dashboard", "/overview"),
    ("My Tasks", "/tasks"),
    ("Team", "/team"),
    ("Calendar", "/calendar"),
];

const ADMIN_NAV: [(&str, &str); 3] = [
    ("Manage Members", "/members"),
    ("Analytics", "/analytics"),
    ("Organization Settings", "/org-settings"),
];

const SYSTEM_ADMIN_NAV: [(&str, &str); 3] = [
    ("Organizations", "/organizations"),
    ("All Users", "/all-users"),
    ("System Settings", "/system-settings"),
];

const HELP_NAV: [(&str, &str); 1] = [("Help & Support", "/help")];

fn section(title: Option<&'static str>, links: &[(&'static str, &'static str)], active: &str) -> NavSection {
    NavSection {
        title,
        items: links
            .iter()
            .map(|&(label, path)| NavItem {
                label,
                path,
                active: path == active,
            })
            .collect(),
    }
}

/// Sidebar for `role`, with `active` highlighted
pub fn navigation(role: Role, active: &str) -> Vec<NavSection> {
    let mut nav = vec![section(None, &CORE_NAV, active)];
    if role.is_admin_tier() {
        nav.push(section(Some("Admin"), &ADMIN_NAV, active));
    }
    if role == Role::SystemAdmin {
        nav.push(section(Some("System Admin"), &SYSTEM_ADMIN_NAV, active));
    }
    nav.push(section(None, &HELP_NAV, active));
    nav
}

/// Role as written on the overview card
pub fn role_label(role: Role) -> &'static str {
    match role {
        Role::SystemAdmin => "System Admin",
        Role::OrgAdmin => "Org Admin",
        Role::Member => "Member",
    }
}

/// Dashboard chrome around every signed-in page
#[derive(Debug, Clone, Serialize)]
pub struct Shell {
    pub user_name: String,
    pub email: Option<String>,
    pub role: Role,
    pub badge: &'static str,
    pub avatar_url: Option<String>,
    pub organization: String,
    pub active_path: &'static str,
    pub nav: Vec<NavSection>,
}

/// Page view model
#[derive(Debug, Clone, Serialize)]
pub struct PageView {
    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub theme: Theme,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub shell: Option<Shell>,

    pub content: JsonValue,
}

/// Everything a signed-in page needs besides its content
struct PageContext {
    client: Client,
    caller: Caller,
    theme: Theme,
    profile: Option<UserProfile>,
    organization: Option<Organization>,
}

impl PageContext {
    /// Loads the caller's profile and organization; failures degrade to none
    async fn load(client: Client, caller: Caller, headers: &HeaderMap) -> Self {
        let profile = client
            .from(PROFILES_TABLE)
            .maybe_single::<UserProfile>(&Query::new().eq("id", caller.user_id()))
            .await
            .unwrap_or_else(|err| {
                tracing::warn!(user_id = %caller.user_id(), error = %err, "Profile unavailable");
                None
            });

        let organization = match profile.as_ref().and_then(|p| p.organization_id) {
            Some(org_id) => client
                .from(ORGANIZATIONS_TABLE)
                .maybe_single::<Organization>(&Query::new().eq("id", org_id))
                .await
                .unwrap_or_else(|err| {
                    tracing::warn!(organization_id = %org_id, error = %err, "Organization unavailable");
                    None
                }),
            None => None,
        };

        Self {
            client,
            caller,
            theme: Theme::from_headers(headers),
            profile,
            organization,
        }
    }

    fn organization_name(&self) -> Option<&str> {
        self.organization.as_ref().map(|o| o.name.as_str())
    }

    fn page(
        &self,
        active_path: &'static str,
        title: impl Into<String>,
        description: Option<String>,
        content: JsonValue,
    ) -> Json<PageView> {
        let user = &self.caller.session.user;
        let role = self.caller.role;

        Json(PageView {
            title: title.into(),
            description,
            theme: self.theme,
            shell: Some(Shell {
                user_name: user.greeting_name(),
                email: user.email.clone(),
                role,
                badge: role.badge(),
                avatar_url: self.profile.as_ref().and_then(|p| p.avatar_url.clone()),
                organization: self.organization_name().unwrap_or(NO_ORGANIZATION).to_string(),
                active_path,
                nav: navigation(role, active_path),
            }),
            content,
        })
    }
}

fn placeholder(card_title: &str, card_description: &str) -> JsonValue {
    json!({ "card": { "title": card_title, "description": card_description } })
}

/// `GET /`
pub async fn landing(Extension(client): Extension<Client>, headers: HeaderMap) -> Json<PageView> {
    let signed_in = client.get_session().await.is_some();
    let cta = if signed_in { DEFAULT_ROUTE } else { AUTH_ROUTE };
    Json(PageView {
        title: "Granite Flow".to_string(),
        description: Some("Revolutionary Factory Management System".to_string()),
        theme: Theme::from_headers(&headers),
        shell: None,
        content: json!({
            "signed_in": signed_in,
            "cta": cta,
        }),
    })
}

/// `GET /auth`; signed-in callers go straight to the dashboard
pub async fn auth_page(Extension(client): Extension<Client>, headers: HeaderMap) -> Response {
    if client.get_session().await.is_some() {
        return Redirect::to(DEFAULT_ROUTE).into_response();
    }

    Json(PageView {
        title: "Welcome to Granite Flow".to_string(),
        description: Some("Sign in to your account or create a new one".to_string()),
        theme: Theme::from_headers(&headers),
        shell: None,
        content: json!({
            "providers": ["google", "github", "apple"],
            "sign_in": "/v1/auth/sign-in",
            "sign_up": "/v1/auth/sign-up",
            "password_reset": "/v1/auth/password-reset",
        }),
    })
    .into_response()
}

/// `GET /overview`
pub async fn overview(
    Extension(client): Extension<Client>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
) -> Json<PageView> {
    let ctx = PageContext::load(client, caller, &headers).await;
    let service = TaskService::new(ctx.client.clone());

    let stats = match service.list(&ctx.caller).await {
        Ok(tasks) => TaskStats::compute(&tasks, Utc::now()),
        Err(err) => {
            tracing::warn!(error = %err, "Overview stats unavailable");
            TaskStats::default()
        }
    };
    let team_size = service.assignable_users(&ctx.caller).await.len();
    let role = ctx.caller.role;
    let email = ctx.caller.session.user.email.clone().unwrap_or_default();

    ctx.page(
        "/overview",
        format!("Welcome back, {}", ctx.caller.session.user.greeting_name()),
        None,
        json!({
            "stats": stats,
            "team_members": team_size,
            "role_label": role_label(role),
            "welcome": {
                "title": "Welcome to Granite Flow",
                "description": format!("You're logged in as {} with {} privileges.", email, role),
            },
        }),
    )
}

/// `GET /tasks`; the list itself is fetched from `/v1/tasks`
pub async fn tasks(
    Extension(client): Extension<Client>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
) -> Json<PageView> {
    let ctx = PageContext::load(client, caller, &headers).await;
    let users = TaskService::new(ctx.client.clone())
        .assignable_users(&ctx.caller)
        .await;
    let can_manage = ctx.caller.role.can_manage_tasks();

    ctx.page(
        "/tasks",
        "My Tasks",
        None,
        json!({
            "can_manage": can_manage,
            "assignable_users": users,
            "statuses": ["all", "pending", "in_progress", "completed", "cancelled"],
            "sort_keys": ["deadline", "priority", "created_at"],
        }),
    )
}

/// `GET /team`
pub async fn team(
    Extension(client): Extension<Client>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
) -> Json<PageView> {
    let ctx = PageContext::load(client, caller, &headers).await;
    ctx.page(
        "/team",
        "Team",
        None,
        placeholder("Team Members", "View and manage your team"),
    )
}

/// `GET /calendar`
pub async fn calendar(
    Extension(client): Extension<Client>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
) -> Json<PageView> {
    let ctx = PageContext::load(client, caller, &headers).await;
    ctx.page(
        "/calendar",
        "Calendar",
        None,
        placeholder("Calendar", "View your schedule and upcoming events"),
    )
}

/// `GET /help`
pub async fn help(
    Extension(client): Extension<Client>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
) -> Json<PageView> {
    let ctx = PageContext::load(client, caller, &headers).await;
    ctx.page(
        "/help",
        "Help & Support",
        None,
        json!({
            "card": {
                "title": "Documentation & Resources",
                "description": "Find answers and get assistance with Granite Flow",
            },
            "topics": [
                { "title": "Getting Started", "summary": "Learn the basics of using Granite Flow" },
                { "title": "User Guide", "summary": "Detailed documentation for all features" },
                { "title": "Contact Support", "summary": "Get help from our support team" },
                { "title": "FAQ", "summary": "Frequently asked questions and answers" },
            ],
        }),
    )
}

/// `GET /members` (org admin)
pub async fn members(
    Extension(client): Extension<Client>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
) -> Json<PageView> {
    let ctx = PageContext::load(client, caller, &headers).await;
    let description = format!(
        "Manage team members for {}",
        ctx.organization_name().unwrap_or("your organization")
    );
    ctx.page(
        "/members",
        "Manage Members",
        Some(description),
        placeholder(
            "Organization Members",
            "View and manage all members in your organization",
        ),
    )
}

/// `GET /analytics` (org admin)
pub async fn analytics(
    Extension(client): Extension<Client>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
) -> Json<PageView> {
    let ctx = PageContext::load(client, caller, &headers).await;
    ctx.page(
        "/analytics",
        "Analytics",
        None,
        placeholder(
            "Analytics Dashboard",
            "View analytics and insights for your organization",
        ),
    )
}

/// `GET /org-settings` (org admin)
pub async fn org_settings(
    Extension(client): Extension<Client>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
) -> Json<PageView> {
    let ctx = PageContext::load(client, caller, &headers).await;
    ctx.page(
        "/org-settings",
        "Organization Settings",
        None,
        placeholder(
            "Organization Settings",
            "Configure your organization preferences and settings",
        ),
    )
}

/// `GET /organizations` (system admin)
pub async fn organizations(
    Extension(client): Extension<Client>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
) -> Json<PageView> {
    let ctx = PageContext::load(client, caller, &headers).await;
    let organizations = ctx
        .client
        .from(ORGANIZATIONS_TABLE)
        .select::<Organization>(&Query::new().order_asc("name"))
        .await
        .unwrap_or_else(|err| {
            tracing::error!(error = %err, "Error fetching organizations");
            Vec::new()
        });

    ctx.page(
        "/organizations",
        "Organizations",
        Some("Manage all organizations across the system".to_string()),
        json!({
            "card": {
                "title": "All Organizations",
                "description": "System-wide organization management",
            },
            "organizations": organizations,
        }),
    )
}

/// `GET /all-users` (system admin)
pub async fn all_users(
    Extension(client): Extension<Client>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
) -> Json<PageView> {
    let ctx = PageContext::load(client, caller, &headers).await;
    let users = ctx
        .client
        .from(PROFILES_TABLE)
        .select::<UserProfile>(&Query::new().order_asc("email"))
        .await
        .unwrap_or_else(|err| {
            tracing::error!(error = %err, "Error fetching users");
            Vec::new()
        });

    ctx.page(
        "/all-users",
        "All Users",
        None,
        json!({
            "card": {
                "title": "System Users",
                "description": "Manage all users across the platform",
            },
            "users": users,
        }),
    )
}

/// `GET /system-settings` (system admin)
pub async fn system_settings(
    Extension(client): Extension<Client>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
) -> Json<PageView> {
    let ctx = PageContext::load(client, caller, &headers).await;
    ctx.page("/system-settings", "System Settings", None, json!({}))
}

/// Fallback for unknown paths
pub async fn not_found(headers: HeaderMap) -> (StatusCode, Json<PageView>) {
    let home = if session::access_token(&headers).is_some() {
        DEFAULT_ROUTE
    } else {
        "/"
    };
    (
        StatusCode::NOT_FOUND,
        Json(PageView {
            title: "Page not found".to_string(),
            description: Some("The page you are looking for does not exist.".to_string()),
            theme: Theme::from_headers(&headers),
            shell: None,
            content: json!({ "home": home }),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(nav: &[NavSection]) -> Vec<&'static str> {
        nav.iter().flat_map(|s| s.items.iter().map(|i| i.path)).collect()
    }

    #[test]
    fn test_member_navigation() {
        let nav = navigation(Role::Member, "/tasks");
        assert_eq!(
            paths(&nav),
            vec!["/overview", "/tasks", "/team", "/calendar", "/help"]
        );
        let active: Vec<_> = nav
            .iter()
            .flat_map(|s| s.items.iter())
            .filter(|i| i.active)
            .map(|i| i.label)
            .collect();
        assert_eq!(active, vec!["My Tasks"]);
    }

    #[test]
    fn test_org_admin_navigation() {
        let nav = navigation(Role::OrgAdmin, "/overview");
        assert_eq!(nav.len(), 3);
        assert_eq!(nav[1].title, Some("Admin"));
        assert!(!paths(&nav).contains(&"/organizations"));
    }

    #[test]
    fn test_system_admin_navigation() {
        let nav = navigation(Role::SystemAdmin, "/system-settings");
        assert_eq!(nav.len(), 4);
        assert_eq!(nav[2].title, Some("System Admin"));
        assert!(nav[2].items.iter().any(|i| i.active && i.label == "System Settings"));
        assert_eq!(paths(&nav).last(), Some(&"/help"));
    }

    #[test]
    fn test_role_labels() {
        assert_eq!(role_label(Role::SystemAdmin), "System Admin");
        assert_eq!(role_label(Role::OrgAdmin), "Org Admin");
        assert_eq!(role_label(Role::Member), "Member");
    }
}
