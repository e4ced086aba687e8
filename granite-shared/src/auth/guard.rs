/// Route access gate
///
/// One gate, parameterised by the [`AccessLevel`] a view needs. Every check
/// resolves the session and role afresh; nothing is cached between
/// navigations.
///
/// | caller            | `Authenticated` | `OrgAdmin`   | `SystemAdmin` |
/// |-------------------|-----------------|--------------|---------------|
/// | no session        | → `/auth`       | → `/auth`    | → `/auth`     |
/// | member            | allow           | → `/overview`| → `/overview` |
/// | org_admin         | allow           | allow        | → `/overview` |
/// | system_admin      | allow           | allow        | allow         |

use serde::{Deserialize, Serialize};

use crate::auth::resolver::{Caller, Resolution, RoleResolver};
use crate::client::Client;
use crate::models::role::Role;

/// Unauthenticated callers are sent here
pub const AUTH_ROUTE: &str = "/auth";

/// Authenticated callers without the required role are sent here
pub const DEFAULT_ROUTE: &str = "/overview";

/// Access a view requires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// Any signed-in user
    Authenticated,

    /// org_admin or system_admin
    OrgAdmin,

    /// system_admin only
    SystemAdmin,
}

impl AccessLevel {
    /// Whether `role` satisfies this level
    pub fn admits(&self, role: Role) -> bool {
        match self {
            AccessLevel::Authenticated => true,
            AccessLevel::OrgAdmin => role.has_permission(&Role::OrgAdmin),
            AccessLevel::SystemAdmin => role.has_permission(&Role::SystemAdmin),
        }
    }
}

/// Result of a gate check
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    /// Render the view for this caller
    Allow(Caller),

    /// Navigate elsewhere without rendering
    Redirect(&'static str),
}

impl GateOutcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateOutcome::Allow(_))
    }
}

/// Decides a gate outcome from an already resolved caller
pub fn decide(resolution: Resolution, level: AccessLevel) -> GateOutcome {
    match resolution {
        Resolution::Unauthenticated => GateOutcome::Redirect(AUTH_ROUTE),
        Resolution::Authenticated(caller) if level.admits(caller.role) => GateOutcome::Allow(caller),
        Resolution::Authenticated(caller) => {
            tracing::info!(
                user_id = %caller.user_id(),
                role = %caller.role,
                level = ?level,
                "Access denied, redirecting to default route"
            );
            GateOutcome::Redirect(DEFAULT_ROUTE)
        }
    }
}

/// Access gate for one client
pub struct AccessGate<'a> {
    client: &'a Client,
}

impl<'a> AccessGate<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Resolves the caller and checks it against `level`
    pub async fn check(&self, level: AccessLevel) -> GateOutcome {
        let resolution = RoleResolver::new(self.client).resolve().await;
        decide(resolution, level)
    }
}
