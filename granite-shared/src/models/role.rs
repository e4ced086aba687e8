/// Role model for the three-tier RBAC scheme
///
/// Every user owns exactly one row in the gateway's `user_roles` table. The
/// row is created lazily (default `member`) the first time the dashboard
/// resolves a session that has no role yet.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE user_roles (
///     user_id UUID PRIMARY KEY REFERENCES auth.users(id) ON DELETE CASCADE,
///     role TEXT NOT NULL DEFAULT 'member'
/// );
/// ```
///
/// # Roles
///
/// - **system_admin**: Everything, including organizations and all users
/// - **org_admin**: Manage members, analytics, organization settings and all tasks
/// - **member**: See and update the status of tasks assigned to them

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Gateway table holding role rows
pub const ROLES_TABLE: &str = "user_roles";

/// RBAC roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular organization member
    #[default]
    Member,

    /// Organization administrator
    OrgAdmin,

    /// Platform-wide administrator
    SystemAdmin,
}

impl Role {
    /// Converts role to the string stored by the gateway
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::OrgAdmin => "org_admin",
            Role::SystemAdmin => "system_admin",
        }
    }

    /// Parses a stored role string
    ///
    /// Unknown values map to [`Role::Member`], the least privileged role.
    pub fn from_str_lossy(value: &str) -> Self {
        match value {
            "org_admin" => Role::OrgAdmin,
            "system_admin" => Role::SystemAdmin,
            "member" => Role::Member,
            other => {
                tracing::debug!(role = %other, "Unrecognized role value, treating as member");
                Role::Member
            }
        }
    }

    /// Organization admins and system admins
    pub fn is_admin_tier(&self) -> bool {
        matches!(self, Role::OrgAdmin | Role::SystemAdmin)
    }

    /// Can create, edit and delete tasks
    pub fn can_manage_tasks(&self) -> bool {
        self.is_admin_tier()
    }

    /// Can view every task, not only the ones assigned to them
    pub fn can_view_all_tasks(&self) -> bool {
        self.is_admin_tier()
    }

    /// Checks if this role has the permission level of the required role
    ///
    /// Hierarchy: SystemAdmin > OrgAdmin > Member
    pub fn has_permission(&self, required: &Role) -> bool {
        self.permission_level() >= required.permission_level()
    }

    /// Short label shown in the dashboard sidebar
    pub fn badge(&self) -> &'static str {
        match self {
            Role::SystemAdmin => "ADMIN",
            Role::OrgAdmin => "ORG ADMIN",
            Role::Member => "MEMBER",
        }
    }

    fn permission_level(&self) -> u8 {
        match self {
            Role::SystemAdmin => 3,
            Role::OrgAdmin => 2,
            Role::Member => 1,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role row as stored by the gateway
///
/// The role column is kept as a raw string so that rows written by other
/// tools with unexpected values still decode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleAssignment {
    /// Owning user
    pub user_id: Uuid,

    /// Stored role value
    pub role: String,
}

impl RoleAssignment {
    /// Builds a new assignment row
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self {
            user_id,
            role: role.as_str().to_string(),
        }
    }

    /// Parsed role
    pub fn role(&self) -> Role {
        Role::from_str_lossy(&self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_string() {
        for role in [Role::Member, Role::OrgAdmin, Role::SystemAdmin] {
            assert_eq!(Role::from_str_lossy(role.as_str()), role);
        }
    }

    #[test]
    fn test_unknown_role_is_member() {
        assert_eq!(Role::from_str_lossy("owner"), Role::Member);
        assert_eq!(Role::from_str_lossy(""), Role::Member);
        assert_eq!(Role::from_str_lossy("SYSTEM_ADMIN"), Role::Member);
    }

    #[test]
    fn test_permission_hierarchy() {
        assert!(Role::SystemAdmin.has_permission(&Role::OrgAdmin));
        assert!(Role::OrgAdmin.has_permission(&Role::OrgAdmin));
        assert!(!Role::Member.has_permission(&Role::OrgAdmin));
        assert!(!Role::OrgAdmin.has_permission(&Role::SystemAdmin));
        assert!(Role::Member.has_permission(&Role::Member));
    }

    #[test]
    fn test_admin_tier() {
        assert!(!Role::Member.is_admin_tier());
        assert!(Role::OrgAdmin.can_manage_tasks());
        assert!(Role::SystemAdmin.can_view_all_tasks());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&Role::OrgAdmin).unwrap(), "\"org_admin\"");
        let role: Role = serde_json::from_str("\"system_admin\"").unwrap();
        assert_eq!(role, Role::SystemAdmin);
    }

    #[test]
    fn test_assignment_parses_stored_value() {
        let row = RoleAssignment {
            user_id: Uuid::new_v4(),
            role: "bogus".to_string(),
        };
        assert_eq!(row.role(), Role::Member);
        assert_eq!(RoleAssignment::new(row.user_id, Role::OrgAdmin).role, "org_admin");
    }
}
