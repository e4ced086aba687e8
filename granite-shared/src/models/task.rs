/// Task model
///
/// Tasks are created by organization or system admins and assigned either to
/// an existing user (by id) or to an email address that has no account yet.
///
/// # Status
///
/// There is no enforced state machine: every status is reachable from every
/// other status.
///
/// ```text
/// pending ⇄ in_progress ⇄ completed ⇄ cancelled   (all pairs)
/// ```
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title TEXT NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     status TEXT NOT NULL DEFAULT 'pending',
///     priority TEXT NOT NULL DEFAULT 'medium',
///     deadline TIMESTAMPTZ NOT NULL,
///     assigned_to UUID REFERENCES auth.users(id),
///     assigned_to_email TEXT,
///     created_by UUID REFERENCES auth.users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Gateway table holding task rows
pub const TASKS_TABLE: &str = "tasks";

/// Task progress status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Cancelled,
    ];

    /// Converts status to the string stored by the gateway
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// Human label ("in progress")
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }

    /// Numeric rank used for sorting (high sorts first)
    pub fn rank(&self) -> u8 {
        match self {
            TaskPriority::High => 3,
            TaskPriority::Medium => 2,
            TaskPriority::Low => 1,
        }
    }
}

/// Task row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,

    pub title: String,

    #[serde(default)]
    pub description: String,

    pub status: TaskStatus,

    pub priority: TaskPriority,

    pub deadline: DateTime<Utc>,

    /// Assignee id (None when assigned to a not-yet-registered email)
    #[serde(default)]
    pub assigned_to: Option<Uuid>,

    /// Assignee email awaiting an invitation
    #[serde(default)]
    pub assigned_to_email: Option<String>,

    #[serde(default)]
    pub created_by: Option<Uuid>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// True when the deadline is strictly in the past and the task isn't completed
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        is_overdue(self.deadline, self.status, now)
    }

    /// Overdue relative to the current wall clock
    pub fn is_overdue(&self) -> bool {
        self.is_overdue_at(Utc::now())
    }
}

/// Overdue predicate: `deadline < now && status != completed`
pub fn is_overdue(deadline: DateTime<Utc>, status: TaskStatus, now: DateTime<Utc>) -> bool {
    deadline < now && status != TaskStatus::Completed
}

/// Resolved assignee for a task write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignee {
    /// Existing user
    User(Uuid),

    /// Email without an account; an invitation is pending
    Invite(String),
}

impl Assignee {
    /// Column values `(assigned_to, assigned_to_email)`
    pub fn columns(&self) -> (Option<Uuid>, Option<String>) {
        match self {
            Assignee::User(id) => (Some(*id), None),
            Assignee::Invite(email) => (None, Some(email.clone())),
        }
    }

    pub fn is_invite(&self) -> bool {
        matches!(self, Assignee::Invite(_))
    }
}

/// Insert payload for a new task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub deadline: DateTime<Utc>,
    pub assigned_to: Option<Uuid>,
    pub assigned_to_email: Option<String>,
    pub created_by: Uuid,
}

/// Update payload for an edited task (status untouched)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTask {
    pub title: String,
    pub description: String,
    pub priority: TaskPriority,
    pub deadline: DateTime<Utc>,
    pub assigned_to: Option<Uuid>,
    pub assigned_to_email: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Update payload for a status change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTaskStatus {
    pub status: TaskStatus,
    pub updated_at: DateTime<Utc>,
}
