/// Task workflow
///
/// Create, edit, re-status and delete tasks on behalf of a resolved
/// [`Caller`]. Every gateway failure is logged here and surfaced as a
/// [`WorkflowError`] carrying one line a person can read.
///
/// # Permissions
///
/// | operation       | member | org_admin | system_admin |
/// |-----------------|--------|-----------|--------------|
/// | list            | own    | all       | all          |
/// | create / update | no     | yes       | yes          |
/// | update status   | yes    | yes       | yes          |
/// | delete          | gateway policy decides             |
///
/// Row-level policies at the gateway remain the real enforcement point.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::resolver::Caller;
use crate::client::Client;
use crate::gateway::{GatewayError, Query};
use crate::models::{
    profile::{has_dotted_domain, UserProfile, PROFILES_TABLE},
    task::{
        Assignee, CreateTask, Task, TaskPriority, TaskStatus, UpdateTask, UpdateTaskStatus,
        TASKS_TABLE,
    },
};

const NOT_AUTHORIZED_NOTICE: &str = "You are not authorized to add tasks.";
const NOT_AUTHORIZED_EDIT_NOTICE: &str = "You are not authorized to edit tasks.";
const NOT_AUTHORIZED_DELETE_NOTICE: &str = "You are not authorized to delete tasks.";
const INVALID_EMAIL_NOTICE: &str = "Please enter a valid email address";

/// Task workflow errors
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Input rejected before any gateway call
    #[error("{0}")]
    Validation(String),

    /// Caller's role does not allow the operation
    #[error("{0}")]
    NotAuthorized(String),

    /// Destructive operation attempted without confirmation
    #[error("Deletion must be confirmed")]
    NotConfirmed,

    /// No session
    #[error("Not signed in")]
    Unauthenticated,

    /// No task with this id is visible to the caller
    #[error("Task not found")]
    NotFound,

    /// Gateway failure; `notice` is what the user sees
    #[error("{notice}")]
    Remote {
        notice: &'static str,
        #[source]
        source: GatewayError,
    },
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

impl WorkflowError {
    fn remote(notice: &'static str) -> impl FnOnce(GatewayError) -> WorkflowError {
        move |source| {
            tracing::error!(error = %source, notice, "Task gateway call failed");
            WorkflowError::Remote { notice, source }
        }
    }
}

/// Explicit acknowledgement for destructive operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Unconfirmed,
}

impl From<bool> for Confirmation {
    fn from(confirmed: bool) -> Self {
        if confirmed {
            Confirmation::Confirmed
        } else {
            Confirmation::Unconfirmed
        }
    }
}

/// How the form picked an assignee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum Assignment {
    /// Existing user; `None` means the caller
    Id(Option<Uuid>),

    /// Email address, which may or may not belong to an account
    Email(String),
}

impl Default for Assignment {
    fn default() -> Self {
        Assignment::Id(None)
    }
}

/// Task form input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub priority: TaskPriority,

    pub deadline: Option<DateTime<Utc>>,

    #[serde(default)]
    pub assignment: Assignment,
}

impl TaskDraft {
    /// Checks required fields and the assignee address
    ///
    /// Returns the first failing rule's message, in form order.
    pub fn check(&self) -> WorkflowResult<DateTime<Utc>> {
        if self.title.trim().is_empty() {
            return Err(WorkflowError::Validation("Title is required".to_string()));
        }

        let Some(deadline) = self.deadline else {
            return Err(WorkflowError::Validation("Deadline is required".to_string()));
        };

        if let Assignment::Email(email) = &self.assignment {
            if !is_valid_email(email) {
                return Err(WorkflowError::Validation(INVALID_EMAIL_NOTICE.to_string()));
            }
        }

        Ok(deadline)
    }
}

#[derive(Validate)]
struct EmailAddress {
    #[validate(email)]
    value: String,
}

/// Email shape check used for assignees and invitations
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty()
        && !email.contains(char::is_whitespace)
        && has_dotted_domain(email)
        && EmailAddress {
            value: email.to_string(),
        }
        .validate()
        .is_ok()
}

/// Parses a deadline from RFC 3339 or an HTML `datetime-local`/`date` value
///
/// Values without an offset are taken as UTC.
pub fn parse_deadline(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(input) {
        return Some(parsed.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Result of a create or update
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskWrite {
    pub task: Task,

    /// True when the assignee is an email awaiting an invitation
    pub invite_pending: bool,

    /// Status lines for the user, in order
    pub notices: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ProfileId {
    id: Uuid,
}

/// Task operations bound to one client
pub struct TaskService {
    client: Client,
}

impl TaskService {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Tasks visible to the caller, newest first
    ///
    /// Admin tiers see every task; members see tasks assigned to them.
    pub async fn list(&self, caller: &Caller) -> WorkflowResult<Vec<Task>> {
        let mut query = Query::new().order_desc("created_at");
        if !caller.role.can_view_all_tasks() {
            query = query.eq("assigned_to", caller.user_id());
        }

        let tasks: Vec<Task> = self
            .client
            .from(TASKS_TABLE)
            .select(&query)
            .await
            .map_err(WorkflowError::remote("Failed to load tasks."))?;

        tracing::debug!(
            user_id = %caller.user_id(),
            role = %caller.role,
            count = tasks.len(),
            "Loaded tasks"
        );
        Ok(tasks)
    }

    /// Profiles a task can be assigned to
    ///
    /// Admin tiers get every profile; members, or admins whose profile read
    /// fails, get only themselves.
    pub async fn assignable_users(&self, caller: &Caller) -> Vec<UserProfile> {
        let own = || vec![UserProfile::from_auth_user(&caller.session.user)];

        if !caller.role.is_admin_tier() {
            return own();
        }

        match self
            .client
            .from(PROFILES_TABLE)
            .select::<UserProfile>(&Query::new())
            .await
        {
            Ok(profiles) if !profiles.is_empty() => profiles,
            Ok(_) => own(),
            Err(err) => {
                tracing::error!(error = %err, "Error fetching users");
                own()
            }
        }
    }

    /// Turns a form assignment into an [`Assignee`]
    ///
    /// An email that matches a profile resolves to that user; otherwise the
    /// email itself is kept for an invitation.
    pub async fn resolve_assignee(
        &self,
        caller: &Caller,
        assignment: &Assignment,
    ) -> WorkflowResult<Assignee> {
        let email = match assignment {
            Assignment::Id(Some(id)) => return Ok(Assignee::User(*id)),
            Assignment::Id(None) => return Ok(Assignee::User(caller.user_id())),
            Assignment::Email(email) => email.trim(),
        };

        let existing = self
            .client
            .from(PROFILES_TABLE)
            .maybe_single::<ProfileId>(&Query::new().columns("id").eq("email", email))
            .await
            .map_err(WorkflowError::remote("Error checking user existence"))?;

        Ok(match existing {
            Some(profile) => Assignee::User(profile.id),
            None => {
                tracing::info!(email = %email, "Assignee has no account, invitation pending");
                Assignee::Invite(email.to_string())
            }
        })
    }

    /// Creates a pending task
    pub async fn create(&self, caller: &Caller, draft: &TaskDraft) -> WorkflowResult<TaskWrite> {
        require_manager(caller, NOT_AUTHORIZED_NOTICE)?;
        let deadline = draft.check()?;
        let assignee = self.resolve_assignee(caller, &draft.assignment).await?;
        let (assigned_to, assigned_to_email) = assignee.columns();

        let payload = CreateTask {
            title: draft.title.trim().to_string(),
            description: draft.description.trim().to_string(),
            status: TaskStatus::Pending,
            priority: draft.priority,
            deadline,
            assigned_to,
            assigned_to_email,
            created_by: caller.user_id(),
        };

        let task: Task = self
            .client
            .from(TASKS_TABLE)
            .insert(&payload)
            .await
            .map_err(WorkflowError::remote("Failed to create task. Please try again."))?;

        tracing::info!(task_id = %task.id, created_by = %caller.user_id(), "Task created");
        Ok(written(task, &assignee, "Task created successfully!"))
    }

    /// Replaces a task's editable fields; status is left alone
    pub async fn update(
        &self,
        caller: &Caller,
        task_id: Uuid,
        draft: &TaskDraft,
    ) -> WorkflowResult<TaskWrite> {
        require_manager(caller, NOT_AUTHORIZED_EDIT_NOTICE)?;
        let deadline = draft.check()?;
        let assignee = self.resolve_assignee(caller, &draft.assignment).await?;
        let (assigned_to, assigned_to_email) = assignee.columns();

        let payload = UpdateTask {
            title: draft.title.trim().to_string(),
            description: draft.description.trim().to_string(),
            priority: draft.priority,
            deadline,
            assigned_to,
            assigned_to_email,
            updated_at: Utc::now(),
        };

        let task = self
            .client
            .from(TASKS_TABLE)
            .update::<_, Task>(&payload, &Query::new().eq("id", task_id))
            .await
            .map_err(WorkflowError::remote("Failed to update task. Please try again."))?
            .into_iter()
            .next()
            .ok_or(WorkflowError::NotFound)?;

        tracing::info!(task_id = %task.id, "Task updated");
        Ok(written(task, &assignee, "Task updated successfully!"))
    }

    /// Moves a task to any status
    pub async fn update_status(
        &self,
        caller: &Caller,
        task_id: Uuid,
        status: TaskStatus,
    ) -> WorkflowResult<Task> {
        let payload = UpdateTaskStatus {
            status,
            updated_at: Utc::now(),
        };

        let task = self
            .client
            .from(TASKS_TABLE)
            .update::<_, Task>(&payload, &Query::new().eq("id", task_id))
            .await
            .map_err(WorkflowError::remote("Failed to update task status."))?
            .into_iter()
            .next()
            .ok_or(WorkflowError::NotFound)?;

        tracing::info!(
            task_id = %task_id,
            user_id = %caller.user_id(),
            status = %status,
            "Task status updated"
        );
        Ok(task)
    }

    /// Permanently deletes a task
    pub async fn delete(
        &self,
        caller: &Caller,
        task_id: Uuid,
        confirmation: Confirmation,
    ) -> WorkflowResult<()> {
        require_manager(caller, NOT_AUTHORIZED_DELETE_NOTICE)?;
        if confirmation != Confirmation::Confirmed {
            return Err(WorkflowError::NotConfirmed);
        }

        self.client
            .from(TASKS_TABLE)
            .delete(&Query::new().eq("id", task_id))
            .await
            .map_err(WorkflowError::remote("Failed to delete task."))?;

        tracing::info!(task_id = %task_id, user_id = %caller.user_id(), "Task deleted");
        Ok(())
    }

    /// Records an invitation for an email assignee
    ///
    /// No email is sent; the notice is returned for display.
    pub async fn send_invitation(
        &self,
        caller: &Caller,
        email: &str,
        name: Option<&str>,
    ) -> WorkflowResult<String> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(WorkflowError::Validation(INVALID_EMAIL_NOTICE.to_string()));
        }

        tracing::info!(
            email = %email,
            name = name.unwrap_or_default(),
            invited_by = %caller.user_id(),
            "Invitation recorded"
        );
        Ok(format!("Invitation sent to {}", email))
    }
}

fn require_manager(caller: &Caller, notice: &str) -> WorkflowResult<()> {
    if caller.role.can_manage_tasks() {
        Ok(())
    } else {
        tracing::warn!(user_id = %caller.user_id(), role = %caller.role, "Task write refused");
        Err(WorkflowError::NotAuthorized(notice.to_string()))
    }
}

fn written(task: Task, assignee: &Assignee, notice: &str) -> TaskWrite {
    let mut notices = Vec::new();
    if let Assignee::Invite(email) = assignee {
        notices.push(format!("User with email {} will be invited", email));
    }
    notices.push(notice.to_string());

    TaskWrite {
        task,
        invite_pending: assignee.is_invite(),
        notices,
    }
}
