/// Task list presentation helpers
///
/// Pure functions over already loaded tasks: status filter, text search,
/// sorting, counters, and assignee display names. Nothing here talks to the
/// gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::str::FromStr;

use crate::models::{
    profile::UserProfile,
    task::{Task, TaskStatus},
};

/// Status filter for the task list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(TaskStatus),
}

impl StatusFilter {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(status) => task.status == *status,
        }
    }

    /// List heading, e.g. "All Tasks" or "In progress Tasks"
    pub fn heading(&self) -> String {
        match self {
            StatusFilter::All => "All Tasks".to_string(),
            StatusFilter::Only(status) => format!("{} Tasks", capitalize(&status.label())),
        }
    }

    /// Caption under the heading
    pub fn caption(&self, shown: usize) -> String {
        if shown == 0 {
            return match self {
                StatusFilter::All => "No tasks found".to_string(),
                StatusFilter::Only(status) => format!("No {} tasks found", status.label()),
            };
        }
        format!("Showing {} task{}", shown, if shown == 1 { "" } else { "s" })
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s == "all" {
            return Ok(StatusFilter::All);
        }
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .map(StatusFilter::Only)
            .ok_or_else(|| format!("Unknown status filter: {}", s))
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Case-insensitive substring match on title or description
///
/// An empty term matches everything.
pub fn matches_search(task: &Task, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    term.is_empty()
        || task.title.to_lowercase().contains(&term)
        || task.description.to_lowercase().contains(&term)
}

/// Sort order for the task list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Earliest deadline first
    #[default]
    Deadline,

    /// High, then medium, then low
    Priority,

    /// Newest first
    CreatedAt,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "deadline" => Ok(SortKey::Deadline),
            "priority" => Ok(SortKey::Priority),
            "created_at" => Ok(SortKey::CreatedAt),
            other => Err(format!("Unknown sort key: {}", other)),
        }
    }
}

/// Sorts in place; ties keep their existing order
pub fn sort_tasks(tasks: &mut [Task], key: SortKey) {
    match key {
        SortKey::Deadline => tasks.sort_by_key(|t| t.deadline),
        SortKey::Priority => tasks.sort_by_key(|t| Reverse(t.priority.rank())),
        SortKey::CreatedAt => tasks.sort_by_key(|t| Reverse(t.created_at)),
    }
}

/// Applies filter and search, then sorts
pub fn filter_and_sort(tasks: &[Task], filter: StatusFilter, search: &str, key: SortKey) -> Vec<Task> {
    let mut shown: Vec<Task> = tasks
        .iter()
        .filter(|t| filter.matches(t) && matches_search(t, search))
        .cloned()
        .collect();
    sort_tasks(&mut shown, key);
    shown
}

/// Dashboard counters over the unfiltered task list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub overdue: usize,

    /// Completed share of all tasks, rounded percent
    pub completion_rate: u32,
}

impl TaskStats {
    pub fn compute(tasks: &[Task], now: DateTime<Utc>) -> Self {
        let count = |status: TaskStatus| tasks.iter().filter(|t| t.status == status).count();

        let total = tasks.len();
        let completed = count(TaskStatus::Completed);
        let completion_rate = if total == 0 {
            0
        } else {
            (completed as f64 / total as f64 * 100.0).round() as u32
        };

        Self {
            total,
            pending: count(TaskStatus::Pending),
            in_progress: count(TaskStatus::InProgress),
            completed,
            overdue: tasks.iter().filter(|t| t.is_overdue_at(now)).count(),
            completion_rate,
        }
    }
}

/// Label for a task's assignee
///
/// Pending invitation email, then the profile's full name, then its email,
/// then the raw id. Tasks with neither column set are "Unassigned".
pub fn display_name(task: &Task, users: &[UserProfile]) -> String {
    if let Some(email) = task.assigned_to_email.as_deref().filter(|e| !e.is_empty()) {
        return email.to_string();
    }

    let Some(id) = task.assigned_to else {
        return "Unassigned".to_string();
    };

    match users.iter().find(|u| u.id == id) {
        Some(user) => user.full_name().unwrap_or_else(|| {
            if user.email.is_empty() {
                id.to_string()
            } else {
                user.email.clone()
            }
        }),
        None => id.to_string(),
    }
}
