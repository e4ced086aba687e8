/// Integration tests for the task workflow
///
/// Runs against the in-memory gateway; no external services needed.
/// Run with: cargo test --test task_workflow_tests

use chrono::{Duration, Utc};
use granite_shared::auth::resolver::{Caller, RoleResolver};
use granite_shared::client::Client;
use granite_shared::gateway::memory::{Call, MemoryGateway, TableOp};
use granite_shared::gateway::GatewayError;
use granite_shared::models::profile::PROFILES_TABLE;
use granite_shared::models::role::Role;
use granite_shared::models::task::{TaskPriority, TaskStatus, TASKS_TABLE};
use granite_shared::tasks::{Assignment, Confirmation, TaskDraft, TaskService, WorkflowError};
use std::sync::Arc;

/// Signs a user in and resolves them into a caller
async fn caller(gateway: &Arc<MemoryGateway>, email: &str, role: Role) -> (Client, Caller) {
    let user = gateway.add_user(email, "password123", Some(role)).await;
    let session = gateway.session_for(&user).await;
    let client = Client::restore(gateway.clone(), &session.access_token)
        .await
        .expect("Failed to restore client");
    let caller = RoleResolver::new(&client)
        .resolve()
        .await
        .caller()
        .cloned()
        .expect("Caller should be authenticated");
    (client, caller)
}

fn draft(title: &str, assignment: Assignment) -> TaskDraft {
    TaskDraft {
        title: title.to_string(),
        description: "  details  ".to_string(),
        priority: TaskPriority::High,
        deadline: Some(Utc::now() + Duration::days(2)),
        assignment,
    }
}

#[tokio::test]
async fn test_member_sees_only_assigned_tasks() {
    let gateway = Arc::new(MemoryGateway::new());
    let (admin_client, admin) = caller(&gateway, "admin@example.com", Role::OrgAdmin).await;
    let (member_client, member) = caller(&gateway, "member@example.com", Role::Member).await;

    let admin_tasks = TaskService::new(admin_client);
    admin_tasks
        .create(&admin, &draft("For member", Assignment::Id(Some(member.user_id()))))
        .await
        .expect("Failed to create task");
    admin_tasks
        .create(&admin, &draft("For admin", Assignment::Id(None)))
        .await
        .expect("Failed to create task");

    let visible = TaskService::new(member_client).list(&member).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert!(visible.iter().all(|t| t.assigned_to == Some(member.user_id())));

    let all = admin_tasks.list(&admin).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn test_list_is_newest_first() {
    let gateway = Arc::new(MemoryGateway::new());
    let (client, admin) = caller(&gateway, "admin@example.com", Role::SystemAdmin).await;
    let base = Utc::now();

    for (title, age) in [("old", 5), ("new", 0), ("mid", 2)] {
        gateway
            .seed(
                TASKS_TABLE,
                serde_json::json!({
                    "title": title,
                    "status": "pending",
                    "priority": "low",
                    "deadline": base,
                    "created_at": base - Duration::days(age),
                    "updated_at": base,
                }),
            )
            .await;
    }

    let titles: Vec<String> = TaskService::new(client)
        .list(&admin)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.title)
        .collect();
    assert_eq!(titles, vec!["new", "mid", "old"]);
}

#[tokio::test]
async fn test_member_cannot_create() {
    let gateway = Arc::new(MemoryGateway::new());
    let (client, member) = caller(&gateway, "member@example.com", Role::Member).await;

    let err = TaskService::new(client)
        .create(&member, &draft("Nope", Assignment::Id(None)))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NotAuthorized(_)));
    assert_eq!(err.to_string(), "You are not authorized to add tasks.");
    assert!(gateway.rows(TASKS_TABLE).await.is_empty());
}

#[tokio::test]
async fn test_email_assignment_round_trip() {
    let gateway = Arc::new(MemoryGateway::new());
    let (client, admin) = caller(&gateway, "admin@example.com", Role::OrgAdmin).await;
    let existing = gateway.add_user("known@example.com", "password123", None).await;
    let tasks = TaskService::new(client);

    let invited = tasks
        .create(&admin, &draft("Invite", Assignment::Email("stranger@example.com".into())))
        .await
        .unwrap();
    assert!(invited.invite_pending);
    assert_eq!(invited.task.assigned_to, None);
    assert_eq!(invited.task.assigned_to_email.as_deref(), Some("stranger@example.com"));
    assert_eq!(
        invited.notices,
        vec![
            "User with email stranger@example.com will be invited".to_string(),
            "Task created successfully!".to_string(),
        ]
    );

    let resolved = tasks
        .create(&admin, &draft("Known", Assignment::Email("known@example.com".into())))
        .await
        .unwrap();
    assert!(!resolved.invite_pending);
    assert_eq!(resolved.task.assigned_to, Some(existing.id));
    assert_eq!(resolved.task.assigned_to_email, None);
}

#[tokio::test]
async fn test_duplicate_profile_email_is_not_an_invite() {
    let gateway = Arc::new(MemoryGateway::new());
    let (client, admin) = caller(&gateway, "admin@example.com", Role::OrgAdmin).await;
    for _ in 0..2 {
        gateway
            .seed(
                PROFILES_TABLE,
                serde_json::json!({ "id": uuid::Uuid::new_v4(), "email": "twin@example.com" }),
            )
            .await;
    }

    let err = TaskService::new(client)
        .resolve_assignee(&admin, &Assignment::Email("twin@example.com".into()))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Error checking user existence");
    assert!(gateway.rows(TASKS_TABLE).await.is_empty());
}

#[tokio::test]
async fn test_create_forces_pending_and_trims() {
    let gateway = Arc::new(MemoryGateway::new());
    let (client, admin) = caller(&gateway, "admin@example.com", Role::OrgAdmin).await;

    let written = TaskService::new(client)
        .create(&admin, &draft("  Ship it  ", Assignment::Id(None)))
        .await
        .unwrap();
    assert_eq!(written.task.status, TaskStatus::Pending);
    assert_eq!(written.task.title, "Ship it");
    assert_eq!(written.task.description, "details");
    assert_eq!(written.task.created_by, Some(admin.user_id()));
    assert_eq!(written.task.assigned_to, Some(admin.user_id()));
}

#[tokio::test]
async fn test_assignee_lookup_failure_aborts_create() {
    let gateway = Arc::new(MemoryGateway::new());
    let (client, admin) = caller(&gateway, "admin@example.com", Role::OrgAdmin).await;
    gateway
        .fail_next(
            "user_profiles",
            TableOp::Select,
            GatewayError::Transport("timeout".into()),
        )
        .await;

    let err = TaskService::new(client)
        .create(&admin, &draft("Lookup", Assignment::Email("x@example.com".into())))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Error checking user existence");
    assert!(gateway.rows(TASKS_TABLE).await.is_empty());
}

#[tokio::test]
async fn test_pending_to_cancelled_directly() {
    let gateway = Arc::new(MemoryGateway::new());
    let (admin_client, admin) = caller(&gateway, "admin@example.com", Role::OrgAdmin).await;
    let (member_client, member) = caller(&gateway, "member@example.com", Role::Member).await;

    let created = TaskService::new(admin_client)
        .create(&admin, &draft("Cancel me", Assignment::Id(Some(member.user_id()))))
        .await
        .unwrap();
    assert_eq!(created.task.status, TaskStatus::Pending);

    let updated = TaskService::new(member_client)
        .update_status(&member, created.task.id, TaskStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(updated.status, TaskStatus::Cancelled);
    assert!(updated.updated_at >= created.task.updated_at);
}

#[tokio::test]
async fn test_update_keeps_status() {
    let gateway = Arc::new(MemoryGateway::new());
    let (client, admin) = caller(&gateway, "admin@example.com", Role::OrgAdmin).await;
    let tasks = TaskService::new(client);

    let created = tasks.create(&admin, &draft("Draft", Assignment::Id(None))).await.unwrap();
    tasks
        .update_status(&admin, created.task.id, TaskStatus::InProgress)
        .await
        .unwrap();

    let mut edit = draft("Final", Assignment::Email("later@example.com".into()));
    edit.priority = TaskPriority::Low;
    let updated = tasks.update(&admin, created.task.id, &edit).await.unwrap();

    assert_eq!(updated.task.title, "Final");
    assert_eq!(updated.task.priority, TaskPriority::Low);
    assert_eq!(updated.task.status, TaskStatus::InProgress);
    assert_eq!(updated.task.assigned_to, None);
    assert_eq!(updated.task.assigned_to_email.as_deref(), Some("later@example.com"));
}

#[tokio::test]
async fn test_update_unknown_task_is_not_found() {
    let gateway = Arc::new(MemoryGateway::new());
    let (client, admin) = caller(&gateway, "admin@example.com", Role::OrgAdmin).await;

    let err = TaskService::new(client)
        .update_status(&admin, uuid::Uuid::new_v4(), TaskStatus::Completed)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NotFound));
}

#[tokio::test]
async fn test_delete_requires_confirmation() {
    let gateway = Arc::new(MemoryGateway::new());
    let (client, admin) = caller(&gateway, "admin@example.com", Role::OrgAdmin).await;
    let tasks = TaskService::new(client);
    let created = tasks.create(&admin, &draft("Temp", Assignment::Id(None))).await.unwrap();

    let err = tasks
        .delete(&admin, created.task.id, Confirmation::Unconfirmed)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NotConfirmed));
    assert!(!gateway
        .calls()
        .await
        .contains(&Call::Table(TableOp::Delete, TASKS_TABLE.to_string())));

    tasks
        .delete(&admin, created.task.id, Confirmation::Confirmed)
        .await
        .unwrap();
    assert!(gateway.rows(TASKS_TABLE).await.is_empty());
}

#[tokio::test]
async fn test_member_cannot_delete() {
    let gateway = Arc::new(MemoryGateway::new());
    let (admin_client, admin) = caller(&gateway, "admin@example.com", Role::OrgAdmin).await;
    let (member_client, member) = caller(&gateway, "member@example.com", Role::Member).await;
    let created = TaskService::new(admin_client)
        .create(&admin, &draft("Keep me", Assignment::Id(Some(member.user_id()))))
        .await
        .unwrap();

    let err = TaskService::new(member_client)
        .delete(&member, created.task.id, Confirmation::Confirmed)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NotAuthorized(_)));
    assert_eq!(err.to_string(), "You are not authorized to delete tasks.");
    assert_eq!(gateway.rows(TASKS_TABLE).await.len(), 1);
}

#[tokio::test]
async fn test_member_cannot_update() {
    let gateway = Arc::new(MemoryGateway::new());
    let (admin_client, admin) = caller(&gateway, "admin@example.com", Role::OrgAdmin).await;
    let (member_client, member) = caller(&gateway, "member@example.com", Role::Member).await;
    let created = TaskService::new(admin_client)
        .create(&admin, &draft("Original", Assignment::Id(Some(member.user_id()))))
        .await
        .unwrap();

    let err = TaskService::new(member_client)
        .update(&member, created.task.id, &draft("Renamed", Assignment::Id(None)))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "You are not authorized to edit tasks.");
    assert_eq!(gateway.rows(TASKS_TABLE).await[0]["title"], "Original");
}

#[tokio::test]
async fn test_gateway_failures_carry_notices() {
    let gateway = Arc::new(MemoryGateway::new());
    let (client, admin) = caller(&gateway, "admin@example.com", Role::OrgAdmin).await;
    let tasks = TaskService::new(client);

    gateway
        .fail_next(TASKS_TABLE, TableOp::Insert, GatewayError::PermissionDenied("rls".into()))
        .await;
    let err = tasks
        .create(&admin, &draft("Denied", Assignment::Id(None)))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Failed to create task. Please try again.");

    gateway
        .fail_next(TASKS_TABLE, TableOp::Delete, GatewayError::Transport("reset".into()))
        .await;
    let err = tasks
        .delete(&admin, uuid::Uuid::new_v4(), Confirmation::Confirmed)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Failed to delete task.");

    gateway
        .fail_next(TASKS_TABLE, TableOp::Select, GatewayError::Transport("reset".into()))
        .await;
    assert_eq!(tasks.list(&admin).await.unwrap_err().to_string(), "Failed to load tasks.");
}

#[tokio::test]
async fn test_assignable_users_by_role() {
    let gateway = Arc::new(MemoryGateway::new());
    let (admin_client, admin) = caller(&gateway, "admin@example.com", Role::OrgAdmin).await;
    let (member_client, member) = caller(&gateway, "member@example.com", Role::Member).await;

    let for_admin = TaskService::new(admin_client).assignable_users(&admin).await;
    assert_eq!(for_admin.len(), 2);

    let for_member = TaskService::new(member_client).assignable_users(&member).await;
    assert_eq!(for_member.len(), 1);
    assert_eq!(for_member[0].id, member.user_id());
}

#[tokio::test]
async fn test_send_invitation_stub() {
    let gateway = Arc::new(MemoryGateway::new());
    let (client, admin) = caller(&gateway, "admin@example.com", Role::OrgAdmin).await;
    let tasks = TaskService::new(client);

    assert_eq!(
        tasks.send_invitation(&admin, "new@example.com", Some("New Person")).await.unwrap(),
        "Invitation sent to new@example.com"
    );
    assert!(matches!(
        tasks.send_invitation(&admin, "nope", None).await,
        Err(WorkflowError::Validation(_))
    ));
}
