//! End-to-end service scenarios against a live database
//!
//! Run with: `cargo test --test service_scenarios -- --ignored --test-threads=1`

mod common;

use chrono::{Duration, NaiveDate};
use uuid::Uuid;
use workboard_shared::audit::AuditRecorder;
use workboard_shared::auth::verifier::AuthContext;
use workboard_shared::error::{is_foreign_key_violation, ServiceError};
use workboard_shared::models::account::{Account, Role};
use workboard_shared::models::audit_log::AuditLog;
use workboard_shared::models::pagination::PageRequest;
use workboard_shared::models::task::{CreateTask, Task, TaskPriority, TaskStatus};
use workboard_shared::models::tenant::{SubscriptionPlan, Tenant, TenantStatus};
use workboard_shared::services::accounts::{AccountChanges, NewMember};
use workboard_shared::services::projects::{NewProject, ProjectChanges, ProjectQuery};
use workboard_shared::services::sessions::{LoginRequest, TenantSelector};
use workboard_shared::services::tasks::{NewTask, TaskQuery, ASSIGNEE_FOREIGN_KEY};
use workboard_shared::services::tenants::RegisterTenant;
use workboard_shared::services::{
    AccountService, Caller, ProjectService, SessionService, TaskService, TenantService,
};

use common::{admin_caller, member_caller, register_tenant, setup_pool, silent_audit};

fn new_member(email: &str) -> NewMember {
    NewMember {
        email: email.to_string(),
        password: "MemberPass123".to_string(),
        full_name: "Member".to_string(),
        role: Role::User,
    }
}

fn new_task(title: &str, priority: TaskPriority, due_date: Option<NaiveDate>) -> NewTask {
    NewTask {
        title: title.to_string(),
        description: None,
        priority: Some(priority),
        assigned_to: None,
        due_date,
    }
}

async fn count_rows(pool: &sqlx::PgPool, table: &str, tenant_id: Uuid) -> i64 {
    let sql = format!("SELECT COUNT(*) FROM {} WHERE tenant_id = $1", table);
    let (count,): (i64,) = sqlx::query_as(&sql)
        .bind(tenant_id)
        .fetch_one(pool)
        .await
        .unwrap();
    count
}

fn new_project(name: &str) -> NewProject {
    NewProject {
        name: name.to_string(),
        description: None,
        status: None,
    }
}

#[tokio::test]
#[ignore]
async fn test_registration_creates_free_tenant_and_admin() {
    let pool = setup_pool().await;
    let reg = register_tenant(&pool, "reg").await;

    let tenant = Tenant::find_by_id(&pool, reg.tenant_id).await.unwrap().unwrap();
    assert_eq!(tenant.status, TenantStatus::Active);
    assert_eq!(tenant.subscription_plan, SubscriptionPlan::Free);
    assert_eq!(tenant.max_users, 5);
    assert_eq!(tenant.max_projects, 3);
    assert_eq!(reg.admin_user.role, Role::TenantAdmin);

    // members go with their tenant
    sqlx::query("DELETE FROM tenants WHERE id = $1")
        .bind(reg.tenant_id)
        .execute(&pool)
        .await
        .unwrap();
    assert!(Account::find_by_id(&pool, reg.admin_user.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
async fn test_subdomain_conflict_ignores_case() {
    let pool = setup_pool().await;
    let reg = register_tenant(&pool, "case").await;

    let result = TenantService::new(pool.clone(), silent_audit())
        .register(
            RegisterTenant {
                tenant_name: "Copycat".to_string(),
                subdomain: reg.subdomain.to_uppercase(),
                admin_email: format!("other-{}@copycat.test", Uuid::new_v4().simple()),
                admin_password: "SecurePass123".to_string(),
                admin_full_name: "Copy Cat".to_string(),
            },
            None,
        )
        .await;

    match result {
        Err(ServiceError::Conflict(msg)) => assert_eq!(msg, "Subdomain already exists"),
        other => panic!("expected conflict, got {:?}", other.map(|r| r.tenant_id)),
    }
}

#[tokio::test]
#[ignore]
async fn test_login_with_mixed_case_subdomain() {
    let pool = setup_pool().await;
    let reg = register_tenant(&pool, "login").await;

    let sessions = SessionService::new(
        pool.clone(),
        silent_audit(),
        "test-secret-key-at-least-32-characters-long".to_string(),
        Duration::hours(24),
    );

    let view = sessions
        .login(
            LoginRequest {
                email: reg.admin_user.email.to_uppercase(),
                password: "SecurePass123".to_string(),
                tenant: TenantSelector::Subdomain(reg.subdomain.to_uppercase()),
            },
            None,
        )
        .await
        .unwrap();

    assert_eq!(view.user.id, reg.admin_user.id);
    assert_eq!(view.expires_in, 86_400);

    let wrong = sessions
        .login(
            LoginRequest {
                email: reg.admin_user.email.clone(),
                password: "WrongPass123".to_string(),
                tenant: TenantSelector::Id(reg.tenant_id),
            },
            None,
        )
        .await;
    assert!(matches!(wrong, Err(ServiceError::Unauthenticated(_))));
}

#[tokio::test]
#[ignore]
async fn test_project_quota_at_limit() {
    let pool = setup_pool().await;
    let reg = register_tenant(&pool, "pquota").await;
    let admin = admin_caller(&reg);
    let projects = ProjectService::new(pool.clone(), silent_audit());

    for i in 0..3 {
        projects
            .create(&admin, new_project(&format!("Project {}", i)))
            .await
            .unwrap();
    }

    match projects.create(&admin, new_project("One too many")).await {
        Err(ServiceError::LimitExceeded(msg)) => assert_eq!(
            msg,
            "Subscription limit reached. Maximum projects limit exceeded."
        ),
        other => panic!("expected limit error, got {:?}", other.map(|p| p.id)),
    }

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM projects WHERE tenant_id = $1")
        .bind(reg.tenant_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 3);
}

#[tokio::test]
#[ignore]
async fn test_user_quota_counts_active_accounts_only() {
    let pool = setup_pool().await;
    let reg = register_tenant(&pool, "uquota").await;
    let admin = admin_caller(&reg);
    let accounts = AccountService::new(pool.clone(), silent_audit());

    // the admin holds the first of five seats
    let mut created = Vec::new();
    for i in 0..4 {
        created.push(
            accounts
                .create(&admin, reg.tenant_id, new_member(&format!("m{}@uquota.test", i)))
                .await
                .unwrap(),
        );
    }

    let sixth = accounts
        .create(&admin, reg.tenant_id, new_member("m5@uquota.test"))
        .await;
    assert!(matches!(sixth, Err(ServiceError::LimitExceeded(_))));

    let deactivate = AccountChanges {
        is_active: Some(false),
        ..Default::default()
    };
    accounts.update(&admin, created[0].id, deactivate).await.unwrap();

    accounts
        .create(&admin, reg.tenant_id, new_member("m5@uquota.test"))
        .await
        .unwrap();

    let reactivate = AccountChanges {
        is_active: Some(true),
        ..Default::default()
    };
    let result = accounts.update(&admin, created[0].id, reactivate).await;
    assert!(matches!(result, Err(ServiceError::LimitExceeded(_))));
}

#[tokio::test]
#[ignore]
async fn test_duplicate_member_email_conflicts() {
    let pool = setup_pool().await;
    let reg = register_tenant(&pool, "dup").await;
    let admin = admin_caller(&reg);
    let accounts = AccountService::new(pool.clone(), silent_audit());

    accounts
        .create(&admin, reg.tenant_id, new_member("same@dup.test"))
        .await
        .unwrap();

    let again = accounts
        .create(&admin, reg.tenant_id, new_member("SAME@dup.test"))
        .await;
    assert!(matches!(again, Err(ServiceError::Conflict(_))));
}

#[tokio::test]
#[ignore]
async fn test_deleting_member_unassigns_tasks() {
    let pool = setup_pool().await;
    let reg = register_tenant(&pool, "unassign").await;
    let admin = admin_caller(&reg);

    let accounts = AccountService::new(pool.clone(), silent_audit());
    let projects = ProjectService::new(pool.clone(), silent_audit());
    let tasks = TaskService::new(pool.clone(), silent_audit());

    let member = accounts
        .create(&admin, reg.tenant_id, new_member("worker@unassign.test"))
        .await
        .unwrap();
    let project = projects.create(&admin, new_project("Board")).await.unwrap();
    let task = tasks
        .create(
            &admin,
            project.id,
            NewTask {
                title: "Ship it".to_string(),
                description: None,
                priority: None,
                assigned_to: Some(member.id),
                due_date: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(task.assigned_to, Some(member.id));

    accounts.delete(&admin, member.id).await.unwrap();

    let task = Task::find_by_id(&pool, task.id).await.unwrap().unwrap();
    assert_eq!(task.assigned_to, None);
}

#[tokio::test]
#[ignore]
async fn test_status_patch_is_idempotent() {
    let pool = setup_pool().await;
    let reg = register_tenant(&pool, "status").await;
    let admin = admin_caller(&reg);

    let projects = ProjectService::new(pool.clone(), silent_audit());
    let tasks = TaskService::new(pool.clone(), silent_audit());

    let project = projects.create(&admin, new_project("Board")).await.unwrap();
    let task = tasks
        .create(
            &admin,
            project.id,
            NewTask {
                title: "Review".to_string(),
                description: None,
                priority: None,
                assigned_to: None,
                due_date: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(task.status, TaskStatus::Todo);

    let first = tasks.update_status(&admin, task.id, TaskStatus::Completed).await.unwrap();
    let second = tasks.update_status(&admin, task.id, TaskStatus::Completed).await.unwrap();
    assert_eq!(first.status, TaskStatus::Completed);
    assert_eq!(second.status, TaskStatus::Completed);

    let listing = tasks
        .list(
            &admin.auth,
            project.id,
            TaskQuery::default(),
            PageRequest::new(None, None, 50),
        )
        .await
        .unwrap();
    assert_eq!(listing.pagination.total, 1);
}

#[tokio::test]
#[ignore]
async fn test_user_cannot_edit_someone_elses_project() {
    let pool = setup_pool().await;
    let reg = register_tenant(&pool, "owner").await;
    let admin = admin_caller(&reg);

    let accounts = AccountService::new(pool.clone(), silent_audit());
    let projects = ProjectService::new(pool.clone(), silent_audit());

    let alice = accounts
        .create(&admin, reg.tenant_id, new_member("alice@owner.test"))
        .await
        .unwrap();
    let bob = accounts
        .create(&admin, reg.tenant_id, new_member("bob@owner.test"))
        .await
        .unwrap();

    let alice = member_caller(alice.id, reg.tenant_id);
    let bob = member_caller(bob.id, reg.tenant_id);

    let project = projects.create(&alice, new_project("Alice's")).await.unwrap();

    let rename = ProjectChanges {
        name: Some("Bob's now".to_string()),
        ..Default::default()
    };
    match projects.update(&bob, project.id, rename.clone()).await {
        Err(ServiceError::AccessDenied(msg)) => {
            assert_eq!(msg, "You can only modify resources you created")
        }
        other => panic!("expected denial, got {:?}", other.map(|p| p.id)),
    }

    let renamed = projects.update(&alice, project.id, rename).await.unwrap();
    assert_eq!(renamed.name, "Bob's now");

    let visible = projects
        .list(&bob.auth, ProjectQuery::default(), PageRequest::new(None, None, 20))
        .await
        .unwrap();
    assert_eq!(visible.pagination.total, 1);
}

#[tokio::test]
#[ignore]
async fn test_tenants_are_isolated() {
    let pool = setup_pool().await;
    let first = register_tenant(&pool, "iso-a").await;
    let second = register_tenant(&pool, "iso-b").await;

    let projects = ProjectService::new(pool.clone(), silent_audit());
    let project = projects
        .create(&admin_caller(&first), new_project("Private"))
        .await
        .unwrap();

    let outsider: Caller = admin_caller(&second);
    let result = projects.delete(&outsider, project.id).await;
    assert!(matches!(result, Err(ServiceError::AccessDenied(_))));

    let accounts = AccountService::new(pool.clone(), silent_audit());
    let result = accounts
        .create(&outsider, first.tenant_id, new_member("intruder@iso.test"))
        .await;
    assert!(matches!(result, Err(ServiceError::AccessDenied(_))));
}

#[tokio::test]
#[ignore]
async fn test_registration_is_audited() {
    let pool = setup_pool().await;
    let (audit, writer) = AuditRecorder::spawn(pool.clone(), 16);

    let subdomain = common::unique_subdomain("audit");
    let reg = TenantService::new(pool.clone(), audit)
        .register(
            RegisterTenant {
                tenant_name: "Audited".to_string(),
                admin_email: format!("admin@{}.test", subdomain),
                subdomain,
                admin_password: "SecurePass123".to_string(),
                admin_full_name: "Admin".to_string(),
            },
            Some("198.51.100.4".to_string()),
        )
        .await
        .unwrap();

    // every recorder clone is gone once the service is dropped
    writer.await.unwrap();

    let entries = AuditLog::list_for_tenant(&pool, reg.tenant_id, 10).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "CREATE_TENANT");
    assert_eq!(entries[0].user_id, Some(reg.admin_user.id));
    assert_eq!(entries[0].ip_address.as_deref(), Some("198.51.100.4"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_concurrent_project_creation_respects_limit() {
    let pool = setup_pool().await;
    let reg = register_tenant(&pool, "race-p").await;
    let admin = admin_caller(&reg);
    let projects = ProjectService::new(pool.clone(), silent_audit());

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let projects = projects.clone();
            let admin = admin.clone();
            tokio::spawn(async move {
                projects
                    .create(&admin, new_project(&format!("Parallel {}", i)))
                    .await
            })
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(ServiceError::LimitExceeded(_)) => {}
            Err(e) => panic!("unexpected error: {:?}", e),
        }
    }

    assert_eq!(succeeded, 3);
    assert_eq!(count_rows(&pool, "projects", reg.tenant_id).await, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_concurrent_member_creation_respects_limit() {
    let pool = setup_pool().await;
    let reg = register_tenant(&pool, "race-u").await;
    let admin = admin_caller(&reg);
    let accounts = AccountService::new(pool.clone(), silent_audit());
    let tenant_id = reg.tenant_id;

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let accounts = accounts.clone();
            let admin = admin.clone();
            tokio::spawn(async move {
                accounts
                    .create(&admin, tenant_id, new_member(&format!("p{}@race.test", i)))
                    .await
            })
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(ServiceError::LimitExceeded(_)) => {}
            Err(e) => panic!("unexpected error: {:?}", e),
        }
    }

    // the admin already holds one of the five seats
    assert_eq!(succeeded, 4);
    assert_eq!(count_rows(&pool, "users", reg.tenant_id).await, 5);
}

#[tokio::test]
#[ignore]
async fn test_task_listing_order() {
    let pool = setup_pool().await;
    let reg = register_tenant(&pool, "order").await;
    let admin = admin_caller(&reg);

    let projects = ProjectService::new(pool.clone(), silent_audit());
    let tasks = TaskService::new(pool.clone(), silent_audit());
    let project = projects.create(&admin, new_project("Board")).await.unwrap();

    let early = NaiveDate::from_ymd_opt(2026, 1, 10);
    let late = NaiveDate::from_ymd_opt(2026, 6, 30);

    for task in [
        new_task("low-early", TaskPriority::Low, early),
        new_task("high-none", TaskPriority::High, None),
        new_task("high-late", TaskPriority::High, late),
        new_task("medium-none", TaskPriority::Medium, None),
        new_task("high-early", TaskPriority::High, early),
    ] {
        tasks.create(&admin, project.id, task).await.unwrap();
    }

    let listing = tasks
        .list(
            &admin.auth,
            project.id,
            TaskQuery::default(),
            PageRequest::new(None, None, 50),
        )
        .await
        .unwrap();

    let titles: Vec<_> = listing.items.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(
        titles,
        ["high-early", "high-late", "high-none", "medium-none", "low-early"]
    );
}

#[tokio::test]
#[ignore]
async fn test_super_admin_manages_tasks_in_any_tenant() {
    let pool = setup_pool().await;
    let reg = register_tenant(&pool, "root-task").await;

    let projects = ProjectService::new(pool.clone(), silent_audit());
    let tasks = TaskService::new(pool.clone(), silent_audit());
    let project = projects
        .create(&admin_caller(&reg), new_project("Board"))
        .await
        .unwrap();

    let root = Caller::new(
        AuthContext {
            account_id: Uuid::new_v4(),
            tenant_id: None,
            role: Role::SuperAdmin,
        },
        None,
    );

    let task = tasks
        .create(&root, project.id, new_task("Triage", TaskPriority::High, None))
        .await
        .unwrap();
    assert_eq!(task.tenant_id, reg.tenant_id);

    let task = tasks
        .update_status(&root, task.id, TaskStatus::InProgress)
        .await
        .unwrap();
    assert_eq!(task.status, TaskStatus::InProgress);

    // project creation still needs a tenant
    let result = projects.create(&root, new_project("Nowhere")).await;
    assert!(matches!(result, Err(ServiceError::AccessDenied(_))));
}

#[tokio::test]
#[ignore]
async fn test_missing_assignee_is_a_foreign_key_violation() {
    let pool = setup_pool().await;
    let reg = register_tenant(&pool, "fk").await;
    let project = ProjectService::new(pool.clone(), silent_audit())
        .create(&admin_caller(&reg), new_project("Board"))
        .await
        .unwrap();

    let err = Task::create(
        &pool,
        CreateTask {
            project_id: project.id,
            tenant_id: reg.tenant_id,
            title: "Orphan".to_string(),
            description: None,
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            assigned_to: Some(Uuid::new_v4()),
            due_date: None,
        },
    )
    .await
    .unwrap_err();

    assert!(is_foreign_key_violation(&err, ASSIGNEE_FOREIGN_KEY));

    // the service reports it as bad input rather than a server error
    let result = TaskService::new(pool.clone(), silent_audit())
        .create(
            &admin_caller(&reg),
            project.id,
            NewTask {
                assigned_to: Some(Uuid::new_v4()),
                ..new_task("Orphan", TaskPriority::Medium, None)
            },
        )
        .await;
    match result {
        Err(ServiceError::InvalidInput(msg)) => assert_eq!(msg, "Assigned user not found"),
        other => panic!("expected invalid input, got {:?}", other.map(|t| t.id)),
    }
}

#[tokio::test]
#[ignore]
async fn test_login_is_audited_against_the_account() {
    let pool = setup_pool().await;
    let reg = register_tenant(&pool, "login-audit").await;
    let (audit, writer) = AuditRecorder::spawn(pool.clone(), 16);

    let sessions = SessionService::new(
        pool.clone(),
        audit,
        "test-secret-key-at-least-32-characters-long".to_string(),
        Duration::hours(24),
    );
    sessions
        .login(
            LoginRequest {
                email: reg.admin_user.email.clone(),
                password: "SecurePass123".to_string(),
                tenant: TenantSelector::Id(reg.tenant_id),
            },
            Some("203.0.113.9".to_string()),
        )
        .await
        .unwrap();
    drop(sessions);
    writer.await.unwrap();

    let entries = AuditLog::list_for_tenant(&pool, reg.tenant_id, 10).await.unwrap();
    let login = entries
        .iter()
        .find(|e| e.action == "LOGIN")
        .expect("login entry");
    assert_eq!(login.user_id, Some(reg.admin_user.id));
    assert_eq!(login.entity_type.as_deref(), Some("user"));
    assert_eq!(login.entity_id, Some(reg.admin_user.id));
    assert_eq!(login.ip_address.as_deref(), Some("203.0.113.9"));
}
