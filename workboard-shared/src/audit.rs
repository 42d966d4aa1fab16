//! Audit trail recorder
//!
//! Services describe what happened with an [`AuditEntry`] and hand it to the
//! [`AuditRecorder`]. The recorder never blocks and never fails: entries go
//! into a bounded channel and a background writer inserts them into
//! `audit_logs` on its own connection, outside any request transaction.
//! A full channel or a failed insert is logged at `warn` and dropped.
//!
//! # Example
//!
//! ```no_run
//! use workboard_shared::audit::{AuditAction, AuditEntry, AuditRecorder, EntityType};
//! use sqlx::PgPool;
//! use uuid::Uuid;
//!
//! # async fn example(pool: PgPool) {
//! let (recorder, writer) = AuditRecorder::spawn(pool, 1024);
//!
//! recorder.record(AuditEntry::new(AuditAction::Login, None, Uuid::new_v4()));
//!
//! // On shutdown: drop every recorder clone, then wait for the drain
//! drop(recorder);
//! writer.await.ok();
//! # }
//! ```

use std::fmt;

use sqlx::PgPool;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::auth::verifier::AuthContext;
use crate::models::audit_log::{AuditLog, NewAuditLog};

/// Default bounded channel capacity
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    CreateTenant,
    UpdateTenant,
    Login,
    Logout,
    CreateUser,
    UpdateUser,
    DeleteUser,
    CreateProject,
    UpdateProject,
    DeleteProject,
    CreateTask,
    UpdateTask,
    UpdateTaskStatus,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::CreateTenant => "CREATE_TENANT",
            AuditAction::UpdateTenant => "UPDATE_TENANT",
            AuditAction::Login => "LOGIN",
            AuditAction::Logout => "LOGOUT",
            AuditAction::CreateUser => "CREATE_USER",
            AuditAction::UpdateUser => "UPDATE_USER",
            AuditAction::DeleteUser => "DELETE_USER",
            AuditAction::CreateProject => "CREATE_PROJECT",
            AuditAction::UpdateProject => "UPDATE_PROJECT",
            AuditAction::DeleteProject => "DELETE_PROJECT",
            AuditAction::CreateTask => "CREATE_TASK",
            AuditAction::UpdateTask => "UPDATE_TASK",
            AuditAction::UpdateTaskStatus => "UPDATE_TASK_STATUS",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityType {
    Tenant,
    User,
    Project,
    Task,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Tenant => "tenant",
            EntityType::User => "user",
            EntityType::Project => "project",
            EntityType::Task => "task",
        }
    }
}

/// One audit record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub tenant_id: Option<Uuid>,
    pub account_id: Uuid,
    pub action: AuditAction,
    pub entity: Option<(EntityType, Uuid)>,
    pub ip_address: Option<String>,
}

impl AuditEntry {
    pub fn new(action: AuditAction, tenant_id: Option<Uuid>, account_id: Uuid) -> Self {
        Self {
            tenant_id,
            account_id,
            action,
            entity: None,
            ip_address: None,
        }
    }

    /// Entry attributed to an authenticated caller
    pub fn by(ctx: &AuthContext, action: AuditAction) -> Self {
        Self::new(action, ctx.tenant_id, ctx.account_id)
    }

    pub fn entity(mut self, entity_type: EntityType, entity_id: Uuid) -> Self {
        self.entity = Some((entity_type, entity_id));
        self
    }

    /// Overrides the tenant, e.g. when a super_admin acts on a tenant
    pub fn tenant(mut self, tenant_id: Uuid) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    pub fn ip(mut self, ip_address: Option<String>) -> Self {
        self.ip_address = ip_address;
        self
    }

    fn into_row(self) -> NewAuditLog {
        NewAuditLog {
            tenant_id: self.tenant_id,
            user_id: Some(self.account_id),
            action: self.action.as_str().to_string(),
            entity_type: self.entity.map(|(t, _)| t.as_str().to_string()),
            entity_id: self.entity.map(|(_, id)| id),
            ip_address: self.ip_address,
        }
    }
}

/// Fire-and-forget handle to the audit writer
///
/// Cheap to clone; all clones feed the same writer task.
#[derive(Debug, Clone)]
pub struct AuditRecorder {
    tx: mpsc::Sender<AuditEntry>,
}

impl AuditRecorder {
    /// Starts the writer task
    ///
    /// The returned handle completes once every recorder clone has been
    /// dropped and the remaining entries are written.
    pub fn spawn(pool: PgPool, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(run_writer(pool, rx));

        (Self { tx }, handle)
    }

    /// Wraps an existing sender; lets callers consume entries themselves
    pub fn from_sender(tx: mpsc::Sender<AuditEntry>) -> Self {
        Self { tx }
    }

    /// Queues an entry without waiting
    pub fn record(&self, entry: AuditEntry) {
        if let Err(err) = self.tx.try_send(entry) {
            let (reason, entry) = match err {
                mpsc::error::TrySendError::Full(entry) => ("channel full", entry),
                mpsc::error::TrySendError::Closed(entry) => ("writer stopped", entry),
            };

            tracing::warn!(
                action = entry.action.as_str(),
                account_id = %entry.account_id,
                reason,
                "Dropping audit entry"
            );
        }
    }
}

async fn run_writer(pool: PgPool, mut rx: mpsc::Receiver<AuditEntry>) {
    tracing::debug!("Audit writer started");

    while let Some(entry) = rx.recv().await {
        let action = entry.action;
        let account_id = entry.account_id;

        if let Err(e) = AuditLog::insert(&pool, entry.into_row()).await {
            tracing::warn!(
                action = action.as_str(),
                account_id = %account_id,
                error = %e,
                "Failed to write audit entry"
            );
        }
    }

    tracing::debug!("Audit writer drained");
}
