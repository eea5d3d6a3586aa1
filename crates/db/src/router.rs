//! Role-scoped routing between the application's databases.
//!
//! The active role is task-local: every Tokio task starts on
//! [`DatabaseRole::Primary`] and a role bound with [`DatabaseRouter::with_role`]
//! is visible only to the future it wraps. Scopes nest, and leaving a scope
//! restores the enclosing role whether the operation returns, errors, or panics.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use sqlx::AnyPool;
use tokio::task::JoinHandle;

use annexx_kernel::settings::DatabaseSettings;

use crate::error::DbError;
use crate::role::{Component, DatabaseRole};
use crate::target::{DatabaseTarget, SqlTarget};

tokio::task_local! {
    static ACTIVE_ROLE: DatabaseRole;
}

/// Role active for the current task, `primary` outside any scope.
pub fn current_role() -> DatabaseRole {
    ACTIVE_ROLE.try_with(|role| *role).unwrap_or_default()
}

/// Connectivity of one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleStatus {
    pub ok: bool,
    pub detail: String,
}

impl RoleStatus {
    fn healthy() -> Self {
        Self {
            ok: true,
            detail: "connection active".to_string(),
        }
    }

    fn failed(detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            detail: detail.into(),
        }
    }
}

/// Status of every role, serialized as `{role: {ok, detail}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DatabaseStatus(BTreeMap<DatabaseRole, RoleStatus>);

impl DatabaseStatus {
    pub fn all_ok(&self) -> bool {
        self.0.values().all(|status| status.ok)
    }

    pub fn get(&self, role: DatabaseRole) -> Option<&RoleStatus> {
        self.0.get(&role)
    }
}

/// Maps each [`DatabaseRole`] to exactly one target.
#[derive(Debug, Clone)]
pub struct DatabaseRouter {
    targets: [Arc<dyn DatabaseTarget>; 4],
}

impl DatabaseRouter {
    pub fn builder() -> DatabaseRouterBuilder {
        DatabaseRouterBuilder::default()
    }

    /// One lazily-connecting sqlx pool per role. Must be called within a Tokio runtime.
    pub fn from_settings(settings: &DatabaseSettings) -> Result<Self, DbError> {
        let mut builder = Self::builder();
        for role in DatabaseRole::ALL {
            let target_settings = match role {
                DatabaseRole::Primary => &settings.primary,
                DatabaseRole::Cache => &settings.cache,
                DatabaseRole::Queue => &settings.queue,
                DatabaseRole::Cable => &settings.cable,
            };
            let target = SqlTarget::connect_lazy(role, target_settings)?;
            tracing::debug!(
                target: "annexx-db",
                role = %role,
                location = %target.describe(),
                "configured database target"
            );
            builder = builder.target(role, Arc::new(target));
        }
        builder.build()
    }

    pub fn target(&self, role: DatabaseRole) -> &Arc<dyn DatabaseTarget> {
        &self.targets[role.index()]
    }

    /// Target for the role active in the current task.
    pub fn connection(&self) -> &Arc<dyn DatabaseTarget> {
        self.target(current_role())
    }

    /// Pool for the role active in the current task; queries issued on it
    /// reach that role's database.
    pub fn pool(&self) -> Result<&AnyPool, DbError> {
        let role = current_role();
        self.target(role).pool().ok_or(DbError::NoPool(role))
    }

    pub fn current_role(&self) -> DatabaseRole {
        current_role()
    }

    /// Run `operation` with the role named `role` active.
    ///
    /// Fails with [`DbError::UnknownRole`] before running anything when the
    /// name is not a known role.
    pub async fn bind_role<F>(&self, role: &str, operation: F) -> Result<F::Output, DbError>
    where
        F: Future,
    {
        let role: DatabaseRole = role.parse()?;
        Ok(self.with_role(role, operation).await)
    }

    /// Run `operation` with `role` active, restoring the previous role afterwards.
    pub async fn with_role<F>(&self, role: DatabaseRole, operation: F) -> F::Output
    where
        F: Future,
    {
        tracing::trace!(target: "annexx-db", from = %current_role(), to = %role, "binding database role");
        ACTIVE_ROLE.scope(role, operation).await
    }

    /// Synchronous counterpart of [`DatabaseRouter::with_role`].
    pub fn sync_with_role<R>(&self, role: DatabaseRole, operation: impl FnOnce() -> R) -> R {
        ACTIVE_ROLE.sync_scope(role, operation)
    }

    /// Run `operation` against the database that stores `component`'s data.
    pub async fn for_component<F>(&self, component: Component, operation: F) -> F::Output
    where
        F: Future,
    {
        self.with_role(component.role(), operation).await
    }

    /// Liveness of one role. Failures are reported, never returned.
    pub async fn status_of(&self, role: DatabaseRole) -> RoleStatus {
        collect_status(role, self.spawn_check(role)).await
    }

    /// Liveness of every role, checked concurrently. One unreachable database
    /// only degrades its own entry.
    pub async fn status_all(&self) -> DatabaseStatus {
        let checks: Vec<_> = DatabaseRole::ALL
            .into_iter()
            .map(|role| (role, self.spawn_check(role)))
            .collect();

        let mut statuses = BTreeMap::new();
        for (role, check) in checks {
            statuses.insert(role, collect_status(role, check).await);
        }
        DatabaseStatus(statuses)
    }

    /// Ping `role` on its own task so a slow or panicking target stays contained.
    fn spawn_check(&self, role: DatabaseRole) -> JoinHandle<RoleStatus> {
        let target = Arc::clone(self.target(role));
        tokio::spawn(ACTIVE_ROLE.scope(role, async move {
            match target.ping().await {
                Ok(()) => RoleStatus::healthy(),
                Err(failure) => {
                    tracing::warn!(
                        target: "annexx-db",
                        role = %role,
                        location = %target.describe(),
                        error = %failure,
                        "database liveness check failed"
                    );
                    RoleStatus::failed(failure.to_string())
                }
            }
        }))
    }
}

async fn collect_status(role: DatabaseRole, check: JoinHandle<RoleStatus>) -> RoleStatus {
    match check.await {
        Ok(status) => status,
        Err(err) => {
            tracing::error!(
                target: "annexx-db",
                role = %role,
                error = %err,
                "database liveness check aborted"
            );
            if err.is_panic() {
                RoleStatus::failed("liveness check panicked")
            } else {
                RoleStatus::failed("liveness check cancelled")
            }
        }
    }
}

/// Collects one target per role; [`DatabaseRouterBuilder::build`] rejects gaps.
#[derive(Debug, Default)]
pub struct DatabaseRouterBuilder {
    targets: [Option<Arc<dyn DatabaseTarget>>; 4],
}

impl DatabaseRouterBuilder {
    pub fn target(mut self, role: DatabaseRole, target: Arc<dyn DatabaseTarget>) -> Self {
        self.targets[role.index()] = Some(target);
        self
    }

    pub fn build(self) -> Result<DatabaseRouter, DbError> {
        let [primary, cache, queue, cable] = self.targets;
        Ok(DatabaseRouter {
            targets: [
                primary.ok_or(DbError::MissingTarget(DatabaseRole::Primary))?,
                cache.ok_or(DbError::MissingTarget(DatabaseRole::Cache))?,
                queue.ok_or(DbError::MissingTarget(DatabaseRole::Queue))?,
                cable.ok_or(DbError::MissingTarget(DatabaseRole::Cable))?,
            ],
        })
    }
}
