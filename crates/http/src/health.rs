//! Liveness and per-database health endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use annexx_db::{DatabaseRole, DatabaseRouter, DatabaseStatus, RoleStatus};
use annexx_kernel::settings::DATABASE_HEALTH_PREFIX;

use crate::error::AppError;

#[derive(Clone)]
pub struct HealthState {
    pub databases: Arc<DatabaseRouter>,
}

/// Database status routes under `/healthz/databases`.
pub fn routes(databases: Arc<DatabaseRouter>) -> Router {
    Router::new()
        .route(DATABASE_HEALTH_PREFIX, get(all_databases))
        .route(&format!("{DATABASE_HEALTH_PREFIX}/{{role}}"), get(one_database))
        .with_state(HealthState { databases })
}

/// Process liveness; does not touch any database.
pub async fn up() -> &'static str {
    "ok"
}

fn status_code(ok: bool) -> StatusCode {
    if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn all_databases(State(state): State<HealthState>) -> (StatusCode, Json<DatabaseStatus>) {
    let status = state.databases.status_all().await;
    (status_code(status.all_ok()), Json(status))
}

async fn one_database(
    State(state): State<HealthState>,
    Path(role): Path<String>,
) -> Result<(StatusCode, Json<RoleStatus>), AppError> {
    let role: DatabaseRole = role.parse()?;
    let status = state.databases.status_of(role).await;
    Ok((status_code(status.ok), Json(status)))
}
