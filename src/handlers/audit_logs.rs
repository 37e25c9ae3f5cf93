use axum::extract::{Extension, State};
use serde::Serialize;

use crate::access::resolve_access;
use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path, Query};
use crate::middleware::AuthContext;
use crate::models::{AuditLogEntry, AuditLogQuery};

use super::members::ProjectPath;

#[derive(Serialize)]
pub struct AuditLogPage {
    pub items: Vec<AuditLogEntry>,
    pub total: i64,
}

/// Read the project's audit trail. Owner/admin only; the trail names
/// members and roles, which viewers have no business reading.
pub async fn list_audit_logs(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(path): Path<ProjectPath>,
    Query(query): Query<AuditLogQuery>,
) -> Result<Json<AuditLogPage>> {
    let conn = state.db.get()?;
    let access = resolve_access(&conn, &ctx.user_id, &path.project_id)?;
    if !access.can_manage_members() {
        return Err(AppError::Forbidden("Insufficient permissions".into()));
    }

    let (items, total) = queries::list_audit_entries(&conn, &path.project_id, &query)?;
    Ok(Json(AuditLogPage { items, total }))
}
