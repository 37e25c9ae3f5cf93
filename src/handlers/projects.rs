use axum::extract::{Extension, State};

use crate::access::resolve_access;
use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path};
use crate::middleware::AuthContext;
use crate::models::{CreateProject, Project};

use super::members::ProjectPath;

pub async fn create_project(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(input): Json<CreateProject>,
) -> Result<Json<Project>> {
    if input.name.trim().is_empty() {
        return Err(AppError::BadRequest("Project name is required".into()));
    }
    let conn = state.db.get()?;
    let project = queries::create_project(&conn, &ctx.user_id, &input)?;
    tracing::info!(project_id = %project.id, "project created");
    Ok(Json(project))
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<Vec<Project>>> {
    let conn = state.db.get()?;
    let projects = queries::list_projects_for_user(&conn, &ctx.user_id)?;
    Ok(Json(projects))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(path): Path<ProjectPath>,
) -> Result<Json<Project>> {
    let conn = state.db.get()?;
    let access = resolve_access(&conn, &ctx.user_id, &path.project_id)?;
    if !access.has_access() {
        return Err(AppError::Forbidden("Insufficient permissions".into()));
    }
    let project = queries::get_project_by_id(&conn, &path.project_id)?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))?;
    Ok(Json(project))
}
