use axum::extract::{Extension, State};
use axum::http::HeaderMap;

use crate::access::resolve_access;
use crate::db::AppState;
use crate::engine;
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path};
use crate::middleware::AuthContext;
use crate::models::{CreateInvitation, MemberEntry, ProjectMember, UpdateMemberRole};
use crate::util::RequestInfo;

#[derive(serde::Deserialize)]
pub struct ProjectPath {
    pub project_id: String,
}

#[derive(serde::Deserialize)]
pub struct MemberPath {
    pub project_id: String,
    pub member_id: String,
}

pub async fn invite_member(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(path): Path<ProjectPath>,
    headers: HeaderMap,
    Json(input): Json<CreateInvitation>,
) -> Result<Json<ProjectMember>> {
    let req = RequestInfo::from_headers(&headers);
    let member = engine::invite(
        &state,
        &ctx.user_id,
        &ctx.email,
        &path.project_id,
        &input,
        &req,
    )
    .await?;
    Ok(Json(member))
}

pub async fn list_members(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(path): Path<ProjectPath>,
) -> Result<Json<Vec<MemberEntry>>> {
    let conn = state.db.get()?;
    let access = resolve_access(&conn, &ctx.user_id, &path.project_id)?;
    if !access.has_access() {
        return Err(AppError::Forbidden("Insufficient permissions".into()));
    }
    let members = engine::list_members(&conn, &path.project_id)?;
    Ok(Json(members))
}

pub async fn update_member_role(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(path): Path<MemberPath>,
    headers: HeaderMap,
    Json(input): Json<UpdateMemberRole>,
) -> Result<Json<ProjectMember>> {
    let req = RequestInfo::from_headers(&headers);
    let member = engine::update_role(
        &state,
        &ctx.user_id,
        &path.project_id,
        &path.member_id,
        input.role,
        &req,
    )
    .await?;
    Ok(Json(member))
}

pub async fn remove_member(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(path): Path<MemberPath>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>> {
    let req = RequestInfo::from_headers(&headers);
    engine::remove(&state, &ctx.user_id, &path.project_id, &path.member_id, &req).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}
