use axum::extract::{Extension, State};
use axum::http::HeaderMap;

use crate::db::{AppState, queries};
use crate::engine;
use crate::error::Result;
use crate::extractors::{Json, Path};
use crate::middleware::AuthContext;
use crate::models::ProjectMember;
use crate::util::RequestInfo;

#[derive(serde::Deserialize)]
pub struct InvitationPath {
    pub invitation_id: String,
}

/// Pending invitations addressed to the caller's email.
pub async fn list_invitations(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<Vec<ProjectMember>>> {
    let conn = state.db.get()?;
    let invitations = queries::list_pending_invitations(&conn, &ctx.email)?;
    Ok(Json(invitations))
}

pub async fn accept_invitation(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(path): Path<InvitationPath>,
    headers: HeaderMap,
) -> Result<Json<ProjectMember>> {
    let req = RequestInfo::from_headers(&headers);
    let member = engine::accept_invitation(
        &state,
        &ctx.user_id,
        &ctx.email,
        &path.invitation_id,
        &req,
    )
    .await?;
    Ok(Json(member))
}

pub async fn decline_invitation(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(path): Path<InvitationPath>,
) -> Result<Json<serde_json::Value>> {
    engine::decline_invitation(&state, &ctx.email, &path.invitation_id).await?;
    Ok(Json(serde_json::json!({ "declined": true })))
}
