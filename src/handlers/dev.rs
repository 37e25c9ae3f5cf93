use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::error::Result;
use crate::extractors::Json;
use crate::models::CreateUser;

#[derive(Debug, Deserialize)]
pub struct DevCreateUser {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct DevUserCreated {
    pub user_id: String,
    pub email: String,
    /// Bearer token for immediate use against the authed routes.
    pub token: String,
}

/// Dev-mode bootstrap: mint (or reuse) a user and hand back a session
/// token. Routed only when `config.dev_mode` is set.
pub async fn create_dev_user(
    State(state): State<AppState>,
    Json(input): Json<DevCreateUser>,
) -> Result<Json<DevUserCreated>> {
    let conn = state.db.get()?;

    let user = match queries::get_user_by_email(&conn, &input.email)? {
        Some(existing) => existing,
        None => queries::create_user(
            &conn,
            &CreateUser {
                email: input.email.clone(),
                name: input.name.clone(),
            },
        )?,
    };

    let session = queries::create_session(&conn, &user.id, state.config.session_ttl_secs)?;

    tracing::info!("DEV: minted session for user {} ({})", user.id, user.email);

    Ok(Json(DevUserCreated {
        user_id: user.id,
        email: user.email,
        token: session.token,
    }))
}
