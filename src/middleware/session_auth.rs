use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::util::extract_bearer_token;

/// The resolved calling principal. The session layer is trusted as given;
/// nothing downstream authenticates again.
#[derive(Clone)]
pub struct AuthContext {
    pub user_id: String,
    pub email: String,
}

/// Resolve the bearer token into an `AuthContext` extension. Failures go
/// through `AppError` so 401s carry the same `{"error": ...}` body as
/// every other error response.
pub async fn session_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let token = extract_bearer_token(request.headers())
        .ok_or_else(|| AppError::Unauthenticated("Authentication required".into()))?;

    let conn = state.db.get()?;
    let user = queries::get_user_by_session_token(&conn, token)?
        .ok_or_else(|| AppError::Unauthenticated("Invalid or expired session".into()))?;
    drop(conn);

    request.extensions_mut().insert(AuthContext {
        user_id: user.id,
        email: user.email,
    });

    Ok(next.run(request).await)
}
