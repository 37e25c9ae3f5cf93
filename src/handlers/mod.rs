mod audit_logs;
mod dev;
mod invitations;
mod members;
mod projects;

pub use audit_logs::*;
pub use dev::*;
pub use invitations::*;
pub use members::*;
pub use projects::*;

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};

use crate::db::AppState;
use crate::middleware::session_auth;

pub fn router(state: AppState) -> Router<AppState> {
    let authed = Router::new()
        .route("/projects", post(create_project))
        .route("/projects", get(list_projects))
        .route("/projects/{project_id}", get(get_project))
        .route("/projects/{project_id}/members", post(invite_member))
        .route("/projects/{project_id}/members", get(list_members))
        .route(
            "/projects/{project_id}/members/{member_id}",
            put(update_member_role),
        )
        .route(
            "/projects/{project_id}/members/{member_id}",
            delete(remove_member),
        )
        .route("/projects/{project_id}/audit-logs", get(list_audit_logs))
        .route("/invitations", get(list_invitations))
        .route("/invitations/{invitation_id}/accept", post(accept_invitation))
        .route(
            "/invitations/{invitation_id}/decline",
            post(decline_invitation),
        )
        .layer(middleware::from_fn_with_state(state.clone(), session_auth));

    if state.config.dev_mode {
        authed.route("/dev/users", post(create_dev_user))
    } else {
        authed
    }
}
