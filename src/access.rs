//! Effective-access resolution: who is the caller relative to a project.

use rusqlite::Connection;

use crate::db::queries;
use crate::error::{AppError, Result};
use crate::models::ProjectRole;

/// Computed union of the implicit owner and any accepted membership row.
/// Never materialized as a fake member row; the project's `created_by`
/// stays the only representation of ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveAccess {
    Owner,
    Member(ProjectRole),
    None,
}

impl EffectiveAccess {
    pub fn has_access(&self) -> bool {
        !matches!(self, EffectiveAccess::None)
    }

    pub fn is_owner(&self) -> bool {
        matches!(self, EffectiveAccess::Owner)
    }

    /// Owners and admins may mutate membership.
    pub fn can_manage_members(&self) -> bool {
        matches!(
            self,
            EffectiveAccess::Owner | EffectiveAccess::Member(ProjectRole::Admin)
        )
    }

    pub fn role(&self) -> Option<ProjectRole> {
        match self {
            EffectiveAccess::Owner => Some(ProjectRole::Owner),
            EffectiveAccess::Member(role) => Some(*role),
            EffectiveAccess::None => Option::None,
        }
    }
}

/// Resolve the caller's effective role on a project. Read-only.
///
/// Fails `NotFound` if the project does not exist; the caller surfaces
/// that as a plain 404 (project existence is not a secret).
pub fn resolve_access(
    conn: &Connection,
    user_id: &str,
    project_id: &str,
) -> Result<EffectiveAccess> {
    let project = queries::get_project_by_id(conn, project_id)?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))?;

    if project.created_by == user_id {
        return Ok(EffectiveAccess::Owner);
    }

    match queries::get_accepted_member_for_user(conn, project_id, user_id)? {
        Some(member) => Ok(EffectiveAccess::Member(member.role)),
        None => Ok(EffectiveAccess::None),
    }
}
