use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

/// Effective role within a project. `Owner` is never stored in a
/// `project_members` row; the project's `created_by` column is the single
/// source of truth for ownership and the owner entry is synthesized on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProjectRole {
    Owner,
    Admin,
    Editor,
    Viewer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MemberStatus {
    Pending,
    Accepted,
    Declined,
}

/// One row per (project, invited identity).
///
/// `user_id` stays NULL until the invitation is accepted; `invited_email` is
/// lowercase-normalized at creation and immutable afterwards. Status moves
/// `pending -> accepted` or `pending -> declined` and never back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMember {
    pub id: String,
    pub project_id: String,
    pub user_id: Option<String>,
    pub invited_email: String,
    pub role: ProjectRole,
    pub status: MemberStatus,
    pub invited_at: i64,
    pub accepted_at: Option<i64>,
}

/// Listing entry for a project's membership, including the synthesized
/// owner (which has no backing row, hence `id: None`).
#[derive(Debug, Clone, Serialize)]
pub struct MemberEntry {
    pub id: Option<String>,
    pub project_id: String,
    pub user_id: Option<String>,
    pub email: String,
    pub role: ProjectRole,
    pub status: MemberStatus,
    pub invited_at: Option<i64>,
    pub accepted_at: Option<i64>,
}

impl MemberEntry {
    pub fn from_member(member: ProjectMember) -> Self {
        Self {
            id: Some(member.id),
            project_id: member.project_id,
            user_id: member.user_id,
            email: member.invited_email,
            role: member.role,
            status: member.status,
            invited_at: Some(member.invited_at),
            accepted_at: member.accepted_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateInvitation {
    pub email: String,
    pub role: ProjectRole,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMemberRole {
    pub role: ProjectRole,
}
