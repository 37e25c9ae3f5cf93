use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuditAction {
    Invite,
    RoleChange,
    Remove,
    AcceptInvitation,
}

/// Append-only record of an access-control change. Rows are never updated
/// or deleted; for every successful member mutation exactly one entry
/// exists, written in the same transaction as the mutation itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: String,
    pub project_id: String,
    pub member_id: String,
    pub action: AuditAction,
    pub performed_by: String,
    pub target_user_email: String,
    pub old_value: Option<serde_json::Value>,
    pub new_value: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub timestamp: i64,
}

#[derive(Debug, Deserialize)]
pub struct AuditLogQuery {
    pub action: Option<AuditAction>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl AuditLogQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(50).clamp(1, 200)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}
