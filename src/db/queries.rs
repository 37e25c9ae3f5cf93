use chrono::Utc;
use rusqlite::{Connection, params};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;
use crate::util::normalize_email;

use super::from_row::{
    AUDIT_LOG_COLS, PROJECT_COLS, PROJECT_MEMBER_COLS, USER_COLS, query_all, query_one,
};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

// ============ Users & Sessions ============

pub fn create_user(conn: &Connection, input: &CreateUser) -> Result<User> {
    let id = gen_id();
    let now = now();
    let email = normalize_email(&input.email);

    conn.execute(
        "INSERT INTO users (id, email, name, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![&id, &email, &input.name, now],
    )?;

    Ok(User {
        id,
        email,
        name: input.name.clone(),
        created_at: now,
    })
}

pub fn get_user_by_id(conn: &Connection, id: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLS),
        [id],
    )
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE email = ?1", USER_COLS),
        [normalize_email(email)],
    )
}

/// Mint a session token for a user. The token is the bearer credential the
/// session layer hands back to clients; membership code only ever consumes
/// it through `get_user_by_session_token`.
pub fn create_session(conn: &Connection, user_id: &str, ttl_secs: i64) -> Result<Session> {
    let token = format!("cd_{}", Uuid::new_v4().simple());
    let now = now();

    conn.execute(
        "INSERT INTO sessions (token, user_id, created_at, expires_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![&token, user_id, now, now + ttl_secs],
    )?;

    Ok(Session {
        token,
        user_id: user_id.to_string(),
        created_at: now,
        expires_at: now + ttl_secs,
    })
}

pub fn get_user_by_session_token(conn: &Connection, token: &str) -> Result<Option<User>> {
    query_one(
        conn,
        "SELECT u.id, u.email, u.name, u.created_at
         FROM sessions s JOIN users u ON s.user_id = u.id
         WHERE s.token = ?1 AND s.expires_at > ?2",
        params![token, now()],
    )
}

// ============ Projects ============

pub fn create_project(conn: &Connection, created_by: &str, input: &CreateProject) -> Result<Project> {
    let id = gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO projects (id, name, created_by, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![&id, &input.name, created_by, now],
    )?;

    Ok(Project {
        id,
        name: input.name.clone(),
        created_by: created_by.to_string(),
        created_at: now,
    })
}

pub fn get_project_by_id(conn: &Connection, id: &str) -> Result<Option<Project>> {
    query_one(
        conn,
        &format!("SELECT {} FROM projects WHERE id = ?1", PROJECT_COLS),
        [id],
    )
}

/// Projects the user owns or is an accepted member of.
pub fn list_projects_for_user(conn: &Connection, user_id: &str) -> Result<Vec<Project>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM projects
             WHERE created_by = ?1
                OR id IN (SELECT project_id FROM project_members
                          WHERE user_id = ?1 AND status = 'accepted')
             ORDER BY created_at DESC",
            PROJECT_COLS
        ),
        [user_id],
    )
}

/// Reassign the implicit owner. Only the ownership-transfer path in the
/// mutation engine calls this, inside the same transaction that rewrites
/// the membership rows involved.
pub fn set_project_owner(conn: &Connection, project_id: &str, user_id: &str) -> Result<()> {
    conn.execute(
        "UPDATE projects SET created_by = ?1 WHERE id = ?2",
        params![user_id, project_id],
    )?;
    Ok(())
}

// ============ Project Members ============

/// Insert a pending invitation row. `invited_email` must already be
/// lowercase-normalized by the caller.
pub fn insert_member(
    conn: &Connection,
    project_id: &str,
    invited_email: &str,
    role: ProjectRole,
) -> Result<ProjectMember> {
    let id = gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO project_members (id, project_id, user_id, invited_email, role, status, invited_at, accepted_at)
         VALUES (?1, ?2, NULL, ?3, ?4, 'pending', ?5, NULL)",
        params![&id, project_id, invited_email, role.as_ref(), now],
    )?;

    Ok(ProjectMember {
        id,
        project_id: project_id.to_string(),
        user_id: None,
        invited_email: invited_email.to_string(),
        role,
        status: MemberStatus::Pending,
        invited_at: now,
        accepted_at: None,
    })
}

/// Insert an already-accepted row, bound to a user. Used when ownership is
/// transferred and the former owner becomes an explicit member.
pub fn insert_accepted_member(
    conn: &Connection,
    project_id: &str,
    user_id: &str,
    email: &str,
    role: ProjectRole,
) -> Result<ProjectMember> {
    let id = gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO project_members (id, project_id, user_id, invited_email, role, status, invited_at, accepted_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 'accepted', ?6, ?6)",
        params![&id, project_id, user_id, email, role.as_ref(), now],
    )?;

    Ok(ProjectMember {
        id,
        project_id: project_id.to_string(),
        user_id: Some(user_id.to_string()),
        invited_email: email.to_string(),
        role,
        status: MemberStatus::Accepted,
        invited_at: now,
        accepted_at: Some(now),
    })
}

/// Fetch a member row for mutation inside an already-open transaction.
///
/// The caller must have opened the transaction with
/// `TransactionBehavior::Immediate`, which takes the database write lock up
/// front and serializes all writers. That closes the window between this
/// read and the mutation that follows it, so two racing role changes (or a
/// role change racing a removal) cannot both validate against the same
/// stale state.
///
/// # PostgreSQL Migration Note
/// When migrating to PostgreSQL, add `FOR UPDATE` to this SELECT to keep
/// the same row-level locking behavior.
pub fn get_member_for_update(conn: &Connection, id: &str) -> Result<Option<ProjectMember>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM project_members WHERE id = ?1",
            PROJECT_MEMBER_COLS
        ),
        [id],
    )
}

/// Any non-declined row for (project, email). Backs the duplicate-invite
/// check; email must be lowercase-normalized.
pub fn find_active_member_by_email(
    conn: &Connection,
    project_id: &str,
    invited_email: &str,
) -> Result<Option<ProjectMember>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM project_members
             WHERE project_id = ?1 AND invited_email = ?2 AND status != 'declined'",
            PROJECT_MEMBER_COLS
        ),
        params![project_id, invited_email],
    )
}

pub fn get_accepted_member_for_user(
    conn: &Connection,
    project_id: &str,
    user_id: &str,
) -> Result<Option<ProjectMember>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM project_members
             WHERE project_id = ?1 AND user_id = ?2 AND status = 'accepted'",
            PROJECT_MEMBER_COLS
        ),
        params![project_id, user_id],
    )
}

pub fn update_member_role(conn: &Connection, id: &str, role: ProjectRole) -> Result<()> {
    conn.execute(
        "UPDATE project_members SET role = ?1 WHERE id = ?2",
        params![role.as_ref(), id],
    )?;
    Ok(())
}

/// `pending -> accepted`, binding the accepting user. The status filter in
/// the WHERE clause makes the transition monotonic at the SQL level too.
pub fn mark_member_accepted(conn: &Connection, id: &str, user_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE project_members
         SET status = 'accepted', user_id = ?1, accepted_at = ?2
         WHERE id = ?3 AND status = 'pending'",
        params![user_id, now(), id],
    )?;
    Ok(affected > 0)
}

pub fn mark_member_declined(conn: &Connection, id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE project_members SET status = 'declined' WHERE id = ?1 AND status = 'pending'",
        params![id],
    )?;
    Ok(affected > 0)
}

pub fn delete_member(conn: &Connection, id: &str) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM project_members WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

pub fn list_project_members(conn: &Connection, project_id: &str) -> Result<Vec<ProjectMember>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM project_members WHERE project_id = ?1 ORDER BY invited_at",
            PROJECT_MEMBER_COLS
        ),
        [project_id],
    )
}

pub fn list_pending_invitations(conn: &Connection, email: &str) -> Result<Vec<ProjectMember>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM project_members
             WHERE invited_email = ?1 AND status = 'pending'
             ORDER BY invited_at DESC",
            PROJECT_MEMBER_COLS
        ),
        [normalize_email(email)],
    )
}

// ============ Audit Log Writer ============

/// Append one immutable audit entry. Callers invoke this inside the same
/// transaction as the mutation it records; if this insert fails the whole
/// transaction rolls back, so a mutation can never persist unlogged.
#[allow(clippy::too_many_arguments)]
pub fn insert_audit_entry(
    conn: &Connection,
    project_id: &str,
    member_id: &str,
    action: AuditAction,
    performed_by: &str,
    target_user_email: &str,
    old_value: Option<&serde_json::Value>,
    new_value: Option<&serde_json::Value>,
    ip_address: Option<&str>,
    user_agent: Option<&str>,
) -> Result<AuditLogEntry> {
    let id = gen_id();
    let timestamp = now();
    let old_str = old_value.map(|v| v.to_string());
    let new_str = new_value.map(|v| v.to_string());

    conn.execute(
        "INSERT INTO member_audit_logs (id, project_id, member_id, action, performed_by, target_user_email, old_value, new_value, ip_address, user_agent, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            &id,
            project_id,
            member_id,
            action.as_ref(),
            performed_by,
            target_user_email,
            &old_str,
            &new_str,
            ip_address,
            user_agent,
            timestamp
        ],
    )?;

    Ok(AuditLogEntry {
        id,
        project_id: project_id.to_string(),
        member_id: member_id.to_string(),
        action,
        performed_by: performed_by.to_string(),
        target_user_email: target_user_email.to_string(),
        old_value: old_value.cloned(),
        new_value: new_value.cloned(),
        ip_address: ip_address.map(String::from),
        user_agent: user_agent.map(String::from),
        timestamp,
    })
}

pub fn list_audit_entries(
    conn: &Connection,
    project_id: &str,
    query: &AuditLogQuery,
) -> Result<(Vec<AuditLogEntry>, i64)> {
    let (total, entries) = if let Some(action) = query.action {
        let total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM member_audit_logs WHERE project_id = ?1 AND action = ?2",
            params![project_id, action.as_ref()],
            |row| row.get(0),
        )?;
        let entries = query_all(
            conn,
            &format!(
                "SELECT {} FROM member_audit_logs
                 WHERE project_id = ?1 AND action = ?2
                 ORDER BY timestamp DESC LIMIT ?3 OFFSET ?4",
                AUDIT_LOG_COLS
            ),
            params![project_id, action.as_ref(), query.limit(), query.offset()],
        )?;
        (total, entries)
    } else {
        let total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM member_audit_logs WHERE project_id = ?1",
            params![project_id],
            |row| row.get(0),
        )?;
        let entries = query_all(
            conn,
            &format!(
                "SELECT {} FROM member_audit_logs
                 WHERE project_id = ?1
                 ORDER BY timestamp DESC LIMIT ?2 OFFSET ?3",
                AUDIT_LOG_COLS
            ),
            params![project_id, query.limit(), query.offset()],
        )?;
        (total, entries)
    };

    Ok((entries, total))
}
