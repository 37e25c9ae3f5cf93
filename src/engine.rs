//! Membership mutation engine.
//!
//! Every mutating operation here follows the same shape: rate limiter →
//! access resolution → one IMMEDIATE transaction that locks the target row,
//! validates against the locked state, applies the mutation, and appends
//! its audit entry → commit. If any step inside the transaction fails,
//! everything rolls back together, so an audit entry and its mutation can
//! only persist as a pair.
//!
//! Failures that would reveal who belongs to a project collapse into the
//! uniform responses in `security`; the true reason is logged first.

use rusqlite::{Connection, TransactionBehavior};
use serde_json::json;

use crate::access::resolve_access;
use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::models::*;
use crate::security::{SecureFailure, timing_noise};
use crate::util::{RequestInfo, normalize_email};

const INVITE_ROUTE: &str = "members.invite";
const MUTATE_ROUTE: &str = "members.mutate";

fn role_snapshot(role: ProjectRole) -> serde_json::Value {
    json!({ "role": role.as_ref() })
}

/// Check the limiter for one request and convert a rejection into the
/// standard 429 error. Volumetric limits are allowed to be observable.
fn admit(state: &AppState, route: &str, actor_id: &str, project_id: &str, limit: i64) -> Result<()> {
    let decision = state.limiter.check(
        route,
        actor_id,
        project_id,
        limit,
        state.config.rate_window_secs,
    );
    if decision.allowed {
        Ok(())
    } else {
        tracing::warn!(route, actor_id, project_id, "rate limit exceeded");
        Err(AppError::RateLimited {
            remaining: decision.remaining,
            reset_at: decision.reset_at,
        })
    }
}

/// Outcome of the transactional part of an invite. Rejections carry the
/// true reason for the log line; the caller collapses them into the
/// generic response.
enum InviteOutcome {
    Created(ProjectMember),
    Rejected(&'static str),
}

/// Invite an email to a project as `role`, creating a pending membership.
///
/// Whether the email is the actor's own, the owner's, or an existing
/// member's, the caller sees the same generic failure; those three
/// branches are a security contract, not ordinary validation.
pub async fn invite(
    state: &AppState,
    actor_id: &str,
    actor_email: &str,
    project_id: &str,
    input: &CreateInvitation,
    req: &RequestInfo,
) -> Result<ProjectMember> {
    admit(state, INVITE_ROUTE, actor_id, project_id, state.config.invite_limit)?;

    let invited_email = normalize_email(&input.email);
    if invited_email.is_empty() || !invited_email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".into()));
    }
    if input.role == ProjectRole::Owner {
        return Err(AppError::BadRequest(
            "A member cannot be invited with the owner role".into(),
        ));
    }

    // All rusqlite work happens in the synchronous helper so no connection
    // or transaction is alive across the await below (they are not Send).
    match invite_in_db(state, actor_id, actor_email, project_id, input.role, &invited_email, req)? {
        InviteOutcome::Created(member) => {
            tracing::info!(project_id, member_id = %member.id, "invitation created");
            Ok(member)
        }
        InviteOutcome::Rejected(reason) => {
            tracing::warn!(project_id, actor_id, reason, "invitation rejected");
            timing_noise(state.config.noise_min_ms, state.config.noise_max_ms).await;
            Err(AppError::Secure(SecureFailure::InvitationFailed))
        }
    }
}

fn invite_in_db(
    state: &AppState,
    actor_id: &str,
    actor_email: &str,
    project_id: &str,
    role: ProjectRole,
    invited_email: &str,
    req: &RequestInfo,
) -> Result<InviteOutcome> {
    let mut conn = state.db.get()?;
    let access = resolve_access(&conn, actor_id, project_id)?;
    if !access.can_manage_members() {
        tracing::warn!(project_id, actor_id, "invite denied: caller is not owner or admin");
        return Err(AppError::Secure(SecureFailure::Unauthorized));
    }
    // Escalation guard: admins may add editors and viewers, only the owner
    // adds admins.
    if role == ProjectRole::Admin && !access.is_owner() {
        tracing::warn!(project_id, actor_id, "invite denied: admin attempted to invite an admin");
        return Err(AppError::Secure(SecureFailure::Unauthorized));
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let project = queries::get_project_by_id(&tx, project_id)?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))?;
    let owner_email = queries::get_user_by_id(&tx, &project.created_by)?
        .map(|owner| normalize_email(&owner.email));

    // The three enumeration-sensitive branches. Checked under the write
    // lock so a racing invite cannot slip between check and insert; a
    // rejection drops the transaction uncommitted.
    if invited_email == normalize_email(actor_email) {
        return Ok(InviteOutcome::Rejected("actor invited themself"));
    }
    if owner_email.as_deref() == Some(invited_email) {
        return Ok(InviteOutcome::Rejected("invited email is the project owner"));
    }
    if queries::find_active_member_by_email(&tx, project_id, invited_email)?.is_some() {
        return Ok(InviteOutcome::Rejected(
            "a non-declined membership already exists for this email",
        ));
    }

    let member = queries::insert_member(&tx, project_id, invited_email, role)?;
    queries::insert_audit_entry(
        &tx,
        project_id,
        &member.id,
        AuditAction::Invite,
        actor_id,
        invited_email,
        None,
        Some(&role_snapshot(role)),
        req.ip_address.as_deref(),
        req.user_agent.as_deref(),
    )?;
    tx.commit()?;

    Ok(InviteOutcome::Created(member))
}

/// Change a member's role, or transfer ownership when `new_role` is
/// `owner`.
///
/// Ownership transfer keeps exactly one owner-equivalent at all times: the
/// target becomes the project's implicit owner (their row is deleted) and
/// the former owner gets an accepted admin row, all in one transaction.
pub async fn update_role(
    state: &AppState,
    actor_id: &str,
    project_id: &str,
    member_id: &str,
    new_role: ProjectRole,
    req: &RequestInfo,
) -> Result<ProjectMember> {
    admit(state, MUTATE_ROUTE, actor_id, project_id, state.config.mutate_limit)?;

    let mut conn = state.db.get()?;
    let access = resolve_access(&conn, actor_id, project_id)?;
    if !access.can_manage_members() {
        tracing::warn!(project_id, actor_id, "role update denied: caller is not owner or admin");
        return Err(AppError::Secure(SecureFailure::Unauthorized));
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let member = queries::get_member_for_update(&tx, member_id)?
        .filter(|m| m.project_id == project_id)
        // Declined rows are terminal; they no longer count as members.
        .filter(|m| m.status != MemberStatus::Declined)
        .ok_or_else(|| AppError::NotFound("Member not found".into()))?;

    // Privilege rules, validated against the locked row.
    if new_role == ProjectRole::Owner {
        if !access.is_owner() {
            tracing::warn!(project_id, actor_id, member_id, "role update denied: only the owner assigns ownership");
            return Err(AppError::Secure(SecureFailure::Unauthorized));
        }
        if member.user_id.as_deref() == Some(actor_id) {
            tracing::warn!(project_id, actor_id, member_id, "role update denied: self-escalation to owner");
            return Err(AppError::Secure(SecureFailure::Unauthorized));
        }
        let Some(new_owner_id) = member
            .user_id
            .as_deref()
            .filter(|_| member.status == MemberStatus::Accepted)
        else {
            return Err(AppError::BadRequest(
                "Only an accepted member can take ownership".into(),
            ));
        };

        let project = queries::get_project_by_id(&tx, project_id)?
            .ok_or_else(|| AppError::NotFound("Project not found".into()))?;
        let former_owner = queries::get_user_by_id(&tx, &project.created_by)?.ok_or_else(|| {
            AppError::Internal(format!("project {project_id} owner record missing"))
        })?;

        queries::set_project_owner(&tx, project_id, new_owner_id)?;
        queries::delete_member(&tx, &member.id)?;
        queries::insert_accepted_member(
            &tx,
            project_id,
            &former_owner.id,
            &normalize_email(&former_owner.email),
            ProjectRole::Admin,
        )?;
        queries::insert_audit_entry(
            &tx,
            project_id,
            &member.id,
            AuditAction::RoleChange,
            actor_id,
            &member.invited_email,
            Some(&role_snapshot(member.role)),
            Some(&role_snapshot(ProjectRole::Owner)),
            req.ip_address.as_deref(),
            req.user_agent.as_deref(),
        )?;
        tx.commit()?;

        tracing::info!(project_id, member_id, new_owner = new_owner_id, "ownership transferred");
        return Ok(ProjectMember {
            role: ProjectRole::Owner,
            ..member
        });
    }

    // Only the owner manages admins, in either direction.
    if !access.is_owner() && (member.role == ProjectRole::Admin || new_role == ProjectRole::Admin) {
        tracing::warn!(project_id, actor_id, member_id, "role update denied: admin touching an admin row");
        return Err(AppError::Secure(SecureFailure::Unauthorized));
    }

    queries::update_member_role(&tx, &member.id, new_role)?;
    queries::insert_audit_entry(
        &tx,
        project_id,
        &member.id,
        AuditAction::RoleChange,
        actor_id,
        &member.invited_email,
        Some(&role_snapshot(member.role)),
        Some(&role_snapshot(new_role)),
        req.ip_address.as_deref(),
        req.user_agent.as_deref(),
    )?;
    tx.commit()?;

    Ok(ProjectMember {
        role: new_role,
        ..member
    })
}

/// Remove a member (or revoke a pending invitation). Self-removal is
/// always permitted; otherwise the caller must be owner or admin, and
/// admins cannot remove admin rows.
pub async fn remove(
    state: &AppState,
    actor_id: &str,
    project_id: &str,
    member_id: &str,
    req: &RequestInfo,
) -> Result<()> {
    admit(state, MUTATE_ROUTE, actor_id, project_id, state.config.mutate_limit)?;

    let mut conn = state.db.get()?;
    let access = resolve_access(&conn, actor_id, project_id)?;
    if !access.has_access() {
        tracing::warn!(project_id, actor_id, "removal denied: caller has no access");
        return Err(AppError::Secure(SecureFailure::Unauthorized));
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let member = queries::get_member_for_update(&tx, member_id)?
        .filter(|m| m.project_id == project_id)
        // Declined rows are terminal; they no longer count as members.
        .filter(|m| m.status != MemberStatus::Declined)
        .ok_or_else(|| AppError::NotFound("Member not found".into()))?;

    let removing_self = member.user_id.as_deref() == Some(actor_id);
    if !removing_self {
        if !access.can_manage_members() {
            tracing::warn!(project_id, actor_id, member_id, "removal denied: caller is not owner or admin");
            return Err(AppError::Secure(SecureFailure::Unauthorized));
        }
        if member.role == ProjectRole::Admin && !access.is_owner() {
            tracing::warn!(project_id, actor_id, member_id, "removal denied: admin removing an admin");
            return Err(AppError::Secure(SecureFailure::Unauthorized));
        }
    }

    queries::delete_member(&tx, &member.id)?;
    queries::insert_audit_entry(
        &tx,
        project_id,
        &member.id,
        AuditAction::Remove,
        actor_id,
        &member.invited_email,
        Some(&role_snapshot(member.role)),
        None,
        req.ip_address.as_deref(),
        req.user_agent.as_deref(),
    )?;
    tx.commit()?;

    tracing::info!(project_id, member_id, "member removed");
    Ok(())
}

/// Accept a pending invitation addressed to the actor's email.
pub async fn accept_invitation(
    state: &AppState,
    actor_id: &str,
    actor_email: &str,
    invitation_id: &str,
    req: &RequestInfo,
) -> Result<ProjectMember> {
    let mut conn = state.db.get()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let member = queries::get_member_for_update(&tx, invitation_id)?
        .ok_or_else(|| AppError::NotFound("Invitation not found".into()))?;

    // The actor already knows their own email and the invitation in front
    // of them, so this specific message leaks nothing.
    if member.invited_email != normalize_email(actor_email) {
        return Err(AppError::Forbidden(
            "This invitation was not sent to your email address".into(),
        ));
    }
    if member.status != MemberStatus::Pending {
        return Err(AppError::Conflict(
            "This invitation has already been processed".into(),
        ));
    }

    queries::mark_member_accepted(&tx, &member.id, actor_id)?;
    queries::insert_audit_entry(
        &tx,
        &member.project_id,
        &member.id,
        AuditAction::AcceptInvitation,
        actor_id,
        &member.invited_email,
        None,
        Some(&role_snapshot(member.role)),
        req.ip_address.as_deref(),
        req.user_agent.as_deref(),
    )?;
    tx.commit()?;

    tracing::info!(project_id = %member.project_id, member_id = %member.id, "invitation accepted");
    Ok(ProjectMember {
        user_id: Some(actor_id.to_string()),
        status: MemberStatus::Accepted,
        ..member
    })
}

/// Decline a pending invitation. No access is granted, so no audit entry
/// is required; the transition is logged for operators instead.
pub async fn decline_invitation(
    state: &AppState,
    actor_email: &str,
    invitation_id: &str,
) -> Result<()> {
    let mut conn = state.db.get()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let member = queries::get_member_for_update(&tx, invitation_id)?
        .ok_or_else(|| AppError::NotFound("Invitation not found".into()))?;

    if member.invited_email != normalize_email(actor_email) {
        return Err(AppError::Forbidden(
            "This invitation was not sent to your email address".into(),
        ));
    }
    if member.status != MemberStatus::Pending {
        return Err(AppError::Conflict(
            "This invitation has already been processed".into(),
        ));
    }

    queries::mark_member_declined(&tx, &member.id)?;
    tx.commit()?;

    tracing::info!(project_id = %member.project_id, member_id = %member.id, "invitation declined");
    Ok(())
}

/// List a project's membership, with the implicit owner synthesized as the
/// first entry.
pub fn list_members(conn: &Connection, project_id: &str) -> Result<Vec<MemberEntry>> {
    let project = queries::get_project_by_id(conn, project_id)?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))?;
    let owner = queries::get_user_by_id(conn, &project.created_by)?
        .ok_or_else(|| AppError::Internal(format!("project {project_id} owner record missing")))?;

    let mut entries = vec![MemberEntry {
        id: None,
        project_id: project.id.clone(),
        user_id: Some(owner.id),
        email: owner.email,
        role: ProjectRole::Owner,
        status: MemberStatus::Accepted,
        invited_at: None,
        accepted_at: Some(project.created_at),
    }];

    entries.extend(
        queries::list_project_members(conn, project_id)?
            .into_iter()
            .map(MemberEntry::from_member),
    );

    Ok(entries)
}

/// Count owner-equivalents for a project: the implicit owner plus any
/// member row carrying `owner`. The transfer path deletes the promoted
/// row in the same transaction, so this is always exactly 1.
pub fn count_owner_equivalents(conn: &Connection, project_id: &str) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT (SELECT COUNT(*) FROM projects WHERE id = ?1)
              + (SELECT COUNT(*) FROM project_members WHERE project_id = ?1 AND role = 'owner')",
        [project_id],
        |row| row.get(0),
    )?;
    Ok(count)
}
