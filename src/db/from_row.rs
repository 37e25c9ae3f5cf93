//! Row-mapping helpers: a `FromRow` trait plus column lists kept in sync
//! with it, and `query_one`/`query_all` wrappers used across `queries`.

use rusqlite::types::Type;
use rusqlite::{Connection, Params, Row};

use crate::error::Result;
use crate::models::*;

pub trait FromRow: Sized {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

pub fn query_one<T: FromRow, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Option<T>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query_map(params, T::from_row)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

pub fn query_all<T: FromRow, P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Parse a TEXT column into a strum enum, surfacing bad data as a
/// conversion error instead of panicking.
fn parse_enum<E>(row: &Row<'_>, idx: usize) -> rusqlite::Result<E>
where
    E: std::str::FromStr<Err = strum::ParseError>,
{
    row.get::<_, String>(idx)?
        .parse()
        .map_err(|e: strum::ParseError| {
            rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
        })
}

/// Parse a nullable TEXT column holding JSON, surfacing corruption as a
/// conversion error rather than silently dropping the value.
fn parse_json(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<serde_json::Value>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(s) => serde_json::from_str(&s).map(Some).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
        }),
        None => Ok(None),
    }
}

pub const USER_COLS: &str = "id, email, name, created_at";

impl FromRow for User {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}

pub const PROJECT_COLS: &str = "id, name, created_by, created_at";

impl FromRow for Project {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Project {
            id: row.get(0)?,
            name: row.get(1)?,
            created_by: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}

pub const PROJECT_MEMBER_COLS: &str =
    "id, project_id, user_id, invited_email, role, status, invited_at, accepted_at";

impl FromRow for ProjectMember {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(ProjectMember {
            id: row.get(0)?,
            project_id: row.get(1)?,
            user_id: row.get(2)?,
            invited_email: row.get(3)?,
            role: parse_enum(row, 4)?,
            status: parse_enum(row, 5)?,
            invited_at: row.get(6)?,
            accepted_at: row.get(7)?,
        })
    }
}

pub const AUDIT_LOG_COLS: &str = "id, project_id, member_id, action, performed_by, \
     target_user_email, old_value, new_value, ip_address, user_agent, timestamp";

impl FromRow for AuditLogEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(AuditLogEntry {
            id: row.get(0)?,
            project_id: row.get(1)?,
            member_id: row.get(2)?,
            action: parse_enum(row, 3)?,
            performed_by: row.get(4)?,
            target_user_email: row.get(5)?,
            old_value: parse_json(row, 6)?,
            new_value: parse_json(row, 7)?,
            ip_address: row.get(8)?,
            user_agent: row.get(9)?,
            timestamp: row.get(10)?,
        })
    }
}
