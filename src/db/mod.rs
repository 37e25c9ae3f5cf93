mod from_row;
pub mod queries;

use std::sync::Arc;
use std::time::Duration;

use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::config::Config;
use crate::error::Result;
use crate::rate_limit::RateLimiter;

pub type DbPool = r2d2::Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub limiter: Arc<dyn RateLimiter>,
    pub config: Arc<Config>,
}

/// Open a connection pool over the database file.
///
/// Every pooled connection enables WAL and foreign keys and sets a bounded
/// `busy_timeout`: a writer blocked on the database write lock waits at
/// most this long before the operation fails instead of hanging its
/// caller.
pub fn open_pool(path: &str, busy_timeout_ms: u64) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
        conn.busy_timeout(Duration::from_millis(busy_timeout_ms))?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let _mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        Ok(())
    });
    let pool = r2d2::Pool::builder().build(manager)?;
    Ok(pool)
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    token TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at INTEGER NOT NULL,
    expires_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    created_by TEXT NOT NULL REFERENCES users(id),
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS project_members (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    user_id TEXT,
    invited_email TEXT NOT NULL,
    role TEXT NOT NULL CHECK (role IN ('admin', 'editor', 'viewer')),
    status TEXT NOT NULL CHECK (status IN ('pending', 'accepted', 'declined')),
    invited_at INTEGER NOT NULL,
    accepted_at INTEGER
);

-- At most one non-declined membership per (project, email). Emails are
-- stored lowercase-normalized, so plain equality is case-insensitive here.
CREATE UNIQUE INDEX IF NOT EXISTS idx_members_active_email
    ON project_members (project_id, invited_email)
    WHERE status != 'declined';

CREATE INDEX IF NOT EXISTS idx_members_user
    ON project_members (project_id, user_id);

CREATE INDEX IF NOT EXISTS idx_members_email
    ON project_members (invited_email, status);

-- Append-only. No code path updates or deletes rows here; every member
-- mutation writes exactly one entry in its own transaction.
CREATE TABLE IF NOT EXISTS member_audit_logs (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    member_id TEXT NOT NULL,
    action TEXT NOT NULL,
    performed_by TEXT NOT NULL,
    target_user_email TEXT NOT NULL,
    old_value TEXT,
    new_value TEXT,
    ip_address TEXT,
    user_agent TEXT,
    timestamp INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_audit_project_time
    ON member_audit_logs (project_id, timestamp DESC);
";

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
