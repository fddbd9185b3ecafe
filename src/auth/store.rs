// SQLite-backed credential and session storage

use chrono::{DateTime, Duration, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

use super::types::{Credential, DatabaseBindings, Session};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Credential store lock poisoned")]
    Poisoned,

    #[error("Session lifetime {0} is out of range")]
    InvalidTtl(Duration),
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS credentials (
    workspace_id    TEXT PRIMARY KEY,
    access_token    TEXT NOT NULL,
    owner_reference TEXT NOT NULL,
    workspace_name  TEXT,
    projects_db     TEXT,
    people_db       TEXT,
    timereports_db  TEXT,
    updated_at      INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS sessions (
    token        TEXT PRIMARY KEY,
    workspace_id TEXT NOT NULL,
    user_id      TEXT,
    created_at   INTEGER NOT NULL,
    expires_at   INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS sessions_expires_at ON sessions (expires_at);
";

/// Per-tenant OAuth credentials and browser sessions
///
/// Reads dominate; writes happen on login and logout only.
pub struct CredentialStore {
    conn: Mutex<Connection>,
}

impl CredentialStore {
    /// Open (and create if needed) the store at `path`
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        tracing::info!("Opening credential store: {}", path.display());
        Self::init(Connection::open(path)?)
    }

    /// Store that lives only as long as the process
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Insert or replace the credential for its workspace
    pub fn upsert_credential(&self, cred: &Credential) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO credentials
                (workspace_id, access_token, owner_reference, workspace_name,
                 projects_db, people_db, timereports_db, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(workspace_id) DO UPDATE SET
                access_token = excluded.access_token,
                owner_reference = excluded.owner_reference,
                workspace_name = excluded.workspace_name,
                projects_db = excluded.projects_db,
                people_db = excluded.people_db,
                timereports_db = excluded.timereports_db,
                updated_at = excluded.updated_at",
            params![
                cred.workspace_id,
                cred.access_token,
                cred.owner_reference,
                cred.workspace_name,
                cred.databases.projects,
                cred.databases.people,
                cred.databases.timereports,
                Utc::now().timestamp(),
            ],
        )?;
        tracing::debug!("Stored credential for workspace {}", cred.workspace_id);
        Ok(())
    }

    /// Credential registered for a workspace, if any
    pub fn credential(&self, workspace_id: &str) -> Result<Option<Credential>, StoreError> {
        let conn = self.conn()?;
        let cred = conn
            .query_row(
                "SELECT workspace_id, access_token, owner_reference, workspace_name,
                        projects_db, people_db, timereports_db
                 FROM credentials WHERE workspace_id = ?1",
                [workspace_id],
                |row| {
                    Ok(Credential {
                        workspace_id: row.get(0)?,
                        access_token: row.get(1)?,
                        owner_reference: row.get(2)?,
                        workspace_name: row.get(3)?,
                        databases: DatabaseBindings {
                            projects: row.get(4)?,
                            people: row.get(5)?,
                            timereports: row.get(6)?,
                        },
                    })
                },
            )
            .optional()?;
        Ok(cred)
    }

    /// Number of connected tenants
    pub fn credential_count(&self) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM credentials", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Issue a new random session token for a workspace
    ///
    /// Expired sessions are swept on the way in, so the table only holds
    /// sessions issued within the last TTL.
    pub fn create_session(
        &self,
        workspace_id: &str,
        user_id: Option<&str>,
        ttl: Duration,
    ) -> Result<Session, StoreError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or(StoreError::InvalidTtl(ttl))?;
        let session = Session {
            token: uuid::Uuid::new_v4().simple().to_string(),
            workspace_id: workspace_id.to_string(),
            user_id: user_id.map(str::to_string),
            expires_at,
        };

        let conn = self.conn()?;
        let purged = conn.execute(
            "DELETE FROM sessions WHERE expires_at <= ?1",
            [now.timestamp()],
        )?;
        if purged > 0 {
            tracing::debug!("Purged {} expired session(s)", purged);
        }
        conn.execute(
            "INSERT INTO sessions (token, workspace_id, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session.token,
                session.workspace_id,
                session.user_id,
                now.timestamp(),
                session.expires_at.timestamp(),
            ],
        )?;
        Ok(session)
    }

    /// Look up a live session; expired sessions never resolve
    pub fn session(&self, token: &str) -> Result<Option<Session>, StoreError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT token, workspace_id, user_id, expires_at
                 FROM sessions WHERE token = ?1 AND expires_at > ?2",
                params![token, Utc::now().timestamp()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;

        Ok(row.map(|(token, workspace_id, user_id, expires_at)| Session {
            token,
            workspace_id,
            user_id,
            expires_at: timestamp_to_datetime(expires_at),
        }))
    }

    /// Delete a session; returns whether it existed
    pub fn revoke_session(&self, token: &str) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM sessions WHERE token = ?1", [token])?;
        Ok(removed > 0)
    }

    /// Drop sessions past their expiry
    pub fn purge_expired_sessions(&self) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM sessions WHERE expires_at <= ?1",
            [Utc::now().timestamp()],
        )?;
        Ok(removed)
    }
}

fn timestamp_to_datetime(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
