// Credential and session types

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Workspace id recorded for the single internal integration
pub const INTERNAL_WORKSPACE_ID: &str = "internal";

/// Kind of token, derived from the bot owner returned by `/v1/users/me`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationKind {
    /// Bot owned by the workspace
    Internal,
    /// Bot owned by the user who granted OAuth access
    Public,
}

/// Result of a successful identity check
#[derive(Debug, Clone)]
pub struct BotIdentity {
    pub bot_id: String,
    pub kind: IntegrationKind,
    pub workspace_name: Option<String>,
}

/// The three databases the dashboard reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseKind {
    Projects,
    People,
    TimeReports,
}

impl DatabaseKind {
    pub const ALL: [DatabaseKind; 3] = [
        DatabaseKind::Projects,
        DatabaseKind::People,
        DatabaseKind::TimeReports,
    ];

    /// Database title used for discovery
    pub fn title(&self) -> &'static str {
        match self {
            DatabaseKind::Projects => "Projects",
            DatabaseKind::People => "People",
            DatabaseKind::TimeReports => "Timereports",
        }
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Database ids a tenant's dashboard is bound to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseBindings {
    pub projects: Option<String>,
    pub people: Option<String>,
    pub timereports: Option<String>,
}

impl DatabaseBindings {
    pub fn get(&self, kind: DatabaseKind) -> Option<&str> {
        match kind {
            DatabaseKind::Projects => self.projects.as_deref(),
            DatabaseKind::People => self.people.as_deref(),
            DatabaseKind::TimeReports => self.timereports.as_deref(),
        }
    }

    pub fn set(&mut self, kind: DatabaseKind, id: String) {
        let slot = match kind {
            DatabaseKind::Projects => &mut self.projects,
            DatabaseKind::People => &mut self.people,
            DatabaseKind::TimeReports => &mut self.timereports,
        };
        *slot = Some(id);
    }

    pub fn missing(&self) -> Vec<DatabaseKind> {
        DatabaseKind::ALL
            .into_iter()
            .filter(|kind| self.get(*kind).is_none())
            .collect()
    }
}

/// Access token for one workspace
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub workspace_id: String,
    pub access_token: String,
    /// Bot id, or the id of the user who granted access
    pub owner_reference: String,
    pub workspace_name: Option<String>,
    pub databases: DatabaseBindings,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("workspace_id", &self.workspace_id)
            .field("access_token", &token_prefix(&self.access_token))
            .field("owner_reference", &self.owner_reference)
            .field("workspace_name", &self.workspace_name)
            .field("databases", &self.databases)
            .finish()
    }
}

/// First characters of a secret, for logs
pub fn token_prefix(token: &str) -> String {
    let cut = token
        .char_indices()
        .nth(8)
        .map(|(i, _)| i)
        .unwrap_or(token.len());
    format!("{}...", &token[..cut])
}

/// A logged-in browser session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub workspace_id: String,
    pub user_id: Option<String>,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_hides_token() {
        let cred = Credential {
            workspace_id: "w1".into(),
            access_token: "secret_0123456789abcdef".into(),
            owner_reference: "bot-1".into(),
            workspace_name: None,
            databases: DatabaseBindings::default(),
        };
        let printed = format!("{:?}", cred);
        assert!(printed.contains("secret_0..."));
        assert!(!printed.contains("0123456789abcdef"));
    }

    #[test]
    fn test_token_prefix_short_token() {
        assert_eq!(token_prefix("abc"), "abc...");
    }

    #[test]
    fn test_bindings_missing() {
        let mut bindings = DatabaseBindings::default();
        assert_eq!(bindings.missing().len(), 3);

        bindings.set(DatabaseKind::People, "db-people".into());
        assert_eq!(bindings.get(DatabaseKind::People), Some("db-people"));
        assert_eq!(
            bindings.missing(),
            vec![DatabaseKind::Projects, DatabaseKind::TimeReports]
        );
    }
}
