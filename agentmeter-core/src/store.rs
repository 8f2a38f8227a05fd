//! Record store
//!
//! Reads sessions and messages out of the OpenCode SQLite database. The
//! database belongs to OpenCode, so it is opened read-only and never migrated.
//!
//! Message bodies are stored as JSON in `message.data`; the row's own `id` and
//! `session_id` columns take precedence over anything inside the body.

use crate::error::{Error, Result};
use crate::types::{ChangeSummary, RawMessage, RawSession, SessionTime};
use rusqlite::{Connection, OpenFlags, Row};
use std::path::Path;

/// Read access to the session/message corpus.
pub trait RecordStore {
    /// All sessions, newest first.
    fn list_sessions(&self) -> Result<Vec<RawSession>>;

    /// All messages, oldest first.
    fn list_messages(&self) -> Result<Vec<RawMessage>>;

    /// Messages of one session, oldest first.
    fn list_messages_for_session(&self, session_id: &str) -> Result<Vec<RawMessage>>;

    /// Direct children of a session, oldest first.
    fn list_child_sessions(&self, parent_id: &str) -> Result<Vec<RawSession>>;

    /// Messages of a session and its direct children, oldest first.
    fn list_messages_for_session_tree(&self, session_id: &str) -> Result<Vec<RawMessage>> {
        let mut messages = self.list_messages_for_session(session_id)?;
        for child in self.list_child_sessions(session_id)? {
            messages.extend(self.list_messages_for_session(&child.id)?);
        }
        messages.sort_by_key(|m| m.time.created);
        Ok(messages)
    }
}

/// [`RecordStore`] over an OpenCode database.
pub struct SqliteStore {
    conn: Connection,
}

const SESSION_COLUMNS: &str = "id, project_id, parent_id, slug, directory, title, version, \
     summary_additions, summary_deletions, summary_files, time_created, time_updated";

impl SqliteStore {
    /// Open an existing database read-only.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        tracing::debug!(path = %path.display(), "Opened record store");
        Ok(Self { conn })
    }

    /// Wrap an already-open connection (for testing)
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    fn query_sessions(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<RawSession>> {
        let mut stmt = self.conn.prepare(sql)?;
        let sessions = stmt
            .query_map(params, Self::row_to_session)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    fn query_messages(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<RawMessage>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, |row| {
                Ok((
                    row.get::<_, String>("id")?,
                    row.get::<_, String>("session_id")?,
                    row.get::<_, Option<String>>("data")?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let total = rows.len();
        let messages: Vec<RawMessage> = rows
            .into_iter()
            .filter_map(|(id, session_id, data)| parse_message(id, session_id, data.as_deref()))
            .collect();

        if messages.len() < total {
            tracing::warn!(
                skipped = total - messages.len(),
                total,
                "Skipped messages with unreadable bodies"
            );
        }
        Ok(messages)
    }

    fn row_to_session(row: &Row) -> rusqlite::Result<RawSession> {
        let additions: Option<i64> = row.get("summary_additions")?;
        let deletions: Option<i64> = row.get("summary_deletions")?;
        let files: Option<i64> = row.get("summary_files")?;

        Ok(RawSession {
            id: row.get("id")?,
            project_id: row.get::<_, Option<String>>("project_id")?.unwrap_or_default(),
            parent_id: row
                .get::<_, Option<String>>("parent_id")?
                .filter(|p| !p.is_empty()),
            slug: row.get::<_, Option<String>>("slug")?.unwrap_or_default(),
            directory: row.get::<_, Option<String>>("directory")?.unwrap_or_default(),
            title: row.get::<_, Option<String>>("title")?.unwrap_or_default(),
            version: row.get::<_, Option<String>>("version")?.unwrap_or_default(),
            time: SessionTime {
                created: row.get::<_, Option<i64>>("time_created")?.unwrap_or_default(),
                updated: row.get::<_, Option<i64>>("time_updated")?.unwrap_or_default(),
            },
            summary: additions.map(|additions| ChangeSummary {
                additions: non_negative(additions),
                deletions: non_negative(deletions.unwrap_or_default()),
                files: non_negative(files.unwrap_or_default()),
            }),
        })
    }
}

impl RecordStore for SqliteStore {
    fn list_sessions(&self) -> Result<Vec<RawSession>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM session ORDER BY time_created DESC");
        self.query_sessions(&sql, &[])
    }

    fn list_messages(&self) -> Result<Vec<RawMessage>> {
        self.query_messages(
            "SELECT id, session_id, data FROM message ORDER BY time_created ASC",
            &[],
        )
    }

    fn list_messages_for_session(&self, session_id: &str) -> Result<Vec<RawMessage>> {
        self.query_messages(
            "SELECT id, session_id, data FROM message WHERE session_id = ? ORDER BY time_created ASC",
            &[&session_id],
        )
    }

    fn list_child_sessions(&self, parent_id: &str) -> Result<Vec<RawSession>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM session WHERE parent_id = ? ORDER BY time_created ASC"
        );
        self.query_sessions(&sql, &[&parent_id])
    }
}

fn non_negative(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

/// Parse a message body. Returns `None` (and logs) when the body is not a
/// JSON object.
fn parse_message(id: String, session_id: String, data: Option<&str>) -> Option<RawMessage> {
    let value: serde_json::Value = match data.map(serde_json::from_str::<serde_json::Value>) {
        Some(Ok(value)) => value,
        Some(Err(e)) => {
            tracing::warn!(message_id = %id, error = %e, "Message body is not valid JSON");
            return None;
        }
        None => {
            tracing::warn!(message_id = %id, "Message has no body");
            return None;
        }
    };
    if !value.is_object() {
        tracing::warn!(message_id = %id, "Message body is not a JSON object");
        return None;
    }

    match serde_json::from_value::<RawMessage>(value) {
        Ok(mut message) => {
            message.id = id;
            message.session_id = session_id;
            Some(message)
        }
        Err(e) => {
            tracing::warn!(message_id = %id, error = %e, "Failed to decode message body");
            None
        }
    }
}

/// The full corpus, as handed to the aggregation engine.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub sessions: Vec<RawSession>,
    pub messages: Vec<RawMessage>,
}

impl Corpus {
    /// Read everything from a store.
    pub fn read(store: &dyn RecordStore) -> Result<Self> {
        let sessions = store.list_sessions()?;
        let messages = store.list_messages()?;
        tracing::info!(
            sessions = sessions.len(),
            messages = messages.len(),
            "Loaded corpus"
        );
        Ok(Self { sessions, messages })
    }

    /// Look up a session by exact id, else by unique id prefix.
    pub fn find_session(&self, query: &str) -> Result<&RawSession> {
        if let Some(session) = self.sessions.iter().find(|s| s.id == query) {
            return Ok(session);
        }
        let mut matches = self.sessions.iter().filter(|s| s.id.starts_with(query));
        match (matches.next(), matches.next()) {
            (Some(session), None) if !query.is_empty() => Ok(session),
            (Some(_), Some(_)) => Err(Error::SessionNotFound(format!(
                "{} (ambiguous prefix)",
                query
            ))),
            _ => Err(Error::SessionNotFound(query.to_string())),
        }
    }

    /// Messages belonging to a session and its direct children.
    pub fn session_tree_messages(&self, session_id: &str) -> Vec<&RawMessage> {
        let children: Vec<&str> = self
            .sessions
            .iter()
            .filter(|s| s.parent_id.as_deref() == Some(session_id))
            .map(|s| s.id.as_str())
            .collect();
        self.messages
            .iter()
            .filter(|m| m.session_id == session_id || children.contains(&m.session_id.as_str()))
            .collect()
    }
}

/// Load the corpus from an OpenCode database.
///
/// A missing database file yields an empty corpus.
pub fn load_corpus(path: &Path) -> Result<Corpus> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "No database found, using empty corpus");
        return Ok(Corpus::default());
    }
    let store = SqliteStore::open(path)?;
    Corpus::read(&store)
}
