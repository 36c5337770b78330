//! SQLite-backed generation history.
//!
//! Append-only per-user record of completed tool runs, queryable in
//! reverse-chronological order. Records are never mutated after creation.
//!
//! Default DB location: `~/.copyforge/history.db`

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::normalize::GeneratedContentData;
use crate::tools::ToolId;

/// What a run produced: normalized content, or the prompt string of a
/// generated video (the binary itself is never persisted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GenerationOutput {
    Content(GeneratedContentData),
    VideoPrompt(String),
}

/// A record to append after a successful run.
#[derive(Debug, Clone)]
pub struct NewGeneration {
    pub user_id: String,
    pub tool_id: ToolId,
    pub inputs: BTreeMap<String, String>,
    pub output: GenerationOutput,
}

/// A persisted history row.
#[derive(Debug, Clone)]
pub struct Generation {
    pub id: String,
    pub user_id: String,
    pub tool_id: ToolId,
    pub created_at: String,
    pub inputs: BTreeMap<String, String>,
    pub output: GenerationOutput,
}

/// Append-only history the orchestrator persists into.
///
/// Methods are synchronous; async callers wrap them in `spawn_blocking`
/// when contention matters.
pub trait HistoryStore: Send + Sync {
    fn append(&self, record: NewGeneration) -> anyhow::Result<()>;
    fn query_by_user(&self, user_id: &str, limit: usize) -> anyhow::Result<Vec<Generation>>;
}

/// Thread-safe SQLite store.
///
/// Uses a sync `Mutex<Connection>` because rusqlite's `Connection` is `!Send`.
pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
}

impl SqliteHistoryStore {
    /// Open (or create) the database at `db_path` and run migrations.
    pub fn new(db_path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;

        // Performance pragmas.
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        Self::migrate(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run schema migrations (idempotent).
    fn migrate(conn: &Connection) -> anyhow::Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS generations (
                 id TEXT PRIMARY KEY,
                 user_id TEXT NOT NULL,
                 tool_id TEXT NOT NULL,
                 created_at TEXT NOT NULL,
                 inputs TEXT NOT NULL,
                 output TEXT NOT NULL
             );

             CREATE INDEX IF NOT EXISTS idx_generations_user
                 ON generations(user_id, created_at);",
        )?;
        Ok(())
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn append(&self, record: NewGeneration) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let inputs = serde_json::to_string(&record.inputs)?;
        let output = serde_json::to_string(&record.output)?;
        conn.execute(
            "INSERT INTO generations (id, user_id, tool_id, created_at, inputs, output)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id,
                record.user_id,
                record.tool_id.to_string(),
                now,
                inputs,
                output
            ],
        )?;
        Ok(())
    }

    fn query_by_user(&self, user_id: &str, limit: usize) -> anyhow::Result<Vec<Generation>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, tool_id, created_at, inputs, output
             FROM generations WHERE user_id = ?1
             ORDER BY created_at DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user_id, limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, user_id, tool_id, created_at, inputs, output) = row?;
            records.push(Generation {
                id,
                user_id,
                tool_id: ToolId::parse(&tool_id)
                    .map_err(|e| anyhow::anyhow!("corrupt tool_id in history: {e}"))?,
                created_at,
                inputs: serde_json::from_str(&inputs)?,
                output: serde_json::from_str(&output)?,
            });
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{Section, SectionContent};
    use tempfile::tempdir;

    fn content(title: &str) -> GenerationOutput {
        GenerationOutput::Content(GeneratedContentData {
            title: title.to_string(),
            sections: vec![Section {
                heading: "H".into(),
                content: SectionContent::Text("body".into()),
            }],
            sources: None,
        })
    }

    #[test]
    fn test_append_and_query_round_trip() {
        let dir = tempdir().unwrap();
        let store = SqliteHistoryStore::new(&dir.path().join("history.db")).unwrap();

        store
            .append(NewGeneration {
                user_id: "user-1".into(),
                tool_id: ToolId::EmailMarketing,
                inputs: BTreeMap::from([("goal".to_string(), "announce launch".to_string())]),
                output: content("Marketing Email Draft"),
            })
            .unwrap();

        let records = store.query_by_user("user-1", 10).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].tool_id, ToolId::EmailMarketing);
        assert_eq!(
            records[0].inputs.get("goal").map(String::as_str),
            Some("announce launch")
        );
        match &records[0].output {
            GenerationOutput::Content(data) => assert_eq!(data.title, "Marketing Email Draft"),
            other => panic!("expected content output, got {other:?}"),
        }
    }

    #[test]
    fn test_query_is_scoped_to_user_and_descending() {
        let dir = tempdir().unwrap();
        let store = SqliteHistoryStore::new(&dir.path().join("history.db")).unwrap();

        for (user, title) in [("a", "first"), ("a", "second"), ("b", "other")] {
            store
                .append(NewGeneration {
                    user_id: user.into(),
                    tool_id: ToolId::CustomerPersona,
                    inputs: BTreeMap::new(),
                    output: content(title),
                })
                .unwrap();
        }

        // rfc3339 timestamps carry sub-second precision, so insert order is
        // recoverable and the newest record comes first.
        let records = store.query_by_user("a", 10).unwrap();
        assert_eq!(records.len(), 2);
        let titles: Vec<&str> = records
            .iter()
            .map(|r| match &r.output {
                GenerationOutput::Content(d) => d.title.as_str(),
                GenerationOutput::VideoPrompt(p) => p.as_str(),
            })
            .collect();
        assert_eq!(titles, vec!["second", "first"]);

        assert!(store.query_by_user("nobody", 10).unwrap().is_empty());
    }

    #[test]
    fn test_video_prompt_output_round_trips() {
        let dir = tempdir().unwrap();
        let store = SqliteHistoryStore::new(&dir.path().join("history.db")).unwrap();

        store
            .append(NewGeneration {
                user_id: "u".into(),
                tool_id: ToolId::VideoGenerator,
                inputs: BTreeMap::from([("prompt".to_string(), "a cat surfing".to_string())]),
                output: GenerationOutput::VideoPrompt("a cat surfing".into()),
            })
            .unwrap();

        let records = store.query_by_user("u", 1).unwrap();
        assert_eq!(
            records[0].output,
            GenerationOutput::VideoPrompt("a cat surfing".into())
        );
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.db");
        let _ = SqliteHistoryStore::new(&path).unwrap();
        let store = SqliteHistoryStore::new(&path).unwrap();
        assert!(store.query_by_user("anyone", 1).unwrap().is_empty());
    }
}
