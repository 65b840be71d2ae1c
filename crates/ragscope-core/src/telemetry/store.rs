//! Telemetry persistence
//!
//! SQLite store for the request log and feedback tables. Initialization is
//! idempotent and migrates the log schema forward additively: new optional
//! columns are added with ALTER TABLE, existing columns are never dropped or
//! renamed, existing rows are never rewritten.

use super::RequestLogEntry;
use crate::error::{RagScopeError, Result};
use crate::index::SourceRef;
use rusqlite::{params, Connection};
use std::path::Path;
use uuid::Uuid;

/// Optional columns added after the first released schema, applied as
/// additive migrations on every initialize()
const LOG_MIGRATION_COLUMNS: &[(&str, &str)] = &[
    ("retrieved_distances", "TEXT"),
    ("prompt_tokens", "INTEGER"),
    ("answer_tokens", "INTEGER"),
    ("trace_id", "TEXT"),
];

/// Shared SELECT for the joined read path; callers append WHERE/ORDER BY
const SELECT_JOINED: &str = "SELECT
    rl.request_id, rl.timestamp, rl.question, rl.answer,
    rl.latency_ms_total, rl.latency_ms_retrieval, rl.latency_ms_llm,
    rl.retrieved_sources, rl.retrieved_distances,
    rl.prompt_tokens, rl.answer_tokens, rl.error, rl.trace_id,
    rf.rating, rf.comment
 FROM requests_log rl
 LEFT JOIN request_feedback rf ON rl.request_id = rf.request_id";

/// Telemetry store handle
pub struct TelemetryStore {
    conn: Connection,
}

/// One joined row as stored, before JSON columns are decoded
struct RawRow {
    request_id: String,
    timestamp: String,
    question: String,
    answer: Option<String>,
    latency_ms_total: u64,
    latency_ms_retrieval: u64,
    latency_ms_llm: u64,
    sources_json: String,
    distances_json: Option<String>,
    prompt_tokens: Option<u32>,
    answer_tokens: Option<u32>,
    error: Option<String>,
    trace_id: Option<String>,
    rating: Option<i64>,
    comment: Option<String>,
}

fn read_raw_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        request_id: row.get(0)?,
        timestamp: row.get(1)?,
        question: row.get(2)?,
        answer: row.get(3)?,
        latency_ms_total: row.get(4)?,
        latency_ms_retrieval: row.get(5)?,
        latency_ms_llm: row.get(6)?,
        sources_json: row.get(7)?,
        distances_json: row.get(8)?,
        prompt_tokens: row.get(9)?,
        answer_tokens: row.get(10)?,
        error: row.get(11)?,
        trace_id: row.get(12)?,
        rating: row.get(13)?,
        comment: row.get(14)?,
    })
}

impl RawRow {
    fn into_logged(self) -> Result<LoggedRequest> {
        let request_id = Uuid::parse_str(&self.request_id).map_err(|e| {
            RagScopeError::InvalidInput(format!("corrupt request_id in log: {}", e))
        })?;
        Ok(LoggedRequest {
            request_id,
            timestamp: self.timestamp,
            question: self.question,
            answer: self.answer,
            latency_ms_total: self.latency_ms_total,
            latency_ms_retrieval: self.latency_ms_retrieval,
            latency_ms_llm: self.latency_ms_llm,
            retrieved_sources: serde_json::from_str(&self.sources_json)?,
            retrieved_distances: self
                .distances_json
                .map(|json| serde_json::from_str(&json))
                .transpose()?,
            prompt_tokens: self.prompt_tokens,
            answer_tokens: self.answer_tokens,
            error: self.error,
            trace_id: self.trace_id,
            rating: self.rating,
            comment: self.comment,
        })
    }
}

/// One row of the dashboard read path: a logged request left-joined with
/// its feedback, if any
#[derive(Debug, Clone, serde::Serialize)]
pub struct LoggedRequest {
    pub request_id: Uuid,
    pub timestamp: String,
    pub question: String,
    pub answer: Option<String>,
    pub latency_ms_total: u64,
    pub latency_ms_retrieval: u64,
    pub latency_ms_llm: u64,
    pub retrieved_sources: Vec<SourceRef>,
    pub retrieved_distances: Option<Vec<f32>>,
    pub prompt_tokens: Option<u32>,
    pub answer_tokens: Option<u32>,
    pub error: Option<String>,
    pub trace_id: Option<String>,
    pub rating: Option<i64>,
    pub comment: Option<String>,
}

impl TelemetryStore {
    /// Open the store at path, creating the file if necessary
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Open an in-memory store (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Initialize tables and run additive migrations
    ///
    /// Safe to call on every process start.
    pub fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;

        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS requests_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                request_id TEXT NOT NULL UNIQUE,
                question TEXT NOT NULL,
                answer TEXT,
                latency_ms_total INTEGER NOT NULL,
                latency_ms_retrieval INTEGER NOT NULL,
                latency_ms_llm INTEGER NOT NULL,
                retrieved_sources TEXT NOT NULL,
                error TEXT
            );

            CREATE TABLE IF NOT EXISTS request_feedback (
                request_id TEXT PRIMARY KEY,
                rating INTEGER NOT NULL,
                comment TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_requests_log_timestamp
                ON requests_log(timestamp);",
        )?;

        for (column, column_type) in LOG_MIGRATION_COLUMNS {
            self.add_column_if_missing("requests_log", column, column_type)?;
        }

        Ok(())
    }

    /// Add a column to a table unless it already exists
    fn add_column_if_missing(&self, table: &str, column: &str, column_type: &str) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", table))?;
        let existing: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if !existing.iter().any(|c| c == column) {
            tracing::info!("Adding column '{}' to table '{}'", column, table);
            self.conn.execute(
                &format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, column_type),
                [],
            )?;
        }
        Ok(())
    }

    /// Append one immutable log row
    ///
    /// request_id is UNIQUE: a duplicate append is a programming error and
    /// surfaces as a database error, not a recoverable condition.
    pub fn append(&self, entry: &RequestLogEntry) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let sources_json = serde_json::to_string(&entry.retrieved_sources)?;
        let distances_json = entry
            .retrieved_distances
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn.execute(
            "INSERT INTO requests_log (
                timestamp, request_id, question, answer,
                latency_ms_total, latency_ms_retrieval, latency_ms_llm,
                retrieved_sources, retrieved_distances,
                prompt_tokens, answer_tokens, error, trace_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                now,
                entry.request_id.to_string(),
                entry.question,
                entry.answer,
                entry.latency_ms_total,
                entry.latency_ms_retrieval,
                entry.latency_ms_llm,
                sources_json,
                distances_json,
                entry.prompt_tokens,
                entry.answer_tokens,
                entry.error,
                entry.trace_id,
            ],
        )?;
        Ok(())
    }

    /// Insert or replace the feedback row for a request
    ///
    /// Rejects ratings outside [1,5] before touching storage. An unknown
    /// request_id is accepted: the link to requests_log is advisory so the
    /// two write paths stay uncoupled.
    pub fn upsert_feedback(
        &self,
        request_id: &str,
        rating: i64,
        comment: Option<&str>,
    ) -> Result<()> {
        if !(1..=5).contains(&rating) {
            return Err(RagScopeError::InvalidInput(format!(
                "rating must be between 1 and 5, got {}",
                rating
            )));
        }

        self.conn.execute(
            "INSERT INTO request_feedback (request_id, rating, comment)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(request_id) DO UPDATE SET
                rating = excluded.rating,
                comment = excluded.comment",
            params![request_id, rating, comment],
        )?;
        Ok(())
    }

    /// Read back the latest requests, newest first, joined with feedback
    ///
    /// `limit = None` returns everything.
    pub fn query_latest(&self, limit: Option<usize>) -> Result<Vec<LoggedRequest>> {
        let sql = format!(
            "{} ORDER BY rl.timestamp DESC, rl.id DESC{}",
            SELECT_JOINED,
            match limit {
                Some(n) => format!(" LIMIT {}", n),
                None => String::new(),
            }
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], read_raw_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(RawRow::into_logged).collect()
    }

    /// Fetch one logged request by id
    pub fn get(&self, request_id: &str) -> Result<Option<LoggedRequest>> {
        let sql = format!("{} WHERE rl.request_id = ?1", SELECT_JOINED);
        let mut stmt = self.conn.prepare(&sql)?;
        let raw = stmt
            .query_map(params![request_id], read_raw_row)?
            .next()
            .transpose()?;
        raw.map(RawRow::into_logged).transpose()
    }

    /// Number of logged requests
    pub fn count(&self) -> Result<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM requests_log", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::SourceRef;

    fn store() -> TelemetryStore {
        let store = TelemetryStore::open_in_memory().unwrap();
        store.initialize().unwrap();
        store
    }

    fn sample_entry() -> RequestLogEntry {
        let mut entry = RequestLogEntry::new("What is a test?");
        entry.answer = Some("This is a test answer.".to_string());
        entry.latency_ms_total = 120;
        entry.latency_ms_retrieval = 30;
        entry.latency_ms_llm = 80;
        entry.retrieved_sources = vec![SourceRef {
            source_file: "test.pdf".to_string(),
            chunk_index: 1,
        }];
        entry.retrieved_distances = Some(vec![0.123]);
        entry.prompt_tokens = Some(42);
        entry.answer_tokens = Some(6);
        entry
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let store = store();
        store.initialize().unwrap();
        store.initialize().unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_append_and_read_back() {
        let store = store();
        let entry = sample_entry();
        store.append(&entry).unwrap();

        let rows = store.query_latest(None).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.request_id, entry.request_id);
        assert_eq!(row.question, "What is a test?");
        assert_eq!(row.answer.as_deref(), Some("This is a test answer."));
        assert_eq!(row.latency_ms_total, 120);
        assert_eq!(row.retrieved_sources, entry.retrieved_sources);
        assert_eq!(row.retrieved_distances, Some(vec![0.123]));
        assert_eq!(row.prompt_tokens, Some(42));
        assert!(row.error.is_none());
        assert!(row.rating.is_none());
    }

    #[test]
    fn test_append_duplicate_request_id_fails() {
        let store = store();
        let entry = sample_entry();
        store.append(&entry).unwrap();
        assert!(store.append(&entry).is_err());
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_optional_columns_read_back_as_none() {
        let store = store();
        let mut entry = RequestLogEntry::new("failing question");
        entry.error = Some("generation timed out".to_string());
        entry.latency_ms_total = 5000;
        store.append(&entry).unwrap();

        let row = store.get(&entry.request_id.to_string()).unwrap().unwrap();
        assert!(row.answer.is_none());
        assert!(row.retrieved_distances.is_none());
        assert!(row.prompt_tokens.is_none());
        assert!(row.answer_tokens.is_none());
        assert!(row.trace_id.is_none());
        assert_eq!(row.error.as_deref(), Some("generation timed out"));
    }

    #[test]
    fn test_feedback_upsert_replaces() {
        let store = store();
        store.upsert_feedback("req-1", 3, None).unwrap();
        store.upsert_feedback("req-1", 5, Some("better")).unwrap();

        let count: i64 = store
            .conn
            .query_row(
                "SELECT COUNT(*) FROM request_feedback WHERE request_id = 'req-1'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);

        let rating: i64 = store
            .conn
            .query_row(
                "SELECT rating FROM request_feedback WHERE request_id = 'req-1'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(rating, 5);
    }

    #[test]
    fn test_feedback_rating_bounds() {
        let store = store();
        assert!(matches!(
            store.upsert_feedback("r", 0, None),
            Err(RagScopeError::InvalidInput(_))
        ));
        assert!(matches!(
            store.upsert_feedback("r", 6, None),
            Err(RagScopeError::InvalidInput(_))
        ));
        store.upsert_feedback("r", 1, None).unwrap();
        store.upsert_feedback("r", 5, None).unwrap();
    }

    #[test]
    fn test_feedback_for_unknown_request_id_accepted() {
        let store = store();
        store.upsert_feedback("never-logged", 4, Some("ok")).unwrap();
    }

    #[test]
    fn test_join_surfaces_feedback() {
        let store = store();
        let entry = sample_entry();
        store.append(&entry).unwrap();
        store
            .upsert_feedback(&entry.request_id.to_string(), 4, Some("useful"))
            .unwrap();

        let row = store.get(&entry.request_id.to_string()).unwrap().unwrap();
        assert_eq!(row.rating, Some(4));
        assert_eq!(row.comment.as_deref(), Some("useful"));
    }

    #[test]
    fn test_additive_migration_preserves_existing_rows() {
        // Simulate a database created before the optional columns existed
        let store = TelemetryStore::open_in_memory().unwrap();
        store
            .conn
            .execute_batch(
                "CREATE TABLE requests_log (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    timestamp TEXT NOT NULL,
                    request_id TEXT NOT NULL UNIQUE,
                    question TEXT NOT NULL,
                    answer TEXT,
                    latency_ms_total INTEGER NOT NULL,
                    latency_ms_retrieval INTEGER NOT NULL,
                    latency_ms_llm INTEGER NOT NULL,
                    retrieved_sources TEXT NOT NULL,
                    error TEXT
                );
                INSERT INTO requests_log (
                    timestamp, request_id, question, answer,
                    latency_ms_total, latency_ms_retrieval, latency_ms_llm,
                    retrieved_sources, error
                ) VALUES (
                    '2024-01-01T00:00:00Z', '00000000-0000-4000-8000-000000000001',
                    'old question', 'old answer', 100, 20, 70, '[]', NULL
                );",
            )
            .unwrap();

        store.initialize().unwrap();
        store.initialize().unwrap();

        let rows = store.query_latest(None).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.question, "old question");
        assert_eq!(row.answer.as_deref(), Some("old answer"));
        assert_eq!(row.latency_ms_total, 100);
        // New columns exist and read back as NULL for the legacy row
        assert!(row.retrieved_distances.is_none());
        assert!(row.prompt_tokens.is_none());
        assert!(row.trace_id.is_none());
    }

    #[test]
    fn test_get_returns_none_for_unknown_id() {
        let store = store();
        store.append(&sample_entry()).unwrap();
        assert!(store
            .get("00000000-0000-4000-8000-0000000000ff")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_get_unaffected_by_unrelated_corrupt_row() {
        let store = store();
        let entry = sample_entry();
        store.append(&entry).unwrap();

        // A row with an unparseable request_id poisons full scans but must
        // not break a targeted lookup of a healthy row
        store
            .conn
            .execute(
                "INSERT INTO requests_log (
                    timestamp, request_id, question,
                    latency_ms_total, latency_ms_retrieval, latency_ms_llm,
                    retrieved_sources
                ) VALUES ('2024-01-01T00:00:00Z', 'not-a-uuid', 'q', 1, 0, 0, '[]')",
                [],
            )
            .unwrap();

        assert!(store.query_latest(None).is_err());
        let row = store.get(&entry.request_id.to_string()).unwrap().unwrap();
        assert_eq!(row.request_id, entry.request_id);
    }

    #[test]
    fn test_query_latest_orders_newest_first_and_limits() {
        let store = store();
        let first = RequestLogEntry::new("first");
        let second = RequestLogEntry::new("second");
        store.append(&first).unwrap();
        store.append(&second).unwrap();

        let rows = store.query_latest(None).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].question, "second");

        let rows = store.query_latest(Some(1)).unwrap();
        assert_eq!(rows.len(), 1);
    }
}
