//! SQLite-backed `Store` implementation.

use chrono::{DateTime, Datelike, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::Mutex;

use crate::model::{Memory, MemoryKind};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Errors surfaced by the storage layer.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("memory not found: {0}")]
    NotFound(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("initialization error: {0}")]
    Init(String),
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// An inclusive `[start, end]` time-range filter for `fts_search`.
#[derive(Debug, Clone, Copy)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }
}

/// Strip FTS5 query-syntax operators a hostile or malformed query could
/// inject (bare `"`, `*`, boolean operators), leaving plain term matching.
pub fn sanitize_fts5_query(query: &str) -> String {
    let cleaned: String = query
        .chars()
        .map(|c| match c {
            '"' | '*' | '(' | ')' | ':' | '-' => ' ',
            other => other,
        })
        .collect();

    cleaned
        .split_whitespace()
        .filter(|tok| !matches!(tok.to_uppercase().as_str(), "AND" | "OR" | "NOT" | "NEAR"))
        .map(|tok| format!("\"{tok}\""))
        .collect::<Vec<_>>()
        .join(" OR ")
}

// ============================================================================
// STORE
// ============================================================================

/// Relational + full-text persistence of memories.
///
/// Two connections behind separate mutexes (writer, reader) so readers
/// never contend with the single writer: Store is the only writer and
/// may run concurrently with reads.
pub struct Store {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    archive_dir: PathBuf,
}

impl Store {
    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    /// Open (creating if missing) the store at `db_path`, or the default
    /// platform data directory when `None`.
    pub fn open(db_path: Option<PathBuf>) -> Result<Self> {
        let path = match db_path {
            Some(p) => p,
            None => {
                let dirs = ProjectDirs::from("com", "memory-core", "companion").ok_or_else(|| {
                    StorageError::Init("could not determine project directories".into())
                })?;
                std::fs::create_dir_all(dirs.data_dir())?;
                dirs.data_dir().join("memory.db")
            }
        };

        let archive_dir = path
            .parent()
            .map(|p| p.join("archive"))
            .unwrap_or_else(|| PathBuf::from("archive"));
        std::fs::create_dir_all(&archive_dir)?;

        let writer_conn = Connection::open(&path)?;
        Self::configure_connection(&writer_conn)?;
        super::migrations::apply_migrations(&writer_conn)?;

        let reader_conn = Connection::open(&path)?;
        Self::configure_connection(&reader_conn)?;

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
            archive_dir,
        })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self> {
        let writer_conn = Connection::open_in_memory()?;
        Self::configure_connection(&writer_conn)?;
        super::migrations::apply_migrations(&writer_conn)?;
        // A second in-memory connection would be a distinct database, so
        // tests use the writer connection for reads too.
        let reader_conn = Connection::open_in_memory()?;
        Self::configure_connection(&reader_conn)?;
        super::migrations::apply_migrations(&reader_conn)?;
        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
            archive_dir: std::env::temp_dir().join("memory-core-test-archive"),
        })
    }

    fn writer(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.writer
            .lock()
            .map_err(|_| StorageError::LockPoisoned("writer".into()))
    }

    fn reader(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.reader
            .lock()
            .map_err(|_| StorageError::LockPoisoned("reader".into()))
    }

    /// Insert a new memory. Timestamps are re-stamped here regardless of
    /// what the caller set; `vectorized` always starts false.
    pub fn insert(&self, mut memory: Memory) -> Result<String> {
        let now = Utc::now();
        memory.created_at = now;
        memory.updated_at = now;
        memory.last_accessed = now;
        memory.vectorized = false;

        let conn = self.writer()?;
        conn.execute(
            "INSERT INTO memories (
                id, content, kind, created_at, updated_at, last_accessed,
                importance, access_count, decay_factor, tags, metadata,
                archived, vectorized, emotion_tag, conflict_flag, user_pinned
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16)",
            params![
                memory.id,
                memory.content,
                memory.kind.as_str(),
                memory.created_at.to_rfc3339(),
                memory.updated_at.to_rfc3339(),
                memory.last_accessed.to_rfc3339(),
                memory.importance,
                memory.access_count,
                memory.decay_factor,
                serde_json::to_string(&memory.tags)?,
                serde_json::to_string(&memory.metadata)?,
                memory.archived as i64,
                memory.vectorized as i64,
                memory.emotion_tag.map(|t| t.as_str()),
                memory.conflict_flag as i64,
                memory.user_pinned as i64,
            ],
        )?;

        Ok(memory.id)
    }

    pub fn get(&self, id: &str) -> Result<Option<Memory>> {
        let conn = self.reader()?;
        conn.query_row("SELECT * FROM memories WHERE id = ?1", params![id], row_to_memory)
            .optional()
            .map_err(StorageError::from)
    }

    /// Increment `access_count`, bump `last_accessed`, and reset
    /// `decay_factor` to 1.0 — all in one transaction.
    pub fn touch(&self, id: &str) -> Result<()> {
        let mut conn = self.writer()?;
        let tx = conn.transaction()?;
        let updated = tx.execute(
            "UPDATE memories SET access_count = access_count + 1,
             last_accessed = ?2, decay_factor = 1.0 WHERE id = ?1",
            params![id, Utc::now().to_rfc3339()],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(id.to_string()));
        }
        tx.commit()?;
        Ok(())
    }

    /// Multiply every non-archived row's `decay_factor` by `rate`.
    pub fn decay_tick(&self, rate: f32) -> Result<usize> {
        let rate = rate.min(1.0);
        let conn = self.writer()?;
        let updated = conn.execute(
            "UPDATE memories SET decay_factor = decay_factor * ?1 WHERE archived = 0",
            params![rate],
        )?;
        Ok(updated)
    }

    /// Move a memory into the archive: flips `archived`, and appends a
    /// JSONL record under `archive/{year}/{month}.jsonl`.
    pub fn archive(&self, id: &str) -> Result<()> {
        let memory = self.get(id)?.ok_or_else(|| StorageError::NotFound(id.to_string()))?;

        let mut conn = self.writer()?;
        let tx = conn.transaction()?;
        tx.execute("UPDATE memories SET archived = 1 WHERE id = ?1", params![id])?;
        tx.commit()?;

        self.append_archive_record(&memory)?;
        Ok(())
    }

    pub fn restore(&self, id: &str) -> Result<()> {
        let conn = self.writer()?;
        let updated = conn.execute("UPDATE memories SET archived = 0 WHERE id = ?1", params![id])?;
        if updated == 0 {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn append_archive_record(&self, memory: &Memory) -> Result<()> {
        use std::io::Write;
        let now = Utc::now();
        let dir = self.archive_dir.join(now.year().to_string());
        std::fs::create_dir_all(&dir)?;
        let file_path = dir.join(format!("{:02}.jsonl", now.month()));
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;
        writeln!(file, "{}", serde_json::to_string(memory)?)?;
        Ok(())
    }

    pub fn set_conflict(&self, id: &str, flag: bool) -> Result<()> {
        let conn = self.writer()?;
        let updated = conn.execute(
            "UPDATE memories SET conflict_flag = ?2 WHERE id = ?1",
            params![id, flag as i64],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Flip `vectorized = true` for one memory — called inside the same
    /// transaction as a `VectorIndex::add` by the vectorize worker.
    pub fn mark_vectorized(&self, id: &str) -> Result<()> {
        let conn = self.writer()?;
        conn.execute("UPDATE memories SET vectorized = 1 WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Mark an entire batch vectorized in a single transaction — one
    /// transaction per batch.
    pub fn mark_vectorized_batch(&self, ids: &[String]) -> Result<()> {
        let mut conn = self.writer()?;
        let tx = conn.transaction()?;
        for id in ids {
            tx.execute("UPDATE memories SET vectorized = 1 WHERE id = ?1", params![id])?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Full-text search with optional time-window filtering. Ties break
    /// on `last_accessed DESC` then `id ASC`.
    pub fn fts_search(
        &self,
        query: &str,
        limit: usize,
        time_window: Option<TimeWindow>,
    ) -> Result<Vec<(String, f32)>> {
        let sanitized = sanitize_fts5_query(query);
        if sanitized.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.reader()?;
        let sql = if time_window.is_some() {
            "SELECT m.id, bm25(memories_fts) as rank, m.last_accessed
             FROM memories_fts
             JOIN memories m ON m.id = memories_fts.id
             WHERE memories_fts MATCH ?1 AND m.archived = 0
               AND m.created_at >= ?2 AND m.created_at <= ?3
             ORDER BY rank ASC, m.last_accessed DESC, m.id ASC
             LIMIT ?4"
        } else {
            "SELECT m.id, bm25(memories_fts) as rank, m.last_accessed
             FROM memories_fts
             JOIN memories m ON m.id = memories_fts.id
             WHERE memories_fts MATCH ?1 AND m.archived = 0
             ORDER BY rank ASC, m.last_accessed DESC, m.id ASC
             LIMIT ?4"
        };

        let mut stmt = conn.prepare(sql)?;
        let rows = if let Some(window) = time_window {
            stmt.query_map(
                params![
                    sanitized,
                    window.start.to_rfc3339(),
                    window.end.to_rfc3339(),
                    limit as i64
                ],
                |row| {
                    let id: String = row.get(0)?;
                    let rank: f64 = row.get(1)?;
                    Ok((id, rank))
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?
        } else {
            stmt.query_map(params![sanitized, sanitized, sanitized, limit as i64], |row| {
                let id: String = row.get(0)?;
                let rank: f64 = row.get(1)?;
                Ok((id, rank))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?
        };

        // bm25() is negative and lower-is-better; normalize into (0, 1].
        Ok(rows
            .into_iter()
            .map(|(id, rank)| (id, 1.0 / (1.0 + rank.abs() as f32)))
            .collect())
    }

    /// All active (non-archived), non-user-pinned memories — the
    /// population LifecycleManager computes the archival percentile over.
    pub fn active_non_pinned(&self) -> Result<Vec<Memory>> {
        let conn = self.reader()?;
        let mut stmt = conn.prepare("SELECT * FROM memories WHERE archived = 0 AND user_pinned = 0")?;
        let rows = stmt
            .query_map([], row_to_memory)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn row_to_memory(row: &rusqlite::Row) -> rusqlite::Result<Memory> {
    let tags_json: String = row.get("tags")?;
    let metadata_json: String = row.get("metadata")?;
    let emotion_tag: Option<String> = row.get("emotion_tag")?;
    let kind: String = row.get("kind")?;

    Ok(Memory {
        id: row.get("id")?,
        content: row.get("content")?,
        kind: MemoryKind::parse_name(&kind),
        created_at: parse_rfc3339(row, "created_at")?,
        updated_at: parse_rfc3339(row, "updated_at")?,
        last_accessed: parse_rfc3339(row, "last_accessed")?,
        importance: row.get("importance")?,
        access_count: row.get("access_count")?,
        decay_factor: row.get("decay_factor")?,
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        metadata: serde_json::from_str(&metadata_json).unwrap_or_default(),
        archived: row.get::<_, i64>("archived")? != 0,
        vectorized: row.get::<_, i64>("vectorized")? != 0,
        emotion_tag: emotion_tag.and_then(|s| s.parse().ok()),
        conflict_flag: row.get::<_, i64>("conflict_flag")? != 0,
        user_pinned: row.get::<_, i64>("user_pinned")? != 0,
    })
}

fn parse_rfc3339(row: &rusqlite::Row, col: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(col)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MemoryKind;

    #[test]
    fn insert_then_get_round_trips() {
        let store = Store::open_in_memory().unwrap();
        let memory = Memory::new("hello world", MemoryKind::Episode, 0.6);
        let id = store.insert(memory.clone()).unwrap();
        let fetched = store.get(&id).unwrap().unwrap();
        assert_eq!(fetched.content, "hello world");
        assert_eq!(fetched.kind, MemoryKind::Episode);
        assert!(!fetched.vectorized);
    }

    #[test]
    fn touch_resets_decay_and_bumps_access_count() {
        let store = Store::open_in_memory().unwrap();
        let id = store.insert(Memory::new("x", MemoryKind::Fact, 0.5)).unwrap();
        store.decay_tick(0.5).unwrap();
        let decayed = store.get(&id).unwrap().unwrap();
        assert!(decayed.decay_factor < 1.0);

        store.touch(&id).unwrap();
        let touched = store.get(&id).unwrap().unwrap();
        assert_eq!(touched.decay_factor, 1.0);
        assert_eq!(touched.access_count, 1);
    }

    #[test]
    fn touch_missing_memory_errors() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.touch("nope").is_err());
    }

    #[test]
    fn archived_memory_is_excluded_from_fts_search() {
        let store = Store::open_in_memory().unwrap();
        let id = store
            .insert(Memory::new("the quick brown fox", MemoryKind::Fact, 0.5))
            .unwrap();
        let hits = store.fts_search("quick fox", 10, None).unwrap();
        assert!(hits.iter().any(|(hid, _)| hid == &id));

        store.archive(&id).unwrap();
        let hits_after = store.fts_search("quick fox", 10, None).unwrap();
        assert!(!hits_after.iter().any(|(hid, _)| hid == &id));
    }

    #[test]
    fn fts_search_respects_time_window() {
        let store = Store::open_in_memory().unwrap();
        let id = store.insert(Memory::new("time travel test", MemoryKind::Fact, 0.5)).unwrap();

        let far_future = TimeWindow::new(
            Utc::now() + chrono::Duration::days(365),
            Utc::now() + chrono::Duration::days(366),
        );
        let hits = store.fts_search("time travel", 10, Some(far_future)).unwrap();
        assert!(!hits.iter().any(|(hid, _)| hid == &id));

        let now_window = TimeWindow::new(Utc::now() - chrono::Duration::hours(1), Utc::now() + chrono::Duration::hours(1));
        let hits2 = store.fts_search("time travel", 10, Some(now_window)).unwrap();
        assert!(hits2.iter().any(|(hid, _)| hid == &id));
    }

    #[test]
    fn mark_vectorized_batch_is_transactional() {
        let store = Store::open_in_memory().unwrap();
        let id1 = store.insert(Memory::new("a", MemoryKind::Fact, 0.5)).unwrap();
        let id2 = store.insert(Memory::new("b", MemoryKind::Fact, 0.5)).unwrap();
        store.mark_vectorized_batch(&[id1.clone(), id2.clone()]).unwrap();
        assert!(store.get(&id1).unwrap().unwrap().vectorized);
        assert!(store.get(&id2).unwrap().unwrap().vectorized);
    }

    #[test]
    fn sanitize_strips_fts_operators() {
        let cleaned = sanitize_fts5_query("\"weird\" OR NEAR(foo bar)*");
        assert!(!cleaned.contains('"') || cleaned.matches('"').count() % 2 == 0);
        assert!(!cleaned.to_uppercase().contains(" NEAR "));
    }
}
