//! Relational + full-text persistence (C1).
//!
//! SQLite with an FTS5 shadow table kept in sync by write-time triggers,
//! additive schema migrations, and a transactional archive path.

mod migrations;
mod sqlite;

pub use migrations::MIGRATIONS;
pub use sqlite::{Result, Store, StorageError, TimeWindow};
