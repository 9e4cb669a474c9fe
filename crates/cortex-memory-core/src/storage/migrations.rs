//! Database migrations.
//!
//! Schema is versioned (spec §4.1): on open, the layer reads `schema_version`
//! and runs every migration newer than the current version. Migrations are
//! additive only — there is no downgrade path.

/// A single schema migration.
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub up: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "Initial schema: events, memory_units, memory_fts, edges, memory_vectors, user_signals, feedback_log, identity, daily_summaries, adaptive_config",
    up: MIGRATION_V1_UP,
}];

const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    event_type TEXT NOT NULL,
    source TEXT NOT NULL,
    content TEXT NOT NULL,
    diff TEXT,
    file TEXT,
    metadata TEXT,
    timestamp INTEGER NOT NULL,
    processed INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp);
CREATE INDEX IF NOT EXISTS idx_events_processed ON events(processed) WHERE processed = 0;

CREATE TABLE IF NOT EXISTS memory_units (
    id TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    intent TEXT NOT NULL,
    action TEXT NOT NULL DEFAULT '',
    reason TEXT,
    impact TEXT,
    outcome TEXT NOT NULL DEFAULT 'unknown',
    related_files TEXT NOT NULL DEFAULT '[]',
    tags TEXT NOT NULL DEFAULT '[]',
    created_at INTEGER NOT NULL,
    timestamp INTEGER NOT NULL,
    confidence REAL NOT NULL DEFAULT 0.8,
    importance REAL NOT NULL DEFAULT 0.5,
    access_count INTEGER NOT NULL DEFAULT 0,
    last_accessed INTEGER NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    superseded_by TEXT,
    source_event_id INTEGER REFERENCES events(id)
);

CREATE INDEX IF NOT EXISTS idx_units_active_timestamp ON memory_units(is_active, timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_units_kind ON memory_units(kind) WHERE is_active = 1;
CREATE INDEX IF NOT EXISTS idx_units_created_at ON memory_units(created_at);

CREATE VIRTUAL TABLE IF NOT EXISTS memory_fts USING fts5(
    id UNINDEXED,
    intent, action, reason, impact, tags,
    tokenize = 'porter unicode61'
);

CREATE TRIGGER IF NOT EXISTS memory_units_ai AFTER INSERT ON memory_units BEGIN
    INSERT INTO memory_fts(rowid, id, intent, action, reason, impact, tags)
    VALUES (NEW.rowid, NEW.id, NEW.intent, NEW.action, NEW.reason, NEW.impact, NEW.tags);
END;

CREATE TRIGGER IF NOT EXISTS memory_units_ad AFTER DELETE ON memory_units BEGIN
    INSERT INTO memory_fts(memory_fts, rowid, id, intent, action, reason, impact, tags)
    VALUES ('delete', OLD.rowid, OLD.id, OLD.intent, OLD.action, OLD.reason, OLD.impact, OLD.tags);
END;

CREATE TRIGGER IF NOT EXISTS memory_units_au AFTER UPDATE ON memory_units BEGIN
    INSERT INTO memory_fts(memory_fts, rowid, id, intent, action, reason, impact, tags)
    VALUES ('delete', OLD.rowid, OLD.id, OLD.intent, OLD.action, OLD.reason, OLD.impact, OLD.tags);
    INSERT INTO memory_fts(rowid, id, intent, action, reason, impact, tags)
    VALUES (NEW.rowid, NEW.id, NEW.intent, NEW.action, NEW.reason, NEW.impact, NEW.tags);
END;

CREATE TABLE IF NOT EXISTS edges (
    source_id TEXT NOT NULL,
    target_id TEXT NOT NULL,
    relation TEXT NOT NULL,
    weight REAL NOT NULL DEFAULT 1.0,
    timestamp INTEGER NOT NULL,
    PRIMARY KEY (source_id, target_id, relation)
);

CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source_id);
CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target_id);

CREATE TABLE IF NOT EXISTS memory_vectors (
    id TEXT PRIMARY KEY REFERENCES memory_units(id) ON DELETE CASCADE,
    vector BLOB NOT NULL,
    dimensions INTEGER NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS user_signals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    item_id TEXT NOT NULL,
    signal_type TEXT NOT NULL,
    weight REAL NOT NULL DEFAULT 1.0,
    timestamp INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_signals_item ON user_signals(item_id);

CREATE TABLE IF NOT EXISTS feedback_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tool TEXT NOT NULL,
    outcome TEXT NOT NULL,
    detail TEXT,
    timestamp INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS identity (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS daily_summaries (
    day TEXT PRIMARY KEY,
    summary TEXT NOT NULL,
    item_count INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS adaptive_config (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, datetime('now'));
"#;

/// Read the highest applied version, 0 if `schema_version` is empty or absent.
pub fn get_current_version(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| row.get(0))
        .or(Ok(0))
}

/// Apply every migration newer than the database's current version.
/// Downgrades (a file stamped with a version newer than we know about) are
/// left untouched rather than refused destructively — callers that care can
/// inspect the returned count.
pub fn apply_migrations(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    let current = get_current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version > current {
            tracing::info!("applying migration v{}: {}", migration.version, migration.description);
            conn.execute_batch(migration.up)?;
            applied += 1;
        }
    }

    Ok(applied)
}
