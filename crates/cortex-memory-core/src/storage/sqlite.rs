//! SQLite-backed `Storage`: the single source of truth for items, edges,
//! events, and the in-memory vector sidecar (spec §4.1, §4.4).
//!
//! Follows the teacher's writer/reader split: every public method takes
//! `&self`, so `Storage` is `Send + Sync` and usable as `Arc<Storage>`
//! without an outer `Mutex`. Long-running reads (FTS scans, BFS walks) go
//! through `reader`; mutations go through `writer`. WAL means the two never
//! block each other for long.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::embeddings::cosine_similarity;
use crate::error::{Error, Result};
use crate::memory::{Edge, Event, Item, ItemChanges, Kind, NewEvent, NewItem, Relation};
use crate::quality;

/// One hit from `search_fts` or `search_vector`: the item plus a raw,
/// source-specific score (FTS rank negated so "higher is better"; cosine
/// similarity as-is). The Hybrid Retriever (§4.5) re-weights these.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub item: Item,
    pub score: f64,
}

/// Result of `Storage::add`: whether the caller's content was folded into
/// an existing item (dedup, spec §4.3) or a new one was created.
#[derive(Debug, Clone)]
pub struct AddOutcome {
    pub item: Item,
    pub deduplicated: bool,
}

pub struct Storage {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    /// Brute-force cosine sidecar: id -> unit vector (spec §4.1, §4.4).
    vectors: Mutex<HashMap<String, Vec<f32>>>,
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

impl Storage {
    /// Default database location relative to the caller's workspace root
    /// (spec §6 persisted state): `<root>/.ai/brain-data/data/cognitive.db`.
    pub fn default_path(workspace_root: &Path) -> PathBuf {
        workspace_root.join(".ai").join("brain-data").join("data").join("cognitive.db")
    }

    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    /// Open (creating if absent) the database at `path`, applying PRAGMAs
    /// and pending migrations, and warming the in-memory vector sidecar.
    /// A missing parent directory is created; corrupt files surface as
    /// `Error::Database`, which the adapter turns into degraded mode
    /// (spec §4.1, §7).
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let writer_conn = Connection::open(path)?;
        Self::configure_connection(&writer_conn)?;
        super::migrations::apply_migrations(&writer_conn)?;

        let reader_conn = Connection::open(path)?;
        Self::configure_connection(&reader_conn)?;

        let storage = Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
            vectors: Mutex::new(HashMap::new()),
        };
        storage.load_vectors_into_memory()?;
        Ok(storage)
    }

    /// Open a storage instance for tests: a real (temp) file rather than
    /// `:memory:`, since a second `:memory:` handle would open a distinct,
    /// disconnected database and break the reader/writer split this type
    /// relies on everywhere else.
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let dir = tempfile::tempdir().map_err(Error::Io)?;
        let path = dir.into_path().join("test.db");
        Self::open(&path)
    }

    fn load_vectors_into_memory(&self) -> Result<()> {
        let reader = self.reader.lock().expect("reader lock poisoned");
        let mut stmt = reader.prepare("SELECT id, vector FROM memory_vectors")?;
        let rows: Vec<(String, Vec<u8>)> =
            stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?.filter_map(|r| r.ok()).collect();
        drop(stmt);
        drop(reader);

        let mut vectors = self.vectors.lock().expect("vector lock poisoned");
        for (id, bytes) in rows {
            vectors.insert(id, decode_vector(&bytes));
        }
        Ok(())
    }

    // -- events -----------------------------------------------------------

    /// Append a raw input event. Never mutated after insertion except
    /// `processed` (spec §3).
    pub fn log_event(&self, event: NewEvent) -> Result<Event> {
        let timestamp = event.timestamp.unwrap_or_else(now_ms);
        let metadata_json = event.metadata.as_ref().map(serde_json::to_string).transpose()?;

        let writer = self.writer.lock().expect("writer lock poisoned");
        writer.execute(
            "INSERT INTO events (event_type, source, content, diff, file, metadata, timestamp, processed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0)",
            params![event.event_type, event.source, event.content, event.diff, event.file, metadata_json, timestamp],
        )?;
        let id = writer.last_insert_rowid();

        Ok(Event {
            id,
            event_type: event.event_type,
            source: event.source,
            content: event.content,
            diff: event.diff,
            file: event.file,
            metadata: event.metadata,
            timestamp,
            processed: false,
        })
    }

    /// Mark an event as processed (0 -> 1, the only permitted mutation).
    pub fn mark_event_processed(&self, id: i64) -> Result<()> {
        let writer = self.writer.lock().expect("writer lock poisoned");
        writer.execute("UPDATE events SET processed = 1 WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Most recent events of a given `event_type`, newest first. Used by the
    /// Context Assembler's session-boundary sections (spec §4.8 L0/L3).
    pub fn get_events_by_type(&self, event_type: &str, limit: usize) -> Result<Vec<Event>> {
        let reader = self.reader.lock().expect("reader lock poisoned");
        let mut stmt = reader.prepare(
            "SELECT id, event_type, source, content, diff, file, metadata, timestamp, processed
             FROM events WHERE event_type = ?1 ORDER BY timestamp DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![event_type, limit as i64], row_to_event)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::from)
    }

    // -- items --------------------------------------------------------------

    /// Insert a new item, or fold the content into an existing duplicate
    /// (spec §4.3 "dedup, not reject"): an active item of the same `kind`
    /// whose intent is Jaccard-similar (≥0.7) is touched and returned as-is.
    pub fn add(&self, new_item: NewItem) -> Result<AddOutcome> {
        let candidates = self.get_by_kind(new_item.kind, 200)?;
        for candidate in &candidates {
            if quality::is_duplicate_intent(&candidate.intent, &new_item.intent) {
                self.touch(&candidate.id)?;
                let touched = self.get(&candidate.id)?.ok_or_else(|| Error::NotFound(candidate.id.clone()))?;
                return Ok(AddOutcome { item: touched, deduplicated: true });
            }
        }

        let id = Uuid::new_v4().to_string();
        let now = now_ms();
        let timestamp = new_item.timestamp.unwrap_or(now);
        let outcome = new_item.outcome_or_unknown();
        let related_files_json = serde_json::to_string(&new_item.related_files)?;
        let tags_json = serde_json::to_string(&new_item.tags)?;

        {
            let writer = self.writer.lock().expect("writer lock poisoned");
            writer.execute(
                "INSERT INTO memory_units (
                    id, kind, intent, action, reason, impact, outcome,
                    related_files, tags, created_at, timestamp, confidence,
                    importance, access_count, last_accessed, is_active,
                    superseded_by, source_event_id
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6, ?7,
                    ?8, ?9, ?10, ?11, ?12,
                    ?13, 0, ?14, 1,
                    NULL, ?15
                )",
                params![
                    id,
                    new_item.kind.as_str(),
                    new_item.intent,
                    new_item.action,
                    new_item.reason,
                    new_item.impact,
                    outcome,
                    related_files_json,
                    tags_json,
                    now,
                    timestamp,
                    new_item.confidence,
                    new_item.confidence,
                    now,
                    new_item.source_event_id,
                ],
            )?;
        }

        let item = self.get(&id)?.ok_or_else(|| Error::NotFound(id))?;
        Ok(AddOutcome { item, deduplicated: false })
    }

    /// Replace the provided fields on an active item. No-op if `id` is
    /// absent or inactive.
    pub fn update(&self, id: &str, changes: ItemChanges) -> Result<()> {
        let Some(item) = self.get(id)? else { return Ok(()) };
        if !item.is_active {
            return Ok(());
        }

        let intent = changes.intent.unwrap_or(item.intent);
        let action = changes.action.unwrap_or(item.action);
        let reason = changes.reason.or(item.reason);
        let impact = changes.impact.or(item.impact);
        let outcome = changes.outcome.unwrap_or(item.outcome);
        let related_files = changes.related_files.unwrap_or(item.related_files);
        let tags = changes.tags.unwrap_or(item.tags);
        let confidence = changes.confidence.unwrap_or(item.confidence);
        let importance = changes.importance.unwrap_or(item.importance);

        let related_files_json = serde_json::to_string(&related_files)?;
        let tags_json = serde_json::to_string(&tags)?;

        let writer = self.writer.lock().expect("writer lock poisoned");
        writer.execute(
            "UPDATE memory_units SET intent = ?1, action = ?2, reason = ?3, impact = ?4,
             outcome = ?5, related_files = ?6, tags = ?7, confidence = ?8, importance = ?9
             WHERE id = ?10 AND is_active = 1",
            params![intent, action, reason, impact, outcome, related_files_json, tags_json, confidence, importance, id],
        )?;
        Ok(())
    }

    /// Fetch an item by id regardless of active state.
    pub fn get(&self, id: &str) -> Result<Option<Item>> {
        let reader = self.reader.lock().expect("reader lock poisoned");
        reader
            .query_row("SELECT * FROM memory_units WHERE id = ?1", params![id], row_to_item)
            .optional()
            .map_err(Error::from)
    }

    /// Soft-delete. Idempotent: a second call on an already-inactive item
    /// is a no-op (spec §4.4).
    pub fn deactivate(&self, id: &str, superseded_by: Option<&str>) -> Result<()> {
        let writer = self.writer.lock().expect("writer lock poisoned");
        writer.execute(
            "UPDATE memory_units SET is_active = 0, superseded_by = COALESCE(?2, superseded_by)
             WHERE id = ?1 AND is_active = 1",
            params![id, superseded_by],
        )?;
        Ok(())
    }

    /// Reinforcement: bump `access_count` and `last_accessed` (spec §3).
    pub fn touch(&self, id: &str) -> Result<()> {
        let writer = self.writer.lock().expect("writer lock poisoned");
        writer.execute(
            "UPDATE memory_units SET access_count = access_count + 1, last_accessed = ?2 WHERE id = ?1",
            params![id, now_ms()],
        )?;
        Ok(())
    }

    /// Directly set `importance`, used by the aging engine (§4.7). Persisted
    /// only when the caller has already decided the delta clears the
    /// 0.05 threshold — this method itself does not gate.
    pub fn set_importance(&self, id: &str, importance: f64) -> Result<()> {
        let writer = self.writer.lock().expect("writer lock poisoned");
        writer.execute("UPDATE memory_units SET importance = ?2 WHERE id = ?1", params![id, importance])?;
        Ok(())
    }

    /// Fold `extra_access_count` into `id`'s access count (used by cleanup's
    /// identical-intent merge, §4.7.2).
    pub fn add_access_count(&self, id: &str, extra_access_count: i64) -> Result<()> {
        let writer = self.writer.lock().expect("writer lock poisoned");
        writer.execute(
            "UPDATE memory_units SET access_count = access_count + ?2 WHERE id = ?1",
            params![id, extra_access_count],
        )?;
        Ok(())
    }

    pub fn get_active(&self, limit: usize) -> Result<Vec<Item>> {
        let reader = self.reader.lock().expect("reader lock poisoned");
        let mut stmt = reader.prepare(
            "SELECT * FROM memory_units WHERE is_active = 1 ORDER BY timestamp DESC, id ASC LIMIT ?1",
        )?;
        let items = stmt.query_map(params![limit as i64], row_to_item)?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    pub fn get_by_kind(&self, kind: Kind, limit: usize) -> Result<Vec<Item>> {
        let reader = self.reader.lock().expect("reader lock poisoned");
        let mut stmt = reader.prepare(
            "SELECT * FROM memory_units WHERE is_active = 1 AND kind = ?1
             ORDER BY timestamp DESC, id ASC LIMIT ?2",
        )?;
        let items =
            stmt.query_map(params![kind.as_str(), limit as i64], row_to_item)?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    /// Active items whose `related_files` contains `path` (substring match
    /// either way, matching the Ranker's file-affinity rule, §4.6).
    pub fn get_by_file(&self, path: &str, limit: usize) -> Result<Vec<Item>> {
        let all = self.get_active(usize::MAX)?;
        Ok(all
            .into_iter()
            .filter(|item| item.related_files.iter().any(|f| f.contains(path) || path.contains(f.as_str())))
            .take(limit)
            .collect())
    }

    /// Full-text search over `intent`, `action`, `reason`, `impact`, `tags`.
    /// `query` is expected to already be FTS5-syntax (the Hybrid Retriever
    /// builds the OR-joined, expanded query); this layer only escapes
    /// characters FTS5 would otherwise choke on. FTS rank is "smaller is
    /// better"; we negate it so downstream fusion treats higher as better.
    pub fn search_fts(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let sanitized = sanitize_fts5_query(query);
        if sanitized.is_empty() {
            return Ok(Vec::new());
        }

        let reader = self.reader.lock().expect("reader lock poisoned");
        let mut stmt = reader.prepare(
            "SELECT m.*, bm25(memory_fts) as rank FROM memory_fts
             JOIN memory_units m ON m.id = memory_fts.id
             WHERE memory_fts MATCH ?1 AND m.is_active = 1
             ORDER BY rank LIMIT ?2",
        )?;
        let hits = stmt
            .query_map(params![sanitized, limit as i64], |row| {
                let item = row_to_item(row)?;
                let rank: f64 = row.get("rank")?;
                Ok(SearchHit { item, score: -rank })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(hits)
    }

    /// Brute-force cosine over the in-memory vector sidecar (spec §4.4).
    /// Items absent from the sidecar (not yet embedded) are simply absent
    /// from the result — not an error.
    pub fn search_vector(&self, query_vec: &[f32], limit: usize) -> Result<Vec<SearchHit>> {
        let vectors = self.vectors.lock().expect("vector lock poisoned");
        let mut scored: Vec<(String, f32)> =
            vectors.iter().map(|(id, v)| (id.clone(), cosine_similarity(query_vec, v))).collect();
        drop(vectors);

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);

        let mut hits = Vec::with_capacity(scored.len());
        for (id, score) in scored {
            if let Some(item) = self.get(&id)? {
                if item.is_active {
                    hits.push(SearchHit { item, score: score as f64 });
                }
            }
        }
        Ok(hits)
    }

    /// Persist a vector for `id` and update the in-memory sidecar. Called
    /// by the embedder's async path once an item has been embedded; never
    /// invoked on the request path itself (spec §5).
    pub fn set_vector(&self, id: &str, vector: Vec<f32>) -> Result<()> {
        let bytes = encode_vector(&vector);
        {
            let writer = self.writer.lock().expect("writer lock poisoned");
            writer.execute(
                "INSERT INTO memory_vectors (id, vector, dimensions, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET vector = excluded.vector, dimensions = excluded.dimensions",
                params![id, bytes, vector.len() as i64, now_ms()],
            )?;
        }
        self.vectors.lock().expect("vector lock poisoned").insert(id.to_string(), vector);
        Ok(())
    }

    // -- edges ----------------------------------------------------------

    pub fn add_edge(&self, edge: &Edge) -> Result<()> {
        let writer = self.writer.lock().expect("writer lock poisoned");
        writer.execute(
            "INSERT INTO edges (source_id, target_id, relation, weight, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(source_id, target_id, relation) DO UPDATE SET weight = excluded.weight",
            params![edge.source_id, edge.target_id, edge.relation.as_str(), edge.weight, edge.timestamp],
        )?;
        Ok(())
    }

    pub fn edges_from(&self, id: &str) -> Result<Vec<Edge>> {
        let reader = self.reader.lock().expect("reader lock poisoned");
        let mut stmt = reader.prepare("SELECT * FROM edges WHERE source_id = ?1")?;
        let edges = stmt.query_map(params![id], row_to_edge)?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(edges)
    }

    pub fn edges_to(&self, id: &str) -> Result<Vec<Edge>> {
        let reader = self.reader.lock().expect("reader lock poisoned");
        let mut stmt = reader.prepare("SELECT * FROM edges WHERE target_id = ?1")?;
        let edges = stmt.query_map(params![id], row_to_edge)?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(edges)
    }

    /// Breadth-first walk over outgoing edges from `id`, acyclic (each node
    /// visited at most once), scored `1/(depth+1)` (spec §4.4).
    pub fn get_related(&self, id: &str, max_hops: u32, limit: usize) -> Result<Vec<(Item, u32)>> {
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(id.to_string());
        let mut queue: VecDeque<(String, u32)> = VecDeque::new();
        queue.push_back((id.to_string(), 0));
        let mut results = Vec::new();

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_hops {
                continue;
            }
            for edge in self.edges_from(&current)? {
                if visited.contains(&edge.target_id) {
                    continue;
                }
                visited.insert(edge.target_id.clone());
                if let Some(item) = self.get(&edge.target_id)? {
                    if item.is_active {
                        results.push((item, depth + 1));
                        if results.len() >= limit {
                            return Ok(results);
                        }
                    }
                }
                queue.push_back((edge.target_id.clone(), depth + 1));
            }
        }
        Ok(results)
    }

    // -- counts / maintenance --------------------------------------------

    pub fn active_count(&self) -> Result<i64> {
        let reader = self.reader.lock().expect("reader lock poisoned");
        Ok(reader.query_row("SELECT COUNT(*) FROM memory_units WHERE is_active = 1", [], |r| r.get(0))?)
    }

    pub fn total_count(&self) -> Result<i64> {
        let reader = self.reader.lock().expect("reader lock poisoned");
        Ok(reader.query_row("SELECT COUNT(*) FROM memory_units", [], |r| r.get(0))?)
    }

    /// Rebuild the FTS index from `memory_units`, e.g. after a tokenizer
    /// change or bulk import.
    pub fn rebuild_index(&self) -> Result<()> {
        let writer = self.writer.lock().expect("writer lock poisoned");
        writer.execute_batch("INSERT INTO memory_fts(memory_fts) VALUES ('rebuild');")?;
        Ok(())
    }

    /// Return every active item, used by export and a handful of
    /// whole-corpus aging passes. Not part of spec.md's public op list but
    /// a thin composition of `get_active`.
    pub fn all_active(&self) -> Result<Vec<Item>> {
        self.get_active(usize::MAX)
    }

    /// Flush WAL to the main database file and release the handle. Invoked
    /// on clean shutdown (spec §5 scoped resources).
    pub fn close(&self) -> Result<()> {
        let writer = self.writer.lock().expect("writer lock poisoned");
        writer.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}

fn row_to_item(row: &Row) -> rusqlite::Result<Item> {
    let kind_str: String = row.get("kind")?;
    let related_files_json: String = row.get("related_files")?;
    let tags_json: String = row.get("tags")?;
    let is_active: i64 = row.get("is_active")?;

    Ok(Item {
        id: row.get("id")?,
        kind: Kind::parse_name(&kind_str),
        intent: row.get("intent")?,
        action: row.get("action")?,
        reason: row.get("reason")?,
        impact: row.get("impact")?,
        outcome: row.get("outcome")?,
        related_files: serde_json::from_str(&related_files_json).unwrap_or_default(),
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        created_at: row.get("created_at")?,
        timestamp: row.get("timestamp")?,
        confidence: row.get("confidence")?,
        importance: row.get("importance")?,
        access_count: row.get::<_, i64>("access_count")? as u32,
        last_accessed: row.get("last_accessed")?,
        is_active: is_active != 0,
        superseded_by: row.get("superseded_by")?,
        source_event_id: row.get("source_event_id")?,
    })
}

fn row_to_event(row: &Row) -> rusqlite::Result<Event> {
    let metadata_json: Option<String> = row.get("metadata")?;
    let processed: i64 = row.get("processed")?;
    Ok(Event {
        id: row.get("id")?,
        event_type: row.get("event_type")?,
        source: row.get("source")?,
        content: row.get("content")?,
        diff: row.get("diff")?,
        file: row.get("file")?,
        metadata: metadata_json.and_then(|s| serde_json::from_str(&s).ok()),
        timestamp: row.get("timestamp")?,
        processed: processed != 0,
    })
}

fn row_to_edge(row: &Row) -> rusqlite::Result<Edge> {
    let relation_str: String = row.get("relation")?;
    Ok(Edge {
        source_id: row.get("source_id")?,
        target_id: row.get("target_id")?,
        relation: Relation::parse_name(&relation_str).unwrap_or(Relation::RelatedTo),
        weight: row.get("weight")?,
        timestamp: row.get("timestamp")?,
    })
}

fn encode_vector(v: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(v.len() * 4);
    for x in v {
        bytes.extend_from_slice(&x.to_le_bytes());
    }
    bytes
}

fn decode_vector(bytes: &[u8]) -> Vec<f32> {
    bytes.chunks_exact(4).map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect()
}

/// Escape a caller-facing query for FTS5's MATCH syntax: quote any token
/// containing characters FTS5 treats as operators, leaving bareword OR
/// chains (already built by the Hybrid Retriever) intact.
fn sanitize_fts5_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|tok| {
            if tok.eq_ignore_ascii_case("OR") || tok.eq_ignore_ascii_case("AND") || tok.eq_ignore_ascii_case("NOT") {
                tok.to_string()
            } else if tok.chars().all(|c| c.is_alphanumeric() || c == '_') {
                tok.to_string()
            } else {
                format!("\"{}\"", tok.replace('"', "\"\""))
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::NewItem;

    fn sample_item(intent: &str) -> NewItem {
        NewItem {
            kind: Kind::Convention,
            intent: intent.to_string(),
            action: String::new(),
            reason: None,
            impact: None,
            outcome: None,
            related_files: vec![],
            tags: vec![],
            timestamp: None,
            confidence: 0.8,
            source_event_id: None,
        }
    }

    #[test]
    fn add_then_get_roundtrips() {
        let storage = Storage::open_in_memory().unwrap();
        let outcome = storage.add(sample_item("Always use Zod for schema validation")).unwrap();
        assert!(!outcome.deduplicated);
        let fetched = storage.get(&outcome.item.id).unwrap().unwrap();
        assert_eq!(fetched.intent, "Always use Zod for schema validation");
        assert!(fetched.is_active);
    }

    #[test]
    fn add_deduplicates_similar_intent() {
        let storage = Storage::open_in_memory().unwrap();
        let first = storage.add(sample_item("Always use Zod for schema validation")).unwrap();
        let second = storage.add(sample_item("Always use Zod for schema validation here")).unwrap();
        assert!(second.deduplicated);
        assert_eq!(first.item.id, second.item.id);

        let refetched = storage.get(&first.item.id).unwrap().unwrap();
        assert_eq!(refetched.access_count, 1);
    }

    #[test]
    fn deactivate_is_idempotent() {
        let storage = Storage::open_in_memory().unwrap();
        let outcome = storage.add(sample_item("Never commit secrets to version control")).unwrap();
        storage.deactivate(&outcome.item.id, None).unwrap();
        storage.deactivate(&outcome.item.id, None).unwrap();
        let item = storage.get(&outcome.item.id).unwrap().unwrap();
        assert!(!item.is_active);
    }

    #[test]
    fn get_by_kind_excludes_inactive() {
        let storage = Storage::open_in_memory().unwrap();
        let a = storage.add(sample_item("Use snake_case for database column names")).unwrap();
        storage.add(sample_item("Use kebab-case for URL path segments")).unwrap();
        storage.deactivate(&a.item.id, None).unwrap();

        let active = storage.get_by_kind(Kind::Convention, 10).unwrap();
        assert_eq!(active.len(), 1);
        assert_ne!(active[0].id, a.item.id);
    }

    #[test]
    fn search_fts_finds_by_token() {
        let storage = Storage::open_in_memory().unwrap();
        storage.add(sample_item("Prefer composition over inheritance in this codebase")).unwrap();
        let hits = storage.search_fts("composition", 10).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn get_related_is_acyclic() {
        let storage = Storage::open_in_memory().unwrap();
        let a = storage.add(sample_item("Root convention about API versioning")).unwrap();
        let b = storage.add(sample_item("Follow-on convention about header naming")).unwrap();

        storage
            .add_edge(&Edge {
                source_id: a.item.id.clone(),
                target_id: b.item.id.clone(),
                relation: Relation::RelatedTo,
                weight: 1.0,
                timestamp: now_ms(),
            })
            .unwrap();
        storage
            .add_edge(&Edge {
                source_id: b.item.id.clone(),
                target_id: a.item.id.clone(),
                relation: Relation::RelatedTo,
                weight: 1.0,
                timestamp: now_ms(),
            })
            .unwrap();

        let related = storage.get_related(&a.item.id, 5, 10).unwrap();
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].0.id, b.item.id);
        assert_eq!(related[0].1, 1);
    }

    #[test]
    fn vector_roundtrip_and_search() {
        let storage = Storage::open_in_memory().unwrap();
        let a = storage.add(sample_item("Document every public function with a doc comment")).unwrap();
        storage.set_vector(&a.item.id, vec![1.0, 0.0, 0.0]).unwrap();

        let hits = storage.search_vector(&[1.0, 0.0, 0.0], 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item.id, a.item.id);
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }
}
