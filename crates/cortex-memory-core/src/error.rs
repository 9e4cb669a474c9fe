//! Engine-wide error type.
//!
//! Internals never throw across the store/assembler boundary (spec §7): every
//! fallible public entry point returns `Result<T, Error>`, and callers at the
//! RPC boundary turn that into a `result.isError=true` text payload rather
//! than letting it surface as a JSON-RPC error object.

/// Engine result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the memory engine.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Underlying SQLite failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Filesystem failure while opening or creating the data directory.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored JSON column (tags, related_files, metadata) failed to
    /// (de)serialize.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// An item, edge, or event id did not resolve to an active record.
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller input failed validation before it reached storage.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The quality gate rejected the item; carries the triggering rule name.
    #[error("rejected by quality gate: {0}")]
    Rejected(String),

    /// Storage failed to initialize (corrupt file, permissions, etc).
    /// The adapter transitions to degraded mode rather than exiting on this.
    #[error("initialization error: {0}")]
    Init(String),

    /// A per-process rate limit (spec §5) was exceeded.
    #[error("rate limit exceeded: {0}")]
    RateLimited(String),
}
