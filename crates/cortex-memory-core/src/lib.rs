//! Rank-aware memory engine for AI coding assistants.
//!
//! Stores short, structured observations (`Item`) about a codebase —
//! corrections, decisions, conventions, bug fixes — and serves them back
//! through a hybrid (full-text + vector + file-affinity) retriever, a
//! multi-factor ranker, and a layered context assembler meant to open a new
//! conversation already primed with relevant history.
//!
//! ## Layout
//! - [`memory`]: the data model (`Item`, `Edge`, `Event`).
//! - [`storage`]: the SQLite-backed store (FTS5 + brute-force vector sidecar).
//! - [`embeddings`]: pluggable text embedding (local model, or a
//!   dependency-free hash fallback).
//! - [`quality`]: the pre-persistence content gate.
//! - [`retrieval`]: hybrid search fan-out/fusion and the ranker.
//! - [`aging`]: importance decay, contradiction detection, cleanup,
//!   consolidation, and the learning-rate boost.
//! - [`context`]: the L0-L12 context assembler.
//! - [`engine`]: the `Engine` that ties all of the above together.

pub mod aging;
pub mod context;
pub mod embeddings;
pub mod engine;
pub mod error;
pub mod memory;
pub mod quality;
pub mod retrieval;
pub mod storage;
pub mod tokenize;

pub use engine::Engine;
pub use error::{Error, Result};
pub use memory::{Edge, Event, Item, ItemChanges, Kind, NewEvent, NewItem, Relation};
pub use storage::Storage;

/// Crate version, surfaced by `health_check` and `get_stats`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
