//! Relational schema for the fact store
//!
//! Four tables: `symbol_index` (FQN -> source URI + owning package),
//! `nodes` and `edges` (the fact base), `index_metadata` (per-package
//! content hashes driving incremental invalidation). Edge endpoints are
//! plain FQN strings without referential integrity; calls into library
//! classes are expected to dangle.

use serde::{Deserialize, Serialize};

/// DDL executed by `GraphStore::ensure_schema`. `CREATE TABLE IF NOT
/// EXISTS` keeps `init=false` opens additive.
pub const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS symbol_index (
        fqn TEXT PRIMARY KEY,
        uri TEXT NOT NULL,
        package TEXT NOT NULL,
        line INTEGER,
        is_entity INTEGER
    )",
    "CREATE INDEX IF NOT EXISTS idx_symbol_package ON symbol_index(package)",
    "CREATE TABLE IF NOT EXISTS nodes (
        fqn TEXT PRIMARY KEY NOT NULL,
        type TEXT NOT NULL,
        package TEXT NOT NULL,
        line INTEGER,
        visibility TEXT NOT NULL,
        has_override INTEGER NOT NULL DEFAULT 0,
        is_transactional INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE INDEX IF NOT EXISTS idx_nodes_package ON nodes(package)",
    "CREATE TABLE IF NOT EXISTS edges (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        from_fqn TEXT NOT NULL,
        edge_type TEXT NOT NULL,
        to_fqn TEXT NOT NULL,
        kind TEXT,
        from_package TEXT NOT NULL,
        to_package TEXT NOT NULL,
        from_line INTEGER
    )",
    "CREATE INDEX IF NOT EXISTS idx_edges_to ON edges(to_fqn)",
    "CREATE INDEX IF NOT EXISTS idx_edges_from ON edges(from_fqn)",
    "CREATE INDEX IF NOT EXISTS idx_edges_from_package ON edges(from_package)",
    "CREATE INDEX IF NOT EXISTS idx_edges_to_package ON edges(to_package)",
    "CREATE TABLE IF NOT EXISTS index_metadata (
        package TEXT PRIMARY KEY,
        content_hash TEXT NOT NULL,
        indexed_at INTEGER NOT NULL
    )",
];

/// Tables dropped by `init=true`, in dependency-free order.
pub const TABLES: &[&str] = &["edges", "nodes", "symbol_index", "index_metadata"];

/// Row of `symbol_index`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolRow {
    pub fqn: String,
    /// `file:///...` URI; method URIs carry a trailing `:line`.
    pub uri: String,
    pub package: String,
    /// Definition line for methods; None for types.
    pub line: Option<i64>,
    /// Persistence-entity marker carried from the analyzer. Nullable;
    /// nothing downstream depends on it for correctness.
    pub is_entity: Option<bool>,
}

/// Row of `nodes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRow {
    pub fqn: String,
    pub node_type: String,
    pub package: String,
    pub line: Option<i64>,
    pub visibility: String,
    pub has_override: bool,
    pub is_transactional: bool,
}

/// Row of `edges`. Rows are append-only within a package generation;
/// duplicates (the same call on two lines) are permitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRow {
    pub from_fqn: String,
    pub edge_type: String,
    pub to_fqn: String,
    pub kind: String,
    pub from_package: String,
    pub to_package: String,
    pub from_line: Option<i64>,
}

/// Row of `index_metadata`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataRow {
    pub package: String,
    /// Hex SHA-256 over the package's class files.
    pub content_hash: String,
    /// Unix timestamp (seconds) of the last successful index.
    pub indexed_at: i64,
}
