//! Fact store over SQLite
//!
//! Single-writer persistence layer for symbols, nodes, edges and index
//! metadata. All mutation goes through one connection owned by the
//! orchestrator process; batch writes run inside explicit transactions so
//! a crash mid-run leaves every committed package intact.

mod schema;

pub use schema::{EdgeRow, MetadataRow, NodeRow, SymbolRow};

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, Transaction, params, params_from_iter};
use std::collections::HashMap;
use std::path::Path;

/// Upper bound on host parameters per grouped lookup; stays well under
/// SQLite's limit.
const LOOKUP_CHUNK: usize = 500;

/// Aggregate row counts for status reporting.
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub symbols: usize,
    pub nodes: usize,
    pub edges: usize,
    pub packages: usize,
}

/// Graph fact store. One instance per run, exclusive writer.
pub struct GraphStore {
    conn: Connection,
}

impl GraphStore {
    /// Open (and if necessary create) the store at `path`.
    ///
    /// With `init=true` all four tables are dropped and recreated; with
    /// `init=false` missing tables are created and existing rows are left
    /// alone.
    pub fn open<P: AsRef<Path>>(path: P, init: bool) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("failed to open store at {}", path.as_ref().display()))?;
        Self::from_connection(conn, init)
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, true)
    }

    fn from_connection(conn: Connection, init: bool) -> Result<Self> {
        let store = Self { conn };
        if init {
            store.drop_schema()?;
        }
        store.ensure_schema()?;
        Ok(store)
    }

    fn drop_schema(&self) -> Result<()> {
        for table in schema::TABLES {
            self.conn
                .execute(&format!("DROP TABLE IF EXISTS {}", table), [])?;
        }
        Ok(())
    }

    fn ensure_schema(&self) -> Result<()> {
        for stmt in schema::SCHEMA {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    /// Run `f` inside one transaction; commit on success, roll back on
    /// error.
    pub fn with_transaction<T>(&mut self, f: impl FnOnce(&Transaction) -> Result<T>) -> Result<T> {
        let tx = self.conn.transaction()?;
        let value = f(&tx)?;
        tx.commit().context("failed to commit transaction")?;
        Ok(value)
    }

    /// Stored content hash for a package, if it was ever indexed.
    pub fn metadata_hash(&self, package: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT content_hash FROM index_metadata WHERE package = ?1",
                params![package],
                |row| row.get(0),
            )
            .optional()
            .context("failed to read index_metadata")
    }

    /// All metadata rows, sorted by package name.
    pub fn list_metadata(&self) -> Result<Vec<MetadataRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT package, content_hash, indexed_at FROM index_metadata ORDER BY package",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(MetadataRow {
                    package: row.get(0)?,
                    content_hash: row.get(1)?,
                    indexed_at: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Resolve owning packages for a set of FQNs in grouped `IN` queries.
    ///
    /// FQNs absent from the index are simply missing from the returned
    /// map; the caller substitutes `unknown`.
    pub fn lookup_packages(&self, fqns: &[&str]) -> Result<HashMap<String, String>> {
        let mut resolved = HashMap::new();
        for chunk in fqns.chunks(LOOKUP_CHUNK) {
            let placeholders = std::iter::repeat("?")
                .take(chunk.len())
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "SELECT fqn, package FROM symbol_index WHERE fqn IN ({})",
                placeholders
            );
            let mut stmt = self.conn.prepare_cached(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (fqn, package) = row?;
                resolved.insert(fqn, package);
            }
        }
        Ok(resolved)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            symbols: self.count("symbol_index")?,
            nodes: self.count("nodes")?,
            edges: self.count("edges")?,
            packages: self.count("index_metadata")?,
        })
    }

    fn count(&self, table: &str) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })?;
        Ok(n as usize)
    }

    /// Edge count attributed to one analyzing package.
    pub fn count_edges_from_package(&self, package: &str) -> Result<usize> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM edges WHERE from_package = ?1",
            params![package],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    /// Raw read access for downstream queries and tests. Mutation stays on
    /// the typed API.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Delete every row attributable to `package` across all four tables.
///
/// Must run in the same transaction as the subsequent re-insertion so no
/// intermediate state is ever observable.
pub fn cascade_delete_package(tx: &Transaction, package: &str) -> Result<()> {
    tx.execute(
        "DELETE FROM symbol_index WHERE package = ?1",
        params![package],
    )?;
    tx.execute("DELETE FROM nodes WHERE package = ?1", params![package])?;
    tx.execute(
        "DELETE FROM edges WHERE from_package = ?1 OR to_package = ?1",
        params![package],
    )?;
    tx.execute(
        "DELETE FROM index_metadata WHERE package = ?1",
        params![package],
    )?;
    Ok(())
}

/// Upsert symbol rows. FQN is the store-wide primary key: a collision
/// across packages resolves last-writer-wins.
pub fn insert_symbols(tx: &Transaction, symbols: &[SymbolRow]) -> Result<usize> {
    let mut stmt = tx.prepare_cached(
        "INSERT OR REPLACE INTO symbol_index (fqn, uri, package, line, is_entity)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for symbol in symbols {
        stmt.execute(params![
            symbol.fqn,
            symbol.uri,
            symbol.package,
            symbol.line,
            symbol.is_entity,
        ])?;
    }
    Ok(symbols.len())
}

/// Upsert node rows.
pub fn upsert_nodes(tx: &Transaction, nodes: &[NodeRow]) -> Result<usize> {
    let mut stmt = tx.prepare_cached(
        "INSERT OR REPLACE INTO nodes
         (fqn, type, package, line, visibility, has_override, is_transactional)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for node in nodes {
        stmt.execute(params![
            node.fqn,
            node.node_type,
            node.package,
            node.line,
            node.visibility,
            node.has_override,
            node.is_transactional,
        ])?;
    }
    Ok(nodes.len())
}

/// Append edge rows. No dedup: the same call on different lines is two
/// facts.
pub fn insert_edges(tx: &Transaction, edges: &[EdgeRow]) -> Result<usize> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO edges
         (from_fqn, edge_type, to_fqn, kind, from_package, to_package, from_line)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for edge in edges {
        stmt.execute(params![
            edge.from_fqn,
            edge.edge_type,
            edge.to_fqn,
            edge.kind,
            edge.from_package,
            edge.to_package,
            edge.from_line,
        ])?;
    }
    Ok(edges.len())
}

/// Record a package's content hash after its rows are in place.
pub fn write_metadata(tx: &Transaction, package: &str, content_hash: &str, indexed_at: i64) -> Result<()> {
    tx.execute(
        "INSERT OR REPLACE INTO index_metadata (package, content_hash, indexed_at)
         VALUES (?1, ?2, ?3)",
        params![package, content_hash, indexed_at],
    )?;
    Ok(())
}
