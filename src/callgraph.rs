//! Call-graph builder
//!
//! Walks a package's classes, submits them to the analysis service in
//! bounded chunks, and persists the returned facts with package
//! resolution. `from_package` is the analyzing package by construction;
//! `to_package` is resolved against `symbol_index` in one grouped lookup
//! per batch, with unresolved targets stored as `unknown`.
//!
//! Row order is deterministic: classes in sorted relative-path order,
//! and within a class the emitter's order (inheritance, fields, then per
//! method its member and call edges).

use anyhow::Result;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

use crate::analyzer::AnalysisBackend;
use crate::analyzer::wire::ClassRecord;
use crate::error::AnalyzerError;
use crate::package::PackageSpec;
use crate::scan;
use crate::store::{self, EdgeRow, GraphStore, NodeRow};

/// Class files per analyze request.
const ANALYZE_BATCH: usize = 200;
/// Edge rows buffered before a flush transaction.
const EDGE_BATCH: usize = 5_000;

/// Package name stored when an edge target is absent from the index.
pub const UNKNOWN_PACKAGE: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStatus {
    Analyzed,
    Failed,
}

/// Per-package result of the analysis phase.
#[derive(Debug, Clone)]
pub struct PackageAnalysisOutcome {
    pub package: String,
    pub status: AnalysisStatus,
    pub classes: usize,
    pub methods: usize,
    pub calls: usize,
    pub nodes_written: usize,
    pub edges_written: usize,
    pub error: Option<String>,
}

/// Edge awaiting target-package resolution.
struct PendingEdge {
    from_fqn: String,
    edge_type: &'static str,
    to_fqn: String,
    kind: String,
    from_line: Option<i64>,
}

/// Builds the fact base for one package at a time.
///
/// The FQN -> package cache is run-scoped and shared across packages;
/// entries only ever come from `symbol_index`, which is complete before
/// any analysis starts.
pub struct CallGraphBuilder<'a, B: AnalysisBackend> {
    store: &'a mut GraphStore,
    backend: &'a B,
    domains: Vec<String>,
    limit: Option<usize>,
    package_cache: HashMap<String, String>,
}

impl<'a, B: AnalysisBackend> CallGraphBuilder<'a, B> {
    pub fn new(
        store: &'a mut GraphStore,
        backend: &'a B,
        domains: Vec<String>,
        limit: Option<usize>,
    ) -> Self {
        Self {
            store,
            backend,
            domains,
            limit,
            package_cache: HashMap::new(),
        }
    }

    /// Analyze one package and persist its facts.
    ///
    /// Analyzer failures (after the client's retry and one halved-batch
    /// attempt) fail the package, not the run.
    pub fn analyze_package(&mut self, spec: &PackageSpec) -> Result<PackageAnalysisOutcome> {
        let mut class_files = scan::class_files(&spec.classes_dir)?;
        if let Some(limit) = self.limit {
            class_files.truncate(limit);
        }

        info!(package = %spec.name, files = class_files.len(), "analyzing package");

        let mut outcome = PackageAnalysisOutcome {
            package: spec.name.clone(),
            status: AnalysisStatus::Analyzed,
            classes: 0,
            methods: 0,
            calls: 0,
            nodes_written: 0,
            edges_written: 0,
            error: None,
        };

        let mut nodes: Vec<NodeRow> = Vec::new();
        let mut edges: Vec<PendingEdge> = Vec::new();

        for chunk in class_files.chunks(ANALYZE_BATCH) {
            let paths: Vec<String> = chunk
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect();
            let records = match self.submit_chunk(&paths) {
                Ok(records) => records,
                Err(e) => {
                    warn!(package = %spec.name, error = %e, "analysis failed, package aborted");
                    outcome.status = AnalysisStatus::Failed;
                    outcome.error = Some(e.to_string());
                    return Ok(outcome);
                }
            };

            for record in &records {
                outcome.classes += 1;
                outcome.methods += record.methods.len();
                outcome.calls += record.methods.iter().map(|m| m.calls.len()).sum::<usize>();
                collect_class_rows(&spec.name, record, &mut nodes, &mut edges);
            }

            if edges.len() >= EDGE_BATCH {
                let (n, e) = self.flush(&spec.name, &mut nodes, &mut edges)?;
                outcome.nodes_written += n;
                outcome.edges_written += e;
            }
        }

        let (n, e) = self.flush(&spec.name, &mut nodes, &mut edges)?;
        outcome.nodes_written += n;
        outcome.edges_written += e;

        info!(
            package = %spec.name,
            classes = outcome.classes,
            methods = outcome.methods,
            calls = outcome.calls,
            "package analyzed"
        );
        Ok(outcome)
    }

    /// Submit one chunk. Transport failures get exactly one retry after
    /// a backoff, at half size when the chunk can be split; a second
    /// failure fails the package. Requests below this level are never
    /// retried, so this is the whole retry budget.
    fn submit_chunk(&self, paths: &[String]) -> Result<Vec<ClassRecord>, AnalyzerError> {
        match self.backend.analyze_files(paths, &self.domains) {
            Ok(records) => Ok(records),
            Err(e) if e.is_retryable() => {
                warn!(
                    files = paths.len(),
                    error = %e,
                    "analyze chunk failed, retrying once at half size"
                );
                std::thread::sleep(crate::analyzer::RETRY_BACKOFF);
                let mid = paths.len() / 2;
                if mid == 0 {
                    return self.backend.analyze_files(paths, &self.domains);
                }
                let mut records = self.backend.analyze_files(&paths[..mid], &self.domains)?;
                records.extend(self.backend.analyze_files(&paths[mid..], &self.domains)?);
                Ok(records)
            }
            Err(e) => Err(e),
        }
    }

    /// Resolve target packages for the buffered edges and write both
    /// buffers in one transaction.
    fn flush(
        &mut self,
        package: &str,
        nodes: &mut Vec<NodeRow>,
        edges: &mut Vec<PendingEdge>,
    ) -> Result<(usize, usize)> {
        if nodes.is_empty() && edges.is_empty() {
            return Ok((0, 0));
        }

        // One grouped lookup per batch for FQNs the run has not resolved
        // yet; the cache is read-heavy and append-only.
        let unresolved: Vec<&str> = edges
            .iter()
            .map(|e| e.to_fqn.as_str())
            .filter(|fqn| !self.package_cache.contains_key(*fqn))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        if !unresolved.is_empty() {
            let resolved = self.store.lookup_packages(&unresolved)?;
            self.package_cache.extend(resolved);
        }

        let edge_rows: Vec<EdgeRow> = edges
            .drain(..)
            .map(|e| {
                let to_package = self
                    .package_cache
                    .get(&e.to_fqn)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_PACKAGE.to_string());
                EdgeRow {
                    from_fqn: e.from_fqn,
                    edge_type: e.edge_type.to_string(),
                    to_fqn: e.to_fqn,
                    kind: e.kind,
                    from_package: package.to_string(),
                    to_package,
                    from_line: e.from_line,
                }
            })
            .collect();

        let node_rows = std::mem::take(nodes);
        let written = self.store.with_transaction(|tx| {
            let n = store::upsert_nodes(tx, &node_rows)?;
            let e = store::insert_edges(tx, &edge_rows)?;
            Ok((n, e))
        })?;
        Ok(written)
    }
}

/// Translate one grouped class record back into node and edge rows, in
/// the emitter's order.
fn collect_class_rows(
    package: &str,
    record: &ClassRecord,
    nodes: &mut Vec<NodeRow>,
    edges: &mut Vec<PendingEdge>,
) {
    nodes.push(NodeRow {
        fqn: record.fqn.clone(),
        node_type: record.node_type.clone(),
        package: package.to_string(),
        line: None,
        visibility: visibility_from_modifiers(&record.modifiers).to_string(),
        has_override: false,
        is_transactional: false,
    });

    for inheritance in &record.inheritance {
        edges.push(PendingEdge {
            from_fqn: record.fqn.clone(),
            edge_type: "inheritance",
            to_fqn: inheritance.fqn.clone(),
            kind: inheritance.kind.clone(),
            from_line: None,
        });
    }

    for field in &record.fields {
        edges.push(PendingEdge {
            from_fqn: field.field_type.clone(),
            edge_type: "member_of",
            to_fqn: record.fqn.clone(),
            kind: "class".to_string(),
            from_line: None,
        });
    }

    for method in &record.methods {
        if let Some(return_type) = &method.return_type {
            edges.push(PendingEdge {
                from_fqn: return_type.clone(),
                edge_type: "member_of",
                to_fqn: method.fqn.clone(),
                kind: "return".to_string(),
                from_line: None,
            });
        }

        for argument in &method.arguments {
            edges.push(PendingEdge {
                from_fqn: argument.clone(),
                edge_type: "member_of",
                to_fqn: method.fqn.clone(),
                kind: "argument".to_string(),
                from_line: None,
            });
        }

        nodes.push(NodeRow {
            fqn: method.fqn.clone(),
            node_type: "method".to_string(),
            package: package.to_string(),
            line: Some(method.line_number),
            visibility: visibility_from_modifiers(&method.modifiers).to_string(),
            has_override: method.has_override,
            is_transactional: method.is_transactional,
        });

        edges.push(PendingEdge {
            from_fqn: method.fqn.clone(),
            edge_type: "member_of",
            to_fqn: record.fqn.clone(),
            kind: "method".to_string(),
            from_line: None,
        });

        for call in &method.calls {
            edges.push(PendingEdge {
                from_fqn: method.fqn.clone(),
                edge_type: "call",
                to_fqn: call.to_fqn.clone(),
                kind: call.kind.clone(),
                from_line: Some(call.line_number),
            });
        }
    }
}

/// Bytecode access flags collapse to one visibility; absence of all
/// three markers means package-private.
fn visibility_from_modifiers(modifiers: &[String]) -> &'static str {
    for modifier in modifiers {
        match modifier.as_str() {
            "public" => return "public",
            "private" => return "private",
            "protected" => return "protected",
            _ => {}
        }
    }
    "package"
}
