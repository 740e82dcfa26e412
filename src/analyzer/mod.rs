//! Analysis service
//!
//! Stateless worker that decodes batches of class files and returns
//! serialized facts. The service holds no mutable state across requests;
//! per-request work is parallelized over the file list with rayon since
//! decoding is CPU-bound and per-file independent.
//!
//! The same routines back both transports: the axum routes in
//! [`routes`] and the in-process [`LocalAnalyzer`] used by tests.

pub mod client;
pub mod routes;
pub mod wire;

pub use client::HttpAnalyzer;

use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::classfile::{self, ClassView};
use crate::error::AnalyzerError;
use crate::facts::{self, ClassFacts, EdgeKind, EdgeType, NodeType};
use crate::scan;

use wire::{
    AnalyzeRequest, CallRecord, ClassRecord, FieldRecord, HealthResponse, IndexResult,
    InheritanceRecord, MethodRecord, SymbolRecord,
};

/// Backoff before the single retry a caller grants a failed batch.
/// Requests themselves are never retried below this level.
pub const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Abstraction over the analyzer transport.
///
/// Production goes through [`HttpAnalyzer`]; tests run the same pipeline
/// in-process via [`LocalAnalyzer`].
pub trait AnalysisBackend {
    fn health(&self) -> Result<HealthResponse, AnalyzerError>;

    /// Decode class files into per-file symbol records. Per-file failures
    /// land in the result vector, never abort the batch.
    fn index_batch(&self, class_files: &[String]) -> Result<Vec<IndexResult>, AnalyzerError>;

    /// Decode class files into grouped class records. Undecodable files
    /// are logged and omitted.
    fn analyze_files(
        &self,
        class_files: &[String],
        domains: &[String],
    ) -> Result<Vec<ClassRecord>, AnalyzerError>;
}

/// In-process backend. Same code paths as the HTTP service minus the
/// transport.
#[derive(Debug, Default)]
pub struct LocalAnalyzer;

impl AnalysisBackend for LocalAnalyzer {
    fn health(&self) -> Result<HealthResponse, AnalyzerError> {
        Ok(health_response())
    }

    fn index_batch(&self, class_files: &[String]) -> Result<Vec<IndexResult>, AnalyzerError> {
        Ok(index_class_files(class_files))
    }

    fn analyze_files(
        &self,
        class_files: &[String],
        domains: &[String],
    ) -> Result<Vec<ClassRecord>, AnalyzerError> {
        Ok(analyze_class_files(class_files, domains))
    }
}

pub fn health_response() -> HealthResponse {
    HealthResponse {
        status: "ok".to_string(),
        service: "meridian-analyzer".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

/// Index one class file: class FQN, entity flag, and one symbol per
/// class/method. Enums are skipped; they contribute no indexable
/// structure beyond themselves.
pub fn index_class_file(path: &str) -> IndexResult {
    let file = Path::new(path);
    if !file.is_file() || !path.ends_with(".class") {
        return IndexResult::failure(format!("invalid class file: {}", path));
    }

    let bytes = match std::fs::read(file) {
        Ok(bytes) => bytes,
        Err(e) => return IndexResult::failure(format!("failed to read {}: {}", path, e)),
    };

    let view = match classfile::parse_class_view(&bytes) {
        Ok(view) => view,
        Err(e) => return IndexResult::failure(format!("failed to index {}: {}", path, e)),
    };

    if view.is_enum() {
        return IndexResult::skipped_enum();
    }

    let class_facts = facts::emit_class_facts(&view);
    let symbols = class_facts
        .nodes
        .iter()
        .map(|node| SymbolRecord {
            fqn: node.fqn.clone(),
            node_type: node.node_type.as_str().to_string(),
            line: node.line,
            is_entity: class_facts.is_entity,
        })
        .collect();

    IndexResult {
        success: true,
        class_fqn: Some(class_facts.class_fqn),
        is_entity: Some(class_facts.is_entity),
        symbols: Some(symbols),
        ..IndexResult::default()
    }
}

/// Index a batch, preserving input order.
pub fn index_class_files(class_files: &[String]) -> Vec<IndexResult> {
    class_files
        .par_iter()
        .map(|path| index_class_file(path))
        .collect()
}

/// Analyze a batch into grouped class records, preserving input order.
/// Classes matching no domain prefix are omitted (an empty domain list
/// disables filtering); so are undecodable files, after a warning.
pub fn analyze_class_files(class_files: &[String], domains: &[String]) -> Vec<ClassRecord> {
    class_files
        .par_iter()
        .filter_map(|path| match analyze_class_file(path, domains) {
            Ok(record) => record,
            Err(message) => {
                warn!(file = %path, error = %message, "failed to analyze class file");
                None
            }
        })
        .collect()
}

fn analyze_class_file(path: &str, domains: &[String]) -> Result<Option<ClassRecord>, String> {
    let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
    let view = classfile::parse_class_view(&bytes).map_err(|e| e.to_string())?;

    if !matches_domain(&view.fqn, domains) {
        return Ok(None);
    }

    let class_facts = facts::emit_class_facts(&view);
    Ok(Some(class_record(&view, &class_facts)))
}

fn matches_domain(fqn: &str, domains: &[String]) -> bool {
    domains.is_empty() || domains.iter().any(|d| fqn.starts_with(d.as_str()))
}

/// Regroup one class's flat fact stream into the wire's per-class tree.
/// The response size is thereby bounded by class count, not edge count.
fn class_record(view: &ClassView, class_facts: &ClassFacts) -> ClassRecord {
    let mut methods: Vec<MethodRecord> = Vec::new();
    let mut method_slots: HashMap<String, usize> = HashMap::new();

    for node in &class_facts.nodes {
        if node.node_type != NodeType::Method {
            continue;
        }
        methods.push(MethodRecord {
            fqn: node.fqn.clone(),
            line_number: node.line.unwrap_or(-1),
            modifiers: Vec::new(),
            has_override: node.has_override,
            is_transactional: node.is_transactional,
            return_type: None,
            arguments: Vec::new(),
            calls: Vec::new(),
        });
        method_slots.insert(node.fqn.clone(), methods.len() - 1);
    }

    // Method modifiers come from the view; the flat node carries only the
    // derived visibility.
    for (method, view_method) in methods.iter_mut().zip(view.methods.iter()) {
        method.modifiers = facts::modifiers_of(view_method.access);
    }

    let mut inheritance = Vec::new();
    let mut fields = Vec::new();

    for edge in &class_facts.edges {
        match (edge.edge_type, edge.kind) {
            (EdgeType::Inheritance, _) => inheritance.push(InheritanceRecord {
                fqn: edge.to_fqn.clone(),
                kind: edge.kind.as_str().to_string(),
            }),
            (EdgeType::MemberOf, EdgeKind::Class) => fields.push(FieldRecord {
                field_type: edge.from_fqn.clone(),
            }),
            (EdgeType::MemberOf, EdgeKind::Return) => {
                if let Some(&slot) = method_slots.get(&edge.to_fqn) {
                    methods[slot].return_type = Some(edge.from_fqn.clone());
                }
            }
            (EdgeType::MemberOf, EdgeKind::Argument) => {
                if let Some(&slot) = method_slots.get(&edge.to_fqn) {
                    methods[slot].arguments.push(edge.from_fqn.clone());
                }
            }
            (EdgeType::Call, _) => {
                if let Some(&slot) = method_slots.get(&edge.from_fqn) {
                    methods[slot].calls.push(CallRecord {
                        to_fqn: edge.to_fqn.clone(),
                        kind: edge.kind.as_str().to_string(),
                        line_number: edge.from_line.unwrap_or(-1),
                    });
                }
            }
            (EdgeType::MemberOf, _) => {}
        }
    }

    ClassRecord {
        fqn: class_facts.class_fqn.clone(),
        node_type: class_facts.node_type.as_str().to_string(),
        modifiers: class_facts.modifiers.clone(),
        is_interface: view.is_interface(),
        is_enum: view.is_enum(),
        is_abstract: view.is_abstract(),
        inheritance,
        fields,
        methods,
    }
}

/// Resolve an analyze request's selectors to a concrete file list.
///
/// `packageRoots` entries auto-resolve a `classes/` child; `classDirs`
/// are walked as-is; `classFiles` are validated individually. The
/// optional limit truncates the combined list.
pub fn resolve_analyze_selection(request: &AnalyzeRequest) -> Result<Vec<String>, String> {
    let mut files: Vec<PathBuf> = Vec::new();

    if let Some(package_roots) = &request.package_roots {
        for root in package_roots {
            let classes = Path::new(root).join("classes");
            if classes.is_dir() {
                files.extend(scan::class_files(&classes).map_err(|e| e.to_string())?);
            } else {
                warn!(root = %root, "classes/ not found under package root");
            }
        }
    } else if let Some(class_dirs) = &request.class_dirs {
        for dir in class_dirs {
            files.extend(scan::class_files(Path::new(dir)).map_err(|e| e.to_string())?);
        }
    } else if let Some(class_files) = &request.class_files {
        for path in class_files {
            let p = Path::new(path);
            if p.is_file() && path.ends_with(".class") {
                files.push(p.to_path_buf());
            } else {
                warn!(file = %path, "invalid class file in request");
            }
        }
    } else {
        return Err("either packageRoots, classDirs, or classFiles is required".to_string());
    }

    if let Some(limit) = request.limit {
        files.truncate(limit);
    }

    Ok(files
        .into_iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect())
}
