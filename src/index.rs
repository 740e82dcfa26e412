//! Symbol index builder
//!
//! Maintains `symbol_index` so every class and method FQN resolves to its
//! owning package, source URI and definition line. Packages are skipped
//! wholesale when their content hash matches the stored metadata;
//! otherwise the package's rows across all four tables are replaced in a
//! single transaction, so readers never observe a half-indexed package.
//!
//! FQN collisions across packages resolve last-writer-wins. The builder
//! counts them per package for operator visibility; no disambiguation is
//! attempted.

use anyhow::{Context, Result, bail};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

use crate::analyzer::AnalysisBackend;
use crate::analyzer::wire::IndexResult;
use crate::error::AnalyzerError;
use crate::hash;
use crate::package::PackageSpec;
use crate::scan;
use crate::store::{self, GraphStore, SymbolRow};

/// Files per index request; keeps request payloads bounded.
const INDEX_BATCH: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    /// Content hash matched; nothing touched.
    Unchanged,
    /// Rows replaced and metadata updated.
    Rebuilt,
    /// Analyzer failed for this package; previous rows left intact.
    Failed,
}

/// Per-package result of the index phase.
#[derive(Debug, Clone)]
pub struct PackageIndexOutcome {
    pub package: String,
    pub status: IndexStatus,
    pub symbols: usize,
    pub collisions: usize,
    pub enums_skipped: usize,
    pub decode_failures: usize,
    pub error: Option<String>,
}

impl PackageIndexOutcome {
    fn unchanged(package: &str) -> Self {
        Self {
            package: package.to_string(),
            status: IndexStatus::Unchanged,
            symbols: 0,
            collisions: 0,
            enums_skipped: 0,
            decode_failures: 0,
            error: None,
        }
    }

    fn failed(package: &str, error: String) -> Self {
        Self {
            package: package.to_string(),
            status: IndexStatus::Failed,
            symbols: 0,
            collisions: 0,
            enums_skipped: 0,
            decode_failures: 0,
            error: Some(error),
        }
    }
}

/// Builds and incrementally maintains the symbol index.
///
/// Holds a run-scoped FQN -> package map purely to count cross-package
/// collisions; the store's `INSERT OR REPLACE` is what enforces the
/// last-writer-wins semantics.
pub struct SymbolIndexer<'a, B: AnalysisBackend> {
    store: &'a mut GraphStore,
    backend: &'a B,
    seen: HashMap<String, String>,
}

impl<'a, B: AnalysisBackend> SymbolIndexer<'a, B> {
    pub fn new(store: &'a mut GraphStore, backend: &'a B) -> Self {
        Self {
            store,
            backend,
            seen: HashMap::new(),
        }
    }

    /// Index one package end to end.
    ///
    /// # Behavior
    /// 1. Hash the package's class files (sorted relative-path order)
    /// 2. Skip if `index_metadata` already holds the same hash
    /// 3. Decode all class files through the analysis backend
    /// 4. Build symbol URIs (sources tree when resolvable, else the
    ///    class file; local packages rewritten to the project tree)
    /// 5. Cascade-delete the package and re-insert, one transaction
    /// 6. Verify the written hash against a fresh on-disk hash
    ///
    /// # Returns
    /// `Err` only for run-fatal conditions (store failures, post-write
    /// hash mismatch); analyzer trouble marks the package failed and
    /// leaves its previous state intact.
    pub fn index_package(&mut self, spec: &PackageSpec) -> Result<PackageIndexOutcome> {
        let class_files = scan::class_files(&spec.classes_dir)?;
        if class_files.is_empty() {
            info!(package = %spec.name, "no class files, skipping");
            return Ok(PackageIndexOutcome::unchanged(&spec.name));
        }

        let content_hash = hash::package_content_hash(&spec.classes_dir)?;
        if let Some(stored) = self.store.metadata_hash(&spec.name)? {
            if stored == content_hash {
                info!(package = %spec.name, "unchanged, skipping");
                return Ok(PackageIndexOutcome::unchanged(&spec.name));
            }
        }

        info!(package = %spec.name, files = class_files.len(), "indexing package");

        let mut symbols: Vec<SymbolRow> = Vec::new();
        let mut enums_skipped = 0usize;
        let mut decode_failures = 0usize;

        for chunk in class_files.chunks(INDEX_BATCH) {
            let paths: Vec<String> = chunk
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect();
            let results = match self.index_chunk(&paths) {
                Ok(results) => results,
                Err(e) => {
                    warn!(package = %spec.name, error = %e, "index batch failed, package aborted");
                    return Ok(PackageIndexOutcome::failed(&spec.name, e.to_string()));
                }
            };

            // Results are positionally aligned with the request; the class
            // file path is what the source URI derives from.
            for (class_file, result) in chunk.iter().zip(results) {
                if result.skipped.unwrap_or(false) {
                    enums_skipped += 1;
                    continue;
                }
                if !result.success {
                    decode_failures += 1;
                    warn!(
                        package = %spec.name,
                        file = %class_file.display(),
                        error = %result.error.as_deref().unwrap_or("unknown"),
                        "class file not indexable"
                    );
                    continue;
                }
                let records = result.symbols.unwrap_or_default();
                for record in records {
                    let uri = build_symbol_uri(
                        spec,
                        class_file,
                        record.node_type == "method",
                        record.line,
                    )?;
                    symbols.push(SymbolRow {
                        fqn: record.fqn,
                        uri,
                        package: spec.name.clone(),
                        line: record.line,
                        is_entity: Some(record.is_entity),
                    });
                }
            }
        }

        let mut collisions = 0usize;
        for symbol in &symbols {
            if let Some(previous) = self.seen.get(&symbol.fqn) {
                if previous != &symbol.package {
                    collisions += 1;
                }
            }
            self.seen
                .insert(symbol.fqn.clone(), symbol.package.clone());
        }

        let symbol_count = symbols.len();
        let indexed_at = now_secs();
        self.store.with_transaction(|tx| {
            store::cascade_delete_package(tx, &spec.name)?;
            store::insert_symbols(tx, &symbols)?;
            store::write_metadata(tx, &spec.name, &content_hash, indexed_at)?;
            Ok(())
        })?;

        self.verify_metadata(spec, &content_hash)?;

        Ok(PackageIndexOutcome {
            package: spec.name.clone(),
            status: IndexStatus::Rebuilt,
            symbols: symbol_count,
            collisions,
            enums_skipped,
            decode_failures,
            error: None,
        })
    }

    /// Submit one index batch. Transport failures get exactly one retry
    /// after a backoff; a second failure fails the package. This is the
    /// whole retry budget, requests are never retried below it.
    fn index_chunk(&self, paths: &[String]) -> Result<Vec<IndexResult>, AnalyzerError> {
        match self.backend.index_batch(paths) {
            Ok(results) => Ok(results),
            Err(e) if e.is_retryable() => {
                warn!(files = paths.len(), error = %e, "index batch failed, retrying once");
                std::thread::sleep(crate::analyzer::RETRY_BACKOFF);
                self.backend.index_batch(paths)
            }
            Err(e) => Err(e),
        }
    }

    /// Post-write verification: the stored hash must equal a fresh hash of
    /// the on-disk classes. A mismatch means the tree changed mid-index
    /// (or the write went wrong); the run aborts rather than marking the
    /// package clean.
    fn verify_metadata(&self, spec: &PackageSpec, written_hash: &str) -> Result<()> {
        let stored = self
            .store
            .metadata_hash(&spec.name)?
            .context("index_metadata row missing after commit")?;
        let fresh = hash::package_content_hash(&spec.classes_dir)?;
        if stored != *written_hash || stored != fresh {
            bail!(
                "content hash mismatch for {} after indexing (stored {}, on disk {})",
                spec.name,
                stored,
                fresh
            );
        }
        Ok(())
    }
}

/// Construct the symbol URI for one class file.
///
/// Preference order: the conventionally-named `.java` file under the
/// package's sources tree, else the `.class` file itself. Nested-class
/// images (`Outer$Inner.class`) map onto their top-level source file.
/// Method URIs carry a trailing `:line`. For local packages, paths under
/// the cache root are rewritten to the project source tree.
fn build_symbol_uri(
    spec: &PackageSpec,
    class_file: &Path,
    is_method: bool,
    line: Option<i64>,
) -> Result<String> {
    let rel = scan::relative_class_path(&spec.classes_dir, class_file)?;

    let mut resolved: Option<PathBuf> = None;
    if let Some(sources_dir) = &spec.sources_dir {
        if let Some(source_rel) = source_relative_path(rel) {
            let candidate = sources_dir.join(source_rel);
            if candidate.is_file() {
                resolved = Some(candidate);
            }
        }
    }
    let path = resolved.unwrap_or_else(|| class_file.to_path_buf());
    let path = path.canonicalize().unwrap_or(path);
    let path = rewrite_local_path(spec, path);

    let mut uri = path_to_uri(&path);
    if is_method {
        uri.push_str(&format!(":{}", line.unwrap_or(-1)));
    }
    Ok(uri)
}

/// `com/ex/Outer$Inner.class` -> `com/ex/Outer.java`.
fn source_relative_path(rel: &Path) -> Option<PathBuf> {
    let stem = rel.file_stem()?.to_str()?;
    let top_level = stem.split('$').next()?;
    Some(rel.with_file_name(format!("{}.java", top_level)))
}

/// Prefix substitution for packages that are part of the project under
/// analysis: cache paths become project source paths. Applied to symbol
/// URIs only.
fn rewrite_local_path(spec: &PackageSpec, path: PathBuf) -> PathBuf {
    if !spec.is_local {
        return path;
    }
    let (Some(cache_root), Some(project_root)) = (spec.cache_root(), &spec.project_source_root)
    else {
        return path;
    };
    match path.strip_prefix(cache_root) {
        Ok(suffix) => project_root.join(suffix),
        Err(_) => path,
    }
}

/// `file:///` URI with forward slashes regardless of platform.
fn path_to_uri(path: &Path) -> String {
    let raw = path.to_string_lossy().replace('\\', "/");
    if raw.starts_with('/') {
        format!("file://{}", raw)
    } else {
        format!("file:///{}", raw)
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
