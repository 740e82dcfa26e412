//! End-to-end extraction pipeline
//!
//! Sequencing is the whole job: open the store, drive the symbol indexer
//! over every package, then drive the call-graph builder over the
//! packages the index phase actually rebuilt. Indexing all packages
//! before analyzing any is what makes cross-package FQN resolution see a
//! complete index.

use anyhow::{Context, Result, bail};
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

use crate::analyzer::{AnalysisBackend, HttpAnalyzer};
use crate::callgraph::{AnalysisStatus, CallGraphBuilder, PackageAnalysisOutcome};
use crate::index::{IndexStatus, PackageIndexOutcome, SymbolIndexer};
use crate::package::PackageSpec;
use crate::store::GraphStore;

pub const DEFAULT_ANALYZER_URL: &str = "http://127.0.0.1:8766";

/// Health-check attempts before the run is abandoned.
const READY_ATTEMPTS: u32 = 5;

/// Everything a run needs; no environment variables are consulted.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub db_path: PathBuf,
    pub packages: Vec<PackageSpec>,
    pub analyzer_url: String,
    /// Drop and recreate all tables before the run.
    pub init: bool,
    /// Cap on classes per package; test runs only.
    pub limit: Option<usize>,
    /// FQN prefixes restricting which classes contribute facts.
    pub domains: Vec<String>,
    /// Skip the analysis phase (index only).
    pub index_only: bool,
}

impl ExtractionConfig {
    pub fn new(db_path: impl Into<PathBuf>, packages: Vec<PackageSpec>) -> Self {
        Self {
            db_path: db_path.into(),
            packages,
            analyzer_url: DEFAULT_ANALYZER_URL.to_string(),
            init: false,
            limit: None,
            domains: Vec::new(),
            index_only: false,
        }
    }

    /// A limited run leaves the store truncated; requiring `init` keeps
    /// partial fact bases from masquerading as complete ones.
    pub fn validate(&self) -> Result<()> {
        if self.limit.is_some() && !self.init {
            bail!("--limit requires --init (a limited run leaves a partial fact base)");
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub index_outcomes: Vec<PackageIndexOutcome>,
    pub analysis_outcomes: Vec<PackageAnalysisOutcome>,
    pub index_duration: Duration,
    pub analysis_duration: Duration,
    pub total_duration: Duration,
}

impl RunSummary {
    pub fn rebuilt(&self) -> usize {
        self.index_outcomes
            .iter()
            .filter(|o| o.status == IndexStatus::Rebuilt)
            .count()
    }

    pub fn unchanged(&self) -> usize {
        self.index_outcomes
            .iter()
            .filter(|o| o.status == IndexStatus::Unchanged)
            .count()
    }

    pub fn symbols_indexed(&self) -> usize {
        self.index_outcomes.iter().map(|o| o.symbols).sum()
    }

    pub fn collisions(&self) -> usize {
        self.index_outcomes.iter().map(|o| o.collisions).sum()
    }

    pub fn nodes_written(&self) -> usize {
        self.analysis_outcomes.iter().map(|o| o.nodes_written).sum()
    }

    pub fn edges_written(&self) -> usize {
        self.analysis_outcomes.iter().map(|o| o.edges_written).sum()
    }

    /// Packages that failed in either phase, with their error class.
    pub fn failed_packages(&self) -> Vec<(&str, &str)> {
        let mut failed: Vec<(&str, &str)> = Vec::new();
        for outcome in &self.index_outcomes {
            if outcome.status == IndexStatus::Failed {
                failed.push((
                    outcome.package.as_str(),
                    outcome.error.as_deref().unwrap_or("unknown"),
                ));
            }
        }
        for outcome in &self.analysis_outcomes {
            if outcome.status == AnalysisStatus::Failed {
                failed.push((
                    outcome.package.as_str(),
                    outcome.error.as_deref().unwrap_or("unknown"),
                ));
            }
        }
        failed
    }

    pub fn has_failures(&self) -> bool {
        !self.failed_packages().is_empty()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Index:    {} packages ({} rebuilt, {} unchanged), {} symbols, {} collisions [{} ms]",
            self.index_outcomes.len(),
            self.rebuilt(),
            self.unchanged(),
            self.symbols_indexed(),
            self.collisions(),
            self.index_duration.as_millis()
        )?;
        writeln!(
            f,
            "Analysis: {} packages, {} nodes, {} edges [{} ms]",
            self.analysis_outcomes.len(),
            self.nodes_written(),
            self.edges_written(),
            self.analysis_duration.as_millis()
        )?;
        let failed = self.failed_packages();
        if !failed.is_empty() {
            writeln!(f, "Failed packages:")?;
            for (package, error) in failed {
                writeln!(f, "  {}: {}", package, error)?;
            }
        }
        write!(f, "Total:    {} ms", self.total_duration.as_millis())
    }
}

/// Run the full pipeline against an explicit backend.
///
/// # Behavior
/// 1. Open (or initialize) the store
/// 2. Index every package in supplied order (skip-vs-rebuild per hash)
/// 3. Analyze the packages the index phase rebuilt
/// 4. Collect per-step durations and per-package counts
///
/// # Guarantees
/// - All `symbol_index` writes complete before any `edges` row is written
/// - Package order is the caller's order in both phases
/// - A failed package never aborts the run; store-level errors do
pub fn run<B: AnalysisBackend>(config: &ExtractionConfig, backend: &B) -> Result<RunSummary> {
    config.validate()?;
    let run_start = Instant::now();

    let mut store = GraphStore::open(&config.db_path, config.init)?;

    // Phase 1: symbol index over every package, supplied order.
    let index_start = Instant::now();
    let mut index_outcomes = Vec::with_capacity(config.packages.len());
    {
        let mut indexer = SymbolIndexer::new(&mut store, backend);
        for spec in &config.packages {
            index_outcomes.push(indexer.index_package(spec)?);
        }
    }
    let index_duration = index_start.elapsed();
    info!(
        packages = index_outcomes.len(),
        ms = index_duration.as_millis() as u64,
        "index phase complete"
    );

    // Phase 2: analyze the packages whose index was rebuilt. Unchanged
    // packages keep their facts; failed ones are reported and skipped.
    let analysis_start = Instant::now();
    let mut analysis_outcomes = Vec::new();
    if !config.index_only {
        let mut builder = CallGraphBuilder::new(
            &mut store,
            backend,
            config.domains.clone(),
            config.limit,
        );
        for (spec, index_outcome) in config.packages.iter().zip(&index_outcomes) {
            if index_outcome.status == IndexStatus::Rebuilt {
                analysis_outcomes.push(builder.analyze_package(spec)?);
            }
        }
    }
    let analysis_duration = analysis_start.elapsed();
    info!(
        packages = analysis_outcomes.len(),
        ms = analysis_duration.as_millis() as u64,
        "analysis phase complete"
    );

    Ok(RunSummary {
        index_outcomes,
        analysis_outcomes,
        index_duration,
        analysis_duration,
        total_duration: run_start.elapsed(),
    })
}

/// Production entry point: wait for the analysis service, then run.
pub fn run_with_service(config: &ExtractionConfig) -> Result<RunSummary> {
    let backend = HttpAnalyzer::new(config.analyzer_url.clone());
    let health = backend
        .wait_ready(READY_ATTEMPTS)
        .with_context(|| format!("analysis service unreachable at {}", config.analyzer_url))?;
    info!(service = %health.service, version = %health.version, "analysis service ready");
    run(config, &backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_without_init_is_rejected() {
        let mut config = ExtractionConfig::new("/tmp/facts.db", Vec::new());
        config.limit = Some(10);
        assert!(config.validate().is_err());
        config.init = true;
        assert!(config.validate().is_ok());
    }
}
