//! Meridian - call-graph extraction engine for JVM bytecode
//!
//! Meridian walks a corpus of compiled packages, decodes every class
//! image, and persists a relational fact base (classes, methods,
//! inheritance, calls, member types) to SQLite. A content-hash-keyed
//! index makes repeat runs incremental: only packages whose compiled
//! classes changed are re-extracted, and each package is replaced
//! atomically.
//!
//! # Architecture
//!
//! Two processes over a loopback HTTP wire:
//!
//! - `meridian` (orchestrator): hashes packages, decides skip-vs-rebuild,
//!   resolves symbol packages, and owns the single database writer.
//! - `meridian-analyzer` (worker): stateless bytecode decoding service;
//!   accepts batches of class files and returns serialized facts.
//!
//! # Data flow
//!
//! ```text
//! PackageSpec[] -> orchestrator -> [analyzer /index/batch] -> symbol_index
//!                               -> [analyzer /analyze]     -> nodes, edges
//! ```
//!
//! Downstream consumers query the SQLite file directly; there is no
//! programmatic query API.

pub mod analyzer;
pub mod callgraph;
pub mod classfile;
pub mod error;
pub mod facts;
pub mod hash;
pub mod index;
pub mod orchestrator;
pub mod package;
pub mod scan;
pub mod store;

pub use analyzer::{AnalysisBackend, HttpAnalyzer, LocalAnalyzer};
pub use callgraph::{CallGraphBuilder, PackageAnalysisOutcome, UNKNOWN_PACKAGE};
pub use classfile::{ClassView, parse_class_view};
pub use error::{AnalyzerError, ClassParseError};
pub use facts::{ClassFacts, Edge, Node, emit_class_facts};
pub use index::{PackageIndexOutcome, SymbolIndexer};
pub use orchestrator::{DEFAULT_ANALYZER_URL, ExtractionConfig, RunSummary};
pub use package::PackageSpec;
pub use store::GraphStore;
