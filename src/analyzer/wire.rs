//! Analyzer wire protocol
//!
//! Request and response shapes for the loopback HTTP service. Request
//! keys are camelCase; the index responses use snake_case top-level keys
//! with camelCase symbol records, and the analyze response is grouped per
//! class so its size is bounded by class count rather than edge count.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Body of `POST /index`: one file or a list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexRequest {
    pub class_file: Option<String>,
    pub class_files: Option<Vec<String>>,
}

/// Body of `POST /index/batch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexBatchRequest {
    pub class_files: Vec<String>,
}

/// Per-file outcome of the index path. Exactly one of the three shapes is
/// populated: a symbol record, an enum skip marker, or an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_fqn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_entity: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbols: Option<Vec<SymbolRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IndexResult {
    pub fn skipped_enum() -> Self {
        Self {
            success: true,
            skipped: Some(true),
            reason: Some("enum".to_string()),
            ..Self::default()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// One indexable symbol: the class itself or one of its methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolRecord {
    pub fqn: String,
    pub node_type: String,
    /// Declaration line for methods; null for the type itself.
    pub line: Option<i64>,
    pub is_entity: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexBatchResponse {
    pub success: bool,
    pub results: Vec<IndexResult>,
}

/// Body of `POST /analyze`. Exactly one selector is expected:
/// `packageRoots` (auto-resolving a `classes/` child), explicit
/// `classDirs`, or explicit `classFiles`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyzeRequest {
    pub package_roots: Option<Vec<String>>,
    pub class_dirs: Option<Vec<String>>,
    pub class_files: Option<Vec<String>>,
    /// FQN prefixes; empty disables filtering.
    pub domains: Vec<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub classes: Vec<ClassRecord>,
}

/// Grouped per-class analysis record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRecord {
    pub fqn: String,
    pub node_type: String,
    pub modifiers: Vec<String>,
    pub is_interface: bool,
    pub is_enum: bool,
    pub is_abstract: bool,
    pub inheritance: Vec<InheritanceRecord>,
    pub fields: Vec<FieldRecord>,
    pub methods: Vec<MethodRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InheritanceRecord {
    /// Superclass or interface FQN.
    pub fqn: String,
    /// `extends` or `implements`.
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldRecord {
    /// Declared type FQN; pervasive-typed fields are omitted upstream.
    #[serde(rename = "type")]
    pub field_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodRecord {
    pub fqn: String,
    /// First line of the method body, -1 without line info.
    pub line_number: i64,
    pub modifiers: Vec<String>,
    pub has_override: bool,
    pub is_transactional: bool,
    /// Null when the return type is pervasive (or void).
    pub return_type: Option<String>,
    /// Non-pervasive parameter types, one entry per position.
    pub arguments: Vec<String>,
    pub calls: Vec<CallRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    pub to_fqn: String,
    /// `new` or `standard`.
    pub kind: String,
    pub line_number: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownResponse {
    pub status: String,
}
