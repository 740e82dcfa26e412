//! Error kinds for the extraction pipeline
//!
//! Two failure families get typed enums: class decoding (per-file, never
//! fatal to a run) and analyzer transport (per-request, fails a package
//! after one retry). Everything above those seams uses `anyhow` with
//! context, matching the rest of the codebase.

use thiserror::Error;

/// A class image could not be decoded.
///
/// Reported per file; the surrounding batch continues.
#[derive(Debug, Error)]
pub enum ClassParseError {
    #[error("unexpected end of class file")]
    UnexpectedEof,
    #[error("invalid class file magic header")]
    InvalidMagic,
    #[error("unsupported constant pool tag {tag}")]
    UnsupportedConstant { tag: u8 },
    #[error("invalid constant pool index {index}")]
    InvalidConstantIndex { index: u16 },
    #[error("malformed descriptor: {0}")]
    InvalidDescriptor(String),
    #[error("truncated method body")]
    TruncatedCode,
    #[error("unknown opcode 0x{opcode:02x}")]
    UnknownOpcode { opcode: u8 },
}

/// The analysis service could not serve a request.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// Connection refused or request timed out. Retried once with backoff
    /// before the package is marked failed.
    #[error("analyzer unavailable: {0}")]
    Unavailable(String),
    #[error("analyzer returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("undecodable analyzer response: {0}")]
    Protocol(String),
}

impl AnalyzerError {
    /// Whether a retry with backoff is worthwhile.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AnalyzerError::Unavailable(_))
    }
}
