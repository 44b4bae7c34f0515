//! Error types for the analysis engine.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by analyzers.
///
/// Per-declaration problems never show up here; the extraction pipeline
/// logs them and drops the declaration. Only caller-input errors and
/// per-file I/O failures are propagated.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// The analyzer does not implement this operation.
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),

    #[error("invalid language profile for {language}: {reason}")]
    InvalidProfile {
        language: &'static str,
        reason: String,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("query compilation failed: {0}")]
    Query(#[from] tree_sitter::QueryError),

    #[error("grammar rejected by parser: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    #[error("invalid code unit: {0}")]
    InvalidCodeUnit(String),
}

impl AnalyzerError {
    /// Returns true for the "this delegate has no answer" case.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, AnalyzerError::Unsupported(_))
    }
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
