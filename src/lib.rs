//! Codeskel - structural code indexing with tree-sitter.
//!
//! Codeskel parses every supported file in a project, extracts named
//! declarations into a language-neutral model of code units, and renders
//! skeletons: declarations with bodies elided and members nested.
//!
//! # Architecture
//!
//! - `analysis`: code units, syntax profiles, extraction, the aggregate
//!   index and the per-language and multi-language analyzers
//! - `project`: project files and directory walking
//! - `config`: optional YAML configuration
//! - `report`: output formatting (pretty, JSON)
//! - `cli`: command-line front-end
//!
//! # Adding a New Language
//!
//! See `src/analysis/languages/` for examples. Implement `LanguageHooks`
//! and register it in `LanguageRegistry::with_defaults`.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod project;
pub mod report;

pub use analysis::{
    Analyzer, AnalyzerError, CodeUnit, CodeUnitKind, Language, LanguageHooks, LanguageRegistry,
    MultiAnalyzer, TreeSitterAnalyzer,
};
pub use config::Config;
pub use project::{FsProject, Project, ProjectFile};
