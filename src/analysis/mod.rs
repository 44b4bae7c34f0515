//! Structural code analysis built on tree-sitter.
//!
//! Source files are reduced to a uniform model of [`CodeUnit`]s (classes,
//! functions and fields) with stored signatures and a parent/child
//! relation. Skeletons, the source text minus bodies, are reconstructed
//! from that model on demand.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────────┐    ┌────────────────┐
//! │ Source Files │───▶│ extract (per     │───▶│ FileAnalysis   │
//! └──────────────┘    │ file, any worker)│    └────────────────┘
//!                     └──────────────────┘            │ merge
//!                              ▲                      ▼
//!                     ┌──────────────────┐    ┌────────────────┐
//!                     │ LanguageHooks +  │    │ AggregateIndex │
//!                     │ SyntaxProfile    │    │ (sharded maps) │
//!                     └──────────────────┘    └────────────────┘
//!                                                     │
//!                     ┌──────────────────┐            ▼
//!                     │ MultiAnalyzer    │◀── TreeSitterAnalyzer
//!                     └──────────────────┘    (one per language)
//! ```
//!
//! # Adding a New Language
//!
//! 1. Create a module in `src/analysis/languages/`
//! 2. Write a declaration query using `<kind>.definition` / `<kind>.name` captures
//! 3. Describe its node kinds in a static [`LanguageSyntaxProfile`]
//! 4. Implement [`LanguageHooks`] and register it in `LanguageRegistry::with_defaults`

mod analyzer;
mod code_unit;
mod error;
mod extract;
mod index;
mod languages;
mod multi;
mod profile;
mod signature;
mod traits;

pub use analyzer::{Metrics, TreeSitterAnalyzer, UpdateSummary};
pub use code_unit::{
    CodeUnit, CodeUnitKind, PackagePolicy, Span, CLASS_CHAIN_SEPARATOR, MEMBER_SEPARATOR,
};
pub use error::{AnalyzerError, Result};
pub use extract::{analyze_source, create_parser, extract_declarations, FileAnalysis};
pub use index::AggregateIndex;
pub use languages::{
    GoHooks, JavaHooks, JavaScriptHooks, Language, LanguageRegistry, PythonHooks, RustHooks,
    TypeScriptHooks,
};
pub use multi::{Analyzer, CallGraph, CallSite, Capabilities, MultiAnalyzer};
pub use profile::{LanguageSyntaxProfile, SkeletonKind};
pub use signature::{apply_prefix, reconstruct, render_signature, SkeletonSource, ELISION_MARKER};
pub use traits::{field_text, node_text, FunctionParts, LanguageHooks, ParsedFile};
