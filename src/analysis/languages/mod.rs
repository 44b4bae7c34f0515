//! Language-specific hook implementations and the registration table.

mod go;
mod java;
mod javascript;
mod python;
mod rust_lang;
mod typescript;

pub use go::GoHooks;
pub use java::JavaHooks;
pub use javascript::JavaScriptHooks;
pub use python::PythonHooks;
pub use rust_lang::RustHooks;
pub use typescript::TypeScriptHooks;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use phf::phf_map;
use serde::Serialize;

use super::LanguageHooks;

/// Supported languages, in delegate order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Java,
    Python,
    JavaScript,
    TypeScript,
    Go,
    Rust,
}

/// File extension to owning language.
static EXTENSIONS: phf::Map<&'static str, Language> = phf_map! {
    "java" => Language::Java,
    "py" => Language::Python,
    "js" => Language::JavaScript,
    "jsx" => Language::JavaScript,
    "mjs" => Language::JavaScript,
    "cjs" => Language::JavaScript,
    "ts" => Language::TypeScript,
    "tsx" => Language::TypeScript,
    "go" => Language::Go,
    "rs" => Language::Rust,
};

impl Language {
    pub const ALL: [Language; 6] = [
        Language::Java,
        Language::Python,
        Language::JavaScript,
        Language::TypeScript,
        Language::Go,
        Language::Rust,
    ];

    /// Lowercase language identifier.
    pub fn name(&self) -> &'static str {
        match self {
            Language::Java => "java",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Go => "go",
            Language::Rust => "rust",
        }
    }

    /// Extensions this language owns (without dot).
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Java => &["java"],
            Language::Python => &["py"],
            Language::JavaScript => &["js", "jsx", "mjs", "cjs"],
            Language::TypeScript => &["ts", "tsx"],
            Language::Go => &["go"],
            Language::Rust => &["rs"],
        }
    }

    pub fn from_extension(ext: &str) -> Option<Language> {
        EXTENSIONS.get(ext).copied()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        match lower.as_str() {
            "js" => return Ok(Language::JavaScript),
            "ts" => return Ok(Language::TypeScript),
            "rs" => return Ok(Language::Rust),
            "py" => return Ok(Language::Python),
            _ => {}
        }
        Language::ALL
            .iter()
            .copied()
            .find(|l| l.name() == lower)
            .ok_or_else(|| format!("unknown language {:?}", s))
    }
}

/// Explicit table of language hooks.
///
/// Built once at startup and passed by reference to whatever constructs
/// analyzers. There is no global registry.
#[derive(Clone, Default)]
pub struct LanguageRegistry {
    hooks: BTreeMap<Language, Arc<dyn LanguageHooks>>,
}

impl LanguageRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in language.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(JavaHooks::new()));
        registry.register(Arc::new(PythonHooks::new()));
        registry.register(Arc::new(JavaScriptHooks::new()));
        registry.register(Arc::new(TypeScriptHooks::new()));
        registry.register(Arc::new(GoHooks::new()));
        registry.register(Arc::new(RustHooks::new()));
        registry
    }

    /// Add hooks, replacing any previously registered for the same language.
    pub fn register(&mut self, hooks: Arc<dyn LanguageHooks>) {
        self.hooks.insert(hooks.language(), hooks);
    }

    /// Keep only languages for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(Language) -> bool) {
        self.hooks.retain(|lang, _| keep(*lang));
    }

    pub fn get(&self, language: Language) -> Option<Arc<dyn LanguageHooks>> {
        self.hooks.get(&language).cloned()
    }

    pub fn for_extension(&self, ext: &str) -> Option<Arc<dyn LanguageHooks>> {
        Language::from_extension(ext).and_then(|l| self.get(l))
    }

    /// Registered languages in delegate order.
    pub fn languages(&self) -> Vec<Language> {
        self.hooks.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}
