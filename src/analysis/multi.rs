//! One query surface over several per-language analyzers.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;

use super::analyzer::{Metrics, TreeSitterAnalyzer, UpdateSummary};
use super::code_unit::CodeUnit;
use super::error::{AnalyzerError, Result};
use super::languages::{Language, LanguageRegistry};
use crate::config::Config;
use crate::project::{Project, ProjectFile};

/// What an analyzer can answer beyond the unsupported default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub skeletons: bool,
    pub usages: bool,
    pub call_graph: bool,
    pub ranking: bool,
}

impl Capabilities {
    pub const SKELETONS: Capabilities = Capabilities {
        skeletons: true,
        usages: false,
        call_graph: false,
        ranking: false,
    };
}

/// One edge of a call graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CallSite {
    pub target: CodeUnit,
    /// One-based line of the call in the caller's file.
    pub source_line: usize,
}

/// Call graph keyed by fully qualified name.
pub type CallGraph = BTreeMap<String, Vec<CallSite>>;

/// The operations a delegate may answer.
///
/// Every method defaults to [`AnalyzerError::Unsupported`]; an analyzer
/// overrides what it implements and reports it through
/// [`capabilities`](Analyzer::capabilities).
pub trait Analyzer: Send + Sync {
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    fn skeleton(&self, _fq_name: &str) -> Result<Option<String>> {
        Err(AnalyzerError::Unsupported("skeleton"))
    }

    fn skeleton_header(&self, _fq_name: &str) -> Result<Option<String>> {
        Err(AnalyzerError::Unsupported("skeleton_header"))
    }

    fn skeletons_in_file(&self, _file: &ProjectFile) -> Result<BTreeMap<CodeUnit, String>> {
        Err(AnalyzerError::Unsupported("skeletons_in_file"))
    }

    fn classes_in_file(&self, _file: &ProjectFile) -> Result<BTreeSet<CodeUnit>> {
        Err(AnalyzerError::Unsupported("classes_in_file"))
    }

    fn top_level_declarations(&self, _file: &ProjectFile) -> Result<Vec<CodeUnit>> {
        Err(AnalyzerError::Unsupported("top_level_declarations"))
    }

    fn declarations_in_file(&self, _file: &ProjectFile) -> Result<Vec<CodeUnit>> {
        Err(AnalyzerError::Unsupported("declarations_in_file"))
    }

    fn enclosing_code_unit(&self, _file: &ProjectFile, _line: usize) -> Result<Option<CodeUnit>> {
        Err(AnalyzerError::Unsupported("enclosing_code_unit"))
    }

    fn all_classes(&self) -> Result<Vec<CodeUnit>> {
        Err(AnalyzerError::Unsupported("all_classes"))
    }

    fn all_declarations(&self) -> Result<Vec<CodeUnit>> {
        Err(AnalyzerError::Unsupported("all_declarations"))
    }

    fn members_in_class(&self, _fq_class: &str) -> Result<Vec<CodeUnit>> {
        Err(AnalyzerError::Unsupported("members_in_class"))
    }

    fn definition(&self, _fq_name: &str) -> Result<Option<CodeUnit>> {
        Err(AnalyzerError::Unsupported("definition"))
    }

    fn file_for(&self, _fq_name: &str) -> Result<Option<ProjectFile>> {
        Err(AnalyzerError::Unsupported("file_for"))
    }

    fn source_for(&self, _fq_name: &str) -> Result<Option<String>> {
        Err(AnalyzerError::Unsupported("source_for"))
    }

    fn search_definitions(&self, _pattern: &str) -> Result<Vec<CodeUnit>> {
        Err(AnalyzerError::Unsupported("search_definitions"))
    }

    fn symbols(&self, _sources: &[CodeUnit]) -> Result<BTreeSet<String>> {
        Err(AnalyzerError::Unsupported("symbols"))
    }

    fn uses_of(&self, _fq_name: &str) -> Result<BTreeSet<CodeUnit>> {
        Err(AnalyzerError::Unsupported("uses_of"))
    }

    fn call_graph_to(&self, _fq_name: &str, _depth: usize) -> Result<CallGraph> {
        Err(AnalyzerError::Unsupported("call_graph_to"))
    }

    fn call_graph_from(&self, _fq_name: &str, _depth: usize) -> Result<CallGraph> {
        Err(AnalyzerError::Unsupported("call_graph_from"))
    }

    fn page_rank(&self, _seeds: &[CodeUnit], _k: usize) -> Result<Vec<(CodeUnit, f64)>> {
        Err(AnalyzerError::Unsupported("page_rank"))
    }

    fn update(&self, _changed: &[ProjectFile]) -> Result<UpdateSummary> {
        Err(AnalyzerError::Unsupported("update"))
    }

    fn metrics(&self) -> Result<Metrics> {
        Err(AnalyzerError::Unsupported("metrics"))
    }
}

impl Analyzer for TreeSitterAnalyzer {
    fn capabilities(&self) -> Capabilities {
        Capabilities::SKELETONS
    }

    fn skeleton(&self, fq_name: &str) -> Result<Option<String>> {
        Ok(TreeSitterAnalyzer::skeleton(self, fq_name))
    }

    fn skeleton_header(&self, fq_name: &str) -> Result<Option<String>> {
        Ok(TreeSitterAnalyzer::skeleton_header(self, fq_name))
    }

    fn skeletons_in_file(&self, file: &ProjectFile) -> Result<BTreeMap<CodeUnit, String>> {
        Ok(TreeSitterAnalyzer::skeletons_in_file(self, file))
    }

    fn classes_in_file(&self, file: &ProjectFile) -> Result<BTreeSet<CodeUnit>> {
        Ok(TreeSitterAnalyzer::classes_in_file(self, file))
    }

    fn top_level_declarations(&self, file: &ProjectFile) -> Result<Vec<CodeUnit>> {
        Ok(TreeSitterAnalyzer::top_level_declarations(self, file))
    }

    fn declarations_in_file(&self, file: &ProjectFile) -> Result<Vec<CodeUnit>> {
        Ok(TreeSitterAnalyzer::declarations_in_file(self, file))
    }

    fn enclosing_code_unit(&self, file: &ProjectFile, line: usize) -> Result<Option<CodeUnit>> {
        Ok(TreeSitterAnalyzer::enclosing_code_unit(self, file, line))
    }

    fn all_classes(&self) -> Result<Vec<CodeUnit>> {
        Ok(TreeSitterAnalyzer::all_classes(self))
    }

    fn all_declarations(&self) -> Result<Vec<CodeUnit>> {
        Ok(TreeSitterAnalyzer::all_declarations(self))
    }

    fn members_in_class(&self, fq_class: &str) -> Result<Vec<CodeUnit>> {
        Ok(TreeSitterAnalyzer::members_in_class(self, fq_class))
    }

    fn definition(&self, fq_name: &str) -> Result<Option<CodeUnit>> {
        Ok(TreeSitterAnalyzer::definition(self, fq_name))
    }

    fn file_for(&self, fq_name: &str) -> Result<Option<ProjectFile>> {
        Ok(TreeSitterAnalyzer::file_for(self, fq_name))
    }

    fn source_for(&self, fq_name: &str) -> Result<Option<String>> {
        TreeSitterAnalyzer::source_for(self, fq_name)
    }

    fn search_definitions(&self, pattern: &str) -> Result<Vec<CodeUnit>> {
        Ok(TreeSitterAnalyzer::search_definitions(self, pattern))
    }

    fn symbols(&self, sources: &[CodeUnit]) -> Result<BTreeSet<String>> {
        Ok(TreeSitterAnalyzer::symbols(self, sources))
    }

    fn update(&self, changed: &[ProjectFile]) -> Result<UpdateSummary> {
        Ok(TreeSitterAnalyzer::update(self, changed))
    }

    fn metrics(&self) -> Result<Metrics> {
        Ok(TreeSitterAnalyzer::metrics(self))
    }
}

/// Fans queries out to one delegate per language and merges the answers.
///
/// Delegates are consulted in [`Language`] order. A delegate that answers
/// `Unsupported` is skipped; any other error is logged and skipped, so one
/// broken language never takes the whole query down.
#[derive(Default)]
pub struct MultiAnalyzer {
    delegates: BTreeMap<Language, Arc<dyn Analyzer>>,
}

impl MultiAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tree-sitter analyzer for every registered language the config enables.
    pub fn build(
        registry: &LanguageRegistry,
        project: Arc<dyn Project>,
        config: &Config,
    ) -> Result<Self> {
        let mut multi = Self::new();
        for language in registry.languages() {
            if !config.language_enabled(language.name()) {
                tracing::debug!("{} disabled by configuration", language);
                continue;
            }
            let Some(hooks) = registry.get(language) else {
                continue;
            };
            let analyzer = TreeSitterAnalyzer::new(hooks, Arc::clone(&project))?;
            multi.add_delegate(language, Arc::new(analyzer));
        }
        Ok(multi)
    }

    /// Register `delegate` for `language`, replacing any previous one.
    pub fn add_delegate(&mut self, language: Language, delegate: Arc<dyn Analyzer>) {
        self.delegates.insert(language, delegate);
    }

    pub fn with_delegate(mut self, language: Language, delegate: Arc<dyn Analyzer>) -> Self {
        self.add_delegate(language, delegate);
        self
    }

    pub fn languages(&self) -> Vec<Language> {
        self.delegates.keys().copied().collect()
    }

    pub fn delegate(&self, language: Language) -> Option<&Arc<dyn Analyzer>> {
        self.delegates.get(&language)
    }

    /// Delegate owning `file`, by extension.
    pub fn delegate_for_file(&self, file: &ProjectFile) -> Option<&Arc<dyn Analyzer>> {
        let language = Language::from_extension(file.extension()?)?;
        let delegate = self.delegates.get(&language);
        if delegate.is_none() {
            tracing::debug!("no {} analyzer for {}", language, file);
        }
        delegate
    }

    /// The first delegate, in language order, that defines `fq_name`.
    pub fn delegate_defining(&self, fq_name: &str) -> Option<&Arc<dyn Analyzer>> {
        self.delegates
            .iter()
            .find(|(lang, d)| Self::skip(**lang, d.definition(fq_name)).flatten().is_some())
            .map(|(_, d)| d)
    }

    /// Turn a delegate error into "no answer", logging it.
    fn skip<T>(language: Language, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) if e.is_unsupported() => {
                tracing::debug!("{} analyzer: {}", language, e);
                None
            }
            Err(e) => {
                tracing::warn!("{} analyzer failed: {}", language, e);
                None
            }
        }
    }

    /// First non-empty answer in delegate order.
    fn first<T>(&self, f: impl Fn(&dyn Analyzer) -> Result<Option<T>>) -> Option<T> {
        self.delegates
            .iter()
            .find_map(|(lang, d)| Self::skip(*lang, f(d.as_ref())).flatten())
    }

    /// Every delegate's answers, deduplicated and sorted.
    fn all<T: Ord>(&self, f: impl Fn(&dyn Analyzer) -> Result<Vec<T>>) -> Vec<T> {
        let mut merged: Vec<T> = self
            .delegates
            .iter()
            .filter_map(|(lang, d)| Self::skip(*lang, f(d.as_ref())))
            .flatten()
            .collect();
        merged.sort();
        merged.dedup();
        merged
    }

    /// Delegates advertising a capability. Errors with `Unsupported(op)`
    /// when there are none.
    fn capable(
        &self,
        op: &'static str,
        has: impl Fn(Capabilities) -> bool,
    ) -> Result<Vec<(Language, &Arc<dyn Analyzer>)>> {
        let capable: Vec<_> = self
            .delegates
            .iter()
            .filter(|(_, d)| has(d.capabilities()))
            .map(|(lang, d)| (*lang, d))
            .collect();
        if capable.is_empty() {
            return Err(AnalyzerError::Unsupported(op));
        }
        Ok(capable)
    }

    fn merge_call_graphs(
        &self,
        op: &'static str,
        f: impl Fn(&dyn Analyzer) -> Result<CallGraph>,
    ) -> Result<CallGraph> {
        let mut merged = CallGraph::new();
        for (lang, delegate) in self.capable(op, |c| c.call_graph)? {
            let Some(graph) = Self::skip(lang, f(delegate.as_ref())) else {
                continue;
            };
            for (name, sites) in graph {
                let entry = merged.entry(name).or_default();
                for site in sites {
                    if !entry.contains(&site) {
                        entry.push(site);
                    }
                }
            }
        }
        Ok(merged)
    }
}

impl Analyzer for MultiAnalyzer {
    fn capabilities(&self) -> Capabilities {
        self.delegates
            .values()
            .map(|d| d.capabilities())
            .fold(Capabilities::default(), |acc, c| Capabilities {
                skeletons: acc.skeletons || c.skeletons,
                usages: acc.usages || c.usages,
                call_graph: acc.call_graph || c.call_graph,
                ranking: acc.ranking || c.ranking,
            })
    }

    fn skeleton(&self, fq_name: &str) -> Result<Option<String>> {
        Ok(self.first(|d| d.skeleton(fq_name)))
    }

    fn skeleton_header(&self, fq_name: &str) -> Result<Option<String>> {
        Ok(self.first(|d| d.skeleton_header(fq_name)))
    }

    fn skeletons_in_file(&self, file: &ProjectFile) -> Result<BTreeMap<CodeUnit, String>> {
        match self.delegate_for_file(file) {
            Some(d) => d.skeletons_in_file(file),
            None => Ok(BTreeMap::new()),
        }
    }

    fn classes_in_file(&self, file: &ProjectFile) -> Result<BTreeSet<CodeUnit>> {
        match self.delegate_for_file(file) {
            Some(d) => d.classes_in_file(file),
            None => Ok(BTreeSet::new()),
        }
    }

    fn top_level_declarations(&self, file: &ProjectFile) -> Result<Vec<CodeUnit>> {
        match self.delegate_for_file(file) {
            Some(d) => d.top_level_declarations(file),
            None => Ok(Vec::new()),
        }
    }

    fn declarations_in_file(&self, file: &ProjectFile) -> Result<Vec<CodeUnit>> {
        match self.delegate_for_file(file) {
            Some(d) => d.declarations_in_file(file),
            None => Ok(Vec::new()),
        }
    }

    fn enclosing_code_unit(&self, file: &ProjectFile, line: usize) -> Result<Option<CodeUnit>> {
        match self.delegate_for_file(file) {
            Some(d) => d.enclosing_code_unit(file, line),
            None => Ok(None),
        }
    }

    fn all_classes(&self) -> Result<Vec<CodeUnit>> {
        Ok(self.all(|d| d.all_classes()))
    }

    fn all_declarations(&self) -> Result<Vec<CodeUnit>> {
        Ok(self.all(|d| d.all_declarations()))
    }

    fn members_in_class(&self, fq_class: &str) -> Result<Vec<CodeUnit>> {
        Ok(self.all(|d| d.members_in_class(fq_class)))
    }

    fn definition(&self, fq_name: &str) -> Result<Option<CodeUnit>> {
        Ok(self.first(|d| d.definition(fq_name)))
    }

    fn file_for(&self, fq_name: &str) -> Result<Option<ProjectFile>> {
        Ok(self.first(|d| d.file_for(fq_name)))
    }

    fn source_for(&self, fq_name: &str) -> Result<Option<String>> {
        Ok(self.first(|d| d.source_for(fq_name)))
    }

    fn search_definitions(&self, pattern: &str) -> Result<Vec<CodeUnit>> {
        Ok(self.all(|d| d.search_definitions(pattern)))
    }

    fn symbols(&self, sources: &[CodeUnit]) -> Result<BTreeSet<String>> {
        Ok(self
            .all(|d| d.symbols(sources).map(|s| s.into_iter().collect::<Vec<String>>()))
            .into_iter()
            .collect())
    }

    fn uses_of(&self, fq_name: &str) -> Result<BTreeSet<CodeUnit>> {
        let mut uses = BTreeSet::new();
        for (lang, delegate) in self.capable("uses_of", |c| c.usages)? {
            if let Some(found) = Self::skip(lang, delegate.uses_of(fq_name)) {
                uses.extend(found);
            }
        }
        Ok(uses)
    }

    fn call_graph_to(&self, fq_name: &str, depth: usize) -> Result<CallGraph> {
        self.merge_call_graphs("call_graph_to", |d| d.call_graph_to(fq_name, depth))
    }

    fn call_graph_from(&self, fq_name: &str, depth: usize) -> Result<CallGraph> {
        self.merge_call_graphs("call_graph_from", |d| d.call_graph_from(fq_name, depth))
    }

    /// Ranked by the first ranking-capable delegate that defines a seed.
    fn page_rank(&self, seeds: &[CodeUnit], k: usize) -> Result<Vec<(CodeUnit, f64)>> {
        for (lang, delegate) in self.capable("page_rank", |c| c.ranking)? {
            let knows_seed = seeds.iter().any(|seed| {
                Self::skip(lang, delegate.definition(seed.fq_name()))
                    .flatten()
                    .is_some()
            });
            if knows_seed {
                return delegate.page_rank(seeds, k);
            }
        }
        Ok(Vec::new())
    }

    /// Files are grouped by owning language; unowned files are ignored.
    fn update(&self, changed: &[ProjectFile]) -> Result<UpdateSummary> {
        let mut groups: BTreeMap<Language, Vec<ProjectFile>> = BTreeMap::new();
        for file in changed {
            match file.extension().and_then(Language::from_extension) {
                Some(language) => groups.entry(language).or_default().push(file.clone()),
                None => tracing::debug!("ignoring change to {}", file),
            }
        }

        let mut summary = UpdateSummary::default();
        for (language, files) in groups {
            let Some(delegate) = self.delegates.get(&language) else {
                continue;
            };
            if let Some(partial) = Self::skip(language, delegate.update(&files)) {
                summary += partial;
            }
        }
        Ok(summary)
    }

    fn metrics(&self) -> Result<Metrics> {
        let mut total = Metrics::default();
        for (lang, delegate) in &self.delegates {
            if let Some(metrics) = Self::skip(*lang, delegate.metrics()) {
                total += metrics;
            }
        }
        Ok(total)
    }
}
