//! The per-language structural analyzer.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::sync::Arc;

use rayon::prelude::*;
use regex::RegexBuilder;
use serde::Serialize;
use tree_sitter::Query;

use super::code_unit::CodeUnit;
use super::error::Result;
use super::extract::{analyze_source, create_parser};
use super::index::AggregateIndex;
use super::languages::Language;
use super::signature::reconstruct;
use super::traits::LanguageHooks;
use crate::project::{Project, ProjectFile};

/// Counts reported by [`TreeSitterAnalyzer::metrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metrics {
    pub files: usize,
    pub declarations: usize,
    pub classes: usize,
}

impl std::ops::AddAssign for Metrics {
    fn add_assign(&mut self, other: Self) {
        self.files += other.files;
        self.declarations += other.declarations;
        self.classes += other.classes;
    }
}

/// Outcome of an incremental update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpdateSummary {
    /// Files parsed again and merged.
    pub reanalyzed: usize,
    /// Files whose contribution was dropped because they no longer exist
    /// or fall outside the project filters.
    pub removed: usize,
}

impl std::ops::AddAssign for UpdateSummary {
    fn add_assign(&mut self, other: Self) {
        self.reanalyzed += other.reanalyzed;
        self.removed += other.removed;
    }
}

/// Structural analyzer for one language over one project.
///
/// Construction compiles the declaration query once and analyzes every
/// matching project file in parallel. Queries only read the aggregate
/// index; nothing is re-parsed until [`update`](Self::update) is called.
pub struct TreeSitterAnalyzer {
    hooks: Arc<dyn LanguageHooks>,
    query: Arc<Query>,
    project: Arc<dyn Project>,
    index: AggregateIndex,
}

impl TreeSitterAnalyzer {
    /// Analyze every project file owned by the hooks' language.
    pub fn new(hooks: Arc<dyn LanguageHooks>, project: Arc<dyn Project>) -> Result<Self> {
        let files = project.files_with_extensions(hooks.language().extensions());
        Self::from_files(hooks, project, &files)
    }

    /// Analyze exactly `files`, in whatever order the workers pick them up.
    pub fn from_files(
        hooks: Arc<dyn LanguageHooks>,
        project: Arc<dyn Project>,
        files: &[ProjectFile],
    ) -> Result<Self> {
        let query = Query::new(&hooks.grammar(), hooks.query_source())?;
        hooks.profile().validate(hooks.language().name(), &query)?;
        // Surface a grammar/runtime mismatch here rather than once per worker.
        create_parser(hooks.as_ref())?;

        let analyzer = Self {
            hooks,
            query: Arc::new(query),
            project,
            index: AggregateIndex::new(),
        };
        let analyzed = analyzer.analyze_files(files);
        tracing::info!(
            "{}: indexed {} declarations from {} of {} files",
            analyzer.language(),
            analyzer.index.unit_count(),
            analyzed,
            files.len()
        );
        Ok(analyzer)
    }

    /// Parse and merge `files` in parallel, one parser per worker.
    /// Returns the number of files merged.
    fn analyze_files(&self, files: &[ProjectFile]) -> usize {
        let hooks = self.hooks.as_ref();
        let query = self.query.as_ref();
        files
            .par_iter()
            .map_init(
                || match create_parser(hooks) {
                    Ok(parser) => Some(parser),
                    Err(e) => {
                        tracing::warn!("{}: cannot create parser: {}", hooks.language(), e);
                        None
                    }
                },
                |parser, file| {
                    let Some(parser) = parser.as_mut() else {
                        return 0;
                    };
                    match self.project.read(file) {
                        Ok(source) => {
                            let analysis = analyze_source(hooks, query, parser, file, source);
                            self.index.merge(file, analysis);
                            1
                        }
                        Err(e) => {
                            tracing::warn!("skipping {}: {}", file, e);
                            self.index.remove_file(file);
                            0
                        }
                    }
                },
            )
            .sum()
    }

    pub fn language(&self) -> Language {
        self.hooks.language()
    }

    pub fn hooks(&self) -> &Arc<dyn LanguageHooks> {
        &self.hooks
    }

    pub fn project(&self) -> &Arc<dyn Project> {
        &self.project
    }

    pub fn index(&self) -> &AggregateIndex {
        &self.index
    }

    fn owns(&self, file: &ProjectFile) -> bool {
        file.extension()
            .is_some_and(|ext| self.language().extensions().contains(&ext))
    }

    /// Re-analyze `changed` files, each superseding its previous
    /// contribution. Files that no longer exist, or that the project's
    /// filtering rules leave out, are only dropped.
    pub fn update(&self, changed: &[ProjectFile]) -> UpdateSummary {
        let mut summary = UpdateSummary::default();
        let mut present = Vec::new();
        for file in changed.iter().filter(|f| self.owns(f)) {
            if !self.project.includes(file) {
                tracing::debug!("{}: {} is outside the project rules", self.language(), file);
                if self.index.remove_file(file) {
                    summary.removed += 1;
                }
            } else if file.exists() {
                present.push(file.clone());
            } else if self.index.remove_file(file) {
                summary.removed += 1;
            }
        }
        present.sort();
        present.dedup();
        summary.reanalyzed = self.analyze_files(&present);
        tracing::debug!(
            "{}: update reanalyzed {} and removed {} files",
            self.language(),
            summary.reanalyzed,
            summary.removed
        );
        summary
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The indexed unit named `fq_name`.
    pub fn definition(&self, fq_name: &str) -> Option<CodeUnit> {
        self.index.lookup(fq_name)
    }

    /// File holding the effective declaration of `fq_name`.
    pub fn file_for(&self, fq_name: &str) -> Option<ProjectFile> {
        let unit = self.definition(fq_name)?;
        self.index.location(&unit).map(|(file, _)| file)
    }

    /// Full skeleton of `fq_name`.
    pub fn skeleton(&self, fq_name: &str) -> Option<String> {
        let unit = self.definition(fq_name)?;
        reconstruct(&self.index, self.hooks.as_ref(), &unit, false)
    }

    /// Skeleton keeping only a class's fields; other members are elided.
    pub fn skeleton_header(&self, fq_name: &str) -> Option<String> {
        let unit = self.definition(fq_name)?;
        reconstruct(&self.index, self.hooks.as_ref(), &unit, true)
    }

    /// Skeletons of every top-level declaration in `file`.
    pub fn skeletons_in_file(&self, file: &ProjectFile) -> BTreeMap<CodeUnit, String> {
        self.index
            .top_level(file)
            .into_iter()
            .filter_map(|unit| {
                let skeleton = reconstruct(&self.index, self.hooks.as_ref(), &unit, false)?;
                Some((unit, skeleton))
            })
            .collect()
    }

    pub fn top_level_declarations(&self, file: &ProjectFile) -> Vec<CodeUnit> {
        self.index.top_level(file)
    }

    /// Every unit declared in `file`: top level first, then breadth first.
    pub fn declarations_in_file(&self, file: &ProjectFile) -> Vec<CodeUnit> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut queue: VecDeque<CodeUnit> = self.index.top_level(file).into();
        while let Some(unit) = queue.pop_front() {
            if !seen.insert(unit.clone()) {
                continue;
            }
            queue.extend(self.index.children_in_file(&unit, file));
            out.push(unit);
        }
        out
    }

    /// Classes declared in `file`, nested ones included.
    pub fn classes_in_file(&self, file: &ProjectFile) -> BTreeSet<CodeUnit> {
        self.index
            .units_in_file(file)
            .into_iter()
            .filter(CodeUnit::is_class)
            .collect()
    }

    /// Every indexed class, sorted.
    pub fn all_classes(&self) -> Vec<CodeUnit> {
        self.index
            .all_units()
            .into_iter()
            .filter(CodeUnit::is_class)
            .collect()
    }

    /// Every indexed unit, sorted.
    pub fn all_declarations(&self) -> Vec<CodeUnit> {
        self.index.all_units()
    }

    /// Immediate members of a class; empty when the class is unknown.
    pub fn members_in_class(&self, fq_class: &str) -> Vec<CodeUnit> {
        self.definition(fq_class)
            .map(|unit| self.index.children_of(&unit))
            .unwrap_or_default()
    }

    /// Case-insensitive pattern search over fully qualified names.
    pub fn search_definitions(&self, pattern: &str) -> Vec<CodeUnit> {
        search_units(self.index.all_units(), pattern)
    }

    /// Identifiers of `sources` and of everything nested under them.
    pub fn symbols(&self, sources: &[CodeUnit]) -> BTreeSet<String> {
        let mut symbols = BTreeSet::new();
        let mut seen = HashSet::new();
        let mut stack: Vec<CodeUnit> = sources.to_vec();
        while let Some(unit) = stack.pop() {
            if !seen.insert(unit.clone()) {
                continue;
            }
            let identifier = unit.identifier();
            if !identifier.is_empty() {
                symbols.insert(identifier.to_string());
            }
            stack.extend(self.index.children_of(&unit));
        }
        symbols
    }

    /// Innermost declaration of `file` whose lines contain `line` (one-based).
    pub fn enclosing_code_unit(&self, file: &ProjectFile, line: usize) -> Option<CodeUnit> {
        self.index
            .units_in_file(file)
            .into_iter()
            .filter_map(|unit| {
                let span = self.index.span_in_file(&unit, file)?;
                span.contains_line(line).then_some((span, unit))
            })
            .min_by(|(a, _), (b, _)| {
                (a.end_byte - a.start_byte)
                    .cmp(&(b.end_byte - b.start_byte))
                    .then(b.start_byte.cmp(&a.start_byte))
            })
            .map(|(_, unit)| unit)
    }

    /// Original source text of a declaration, read back from its file.
    pub fn source_for(&self, fq_name: &str) -> Result<Option<String>> {
        let Some(unit) = self.definition(fq_name) else {
            return Ok(None);
        };
        let Some((file, span)) = self.index.location(&unit) else {
            return Ok(None);
        };
        let text = self.project.read(&file)?;
        Ok(text.get(span.start_byte..span.end_byte).map(str::to_string))
    }

    pub fn metrics(&self) -> Metrics {
        let units = self.index.all_units();
        Metrics {
            files: self.index.file_count(),
            declarations: units.len(),
            classes: units.iter().filter(|u| u.is_class()).count(),
        }
    }
}

/// Filter `units` by a search pattern.
///
/// A pattern without `.*` matches as a substring; anything else is a
/// regex. Matching ignores case. An invalid regex degrades to a plain
/// substring match.
pub(crate) fn search_units(units: Vec<CodeUnit>, pattern: &str) -> Vec<CodeUnit> {
    if pattern.is_empty() {
        return Vec::new();
    }
    let source = if pattern.contains(".*") {
        pattern.to_string()
    } else {
        format!(".*{}.*", regex::escape(pattern))
    };
    let mut found: Vec<CodeUnit> = match RegexBuilder::new(&source).case_insensitive(true).build() {
        Ok(re) => units.into_iter().filter(|u| re.is_match(u.fq_name())).collect(),
        Err(e) => {
            tracing::debug!("invalid search pattern {:?} ({}), using substring match", pattern, e);
            let needle = pattern.to_lowercase();
            units
                .into_iter()
                .filter(|u| u.fq_name().to_lowercase().contains(&needle))
                .collect()
        }
    };
    found.sort();
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::code_unit::CodeUnitKind;
    use crate::analysis::languages::{GoHooks, JavaHooks, PythonHooks};
    use crate::analysis::test_support::fq_names;
    use crate::config::Config;
    use crate::project::FsProject;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn open(dir: &TempDir) -> Arc<dyn Project> {
        Arc::new(FsProject::open(dir.path(), Config::default()).unwrap())
    }

    fn java_project() -> (TempDir, TreeSitterAnalyzer) {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "src/geo/Point.java",
            "package geo;\n\npublic class Point {\n    private int x;\n    public int getX() {\n        return x;\n    }\n    static class Cache {\n        int size;\n    }\n}\n",
        );
        write(
            dir.path(),
            "src/geo/Line.java",
            "package geo;\n\nclass Line {\n    Point a;\n    Point b;\n    double length() { return 0; }\n}\n",
        );
        let analyzer = TreeSitterAnalyzer::new(Arc::new(JavaHooks::new()), open(&dir)).unwrap();
        (dir, analyzer)
    }

    #[test]
    fn test_skeleton_and_header() {
        let (_dir, analyzer) = java_project();
        assert_eq!(
            analyzer.skeleton("geo.Point").unwrap(),
            "public class Point {\n  \
               private int x;\n  \
               public int getX() { ... }\n  \
               static class Cache {\n    \
                 int size;\n  \
               }\n\
             }"
        );
        assert_eq!(
            analyzer.skeleton_header("geo.Point").unwrap(),
            "public class Point {\n  private int x;\n  [...]\n}"
        );
        assert!(analyzer.skeleton("geo.Missing").is_none());
    }

    #[test]
    fn test_file_queries() {
        let (_dir, analyzer) = java_project();
        let point = analyzer.file_for("geo.Point").unwrap();
        assert_eq!(point.to_string().replace('\\', "/"), "src/geo/Point.java");

        let classes: Vec<String> = analyzer
            .classes_in_file(&point)
            .iter()
            .map(|c| c.fq_name().to_string())
            .collect();
        assert_eq!(classes, vec!["geo.Point", "geo.Point$Cache"]);

        assert_eq!(
            fq_names(&analyzer.declarations_in_file(&point)),
            vec![
                "geo.Point",
                "geo.Point.x",
                "geo.Point.getX",
                "geo.Point$Cache",
                "geo.Point$Cache.size",
            ]
        );
        let skeletons = analyzer.skeletons_in_file(&point);
        assert_eq!(skeletons.len(), 1);
        assert!(skeletons.values().all(|s| s.ends_with('}')));
    }

    #[test]
    fn test_all_classes_and_members() {
        let (_dir, analyzer) = java_project();
        assert_eq!(
            fq_names(&analyzer.all_classes()),
            vec!["geo.Line", "geo.Point", "geo.Point$Cache"]
        );
        assert_eq!(
            fq_names(&analyzer.members_in_class("geo.Line")),
            vec!["geo.Line.a", "geo.Line.b", "geo.Line.length"]
        );
        assert!(analyzer.members_in_class("geo.Nope").is_empty());
        assert_eq!(analyzer.all_declarations().len(), 9);
        assert_eq!(
            analyzer.metrics(),
            Metrics {
                files: 2,
                declarations: 9,
                classes: 3
            }
        );
    }

    #[test]
    fn test_search_definitions() {
        let (_dir, analyzer) = java_project();
        assert_eq!(
            fq_names(&analyzer.search_definitions("getx")),
            vec!["geo.Point.getX"]
        );
        assert_eq!(
            fq_names(&analyzer.search_definitions("geo.*line")),
            vec!["geo.Line", "geo.Line.a", "geo.Line.b", "geo.Line.length"]
        );
        assert_eq!(analyzer.search_definitions(".*").len(), 9);
        assert!(analyzer.search_definitions("").is_empty());
        // unbalanced group falls back to substring
        assert!(analyzer.search_definitions(".*(").is_empty());
    }

    #[test]
    fn test_symbols_enclosing_and_source() {
        let (_dir, analyzer) = java_project();
        let point = analyzer.definition("geo.Point").unwrap();
        let symbols: Vec<String> = analyzer.symbols(&[point]).into_iter().collect();
        assert_eq!(symbols, vec!["Cache", "Point", "getX", "size", "x"]);

        let file = analyzer.file_for("geo.Point").unwrap();
        assert_eq!(
            analyzer.enclosing_code_unit(&file, 6).map(|u| u.fq_name().to_string()),
            Some("geo.Point.getX".to_string())
        );
        assert_eq!(
            analyzer.enclosing_code_unit(&file, 9).map(|u| u.fq_name().to_string()),
            Some("geo.Point$Cache.size".to_string())
        );
        assert!(analyzer.enclosing_code_unit(&file, 1).is_none());

        assert_eq!(
            analyzer.source_for("geo.Point.getX").unwrap().unwrap(),
            "public int getX() {\n        return x;\n    }"
        );
        assert!(analyzer.source_for("geo.Nope").unwrap().is_none());
    }

    #[test]
    fn test_update_supersedes_and_removes() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "pkg/shapes.py", "class Circle:\n    def area(self):\n        pass\n");
        write(dir.path(), "pkg/util.py", "def helper():\n    pass\n");
        let project = open(&dir);
        let analyzer = TreeSitterAnalyzer::new(Arc::new(PythonHooks::new()), project.clone()).unwrap();
        assert!(analyzer.definition("pkg.shapes.Circle.area").is_some());

        write(dir.path(), "pkg/shapes.py", "class Circle:\n    radius = 1\n");
        fs::remove_file(dir.path().join("pkg/util.py")).unwrap();
        let changed = vec![
            project.file(Path::new("pkg/shapes.py")),
            project.file(Path::new("pkg/util.py")),
            project.file(Path::new("README.md")),
        ];
        let summary = analyzer.update(&changed);
        assert_eq!(summary, UpdateSummary { reanalyzed: 1, removed: 1 });

        assert!(analyzer.definition("pkg.shapes.Circle.area").is_none());
        assert!(analyzer.definition("pkg.util.helper").is_none());
        assert_eq!(
            fq_names(&analyzer.members_in_class("pkg.shapes.Circle")),
            vec!["pkg.shapes.Circle.radius"]
        );
    }

    #[test]
    fn test_go_method_without_struct_stays_indexed() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "svc/handler.go",
            "package svc\n\nfunc (h *Handler) Serve() error {\n\treturn nil\n}\n",
        );
        let analyzer = TreeSitterAnalyzer::new(Arc::new(GoHooks::new()), open(&dir)).unwrap();
        let file = analyzer.file_for("svc.Handler.Serve").unwrap();
        assert_eq!(
            fq_names(&analyzer.top_level_declarations(&file)),
            vec!["svc.Handler.Serve"]
        );
        let unit = analyzer.definition("svc.Handler.Serve").unwrap();
        assert_eq!(unit.kind(), CodeUnitKind::Function);
    }

    #[test]
    fn test_invalid_query_is_rejected() {
        struct BrokenJava(JavaHooks);
        impl LanguageHooks for BrokenJava {
            fn language(&self) -> Language {
                Language::Java
            }
            fn grammar(&self) -> tree_sitter::Language {
                self.0.grammar()
            }
            fn query_source(&self) -> &'static str {
                "(no_such_node) @class.definition"
            }
            fn profile(&self) -> &'static crate::analysis::LanguageSyntaxProfile {
                self.0.profile()
            }
            fn file_namespace(&self, f: &ProjectFile, r: tree_sitter::Node, s: &str) -> String {
                self.0.file_namespace(f, r, s)
            }
            fn render_class_header(&self, n: tree_sitter::Node, s: &str, sig: &str) -> String {
                self.0.render_class_header(n, s, sig)
            }
            fn render_function(&self, parts: &crate::analysis::FunctionParts) -> String {
                self.0.render_function(parts)
            }
        }

        let dir = TempDir::new().unwrap();
        let result = TreeSitterAnalyzer::new(Arc::new(BrokenJava(JavaHooks::new())), open(&dir));
        assert!(matches!(result, Err(crate::analysis::AnalyzerError::Query(_))));
    }
}
