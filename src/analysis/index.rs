//! The aggregate declaration index shared by all workers of one analyzer.
//!
//! Every entry is keyed by the file that contributed it, so a file's
//! contribution can be replaced or dropped wholesale and the merged view
//! never depends on the order files were processed in.

use std::collections::{BTreeMap, HashSet};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::code_unit::{CodeUnit, CodeUnitKind, Span};
use super::extract::FileAnalysis;
use super::signature::SkeletonSource;
use crate::project::ProjectFile;

/// Per-unit slots, one per contributing file.
type Slots<V> = DashMap<CodeUnit, BTreeMap<ProjectFile, V>>;

/// Store `file`'s slot for `unit`. The stored key takes the new unit's
/// kind when `file` becomes the effective declaration.
fn install_slot<V>(map: &Slots<V>, unit: &CodeUnit, file: &ProjectFile, value: V) {
    match map.entry(unit.clone()) {
        Entry::Occupied(mut entry)
            if entry.key().kind() != unit.kind()
                && entry.get().keys().next().map_or(true, |first| file <= first) =>
        {
            let mut slots = std::mem::take(entry.get_mut());
            slots.insert(file.clone(), value);
            entry.replace_entry(slots);
        }
        Entry::Occupied(mut entry) => {
            entry.get_mut().insert(file.clone(), value);
        }
        Entry::Vacant(entry) => {
            entry.insert(BTreeMap::from([(file.clone(), value)]));
        }
    }
}

/// Drop `file`'s slot for `unit`, and the unit itself once no file is left.
fn drop_slot<V>(map: &Slots<V>, unit: &CodeUnit, file: &ProjectFile) {
    if let Some(mut slots) = map.get_mut(unit) {
        slots.remove(file);
    }
    map.remove_if(unit, |_, slots| slots.is_empty());
}

/// Merged declarations of every analyzed file.
///
/// Per-unit maps keep one slot per contributing file. Readers see the
/// union of children across files and the signature and span of the
/// lowest-sorting file, which makes merging commutative.
pub struct AggregateIndex {
    top_level: DashMap<ProjectFile, Vec<CodeUnit>>,
    file_units: DashMap<ProjectFile, Vec<CodeUnit>>,
    children: Slots<Vec<CodeUnit>>,
    signatures: Slots<String>,
    spans: Slots<Span>,
}

impl Default for AggregateIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregateIndex {
    pub fn new() -> Self {
        Self {
            top_level: DashMap::new(),
            file_units: DashMap::new(),
            children: DashMap::new(),
            signatures: DashMap::new(),
            spans: DashMap::new(),
        }
    }

    /// Publish one file's analysis, superseding whatever the file
    /// contributed before.
    ///
    /// The new contribution is installed before stale units are dropped,
    /// so a concurrent reader sees either the old or the new declaration
    /// of every unit the file keeps, never neither.
    pub fn merge(&self, file: &ProjectFile, analysis: FileAnalysis) {
        let FileAnalysis {
            top_level,
            mut children,
            mut signatures,
            mut spans,
            units,
        } = analysis;

        let previous = self
            .file_units
            .get(file)
            .map(|r| r.value().clone())
            .unwrap_or_default();

        for unit in &units {
            let kids = children.remove(unit).unwrap_or_default();
            install_slot(&self.children, unit, file, kids);
            if let Some(signature) = signatures.remove(unit) {
                install_slot(&self.signatures, unit, file, signature);
            }
            if let Some(span) = spans.remove(unit) {
                install_slot(&self.spans, unit, file, span);
            }
        }

        let current: HashSet<&CodeUnit> = units.iter().collect();
        let stale: Vec<CodeUnit> = previous
            .into_iter()
            .filter(|unit| !current.contains(unit))
            .collect();

        self.top_level.insert(file.clone(), top_level);
        self.file_units.insert(file.clone(), units);

        for unit in &stale {
            self.drop_unit_slots(unit, file);
        }
    }

    /// Drop everything `file` contributed. Returns true if it had been indexed.
    pub fn remove_file(&self, file: &ProjectFile) -> bool {
        self.top_level.remove(file);
        let Some((_, units)) = self.file_units.remove(file) else {
            return false;
        };
        for unit in &units {
            self.drop_unit_slots(unit, file);
        }
        true
    }

    fn drop_unit_slots(&self, unit: &CodeUnit, file: &ProjectFile) {
        drop_slot(&self.children, unit, file);
        drop_slot(&self.signatures, unit, file);
        drop_slot(&self.spans, unit, file);
    }

    /// Indexed files, sorted.
    pub fn files(&self) -> Vec<ProjectFile> {
        let mut files: Vec<ProjectFile> =
            self.file_units.iter().map(|r| r.key().clone()).collect();
        files.sort();
        files
    }

    pub fn contains_file(&self, file: &ProjectFile) -> bool {
        self.file_units.contains_key(file)
    }

    /// Top-level units of `file`, in source order.
    pub fn top_level(&self, file: &ProjectFile) -> Vec<CodeUnit> {
        self.top_level
            .get(file)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    /// Every unit of `file`, in source order.
    pub fn units_in_file(&self, file: &ProjectFile) -> Vec<CodeUnit> {
        self.file_units
            .get(file)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    /// Immediate children of `unit` as contributed by `file` alone.
    pub fn children_in_file(&self, unit: &CodeUnit, file: &ProjectFile) -> Vec<CodeUnit> {
        self.children
            .get(unit)
            .and_then(|slots| slots.get(file).cloned())
            .unwrap_or_default()
    }

    /// Immediate children across all files, deduplicated, file order then
    /// source order.
    pub fn children_of(&self, unit: &CodeUnit) -> Vec<CodeUnit> {
        let Some(slots) = self.children.get(unit) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        slots
            .values()
            .flatten()
            .filter(|c| seen.insert(*c))
            .cloned()
            .collect()
    }

    pub fn signature_of(&self, unit: &CodeUnit) -> Option<String> {
        self.signatures
            .get(unit)
            .and_then(|slots| slots.values().next().cloned())
    }

    /// The file and span of `unit`'s effective declaration.
    pub fn location(&self, unit: &CodeUnit) -> Option<(ProjectFile, Span)> {
        self.spans.get(unit).and_then(|slots| {
            slots
                .iter()
                .next()
                .map(|(file, span)| (file.clone(), *span))
        })
    }

    /// Span of `unit` as declared in `file`.
    pub fn span_in_file(&self, unit: &CodeUnit, file: &ProjectFile) -> Option<Span> {
        self.spans.get(unit).and_then(|slots| slots.get(file).copied())
    }

    /// The stored unit with this fully qualified name.
    pub fn lookup(&self, fq_name: &str) -> Option<CodeUnit> {
        let probe = CodeUnit::new(CodeUnitKind::Class, fq_name).ok()?;
        self.signatures.get(&probe).map(|r| r.key().clone())
    }

    /// Every indexed unit, sorted.
    pub fn all_units(&self) -> Vec<CodeUnit> {
        let mut units: Vec<CodeUnit> =
            self.signatures.iter().map(|r| r.key().clone()).collect();
        units.sort();
        units
    }

    pub fn unit_count(&self) -> usize {
        self.signatures.len()
    }

    pub fn file_count(&self) -> usize {
        self.file_units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

impl SkeletonSource for AggregateIndex {
    fn signature(&self, unit: &CodeUnit) -> Option<String> {
        self.signature_of(unit)
    }

    fn children(&self, unit: &CodeUnit) -> Vec<CodeUnit> {
        self.children_of(unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::languages::JavaHooks;
    use crate::analysis::test_support::{analyze, fq_names};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn file(rel: &str) -> ProjectFile {
        ProjectFile::new(PathBuf::from("/project"), rel)
    }

    #[test]
    fn test_merge_then_query() {
        let hooks = JavaHooks::new();
        let index = AggregateIndex::new();
        let point = file("geo/Point.java");
        index.merge(
            &point,
            analyze(&hooks, "geo/Point.java", "package geo; class Point { int x; void move() {} }"),
        );

        let class = index.lookup("geo.Point").unwrap();
        assert!(class.is_class());
        assert_eq!(fq_names(&index.top_level(&point)), vec!["geo.Point"]);
        assert_eq!(
            fq_names(&index.children_of(&class)),
            vec!["geo.Point.x", "geo.Point.move"]
        );
        assert_eq!(index.signature_of(&class).as_deref(), Some("class Point {"));
        assert_eq!(index.location(&class).map(|(f, _)| f), Some(point));
        assert_eq!(index.unit_count(), 3);
    }

    #[test]
    fn test_merge_supersedes_previous_contribution() {
        let hooks = JavaHooks::new();
        let index = AggregateIndex::new();
        let a = file("A.java");
        index.merge(&a, analyze(&hooks, "A.java", "class A { int old; void gone() {} }"));
        index.merge(&a, analyze(&hooks, "A.java", "class A { int fresh; }"));

        let class = index.lookup("A").unwrap();
        assert_eq!(fq_names(&index.children_of(&class)), vec!["A.fresh"]);
        assert!(index.lookup("A.gone").is_none());
        assert!(index.lookup("A.old").is_none());
        assert_eq!(index.unit_count(), 2);
    }

    #[test]
    fn test_remove_file_drops_all_traces() {
        let hooks = JavaHooks::new();
        let index = AggregateIndex::new();
        let a = file("A.java");
        index.merge(&a, analyze(&hooks, "A.java", "class A { int x; }"));
        assert!(index.remove_file(&a));
        assert!(!index.remove_file(&a));
        assert!(index.is_empty());
        assert!(index.files().is_empty());
        assert!(index.top_level(&a).is_empty());
    }

    #[test]
    fn test_merge_is_order_independent() {
        let hooks = JavaHooks::new();
        let first = analyze(&hooks, "a/Dup.java", "package p; class Dup { int a; }");
        let second = analyze(&hooks, "b/Dup.java", "package p; class Dup { int b; }");

        let forward = AggregateIndex::new();
        forward.merge(&file("a/Dup.java"), first.clone());
        forward.merge(&file("b/Dup.java"), second.clone());

        let backward = AggregateIndex::new();
        backward.merge(&file("b/Dup.java"), second);
        backward.merge(&file("a/Dup.java"), first);

        let dup = forward.lookup("p.Dup").unwrap();
        assert_eq!(forward.children_of(&dup), backward.children_of(&dup));
        assert_eq!(fq_names(&forward.children_of(&dup)), vec!["p.Dup.a", "p.Dup.b"]);
        assert_eq!(forward.location(&dup), backward.location(&dup));
        assert_eq!(forward.all_units(), backward.all_units());
    }

    #[test]
    fn test_concurrent_merges_of_distinct_files() {
        let hooks = JavaHooks::new();
        let index = AggregateIndex::new();
        std::thread::scope(|scope| {
            for worker in 0..8 {
                let (index, hooks) = (&index, &hooks);
                scope.spawn(move || {
                    let rel = format!("w{worker}/Shared.java");
                    let source = format!("package p; class Shared {{ int f{worker}; }}");
                    index.merge(&file(&rel), analyze(hooks, &rel, &source));
                });
            }
        });

        assert_eq!(index.file_count(), 8);
        let shared = index.lookup("p.Shared").unwrap();
        let mut fields: Vec<String> = fq_names(&index.children_of(&shared))
            .into_iter()
            .map(str::to_string)
            .collect();
        fields.sort();
        let expected: Vec<String> = (0..8).map(|w| format!("p.Shared.f{w}")).collect();
        assert_eq!(fields, expected);
        assert_eq!(index.location(&shared).map(|(f, _)| f), Some(file("w0/Shared.java")));
    }

    #[test]
    fn test_remerge_never_hides_kept_units() {
        let hooks = JavaHooks::new();
        let index = AggregateIndex::new();
        let a = file("A.java");
        let versions = [
            analyze(&hooks, "A.java", "class A { int x; }"),
            analyze(&hooks, "A.java", "class A { int x; int y; }"),
        ];
        index.merge(&a, versions[0].clone());

        let done = AtomicBool::new(false);
        std::thread::scope(|scope| {
            scope.spawn(|| {
                while !done.load(Ordering::Acquire) {
                    assert!(index.lookup("A").is_some());
                    assert!(index.lookup("A.x").is_some());
                    assert!(!index.top_level(&a).is_empty());
                    assert!(index.signature_of(&index.lookup("A").unwrap()).is_some());
                }
            });
            for round in 0..200 {
                index.merge(&a, versions[round % 2].clone());
            }
            done.store(true, Ordering::Release);
        });

        let class = index.lookup("A").unwrap();
        assert_eq!(fq_names(&index.children_of(&class)), vec!["A.x", "A.y"]);
    }

    #[test]
    fn test_remerge_updates_unit_kind() {
        let hooks = JavaHooks::new();
        let index = AggregateIndex::new();
        let a = file("A.java");
        index.merge(&a, analyze(&hooks, "A.java", "class A { int size; }"));
        assert!(index.lookup("A.size").unwrap().is_field());
        index.merge(&a, analyze(&hooks, "A.java", "class A { int size() { return 0; } }"));
        assert!(index.lookup("A.size").unwrap().is_function());
        assert_eq!(index.unit_count(), 2);
    }
}
