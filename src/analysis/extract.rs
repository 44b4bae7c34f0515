//! Declaration extraction for a single file.
//!
//! The pipeline runs the language's declaration query, resolves names,
//! namespaces and class nesting, and produces a self-contained
//! [`FileAnalysis`]. Nothing here touches shared state, so files can be
//! processed on any worker in any order.

use std::collections::{HashMap, HashSet};

use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Parser, Query, QueryCursor};

use super::code_unit::{CodeUnit, CodeUnitKind, Span, CLASS_CHAIN_SEPARATOR, MEMBER_SEPARATOR};
use super::profile::{SkeletonKind, DEFINITION_SUFFIX, NAME_SUFFIX};
use super::signature::{render_signature, SkeletonSource};
use super::traits::{node_text, LanguageHooks, ParsedFile};
use crate::project::ProjectFile;

/// Everything one file contributes to the aggregate index.
#[derive(Debug, Clone, Default)]
pub struct FileAnalysis {
    /// Declarations with no enclosing class, in source order.
    pub top_level: Vec<CodeUnit>,
    /// Immediate members per unit. Every unit of the file has an entry.
    pub children: HashMap<CodeUnit, Vec<CodeUnit>>,
    pub signatures: HashMap<CodeUnit, String>,
    pub spans: HashMap<CodeUnit, Span>,
    /// Every unit of the file, in source order.
    pub units: Vec<CodeUnit>,
}

impl FileAnalysis {
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Look up a unit of this file by fully qualified name.
    pub fn unit(&self, fq_name: &str) -> Option<&CodeUnit> {
        let probe = CodeUnit::new(CodeUnitKind::Class, fq_name).ok()?;
        self.signatures.get_key_value(&probe).map(|(k, _)| k)
    }

    fn add(
        &mut self,
        hooks: &dyn LanguageHooks,
        unit: CodeUnit,
        signature: String,
        span: Span,
        parent: Option<CodeUnit>,
    ) {
        if let Some(existing) = self.signatures.get(&unit) {
            if hooks.has_export_marker(&signature) && !hooks.has_export_marker(existing) {
                tracing::debug!("{} redeclared with export marker, keeping exported form", unit);
                self.replace_unit(unit, signature, span);
            } else if *existing != signature {
                tracing::warn!(
                    "duplicate definition of {} at line {}, keeping first",
                    unit,
                    span.start_line
                );
            }
            return;
        }

        self.signatures.insert(unit.clone(), signature);
        self.spans.insert(unit.clone(), span);
        self.children.entry(unit.clone()).or_default();
        match parent {
            Some(parent) => {
                let siblings = self.children.entry(parent).or_default();
                if !siblings.contains(&unit) {
                    siblings.push(unit.clone());
                }
            }
            None => self.top_level.push(unit.clone()),
        }
        self.units.push(unit);
    }
}

impl FileAnalysis {
    /// Swap in another declaration of an already recorded unit, keeping
    /// its place in the parent/child relation.
    fn replace_unit(&mut self, unit: CodeUnit, signature: String, span: Span) {
        let children = self.children.remove(&unit).unwrap_or_default();
        self.signatures.remove(&unit);
        self.spans.remove(&unit);

        for slot in self
            .units
            .iter_mut()
            .chain(self.top_level.iter_mut())
            .chain(self.children.values_mut().flatten())
        {
            if *slot == unit {
                *slot = unit.clone();
            }
        }

        self.children.insert(unit.clone(), children);
        self.signatures.insert(unit.clone(), signature);
        self.spans.insert(unit, span);
    }
}

impl SkeletonSource for FileAnalysis {
    fn signature(&self, unit: &CodeUnit) -> Option<String> {
        self.signatures.get(unit).cloned()
    }

    fn children(&self, unit: &CodeUnit) -> Vec<CodeUnit> {
        self.children.get(unit).cloned().unwrap_or_default()
    }
}

/// A definition matched by the query, before naming.
struct DeclarationRecord<'t> {
    node: Node<'t>,
    capture: &'t str,
    simple_name: String,
}

/// Create a parser for the hooks' grammar.
pub fn create_parser(hooks: &dyn LanguageHooks) -> super::Result<Parser> {
    let mut parser = Parser::new();
    parser.set_language(&hooks.grammar())?;
    Ok(parser)
}

/// Parse `source` and extract its declarations.
///
/// A parse failure yields an empty analysis for this file only.
pub fn analyze_source(
    hooks: &dyn LanguageHooks,
    query: &Query,
    parser: &mut Parser,
    file: &ProjectFile,
    source: String,
) -> FileAnalysis {
    let Some(tree) = parser.parse(&source, None) else {
        tracing::warn!("failed to parse {}", file);
        return FileAnalysis::default();
    };
    let parsed = ParsedFile {
        tree,
        source,
        file: file.clone(),
    };
    extract_declarations(hooks, query, &parsed)
}

/// Run the declaration pipeline over an already parsed file.
pub fn extract_declarations(
    hooks: &dyn LanguageHooks,
    query: &Query,
    parsed: &ParsedFile,
) -> FileAnalysis {
    let root = parsed.tree.root_node();
    let source = parsed.source.as_str();
    let profile = hooks.profile();
    let file_namespace = hooks.file_namespace(&parsed.file, root, source);

    let mut analysis = FileAnalysis::default();
    for record in collect_definitions(hooks, query, parsed) {
        let Some(kind) = profile.skeleton_kind(record.capture) else {
            continue;
        };
        let node_kind = hooks.definition_content(record.node).kind();
        if let Some(classified) = profile.node_kind(node_kind) {
            if kind != SkeletonKind::Unsupported && classified != kind {
                tracing::debug!(
                    "@{} is {} but {} nodes are {}",
                    record.capture,
                    kind,
                    node_kind,
                    classified
                );
            }
        }
        let namespace = namespace_path(hooks, record.node, source, &file_namespace);
        let class_chain = hooks
            .class_chain_override(record.node, source)
            .unwrap_or_else(|| class_chain(hooks, record.node, source));

        let Some(unit) = hooks.create_code_unit(
            &parsed.file,
            record.capture,
            &record.simple_name,
            &namespace,
            &class_chain,
        ) else {
            tracing::debug!(
                "ignoring @{} `{}` in {}",
                record.capture,
                record.simple_name,
                parsed.file
            );
            continue;
        };

        let Some(signature) =
            render_signature(hooks, kind, record.node, &record.simple_name, source)
        else {
            tracing::warn!("no signature for {} in {}, dropping it", unit, parsed.file);
            continue;
        };

        let parent = if class_chain.is_empty() {
            None
        } else {
            let parent_name = if namespace.is_empty() {
                class_chain.clone()
            } else {
                format!("{}{}{}", namespace, MEMBER_SEPARATOR, class_chain)
            };
            match analysis.unit(&parent_name) {
                Some(parent) => Some(parent.clone()),
                None => {
                    tracing::warn!(
                        "parent {} of {} not found in {}, treating it as top-level",
                        parent_name,
                        unit,
                        parsed.file
                    );
                    None
                }
            }
        };

        analysis.add(hooks, unit, signature, Span::from_node(record.node), parent);
    }
    analysis
}

/// Run the query and return distinct named definitions, outermost first.
fn collect_definitions<'t>(
    hooks: &dyn LanguageHooks,
    query: &'t Query,
    parsed: &'t ParsedFile,
) -> Vec<DeclarationRecord<'t>> {
    let profile = hooks.profile();
    let source = parsed.source.as_str();
    let capture_names = query.capture_names();

    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, parsed.tree.root_node(), source.as_bytes());

    let mut records = Vec::new();
    let mut seen = HashSet::new();

    while let Some(m) = matches.next() {
        let captured: HashMap<&str, Node<'t>> = m
            .captures
            .iter()
            .map(|c| (capture_names[c.index as usize], c.node))
            .collect();

        for capture in m.captures {
            let capture_name: &'t str = capture_names[capture.index as usize];
            let Some(prefix) = capture_name.strip_suffix(DEFINITION_SUFFIX) else {
                continue;
            };
            if profile.is_ignored(capture_name) || profile.skeleton_kind(capture_name).is_none() {
                continue;
            }
            let node = capture.node;
            if seen.contains(&node.id()) {
                continue;
            }

            let name_capture = format!("{}{}", prefix, NAME_SUFFIX);
            let simple_name = captured
                .get(name_capture.as_str())
                .map(|n| node_text(*n, source).trim().to_string())
                .filter(|s| !s.is_empty())
                .or_else(|| hooks.extract_simple_name(node, source));
            let Some(simple_name) = simple_name else {
                tracing::warn!(
                    "no name for @{} at {}:{}, skipping it",
                    capture_name,
                    parsed.file,
                    node.start_position().row + 1
                );
                continue;
            };

            seen.insert(node.id());
            records.push(DeclarationRecord {
                node,
                capture: capture_name,
                simple_name,
            });
        }
    }

    records.sort_by(|a, b| {
        a.node
            .start_byte()
            .cmp(&b.node.start_byte())
            .then(b.node.end_byte().cmp(&a.node.end_byte()))
    });
    records
}

/// File namespace extended by enclosing namespace constructs.
fn namespace_path(
    hooks: &dyn LanguageHooks,
    node: Node,
    source: &str,
    file_namespace: &str,
) -> String {
    let profile = hooks.profile();
    if profile.namespaces.is_empty() {
        return file_namespace.to_string();
    }

    let mut segments = Vec::new();
    let mut current = node.parent();
    while let Some(ancestor) = current {
        if profile.is_namespace(ancestor.kind()) {
            if let Some(segment) = hooks.namespace_segment(ancestor, source) {
                segments.push(segment);
            }
        }
        current = ancestor.parent();
    }
    segments.reverse();

    let mut parts = Vec::with_capacity(segments.len() + 1);
    if !file_namespace.is_empty() {
        parts.push(file_namespace.to_string());
    }
    parts.extend(segments);
    parts.join(".")
}

/// Names of enclosing class-like declarations, outermost first.
fn class_chain(hooks: &dyn LanguageHooks, node: Node, source: &str) -> String {
    let profile = hooks.profile();
    let mut names = Vec::new();
    let mut current = node.parent();
    while let Some(ancestor) = current {
        if profile.is_class_like(ancestor.kind()) {
            if let Some(name) = hooks.extract_simple_name(ancestor, source) {
                names.push(name);
            }
        }
        current = ancestor.parent();
    }
    names.reverse();
    names.join(&CLASS_CHAIN_SEPARATOR.to_string())
}
