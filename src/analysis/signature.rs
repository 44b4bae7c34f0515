//! Signature rendering and skeleton reconstruction.
//!
//! Signatures are stored flat: one declaration, no children, no
//! indentation. Skeletons are rebuilt from those signatures on demand by
//! walking the parent/child relation.

use std::collections::HashSet;

use tree_sitter::Node;

use super::code_unit::CodeUnit;
use super::profile::{LanguageSyntaxProfile, SkeletonKind};
use super::traits::{field_text, node_text, FunctionParts, LanguageHooks};

/// Marker standing in for members omitted from a header-only skeleton.
pub const ELISION_MARKER: &str = "[...]";

/// Render the stored signature for one definition.
///
/// Returns `None` when nothing printable could be produced; the caller
/// drops the definition in that case.
pub fn render_signature(
    hooks: &dyn LanguageHooks,
    kind: SkeletonKind,
    node: Node,
    simple_name: &str,
    source: &str,
) -> Option<String> {
    let content = hooks.definition_content(node);
    let decorators = hooks.decorators(node, content);
    let start = content_start(content, &decorators);
    let kind = match kind {
        SkeletonKind::Unsupported => hooks
            .profile()
            .node_kind(content.kind())
            .unwrap_or(SkeletonKind::Unsupported),
        kind => kind,
    };

    let rendered = match kind {
        SkeletonKind::ClassLike => render_class(hooks, content, start, source),
        SkeletonKind::FunctionLike => {
            render_function(hooks, content, start, simple_name, source)
        }
        SkeletonKind::FieldLike => {
            let prefix = hooks.visibility_prefix(content, source);
            slice(source, start, content.end_byte()).map(|text| apply_prefix(&prefix, text))
        }
        SkeletonKind::Unsupported => {
            tracing::debug!(
                "rendering {} at line {} as raw text",
                content.kind(),
                content.start_position().row + 1
            );
            slice(source, start, content.end_byte()).map(|s| s.to_string())
        }
    }?;

    if rendered.trim().is_empty() {
        return None;
    }

    let mut lines: Vec<String> = decorators
        .iter()
        .map(|d| node_text(*d, source).trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    lines.push(rendered);
    Some(lines.join("\n"))
}

/// Prepend `prefix` to `text`, skipping the trailing prefix words the
/// text already starts with.
pub fn apply_prefix(prefix: &str, text: &str) -> String {
    let words: Vec<&str> = prefix.split_whitespace().collect();
    for split in 0..words.len() {
        let tail = words[split..].join(" ");
        if starts_with_word(text, &tail) {
            return if split == 0 {
                text.to_string()
            } else {
                format!("{} {}", words[..split].join(" "), text)
            };
        }
    }
    if words.is_empty() {
        text.to_string()
    } else {
        format!("{} {}", words.join(" "), text)
    }
}

fn starts_with_word(text: &str, word: &str) -> bool {
    text.strip_prefix(word)
        .is_some_and(|rest| !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_'))
}

/// First byte of a definition after any decorators nested inside it.
fn content_start(content: Node, decorators: &[Node]) -> usize {
    decorators
        .iter()
        .filter(|d| d.start_byte() >= content.start_byte() && d.end_byte() <= content.end_byte())
        .map(|d| d.end_byte())
        .fold(content.start_byte(), usize::max)
}

fn slice(source: &str, start: usize, end: usize) -> Option<&str> {
    source.get(start..end).map(str::trim).filter(|s| !s.is_empty())
}

fn render_class(
    hooks: &dyn LanguageHooks,
    content: Node,
    start: usize,
    source: &str,
) -> Option<String> {
    let profile = hooks.profile();
    let end = content
        .child_by_field_name(profile.body_field)
        .map_or(content.end_byte(), |body| body.start_byte());
    let text = slice(source, start, end)?;
    let prefix = hooks.visibility_prefix(content, source);
    let signature = apply_prefix(&prefix, text);
    Some(hooks.render_class_header(content, source, &signature))
}

fn render_function(
    hooks: &dyn LanguageHooks,
    content: Node,
    start: usize,
    name: &str,
    source: &str,
) -> Option<String> {
    let profile = hooks.profile();
    let parameters = field_text(content, profile.parameters_field, source)
        .map(|p| p.to_string())
        .or_else(|| hooks.fallback_parameters(content, source));
    let Some(parameters) = parameters else {
        tracing::warn!(
            "{} `{}` at line {} has no parameter list, storing raw text",
            content.kind(),
            name,
            content.start_position().row + 1
        );
        return slice(source, start, content.end_byte()).map(|s| s.to_string());
    };

    let prefix = hooks.visibility_prefix(content, source);
    let parts = FunctionParts {
        node: content,
        source,
        prefix: &prefix,
        is_async: detect_async(profile, content),
        name,
        type_parameters: field_text(content, profile.type_parameters_field, source).unwrap_or(""),
        parameters: &parameters,
        return_type: field_text(content, profile.return_type_field, source).unwrap_or(""),
        has_body: content.child_by_field_name(profile.body_field).is_some(),
        placeholder: hooks.body_placeholder(),
    };
    Some(hooks.render_function(&parts))
}

/// Whether the declaration starts with the language's async keyword,
/// either directly or inside a leading modifier node.
fn detect_async(profile: &LanguageSyntaxProfile, node: Node) -> bool {
    let Some(keyword) = profile.async_keyword else {
        return false;
    };
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == keyword {
            return true;
        }
        if profile.is_modifier(child.kind()) {
            let mut inner = child.walk();
            if child.children(&mut inner).any(|c| c.kind() == keyword) {
                return true;
            }
            continue;
        }
        if child.is_named() {
            break;
        }
    }
    false
}

/// Read access to stored signatures and the parent/child relation.
pub trait SkeletonSource {
    fn signature(&self, unit: &CodeUnit) -> Option<String>;
    fn children(&self, unit: &CodeUnit) -> Vec<CodeUnit>;
}

/// Rebuild the nested skeleton text for `unit`.
///
/// With `header_only`, a class keeps its field members and an elision
/// marker replaces everything else.
pub fn reconstruct(
    source: &dyn SkeletonSource,
    hooks: &dyn LanguageHooks,
    unit: &CodeUnit,
    header_only: bool,
) -> Option<String> {
    let mut out = String::new();
    let mut visiting = HashSet::new();
    if !render_unit(source, hooks, unit, "", header_only, &mut visiting, &mut out) {
        return None;
    }
    Some(out.trim_end().to_string())
}

fn render_unit(
    source: &dyn SkeletonSource,
    hooks: &dyn LanguageHooks,
    unit: &CodeUnit,
    indent: &str,
    header_only: bool,
    visiting: &mut HashSet<CodeUnit>,
    out: &mut String,
) -> bool {
    let Some(signature) = source.signature(unit) else {
        return false;
    };
    for line in signature.lines() {
        out.push_str(indent);
        out.push_str(line);
        out.push('\n');
    }

    if !visiting.insert(unit.clone()) {
        return true;
    }

    let children = source.children(unit);
    let closer = hooks.closer(unit);
    if !children.is_empty() || (unit.is_class() && !closer.is_empty()) {
        let child_indent = format!("{}{}", indent, hooks.indent());
        let mut elided = false;
        for child in &children {
            if header_only && !child.is_field() {
                elided = true;
                continue;
            }
            render_unit(source, hooks, child, &child_indent, false, visiting, out);
        }
        if elided {
            out.push_str(&child_indent);
            out.push_str(ELISION_MARKER);
            out.push('\n');
        }
        if !closer.is_empty() {
            out.push_str(indent);
            out.push_str(closer);
            out.push('\n');
        }
    }

    visiting.remove(unit);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::code_unit::CodeUnitKind;
    use crate::analysis::languages::{JavaHooks, Language, PythonHooks};
    use crate::project::ProjectFile;
    use phf::{phf_map, phf_set};
    use std::collections::HashMap;
    use tree_sitter::Parser;

    #[derive(Default)]
    struct MapSource {
        signatures: HashMap<CodeUnit, String>,
        children: HashMap<CodeUnit, Vec<CodeUnit>>,
    }

    impl MapSource {
        fn add(&mut self, unit: &CodeUnit, signature: &str, parent: Option<&CodeUnit>) {
            self.signatures.insert(unit.clone(), signature.to_string());
            if let Some(parent) = parent {
                self.children
                    .entry(parent.clone())
                    .or_default()
                    .push(unit.clone());
            }
        }
    }

    impl SkeletonSource for MapSource {
        fn signature(&self, unit: &CodeUnit) -> Option<String> {
            self.signatures.get(unit).cloned()
        }

        fn children(&self, unit: &CodeUnit) -> Vec<CodeUnit> {
            self.children.get(unit).cloned().unwrap_or_default()
        }
    }

    fn unit(kind: CodeUnitKind, fq: &str) -> CodeUnit {
        CodeUnit::new(kind, fq).unwrap()
    }

    /// Java with a parameter field name the grammar never produces.
    static PARAMLESS: LanguageSyntaxProfile = LanguageSyntaxProfile {
        class_like: phf_set! { "class_declaration" },
        function_like: phf_set! { "method_declaration" },
        field_like: phf_set! { "field_declaration" },
        decorators: phf_set! {},
        modifiers: phf_set! { "modifiers" },
        namespaces: phf_set! {},
        identifier_field: "name",
        body_field: "body",
        parameters_field: "no_such_field",
        return_type_field: "type",
        type_parameters_field: "type_parameters",
        async_keyword: None,
        captures: phf_map! { "method.definition" => SkeletonKind::FunctionLike },
        ignored_captures: phf_set! {},
    };

    struct ParamlessJava(JavaHooks);

    impl LanguageHooks for ParamlessJava {
        fn language(&self) -> Language {
            self.0.language()
        }

        fn grammar(&self) -> tree_sitter::Language {
            self.0.grammar()
        }

        fn query_source(&self) -> &'static str {
            self.0.query_source()
        }

        fn profile(&self) -> &'static LanguageSyntaxProfile {
            &PARAMLESS
        }

        fn file_namespace(&self, file: &ProjectFile, root: Node, source: &str) -> String {
            self.0.file_namespace(file, root, source)
        }

        fn render_class_header(&self, node: Node, source: &str, signature: &str) -> String {
            self.0.render_class_header(node, source, signature)
        }

        fn render_function(&self, parts: &FunctionParts) -> String {
            self.0.render_function(parts)
        }
    }

    #[test]
    fn test_apply_prefix() {
        assert_eq!(apply_prefix("", "int x;"), "int x;");
        assert_eq!(apply_prefix("pub ", "pub x: i32"), "pub x: i32");
        assert_eq!(apply_prefix("export const ", "X = 1"), "export const X = 1");
        assert_eq!(
            apply_prefix("export abstract ", "abstract class Base"),
            "export abstract class Base"
        );
        assert_eq!(apply_prefix("pub ", "public_api: u8"), "pub public_api: u8");
    }

    #[test]
    fn test_reconstruct_nested_braces() {
        let point = unit(CodeUnitKind::Class, "Point");
        let inner = unit(CodeUnitKind::Class, "Point$Inner");
        let x = unit(CodeUnitKind::Field, "Point.x");
        let get_x = unit(CodeUnitKind::Function, "Point.getX");
        let mut source = MapSource::default();
        source.add(&point, "class Point {", None);
        source.add(&x, "int x;", Some(&point));
        source.add(&inner, "@Deprecated\nclass Inner {", Some(&point));
        source.add(&get_x, "int getX() { ... }", Some(&point));

        let skeleton = reconstruct(&source, &JavaHooks::new(), &point, false).unwrap();
        assert_eq!(
            skeleton,
            "class Point {\n  int x;\n  @Deprecated\n  class Inner {\n  }\n  int getX() { ... }\n}"
        );
    }

    #[test]
    fn test_reconstruct_header_only() {
        let point = unit(CodeUnitKind::Class, "Point");
        let x = unit(CodeUnitKind::Field, "Point.x");
        let get_x = unit(CodeUnitKind::Function, "Point.getX");
        let mut source = MapSource::default();
        source.add(&point, "class Point {", None);
        source.add(&x, "int x;", Some(&point));
        source.add(&get_x, "int getX() { ... }", Some(&point));

        let header = reconstruct(&source, &JavaHooks::new(), &point, true).unwrap();
        assert_eq!(header, "class Point {\n  int x;\n  [...]\n}");
    }

    #[test]
    fn test_reconstruct_indentation_language_has_no_closer() {
        let class = unit(CodeUnitKind::Class, "shapes.Circle");
        let area = unit(CodeUnitKind::Function, "shapes.Circle.area");
        let mut source = MapSource::default();
        source.add(&class, "class Circle:", None);
        source.add(&area, "def area(self): ...", Some(&class));

        let skeleton = reconstruct(&source, &PythonHooks::new(), &class, false).unwrap();
        assert_eq!(skeleton, "class Circle:\n  def area(self): ...");
    }

    #[test]
    fn test_reconstruct_is_idempotent_and_unknown_is_none() {
        let class = unit(CodeUnitKind::Class, "A");
        let mut source = MapSource::default();
        source.add(&class, "class A {", None);
        let hooks = JavaHooks::new();
        let first = reconstruct(&source, &hooks, &class, false);
        let second = reconstruct(&source, &hooks, &class, false);
        assert_eq!(first, second);
        assert_eq!(first.as_deref(), Some("class A {\n}"));
        assert!(reconstruct(&source, &hooks, &unit(CodeUnitKind::Class, "B"), false).is_none());
    }

    #[test]
    fn test_function_without_parameter_list_keeps_raw_text() {
        let hooks = ParamlessJava(JavaHooks::new());
        let source = "class A {\n    void run() {\n        go();\n    }\n}\n";
        let mut parser = Parser::new();
        parser.set_language(&hooks.grammar()).unwrap();
        let tree = parser.parse(source, None).unwrap();

        let class = tree.root_node().named_child(0).unwrap();
        let body = class.child_by_field_name("body").unwrap();
        let method = body.named_child(0).unwrap();
        assert_eq!(method.kind(), "method_declaration");

        let signature =
            render_signature(&hooks, SkeletonKind::FunctionLike, method, "run", source).unwrap();
        assert_eq!(signature, "void run() {\n        go();\n    }");

        let through_java =
            render_signature(&JavaHooks::new(), SkeletonKind::FunctionLike, method, "run", source);
        assert_eq!(through_java.as_deref(), Some("void run() { ... }"));

        let unmapped =
            render_signature(&JavaHooks::new(), SkeletonKind::Unsupported, method, "run", source);
        assert_eq!(unmapped, through_java);
    }
}
