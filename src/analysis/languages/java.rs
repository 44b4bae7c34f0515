//! Java language hooks.

use phf::{phf_map, phf_set};
use tree_sitter::Node;

use super::Language;
use crate::analysis::profile::{LanguageSyntaxProfile, SkeletonKind};
use crate::analysis::traits::{node_text, FunctionParts, LanguageHooks};
use crate::project::ProjectFile;

const DECLARATION_QUERY: &str = r#"
; Type declarations
(class_declaration name: (identifier) @class.name) @class.definition
(interface_declaration name: (identifier) @class.name) @class.definition
(enum_declaration name: (identifier) @class.name) @class.definition
(record_declaration name: (identifier) @class.name) @class.definition
(annotation_type_declaration name: (identifier) @class.name) @class.definition

; Methods and constructors
(method_declaration name: (identifier) @method.name) @method.definition
(constructor_declaration name: (identifier) @constructor.name) @constructor.definition

; Fields, interface constants and enum constants
(field_declaration
  declarator: (variable_declarator name: (identifier) @field.name)) @field.definition
(constant_declaration
  declarator: (variable_declarator name: (identifier) @field.name)) @field.definition
(enum_constant name: (identifier) @field.name) @field.definition
"#;

static PROFILE: LanguageSyntaxProfile = LanguageSyntaxProfile {
    class_like: phf_set! {
        "class_declaration",
        "interface_declaration",
        "enum_declaration",
        "record_declaration",
        "annotation_type_declaration",
    },
    function_like: phf_set! { "method_declaration", "constructor_declaration" },
    field_like: phf_set! { "field_declaration", "constant_declaration", "enum_constant" },
    decorators: phf_set! { "marker_annotation", "annotation" },
    modifiers: phf_set! { "modifiers" },
    namespaces: phf_set! {},
    identifier_field: "name",
    body_field: "body",
    parameters_field: "parameters",
    return_type_field: "type",
    type_parameters_field: "type_parameters",
    async_keyword: None,
    captures: phf_map! {
        "class.definition" => SkeletonKind::ClassLike,
        "method.definition" => SkeletonKind::FunctionLike,
        "constructor.definition" => SkeletonKind::FunctionLike,
        "field.definition" => SkeletonKind::FieldLike,
    },
    ignored_captures: phf_set! {},
};

/// Java: package from the `package` declaration, `{}`-delimited bodies.
pub struct JavaHooks {
    language: tree_sitter::Language,
}

impl JavaHooks {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_java::LANGUAGE.into(),
        }
    }

    fn modifiers<'t>(node: Node<'t>) -> Option<Node<'t>> {
        let mut cursor = node.walk();
        let found = node
            .named_children(&mut cursor)
            .find(|c| c.kind() == "modifiers");
        found
    }
}

impl Default for JavaHooks {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageHooks for JavaHooks {
    fn language(&self) -> Language {
        Language::Java
    }

    fn grammar(&self) -> tree_sitter::Language {
        self.language.clone()
    }

    fn query_source(&self) -> &'static str {
        DECLARATION_QUERY
    }

    fn profile(&self) -> &'static LanguageSyntaxProfile {
        &PROFILE
    }

    fn file_namespace(&self, _file: &ProjectFile, root: Node, source: &str) -> String {
        let mut cursor = root.walk();
        let package = root
            .named_children(&mut cursor)
            .find(|c| c.kind() == "package_declaration");
        let Some(package) = package else {
            return String::new();
        };
        let mut inner = package.walk();
        let name = package
            .named_children(&mut inner)
            .find(|c| matches!(c.kind(), "scoped_identifier" | "identifier"))
            .map(|n| node_text(n, source).to_string())
            .unwrap_or_default();
        name
    }

    /// Annotations live inside the `modifiers` node.
    fn decorators<'t>(&self, _node: Node<'t>, content: Node<'t>) -> Vec<Node<'t>> {
        let Some(modifiers) = Self::modifiers(content) else {
            return Vec::new();
        };
        let mut cursor = modifiers.walk();
        let annotations = modifiers
            .named_children(&mut cursor)
            .filter(|c| PROFILE.is_decorator(c.kind()))
            .collect();
        annotations
    }

    /// Keyword modifiers without annotations, e.g. `public static `.
    fn visibility_prefix(&self, node: Node, source: &str) -> String {
        let Some(modifiers) = Self::modifiers(node) else {
            return String::new();
        };
        let mut cursor = modifiers.walk();
        let words: Vec<&str> = modifiers
            .children(&mut cursor)
            .filter(|c| !PROFILE.is_decorator(c.kind()))
            .map(|c| node_text(c, source))
            .collect();
        if words.is_empty() {
            String::new()
        } else {
            format!("{} ", words.join(" "))
        }
    }

    fn has_export_marker(&self, signature: &str) -> bool {
        signature
            .lines()
            .any(|l| l.trim_start().starts_with("public "))
    }

    fn render_class_header(&self, _node: Node, _source: &str, signature: &str) -> String {
        format!("{} {{", signature)
    }

    fn render_function(&self, parts: &FunctionParts) -> String {
        let mut out = String::from(parts.prefix);
        if !parts.type_parameters.is_empty() {
            out.push_str(parts.type_parameters);
            out.push(' ');
        }
        if !parts.return_type.is_empty() {
            out.push_str(parts.return_type);
            out.push(' ');
        }
        out.push_str(parts.name);
        out.push_str(parts.parameters);
        if let Some(throws) = throws_clause(parts.node, parts.source) {
            out.push(' ');
            out.push_str(throws);
        }
        if parts.has_body {
            out.push_str(&format!(" {{ {} }}", parts.placeholder));
        } else {
            out.push(';');
        }
        out
    }
}

/// The `throws ...` clause of a method or constructor.
fn throws_clause<'s>(node: Node, source: &'s str) -> Option<&'s str> {
    let mut cursor = node.walk();
    let throws = node
        .children(&mut cursor)
        .find(|c| c.kind() == "throws")?;
    Some(node_text(throws, source).trim())
}
