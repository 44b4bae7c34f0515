//! Go language hooks.

use phf::{phf_map, phf_set};
use tree_sitter::Node;

use super::Language;
use crate::analysis::code_unit::PackagePolicy;
use crate::analysis::profile::{LanguageSyntaxProfile, SkeletonKind};
use crate::analysis::traits::{field_text, node_text, FunctionParts, LanguageHooks};
use crate::project::ProjectFile;

const DECLARATION_QUERY: &str = r#"
; Struct and interface types
(type_declaration
  (type_spec
    name: (type_identifier) @class.name
    type: [(struct_type) (interface_type)]) @class.definition)

; Functions and methods
(function_declaration name: (identifier) @function.name) @function.definition
(method_declaration name: (field_identifier) @method.name) @method.definition

; Fields of named struct types
(type_spec
  type: (struct_type
    (field_declaration_list
      (field_declaration name: (field_identifier) @field.name) @field.definition)))

; Package-level constants and variables
(source_file (const_declaration (const_spec name: (identifier) @field.name) @field.definition))
(source_file (var_declaration (var_spec name: (identifier) @field.name) @field.definition))
"#;

static PROFILE: LanguageSyntaxProfile = LanguageSyntaxProfile {
    class_like: phf_set! { "type_spec" },
    function_like: phf_set! { "function_declaration", "method_declaration" },
    field_like: phf_set! { "field_declaration", "const_spec", "var_spec" },
    decorators: phf_set! {},
    modifiers: phf_set! {},
    namespaces: phf_set! {},
    identifier_field: "name",
    body_field: "body",
    parameters_field: "parameters",
    return_type_field: "result",
    type_parameters_field: "type_parameters",
    async_keyword: None,
    captures: phf_map! {
        "class.definition" => SkeletonKind::ClassLike,
        "function.definition" => SkeletonKind::FunctionLike,
        "method.definition" => SkeletonKind::FunctionLike,
        "field.definition" => SkeletonKind::FieldLike,
    },
    ignored_captures: phf_set! {},
};

/// Go: package clause namespaces, methods attached through their receiver.
pub struct GoHooks {
    language: tree_sitter::Language,
}

impl GoHooks {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_go::LANGUAGE.into(),
        }
    }
}

impl Default for GoHooks {
    fn default() -> Self {
        Self::new()
    }
}

/// Base type name of a method receiver: `(p *Point[T])` gives `Point`.
fn receiver_type(method: Node, source: &str) -> Option<String> {
    let receiver = method.child_by_field_name("receiver")?;
    let parameter = receiver.named_child(0)?;
    let mut ty = parameter.child_by_field_name("type")?;
    loop {
        match ty.kind() {
            "pointer_type" => ty = ty.named_child(0)?,
            "generic_type" => ty = ty.child_by_field_name("type")?,
            "type_identifier" => return Some(node_text(ty, source).to_string()),
            _ => return None,
        }
    }
}

impl LanguageHooks for GoHooks {
    fn language(&self) -> Language {
        Language::Go
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

    fn package_policy(&self) -> PackagePolicy {
        PackagePolicy::Explicit
    }

    fn file_namespace(&self, _file: &ProjectFile, root: Node, source: &str) -> String {
        let mut cursor = root.walk();
        let clause = root
            .named_children(&mut cursor)
            .find(|c| c.kind() == "package_clause");
        clause
            .and_then(|c| c.named_child(0))
            .map(|n| node_text(n, source).to_string())
            .unwrap_or_default()
    }

    fn class_chain_override(&self, node: Node, source: &str) -> Option<String> {
        if node.kind() == "method_declaration" {
            receiver_type(node, source)
        } else {
            None
        }
    }

    fn visibility_prefix(&self, node: Node, _source: &str) -> String {
        match node.kind() {
            "const_spec" => "const ".to_string(),
            "var_spec" => "var ".to_string(),
            _ => String::new(),
        }
    }

    /// Exported Go identifiers are capitalized.
    fn has_export_marker(&self, signature: &str) -> bool {
        signature
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .find(|w| !w.is_empty() && !matches!(*w, "func" | "type" | "const" | "var"))
            .and_then(|w| w.chars().next())
            .is_some_and(char::is_uppercase)
    }

    fn render_class_header(&self, node: Node, source: &str, signature: &str) -> String {
        let keyword = match node.child_by_field_name("type").map(|t| t.kind()) {
            Some("struct_type") => "struct",
            Some("interface_type") => "interface",
            _ => return format!("type {}", signature),
        };
        let name = field_text(node, "name", source).unwrap_or("");
        let type_parameters = field_text(node, "type_parameters", source).unwrap_or("");
        format!("type {}{} {} {{", name, type_parameters, keyword)
    }

    fn render_function(&self, parts: &FunctionParts) -> String {
        let mut out = String::from("func ");
        if let Some(receiver) = field_text(parts.node, "receiver", parts.source) {
            out.push_str(receiver);
            out.push(' ');
        }
        out.push_str(parts.name);
        out.push_str(parts.type_parameters);
        out.push_str(parts.parameters);
        if !parts.return_type.is_empty() {
            out.push(' ');
            out.push_str(parts.return_type);
        }
        if parts.has_body {
            out.push_str(&format!(" {{ {} }}", parts.placeholder));
        }
        out
    }
}
