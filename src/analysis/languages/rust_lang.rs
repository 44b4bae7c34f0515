//! Rust language hooks.
//!
//! Methods are attached to the type named by their `impl` block, so
//! inherent and trait impls of `Point` all contribute members to `Point`.
//! `impl` blocks themselves never become code units.

use phf::{phf_map, phf_set};
use tree_sitter::Node;

use super::Language;
use crate::analysis::code_unit::PackagePolicy;
use crate::analysis::profile::{LanguageSyntaxProfile, SkeletonKind};
use crate::analysis::traits::{field_text, node_text, FunctionParts, LanguageHooks};
use crate::project::ProjectFile;

const DECLARATION_QUERY: &str = r#"
; Types
(source_file (struct_item name: (type_identifier) @class.name) @class.definition)
(declaration_list (struct_item name: (type_identifier) @class.name) @class.definition)
(source_file (enum_item name: (type_identifier) @class.name) @class.definition)
(declaration_list (enum_item name: (type_identifier) @class.name) @class.definition)
(source_file (trait_item name: (type_identifier) @class.name) @class.definition)
(declaration_list (trait_item name: (type_identifier) @class.name) @class.definition)
(source_file (union_item name: (type_identifier) @class.name) @class.definition)

; Type aliases are kept verbatim
(source_file (type_item name: (type_identifier) @alias.name) @alias.definition)
(declaration_list (type_item name: (type_identifier) @alias.name) @alias.definition)

; Free functions, methods and trait items
(source_file (function_item name: (identifier) @function.name) @function.definition)
(declaration_list (function_item name: (identifier) @function.name) @function.definition)
(declaration_list
  (function_signature_item name: (identifier) @function.name) @function.definition)

; Struct fields and enum variants
(struct_item
  body: (field_declaration_list
    (field_declaration name: (field_identifier) @field.name) @field.definition))
(union_item
  body: (field_declaration_list
    (field_declaration name: (field_identifier) @field.name) @field.definition))
(enum_item
  body: (enum_variant_list
    (enum_variant name: (identifier) @field.name) @field.definition))

; Constants and statics
(source_file (const_item name: (identifier) @field.name) @field.definition)
(declaration_list (const_item name: (identifier) @field.name) @field.definition)
(source_file (static_item name: (identifier) @field.name) @field.definition)
(declaration_list (static_item name: (identifier) @field.name) @field.definition)
"#;

static PROFILE: LanguageSyntaxProfile = LanguageSyntaxProfile {
    class_like: phf_set! {
        "struct_item",
        "enum_item",
        "trait_item",
        "union_item",
        "impl_item",
    },
    function_like: phf_set! { "function_item", "function_signature_item" },
    field_like: phf_set! {
        "field_declaration",
        "enum_variant",
        "const_item",
        "static_item",
    },
    decorators: phf_set! { "attribute_item" },
    modifiers: phf_set! { "visibility_modifier", "function_modifiers" },
    namespaces: phf_set! { "mod_item" },
    identifier_field: "name",
    body_field: "body",
    parameters_field: "parameters",
    return_type_field: "return_type",
    type_parameters_field: "type_parameters",
    async_keyword: Some("async"),
    captures: phf_map! {
        "class.definition" => SkeletonKind::ClassLike,
        "function.definition" => SkeletonKind::FunctionLike,
        "field.definition" => SkeletonKind::FieldLike,
        "alias.definition" => SkeletonKind::Unsupported,
    },
    ignored_captures: phf_set! {},
};

/// Rust: module path from the file's location under `src/`.
pub struct RustHooks {
    language: tree_sitter::Language,
}

impl RustHooks {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_rust::LANGUAGE.into(),
        }
    }
}

impl Default for RustHooks {
    fn default() -> Self {
        Self::new()
    }
}

/// Dotted module path: `src/net/http.rs` is `net.http`. Crate roots and
/// `mod.rs` files name their directory.
fn module_path(file: &ProjectFile) -> String {
    let mut parts = file.parent_components();
    if let Some(src) = parts.iter().rposition(|p| p == "src") {
        parts.drain(..=src);
    }
    let stem = file
        .rel_path()
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("");
    if !matches!(stem, "" | "lib" | "main" | "mod") {
        parts.push(stem.to_string());
    }
    parts.join(".")
}

/// Base name of an impl's self type: `impl<T> Stack<T>` gives `Stack`.
fn impl_type_name(node: Node, source: &str) -> Option<String> {
    let mut ty = node.child_by_field_name("type")?;
    loop {
        match ty.kind() {
            "generic_type" => ty = ty.child_by_field_name("type")?,
            "scoped_type_identifier" => ty = ty.child_by_field_name("name")?,
            "type_identifier" | "primitive_type" => {
                return Some(node_text(ty, source).to_string())
            }
            _ => return None,
        }
    }
}

fn child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|c| c.kind() == kind);
    found
}

impl LanguageHooks for RustHooks {
    fn language(&self) -> Language {
        Language::Rust
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

    fn file_namespace(&self, file: &ProjectFile, _root: Node, _source: &str) -> String {
        module_path(file)
    }

    fn extract_simple_name(&self, node: Node, source: &str) -> Option<String> {
        if node.kind() == "impl_item" {
            return impl_type_name(node, source);
        }
        field_text(node, PROFILE.identifier_field, source)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Only the `pub` part; function qualifiers are rendered with the
    /// signature itself.
    fn visibility_prefix(&self, node: Node, source: &str) -> String {
        child_of_kind(node, "visibility_modifier")
            .map(|v| format!("{} ", node_text(v, source).trim()))
            .unwrap_or_default()
    }

    fn has_export_marker(&self, signature: &str) -> bool {
        signature.lines().any(|l| {
            let l = l.trim_start();
            l.starts_with("pub ") || l.starts_with("pub(")
        })
    }

    fn render_class_header(&self, node: Node, source: &str, signature: &str) -> String {
        let tuple_body = node
            .child_by_field_name("body")
            .filter(|b| b.kind() == "ordered_field_declaration_list");
        let header = match tuple_body {
            Some(body) => format!("{}{}", signature, node_text(body, source)),
            None => signature.to_string(),
        };
        format!("{} {{", header.trim_end_matches(';').trim_end())
    }

    fn render_function(&self, parts: &FunctionParts) -> String {
        let mut out = String::from(parts.prefix);
        if let Some(qualifiers) = child_of_kind(parts.node, "function_modifiers") {
            out.push_str(node_text(qualifiers, parts.source).trim());
            out.push(' ');
        }
        out.push_str("fn ");
        out.push_str(parts.name);
        out.push_str(parts.type_parameters);
        out.push_str(parts.parameters);
        if !parts.return_type.is_empty() {
            out.push_str(" -> ");
            out.push_str(parts.return_type);
        }
        if let Some(clause) = child_of_kind(parts.node, "where_clause") {
            out.push(' ');
            out.push_str(node_text(clause, parts.source).trim());
        }
        if parts.has_body {
            out.push_str(&format!(" {{ {} }}", parts.placeholder));
        } else {
            out.push(';');
        }
        out
    }
}
