//! JavaScript language hooks.
//!
//! The prefix and function rendering helpers here are shared with the
//! TypeScript hooks, whose grammar extends this one.

use phf::{phf_map, phf_set};
use tree_sitter::Node;

use super::Language;
use crate::analysis::code_unit::PackagePolicy;
use crate::analysis::profile::{LanguageSyntaxProfile, SkeletonKind};
use crate::analysis::traits::{field_text, node_text, FunctionParts, LanguageHooks};
use crate::project::ProjectFile;

const DECLARATION_QUERY: &str = r#"
; Classes
(program (class_declaration name: (identifier) @class.name) @class.definition)
(program
  (export_statement
    declaration: (class_declaration name: (identifier) @class.name) @class.definition))

; Functions
(program (function_declaration name: (identifier) @function.name) @function.definition)
(program
  (export_statement
    declaration: (function_declaration name: (identifier) @function.name) @function.definition))
(program
  (generator_function_declaration name: (identifier) @function.name) @function.definition)

; Arrow functions and function expressions bound to a name
(program
  (lexical_declaration
    (variable_declarator
      name: (identifier) @function.name
      value: [(arrow_function) (function_expression)] @function.definition)))
(program
  (export_statement
    declaration: (lexical_declaration
      (variable_declarator
        name: (identifier) @function.name
        value: [(arrow_function) (function_expression)] @function.definition))))

; Class members
(class_body (method_definition name: (property_identifier) @function.name) @function.definition)
(class_body (field_definition property: (property_identifier) @field.name) @field.definition)

; Module-level constants
(program
  (lexical_declaration
    (variable_declarator
      name: (identifier) @field.name
      value: [(number) (string) (template_string) (object) (array) (true) (false) (null)
              (identifier) (call_expression) (new_expression) (member_expression)
              (binary_expression) (unary_expression)]) @field.definition))
(program
  (export_statement
    declaration: (lexical_declaration
      (variable_declarator
        name: (identifier) @field.name
        value: [(number) (string) (template_string) (object) (array) (true) (false) (null)
                (identifier) (call_expression) (new_expression) (member_expression)
                (binary_expression) (unary_expression)]) @field.definition)))
"#;

static PROFILE: LanguageSyntaxProfile = LanguageSyntaxProfile {
    class_like: phf_set! { "class_declaration", "class" },
    function_like: phf_set! {
        "function_declaration",
        "generator_function_declaration",
        "method_definition",
        "arrow_function",
        "function_expression",
    },
    field_like: phf_set! { "variable_declarator", "field_definition" },
    decorators: phf_set! { "decorator" },
    modifiers: phf_set! { "static" },
    namespaces: phf_set! {},
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
    },
    ignored_captures: phf_set! {},
};

/// JavaScript: directory-based namespaces, `export` as the visibility marker.
pub struct JavaScriptHooks {
    language: tree_sitter::Language,
}

impl JavaScriptHooks {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_javascript::LANGUAGE.into(),
        }
    }
}

impl Default for JavaScriptHooks {
    fn default() -> Self {
        Self::new()
    }
}

/// Namespace from the file's directory, dot-joined.
pub(super) fn directory_namespace(file: &ProjectFile) -> String {
    file.parent_components().join(".")
}

/// `export `, `export default ` or "" depending on the wrapping statement.
fn export_prefix(node: Node) -> &'static str {
    match node.parent() {
        Some(parent) if parent.kind() == "export_statement" => {
            let mut cursor = parent.walk();
            let is_default = parent.children(&mut cursor).any(|c| c.kind() == "default");
            if is_default {
                "export default "
            } else {
                "export "
            }
        }
        _ => "",
    }
}

/// Prefix for ES-family declarations.
///
/// Values bound through `const`/`let`/`var` pick up the declaration
/// keyword and any export around it. Other declarations get `export`
/// from an enclosing export statement plus their own modifier tokens.
pub(super) fn es_visibility_prefix(
    profile: &LanguageSyntaxProfile,
    node: Node,
    source: &str,
) -> String {
    let declarator = match node.kind() {
        "variable_declarator" => Some(node),
        "arrow_function" | "function_expression" => node
            .parent()
            .filter(|p| p.kind() == "variable_declarator"),
        _ => None,
    };

    if let Some(declarator) = declarator {
        let Some(declaration) = declarator.parent() else {
            return String::new();
        };
        let keyword = declaration
            .child(0)
            .map(|k| node_text(k, source))
            .filter(|k| matches!(*k, "const" | "let" | "var"))
            .unwrap_or("");
        let mut prefix = export_prefix(declaration).to_string();
        if !keyword.is_empty() {
            prefix.push_str(keyword);
            prefix.push(' ');
        }
        return prefix;
    }

    let mut prefix = export_prefix(node).to_string();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if profile.is_modifier(child.kind()) {
            prefix.push_str(node_text(child, source).trim());
            prefix.push(' ');
        }
    }
    prefix
}

/// Assemble an ES-family function signature.
pub(super) fn es_render_function(parts: &FunctionParts, typed: bool) -> String {
    let async_kw = if parts.is_async { "async " } else { "" };
    let return_type = if typed && !parts.return_type.is_empty() {
        format!(": {}", parts.return_type.trim_start_matches(':').trim())
    } else {
        String::new()
    };
    let body = if parts.has_body {
        format!(" {{ {} }}", parts.placeholder)
    } else {
        ";".to_string()
    };

    match parts.node.kind() {
        "arrow_function" => format!(
            "{}{} = {}{}{}{} => {{ {} }}",
            parts.prefix,
            parts.name,
            async_kw,
            parts.type_parameters,
            parts.parameters,
            return_type,
            parts.placeholder
        ),
        "function_expression" => format!(
            "{}{} = {}function{}{}{}{}",
            parts.prefix,
            parts.name,
            async_kw,
            parts.type_parameters,
            parts.parameters,
            return_type,
            body
        ),
        "function_declaration" | "function_signature" | "generator_function_declaration" => {
            let star = if parts.node.kind() == "generator_function_declaration" {
                "*"
            } else {
                ""
            };
            format!(
                "{}{}function{} {}{}{}{}{}",
                parts.prefix,
                async_kw,
                star,
                parts.name,
                parts.type_parameters,
                parts.parameters,
                return_type,
                body
            )
        }
        _ => format!(
            "{}{}{}{}{}{}{}",
            parts.prefix,
            async_kw,
            parts.name,
            parts.type_parameters,
            parts.parameters,
            return_type,
            body
        ),
    }
}

/// Arrow functions with a single bare parameter have no parameter list.
pub(super) fn es_fallback_parameters(node: Node, source: &str) -> Option<String> {
    field_text(node, "parameter", source).map(|p| format!("({})", p))
}

impl LanguageHooks for JavaScriptHooks {
    fn language(&self) -> Language {
        Language::JavaScript
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
        directory_namespace(file)
    }

    fn visibility_prefix(&self, node: Node, source: &str) -> String {
        es_visibility_prefix(&PROFILE, node, source)
    }

    fn render_class_header(&self, _node: Node, _source: &str, signature: &str) -> String {
        format!("{} {{", signature)
    }

    fn render_function(&self, parts: &FunctionParts) -> String {
        es_render_function(parts, false)
    }

    fn fallback_parameters(&self, node: Node, source: &str) -> Option<String> {
        es_fallback_parameters(node, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::{analyze, fq_names, skeleton};

    #[test]
    fn test_top_level_declarations() {
        let source = r#"
import fs from "fs";

export const MAX = 10;
let counter = 0;

export function load(path) {
    return fs.readFileSync(path);
}

const double = x => x * 2;

export const fetchAll = async (urls, opts) => {
    return [];
};

function outer() {
    function inner() {}
    const local = 1;
}
"#;
        let hooks = JavaScriptHooks::new();
        let analysis = analyze(&hooks, "src/io/files.js", source);
        assert_eq!(
            fq_names(&analysis.top_level),
            vec![
                "src.io.MAX",
                "src.io.counter",
                "src.io.load",
                "src.io.double",
                "src.io.fetchAll",
                "src.io.outer",
            ]
        );
        let sig = |fq: &str| analysis.signatures[analysis.unit(fq).unwrap()].clone();
        assert_eq!(sig("src.io.MAX"), "export const MAX = 10");
        assert_eq!(sig("src.io.counter"), "let counter = 0");
        assert_eq!(sig("src.io.load"), "export function load(path) { ... }");
        assert_eq!(sig("src.io.double"), "const double = (x) => { ... }");
        assert_eq!(
            sig("src.io.fetchAll"),
            "export const fetchAll = async (urls, opts) => { ... }"
        );
    }

    #[test]
    fn test_class_skeleton() {
        let source = r#"
export class Counter extends Base {
    count = 0;
    static instances = 0;

    constructor(start) {
        super();
        this.count = start;
    }

    static create() {
        return new Counter(0);
    }

    async increment() {
        this.count++;
    }
}
"#;
        let hooks = JavaScriptHooks::new();
        let analysis = analyze(&hooks, "counter.js", source);
        assert_eq!(
            skeleton(&analysis, &hooks, "Counter"),
            "export class Counter extends Base {\n  \
               count = 0\n  \
               static instances = 0\n  \
               constructor(start) { ... }\n  \
               static create() { ... }\n  \
               async increment() { ... }\n\
             }"
        );
    }
}
