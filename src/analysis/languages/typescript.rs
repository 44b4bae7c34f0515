//! TypeScript language hooks.

use phf::{phf_map, phf_set};
use tree_sitter::Node;

use super::javascript::{
    directory_namespace, es_fallback_parameters, es_render_function, es_visibility_prefix,
};
use super::Language;
use crate::analysis::code_unit::PackagePolicy;
use crate::analysis::profile::{LanguageSyntaxProfile, SkeletonKind};
use crate::analysis::traits::{FunctionParts, LanguageHooks};
use crate::project::ProjectFile;

const DECLARATION_QUERY: &str = r#"
; Classes, interfaces and enums
(class_declaration name: (type_identifier) @class.name) @class.definition
(abstract_class_declaration name: (type_identifier) @class.name) @class.definition
(interface_declaration name: (type_identifier) @class.name) @class.definition
(enum_declaration name: (identifier) @class.name) @class.definition

; Type aliases are kept verbatim
(type_alias_declaration name: (type_identifier) @alias.name) @alias.definition

; Functions at module level, exported or inside a namespace
(program (function_declaration name: (identifier) @function.name) @function.definition)
(program (function_signature name: (identifier) @function.name) @function.definition)
(export_statement
  declaration: (function_declaration name: (identifier) @function.name) @function.definition)
(export_statement
  declaration: (function_signature name: (identifier) @function.name) @function.definition)
(internal_module
  body: (statement_block
    (function_declaration name: (identifier) @function.name) @function.definition))

; Arrow functions and function expressions bound to a name
(program
  (lexical_declaration
    (variable_declarator
      name: (identifier) @function.name
      value: [(arrow_function) (function_expression)] @function.definition)))
(export_statement
  declaration: (lexical_declaration
    (variable_declarator
      name: (identifier) @function.name
      value: [(arrow_function) (function_expression)] @function.definition)))

; Class and interface members
(class_body (method_definition name: (property_identifier) @function.name) @function.definition)
(class_body (method_signature name: (property_identifier) @function.name) @function.definition)
(class_body
  (abstract_method_signature name: (property_identifier) @function.name) @function.definition)
(class_body (public_field_definition name: (property_identifier) @field.name) @field.definition)
(interface_declaration
  body: (_ (method_signature name: (property_identifier) @function.name) @function.definition))
(interface_declaration
  body: (_ (property_signature name: (property_identifier) @field.name) @field.definition))

; Module-level constants
(program
  (lexical_declaration
    (variable_declarator
      name: (identifier) @field.name
      value: [(number) (string) (template_string) (object) (array) (true) (false) (null)
              (identifier) (call_expression) (new_expression) (member_expression)
              (binary_expression) (unary_expression) (as_expression)]) @field.definition))
(export_statement
  declaration: (lexical_declaration
    (variable_declarator
      name: (identifier) @field.name
      value: [(number) (string) (template_string) (object) (array) (true) (false) (null)
              (identifier) (call_expression) (new_expression) (member_expression)
              (binary_expression) (unary_expression) (as_expression)]) @field.definition))
"#;

static PROFILE: LanguageSyntaxProfile = LanguageSyntaxProfile {
    class_like: phf_set! {
        "class_declaration",
        "abstract_class_declaration",
        "interface_declaration",
        "enum_declaration",
        "class",
    },
    function_like: phf_set! {
        "function_declaration",
        "function_signature",
        "method_definition",
        "method_signature",
        "abstract_method_signature",
        "arrow_function",
        "function_expression",
    },
    field_like: phf_set! { "variable_declarator", "public_field_definition", "property_signature" },
    decorators: phf_set! { "decorator" },
    modifiers: phf_set! {
        "accessibility_modifier",
        "override_modifier",
        "static",
        "readonly",
        "abstract",
    },
    namespaces: phf_set! { "internal_module" },
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

/// TypeScript: directory namespaces extended by `namespace` blocks.
pub struct TypeScriptHooks {
    language: tree_sitter::Language,
}

impl TypeScriptHooks {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        }
    }
}

impl Default for TypeScriptHooks {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageHooks for TypeScriptHooks {
    fn language(&self) -> Language {
        Language::TypeScript
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
        es_render_function(parts, true)
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
    fn test_namespace_blocks_extend_directory_namespace() {
        let source = r#"
namespace Geometry {
    export class Point {
        constructor(public x: number, public y: number) {}
    }

    export function origin(): Point {
        return new Point(0, 0);
    }
}
"#;
        let analysis = analyze(&TypeScriptHooks::new(), "lib/geo.ts", source);
        assert_eq!(
            fq_names(&analysis.top_level),
            vec!["lib.Geometry.Point", "lib.Geometry.origin"]
        );
        let point = &analysis.top_level[0];
        assert_eq!(point.package_name(), "lib.Geometry");
        assert_eq!(point.short_name(), "Point");
        assert_eq!(
            fq_names(&analysis.children[point]),
            vec!["lib.Geometry.Point.constructor"]
        );
    }

    #[test]
    fn test_interface_and_class_skeletons() {
        let source = r#"
export interface Shape {
    name: string;
    area(): number;
}

export type Id = string;

export abstract class Base implements Shape {
    private readonly name: string = "base";
    static count: number = 0;

    abstract area(): number;

    protected async load<T>(id: Id): Promise<T> {
        return null as any;
    }
}

export const scale = (s: Shape, k: number): number => s.area() * k;
"#;
        let hooks = TypeScriptHooks::new();
        let analysis = analyze(&hooks, "shapes.ts", source);
        assert_eq!(
            skeleton(&analysis, &hooks, "Shape"),
            "export interface Shape {\n  name: string\n  area(): number;\n}"
        );
        assert_eq!(
            skeleton(&analysis, &hooks, "Base"),
            "export abstract class Base implements Shape {\n  \
               private readonly name: string = \"base\"\n  \
               static count: number = 0\n  \
               abstract area(): number;\n  \
               protected async load<T>(id: Id): Promise<T> { ... }\n\
             }"
        );
        assert_eq!(skeleton(&analysis, &hooks, "Id"), "type Id = string;");
        assert_eq!(
            skeleton(&analysis, &hooks, "scale"),
            "export const scale = (s: Shape, k: number): number => { ... }"
        );
    }
}
