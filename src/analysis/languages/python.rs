//! Python language hooks.

use phf::{phf_map, phf_set};
use tree_sitter::Node;

use super::Language;
use crate::analysis::code_unit::{CodeUnit, PackagePolicy};
use crate::analysis::profile::{LanguageSyntaxProfile, SkeletonKind};
use crate::analysis::traits::{FunctionParts, LanguageHooks};
use crate::project::ProjectFile;

const DECLARATION_QUERY: &str = r#"
; Module-level classes and functions
(module
  (class_definition name: (identifier) @class.name) @class.definition)
(module
  (decorated_definition
    definition: (class_definition name: (identifier) @class.name)) @class.definition)
(module
  (function_definition name: (identifier) @function.name) @function.definition)
(module
  (decorated_definition
    definition: (function_definition name: (identifier) @function.name)) @function.definition)

; Class members
(class_definition
  body: (block
    (class_definition name: (identifier) @class.name) @class.definition))
(class_definition
  body: (block
    (decorated_definition
      definition: (class_definition name: (identifier) @class.name)) @class.definition))
(class_definition
  body: (block
    (function_definition name: (identifier) @function.name) @function.definition))
(class_definition
  body: (block
    (decorated_definition
      definition: (function_definition name: (identifier) @function.name)) @function.definition))

; Module and class attributes
(module
  (expression_statement
    (assignment left: (identifier) @field.name) @field.definition))
(class_definition
  body: (block
    (expression_statement
      (assignment left: (identifier) @field.name) @field.definition)))
"#;

static PROFILE: LanguageSyntaxProfile = LanguageSyntaxProfile {
    class_like: phf_set! { "class_definition" },
    function_like: phf_set! { "function_definition" },
    field_like: phf_set! { "assignment" },
    decorators: phf_set! { "decorator" },
    modifiers: phf_set! {},
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

/// Python: module path from the file path, indentation-delimited bodies.
pub struct PythonHooks {
    language: tree_sitter::Language,
}

impl PythonHooks {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_python::LANGUAGE.into(),
        }
    }
}

impl Default for PythonHooks {
    fn default() -> Self {
        Self::new()
    }
}

/// Dotted module path: `pkg/sub/mod.py` is `pkg.sub.mod`, a package's
/// `__init__.py` is the package itself.
fn module_path(file: &ProjectFile) -> String {
    let mut parts = file.parent_components();
    let stem = file
        .rel_path()
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("");
    if stem != "__init__" && !stem.is_empty() {
        parts.push(stem.to_string());
    }
    parts.join(".")
}

impl LanguageHooks for PythonHooks {
    fn language(&self) -> Language {
        Language::Python
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

    fn definition_content<'t>(&self, node: Node<'t>) -> Node<'t> {
        if node.kind() == "decorated_definition" {
            if let Some(definition) = node.child_by_field_name("definition") {
                return definition;
            }
        }
        node
    }

    fn render_class_header(&self, _node: Node, _source: &str, signature: &str) -> String {
        if signature.ends_with(':') {
            signature.to_string()
        } else {
            format!("{}:", signature)
        }
    }

    fn render_function(&self, parts: &FunctionParts) -> String {
        let mut out = String::new();
        if parts.is_async {
            out.push_str("async ");
        }
        out.push_str("def ");
        out.push_str(parts.name);
        out.push_str(parts.type_parameters);
        out.push_str(parts.parameters);
        if !parts.return_type.is_empty() {
            out.push_str(" -> ");
            out.push_str(parts.return_type);
        }
        out.push_str(": ");
        out.push_str(parts.placeholder);
        out
    }

    fn closer(&self, _unit: &CodeUnit) -> &'static str {
        ""
    }
}
