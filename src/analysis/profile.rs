//! Declarative per-language syntax configuration.

use std::fmt;

use tree_sitter::Query;

use super::error::{AnalyzerError, Result};

/// Suffix marking a query capture as a declaration.
pub const DEFINITION_SUFFIX: &str = ".definition";

/// Suffix marking the capture that carries a declaration's name.
pub const NAME_SUFFIX: &str = ".name";

/// How a captured declaration is rendered into a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkeletonKind {
    ClassLike,
    FunctionLike,
    FieldLike,
    Unsupported,
}

impl SkeletonKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkeletonKind::ClassLike => "class-like",
            SkeletonKind::FunctionLike => "function-like",
            SkeletonKind::FieldLike => "field-like",
            SkeletonKind::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for SkeletonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Node-kind classification and field bindings for one grammar.
///
/// Profiles are plain static data. The extraction pipeline and the
/// skeleton builder query them; nothing in a profile has behavior of its
/// own, so supporting a new language is a new profile plus a hook
/// implementation.
pub struct LanguageSyntaxProfile {
    pub class_like: phf::Set<&'static str>,
    pub function_like: phf::Set<&'static str>,
    pub field_like: phf::Set<&'static str>,
    pub decorators: phf::Set<&'static str>,
    pub modifiers: phf::Set<&'static str>,
    /// Ancestor kinds that open a namespace (TypeScript `namespace`, Rust `mod`).
    pub namespaces: phf::Set<&'static str>,

    pub identifier_field: &'static str,
    pub body_field: &'static str,
    pub parameters_field: &'static str,
    pub return_type_field: &'static str,
    pub type_parameters_field: &'static str,

    /// Node kind of the leading async keyword, if the language has one.
    pub async_keyword: Option<&'static str>,

    /// Capture name to skeleton kind.
    pub captures: phf::Map<&'static str, SkeletonKind>,
    /// Definition captures the query produces but the pipeline skips.
    pub ignored_captures: phf::Set<&'static str>,
}

impl LanguageSyntaxProfile {
    pub fn skeleton_kind(&self, capture_name: &str) -> Option<SkeletonKind> {
        self.captures.get(capture_name).copied()
    }

    pub fn is_ignored(&self, capture_name: &str) -> bool {
        self.ignored_captures.contains(capture_name)
    }

    /// Classify a node kind by the class, function and field sets.
    pub fn node_kind(&self, kind: &str) -> Option<SkeletonKind> {
        if self.class_like.contains(kind) {
            Some(SkeletonKind::ClassLike)
        } else if self.function_like.contains(kind) {
            Some(SkeletonKind::FunctionLike)
        } else if self.field_like.contains(kind) {
            Some(SkeletonKind::FieldLike)
        } else {
            None
        }
    }

    pub fn is_class_like(&self, kind: &str) -> bool {
        self.class_like.contains(kind)
    }

    pub fn is_namespace(&self, kind: &str) -> bool {
        self.namespaces.contains(kind)
    }

    pub fn is_decorator(&self, kind: &str) -> bool {
        self.decorators.contains(kind)
    }

    pub fn is_modifier(&self, kind: &str) -> bool {
        self.modifiers.contains(kind)
    }

    /// Check that the node-kind sets are disjoint and that every
    /// definition capture of `query` is mapped or ignored.
    pub fn validate(&self, language: &'static str, query: &Query) -> Result<()> {
        let overlap = self
            .class_like
            .iter()
            .find(|k| self.function_like.contains(**k) || self.field_like.contains(**k))
            .or_else(|| {
                self.function_like
                    .iter()
                    .find(|k| self.field_like.contains(**k))
            });
        if let Some(kind) = overlap {
            return Err(AnalyzerError::InvalidProfile {
                language,
                reason: format!("node kind {} is in more than one kind set", kind),
            });
        }

        for name in query.capture_names() {
            if !name.ends_with(DEFINITION_SUFFIX) {
                continue;
            }
            if self.captures.contains_key(*name) || self.is_ignored(name) {
                continue;
            }
            return Err(AnalyzerError::InvalidProfile {
                language,
                reason: format!("capture @{} has no skeleton kind", name),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phf::{phf_map, phf_set};

    static PROFILE: LanguageSyntaxProfile = LanguageSyntaxProfile {
        class_like: phf_set! { "class_declaration" },
        function_like: phf_set! { "method_declaration" },
        field_like: phf_set! { "field_declaration" },
        decorators: phf_set! {},
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
        },
        ignored_captures: phf_set! { "lambda.definition" },
    };

    fn java() -> tree_sitter::Language {
        tree_sitter_java::LANGUAGE.into()
    }

    #[test]
    fn test_lookup() {
        assert_eq!(
            PROFILE.skeleton_kind("class.definition"),
            Some(SkeletonKind::ClassLike)
        );
        assert_eq!(PROFILE.skeleton_kind("class.name"), None);
        assert!(PROFILE.is_class_like("class_declaration"));
        assert!(!PROFILE.is_class_like("method_declaration"));
        assert!(PROFILE.is_modifier("modifiers"));
    }

    #[test]
    fn test_node_kind_classification() {
        assert_eq!(PROFILE.node_kind("class_declaration"), Some(SkeletonKind::ClassLike));
        assert_eq!(PROFILE.node_kind("method_declaration"), Some(SkeletonKind::FunctionLike));
        assert_eq!(PROFILE.node_kind("field_declaration"), Some(SkeletonKind::FieldLike));
        assert_eq!(PROFILE.node_kind("modifiers"), None);
    }

    #[test]
    fn test_validate_rejects_overlapping_kind_sets() {
        static OVERLAPPING: LanguageSyntaxProfile = LanguageSyntaxProfile {
            class_like: phf_set! { "class_declaration" },
            function_like: phf_set! { "method_declaration" },
            field_like: phf_set! { "method_declaration", "field_declaration" },
            decorators: phf_set! {},
            modifiers: phf_set! {},
            namespaces: phf_set! {},
            identifier_field: "name",
            body_field: "body",
            parameters_field: "parameters",
            return_type_field: "type",
            type_parameters_field: "type_parameters",
            async_keyword: None,
            captures: phf_map! {},
            ignored_captures: phf_set! {},
        };
        let query = Query::new(&java(), "(class_declaration) @class.name").unwrap();
        let err = OVERLAPPING.validate("java", &query).unwrap_err();
        assert!(matches!(err, AnalyzerError::InvalidProfile { .. }));
        assert!(err.to_string().contains("method_declaration"));
    }

    #[test]
    fn test_validate_accepts_mapped_and_ignored_captures() {
        let query = Query::new(
            &java(),
            r#"
            (class_declaration name: (identifier) @class.name) @class.definition
            (lambda_expression) @lambda.definition
            "#,
        )
        .unwrap();
        assert!(PROFILE.validate("java", &query).is_ok());
    }

    #[test]
    fn test_validate_rejects_unmapped_definition() {
        let query = Query::new(
            &java(),
            "(field_declaration) @field.definition",
        )
        .unwrap();
        let err = PROFILE.validate("java", &query).unwrap_err();
        assert!(matches!(err, AnalyzerError::InvalidProfile { .. }));
        assert!(err.to_string().contains("@field.definition"));
    }
}
