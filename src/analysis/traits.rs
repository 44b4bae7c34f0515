//! Core traits for language support.

use tree_sitter::{Node, Tree};

use super::code_unit::{CodeUnit, CodeUnitKind, PackagePolicy, CLASS_CHAIN_SEPARATOR, MEMBER_SEPARATOR};
use super::languages::Language;
use super::profile::{LanguageSyntaxProfile, SkeletonKind};
use crate::project::ProjectFile;

/// Holds a parsed tree-sitter tree and associated metadata.
pub struct ParsedFile {
    /// The tree-sitter parse tree.
    pub tree: Tree,
    /// Full source text of the file.
    pub source: String,
    /// The file the tree was parsed from.
    pub file: ProjectFile,
}

/// Text covered by `node`, or "" if the span is not valid UTF-8.
pub fn node_text<'s>(node: Node, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// Text of the child reached through `field`, if any.
pub fn field_text<'s>(node: Node, field: &str, source: &'s str) -> Option<&'s str> {
    node.child_by_field_name(field).map(|n| node_text(n, source))
}

/// Pieces of a function-like declaration handed to the rendering hook.
pub struct FunctionParts<'a> {
    /// The declaration node (after unwrapping).
    pub node: Node<'a>,
    pub source: &'a str,
    /// Visibility or export prefix, with a trailing space when non-empty.
    pub prefix: &'a str,
    pub is_async: bool,
    pub name: &'a str,
    pub type_parameters: &'a str,
    pub parameters: &'a str,
    pub return_type: &'a str,
    pub has_body: bool,
    /// Token standing in for an elided body.
    pub placeholder: &'a str,
}

/// Per-language hooks used by the extraction pipeline and skeleton builder.
///
/// The pipeline depends only on this trait. Each language supplies a
/// static [`LanguageSyntaxProfile`] plus the handful of naming and
/// rendering decisions the profile cannot express declaratively.
///
/// # Thread Safety
///
/// Implementations are shared read-only across rayon workers. Parsers
/// are never stored here; each worker creates its own.
pub trait LanguageHooks: Send + Sync {
    fn language(&self) -> Language;

    /// The tree-sitter grammar.
    fn grammar(&self) -> tree_sitter::Language;

    /// Declaration query source for this grammar.
    fn query_source(&self) -> &'static str;

    fn profile(&self) -> &'static LanguageSyntaxProfile;

    fn package_policy(&self) -> PackagePolicy {
        PackagePolicy::Capitalization
    }

    /// Namespace every declaration in this file starts from.
    ///
    /// Directory-based schemes derive it from the path; declaration-based
    /// schemes (Java `package`, Go `package`) read it from the tree.
    fn file_namespace(&self, file: &ProjectFile, root: Node, source: &str) -> String;

    /// Name contributed by a namespace ancestor such as a Rust `mod` block.
    fn namespace_segment(&self, node: Node, source: &str) -> Option<String> {
        field_text(node, self.profile().identifier_field, source).map(|s| s.to_string())
    }

    /// Structural fallback when the query did not capture a name.
    fn extract_simple_name(&self, node: Node, source: &str) -> Option<String> {
        field_text(node, self.profile().identifier_field, source)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Class chain for declarations that are not lexically nested in
    /// their owner, such as Go methods with a receiver.
    fn class_chain_override(&self, _node: Node, _source: &str) -> Option<String> {
        None
    }

    /// Build the code unit for a definition, or `None` to ignore it.
    fn create_code_unit(
        &self,
        _file: &ProjectFile,
        capture_name: &str,
        simple_name: &str,
        namespace: &str,
        class_chain: &str,
    ) -> Option<CodeUnit> {
        let kind = match self.profile().skeleton_kind(capture_name)? {
            SkeletonKind::ClassLike => CodeUnitKind::Class,
            SkeletonKind::FunctionLike => CodeUnitKind::Function,
            SkeletonKind::FieldLike | SkeletonKind::Unsupported => CodeUnitKind::Field,
        };
        let short_name = match (kind, class_chain.is_empty()) {
            (_, true) => simple_name.to_string(),
            (CodeUnitKind::Class, false) => {
                format!("{}{}{}", class_chain, CLASS_CHAIN_SEPARATOR, simple_name)
            }
            (_, false) => format!("{}{}{}", class_chain, MEMBER_SEPARATOR, simple_name),
        };
        CodeUnit::build(kind, namespace, &short_name, self.package_policy()).ok()
    }

    /// The node whose structure is rendered. Wrappers such as Python's
    /// `decorated_definition` unwrap to the inner declaration.
    fn definition_content<'t>(&self, node: Node<'t>) -> Node<'t> {
        node
    }

    /// Decorator nodes belonging to a definition, in source order.
    ///
    /// The default collects decorator siblings immediately preceding the
    /// definition and decorator children of the definition itself.
    fn decorators<'t>(&self, node: Node<'t>, content: Node<'t>) -> Vec<Node<'t>> {
        let profile = self.profile();
        let mut found = Vec::new();

        let mut prev = node.prev_named_sibling();
        while let Some(sibling) = prev {
            if !profile.is_decorator(sibling.kind()) {
                break;
            }
            found.push(sibling);
            prev = sibling.prev_named_sibling();
        }
        found.reverse();

        let mut holders = vec![node];
        if content.id() != node.id() {
            holders.push(content);
        }
        for holder in holders {
            let mut cursor = holder.walk();
            for child in holder.named_children(&mut cursor) {
                if profile.is_decorator(child.kind()) {
                    found.push(child);
                }
            }
        }
        found
    }

    /// Visibility or export prefix, with a trailing space when non-empty.
    fn visibility_prefix(&self, node: Node, source: &str) -> String {
        let profile = self.profile();
        let mut cursor = node.walk();
        let words: Vec<&str> = node
            .children(&mut cursor)
            .filter(|c| profile.is_modifier(c.kind()))
            .map(|c| node_text(c, source).trim())
            .filter(|t| !t.is_empty())
            .collect();
        if words.is_empty() {
            String::new()
        } else {
            format!("{} ", words.join(" "))
        }
    }

    /// Whether a rendered signature carries an explicit export marker.
    fn has_export_marker(&self, signature: &str) -> bool {
        signature
            .lines()
            .any(|l| l.trim_start().starts_with("export "))
    }

    /// Turn the sliced header text into the class's opening line.
    fn render_class_header(&self, node: Node, source: &str, signature: &str) -> String;

    /// Assemble the signature of a function-like declaration.
    fn render_function(&self, parts: &FunctionParts) -> String;

    /// Parameter text when the profile's parameters field is absent.
    fn fallback_parameters(&self, _node: Node, _source: &str) -> Option<String> {
        None
    }

    /// Placeholder rendered in place of an elided body.
    fn body_placeholder(&self) -> &'static str {
        "..."
    }

    /// Token that closes a unit's block, or "" for indentation languages.
    fn closer(&self, unit: &CodeUnit) -> &'static str {
        if unit.is_class() {
            "}"
        } else {
            ""
        }
    }

    /// One level of skeleton indentation.
    fn indent(&self) -> &'static str {
        "  "
    }
}
