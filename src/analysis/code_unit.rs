//! The uniform declaration model shared by every language.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use super::error::{AnalyzerError, Result};

/// Separator between a member and its enclosing scope.
pub const MEMBER_SEPARATOR: char = '.';

/// Separator between nested class names inside a class chain.
pub const CLASS_CHAIN_SEPARATOR: char = '$';

/// Kind of declaration a code unit represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeUnitKind {
    Class,
    Function,
    Field,
}

impl CodeUnitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeUnitKind::Class => "class",
            CodeUnitKind::Function => "function",
            CodeUnitKind::Field => "field",
        }
    }
}

impl fmt::Display for CodeUnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a language draws the line between namespace and type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackagePolicy {
    /// Leading uncapitalized components form the package.
    Capitalization,
    /// The naming hook knows the package and records it on the unit.
    Explicit,
}

/// A named declaration: a class, a function or a field.
///
/// Identity is the fully qualified name alone. Two units with the same
/// name compare equal whatever their kind, which is what lets duplicate
/// declarations of one symbol collapse during extraction.
#[derive(Debug, Clone)]
pub struct CodeUnit {
    kind: CodeUnitKind,
    fq_name: String,
    /// Byte length of an explicitly recorded package prefix.
    package_len: Option<usize>,
}

impl CodeUnit {
    /// Create a unit whose package is derived from capitalization.
    pub fn new(kind: CodeUnitKind, fq_name: impl Into<String>) -> Result<Self> {
        let fq_name = fq_name.into();
        if fq_name.is_empty() {
            return Err(AnalyzerError::InvalidCodeUnit(
                "fully qualified name must not be empty".to_string(),
            ));
        }
        Ok(Self {
            kind,
            fq_name,
            package_len: None,
        })
    }

    /// Create a unit with a known package boundary.
    pub fn in_package(kind: CodeUnitKind, package: &str, short_name: &str) -> Result<Self> {
        if short_name.is_empty() {
            return Err(AnalyzerError::InvalidCodeUnit(format!(
                "empty short name in package {:?}",
                package
            )));
        }
        let fq_name = if package.is_empty() {
            short_name.to_string()
        } else {
            format!("{}{}{}", package, MEMBER_SEPARATOR, short_name)
        };
        Ok(Self {
            kind,
            fq_name,
            package_len: Some(package.len()),
        })
    }

    /// Create a unit following the given package policy.
    pub fn build(
        kind: CodeUnitKind,
        package: &str,
        short_name: &str,
        policy: PackagePolicy,
    ) -> Result<Self> {
        match policy {
            PackagePolicy::Explicit => Self::in_package(kind, package, short_name),
            PackagePolicy::Capitalization if package.is_empty() => Self::new(kind, short_name),
            PackagePolicy::Capitalization => Self::new(
                kind,
                format!("{}{}{}", package, MEMBER_SEPARATOR, short_name),
            ),
        }
    }

    pub fn kind(&self) -> CodeUnitKind {
        self.kind
    }

    pub fn fq_name(&self) -> &str {
        &self.fq_name
    }

    pub fn is_class(&self) -> bool {
        self.kind == CodeUnitKind::Class
    }

    pub fn is_function(&self) -> bool {
        self.kind == CodeUnitKind::Function
    }

    pub fn is_field(&self) -> bool {
        self.kind == CodeUnitKind::Field
    }

    /// Last dot-separated component.
    pub fn name(&self) -> &str {
        match self.fq_name.rfind(MEMBER_SEPARATOR) {
            Some(idx) => &self.fq_name[idx + 1..],
            None => &self.fq_name,
        }
    }

    /// Package or namespace part of the name.
    ///
    /// Without an explicit boundary this is the longest run of leading
    /// components that do not start with an uppercase letter, never
    /// including the leaf itself.
    pub fn package_name(&self) -> &str {
        if let Some(len) = self.package_len {
            return &self.fq_name[..len];
        }
        let mut end = 0;
        let mut offset = 0;
        let leaf_start = self.fq_name.rfind(MEMBER_SEPARATOR).map_or(0, |i| i + 1);
        for component in self.fq_name[..leaf_start].split_terminator(MEMBER_SEPARATOR) {
            if component.chars().next().is_some_and(char::is_uppercase) {
                break;
            }
            offset += component.len();
            end = offset;
            offset += 1;
        }
        &self.fq_name[..end]
    }

    /// Name relative to the package.
    ///
    /// Classes yield the class name alone, members yield
    /// `<enclosing>.<member>` or just the member when there is no
    /// enclosing scope.
    pub fn short_name(&self) -> &str {
        let package = self.package_name();
        let rest = if package.is_empty() {
            self.fq_name.as_str()
        } else {
            &self.fq_name[package.len() + 1..]
        };
        match self.kind {
            CodeUnitKind::Class => rest.split(MEMBER_SEPARATOR).next().unwrap_or(rest),
            CodeUnitKind::Function | CodeUnitKind::Field => {
                let mut dots = rest.rmatch_indices(MEMBER_SEPARATOR).map(|(i, _)| i);
                dots.next();
                match dots.next() {
                    Some(idx) => &rest[idx + 1..],
                    None => rest,
                }
            }
        }
    }

    /// Unqualified identifier: the text after the last `.` or `$`.
    pub fn identifier(&self) -> &str {
        let short = self.short_name();
        match short.rfind(|c: char| c == MEMBER_SEPARATOR || c == CLASS_CHAIN_SEPARATOR) {
            Some(idx) => &short[idx + 1..],
            None => short,
        }
    }
}

impl PartialEq for CodeUnit {
    fn eq(&self, other: &Self) -> bool {
        self.fq_name == other.fq_name
    }
}

impl Eq for CodeUnit {}

impl Hash for CodeUnit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fq_name.hash(state);
    }
}

impl PartialOrd for CodeUnit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CodeUnit {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fq_name.cmp(&other.fq_name)
    }
}

impl fmt::Display for CodeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.kind.as_str().to_uppercase(), self.fq_name)
    }
}

impl Serialize for CodeUnit {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("CodeUnit", 4)?;
        state.serialize_field("kind", &self.kind)?;
        state.serialize_field("fq_name", &self.fq_name)?;
        state.serialize_field("short_name", self.short_name())?;
        state.serialize_field("package", self.package_name())?;
        state.end()
    }
}

/// Source location span with byte offsets and line positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    /// Start byte offset (0-indexed).
    pub start_byte: usize,
    /// End byte offset (0-indexed, exclusive).
    pub end_byte: usize,
    /// Start line (1-indexed).
    pub start_line: usize,
    /// End line (1-indexed).
    pub end_line: usize,
}

impl Span {
    /// Create a span from a tree-sitter node.
    pub fn from_node(node: tree_sitter::Node) -> Self {
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_line: node.start_position().row + 1, // tree-sitter is 0-indexed
            end_line: node.end_position().row + 1,
        }
    }

    pub fn contains_line(&self, line: usize) -> bool {
        self.start_line <= line && line <= self.end_line
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start_line, self.end_line)
    }
}
