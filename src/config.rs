//! Project configuration for codeskel.
//!
//! A configuration file is optional. Every field has a default, so an
//! empty YAML document is a valid configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};

/// Default configuration file names, searched in the project root.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["codeskel.yaml", ".codeskel.yaml"];

/// Directories that are never walked unless the configuration says otherwise.
const DEFAULT_SKIP_DIRS: &[&str] = &["node_modules", "target", "vendor", ".git", "build", "dist"];

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Glob patterns, relative to the project root, for paths to leave out.
    #[serde(default)]
    pub excluded_paths: Vec<String>,
    /// Languages to index by name. Empty means every supported language.
    #[serde(default)]
    pub languages: Vec<String>,
    /// Whether to walk directories whose name starts with a dot.
    #[serde(default)]
    pub include_hidden: bool,
    /// Directory names that are never walked.
    #[serde(default = "default_skip_dirs")]
    pub skip_dirs: Vec<String>,
}

fn default_skip_dirs() -> Vec<String> {
    DEFAULT_SKIP_DIRS.iter().map(|s| s.to_string()).collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            excluded_paths: Vec::new(),
            languages: Vec::new(),
            include_hidden: false,
            skip_dirs: default_skip_dirs(),
        }
    }
}

impl Config {
    /// Parse a configuration from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse_str(&content)
    }

    pub fn parse_str(content: &str) -> anyhow::Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Find a configuration file in `root`, if any.
    pub fn discover(root: &Path) -> Option<PathBuf> {
        DEFAULT_CONFIG_NAMES
            .iter()
            .map(|name| root.join(name))
            .find(|path| path.is_file())
    }

    /// Load the configuration for `root`: an explicit file, a discovered
    /// one, or the defaults.
    pub fn load(root: &Path, explicit: Option<&Path>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::parse_file(path),
            None => match Self::discover(root) {
                Some(path) => Self::parse_file(path),
                None => Ok(Self::default()),
            },
        }
    }

    /// Compile `excluded_paths` into a matcher.
    ///
    /// Invalid patterns are rejected here rather than silently skipped.
    pub fn exclusion_matcher(&self) -> anyhow::Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.excluded_paths {
            builder.add(Glob::new(pattern)?);
        }
        Ok(builder.build()?)
    }

    /// Whether a directory with this name should be skipped while walking.
    pub fn skips_dir(&self, name: &str) -> bool {
        if !self.include_hidden && name.starts_with('.') && name.len() > 1 {
            return true;
        }
        self.skip_dirs.iter().any(|d| d == name)
    }

    /// Whether the named language is enabled.
    pub fn language_enabled(&self, name: &str) -> bool {
        self.languages.is_empty()
            || self
                .languages
                .iter()
                .any(|l| l.eq_ignore_ascii_case(name))
    }
}
