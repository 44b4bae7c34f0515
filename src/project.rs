//! Project and file abstractions consumed by the analyzers.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::GlobSet;
use serde::{Serialize, Serializer};
use walkdir::WalkDir;

use crate::analysis::{AnalyzerError, Result};
use crate::config::Config;

/// A file inside a project, identified by its path relative to the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectFile {
    root: Arc<Path>,
    rel_path: PathBuf,
}

impl ProjectFile {
    pub fn new(root: impl Into<Arc<Path>>, rel_path: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            rel_path: rel_path.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn rel_path(&self) -> &Path {
        &self.rel_path
    }

    pub fn abs_path(&self) -> PathBuf {
        self.root.join(&self.rel_path)
    }

    /// File extension without the dot.
    pub fn extension(&self) -> Option<&str> {
        self.rel_path.extension().and_then(|e| e.to_str())
    }

    /// Name of the file without directories.
    pub fn file_name(&self) -> Option<&str> {
        self.rel_path.file_name().and_then(|n| n.to_str())
    }

    /// Path components of the parent directory, relative to the root.
    pub fn parent_components(&self) -> Vec<String> {
        self.rel_path
            .parent()
            .map(|p| {
                p.components()
                    .filter_map(|c| c.as_os_str().to_str())
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn exists(&self) -> bool {
        self.abs_path().is_file()
    }

    pub fn read_to_string(&self) -> Result<String> {
        let path = self.abs_path();
        fs::read_to_string(&path).map_err(|source| AnalyzerError::Io { path, source })
    }
}

impl fmt::Display for ProjectFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rel_path.display())
    }
}

impl Serialize for ProjectFile {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.rel_path.to_string_lossy())
    }
}

/// Source of project files for the analyzers.
pub trait Project: Send + Sync {
    /// Root directory all files are relative to.
    fn root(&self) -> &Path;

    /// Every file currently in the project.
    fn all_files(&self) -> Vec<ProjectFile>;

    /// Files whose extension is one of `extensions`, sorted.
    fn files_with_extensions(&self, extensions: &[&str]) -> Vec<ProjectFile> {
        let mut files: Vec<_> = self
            .all_files()
            .into_iter()
            .filter(|f| f.extension().is_some_and(|e| extensions.contains(&e)))
            .collect();
        files.sort();
        files
    }

    /// Whether `file` belongs to the project under its filtering rules.
    fn includes(&self, _file: &ProjectFile) -> bool {
        true
    }

    /// Read a file's text.
    fn read(&self, file: &ProjectFile) -> Result<String> {
        file.read_to_string()
    }

    /// Build a project file from a path that is absolute or relative to the root.
    fn file(&self, path: &Path) -> ProjectFile {
        let rel = path.strip_prefix(self.root()).unwrap_or(path);
        ProjectFile::new(Arc::from(self.root()), rel)
    }
}

/// A project backed by a directory on disk.
pub struct FsProject {
    root: Arc<Path>,
    config: Config,
    excluded: GlobSet,
}

impl FsProject {
    /// Open `root` with the given configuration.
    pub fn open<P: AsRef<Path>>(root: P, config: Config) -> anyhow::Result<Self> {
        let root = root.as_ref();
        let root = root
            .canonicalize()
            .map_err(|source| AnalyzerError::Io {
                path: root.to_path_buf(),
                source,
            })?;
        let excluded = config.exclusion_matcher()?;
        Ok(Self {
            root: Arc::from(root),
            config,
            excluded,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn is_excluded(&self, rel: &Path) -> bool {
        self.excluded.is_match(rel)
    }
}

impl Project for FsProject {
    fn root(&self) -> &Path {
        &self.root
    }

    /// Applies the same directory and glob rules as [`Project::all_files`].
    fn includes(&self, file: &ProjectFile) -> bool {
        let rel = file.rel_path();
        if rel.is_absolute() {
            return false;
        }
        !file
            .parent_components()
            .iter()
            .any(|dir| self.config.skips_dir(dir))
            && !self.is_excluded(rel)
    }

    fn all_files(&self) -> Vec<ProjectFile> {
        let mut files = Vec::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| {
                // Never filter the root itself
                if e.depth() == 0 || !e.file_type().is_dir() {
                    return true;
                }
                let name = e.file_name().to_string_lossy();
                !self.config.skips_dir(&name)
            });

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = match entry.path().strip_prefix(&self.root) {
                Ok(r) => r,
                Err(_) => continue,
            };
            if self.is_excluded(rel) {
                continue;
            }
            files.push(ProjectFile::new(self.root.clone(), rel));
        }

        files.sort();
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_project_file_parts() {
        let file = ProjectFile::new(PathBuf::from("/repo"), "src/geo/point.rs");
        assert_eq!(file.extension(), Some("rs"));
        assert_eq!(file.file_name(), Some("point.rs"));
        assert_eq!(file.parent_components(), vec!["src", "geo"]);
        assert_eq!(file.abs_path(), PathBuf::from("/repo/src/geo/point.rs"));
        assert_eq!(file.to_string(), "src/geo/point.rs");
    }

    #[test]
    fn test_walk_skips_and_excludes() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/main.rs", "fn main() {}");
        write(dir.path(), "src/gen/api.rs", "fn api() {}");
        write(dir.path(), "node_modules/x/index.js", "");
        write(dir.path(), ".hidden/a.py", "");
        write(dir.path(), "lib/util.py", "");

        let config = Config {
            excluded_paths: vec!["src/gen/**".to_string()],
            ..Config::default()
        };
        let project = FsProject::open(dir.path(), config).unwrap();
        let files: Vec<String> = project
            .all_files()
            .iter()
            .map(|f| f.rel_path().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(files, vec!["lib/util.py", "src/main.rs"]);

        let rust = project.files_with_extensions(&["rs"]);
        assert_eq!(rust.len(), 1);
        assert_eq!(project.read(&rust[0]).unwrap(), "fn main() {}");
    }

    #[test]
    fn test_includes_matches_walk_rules() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            excluded_paths: vec!["src/gen/**".to_string()],
            ..Config::default()
        };
        let project = FsProject::open(dir.path(), config).unwrap();
        let included = |rel: &str| project.includes(&project.file(Path::new(rel)));

        assert!(included("src/main.rs"));
        assert!(included("lib/util.py"));
        assert!(!included("src/gen/api.rs"));
        assert!(!included("node_modules/x/index.js"));
        assert!(!included(".hidden/a.py"));
        assert!(!included("/elsewhere/b.py"));
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let project = FsProject::open(dir.path(), Config::default()).unwrap();
        let missing = project.file(Path::new("nope.go"));
        assert!(matches!(
            project.read(&missing),
            Err(AnalyzerError::Io { .. })
        ));
    }

    #[test]
    fn test_file_from_absolute_path() {
        let dir = TempDir::new().unwrap();
        let project = FsProject::open(dir.path(), Config::default()).unwrap();
        let abs = project.root().join("pkg/mod.py");
        let file = project.file(&abs);
        assert_eq!(file.rel_path(), Path::new("pkg/mod.py"));
    }
}
