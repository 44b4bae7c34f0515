//! Command-line interface for codeskel.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::analysis::{Analyzer, CodeUnit, Language, LanguageRegistry, MultiAnalyzer};
use crate::config::Config;
use crate::project::{FsProject, Project, ProjectFile};
use crate::report::{self, Format, SkeletonEntry, UnitEntry};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_NOT_FOUND: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Structural skeletons of source code.
///
/// Codeskel parses a project with tree-sitter and prints declarations with
/// their bodies elided: classes with nested members, function signatures
/// and fields, across Java, Python, JavaScript, TypeScript, Go and Rust.
#[derive(Parser)]
#[command(name = "codeskel")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print skeletons for a file, a symbol, or the whole project
    #[command(visible_alias = "skel")]
    Skeleton(SkeletonArgs),
    /// List classes
    Classes(ClassesArgs),
    /// Search declarations by name pattern
    Search(SearchArgs),
    /// List the direct members of a class
    Members(MembersArgs),
}

/// Options shared by every command.
#[derive(Args)]
pub struct CommonArgs {
    /// Project root directory
    pub path: PathBuf,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Only analyze this language (repeatable)
    #[arg(short, long)]
    pub language: Vec<String>,
}

/// Arguments for the skeleton command.
#[derive(Parser)]
pub struct SkeletonArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Only declarations in this file (relative to the project root or cwd)
    #[arg(long, conflicts_with = "symbol")]
    pub file: Option<PathBuf>,

    /// Only this fully qualified symbol
    #[arg(short, long)]
    pub symbol: Option<String>,

    /// Print headers only, eliding nested members
    #[arg(long)]
    pub header: bool,
}

/// Arguments for the classes command.
#[derive(Parser)]
pub struct ClassesArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Only classes declared in this file
    #[arg(long)]
    pub file: Option<PathBuf>,
}

/// Arguments for the search command.
#[derive(Parser)]
pub struct SearchArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Regular expression or plain substring, matched case-insensitively
    pub pattern: String,
}

/// Arguments for the members command.
#[derive(Parser)]
pub struct MembersArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Fully qualified class name
    pub class: String,
}

/// An analyzed project ready for queries.
struct Session {
    project: Arc<dyn Project>,
    analyzer: MultiAnalyzer,
    format: Format,
    display_path: String,
}

impl Session {
    fn entry(&self, unit: &CodeUnit) -> anyhow::Result<UnitEntry> {
        let file = self.analyzer.file_for(unit.fq_name())?;
        Ok(UnitEntry::new(unit, file.as_ref()))
    }

    fn entries(&self, units: &[CodeUnit]) -> anyhow::Result<Vec<UnitEntry>> {
        units.iter().map(|u| self.entry(u)).collect()
    }

    /// Entries located through the delegate that defines them.
    fn entries_in(
        &self,
        delegate: &dyn Analyzer,
        units: &[CodeUnit],
    ) -> anyhow::Result<Vec<UnitEntry>> {
        units
            .iter()
            .map(|u| Ok(UnitEntry::new(u, delegate.file_for(u.fq_name())?.as_ref())))
            .collect()
    }

    fn resolve_file(&self, path: &Path) -> anyhow::Result<ProjectFile> {
        resolve_file(self.project.root(), path)
    }
}

/// Validate common options, load configuration and index the project.
///
/// Returns `Ok(None)` after printing an error for invalid input.
fn open_session(common: &CommonArgs) -> anyhow::Result<Option<Session>> {
    let Some(format) = Format::parse(&common.format) else {
        eprintln!(
            "Error: invalid format {:?} (expected pretty or json)",
            common.format
        );
        return Ok(None);
    };

    if !common.path.is_dir() {
        eprintln!("Error: {} is not a directory", common.path.display());
        return Ok(None);
    }

    let mut config = Config::load(&common.path, common.config.as_deref())?;
    if !common.language.is_empty() {
        let mut languages = Vec::new();
        for name in &common.language {
            match Language::from_str(name) {
                Ok(language) => languages.push(language.name().to_string()),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return Ok(None);
                }
            }
        }
        config.languages = languages;
    }

    let registry = LanguageRegistry::with_defaults();
    let project: Arc<dyn Project> = Arc::new(FsProject::open(&common.path, config.clone())?);
    let analyzer = MultiAnalyzer::build(&registry, Arc::clone(&project), &config)?;

    Ok(Some(Session {
        display_path: common.path.display().to_string(),
        project,
        analyzer,
        format,
    }))
}

/// Map a path given on the command line to a project file.
///
/// Relative paths are tried against the project root first, then the
/// current directory.
pub fn resolve_file(root: &Path, path: &Path) -> anyhow::Result<ProjectFile> {
    let candidate = if path.is_absolute() {
        path.to_path_buf()
    } else if root.join(path).is_file() {
        root.join(path)
    } else {
        std::env::current_dir()?.join(path)
    };
    let abs = candidate
        .canonicalize()
        .map_err(|e| anyhow::anyhow!("cannot open {}: {}", path.display(), e))?;
    let rel = abs
        .strip_prefix(root)
        .map_err(|_| anyhow::anyhow!("{} is outside the project", path.display()))?;
    Ok(ProjectFile::new(Arc::from(root), rel))
}

fn exit_code_for(count: usize) -> i32 {
    if count == 0 {
        EXIT_NOT_FOUND
    } else {
        EXIT_SUCCESS
    }
}

/// Run the skeleton command.
pub fn run_skeleton(args: &SkeletonArgs) -> anyhow::Result<i32> {
    let Some(session) = open_session(&args.common)? else {
        return Ok(EXIT_ERROR);
    };
    let entries = collect_skeletons(&session, args)?;
    report::write_skeletons(session.format, &session.display_path, "skeleton", &entries)?;
    Ok(exit_code_for(entries.len()))
}

fn render(
    delegate: &dyn Analyzer,
    unit: &CodeUnit,
    header: bool,
) -> anyhow::Result<Option<String>> {
    let skeleton = if header {
        delegate.skeleton_header(unit.fq_name())?
    } else {
        delegate.skeleton(unit.fq_name())?
    };
    Ok(skeleton)
}

/// Skeletons for the requested symbol, file or whole project.
///
/// File queries render through the delegate owning each file and report
/// that file, so a name declared in several languages shows the
/// declaration actually asked for.
fn collect_skeletons(
    session: &Session,
    args: &SkeletonArgs,
) -> anyhow::Result<Vec<SkeletonEntry>> {
    let analyzer = &session.analyzer;
    let mut entries = Vec::new();

    if let Some(symbol) = &args.symbol {
        let Some(delegate) = analyzer.delegate_defining(symbol) else {
            return Ok(entries);
        };
        if let Some(unit) = delegate.definition(symbol)? {
            if let Some(skeleton) = render(delegate.as_ref(), &unit, args.header)? {
                let file = delegate.file_for(symbol)?;
                entries.push(SkeletonEntry {
                    unit: UnitEntry::new(&unit, file.as_ref()),
                    skeleton,
                });
            }
        }
        return Ok(entries);
    }

    let files = match &args.file {
        Some(path) => vec![session.resolve_file(path)?],
        None => {
            let mut files = session.project.all_files();
            files.sort();
            files
        }
    };
    for file in &files {
        let Some(delegate) = analyzer.delegate_for_file(file) else {
            continue;
        };
        for unit in delegate.top_level_declarations(file)? {
            if let Some(skeleton) = render(delegate.as_ref(), &unit, args.header)? {
                entries.push(SkeletonEntry {
                    unit: UnitEntry::new(&unit, Some(file)),
                    skeleton,
                });
            }
        }
    }
    Ok(entries)
}

/// Run the classes command.
pub fn run_classes(args: &ClassesArgs) -> anyhow::Result<i32> {
    let Some(session) = open_session(&args.common)? else {
        return Ok(EXIT_ERROR);
    };

    let classes: Vec<CodeUnit> = match &args.file {
        Some(path) => {
            let file = session.resolve_file(path)?;
            session.analyzer.classes_in_file(&file)?.into_iter().collect()
        }
        None => session.analyzer.all_classes()?,
    };

    let entries = session.entries(&classes)?;
    report::write_units(
        session.format,
        &session.display_path,
        "classes",
        "Classes",
        &entries,
    )?;
    Ok(exit_code_for(entries.len()))
}

/// Run the search command.
pub fn run_search(args: &SearchArgs) -> anyhow::Result<i32> {
    let Some(session) = open_session(&args.common)? else {
        return Ok(EXIT_ERROR);
    };

    let found = session.analyzer.search_definitions(&args.pattern)?;
    let entries = session.entries(&found)?;
    let title = format!("Matches for {:?}", args.pattern);
    report::write_units(
        session.format,
        &session.display_path,
        "search",
        &title,
        &entries,
    )?;
    Ok(exit_code_for(entries.len()))
}

/// Run the members command.
pub fn run_members(args: &MembersArgs) -> anyhow::Result<i32> {
    let Some(session) = open_session(&args.common)? else {
        return Ok(EXIT_ERROR);
    };

    let Some(delegate) = session.analyzer.delegate_defining(&args.class) else {
        eprintln!("Error: class {} not found", args.class);
        return Ok(EXIT_NOT_FOUND);
    };

    let members = delegate.members_in_class(&args.class)?;
    let entries = session.entries_in(delegate.as_ref(), &members)?;
    let title = format!("Members of {}", args.class);
    report::write_units(
        session.format,
        &session.display_path,
        "members",
        &title,
        &entries,
    )?;
    Ok(exit_code_for(entries.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_cli_parses_skeleton_options() {
        let cli = Cli::try_parse_from([
            "codeskel",
            "skeleton",
            "proj",
            "--symbol",
            "geo.Point",
            "--header",
            "-f",
            "json",
            "-l",
            "java",
        ])
        .unwrap();
        match cli.command {
            Commands::Skeleton(args) => {
                assert_eq!(args.symbol.as_deref(), Some("geo.Point"));
                assert!(args.header);
                assert_eq!(args.common.format, "json");
                assert_eq!(args.common.language, vec!["java".to_string()]);
            }
            _ => panic!("expected skeleton command"),
        }
    }

    #[test]
    fn test_file_and_symbol_conflict() {
        let result = Cli::try_parse_from([
            "codeskel", "skeleton", "proj", "--file", "A.java", "--symbol", "A",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_file_relative_to_root() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("geo")).unwrap();
        fs::write(dir.path().join("geo/Point.java"), "class Point {}").unwrap();
        let root = dir.path().canonicalize().unwrap();

        let file = resolve_file(&root, Path::new("geo/Point.java")).unwrap();
        assert_eq!(file.rel_path(), Path::new("geo/Point.java"));

        let file = resolve_file(&root, &root.join("geo/Point.java")).unwrap();
        assert_eq!(file.rel_path(), Path::new("geo/Point.java"));

        assert!(resolve_file(&root, Path::new("geo/Missing.java")).is_err());
    }

    #[test]
    fn test_invalid_format_is_an_error_exit() {
        let dir = TempDir::new().unwrap();
        let args = SearchArgs {
            common: CommonArgs {
                path: dir.path().to_path_buf(),
                format: "xml".to_string(),
                config: None,
                language: vec![],
            },
            pattern: "x".to_string(),
        };
        assert_eq!(run_search(&args).unwrap(), EXIT_ERROR);
    }

    #[test]
    fn test_unknown_language_is_an_error_exit() {
        let dir = TempDir::new().unwrap();
        let args = ClassesArgs {
            common: CommonArgs {
                path: dir.path().to_path_buf(),
                format: "json".to_string(),
                config: None,
                language: vec!["cobol".to_string()],
            },
            file: None,
        };
        assert_eq!(run_classes(&args).unwrap(), EXIT_ERROR);
    }

    #[test]
    fn test_search_exit_codes() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("shapes.py"),
            "class Circle:\n    def area(self):\n        return 0\n",
        )
        .unwrap();
        let common = || CommonArgs {
            path: dir.path().to_path_buf(),
            format: "json".to_string(),
            config: None,
            language: vec!["python".to_string()],
        };

        let hit = SearchArgs {
            common: common(),
            pattern: "area".to_string(),
        };
        assert_eq!(run_search(&hit).unwrap(), EXIT_SUCCESS);

        let miss = SearchArgs {
            common: common(),
            pattern: "volume".to_string(),
        };
        assert_eq!(run_search(&miss).unwrap(), EXIT_NOT_FOUND);
    }

    fn polyglot_session(dir: &TempDir) -> Session {
        fs::write(
            dir.path().join("geo.py"),
            "class Point:\n    def norm(self):\n        return 0\n",
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("src/geo")).unwrap();
        fs::write(
            dir.path().join("src/geo/Point.java"),
            "package geo;\n\nclass Point {\n    int x;\n}\n",
        )
        .unwrap();
        let common = CommonArgs {
            path: dir.path().to_path_buf(),
            format: "json".to_string(),
            config: None,
            language: vec![],
        };
        open_session(&common).unwrap().unwrap()
    }

    fn skeleton_args(file: Option<&str>, symbol: Option<&str>) -> SkeletonArgs {
        SkeletonArgs {
            common: CommonArgs {
                path: PathBuf::new(),
                format: "json".to_string(),
                config: None,
                language: vec![],
            },
            file: file.map(PathBuf::from),
            symbol: symbol.map(str::to_string),
            header: false,
        }
    }

    #[test]
    fn test_file_skeleton_uses_the_owning_language() {
        let dir = TempDir::new().unwrap();
        let session = polyglot_session(&dir);

        let python = collect_skeletons(&session, &skeleton_args(Some("geo.py"), None)).unwrap();
        assert_eq!(python.len(), 1);
        assert_eq!(python[0].unit.fq_name, "geo.Point");
        assert_eq!(python[0].unit.file.as_deref(), Some("geo.py"));
        assert!(python[0].skeleton.starts_with("class Point:"), "{}", python[0].skeleton);
        assert!(python[0].skeleton.contains("def norm(self)"));

        let java = collect_skeletons(&session, &skeleton_args(Some("src/geo/Point.java"), None))
            .unwrap();
        assert_eq!(java.len(), 1);
        assert_eq!(java[0].unit.file.as_deref(), Some("src/geo/Point.java"));
        assert!(java[0].skeleton.contains("int x;"), "{}", java[0].skeleton);
    }

    #[test]
    fn test_project_skeletons_report_each_declaring_file() {
        let dir = TempDir::new().unwrap();
        let session = polyglot_session(&dir);

        let entries = collect_skeletons(&session, &skeleton_args(None, None)).unwrap();
        let found: Vec<(Option<&str>, bool)> = entries
            .iter()
            .map(|e| (e.unit.file.as_deref(), e.skeleton.contains("def norm")))
            .collect();
        assert_eq!(
            found,
            vec![(Some("geo.py"), true), (Some("src/geo/Point.java"), false)]
        );

        let symbol = collect_skeletons(&session, &skeleton_args(None, Some("geo.Point"))).unwrap();
        assert_eq!(symbol.len(), 1);
        assert_eq!(symbol[0].unit.file.as_deref(), Some("src/geo/Point.java"));
        assert!(symbol[0].skeleton.contains("int x;"));
    }

    #[test]
    fn test_members_of_unknown_class() {
        let dir = TempDir::new().unwrap();
        let args = MembersArgs {
            common: CommonArgs {
                path: dir.path().to_path_buf(),
                format: "json".to_string(),
                config: None,
                language: vec![],
            },
            class: "geo.Nope".to_string(),
        };
        assert_eq!(run_members(&args).unwrap(), EXIT_NOT_FOUND);
    }
}
