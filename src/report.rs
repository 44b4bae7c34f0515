//! Output formatting for codeskel results.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption

use colored::*;
use serde::Serialize;

use crate::analysis::{CodeUnit, CodeUnitKind};
use crate::project::ProjectFile;

/// Output format selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Pretty,
    Json,
}

impl Format {
    pub fn parse(s: &str) -> Option<Format> {
        match s {
            "pretty" => Some(Format::Pretty),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

/// One declaration in a listing.
#[derive(Debug, Clone, Serialize)]
pub struct UnitEntry {
    pub fq_name: String,
    pub kind: CodeUnitKind,
    pub short_name: String,
    pub package: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl UnitEntry {
    pub fn new(unit: &CodeUnit, file: Option<&ProjectFile>) -> Self {
        Self {
            fq_name: unit.fq_name().to_string(),
            kind: unit.kind(),
            short_name: unit.short_name().to_string(),
            package: unit.package_name().to_string(),
            file: file.map(|f| f.to_string()),
        }
    }
}

/// One rendered skeleton.
#[derive(Debug, Clone, Serialize)]
pub struct SkeletonEntry {
    #[serde(flatten)]
    pub unit: UnitEntry,
    pub skeleton: String,
}

// =============================================================================
// JSON Format
// =============================================================================

/// Envelope shared by every JSON report.
#[derive(Serialize)]
pub struct JsonReport<'a, T: Serialize> {
    pub version: &'static str,
    pub path: &'a str,
    pub command: &'a str,
    pub count: usize,
    pub results: &'a [T],
}

pub fn write_json<T: Serialize>(path: &str, command: &str, results: &[T]) -> anyhow::Result<()> {
    let report = JsonReport {
        version: env!("CARGO_PKG_VERSION"),
        path,
        command,
        count: results.len(),
        results,
    };
    let json = serde_json::to_string_pretty(&report)?;
    println!("{}", json);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

fn write_banner(path: &str) {
    println!();
    print!("{}", "codeskel".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();
    print!("  {}", "Project: ".dimmed());
    println!("{}", path);
    println!();
}

fn colored_kind(kind: CodeUnitKind) -> ColoredString {
    let label = format!("{:<8}", kind.as_str());
    match kind {
        CodeUnitKind::Class => label.blue().bold(),
        CodeUnitKind::Function => label.green(),
        CodeUnitKind::Field => label.yellow(),
    }
}

/// Print skeletons, each under a header naming the unit and its file.
pub fn write_skeletons_pretty(path: &str, entries: &[SkeletonEntry]) {
    write_banner(path);
    if entries.is_empty() {
        println!("  {}", "No declarations found.".dimmed());
        println!();
        return;
    }
    for entry in entries {
        print!("  {} {}", colored_kind(entry.unit.kind), entry.unit.fq_name.bold());
        if let Some(file) = &entry.unit.file {
            print!("  {}", file.dimmed());
        }
        println!();
        println!();
        for line in entry.skeleton.lines() {
            println!("    {}", line);
        }
        println!();
    }
}

/// Print a titled list of declarations.
pub fn write_units_pretty(path: &str, title: &str, entries: &[UnitEntry]) {
    write_banner(path);
    println!("  {} ({}):", title.bold(), entries.len());
    println!();
    if entries.is_empty() {
        println!("    {}", "(none)".dimmed());
    }
    for entry in entries {
        print!("    {} {}", colored_kind(entry.kind), entry.fq_name);
        if let Some(file) = &entry.file {
            print!("  {}", file.dimmed());
        }
        println!();
    }
    println!();
}

pub fn write_skeletons(
    format: Format,
    path: &str,
    command: &str,
    entries: &[SkeletonEntry],
) -> anyhow::Result<()> {
    match format {
        Format::Json => write_json(path, command, entries),
        Format::Pretty => {
            write_skeletons_pretty(path, entries);
            Ok(())
        }
    }
}

pub fn write_units(
    format: Format,
    path: &str,
    command: &str,
    title: &str,
    entries: &[UnitEntry],
) -> anyhow::Result<()> {
    match format {
        Format::Json => write_json(path, command, entries),
        Format::Pretty => {
            write_units_pretty(path, title, entries);
            Ok(())
        }
    }
}
