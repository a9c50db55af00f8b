//! Command-line driver for the `pyff` semantic diff engine

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use colored::Colorize;
use pyff_core::render::{render, Style};
use pyff_core::{pyff_module_path, ModuleDiff};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "pyff",
    about = "Semantic diff for Python source, ignoring import-aliasing and formatting noise",
    version
)]
struct Cli {
    /// The old version: an existing Python file or directory
    old: PathBuf,

    /// The new version: an existing Python file or directory
    new: PathBuf,

    /// Recurse into subdirectories when comparing two directories
    #[arg(short, long)]
    recursive: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Emit results as JSON instead of colored text
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match run(&cli) {
        Ok(changed) => process::exit(if changed { 1 } else { 0 }),
        Err(e) => {
            eprintln!("{}: {e}", "error".red().bold());
            process::exit(2);
        }
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

struct FileReport {
    removed: BTreeSet<PathBuf>,
    added: BTreeSet<PathBuf>,
    changed: Vec<(PathBuf, ModuleDiff)>,
}

fn run(cli: &Cli) -> anyhow::Result<bool> {
    if !cli.old.exists() || !cli.new.exists() {
        anyhow::bail!("both OLD and NEW must exist");
    }

    let report = if cli.old.is_dir() && cli.new.is_dir() {
        compare_directories(&cli.old, &cli.new, cli.recursive)?
    } else if cli.old.is_file() && cli.new.is_file() {
        let mut changed = Vec::new();
        if let Some(diff) = pyff_module_path(&cli.old, &cli.new)? {
            changed.push((cli.new.clone(), diff));
        }
        FileReport {
            removed: BTreeSet::new(),
            added: BTreeSet::new(),
            changed,
        }
    } else {
        anyhow::bail!("OLD and NEW must both be directories or both be files");
    };

    let has_changes = !report.removed.is_empty() || !report.added.is_empty() || !report.changed.is_empty();

    if cli.json {
        print_json(&report);
    } else {
        print_text(&report, Style::Color);
    }

    Ok(has_changes)
}

fn discover_python_files(root: &Path, recursive: bool) -> std::io::Result<BTreeSet<PathBuf>> {
    let mut files = BTreeSet::new();
    if recursive {
        for entry in walkdir::WalkDir::new(root) {
            let entry = entry?;
            if entry.path().extension().is_some_and(|ext| ext == "py") {
                let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
                files.insert(relative.to_path_buf());
            }
        }
    } else {
        for entry in std::fs::read_dir(root)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "py") {
                let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
                files.insert(relative);
            }
        }
    }
    Ok(files)
}

fn compare_directories(old: &Path, new: &Path, recursive: bool) -> anyhow::Result<FileReport> {
    let old_files = discover_python_files(old, recursive)?;
    let new_files = discover_python_files(new, recursive)?;

    let removed: BTreeSet<PathBuf> = old_files.difference(&new_files).cloned().collect();
    let added: BTreeSet<PathBuf> = new_files.difference(&old_files).cloned().collect();

    let mut changed = Vec::new();
    for relative in old_files.intersection(&new_files) {
        let old_path = old.join(relative);
        let new_path = new.join(relative);
        tracing::debug!("comparing {} with {}", old_path.display(), new_path.display());
        if let Some(diff) = pyff_module_path(&old_path, &new_path)? {
            changed.push((relative.clone(), diff));
        }
    }

    Ok(FileReport {
        removed,
        added,
        changed,
    })
}

fn print_text(report: &FileReport, style: Style) {
    for path in &report.removed {
        println!("{}", render(&format!("Removed file {}", pyff_core::render::hl(path.display())), style));
    }
    for path in &report.added {
        println!("{}", render(&format!("New file {}", pyff_core::render::hl(path.display())), style));
    }
    for (path, diff) in &report.changed {
        println!(
            "{}",
            render(&format!("File {} changed:\n  {}", pyff_core::render::hl(path.display()), diff.to_string().replace('\n', "\n  ")), style)
        );
    }
    if report.removed.is_empty() && report.added.is_empty() && report.changed.is_empty() {
        println!("{}", "No changes found".green());
    }
}

fn print_json(report: &FileReport) {
    let removed: Vec<String> = report.removed.iter().map(|p| p.display().to_string()).collect();
    let added: Vec<String> = report.added.iter().map(|p| p.display().to_string()).collect();
    let changed: Vec<serde_json::Value> = report
        .changed
        .iter()
        .map(|(path, diff)| {
            json!({
                "file": path.display().to_string(),
                "diff": render(&diff.to_string(), Style::Plain),
            })
        })
        .collect();

    let output = json!({
        "removed": removed,
        "added": added,
        "changed": changed,
    });

    println!(
        "{}",
        serde_json::to_string_pretty(&output).expect("serde_json::Value is always serialisable")
    );
}
