//! # Burrow CLI
//!
//! Command-line front end for the burrow backup library.
//!
//! ## Usage
//! ```bash
//! # Create a backup archive from the built-in manifest
//! burrow create
//!
//! # Create and push it to the remote backups folder
//! burrow create --upload
//!
//! # Restore the latest remote archive
//! burrow apply
//!
//! # Restore a specific archive, plain files only
//! burrow apply home-alice-backup-20260806-143005.tar.gz --steps "before clone"
//!
//! # List the restore steps in order
//! burrow steps
//! ```

use burrow::{
    builtin_step_names, paths, BackupSet, Burrow, CloneTarget, DirStore, FolderSelection,
    GitCloner, PathAddition, PathRemoval, Result, SetRegistry,
};
use clap::{Parser, Subcommand};
use colored::*;
use humantime::format_duration;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Burrow CLI - back up and restore one home directory
#[derive(Parser)]
#[command(name = "burrow")]
#[command(version)]
#[command(about = "Personal configuration backup and restore")]
struct Cli {
    /// Remote backups directory (a synced drive mount)
    #[arg(short, long, global = true)]
    remote: Option<PathBuf>,

    /// Backup sets to activate (comma-separated; defaults to all)
    #[arg(long, global = true)]
    sets: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a backup archive
    Create {
        /// Upload the archive to the remote backups folder
        #[arg(long)]
        upload: bool,
    },

    /// Apply a backup archive to this machine
    Apply {
        /// Archive file name (defaults to the latest remote archive)
        archive: Option<String>,

        /// Steps to run, comma-separated (defaults to all, in order)
        #[arg(long)]
        steps: Option<String>,
    },

    /// List the restore steps in order
    Steps,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Create { upload } => cmd_create(cli.remote, cli.sets, upload),
        Commands::Apply { archive, steps } => {
            cmd_apply(cli.remote, cli.sets, archive, steps)
        }
        Commands::Steps => cmd_steps(),
    }
}

/// Create a backup archive, optionally shipping it to the remote folder
fn cmd_create(remote: Option<PathBuf>, sets: Option<String>, upload: bool) -> Result<()> {
    let burrow = open_burrow(remote)?;
    let manifest = active_manifest(sets)?;

    println!("{}", "Creating backup...".blue().bold());
    let spinner = start_spinner("Mirroring files...");
    let report = burrow.create(&manifest);
    spinner.finish_and_clear();
    let report = report?;

    println!(
        "{} Created backup {}",
        "✓".green().bold(),
        report.archive.yellow().bold()
    );
    println!("  Entries: {}", report.entries_copied.to_string().cyan());
    println!(
        "  Time: {}",
        format_duration(Duration::from_millis(report.duration_ms))
            .to_string()
            .cyan()
    );
    print_warnings(&report.warnings);

    if upload {
        let spinner = start_spinner("Uploading...");
        let remote_path = burrow.upload_archive(&report.archive);
        spinner.finish_and_clear();
        let remote_path = remote_path?;
        println!(
            "{} Uploaded to {}",
            "✓".green().bold(),
            remote_path.cyan()
        );
    }

    Ok(())
}

/// Apply an archive to the live system
fn cmd_apply(
    remote: Option<PathBuf>,
    sets: Option<String>,
    archive: Option<String>,
    steps: Option<String>,
) -> Result<()> {
    let burrow = open_burrow(remote)?;
    let manifest = active_manifest(sets)?;
    let requested = split_list(steps.as_deref());

    match &archive {
        Some(name) => println!("{} {}", "Applying backup".blue().bold(), name.yellow()),
        None => println!("{}", "Applying latest remote backup...".blue().bold()),
    }

    let spinner = start_spinner("Restoring files...");
    let report = burrow.apply(&manifest, archive.as_deref(), &requested);
    spinner.finish_and_clear();
    let report = report?;

    println!(
        "{} Applied {}",
        "✓".green().bold(),
        report.archive.yellow().bold()
    );
    println!("  Steps: {}", report.steps_run.join(", ").cyan());
    println!(
        "  Files restored: {}",
        report.files_restored.to_string().cyan()
    );
    println!(
        "  Originals snapshotted: {}",
        report.originals_snapshotted.to_string().cyan()
    );
    if report.preserved > 0 {
        println!("  Preserved: {}", report.preserved.to_string().cyan());
    }
    if report.removed > 0 {
        println!("  Removed: {}", report.removed.to_string().yellow());
    }
    println!(
        "  Time: {}",
        format_duration(Duration::from_millis(report.duration_ms))
            .to_string()
            .cyan()
    );
    print_warnings(&report.warnings);

    Ok(())
}

/// List the built-in restore steps in their fixed order
fn cmd_steps() -> Result<()> {
    println!("{}", "Restore steps (in order):".blue().bold());
    for (index, name) in builtin_step_names().iter().enumerate() {
        println!("  {}. {}", index + 1, name.cyan());
    }
    Ok(())
}

// Helper functions

/// Build the burrow handle with the CLI's remote override applied.
fn open_burrow(remote: Option<PathBuf>) -> Result<Burrow> {
    let home = paths::home_dir()?;
    let mut builder = Burrow::builder()
        .home(home.clone())
        .cloner(Box::new(GitCloner::new(clone_targets(&home))));
    if let Some(root) = remote {
        builder = builder.remote_store(Box::new(DirStore::new(root)));
    }
    builder.build()
}

/// Register the built-in sets and flatten the requested selection.
fn active_manifest(sets: Option<String>) -> Result<burrow::FlatManifest> {
    let mut registry = SetRegistry::new();
    let mut all_names = Vec::new();
    for set in builtin_sets() {
        all_names.push(set.name.clone());
        registry.register(set);
    }

    let requested = split_list(sets.as_deref());
    if requested.is_empty() {
        registry.activate(&all_names);
    } else {
        registry.activate(&requested);
    }
    registry.flatten()
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

fn start_spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn print_warnings(warnings: &[String]) {
    if warnings.is_empty() {
        return;
    }
    println!("\n{}", "Warnings:".yellow().bold());
    for warning in warnings {
        println!("  - {}", warning.yellow());
    }
}

// Compiled-in manifest data

/// The backup sets this machine is managed with.
fn builtin_sets() -> Vec<BackupSet> {
    vec![
        BackupSet {
            name: "core".into(),
            description: "Shell, git identity, input and ssh material".into(),
            folders: Vec::new(),
            adds: vec![
                add("~/.gitconfig", false),
                add("~/.ssh", true),
                add("~/.zshrc", false),
                add("~/.XCompose", true),
                add("/etc/prime-discrete", true),
            ],
            removes: vec![
                remove("~/.bash_history"),
                remove("~/.bash_logout"),
                remove("~/.bashrc"),
            ],
        },
        BackupSet {
            name: "editor".into(),
            description: "Zed editor configuration".into(),
            folders: vec![FolderSelection {
                base: "~/.config/zed".into(),
                contents: vec![
                    "keymap.json".into(),
                    "settings.json".into(),
                    "themes/ask-dark+.json".into(),
                ],
            }],
            adds: Vec::new(),
            removes: Vec::new(),
        },
        BackupSet {
            name: "projects".into(),
            description: "Project secrets kept outside git".into(),
            folders: Vec::new(),
            adds: vec![
                add("~/burrow/.env", false),
                add("~/github.com/alice-bnuy/alicebot/.env", false),
                add("~/Desktop/github.com/alice-bnuy/discordcore/.env", false),
            ],
            removes: Vec::new(),
        },
    ]
}

fn add(path: &str, preserve_existing: bool) -> PathAddition {
    PathAddition {
        path: path.into(),
        preserve_existing,
    }
}

fn remove(path: &str) -> PathRemoval {
    PathRemoval { path: path.into() }
}

/// The repositories the clone step provisions.
fn clone_targets(home: &Path) -> Vec<CloneTarget> {
    vec![
        CloneTarget::new(home, "alice-bnuy", "tools", "main"),
        CloneTarget::new(home, "alice-bnuy", "burrow", "main"),
        CloneTarget::new(home, "RedBearAK", "Toshy", "main"),
        CloneTarget::new(home.join("github.com"), "alice-bnuy", "alicebot", "main"),
        CloneTarget::new(
            home.join("Desktop/github.com"),
            "ekshmr",
            "simonewebsite",
            "main",
        ),
        CloneTarget::new(
            home.join("Desktop/github.com"),
            "alice-bnuy",
            "discordcore",
            "alice-main",
        ),
        CloneTarget::new(
            home.join("Desktop/github.com"),
            "alice-bnuy",
            "errutil",
            "alice-main",
        ),
        CloneTarget::new(
            home.join("Desktop/github.com"),
            "alice-bnuy",
            "greenhousebot",
            "alice-main",
        ),
        CloneTarget::new(
            home.join("Desktop/github.com"),
            "alice-bnuy",
            "gitutils",
            "alice-main",
        ),
        CloneTarget::new(
            home.join("Desktop/github.com"),
            "alice-bnuy",
            "logutil",
            "alice-main",
        ),
    ]
}
