use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{Level, info};
use walkdir::WalkDir;
use xpak::PackArchive;

#[derive(Parser)]
#[command(
    name = "xpak",
    about = "Build, inspect, and extract obfuscated pack files",
    version,
    author
)]
struct Cli {
    /// Set the logging level
    #[arg(short, long, value_enum, default_value = "info")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build a new pack from a directory tree
    Pack {
        /// Directory to package
        input: PathBuf,
        /// Pack file to create
        archive: PathBuf,
    },
    /// Extract every entry of a pack into a directory
    Unpack {
        /// Pack file to read
        archive: PathBuf,
        /// Destination directory
        output: PathBuf,
    },
    /// List pack entries
    List {
        /// Pack file to read
        archive: PathBuf,
        /// Print offset, size, hash, and flags per entry
        #[arg(short, long)]
        verbose: bool,
    },
    /// Add or replace a single file in an existing pack
    Add {
        /// Pack file to modify
        archive: PathBuf,
        /// Path of the entry inside the pack
        path: String,
        /// Local file providing the content
        file: PathBuf,
        /// Extract the previous content here before replacing
        #[arg(long)]
        backup_dir: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(Level::from(cli.log_level))
        .with_target(false)
        .init();

    match cli.command {
        Commands::Pack { input, archive } => pack(&input, &archive),
        Commands::Unpack { archive, output } => unpack(&archive, &output),
        Commands::List { archive, verbose } => list(&archive, verbose),
        Commands::Add {
            archive,
            path,
            file,
            backup_dir,
        } => add(&archive, &path, &file, backup_dir.as_deref()),
    }
}

fn pack(input: &Path, archive_path: &Path) -> anyhow::Result<()> {
    if !input.is_dir() {
        bail!("input {:?} is not a directory", input);
    }

    let mut archive = PackArchive::create(archive_path)
        .with_context(|| format!("creating {archive_path:?}"))?;

    let mut files = 0usize;
    let mut directories = 0usize;
    for item in WalkDir::new(input).min_depth(1) {
        let item = item?;
        let rel = item
            .path()
            .strip_prefix(input)?
            .to_str()
            .with_context(|| format!("non-UTF-8 path {:?}", item.path()))?
            .to_owned();

        if item.file_type().is_dir() {
            archive.add_directory(&rel)?;
            directories += 1;
        } else if item.file_type().is_file() {
            let content = fs::read(item.path())
                .with_context(|| format!("reading {:?}", item.path()))?;
            archive.add_file(&rel, &content, None)?;
            files += 1;
        }
    }

    archive.finalize(false)?;
    info!("packed {files} files and {directories} directories into {archive_path:?}");
    Ok(())
}

fn unpack(archive_path: &Path, output: &Path) -> anyhow::Result<()> {
    let mut archive =
        PackArchive::open(archive_path).with_context(|| format!("opening {archive_path:?}"))?;
    fs::create_dir_all(output)?;
    archive.extract_all(output)?;
    info!("extracted {} entries to {output:?}", archive.len());
    Ok(())
}

fn list(archive_path: &Path, verbose: bool) -> anyhow::Result<()> {
    let archive =
        PackArchive::open(archive_path).with_context(|| format!("opening {archive_path:?}"))?;

    for entry in archive.entries() {
        if verbose {
            println!(
                "{}  off={} size={} hash={:016x} kind={}",
                entry.name, entry.file_offset, entry.file_size, entry.path_hash, entry.flags
            );
        } else {
            println!("{}", entry.name);
        }
    }
    Ok(())
}

fn add(
    archive_path: &Path,
    entry_path: &str,
    file: &Path,
    backup_dir: Option<&Path>,
) -> anyhow::Result<()> {
    let content = fs::read(file).with_context(|| format!("reading {file:?}"))?;

    let mut archive =
        PackArchive::open(archive_path).with_context(|| format!("opening {archive_path:?}"))?;
    let replacing = archive.exists(entry_path);
    archive.add_file(entry_path, &content, backup_dir)?;
    // Overwrite the table in place when nothing grew; the engine falls back
    // to appending otherwise.
    archive.finalize(true)?;

    info!(
        "{} {entry_path} ({} bytes) in {archive_path:?}",
        if replacing { "replaced" } else { "added" },
        content.len()
    );
    Ok(())
}
