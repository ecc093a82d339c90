//! sefmt - Inspect Serious Engine asset files
//!
//! This tool decodes animations, meshes, skeletons, fonts, models, worlds and
//! engine-2 metadata into structured trees and prints them as JSON, as an
//! indented outline, or as a one-line summary per file.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, ValueEnum};
use sefmt_core::config::DEFAULT_MAX_ELEMENTS;
use sefmt_core::value::walk;
use sefmt_core::{Decoded, Decoder, DecoderConfig, FormatKind, StatsVisitor, TreeRenderer};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Decode Serious Engine binary assets into structured trees
#[derive(Parser, Debug)]
#[command(name = "sefmt")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    input: InputMode,

    /// Decode as this format instead of guessing from the extension
    /// (ba, bae, bm, bs, fnt, mdl, wld, tex)
    #[arg(long)]
    format: Option<FormatKind>,

    /// Output style
    #[arg(short, long, value_enum, default_value = "tree")]
    output: OutputMode,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Largest element count accepted for any single list in a file
    #[arg(long, default_value_t = DEFAULT_MAX_ELEMENTS)]
    max_elements: usize,

    /// Let a corrupt trailing world chunk end the chunk list instead of failing
    #[arg(long)]
    lenient_world_chunks: bool,

    /// Decode the attribute groups that follow legacy (v11/v12) mesh LODs
    #[arg(long)]
    legacy_mesh_groups: bool,

    /// Sequence elements printed per list in tree output (0 = all)
    #[arg(long, default_value = "16")]
    max_items: usize,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputMode {
    /// Path to a single asset file
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path to a directory of assets to decode recursively
    #[arg(short, long)]
    directory: Option<PathBuf>,
}

/// How decoded trees are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputMode {
    /// Pretty JSON for a single file, one JSON object per line for directories
    Json,
    /// Indented outline
    Tree,
    /// One line per file with the format and node counts
    Summary,
}

impl Cli {
    fn decoder_config(&self) -> DecoderConfig {
        DecoderConfig::new()
            .max_elements(self.max_elements)
            .lenient_world_chunks(self.lenient_world_chunks)
            .legacy_mesh_groups(self.legacy_mesh_groups)
    }
}

/// Tracks file contents already decoded in this run
#[derive(Default)]
struct SeenFiles {
    /// Maps content hash -> first path with that content
    seen: HashMap<blake3::Hash, PathBuf>,
    /// Statistics
    stats: RunStats,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct RunStats {
    decoded: usize,
    failed: usize,
    duplicates_skipped: usize,
}

impl SeenFiles {
    fn new() -> Self {
        Self::default()
    }

    fn content_hash(content: &[u8]) -> blake3::Hash {
        blake3::hash(content)
    }

    /// First 8 hex chars of a content hash, for log lines
    fn short_hash(hash: &blake3::Hash) -> String {
        hash.to_hex()[..8].to_string()
    }

    /// Record `path` and return the earlier path if the same content was seen
    fn register(&mut self, path: &Path, content_hash: blake3::Hash) -> Option<&Path> {
        if self.seen.contains_key(&content_hash) {
            self.stats.duplicates_skipped += 1;
            return self.seen.get(&content_hash).map(PathBuf::as_path);
        }
        self.seen.insert(content_hash, path.to_path_buf());
        None
    }

    fn summary(&self) -> String {
        format!(
            "Summary: {} decoded, {} failed, {} duplicates skipped",
            self.stats.decoded, self.stats.failed, self.stats.duplicates_skipped
        )
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let decoder = Decoder::with_config(cli.decoder_config());

    if let Some(ref file) = cli.input.file {
        process_single_file(&cli, &decoder, file)
    } else if let Some(ref directory) = cli.input.directory {
        process_directory(&cli, &decoder, directory)
    } else {
        bail!("Either --file or --directory must be specified")
    }
}

/// Decode and print one file
fn process_single_file(cli: &Cli, decoder: &Decoder, file: &Path) -> Result<()> {
    if !file.exists() {
        bail!("Input file does not exist: {}", file.display());
    }
    if !file.is_file() {
        bail!("Input path is not a file: {}", file.display());
    }

    let data = fs::read(file).with_context(|| format!("Failed to read input file: {}", file.display()))?;
    let Some(kind) = resolve_kind(cli.format, file, &data) else {
        bail!(
            "Cannot tell the format of {} from its extension or contents (use --format)",
            file.display()
        );
    };

    let decoded = decode(decoder, file, data, kind)?;
    let output = render(cli, file, kind, &decoded, false)?;
    print!("{output}");
    Ok(())
}

/// Decode every recognized file under a directory
fn process_directory(cli: &Cli, decoder: &Decoder, directory: &Path) -> Result<()> {
    if !directory.exists() {
        bail!("Directory does not exist: {}", directory.display());
    }
    if !directory.is_dir() {
        bail!("Path is not a directory: {}", directory.display());
    }

    info!("Scanning directory: {}", directory.display());

    let mut seen = SeenFiles::new();
    for (path, kind) in collect_files(directory, cli.format) {
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                seen.stats.failed += 1;
                continue;
            }
        };

        let hash = SeenFiles::content_hash(&data);
        if let Some(first) = seen.register(&path, hash) {
            debug!(
                "Skipping duplicate: {} (same content as {}, hash: {})",
                path.display(),
                first.display(),
                SeenFiles::short_hash(&hash)
            );
            continue;
        }

        match decode(decoder, &path, data, kind).and_then(|decoded| render(cli, &path, kind, &decoded, true)) {
            Ok(output) => {
                print!("{output}");
                seen.stats.decoded += 1;
            }
            Err(e) => {
                // Log error but continue with other files
                warn!("{:#}", e);
                seen.stats.failed += 1;
            }
        }
    }

    if cli.output == OutputMode::Json {
        info!("{}", seen.summary());
    } else {
        println!("{}", seen.summary());
    }
    Ok(())
}

/// Files under `directory` whose format is known, in walk order.
///
/// Hidden files are skipped. With `only` set, files of other formats are
/// skipped too.
fn collect_files(directory: &Path, only: Option<FormatKind>) -> Vec<(PathBuf, FormatKind)> {
    let mut files = Vec::new();
    for entry in WalkDir::new(directory)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !entry.file_type().is_file() {
            continue;
        }

        if path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with('.'))
            .unwrap_or(false)
        {
            continue;
        }

        let Some(kind) = FormatKind::from_path(path) else {
            trace!("Skipping unknown extension: {}", path.display());
            continue;
        };
        if only.is_some_and(|only| only != kind) {
            trace!("Skipping {} file: {}", kind.key(), path.display());
            continue;
        }
        files.push((path.to_path_buf(), kind));
    }
    files
}

/// Picks the format: explicit override, then extension, then leading magic
fn resolve_kind(explicit: Option<FormatKind>, path: &Path, data: &[u8]) -> Option<FormatKind> {
    explicit
        .or_else(|| FormatKind::from_path(path))
        .or_else(|| FormatKind::sniff(data))
}

fn decode(decoder: &Decoder, path: &Path, data: Vec<u8>, kind: FormatKind) -> Result<Decoded> {
    trace!("Read {} bytes from {}", data.len(), path.display());
    let decoded = decoder
        .decode_detailed(data, kind)
        .with_context(|| format!("Failed to decode {} as {}", path.display(), kind.name()))?;
    if decoded.trailing > 0 {
        info!(
            "{}: {} bytes after the end of the {} data",
            path.display(),
            decoded.trailing,
            kind.name()
        );
    }
    Ok(decoded)
}

/// Formats one decoded file for stdout
fn render(cli: &Cli, path: &Path, kind: FormatKind, decoded: &Decoded, many: bool) -> Result<String> {
    let output = match cli.output {
        OutputMode::Json if many => {
            let tree = serde_json::to_value(&decoded.record).context("Failed to serialize tree")?;
            let line = serde_json::json!({
                "path": path.display().to_string(),
                "format": kind.key(),
                "trailing": decoded.trailing,
                "tree": tree,
            });
            format!("{line}\n")
        }
        OutputMode::Json => {
            let text = serde_json::to_string_pretty(&decoded.record).context("Failed to serialize tree")?;
            format!("{text}\n")
        }
        OutputMode::Tree => {
            let tree = TreeRenderer::new().max_items(cli.max_items).render(&decoded.record);
            format!("{} ({})\n{}", path.display(), kind.name(), tree)
        }
        OutputMode::Summary => summary_line(path, kind, decoded),
    };
    Ok(output)
}

fn summary_line(path: &Path, kind: FormatKind, decoded: &Decoded) -> String {
    let mut stats = StatsVisitor::default();
    walk(&decoded.record, &mut stats);
    let mut line = format!(
        "{}: {}, {} bytes, {} records, {} lists, {} values",
        path.display(),
        kind.name(),
        decoded.consumed + decoded.trailing,
        stats.record_count,
        stats.seq_count,
        stats.leaf_count
    );
    if stats.empty_count > 0 {
        line.push_str(&format!(", {} unknown chunks", stats.empty_count));
    }
    if decoded.trailing > 0 {
        line.push_str(&format!(", {} trailing bytes", decoded.trailing));
    }
    line.push('\n');
    line
}
