//! swatchscan - Color inventory for design documents.
//!
//! Usage:
//!   swatchscan scan DOC.json              Print the color inventory
//!   swatchscan export DOC.json            Export the inventory to JSON
//!   swatchscan replay DOC.json SCRIPT     Drive a live session through edits
//!   swatchscan --help                     Show help

mod replay;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, eyre};
use itertools::Itertools;
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use swatchscan_core::{
    ColorEntry, ColorKind, MemoryDocument, NodeId, ScanConfig, ScanContext, SharedDocument,
    display_hex,
};
use swatchscan_live::{LiveSession, Notification};
use swatchscan_scan::{ColorScanner, NoopControl, ScanReport};

#[derive(Parser)]
#[command(
    name = "swatchscan",
    version,
    about = "Color inventory for design documents",
    long_about = "swatchscan lists every distinct color used in a design document, \
                  together with the design tokens bound to it and every layer using it.\n\n\
                  Documents are JSON snapshots of a page, its selection and its tokens."
)]
struct Cli {
    /// Scan settings file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log scan activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a document and show its colors
    Scan {
        /// Document snapshot
        document: PathBuf,

        /// Scope the scan to these node ids instead of the saved selection
        #[arg(short, long, value_delimiter = ',')]
        select: Vec<String>,

        /// Include pure vector shapes
        #[arg(long)]
        include_vectors: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Export the inventory to JSON
    Export {
        /// Document snapshot
        document: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Include pure vector shapes
        #[arg(long)]
        include_vectors: bool,
    },

    /// Replay scripted edits through a live session, printing notifications
    Replay {
        /// Document snapshot
        document: PathBuf,

        /// JSON array of edit steps
        script: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// JSON shape shared by `scan --format json` and `export`.
#[derive(Serialize)]
struct InventorySnapshot<'a> {
    colors: Vec<ColorEntry>,
    context: &'a ScanContext,
}

impl<'a> InventorySnapshot<'a> {
    fn new(report: &'a ScanReport) -> Self {
        Self {
            colors: report.inventory.to_vec(),
            context: &report.context,
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Scan {
            document,
            select,
            include_vectors,
            format,
        } => {
            config.include_vectors |= include_vectors;
            run_scan(&document, &select, config, format)?;
        }
        Command::Export {
            document,
            output,
            include_vectors,
        } => {
            config.include_vectors |= include_vectors;
            run_export(&document, output, config)?;
        }
        Command::Replay { document, script } => {
            run_replay(&document, &script, config)?;
        }
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` (default `warn`, `debug` with `-v`).
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Read scan settings, falling back to defaults without a file.
fn load_config(path: Option<&Path>) -> Result<ScanConfig> {
    let Some(path) = path else {
        return Ok(ScanConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: ScanConfig =
        toml::from_str(&raw).with_context(|| format!("Invalid config {}", path.display()))?;
    config.validate().map_err(|message| eyre!(message))?;
    debug!(?config, "Loaded config");
    Ok(config)
}

fn load_document(path: &Path) -> Result<MemoryDocument> {
    MemoryDocument::load(path).with_context(|| format!("Failed to load {}", path.display()))
}

/// Scan a document once, honoring a selection override.
fn scan_document(path: &Path, select: &[String], config: ScanConfig) -> Result<ScanReport> {
    let mut doc = load_document(path)?;
    if !select.is_empty() {
        doc.set_selection(select.iter().map(|id| NodeId::from(id.as_str())).collect());
    }

    let scanner = ColorScanner::new(config);
    let report = scanner
        .scan(&doc, &doc, &mut NoopControl)
        .context("Scan failed")?;
    for notice in &report.notices {
        eprintln!("{notice}");
    }
    Ok(report)
}

/// Scan a document and display its inventory.
fn run_scan(
    path: &Path,
    select: &[String],
    config: ScanConfig,
    format: OutputFormat,
) -> Result<()> {
    let report = scan_document(path, select, config)?;

    match format {
        OutputFormat::Text => print_report(&report),
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&InventorySnapshot::new(&report))?
            );
        }
    }

    Ok(())
}

/// Export the inventory to JSON.
fn run_export(path: &Path, output: Option<PathBuf>, config: ScanConfig) -> Result<()> {
    let report = scan_document(path, &[], config)?;
    let json = serde_json::to_string_pretty(&InventorySnapshot::new(&report))?;

    match output {
        Some(output_path) => {
            std::fs::write(&output_path, json)
                .with_context(|| format!("Failed to write {}", output_path.display()))?;
            eprintln!("Exported to {}", output_path.display());
        }
        None => {
            println!("{}", json);
        }
    }

    Ok(())
}

/// Drive a live session through a script, one JSON line per notification.
fn run_replay(path: &Path, script: &Path, config: ScanConfig) -> Result<()> {
    let doc = SharedDocument::new(load_document(path)?);
    let steps = replay::load_script(script)?;

    let mut session = LiveSession::new(doc.clone(), Vec::<Notification>::new(), config);
    session.start();
    print_notifications(session.publisher_mut())?;

    for (index, step) in steps.into_iter().enumerate() {
        let input = step
            .apply(&doc)
            .with_context(|| format!("Step {} failed", index + 1))?;
        session.handle(input);
        session.flush();
        print_notifications(session.publisher_mut())?;
    }

    Ok(())
}

fn print_notifications(published: &mut Vec<Notification>) -> Result<()> {
    for notification in published.drain(..) {
        println!("{}", serde_json::to_string(&notification)?);
    }
    Ok(())
}

/// Print the inventory, most used colors first.
fn print_report(report: &ScanReport) {
    let context = &report.context;
    let scope = match &context.scope_node_name {
        Some(name) if context.is_selection() => name.as_str(),
        _ => "Page",
    };

    println!();
    println!("{}", "─".repeat(70));
    println!(" {} - {} colors", scope, report.inventory.len());
    println!(
        " {} nodes scanned, {} color usages",
        context.total_nodes_scanned,
        report.inventory.total_usage()
    );
    println!("{}", "─".repeat(70));
    println!();

    if report.inventory.is_empty() {
        println!(" No colors found.");
    }

    let sorted = report
        .inventory
        .entries()
        .sorted_by(|a, b| {
            b.usage_count
                .cmp(&a.usage_count)
                .then_with(|| a.dedup_key.cmp(&b.dedup_key))
        });
    for entry in sorted {
        println!(
            " {:<24} {:>5}x  {:<14} {}",
            truncate(&swatch_label(entry), 24),
            entry.usage_count,
            entry.property_types.iter().join(","),
            token_label(entry)
        );
    }

    if !report.warnings.is_empty() {
        println!();
        println!("{} warning(s) during scan", report.warnings.len());
    }
}

fn swatch_label(entry: &ColorEntry) -> String {
    match (entry.kind, entry.rgba, &entry.gradient) {
        (ColorKind::Solid, Some(rgba), _) => display_hex(rgba),
        (ColorKind::Gradient, _, Some(gradient)) => format!(
            "{} ({} stops)",
            gradient.gradient_type.to_string().to_lowercase(),
            gradient.stops.len()
        ),
        _ => entry.dedup_key.clone(),
    }
}

fn token_label(entry: &ColorEntry) -> String {
    let Some(name) = entry.token_name.as_deref().or(entry.style_name.as_deref()) else {
        return String::new();
    };
    match (&entry.token_collection, &entry.library_name) {
        (Some(collection), Some(library)) => format!("{name} ({collection}, {library})"),
        (Some(collection), None) => format!("{name} ({collection})"),
        _ => name.to_string(),
    }
}

/// Truncate a string to max length.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 1).collect();
        format!("{head}…")
    }
}
