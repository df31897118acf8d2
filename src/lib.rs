//! Collectra: lineage-aware annotation review.
//!
//! Collectra loads an annotation document (images, rectangular crops of
//! those images, and free-text annotations of the crops, linked by parent
//! references) into a typed graph, and decides what text each node should
//! display. Corrections are recorded as Text nodes parented by the Text they
//! correct, so the value shown for a crop is the deepest Text in its chain.
//!
//! # Modules
//!
//! - [`ir`]: Node model, graph store, traversal and the YAML document codec
//! - [`resolve`]: Display value resolution
//! - [`grid`]: Tabular projection (one row per node)
//! - [`inspect`]: Document statistics and lineage listing
//! - [`folder`]: Document folder discovery and image embedding
//! - [`session`]: Load/edit/save context for one document
//! - [`error`]: Error types for collectra operations

pub mod error;
pub mod folder;
pub mod grid;
pub mod inspect;
pub mod ir;
pub mod resolve;
pub mod session;
mod text;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

pub use error::CollectraError;

use ir::{CropRegionInput, NodeKind};
use session::Session;

/// The collectra CLI application.
#[derive(Parser)]
#[command(name = "collectra")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Log filter directive, e.g. 'info' or 'collectra=debug'.
    #[arg(long, global = true, env = "COLLECTRA_LOG", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Show the display value of one or more nodes.
    Resolve(ResolveArgs),
    /// Show every node with its display value and lineage.
    Grid(GridArgs),
    /// Summarize a document: node counts, crop states, labels.
    Inspect(InspectArgs),
    /// List document folders under a directory.
    Scan(ScanArgs),
    /// Set the text of a node, or attach new text to a crop.
    SetText(SetTextArgs),
    /// Replace the region of a crop node.
    SetCrop(SetCropArgs),
    /// Create a new crop annotation.
    CreateCrop(CreateCropArgs),
    /// Delete a node and its direct Text children.
    Delete(DeleteArgs),
    /// Rewrite a document in canonical form.
    Normalize(NormalizeArgs),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(clap::Args)]
struct ResolveArgs {
    /// Annotation YAML document.
    document: PathBuf,

    /// Node ids to resolve.
    #[arg(required = true)]
    ids: Vec<String>,

    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

#[derive(clap::Args)]
struct GridArgs {
    document: PathBuf,

    /// Only show nodes of this kind ('image', 'crop', 'text', 'other').
    #[arg(long = "type", value_parser = parse_kind)]
    kind: Option<NodeKind>,

    /// Truncate text cells to this many characters.
    #[arg(long)]
    max_width: Option<usize>,

    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

#[derive(clap::Args)]
struct InspectArgs {
    document: PathBuf,

    /// Number of labels to list before folding the rest into '(other)'.
    #[arg(long, default_value_t = 10)]
    top: usize,

    /// Also list every node's parents and children.
    #[arg(long)]
    lineage: bool,

    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

#[derive(clap::Args)]
struct ScanArgs {
    /// Parent directory holding '*.grapto' folders, or a single document
    /// folder with --folder.
    dir: PathBuf,

    /// Treat DIR itself as one document folder.
    #[arg(long)]
    folder: bool,

    /// Read each folder's image and report its size (JSON output includes
    /// the embedded data URI).
    #[arg(long)]
    images: bool,

    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

#[derive(clap::Args)]
struct SetTextArgs {
    document: PathBuf,

    /// New text.
    text: String,

    /// Node whose data is replaced. Takes precedence over --crop.
    #[arg(long)]
    node: Option<String>,

    /// Crop to attach a new Text node to.
    #[arg(long)]
    crop: Option<String>,

    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

#[derive(clap::Args)]
struct RegionArgs {
    #[arg(long)]
    x_center: Option<f64>,
    #[arg(long)]
    y_center: Option<f64>,
    #[arg(long)]
    width: Option<f64>,
    #[arg(long)]
    height: Option<f64>,
}

impl From<RegionArgs> for CropRegionInput {
    fn from(args: RegionArgs) -> Self {
        CropRegionInput {
            x_center: args.x_center,
            y_center: args.y_center,
            width_relative: args.width,
            height_relative: args.height,
        }
    }
}

#[derive(clap::Args)]
struct SetCropArgs {
    document: PathBuf,

    /// Crop node to update.
    id: String,

    #[command(flatten)]
    region: RegionArgs,

    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

#[derive(clap::Args)]
struct CreateCropArgs {
    document: PathBuf,

    /// Label to file the new crop under; also the id prefix.
    #[arg(long)]
    label: String,

    /// Parent node (defaults to the document's first Image).
    #[arg(long)]
    parent: Option<String>,

    #[command(flatten)]
    region: RegionArgs,

    /// Seed for the generated id suffix.
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

#[derive(clap::Args)]
struct DeleteArgs {
    document: PathBuf,

    /// Node to delete.
    id: String,

    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

#[derive(clap::Args)]
struct NormalizeArgs {
    document: PathBuf,

    /// Write here instead of stdout. May be the input path.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn parse_kind(s: &str) -> Result<NodeKind, String> {
    s.parse()
}

/// Run the collectra CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), CollectraError> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Some(Commands::Resolve(args)) => run_resolve(args),
        Some(Commands::Grid(args)) => run_grid(args),
        Some(Commands::Inspect(args)) => run_inspect(args),
        Some(Commands::Scan(args)) => run_scan(args),
        Some(Commands::SetText(args)) => run_set_text(args),
        Some(Commands::SetCrop(args)) => run_set_crop(args),
        Some(Commands::CreateCrop(args)) => run_create_crop(args),
        Some(Commands::Delete(args)) => run_delete(args),
        Some(Commands::Normalize(args)) => run_normalize(args),
        None => {
            println!("collectra {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Lineage-aware annotation review.");
            println!();
            println!("Run 'collectra --help' for usage information.");
            Ok(())
        }
    }
}

/// Installs a stderr subscriber. An unparsable filter falls back to `warn`.
fn init_tracing(directive: &str) {
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("warn"));
    // A subscriber may already be installed when run() is called in-process.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CollectraError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_resolve(args: ResolveArgs) -> Result<(), CollectraError> {
    let session = Session::open(&args.document)?;
    let results = args
        .ids
        .iter()
        .map(|id| session.resolve(id).map(|result| (id.as_str(), result)))
        .collect::<Result<Vec<_>, _>>()?;

    match args.output {
        OutputFormat::Json => {
            let values: Vec<_> = results.iter().map(|(_, result)| result).collect();
            print_json(&values)
        }
        OutputFormat::Text => {
            for (id, result) in &results {
                match &result.value {
                    Some(value) => println!("{id}: {value:?}"),
                    None => println!("{id}: <none>"),
                }
                if let Some(source) = &result.source_id {
                    println!("  source: {source}");
                }
                if let Some(region) = &result.crop_region {
                    println!("  region: {region}");
                }
                if result.locked {
                    println!("  locked");
                }
                println!("  reason: {}", result.reason);
            }
            Ok(())
        }
    }
}

fn run_grid(args: GridArgs) -> Result<(), CollectraError> {
    let session = Session::open(&args.document)?;
    let report = session.grid(&grid::GridOptions {
        kind: args.kind,
        max_cell_width: args.max_width,
    })?;

    match args.output {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            print!("{report}");
            Ok(())
        }
    }
}

fn run_inspect(args: InspectArgs) -> Result<(), CollectraError> {
    let graph = ir::io_yaml::read_yaml_document(&args.document)?;
    let opts = inspect::InspectOptions {
        top_labels: args.top,
        lineage: args.lineage,
        ..Default::default()
    };
    let report = inspect::inspect_graph(&graph, &opts)?;

    match args.output {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            print!("{report}");
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct ScannedFolder {
    #[serde(flatten)]
    folder: folder::DocumentFolder,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<folder::ImageAsset>,
}

fn run_scan(args: ScanArgs) -> Result<(), CollectraError> {
    let folders = if args.folder {
        vec![folder::scan_document_folder(&args.dir)?]
    } else {
        folder::scan_parent_folder(&args.dir)?
    };

    let scanned = folders
        .into_iter()
        .map(|folder| {
            let image = if args.images {
                Some(folder::image_data_uri(&folder.image_path)?)
            } else {
                None
            };
            Ok(ScannedFolder { folder, image })
        })
        .collect::<Result<Vec<_>, CollectraError>>()?;

    match args.output {
        OutputFormat::Json => print_json(&scanned),
        OutputFormat::Text => {
            if scanned.is_empty() {
                println!("No document folders found in {}", args.dir.display());
                return Ok(());
            }
            for (index, entry) in scanned.iter().enumerate() {
                println!("[{index}] {}", entry.folder.name);
                println!("    yaml:  {}", entry.folder.yaml_path.display());
                println!("    image: {}", entry.folder.image_path.display());
                if let Some(image) = &entry.image {
                    println!(
                        "    size:  {}x{} ({})",
                        image.width,
                        image.height,
                        image.format.mime_type()
                    );
                }
            }
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct MutationOutcome<'a> {
    action: &'a str,
    ids: Vec<&'a str>,
    document: &'a Path,
}

fn report_mutation(output: OutputFormat, outcome: MutationOutcome<'_>) -> Result<(), CollectraError> {
    match output {
        OutputFormat::Json => print_json(&outcome),
        OutputFormat::Text => {
            println!(
                "{} {} in {}",
                outcome.action,
                outcome.ids.join(", "),
                outcome.document.display()
            );
            Ok(())
        }
    }
}

fn run_set_text(args: SetTextArgs) -> Result<(), CollectraError> {
    let mut session = Session::open(&args.document)?;
    let id = session.edit_text(args.node.as_deref(), &args.text, args.crop.as_deref())?;
    let action = if args.node.as_deref().is_some_and(|n| !n.is_empty()) {
        "updated"
    } else {
        "created"
    };
    report_mutation(
        args.output,
        MutationOutcome {
            action,
            ids: vec![id.as_str()],
            document: &args.document,
        },
    )
}

fn run_set_crop(args: SetCropArgs) -> Result<(), CollectraError> {
    let mut session = Session::open(&args.document)?;
    session.edit_crop_region(&args.id, args.region)?;
    report_mutation(
        args.output,
        MutationOutcome {
            action: "updated",
            ids: vec![args.id.as_str()],
            document: &args.document,
        },
    )
}

fn run_create_crop(args: CreateCropArgs) -> Result<(), CollectraError> {
    let mut session = Session::open(&args.document)?;
    if let Some(seed) = args.seed {
        session = session.with_seed(seed);
    }
    let id = session.create_crop(args.region, &args.label, args.parent.as_deref())?;
    report_mutation(
        args.output,
        MutationOutcome {
            action: "created",
            ids: vec![id.as_str()],
            document: &args.document,
        },
    )
}

fn run_delete(args: DeleteArgs) -> Result<(), CollectraError> {
    let mut session = Session::open(&args.document)?;
    let removed = session.delete_annotation(&args.id)?;
    report_mutation(
        args.output,
        MutationOutcome {
            action: "deleted",
            ids: removed.iter().map(|id| id.as_str()).collect(),
            document: &args.document,
        },
    )
}

fn run_normalize(args: NormalizeArgs) -> Result<(), CollectraError> {
    let graph = ir::io_yaml::read_yaml_document(&args.document)?;
    match args.out {
        Some(out) => ir::io_yaml::write_yaml_document(&out, &graph),
        None => {
            print!("{}", ir::io_yaml::to_yaml_string(&graph)?);
            Ok(())
        }
    }
}
