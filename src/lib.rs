//! voclabel: Pascal VOC annotation reader and writer.
//!
//! voclabel converts between in-memory annotation records (image metadata
//! plus labelled bounding boxes) and the Pascal VOC XML files written by
//! image labelling tools.
//!
//! # Modules
//!
//! - [`voc`]: Annotation model, VOC XML reader and writer
//! - [`error`]: Error types for voclabel operations

pub mod error;
pub mod voc;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;
use walkdir::WalkDir;

pub use error::VocError;

use voc::reader::has_xml_extension;
use voc::{AttrValue, ImageSize, ParseOptions, Shape, VocReader, VocWriter};

/// The voclabel CLI application.
#[derive(Parser)]
#[command(name = "voclabel")]
#[command(version, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Print the size, verified flag and shapes of VOC files.
    Inspect(InspectArgs),
    /// Create a VOC file for an image.
    Create(CreateArgs),
    /// Re-read a VOC file and rewrite it in canonical form.
    Normalize(NormalizeArgs),
}

/// Arguments for the inspect subcommand.
#[derive(clap::Args)]
struct InspectArgs {
    /// A .xml file, or a directory searched recursively for .xml files.
    input: PathBuf,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,

    /// Fail on the first unreadable file instead of reporting it as empty.
    #[arg(long)]
    strict: bool,

    /// Accept documents without a <path> element.
    #[arg(long)]
    allow_missing_path: bool,
}

/// Arguments for the create subcommand.
#[derive(clap::Args)]
struct CreateArgs {
    /// Image to annotate; its dimensions are read from the file.
    image: PathBuf,

    /// Folder name to record (defaults to the image's parent directory name).
    #[arg(long, env = "VOCLABEL_FOLDER")]
    folder: Option<String>,

    /// Database source to record.
    #[arg(long, env = "VOCLABEL_DATABASE", default_value = voc::DEFAULT_DATABASE_SOURCE)]
    database: String,

    /// Box to add, as LABEL:XMIN,YMIN,XMAX,YMAX (repeatable).
    #[arg(long = "bbox", value_name = "LABEL:XMIN,YMIN,XMAX,YMAX")]
    boxes: Vec<String>,

    /// Mark boxes with this label as difficult (repeatable).
    #[arg(long = "difficult", value_name = "LABEL")]
    difficult: Vec<String>,

    /// Mark the annotations as verified.
    #[arg(long)]
    verified: bool,

    /// Output path (defaults to the image path with an .xml extension).
    #[arg(long)]
    output: Option<PathBuf>,
}

/// Arguments for the normalize subcommand.
#[derive(clap::Args)]
struct NormalizeArgs {
    /// VOC file to rewrite.
    input: PathBuf,

    /// Output path (defaults to rewriting the input in place).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Accept documents without a <path> element.
    #[arg(long)]
    allow_missing_path: bool,

    /// Rewrite even when some attributes (a non-default pose, numeric
    /// values, a stale truncated flag) would not be preserved.
    #[arg(long)]
    allow_lossy: bool,
}

/// Run the voclabel CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), VocError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Inspect(args)) => run_inspect(args),
        Some(Commands::Create(args)) => run_create(args),
        Some(Commands::Normalize(args)) => run_normalize(args),
        None => {
            println!("voclabel {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Pascal VOC annotation reader and writer.");
            println!();
            println!("Run 'voclabel --help' for usage information.");
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct InspectEntry<'a> {
    file: String,
    verified: bool,
    size: Option<ImageSize>,
    shapes: &'a [Shape],
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Execute the inspect subcommand.
fn run_inspect(args: InspectArgs) -> Result<(), VocError> {
    if args.output != "text" && args.output != "json" {
        return Err(VocError::UnsupportedFormat(format!(
            "'{}' (supported: text, json)",
            args.output
        )));
    }

    let opts = ParseOptions {
        require_path: !args.allow_missing_path,
    };

    let mut readers = Vec::new();
    for xml_path in collect_xml_files(&args.input)? {
        if args.strict {
            let document = voc::parse_voc_file(&xml_path, &opts)?;
            readers.push(VocReader::from_document(xml_path, document));
        } else {
            readers.push(VocReader::with_options(xml_path, &opts));
        }
    }

    match args.output.as_str() {
        "json" => {
            let entries: Vec<InspectEntry<'_>> = readers
                .iter()
                .map(|reader| InspectEntry {
                    file: reader.file_path().display().to_string(),
                    verified: reader.verified(),
                    size: reader.size(),
                    shapes: reader.shapes(),
                    error: reader.error().map(ToString::to_string),
                })
                .collect();
            let json = serde_json::to_string_pretty(&entries).map_err(VocError::JsonWrite)?;
            println!("{json}");
        }
        _ => {
            for reader in &readers {
                print!("{}", format_reader_text(reader));
            }
        }
    }

    Ok(())
}

fn format_reader_text(reader: &VocReader) -> String {
    let mut out = format!("{}: ", reader.file_path().display());
    let Some(size) = reader.size() else {
        let reason = reader
            .error()
            .map(ToString::to_string)
            .unwrap_or_else(|| "no annotation data".to_string());
        out.push_str(&format!("empty ({reason})\n"));
        return out;
    };

    out.push_str(&format!(
        "{}x{}x{}, {}, {} object(s)\n",
        size.width,
        size.height,
        size.depth_or_default(),
        if reader.verified() {
            "verified"
        } else {
            "unverified"
        },
        reader.shapes().len()
    ));

    for shape in reader.shapes() {
        let points: Vec<String> = shape
            .points
            .iter()
            .map(|point| format!("({},{})", point.x, point.y))
            .collect();
        let attrs: Vec<String> = shape
            .attributes
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        out.push_str(&format!(
            "  {} [{}] {}\n",
            shape.label,
            points.join(" "),
            attrs.join(" ")
        ));
    }

    out
}

/// Execute the create subcommand.
fn run_create(args: CreateArgs) -> Result<(), VocError> {
    let dimensions = imagesize::size(&args.image).map_err(|source| {
        VocError::UnsupportedFormat(format!(
            "cannot read image size of {}: {source}",
            args.image.display()
        ))
    })?;
    let width = u32::try_from(dimensions.width).map_err(|_| oversized_image(&args.image))?;
    let height = u32::try_from(dimensions.height).map_err(|_| oversized_image(&args.image))?;

    let file_name = args
        .image
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let folder = args.folder.clone().unwrap_or_else(|| {
        args.image
            .parent()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default()
    });

    let mut writer = VocWriter::new(folder, file_name, Some(ImageSize::with_depth(height, width, 3)))
        .with_database_source(args.database.as_str())
        .with_local_image_path(args.image.display().to_string())
        .with_verified(args.verified);

    let difficult: BTreeSet<&str> = args.difficult.iter().map(String::as_str).collect();
    for spec in &args.boxes {
        let (label, [xmin, ymin, xmax, ymax]) = parse_bbox_arg(spec)?;
        let mut attrs = BTreeMap::new();
        if difficult.contains(label) {
            attrs.insert("difficult".to_string(), AttrValue::Bool(true));
        }
        writer.add_box(xmin, ymin, xmax, ymax, label, attrs);
    }

    let output = args
        .output
        .unwrap_or_else(|| args.image.with_extension(voc::VOC_XML_EXTENSION));
    let written = writer.save(Some(&output))?;
    println!("Wrote {}", written.display());
    Ok(())
}

/// Execute the normalize subcommand.
fn run_normalize(args: NormalizeArgs) -> Result<(), VocError> {
    let opts = ParseOptions {
        require_path: !args.allow_missing_path,
    };
    let document = voc::parse_voc_file(&args.input, &opts)?;
    let writer = VocWriter::from_document(document.into_annotation_document());

    let lossy = writer.lossy_attributes();
    if !lossy.is_empty() {
        if !args.allow_lossy {
            let details: Vec<String> = lossy.iter().map(ToString::to_string).collect();
            return Err(VocError::InvalidArgument {
                field: "input",
                message: format!(
                    "rewriting {} would change {} attribute(s): {}; pass --allow-lossy to rewrite anyway",
                    args.input.display(),
                    lossy.len(),
                    details.join("; ")
                ),
            });
        }
        for entry in &lossy {
            tracing::warn!(input = %args.input.display(), "{entry}");
        }
    }

    let output = args.output.unwrap_or(args.input);
    let written = writer.save(Some(&output))?;
    println!("Wrote {}", written.display());
    Ok(())
}

/// Parses `LABEL:XMIN,YMIN,XMAX,YMAX`. The label may itself contain ':'.
fn parse_bbox_arg(spec: &str) -> Result<(&str, [i64; 4]), VocError> {
    let invalid = || {
        VocError::UnsupportedFormat(format!(
            "bbox '{spec}' (expected LABEL:XMIN,YMIN,XMAX,YMAX)"
        ))
    };

    let (label, coords) = spec.rsplit_once(':').ok_or_else(invalid)?;
    let values: Vec<i64> = coords
        .split(',')
        .map(|raw| raw.trim().parse::<i64>())
        .collect::<Result<_, _>>()
        .map_err(|_| invalid())?;
    let coords: [i64; 4] = values.try_into().map_err(|_| invalid())?;
    Ok((label, coords))
}

fn oversized_image(path: &Path) -> VocError {
    VocError::UnsupportedFormat(format!(
        "image {} is too large for VOC dimensions",
        path.display()
    ))
}

fn collect_xml_files(input: &Path) -> Result<Vec<PathBuf>, VocError> {
    if !input.is_dir() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(input).follow_links(true) {
        let entry = entry.map_err(|source| VocError::Io(source.into()))?;
        if entry.file_type().is_file() && has_xml_extension(entry.path()) {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}
