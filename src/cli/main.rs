use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use exif_editor::config::Config;
use exif_editor::exif::{GpsCoordinates, IfdKind};
use exif_editor::pipeline::{self, Edit, EditSession, FieldView};

#[derive(Parser, Debug)]
#[command(
    name = "exif-editor",
    version,
    about = "View and edit the EXIF tags of JPEG images, including GPS coordinates"
)]
struct Cli {
    /// Image files or directories to process
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Display every editable tag and exit
    #[arg(long)]
    show: bool,

    /// Set a tag, e.g. `Exif.ISOSpeedRatings=800` or `0th.0x010F=Nikon` (repeatable)
    #[arg(long = "set", value_name = "DIR.TAG=VALUE")]
    edits: Vec<Edit>,

    /// Write GPS coordinates in decimal degrees
    #[arg(long, value_name = "LAT,LON", value_parser = parse_coordinates, allow_hyphen_values = true)]
    gps: Option<GpsCoordinates>,

    /// Output file (single input only; overrides suffix/in-place)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Preview changes without writing to files
    #[arg(long)]
    dry_run: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn parse_coordinates(s: &str) -> Result<GpsCoordinates, String> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON, got {s:?}"))?;
    let latitude: f64 = lat
        .trim()
        .parse()
        .map_err(|e| format!("invalid latitude {lat:?}: {e}"))?;
    let longitude: f64 = lon
        .trim()
        .parse()
        .map_err(|e| format!("invalid longitude {lon:?}: {e}"))?;
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(format!("coordinates out of range: {latitude}, {longitude}"));
    }
    Ok(GpsCoordinates {
        latitude,
        longitude,
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    if cli.paths.is_empty() {
        anyhow::bail!("No input files or directories specified. Use --help for usage.");
    }

    let images = pipeline::collect_images(&cli.paths);
    if images.is_empty() {
        anyhow::bail!("No supported image files found in the specified paths.");
    }

    // Handle --show
    if cli.show || (cli.edits.is_empty() && cli.gps.is_none()) {
        if cli.json {
            let mut shown = Vec::new();
            for image_path in &images {
                shown.push(show_json(image_path)?);
            }
            println!("{}", serde_json::to_string_pretty(&shown)?);
        } else {
            for image_path in &images {
                print_fields(image_path)?;
            }
        }
        return Ok(());
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if cli.dry_run {
        config.output.dry_run = true;
    }
    if cli.output.is_some() {
        if images.len() > 1 {
            anyhow::bail!("--output needs exactly one input image, got {}", images.len());
        }
        // the edited copy is written next to the source first, then moved
        config.output.in_place = false;
        if config.output.suffix.is_empty() {
            config.output.suffix = "_edited".to_string();
        }
    }

    log::info!("Found {} image(s) to edit", images.len());
    if config.output.dry_run {
        log::info!("DRY RUN: no files will be modified");
    }

    let mut results = Vec::new();
    let total = images.len();

    for (i, image_path) in images.iter().enumerate() {
        log::info!("[{}/{}] Editing: {}", i + 1, total, image_path.display());

        let mut result = pipeline::process_image(image_path, &cli.edits, cli.gps, &config);
        if let Some(ref target) = cli.output {
            if result.error.is_none() {
                redirect_output(&mut result, target, config.output.dry_run)?;
            }
        }

        if let Some(ref err) = result.error {
            log::error!("  Error: {err}");
        } else {
            let report = &result.report;
            if !report.changed.is_empty() {
                log::info!("  Changed: {}", report.changed.join(", "));
            }
            if report.gps_written {
                log::info!(
                    "  GPS: {:.6}, {:.6}",
                    result.gps.latitude,
                    result.gps.longitude
                );
            }
            if !report.reverted.is_empty() {
                log::warn!("  Kept previous value (unreadable input): {}", report.reverted.join(", "));
            }
            if !report.skipped.is_empty() {
                log::info!("  Skipped: {}", report.skipped.join(", "));
            }
            if let Some(ref out) = result.output_path {
                if config.output.dry_run {
                    log::info!("  Would write: {}", out.display());
                } else {
                    log::info!("  Written: {}", out.display());
                }
            }
        }

        results.push(result);
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }

    // Summary
    let success = results.iter().filter(|r| r.error.is_none()).count();
    let failed = total - success;
    log::info!("Done: {success} succeeded, {failed} failed out of {total} images");

    Ok(())
}

/// Move the edited copy to the path given with `--output`.
fn redirect_output(result: &mut pipeline::ProcessResult, target: &Path, dry_run: bool) -> Result<()> {
    let Some(written) = result.output_path.take() else {
        return Ok(());
    };
    if !dry_run {
        std::fs::rename(&written, target)
            .with_context(|| format!("Failed to move output to {}", target.display()))?;
    }
    result.output_path = Some(target.to_path_buf());
    Ok(())
}

#[derive(serde::Serialize)]
struct ShownImage {
    path: PathBuf,
    fields: Vec<FieldView>,
    gps: Option<GpsCoordinates>,
    thumbnail_bytes: Option<usize>,
}

fn open_session(path: &Path) -> Result<EditSession> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    EditSession::open(&bytes).with_context(|| format!("Failed to load EXIF from {}", path.display()))
}

fn show_json(path: &Path) -> Result<ShownImage> {
    let session = open_session(path)?;
    Ok(ShownImage {
        path: path.to_path_buf(),
        fields: session.fields(),
        gps: session.coordinates().coordinates(),
        thumbnail_bytes: session.document().thumbnail().map(<[u8]>::len),
    })
}

// ANSI color codes
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Max width for the value column before wrapping.
const VAL_WIDTH: usize = 46;
/// Indent for continuation lines (tag column width + " : " = 25 chars + 2 leading spaces).
const INDENT: &str = "                           ";

/// Print every editable tag of a file, one section per directory.
fn print_fields(path: &Path) -> Result<()> {
    let session = open_session(path)?;
    let fields = session.fields();
    let gps = session.coordinates();

    println!();
    println!("{BOLD}File:{RESET} {}", path.display());
    println!("{DIM}{}{RESET}", "═".repeat(72));

    for kind in IfdKind::ALL {
        let section: Vec<&FieldView> = fields.iter().filter(|f| f.directory == kind).collect();
        let show_gps = kind == IfdKind::Gps && gps.has_gps;
        if section.is_empty() && !show_gps {
            continue;
        }

        println!("  {BOLD}{kind}{RESET}");
        println!("  {DIM}{}{RESET}", "─".repeat(70));
        if show_gps {
            print_row("Latitude", &format!("{:.6}", gps.latitude));
            print_row("Longitude", &format!("{:.6}", gps.longitude));
        }
        for field in section {
            print_row(&field.name, &field.value);
        }
        println!();
    }

    if let Some(thumbnail) = session.document().thumbnail() {
        println!("  {DIM}thumbnail: {} bytes{RESET}", thumbnail.len());
        println!();
    }
    if fields.is_empty() {
        println!("  {DIM}(no EXIF tags found){RESET}");
        println!();
    }

    Ok(())
}

/// Print a single row in the tag table.
fn print_row(tag: &str, val: &str) {
    let tag_col = format!("{:<22}", tag);
    let lines = wrap_text(val, VAL_WIDTH);
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            println!("  {tag_col} : {line}");
        } else {
            println!("  {INDENT}{line}");
        }
    }
}

/// Wrap text at word boundaries to fit within max_width.
fn wrap_text(s: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in s.split_whitespace() {
        if current_line.is_empty() {
            current_line = word.to_string();
        } else if current_line.len() + 1 + word.len() <= max_width {
            current_line.push(' ');
            current_line.push_str(word);
        } else {
            lines.push(current_line);
            current_line = word.to_string();
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(s.to_string());
    }

    lines
}
