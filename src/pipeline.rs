use img_parts::jpeg::{Jpeg, JpegSegment};
use img_parts::{Bytes, ImageEXIF};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use walkdir::WalkDir;

use crate::config::Config;
use crate::exif::gps::{self, GpsCoordinates, GpsReading};
use crate::exif::{
    self, tags, ExifDocument, ExifResult, IfdKind, MalformedExifError,
    SerializationError, EXIF_HEADER,
};

/// Supported image extensions.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

/// One edited form field: the directory, the tag, and the text the user typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub directory: IfdKind,
    pub tag: u16,
    pub value: String,
}

impl Edit {
    pub fn new(directory: IfdKind, tag: u16, value: impl Into<String>) -> Self {
        Self {
            directory,
            tag,
            value: value.into(),
        }
    }
}

impl fmt::Display for Edit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}={}",
            self.directory,
            tags::tag_name(self.directory, self.tag),
            self.value
        )
    }
}

/// `DIR.TAG=VALUE`, where `TAG` is a tag name or a `0x`-prefixed id.
///
/// ```rust
/// use exif_editor::exif::IfdKind;
/// use exif_editor::pipeline::Edit;
///
/// let edit: Edit = "Exif.ISOSpeedRatings=800".parse().unwrap();
/// assert_eq!(edit, Edit::new(IfdKind::Exif, 0x8827, "800"));
/// ```
impl FromStr for Edit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| format!("expected DIR.TAG=VALUE, got {s:?}"))?;
        let (directory, tag) = key
            .split_once('.')
            .ok_or_else(|| format!("expected DIR.TAG before '=', got {key:?}"))?;
        let directory: IfdKind = directory.parse()?;
        let tag = tags::tag_id(directory, tag)
            .ok_or_else(|| format!("unknown {directory} tag {tag:?}"))?;
        Ok(Edit::new(directory, tag, value))
    }
}

/// What happened to a batch of edits.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct EditReport {
    /// Fields whose value changed.
    pub changed: Vec<String>,
    /// Fields whose new text could not be read; they kept their old value.
    pub reverted: Vec<String>,
    /// Edits that were not applied at all (unknown tag, GPS coordinate tag).
    pub skipped: Vec<String>,
    pub gps_written: bool,
}

impl EditReport {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && !self.gps_written
    }
}

/// Apply a batch of edited strings to the document.
///
/// Each edit is read back through the shape of the value it replaces. Text
/// that does not parse leaves the field unchanged and is only recorded in the
/// report; it never fails the batch. GPS coordinate tags are skipped here and
/// must go through [`gps::apply_coords`] afterwards.
pub fn apply_edits(doc: &mut ExifDocument, edits: &[Edit]) -> EditReport {
    let mut report = EditReport::default();

    for edit in edits {
        let label = format!("{}.{}", edit.directory, tags::tag_name(edit.directory, edit.tag));

        if exif::is_gps_coordinate_tag(edit.directory, edit.tag) {
            log::debug!("  {label}: GPS coordinate tag, use the GPS fields instead");
            report.skipped.push(format!("{label} (GPS coordinate)"));
            continue;
        }
        let Some(original) = doc.get(edit.directory, edit.tag) else {
            log::warn!("  {label}: not present in this image, edit ignored");
            report.skipped.push(format!("{label} (not present)"));
            continue;
        };

        let updated = match exif::parse_checked(&edit.value, original) {
            Ok(value) => value,
            Err(err) => {
                log::debug!("  {label}: {err}, keeping previous value");
                report.reverted.push(label);
                continue;
            }
        };

        if &updated != original {
            log::debug!("  {label}: {:?} -> {:?}", exif::render(original), edit.value);
            report.changed.push(label);
            doc.set(edit.directory, edit.tag, updated);
        }
    }

    report
}

/// A tag as shown in an editing form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldView {
    pub directory: IfdKind,
    pub tag: u16,
    pub name: String,
    pub value: String,
}

/// Every editable tag with its rendered value, directory by directory.
///
/// GPS coordinate tags are left out: the coordinate is edited as a pair, see
/// [`EditSession::coordinates`].
pub fn render_fields(doc: &ExifDocument) -> Vec<FieldView> {
    doc.directories()
        .flat_map(|dir| {
            dir.entries()
                .filter(move |(tag, _)| !exif::is_gps_coordinate_tag(dir.kind(), *tag))
                .map(move |(tag, value)| FieldView {
                    directory: dir.kind(),
                    tag,
                    name: tags::tag_name(dir.kind(), tag),
                    value: exif::render(value),
                })
        })
        .collect()
}

/// The editing state of one image.
///
/// Holds the document and the last coordinates submitted for it. Each user
/// session owns its own `EditSession`; nothing is shared between sessions.
#[derive(Debug, Clone)]
pub struct EditSession {
    document: ExifDocument,
    coordinates: Option<GpsCoordinates>,
    precision: i64,
}

impl EditSession {
    /// Load the EXIF segment from image bytes.
    pub fn open(bytes: &[u8]) -> Result<Self, MalformedExifError> {
        Ok(Self::from_document(ExifDocument::load(bytes)?))
    }

    pub fn from_document(document: ExifDocument) -> Self {
        let coordinates = gps::coordinates(&document);
        Self {
            document,
            coordinates,
            precision: gps::DEFAULT_PRECISION,
        }
    }

    pub fn with_precision(mut self, precision: i64) -> Self {
        self.precision = precision;
        self
    }

    pub fn document(&self) -> &ExifDocument {
        &self.document
    }

    pub fn fields(&self) -> Vec<FieldView> {
        render_fields(&self.document)
    }

    /// Coordinates as stored in the document, with the presence flag.
    pub fn coordinates(&self) -> GpsReading {
        gps::read_coordinates(&self.document)
    }

    /// Last coordinates known to this session, submitted or loaded.
    pub fn last_coordinates(&self) -> Option<GpsCoordinates> {
        self.coordinates
    }

    /// Apply a form submission: field edits first, then the coordinate pair.
    pub fn submit(&mut self, edits: &[Edit], coordinates: Option<GpsCoordinates>) -> EditReport {
        let mut report = apply_edits(&mut self.document, edits);
        if let Some(coords) = coordinates {
            gps::apply_coords_with_precision(
                &mut self.document,
                coords.latitude,
                coords.longitude,
                self.precision,
            );
            self.coordinates = Some(coords);
            report.gps_written = true;
        }
        report
    }

    /// Serialize the document. On failure the session stays editable.
    pub fn dump(&self) -> Result<Vec<u8>, SerializationError> {
        self.document.dump()
    }

    pub fn into_document(self) -> ExifDocument {
        self.document
    }
}

/// The EXIF APP1 payload (`Exif\0\0` + TIFF data) of a JPEG, if it has one.
pub fn extract_exif(jpeg_bytes: &[u8]) -> ExifResult<Option<Vec<u8>>> {
    let jpeg = Jpeg::from_bytes(Bytes::copy_from_slice(jpeg_bytes))
        .map_err(|e| MalformedExifError::InvalidContainer(e.to_string()))?;
    Ok(jpeg.exif().map(|tiff| [EXIF_HEADER, &tiff[..]].concat()))
}

/// Replace (or insert) the EXIF APP1 segment of a JPEG.
///
/// `segment` is the output of [`ExifDocument::dump`]. All other segments are
/// kept byte for byte.
pub fn embed_exif(jpeg_bytes: &[u8], segment: &[u8]) -> ExifResult<Vec<u8>> {
    let mut jpeg = Jpeg::from_bytes(Bytes::copy_from_slice(jpeg_bytes))
        .map_err(|e| MalformedExifError::InvalidContainer(e.to_string()))?;

    // Remember where the EXIF segment was originally positioned
    let orig_exif_pos = find_exif_segment_pos(jpeg.segments());

    // set_exif() expects the TIFF data, without the Exif\0\0 prefix
    let tiff = segment.strip_prefix(EXIF_HEADER).unwrap_or(segment);
    jpeg.set_exif(Some(Bytes::copy_from_slice(tiff)));

    // set_exif() re-inserts at a fixed position, which may land after other
    // APP1 segments. Move it back to where it was so EXIF still comes first.
    if let Some(new_pos) = find_exif_segment_pos(jpeg.segments()) {
        // default: right after APP0 (JFIF), if there is one
        let after_app0 = usize::from(jpeg.segments().first().is_some_and(|s| s.marker() == 0xE0));
        let target_pos = orig_exif_pos.unwrap_or(after_app0);
        if target_pos < new_pos {
            let segments = jpeg.segments_mut();
            let seg = segments.remove(new_pos);
            segments.insert(target_pos, seg);
        }
    }

    Ok(jpeg.encoder().bytes().to_vec())
}

/// Find the position of the EXIF APP1 segment in a JPEG.
/// EXIF segments have marker 0xE1 (APP1) and contents starting with "Exif\0\0".
fn find_exif_segment_pos(segments: &[JpegSegment]) -> Option<usize> {
    segments
        .iter()
        .position(|s| s.marker() == 0xE1 && s.contents().starts_with(EXIF_HEADER))
}

/// The result of editing a single image file.
#[derive(Debug, Serialize)]
pub struct ProcessResult {
    pub path: PathBuf,
    /// Where the edited image was (or, in a dry run, would be) written.
    pub output_path: Option<PathBuf>,
    pub report: EditReport,
    pub gps: GpsReading,
    pub dry_run: bool,
    pub error: Option<String>,
}

impl ProcessResult {
    fn new(path: &Path, dry_run: bool) -> Self {
        Self {
            path: path.to_path_buf(),
            output_path: None,
            report: EditReport::default(),
            gps: GpsReading::default(),
            dry_run,
            error: None,
        }
    }
}

/// Load, edit and save one JPEG file.
///
/// Errors are captured in [`ProcessResult::error`] so a batch can continue
/// past a broken file.
pub fn process_image(
    path: &Path,
    edits: &[Edit],
    coordinates: Option<GpsCoordinates>,
    config: &Config,
) -> ProcessResult {
    let mut result = ProcessResult::new(path, config.output.dry_run);
    if let Err(e) = edit_image(path, edits, coordinates, config, &mut result) {
        result.error = Some(e.to_string());
    }
    result
}

fn edit_image(
    path: &Path,
    edits: &[Edit],
    coordinates: Option<GpsCoordinates>,
    config: &Config,
    result: &mut ProcessResult,
) -> ExifResult<()> {
    let bytes = std::fs::read(path)?;
    let mut session = EditSession::open(&bytes)?.with_precision(config.gps.precision);

    result.report = session.submit(edits, coordinates);
    result.gps = session.coordinates();

    if result.report.is_empty() {
        log::info!("  No changes for {}", path.display());
        return Ok(());
    }

    let segment = session.dump()?;
    let output = embed_exif(&bytes, &segment)?;
    result.output_path = Some(save_image(path, &output, config)?);
    Ok(())
}

/// Write an edited JPEG for `source` per the output config.
///
/// Returns the path written to. In a dry run nothing is written and the
/// path is only computed. Overwriting the source makes a `.bak` copy first
/// when `backup_originals` is set.
pub fn save_image(source: &Path, jpeg_bytes: &[u8], config: &Config) -> ExifResult<PathBuf> {
    let output_path = output_path(source, config);
    if config.output.dry_run {
        return Ok(output_path);
    }

    if output_path == source && config.output.backup_originals {
        let backup = source.with_extension(backup_extension(source));
        std::fs::copy(source, &backup)?;
        log::debug!("  Backup written to {}", backup.display());
    }
    std::fs::write(&output_path, jpeg_bytes)?;
    Ok(output_path)
}

/// Where the edited copy of `path` goes, per the output config.
pub fn output_path(path: &Path, config: &Config) -> PathBuf {
    if config.output.in_place {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut name = format!("{stem}{}", config.output.suffix);
    if let Some(ext) = path.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    path.with_file_name(name)
}

fn backup_extension(path: &Path) -> String {
    match path.extension() {
        Some(ext) => format!("{}.bak", ext.to_string_lossy()),
        None => "bak".to_string(),
    }
}

/// Collect supported image files from the given paths.
///
/// Accepts a mix of file paths and directory paths. Directories are walked
/// recursively (following symlinks). Only `.jpg`/`.jpeg` files are included.
pub fn collect_images(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_supported_image(path) {
                images.push(path.clone());
            } else {
                log::warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let p = entry.path();
                if p.is_file() && is_supported_image(p) {
                    images.push(p.to_path_buf());
                }
            }
        } else {
            log::warn!("Path does not exist: {}", path.display());
        }
    }

    images
}

/// Check if a file has a supported image extension.
fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
