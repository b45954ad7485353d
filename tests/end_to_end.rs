use std::io::Cursor;
use std::path::Path;

use exif_editor::config::Config;
use exif_editor::exif::{
    self, ExifDocument, FieldType, GpsCoordinates, IfdKind, MalformedExifError, Rational, TagValue,
};
use exif_editor::pipeline::{self, embed_exif, extract_exif, render_fields, Edit, EditSession};
use img_parts::jpeg::{Jpeg, JpegSegment};
use img_parts::Bytes;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

/// A small plain JPEG with no EXIF segment.
fn blank_jpeg() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(16, 16, image::Rgb([200, 120, 40]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)
        .unwrap();
    buf
}

/// ISO 400 and a GPS position near the Eiffel tower, in DMS form.
fn camera_document() -> ExifDocument {
    let mut doc = ExifDocument::new();
    doc.set(IfdKind::Zeroth, 0x010F, TagValue::text("Canon"));
    doc.set(IfdKind::Zeroth, 0x0110, TagValue::text("Canon EOS 5D"));
    doc.set(IfdKind::Exif, 0x8827, TagValue::Integer(400));
    doc.set(IfdKind::Exif, 0x829D, TagValue::Rational(Rational::new(28, 10)));
    doc.set(IfdKind::Gps, 0x0001, TagValue::text("N"));
    doc.set(IfdKind::Gps, 0x0002, TagValue::rationals(&[(48, 1), (51, 1), (29, 1)]));
    doc.set(IfdKind::Gps, 0x0003, TagValue::text("E"));
    doc.set(IfdKind::Gps, 0x0004, TagValue::rationals(&[(2, 1), (17, 1), (40, 1)]));
    doc
}

fn camera_jpeg() -> Vec<u8> {
    let segment = camera_document().dump().unwrap();
    embed_exif(&blank_jpeg(), &segment).unwrap()
}

fn write_image(dir: &Path, name: &str, bytes: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn edit_iso_and_keep_gps() {
    let jpeg = camera_jpeg();
    let mut session = EditSession::open(&jpeg).unwrap();

    let iso = session
        .fields()
        .into_iter()
        .find(|f| f.directory == IfdKind::Exif && f.name == "ISOSpeedRatings")
        .unwrap();
    assert_eq!(iso.value, "400");

    let reading = session.coordinates();
    assert!(reading.has_gps);
    assert!((reading.latitude - 48.858_055).abs() < 1e-4);

    let report = session.submit(&[Edit::new(IfdKind::Exif, 0x8827, "800")], None);
    assert_eq!(report.changed, vec!["Exif.ISOSpeedRatings"]);

    let edited = embed_exif(&jpeg, &session.dump().unwrap()).unwrap();
    let reloaded = ExifDocument::load(&edited).unwrap();

    assert_eq!(reloaded.get(IfdKind::Exif, 0x8827), Some(&TagValue::Integer(800)));
    assert_eq!(reloaded.field(IfdKind::Exif, 0x8827).unwrap().field_type, FieldType::Short);
    assert_eq!(reloaded.get(IfdKind::Zeroth, 0x010F), Some(&TagValue::text("Canon")));
    assert_eq!(
        reloaded.get(IfdKind::Gps, 0x0002),
        Some(&TagValue::rationals(&[(48, 1), (51, 1), (29, 1)]))
    );
    let reading = exif::read_coordinates(&reloaded);
    assert!((reading.latitude - 48.8581).abs() < 1e-4);
    assert!((reading.longitude - 2.2944).abs() < 1e-3);
}

#[test]
fn unchanged_form_round_trips_bytes() {
    let jpeg = camera_jpeg();
    let doc = ExifDocument::load(&jpeg).unwrap();
    let first_dump = doc.dump().unwrap();

    let mut session = EditSession::from_document(doc.clone());
    let edits: Vec<Edit> = render_fields(&doc)
        .into_iter()
        .map(|f| Edit::new(f.directory, f.tag, f.value))
        .collect();
    let report = session.submit(&edits, None);

    assert!(report.changed.is_empty());
    assert!(report.reverted.is_empty());
    assert_eq!(session.document(), &doc);
    assert_eq!(session.dump().unwrap(), first_dump);
    assert_eq!(ExifDocument::load(&first_dump).unwrap(), doc);
}

#[test]
fn moving_gps_to_southern_hemisphere() {
    let jpeg = camera_jpeg();
    let mut session = EditSession::open(&jpeg).unwrap();
    let sydney = GpsCoordinates {
        latitude: -33.8688,
        longitude: 151.2093,
    };
    session.submit(&[], Some(sydney));

    let reloaded = ExifDocument::load(&session.dump().unwrap()).unwrap();
    assert_eq!(reloaded.get(IfdKind::Gps, 0x0001), Some(&TagValue::text("S")));
    assert_eq!(reloaded.get(IfdKind::Gps, 0x0003), Some(&TagValue::text("E")));
    let reading = exif::read_coordinates(&reloaded);
    assert!((reading.latitude - sydney.latitude).abs() < 1e-6);
    assert!((reading.longitude - sydney.longitude).abs() < 1e-6);
}

#[test]
fn embedding_keeps_image_data() {
    let blank = blank_jpeg();
    let jpeg = camera_jpeg();

    // The image still decodes and the pixel data did not move.
    let decoded = image::load_from_memory(&jpeg).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (16, 16));
    assert!(jpeg.ends_with(&blank[blank.len() - 64..]));

    let segment = camera_document().dump().unwrap();
    assert_eq!(extract_exif(&jpeg).unwrap(), Some(segment.clone()));
    assert_eq!(extract_exif(&blank).unwrap(), None);

    // Replacing the segment does not add a second one.
    let twice = embed_exif(&jpeg, &segment).unwrap();
    assert_eq!(twice.len(), jpeg.len());
}

/// `blank_jpeg` with its APPn segments replaced by JFIF APP0 then an XMP APP1.
fn jpeg_with_app0_and_xmp() -> Vec<u8> {
    let mut jpeg = Jpeg::from_bytes(Bytes::from(blank_jpeg())).unwrap();
    let segments = jpeg.segments_mut();
    segments.retain(|s| !(0xE0..=0xEF).contains(&s.marker()));
    segments.insert(
        0,
        JpegSegment::new_with_contents(0xE0, Bytes::from_static(b"JFIF\0\x01\x01\0\0\x01\0\x01\0\0")),
    );
    segments.insert(
        1,
        JpegSegment::new_with_contents(
            0xE1,
            Bytes::from_static(b"http://ns.adobe.com/xap/1.0/\0<x:xmpmeta xmlns:x='adobe:ns:meta/'/>"),
        ),
    );
    jpeg.encoder().bytes().to_vec()
}

/// APPn markers in file order, flagged when the segment carries EXIF.
fn app_segments(bytes: &[u8]) -> Vec<(u8, bool)> {
    let jpeg = Jpeg::from_bytes(Bytes::copy_from_slice(bytes)).unwrap();
    jpeg.segments()
        .iter()
        .filter(|s| (0xE0..=0xEF).contains(&s.marker()))
        .map(|s| (s.marker(), s.contents().starts_with(b"Exif\0\0")))
        .collect()
}

#[test]
fn new_exif_segment_goes_after_app0_and_stays_there() {
    let source = jpeg_with_app0_and_xmp();
    assert_eq!(app_segments(&source), vec![(0xE0, false), (0xE1, false)]);

    let segment = camera_document().dump().unwrap();
    let embedded = embed_exif(&source, &segment).unwrap();
    let expected = vec![(0xE0, false), (0xE1, true), (0xE1, false)];
    assert_eq!(app_segments(&embedded), expected);

    let mut session = EditSession::open(&embedded).unwrap();
    session.submit(&[Edit::new(IfdKind::Exif, 0x8827, "3200")], None);
    let re_embedded = embed_exif(&embedded, &session.dump().unwrap()).unwrap();
    assert_eq!(app_segments(&re_embedded), expected);

    let reloaded = ExifDocument::load(&re_embedded).unwrap();
    assert_eq!(reloaded.get(IfdKind::Exif, 0x8827), Some(&TagValue::Integer(3200)));
}

#[test]
fn thumbnail_survives_edits() {
    let mut doc = camera_document();
    doc.ensure_directory(IfdKind::First);
    doc.set(IfdKind::First, 0x0103, TagValue::Integer(6));
    let thumbnail = vec![0xFF, 0xD8, 0x01, 0x02, 0x03, 0xFF, 0xD9];
    doc.set_thumbnail(Some(thumbnail.clone()));

    let jpeg = embed_exif(&blank_jpeg(), &doc.dump().unwrap()).unwrap();
    let mut session = EditSession::open(&jpeg).unwrap();
    session.submit(&[Edit::new(IfdKind::Zeroth, 0x010F, "Nikon")], None);

    let reloaded = ExifDocument::load(&session.dump().unwrap()).unwrap();
    assert_eq!(reloaded.thumbnail(), Some(thumbnail.as_slice()));
    assert_eq!(reloaded.get(IfdKind::First, 0x0103), Some(&TagValue::Integer(6)));
    assert_eq!(reloaded.get(IfdKind::Zeroth, 0x010F), Some(&TagValue::text("Nikon")));
}

#[test]
fn malformed_input_is_rejected() {
    let segment = camera_document().dump().unwrap();
    let truncated = &segment[..segment.len() / 2];
    assert!(matches!(
        ExifDocument::load(truncated),
        Err(MalformedExifError::Truncated { .. })
    ));

    assert_eq!(
        EditSession::open(&blank_jpeg()).unwrap_err(),
        MalformedExifError::MissingSegment
    );
}

#[test]
fn process_image_writes_sibling_copy() {
    let dir = tempdir().unwrap();
    let original = camera_jpeg();
    let path = write_image(dir.path(), "photo.jpg", &original);

    let config = Config::default();
    let edits = vec!["Exif.ISOSpeedRatings=1600".parse::<Edit>().unwrap()];
    let result = pipeline::process_image(&path, &edits, None, &config);

    assert_eq!(result.error, None);
    let output = dir.path().join("photo_edited.jpg");
    assert_eq!(result.output_path.as_deref(), Some(output.as_path()));
    assert_eq!(std::fs::read(&path).unwrap(), original);

    let edited = ExifDocument::load(&std::fs::read(&output).unwrap()).unwrap();
    assert_eq!(edited.get(IfdKind::Exif, 0x8827), Some(&TagValue::Integer(1600)));
}

#[test]
fn process_image_in_place_keeps_backup() {
    let dir = tempdir().unwrap();
    let original = camera_jpeg();
    let path = write_image(dir.path(), "photo.jpg", &original);

    let mut config = Config::default();
    config.output.in_place = true;
    let gps = GpsCoordinates {
        latitude: 35.6586,
        longitude: 139.7454,
    };
    let result = pipeline::process_image(&path, &[], Some(gps), &config);

    assert_eq!(result.error, None);
    assert!(result.report.gps_written);
    assert_eq!(std::fs::read(dir.path().join("photo.jpg.bak")).unwrap(), original);

    let edited = ExifDocument::load(&std::fs::read(&path).unwrap()).unwrap();
    let reading = exif::read_coordinates(&edited);
    assert!((reading.latitude - 35.6586).abs() < 1e-6);
}

#[test]
fn process_image_dry_run_writes_nothing() {
    let dir = tempdir().unwrap();
    let path = write_image(dir.path(), "photo.jpg", &camera_jpeg());

    let mut config = Config::default();
    config.output.dry_run = true;
    let edits = vec![Edit::new(IfdKind::Zeroth, 0x010F, "Nikon")];
    let result = pipeline::process_image(&path, &edits, None, &config);

    assert_eq!(result.error, None);
    assert!(result.dry_run);
    assert_eq!(result.report.changed, vec!["0th.Make"]);
    assert!(!dir.path().join("photo_edited.jpg").exists());
}

#[test]
fn process_image_reports_errors() {
    let dir = tempdir().unwrap();
    let path = write_image(dir.path(), "plain.jpg", &blank_jpeg());

    let edits = vec![Edit::new(IfdKind::Zeroth, 0x010F, "Nikon")];
    let result = pipeline::process_image(&path, &edits, None, &Config::default());
    assert!(result.error.is_some());
    assert_eq!(result.output_path, None);
}

#[test]
fn collect_images_walks_directories() {
    let dir = tempdir().unwrap();
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    write_image(dir.path(), "a.jpg", b"");
    write_image(&dir.path().join("nested"), "b.JPEG", b"");
    write_image(dir.path(), "notes.txt", b"");

    let mut found = pipeline::collect_images(&[dir.path().to_path_buf()]);
    found.sort();
    assert_eq!(
        found,
        vec![dir.path().join("a.jpg"), dir.path().join("nested").join("b.JPEG")]
    );
}
