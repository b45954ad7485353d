//! # exif-editor
//!
//! Read, edit and write back the EXIF tags of JPEG images. Every tag is
//! offered as editable text and read back in the type it was loaded with;
//! GPS coordinates are edited as a decimal latitude/longitude pair.
//!
//! ## Quick Start
//!
//! The pipeline module handles the full read → edit → write flow for files:
//!
//! ```rust,no_run
//! use exif_editor::config::Config;
//! use exif_editor::exif::GpsCoordinates;
//! use exif_editor::pipeline::{collect_images, process_image, Edit};
//! use std::path::PathBuf;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load(Some("config.json".as_ref()))?;
//!     let edits: Vec<Edit> = vec!["Exif.ISOSpeedRatings=800".parse().map_err(anyhow::Error::msg)?];
//!     let gps = GpsCoordinates { latitude: 48.8581, longitude: 2.2945 };
//!
//!     for path in collect_images(&[PathBuf::from("./photos")]) {
//!         let result = process_image(&path, &edits, Some(gps), &config);
//!         if let Some(ref err) = result.error {
//!             eprintln!("Error editing {}: {err}", path.display());
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! Work on the EXIF segment directly:
//!
//! ```rust,no_run
//! use exif_editor::exif::{self, ExifDocument, IfdKind};
//! use exif_editor::pipeline::embed_exif;
//!
//! fn main() -> anyhow::Result<()> {
//!     let jpeg = std::fs::read("photo.jpg")?;
//!
//!     // 1. Decode the segment into typed directories
//!     let mut doc = ExifDocument::load(&jpeg)?;
//!
//!     // 2. Edit a tag through its text form
//!     if let Some(iso) = doc.get(IfdKind::Exif, 0x8827) {
//!         let updated = exif::parse("800", iso);
//!         doc.set(IfdKind::Exif, 0x8827, updated);
//!     }
//!     exif::apply_coords(&mut doc, 48.8581, 2.2945);
//!
//!     // 3. Encode and put it back into the image
//!     let segment = doc.dump()?;
//!     std::fs::write("photo_edited.jpg", embed_exif(&jpeg, &segment)?)?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod exif;
pub mod pipeline;
