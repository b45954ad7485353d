//! EXIF tag directories: binary codec, text codec and GPS conversion.
//!
//! - [`ExifDocument::load`] / [`ExifDocument::dump`] : bytes ↔ typed directories
//! - [`render`] / [`parse`] : typed value ↔ editable string
//! - [`gps`] : decimal degrees ↔ the four GPS coordinate tags
//!
//! The binary side keeps each tag's wire type next to its value, so a value
//! edited as text is written back in the type it was read with.

pub mod codec;
mod document;
pub mod error;
pub mod gps;
mod reader;
pub mod tags;
mod value;
mod writer;

pub use codec::{parse, parse_checked, render, try_parse};
pub use document::{is_gps_coordinate_tag, Directory, ExifDocument, IfdKind};
pub use error::{ExifError, ExifResult, MalformedExifError, ParseFailure, SerializationError};
pub use gps::{apply_coords, read_coordinates, GpsCoordinates, GpsReading};
pub use value::{ByteOrder, Field, FieldType, Opaque, Rational, TagValue};
pub use reader::EXIF_HEADER;
pub use writer::MAX_SEGMENT_LEN;
