use thiserror::Error;

use super::document::IfdKind;
use super::value::FieldType;

/// The EXIF segment could not be parsed. Terminal for the current image.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MalformedExifError {
    #[error("no EXIF segment found")]
    MissingSegment,

    #[error("invalid image container: {0}")]
    InvalidContainer(String),

    #[error("invalid TIFF header: {0}")]
    InvalidHeader(String),

    #[error("truncated EXIF data: {what} at offset {offset}")]
    Truncated { what: &'static str, offset: usize },

    #[error("value count overflow for tag 0x{tag:04X} in {ifd}")]
    CountOverflow { ifd: IfdKind, tag: u16 },

    #[error("thumbnail points outside the EXIF segment")]
    InvalidThumbnail,
}

/// The in-memory document could not be written back to bytes.
///
/// The document itself is left untouched, so the caller can fix the
/// offending field and try again.
#[derive(Debug, Error, PartialEq)]
pub enum SerializationError {
    #[error("{ifd} tag 0x{tag:04X}: value does not fit field type {field_type:?}")]
    TypeMismatch {
        ifd: IfdKind,
        tag: u16,
        field_type: FieldType,
    },

    #[error("{ifd} tag 0x{tag:04X}: {value} is out of range for {field_type:?}")]
    OutOfRange {
        ifd: IfdKind,
        tag: u16,
        field_type: FieldType,
        value: i64,
    },

    #[error("{ifd} tag 0x{tag:04X}: free text {text:?} cannot be written as {field_type:?}")]
    OpaqueLiteral {
        ifd: IfdKind,
        tag: u16,
        field_type: FieldType,
        text: String,
    },

    #[error("{ifd} tag 0x{tag:04X} is a directory pointer and is written by the encoder")]
    PointerTag { ifd: IfdKind, tag: u16 },

    #[error("EXIF segment is {0} bytes, larger than the 65533 bytes an APP1 segment can hold")]
    SegmentTooLarge(usize),
}

/// Why an edited string could not be read back into a value.
///
/// Never escapes [`parse`](super::codec::parse); the public codec keeps the
/// original value instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseFailure {
    #[error("not an integer: {0:?}")]
    InvalidInteger(String),

    #[error("malformed fraction: {0:?}")]
    MalformedFraction(String),
}

/// Any failure of the load → edit → save flow.
#[derive(Debug, Error)]
pub enum ExifError {
    #[error(transparent)]
    Malformed(#[from] MalformedExifError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ExifResult<T> = Result<T, ExifError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MalformedExifError::Truncated {
            what: "IFD entries",
            offset: 120,
        };
        assert_eq!(err.to_string(), "truncated EXIF data: IFD entries at offset 120");

        let err = SerializationError::OutOfRange {
            ifd: IfdKind::Exif,
            tag: 0x8827,
            field_type: FieldType::Short,
            value: 70000,
        };
        assert!(err.to_string().contains("Exif tag 0x8827"));
        assert!(err.to_string().contains("70000"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ExifError = io_err.into();
        assert!(matches!(err, ExifError::Io(_)));
    }
}
