use img_parts::jpeg::Jpeg;
use img_parts::{Bytes, ImageEXIF};

use super::document::{Directory, ExifDocument, IfdKind};
use super::error::MalformedExifError;
use super::tags::{
    self, TAG_EXIF_IFD_POINTER, TAG_GPS_IFD_POINTER, TAG_INTEROP_IFD_POINTER,
    TAG_JPEG_INTERCHANGE_FORMAT, TAG_JPEG_INTERCHANGE_FORMAT_LENGTH,
};
use super::value::{ByteOrder, Field, FieldType, Opaque, Rational, TagValue};

/// Prefix of an EXIF APP1 payload, before the TIFF header.
pub const EXIF_HEADER: &[u8] = b"Exif\0\0";

const JPEG_SOI: &[u8] = &[0xFF, 0xD8];

/// Size of one IFD entry: tag, type, count, value/offset.
const ENTRY_SIZE: usize = 12;

impl ExifDocument {
    /// Parse EXIF metadata.
    ///
    /// `bytes` may be a whole JPEG file, an APP1 payload starting with
    /// `Exif\0\0`, or bare TIFF data.
    pub fn load(bytes: &[u8]) -> Result<Self, MalformedExifError> {
        if bytes.starts_with(JPEG_SOI) {
            let tiff = extract_tiff(bytes)?;
            return parse_tiff(&tiff);
        }
        let tiff = bytes.strip_prefix(EXIF_HEADER).unwrap_or(bytes);
        parse_tiff(tiff)
    }
}

/// Pull the TIFF data out of a JPEG's EXIF APP1 segment.
fn extract_tiff(jpeg_bytes: &[u8]) -> Result<Bytes, MalformedExifError> {
    let jpeg = Jpeg::from_bytes(Bytes::copy_from_slice(jpeg_bytes))
        .map_err(|e| MalformedExifError::InvalidContainer(e.to_string()))?;
    match jpeg.exif() {
        Some(tiff) if !tiff.is_empty() => Ok(tiff),
        _ => Err(MalformedExifError::MissingSegment),
    }
}

/// Bounds-checked view over the TIFF data in its own byte order.
struct TiffReader<'a> {
    data: &'a [u8],
    order: ByteOrder,
}

impl<'a> TiffReader<'a> {
    fn slice(&self, offset: usize, len: usize, what: &'static str) -> Result<&'a [u8], MalformedExifError> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or(MalformedExifError::Truncated { what, offset })
    }

    fn u16_at(&self, offset: usize, what: &'static str) -> Result<u16, MalformedExifError> {
        let bytes = self.slice(offset, 2, what)?;
        Ok(self.order.u16([bytes[0], bytes[1]]))
    }

    fn u32_at(&self, offset: usize, what: &'static str) -> Result<u32, MalformedExifError> {
        let bytes = self.slice(offset, 4, what)?;
        Ok(self.order.u32([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn u16_from(&self, bytes: &[u8]) -> u16 {
        self.order.u16([bytes[0], bytes[1]])
    }

    fn u32_from(&self, bytes: &[u8]) -> u32 {
        self.order.u32([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    fn u64_from(&self, bytes: &[u8]) -> u64 {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&bytes[..8]);
        self.order.u64(buf)
    }
}

/// One IFD as read from disk: its fields and the next-IFD pointer.
struct RawIfd {
    fields: Vec<(u16, Field)>,
    next: u32,
}

fn parse_tiff(data: &[u8]) -> Result<ExifDocument, MalformedExifError> {
    if data.is_empty() {
        return Err(MalformedExifError::MissingSegment);
    }
    if data.len() < 8 {
        return Err(MalformedExifError::Truncated {
            what: "TIFF header",
            offset: 0,
        });
    }

    let order = match &data[0..2] {
        b"II" => ByteOrder::Little,
        b"MM" => ByteOrder::Big,
        other => {
            return Err(MalformedExifError::InvalidHeader(format!(
                "unknown byte order marker {other:02X?}"
            )));
        }
    };
    let reader = TiffReader { data, order };

    let magic = reader.u16_at(2, "TIFF magic")?;
    if magic != 42 {
        return Err(MalformedExifError::InvalidHeader(format!(
            "bad TIFF magic {magic}"
        )));
    }

    let mut doc = ExifDocument::with_byte_order(order);

    let ifd0_offset = reader.u32_at(4, "IFD0 offset")? as usize;
    let ifd0 = read_ifd(&reader, IfdKind::Zeroth, ifd0_offset)?;
    let first_offset = ifd0.next;
    let zeroth = collect_directory(IfdKind::Zeroth, ifd0.fields, &mut doc);

    let exif_offset = pointer(&zeroth, TAG_EXIF_IFD_POINTER);
    let gps_offset = pointer(&zeroth, TAG_GPS_IFD_POINTER);

    if let Some(offset) = exif_offset {
        let exif = read_ifd(&reader, IfdKind::Exif, offset)?;
        let exif = collect_directory(IfdKind::Exif, exif.fields, &mut doc);
        if let Some(offset) = pointer(&exif, TAG_INTEROP_IFD_POINTER) {
            let interop = read_ifd(&reader, IfdKind::Interop, offset)?;
            collect_directory(IfdKind::Interop, interop.fields, &mut doc);
        }
    }

    if let Some(offset) = gps_offset {
        let gps = read_ifd(&reader, IfdKind::Gps, offset)?;
        collect_directory(IfdKind::Gps, gps.fields, &mut doc);
    }

    if first_offset != 0 {
        let first = read_ifd(&reader, IfdKind::First, first_offset as usize)?;
        let first = collect_directory(IfdKind::First, first.fields, &mut doc);
        let start = pointer(&first, TAG_JPEG_INTERCHANGE_FORMAT);
        let len = pointer(&first, TAG_JPEG_INTERCHANGE_FORMAT_LENGTH);
        if let (Some(start), Some(len)) = (start, len) {
            let thumbnail = start
                .checked_add(len)
                .and_then(|end| data.get(start..end))
                .ok_or(MalformedExifError::InvalidThumbnail)?;
            doc.thumbnail = Some(thumbnail.to_vec());
        }
    }

    log::debug!(
        "loaded {} EXIF tags in {} directories ({order:?} endian)",
        doc.tag_count(),
        doc.directories.len()
    );
    Ok(doc)
}

/// Offset carried by a pointer tag, if present and integral.
fn pointer(pointers: &[(u16, Field)], tag: u16) -> Option<usize> {
    pointers.iter().find(|(id, _)| *id == tag).and_then(|(_, field)| match field.value {
        TagValue::Integer(offset) if offset >= 0 => Some(offset as usize),
        _ => None,
    })
}

/// Store the non-structural fields in the document and hand back the
/// pointer tags for the caller to follow.
fn collect_directory(
    kind: IfdKind,
    fields: Vec<(u16, Field)>,
    doc: &mut ExifDocument,
) -> Vec<(u16, Field)> {
    let mut pointers = Vec::new();
    let directory: &mut Directory = doc.ensure_directory(kind);
    for (tag, field) in fields {
        if tags::is_pointer_tag(kind, tag) {
            pointers.push((tag, field));
        } else {
            directory.insert_field(tag, field);
        }
    }
    pointers
}

fn read_ifd(reader: &TiffReader<'_>, kind: IfdKind, offset: usize) -> Result<RawIfd, MalformedExifError> {
    let count = reader.u16_at(offset, "IFD entry count")? as usize;
    let entries = reader.slice(offset + 2, count * ENTRY_SIZE, "IFD entries")?;
    let next = reader.u32_at(offset + 2 + count * ENTRY_SIZE, "next IFD offset")?;

    let mut fields = Vec::with_capacity(count);
    for entry in entries.chunks_exact(ENTRY_SIZE) {
        let tag = reader.u16_from(&entry[0..2]);
        let type_code = reader.u16_from(&entry[2..4]);
        let count = reader.u32_from(&entry[4..8]) as usize;

        let Ok(field_type) = FieldType::try_from(type_code) else {
            log::warn!("{kind} tag 0x{tag:04X}: skipping unknown field type {type_code}");
            continue;
        };

        let len = count
            .checked_mul(field_type.size())
            .ok_or(MalformedExifError::CountOverflow { ifd: kind, tag })?;
        let raw = if len <= 4 {
            &entry[8..8 + len]
        } else {
            let value_offset = reader.u32_from(&entry[8..12]) as usize;
            reader.slice(value_offset, len, "tag value")?
        };

        fields.push((tag, Field::new(field_type, decode_value(reader, field_type, raw))));
    }

    log::debug!("{kind}: {} entries at offset {offset}", fields.len());
    Ok(RawIfd { fields, next })
}

fn decode_value(reader: &TiffReader<'_>, field_type: FieldType, raw: &[u8]) -> TagValue {
    match field_type {
        FieldType::Ascii => {
            let text = raw.strip_suffix(&[0]).unwrap_or(raw);
            TagValue::Text(text.to_vec())
        }
        FieldType::Undefined => TagValue::Text(raw.to_vec()),
        FieldType::Byte => integers(raw.iter().map(|b| *b as i64).collect()),
        FieldType::SByte => integers(raw.iter().map(|b| *b as i8 as i64).collect()),
        FieldType::Short => integers(raw.chunks_exact(2).map(|c| reader.u16_from(c) as i64).collect()),
        FieldType::SShort => {
            integers(raw.chunks_exact(2).map(|c| reader.u16_from(c) as i16 as i64).collect())
        }
        FieldType::Long => integers(raw.chunks_exact(4).map(|c| reader.u32_from(c) as i64).collect()),
        FieldType::SLong => {
            integers(raw.chunks_exact(4).map(|c| reader.u32_from(c) as i32 as i64).collect())
        }
        FieldType::Rational => rationals(
            raw.chunks_exact(8)
                .map(|c| Rational::new(reader.u32_from(&c[0..4]) as i64, reader.u32_from(&c[4..8]) as i64))
                .collect(),
        ),
        FieldType::SRational => rationals(
            raw.chunks_exact(8)
                .map(|c| {
                    Rational::new(
                        reader.u32_from(&c[0..4]) as i32 as i64,
                        reader.u32_from(&c[4..8]) as i32 as i64,
                    )
                })
                .collect(),
        ),
        FieldType::Float => TagValue::Opaque(Opaque::Floats(
            raw.chunks_exact(4)
                .map(|c| f32::from_bits(reader.u32_from(c)) as f64)
                .collect(),
        )),
        FieldType::Double => TagValue::Opaque(Opaque::Floats(
            raw.chunks_exact(8)
                .map(|c| f64::from_bits(reader.u64_from(c)))
                .collect(),
        )),
    }
}

fn integers(mut values: Vec<i64>) -> TagValue {
    if values.len() == 1 {
        TagValue::Integer(values.remove(0))
    } else {
        TagValue::Opaque(Opaque::Integers(values))
    }
}

fn rationals(mut values: Vec<Rational>) -> TagValue {
    if values.len() == 1 {
        TagValue::Rational(values.remove(0))
    } else {
        TagValue::RationalList(values)
    }
}
