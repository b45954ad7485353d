use super::document::{ExifDocument, IfdKind};
use super::error::SerializationError;
use super::reader::EXIF_HEADER;
use super::tags::{
    self, TAG_EXIF_IFD_POINTER, TAG_GPS_IFD_POINTER, TAG_INTEROP_IFD_POINTER,
    TAG_JPEG_INTERCHANGE_FORMAT, TAG_JPEG_INTERCHANGE_FORMAT_LENGTH,
};
use super::value::{ByteOrder, Field, FieldType, Opaque, TagValue};

/// Largest payload an APP1 segment can carry (64 KiB minus the length field).
pub const MAX_SEGMENT_LEN: usize = 65533;

const TIFF_HEADER_LEN: usize = 8;

impl ExifDocument {
    /// Serialize every directory back to an EXIF APP1 payload
    /// (`Exif\0\0` followed by TIFF data in the document's byte order).
    ///
    /// Pointer tags are regenerated; the document is not modified, so a
    /// failed dump leaves it editable.
    pub fn dump(&self) -> Result<Vec<u8>, SerializationError> {
        dump(self)
    }
}

/// A raw IFD entry, already encoded in the output byte order.
struct RawIfdEntry {
    tag_id: u16,
    data_format: u16,
    count: u32,
    data: Vec<u8>,
}

impl RawIfdEntry {
    fn pointer(order: ByteOrder, tag_id: u16, value: u32) -> Self {
        RawIfdEntry {
            tag_id,
            data_format: FieldType::Long as u16,
            count: 1,
            data: order.encode_u32(value).to_vec(),
        }
    }

    /// Bytes stored after the IFD, word aligned. Zero for inline values.
    fn extra_len(&self) -> usize {
        if self.data.len() <= 4 {
            0
        } else {
            self.data.len() + self.data.len() % 2
        }
    }
}

fn ifd_size(entries: &[RawIfdEntry]) -> usize {
    2 + entries.len() * 12 + 4 + entries.iter().map(RawIfdEntry::extra_len).sum::<usize>()
}

fn dump(doc: &ExifDocument) -> Result<Vec<u8>, SerializationError> {
    let order = doc.byte_order;

    let mut zeroth = encode_directory(doc, IfdKind::Zeroth)?;
    let mut exif = encode_directory(doc, IfdKind::Exif)?;
    let gps = encode_directory(doc, IfdKind::Gps)?;
    let interop = encode_directory(doc, IfdKind::Interop)?;
    let mut first = encode_directory(doc, IfdKind::First)?;

    let has_interop = !interop.is_empty();
    let has_exif = !exif.is_empty() || has_interop;
    let has_gps = !gps.is_empty();
    let has_first = !first.is_empty() || doc.thumbnail.is_some();

    // Pointer entries are fixed-size, so placeholders give final IFD sizes.
    if has_exif {
        zeroth.push(RawIfdEntry::pointer(order, TAG_EXIF_IFD_POINTER, 0));
    }
    if has_gps {
        zeroth.push(RawIfdEntry::pointer(order, TAG_GPS_IFD_POINTER, 0));
    }
    if has_interop {
        exif.push(RawIfdEntry::pointer(order, TAG_INTEROP_IFD_POINTER, 0));
    }
    if let Some(thumbnail) = &doc.thumbnail {
        first.push(RawIfdEntry::pointer(order, TAG_JPEG_INTERCHANGE_FORMAT, 0));
        first.push(RawIfdEntry::pointer(
            order,
            TAG_JPEG_INTERCHANGE_FORMAT_LENGTH,
            thumbnail.len() as u32,
        ));
    }

    let mut offset = TIFF_HEADER_LEN;
    let mut place = |present: bool, entries: &[RawIfdEntry]| {
        present.then(|| {
            let start = offset;
            offset += ifd_size(entries);
            start
        })
    };
    let zeroth_offset = TIFF_HEADER_LEN;
    place(true, &zeroth);
    let exif_offset = place(has_exif, &exif);
    let gps_offset = place(has_gps, &gps);
    let interop_offset = place(has_interop, &interop);
    let first_offset = place(has_first, &first);
    let thumbnail_offset = offset;

    let total = EXIF_HEADER.len()
        + thumbnail_offset
        + doc.thumbnail.as_ref().map_or(0, Vec::len);
    if total > MAX_SEGMENT_LEN {
        return Err(SerializationError::SegmentTooLarge(total));
    }

    set_pointer(order, &mut zeroth, TAG_EXIF_IFD_POINTER, exif_offset);
    set_pointer(order, &mut zeroth, TAG_GPS_IFD_POINTER, gps_offset);
    set_pointer(order, &mut exif, TAG_INTEROP_IFD_POINTER, interop_offset);
    set_pointer(
        order,
        &mut first,
        TAG_JPEG_INTERCHANGE_FORMAT,
        doc.thumbnail.as_ref().map(|_| thumbnail_offset),
    );

    let mut tiff = Vec::with_capacity(total - EXIF_HEADER.len());
    tiff.extend_from_slice(order.marker());
    tiff.extend_from_slice(&order.encode_u16(42));
    tiff.extend_from_slice(&order.encode_u32(zeroth_offset as u32));

    write_ifd(order, &mut tiff, zeroth, first_offset.unwrap_or(0));
    if has_exif {
        write_ifd(order, &mut tiff, exif, 0);
    }
    if has_gps {
        write_ifd(order, &mut tiff, gps, 0);
    }
    if has_interop {
        write_ifd(order, &mut tiff, interop, 0);
    }
    if has_first {
        write_ifd(order, &mut tiff, first, 0);
    }
    if let Some(thumbnail) = &doc.thumbnail {
        tiff.extend_from_slice(thumbnail);
    }
    debug_assert_eq!(tiff.len() + EXIF_HEADER.len(), total);

    let mut segment = Vec::with_capacity(total);
    segment.extend_from_slice(EXIF_HEADER);
    segment.extend_from_slice(&tiff);
    log::debug!("dumped {} EXIF tags into {} bytes", doc.tag_count(), segment.len());
    Ok(segment)
}

fn set_pointer(order: ByteOrder, entries: &mut [RawIfdEntry], tag_id: u16, offset: Option<usize>) {
    if let Some(offset) = offset {
        if let Some(entry) = entries.iter_mut().find(|e| e.tag_id == tag_id) {
            entry.data = order.encode_u32(offset as u32).to_vec();
        }
    }
}

/// Write one IFD at the end of `out`: count, sorted entries, next pointer,
/// then the out-of-line values.
fn write_ifd(order: ByteOrder, out: &mut Vec<u8>, mut entries: Vec<RawIfdEntry>, next: usize) {
    entries.sort_by_key(|e| e.tag_id);

    let base = out.len();
    let mut data_offset = base + 2 + entries.len() * 12 + 4;

    out.extend_from_slice(&order.encode_u16(entries.len() as u16));
    for entry in &entries {
        out.extend_from_slice(&order.encode_u16(entry.tag_id));
        out.extend_from_slice(&order.encode_u16(entry.data_format));
        out.extend_from_slice(&order.encode_u32(entry.count));
        if entry.data.len() <= 4 {
            let mut inline = [0u8; 4];
            inline[..entry.data.len()].copy_from_slice(&entry.data);
            out.extend_from_slice(&inline);
        } else {
            out.extend_from_slice(&order.encode_u32(data_offset as u32));
            data_offset += entry.extra_len();
        }
    }
    out.extend_from_slice(&order.encode_u32(next as u32));

    for entry in entries.iter().filter(|e| e.data.len() > 4) {
        out.extend_from_slice(&entry.data);
        if entry.data.len() % 2 != 0 {
            out.push(0);
        }
    }
}

fn encode_directory(doc: &ExifDocument, kind: IfdKind) -> Result<Vec<RawIfdEntry>, SerializationError> {
    let Some(directory) = doc.directory(kind) else {
        return Ok(Vec::new());
    };
    directory
        .fields()
        .map(|(tag, field)| {
            if tags::is_pointer_tag(kind, tag) {
                return Err(SerializationError::PointerTag { ifd: kind, tag });
            }
            encode_field(doc.byte_order, kind, tag, field)
        })
        .collect()
}

fn encode_field(
    order: ByteOrder,
    ifd: IfdKind,
    tag: u16,
    field: &Field,
) -> Result<RawIfdEntry, SerializationError> {
    let field_type = field.field_type;
    let mismatch = || SerializationError::TypeMismatch {
        ifd,
        tag,
        field_type,
    };
    let out_of_range = |value: i64| SerializationError::OutOfRange {
        ifd,
        tag,
        field_type,
        value,
    };

    let (count, data) = match &field.value {
        TagValue::Opaque(Opaque::Literal(text)) => {
            return Err(SerializationError::OpaqueLiteral {
                ifd,
                tag,
                field_type,
                text: text.clone(),
            });
        }
        value if !field_type.accepts(value) => return Err(mismatch()),

        TagValue::Text(bytes) => {
            let mut data = bytes.clone();
            if field_type == FieldType::Ascii {
                data.push(0);
            }
            (data.len(), data)
        }
        TagValue::Integer(value) => (1, encode_integers(order, field_type, &[*value], out_of_range)?),
        TagValue::Opaque(Opaque::Integers(values)) => {
            (values.len(), encode_integers(order, field_type, values, out_of_range)?)
        }
        TagValue::Rational(_) | TagValue::RationalList(_) => {
            let rationals = field.value.as_rationals();
            let mut data = Vec::with_capacity(rationals.len() * 8);
            for r in rationals {
                for part in [r.numerator, r.denominator] {
                    let word = if field_type == FieldType::SRational {
                        i32::try_from(part).map_err(|_| out_of_range(part))? as u32
                    } else {
                        u32::try_from(part).map_err(|_| out_of_range(part))?
                    };
                    data.extend_from_slice(&order.encode_u32(word));
                }
            }
            (rationals.len(), data)
        }
        TagValue::Opaque(Opaque::Floats(values)) => {
            let mut data = Vec::with_capacity(values.len() * field_type.size());
            for value in values {
                if field_type == FieldType::Float {
                    data.extend_from_slice(&order.encode_u32((*value as f32).to_bits()));
                } else {
                    data.extend_from_slice(&order.encode_u64(value.to_bits()));
                }
            }
            (values.len(), data)
        }
    };

    Ok(RawIfdEntry {
        tag_id: tag,
        data_format: field_type as u16,
        count: count as u32,
        data,
    })
}

fn encode_integers(
    order: ByteOrder,
    field_type: FieldType,
    values: &[i64],
    out_of_range: impl Fn(i64) -> SerializationError,
) -> Result<Vec<u8>, SerializationError> {
    let mut data = Vec::with_capacity(values.len() * field_type.size());
    for &value in values {
        let err = || out_of_range(value);
        match field_type {
            FieldType::Byte => data.push(u8::try_from(value).map_err(|_| err())?),
            FieldType::SByte => data.push(i8::try_from(value).map_err(|_| err())? as u8),
            FieldType::Short => {
                data.extend_from_slice(&order.encode_u16(u16::try_from(value).map_err(|_| err())?))
            }
            FieldType::SShort => data.extend_from_slice(
                &order.encode_u16(i16::try_from(value).map_err(|_| err())? as u16),
            ),
            FieldType::Long => {
                data.extend_from_slice(&order.encode_u32(u32::try_from(value).map_err(|_| err())?))
            }
            FieldType::SLong => data.extend_from_slice(
                &order.encode_u32(i32::try_from(value).map_err(|_| err())? as u32),
            ),
            _ => unreachable!("accepts() admits only integer types here"),
        }
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exif::value::Rational;

    fn sample_document(order: ByteOrder) -> ExifDocument {
        let mut doc = ExifDocument::with_byte_order(order);
        doc.set(IfdKind::Zeroth, 0x010F, TagValue::text("Canon"));
        doc.set(IfdKind::Zeroth, 0x0110, TagValue::text("EOS"));
        doc.set(IfdKind::Zeroth, 0x011A, TagValue::Rational(Rational::new(72, 1)));
        doc.set(IfdKind::Exif, 0x8827, TagValue::Integer(400));
        doc.set(IfdKind::Exif, 0x9204, TagValue::Rational(Rational::new(-1, 3)));
        doc.set(IfdKind::Exif, 0x9000, TagValue::text("0231"));
        doc.set(IfdKind::Gps, 0x0000, TagValue::Opaque(Opaque::Integers(vec![2, 3, 0, 0])));
        doc.set(IfdKind::Interop, 0x0001, TagValue::text("R98"));
        doc.set(IfdKind::First, 0x0103, TagValue::Integer(6));
        doc.set_thumbnail(Some(vec![0xFF, 0xD8, 0xAA, 0xFF, 0xD9]));
        doc
    }

    #[test]
    fn dump_then_load_is_lossless() {
        for order in [ByteOrder::Big, ByteOrder::Little] {
            let doc = sample_document(order);
            let bytes = doc.dump().unwrap();
            assert!(bytes.starts_with(EXIF_HEADER));
            let loaded = ExifDocument::load(&bytes).unwrap();
            assert_eq!(loaded, doc, "{order:?}");
        }
    }

    #[test]
    fn dump_keeps_wire_types() {
        let doc = sample_document(ByteOrder::Big);
        let loaded = ExifDocument::load(&doc.dump().unwrap()).unwrap();
        assert_eq!(loaded.field(IfdKind::Exif, 0x8827).map(|f| f.field_type), Some(FieldType::Short));
        assert_eq!(
            loaded.field(IfdKind::Exif, 0x9204).map(|f| f.field_type),
            Some(FieldType::SRational)
        );
        assert_eq!(loaded.field(IfdKind::Exif, 0x9000).map(|f| f.field_type), Some(FieldType::Undefined));
    }

    #[test]
    fn empty_document_dumps_bare_ifd0() {
        let bytes = ExifDocument::new().dump().unwrap();
        let mut expected = EXIF_HEADER.to_vec();
        expected.extend_from_slice(b"MM\x00\x2a\x00\x00\x00\x08");
        expected.extend_from_slice(&[0u8; 6]);
        assert_eq!(bytes, expected);
        assert_eq!(ExifDocument::load(&bytes).unwrap().tag_count(), 0);
    }

    #[test]
    fn entries_are_sorted_and_out_of_line_values_aligned() {
        let mut doc = ExifDocument::new();
        doc.set(IfdKind::Zeroth, 0x0110, TagValue::text("ABCDE"));
        doc.set(IfdKind::Zeroth, 0x010F, TagValue::text("XY"));
        let bytes = doc.dump().unwrap();
        let tiff = &bytes[EXIF_HEADER.len()..];
        // first entry is Make (0x010F), inline "XY\0"
        assert_eq!(&tiff[10..12], &[0x01, 0x0F]);
        assert_eq!(&tiff[18..22], b"XY\0\0");
        // Model is 6 bytes, stored right after the IFD
        assert_eq!(&tiff[22..24], &[0x01, 0x10]);
        let value_offset = u32::from_be_bytes([tiff[30], tiff[31], tiff[32], tiff[33]]) as usize;
        assert_eq!(value_offset, 8 + 2 + 24 + 4);
        assert_eq!(&tiff[value_offset..value_offset + 6], b"ABCDE\0");
    }

    #[test]
    fn out_of_range_integer_fails() {
        let mut doc = sample_document(ByteOrder::Big);
        doc.set(IfdKind::Exif, 0x8827, TagValue::Integer(70000));
        assert_eq!(
            doc.dump(),
            Err(SerializationError::OutOfRange {
                ifd: IfdKind::Exif,
                tag: 0x8827,
                field_type: FieldType::Short,
                value: 70000,
            })
        );
    }

    #[test]
    fn negative_unsigned_rational_fails() {
        let mut doc = ExifDocument::new();
        doc.set(IfdKind::Zeroth, 0x011A, TagValue::Rational(Rational::new(72, 1)));
        doc.set(IfdKind::Zeroth, 0x011A, TagValue::Rational(Rational::new(72, -1)));
        assert!(matches!(doc.dump(), Err(SerializationError::OutOfRange { value: -1, .. })));
    }

    #[test]
    fn variant_mismatch_fails() {
        let mut doc = ExifDocument::new();
        doc.set(IfdKind::Exif, 0x829A, TagValue::Rational(Rational::new(1, 60)));
        doc.set(IfdKind::Exif, 0x829A, TagValue::Integer(60));
        assert!(matches!(doc.dump(), Err(SerializationError::TypeMismatch { tag: 0x829A, .. })));
    }

    #[test]
    fn opaque_literal_fails_and_document_stays_editable() {
        let mut doc = sample_document(ByteOrder::Big);
        doc.set(IfdKind::Gps, 0x0000, TagValue::Opaque(Opaque::Literal("2.3".into())));
        assert!(matches!(doc.dump(), Err(SerializationError::OpaqueLiteral { .. })));

        doc.set(IfdKind::Gps, 0x0000, TagValue::Opaque(Opaque::Integers(vec![2, 3, 0, 0])));
        assert!(doc.dump().is_ok());
    }

    #[test]
    fn oversized_segment_fails() {
        let mut doc = ExifDocument::new();
        doc.set(IfdKind::Exif, 0x927C, TagValue::Text(vec![0x20; MAX_SEGMENT_LEN]));
        assert!(matches!(doc.dump(), Err(SerializationError::SegmentTooLarge(_))));
    }

    #[test]
    fn floats_round_trip() {
        let mut doc = ExifDocument::new();
        doc.ensure_directory(IfdKind::Zeroth);
        doc.ensure_directory(IfdKind::Exif).insert_field(
            0xC000,
            Field::new(FieldType::Double, TagValue::Opaque(Opaque::Floats(vec![1.25, -3.5]))),
        );
        doc.ensure_directory(IfdKind::Exif).insert_field(
            0xC001,
            Field::new(FieldType::Float, TagValue::Opaque(Opaque::Floats(vec![0.5]))),
        );
        let loaded = ExifDocument::load(&doc.dump().unwrap()).unwrap();
        assert_eq!(loaded, doc);
    }

    #[test]
    fn hand_set_pointer_tag_fails() {
        let mut doc = ExifDocument::new();
        doc.set(IfdKind::Exif, 0x8827, TagValue::Integer(400));
        doc.set(IfdKind::Zeroth, 0x8769, TagValue::text("x"));
        assert_eq!(
            doc.dump(),
            Err(SerializationError::PointerTag {
                ifd: IfdKind::Zeroth,
                tag: 0x8769,
            })
        );

        doc.set(IfdKind::Zeroth, 0x8769, TagValue::Integer(1234));
        assert!(matches!(doc.dump(), Err(SerializationError::PointerTag { tag: 0x8769, .. })));

        doc.remove(IfdKind::Zeroth, 0x8769);
        let loaded = ExifDocument::load(&doc.dump().unwrap()).unwrap();
        assert_eq!(loaded.get(IfdKind::Exif, 0x8827), Some(&TagValue::Integer(400)));
        assert!(!loaded.directory(IfdKind::Zeroth).unwrap().contains(0x8769));
    }
}
