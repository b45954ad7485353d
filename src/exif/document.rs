use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use super::tags;
use super::value::{ByteOrder, Field, FieldType, TagValue};

/// The editable tag directories of an EXIF segment, in file order.
///
/// The thumbnail blob is not a directory; it hangs off [`ExifDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IfdKind {
    Zeroth,
    Exif,
    Gps,
    Interop,
    First,
}

impl IfdKind {
    pub const ALL: [IfdKind; 5] = [
        IfdKind::Zeroth,
        IfdKind::Exif,
        IfdKind::Gps,
        IfdKind::Interop,
        IfdKind::First,
    ];

    pub fn name(self) -> &'static str {
        match self {
            IfdKind::Zeroth => "0th",
            IfdKind::Exif => "Exif",
            IfdKind::Gps => "GPS",
            IfdKind::Interop => "Interop",
            IfdKind::First => "1st",
        }
    }
}

impl fmt::Display for IfdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for IfdKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl FromStr for IfdKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IfdKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown EXIF directory {s:?} (expected 0th, Exif, GPS, Interop or 1st)"))
    }
}

/// True for the four GPS tags that make up a coordinate.
///
/// These are not edited as plain fields; they go through
/// [`gps::apply_coords`](super::gps::apply_coords) instead.
pub fn is_gps_coordinate_tag(ifd: IfdKind, tag: u16) -> bool {
    ifd == IfdKind::Gps
        && matches!(
            tag,
            tags::TAG_GPS_LATITUDE_REF
                | tags::TAG_GPS_LATITUDE
                | tags::TAG_GPS_LONGITUDE_REF
                | tags::TAG_GPS_LONGITUDE
        )
}

/// One IFD: tag id → field, unique per directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Directory {
    kind: IfdKind,
    fields: BTreeMap<u16, Field>,
}

impl Directory {
    pub fn new(kind: IfdKind) -> Self {
        Self {
            kind,
            fields: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> IfdKind {
        self.kind
    }

    /// `(tag, value)` pairs in ascending tag order.
    pub fn entries(&self) -> impl Iterator<Item = (u16, &TagValue)> {
        self.fields.iter().map(|(tag, field)| (*tag, &field.value))
    }

    pub fn fields(&self) -> impl Iterator<Item = (u16, &Field)> {
        self.fields.iter().map(|(tag, field)| (*tag, field))
    }

    pub fn get(&self, tag: u16) -> Option<&TagValue> {
        self.fields.get(&tag).map(|field| &field.value)
    }

    pub fn field(&self, tag: u16) -> Option<&Field> {
        self.fields.get(&tag)
    }

    /// Set a tag's value.
    ///
    /// An existing tag keeps its wire type. A new tag takes the type from the
    /// tag table when that type can hold the value, otherwise one inferred
    /// from the value.
    pub fn set(&mut self, tag: u16, value: TagValue) {
        if let Some(field) = self.fields.get_mut(&tag) {
            field.value = value;
            return;
        }
        let field_type = tags::lookup(self.kind, tag)
            .map(|info| info.field_type)
            .filter(|field_type| field_type.accepts(&value))
            .unwrap_or_else(|| FieldType::infer(&value));
        self.fields.insert(tag, Field::new(field_type, value));
    }

    pub fn insert_field(&mut self, tag: u16, field: Field) {
        self.fields.insert(tag, field);
    }

    pub fn remove(&mut self, tag: u16) -> Option<Field> {
        self.fields.remove(&tag)
    }

    pub fn contains(&self, tag: u16) -> bool {
        self.fields.contains_key(&tag)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Every directory loaded from one image, plus its thumbnail.
///
/// Owned by a single editing session; nothing here is shared or global.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExifDocument {
    pub(crate) byte_order: ByteOrder,
    pub(crate) directories: BTreeMap<IfdKind, Directory>,
    pub(crate) thumbnail: Option<Vec<u8>>,
}

impl ExifDocument {
    /// An empty document, written big-endian.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_byte_order(byte_order: ByteOrder) -> Self {
        Self {
            byte_order,
            ..Self::default()
        }
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Directories present in the document, in file order.
    pub fn directories(&self) -> impl Iterator<Item = &Directory> {
        self.directories.values()
    }

    pub fn directory(&self, kind: IfdKind) -> Option<&Directory> {
        self.directories.get(&kind)
    }

    pub fn directory_mut(&mut self, kind: IfdKind) -> Option<&mut Directory> {
        self.directories.get_mut(&kind)
    }

    /// The directory of `kind`, created empty if the document lacks it.
    pub fn ensure_directory(&mut self, kind: IfdKind) -> &mut Directory {
        self.directories
            .entry(kind)
            .or_insert_with(|| Directory::new(kind))
    }

    pub fn get(&self, kind: IfdKind, tag: u16) -> Option<&TagValue> {
        self.directory(kind).and_then(|dir| dir.get(tag))
    }

    pub fn field(&self, kind: IfdKind, tag: u16) -> Option<&Field> {
        self.directory(kind).and_then(|dir| dir.field(tag))
    }

    pub fn set(&mut self, kind: IfdKind, tag: u16, value: TagValue) {
        self.ensure_directory(kind).set(tag, value);
    }

    pub fn remove(&mut self, kind: IfdKind, tag: u16) -> Option<Field> {
        self.directory_mut(kind).and_then(|dir| dir.remove(tag))
    }

    /// Embedded JPEG thumbnail, if any. Never offered for editing.
    pub fn thumbnail(&self) -> Option<&[u8]> {
        self.thumbnail.as_deref()
    }

    pub fn set_thumbnail(&mut self, thumbnail: Option<Vec<u8>>) {
        self.thumbnail = thumbnail;
    }

    /// Total number of tags across all directories.
    pub fn tag_count(&self) -> usize {
        self.directories.values().map(Directory::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exif::value::Opaque;

    #[test]
    fn ifd_names_round_trip() {
        for kind in IfdKind::ALL {
            assert_eq!(kind.name().parse::<IfdKind>(), Ok(kind));
        }
        assert_eq!("gps".parse::<IfdKind>(), Ok(IfdKind::Gps));
        assert!("thumbnail".parse::<IfdKind>().is_err());
    }

    #[test]
    fn gps_coordinate_tags_only_in_gps_directory() {
        for tag in 1..=4 {
            assert!(is_gps_coordinate_tag(IfdKind::Gps, tag));
            assert!(!is_gps_coordinate_tag(IfdKind::Interop, tag));
        }
        assert!(!is_gps_coordinate_tag(IfdKind::Gps, 0));
        assert!(!is_gps_coordinate_tag(IfdKind::Gps, 5));
    }

    #[test]
    fn tag_ids_are_scoped_per_directory() {
        let mut doc = ExifDocument::new();
        doc.set(IfdKind::Gps, 1, TagValue::text("N"));
        doc.set(IfdKind::Interop, 1, TagValue::text("R98"));
        assert_eq!(doc.get(IfdKind::Gps, 1), Some(&TagValue::text("N")));
        assert_eq!(doc.get(IfdKind::Interop, 1), Some(&TagValue::text("R98")));
        assert_eq!(doc.get(IfdKind::Exif, 1), None);
    }

    #[test]
    fn set_keeps_existing_wire_type() {
        let mut dir = Directory::new(IfdKind::Exif);
        dir.insert_field(0x8827, Field::new(FieldType::Short, TagValue::Integer(400)));
        dir.set(0x8827, TagValue::Integer(800));
        assert_eq!(
            dir.field(0x8827),
            Some(&Field::new(FieldType::Short, TagValue::Integer(800)))
        );
    }

    #[test]
    fn set_new_tag_uses_table_then_inference() {
        let mut dir = Directory::new(IfdKind::Exif);
        dir.set(0x8827, TagValue::Integer(100));
        assert_eq!(dir.field(0x8827).map(|f| f.field_type), Some(FieldType::Short));

        // table says SHORT, but a float cannot be held by it
        dir.set(0x8822, TagValue::Opaque(Opaque::Floats(vec![1.5])));
        assert_eq!(dir.field(0x8822).map(|f| f.field_type), Some(FieldType::Double));

        dir.set(0xBEEF, TagValue::Integer(-3));
        assert_eq!(dir.field(0xBEEF).map(|f| f.field_type), Some(FieldType::SLong));
    }

    #[test]
    fn ensure_directory_creates_once() {
        let mut doc = ExifDocument::new();
        assert!(doc.directory(IfdKind::Gps).is_none());
        doc.ensure_directory(IfdKind::Gps).set(2, TagValue::rationals(&[(1, 1)]));
        doc.ensure_directory(IfdKind::Gps);
        assert_eq!(doc.directory(IfdKind::Gps).map(Directory::len), Some(1));
        assert_eq!(doc.directories().count(), 1);
    }
}
