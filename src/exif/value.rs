use num_enum::TryFromPrimitive;
use std::fmt;

/// A single EXIF fraction. Kept as `i64` on both sides so that signed and
/// unsigned wire rationals share one representation; range is checked on dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    pub numerator: i64,
    pub denominator: i64,
}

impl Rational {
    pub const fn new(numerator: i64, denominator: i64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Value as a float, `None` for a zero denominator.
    pub fn to_f64(self) -> Option<f64> {
        if self.denominator == 0 {
            None
        } else {
            Some(self.numerator as f64 / self.denominator as f64)
        }
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl From<(i64, i64)> for Rational {
    fn from((numerator, denominator): (i64, i64)) -> Self {
        Self::new(numerator, denominator)
    }
}

/// Values that are kept but never structurally reinterpreted by the editor.
#[derive(Debug, Clone, PartialEq)]
pub enum Opaque {
    /// Multi-valued integer field (e.g. `GPSVersionID`, `BitsPerSample`).
    Integers(Vec<i64>),
    /// FLOAT / DOUBLE field.
    Floats(Vec<f64>),
    /// Free text typed over an opaque value. Cannot be written back.
    Literal(String),
}

impl fmt::Display for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opaque::Integers(values) => write_joined(f, values),
            Opaque::Floats(values) => write_joined(f, values),
            Opaque::Literal(text) => f.write_str(text),
        }
    }
}

fn write_joined<T: fmt::Display>(f: &mut fmt::Formatter<'_>, values: &[T]) -> fmt::Result {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{value}")?;
    }
    Ok(())
}

/// A typed EXIF value.
///
/// The variant is the value's shape: edited text is always read back through
/// the variant of the value it replaces, never guessed from the text.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Text(Vec<u8>),
    Rational(Rational),
    RationalList(Vec<Rational>),
    Integer(i64),
    Opaque(Opaque),
}

impl TagValue {
    pub fn text(s: &str) -> Self {
        TagValue::Text(s.as_bytes().to_vec())
    }

    pub fn rationals(parts: &[(i64, i64)]) -> Self {
        TagValue::RationalList(parts.iter().copied().map(Rational::from).collect())
    }

    /// Rationals of a `Rational` or `RationalList`, empty for anything else.
    pub fn as_rationals(&self) -> &[Rational] {
        match self {
            TagValue::Rational(r) => std::slice::from_ref(r),
            TagValue::RationalList(list) => list,
            _ => &[],
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            TagValue::Text(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Short name of the variant, for log lines.
    pub fn shape(&self) -> &'static str {
        match self {
            TagValue::Text(_) => "text",
            TagValue::Rational(_) => "rational",
            TagValue::RationalList(_) => "rational list",
            TagValue::Integer(_) => "integer",
            TagValue::Opaque(_) => "opaque",
        }
    }
}

/// TIFF field type codes as they appear in an IFD entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u16)]
pub enum FieldType {
    Byte = 1,
    Ascii = 2,
    Short = 3,
    Long = 4,
    Rational = 5,
    SByte = 6,
    Undefined = 7,
    SShort = 8,
    SLong = 9,
    SRational = 10,
    Float = 11,
    Double = 12,
}

impl FieldType {
    /// Size in bytes of one component.
    pub fn size(self) -> usize {
        match self {
            FieldType::Byte | FieldType::Ascii | FieldType::SByte | FieldType::Undefined => 1,
            FieldType::Short | FieldType::SShort => 2,
            FieldType::Long | FieldType::SLong | FieldType::Float => 4,
            FieldType::Rational | FieldType::SRational | FieldType::Double => 8,
        }
    }

    /// Wire type for a value that has no type of its own yet.
    pub fn infer(value: &TagValue) -> Self {
        let any_negative = |rs: &[Rational]| rs.iter().any(|r| r.numerator < 0 || r.denominator < 0);
        match value {
            TagValue::Text(_) | TagValue::Opaque(Opaque::Literal(_)) => FieldType::Ascii,
            TagValue::Rational(_) | TagValue::RationalList(_) => {
                if any_negative(value.as_rationals()) {
                    FieldType::SRational
                } else {
                    FieldType::Rational
                }
            }
            TagValue::Integer(i) => {
                if *i < 0 {
                    FieldType::SLong
                } else {
                    FieldType::Long
                }
            }
            TagValue::Opaque(Opaque::Integers(values)) => {
                if values.iter().any(|v| *v < 0) {
                    FieldType::SLong
                } else {
                    FieldType::Long
                }
            }
            TagValue::Opaque(Opaque::Floats(_)) => FieldType::Double,
        }
    }

    /// Whether `value` has a shape this wire type can hold. Ranges are
    /// checked only when writing.
    pub fn accepts(self, value: &TagValue) -> bool {
        match value {
            TagValue::Text(_) => matches!(
                self,
                FieldType::Ascii | FieldType::Undefined | FieldType::Byte
            ),
            TagValue::Rational(_) | TagValue::RationalList(_) => {
                matches!(self, FieldType::Rational | FieldType::SRational)
            }
            TagValue::Integer(_) | TagValue::Opaque(Opaque::Integers(_)) => self.is_integer(),
            TagValue::Opaque(Opaque::Floats(_)) => {
                matches!(self, FieldType::Float | FieldType::Double)
            }
            TagValue::Opaque(Opaque::Literal(_)) => false,
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            FieldType::Byte
                | FieldType::Short
                | FieldType::Long
                | FieldType::SByte
                | FieldType::SShort
                | FieldType::SLong
        )
    }
}

/// A stored tag: its value plus the wire type it is written back as.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub field_type: FieldType,
    pub value: TagValue,
}

impl Field {
    pub fn new(field_type: FieldType, value: TagValue) -> Self {
        Self { field_type, value }
    }
}

/// Byte order of the TIFF data inside the EXIF segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    Little,
    #[default]
    Big,
}

impl ByteOrder {
    pub fn marker(self) -> &'static [u8; 2] {
        match self {
            ByteOrder::Little => b"II",
            ByteOrder::Big => b"MM",
        }
    }

    pub fn u16(self, bytes: [u8; 2]) -> u16 {
        match self {
            ByteOrder::Little => u16::from_le_bytes(bytes),
            ByteOrder::Big => u16::from_be_bytes(bytes),
        }
    }

    pub fn u32(self, bytes: [u8; 4]) -> u32 {
        match self {
            ByteOrder::Little => u32::from_le_bytes(bytes),
            ByteOrder::Big => u32::from_be_bytes(bytes),
        }
    }

    pub fn u64(self, bytes: [u8; 8]) -> u64 {
        match self {
            ByteOrder::Little => u64::from_le_bytes(bytes),
            ByteOrder::Big => u64::from_be_bytes(bytes),
        }
    }

    pub fn encode_u16(self, value: u16) -> [u8; 2] {
        match self {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        }
    }

    pub fn encode_u32(self, value: u32) -> [u8; 4] {
        match self {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        }
    }

    pub fn encode_u64(self, value: u64) -> [u8; 8] {
        match self {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_type_from_wire_code() {
        assert_eq!(FieldType::try_from(5u16).ok(), Some(FieldType::Rational));
        assert_eq!(FieldType::try_from(12u16).ok(), Some(FieldType::Double));
        assert!(FieldType::try_from(0u16).is_err());
        assert!(FieldType::try_from(13u16).is_err());
    }

    #[test]
    fn infer_prefers_unsigned_types() {
        assert_eq!(FieldType::infer(&TagValue::Integer(400)), FieldType::Long);
        assert_eq!(FieldType::infer(&TagValue::Integer(-1)), FieldType::SLong);
        assert_eq!(
            FieldType::infer(&TagValue::rationals(&[(1, 3), (-2, 3)])),
            FieldType::SRational
        );
        assert_eq!(FieldType::infer(&TagValue::text("N")), FieldType::Ascii);
    }

    #[test]
    fn accepts_checks_shape_only() {
        assert!(FieldType::Short.accepts(&TagValue::Integer(70000)));
        assert!(FieldType::SRational.accepts(&TagValue::rationals(&[(1, 2)])));
        assert!(!FieldType::Rational.accepts(&TagValue::Integer(1)));
        assert!(!FieldType::Ascii.accepts(&TagValue::Opaque(Opaque::Literal("x".into()))));
    }

    #[test]
    fn opaque_display_joins_values() {
        assert_eq!(Opaque::Integers(vec![2, 2, 0, 0]).to_string(), "2, 2, 0, 0");
        assert_eq!(Opaque::Floats(vec![1.5]).to_string(), "1.5");
    }

    #[test]
    fn byte_order_is_symmetric() {
        for order in [ByteOrder::Little, ByteOrder::Big] {
            assert_eq!(order.u16(order.encode_u16(0x8769)), 0x8769);
            assert_eq!(order.u32(order.encode_u32(0xDEAD_BEEF)), 0xDEAD_BEEF);
        }
        assert_eq!(ByteOrder::Big.encode_u16(1), [0, 1]);
        assert_eq!(ByteOrder::Little.encode_u16(1), [1, 0]);
    }

    #[test]
    fn rational_zero_denominator_has_no_float() {
        assert_eq!(Rational::new(1, 0).to_f64(), None);
        assert_eq!(Rational::new(1, 4).to_f64(), Some(0.25));
    }
}
