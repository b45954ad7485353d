//! Names and default wire types of common EXIF tags.
//!
//! Only used for labels, for addressing tags by name and for choosing the
//! wire type of a tag that is created from scratch. Tags missing from the
//! table are still loaded, edited and dumped; they are just shown by id.

use super::document::IfdKind;
use super::value::FieldType::{self, Ascii, Byte, Long, Rational, SRational, Short, Undefined};

// Pointer tags: structural, regenerated on dump.
pub const TAG_EXIF_IFD_POINTER: u16 = 0x8769;
pub const TAG_GPS_IFD_POINTER: u16 = 0x8825;
pub const TAG_INTEROP_IFD_POINTER: u16 = 0xA005;
pub const TAG_JPEG_INTERCHANGE_FORMAT: u16 = 0x0201;
pub const TAG_JPEG_INTERCHANGE_FORMAT_LENGTH: u16 = 0x0202;

// GPS coordinate tags
pub const TAG_GPS_LATITUDE_REF: u16 = 0x0001;
pub const TAG_GPS_LATITUDE: u16 = 0x0002;
pub const TAG_GPS_LONGITUDE_REF: u16 = 0x0003;
pub const TAG_GPS_LONGITUDE: u16 = 0x0004;

/// One row of the tag table.
#[derive(Debug, Clone, Copy)]
pub struct TagInfo {
    pub id: u16,
    pub name: &'static str,
    pub field_type: FieldType,
}

const fn tag(id: u16, name: &'static str, field_type: FieldType) -> TagInfo {
    TagInfo {
        id,
        name,
        field_type,
    }
}

/// Image tags, shared by `0th` and `1st`.
const IMAGE_TAGS: &[TagInfo] = &[
    tag(0x0100, "ImageWidth", Long),
    tag(0x0101, "ImageLength", Long),
    tag(0x0102, "BitsPerSample", Short),
    tag(0x0103, "Compression", Short),
    tag(0x0106, "PhotometricInterpretation", Short),
    tag(0x010E, "ImageDescription", Ascii),
    tag(0x010F, "Make", Ascii),
    tag(0x0110, "Model", Ascii),
    tag(0x0112, "Orientation", Short),
    tag(0x011A, "XResolution", Rational),
    tag(0x011B, "YResolution", Rational),
    tag(0x0128, "ResolutionUnit", Short),
    tag(0x0131, "Software", Ascii),
    tag(0x0132, "DateTime", Ascii),
    tag(0x013B, "Artist", Ascii),
    tag(0x013E, "WhitePoint", Rational),
    tag(0x013F, "PrimaryChromaticities", Rational),
    tag(0x0211, "YCbCrCoefficients", Rational),
    tag(0x0213, "YCbCrPositioning", Short),
    tag(0x0214, "ReferenceBlackWhite", Rational),
    tag(0x8298, "Copyright", Ascii),
    tag(0x9C9B, "XPTitle", Byte),
    tag(0x9C9C, "XPComment", Byte),
    tag(0x9C9D, "XPAuthor", Byte),
    tag(0x9C9E, "XPKeywords", Byte),
    tag(0x9C9F, "XPSubject", Byte),
];

const EXIF_TAGS: &[TagInfo] = &[
    tag(0x829A, "ExposureTime", Rational),
    tag(0x829D, "FNumber", Rational),
    tag(0x8822, "ExposureProgram", Short),
    tag(0x8827, "ISOSpeedRatings", Short),
    tag(0x8830, "SensitivityType", Short),
    tag(0x9000, "ExifVersion", Undefined),
    tag(0x9003, "DateTimeOriginal", Ascii),
    tag(0x9004, "DateTimeDigitized", Ascii),
    tag(0x9010, "OffsetTime", Ascii),
    tag(0x9011, "OffsetTimeOriginal", Ascii),
    tag(0x9101, "ComponentsConfiguration", Undefined),
    tag(0x9102, "CompressedBitsPerPixel", Rational),
    tag(0x9201, "ShutterSpeedValue", SRational),
    tag(0x9202, "ApertureValue", Rational),
    tag(0x9203, "BrightnessValue", SRational),
    tag(0x9204, "ExposureBiasValue", SRational),
    tag(0x9205, "MaxApertureValue", Rational),
    tag(0x9206, "SubjectDistance", Rational),
    tag(0x9207, "MeteringMode", Short),
    tag(0x9208, "LightSource", Short),
    tag(0x9209, "Flash", Short),
    tag(0x920A, "FocalLength", Rational),
    tag(0x927C, "MakerNote", Undefined),
    tag(0x9286, "UserComment", Undefined),
    tag(0x9290, "SubSecTime", Ascii),
    tag(0x9291, "SubSecTimeOriginal", Ascii),
    tag(0x9292, "SubSecTimeDigitized", Ascii),
    tag(0xA000, "FlashpixVersion", Undefined),
    tag(0xA001, "ColorSpace", Short),
    tag(0xA002, "PixelXDimension", Long),
    tag(0xA003, "PixelYDimension", Long),
    tag(0xA20E, "FocalPlaneXResolution", Rational),
    tag(0xA20F, "FocalPlaneYResolution", Rational),
    tag(0xA210, "FocalPlaneResolutionUnit", Short),
    tag(0xA217, "SensingMethod", Short),
    tag(0xA300, "FileSource", Undefined),
    tag(0xA301, "SceneType", Undefined),
    tag(0xA401, "CustomRendered", Short),
    tag(0xA402, "ExposureMode", Short),
    tag(0xA403, "WhiteBalance", Short),
    tag(0xA404, "DigitalZoomRatio", Rational),
    tag(0xA405, "FocalLengthIn35mmFilm", Short),
    tag(0xA406, "SceneCaptureType", Short),
    tag(0xA408, "Contrast", Short),
    tag(0xA409, "Saturation", Short),
    tag(0xA40A, "Sharpness", Short),
    tag(0xA420, "ImageUniqueID", Ascii),
    tag(0xA430, "CameraOwnerName", Ascii),
    tag(0xA431, "BodySerialNumber", Ascii),
    tag(0xA432, "LensSpecification", Rational),
    tag(0xA433, "LensMake", Ascii),
    tag(0xA434, "LensModel", Ascii),
    tag(0xA435, "LensSerialNumber", Ascii),
];

const GPS_TAGS: &[TagInfo] = &[
    tag(0x0000, "GPSVersionID", Byte),
    tag(TAG_GPS_LATITUDE_REF, "GPSLatitudeRef", Ascii),
    tag(TAG_GPS_LATITUDE, "GPSLatitude", Rational),
    tag(TAG_GPS_LONGITUDE_REF, "GPSLongitudeRef", Ascii),
    tag(TAG_GPS_LONGITUDE, "GPSLongitude", Rational),
    tag(0x0005, "GPSAltitudeRef", Byte),
    tag(0x0006, "GPSAltitude", Rational),
    tag(0x0007, "GPSTimeStamp", Rational),
    tag(0x0008, "GPSSatellites", Ascii),
    tag(0x0009, "GPSStatus", Ascii),
    tag(0x000A, "GPSMeasureMode", Ascii),
    tag(0x000B, "GPSDOP", Rational),
    tag(0x000C, "GPSSpeedRef", Ascii),
    tag(0x000D, "GPSSpeed", Rational),
    tag(0x000E, "GPSTrackRef", Ascii),
    tag(0x000F, "GPSTrack", Rational),
    tag(0x0010, "GPSImgDirectionRef", Ascii),
    tag(0x0011, "GPSImgDirection", Rational),
    tag(0x0012, "GPSMapDatum", Ascii),
    tag(0x001B, "GPSProcessingMethod", Undefined),
    tag(0x001D, "GPSDateStamp", Ascii),
    tag(0x001E, "GPSDifferential", Short),
    tag(0x001F, "GPSHPositioningError", Rational),
];

const INTEROP_TAGS: &[TagInfo] = &[
    tag(0x0001, "InteroperabilityIndex", Ascii),
    tag(0x0002, "InteroperabilityVersion", Undefined),
];

fn table(ifd: IfdKind) -> &'static [TagInfo] {
    match ifd {
        IfdKind::Zeroth | IfdKind::First => IMAGE_TAGS,
        IfdKind::Exif => EXIF_TAGS,
        IfdKind::Gps => GPS_TAGS,
        IfdKind::Interop => INTEROP_TAGS,
    }
}

pub fn lookup(ifd: IfdKind, id: u16) -> Option<&'static TagInfo> {
    table(ifd).iter().find(|info| info.id == id)
}

/// Display name of a tag, `0xNNNN` when unknown.
pub fn tag_name(ifd: IfdKind, id: u16) -> String {
    match lookup(ifd, id) {
        Some(info) => info.name.to_string(),
        None => format!("0x{id:04X}"),
    }
}

/// Resolve a tag by name (case-insensitive) or by `0x`-prefixed hex id.
pub fn tag_id(ifd: IfdKind, name: &str) -> Option<u16> {
    let name = name.trim();
    if let Some(hex) = name.strip_prefix("0x").or_else(|| name.strip_prefix("0X")) {
        return u16::from_str_radix(hex, 16).ok();
    }
    table(ifd)
        .iter()
        .find(|info| info.name.eq_ignore_ascii_case(name))
        .map(|info| info.id)
}

/// Tags that encode the layout of the segment rather than image metadata.
pub fn is_pointer_tag(ifd: IfdKind, id: u16) -> bool {
    match ifd {
        IfdKind::Zeroth => id == TAG_EXIF_IFD_POINTER || id == TAG_GPS_IFD_POINTER,
        IfdKind::Exif => id == TAG_INTEROP_IFD_POINTER,
        IfdKind::First => {
            id == TAG_JPEG_INTERCHANGE_FORMAT || id == TAG_JPEG_INTERCHANGE_FORMAT_LENGTH
        }
        IfdKind::Gps | IfdKind::Interop => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_scoped_per_directory() {
        assert_eq!(tag_name(IfdKind::Gps, 0x0002), "GPSLatitude");
        assert_eq!(tag_name(IfdKind::Interop, 0x0002), "InteroperabilityVersion");
        assert_eq!(tag_name(IfdKind::Exif, 0x0002), "0x0002");
    }

    #[test]
    fn tag_id_accepts_names_and_hex() {
        assert_eq!(tag_id(IfdKind::Exif, "ISOSpeedRatings"), Some(0x8827));
        assert_eq!(tag_id(IfdKind::Exif, "isospeedratings"), Some(0x8827));
        assert_eq!(tag_id(IfdKind::Zeroth, "0x010F"), Some(0x010F));
        assert_eq!(tag_id(IfdKind::Zeroth, "NoSuchTag"), None);
    }

    #[test]
    fn pointer_tags() {
        assert!(is_pointer_tag(IfdKind::Zeroth, TAG_GPS_IFD_POINTER));
        assert!(is_pointer_tag(IfdKind::Exif, TAG_INTEROP_IFD_POINTER));
        assert!(!is_pointer_tag(IfdKind::Gps, TAG_GPS_LATITUDE));
    }
}
