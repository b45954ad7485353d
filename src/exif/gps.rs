//! Decimal degrees ↔ EXIF GPS degrees/minutes/seconds.
//!
//! A coordinate lives in four GPS tags: the two hemisphere references and the
//! two DMS triples. The sign of a decimal degree is carried only by the
//! reference letter; the rationals themselves are never negative.

use serde::Serialize;

use super::document::{ExifDocument, IfdKind};
use super::tags::{TAG_GPS_LATITUDE, TAG_GPS_LATITUDE_REF, TAG_GPS_LONGITUDE, TAG_GPS_LONGITUDE_REF};
use super::value::{Field, FieldType, Rational, TagValue};

/// Denominator used for every coordinate component (6 decimal places).
pub const DEFAULT_PRECISION: i64 = 1_000_000;

/// A decoded coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GpsCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Coordinates read from a document together with the presence flag.
///
/// `latitude`/`longitude` fall back to `0.0` when the tags are missing or
/// broken, so `(0.0, 0.0)` alone does not mean "at null island": check
/// `has_gps`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct GpsReading {
    pub latitude: f64,
    pub longitude: f64,
    pub has_gps: bool,
}

impl GpsReading {
    pub fn coordinates(&self) -> Option<GpsCoordinates> {
        self.has_gps.then_some(GpsCoordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        })
    }
}

pub fn to_rational(x: f64, precision: i64) -> Rational {
    Rational::new((x * precision as f64).round() as i64, precision)
}

/// Split a decimal degree into degree, minute and second rationals.
pub fn decimal_to_dms(coord: f64) -> [Rational; 3] {
    decimal_to_dms_with_precision(coord, DEFAULT_PRECISION)
}

pub fn decimal_to_dms_with_precision(coord: f64, precision: i64) -> [Rational; 3] {
    let abs = coord.abs();
    let degrees = abs.trunc();
    let minutes = ((abs - degrees) * 60.0).trunc();
    let seconds = (abs - degrees - minutes / 60.0) * 3600.0;
    [
        to_rational(degrees, precision),
        to_rational(minutes, precision),
        to_rational(seconds, precision),
    ]
}

/// Hemisphere letters for a coordinate pair. Each sign is checked on its own.
pub fn reference_tags(lat: f64, lon: f64) -> (u8, u8) {
    let lat_ref = if lat >= 0.0 { b'N' } else { b'S' };
    let lon_ref = if lon >= 0.0 { b'E' } else { b'W' };
    (lat_ref, lon_ref)
}

/// Combine a reference letter and a DMS triple into a decimal degree.
///
/// Returns `0.0` for a zero denominator or any non-finite result.
pub fn dms_to_decimal(reference: u8, d: Rational, m: Rational, s: Rational) -> f64 {
    if d.denominator == 0 || m.denominator == 0 || s.denominator == 0 {
        return 0.0;
    }
    let sign = if matches!(reference, b'S' | b'W') { -1.0 } else { 1.0 };
    let value = sign
        * (d.numerator as f64 / d.denominator as f64
            + m.numerator as f64 / (60.0 * m.denominator as f64)
            + s.numerator as f64 / (3600.0 * s.denominator as f64));
    if value.is_finite() { value } else { 0.0 }
}

/// Read the coordinate stored in the document.
///
/// Each axis decodes independently; a missing or malformed axis reads as
/// `0.0`. `has_gps` is set only when both axes decoded.
pub fn read_coordinates(doc: &ExifDocument) -> GpsReading {
    let latitude = read_axis(doc, TAG_GPS_LATITUDE_REF, TAG_GPS_LATITUDE);
    let longitude = read_axis(doc, TAG_GPS_LONGITUDE_REF, TAG_GPS_LONGITUDE);
    GpsReading {
        latitude: latitude.unwrap_or(0.0),
        longitude: longitude.unwrap_or(0.0),
        has_gps: latitude.is_some() && longitude.is_some(),
    }
}

/// The stored coordinate, or `None` when the document has no usable GPS data.
pub fn coordinates(doc: &ExifDocument) -> Option<GpsCoordinates> {
    read_coordinates(doc).coordinates()
}

fn read_axis(doc: &ExifDocument, ref_tag: u16, dms_tag: u16) -> Option<f64> {
    let reference = *doc.get(IfdKind::Gps, ref_tag)?.as_bytes()?.first()?;
    let [d, m, s] = doc.get(IfdKind::Gps, dms_tag)?.as_rationals() else {
        log::debug!("GPS tag 0x{dms_tag:04X} is not a degree/minute/second triple");
        return None;
    };
    if d.denominator == 0 || m.denominator == 0 || s.denominator == 0 {
        log::debug!("GPS tag 0x{dms_tag:04X} has a zero denominator");
        return None;
    }
    Some(dms_to_decimal(reference, *d, *m, *s))
}

/// Write a coordinate into the GPS directory, creating it if needed.
pub fn apply_coords(doc: &mut ExifDocument, lat: f64, lon: f64) {
    apply_coords_with_precision(doc, lat, lon, DEFAULT_PRECISION);
}

pub fn apply_coords_with_precision(doc: &mut ExifDocument, lat: f64, lon: f64, precision: i64) {
    let (lat_ref, lon_ref) = reference_tags(lat, lon);
    let gps = doc.ensure_directory(IfdKind::Gps);
    gps.insert_field(
        TAG_GPS_LATITUDE_REF,
        Field::new(FieldType::Ascii, TagValue::Text(vec![lat_ref])),
    );
    gps.insert_field(
        TAG_GPS_LATITUDE,
        Field::new(
            FieldType::Rational,
            TagValue::RationalList(decimal_to_dms_with_precision(lat, precision).to_vec()),
        ),
    );
    gps.insert_field(
        TAG_GPS_LONGITUDE_REF,
        Field::new(FieldType::Ascii, TagValue::Text(vec![lon_ref])),
    );
    gps.insert_field(
        TAG_GPS_LONGITUDE,
        Field::new(
            FieldType::Rational,
            TagValue::RationalList(decimal_to_dms_with_precision(lon, precision).to_vec()),
        ),
    );
    log::debug!(
        "GPS set to {lat}, {lon} ({}/{})",
        lat_ref as char,
        lon_ref as char
    );
}
