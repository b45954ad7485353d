//! Text form of tag values.
//!
//! [`render`] turns any value into the string a user edits; [`parse`] reads
//! an edited string back, using the shape of the value being replaced to
//! decide what the text means.

use super::error::ParseFailure;
use super::value::{Opaque, Rational, TagValue};

/// Render a value for display or editing. Never fails.
pub fn render(value: &TagValue) -> String {
    match value {
        TagValue::Text(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(_) => bytes.escape_ascii().to_string(),
        },
        TagValue::Rational(r) => r.to_string(),
        TagValue::RationalList(list) => list
            .iter()
            .map(Rational::to_string)
            .collect::<Vec<_>>()
            .join(", "),
        TagValue::Integer(i) => i.to_string(),
        TagValue::Opaque(opaque) => opaque.to_string(),
    }
}

/// Read an edited string back into a value shaped like `original`.
///
/// Text that does not parse leaves the field as it was: the original value is
/// returned and nothing is reported. Text identical to `render(original)` is a
/// no-op as well, so re-submitting an unchanged form never alters a field.
pub fn parse(input: &str, original: &TagValue) -> TagValue {
    parse_checked(input, original).unwrap_or_else(|err| {
        log::debug!("keeping {} value, edit rejected: {err}", original.shape());
        original.clone()
    })
}

/// [`parse`], with the failure reported instead of swallowed.
///
/// Text identical to `render(original)` returns `original` unchanged without
/// being parsed.
pub fn parse_checked(input: &str, original: &TagValue) -> Result<TagValue, ParseFailure> {
    if input == render(original) {
        return Ok(original.clone());
    }
    try_parse(input, original)
}

/// Parse `input` in the shape of `original`, without the unchanged-text shortcut.
pub fn try_parse(input: &str, original: &TagValue) -> Result<TagValue, ParseFailure> {
    match original {
        TagValue::Text(_) => Ok(TagValue::Text(input.as_bytes().to_vec())),
        TagValue::Rational(_) | TagValue::RationalList(_) => {
            let mut rationals = input
                .split(',')
                .map(parse_rational)
                .collect::<Result<Vec<_>, _>>()?;
            if rationals.len() == 1 {
                Ok(TagValue::Rational(rationals.remove(0)))
            } else {
                Ok(TagValue::RationalList(rationals))
            }
        }
        TagValue::Integer(_) => parse_integer(input).map(TagValue::Integer),
        TagValue::Opaque(_) => Ok(TagValue::Opaque(Opaque::Literal(input.to_string()))),
    }
}

/// `n/d`, or a bare `n` meaning `n/1`.
fn parse_rational(segment: &str) -> Result<Rational, ParseFailure> {
    let segment = segment.trim();
    match segment.split_once('/') {
        Some((numerator, denominator)) => {
            let malformed = || ParseFailure::MalformedFraction(segment.to_string());
            let numerator = numerator.trim().parse::<i64>().map_err(|_| malformed())?;
            let denominator = denominator.trim().parse::<i64>().map_err(|_| malformed())?;
            Ok(Rational::new(numerator, denominator))
        }
        None => Ok(Rational::new(parse_integer(segment)?, 1)),
    }
}

fn parse_integer(input: &str) -> Result<i64, ParseFailure> {
    input
        .trim()
        .parse::<i64>()
        .map_err(|_| ParseFailure::InvalidInteger(input.to_string()))
}
