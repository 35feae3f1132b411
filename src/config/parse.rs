use log::warn;

use super::types::{Color, OutputFormat, Position, Selection, Size};
use crate::error::SpineshotError;

/// Split `"a,b"` into exactly two trimmed parts.
fn split_pair(value: &str) -> Option<(&str, &str)> {
    let mut parts = value.split(',');
    let first = parts.next()?.trim();
    let second = parts.next()?.trim();
    if parts.next().is_some() {
        return None;
    }
    Some((first, second))
}

/// Parse `"W,H"` into a size with both sides positive.
pub fn parse_size(value: &str) -> Result<Size, SpineshotError> {
    let invalid = || SpineshotError::InvalidSize(value.to_string());
    let (w, h) = split_pair(value).ok_or_else(invalid)?;
    let width: u32 = w.parse().map_err(|_e| invalid())?;
    let height: u32 = h.parse().map_err(|_e| invalid())?;
    if width == 0 || height == 0 {
        return Err(invalid());
    }
    Ok(Size { width, height })
}

/// Parse `"X,Y"` into a position; negative coordinates are allowed.
pub fn parse_position(value: &str) -> Result<Position, SpineshotError> {
    let invalid = || SpineshotError::InvalidPosition(value.to_string());
    let (x, y) = split_pair(value).ok_or_else(invalid)?;
    let x: i64 = x.parse().map_err(|_e| invalid())?;
    let y: i64 = y.parse().map_err(|_e| invalid())?;
    Ok(Position { x, y })
}

/// Parse a 6-digit `RRGGBB` hex color. The result is always opaque.
pub fn parse_background(value: &str) -> Result<Color, SpineshotError> {
    let invalid = || SpineshotError::InvalidBackground(value.to_string());
    if value.len() != 6 || !value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let channel = |i: usize| u8::from_str_radix(&value[i..i + 2], 16).map_err(|_e| invalid());
    Ok(Color::rgba(channel(0)?, channel(2)?, channel(4)?, 255))
}

/// Parse the output format, falling back to PNG for anything unrecognised.
pub fn parse_format(value: &str) -> OutputFormat {
    if value.eq_ignore_ascii_case("png") {
        OutputFormat::Png
    } else if value.eq_ignore_ascii_case("webp") {
        OutputFormat::WebP
    } else {
        warn!("Unknown output format '{}', using png", value);
        OutputFormat::Png
    }
}

/// Interpret a `--skin`/`--animation` value.
pub fn parse_selection(value: Option<&str>) -> Selection {
    match value.map(str::trim) {
        None | Some("") => Selection::Setup,
        Some(v) if v.eq_ignore_ascii_case("all") => Selection::All,
        Some(v) => Selection::One(v.to_string()),
    }
}
