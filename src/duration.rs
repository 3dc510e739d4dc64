use crate::error::{ExtractError, Result};

/// Recognized unit suffixes and their scale to seconds. Two-character
/// suffixes come first so that `ms`/`us` are never matched as a bare
/// `m`/`s` with a stray trailing character.
pub const TIME_UNITS: [(&str, f64); 6] = [
    ("us", 1e-6),
    ("ms", 1e-3),
    ("s", 1.0),
    ("m", 60.0),
    ("h", 3600.0),
    ("d", 86400.0),
];

/// True when `text` ends in a recognized unit suffix. This is the
/// early-exit trigger used by the path query engine; it does not imply
/// that the whole string parses (`parse_duration` still validates the
/// numeric part).
pub fn has_unit_suffix(text: &str) -> bool {
    TIME_UNITS.iter().any(|(unit, _)| text.ends_with(unit))
}

/// Parses `<digits[.digits]><unit>` into seconds. The suffix must be the
/// complete trailing token: `"1.5ms"` is 0.0015, never 1.5 minutes plus a
/// stray `s`.
pub fn parse_duration(text: &str) -> Result<f64> {
    let (magnitude, scale) = TIME_UNITS
        .iter()
        .find_map(|(unit, scale)| text.strip_suffix(unit).map(|rest| (rest, *scale)))
        .ok_or_else(|| ExtractError::Format(text.to_string()))?;

    if magnitude.is_empty() || !magnitude.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(ExtractError::Format(text.to_string()));
    }

    let value: f64 = magnitude
        .parse()
        .map_err(|_| ExtractError::Format(text.to_string()))?;

    Ok(value * scale)
}
