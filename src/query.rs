use serde_json::Value;
use tracing::warn;

use crate::duration::{has_unit_suffix, parse_duration};
use crate::error::{ExtractError, Result};

/// Sentinel step that triggers the attribute-summary rule instead of a
/// plain descent.
const ATTRIBUTES_STEP: &str = "attributes";

/// Outcome of a path query. A query ends early with a numeric value as
/// soon as it reaches a unit-tagged string or an `attributes` mapping;
/// otherwise it hands back a borrowed node of whatever shape the path
/// ended on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolved<'a> {
    Seconds(f64),
    Count(i64),
    Node(&'a Value),
}

impl Resolved<'_> {
    /// Numeric view used for metric cells; counts are dimensionless and
    /// widen losslessly enough for tabulation purposes.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Resolved::Seconds(seconds) => Some(*seconds),
            Resolved::Count(count) => Some(*count as f64),
            Resolved::Node(_) => None,
        }
    }
}

/// Walks `value` along `path`, one step at a time.
///
/// Mappings are indexed by key. Sequences are searched for the first
/// element whose `name` field equals the step; record lists are expected
/// to carry unique names, so a duplicate is only reported, not rejected.
/// Descending into a scalar is an error. After each step, in priority
/// order: the `attributes` sentinel yields the attribute summary, and a
/// string ending in a unit suffix is converted to seconds immediately,
/// leaving any remaining steps unconsumed.
pub fn resolve<'a>(value: &'a Value, path: &[&str]) -> Result<Resolved<'a>> {
    let mut current = value;

    for &step in path {
        current = match current {
            Value::Object(map) => map
                .get(step)
                .ok_or_else(|| ExtractError::MissingKey(step.to_string()))?,
            Value::Array(elements) => select_named(elements, step)?,
            _ => return Err(ExtractError::ScalarDescent(step.to_string())),
        };

        if step == ATTRIBUTES_STEP {
            return attribute_summary(current);
        }

        if let Value::String(text) = current {
            if has_unit_suffix(text) {
                return Ok(Resolved::Seconds(parse_duration(text)?));
            }
        }
    }

    Ok(Resolved::Node(current))
}

fn select_named<'a>(elements: &'a [Value], step: &str) -> Result<&'a Value> {
    let mut matches = elements
        .iter()
        .filter(|element| element.get("name").and_then(Value::as_str) == Some(step));

    let first = matches
        .next()
        .ok_or_else(|| ExtractError::MissingName(step.to_string()))?;

    if matches.next().is_some() {
        warn!(name = step, "duplicate name in record list, using first match");
    }

    Ok(first)
}

/// Attribute-summary rule: `duration_avg` holds a one-entry mapping whose
/// single key selects the encoding, either a UnitValue string or an
/// integer rendered as a string.
fn attribute_summary(attributes: &Value) -> Result<Resolved<'_>> {
    let entry = match attributes {
        Value::Object(map) => map
            .get("duration_avg")
            .ok_or_else(|| ExtractError::MissingKey("duration_avg".to_string()))?,
        _ => return Err(ExtractError::MissingKey("duration_avg".to_string())),
    };

    let Value::Object(entry) = entry else {
        return Err(ExtractError::UnsupportedType(type_name(entry).to_string()));
    };

    let Some((kind, payload)) = entry.iter().next() else {
        return Err(ExtractError::UnsupportedType("empty entry".to_string()));
    };

    match kind.as_str() {
        "duration_value" => {
            let text = payload
                .as_str()
                .ok_or_else(|| ExtractError::UnsupportedType(type_name(payload).to_string()))?;
            Ok(Resolved::Seconds(parse_duration(text)?))
        }
        "int64_value" => {
            let count = match payload {
                Value::String(text) => text
                    .parse::<i64>()
                    .map_err(|_| ExtractError::UnsupportedType(kind.clone()))?,
                Value::Number(number) => number
                    .as_i64()
                    .ok_or_else(|| ExtractError::UnsupportedType(kind.clone()))?,
                other => return Err(ExtractError::UnsupportedType(type_name(other).to_string())),
            };
            Ok(Resolved::Count(count))
        }
        other => Err(ExtractError::UnsupportedType(other.to_string())),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
