//! Turns one text line from the device into a sample, a sweep-end signal or
//! nothing.
//!
//! Two sample encodings are accepted:
//!
//! * delimited: `"<angle>,<distance>"`
//! * structured: `{"Angle": <num>, "Distance": <num>}`, keys also accepted in
//!   lower case
//!
//! The literal line `END` is checked before anything else and is never data.

use crate::constants::SWEEP_END_SENTINEL;
use crate::error::RadarError;
use radar_data::Sample;
use serde_json::{Map, Value};
use tracing::trace;

/// Key casing used by a structured sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldCase {
    /// `Angle` / `Distance`
    Capitalized,
    /// `angle` / `distance`
    Lowercase,
    /// One key of each casing.
    Mixed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WireFormat {
    Delimited,
    Structured(FieldCase),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Decoded {
    Sample(Sample, WireFormat),
    SweepEnd,
    /// Anything else. Callers drop it and keep reading.
    Malformed,
}

impl Decoded {
    pub fn sample(&self) -> Option<Sample> {
        match self {
            Decoded::Sample(sample, _) => Some(*sample),
            _ => None,
        }
    }
}

/// Decodes a line whose line terminator and surrounding whitespace have
/// already been stripped. Never fails: bad input yields [`Decoded::Malformed`].
pub fn decode(line: &str) -> Decoded {
    if line == SWEEP_END_SENTINEL {
        return Decoded::SweepEnd;
    }
    let parsed = if line.starts_with('{') {
        parse_structured(line)
    } else {
        parse_delimited(line).map(|sample| (sample, WireFormat::Delimited))
    };
    match parsed {
        Ok((sample, format)) => Decoded::Sample(sample, format),
        Err(e) => {
            trace!("{e}");
            Decoded::Malformed
        }
    }
}

pub(crate) fn parse_delimited(line: &str) -> Result<Sample, RadarError> {
    let malformed = || RadarError::MalformedLine(line.to_string());
    let fields = line.split(',').collect::<Vec<_>>();
    if fields.len() != 2 {
        return Err(malformed());
    }
    let angle = parse_finite(fields[0]).ok_or_else(malformed)?;
    let distance = parse_finite(fields[1]).ok_or_else(malformed)?;
    Ok(Sample::new(angle, distance))
}

pub(crate) fn parse_structured(line: &str) -> Result<(Sample, WireFormat), RadarError> {
    let malformed = || RadarError::MalformedLine(line.to_string());
    let value: Value = serde_json::from_str(line).map_err(|_| malformed())?;
    let object = value.as_object().ok_or_else(malformed)?;
    let (angle, angle_capitalized) =
        numeric_field(object, "Angle", "angle").ok_or_else(malformed)?;
    let (distance, distance_capitalized) =
        numeric_field(object, "Distance", "distance").ok_or_else(malformed)?;
    let case = match (angle_capitalized, distance_capitalized) {
        (true, true) => FieldCase::Capitalized,
        (false, false) => FieldCase::Lowercase,
        _ => FieldCase::Mixed,
    };
    Ok((Sample::new(angle, distance), WireFormat::Structured(case)))
}

/// Looks up `capitalized` first, then `lowercase`. The flag tells which key
/// matched.
fn numeric_field(
    object: &Map<String, Value>,
    capitalized: &str,
    lowercase: &str,
) -> Option<(f64, bool)> {
    if let Some(value) = object.get(capitalized) {
        return finite(value.as_f64()?).map(|v| (v, true));
    }
    let value = object.get(lowercase)?;
    finite(value.as_f64()?).map(|v| (v, false))
}

fn parse_finite(field: &str) -> Option<f64> {
    finite(field.trim().parse::<f64>().ok()?)
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
