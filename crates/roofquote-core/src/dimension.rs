//! # Dimension Normalizer
//!
//! Turns the free-form length strings found in measurement reports into feet.
//!
//! ## Accepted Shapes
//! ```text
//! ┌──────────────────────────┬──────────┬──────────────────────────────────┐
//! │ Input                    │ Feet     │ Notes                            │
//! ├──────────────────────────┼──────────┼──────────────────────────────────┤
//! │ "10ft 3in"               │ 10.25    │ feet + inches / 12               │
//! │ "10 ft 3 in"             │ 10.25    │ number + unit-only token joined  │
//! │ "10'6\""                 │ 10.5     │ several segments in one token    │
//! │ "102 in"                 │ 8.5      │ inches only                      │
//! │ "46"                     │ 46.0     │ bare number is feet              │
//! │ "0in", "5in"             │ 0.0      │ short inch-only strings          │
//! │ "", "null", "None"       │ 0.0      │ missing value                    │
//! │ "ft", "-3ft", "approx"   │ 0.0      │ malformed token, reported        │
//! └──────────────────────────┴──────────┴──────────────────────────────────┘
//! ```
//!
//! Malformed input never fails the request. The offending tokens contribute
//! nothing and are returned as [`MalformedDimension`] so the service layer can
//! log them next to the request id.

use std::fmt;

use crate::types::{fields, Measurement, RawDimension, RawMeasurement};

/// Feet units, longest first so `feet` wins over `ft`-style prefixes.
const FEET_UNITS: [&str; 4] = ["feet", "foot", "ft", "'"];

/// Inch units, longest first.
const INCH_UNITS: [&str; 4] = ["inches", "inch", "in", "\""];

// =============================================================================
// Result Types
// =============================================================================

/// Outcome of parsing one length string.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDimension {
    /// Total length in feet, rounded to 2 decimals.
    pub feet: f64,
    /// Tokens that were ignored because they could not be read.
    pub malformed_tokens: Vec<String>,
}

impl ParsedDimension {
    fn zero() -> Self {
        ParsedDimension {
            feet: 0.0,
            malformed_tokens: Vec::new(),
        }
    }

    /// True when every token was understood.
    pub fn is_clean(&self) -> bool {
        self.malformed_tokens.is_empty()
    }
}

/// A measurement value that was defaulted (fully or partly) to 0.
#[derive(Debug, Clone, PartialEq)]
pub struct MalformedDimension {
    /// Report name of the field (`ValleysLength_ft`).
    pub field: String,
    /// The value as received.
    pub input: String,
    /// What could not be read.
    pub reason: String,
}

impl fmt::Display for MalformedDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {:?}: {}", self.field, self.input, self.reason)
    }
}

// =============================================================================
// Length Parsing
// =============================================================================

/// Converts a length string to feet, ignoring malformed tokens.
///
/// ## Example
/// ```rust
/// use roofquote_core::dimension::dimension_to_feet;
///
/// assert_eq!(dimension_to_feet("10ft 3in"), 10.25);
/// assert_eq!(dimension_to_feet("0in"), 0.0);
/// assert_eq!(dimension_to_feet("null"), 0.0);
/// ```
pub fn dimension_to_feet(text: &str) -> f64 {
    parse_dimension(text).feet
}

/// Parses a length string, reporting the tokens it had to ignore.
pub fn parse_dimension(text: &str) -> ParsedDimension {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let lowered = normalized.to_lowercase();

    if lowered.is_empty() || lowered == "null" || lowered == "none" {
        return ParsedDimension::zero();
    }

    // "0in", "5in", "in": inch-only strings this short carry no length
    if lowered.contains("in") && lowered.chars().count() <= 3 {
        return ParsedDimension::zero();
    }

    let mut feet = 0.0;
    let mut inches = 0.0;
    let mut malformed_tokens = Vec::new();

    for token in join_unit_tokens(&lowered) {
        match parse_token(&token) {
            Some((f, i)) => {
                feet += f;
                inches += i;
            }
            None => malformed_tokens.push(token),
        }
    }

    ParsedDimension {
        feet: round2(feet + inches / 12.0),
        malformed_tokens,
    }
}

/// Splits on whitespace and glues a bare number to a following unit-only
/// token, so `"10 ft 3 in"` reads as `["10ft", "3in"]`.
fn join_unit_tokens(normalized: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut pending_number: Option<&str> = None;

    for word in normalized.split(' ') {
        if let Some(number) = pending_number.take() {
            if is_unit(word) {
                tokens.push(format!("{}{}", number, word));
                continue;
            }
            tokens.push(number.to_string());
        }

        if word.parse::<f64>().is_ok() {
            pending_number = Some(word);
        } else {
            tokens.push(word.to_string());
        }
    }

    if let Some(number) = pending_number {
        tokens.push(number.to_string());
    }

    tokens
}

fn is_unit(word: &str) -> bool {
    FEET_UNITS.contains(&word) || INCH_UNITS.contains(&word)
}

/// Reads one token as `(feet, inches)`. A token may hold several
/// number+unit segments (`10'6"`, `10ft3in`). Returns `None` if any segment
/// is unreadable, so a malformed token contributes nothing.
fn parse_token(token: &str) -> Option<(f64, f64)> {
    let mut feet = 0.0;
    let mut inches = 0.0;
    let mut rest = token;

    while !rest.is_empty() {
        let number_len = rest
            .char_indices()
            .find(|(i, c)| !(c.is_ascii_digit() || *c == '.' || (*i == 0 && (*c == '-' || *c == '+'))))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());

        let (number_text, after) = rest.split_at(number_len);
        if number_text.is_empty() {
            return None;
        }

        let value: f64 = number_text.parse().ok()?;
        if !value.is_finite() || value < 0.0 {
            return None;
        }

        if after.is_empty() {
            // Bare number: feet
            feet += value;
            break;
        }

        if let Some(unit) = FEET_UNITS.iter().find(|u| after.starts_with(*u)) {
            feet += value;
            rest = &after[unit.len()..];
        } else if let Some(unit) = INCH_UNITS.iter().find(|u| after.starts_with(*u)) {
            inches += value;
            rest = &after[unit.len()..];
        } else {
            return None;
        }
    }

    Some((feet, inches))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// =============================================================================
// Area Parsing
// =============================================================================

/// Parses a roof area in square feet.
///
/// Accepts `2200`, `"2,200"`, `"2200 sqft"`, `"2,200 sq ft"`.
/// Returns `Err(reason)` when the value cannot be read.
pub fn parse_area(text: &str) -> Result<f64, String> {
    let lowered = text.trim().to_lowercase();
    if lowered.is_empty() || lowered == "null" || lowered == "none" {
        return Ok(0.0);
    }

    let without_unit = ["square feet", "sq. ft.", "sq. ft", "sq ft", "sqft"]
        .iter()
        .find_map(|suffix| lowered.strip_suffix(suffix))
        .unwrap_or(lowered.as_str());
    let digits: String = without_unit.trim().chars().filter(|c| *c != ',').collect();

    let value: f64 = digits
        .parse()
        .map_err(|_| format!("'{}' is not a number", text.trim()))?;
    if !value.is_finite() {
        return Err("area must be finite".to_string());
    }
    if value < 0.0 {
        return Err("area must not be negative".to_string());
    }
    Ok(value)
}

// =============================================================================
// Measurement Normalization
// =============================================================================

/// Normalizes an extracted measurement map.
///
/// Missing fields become 0. `Address` is copied as-is; the area goes through
/// [`parse_area`]; every length field goes through [`parse_dimension`].
///
/// ## Example
/// ```rust
/// use roofquote_core::dimension::normalize_measurement;
/// use roofquote_core::types::{RawDimension, RawMeasurement};
///
/// let raw = RawMeasurement {
///     total_roof_area_sqft: Some(RawDimension::Text("2,200".into())),
///     valleys_length_ft: Some(RawDimension::Text("22ft 6in".into())),
///     hips_length_ft: Some(RawDimension::Text("about 14ft".into())),
///     ..Default::default()
/// };
///
/// let (measurement, issues) = normalize_measurement(&raw);
/// assert_eq!(measurement.total_roof_area_sqft, 2200.0);
/// assert_eq!(measurement.valleys_length_ft, 22.5);
/// assert_eq!(measurement.hips_length_ft, 14.0);
/// assert_eq!(issues.len(), 1);
/// ```
pub fn normalize_measurement(raw: &RawMeasurement) -> (Measurement, Vec<MalformedDimension>) {
    let mut issues = Vec::new();
    let mut measurement = Measurement {
        address: raw
            .address
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string(),
        ..Measurement::default()
    };

    measurement.total_roof_area_sqft = match raw.total_roof_area_sqft.as_ref() {
        None => 0.0,
        Some(value) => {
            let parsed = match value {
                RawDimension::Number(n) => {
                    if n.is_finite() && *n >= 0.0 {
                        Ok(*n)
                    } else {
                        Err("area must be a non-negative number".to_string())
                    }
                }
                RawDimension::Text(text) => parse_area(text),
                RawDimension::Other(_) => Err("not a number or string".to_string()),
            };
            parsed.unwrap_or_else(|reason| {
                issues.push(MalformedDimension {
                    field: fields::TOTAL_ROOF_AREA.to_string(),
                    input: describe(value),
                    reason,
                });
                0.0
            })
        }
    };

    for (field, value) in raw.lengths() {
        let Some(value) = value else { continue };
        let feet = match value {
            RawDimension::Number(n) if n.is_finite() && *n >= 0.0 => round2(*n),
            RawDimension::Number(_) => {
                issues.push(malformed(field, value, "length must be a non-negative number"));
                0.0
            }
            RawDimension::Text(text) => {
                let parsed = parse_dimension(text);
                if !parsed.is_clean() {
                    let reason = format!("ignored tokens {:?}", parsed.malformed_tokens);
                    issues.push(malformed(field, value, &reason));
                }
                parsed.feet
            }
            RawDimension::Other(_) => {
                issues.push(malformed(field, value, "not a number or string"));
                0.0
            }
        };
        if let Some(slot) = measurement.length_mut(field) {
            *slot = feet;
        }
    }

    (measurement, issues)
}

fn malformed(field: &str, value: &RawDimension, reason: &str) -> MalformedDimension {
    MalformedDimension {
        field: field.to_string(),
        input: describe(value),
        reason: reason.to_string(),
    }
}

fn describe(value: &RawDimension) -> String {
    match value {
        RawDimension::Number(n) => n.to_string(),
        RawDimension::Text(text) => text.clone(),
        RawDimension::Other(json) => json.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
