//! # Extraction Response Parsing
//!
//! Turns the text a language model returned for a roof report into a
//! [`RawMeasurement`]. The model is asked for a JSON object but often wraps
//! it in prose or a fenced code block.
//!
//! ```text
//! "Here is the data:\n```json\n{ \"PropertyDetailsAndRoofMeasurements\": {…} }\n```"
//!                              ▲                                            ▲
//!                         first '{'                                    last '}'
//! ```

use serde_json::{Map, Value};
use thiserror::Error;

use roofquote_core::{fields, RawMeasurement};

/// Key the measurements are nested under in the model's reply.
pub const MEASUREMENTS_KEY: &str = "PropertyDetailsAndRoofMeasurements";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Extraction response contains no JSON object")]
    NoJsonObject,

    #[error("Extraction response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Extraction response has no roof measurements")]
    MissingMeasurements,
}

/// Parses a model reply into raw (un-normalized) measurements.
///
/// ## Returns
/// * `Ok(RawMeasurement)` - The object under [`MEASUREMENTS_KEY`], or the
///   top-level object when that key is absent but measurement keys are
///   present at the top level
/// * `Err(NoJsonObject)` - No `{ … }` span in the text
/// * `Err(InvalidJson)` - The span does not parse, or a field has the
///   wrong shape (e.g. a non-string `Address`)
/// * `Err(MissingMeasurements)` - Parsed, but nothing that looks like a
///   measurement object
pub fn parse_extraction_response(text: &str) -> Result<RawMeasurement, ExtractionError> {
    let start = text.find('{').ok_or(ExtractionError::NoJsonObject)?;
    let end = text.rfind('}').ok_or(ExtractionError::NoJsonObject)?;
    if end < start {
        return Err(ExtractionError::NoJsonObject);
    }

    let value: Value = serde_json::from_str(&text[start..=end])?;
    let object = value.as_object().ok_or(ExtractionError::MissingMeasurements)?;

    let measurements = match object.get(MEASUREMENTS_KEY) {
        Some(Value::Object(inner)) => inner,
        Some(_) => return Err(ExtractionError::MissingMeasurements),
        None if has_measurement_keys(object) => object,
        None => return Err(ExtractionError::MissingMeasurements),
    };

    Ok(serde_json::from_value(Value::Object(measurements.clone()))?)
}

fn has_measurement_keys(object: &Map<String, Value>) -> bool {
    object.contains_key(fields::TOTAL_ROOF_AREA)
        || fields::LENGTHS.iter().any(|key| object.contains_key(*key))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use roofquote_core::{normalize_measurement, RawDimension};

    use super::*;

    #[test]
    fn test_fenced_reply_with_nested_key() {
        let reply = r#"Sure! Here are the measurements:
```json
{
  "PropertyDetailsAndRoofMeasurements": {
    "Address": "24 Lakeside Drive, Rockville, MD",
    "TotalRoofArea_sqft": "2,200",
    "RidgesHipsLength_ft": "46ft 0in",
    "ValleysLength_ft": "22ft",
    "HipsLength_ft": 14,
    "RakesLength_ft": null
  }
}
```
Let me know if you need anything else."#;

        let raw = parse_extraction_response(reply).unwrap();
        assert_eq!(raw.address.as_deref(), Some("24 Lakeside Drive, Rockville, MD"));
        assert_eq!(raw.hips_length_ft, Some(RawDimension::Number(14.0)));
        assert_eq!(raw.rakes_length_ft, None);

        let (measurement, issues) = normalize_measurement(&raw);
        assert!(issues.is_empty());
        assert_eq!(measurement.total_roof_area_sqft, 2200.0);
        assert_eq!(measurement.ridges_hips_length_ft, 46.0);
        assert_eq!(measurement.valleys_length_ft, 22.0);
    }

    #[test]
    fn test_top_level_measurements_accepted() {
        let raw = parse_extraction_response(
            r#"{"TotalRoofArea_sqft": 1800, "EavesLength_ft": "120ft 6in"}"#,
        )
        .unwrap();
        assert_eq!(raw.total_roof_area_sqft, Some(RawDimension::Number(1800.0)));
        assert_eq!(
            raw.eaves_length_ft,
            Some(RawDimension::Text("120ft 6in".to_string()))
        );
    }

    #[test]
    fn test_no_object() {
        assert!(matches!(
            parse_extraction_response("I could not read the report."),
            Err(ExtractionError::NoJsonObject)
        ));
        assert!(matches!(
            parse_extraction_response("} backwards {"),
            Err(ExtractionError::NoJsonObject)
        ));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            parse_extraction_response(r#"{"TotalRoofArea_sqft": 2200,}"#),
            Err(ExtractionError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_missing_measurements() {
        assert!(matches!(
            parse_extraction_response(r#"{"summary": "roof looks fine"}"#),
            Err(ExtractionError::MissingMeasurements)
        ));
        assert!(matches!(
            parse_extraction_response(r#"{"PropertyDetailsAndRoofMeasurements": "n/a"}"#),
            Err(ExtractionError::MissingMeasurements)
        ));
    }
}
