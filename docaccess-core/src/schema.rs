//! The HL7 result document and its external key mapping.
//!
//! Instruments deliver results as JSON objects keyed by human readable field
//! names (`"Sender Name or ID"`, `"Data or Measurement Value"`, ...). The store and
//! the rest of the access layer only ever see the internal field names. The
//! translation between the two lives entirely in this module, driven by the
//! [`Level`] tables below.
//!
//! # Example
//!
//! ```ignore
//! use docaccess::schema::Hl7Document;
//!
//! let document = Hl7Document::from_external_json(payload)?;
//! assert_eq!(document.patient.order.results[0].value, 10.5);
//!
//! let stored_form = document.to_internal_json()?;
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    document::Document,
    error::{DocumentStoreError, DocumentStoreResult},
};

/// One ingested result message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hl7Document {
    #[serde(rename = "SenderID", default)]
    pub sender_id: String,
    #[serde(rename = "VersionNumber", default)]
    pub version_number: String,
    #[serde(rename = "Patient")]
    pub patient: Patient,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    #[serde(rename = "Order")]
    pub order: Order,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "InstrumentSpecimenID", default)]
    pub instrument_specimen_id: String,
    #[serde(rename = "UniversalTestID", default)]
    pub universal_test_id: String,
    #[serde(rename = "ActionCode", default)]
    pub action_code: String,
    #[serde(rename = "ReportType", default)]
    pub report_type: String,
    /// Required; an empty list is accepted when the source sends one.
    #[serde(rename = "Results")]
    pub results: Vec<TestResult>,
}

/// A single measured result within an order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    #[serde(rename = "UniversalTestID", default)]
    pub universal_test_id: String,
    #[serde(rename = "Value", default)]
    pub value: f64,
    #[serde(rename = "Units", default)]
    pub units: String,
    #[serde(rename = "AbnormalFlag", default)]
    pub abnormal_flag: String,
    #[serde(rename = "OperatorID", default)]
    pub operator_id: String,
    /// Completion timestamp exactly as sent by the instrument. Not parsed.
    #[serde(rename = "CompletedAt", default)]
    pub completed_at: String,
}

impl Document for Hl7Document {
    fn schema_name() -> &'static str {
        "HL7"
    }
}

impl Hl7Document {
    /// Parses an instrument payload keyed by the external field names.
    ///
    /// Missing scalar fields take their defaults (empty string, `0.0`).
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::MalformedDocument`] when the text is not JSON,
    /// when `Patient`, `Order` or `Results` is absent, or when a present field has
    /// the wrong type.
    pub fn from_external_json(text: &str) -> DocumentStoreResult<Self> {
        let value: Value = serde_json::from_str(text).map_err(malformed)?;

        serde_json::from_value(translate(value, &DOCUMENT, Direction::ToInternal)?).map_err(malformed)
    }

    /// Parses the internal representation produced by [`Hl7Document::to_internal_json`].
    pub fn from_internal_json(text: &str) -> DocumentStoreResult<Self> {
        serde_json::from_str(text).map_err(malformed)
    }

    /// Serializes to JSON using the internal field names.
    pub fn to_internal_json(&self) -> DocumentStoreResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serializes to JSON using the external field names.
    pub fn to_external_json(&self) -> DocumentStoreResult<String> {
        let internal = serde_json::to_value(self)?;

        Ok(serde_json::to_string(&translate(internal, &DOCUMENT, Direction::ToExternal)?)?)
    }
}

fn malformed(err: serde_json::Error) -> DocumentStoreError {
    DocumentStoreError::MalformedDocument(err.to_string())
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    ToInternal,
    ToExternal,
}

/// Shape of a field's value, telling [`translate`] whether and how to recurse.
#[derive(Debug)]
enum Shape {
    Scalar,
    Object(&'static Level),
    ObjectList(&'static Level),
}

#[derive(Debug)]
struct Field {
    external: &'static str,
    internal: &'static str,
    shape: Shape,
}

impl Field {
    const fn scalar(external: &'static str, internal: &'static str) -> Self {
        Self { external, internal, shape: Shape::Scalar }
    }

    fn source_key(&self, direction: Direction) -> &'static str {
        match direction {
            Direction::ToInternal => self.external,
            Direction::ToExternal => self.internal,
        }
    }

    fn target_key(&self, direction: Direction) -> &'static str {
        match direction {
            Direction::ToInternal => self.internal,
            Direction::ToExternal => self.external,
        }
    }
}

/// Key table for one nesting level of the document.
#[derive(Debug)]
struct Level {
    fields: &'static [Field],
}

static RESULT: Level = Level {
    fields: &[
        Field::scalar("Universal Test ID", "UniversalTestID"),
        Field::scalar("Data or Measurement Value", "Value"),
        Field::scalar("Units", "Units"),
        Field::scalar("Result Abnormal Flags", "AbnormalFlag"),
        Field::scalar("Operator Identification", "OperatorID"),
        Field::scalar("Date/Time Test Complete", "CompletedAt"),
    ],
};

static ORDER: Level = Level {
    fields: &[
        Field::scalar("Instrument Specimen ID", "InstrumentSpecimenID"),
        Field::scalar("Universal Test ID", "UniversalTestID"),
        Field::scalar("Action Code", "ActionCode"),
        Field::scalar("Report Type", "ReportType"),
        Field { external: "Results", internal: "Results", shape: Shape::ObjectList(&RESULT) },
    ],
};

static PATIENT: Level = Level {
    fields: &[Field { external: "Order", internal: "Order", shape: Shape::Object(&ORDER) }],
};

static DOCUMENT: Level = Level {
    fields: &[
        Field::scalar("Sender Name or ID", "SenderID"),
        Field::scalar("Version Number", "VersionNumber"),
        Field { external: "Patient", internal: "Patient", shape: Shape::Object(&PATIENT) },
    ],
};

/// Renames the keys of `value` according to `level`, recursing into nested levels.
///
/// Keys the table does not know are dropped. Every level must be a JSON object and
/// every object list an array; scalar types are left for deserialization to check.
fn translate(value: Value, level: &Level, direction: Direction) -> DocumentStoreResult<Value> {
    let Value::Object(mut source) = value else {
        return Err(DocumentStoreError::MalformedDocument(format!(
            "expected an object, found {}",
            kind_of(&value)
        )));
    };

    let mut target = Map::with_capacity(level.fields.len());

    for field in level.fields {
        let key = field.source_key(direction);
        let Some(value) = source.remove(key) else {
            continue;
        };

        let value = match (&field.shape, value) {
            (Shape::Scalar, value) => value,
            (Shape::Object(nested), value) => translate(value, nested, direction)
                .map_err(|err| within(key, err))?,
            (Shape::ObjectList(nested), Value::Array(items)) => Value::Array(
                items
                    .into_iter()
                    .map(|item| translate(item, nested, direction))
                    .collect::<DocumentStoreResult<_>>()
                    .map_err(|err| within(key, err))?,
            ),
            (Shape::ObjectList(_), value) => {
                return Err(DocumentStoreError::MalformedDocument(format!(
                    "`{key}`: expected an array, found {}",
                    kind_of(&value)
                )));
            }
        };

        target.insert(field.target_key(direction).to_string(), value);
    }

    Ok(Value::Object(target))
}

fn within(key: &str, err: DocumentStoreError) -> DocumentStoreError {
    match err {
        DocumentStoreError::MalformedDocument(reason) => {
            DocumentStoreError::MalformedDocument(format!("`{key}`: {reason}"))
        }
        other => other,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE: &str = r#"{
        "Sender Name or ID": "Sender123",
        "Version Number": "1.0",
        "Patient": {
            "Order": {
                "Instrument Specimen ID": "Specimen123",
                "Universal Test ID": "Test123",
                "Action Code": "Action123",
                "Report Type": "Type123",
                "Results": [
                    {
                        "Universal Test ID": "Test1",
                        "Data or Measurement Value": 10.5,
                        "Units": "mg/dL",
                        "Result Abnormal Flags": "Abnormal",
                        "Operator Identification": "Operator1",
                        "Date/Time Test Complete": "2024-06-29T12:00:00"
                    },
                    {
                        "Universal Test ID": "Test2",
                        "Data or Measurement Value": 20.3,
                        "Units": "mmol/L",
                        "Result Abnormal Flags": "Normal",
                        "Operator Identification": "Operator2",
                        "Date/Time Test Complete": "2024-06-29T13:00:00"
                    }
                ]
            }
        }
    }"#;

    #[test]
    fn test_parse_external_payload() {
        let document = Hl7Document::from_external_json(SAMPLE).unwrap();

        assert_eq!(document.sender_id, "Sender123");
        assert_eq!(document.version_number, "1.0");
        assert_eq!(document.patient.order.instrument_specimen_id, "Specimen123");
        assert_eq!(document.patient.order.report_type, "Type123");
        assert_eq!(document.patient.order.results.len(), 2);

        let second = &document.patient.order.results[1];
        assert_eq!(second.universal_test_id, "Test2");
        assert_eq!(second.value, 20.3);
        assert_eq!(second.units, "mmol/L");
        assert_eq!(second.abnormal_flag, "Normal");
        assert_eq!(second.operator_id, "Operator2");
        assert_eq!(second.completed_at, "2024-06-29T13:00:00");
    }

    #[test]
    fn test_missing_optional_keys_take_defaults() {
        let document = Hl7Document::from_external_json(
            r#"{"Patient": {"Order": {"Results": [{"Units": "g/L"}]}}}"#,
        )
        .unwrap();

        assert_eq!(document.sender_id, "");
        assert_eq!(document.version_number, "");
        assert_eq!(document.patient.order.action_code, "");

        let result = &document.patient.order.results[0];
        assert_eq!(result.units, "g/L");
        assert_eq!(result.value, 0.0);
        assert_eq!(result.completed_at, "");
    }

    #[test]
    fn test_empty_results_list_is_accepted() {
        let document = Hl7Document::from_external_json(r#"{"Patient": {"Order": {"Results": []}}}"#).unwrap();
        assert!(document.patient.order.results.is_empty());
    }

    #[test]
    fn test_missing_required_nesting_is_malformed() {
        for payload in [
            r#"{"Sender Name or ID": "S1"}"#,
            r#"{"Patient": {}}"#,
            r#"{"Patient": {"Order": {"Report Type": "F"}}}"#,
            r#"{"Patient": null}"#,
            r#"not json"#,
            r#"[1, 2, 3]"#,
            r#"{"Patient": [{"Results": []}]}"#,
            r#"{"Patient": {"Order": ["SP1", "T1", "A1", "R1", []]}}"#,
            r#"["S1", "1.0", {"Order": {"Results": []}}]"#,
            r#"{"Patient": {"Order": {"Results": {"Units": "g/L"}}}}"#,
            r#"{"Patient": {"Order": {"Results": [["T1", 1.0]]}}}"#,
        ] {
            assert!(
                matches!(
                    Hl7Document::from_external_json(payload),
                    Err(DocumentStoreError::MalformedDocument(_))
                ),
                "{payload} should be malformed"
            );
        }
    }

    #[test]
    fn test_positional_nesting_names_the_offending_key() {
        let Err(DocumentStoreError::MalformedDocument(reason)) =
            Hl7Document::from_external_json(r#"{"Patient": {"Order": ["SP1", "T1"]}}"#)
        else {
            panic!("array-shaped order should be malformed");
        };

        assert_eq!(reason, "`Patient`: `Order`: expected an object, found an array");
    }

    #[test]
    fn test_wrongly_typed_field_is_malformed() {
        let payload = r#"{"Patient": {"Order": {"Results": [{"Data or Measurement Value": "ten"}]}}}"#;

        assert!(matches!(
            Hl7Document::from_external_json(payload),
            Err(DocumentStoreError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_integer_measurement_reads_as_float() {
        let payload = r#"{"Patient": {"Order": {"Results": [{"Data or Measurement Value": 7}]}}}"#;
        let document = Hl7Document::from_external_json(payload).unwrap();

        assert_eq!(document.patient.order.results[0].value, 7.0);
    }

    #[test]
    fn test_internal_json_uses_internal_names() {
        let document = Hl7Document::from_external_json(SAMPLE).unwrap();
        let internal: Value = serde_json::from_str(&document.to_internal_json().unwrap()).unwrap();

        assert_eq!(internal["SenderID"], json!("Sender123"));
        assert_eq!(internal["Patient"]["Order"]["InstrumentSpecimenID"], json!("Specimen123"));
        assert_eq!(internal["Patient"]["Order"]["Results"][0]["Value"], json!(10.5));
        assert_eq!(internal["Patient"]["Order"]["Results"][0]["AbnormalFlag"], json!("Abnormal"));
        assert!(internal.get("Sender Name or ID").is_none());

        assert_eq!(Hl7Document::from_internal_json(&document.to_internal_json().unwrap()).unwrap(), document);
    }

    #[test]
    fn test_external_round_trip() {
        let document = Hl7Document::from_external_json(SAMPLE).unwrap();
        let external = document.to_external_json().unwrap();

        assert!(external.contains("\"Date/Time Test Complete\""));
        assert_eq!(Hl7Document::from_external_json(&external).unwrap(), document);
    }

    #[test]
    fn test_measurement_precision_survives_serialization() {
        let mut document = Hl7Document::from_external_json(SAMPLE).unwrap();
        document.patient.order.results[0].value = 0.1 + 0.2;

        let restored = Hl7Document::from_internal_json(&document.to_internal_json().unwrap()).unwrap();
        assert_eq!(restored.patient.order.results[0].value.to_bits(), (0.1f64 + 0.2).to_bits());

        let restored = Hl7Document::from_external_json(&document.to_external_json().unwrap()).unwrap();
        assert_eq!(restored.patient.order.results[0].value.to_bits(), (0.1f64 + 0.2).to_bits());
    }

    #[test]
    fn test_unknown_external_keys_are_ignored() {
        let payload = r#"{"Comment": "x", "Patient": {"Name": "Doe", "Order": {"Results": []}}}"#;
        let document = Hl7Document::from_external_json(payload).unwrap();

        assert_eq!(document, Hl7Document::default());
    }
}
