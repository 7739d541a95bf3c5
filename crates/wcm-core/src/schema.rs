//! Schema definitions: the structural contract a collection document must
//! satisfy before it is written.
//!
//! A schema describes one collection document: the root key and, for each
//! entity in the sequence under it, the allowed fields. Unknown fields are
//! rejected.
//!
//! ```yaml
//! name: vehicles
//! root: vehicles
//! fields:
//!   id: { type: integer, required: true, unique: true }
//!   plate_number: { type: string, required: true }
//!   status: { type: enum, values: [AVAILABLE, ON_MISSION] }
//! ```

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::{SchemaError, ValidationError};

/// A schema definition for one collection document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: u32,
    /// Key under which the entity sequence is stored.
    pub root: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldDef>,
}

fn default_version() -> u32 {
    1
}

/// Definition of a single field in a schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    /// Value must not repeat across the collection (top-level fields only).
    #[serde(default)]
    pub unique: bool,
    /// For enum types: allowed values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    /// For array types: minimum number of items.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    /// For object types: nested field definitions.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldDef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Supported field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    /// `YYYY-MM-DD`
    Date,
    /// RFC 3339 timestamp
    Datetime,
    /// `HH:mm`
    Time,
    #[serde(rename = "enum")]
    Enum,
    Object,
    #[serde(rename = "object[]")]
    ObjectArray,
    #[serde(rename = "integer[]")]
    IntegerArray,
}

impl SchemaDefinition {
    /// Parse a schema from its YAML source.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::ParseError`] if the YAML is not a valid schema.
    pub fn from_yaml(name: &str, source: &str) -> Result<Self, SchemaError> {
        serde_yaml::from_str(source).map_err(|e| SchemaError::ParseError {
            name: name.to_string(),
            message: e.to_string(),
        })
    }

    /// Check a whole collection document against this schema.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found, located by field path.
    pub fn validate(&self, document: &Value) -> Result<(), ValidationError> {
        self.validate_as(document, &self.root)
    }

    /// Like [`SchemaDefinition::validate`], for a document stored under a
    /// different root key (a collection named other than its schema).
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found, located by field path.
    pub fn validate_as(&self, document: &Value, root: &str) -> Result<(), ValidationError> {
        let items = self.entries(document, root)?;
        self.check_unique(root, items)
    }

    /// Check every entry of a document stored under `root`, without the
    /// cross-entry `unique` rule. Used for incoming documents whose keys are
    /// settled only once they are merged into a collection.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found, located by field path.
    pub fn validate_entries_as(&self, document: &Value, root: &str) -> Result<(), ValidationError> {
        self.entries(document, root).map(|_| ())
    }

    fn entries<'a>(&self, document: &'a Value, root: &str) -> Result<&'a [Value], ValidationError> {
        let Value::Mapping(map) = document else {
            return Err(ValidationError::at_path("", "document must be a mapping"));
        };
        for key in map.keys() {
            if key.as_str() != Some(root) {
                return Err(ValidationError::at_path(
                    "",
                    format!(
                        "unexpected root element {}, expected '{root}'",
                        describe_key(key)
                    ),
                ));
            }
        }

        let items = match map.get(root) {
            None | Some(Value::Null) => return Ok(&[]),
            Some(Value::Sequence(items)) => items,
            Some(_) => return Err(ValidationError::at_path(root, "expected a sequence of entries")),
        };

        for (i, item) in items.iter().enumerate() {
            validate_object(&self.fields, item, &format!("{root}[{i}]"))?;
        }
        Ok(items.as_slice())
    }

    fn check_unique(&self, root: &str, items: &[Value]) -> Result<(), ValidationError> {
        for name in self.fields.iter().filter(|(_, d)| d.unique).map(|(n, _)| n) {
            let mut seen = HashSet::new();
            for (i, item) in items.iter().enumerate() {
                let Some(value) = item.get(name.as_str()).filter(|v| !is_unassigned(v)) else {
                    continue;
                };
                let key = serde_yaml::to_string(value).unwrap_or_default();
                if !seen.insert(key) {
                    return Err(ValidationError::at_path(
                        format!("{root}[{i}].{name}"),
                        format!("duplicate value {} for unique field '{name}'", scalar_text(value)),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Zero and empty values mark entries that have not been given a key yet.
fn is_unassigned(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Number(n) => n.as_u64() == Some(0),
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn describe_key(key: &Value) -> String {
    match key.as_str() {
        Some(s) => format!("'{s}'"),
        None => "(non-string key)".to_string(),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => "(complex value)".to_string(),
    }
}

fn validate_object(
    fields: &BTreeMap<String, FieldDef>,
    value: &Value,
    path: &str,
) -> Result<(), ValidationError> {
    let Value::Mapping(map) = value else {
        return Err(ValidationError::at_path(path, "expected a mapping"));
    };

    for key in map.keys() {
        let known = key.as_str().is_some_and(|k| fields.contains_key(k));
        if !known {
            return Err(ValidationError::at_path(
                path,
                format!("unexpected field {}", describe_key(key)),
            ));
        }
    }

    for (name, def) in fields {
        let field_path = format!("{path}.{name}");
        match map.get(name.as_str()) {
            None | Some(Value::Null) => {
                if def.required {
                    return Err(ValidationError::at_path(
                        field_path,
                        format!("missing required field '{name}'"),
                    ));
                }
            }
            Some(v) => validate_field(def, v, &field_path)?,
        }
    }
    Ok(())
}

fn validate_field(def: &FieldDef, value: &Value, path: &str) -> Result<(), ValidationError> {
    let expected = |what: &str| ValidationError::at_path(path, format!("expected {what}"));

    match def.field_type {
        FieldType::String => {
            value.as_str().ok_or_else(|| expected("a string"))?;
        }
        FieldType::Integer => {
            if value.as_i64().is_none() && value.as_u64().is_none() {
                return Err(expected("an integer"));
            }
            check_bounds(def, value.as_f64(), path)?;
        }
        FieldType::Float => {
            let number = value.as_f64().ok_or_else(|| expected("a number"))?;
            check_bounds(def, Some(number), path)?;
        }
        FieldType::Boolean => {
            value.as_bool().ok_or_else(|| expected("a boolean"))?;
        }
        FieldType::Date => {
            let text = value.as_str().ok_or_else(|| expected("a date"))?;
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map_err(|_| expected("a date in YYYY-MM-DD form"))?;
        }
        FieldType::Datetime => {
            let text = value.as_str().ok_or_else(|| expected("a timestamp"))?;
            DateTime::parse_from_rfc3339(text).map_err(|_| expected("an RFC 3339 timestamp"))?;
        }
        FieldType::Time => {
            let text = value.as_str().ok_or_else(|| expected("a time"))?;
            NaiveTime::parse_from_str(text.trim(), "%H:%M")
                .map_err(|_| expected("a time in HH:mm form"))?;
        }
        FieldType::Enum => {
            let text = value.as_str().ok_or_else(|| expected("an enum value"))?;
            let allowed = def.values.as_deref().unwrap_or_default();
            if !allowed.iter().any(|v| v == text) {
                return Err(ValidationError::at_path(
                    path,
                    format!("invalid value '{text}', allowed values are {allowed:?}"),
                ));
            }
        }
        FieldType::Object => validate_object(&def.fields, value, path)?,
        FieldType::ObjectArray => {
            let items = value.as_sequence().ok_or_else(|| expected("a sequence"))?;
            check_min_items(def, items.len(), path)?;
            for (i, item) in items.iter().enumerate() {
                validate_object(&def.fields, item, &format!("{path}[{i}]"))?;
            }
        }
        FieldType::IntegerArray => {
            let items = value.as_sequence().ok_or_else(|| expected("a sequence"))?;
            check_min_items(def, items.len(), path)?;
            for (i, item) in items.iter().enumerate() {
                if item.as_i64().is_none() && item.as_u64().is_none() {
                    return Err(ValidationError::at_path(
                        format!("{path}[{i}]"),
                        "expected an integer",
                    ));
                }
            }
        }
    }
    Ok(())
}

fn check_bounds(def: &FieldDef, number: Option<f64>, path: &str) -> Result<(), ValidationError> {
    let Some(number) = number else {
        return Ok(());
    };
    if let Some(min) = def.minimum {
        if number < min {
            return Err(ValidationError::at_path(
                path,
                format!("value {number} is below the minimum {min}"),
            ));
        }
    }
    if let Some(max) = def.maximum {
        if number > max {
            return Err(ValidationError::at_path(
                path,
                format!("value {number} is above the maximum {max}"),
            ));
        }
    }
    Ok(())
}

fn check_min_items(def: &FieldDef, len: usize, path: &str) -> Result<(), ValidationError> {
    match def.min_items {
        Some(min) if len < min => Err(ValidationError::at_path(
            path,
            format!("expected at least {min} item(s), found {len}"),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Location;

    const VEHICLES: &str = r#"
name: vehicles
root: vehicles
fields:
  id: { type: integer, required: true, unique: true, minimum: 1 }
  plate_number: { type: string, required: true }
  capacity: { type: float, required: true, minimum: 0 }
  status: { type: enum, values: [AVAILABLE, MAINTENANCE] }
  stops:
    type: object[]
    min_items: 1
    fields:
      id: { type: integer, required: true }
      at: { type: time }
"#;

    fn schema() -> SchemaDefinition {
        SchemaDefinition::from_yaml("vehicles", VEHICLES).expect("parse schema")
    }

    fn doc(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).expect("parse doc")
    }

    fn path_of(err: &ValidationError) -> &str {
        match &err.location {
            Location::Path(p) => p,
            Location::Position { .. } => panic!("expected a path location"),
        }
    }

    #[test]
    fn field_type_enum_roundtrip() {
        let ft = FieldType::ObjectArray;
        let json = serde_json::to_string(&ft).expect("serialize");
        assert_eq!(json, "\"object[]\"");
        let back: FieldType = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, FieldType::ObjectArray);
    }

    #[test]
    fn accepts_valid_and_empty_documents() {
        let valid = doc(
            "vehicles:\n  - id: 1\n    plate_number: AB-1\n    capacity: 500\n    status: AVAILABLE\n    stops:\n      - id: 3\n        at: '08:30'\n",
        );
        assert!(schema().validate(&valid).is_ok());
        assert!(schema().validate(&doc("vehicles: []\n")).is_ok());
        assert!(schema().validate(&doc("vehicles:\n")).is_ok());
    }

    #[test]
    fn rejects_missing_required_field_with_path() {
        let err = schema()
            .validate(&doc("vehicles:\n  - id: 1\n    capacity: 5.0\n"))
            .unwrap_err();
        assert_eq!(path_of(&err), "vehicles[0].plate_number");
        assert!(err.message.contains("missing required field"));
    }

    #[test]
    fn rejects_unknown_fields_and_bad_enum_values() {
        let err = schema()
            .validate(&doc(
                "vehicles:\n  - id: 1\n    plate_number: A\n    capacity: 1\n    colour: red\n",
            ))
            .unwrap_err();
        assert!(err.message.contains("colour"));

        let err = schema()
            .validate(&doc(
                "vehicles:\n  - id: 1\n    plate_number: A\n    capacity: 1\n    status: LOST\n",
            ))
            .unwrap_err();
        assert_eq!(path_of(&err), "vehicles[0].status");
    }

    #[test]
    fn rejects_duplicate_ids_and_out_of_range_numbers() {
        let err = schema()
            .validate(&doc(
                "vehicles:\n  - { id: 2, plate_number: A, capacity: 1 }\n  - { id: 2, plate_number: B, capacity: 1 }\n",
            ))
            .unwrap_err();
        assert_eq!(path_of(&err), "vehicles[1].id");
        assert!(err.message.contains("duplicate"));

        let err = schema()
            .validate(&doc("vehicles:\n  - { id: 0, plate_number: A, capacity: 1 }\n"))
            .unwrap_err();
        assert!(err.message.contains("minimum"));
    }

    #[test]
    fn unassigned_ids_may_repeat() {
        let schema = SchemaDefinition::from_yaml(
            "reports",
            "name: reports\nroot: reports\nfields:\n  id: { type: integer, required: true, unique: true }\n",
        )
        .unwrap();
        assert!(schema
            .validate(&doc("reports:\n  - id: 0\n  - id: 0\n  - id: 4\n"))
            .is_ok());
    }

    #[test]
    fn entry_check_leaves_uniqueness_to_the_merged_collection() {
        let repeated = doc(
            "vehicles:\n  - { id: 9, plate_number: A, capacity: 1 }\n  - { id: 9, plate_number: B, capacity: 1 }\n",
        );
        assert!(schema().validate_entries_as(&repeated, "vehicles").is_ok());
        assert!(schema().validate_as(&repeated, "vehicles").is_err());

        let err = schema()
            .validate_entries_as(&doc("vehicles:\n  - { id: 9, capacity: 1 }\n"), "vehicles")
            .unwrap_err();
        assert_eq!(path_of(&err), "vehicles[0].plate_number");
    }

    #[test]
    fn enforces_nested_cardinality_and_time_format() {
        let err = schema()
            .validate(&doc(
                "vehicles:\n  - { id: 1, plate_number: A, capacity: 1, stops: [] }\n",
            ))
            .unwrap_err();
        assert_eq!(path_of(&err), "vehicles[0].stops");

        let err = schema()
            .validate(&doc(
                "vehicles:\n  - { id: 1, plate_number: A, capacity: 1, stops: [{ id: 1, at: 'late' }] }\n",
            ))
            .unwrap_err();
        assert_eq!(path_of(&err), "vehicles[0].stops[0].at");
    }

    #[test]
    fn rejects_wrong_root_element() {
        let err = schema().validate(&doc("trucks: []\n")).unwrap_err();
        assert!(err.message.contains("trucks"));
        assert!(schema().validate_as(&doc("trucks: []\n"), "trucks").is_ok());
    }
}
