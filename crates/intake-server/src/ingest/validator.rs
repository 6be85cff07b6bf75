//! Per-record structural validation
//!
//! Pure functions over a compiled `SchemaDefinition`; safe to run over many
//! records concurrently.

use serde_json::{Map, Value};

use super::schema::{FieldShape, RecordShape, SchemaDefinition};
use super::types::ValidationOutcome;

/// Validates records against a schema's record shape.
///
/// Every failure is reported; validation never stops at the first problem.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordValidator;

impl RecordValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, schema: &SchemaDefinition, record: &Value) -> ValidationOutcome {
        let mut reasons = Vec::new();

        match record.as_object() {
            Some(fields) => check_object(&schema.record_shape, fields, "", &mut reasons),
            None => reasons.push("record must be an object".to_string()),
        }

        ValidationOutcome::from_reasons(reasons)
    }
}

fn field_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

fn check_object(shape: &RecordShape, fields: &Map<String, Value>, prefix: &str, reasons: &mut Vec<String>) {
    for required in &shape.required {
        if fields.get(required).map_or(true, Value::is_null) {
            reasons.push(format!("{} is required", field_path(prefix, required)));
        }
    }

    // Shapes are checked for every declared field that is present, required or not.
    for (name, field_shape) in &shape.properties {
        match fields.get(name) {
            Some(value) if !value.is_null() => {
                check_value(field_shape, value, &field_path(prefix, name), reasons)
            },
            _ => {},
        }
    }
}

fn check_value(shape: &FieldShape, value: &Value, path: &str, reasons: &mut Vec<String>) {
    match shape {
        FieldShape::Scalar => {},
        FieldShape::Array { items, min_items } => {
            let Some(elements) = value.as_array() else {
                reasons.push(format!("{path} must be an array"));
                return;
            };

            if elements.len() < *min_items {
                reasons.push(format!("{path} must contain at least {min_items} item(s)"));
            }

            if let Some(item_shape) = items {
                for (index, element) in elements.iter().enumerate() {
                    check_value(item_shape, element, &format!("{path}[{index}]"), reasons);
                }
            }
        },
        FieldShape::Object(nested) => match value.as_object() {
            Some(fields) => check_object(nested, fields, path, reasons),
            None => reasons.push(format!("{path} must be an object")),
        },
    }
}
