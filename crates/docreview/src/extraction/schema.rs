//! Field schemas sent to the extraction gateway and used to check its replies.

use serde_json::{json, Map, Value};

use super::ExtractionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
    Integer,
    /// String constrained to a closed set of values.
    Enum(&'static [&'static str]),
}

impl FieldKind {
    fn json_type(&self) -> &'static str {
        match self {
            FieldKind::String | FieldKind::Enum(_) => "string",
            FieldKind::Number => "number",
            FieldKind::Integer => "integer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub description: Option<&'static str>,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            description: None,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            description: None,
        }
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    fn to_json_schema(&self) -> Value {
        let mut property = Map::new();

        // Optional fields may come back as explicit nulls.
        if self.required {
            property.insert("type".into(), json!(self.kind.json_type()));
        } else {
            property.insert("type".into(), json!([self.kind.json_type(), "null"]));
        }

        if let FieldKind::Enum(allowed) = self.kind {
            let mut values: Vec<Value> = allowed.iter().map(|v| json!(v)).collect();
            if !self.required {
                values.push(Value::Null);
            }
            property.insert("enum".into(), Value::Array(values));
        }

        if let Some(description) = self.description {
            property.insert("description".into(), json!(description));
        }

        Value::Object(property)
    }
}

/// Object schema for one extraction request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    pub name: &'static str,
    pub fields: Vec<FieldSpec>,
}

impl FieldSchema {
    pub fn new(name: &'static str, fields: Vec<FieldSpec>) -> Self {
        Self { name, fields }
    }

    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.to_string(), f.to_json_schema()))
            .collect();

        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Checks a gateway reply against this schema.
    pub fn validate(&self, value: &Value) -> Result<(), ExtractionError> {
        if !value.is_object() {
            return Err(ExtractionError::Malformed(format!(
                "expected a JSON object for '{}'",
                self.name
            )));
        }

        let schema = self.to_json_schema();
        let validator = jsonschema::validator_for(&schema).map_err(|e| {
            ExtractionError::SchemaMismatch {
                schema: self.name.to_string(),
                errors: format!("invalid schema: {}", e),
            }
        })?;

        let errors: Vec<String> = validator
            .iter_errors(value)
            .map(|e| e.to_string())
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ExtractionError::SchemaMismatch {
                schema: self.name.to_string(),
                errors: errors.join("; "),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIERS: &[&str] = &["20%", "30%", "50%"];

    fn schema() -> FieldSchema {
        FieldSchema::new(
            "invoice",
            vec![
                FieldSpec::required("number", FieldKind::String),
                FieldSpec::required("total", FieldKind::Number).describe("Invoice total"),
                FieldSpec::optional("percentage", FieldKind::Enum(TIERS)),
            ],
        )
    }

    #[test]
    fn test_to_json_schema_lists_required() {
        let rendered = schema().to_json_schema();
        assert_eq!(rendered["type"], "object");
        assert_eq!(rendered["required"], json!(["number", "total"]));
        assert_eq!(rendered["properties"]["total"]["description"], "Invoice total");
        assert_eq!(
            rendered["properties"]["percentage"]["enum"],
            json!(["20%", "30%", "50%", null])
        );
    }

    #[test]
    fn test_valid_response_passes() {
        let value = json!({"number": "INV-1", "total": 100.5, "percentage": "20%"});
        assert!(schema().validate(&value).is_ok());

        let without_optional = json!({"number": "INV-1", "total": 100});
        assert!(schema().validate(&without_optional).is_ok());

        let null_optional = json!({"number": "INV-1", "total": 1, "percentage": null});
        assert!(schema().validate(&null_optional).is_ok());
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let value = json!({"number": "INV-1"});
        match schema().validate(&value) {
            Err(ExtractionError::SchemaMismatch { schema, errors }) => {
                assert_eq!(schema, "invoice");
                assert!(errors.contains("total"), "errors: {}", errors);
            }
            other => panic!("Expected SchemaMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_type_and_enum_rejected() {
        let wrong_type = json!({"number": "INV-1", "total": "lots"});
        assert!(matches!(
            schema().validate(&wrong_type),
            Err(ExtractionError::SchemaMismatch { .. })
        ));

        let out_of_set = json!({"number": "INV-1", "total": 1, "percentage": "25%"});
        assert!(matches!(
            schema().validate(&out_of_set),
            Err(ExtractionError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_non_object_is_malformed() {
        assert!(matches!(
            schema().validate(&json!(["INV-1"])),
            Err(ExtractionError::Malformed(_))
        ));
    }
}
