//! Structured output contracts
//!
//! An `OutputSchema` describes the JSON object a persona must answer with.
//! It is sent to the provider as a strict JSON schema and checked again
//! locally before the parsed object is trusted.

use serde_json::{json, Map, Value};
use std::fmt;

/// Type of a top-level field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// A string
    Text,
    /// An array of strings
    TextList,
    /// A string restricted to the listed values
    OneOf(Vec<String>),
}

/// One required top-level field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaField {
    pub name: String,
    pub kind: FieldKind,
    pub description: String,
}

impl SchemaField {
    pub fn text(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Text,
            description: description.to_string(),
        }
    }

    pub fn text_list(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::TextList,
            description: description.to_string(),
        }
    }

    pub fn one_of(name: &str, values: &[&str], description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::OneOf(values.iter().map(|v| v.to_string()).collect()),
            description: description.to_string(),
        }
    }
}

/// Named object contract; every field is required and no others are allowed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSchema {
    pub name: String,
    pub fields: Vec<SchemaField>,
}

/// A way in which a value breaks the contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaViolation {
    NotAnObject,
    MissingField(String),
    WrongType { field: String, expected: &'static str },
    NotAllowed { field: String, value: String },
    UnexpectedField(String),
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaViolation::NotAnObject => write!(f, "value is not a JSON object"),
            SchemaViolation::MissingField(name) => write!(f, "missing field '{}'", name),
            SchemaViolation::WrongType { field, expected } => {
                write!(f, "field '{}' must be {}", field, expected)
            }
            SchemaViolation::NotAllowed { field, value } => {
                write!(f, "field '{}' has disallowed value '{}'", field, value)
            }
            SchemaViolation::UnexpectedField(name) => write!(f, "unexpected field '{}'", name),
        }
    }
}

impl OutputSchema {
    pub fn new(name: impl Into<String>, fields: Vec<SchemaField>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// JSON schema sent with `strict` enforcement
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            let property = match &field.kind {
                FieldKind::Text => json!({
                    "type": "string",
                    "description": field.description,
                }),
                FieldKind::TextList => json!({
                    "type": "array",
                    "items": { "type": "string" },
                    "description": field.description,
                }),
                FieldKind::OneOf(values) => json!({
                    "type": "string",
                    "enum": values,
                    "description": field.description,
                }),
            };
            properties.insert(field.name.clone(), property);
        }

        let required: Vec<&str> = self.fields.iter().map(|f| f.name.as_str()).collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// Check a parsed value, collecting every violation
    pub fn validate(&self, value: &Value) -> std::result::Result<(), Vec<SchemaViolation>> {
        let Some(object) = value.as_object() else {
            return Err(vec![SchemaViolation::NotAnObject]);
        };

        let mut violations = Vec::new();

        for field in &self.fields {
            let Some(v) = object.get(&field.name) else {
                violations.push(SchemaViolation::MissingField(field.name.clone()));
                continue;
            };

            match &field.kind {
                FieldKind::Text => {
                    if !v.is_string() {
                        violations.push(SchemaViolation::WrongType {
                            field: field.name.clone(),
                            expected: "a string",
                        });
                    }
                }
                FieldKind::TextList => {
                    let ok = v
                        .as_array()
                        .map(|items| items.iter().all(Value::is_string))
                        .unwrap_or(false);
                    if !ok {
                        violations.push(SchemaViolation::WrongType {
                            field: field.name.clone(),
                            expected: "an array of strings",
                        });
                    }
                }
                FieldKind::OneOf(allowed) => match v.as_str() {
                    Some(s) if allowed.iter().any(|a| a == s) => {}
                    Some(s) => violations.push(SchemaViolation::NotAllowed {
                        field: field.name.clone(),
                        value: s.to_string(),
                    }),
                    None => violations.push(SchemaViolation::WrongType {
                        field: field.name.clone(),
                        expected: "a string",
                    }),
                },
            }
        }

        for key in object.keys() {
            if self.field(key).is_none() {
                violations.push(SchemaViolation::UnexpectedField(key.clone()));
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}
