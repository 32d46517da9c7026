//! Structural validation of JSON payloads against a [`Schema`].

use super::model::{Schema, SchemaType};
use serde_json::Value;
use std::fmt;

/// One mismatch between a value and its schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Checks `value` against `schema`, collecting every violation.
///
/// Unknown properties are accepted (records may carry metadata). `$ref` nodes and nodes
/// without a type accept anything.
pub fn validate(schema: &Schema, value: &Value) -> Result<(), Vec<Violation>> {
    let mut violations = Vec::new();
    check(schema, value, "$", &mut violations);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

fn check(schema: &Schema, value: &Value, path: &str, out: &mut Vec<Violation>) {
    if schema.reference.is_some() {
        return;
    }
    let Some(expected) = schema.schema_type else {
        return;
    };

    let matches = match expected {
        SchemaType::String => value.is_string(),
        SchemaType::Integer => is_integer(value),
        SchemaType::Number => value.is_number(),
        SchemaType::Boolean => value.is_boolean(),
        SchemaType::Object => value.is_object(),
        SchemaType::Array => value.is_array(),
    };
    if !matches {
        out.push(Violation {
            path: path.to_string(),
            message: format!("expected {expected}, found {}", kind_of(value)),
        });
        return;
    }

    if let Some(allowed) = &schema.enum_values {
        if !allowed.contains(value) {
            out.push(Violation {
                path: path.to_string(),
                message: format!("value {value} is not one of the allowed values"),
            });
        }
    }

    match value {
        Value::String(text) => {
            let length = text.chars().count() as u64;
            if let Some(min) = schema.min_length.filter(|min| length < *min) {
                out.push(Violation {
                    path: path.to_string(),
                    message: format!("shorter than {min} characters"),
                });
            }
            if let Some(max) = schema.max_length.filter(|max| length > *max) {
                out.push(Violation {
                    path: path.to_string(),
                    message: format!("longer than {max} characters"),
                });
            }
        }
        Value::Object(fields) => {
            for name in schema.required.iter().flatten() {
                if fields.get(name).map_or(true, Value::is_null) {
                    out.push(Violation {
                        path: format!("{path}.{name}"),
                        message: "is required".to_string(),
                    });
                }
            }
            if let Some(properties) = &schema.properties {
                for (name, child) in properties {
                    match fields.get(name) {
                        None | Some(Value::Null) => {}
                        Some(field) => check(child, field, &format!("{path}.{name}"), out),
                    }
                }
            }
        }
        Value::Array(elements) => {
            if let Some(items) = &schema.items {
                for (index, element) in elements.iter().enumerate() {
                    check(items, element, &format!("{path}[{index}]"), out);
                }
            }
        }
        _ => {}
    }
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0),
        _ => false,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn customer() -> Schema {
        Schema::object([
            ("id", Schema::string()),
            ("age", Schema::integer()),
            ("tags", Schema::array(Schema::string())),
            (
                "address",
                Schema::object([("city", Schema::string())]).require("city"),
            ),
        ])
        .require("id")
    }

    #[test]
    fn accepts_conforming_payloads_with_extra_keys() {
        let value = json!({"id": "1", "age": 42, "tags": ["a"], "categoryType": "cat-1"});
        assert!(validate(&customer(), &value).is_ok());
    }

    #[test]
    fn integers_reject_fractions() {
        let err = validate(&customer(), &json!({"id": "1", "age": 4.5})).unwrap_err();
        assert_eq!(err[0].path, "$.age");
        assert!(validate(&customer(), &json!({"id": "1", "age": 4.0})).is_ok());
    }

    #[test]
    fn collects_nested_violations() {
        let value = json!({"tags": ["a", 3], "address": {}});
        let err = validate(&customer(), &value).unwrap_err();
        let paths: Vec<_> = err.iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, vec!["$.id", "$.address.city", "$.tags[1]"]);
    }

    #[test]
    fn length_and_enum_bounds() {
        let mut code = Schema::string();
        code.min_length = Some(2);
        code.max_length = Some(3);
        code.enum_values = Some(vec![json!("EUR"), json!("USD")]);
        assert!(validate(&code, &json!("EUR")).is_ok());
        assert_eq!(validate(&code, &json!("E")).unwrap_err().len(), 2);
        assert_eq!(validate(&code, &json!("GBP")).unwrap_err().len(), 1);
    }
}
