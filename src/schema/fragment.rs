//! # Schema Fragments
//!
//! Categories extend a resource with attributes declared in YAML rather than in Rust.
//! Three spellings are accepted:
//!
//! ```yaml
//! # 1. wrapped
//! schema:
//!   type: object
//!   properties:
//!     additionalNote: { type: string }
//! ---
//! # 2. bare schema
//! type: object
//! properties:
//!   additionalNote: { type: string }
//! ---
//! # 3. property shorthand
//! additionalNote: string
//! priority: integer
//! ```

use super::error::SchemaParseError;
use super::model::{Schema, SchemaType, UiSchema};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

const SCHEMA_KEYS: [&str; 4] = ["type", "properties", "items", "$ref"];

/// Parses a YAML fragment into an object schema.
///
/// An empty document yields an object with no properties.
pub fn parse_fragment(yaml: &str) -> Result<Schema, SchemaParseError> {
    if yaml.trim().is_empty() {
        return Ok(Schema::object(Vec::<(String, Schema)>::new()));
    }

    let document: Value = serde_yaml::from_str(yaml)?;
    let Value::Mapping(mut root) = document else {
        return match document {
            Value::Null => Ok(Schema::object(Vec::<(String, Schema)>::new())),
            _ => Err(SchemaParseError::NotAMapping),
        };
    };

    let node = match root.remove("schema") {
        Some(wrapped) => wrapped,
        None if is_schema_node(&root) => Value::Mapping(root),
        None => Value::Mapping(expand_shorthand(root, "$")?),
    };

    let mut schema = parse_node(node, "$")?;
    infer_container_type(&mut schema);
    schema
        .check_shape()
        .map_err(|(path, reason)| SchemaParseError::Inconsistent { path, reason })?;
    Ok(schema)
}

/// Folds `fragment` onto `base`.
///
/// Properties are unioned with `fragment` winning on key conflicts; `required` lists and the
/// UI field order are concatenated without duplicates. The result is always an object and
/// carries no type name.
pub fn merge(base: &Schema, fragment: &Schema) -> Schema {
    let mut merged = base.clone();
    merged.schema_type = Some(SchemaType::Object);
    merged.type_name = None;
    merged.items = None;

    let properties = merged.properties.get_or_insert_with(BTreeMap::new);
    let mut added = Vec::new();
    if let Some(extra) = &fragment.properties {
        for (name, schema) in extra {
            if properties.insert(name.clone(), schema.clone()).is_none() {
                added.push(name.clone());
            }
        }
    }

    for name in fragment.required.iter().flatten() {
        merged = merged.require(name.clone());
    }

    let base_order = base
        .ui
        .as_ref()
        .and_then(|ui| ui.order.clone())
        .unwrap_or_else(|| base.property_names().into_iter().map(String::from).collect());
    let mut order = base_order;
    let fragment_order = fragment
        .ui
        .as_ref()
        .and_then(|ui| ui.order.clone())
        .unwrap_or(added);
    for name in fragment_order {
        if !order.contains(&name) {
            order.push(name);
        }
    }
    let ui = merged.ui.get_or_insert_with(UiSchema::default);
    ui.order = Some(order);

    merged
}

fn is_schema_node(mapping: &Mapping) -> bool {
    SCHEMA_KEYS.iter().any(|key| mapping.contains_key(*key))
}

/// Turns `name: typename` pairs into a bare object node.
fn expand_shorthand(mapping: Mapping, path: &str) -> Result<Mapping, SchemaParseError> {
    let mut properties = Mapping::new();
    for (key, value) in mapping {
        let name = key.as_str().map(str::to_string).unwrap_or_default();
        let child_path = format!("{path}.{name}");
        let expanded = match value {
            Value::String(type_name) => {
                let mut node = Mapping::new();
                node.insert("type".into(), Value::String(type_name));
                Value::Mapping(node)
            }
            Value::Mapping(inner) if is_schema_node(&inner) => Value::Mapping(inner),
            Value::Mapping(inner) => Value::Mapping(expand_shorthand(inner, &child_path)?),
            _ => {
                return Err(SchemaParseError::Inconsistent {
                    path: child_path,
                    reason: "expected a type name or a schema".into(),
                })
            }
        };
        properties.insert(key, expanded);
    }
    let mut node = Mapping::new();
    node.insert("type".into(), "object".into());
    node.insert("properties".into(), Value::Mapping(properties));
    Ok(node)
}

fn parse_node(node: Value, path: &str) -> Result<Schema, SchemaParseError> {
    check_type_names(&node, path)?;
    Ok(serde_yaml::from_value(node)?)
}

/// Rejects type names outside the enumerated set, reporting where they occur.
fn check_type_names(node: &Value, path: &str) -> Result<(), SchemaParseError> {
    let Value::Mapping(mapping) = node else {
        return Err(SchemaParseError::Inconsistent {
            path: path.to_string(),
            reason: "expected a mapping".into(),
        });
    };
    if let Some(type_value) = mapping.get("type") {
        let type_name = type_value.as_str().unwrap_or_default();
        if SchemaType::parse(type_name).is_none() {
            return Err(SchemaParseError::UnknownType {
                path: path.to_string(),
                type_name: type_name.to_string(),
            });
        }
    }
    if let Some(Value::Mapping(properties)) = mapping.get("properties") {
        for (key, child) in properties {
            let name = key.as_str().unwrap_or_default();
            check_type_names(child, &format!("{path}.{name}"))?;
        }
    }
    if let Some(items) = mapping.get("items") {
        check_type_names(items, &format!("{path}[]"))?;
    }
    Ok(())
}

/// Fills in `object`/`array` where a fragment omitted the type but gave properties or items.
fn infer_container_type(schema: &mut Schema) {
    if schema.schema_type.is_none() && schema.reference.is_none() {
        if schema.properties.is_some() {
            schema.schema_type = Some(SchemaType::Object);
        } else if schema.items.is_some() {
            schema.schema_type = Some(SchemaType::Array);
        }
    }
    if let Some(properties) = &mut schema.properties {
        properties.values_mut().for_each(infer_container_type);
    }
    if let Some(items) = &mut schema.items {
        infer_container_type(items);
    }
}
