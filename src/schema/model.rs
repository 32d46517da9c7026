//! # Schema Tree
//!
//! The canonical description of a value. A node is one of:
//!
//! - a primitive (`string`, `integer`, `number`, `boolean`),
//! - an `object`, optionally with `properties`,
//! - an `array`, optionally with `items`,
//! - a `$ref` pointing at a named component (produced by the OpenAPI assembler, and by the
//!   generator for a record that contains itself).
//!
//! `properties` is a `BTreeMap` so that serialisation order is stable across restarts.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Where named components live in an assembled document.
pub const COMPONENT_PREFIX: &str = "#/components/schemas/";

/// The enumerated set of schema types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
}

impl SchemaType {
    pub const ALL: [SchemaType; 6] = [
        SchemaType::String,
        SchemaType::Integer,
        SchemaType::Number,
        SchemaType::Boolean,
        SchemaType::Object,
        SchemaType::Array,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::String => "string",
            SchemaType::Integer => "integer",
            SchemaType::Number => "number",
            SchemaType::Boolean => "boolean",
            SchemaType::Object => "object",
            SchemaType::Array => "array",
        }
    }

    /// Looks up a type by its wire name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value formats understood by Endor front-ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaFormat {
    DateTime,
    Date,
    Time,
    Email,
    Hostname,
    Ipv4,
    Ipv6,
    Uri,
    Uuid,
    Password,
    CountryCode,
    LanguageCode,
    Currency,
    Yaml,
    Json,
    Asset,
    ImageAsset,
    AudioAsset,
    VideoAsset,
}

impl SchemaFormat {
    /// Parses the kebab-case wire name (`date-time`, `image-asset`, ...).
    pub fn parse(name: &str) -> Option<Self> {
        serde_json::from_value(Value::String(name.to_string())).ok()
    }
}

/// Presentation hints carried under `x-ui`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiSchema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
}

impl UiSchema {
    pub fn is_empty(&self) -> bool {
        self.resource.is_none() && self.order.is_none() && self.hidden.is_none()
    }
}

/// A node of the schema tree.
///
/// `type_name` is the declared name of the Rust type a record schema was generated from.
/// It never appears on the wire; the OpenAPI assembler uses it to hoist the node into a
/// named component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<SchemaFormat>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(rename = "x-ui", skip_serializing_if = "Option::is_none")]
    pub ui: Option<UiSchema>,
    #[serde(skip)]
    pub type_name: Option<String>,
}

impl Schema {
    pub fn of(schema_type: SchemaType) -> Self {
        Self {
            schema_type: Some(schema_type),
            ..Self::default()
        }
    }

    pub fn string() -> Self {
        Self::of(SchemaType::String)
    }

    pub fn integer() -> Self {
        Self::of(SchemaType::Integer)
    }

    pub fn number() -> Self {
        Self::of(SchemaType::Number)
    }

    pub fn boolean() -> Self {
        Self::of(SchemaType::Boolean)
    }

    /// An object with the given properties.
    pub fn object<I, K>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        Self {
            schema_type: Some(SchemaType::Object),
            properties: Some(properties.into_iter().map(|(k, v)| (k.into(), v)).collect()),
            ..Self::default()
        }
    }

    /// An object that accepts anything (no declared properties).
    pub fn free_form() -> Self {
        Self::of(SchemaType::Object)
    }

    pub fn array(items: Schema) -> Self {
        Self {
            schema_type: Some(SchemaType::Array),
            items: Some(Box::new(items)),
            ..Self::default()
        }
    }

    /// A `$ref` node.
    pub fn reference(target: impl Into<String>) -> Self {
        Self {
            reference: Some(target.into()),
            ..Self::default()
        }
    }

    /// A `$ref` to the component `name`, still carrying the name so it hoists like the
    /// record it points at.
    pub fn component(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::reference(format!("{COMPONENT_PREFIX}{name}")).named(name)
    }

    pub fn named(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_format(mut self, format: SchemaFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = Some(true);
        self
    }

    /// Marks a property as required. The property does not have to exist yet.
    pub fn require(mut self, property: impl Into<String>) -> Self {
        let property = property.into();
        let required = self.required.get_or_insert_with(Vec::new);
        if !required.contains(&property) {
            required.push(property);
        }
        self
    }

    pub fn property(&self, name: &str) -> Option<&Schema> {
        self.properties.as_ref().and_then(|p| p.get(name))
    }

    pub fn property_names(&self) -> Vec<&str> {
        self.properties
            .as_ref()
            .map(|p| p.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn is_required(&self, property: &str) -> bool {
        self.required
            .as_ref()
            .is_some_and(|r| r.iter().any(|p| p == property))
    }

    /// Checks the shape invariant: `properties` only on objects, `items` only on arrays.
    ///
    /// Returns the path of the first offending node.
    pub fn check_shape(&self) -> Result<(), (String, String)> {
        self.check_shape_at("$")
    }

    fn check_shape_at(&self, path: &str) -> Result<(), (String, String)> {
        if self.properties.is_some() && self.items.is_some() {
            return Err((path.to_string(), "both properties and items are set".into()));
        }
        if self.properties.is_some() && self.schema_type != Some(SchemaType::Object) {
            return Err((path.to_string(), "properties on a non-object".into()));
        }
        if self.items.is_some() && self.schema_type != Some(SchemaType::Array) {
            return Err((path.to_string(), "items on a non-array".into()));
        }
        if let Some(properties) = &self.properties {
            for (name, child) in properties {
                child.check_shape_at(&format!("{path}.{name}"))?;
            }
        }
        if let Some(items) = &self.items {
            items.check_shape_at(&format!("{path}[]"))?;
        }
        Ok(())
    }
}
