//! # Type Descriptors
//!
//! Rust has no runtime reflection, so every type that takes part in schema generation
//! publishes a static descriptor through [`Describe`]. Primitives, collections and common
//! library types are covered here; records describe themselves with [`RecordShape`].
//!
//! Record fields hold a `fn() -> TypeShape` rather than a built shape. A record that
//! refers to itself (directly or through a `Vec`) therefore has a finite descriptor, and
//! the [`SchemaGenerator`] decides how deep to go.

use super::model::{Schema, SchemaFormat, SchemaType, UiSchema};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// Publishes the static shape of a type.
pub trait Describe {
    fn describe() -> TypeShape;
}

/// The static shape of a type.
#[derive(Debug, Clone)]
pub enum TypeShape {
    String,
    Integer,
    Number,
    Boolean,
    /// An externally defined identifier (database object id). Rendered as a string.
    Identifier,
    DateTime,
    Optional(Box<TypeShape>),
    Sequence(Box<TypeShape>),
    /// Free-form key/value data.
    Map,
    Record(RecordShape),
    /// Anything without a meaningful shape.
    Opaque,
}

/// Describes a named record, field by field, in declaration order.
#[derive(Debug, Clone)]
pub struct RecordShape {
    name: String,
    fields: Vec<FieldShape>,
}

#[derive(Debug, Clone)]
struct FieldShape {
    name: String,
    shape: fn() -> TypeShape,
    meta: FieldMeta,
}

impl RecordShape {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a field under its serialization name.
    pub fn field<T: Describe>(self, name: impl Into<String>) -> Self {
        self.field_meta::<T>(name, FieldMeta::default())
    }

    /// Adds a field with a metadata tag, e.g. `"title=Id,readOnly=true"`.
    pub fn tagged<T: Describe>(self, name: impl Into<String>, tag: &str) -> Self {
        self.field_meta::<T>(name, FieldMeta::parse(tag))
    }

    pub fn field_meta<T: Describe>(mut self, name: impl Into<String>, meta: FieldMeta) -> Self {
        self.fields.push(FieldShape {
            name: name.into(),
            shape: T::describe,
            meta,
        });
        self
    }

    pub fn build(self) -> TypeShape {
        TypeShape::Record(self)
    }
}

/// Per-field metadata, usually written as a comma separated tag.
///
/// Recognised keys: `title`, `description`, `format`, `readOnly`, `writeOnly`, `required`,
/// `minLength`, `maxLength`, `enum` (values separated by `|`), and the UI hints `resource`
/// and `hidden`. Unknown keys and unparsable values are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    pub format: Option<SchemaFormat>,
    pub read_only: bool,
    pub write_only: bool,
    pub required: bool,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub enum_values: Option<Vec<String>>,
    pub ui_resource: Option<String>,
    pub hidden: bool,
}

impl FieldMeta {
    pub fn parse(tag: &str) -> Self {
        let mut meta = Self::default();
        for pair in tag.split(',') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "title" => meta.title = Some(value.to_string()),
                "description" => meta.description = Some(value.to_string()),
                "format" => meta.format = SchemaFormat::parse(value),
                "readOnly" => meta.read_only = value == "true",
                "writeOnly" => meta.write_only = value == "true",
                "required" => meta.required = value == "true",
                "minLength" => meta.min_length = value.parse().ok(),
                "maxLength" => meta.max_length = value.parse().ok(),
                "enum" => {
                    meta.enum_values = Some(value.split('|').map(str::to_string).collect())
                }
                "resource" => meta.ui_resource = Some(value.to_string()),
                "hidden" => meta.hidden = value == "true",
                _ => {}
            }
        }
        meta
    }

    /// Whether the metadata changes the field's own schema. `required` only affects the
    /// enclosing record.
    fn decorates(&self) -> bool {
        let own = Self {
            required: false,
            ..self.clone()
        };
        own != Self::default()
    }

    fn apply(&self, schema: &mut Schema) {
        if !self.decorates() {
            return;
        }
        // A decorated record is no longer the plain named type.
        schema.type_name = None;
        if let Some(title) = &self.title {
            schema.title = Some(title.clone());
        }
        if let Some(description) = &self.description {
            schema.description = Some(description.clone());
        }
        if self.format.is_some() {
            schema.format = self.format;
        }
        if self.read_only {
            schema.read_only = Some(true);
        }
        if self.write_only {
            schema.write_only = Some(true);
        }
        if self.min_length.is_some() {
            schema.min_length = self.min_length;
        }
        if self.max_length.is_some() {
            schema.max_length = self.max_length;
        }
        if let Some(values) = &self.enum_values {
            schema.enum_values = Some(values.iter().cloned().map(Value::String).collect());
        }
        if self.ui_resource.is_some() || self.hidden {
            let ui = schema.ui.get_or_insert_with(UiSchema::default);
            if let Some(resource) = &self.ui_resource {
                ui.resource = Some(resource.clone());
            }
            if self.hidden {
                ui.hidden = Some(true);
            }
        }
    }
}

/// Visitor that turns a [`TypeShape`] into a [`Schema`].
///
/// Tracks the records currently being expanded. A record met again inside itself becomes a
/// named `$ref` to its component instead of expanding forever.
#[derive(Debug, Default)]
pub struct SchemaGenerator {
    in_progress: Vec<String>,
}

impl SchemaGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(&mut self, shape: &TypeShape) -> Schema {
        match shape {
            TypeShape::String | TypeShape::Identifier => Schema::string(),
            TypeShape::Integer => Schema::integer(),
            TypeShape::Number => Schema::number(),
            TypeShape::Boolean => Schema::boolean(),
            TypeShape::DateTime => Schema::string().with_format(SchemaFormat::DateTime),
            TypeShape::Optional(inner) => self.generate(inner),
            TypeShape::Sequence(element) => Schema::array(self.generate(element)),
            TypeShape::Map | TypeShape::Opaque => Schema::free_form(),
            TypeShape::Record(record) => self.generate_record(record),
        }
    }

    fn generate_record(&mut self, record: &RecordShape) -> Schema {
        if self.in_progress.iter().any(|name| name == &record.name) {
            return Schema::component(record.name.clone());
        }
        self.in_progress.push(record.name.clone());

        let mut properties = BTreeMap::new();
        let mut required = Vec::new();
        let mut order = Vec::with_capacity(record.fields.len());
        for field in &record.fields {
            let shape = (field.shape)();
            let mut schema = self.generate(&shape);
            field.meta.apply(&mut schema);
            if field.meta.required {
                required.push(field.name.clone());
            }
            order.push(field.name.clone());
            properties.insert(field.name.clone(), schema);
        }

        self.in_progress.pop();

        Schema {
            schema_type: Some(SchemaType::Object),
            properties: Some(properties),
            required: (!required.is_empty()).then_some(required),
            ui: Some(UiSchema {
                order: Some(order),
                ..UiSchema::default()
            }),
            type_name: Some(record.name.clone()),
            ..Schema::default()
        }
    }
}

/// Generates the schema of `T`.
pub fn generate<T: Describe>() -> Schema {
    SchemaGenerator::new().generate(&T::describe())
}

/// Generates the schema of a value's type. The value itself is not inspected.
pub fn generate_for<T: Describe>(_value: &T) -> Schema {
    generate::<T>()
}

macro_rules! describe_as {
    ($shape:ident: $($t:ty),* $(,)?) => {
        $(
            impl Describe for $t {
                fn describe() -> TypeShape {
                    TypeShape::$shape
                }
            }
        )*
    };
}

describe_as!(String: String, str, char);
describe_as!(Boolean: bool);
describe_as!(Integer: i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
describe_as!(Number: f32, f64);
describe_as!(Map: Value, serde_json::Map<String, Value>);
describe_as!(Opaque: ());

impl<T: Describe + ?Sized> Describe for &T {
    fn describe() -> TypeShape {
        T::describe()
    }
}

impl<T: Describe> Describe for Option<T> {
    fn describe() -> TypeShape {
        TypeShape::Optional(Box::new(T::describe()))
    }
}

impl<T: Describe + ?Sized> Describe for Box<T> {
    fn describe() -> TypeShape {
        T::describe()
    }
}

impl<T: Describe + ?Sized> Describe for Arc<T> {
    fn describe() -> TypeShape {
        T::describe()
    }
}

impl<T: Describe> Describe for [T] {
    fn describe() -> TypeShape {
        TypeShape::Sequence(Box::new(T::describe()))
    }
}

impl<T: Describe, const N: usize> Describe for [T; N] {
    fn describe() -> TypeShape {
        TypeShape::Sequence(Box::new(T::describe()))
    }
}

macro_rules! describe_sequence {
    ($($collection:ident),*) => {
        $(
            impl<T: Describe> Describe for $collection<T> {
                fn describe() -> TypeShape {
                    TypeShape::Sequence(Box::new(T::describe()))
                }
            }
        )*
    };
}

describe_sequence!(Vec, VecDeque, HashSet, BTreeSet);

impl<K, V> Describe for HashMap<K, V> {
    fn describe() -> TypeShape {
        TypeShape::Map
    }
}

impl<K, V> Describe for BTreeMap<K, V> {
    fn describe() -> TypeShape {
        TypeShape::Map
    }
}

impl<Tz: chrono::TimeZone> Describe for chrono::DateTime<Tz> {
    fn describe() -> TypeShape {
        TypeShape::DateTime
    }
}

impl Describe for chrono::NaiveDate {
    fn describe() -> TypeShape {
        TypeShape::String
    }
}
