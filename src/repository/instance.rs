//! # Resource Instances
//!
//! A [`ResourceInstance`] pairs a typed model with free-form metadata. On the wire the two
//! are flattened into a single object:
//!
//! - serialising writes the model's fields, then adds every metadata key the model does not
//!   already define;
//! - deserialising hands the model's declared fields to the model and keeps every other key
//!   as metadata.
//!
//! Category records use this to carry their category id (`categoryType`) and the attributes
//! contributed by the category, none of which exist on the base model.

use crate::schema::{generate, Describe, TypeShape};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::ser::{self, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Metadata key holding the category a record belongs to.
pub const CATEGORY_KEY: &str = "categoryType";

/// An element with an identity the repository can key on.
pub trait Identified {
    fn identity(&self) -> Option<&str>;
    fn set_identity(&mut self, id: String);
}

/// A base model that can be stored by a repository and described by a schema.
pub trait ResourceModel:
    Describe + Serialize + DeserializeOwned + Clone + Send + Sync + 'static
{
    fn id(&self) -> Option<&str>;
    fn set_id(&mut self, id: String);
}

/// Opaque 24 hex character identifier, compatible with document-store object ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// A fresh id: four bytes of seconds since the epoch followed by eight random bytes.
    pub fn new() -> Self {
        let seconds = chrono::Utc::now().timestamp() as u32;
        let random = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("{seconds:08x}{}", &random[..16]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

impl Describe for ObjectId {
    fn describe() -> TypeShape {
        TypeShape::Identifier
    }
}

/// A typed model plus free-form metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceInstance<M> {
    pub this: M,
    pub metadata: Map<String, Value>,
}

impl<M> ResourceInstance<M> {
    pub fn new(this: M) -> Self {
        Self {
            this,
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// The category this record was created under, if any.
    pub fn category(&self) -> Option<&str> {
        self.metadata.get(CATEGORY_KEY).and_then(Value::as_str)
    }
}

impl<M: ResourceModel> Identified for ResourceInstance<M> {
    fn identity(&self) -> Option<&str> {
        self.this.id()
    }

    fn set_identity(&mut self, id: String) {
        self.this.set_id(id);
    }
}

impl<M: Describe> Describe for ResourceInstance<M> {
    fn describe() -> TypeShape {
        M::describe()
    }
}

impl<M: Serialize> Serialize for ResourceInstance<M> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut fields = match serde_json::to_value(&self.this).map_err(ser::Error::custom)? {
            Value::Object(fields) => fields,
            other => {
                return Err(ser::Error::custom(format!(
                    "resource model must serialize to an object, got {other}"
                )))
            }
        };
        for (key, value) in &self.metadata {
            if !fields.contains_key(key) {
                fields.insert(key.clone(), value.clone());
            }
        }
        fields.serialize(serializer)
    }
}

impl<'de, M: DeserializeOwned + Describe> Deserialize<'de> for ResourceInstance<M> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = Map::<String, Value>::deserialize(deserializer)?;
        let declared = generate::<M>();
        let this: M =
            serde_json::from_value(Value::Object(fields.clone())).map_err(de::Error::custom)?;
        let metadata = fields
            .into_iter()
            .filter(|(key, _)| declared.property(key).is_none())
            .collect();
        Ok(Self { this, metadata })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RecordShape;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        #[serde(default)]
        id: Option<String>,
        text: String,
    }

    impl Describe for Note {
        fn describe() -> TypeShape {
            RecordShape::new("Note")
                .field::<Option<String>>("id")
                .field::<String>("text")
                .build()
        }
    }

    impl ResourceModel for Note {
        fn id(&self) -> Option<&str> {
            self.id.as_deref()
        }

        fn set_id(&mut self, id: String) {
            self.id = Some(id);
        }
    }

    #[test]
    fn metadata_never_shadows_model_fields() {
        let instance = ResourceInstance::new(Note {
            id: Some("n1".into()),
            text: "hello".into(),
        })
        .with_metadata("text", json!("ignored"))
        .with_metadata(CATEGORY_KEY, json!("cat-1"));

        let value = serde_json::to_value(&instance).unwrap();
        assert_eq!(
            value,
            json!({"id": "n1", "text": "hello", "categoryType": "cat-1"})
        );
    }

    #[test]
    fn unknown_keys_become_metadata() {
        let instance: ResourceInstance<Note> =
            serde_json::from_value(json!({"id": "n1", "text": "hi", "vatNumber": "IT1", "categoryType": "cat-1"}))
                .unwrap();
        assert_eq!(instance.this.text, "hi");
        assert_eq!(instance.category(), Some("cat-1"));
        assert_eq!(instance.metadata.get("vatNumber"), Some(&json!("IT1")));
        assert!(!instance.metadata.contains_key("text"));
        assert_eq!(instance.identity(), Some("n1"));
    }

    #[test]
    fn object_ids_are_24_hex_chars() {
        let id = ObjectId::new();
        assert_eq!(id.as_str().len(), 24);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(ObjectId::new(), id);
    }
}
