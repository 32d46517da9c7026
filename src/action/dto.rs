//! Payload types shared by the default actions.

use crate::schema::{Describe, RecordShape, TypeShape};
use serde::de::{Deserializer, IgnoredAny};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Payload of actions that take no input. Accepts and ignores any body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NoPayload;

impl<'de> Deserialize<'de> for NoPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        IgnoredAny::deserialize(deserializer)?;
        Ok(NoPayload)
    }
}

impl Describe for NoPayload {
    fn describe() -> TypeShape {
        TypeShape::Opaque
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadDto {
    #[serde(default)]
    pub filter: Map<String, Value>,
    #[serde(default)]
    pub projection: Map<String, Value>,
}

impl Describe for ReadDto {
    fn describe() -> TypeShape {
        RecordShape::new("ReadDTO")
            .field::<Map<String, Value>>("filter")
            .field::<Map<String, Value>>("projection")
            .build()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadInstanceDto {
    pub id: String,
}

impl Describe for ReadInstanceDto {
    fn describe() -> TypeShape {
        RecordShape::new("ReadInstanceDTO")
            .tagged::<String>("id", "required=true")
            .build()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateDto<T> {
    pub data: T,
}

impl<T: Describe> Describe for CreateDto<T> {
    fn describe() -> TypeShape {
        RecordShape::new(wrapper_name("CreateDTO", &T::describe()))
            .tagged::<T>("data", "required=true")
            .build()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateByIdDto<T> {
    pub id: String,
    pub data: T,
}

impl<T: Describe> Describe for UpdateByIdDto<T> {
    fn describe() -> TypeShape {
        RecordShape::new(wrapper_name("UpdateByIdDTO", &T::describe()))
            .tagged::<String>("id", "required=true")
            .tagged::<T>("data", "required=true")
            .build()
    }
}

fn wrapper_name(prefix: &str, inner: &TypeShape) -> String {
    match inner {
        TypeShape::Record(record) => format!("{prefix}_{}", record.name()),
        _ => prefix.to_string(),
    }
}
