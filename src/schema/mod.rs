//! # Schema Engine
//!
//! Every payload, resource model and event in Endor is described by a [`Schema`] tree: a
//! recursive, JSON-Schema-like node that is either a primitive, an object with named
//! `properties`, or an array with a single `items` schema.
//!
//! Schemas come from two places:
//!
//! 1. **Reflection** ([`Describe`] + [`generate`]): each Rust type publishes a static
//!    [`TypeShape`] descriptor and the [`SchemaGenerator`] visitor turns it into a tree.
//!    Generation never fails. Types with no meaningful shape degrade to an object
//!    without properties.
//! 2. **Fragments** ([`parse_fragment`]): YAML documents written by operators, typically the
//!    dynamic attributes of a category. They are folded onto a reflected schema with [`merge`].
//!
//! Once built, schemas are plain immutable values. They are shared read-only across
//! requests and validated against with [`validate`].
//!
//! ```rust
//! use endor_sdk::schema::{generate, Describe, RecordShape, SchemaType, TypeShape};
//!
//! struct Customer { name: String, age: u32 }
//!
//! impl Describe for Customer {
//!     fn describe() -> TypeShape {
//!         RecordShape::new("Customer")
//!             .tagged::<String>("name", "title=Name,required=true")
//!             .field::<u32>("age")
//!             .build()
//!     }
//! }
//!
//! let schema = generate::<Customer>();
//! let properties = schema.properties.as_ref().unwrap();
//! assert_eq!(properties["age"].schema_type, Some(SchemaType::Integer));
//! assert_eq!(schema.required, Some(vec!["name".to_string()]));
//! ```

pub mod error;
pub mod fragment;
pub mod model;
pub mod reflect;
pub mod validate;

pub use error::SchemaParseError;
pub use fragment::{merge, parse_fragment};
pub use model::{Schema, SchemaFormat, SchemaType, UiSchema, COMPONENT_PREFIX};
pub use reflect::{generate, generate_for, Describe, FieldMeta, RecordShape, SchemaGenerator, TypeShape};
pub use validate::{validate, Violation};
