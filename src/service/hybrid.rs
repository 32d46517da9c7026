//! # Hybrid Services
//!
//! A hybrid resource has one base model shared by all its records and any number of
//! categories. Each category adds its own attributes on top of the base model:
//!
//! - **static** attributes, described by a schema known at compile time;
//! - **dynamic** attributes, described by a YAML fragment supplied at startup.
//!
//! Composition produces a single [`EndorService`]:
//!
//! ```text
//! customer
//! ├── schema, instance, list, create, update, delete           (base model)
//! ├── cat-1/schema, cat-1/instance, ... , cat-1/delete          (base ∪ static ∪ dynamic)
//! ├── cat-2/schema, ...
//! └── custom actions from the action builder
//! ```
//!
//! Category schemas are folded in a fixed order (base, then static, then dynamic) so the
//! same input always composes to the same schemas. A custom action may not reuse a default
//! key. Replacing a default handler goes through [`EndorHybridService::with_handler`] instead.
//!
//! Custom actions and handler overrides are built at composition time and receive the
//! resource's repository.

use super::defaults::{default_actions, Scope};
use super::error::RegistrationError;
use super::EndorService;
use crate::action::EndorServiceAction;
use crate::repository::{ResourceInstance, ResourceModel, ResourceRepository};
use crate::schema::{generate, merge, parse_fragment, Describe, Schema};
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{info, warn};

/// One category of a hybrid resource.
#[derive(Debug, Clone, Default)]
pub struct SpecializedCategoryInfo {
    pub id: String,
    pub description: String,
    pub static_model_schema: Schema,
    /// YAML schema fragment with the dynamic attributes.
    pub additional_attributes: String,
}

impl SpecializedCategoryInfo {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    /// Uses the schema of `S` as the static attributes.
    pub fn with_static_model<S: Describe>(self) -> Self {
        self.with_static_schema(generate::<S>())
    }

    pub fn with_static_schema(mut self, schema: Schema) -> Self {
        self.static_model_schema = schema;
        self
    }

    pub fn with_additional_attributes(mut self, yaml: impl Into<String>) -> Self {
        self.additional_attributes = yaml.into();
        self
    }
}

/// The composite data schemas of a hybrid resource.
#[derive(Debug, Clone, PartialEq)]
pub struct HybridSchemas {
    pub root: Schema,
    pub categories: BTreeMap<String, Schema>,
}

impl HybridSchemas {
    pub fn category(&self, id: &str) -> Option<&Schema> {
        self.categories.get(id)
    }
}

/// The store behind a hybrid resource, shared by every scope.
pub type HybridRepository<T> = Arc<dyn ResourceRepository<ResourceInstance<T>>>;

type ActionBuilder<T> =
    Box<dyn Fn(&HybridSchemas, HybridRepository<T>) -> BTreeMap<String, EndorServiceAction> + Send + Sync>;
type HandlerOverride<T> = Box<dyn Fn(&Schema, HybridRepository<T>) -> EndorServiceAction + Send + Sync>;

/// Declaration of a hybrid resource over base model `T`.
pub struct EndorHybridService<T> {
    resource: String,
    description: String,
    priority: Option<i32>,
    version: Option<String>,
    persistence: Option<String>,
    categories: Vec<SpecializedCategoryInfo>,
    action_builder: Option<ActionBuilder<T>>,
    overrides: BTreeMap<String, HandlerOverride<T>>,
    _model: PhantomData<fn() -> T>,
}

impl<T: ResourceModel> EndorHybridService<T> {
    pub fn new(resource: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            description: description.into(),
            priority: None,
            version: None,
            persistence: None,
            categories: Vec::new(),
            action_builder: None,
            overrides: BTreeMap::new(),
            _model: PhantomData,
        }
    }

    pub fn with_category(mut self, category: SpecializedCategoryInfo) -> Self {
        self.categories.push(category);
        self
    }

    pub fn with_categories(mut self, categories: impl IntoIterator<Item = SpecializedCategoryInfo>) -> Self {
        self.categories.extend(categories);
        self
    }

    /// Registers custom actions. The builder receives the composite schemas, so custom
    /// actions can describe their payloads in terms of them, and the resource's repository.
    pub fn with_actions<F>(mut self, builder: F) -> Self
    where
        F: Fn(&HybridSchemas, HybridRepository<T>) -> BTreeMap<String, EndorServiceAction>
            + Send
            + Sync
            + 'static,
    {
        self.action_builder = Some(Box::new(builder));
        self
    }

    /// Replaces the default handler registered under `method` (`list`, `cat-1/create`, ...).
    ///
    /// `build` receives the composite schema of that scope and the repository. Naming a
    /// method that has no default handler fails composition.
    pub fn with_handler<F>(mut self, method: impl Into<String>, build: F) -> Self
    where
        F: Fn(&Schema, HybridRepository<T>) -> EndorServiceAction + Send + Sync + 'static,
    {
        self.overrides.insert(method.into(), Box::new(build));
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Persistence kind for this resource's repository. Falls back to the configured default.
    pub fn with_persistence(mut self, kind: impl Into<String>) -> Self {
        self.persistence = Some(kind.into());
        self
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn persistence(&self) -> Option<&str> {
        self.persistence.as_deref()
    }

    pub fn categories(&self) -> &[SpecializedCategoryInfo] {
        &self.categories
    }

    /// Builds the root and per-category composite schemas.
    pub fn schemas(&self) -> Result<HybridSchemas, RegistrationError> {
        let root = generate::<T>();
        let root_name = root
            .type_name
            .clone()
            .unwrap_or_else(|| self.resource.clone());

        let mut categories = BTreeMap::new();
        for category in &self.categories {
            if categories.contains_key(&category.id) {
                return Err(RegistrationError::DuplicateCategory {
                    resource: self.resource.clone(),
                    category: category.id.clone(),
                });
            }
            let dynamic = parse_fragment(&category.additional_attributes).map_err(|source| {
                RegistrationError::SchemaParse {
                    resource: self.resource.clone(),
                    category: category.id.clone(),
                    source,
                }
            })?;

            let with_static = merge(&root, &category.static_model_schema);
            for name in dynamic.property_names() {
                if with_static.property(name).is_some() {
                    warn!(
                        resource = %self.resource,
                        category = %category.id,
                        property = name,
                        "Dynamic attribute overrides a declared property"
                    );
                }
            }
            let composite = merge(&with_static, &dynamic).named(format!("{root_name}_{}", category.id));
            categories.insert(category.id.clone(), composite);
        }

        Ok(HybridSchemas { root, categories })
    }

    /// Composes the service over `repository`.
    pub fn compose(&self, repository: HybridRepository<T>) -> Result<EndorService, RegistrationError> {
        let schemas = self.schemas()?;

        let mut service = EndorService::new(&self.resource, &self.description);
        service.priority = self.priority;
        service.version = self.version.clone();

        let mut scopes = vec![(None, schemas.root.clone())];
        for category in &self.categories {
            let schema = schemas
                .category(&category.id)
                .cloned()
                .unwrap_or_else(|| schemas.root.clone());
            scopes.push((Some(category.id.clone()), schema));
        }

        for (category, schema) in scopes {
            let scope = Scope {
                resource: self.resource.clone(),
                description: self.description.clone(),
                category,
                schema: schema.clone(),
                repository: repository.clone(),
            };
            for (method, action) in default_actions(scope) {
                let action = match self.overrides.get(&method) {
                    Some(build) => build(&schema, repository.clone()),
                    None => action,
                };
                service.add_action(method, action)?;
            }
        }
        if let Some(method) = self
            .overrides
            .keys()
            .find(|method| !service.methods().contains_key(*method))
        {
            return Err(RegistrationError::UnknownOverride {
                resource: self.resource.clone(),
                method: method.clone(),
            });
        }

        if let Some(builder) = &self.action_builder {
            for (method, action) in builder(&schemas, repository.clone()) {
                service.add_action(method, action)?;
            }
        }

        info!(
            resource = %self.resource,
            categories = self.categories.len(),
            overrides = self.overrides.len(),
            actions = service.methods().len(),
            "Composed"
        );
        Ok(service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Context, NoPayload, Response, ResponseBuilder};
    use crate::repository::{RepositoryActor, RepositoryOptions, RepositoryTimeouts};
    use crate::schema::{RecordShape, SchemaType, TypeShape};
    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Customer {
        #[serde(default)]
        id: Option<String>,
        name: String,
    }

    impl Describe for Customer {
        fn describe() -> TypeShape {
            RecordShape::new("Customer")
                .tagged::<Option<String>>("id", "readOnly=true")
                .field::<String>("name")
                .build()
        }
    }

    impl ResourceModel for Customer {
        fn id(&self) -> Option<&str> {
            self.id.as_deref()
        }

        fn set_id(&mut self, id: String) {
            self.id = Some(id);
        }
    }

    fn repository() -> HybridRepository<Customer> {
        // Never started: composition does not touch the store.
        let (_actor, client) = RepositoryActor::<ResourceInstance<Customer>>::new(
            "customer",
            1,
            RepositoryOptions::default(),
            RepositoryTimeouts::default(),
        );
        Arc::new(client)
    }

    fn business() -> SpecializedCategoryInfo {
        SpecializedCategoryInfo::new("business", "Business customers")
            .with_static_schema(Schema::object([("vatNumber", Schema::string())]))
            .with_additional_attributes("priority: integer\n")
    }

    #[test]
    fn composes_six_actions_per_scope_plus_custom() {
        let service = EndorHybridService::<Customer>::new("customer", "Customers")
            .with_category(business())
            .with_category(SpecializedCategoryInfo::new("private", "Private customers"))
            .with_actions(|_, _| {
                BTreeMap::from([(
                    "business/audit".to_string(),
                    EndorServiceAction::new("Audit", |_: Context<NoPayload>| async {
                        Ok(Response::<()>::default())
                    }),
                )])
            })
            .compose(repository())
            .unwrap();

        assert_eq!(service.methods().len(), 6 + 6 * 2 + 1);
        assert!(service.action("business/create").is_some());
        assert!(service.action("private/delete").is_some());
        assert_eq!(
            service.action("business/list").unwrap().description(),
            "Search for available list of customer (Customers) for category business"
        );
    }

    #[test]
    fn category_data_schema_unions_every_source() {
        let service = EndorHybridService::<Customer>::new("customer", "Customers")
            .with_category(business())
            .compose(repository())
            .unwrap();

        let input = service.action("business/create").unwrap().input_schema().unwrap();
        assert_eq!(input.type_name.as_deref(), Some("CreateDTO_customer_business"));
        let data = input.property("data").unwrap();
        assert_eq!(data.property_names(), vec!["id", "name", "priority", "vatNumber"]);
        assert_eq!(data.type_name.as_deref(), Some("Customer_business"));
        assert_eq!(
            data.property("priority").unwrap().schema_type,
            Some(SchemaType::Integer)
        );

        let update = service.action("business/update").unwrap().input_schema().unwrap();
        assert_eq!(update.property_names(), vec!["data", "id"]);
    }

    #[test]
    fn custom_actions_cannot_shadow_defaults() {
        let err = EndorHybridService::<Customer>::new("customer", "Customers")
            .with_category(business())
            .with_actions(|_, _| {
                BTreeMap::from([(
                    "business/create".to_string(),
                    EndorServiceAction::new("Shadow", |_: Context<NoPayload>| async {
                        Ok(Response::<()>::default())
                    }),
                )])
            })
            .compose(repository())
            .unwrap_err();
        assert!(matches!(err, RegistrationError::ActionCollision { .. }));
    }

    #[test]
    fn handlers_replace_defaults_in_their_scope() {
        let service = EndorHybridService::<Customer>::new("customer", "Customers")
            .with_category(business())
            .with_handler("business/list", |schema, _| {
                let fields = schema.property_names().len();
                EndorServiceAction::new("Short list", move |_: Context<NoPayload>| async move {
                    Ok(ResponseBuilder::new().add_data(fields).build())
                })
            })
            .compose(repository())
            .unwrap();

        assert_eq!(service.methods().len(), 6 + 6);
        assert_eq!(service.action("business/list").unwrap().description(), "Short list");
        assert_eq!(
            service.action("list").unwrap().description(),
            "Search for available list of customer (Customers)"
        );

        let err = EndorHybridService::<Customer>::new("customer", "Customers")
            .with_handler("archive", |_, _| {
                EndorServiceAction::new("Archive", |_: Context<NoPayload>| async {
                    Ok(Response::<()>::default())
                })
            })
            .compose(repository())
            .unwrap_err();
        assert!(matches!(err, RegistrationError::UnknownOverride { method, .. } if method == "archive"));
    }

    #[test]
    fn bad_fragments_and_duplicate_categories_fail_registration() {
        let bad = EndorHybridService::<Customer>::new("customer", "Customers")
            .with_category(business().with_additional_attributes("priority: decimal\n"))
            .schemas();
        assert!(matches!(bad, Err(RegistrationError::SchemaParse { .. })));

        let twice = EndorHybridService::<Customer>::new("customer", "Customers")
            .with_category(business())
            .with_category(business())
            .schemas();
        assert!(matches!(twice, Err(RegistrationError::DuplicateCategory { .. })));
    }

    #[test]
    fn composition_is_deterministic() {
        let build = || {
            EndorHybridService::<Customer>::new("customer", "Customers")
                .with_category(business())
                .schemas()
                .unwrap()
        };
        assert_eq!(build(), build());
    }
}
