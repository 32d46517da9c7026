//! # OpenAPI Assembler
//!
//! [`build`] walks every registered action and describes it as one `POST` operation:
//!
//! ```text
//! <template>/<version>/<resource>/<method>        e.g. /api/{app}/v1/customer/business/create
//! ```
//!
//! Input schemas are hoisted into `components.schemas`. Every schema node that carries a
//! declared type name becomes a named component, and each place it was used is replaced by
//! a `$ref`. Names, not shapes, identify components: two different types with the same
//! shape stay distinct, and one name claimed by two different shapes is an
//! [`OpenApiError::SchemaConflict`].
//!
//! The output is deterministic: every map in the document is ordered.

pub mod document;
pub mod error;

pub use document::{
    Components, EndorResource, Info, MediaType, OpenApiDocument, Operation, Parameter, PathItem,
    RequestBody, ResponseObject, SecurityScheme, Server, OPENAPI_VERSION,
};
pub use error::OpenApiError;

use crate::action::identity::SESSION_COOKIE;
use crate::action::Gravity;
use crate::schema::{Schema, COMPONENT_PREFIX};
use crate::service::EndorService;
use std::collections::BTreeMap;
use tracing::debug;

pub const DEFAULT_RESPONSE: &str = "DefaultEndorResponse";
pub const SESSION_SCHEME: &str = "cookieAuth";
pub const APP_PLACEHOLDER: &str = "{app}";

/// Assembles the document for `services`.
///
/// `path_template` is the prefix every path hangs off and must contain `{app}`.
pub fn build(
    title: &str,
    host: &str,
    services: &[EndorService],
    path_template: &str,
) -> Result<OpenApiDocument, OpenApiError> {
    if !path_template.contains(APP_PLACEHOLDER) {
        return Err(OpenApiError::InvalidPathTemplate(path_template.to_string()));
    }
    let prefix = path_template.trim_end_matches('/');

    let mut registry = ComponentRegistry::default();
    registry.insert(DEFAULT_RESPONSE, default_response_schema())?;

    let mut paths = BTreeMap::new();
    let mut endor_resources = BTreeMap::new();
    for service in services {
        for (method, action) in service.methods() {
            let request_body = action
                .input_schema()
                .map(|schema| registry.hoist(schema))
                .transpose()?
                .map(|schema| RequestBody {
                    required: true,
                    content: MediaType::json(schema),
                });
            let security = if action.is_public() {
                Vec::new()
            } else {
                vec![BTreeMap::from([(SESSION_SCHEME.to_string(), Vec::new())])]
            };
            let operation = Operation {
                operation_id: format!("{} - {method}", service.resource),
                tags: vec![service.resource.clone()],
                summary: action.description().to_string(),
                parameters: vec![app_parameter()],
                request_body,
                responses: BTreeMap::from([(
                    "default".to_string(),
                    ResponseObject {
                        description: "Default response".to_string(),
                        content: MediaType::json(Schema::reference(format!(
                            "{COMPONENT_PREFIX}{DEFAULT_RESPONSE}"
                        ))),
                    },
                )]),
                security,
            };
            let path = format!("{prefix}/{}/{}/{method}", service.version(), service.resource);
            paths.insert(
                path,
                PathItem {
                    post: Some(operation),
                },
            );
        }
        endor_resources.insert(
            service.resource.clone(),
            EndorResource {
                description: service.description.clone(),
            },
        );
    }

    debug!(
        paths = paths.len(),
        components = registry.schemas.len(),
        "OpenAPI document assembled"
    );

    Ok(OpenApiDocument {
        openapi: OPENAPI_VERSION.to_string(),
        info: Info {
            title: title.to_string(),
            description: format!("{title} docs"),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        servers: vec![Server {
            url: host.to_string(),
        }],
        endor_resources,
        paths,
        components: Components {
            schemas: registry.schemas,
            security_schemes: BTreeMap::from([(
                SESSION_SCHEME.to_string(),
                SecurityScheme {
                    scheme_type: "apiKey".to_string(),
                    location: "cookie".to_string(),
                    name: SESSION_COOKIE.to_string(),
                },
            )]),
        },
    })
}

/// Named component schemas collected while walking the actions.
#[derive(Debug, Default)]
struct ComponentRegistry {
    schemas: BTreeMap<String, Schema>,
}

impl ComponentRegistry {
    /// Returns `schema` with every named node, itself included, replaced by a `$ref`.
    ///
    /// A named node that already is a `$ref` points back at a record being hoisted further
    /// up; that record registers the definition.
    fn hoist(&mut self, schema: &Schema) -> Result<Schema, OpenApiError> {
        if let (Some(_), Some(name)) = (&schema.reference, &schema.type_name) {
            return Ok(Schema::reference(format!("{COMPONENT_PREFIX}{name}")));
        }
        let mut inlined = schema.clone();
        if let Some(properties) = inlined.properties.as_mut() {
            for property in properties.values_mut() {
                *property = self.hoist(property)?;
            }
        }
        if let Some(items) = inlined.items.as_mut() {
            **items = self.hoist(items)?;
        }

        match inlined.type_name.take() {
            Some(name) => {
                self.insert(&name, inlined)?;
                Ok(Schema::reference(format!("{COMPONENT_PREFIX}{name}")))
            }
            None => Ok(inlined),
        }
    }

    fn insert(&mut self, name: &str, definition: Schema) -> Result<(), OpenApiError> {
        match self.schemas.get(name) {
            Some(existing) if *existing != definition => Err(OpenApiError::SchemaConflict {
                name: name.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.schemas.insert(name.to_string(), definition);
                Ok(())
            }
        }
    }
}

fn app_parameter() -> Parameter {
    Parameter {
        name: "app".to_string(),
        location: "path".to_string(),
        required: true,
        schema: Schema::string(),
    }
}

fn default_response_schema() -> Schema {
    let gravities = [Gravity::Info, Gravity::Warning, Gravity::Error, Gravity::Fatal]
        .into_iter()
        .filter_map(|gravity| serde_json::to_value(gravity).ok())
        .collect();
    let gravity = Schema {
        enum_values: Some(gravities),
        ..Schema::string()
    };
    let message = Schema::object([("gravity", gravity), ("value", Schema::string())]);
    Schema::object([
        ("messages", Schema::array(message)),
        ("data", Schema::free_form()),
        ("schema", Schema::free_form()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Context, EndorServiceAction, NoPayload, ReadInstanceDto, Response};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn read_instance(description: &str) -> EndorServiceAction {
        EndorServiceAction::new(description.to_string(), |_: Context<ReadInstanceDto>| async {
            Ok(Response::<()>::default())
        })
    }

    fn ping() -> EndorServiceAction {
        EndorServiceAction::new("Ping", |_: Context<NoPayload>| async {
            Ok(Response::<()>::default())
        })
        .public()
    }

    fn customer_service() -> EndorService {
        EndorService::new("customer", "Customers")
            .with_action("instance", read_instance("Get one"))
            .and_then(|s| s.with_action("delete", read_instance("Delete one")))
            .and_then(|s| s.with_action("ping", ping()))
            .unwrap()
    }

    #[test]
    fn shared_payload_types_become_one_component() {
        let doc = build("shop", "/", &[customer_service()], "/api/{app}").unwrap();

        let reference = json!({"$ref": "#/components/schemas/ReadInstanceDTO"});
        let usages = doc
            .operations()
            .filter_map(|(_, op)| op.request_body.as_ref())
            .filter(|body| serde_json::to_value(&body.content["application/json"].schema).unwrap() == reference)
            .count();
        assert_eq!(usages, 2);
        assert_eq!(
            doc.components.schemas.keys().collect::<Vec<_>>(),
            vec!["DefaultEndorResponse", "ReadInstanceDTO"]
        );
    }

    #[test]
    fn operations_follow_the_path_layout() {
        let doc = build("shop", "http://localhost:8080", &[customer_service()], "/api/{app}/").unwrap();

        let op = doc.operation("/api/{app}/v1/customer/instance").unwrap();
        assert_eq!(op.operation_id, "customer - instance");
        assert_eq!(op.tags, vec!["customer"]);
        assert_eq!(op.summary, "Get one");
        assert_eq!(op.parameters[0].name, "app");
        assert_eq!(op.security.len(), 1);

        let ping = doc.operation("/api/{app}/v1/customer/ping").unwrap();
        assert!(ping.request_body.is_none());
        assert!(ping.security.is_empty());

        assert_eq!(doc.openapi, "3.1.0");
        assert_eq!(doc.info.description, "shop docs");
        assert_eq!(doc.servers[0].url, "http://localhost:8080");
        assert_eq!(doc.endor_resources["customer"].description, "Customers");
        assert_eq!(doc.components.security_schemes["cookieAuth"].name, "sessionId");
    }

    #[test]
    fn one_name_with_two_shapes_is_a_conflict() {
        let thin = EndorServiceAction::new("Thin", |_: Context<NoPayload>| async {
            Ok(Response::<()>::default())
        })
        .with_input_schema(Schema::object([("a", Schema::string())]).named("Thing"));
        let wide = EndorServiceAction::new("Wide", |_: Context<NoPayload>| async {
            Ok(Response::<()>::default())
        })
        .with_input_schema(Schema::object([("b", Schema::integer())]).named("Thing"));
        let service = EndorService::new("things", "Things")
            .with_action("thin", thin)
            .and_then(|s| s.with_action("wide", wide))
            .unwrap();

        let err = build("shop", "/", &[service], "/api/{app}").unwrap_err();
        assert_eq!(err, OpenApiError::SchemaConflict { name: "Thing".into() });
    }

    #[test]
    fn template_must_carry_the_app_placeholder() {
        let err = build("shop", "/", &[], "/api/static").unwrap_err();
        assert!(matches!(err, OpenApiError::InvalidPathTemplate(_)));
    }

    #[test]
    fn nested_named_schemas_are_referenced() {
        let inner = Schema::object([("street", Schema::string())]).named("Address");
        let outer = Schema::object([
            ("home", inner.clone()),
            ("others", Schema::array(inner)),
        ])
        .named("Person");
        let action = EndorServiceAction::new("Save", |_: Context<NoPayload>| async {
            Ok(Response::<()>::default())
        })
        .with_input_schema(outer);
        let service = EndorService::new("people", "People")
            .with_action("save", action)
            .unwrap();

        let doc = build("shop", "/", &[service], "/{app}").unwrap();
        let person = serde_json::to_value(&doc.components.schemas["Person"]).unwrap();
        assert_eq!(person["properties"]["home"], json!({"$ref": "#/components/schemas/Address"}));
        assert_eq!(
            person["properties"]["others"]["items"],
            json!({"$ref": "#/components/schemas/Address"})
        );
        assert!(doc.components.schemas.contains_key("Address"));
    }
}
