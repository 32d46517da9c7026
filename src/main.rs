//! # Endor SDK Demo
//!
//! Starts a `shop` microservice with one hybrid resource, `customer`, split into `business`
//! and `private` categories, sends it a few requests and prints its OpenAPI document.
//!
//! ```bash
//! RUST_LOG=info cargo run
//! ```

use chrono::{DateTime, Utc};
use endor_sdk::action::{ActionRequest, Context, EndorServiceAction, Gravity, ReadInstanceDto, ResponseBuilder};
use endor_sdk::event::{subscriber_fn, DefaultEventBus, EventBus, EventDefinition};
use endor_sdk::lifecycle::{setup_tracing, EndorConfig, ServiceRegistry};
use endor_sdk::repository::{ReadOptions, ResourceModel};
use endor_sdk::schema::{Describe, RecordShape, TypeShape};
use endor_sdk::service::{EndorHybridService, HybridRepository, SpecializedCategoryInfo};
use endor_sdk::EndorError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Customer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
}

impl Describe for Customer {
    fn describe() -> TypeShape {
        RecordShape::new("Customer")
            .tagged::<Option<String>>("id", "title=Id,readOnly=true")
            .tagged::<String>("name", "title=Name,required=true,minLength=1")
            .tagged::<Option<DateTime<Utc>>>("createdAt", "title=Created at")
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

struct VatInfo;

impl Describe for VatInfo {
    fn describe() -> TypeShape {
        RecordShape::new("VatInfo")
            .tagged::<String>("vatNumber", "title=VAT number,required=true")
            .build()
    }
}

#[derive(Debug, Serialize)]
struct CustomerWelcomed {
    id: String,
    name: String,
}

impl Describe for CustomerWelcomed {
    fn describe() -> TypeShape {
        RecordShape::new("CustomerWelcomed")
            .field::<String>("id")
            .field::<String>("name")
            .build()
    }
}

fn customers() -> EndorHybridService<Customer> {
    EndorHybridService::new("customer", "Customers of the shop")
        .with_category(
            SpecializedCategoryInfo::new("business", "Companies")
                .with_static_model::<VatInfo>()
                .with_additional_attributes("additionalNote: string\n"),
        )
        .with_category(SpecializedCategoryInfo::new("private", "Private persons"))
        .with_actions(|_, repository: HybridRepository<Customer>| {
            let welcome = EndorServiceAction::new(
                "Send the welcome message to a business customer",
                move |ctx: Context<ReadInstanceDto>| {
                    let repository = repository.clone();
                    async move {
                        let id = ctx.payload.id.clone();
                        let customer = repository.instance(&id, &ReadOptions::default()).await?;
                        if customer.category() != Some("business") {
                            return Err(EndorError::not_found(format!("business customer {id} not found")));
                        }
                        let name = customer.this.name.clone();
                        ctx.emit_event(
                            "customer.welcomed",
                            CustomerWelcomed {
                                id: id.clone(),
                                name: name.clone(),
                            },
                        )?;
                        Ok(ResponseBuilder::<()>::new()
                            .add_message(Gravity::Info, format!("welcome sent to {name}"))
                            .build())
                    }
                },
            )
            .with_events(vec![EventDefinition::new::<CustomerWelcomed>(
                "customer.welcomed",
                "A business customer was welcomed",
            )]);
            BTreeMap::from([("business/welcome".to_string(), welcome)])
        })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_tracing();

    let config = EndorConfig::from_env()?;
    let bus = Arc::new(DefaultEventBus::new());
    bus.subscribe(
        "customer.welcomed",
        subscriber_fn(|event| async move {
            info!(event = %event.name, payload = %event.payload, "Welcome delivered");
            Ok(())
        }),
    );

    let app = ServiceRegistry::new(config)
        .register_hybrid(customers())
        .with_event_bus(bus.clone())
        .start()
        .await?;
    let microservice = app.config().microservice_id.clone();

    let created = app
        .dispatch(
            "customer",
            "business/create",
            ActionRequest::new(
                microservice.as_str(),
                json!({"data": {"name": "ACME", "vatNumber": "IT01234567890", "additionalNote": "key account"}}),
            ),
        )
        .await;
    info!(status = created.status, "business/create");
    let id = created
        .body
        .data
        .as_ref()
        .and_then(|data| data.get("id"))
        .and_then(|id| id.as_str())
        .unwrap_or_default()
        .to_string();

    let welcomed = app
        .dispatch(
            "customer",
            "business/welcome",
            ActionRequest::new(microservice.as_str(), json!({ "id": id })),
        )
        .await;
    info!(status = welcomed.status, "business/welcome");

    let private = app
        .dispatch(
            "customer",
            "private/instance",
            ActionRequest::new(microservice.as_str(), json!({ "id": id })),
        )
        .await;
    warn!(status = private.status, "private/instance on a business record");

    let listed = app
        .dispatch("customer", "list", ActionRequest::new(microservice.as_str(), json!({})))
        .await;
    println!("{}", serde_json::to_string_pretty(&listed.body)?);

    let document = app.openapi(&microservice, "/", "/api/{app}")?;
    println!("{}", serde_json::to_string_pretty(&document)?);

    app.shutdown().await;
    info!("Demo completed");
    Ok(())
}
