#![allow(dead_code)]

use chrono::{DateTime, Utc};
use endor_sdk::action::ActionRequest;
use endor_sdk::lifecycle::{EndorApp, EndorConfig, ServiceRegistry};
use endor_sdk::repository::ResourceModel;
use endor_sdk::schema::{Describe, RecordShape, TypeShape};
use endor_sdk::service::{EndorHybridService, SpecializedCategoryInfo};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const APP: &str = "shop";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Customer {
    pub fn named(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            created_at: None,
        }
    }
}

impl Describe for Customer {
    fn describe() -> TypeShape {
        RecordShape::new("Customer")
            .tagged::<Option<String>>("id", "readOnly=true")
            .tagged::<String>("name", "required=true")
            .field::<Option<DateTime<Utc>>>("createdAt")
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

pub struct VatInfo;

impl Describe for VatInfo {
    fn describe() -> TypeShape {
        RecordShape::new("VatInfo")
            .tagged::<String>("vatNumber", "required=true")
            .build()
    }
}

/// `customer` with categories `cat-1` (static `vatNumber`, dynamic `additionalNote`) and
/// `cat-2` (no extensions).
pub fn customers() -> EndorHybridService<Customer> {
    EndorHybridService::new("customer", "Customers")
        .with_category(
            SpecializedCategoryInfo::new("cat-1", "Business")
                .with_static_model::<VatInfo>()
                .with_additional_attributes("schema:\n  type: object\n  properties:\n    additionalNote:\n      type: string\n"),
        )
        .with_category(SpecializedCategoryInfo::new("cat-2", "Private"))
}

pub async fn start(registry: ServiceRegistry) -> EndorApp {
    registry.start().await.expect("app starts")
}

pub async fn customer_app() -> EndorApp {
    start(ServiceRegistry::new(EndorConfig::new(APP)).register_hybrid(customers())).await
}

pub fn request(payload: Value) -> ActionRequest {
    ActionRequest::new(APP, payload)
}

/// The `id` of the record in a response body.
pub fn data_id(body: &endor_sdk::action::Response<Value>) -> String {
    body.data
        .as_ref()
        .and_then(|data| data.get("id"))
        .and_then(Value::as_str)
        .expect("response carries an id")
        .to_string()
}
