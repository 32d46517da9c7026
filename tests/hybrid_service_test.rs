mod common;

use common::{customer_app, customers, data_id, request, start, Customer, APP};
use endor_sdk::action::{Context, EndorServiceAction, NoPayload, ReadInstanceDto, ResponseBuilder};
use endor_sdk::lifecycle::{EndorConfig, ServiceRegistry};
use endor_sdk::repository::mock::MockRepository;
use endor_sdk::repository::{ReadOptions, RepositoryError, ResourceInstance, ResourceRepository};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

#[test]
fn category_create_data_carries_every_attribute() {
    let schemas = customers().schemas().unwrap();
    let composite = schemas.category("cat-1").unwrap();
    assert_eq!(
        composite.property_names(),
        vec!["additionalNote", "createdAt", "id", "name", "vatNumber"]
    );
    assert!(composite.is_required("name"));
    assert!(composite.is_required("vatNumber"));
    assert_eq!(schemas.root.property_names(), vec!["createdAt", "id", "name"]);
}

#[tokio::test]
async fn category_create_action_exposes_the_composite_schema() {
    let app = customer_app().await;
    let service = app.service("customer").unwrap();

    assert_eq!(service.methods().len(), 6 + 6 * 2);
    let input = service.action("cat-1/create").unwrap().input_schema().unwrap();
    let data = input.property("data").unwrap();
    assert_eq!(
        data.property_names(),
        vec!["additionalNote", "createdAt", "id", "name", "vatNumber"]
    );

    let plain = service.action("cat-2/create").unwrap().input_schema().unwrap();
    assert_eq!(
        plain.property("data").unwrap().property_names(),
        vec!["createdAt", "id", "name"]
    );
    app.shutdown().await;
}

#[tokio::test]
async fn category_records_round_trip_with_their_extra_attributes() {
    let app = customer_app().await;

    let created = app
        .dispatch(
            "customer",
            "cat-1/create",
            request(json!({"data": {"name": "ACME", "vatNumber": "IT01", "additionalNote": "vip"}})),
        )
        .await;
    assert_eq!(created.status, 200, "{:?}", created.body);
    assert_eq!(created.body.messages[0].value, "customer created (category)");
    let id = data_id(&created.body);

    let fetched = app
        .dispatch("customer", "cat-1/instance", request(json!({ "id": id })))
        .await;
    assert_eq!(fetched.status, 200);
    let data = fetched.body.data.unwrap();
    assert_eq!(data["name"], "ACME");
    assert_eq!(data["vatNumber"], "IT01");
    assert_eq!(data["additionalNote"], "vip");
    assert_eq!(data["categoryType"], "cat-1");
    assert!(fetched.body.schema.is_some());
    app.shutdown().await;
}

#[tokio::test]
async fn categories_only_see_their_own_records() {
    let app = customer_app().await;

    let business = app
        .dispatch(
            "customer",
            "cat-1/create",
            request(json!({"data": {"name": "ACME", "vatNumber": "IT01"}})),
        )
        .await;
    let business_id = data_id(&business.body);
    app.dispatch("customer", "cat-2/create", request(json!({"data": {"name": "Ada"}})))
        .await;
    app.dispatch("customer", "create", request(json!({"data": {"name": "Root"}})))
        .await;

    let everything = app.dispatch("customer", "list", request(json!({}))).await;
    assert_eq!(everything.body.data.unwrap().as_array().unwrap().len(), 3);

    let private = app.dispatch("customer", "cat-2/list", request(json!({}))).await;
    let private = private.body.data.unwrap();
    assert_eq!(private.as_array().unwrap().len(), 1);
    assert_eq!(private[0]["name"], "Ada");

    let foreign = app
        .dispatch("customer", "cat-2/instance", request(json!({ "id": business_id })))
        .await;
    assert_eq!(foreign.status, 404);

    let foreign_delete = app
        .dispatch("customer", "cat-2/delete", request(json!({ "id": business_id })))
        .await;
    assert_eq!(foreign_delete.status, 404);

    let still_there = app
        .dispatch("customer", "cat-1/instance", request(json!({ "id": business_id })))
        .await;
    assert_eq!(still_there.status, 200);
    app.shutdown().await;
}

#[tokio::test]
async fn root_update_keeps_the_category() {
    let app = customer_app().await;
    let created = app
        .dispatch(
            "customer",
            "cat-1/create",
            request(json!({"data": {"name": "ACME", "vatNumber": "IT01"}})),
        )
        .await;
    let id = data_id(&created.body);

    let updated = app
        .dispatch(
            "customer",
            "update",
            request(json!({"id": id, "data": {"name": "ACME Corp"}})),
        )
        .await;
    assert_eq!(updated.status, 200, "{:?}", updated.body);
    assert_eq!(updated.body.messages[0].value, "customer updated");

    let listed = app.dispatch("customer", "cat-1/list", request(json!({}))).await;
    let listed = listed.body.data.unwrap();
    assert_eq!(listed[0]["name"], "ACME Corp");
    assert_eq!(listed[0]["id"], id.as_str());
    app.shutdown().await;
}

#[tokio::test]
async fn updates_and_deletes_of_missing_records_are_not_found() {
    let app = customer_app().await;
    let update = app
        .dispatch(
            "customer",
            "update",
            request(json!({"id": "nope", "data": {"name": "Ghost"}})),
        )
        .await;
    assert_eq!(update.status, 404);
    let delete = app
        .dispatch("customer", "delete", request(json!({"id": "nope"})))
        .await;
    assert_eq!(delete.status, 404);
    app.shutdown().await;
}

#[tokio::test]
async fn repository_failures_surface_with_their_status() {
    let mock = MockRepository::<ResourceInstance<Customer>>::new("customer");
    mock.expect_create()
        .return_err(RepositoryError::Conflict("c1".into()));
    mock.expect_list()
        .return_ok(vec![ResourceInstance::new(Customer::named("Ada"))]);

    let repository: Arc<dyn ResourceRepository<ResourceInstance<Customer>>> = Arc::new(mock.client());
    let service = customers().compose(repository).unwrap();
    let app = start(ServiceRegistry::new(EndorConfig::new(APP)).register_service(service)).await;

    let conflict = app
        .dispatch("customer", "create", request(json!({"data": {"id": "c1", "name": "Ada"}})))
        .await;
    assert_eq!(conflict.status, 409);

    let listed = app.dispatch("customer", "list", request(json!({}))).await;
    assert_eq!(listed.body.data.unwrap()[0]["name"], "Ada");

    mock.verify();
}

#[tokio::test]
async fn custom_actions_and_overrides_reach_the_repository() {
    let service = customers()
        .with_actions(|_, repository| {
            let greet = EndorServiceAction::new("Greet a customer", move |ctx: Context<ReadInstanceDto>| {
                let repository = repository.clone();
                async move {
                    let customer = repository.instance(&ctx.payload.id, &ReadOptions::default()).await?;
                    Ok(ResponseBuilder::new()
                        .add_data(format!("Hello {}", customer.this.name))
                        .build())
                }
            });
            BTreeMap::from([("cat-1/greet".to_string(), greet)])
        })
        .with_handler("cat-2/list", |_, repository| {
            EndorServiceAction::new("Count every customer", move |_: Context<NoPayload>| {
                let repository = repository.clone();
                async move {
                    let all = repository.list(&ReadOptions::default()).await?;
                    Ok(ResponseBuilder::new().add_data(all.len()).build())
                }
            })
        });
    let app = start(ServiceRegistry::new(EndorConfig::new(APP)).register_hybrid(service)).await;

    let created = app
        .dispatch(
            "customer",
            "cat-1/create",
            request(json!({"data": {"name": "ACME", "vatNumber": "IT1"}})),
        )
        .await;
    assert_eq!(created.status, 200, "{:?}", created.body);
    let id = data_id(&created.body);

    let greeted = app.dispatch("customer", "cat-1/greet", request(json!({"id": id}))).await;
    assert_eq!(greeted.status, 200, "{:?}", greeted.body);
    assert_eq!(greeted.body.data, Some(json!("Hello ACME")));

    let missing = app.dispatch("customer", "cat-1/greet", request(json!({"id": "nope"}))).await;
    assert_eq!(missing.status, 404);

    let counted = app.dispatch("customer", "cat-2/list", request(json!({}))).await;
    assert_eq!(counted.status, 200);
    assert_eq!(counted.body.data, Some(json!(1)));
    assert_eq!(
        app.service("customer").unwrap().action("cat-2/list").unwrap().description(),
        "Count every customer"
    );
    app.shutdown().await;
}
