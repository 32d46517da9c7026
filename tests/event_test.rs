mod common;

use common::{request, start, APP};
use endor_sdk::action::{Context, EndorServiceAction, ReadInstanceDto, ResponseBuilder};
use endor_sdk::event::{subscriber_fn, DefaultEventBus, Event, EventBus, EventDefinition, EventError};
use endor_sdk::lifecycle::{EndorConfig, ServiceRegistry};
use endor_sdk::schema::{Describe, RecordShape, TypeShape};
use endor_sdk::service::EndorService;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderShipped {
    order_id: String,
}

impl Describe for OrderShipped {
    fn describe() -> TypeShape {
        RecordShape::new("OrderShipped").field::<String>("orderId").build()
    }
}

fn shipped() -> EventDefinition {
    EventDefinition::new::<OrderShipped>("order.shipped", "An order left the warehouse")
}

/// `order/ship` emits the declared event; `order/leak` emits one it never declared;
/// `order/mislabel` emits the declared name with the wrong payload type.
fn order_service() -> EndorService {
    let ship = EndorServiceAction::new("Ship an order", |ctx: Context<ReadInstanceDto>| async move {
        ctx.emit_event(
            "order.shipped",
            OrderShipped {
                order_id: ctx.payload.id.clone(),
            },
        )?;
        Ok(ResponseBuilder::new().add_data(ctx.payload.id).build())
    })
    .with_events(vec![shipped()]);

    let leak = EndorServiceAction::new("Emit undeclared", |ctx: Context<ReadInstanceDto>| async move {
        let order_id = ctx.payload.id.clone();
        ctx.emit_event("order.lost", OrderShipped { order_id })?;
        Ok(ResponseBuilder::<()>::new().build())
    })
    .with_events(vec![shipped()]);

    let mislabel = EndorServiceAction::new("Emit wrong payload", |ctx: Context<ReadInstanceDto>| async move {
        let id = ctx.payload.id.clone();
        ctx.emit_event("order.shipped", id)?;
        Ok(ResponseBuilder::<()>::new().build())
    })
    .with_events(vec![shipped()]);

    EndorService::new("order", "Orders")
        .with_action("ship", ship)
        .and_then(|s| s.with_action("leak", leak))
        .and_then(|s| s.with_action("mislabel", mislabel))
        .unwrap()
}

#[tokio::test]
async fn emitted_events_reach_subscribers() {
    let bus = Arc::new(DefaultEventBus::new());
    let (tx, mut rx) = mpsc::unbounded_channel();
    bus.subscribe(
        "order.shipped",
        subscriber_fn(move |event| {
            let tx = tx.clone();
            async move {
                tx.send(event).map_err(|e| EventError::Subscriber(e.to_string()))
            }
        }),
    );

    let app = start(
        ServiceRegistry::new(EndorConfig::new(APP))
            .with_event_bus(bus.clone())
            .register_service(order_service()),
    )
    .await;

    let outcome = app.dispatch("order", "ship", request(json!({"id": "o1"}))).await;
    assert_eq!(outcome.status, 200);

    let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("delivered in time")
        .expect("channel open");
    assert_eq!(event.name, "order.shipped");
    assert_eq!(event.payload, json!({"orderId": "o1"}));
    assert_eq!(event.source, APP);
    assert_eq!(bus.published().len(), 1);
    app.shutdown().await;
}

#[tokio::test]
async fn emission_without_subscribers_succeeds() {
    let bus = Arc::new(DefaultEventBus::new());
    let app = start(
        ServiceRegistry::new(EndorConfig::new(APP))
            .with_event_bus(bus.clone())
            .register_service(order_service()),
    )
    .await;

    let outcome = app.dispatch("order", "ship", request(json!({"id": "o2"}))).await;
    assert_eq!(outcome.status, 200);
    assert_eq!(bus.subscriber_count("order.shipped"), 0);
    assert_eq!(bus.published()[0].payload, json!({"orderId": "o2"}));
    app.shutdown().await;
}

#[tokio::test]
async fn emission_errors_fail_the_request() {
    let bus = Arc::new(DefaultEventBus::new());
    let app = start(
        ServiceRegistry::new(EndorConfig::new(APP))
            .with_event_bus(bus.clone())
            .register_service(order_service()),
    )
    .await;

    let undeclared = app.dispatch("order", "leak", request(json!({"id": "o3"}))).await;
    assert_eq!(undeclared.status, 500);
    assert!(undeclared.body.messages[0].value.contains("order.lost"));

    let mismatched = app.dispatch("order", "mislabel", request(json!({"id": "o4"}))).await;
    assert_eq!(mismatched.status, 500);

    assert!(bus.published().is_empty());
    app.shutdown().await;
}

#[tokio::test]
async fn emission_without_a_bus_fails() {
    let app = start(ServiceRegistry::new(EndorConfig::new(APP)).register_service(order_service())).await;
    let outcome = app.dispatch("order", "ship", request(json!({"id": "o5"}))).await;
    assert_eq!(outcome.status, 500);
    app.shutdown().await;
}

#[tokio::test]
async fn requests_do_not_wait_for_subscribers() {
    let bus = Arc::new(DefaultEventBus::new());
    let gate = Arc::new(Semaphore::new(0));
    let (tx, mut rx) = mpsc::unbounded_channel();
    {
        let gate = gate.clone();
        bus.subscribe(
            "order.shipped",
            subscriber_fn(move |event| {
                let gate = gate.clone();
                let tx = tx.clone();
                async move {
                    gate.acquire()
                        .await
                        .map_err(|e| EventError::Subscriber(e.to_string()))?
                        .forget();
                    tx.send(event).map_err(|e| EventError::Subscriber(e.to_string()))
                }
            }),
        );
    }

    let app = start(
        ServiceRegistry::new(EndorConfig::new(APP))
            .with_event_bus(bus.clone())
            .register_service(order_service()),
    )
    .await;

    let outcome = tokio::time::timeout(
        Duration::from_millis(500),
        app.dispatch("order", "ship", request(json!({"id": "o6"}))),
    )
    .await
    .expect("request completes while the subscriber is blocked");
    assert_eq!(outcome.status, 200);

    let published = bus.publish(Event::new("order.shipped", json!({"orderId": "o7"}), APP));
    assert!(published.is_ok());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());

    gate.add_permits(2);
    for _ in 0..2 {
        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("subscriber resumes")
            .expect("channel open");
        assert_eq!(event.name, "order.shipped");
    }
    app.shutdown().await;
}
