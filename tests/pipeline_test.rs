mod common;

use async_trait::async_trait;
use common::{customers, request, start, APP};
use endor_sdk::action::{
    ActionRequest, AuthorizationRequest, Context, EndorServiceAction, IdentityError,
    IdentityProvider, NoPayload, Response, ResponseBuilder, Session, Stage,
};
use endor_sdk::lifecycle::{EndorConfig, Environment, ServiceRegistry};
use endor_sdk::service::{EndorService, RegistrationError};
use endor_sdk::EndorError;
use serde_json::json;
use std::sync::Arc;

/// Accepts only the `valid` session cookie.
struct CookieIdentity;

#[async_trait]
impl IdentityProvider for CookieIdentity {
    async fn authorize(&self, request: &AuthorizationRequest) -> Result<Session, IdentityError> {
        match request.session_cookie.as_deref() {
            Some("valid") => Ok(Session {
                id: "valid".into(),
                user: "u1".into(),
                email: "u1@example.com".into(),
                app: request.app.clone(),
            }),
            Some(_) => Err(IdentityError::Rejected { status: 403 }),
            None => Err(IdentityError::MissingSession),
        }
    }
}

fn whoami() -> EndorServiceAction {
    EndorServiceAction::new("Who am I", |ctx: Context<NoPayload>| async move {
        Ok(ResponseBuilder::new().add_data(ctx.session.user).build())
    })
}

fn health() -> EndorServiceAction {
    EndorServiceAction::new("Health", |_: Context<NoPayload>| async {
        Ok(ResponseBuilder::new().add_data("ok").build())
    })
    .public()
}

fn account_service() -> EndorService {
    EndorService::new("account", "Accounts")
        .with_action("whoami", whoami())
        .and_then(|s| s.with_action("health", health()))
        .and_then(|s| {
            s.with_action(
                "fail",
                EndorServiceAction::new("Always fails", |_: Context<NoPayload>| async {
                    Err::<Response<()>, _>(EndorError::forbidden("not today"))
                }),
            )
        })
        .unwrap()
}

fn production() -> EndorConfig {
    EndorConfig::new(APP).with_environment(Environment::Production)
}

#[tokio::test]
async fn sessions_are_required_outside_public_actions() {
    let app = start(
        ServiceRegistry::new(production())
            .with_identity(Arc::new(CookieIdentity))
            .register_service(account_service()),
    )
    .await;

    let anonymous = app.dispatch("account", "whoami", request(json!({}))).await;
    assert_eq!(anonymous.status, 401);
    assert_eq!(anonymous.final_stage(), Stage::Failed);

    let rejected = app
        .dispatch("account", "whoami", request(json!({})).with_session("forged"))
        .await;
    assert_eq!(rejected.status, 401);

    let accepted = app
        .dispatch("account", "whoami", request(json!({})).with_session("valid"))
        .await;
    assert_eq!(accepted.status, 200);
    assert_eq!(accepted.body.data, Some(json!("u1")));
    assert_eq!(
        accepted.stages,
        vec![
            Stage::Created,
            Stage::Validating,
            Stage::Authorizing,
            Stage::Handling,
            Stage::Completed
        ]
    );

    let public = app.dispatch("account", "health", request(json!({}))).await;
    assert_eq!(public.status, 200);
    assert_eq!(public.header("x-endor-microservice"), Some(APP));
    app.shutdown().await;
}

#[tokio::test]
async fn invalid_payloads_never_reach_authorization() {
    let app = start(ServiceRegistry::new(EndorConfig::new(APP)).register_hybrid(customers())).await;

    let outcome = app
        .dispatch("customer", "cat-1/create", request(json!({"data": {"name": "ACME"}})))
        .await;
    assert_eq!(outcome.status, 400);
    assert_eq!(outcome.stages, vec![Stage::Created, Stage::Validating, Stage::Failed]);
    assert!(outcome.body.messages[0].value.contains("vatNumber"));

    let wrong_type = app
        .dispatch("customer", "create", request(json!({"data": {"name": 42}})))
        .await;
    assert_eq!(wrong_type.status, 400);
    app.shutdown().await;
}

#[tokio::test]
async fn handler_errors_keep_their_status() {
    let app = start(ServiceRegistry::new(EndorConfig::new(APP)).register_service(account_service())).await;
    let outcome = app.dispatch("account", "fail", request(json!(null))).await;
    assert_eq!(outcome.status, 403);
    assert_eq!(outcome.body.messages[0].value, "not today");
    assert!(outcome.body.data.is_none());
    app.shutdown().await;
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let app = start(ServiceRegistry::new(EndorConfig::new(APP)).register_service(account_service())).await;
    let resource = app.dispatch("nobody", "list", request(json!({}))).await;
    assert_eq!(resource.status, 404);
    let method = app
        .dispatch("account", "drop", ActionRequest::new(APP, json!({})))
        .await;
    assert_eq!(method.status, 404);
    app.shutdown().await;
}

#[tokio::test]
async fn production_requires_an_identity_provider() {
    let result = ServiceRegistry::new(production())
        .register_service(account_service())
        .start()
        .await;
    assert!(matches!(result, Err(RegistrationError::MissingIdentityProvider)));
}

#[tokio::test]
async fn resources_are_unique() {
    let result = ServiceRegistry::new(EndorConfig::new(APP))
        .register_service(EndorService::new("customer", "Flat customers"))
        .register_hybrid(customers())
        .start()
        .await;
    assert!(matches!(result, Err(RegistrationError::DuplicateResource(name)) if name == "customer"));
}

#[tokio::test]
async fn unknown_persistence_fails_startup() {
    let result = ServiceRegistry::new(EndorConfig::new(APP))
        .register_hybrid(customers().with_persistence("mongodb"))
        .start()
        .await;
    assert!(matches!(result, Err(RegistrationError::Repository { .. })));

    let disallowed = ServiceRegistry::new(EndorConfig::new(APP).with_allowed_persistence(["mongodb"]))
        .register_hybrid(customers())
        .start()
        .await;
    assert!(matches!(disallowed, Err(RegistrationError::Repository { .. })));
}
