//! # Default Actions
//!
//! The six verbs every hybrid resource gets, once at the root and once per category:
//!
//! | Verb | Payload | Answer |
//! |------|---------|--------|
//! | `schema` | none | the composite schema |
//! | `list` | `ReadDTO` | matching records + schema |
//! | `instance` | `ReadInstanceDTO` | one record + schema |
//! | `create` | `{ data }` | the stored record |
//! | `update` | `{ id, data }` | the stored record |
//! | `delete` | `ReadInstanceDTO` | a confirmation message |
//!
//! Category actions tag the records they create with the category id and only see records
//! carrying their own tag. Root actions see every record.

use crate::action::{
    ActionOptions, Context, CreateDto, EndorServiceAction, Gravity, NoPayload, ReadDto,
    ReadInstanceDto, Response, ResponseBuilder, UpdateByIdDto,
};
use crate::error::EndorError;
use crate::repository::{ReadOptions, ResourceInstance, ResourceModel, ResourceRepository, CATEGORY_KEY};
use crate::schema::Schema;
use serde_json::Value;
use std::sync::Arc;

pub const DEFAULT_VERBS: [&str; 6] = ["schema", "instance", "list", "create", "update", "delete"];

/// Everything the default handlers of one scope (root or a category) share.
pub struct Scope<T> {
    pub resource: String,
    pub description: String,
    pub category: Option<String>,
    /// The composite data schema of this scope.
    pub schema: Schema,
    pub repository: Arc<dyn ResourceRepository<ResourceInstance<T>>>,
}

impl<T> Scope<T> {
    fn key(&self, verb: &str) -> String {
        match &self.category {
            Some(category) => format!("{category}/{verb}"),
            None => verb.to_string(),
        }
    }

    fn summary(&self, text: &str) -> String {
        let summary = format!("{text} {} ({})", self.resource, self.description);
        match &self.category {
            Some(category) => format!("{summary} for category {category}"),
            None => summary,
        }
    }

    fn dto_name(&self, prefix: &str) -> String {
        match &self.category {
            Some(category) => format!("{prefix}_{}_{category}", self.resource),
            None => format!("{prefix}_{}", self.resource),
        }
    }

    fn done(&self, verb: &str) -> String {
        match &self.category {
            Some(_) => format!("{} {verb} (category)", self.resource),
            None => format!("{} {verb}", self.resource),
        }
    }

    fn foreign(&self, id: &str) -> EndorError {
        match &self.category {
            Some(category) => EndorError::not_found(format!(
                "{} {id} not found in category {category}",
                self.resource
            )),
            None => EndorError::not_found(format!("{} {id} not found", self.resource)),
        }
    }
}

impl<T: ResourceModel> Scope<T> {
    /// Loads a record, hiding records of other categories from category scopes.
    async fn load(&self, id: &str) -> Result<ResourceInstance<T>, EndorError> {
        let record = self.repository.instance(id, &ReadOptions::default()).await?;
        match &self.category {
            Some(category) if record.category() != Some(category.as_str()) => {
                Err(self.foreign(id))
            }
            _ => Ok(record),
        }
    }

    fn tag(&self, item: &mut ResourceInstance<T>) {
        match &self.category {
            Some(category) => {
                item.metadata
                    .insert(CATEGORY_KEY.to_string(), Value::String(category.clone()));
            }
            None => {
                item.metadata.remove(CATEGORY_KEY);
            }
        }
    }
}

/// Builds the six default actions of `scope`, keyed by method.
pub fn default_actions<T: ResourceModel>(scope: Scope<T>) -> Vec<(String, EndorServiceAction)> {
    let scope = Arc::new(scope);

    let create_schema = Schema::object([("data", scope.schema.clone())])
        .require("data")
        .named(scope.dto_name("CreateDTO"));
    let update_schema = Schema::object([("id", Schema::string()), ("data", scope.schema.clone())])
        .require("id")
        .require("data")
        .named(scope.dto_name("UpdateByIdDTO"));

    let schema = {
        let scope = scope.clone();
        EndorServiceAction::new(scope.summary("Get the schema of the"), move |ctx: Context<NoPayload>| {
            schema_handler(scope.clone(), ctx)
        })
    };
    let instance = {
        let scope = scope.clone();
        EndorServiceAction::new(scope.summary("Get the instance of"), move |ctx: Context<ReadInstanceDto>| {
            instance_handler(scope.clone(), ctx)
        })
    };
    let list = {
        let scope = scope.clone();
        EndorServiceAction::new(
            scope.summary("Search for available list of"),
            move |ctx: Context<ReadDto>| list_handler(scope.clone(), ctx),
        )
    };
    let create = {
        let scope = scope.clone();
        let options = ActionOptions {
            input_schema: Some(create_schema),
            ..ActionOptions::new(scope.summary("Create the instance of"))
        };
        EndorServiceAction::configurable(
            options,
            move |ctx: Context<CreateDto<ResourceInstance<T>>>| create_handler(scope.clone(), ctx),
        )
    };
    let update = {
        let scope = scope.clone();
        let options = ActionOptions {
            input_schema: Some(update_schema),
            ..ActionOptions::new(scope.summary("Update the existing instance of"))
        };
        EndorServiceAction::configurable(
            options,
            move |ctx: Context<UpdateByIdDto<ResourceInstance<T>>>| update_handler(scope.clone(), ctx),
        )
    };
    let delete = {
        let scope = scope.clone();
        EndorServiceAction::new(
            scope.summary("Delete the existing instance of"),
            move |ctx: Context<ReadInstanceDto>| delete_handler(scope.clone(), ctx),
        )
    };

    vec![
        (scope.key("schema"), schema),
        (scope.key("instance"), instance),
        (scope.key("list"), list),
        (scope.key("create"), create),
        (scope.key("update"), update),
        (scope.key("delete"), delete),
    ]
}

async fn schema_handler<T>(
    scope: Arc<Scope<T>>,
    _ctx: Context<NoPayload>,
) -> Result<Response<()>, EndorError> {
    Ok(ResponseBuilder::new().add_schema(scope.schema.clone()).build())
}

async fn instance_handler<T: ResourceModel>(
    scope: Arc<Scope<T>>,
    ctx: Context<ReadInstanceDto>,
) -> Result<Response<ResourceInstance<T>>, EndorError> {
    let record = scope.load(&ctx.payload.id).await?;
    Ok(ResponseBuilder::new()
        .add_data(record)
        .add_schema(scope.schema.clone())
        .build())
}

async fn list_handler<T: ResourceModel>(
    scope: Arc<Scope<T>>,
    ctx: Context<ReadDto>,
) -> Result<Response<Vec<ResourceInstance<T>>>, EndorError> {
    let mut options = ReadOptions {
        filter: ctx.payload.filter,
        projection: ctx.payload.projection,
    };
    if let Some(category) = &scope.category {
        options = options.filtered(CATEGORY_KEY, Value::String(category.clone()));
    }
    let records = scope.repository.list(&options).await?;
    Ok(ResponseBuilder::new()
        .add_data(records)
        .add_schema(scope.schema.clone())
        .build())
}

async fn create_handler<T: ResourceModel>(
    scope: Arc<Scope<T>>,
    ctx: Context<CreateDto<ResourceInstance<T>>>,
) -> Result<Response<ResourceInstance<T>>, EndorError> {
    let mut item = ctx.payload.data;
    scope.tag(&mut item);
    let created = scope.repository.create(item).await?;
    Ok(ResponseBuilder::new()
        .add_message(Gravity::Info, scope.done("created"))
        .add_data(created)
        .build())
}

async fn update_handler<T: ResourceModel>(
    scope: Arc<Scope<T>>,
    ctx: Context<UpdateByIdDto<ResourceInstance<T>>>,
) -> Result<Response<ResourceInstance<T>>, EndorError> {
    let UpdateByIdDto { id, data: mut item } = ctx.payload;
    let existing = scope.load(&id).await?;
    match (&scope.category, existing.category()) {
        (Some(_), _) => scope.tag(&mut item),
        // Root updates keep the record in its category.
        (None, Some(category)) => {
            item.metadata
                .insert(CATEGORY_KEY.to_string(), Value::String(category.to_string()));
        }
        (None, None) => scope.tag(&mut item),
    }
    let updated = scope.repository.update(&id, item).await?;
    Ok(ResponseBuilder::new()
        .add_message(Gravity::Info, scope.done("updated"))
        .add_data(updated)
        .build())
}

async fn delete_handler<T: ResourceModel>(
    scope: Arc<Scope<T>>,
    ctx: Context<ReadInstanceDto>,
) -> Result<Response<()>, EndorError> {
    let id = ctx.payload.id;
    if scope.category.is_some() {
        scope.load(&id).await?;
    }
    scope.repository.delete(&id).await?;
    Ok(ResponseBuilder::new()
        .add_message(Gravity::Info, scope.done("deleted"))
        .build())
}
