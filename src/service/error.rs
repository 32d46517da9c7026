//! Registration-time errors. Any of these aborts startup.

use crate::repository::RepositoryError;
use crate::schema::SchemaParseError;

#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("Action '{method}' is already registered on resource '{resource}'")]
    ActionCollision { resource: String, method: String },
    #[error("Action '{method}' of resource '{resource}' has no default handler to override")]
    UnknownOverride { resource: String, method: String },
    #[error("Resource '{0}' is already registered")]
    DuplicateResource(String),
    #[error("Category '{category}' is declared twice on resource '{resource}'")]
    DuplicateCategory { resource: String, category: String },
    #[error("Invalid attributes for category '{category}' of resource '{resource}': {source}")]
    SchemaParse {
        resource: String,
        category: String,
        #[source]
        source: SchemaParseError,
    },
    #[error("Repository for resource '{resource}' unavailable: {source}")]
    Repository {
        resource: String,
        #[source]
        source: RepositoryError,
    },
    #[error("No identity provider configured outside development")]
    MissingIdentityProvider,
}
