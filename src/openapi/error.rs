use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpenApiError {
    #[error("Schema {name} is declared with two different shapes")]
    SchemaConflict { name: String },

    #[error("Path template {0} has no {{app}} placeholder")]
    InvalidPathTemplate(String),
}
