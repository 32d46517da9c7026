//! Errors raised while reading operator-supplied schema fragments.

/// A YAML schema fragment could not be turned into a [`Schema`](super::Schema).
#[derive(Debug, thiserror::Error)]
pub enum SchemaParseError {
    #[error("Malformed schema fragment: {0}")]
    Malformed(#[from] serde_yaml::Error),
    #[error("Schema fragment must be a mapping")]
    NotAMapping,
    #[error("Unknown schema type '{type_name}' at {path}")]
    UnknownType { path: String, type_name: String },
    #[error("Inconsistent schema node at {path}: {reason}")]
    Inconsistent { path: String, reason: String },
}
