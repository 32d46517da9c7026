//! Process configuration, resolved once and passed by value into the registry.

use crate::repository::MEMORY_BACKEND;
use std::env;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const ENV_MICROSERVICE_ID: &str = "ENDOR_MICROSERVICE_ID";
pub const ENV_ENVIRONMENT: &str = "ENDOR_ENV";
pub const ENV_PORT: &str = "ENDOR_PORT";
pub const ENV_IDENTITY_URL: &str = "ENDOR_IDENTITY_URL";
pub const ENV_PERSISTENCE: &str = "ENDOR_PERSISTENCE";

pub const DEFAULT_MICROSERVICE_ID: &str = "endor";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Unknown environment '{0}', expected development or production")]
    InvalidEnvironment(String),

    #[error("Invalid port '{0}'")]
    InvalidPort(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidEnvironment(s.to_string())),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => f.write_str("development"),
            Environment::Production => f.write_str("production"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndorConfig {
    pub microservice_id: String,
    pub environment: Environment,
    pub port: u16,
    pub identity_service_url: Option<String>,
    /// Backend kind for resources that do not name one.
    pub default_persistence: String,
    /// When set, only these backend kinds may be used.
    pub allowed_persistence: Option<Vec<String>>,
}

impl EndorConfig {
    pub fn new(microservice_id: impl Into<String>) -> Self {
        Self {
            microservice_id: microservice_id.into(),
            environment: Environment::Development,
            port: DEFAULT_PORT,
            identity_service_url: None,
            default_persistence: MEMORY_BACKEND.to_string(),
            allowed_persistence: None,
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_identity_service(mut self, url: impl Into<String>) -> Self {
        self.identity_service_url = Some(url.into());
        self
    }

    pub fn with_default_persistence(mut self, kind: impl Into<String>) -> Self {
        self.default_persistence = kind.into();
        self
    }

    pub fn with_allowed_persistence<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_persistence = Some(kinds.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    pub fn allows(&self, kind: &str) -> bool {
        self.allowed_persistence
            .as_ref()
            .map_or(true, |kinds| kinds.iter().any(|k| k == kind))
    }

    /// Reads the `ENDOR_*` variables, falling back to defaults for missing ones.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::new(
            lookup(ENV_MICROSERVICE_ID).unwrap_or_else(|| DEFAULT_MICROSERVICE_ID.to_string()),
        );
        if let Some(environment) = lookup(ENV_ENVIRONMENT) {
            config.environment = environment.parse()?;
        }
        if let Some(port) = lookup(ENV_PORT) {
            config.port = port.parse().map_err(|_| ConfigError::InvalidPort(port))?;
        }
        config.identity_service_url = lookup(ENV_IDENTITY_URL);
        if let Some(kind) = lookup(ENV_PERSISTENCE) {
            config.default_persistence = kind;
        }
        Ok(config)
    }
}
